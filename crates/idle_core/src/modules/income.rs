//! Periodic gold income.

use serde::{Deserialize, Serialize};

use super::{
    ActivationOutcome, ModuleBehavior, ModuleData, ModuleKind, ModuleOwner, ModuleState,
    TIMER_EPSILON,
};
use crate::ledger::ResourceLedger;

/// Pays the owning building's income curve on a fixed interval.
///
/// Each elapsed interval pays `get_income(level) × global income multiplier`
/// once. A longer interval therefore means a slower building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeModule {
    /// Module name, unique per building.
    pub name: String,

    /// Seconds between payouts.
    #[serde(default = "default_interval")]
    pub interval_secs: f64,

    /// Whether the switch starts in the on position.
    #[serde(default = "default_true")]
    pub starts_active: bool,
}

const fn default_interval() -> f64 {
    1.0
}

const fn default_true() -> bool {
    true
}

impl IncomeModule {
    /// Create an income module paying every second.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interval_secs: default_interval(),
            starts_active: true,
        }
    }

    /// Change the payout interval.
    #[must_use]
    pub fn with_interval(mut self, interval_secs: f64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    /// Gold paid per interval, ignoring the on/off switch.
    #[must_use]
    pub fn payout(&self, owner: &ModuleOwner<'_>) -> f64 {
        owner.config.get_income(owner.level) * owner.income_multiplier
    }
}

impl ModuleBehavior for IncomeModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Income
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_state(&self) -> ModuleState {
        ModuleState::Income {
            active: self.starts_active,
            timer: 0.0,
        }
    }

    fn tick(
        &self,
        owner: &ModuleOwner<'_>,
        data: &mut ModuleData,
        ledger: &mut ResourceLedger,
        dt: f64,
    ) {
        let ModuleState::Income { active, timer } = &mut data.state else {
            return;
        };
        if !*active || self.interval_secs <= 0.0 {
            return;
        }

        *timer += dt;
        let payouts = ((*timer + TIMER_EPSILON) / self.interval_secs).floor();
        if payouts >= 1.0 {
            *timer = (*timer - payouts * self.interval_secs).max(0.0);
            ledger.add_gold(self.payout(owner) * payouts);
        }
    }

    fn on_activate(
        &self,
        _owner: &ModuleOwner<'_>,
        data: &mut ModuleData,
        _ledger: &mut ResourceLedger,
    ) -> ActivationOutcome {
        match &mut data.state {
            ModuleState::Income { active, .. } => {
                *active = !*active;
                ActivationOutcome::IncomeToggled { active: *active }
            }
            _ => ActivationOutcome::Locked,
        }
    }

    fn status_description(&self, owner: &ModuleOwner<'_>, data: &ModuleData) -> String {
        let active = matches!(data.state, ModuleState::Income { active: true, .. });
        format!(
            "{}: {:.2} gold every {}s ({})",
            self.name,
            self.payout(owner),
            self.interval_secs,
            if active { "active" } else { "paused" }
        )
    }

    fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.interval_secs.is_finite() && self.interval_secs > 0.0) {
            problems.push("interval_secs must be positive".to_string());
        }
        problems
    }
}
