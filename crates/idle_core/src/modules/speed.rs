//! Speed stat with a one-shot timed boost.

use serde::{Deserialize, Serialize};

use super::{ActivationOutcome, ModuleBehavior, ModuleData, ModuleKind, ModuleOwner, ModuleState};
use crate::ledger::ResourceLedger;

/// Level-scaled speed, capped, with a temporary multiplier on activation.
///
/// A running boost cannot be topped up: activating mid-boost does nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedModule {
    /// Module name, unique per building.
    pub name: String,
    /// Speed at level 0.
    pub base_speed: f64,
    /// Geometric growth of speed per building level.
    pub speed_multiplier: f64,
    /// Cap applied before the boost.
    pub max_speed: f64,
    /// Factor applied while boosted.
    pub boost_multiplier: f64,
    /// Boost length in seconds.
    pub boost_duration_secs: f64,
}

impl SpeedModule {
    /// Create a speed module.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        base_speed: f64,
        speed_multiplier: f64,
        max_speed: f64,
    ) -> Self {
        Self {
            name: name.into(),
            base_speed,
            speed_multiplier,
            max_speed,
            boost_multiplier: 2.0,
            boost_duration_secs: 30.0,
        }
    }

    /// Set the boost parameters.
    #[must_use]
    pub fn with_boost(mut self, multiplier: f64, duration_secs: f64) -> Self {
        self.boost_multiplier = multiplier;
        self.boost_duration_secs = duration_secs;
        self
    }

    /// Seconds of boost left, zero when not boosted.
    #[must_use]
    pub fn boost_remaining(data: &ModuleData) -> f64 {
        match data.state {
            ModuleState::Speed { boost_remaining } => boost_remaining.max(0.0),
            _ => 0.0,
        }
    }

    /// Whether a boost is running.
    #[must_use]
    pub fn is_boosted(data: &ModuleData) -> bool {
        Self::boost_remaining(data) > 0.0
    }

    /// `min(base × multiplier^level, max) × (boosted ? boost : 1)`.
    #[must_use]
    pub fn current_speed(&self, level: u32, data: &ModuleData) -> f64 {
        let scaled = self.base_speed * self.speed_multiplier.powf(f64::from(level));
        let capped = scaled.min(self.max_speed);
        if Self::is_boosted(data) {
            capped * self.boost_multiplier
        } else {
            capped
        }
    }
}

impl ModuleBehavior for SpeedModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Speed
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_state(&self) -> ModuleState {
        ModuleState::Speed {
            boost_remaining: 0.0,
        }
    }

    fn tick(
        &self,
        _owner: &ModuleOwner<'_>,
        data: &mut ModuleData,
        _ledger: &mut ResourceLedger,
        dt: f64,
    ) {
        if let ModuleState::Speed { boost_remaining } = &mut data.state {
            if *boost_remaining > 0.0 {
                *boost_remaining = (*boost_remaining - dt).max(0.0);
                if *boost_remaining == 0.0 {
                    tracing::debug!(module = %data.key, "Boost expired");
                }
            }
        }
    }

    fn on_activate(
        &self,
        _owner: &ModuleOwner<'_>,
        data: &mut ModuleData,
        _ledger: &mut ResourceLedger,
    ) -> ActivationOutcome {
        let ModuleState::Speed { boost_remaining } = &mut data.state else {
            return ActivationOutcome::Locked;
        };
        if *boost_remaining > 0.0 {
            return ActivationOutcome::AlreadyBoosted {
                remaining_secs: *boost_remaining,
            };
        }
        *boost_remaining = self.boost_duration_secs;
        ActivationOutcome::BoostStarted {
            duration_secs: self.boost_duration_secs,
        }
    }

    fn status_description(&self, owner: &ModuleOwner<'_>, data: &ModuleData) -> String {
        let speed = self.current_speed(owner.level, data);
        let remaining = Self::boost_remaining(data);
        if remaining > 0.0 {
            format!(
                "{}: speed {speed:.2} (boost x{:.1}, {remaining:.0}s left)",
                self.name, self.boost_multiplier
            )
        } else {
            format!("{}: speed {speed:.2}", self.name)
        }
    }

    fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.base_speed.is_finite() && self.base_speed >= 0.0) {
            problems.push("base_speed must be non-negative".to_string());
        }
        if !(self.speed_multiplier.is_finite() && self.speed_multiplier >= 1.0) {
            problems.push("speed_multiplier must be at least 1".to_string());
        }
        if !(self.max_speed.is_finite() && self.max_speed >= self.base_speed) {
            problems.push("max_speed must be at least base_speed".to_string());
        }
        if !(self.boost_multiplier.is_finite() && self.boost_multiplier >= 1.0) {
            problems.push("boost_multiplier must be at least 1".to_string());
        }
        if !(self.boost_duration_secs.is_finite() && self.boost_duration_secs > 0.0) {
            problems.push("boost_duration_secs must be positive".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BuildingConfig;

    fn setup() -> (BuildingConfig, SpeedModule, ModuleData) {
        let config = BuildingConfig::new("stable", 50.0, 1.2, 1.0, 1.1);
        let module = SpeedModule::new("gallop", 1.0, 1.1, 10.0).with_boost(2.0, 30.0);
        let data = ModuleData::new(module.key(), module.default_state());
        (config, module, data)
    }

    fn owner(config: &BuildingConfig) -> ModuleOwner<'_> {
        ModuleOwner {
            building_id: &config.id,
            config,
            level: 0,
            income_multiplier: 1.0,
        }
    }

    #[test]
    fn test_boost_window() {
        let (config, module, mut data) = setup();
        let mut ledger = ResourceLedger::new(0.0);
        let owner = owner(&config);

        assert_eq!(module.current_speed(0, &data), 1.0);
        module.on_activate(&owner, &mut data, &mut ledger);

        for _ in 0..29 {
            module.tick(&owner, &mut data, &mut ledger, 1.0);
        }
        assert_eq!(module.current_speed(0, &data), 2.0);

        module.tick(&owner, &mut data, &mut ledger, 1.0);
        module.tick(&owner, &mut data, &mut ledger, 1.0);
        assert_eq!(module.current_speed(0, &data), 1.0);
        assert!(!SpeedModule::is_boosted(&data));
    }

    #[test]
    fn test_no_top_up() {
        let (config, module, mut data) = setup();
        let mut ledger = ResourceLedger::new(0.0);
        let owner = owner(&config);

        module.on_activate(&owner, &mut data, &mut ledger);
        module.tick(&owner, &mut data, &mut ledger, 10.0);
        let outcome = module.on_activate(&owner, &mut data, &mut ledger);

        assert_eq!(
            outcome,
            ActivationOutcome::AlreadyBoosted {
                remaining_secs: 20.0
            }
        );
        assert_eq!(SpeedModule::boost_remaining(&data), 20.0);
    }

    #[test]
    fn test_speed_cap() {
        let (_, module, data) = setup();
        // 1.1^30 is far above the cap of 10.
        assert_eq!(module.current_speed(30, &data), 10.0);
        assert!(module.current_speed(3, &data) < module.current_speed(4, &data));
    }
}
