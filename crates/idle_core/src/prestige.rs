//! Prestige: trading progress for honor and permanent bonuses.
//!
//! # State machine
//!
//! ```text
//! Idle <-> Eligible -> ConfirmPending { deadline } -> Resetting -> Idle
//!                            |
//!                            +-- cancel --> Idle / Eligible
//! ```
//!
//! A request starts a confirmation window measured on the progression
//! clock. The session executes the reset when the window closes, or right
//! away on explicit confirmation. Executing while ineligible is a guarded
//! no-op.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::buildings::{BuildingData, BuildingInstance};
use crate::catalog::BuildingCatalog;
use crate::data::{PrestigeBonus, PrestigeConfig};
use crate::error::{GameError, Result};
use crate::ledger::ResourceLedger;

/// Where the controller is in the prestige cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PrestigeState {
    /// Threshold not reached.
    Idle,
    /// Threshold reached, nothing requested yet.
    Eligible,
    /// Waiting for the confirmation window to close.
    ConfirmPending {
        /// Clock time (seconds) at which the reset runs.
        deadline: f64,
    },
    /// Reset in progress.
    Resetting,
}

/// What a completed prestige did.
#[derive(Debug, Clone, PartialEq)]
pub struct PrestigeOutcome {
    /// Honor credited.
    pub honor_gained: f64,
    /// Prestige count after the reset.
    pub prestige_count: u32,
    /// Gold balance after the reset.
    pub starting_gold: f64,
    /// Bonuses that were applied, by ID.
    pub applied_bonuses: Vec<String>,
}

/// Eligibility, rewards and reset of the prestige cycle.
#[derive(Debug, Clone)]
pub struct PrestigeController {
    config: PrestigeConfig,
    prestige_count: u32,
    state: PrestigeState,
    selected: BTreeSet<String>,
}

impl PrestigeController {
    /// Controller resuming at `prestige_count` completed prestiges.
    #[must_use]
    pub fn new(config: PrestigeConfig, prestige_count: u32) -> Self {
        Self {
            config,
            prestige_count,
            state: PrestigeState::Idle,
            selected: BTreeSet::new(),
        }
    }

    /// Tuning in use.
    #[must_use]
    pub const fn config(&self) -> &PrestigeConfig {
        &self.config
    }

    /// Completed prestiges.
    #[must_use]
    pub const fn prestige_count(&self) -> u32 {
        self.prestige_count
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> PrestigeState {
        self.state
    }

    /// Bonus IDs chosen for the next prestige, sorted.
    pub fn selected_bonuses(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// `earnings_per_level × level` over unlocked buildings, plus troop value.
    pub fn total_earnings<'a>(
        &self,
        buildings: impl IntoIterator<Item = &'a BuildingData>,
        troop_value: f64,
    ) -> f64 {
        let from_buildings: f64 = buildings
            .into_iter()
            .map(|b| b.earnings(self.config.earnings_per_level))
            .sum();
        from_buildings + troop_value.max(0.0)
    }

    /// `min_threshold × threshold_growth^prestige_count`.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.config.min_threshold
            * self
                .config
                .threshold_growth
                .powf(f64::from(self.prestige_count))
    }

    /// Whether `total_earnings` meets the current threshold.
    #[must_use]
    pub fn can_prestige(&self, total_earnings: f64) -> bool {
        total_earnings >= self.threshold()
    }

    /// `floor(total × base_honor_multiplier × honor_growth_rate^prestige_count)`.
    #[must_use]
    pub fn honor_gain(&self, total_earnings: f64) -> f64 {
        (total_earnings
            * self.config.base_honor_multiplier
            * self
                .config
                .honor_growth_rate
                .powf(f64::from(self.prestige_count)))
        .floor()
    }

    /// Gold granted by the next prestige: `starting_gold_base × starting_gold_growth^prestige_count`.
    #[must_use]
    pub fn starting_gold(&self) -> f64 {
        self.config.starting_gold_base
            * self
                .config
                .starting_gold_growth
                .powf(f64::from(self.prestige_count))
    }

    /// Bonuses that the next prestige may apply.
    pub fn available_bonuses<'a>(
        &self,
        catalog: &'a BuildingCatalog,
    ) -> impl Iterator<Item = &'a PrestigeBonus> {
        catalog.available_bonuses(self.prestige_count.saturating_add(1))
    }

    /// Re-evaluate `Idle`/`Eligible` against current earnings.
    ///
    /// Pending and resetting states are left alone.
    pub fn refresh(&mut self, total_earnings: f64) {
        match self.state {
            PrestigeState::Idle | PrestigeState::Eligible => {
                self.state = if self.can_prestige(total_earnings) {
                    PrestigeState::Eligible
                } else {
                    PrestigeState::Idle
                };
            }
            PrestigeState::ConfirmPending { .. } | PrestigeState::Resetting => {}
        }
    }

    /// Choose a bonus for the next prestige. Returns `false` if already chosen.
    pub fn select_bonus(&mut self, catalog: &BuildingCatalog, bonus_id: &str) -> Result<bool> {
        let bonus = catalog
            .bonus(bonus_id)
            .ok_or_else(|| GameError::UnknownBonus(bonus_id.to_string()))?;
        if !bonus.is_available_at(self.prestige_count.saturating_add(1)) {
            return Err(GameError::InvalidState(format!(
                "Prestige bonus '{bonus_id}' requires {} completed prestiges",
                bonus.required_prestige_count
            )));
        }
        Ok(self.selected.insert(bonus_id.to_string()))
    }

    /// Drop a chosen bonus. Returns `false` if it was not chosen.
    pub fn deselect_bonus(&mut self, bonus_id: &str) -> bool {
        self.selected.remove(bonus_id)
    }

    /// Drop every chosen bonus.
    pub fn clear_selection(&mut self) {
        self.selected.clear();
    }

    /// Open the confirmation window at clock time `now`.
    ///
    /// A second request while pending keeps the first deadline.
    pub fn request(&mut self, now: f64, total_earnings: f64) -> Result<f64> {
        if let PrestigeState::ConfirmPending { deadline } = self.state {
            return Ok(deadline);
        }
        if !self.can_prestige(total_earnings) {
            return Err(GameError::PrestigeNotEligible {
                earnings: total_earnings,
                threshold: self.threshold(),
            });
        }
        let deadline = now + self.config.confirm_delay_secs.max(0.0);
        self.state = PrestigeState::ConfirmPending { deadline };
        tracing::info!(deadline, "Prestige requested");
        Ok(deadline)
    }

    /// Abort a pending prestige. Returns `false` if nothing was pending.
    pub fn cancel(&mut self, total_earnings: f64) -> bool {
        if !matches!(self.state, PrestigeState::ConfirmPending { .. }) {
            return false;
        }
        self.state = PrestigeState::Idle;
        self.refresh(total_earnings);
        tracing::info!("Prestige cancelled");
        true
    }

    /// Whether a pending prestige has reached its deadline.
    #[must_use]
    pub fn is_due(&self, now: f64) -> bool {
        matches!(self.state, PrestigeState::ConfirmPending { deadline } if now >= deadline)
    }

    /// Perform the reset.
    ///
    /// Returns `None` without touching anything when `total_earnings` is
    /// below the threshold. Otherwise credits honor, bumps the prestige
    /// count, applies the selected bonuses that are unlocked at the new
    /// count, resets gold and troop counters, and sets every building to
    /// level 1, unlocked. Module state survives. The selection is cleared.
    pub fn execute(
        &mut self,
        total_earnings: f64,
        catalog: &BuildingCatalog,
        ledger: &mut ResourceLedger,
        buildings: &mut [BuildingInstance],
    ) -> Option<PrestigeOutcome> {
        if !self.can_prestige(total_earnings) {
            tracing::warn!(
                earnings = total_earnings,
                threshold = self.threshold(),
                "Prestige not eligible, ignoring"
            );
            if matches!(self.state, PrestigeState::ConfirmPending { .. }) {
                self.state = PrestigeState::Idle;
            }
            self.refresh(total_earnings);
            return None;
        }

        self.state = PrestigeState::Resetting;

        let honor_gained = self.honor_gain(total_earnings);
        let starting_gold = self.starting_gold();
        ledger.add_honor(honor_gained);
        self.prestige_count += 1;

        let mut applied_bonuses = Vec::new();
        for bonus_id in std::mem::take(&mut self.selected) {
            match catalog.bonus(&bonus_id) {
                Some(bonus) if bonus.is_available_at(self.prestige_count) => {
                    ledger.apply_bonus(bonus.effect, bonus.magnitude);
                    applied_bonuses.push(bonus_id);
                }
                Some(_) => {
                    tracing::debug!(bonus = %bonus_id, "Bonus not yet available, skipping");
                }
                None => tracing::warn!(bonus = %bonus_id, "Unknown bonus selected, skipping"),
            }
        }

        ledger.reset_for_prestige(starting_gold);
        for building in buildings.iter_mut() {
            building.reset_for_prestige();
        }

        self.state = PrestigeState::Idle;
        tracing::info!(
            prestige_count = self.prestige_count,
            honor_gained,
            starting_gold,
            bonuses = applied_bonuses.len(),
            "Prestige complete"
        );

        Some(PrestigeOutcome {
            honor_gained,
            prestige_count: self.prestige_count,
            starting_gold,
            applied_bonuses,
        })
    }
}
