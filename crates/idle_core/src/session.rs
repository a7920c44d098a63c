//! A running game: the engine's single entry point for hosts.
//!
//! [`Session`] owns every engine component and exposes the step, mutation
//! and query entry points. Everything is constructed explicitly and passed
//! in; there is no global state.
//!
//! # Example
//!
//! ```
//! use idle_core::prelude::*;
//!
//! let catalog = BuildingCatalog::new(GameData {
//!     buildings: vec![BuildingConfig::new("farm", 10.0, 1.1, 1.0, 1.05)],
//!     prestige_bonuses: vec![],
//! })
//! .unwrap();
//!
//! let mut session = Session::start(
//!     catalog,
//!     EngineConfig::default(),
//!     Box::new(MemoryStore::new()),
//!     1_700_000_000,
//! )
//! .unwrap();
//!
//! session.unlock_building("farm").unwrap();
//! session.upgrade_building("farm").unwrap();
//! session.step(1.0);
//! assert_eq!(session.data("farm").unwrap().level, 2);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::buildings::{BuildingData, BuildingInstance};
use crate::catalog::BuildingCatalog;
use crate::clock::ProgressionClock;
use crate::data::{EngineConfig, PrestigeBonus};
use crate::error::{GameError, Result};
use crate::events::{
    BuildingUpgraded, GoldChanged, HonorChanged, ModuleActivated, Signal, SubscriptionId,
};
use crate::ledger::ResourceLedger;
use crate::modules::{ActivationOutcome, ModuleData};
use crate::offline::{OfflineReconciler, OfflineReport};
use crate::prestige::{PrestigeController, PrestigeOutcome, PrestigeState};
use crate::snapshot::{Persistence, Snapshot};

/// Log a failed mutation and hand the result back.
fn warn_on_err<T>(operation: &str, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        tracing::warn!(operation, error = %e, "Operation rejected");
    }
    result
}

/// A loaded game, ready to be stepped.
pub struct Session {
    catalog: BuildingCatalog,
    config: EngineConfig,
    ledger: ResourceLedger,
    buildings: Vec<BuildingInstance>,
    clock: ProgressionClock,
    prestige: PrestigeController,
    persistence: Box<dyn Persistence>,
    offline_report: OfflineReport,
    troop_value: f64,
    started_at: u64,
    building_upgraded: Signal<BuildingUpgraded>,
    module_activated: Signal<ModuleActivated>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("ledger", &self.ledger)
            .field("buildings", &self.buildings.len())
            .field("clock", &self.clock)
            .field("prestige", &self.prestige)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Load (or create) a game and bring it up to date.
    ///
    /// `now` is the current unix time in seconds. A failed load falls back
    /// to a new game. Saved buildings are matched to the catalog by ID:
    /// missing ones are added locked, unknown ones are dropped. Offline
    /// income since the last checkpoint is credited once, and the
    /// checkpoint moves to `now`.
    pub fn start(
        catalog: BuildingCatalog,
        config: EngineConfig,
        mut persistence: Box<dyn Persistence>,
        now: u64,
    ) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(GameError::InvalidData(errors));
        }

        let snapshot = match persistence.load() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::info!("No saved game, starting fresh");
                Snapshot::new_game(&catalog, config.starting_gold)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load saved game, starting fresh");
                Snapshot::new_game(&catalog, config.starting_gold)
            }
        };

        let mut ledger = ResourceLedger::from_snapshot(&snapshot);
        ledger.set_passive_income_per_second(config.passive_income_per_second);
        let buildings = bind_buildings(&catalog, snapshot.buildings.clone())?;

        let reconciler = OfflineReconciler::new(config.offline_cap_secs);
        let offline_report = reconciler.reconcile(
            snapshot.last_checkpoint_time,
            now,
            buildings.iter().map(|b| (b.config(), b.data())),
            ledger.multipliers().offline_earnings,
        );
        if offline_report.income > 0.0 {
            ledger.add_gold(offline_report.income);
        }

        let prestige = PrestigeController::new(config.prestige, snapshot.total_prestiges);

        let mut session = Self {
            catalog,
            config,
            ledger,
            buildings,
            clock: ProgressionClock::new(),
            prestige,
            persistence,
            offline_report,
            troop_value: 0.0,
            started_at: now,
            building_upgraded: Signal::new(),
            module_activated: Signal::new(),
        };
        session.refresh_prestige();

        tracing::info!(
            buildings = session.buildings.len(),
            gold = session.ledger.gold(),
            prestiges = session.prestige.prestige_count(),
            offline_secs = offline_report.elapsed_secs,
            offline_income = offline_report.income,
            "Session started"
        );

        session.persist();
        Ok(session)
    }

    // -- Step ---------------------------------------------------------------

    /// Advance the engine by `dt` seconds.
    ///
    /// Runs a pending prestige once its confirmation window has closed.
    /// Never fails: an invalid `dt` is logged and skipped.
    pub fn step(&mut self, dt: f64) {
        if !self.clock.step(dt, &mut self.buildings, &mut self.ledger) {
            return;
        }
        if self.prestige.is_due(self.clock.elapsed()) {
            self.run_prestige();
        }
    }

    // -- Mutations ----------------------------------------------------------

    /// Buy the next level of an unlocked building. Returns the new level.
    pub fn upgrade_building(&mut self, building_id: &str) -> Result<u32> {
        let result = self.try_upgrade(building_id);
        warn_on_err("upgrade_building", result)
    }

    fn try_upgrade(&mut self, building_id: &str) -> Result<u32> {
        let price = self.upgrade_price(building_id)?;
        let index = self.index_of(building_id)?;
        if !self.buildings[index].is_unlocked() {
            return Err(GameError::BuildingLocked(building_id.to_string()));
        }
        if !self.ledger.spend_gold(price) {
            return Err(GameError::InsufficientFunds {
                required: price,
                available: self.ledger.gold(),
            });
        }

        let building = &mut self.buildings[index];
        let new_level = building.level().saturating_add(1);
        building.set_level(new_level);
        tracing::info!(building = building_id, new_level, price, "Building upgraded");

        self.building_upgraded.emit(&BuildingUpgraded {
            building_id: building_id.to_string(),
            new_level,
        });
        self.refresh_prestige();
        self.persist();
        Ok(new_level)
    }

    /// Pay the unlock cost of a locked building.
    pub fn unlock_building(&mut self, building_id: &str) -> Result<()> {
        let result = self.try_unlock(building_id);
        warn_on_err("unlock_building", result)
    }

    fn try_unlock(&mut self, building_id: &str) -> Result<()> {
        let index = self.index_of(building_id)?;
        let building = &self.buildings[index];
        if building.is_unlocked() {
            return Err(GameError::AlreadyUnlocked(building_id.to_string()));
        }
        let cost = building.data().unlock_cost;
        if !self.ledger.spend_gold(cost) {
            return Err(GameError::InsufficientFunds {
                required: cost,
                available: self.ledger.gold(),
            });
        }

        let building = &mut self.buildings[index];
        let old_level = building.level();
        building.unlock();
        let new_level = building.level();
        tracing::info!(building = building_id, cost, "Building unlocked");

        if new_level != old_level {
            self.building_upgraded.emit(&BuildingUpgraded {
                building_id: building_id.to_string(),
                new_level,
            });
        }
        self.refresh_prestige();
        self.persist();
        Ok(())
    }

    /// Trigger a module's user action.
    pub fn activate_module(
        &mut self,
        building_id: &str,
        module_name: &str,
    ) -> Result<ActivationOutcome> {
        let result = self.index_of(building_id).and_then(|index| {
            self.buildings[index].activate(module_name, &mut self.ledger)
        });
        let outcome = warn_on_err("activate_module", result)?;

        tracing::debug!(building = building_id, module = module_name, ?outcome, "Module activated");
        if outcome.changed_state() {
            self.module_activated.emit(&ModuleActivated {
                building_id: building_id.to_string(),
                module_name: module_name.to_string(),
            });
        }
        Ok(outcome)
    }

    /// Prestige right now with exactly `selected_bonus_ids`.
    ///
    /// Unknown or not-yet-available bonuses are logged and skipped. Returns
    /// `Ok(None)` when the threshold is not met.
    pub fn prestige(&mut self, selected_bonus_ids: &[&str]) -> Result<Option<PrestigeOutcome>> {
        self.prestige.clear_selection();
        for bonus_id in selected_bonus_ids {
            if let Err(e) = self.prestige.select_bonus(&self.catalog, bonus_id) {
                tracing::warn!(bonus = bonus_id, error = %e, "Skipping prestige bonus");
            }
        }
        Ok(self.run_prestige())
    }

    /// Open the prestige confirmation window. Returns the deadline on the
    /// session clock.
    pub fn request_prestige(&mut self) -> Result<f64> {
        let total = self.total_earnings();
        let result = self.prestige.request(self.clock.elapsed(), total);
        warn_on_err("request_prestige", result)
    }

    /// Execute a pending prestige without waiting for the deadline.
    pub fn confirm_prestige(&mut self) -> Result<Option<PrestigeOutcome>> {
        if !matches!(self.prestige.state(), PrestigeState::ConfirmPending { .. }) {
            return warn_on_err(
                "confirm_prestige",
                Err(GameError::InvalidState("No prestige pending".to_string())),
            );
        }
        Ok(self.run_prestige())
    }

    /// Abort a pending prestige. Returns `false` if none was pending.
    pub fn cancel_prestige(&mut self) -> bool {
        let total = self.total_earnings();
        self.prestige.cancel(total)
    }

    /// Choose a bonus for the next prestige.
    pub fn select_bonus(&mut self, bonus_id: &str) -> Result<bool> {
        let result = self.prestige.select_bonus(&self.catalog, bonus_id);
        warn_on_err("select_bonus", result)
    }

    /// Drop a chosen bonus.
    pub fn deselect_bonus(&mut self, bonus_id: &str) -> bool {
        self.prestige.deselect_bonus(bonus_id)
    }

    /// Add to the samurai counter.
    pub fn add_samurai(&mut self, count: u32) {
        self.ledger.add_samurai(count);
    }

    /// Add to the peasant counter.
    pub fn add_peasants(&mut self, count: u32) {
        self.ledger.add_peasants(count);
    }

    /// Set the troop contribution to total earnings.
    pub fn set_troop_value(&mut self, value: f64) {
        if value.is_finite() {
            self.troop_value = value.max(0.0);
            self.refresh_prestige();
        } else {
            tracing::warn!(value, "Ignoring non-finite troop value");
        }
    }

    fn run_prestige(&mut self) -> Option<PrestigeOutcome> {
        let total = self.total_earnings();
        let outcome = self.prestige.execute(
            total,
            &self.catalog,
            &mut self.ledger,
            &mut self.buildings,
        );
        if outcome.is_some() {
            self.troop_value = 0.0;
            self.refresh_prestige();
            self.persist();
        }
        outcome
    }

    fn refresh_prestige(&mut self) {
        let total = self.total_earnings();
        self.prestige.refresh(total);
    }

    // -- Queries ------------------------------------------------------------

    /// Catalog upgrade cost at the building's current level.
    pub fn cost(&self, building_id: &str) -> Result<f64> {
        Ok(self.building(building_id)?.cost())
    }

    /// Price actually charged by [`Session::upgrade_building`], after the
    /// capped cost reduction.
    pub fn upgrade_price(&self, building_id: &str) -> Result<f64> {
        let reduction = self
            .ledger
            .multipliers()
            .building_cost_reduction
            .clamp(0.0, self.config.max_cost_reduction);
        Ok(self.cost(building_id)? * (1.0 - reduction))
    }

    /// Catalog income per second at the building's current level.
    pub fn income(&self, building_id: &str) -> Result<f64> {
        Ok(self.building(building_id)?.income())
    }

    /// Persisted state of a building.
    pub fn data(&self, building_id: &str) -> Result<&BuildingData> {
        Ok(self.building(building_id)?.data())
    }

    /// State of one module.
    pub fn module_data(&self, building_id: &str, module_name: &str) -> Result<&ModuleData> {
        self.building(building_id)?
            .module_data(module_name)
            .ok_or_else(|| GameError::UnknownModule {
                building: building_id.to_string(),
                module: module_name.to_string(),
            })
    }

    /// Status line of every module on a building.
    pub fn module_statuses(&self, building_id: &str) -> Result<Vec<String>> {
        let income_multiplier = self.ledger.multipliers().global_income;
        Ok(self
            .building(building_id)?
            .module_statuses(income_multiplier))
    }

    /// Whether a prestige is possible right now.
    #[must_use]
    pub fn can_prestige(&self) -> bool {
        self.prestige.can_prestige(self.total_earnings())
    }

    /// Honor a prestige would grant right now.
    #[must_use]
    pub fn honor_gain(&self) -> f64 {
        self.prestige.honor_gain(self.total_earnings())
    }

    /// Earnings counted towards the prestige threshold.
    #[must_use]
    pub fn total_earnings(&self) -> f64 {
        self.prestige
            .total_earnings(self.buildings.iter().map(BuildingInstance::data), self.troop_value)
    }

    /// Bonuses the next prestige may apply.
    #[must_use]
    pub fn available_bonuses(&self) -> Vec<&PrestigeBonus> {
        self.prestige.available_bonuses(&self.catalog).collect()
    }

    /// Prestige state machine.
    #[must_use]
    pub const fn prestige_controller(&self) -> &PrestigeController {
        &self.prestige
    }

    /// Currency balances and multipliers.
    #[must_use]
    pub const fn ledger(&self) -> &ResourceLedger {
        &self.ledger
    }

    /// Static game data.
    #[must_use]
    pub const fn catalog(&self) -> &BuildingCatalog {
        &self.catalog
    }

    /// Engine tuning.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Session clock.
    #[must_use]
    pub const fn clock(&self) -> &ProgressionClock {
        &self.clock
    }

    /// Buildings in catalog order.
    pub fn buildings(&self) -> impl Iterator<Item = &BuildingInstance> {
        self.buildings.iter()
    }

    /// Offline catch-up credited at start.
    #[must_use]
    pub const fn offline_report(&self) -> &OfflineReport {
        &self.offline_report
    }

    /// Current unix time in seconds: start time plus simulated time.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn now(&self) -> u64 {
        self.started_at
            .saturating_add(self.clock.elapsed().floor() as u64)
    }

    // -- Notifications ------------------------------------------------------

    /// Subscribe to gold changes.
    pub fn on_gold_changed(&mut self, callback: impl FnMut(&GoldChanged) + 'static) -> SubscriptionId {
        self.ledger.on_gold_changed(callback)
    }

    /// Subscribe to honor changes.
    pub fn on_honor_changed(
        &mut self,
        callback: impl FnMut(&HonorChanged) + 'static,
    ) -> SubscriptionId {
        self.ledger.on_honor_changed(callback)
    }

    /// Subscribe to building upgrades.
    pub fn on_building_upgraded(
        &mut self,
        callback: impl FnMut(&BuildingUpgraded) + 'static,
    ) -> SubscriptionId {
        self.building_upgraded.subscribe(callback)
    }

    /// Subscribe to module activations.
    pub fn on_module_activated(
        &mut self,
        callback: impl FnMut(&ModuleActivated) + 'static,
    ) -> SubscriptionId {
        self.module_activated.subscribe(callback)
    }

    // -- Persistence --------------------------------------------------------

    /// Capture the current state. The checkpoint is [`Session::now`].
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut snapshot = Snapshot::new_game(&self.catalog, self.ledger.gold());
        snapshot.honor = self.ledger.honor();
        snapshot.samurai = self.ledger.samurai();
        snapshot.peasants = self.ledger.peasants();
        snapshot.buildings = self.buildings.iter().map(|b| b.data().clone()).collect();
        snapshot.last_checkpoint_time = Some(self.now());
        snapshot.total_prestiges = self.prestige.prestige_count();
        snapshot.set_multipliers(self.ledger.multipliers());
        snapshot
    }

    /// Save through the persistence collaborator.
    pub fn save(&mut self) -> Result<()> {
        let snapshot = self.snapshot();
        self.persistence.save(&snapshot)
    }

    fn persist(&mut self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to save game, continuing in memory");
        }
    }

    /// Hash of the persisted state, module state included, plus the step
    /// count, troop value and prestige progress.
    ///
    /// Two sessions fed the same inputs produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.clock.step_count().hash(&mut hasher);

        let snapshot = self.snapshot();
        snapshot.gold.to_bits().hash(&mut hasher);
        snapshot.honor.to_bits().hash(&mut hasher);
        snapshot.samurai.hash(&mut hasher);
        snapshot.peasants.hash(&mut hasher);
        snapshot.total_prestiges.hash(&mut hasher);
        snapshot.global_income_multiplier.to_bits().hash(&mut hasher);
        snapshot.building_cost_reduction.to_bits().hash(&mut hasher);
        snapshot.offline_earnings_multiplier.to_bits().hash(&mut hasher);
        snapshot.extra_troop_capacity.hash(&mut hasher);
        snapshot.troop_training_speed_multiplier.to_bits().hash(&mut hasher);
        snapshot.auto_train_speed_multiplier.to_bits().hash(&mut hasher);
        self.troop_value.to_bits().hash(&mut hasher);

        match self.prestige.state() {
            PrestigeState::Idle => 0u8.hash(&mut hasher),
            PrestigeState::Eligible => 1u8.hash(&mut hasher),
            PrestigeState::ConfirmPending { deadline } => {
                2u8.hash(&mut hasher);
                deadline.to_bits().hash(&mut hasher);
            }
            PrestigeState::Resetting => 3u8.hash(&mut hasher),
        }
        for bonus_id in self.prestige.selected_bonuses() {
            bonus_id.hash(&mut hasher);
        }

        for building in &snapshot.buildings {
            building.id.hash(&mut hasher);
            building.level.hash(&mut hasher);
            building.is_unlocked.hash(&mut hasher);
            for module in &building.modules {
                module.key.hash(&mut hasher);
                module.level.hash(&mut hasher);
                module.unlocked.hash(&mut hasher);
                module.state.hash_into(&mut hasher);
            }
        }

        hasher.finish()
    }

    // -- Helpers ------------------------------------------------------------

    fn index_of(&self, building_id: &str) -> Result<usize> {
        self.buildings
            .iter()
            .position(|b| b.id() == building_id)
            .ok_or_else(|| GameError::UnknownBuilding(building_id.to_string()))
    }

    fn building(&self, building_id: &str) -> Result<&BuildingInstance> {
        self.index_of(building_id).map(|index| &self.buildings[index])
    }
}

/// Pair saved building state with the catalog, in catalog order.
fn bind_buildings(
    catalog: &BuildingCatalog,
    saved: Vec<BuildingData>,
) -> Result<Vec<BuildingInstance>> {
    let mut by_id: HashMap<String, BuildingData> =
        saved.into_iter().map(|data| (data.id.clone(), data)).collect();

    let instances = catalog
        .buildings()
        .map(|config| {
            let data = by_id.remove(&config.id).unwrap_or_else(|| {
                tracing::info!(building = %config.id, "Adding building missing from save");
                BuildingData::new_locked(config)
            });
            BuildingInstance::new(config.clone(), data)
        })
        .collect::<Result<Vec<_>>>()?;

    for id in by_id.keys() {
        tracing::warn!(building = %id, "Dropping saved building not in catalog");
    }
    Ok(instances)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::data::{BonusEffect, BuildingConfig, GameData};
    use crate::modules::{CapacityModule, IncomeModule, ModuleTemplate, SpeedModule};
    use crate::snapshot::MemoryStore;

    const T0: u64 = 1_700_000_000;

    fn catalog() -> BuildingCatalog {
        BuildingCatalog::new(GameData {
            buildings: vec![
                BuildingConfig::new("rice_field", 100.0, 1.15, 2.0, 1.1)
                    .with_modules(2, vec![
                        ModuleTemplate::Income(IncomeModule::new("harvest")),
                        ModuleTemplate::Capacity(CapacityModule::new("farmers", 1, 1, 50.0, 1.2)),
                    ]),
                BuildingConfig::new("dojo", 1_000.0, 1.2, 0.0, 1.1)
                    .with_unlock_cost(400.0)
                    .with_modules(1, vec![ModuleTemplate::Speed(SpeedModule::new(
                        "drills", 1.0, 1.05, 3.0,
                    ))]),
            ],
            prestige_bonuses: vec![PrestigeBonus::new(
                "bushido",
                BonusEffect::CostReduction,
                0.5,
            )],
        })
        .unwrap()
    }

    fn start(store: MemoryStore, now: u64) -> Session {
        Session::start(catalog(), EngineConfig::default(), Box::new(store), now).unwrap()
    }

    #[test]
    fn test_new_game() {
        let session = start(MemoryStore::new(), T0);
        assert_eq!(session.ledger().gold(), 1_000.0);
        assert_eq!(session.buildings().count(), 2);
        assert!(session.buildings().all(|b| !b.is_unlocked() && b.level() == 0));
        assert_eq!(session.offline_report().income, 0.0);
        assert!(!session.can_prestige());
    }

    #[test]
    fn test_unlock_then_upgrade() {
        let mut session = start(MemoryStore::new(), T0);
        assert!(matches!(
            session.upgrade_building("rice_field"),
            Err(GameError::BuildingLocked(_))
        ));

        session.unlock_building("rice_field").unwrap();
        assert_eq!(session.data("rice_field").unwrap().level, 1);
        assert!(matches!(
            session.unlock_building("rice_field"),
            Err(GameError::AlreadyUnlocked(_))
        ));

        let price = session.cost("rice_field").unwrap();
        assert!((price - 115.0).abs() < 1e-9);
        assert_eq!(session.upgrade_building("rice_field").unwrap(), 2);
        assert!((session.ledger().gold() - 885.0).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_funds() {
        let mut session = start(MemoryStore::new(), T0);
        session.unlock_building("dojo").unwrap();
        assert!((session.ledger().gold() - 600.0).abs() < 1e-9);
        assert!(matches!(
            session.upgrade_building("dojo"),
            Err(GameError::InsufficientFunds { .. })
        ));
        assert!((session.ledger().gold() - 600.0).abs() < 1e-9);
        assert_eq!(session.data("dojo").unwrap().level, 1);
    }

    #[test]
    fn test_unknown_ids_are_rejected() {
        let mut session = start(MemoryStore::new(), T0);
        assert!(matches!(
            session.upgrade_building("pagoda"),
            Err(GameError::UnknownBuilding(_))
        ));
        assert!(session.cost("pagoda").is_err());
        session.unlock_building("rice_field").unwrap();
        assert!(matches!(
            session.activate_module("rice_field", "fishing"),
            Err(GameError::UnknownModule { .. })
        ));
        // The session keeps stepping after a rejected call.
        session.step(1.0);
        assert_eq!(session.clock().step_count(), 1);
    }

    #[test]
    fn test_step_generates_income() {
        let mut session = start(MemoryStore::new(), T0);
        session.unlock_building("rice_field").unwrap();
        let before = session.ledger().gold();
        for _ in 0..10 {
            session.step(1.0);
        }
        // level 1: 2 × 1.1 = 2.2 gold/s
        assert!((session.ledger().gold() - before - 22.0).abs() < 1e-9);
        assert_eq!(session.now(), T0 + 10);
    }

    #[test]
    fn test_notifications() {
        let mut session = start(MemoryStore::new(), T0);
        let upgrades = Rc::new(RefCell::new(Vec::new()));
        let activations = Rc::new(RefCell::new(Vec::new()));
        let u = upgrades.clone();
        let a = activations.clone();
        session.on_building_upgraded(move |e| u.borrow_mut().push(e.new_level));
        session.on_module_activated(move |e| a.borrow_mut().push(e.module_name.clone()));

        session.unlock_building("rice_field").unwrap();
        session.upgrade_building("rice_field").unwrap();
        let outcome = session.activate_module("rice_field", "farmers").unwrap();

        assert_eq!(*upgrades.borrow(), vec![1, 2]);
        assert_eq!(*activations.borrow(), vec!["farmers".to_string()]);
        assert!(matches!(outcome, ActivationOutcome::WorkerHired { workers: 1, .. }));
    }

    #[test]
    fn test_reload_with_offline_income() {
        let mut session = start(MemoryStore::new(), T0);
        session.unlock_building("rice_field").unwrap();
        let snapshot = session.snapshot();
        let gold = snapshot.gold;

        let reloaded = start(MemoryStore::with_snapshot(snapshot), T0 + 100);
        assert_eq!(reloaded.offline_report().elapsed_secs, 100);
        assert!((reloaded.ledger().gold() - gold - 220.0).abs() < 1e-6);
        assert_eq!(reloaded.data("rice_field").unwrap().level, 1);
    }

    #[test]
    fn test_reload_reconciles_catalog() {
        let mut snapshot = Snapshot::new_game(&catalog(), 10.0);
        snapshot.buildings.retain(|b| b.id != "dojo");
        snapshot.buildings.push(BuildingData {
            id: "castle".to_string(),
            level: 9,
            is_unlocked: true,
            unlock_cost: 0.0,
            modules: vec![],
        });

        let session = start(MemoryStore::with_snapshot(snapshot), T0);
        let ids: Vec<_> = session.buildings().map(BuildingInstance::id).collect();
        assert_eq!(ids, vec!["rice_field", "dojo"]);
        assert!(!session.data("dojo").unwrap().is_unlocked);
    }

    #[test]
    fn test_cost_reduction_is_capped() {
        let mut snapshot = Snapshot::new_game(&catalog(), 1_000.0);
        snapshot.building_cost_reduction = 5.0;
        let mut session = start(MemoryStore::with_snapshot(snapshot), T0);
        session.unlock_building("rice_field").unwrap();
        let price = session.upgrade_price("rice_field").unwrap();
        assert!((price - 11.5).abs() < 1e-9);
    }

    #[test]
    fn test_two_phase_prestige() {
        let mut session = start(MemoryStore::new(), T0);
        session.unlock_building("rice_field").unwrap();
        session.set_troop_value(9_000.0);
        assert!(session.can_prestige());

        let deadline = session.request_prestige().unwrap();
        assert_eq!(deadline, 3.0);
        session.step(2.0);
        assert_eq!(session.prestige_controller().prestige_count(), 0);

        assert!(session.cancel_prestige());
        session.request_prestige().unwrap();
        session.step(2.0);
        session.step(2.0);
        assert_eq!(session.prestige_controller().prestige_count(), 1);
        assert_eq!(session.ledger().gold(), 1_000.0);
        assert!(session.buildings().all(|b| b.is_unlocked() && b.level() == 1));
    }

    #[test]
    fn test_confirm_requires_pending() {
        let mut session = start(MemoryStore::new(), T0);
        assert!(matches!(
            session.confirm_prestige(),
            Err(GameError::InvalidState(_))
        ));
    }

    #[test]
    fn test_immediate_prestige_applies_bonus() {
        let mut session = start(MemoryStore::new(), T0);
        assert_eq!(session.prestige(&["bushido"]).unwrap(), None);

        session.set_troop_value(10_000.0);
        let honor_before = session.ledger().honor();
        let gain = session.honor_gain();
        let outcome = session.prestige(&["bushido", "missing"]).unwrap().unwrap();

        assert_eq!(outcome.applied_bonuses, vec!["bushido".to_string()]);
        assert_eq!(session.ledger().honor(), honor_before + gain);
        assert_eq!(session.ledger().multipliers().building_cost_reduction, 0.5);
        assert!(!session.can_prestige());
    }

    #[test]
    fn test_snapshot_reflects_mutations() {
        let mut session = start(MemoryStore::new(), T0);
        session.unlock_building("rice_field").unwrap();
        session.upgrade_building("rice_field").unwrap();
        let saved = session.snapshot();
        assert_eq!(saved.building("rice_field").unwrap().level, 2);
        assert_eq!(saved.last_checkpoint_time, Some(T0));
    }

    #[test]
    fn test_state_hash_tracks_state() {
        let mut a = start(MemoryStore::new(), T0);
        let mut b = start(MemoryStore::new(), T0);
        assert_eq!(a.state_hash(), b.state_hash());

        a.unlock_building("rice_field").unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
        b.unlock_building("rice_field").unwrap();
        a.step(0.5);
        b.step(0.5);
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_state_hash_covers_module_state() {
        let mut a = start(MemoryStore::new(), T0);
        let mut b = start(MemoryStore::new(), T0);
        a.unlock_building("rice_field").unwrap();
        b.unlock_building("rice_field").unwrap();

        a.activate_module("rice_field", "harvest").unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
        b.activate_module("rice_field", "harvest").unwrap();
        assert_eq!(a.state_hash(), b.state_hash());

        // Switched back on, both stay short of a payout; only the timers differ.
        a.activate_module("rice_field", "harvest").unwrap();
        b.activate_module("rice_field", "harvest").unwrap();
        a.step(0.3);
        b.step(0.6);
        assert_eq!(a.ledger().gold(), b.ledger().gold());
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_state_hash_covers_troops_and_prestige() {
        let mut a = start(MemoryStore::new(), T0);
        let mut b = start(MemoryStore::new(), T0);

        a.set_troop_value(10_000.0);
        assert_ne!(a.state_hash(), b.state_hash());
        b.set_troop_value(10_000.0);
        assert_eq!(a.state_hash(), b.state_hash());

        a.select_bonus("bushido").unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
        b.select_bonus("bushido").unwrap();
        assert_eq!(a.state_hash(), b.state_hash());

        a.request_prestige().unwrap();
        assert_ne!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_refused_activation_is_not_notified() {
        fn record(session: &mut Session) -> Rc<RefCell<Vec<String>>> {
            let log = Rc::new(RefCell::new(Vec::new()));
            let sink = log.clone();
            session.on_module_activated(move |e| sink.borrow_mut().push(e.module_name.clone()));
            log
        }

        let mut session = start(MemoryStore::new(), T0);
        let activations = record(&mut session);
        session.unlock_building("dojo").unwrap();
        assert!(matches!(
            session.activate_module("dojo", "drills").unwrap(),
            ActivationOutcome::BoostStarted { .. }
        ));
        assert!(matches!(
            session.activate_module("dojo", "drills").unwrap(),
            ActivationOutcome::AlreadyBoosted { .. }
        ));
        assert_eq!(*activations.borrow(), vec!["drills".to_string()]);

        let poor = Snapshot::new_game(&catalog(), 10.0);
        let mut session = start(MemoryStore::with_snapshot(poor), T0);
        let activations = record(&mut session);
        session.unlock_building("rice_field").unwrap();
        assert!(matches!(
            session.activate_module("rice_field", "farmers").unwrap(),
            ActivationOutcome::InsufficientFunds { .. }
        ));
        assert!(activations.borrow().is_empty());
        assert_eq!(session.ledger().gold(), 10.0);
    }
}
