//! Runtime building state and the instance binding it to its configuration.
//!
//! [`BuildingData`] is the persisted half (level, unlock flag, module
//! state). [`BuildingInstance`] pairs it with the immutable
//! [`BuildingConfig`] and drives the building's modules.

use serde::{Deserialize, Serialize};

use crate::data::BuildingConfig;
use crate::error::{GameError, Result};
use crate::ledger::ResourceLedger;
use crate::modules::{ActivationOutcome, ModuleData, ModuleOwner, ModuleTemplate};

/// Mutable, persisted state of one building.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingData {
    /// Catalog ID this state belongs to.
    pub id: String,
    /// Current level.
    pub level: u32,
    /// Whether the building has been unlocked.
    pub is_unlocked: bool,
    /// Gold needed to unlock.
    pub unlock_cost: f64,
    /// Module state keyed by module kind and name.
    #[serde(default)]
    pub modules: Vec<ModuleData>,
}

impl BuildingData {
    /// Fresh state for a new game: locked, level 0.
    #[must_use]
    pub fn new_locked(config: &BuildingConfig) -> Self {
        Self {
            id: config.id.clone(),
            level: 0,
            is_unlocked: false,
            unlock_cost: config.unlock_cost,
            modules: Vec::new(),
        }
    }

    /// Earnings contribution used by the prestige threshold.
    #[must_use]
    pub fn earnings(&self, per_level: f64) -> f64 {
        if self.is_unlocked {
            f64::from(self.level) * per_level
        } else {
            0.0
        }
    }
}

/// A building at runtime: configuration, persisted state and modules.
///
/// Not persisted itself; rebuilt from its parts whenever the pairing
/// changes.
#[derive(Debug, Clone)]
pub struct BuildingInstance {
    config: BuildingConfig,
    data: BuildingData,
}

impl BuildingInstance {
    /// Bind a configuration to its persisted state.
    ///
    /// Module state is matched to the configuration's templates by key:
    /// existing entries are reused, missing ones are created with defaults.
    /// Entries whose template no longer exists are kept, untouched, after
    /// the live ones. Binding the same data twice is a no-op.
    pub fn new(config: BuildingConfig, mut data: BuildingData) -> Result<Self> {
        if config.id != data.id {
            return Err(GameError::InvalidState(format!(
                "Building data '{}' bound to config '{}'",
                data.id, config.id
            )));
        }
        if config.modules.len() > config.module_slots {
            return Err(GameError::ModuleSlotsExceeded {
                building: config.id,
                declared: config.modules.len(),
                slots: config.module_slots,
            });
        }

        let mut previous = std::mem::take(&mut data.modules);
        let mut modules = Vec::with_capacity(config.modules.len() + previous.len());

        for template in &config.modules {
            let behavior = template.behavior();
            let key = behavior.key();
            let mut module_data = match previous.iter().position(|m| m.key == key) {
                Some(index) => previous.remove(index),
                None => {
                    tracing::debug!(building = %config.id, module = %key, "Creating module data");
                    ModuleData {
                        level: data.level,
                        ..ModuleData::new(key, behavior.default_state())
                    }
                }
            };
            behavior.initialize(&mut module_data);
            modules.push(module_data);
        }

        if !previous.is_empty() {
            tracing::warn!(
                building = %config.id,
                orphaned = previous.len(),
                "Keeping module data with no matching template"
            );
        }
        modules.append(&mut previous);
        data.modules = modules;

        Ok(Self { config, data })
    }

    /// Building ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Immutable configuration.
    #[must_use]
    pub const fn config(&self) -> &BuildingConfig {
        &self.config
    }

    /// Persisted state.
    #[must_use]
    pub const fn data(&self) -> &BuildingData {
        &self.data
    }

    /// Consume the instance, returning its persisted state.
    #[must_use]
    pub fn into_data(self) -> BuildingData {
        self.data
    }

    /// Current level.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.data.level
    }

    /// Whether the building is unlocked.
    #[must_use]
    pub const fn is_unlocked(&self) -> bool {
        self.data.is_unlocked
    }

    /// Upgrade cost at the current level, before reductions.
    #[must_use]
    pub fn cost(&self) -> f64 {
        self.config.get_cost(self.data.level)
    }

    /// Income per second at the current level, before multipliers.
    #[must_use]
    pub fn income(&self) -> f64 {
        self.config.get_income(self.data.level)
    }

    /// Owner view plus live modules paired with their state, in declaration order.
    fn modules_mut(
        &mut self,
        income_multiplier: f64,
    ) -> (
        ModuleOwner<'_>,
        impl Iterator<Item = (&ModuleTemplate, &mut ModuleData)>,
    ) {
        let owner = ModuleOwner {
            building_id: &self.data.id,
            config: &self.config,
            level: self.data.level,
            income_multiplier,
        };
        let modules = self.config.modules.iter().zip(self.data.modules.iter_mut());
        (owner, modules)
    }

    /// Run every active module once, in declaration order.
    ///
    /// Locked buildings and locked modules are skipped.
    pub fn tick(&mut self, dt: f64, ledger: &mut ResourceLedger) {
        if !self.data.is_unlocked {
            return;
        }
        let (owner, modules) = self.modules_mut(ledger.multipliers().global_income);
        for (template, module_data) in modules {
            if module_data.unlocked {
                template.behavior().tick(&owner, module_data, ledger, dt);
            }
        }
    }

    /// Move to `new_level`, notifying every module.
    pub fn set_level(&mut self, new_level: u32) {
        let old_level = self.data.level;
        self.data.level = new_level;
        let (owner, modules) = self.modules_mut(1.0);
        for (template, module_data) in modules {
            template
                .behavior()
                .on_upgrade(&owner, module_data, old_level, new_level);
        }
    }

    /// Mark the building unlocked, raising it to at least level 1.
    pub fn unlock(&mut self) {
        self.data.is_unlocked = true;
        if self.data.level == 0 {
            self.set_level(1);
        }
    }

    /// Prestige reset: level 1 and unlocked. Module state is kept.
    pub fn reset_for_prestige(&mut self) {
        self.data.is_unlocked = true;
        self.set_level(1);
    }

    /// Trigger a module's user action.
    pub fn activate(
        &mut self,
        module_name: &str,
        ledger: &mut ResourceLedger,
    ) -> Result<ActivationOutcome> {
        if !self.data.is_unlocked {
            return Err(GameError::BuildingLocked(self.data.id.clone()));
        }
        let building = self.data.id.clone();
        let (owner, mut modules) = self.modules_mut(ledger.multipliers().global_income);
        let (template, module_data) = modules
            .find(|(t, _)| t.behavior().name() == module_name)
            .ok_or_else(|| GameError::UnknownModule {
                building,
                module: module_name.to_string(),
            })?;

        if !module_data.unlocked {
            return Ok(ActivationOutcome::Locked);
        }
        Ok(template.behavior().on_activate(&owner, module_data, ledger))
    }

    /// State of a live module by name.
    #[must_use]
    pub fn module_data(&self, module_name: &str) -> Option<&ModuleData> {
        self.config
            .modules
            .iter()
            .zip(&self.data.modules)
            .find(|(t, _)| t.behavior().name() == module_name)
            .map(|(_, d)| d)
    }

    /// Status line of every live module, in declaration order.
    #[must_use]
    pub fn module_statuses(&self, income_multiplier: f64) -> Vec<String> {
        let owner = ModuleOwner {
            building_id: &self.data.id,
            config: &self.config,
            level: self.data.level,
            income_multiplier,
        };
        self.config
            .modules
            .iter()
            .zip(&self.data.modules)
            .map(|(template, data)| template.behavior().status_description(&owner, data))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::{CapacityModule, IncomeModule, ModuleKey, ModuleKind, ModuleState, SpeedModule};

    fn castle() -> BuildingConfig {
        BuildingConfig::new("castle", 100.0, 1.15, 10.0, 1.1).with_modules(
            3,
            vec![
                ModuleTemplate::Income(IncomeModule::new("tribute")),
                ModuleTemplate::Speed(SpeedModule::new("couriers", 1.0, 1.05, 3.0)),
                ModuleTemplate::Capacity(CapacityModule::new("guards", 1, 1, 100.0, 1.2)),
            ],
        )
    }

    fn unlocked(config: &BuildingConfig, level: u32) -> BuildingData {
        BuildingData {
            is_unlocked: true,
            level,
            ..BuildingData::new_locked(config)
        }
    }

    #[test]
    fn test_creates_module_data_once() {
        let config = castle();
        let instance = BuildingInstance::new(config.clone(), unlocked(&config, 1)).unwrap();
        assert_eq!(instance.data().modules.len(), 3);

        // Rebinding the same data must not duplicate anything.
        let rebound = BuildingInstance::new(config, instance.into_data()).unwrap();
        assert_eq!(rebound.data().modules.len(), 3);
        assert_eq!(
            rebound.data().modules[0].key,
            ModuleKey::new(ModuleKind::Income, "tribute")
        );
    }

    #[test]
    fn test_rebinding_keeps_state() {
        let config = castle();
        let mut ledger = ResourceLedger::new(1_000.0);
        let mut instance = BuildingInstance::new(config.clone(), unlocked(&config, 1)).unwrap();
        instance.activate("guards", &mut ledger).unwrap();

        let mut data = instance.into_data();
        data.modules.reverse();
        let rebound = BuildingInstance::new(config, data).unwrap();

        let guards = rebound.module_data("guards").unwrap();
        assert_eq!(guards.state, ModuleState::Capacity { workers: 1 });
        assert_eq!(rebound.data().modules.len(), 3);
    }

    #[test]
    fn test_mismatched_id_rejected() {
        let config = castle();
        let other = BuildingConfig::new("hut", 1.0, 1.1, 1.0, 1.1);
        let data = BuildingData::new_locked(&other);
        assert!(BuildingInstance::new(config, data).is_err());
    }

    #[test]
    fn test_locked_building_does_not_tick() {
        let config = castle();
        let mut ledger = ResourceLedger::new(0.0);
        let mut instance =
            BuildingInstance::new(config.clone(), BuildingData::new_locked(&config)).unwrap();

        instance.tick(5.0, &mut ledger);
        assert_eq!(ledger.gold(), 0.0);
        assert!(matches!(
            instance.activate("tribute", &mut ledger),
            Err(GameError::BuildingLocked(_))
        ));

        instance.unlock();
        assert_eq!(instance.level(), 1);
        instance.tick(1.0, &mut ledger);
        assert!((ledger.gold() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_slot_limit_enforced() {
        let mut config = castle();
        config.module_slots = 2;
        let data = BuildingData::new_locked(&config);
        assert!(matches!(
            BuildingInstance::new(config, data),
            Err(GameError::ModuleSlotsExceeded { declared: 3, slots: 2, .. })
        ));
    }

    #[test]
    fn test_unknown_module() {
        let config = castle();
        let mut ledger = ResourceLedger::new(0.0);
        let mut instance = BuildingInstance::new(config.clone(), unlocked(&config, 1)).unwrap();
        assert!(matches!(
            instance.activate("moat", &mut ledger),
            Err(GameError::UnknownModule { .. })
        ));
    }

    #[test]
    fn test_set_level_notifies_modules() {
        let config = castle();
        let mut instance = BuildingInstance::new(config.clone(), unlocked(&config, 1)).unwrap();
        instance.set_level(4);
        assert!(instance.data().modules.iter().all(|m| m.level == 4));
        assert!(instance.module_statuses(1.0)[2].contains("0/5 workers"));
    }

    #[test]
    fn test_new_module_data_starts_at_building_level() {
        let config = castle();
        let mut data = unlocked(&config, 4);
        data.modules.clear();

        let instance = BuildingInstance::new(config.clone(), data).unwrap();
        assert!(instance.data().modules.iter().all(|m| m.level == 4));

        let locked = BuildingInstance::new(config.clone(), BuildingData::new_locked(&config)).unwrap();
        assert!(locked.data().modules.iter().all(|m| m.level == 0));
    }
}
