//! Hireable worker slots.

use serde::{Deserialize, Serialize};

use super::{ActivationOutcome, ModuleBehavior, ModuleData, ModuleKind, ModuleOwner, ModuleState};
use crate::ledger::ResourceLedger;

/// Worker slots that grow with building level and are filled by hiring.
///
/// Hire price grows geometrically with the number of workers already hired,
/// not with building level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapacityModule {
    /// Module name, unique per building.
    pub name: String,
    /// Slots at level 0.
    pub base_capacity: u32,
    /// Slots added per building level.
    pub capacity_per_level: u32,
    /// Price of the first hire.
    pub base_hire_cost: f64,
    /// Geometric growth of the hire price per worker hired.
    pub hire_cost_multiplier: f64,
}

impl CapacityModule {
    /// Create a capacity module.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        base_capacity: u32,
        capacity_per_level: u32,
        base_hire_cost: f64,
        hire_cost_multiplier: f64,
    ) -> Self {
        Self {
            name: name.into(),
            base_capacity,
            capacity_per_level,
            base_hire_cost,
            hire_cost_multiplier,
        }
    }

    /// `base_capacity + capacity_per_level × level`.
    #[must_use]
    pub fn max_capacity(&self, level: u32) -> u32 {
        self.base_capacity
            .saturating_add(self.capacity_per_level.saturating_mul(level))
    }

    /// `base_hire_cost × hire_cost_multiplier^workers`.
    #[must_use]
    pub fn hire_cost(&self, workers: u32) -> f64 {
        self.base_hire_cost * self.hire_cost_multiplier.powf(f64::from(workers))
    }

    /// Workers hired so far.
    #[must_use]
    pub fn workers(data: &ModuleData) -> u32 {
        match data.state {
            ModuleState::Capacity { workers } => workers,
            _ => 0,
        }
    }
}

impl ModuleBehavior for CapacityModule {
    fn kind(&self) -> ModuleKind {
        ModuleKind::Capacity
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn default_state(&self) -> ModuleState {
        ModuleState::Capacity { workers: 0 }
    }

    fn tick(
        &self,
        _owner: &ModuleOwner<'_>,
        _data: &mut ModuleData,
        _ledger: &mut ResourceLedger,
        _dt: f64,
    ) {
    }

    fn on_activate(
        &self,
        owner: &ModuleOwner<'_>,
        data: &mut ModuleData,
        ledger: &mut ResourceLedger,
    ) -> ActivationOutcome {
        let ModuleState::Capacity { workers } = &mut data.state else {
            return ActivationOutcome::Locked;
        };

        let cost = self.hire_cost(*workers);
        if !ledger.spend_gold(cost) {
            return ActivationOutcome::InsufficientFunds { cost };
        }

        if *workers < self.max_capacity(owner.level) {
            *workers += 1;
            ActivationOutcome::WorkerHired {
                workers: *workers,
                cost,
            }
        } else {
            ledger.add_gold(cost);
            ActivationOutcome::CapacityFull { refunded: cost }
        }
    }

    fn status_description(&self, owner: &ModuleOwner<'_>, data: &ModuleData) -> String {
        let workers = Self::workers(data);
        format!(
            "{}: {workers}/{} workers, next hire {:.2} gold",
            self.name,
            self.max_capacity(owner.level),
            self.hire_cost(workers)
        )
    }

    fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.base_hire_cost.is_finite() && self.base_hire_cost >= 0.0) {
            problems.push("base_hire_cost must be non-negative".to_string());
        }
        if !(self.hire_cost_multiplier.is_finite() && self.hire_cost_multiplier >= 1.0) {
            problems.push("hire_cost_multiplier must be at least 1".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BuildingConfig;

    fn owner(config: &BuildingConfig, level: u32) -> ModuleOwner<'_> {
        ModuleOwner {
            building_id: &config.id,
            config,
            level,
            income_multiplier: 1.0,
        }
    }

    #[test]
    fn test_hire_cost_progression() {
        let config = BuildingConfig::new("village", 10.0, 1.1, 1.0, 1.1);
        let module = CapacityModule::new("workers", 2, 1, 100.0, 1.2);
        let mut data = ModuleData::new(module.key(), module.default_state());
        let mut ledger = ResourceLedger::new(1_000.0);

        assert_eq!(module.hire_cost(0), 100.0);
        let outcome = module.on_activate(&owner(&config, 0), &mut data, &mut ledger);
        assert_eq!(
            outcome,
            ActivationOutcome::WorkerHired {
                workers: 1,
                cost: 100.0
            }
        );
        assert_eq!(ledger.gold(), 900.0);
        assert!((module.hire_cost(CapacityModule::workers(&data)) - 120.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_capacity_refunds() {
        let config = BuildingConfig::new("village", 10.0, 1.1, 1.0, 1.1);
        let module = CapacityModule::new("workers", 1, 0, 50.0, 1.0);
        let mut data = ModuleData::new(module.key(), module.default_state());
        let mut ledger = ResourceLedger::new(200.0);

        module.on_activate(&owner(&config, 0), &mut data, &mut ledger);
        let outcome = module.on_activate(&owner(&config, 0), &mut data, &mut ledger);

        assert_eq!(outcome, ActivationOutcome::CapacityFull { refunded: 50.0 });
        assert_eq!(CapacityModule::workers(&data), 1);
        assert_eq!(ledger.gold(), 150.0);
    }

    #[test]
    fn test_insufficient_funds_leaves_state() {
        let config = BuildingConfig::new("village", 10.0, 1.1, 1.0, 1.1);
        let module = CapacityModule::new("workers", 2, 1, 100.0, 1.2);
        let mut data = ModuleData::new(module.key(), module.default_state());
        let mut ledger = ResourceLedger::new(99.0);

        let outcome = module.on_activate(&owner(&config, 0), &mut data, &mut ledger);
        assert_eq!(outcome, ActivationOutcome::InsufficientFunds { cost: 100.0 });
        assert_eq!(ledger.gold(), 99.0);
        assert_eq!(CapacityModule::workers(&data), 0);
    }

    #[test]
    fn test_capacity_grows_with_level() {
        let module = CapacityModule::new("workers", 2, 3, 100.0, 1.2);
        assert_eq!(module.max_capacity(0), 2);
        assert_eq!(module.max_capacity(4), 14);
    }
}
