//! Building configuration for data-driven building definitions.

use serde::{Deserialize, Serialize};

use crate::modules::ModuleTemplate;

/// Immutable configuration of one building type.
///
/// # Example RON
///
/// ```ron
/// BuildingConfig(
///     id: "rice_field",
///     name: "Rice Field",
///     base_cost: 100.0,
///     cost_multiplier: 1.15,
///     base_income: 1.0,
///     income_multiplier: 1.07,
///     unlock_cost: 0.0,
///     module_slots: 2,
///     modules: [
///         Income(IncomeModule(name: "harvest", interval_secs: 1.0)),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingConfig {
    /// Unique string identifier for this building type.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Upgrade cost at level 0.
    pub base_cost: f64,

    /// Geometric growth of the upgrade cost per level. Must exceed 1.
    pub cost_multiplier: f64,

    /// Income per second at level 0.
    pub base_income: f64,

    /// Geometric growth of the income per level. Must exceed 1.
    pub income_multiplier: f64,

    /// Gold needed to unlock the building in a fresh game.
    #[serde(default)]
    pub unlock_cost: f64,

    /// Maximum number of modules the building may carry.
    #[serde(default = "default_module_slots")]
    pub module_slots: usize,

    /// Module templates in declaration order. This order is the tick order.
    #[serde(default)]
    pub modules: Vec<ModuleTemplate>,
}

/// Default slot limit for buildings without an explicit one.
const fn default_module_slots() -> usize {
    3
}

impl BuildingConfig {
    /// Create a module-less configuration.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        base_cost: f64,
        cost_multiplier: f64,
        base_income: f64,
        income_multiplier: f64,
    ) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            base_cost,
            cost_multiplier,
            base_income,
            income_multiplier,
            unlock_cost: 0.0,
            module_slots: default_module_slots(),
            modules: Vec::new(),
        }
    }

    /// Set the unlock cost.
    #[must_use]
    pub fn with_unlock_cost(mut self, unlock_cost: f64) -> Self {
        self.unlock_cost = unlock_cost;
        self
    }

    /// Set the module templates and slot limit.
    #[must_use]
    pub fn with_modules(mut self, slots: usize, modules: Vec<ModuleTemplate>) -> Self {
        self.module_slots = slots;
        self.modules = modules;
        self
    }

    /// Upgrade cost at `level`: `base_cost × cost_multiplier^level`.
    #[must_use]
    pub fn get_cost(&self, level: u32) -> f64 {
        self.base_cost * self.cost_multiplier.powf(f64::from(level))
    }

    /// Income per second at `level`: `base_income × income_multiplier^level`.
    #[must_use]
    pub fn get_income(&self, level: u32) -> f64 {
        self.base_income * self.income_multiplier.powf(f64::from(level))
    }

    /// Check internal consistency of this configuration.
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.id.is_empty() {
            errors.push("Building with empty id".to_string());
        }
        if !(self.base_cost.is_finite() && self.base_cost >= 0.0) {
            errors.push(format!("Building '{}' has invalid base_cost", self.id));
        }
        if !(self.base_income.is_finite() && self.base_income >= 0.0) {
            errors.push(format!("Building '{}' has invalid base_income", self.id));
        }
        if !(self.cost_multiplier.is_finite() && self.cost_multiplier > 1.0) {
            errors.push(format!(
                "Building '{}' cost_multiplier must be greater than 1",
                self.id
            ));
        }
        if !(self.income_multiplier.is_finite() && self.income_multiplier > 1.0) {
            errors.push(format!(
                "Building '{}' income_multiplier must be greater than 1",
                self.id
            ));
        }
        if !(self.unlock_cost.is_finite() && self.unlock_cost >= 0.0) {
            errors.push(format!("Building '{}' has invalid unlock_cost", self.id));
        }
        if self.modules.len() > self.module_slots {
            errors.push(format!(
                "Building '{}' declares {} modules but only has {} slots",
                self.id,
                self.modules.len(),
                self.module_slots
            ));
        }

        let mut keys = Vec::with_capacity(self.modules.len());
        for template in &self.modules {
            let key = template.key();
            if keys.contains(&key) {
                errors.push(format!(
                    "Building '{}' declares module '{}' twice",
                    self.id, key
                ));
            }
            for problem in template.validate() {
                errors.push(format!("Building '{}' module '{}': {problem}", self.id, key));
            }
            keys.push(key);
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::IncomeModule;

    fn barracks() -> BuildingConfig {
        BuildingConfig::new("barracks", 100.0, 1.15, 2.0, 1.1)
    }

    #[test]
    fn test_cost_curve_reference_values() {
        let config = barracks();
        assert_eq!(config.get_cost(0), 100.0);
        assert!((config.get_cost(1) - 115.0).abs() < 1e-9);
        assert!((config.get_cost(5) - 201.135_718_75).abs() < 1e-6);
    }

    #[test]
    fn test_income_curve() {
        let config = barracks();
        assert_eq!(config.get_income(0), 2.0);
        assert!((config.get_income(2) - 2.42).abs() < 1e-9);
    }

    #[test]
    fn test_validate_valid_config() {
        let errors = barracks().validate();
        assert!(errors.is_empty(), "Errors: {:?}", errors);
    }

    #[test]
    fn test_validate_flat_multiplier() {
        let mut config = barracks();
        config.cost_multiplier = 1.0;
        let errors = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("cost_multiplier"));
    }

    #[test]
    fn test_validate_slot_limit_and_duplicates() {
        let config = barracks().with_modules(
            1,
            vec![
                ModuleTemplate::Income(IncomeModule::new("harvest")),
                ModuleTemplate::Income(IncomeModule::new("harvest")),
            ],
        );
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("slots")));
        assert!(errors.iter().any(|e| e.contains("twice")));
    }
}
