//! Engine tuning loaded alongside the game data.

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Tuning for the prestige controller.
///
/// # Example RON
///
/// ```ron
/// PrestigeConfig(
///     min_threshold: 10000.0,
///     threshold_growth: 1.5,
///     base_honor_multiplier: 0.01,
/// )
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrestigeConfig {
    /// Total earnings needed for the first prestige.
    pub min_threshold: f64,
    /// Growth of the threshold per completed prestige.
    pub threshold_growth: f64,
    /// Earnings contributed by each level of an unlocked building.
    pub earnings_per_level: f64,
    /// Fraction of total earnings converted to honor.
    pub base_honor_multiplier: f64,
    /// Growth of the honor reward per completed prestige.
    pub honor_growth_rate: f64,
    /// Gold granted after the first prestige.
    pub starting_gold_base: f64,
    /// Growth of the post-prestige starting gold per completed prestige.
    pub starting_gold_growth: f64,
    /// Delay between requesting and executing a prestige, in seconds.
    pub confirm_delay_secs: f64,
}

impl Default for PrestigeConfig {
    fn default() -> Self {
        Self {
            min_threshold: 10_000.0,
            threshold_growth: 1.5,
            earnings_per_level: 1_000.0,
            base_honor_multiplier: 0.01,
            honor_growth_rate: 1.1,
            starting_gold_base: 1_000.0,
            starting_gold_growth: 2.0,
            confirm_delay_secs: 3.0,
        }
    }
}

/// Engine-wide tuning.
///
/// Every field has a default, so an empty `EngineConfig()` is valid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gold in a brand new game.
    pub starting_gold: f64,
    /// Upper bound on offline catch-up time, in seconds.
    pub offline_cap_secs: u64,
    /// Gold paid by the ledger on every whole second.
    pub passive_income_per_second: f64,
    /// Upper bound applied to the building cost reduction multiplier.
    pub max_cost_reduction: f64,
    /// Prestige tuning.
    pub prestige: PrestigeConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            starting_gold: 1_000.0,
            offline_cap_secs: 86_400,
            passive_income_per_second: 0.0,
            max_cost_reduction: 0.9,
            prestige: PrestigeConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse an engine config from a RON string.
    pub fn from_ron_str(ron: &str, origin: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Validate tuning values.
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let p = &self.prestige;

        if !(self.starting_gold.is_finite() && self.starting_gold >= 0.0) {
            errors.push("starting_gold must be a non-negative number".to_string());
        }
        if !(self.passive_income_per_second.is_finite() && self.passive_income_per_second >= 0.0)
        {
            errors.push("passive_income_per_second must be a non-negative number".to_string());
        }
        if !(0.0..1.0).contains(&self.max_cost_reduction) {
            errors.push("max_cost_reduction must be in [0, 1)".to_string());
        }
        if !(p.min_threshold.is_finite() && p.min_threshold > 0.0) {
            errors.push("prestige.min_threshold must be positive".to_string());
        }
        if !(p.threshold_growth.is_finite() && p.threshold_growth >= 1.0) {
            errors.push("prestige.threshold_growth must be at least 1".to_string());
        }
        if !(p.honor_growth_rate.is_finite() && p.honor_growth_rate >= 1.0) {
            errors.push("prestige.honor_growth_rate must be at least 1".to_string());
        }
        if !(p.base_honor_multiplier.is_finite() && p.base_honor_multiplier >= 0.0) {
            errors.push("prestige.base_honor_multiplier must be non-negative".to_string());
        }
        if !(p.confirm_delay_secs.is_finite() && p.confirm_delay_secs >= 0.0) {
            errors.push("prestige.confirm_delay_secs must be non-negative".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_ron_str("EngineConfig()", "inline").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::from_ron_str(
            "EngineConfig(offline_cap_secs: 3600, prestige: PrestigeConfig(min_threshold: 500.0))",
            "inline",
        )
        .unwrap();
        assert_eq!(config.offline_cap_secs, 3600);
        assert_eq!(config.prestige.min_threshold, 500.0);
        assert_eq!(config.prestige.threshold_growth, 1.5);
    }

    #[test]
    fn test_validate_reduction_bound() {
        let config = EngineConfig {
            max_cost_reduction: 1.0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate().len(), 1);
    }
}
