//! Prestige bonus definitions.

use serde::{Deserialize, Serialize};

/// Permanent multiplier a prestige bonus feeds into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BonusEffect {
    /// Adds to the global income multiplier.
    IncomeMultiplier,
    /// Adds to the troop training speed multiplier.
    TrainingSpeed,
    /// Adds to the building cost reduction.
    CostReduction,
    /// Adds to the offline earnings multiplier.
    OfflineEarnings,
    /// Adds extra troop capacity.
    TroopCapacity,
    /// Adds to the auto-train speed multiplier.
    AutoTrainSpeed,
}

/// A bonus the player may pick when performing a prestige.
///
/// # Example RON
///
/// ```ron
/// PrestigeBonus(
///     id: "bushido",
///     name: "Way of the Warrior",
///     effect: IncomeMultiplier,
///     magnitude: 0.25,
///     required_prestige_count: 0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrestigeBonus {
    /// Unique identifier.
    pub id: String,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Which multiplier this bonus raises.
    pub effect: BonusEffect,

    /// Amount added to the multiplier.
    pub magnitude: f64,

    /// Minimum number of completed prestiges before the bonus is offered.
    #[serde(default)]
    pub required_prestige_count: u32,
}

impl PrestigeBonus {
    /// Create a bonus available from the first prestige.
    #[must_use]
    pub fn new(id: impl Into<String>, effect: BonusEffect, magnitude: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            effect,
            magnitude,
            required_prestige_count: 0,
        }
    }

    /// Require a number of completed prestiges.
    #[must_use]
    pub fn requiring(mut self, prestige_count: u32) -> Self {
        self.required_prestige_count = prestige_count;
        self
    }

    /// Whether the bonus is offered at `prestige_count`.
    #[must_use]
    pub const fn is_available_at(&self, prestige_count: u32) -> bool {
        self.required_prestige_count <= prestige_count
    }
}
