//! Root of the static game data file.

use serde::{Deserialize, Serialize};

use super::building_config::BuildingConfig;
use super::prestige_bonus::PrestigeBonus;
use crate::error::{GameError, Result};

/// Complete static game data: every building type and prestige bonus.
///
/// Loaded from a RON file at startup and never mutated afterwards.
///
/// # Example RON
///
/// ```ron
/// GameData(
///     buildings: [...],
///     prestige_bonuses: [...],
/// )
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameData {
    /// Building types in display order.
    pub buildings: Vec<BuildingConfig>,

    /// Bonuses offered at prestige time.
    #[serde(default)]
    pub prestige_bonuses: Vec<PrestigeBonus>,
}

impl GameData {
    /// Parse game data from a RON string without validating it.
    ///
    /// `origin` names the source in error messages.
    pub fn from_ron_str(ron: &str, origin: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })
    }

    /// Find a building by its ID.
    #[must_use]
    pub fn get_building(&self, id: &str) -> Option<&BuildingConfig> {
        self.buildings.iter().find(|b| b.id == id)
    }

    /// Find a prestige bonus by its ID.
    #[must_use]
    pub fn get_bonus(&self, id: &str) -> Option<&PrestigeBonus> {
        self.prestige_bonuses.iter().find(|b| b.id == id)
    }

    /// Validate internal consistency of the game data.
    ///
    /// Checks for:
    /// - Duplicate building or bonus IDs
    /// - Per-building curve and module problems
    /// - Non-finite bonus magnitudes
    ///
    /// Returns a list of validation errors.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.buildings.is_empty() {
            errors.push("Game data declares no buildings".to_string());
        }

        for (index, building) in self.buildings.iter().enumerate() {
            if self.buildings[..index].iter().any(|b| b.id == building.id) {
                errors.push(format!("Duplicate building ID '{}'", building.id));
            }
            errors.extend(building.validate());
        }

        for (index, bonus) in self.prestige_bonuses.iter().enumerate() {
            if self.prestige_bonuses[..index].iter().any(|b| b.id == bonus.id) {
                errors.push(format!("Duplicate prestige bonus ID '{}'", bonus.id));
            }
            if !bonus.magnitude.is_finite() {
                errors.push(format!("Prestige bonus '{}' has invalid magnitude", bonus.id));
            }
        }

        errors
    }
}
