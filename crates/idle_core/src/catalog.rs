//! Validated, immutable lookup over the static game data.

use std::collections::HashMap;

use crate::data::{BuildingConfig, GameData, PrestigeBonus};
use crate::error::{GameError, Result};

/// Immutable catalog of building types and prestige bonuses.
///
/// Built once from [`GameData`]. Declaration order is preserved and is the
/// order buildings are ticked in.
#[derive(Debug, Clone, Default)]
pub struct BuildingCatalog {
    buildings: Vec<BuildingConfig>,
    index: HashMap<String, usize>,
    bonuses: Vec<PrestigeBonus>,
}

impl BuildingCatalog {
    /// Build a catalog, rejecting data that fails validation.
    pub fn new(data: GameData) -> Result<Self> {
        let errors = data.validate();
        if !errors.is_empty() {
            return Err(GameError::InvalidData(errors));
        }

        let index = data
            .buildings
            .iter()
            .enumerate()
            .map(|(i, b)| (b.id.clone(), i))
            .collect();

        Ok(Self {
            buildings: data.buildings,
            index,
            bonuses: data.prestige_bonuses,
        })
    }

    /// Parse and validate a catalog from a RON string.
    pub fn from_ron_str(ron: &str, origin: &str) -> Result<Self> {
        Self::new(GameData::from_ron_str(ron, origin)?)
    }

    /// Look up a building configuration.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&BuildingConfig> {
        self.index.get(id).map(|&i| &self.buildings[i])
    }

    /// Whether a building ID exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All buildings in declaration order.
    pub fn buildings(&self) -> impl Iterator<Item = &BuildingConfig> {
        self.buildings.iter()
    }

    /// Number of building types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    /// Check if the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    /// Look up a prestige bonus.
    #[must_use]
    pub fn bonus(&self, id: &str) -> Option<&PrestigeBonus> {
        self.bonuses.iter().find(|b| b.id == id)
    }

    /// All prestige bonuses in declaration order.
    pub fn bonuses(&self) -> impl Iterator<Item = &PrestigeBonus> {
        self.bonuses.iter()
    }

    /// Bonuses offered at the given prestige count.
    pub fn available_bonuses(&self, prestige_count: u32) -> impl Iterator<Item = &PrestigeBonus> {
        self.bonuses
            .iter()
            .filter(move |b| b.is_available_at(prestige_count))
    }
}
