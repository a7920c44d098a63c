//! Static data structures for buildings, prestige bonuses and engine tuning.
//!
//! All structs are designed to be deserialized from RON files.
//!
//! **Note:** This module contains no IO - it only defines data types and
//! parses strings. File loading is handled by the caller.

mod building_config;
mod engine_config;
mod game_data;
mod prestige_bonus;

pub use building_config::BuildingConfig;
pub use engine_config::{EngineConfig, PrestigeConfig};
pub use game_data::GameData;
pub use prestige_bonus::{BonusEffect, PrestigeBonus};
