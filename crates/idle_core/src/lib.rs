//! # Idle Core
//!
//! Deterministic progression engine for an idle tycoon game.
//!
//! This crate contains **only** progression logic:
//! - No rendering
//! - No system clock (callers pass timestamps in)
//! - No randomness
//! - No IO outside the [`snapshot::FileStore`]
//!
//! The same inputs always produce the same state, which keeps offline
//! catch-up, save files and headless simulation consistent.
//!
//! ## Crate Structure
//!
//! - [`data`] - Static game data and engine tuning
//! - [`catalog`] - Validated building/bonus lookup
//! - [`ledger`] - Currency balances and permanent multipliers
//! - [`modules`] - Pluggable per-building behaviors
//! - [`buildings`] - Runtime building state
//! - [`clock`] - Fixed-order stepping
//! - [`offline`] - Catch-up income for time away
//! - [`prestige`] - Prestige state machine
//! - [`snapshot`] - Save format and stores
//! - [`session`] - Host-facing entry points

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod buildings;
pub mod catalog;
pub mod clock;
pub mod data;
pub mod error;
pub mod events;
pub mod ledger;
pub mod modules;
pub mod offline;
pub mod prestige;
pub mod session;
pub mod snapshot;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::buildings::{BuildingData, BuildingInstance};
    pub use crate::catalog::BuildingCatalog;
    pub use crate::clock::ProgressionClock;
    pub use crate::data::{
        BonusEffect, BuildingConfig, EngineConfig, GameData, PrestigeBonus, PrestigeConfig,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::events::{BuildingUpgraded, GoldChanged, HonorChanged, ModuleActivated};
    pub use crate::ledger::{PermanentMultipliers, ResourceLedger};
    pub use crate::modules::{
        ActivationOutcome, CapacityModule, IncomeModule, ModuleBehavior, ModuleData, ModuleKey,
        ModuleKind, ModuleState, ModuleTemplate, SpeedModule,
    };
    pub use crate::offline::{OfflineReconciler, OfflineReport};
    pub use crate::prestige::{PrestigeController, PrestigeOutcome, PrestigeState};
    pub use crate::session::Session;
    pub use crate::snapshot::{FileStore, MemoryStore, Persistence, SaveFormat, Snapshot};
}
