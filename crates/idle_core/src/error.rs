//! Error types for the progression engine.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all progression engine errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Building identifier does not resolve to a catalog entry.
    #[error("Unknown building ID: {0}")]
    UnknownBuilding(String),

    /// Module name does not exist on the given building.
    #[error("Unknown module '{module}' on building '{building}'")]
    UnknownModule {
        /// Building the lookup was made on.
        building: String,
        /// Requested module name.
        module: String,
    },

    /// Prestige bonus identifier does not exist.
    #[error("Unknown prestige bonus: {0}")]
    UnknownBonus(String),

    /// Operation requires an unlocked building.
    #[error("Building '{0}' is locked")]
    BuildingLocked(String),

    /// Operation targets a building that is already unlocked.
    #[error("Building '{0}' is already unlocked")]
    AlreadyUnlocked(String),

    /// Not enough gold for the attempted purchase.
    #[error("Insufficient funds: need {required:.2} gold, have {available:.2}")]
    InsufficientFunds {
        /// Gold required.
        required: f64,
        /// Gold available.
        available: f64,
    },

    /// A building declares more modules than its slot limit allows.
    #[error("Building '{building}' declares {declared} modules but only has {slots} slots")]
    ModuleSlotsExceeded {
        /// Offending building.
        building: String,
        /// Number of declared module templates.
        declared: usize,
        /// Slot limit.
        slots: usize,
    },

    /// Static game data failed validation.
    #[error("Invalid game data: {0:?}")]
    InvalidData(Vec<String>),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Snapshot could not be read or written.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Snapshot was written by an incompatible version.
    #[error("Snapshot version mismatch: expected {expected}, got {found}")]
    VersionMismatch {
        /// Version this build understands.
        expected: u32,
        /// Version found in the snapshot.
        found: u32,
    },

    /// Prestige was requested while the threshold is not met.
    #[error("Prestige not available: earnings {earnings:.0} below threshold {threshold:.0}")]
    PrestigeNotEligible {
        /// Current total earnings.
        earnings: f64,
        /// Threshold for the current prestige count.
        threshold: f64,
    },

    /// Invalid engine state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
