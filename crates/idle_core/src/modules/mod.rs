//! Pluggable per-building behavior modules.
//!
//! A module is split in two halves:
//! - Its **tuning** lives in the catalog as a [`ModuleTemplate`] and never
//!   changes at runtime.
//! - Its **state** lives in a persisted [`ModuleData`], keyed by
//!   [`ModuleKey`] (kind + name) so rebuilding a building never duplicates
//!   or loses it.
//!
//! Behaviors are dispatched through the [`ModuleBehavior`] trait. The set of
//! kinds is closed: adding one means a new variant in [`ModuleKind`],
//! [`ModuleState`] and [`ModuleTemplate`].

mod capacity;
mod income;
mod speed;

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::data::BuildingConfig;
use crate::ledger::ResourceLedger;

pub use capacity::CapacityModule;
pub use income::IncomeModule;
pub use speed::SpeedModule;

/// Kind of module behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ModuleKind {
    /// Periodic gold income.
    Income,
    /// Speed stat with a temporary boost.
    Speed,
    /// Hireable worker slots.
    Capacity,
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Income => "income",
            Self::Speed => "speed",
            Self::Capacity => "capacity",
        };
        f.write_str(name)
    }
}

/// Stable identity of a module on one building.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleKey {
    /// Behavior kind.
    pub kind: ModuleKind,
    /// Name declared in the catalog.
    pub name: String,
}

impl ModuleKey {
    /// Create a module key.
    #[must_use]
    pub fn new(kind: ModuleKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.name)
    }
}

/// Typed, persisted per-kind state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModuleState {
    /// State of an [`IncomeModule`].
    Income {
        /// Manual on/off switch.
        active: bool,
        /// Time accumulated towards the next payout.
        timer: f64,
    },
    /// State of a [`SpeedModule`].
    Speed {
        /// Seconds of boost left. Zero when not boosted.
        boost_remaining: f64,
    },
    /// State of a [`CapacityModule`].
    Capacity {
        /// Workers hired so far.
        workers: u32,
    },
}

impl ModuleState {
    /// Kind this state belongs to.
    #[must_use]
    pub const fn kind(&self) -> ModuleKind {
        match self {
            Self::Income { .. } => ModuleKind::Income,
            Self::Speed { .. } => ModuleKind::Speed,
            Self::Capacity { .. } => ModuleKind::Capacity,
        }
    }

    /// Feed the state into a hasher. Floats are hashed by bit pattern.
    pub fn hash_into<H: Hasher>(&self, hasher: &mut H) {
        self.kind().hash(hasher);
        match self {
            Self::Income { active, timer } => {
                active.hash(hasher);
                timer.to_bits().hash(hasher);
            }
            Self::Speed { boost_remaining } => boost_remaining.to_bits().hash(hasher),
            Self::Capacity { workers } => workers.hash(hasher),
        }
    }
}

/// Persisted state of one module instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleData {
    /// Stable identity.
    pub key: ModuleKey,
    /// Building level last observed through an upgrade notification.
    pub level: u32,
    /// Locked modules neither tick nor accept activations.
    pub unlocked: bool,
    /// Kind-specific state.
    pub state: ModuleState,
}

impl ModuleData {
    /// Fresh module data: level 1, unlocked.
    #[must_use]
    pub const fn new(key: ModuleKey, state: ModuleState) -> Self {
        Self {
            key,
            level: 1,
            unlocked: true,
            state,
        }
    }
}

/// Read-only view of the building a module belongs to.
#[derive(Debug, Clone, Copy)]
pub struct ModuleOwner<'a> {
    /// Owning building ID.
    pub building_id: &'a str,
    /// Owning building configuration.
    pub config: &'a BuildingConfig,
    /// Current building level.
    pub level: u32,
    /// Global income multiplier at the time of the call.
    pub income_multiplier: f64,
}

/// Result of a user activation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationOutcome {
    /// Income switch flipped.
    IncomeToggled {
        /// New switch position.
        active: bool,
    },
    /// A boost started.
    BoostStarted {
        /// Boost length in seconds.
        duration_secs: f64,
    },
    /// A boost is already running; nothing changed.
    AlreadyBoosted {
        /// Seconds left on the running boost.
        remaining_secs: f64,
    },
    /// A worker was hired.
    WorkerHired {
        /// Workers after the hire.
        workers: u32,
        /// Gold paid.
        cost: f64,
    },
    /// Payment went through but no slot was free, so it was refunded.
    CapacityFull {
        /// Gold refunded.
        refunded: f64,
    },
    /// Not enough gold for the hire.
    InsufficientFunds {
        /// Gold required.
        cost: f64,
    },
    /// The module is locked.
    Locked,
}

impl ActivationOutcome {
    /// Whether the activation changed module state.
    #[must_use]
    pub const fn changed_state(&self) -> bool {
        matches!(
            self,
            Self::IncomeToggled { .. } | Self::BoostStarted { .. } | Self::WorkerHired { .. }
        )
    }
}

/// Capability set shared by every module kind.
pub trait ModuleBehavior {
    /// Behavior kind.
    fn kind(&self) -> ModuleKind;

    /// Name declared in the catalog.
    fn name(&self) -> &str;

    /// State for a module seen for the first time.
    fn default_state(&self) -> ModuleState;

    /// Stable key for this module.
    fn key(&self) -> ModuleKey {
        ModuleKey::new(self.kind(), self.name())
    }

    /// Bind persisted data, repairing state that belongs to another kind.
    fn initialize(&self, data: &mut ModuleData) {
        if data.state.kind() != self.kind() {
            tracing::warn!(
                module = %data.key,
                found = %data.state.kind(),
                "Module state has wrong kind, resetting"
            );
            data.state = self.default_state();
        }
    }

    /// Advance the module by `dt` seconds.
    fn tick(
        &self,
        owner: &ModuleOwner<'_>,
        data: &mut ModuleData,
        ledger: &mut ResourceLedger,
        dt: f64,
    );

    /// Building level changed. Level-dependent stats are always derived from
    /// `owner.level`, so this only records the new level.
    fn on_upgrade(
        &self,
        _owner: &ModuleOwner<'_>,
        data: &mut ModuleData,
        _old_level: u32,
        new_level: u32,
    ) {
        data.level = new_level;
    }

    /// Explicit user action.
    fn on_activate(
        &self,
        owner: &ModuleOwner<'_>,
        data: &mut ModuleData,
        ledger: &mut ResourceLedger,
    ) -> ActivationOutcome;

    /// Human-readable state.
    fn status_description(&self, owner: &ModuleOwner<'_>, data: &ModuleData) -> String;

    /// Check tuning values. Returns a list of problems.
    fn validate(&self) -> Vec<String>;
}

/// Catalog entry describing one module on a building.
///
/// # Example RON
///
/// ```ron
/// Capacity(CapacityModule(
///     name: "workers",
///     base_capacity: 2,
///     capacity_per_level: 1,
///     base_hire_cost: 100.0,
///     hire_cost_multiplier: 1.2,
/// ))
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModuleTemplate {
    /// Periodic income.
    Income(IncomeModule),
    /// Boostable speed.
    Speed(SpeedModule),
    /// Hireable workers.
    Capacity(CapacityModule),
}

impl ModuleTemplate {
    /// Behavior implementation for this template.
    #[must_use]
    pub fn behavior(&self) -> &dyn ModuleBehavior {
        match self {
            Self::Income(m) => m,
            Self::Speed(m) => m,
            Self::Capacity(m) => m,
        }
    }

    /// Stable key for this template.
    #[must_use]
    pub fn key(&self) -> ModuleKey {
        self.behavior().key()
    }

    /// Check tuning values. Returns a list of problems.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let behavior = self.behavior();
        let mut problems = behavior.validate();
        if behavior.name().is_empty() {
            problems.push("module name is empty".to_string());
        }
        problems
    }
}

/// Tolerance used when comparing accumulated timers against intervals.
pub(crate) const TIMER_EPSILON: f64 = 1e-9;
