//! Determinism testing utilities.
//!
//! Provides a harness for verifying that a session produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Offline catch-up, save files and headless simulation all assume that
//! replaying the same inputs reproduces the same state. Sources of
//! divergence include:
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Buildings and modules always run in catalog declaration order.
//!
//! - **System time**: the engine never reads the clock. Callers pass unix
//!   timestamps in and step with explicit deltas.
//!
//! - **Accumulated float error**: interval timers use an epsilon so that
//!   many small steps pay out the same as one large step.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use idle_core::prelude::*;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps simulated.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic run).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Session is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a scenario multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the scenario
/// * `steps` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```
/// use idle_test_utils::determinism::verify_determinism;
/// use idle_test_utils::fixtures::farming_session;
///
/// let result = verify_determinism(
///     3,
///     50,
///     || farming_session(2),
///     |session| session.step(0.25),
///     |session| session.state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..steps {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// A host-side input to a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Advance by this many seconds.
    Step(f64),
    /// Unlock the building at this catalog index.
    Unlock(usize),
    /// Upgrade the building at this catalog index.
    Upgrade(usize),
    /// Activate a module: building index, module index.
    Activate(usize, usize),
    /// Prestige immediately with every available bonus.
    Prestige,
}

/// Apply an action, ignoring rejections the way a host would.
///
/// Indices wrap around the catalog, so any index is valid input.
pub fn apply_action(session: &mut Session, action: &SessionAction) {
    let building_id = |session: &Session, index: usize| -> Option<String> {
        let count = session.catalog().len();
        if count == 0 {
            return None;
        }
        session
            .catalog()
            .buildings()
            .nth(index % count)
            .map(|b| b.id.clone())
    };

    match action {
        SessionAction::Step(dt) => session.step(*dt),
        SessionAction::Unlock(index) => {
            if let Some(id) = building_id(&*session, *index) {
                let _ = session.unlock_building(&id);
            }
        }
        SessionAction::Upgrade(index) => {
            if let Some(id) = building_id(&*session, *index) {
                let _ = session.upgrade_building(&id);
            }
        }
        SessionAction::Activate(index, module) => {
            let Some(id) = building_id(&*session, *index) else {
                return;
            };
            let name = session.catalog().get(&id).and_then(|config| {
                let count = config.modules.len();
                (count > 0).then(|| config.modules[module % count].behavior().name().to_string())
            });
            if let Some(name) = name {
                let _ = session.activate_module(&id, &name);
            }
        }
        SessionAction::Prestige => {
            let bonuses: Vec<String> = session
                .available_bonuses()
                .into_iter()
                .map(|b| b.id.clone())
                .collect();
            let refs: Vec<&str> = bonuses.iter().map(String::as_str).collect();
            let _ = session.prestige(&refs);
        }
    }
}

/// Replay `actions` on two fresh sessions and compare hashes after each.
///
/// # Returns
///
/// `None` if the sessions stayed identical, `Some(index)` of the first
/// action after which they differ.
pub fn find_first_divergence<F>(setup_fn: F, actions: &[SessionAction]) -> Option<usize>
where
    F: Fn() -> Session,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    for (index, action) in actions.iter().enumerate() {
        apply_action(&mut first, action);
        apply_action(&mut second, action);
        if first.state_hash() != second.state_hash() {
            return Some(index);
        }
    }

    None
}

/// Verify that a snapshot round trip through bincode and RON keeps state.
pub fn verify_snapshot_round_trip(session: &Session) -> bool {
    let snapshot = session.snapshot();

    let from_bytes = snapshot
        .to_bytes()
        .and_then(|bytes| Snapshot::from_bytes(&bytes));
    let from_ron = snapshot.to_ron().and_then(|text| Snapshot::from_ron(&text));

    matches!((from_bytes, from_ron), (Ok(a), Ok(b)) if a == snapshot && b == snapshot)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for property testing the engine.
pub mod strategies {
    use proptest::prelude::*;

    use super::SessionAction;
    use idle_core::prelude::BuildingConfig;

    /// Building level in a playable range.
    pub fn arb_level() -> impl Strategy<Value = u32> {
        0u32..200
    }

    /// Growth multiplier strictly above 1.
    pub fn arb_growth() -> impl Strategy<Value = f64> {
        1.01f64..2.0
    }

    /// Positive base value for costs and incomes.
    pub fn arb_base() -> impl Strategy<Value = f64> {
        0.1f64..10_000.0
    }

    /// Gold amounts, including zero.
    pub fn arb_gold() -> impl Strategy<Value = f64> {
        prop_oneof![Just(0.0), 0.0f64..1_000_000.0]
    }

    /// Step size in seconds, from sub-frame to coarse.
    pub fn arb_dt() -> impl Strategy<Value = f64> {
        prop_oneof![Just(1.0 / 60.0), Just(0.1), Just(1.0), 0.001f64..5.0]
    }

    /// A building config with valid curves and no modules.
    pub fn arb_building_config() -> impl Strategy<Value = BuildingConfig> {
        (arb_base(), arb_growth(), arb_base(), arb_growth()).prop_map(
            |(base_cost, cost_mult, base_income, income_mult)| {
                BuildingConfig::new("generated", base_cost, cost_mult, base_income, income_mult)
            },
        )
    }

    /// One host action.
    pub fn arb_action() -> impl Strategy<Value = SessionAction> {
        prop_oneof![
            4 => arb_dt().prop_map(SessionAction::Step),
            2 => (0usize..8).prop_map(SessionAction::Unlock),
            3 => (0usize..8).prop_map(SessionAction::Upgrade),
            2 => (0usize..8, 0usize..4).prop_map(|(b, m)| SessionAction::Activate(b, m)),
            1 => Just(SessionAction::Prestige),
        ]
    }

    /// A sequence of host actions.
    pub fn arb_action_sequence(max_len: usize) -> impl Strategy<Value = Vec<SessionAction>> {
        proptest::collection::vec(arb_action(), 0..max_len)
    }
}
