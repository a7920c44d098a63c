//! Headless sessions for balance checks.
//!
//! Runs a session for a span of simulated time with a simple greedy
//! player: buy the cheapest affordable unlock or upgrade, and optionally
//! prestige as soon as it is allowed.

use std::path::PathBuf;

use idle_core::prelude::{FileStore, MemoryStore, Persistence, Session};
use serde::Serialize;

use crate::loader::{load_data_directory, DataLoadResult};

/// Purchases allowed per step, so a huge balance cannot stall a step.
const MAX_PURCHASES_PER_STEP: usize = 100;

/// Settings for [`run_simulation`].
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    /// Data directory holding `catalog.ron` and optionally `engine.ron`.
    pub data_dir: PathBuf,
    /// Save file to resume from and write back. In-memory when `None`.
    pub save_path: Option<PathBuf>,
    /// Simulated seconds to run.
    pub seconds: f64,
    /// Step size in seconds.
    pub step: f64,
    /// Unix time the session starts at.
    pub start_time: u64,
    /// Buy unlocks and upgrades greedily.
    pub auto_upgrade: bool,
    /// Prestige whenever possible, taking every available bonus.
    pub auto_prestige: bool,
}

/// What a simulation run ended with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    /// Steps taken.
    pub steps: u64,
    /// Simulated seconds.
    pub elapsed_secs: f64,
    /// Offline income credited at start.
    pub offline_income: f64,
    /// Final gold.
    pub gold: f64,
    /// Final honor.
    pub honor: f64,
    /// Unlocks and upgrades bought.
    pub purchases: u64,
    /// Completed prestiges at the end.
    pub prestiges: u32,
    /// Final `(building, level)` pairs, unlocked buildings only.
    pub buildings: Vec<(String, u32)>,
    /// Final state hash.
    pub state_hash: u64,
}

/// Run a headless session.
///
/// # Errors
///
/// Returns an error if the data cannot be loaded, the session cannot
/// start, or the final save fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn run_simulation(options: &SimulationOptions) -> DataLoadResult<SimulationSummary> {
    let loaded = load_data_directory(&options.data_dir)?;
    let store: Box<dyn Persistence> = match &options.save_path {
        Some(path) => Box::new(FileStore::new(path.clone())),
        None => Box::new(MemoryStore::new()),
    };

    let mut session = Session::start(loaded.catalog, loaded.config, store, options.start_time)?;
    let offline_income = session.offline_report().income;

    let step = if options.step > 0.0 { options.step } else { 1.0 };
    let steps = (options.seconds.max(0.0) / step).ceil() as u64;
    let mut purchases = 0u64;

    tracing::info!(steps, step, "Running simulation");

    for _ in 0..steps {
        session.step(step);

        if options.auto_upgrade {
            purchases += buy_greedily(&mut session) as u64;
        }

        if options.auto_prestige && session.can_prestige() {
            let bonuses: Vec<String> = session
                .available_bonuses()
                .into_iter()
                .map(|b| b.id.clone())
                .collect();
            let selected: Vec<&str> = bonuses.iter().map(String::as_str).collect();
            if let Some(outcome) = session.prestige(&selected)? {
                tracing::info!(
                    prestige_count = outcome.prestige_count,
                    honor = outcome.honor_gained,
                    elapsed = session.clock().elapsed(),
                    "Auto prestige"
                );
            }
        }
    }

    session.save()?;

    Ok(SimulationSummary {
        steps: session.clock().step_count(),
        elapsed_secs: session.clock().elapsed(),
        offline_income,
        gold: session.ledger().gold(),
        honor: session.ledger().honor(),
        purchases,
        prestiges: session.prestige_controller().prestige_count(),
        buildings: session
            .buildings()
            .filter(|b| b.is_unlocked())
            .map(|b| (b.id().to_string(), b.level()))
            .collect(),
        state_hash: session.state_hash(),
    })
}

/// Buy the cheapest affordable unlock or upgrade until nothing is
/// affordable. Returns the number of purchases.
pub fn buy_greedily(session: &mut Session) -> usize {
    let mut purchases = 0;

    while purchases < MAX_PURCHASES_PER_STEP {
        let cheapest = session
            .buildings()
            .filter_map(|b| {
                let price = if b.is_unlocked() {
                    session.upgrade_price(b.id()).ok()?
                } else {
                    b.data().unlock_cost
                };
                Some((b.id().to_string(), b.is_unlocked(), price))
            })
            .min_by(|a, b| a.2.total_cmp(&b.2));

        let Some((id, unlocked, price)) = cheapest else {
            break;
        };
        if !session.ledger().can_afford(price) {
            break;
        }

        let bought = if unlocked {
            session.upgrade_building(&id).is_ok()
        } else {
            session.unlock_building(&id).is_ok()
        };
        if !bought {
            break;
        }
        purchases += 1;
    }

    purchases
}

#[cfg(test)]
mod tests {
    use super::*;
    use idle_test_utils::fixtures::{simple_session, T0};

    #[test]
    fn test_greedy_buys_cheapest_first() {
        let mut session = simple_session();
        // farm unlock (free), then farm upgrades at 115, 132.25, ...
        let bought = buy_greedily(&mut session);
        assert!(bought >= 3);
        assert!(session.data("farm").unwrap().level > 1);
        assert!(session.ledger().gold() < session.upgrade_price("farm").unwrap());
    }

    #[test]
    fn test_greedy_stops_when_broke() {
        let mut session = simple_session();
        buy_greedily(&mut session);
        let gold = session.ledger().gold();
        assert_eq!(buy_greedily(&mut session), 0);
        assert_eq!(session.ledger().gold(), gold);
    }

    #[test]
    fn test_zero_seconds_runs_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(crate::loader::CATALOG_FILE),
            idle_test_utils::fixtures::SAMPLE_CATALOG_RON,
        )
        .unwrap();

        let summary = run_simulation(&SimulationOptions {
            data_dir: dir.path().to_path_buf(),
            save_path: None,
            seconds: 0.0,
            step: 1.0,
            start_time: T0,
            auto_upgrade: true,
            auto_prestige: false,
        })
        .unwrap();
        assert_eq!(summary.steps, 0);
        assert_eq!(summary.gold, 1_000.0);
    }
}
