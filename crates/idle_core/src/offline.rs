//! Catch-up income for time spent away.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingData;
use crate::data::BuildingConfig;

/// Default cap on offline catch-up, 24 hours.
pub const DEFAULT_OFFLINE_CAP_SECS: u64 = 86_400;

/// Result of an offline reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OfflineReport {
    /// Seconds actually credited, after the cap.
    pub elapsed_secs: u64,
    /// Whether the cap cut the elapsed time short.
    pub capped: bool,
    /// Gold owed for the credited time.
    pub income: f64,
}

impl OfflineReport {
    /// Report for "nothing to credit".
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            elapsed_secs: 0,
            capped: false,
            income: 0.0,
        }
    }
}

/// Computes offline income from the time since the last checkpoint.
///
/// Pure: it reads building state and returns a total. Crediting the gold
/// and moving the checkpoint forward are the caller's job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfflineReconciler {
    cap_secs: u64,
}

impl Default for OfflineReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_OFFLINE_CAP_SECS)
    }
}

impl OfflineReconciler {
    /// Reconciler with the given cap in seconds.
    #[must_use]
    pub const fn new(cap_secs: u64) -> Self {
        Self { cap_secs }
    }

    /// Cap in seconds.
    #[must_use]
    pub const fn cap_secs(&self) -> u64 {
        self.cap_secs
    }

    /// Elapsed seconds to credit, and whether the cap applied.
    ///
    /// A missing checkpoint or a clock that went backwards credits nothing.
    #[must_use]
    pub fn elapsed(&self, last_checkpoint: Option<u64>, now: u64) -> (u64, bool) {
        let Some(last) = last_checkpoint else {
            return (0, false);
        };
        let raw = now.saturating_sub(last);
        (raw.min(self.cap_secs), raw > self.cap_secs)
    }

    /// Income owed for the time since `last_checkpoint`.
    ///
    /// Sums `get_income(level) × elapsed` over unlocked buildings, then
    /// scales by `offline_multiplier`.
    pub fn reconcile<'a>(
        &self,
        last_checkpoint: Option<u64>,
        now: u64,
        buildings: impl IntoIterator<Item = (&'a BuildingConfig, &'a BuildingData)>,
        offline_multiplier: f64,
    ) -> OfflineReport {
        let (elapsed_secs, capped) = self.elapsed(last_checkpoint, now);
        if elapsed_secs == 0 {
            return OfflineReport::empty();
        }

        let seconds = elapsed_secs as f64;
        let per_second: f64 = buildings
            .into_iter()
            .filter(|(_, data)| data.is_unlocked)
            .map(|(config, data)| config.get_income(data.level))
            .sum();

        OfflineReport {
            elapsed_secs,
            capped,
            income: per_second * seconds * offline_multiplier,
        }
    }
}
