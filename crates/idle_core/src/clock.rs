//! Fixed-order stepping of the whole engine.
//!
//! Each call to [`ProgressionClock::step`] advances every building and then
//! the ledger. Within a step, buildings run in catalog declaration order
//! and modules in template declaration order, so income produced this step
//! is visible to the ledger's own tick.

use crate::buildings::BuildingInstance;
use crate::ledger::ResourceLedger;

/// Drives the engine forward in discrete steps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressionClock {
    step_count: u64,
    elapsed: f64,
}

impl ProgressionClock {
    /// Clock at step 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps taken so far.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Simulated seconds since the clock started.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance by `dt` seconds.
    ///
    /// Returns `false` and changes nothing when `dt` is negative or not
    /// finite. A zero `dt` is a valid, empty step.
    pub fn step(
        &mut self,
        dt: f64,
        buildings: &mut [BuildingInstance],
        ledger: &mut ResourceLedger,
    ) -> bool {
        if !dt.is_finite() || dt < 0.0 {
            tracing::warn!(dt, "Ignoring step with invalid delta time");
            return false;
        }

        let gold_before = ledger.gold();

        for building in buildings.iter_mut() {
            building.tick(dt, ledger);
        }
        ledger.tick(dt);

        self.step_count += 1;
        self.elapsed += dt;

        #[cfg(feature = "debug-validation")]
        debug_assert!(
            ledger.gold() >= 0.0,
            "gold went negative at step {}",
            self.step_count
        );

        tracing::trace!(
            step = self.step_count,
            dt,
            earned = ledger.gold() - gold_before,
            "Clock step"
        );
        true
    }
}
