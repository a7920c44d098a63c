//! Resource ledger: currency balances and permanent multipliers.
//!
//! The ledger is the only writer of currency. Modules, the prestige
//! controller and the session all go through [`ResourceLedger::add_gold`],
//! [`ResourceLedger::spend_gold`] and [`ResourceLedger::add_honor`], so the
//! gold balance can never go negative.

use serde::{Deserialize, Serialize};

use crate::data::BonusEffect;
use crate::events::{GoldChanged, HonorChanged, Signal, SubscriptionId};
use crate::modules::TIMER_EPSILON;
use crate::snapshot::Snapshot;

/// Interval of the ledger's passive income hook, in seconds.
pub const PASSIVE_INTERVAL_SECS: f64 = 1.0;

/// Permanent multipliers granted by prestige bonuses.
///
/// These survive prestige resets and are persisted with the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PermanentMultipliers {
    /// Scales every income module payout.
    pub global_income: f64,
    /// Fraction taken off upgrade costs (0.0 = full price).
    pub building_cost_reduction: f64,
    /// Scales offline catch-up income.
    pub offline_earnings: f64,
    /// Troop training speed, consumed by the external troop layer.
    pub troop_training_speed: f64,
    /// Extra troop slots, consumed by the external troop layer.
    pub extra_troop_capacity: u32,
    /// Auto-train speed, consumed by the external troop layer.
    pub auto_train_speed: f64,
}

impl Default for PermanentMultipliers {
    fn default() -> Self {
        Self {
            global_income: 1.0,
            building_cost_reduction: 0.0,
            offline_earnings: 1.0,
            troop_training_speed: 1.0,
            extra_troop_capacity: 0,
            auto_train_speed: 1.0,
        }
    }
}

impl PermanentMultipliers {
    /// Additively apply a prestige bonus to the matching field.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(&mut self, effect: BonusEffect, magnitude: f64) {
        match effect {
            BonusEffect::IncomeMultiplier => self.global_income += magnitude,
            BonusEffect::TrainingSpeed => self.troop_training_speed += magnitude,
            BonusEffect::CostReduction => self.building_cost_reduction += magnitude,
            BonusEffect::OfflineEarnings => self.offline_earnings += magnitude,
            BonusEffect::TroopCapacity => {
                let extra = magnitude.round().max(0.0) as u32;
                self.extra_troop_capacity = self.extra_troop_capacity.saturating_add(extra);
            }
            BonusEffect::AutoTrainSpeed => self.auto_train_speed += magnitude,
        }
    }
}

/// Currency balances, counters and permanent multipliers.
#[derive(Debug, Default)]
pub struct ResourceLedger {
    gold: f64,
    honor: f64,
    samurai: u32,
    peasants: u32,
    multipliers: PermanentMultipliers,
    /// Gold granted on every whole second by [`ResourceLedger::tick`].
    passive_income_per_second: f64,
    /// Time accumulated towards the next passive payout.
    passive_timer: f64,
    gold_changed: Signal<GoldChanged>,
    honor_changed: Signal<HonorChanged>,
}

impl ResourceLedger {
    /// Create a ledger for a fresh game.
    #[must_use]
    pub fn new(starting_gold: f64) -> Self {
        Self {
            gold: starting_gold.max(0.0),
            ..Self::default()
        }
    }

    /// Rebuild a ledger from a persisted snapshot.
    ///
    /// Negative balances in a damaged save are clamped to zero.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        if snapshot.gold < 0.0 || snapshot.honor < 0.0 {
            tracing::warn!(
                gold = snapshot.gold,
                honor = snapshot.honor,
                "Snapshot contains negative balances, clamping to zero"
            );
        }

        Self {
            gold: snapshot.gold.max(0.0),
            honor: snapshot.honor.max(0.0),
            samurai: snapshot.samurai,
            peasants: snapshot.peasants,
            multipliers: snapshot.multipliers(),
            ..Self::default()
        }
    }

    /// Current gold balance.
    #[must_use]
    pub const fn gold(&self) -> f64 {
        self.gold
    }

    /// Current honor balance.
    #[must_use]
    pub const fn honor(&self) -> f64 {
        self.honor
    }

    /// Samurai counter.
    #[must_use]
    pub const fn samurai(&self) -> u32 {
        self.samurai
    }

    /// Peasant counter.
    #[must_use]
    pub const fn peasants(&self) -> u32 {
        self.peasants
    }

    /// Permanent multipliers.
    #[must_use]
    pub const fn multipliers(&self) -> &PermanentMultipliers {
        &self.multipliers
    }

    /// Passive gold paid per whole second.
    #[must_use]
    pub const fn passive_income_per_second(&self) -> f64 {
        self.passive_income_per_second
    }

    /// Set the passive gold paid per whole second.
    pub fn set_passive_income_per_second(&mut self, amount: f64) {
        self.passive_income_per_second = amount.max(0.0);
    }

    /// Check if the balance covers `amount`.
    #[must_use]
    pub fn can_afford(&self, amount: f64) -> bool {
        self.gold >= amount
    }

    /// Add gold. Non-positive or non-finite amounts are ignored.
    pub fn add_gold(&mut self, amount: f64) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        self.gold += amount;
        self.gold_changed.emit(&GoldChanged {
            delta: amount,
            balance: self.gold,
        });
    }

    /// Spend gold if the balance covers it.
    ///
    /// Returns true if the transaction succeeded. On failure the balance is
    /// untouched and nothing is emitted.
    pub fn spend_gold(&mut self, amount: f64) -> bool {
        if amount < 0.0 || !amount.is_finite() || self.gold < amount {
            return false;
        }
        self.gold -= amount;
        if amount > 0.0 {
            self.gold_changed.emit(&GoldChanged {
                delta: -amount,
                balance: self.gold,
            });
        }
        true
    }

    /// Add honor. Non-positive or non-finite amounts are ignored.
    pub fn add_honor(&mut self, amount: f64) {
        if amount <= 0.0 || !amount.is_finite() {
            return;
        }
        self.honor += amount;
        self.honor_changed.emit(&HonorChanged {
            delta: amount,
            balance: self.honor,
        });
    }

    /// Add recruited samurai.
    pub fn add_samurai(&mut self, count: u32) {
        self.samurai = self.samurai.saturating_add(count);
    }

    /// Add recruited peasants.
    pub fn add_peasants(&mut self, count: u32) {
        self.peasants = self.peasants.saturating_add(count);
    }

    /// Apply a permanent prestige bonus.
    pub fn apply_bonus(&mut self, effect: BonusEffect, magnitude: f64) {
        self.multipliers.apply(effect, magnitude);
    }

    /// Reset mutable progression for a new prestige cycle.
    ///
    /// Gold is set to `starting_gold` (emitting the signed difference), the
    /// troop counters are cleared. Honor and multipliers are kept.
    pub fn reset_for_prestige(&mut self, starting_gold: f64) {
        let starting_gold = starting_gold.max(0.0);
        let delta = starting_gold - self.gold;
        self.gold = starting_gold;
        self.samurai = 0;
        self.peasants = 0;
        self.passive_timer = 0.0;
        if delta != 0.0 {
            self.gold_changed.emit(&GoldChanged {
                delta,
                balance: self.gold,
            });
        }
    }

    /// Advance ledger-level timers.
    ///
    /// Pays the passive income for every whole second crossed in a single
    /// credit, so the total is the same whether time arrives in one step or
    /// many.
    pub fn tick(&mut self, dt: f64) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        self.passive_timer += dt;
        let seconds = ((self.passive_timer + TIMER_EPSILON) / PASSIVE_INTERVAL_SECS).floor();
        if seconds >= 1.0 {
            self.passive_timer = (self.passive_timer - seconds * PASSIVE_INTERVAL_SECS).max(0.0);
            if self.passive_income_per_second > 0.0 {
                self.add_gold(self.passive_income_per_second * seconds);
            }
        }
    }

    /// Subscribe to gold changes.
    pub fn on_gold_changed(&mut self, callback: impl FnMut(&GoldChanged) + 'static) -> SubscriptionId {
        self.gold_changed.subscribe(callback)
    }

    /// Subscribe to honor changes.
    pub fn on_honor_changed(
        &mut self,
        callback: impl FnMut(&HonorChanged) + 'static,
    ) -> SubscriptionId {
        self.honor_changed.subscribe(callback)
    }

    /// Remove a gold subscriber.
    pub fn unsubscribe_gold(&mut self, id: SubscriptionId) -> bool {
        self.gold_changed.unsubscribe(id)
    }

    /// Remove an honor subscriber.
    pub fn unsubscribe_honor(&mut self, id: SubscriptionId) -> bool {
        self.honor_changed.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn record_gold(ledger: &mut ResourceLedger) -> Rc<RefCell<Vec<f64>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        ledger.on_gold_changed(move |e| sink.borrow_mut().push(e.delta));
        log
    }

    #[test]
    fn test_add_gold_emits_positive_delta() {
        let mut ledger = ResourceLedger::new(0.0);
        let log = record_gold(&mut ledger);

        ledger.add_gold(25.0);
        assert_eq!(ledger.gold(), 25.0);
        assert_eq!(*log.borrow(), vec![25.0]);
    }

    #[test]
    fn test_add_gold_non_positive_is_noop() {
        let mut ledger = ResourceLedger::new(10.0);
        let log = record_gold(&mut ledger);

        ledger.add_gold(0.0);
        ledger.add_gold(-5.0);
        ledger.add_gold(f64::NAN);

        assert_eq!(ledger.gold(), 10.0);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_spend_gold() {
        let mut ledger = ResourceLedger::new(100.0);
        let log = record_gold(&mut ledger);

        assert!(ledger.can_afford(50.0));
        assert!(ledger.spend_gold(50.0));
        assert_eq!(ledger.gold(), 50.0);

        assert!(!ledger.can_afford(100.0));
        assert!(!ledger.spend_gold(100.0));
        assert_eq!(ledger.gold(), 50.0); // Unchanged

        assert_eq!(*log.borrow(), vec![-50.0]);
    }

    #[test]
    fn test_spend_exact_balance() {
        let mut ledger = ResourceLedger::new(100.0);
        assert!(ledger.spend_gold(100.0));
        assert_eq!(ledger.gold(), 0.0);
    }

    #[test]
    fn test_add_honor_separate_channel() {
        let mut ledger = ResourceLedger::new(0.0);
        let gold = record_gold(&mut ledger);
        let honor = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&honor);
        ledger.on_honor_changed(move |e| sink.borrow_mut().push(e.delta));

        ledger.add_honor(3.0);
        ledger.add_honor(-1.0);

        assert_eq!(ledger.honor(), 3.0);
        assert_eq!(*honor.borrow(), vec![3.0]);
        assert!(gold.borrow().is_empty());
    }

    #[test]
    fn test_passive_income_whole_seconds() {
        let mut ledger = ResourceLedger::new(0.0);
        ledger.set_passive_income_per_second(2.0);

        for _ in 0..9 {
            ledger.tick(0.1);
        }
        assert_eq!(ledger.gold(), 0.0);

        ledger.tick(0.15);
        assert_eq!(ledger.gold(), 2.0);

        ledger.tick(3.0);
        assert_eq!(ledger.gold(), 8.0);
    }

    #[test]
    fn test_passive_income_long_step_is_one_credit() {
        let mut ledger = ResourceLedger::new(0.0);
        ledger.set_passive_income_per_second(0.5);
        let log = record_gold(&mut ledger);

        ledger.tick(1.0e9 + 0.25);

        assert!((ledger.gold() - 5.0e8).abs() < 1e-3);
        assert_eq!(log.borrow().len(), 1);

        // The fractional remainder still counts toward the next second.
        ledger.tick(0.75);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn test_reset_for_prestige() {
        let mut ledger = ResourceLedger::new(5000.0);
        ledger.add_samurai(4);
        ledger.add_peasants(9);
        ledger.add_honor(2.0);
        let log = record_gold(&mut ledger);

        ledger.reset_for_prestige(2000.0);

        assert_eq!(ledger.gold(), 2000.0);
        assert_eq!(ledger.samurai(), 0);
        assert_eq!(ledger.peasants(), 0);
        assert_eq!(ledger.honor(), 2.0);
        assert_eq!(*log.borrow(), vec![-3000.0]);
    }

    #[test]
    fn test_apply_bonus_is_additive() {
        let mut ledger = ResourceLedger::new(0.0);
        ledger.apply_bonus(BonusEffect::IncomeMultiplier, 0.25);
        ledger.apply_bonus(BonusEffect::IncomeMultiplier, 0.25);
        ledger.apply_bonus(BonusEffect::TroopCapacity, 2.0);

        assert_eq!(ledger.multipliers().global_income, 1.5);
        assert_eq!(ledger.multipliers().extra_troop_capacity, 2);
        assert_eq!(ledger.multipliers().offline_earnings, 1.0);
    }
}
