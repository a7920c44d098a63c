//! Change notifications for presentation collaborators.
//!
//! Each emitting component owns one [`Signal`] per notification kind.
//! Subscribers are plain closures invoked synchronously, in registration
//! order, every time the owner emits.

use std::fmt;

/// Handle returned by [`Signal::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Gold balance changed. Negative for spends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoldChanged {
    /// Signed change applied to the balance.
    pub delta: f64,
    /// Balance after the change.
    pub balance: f64,
}

/// Honor balance changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HonorChanged {
    /// Amount added.
    pub delta: f64,
    /// Balance after the change.
    pub balance: f64,
}

/// A building gained a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildingUpgraded {
    /// Building that was upgraded.
    pub building_id: String,
    /// Level after the upgrade.
    pub new_level: u32,
}

/// A user activation changed a module's state.
///
/// Refusals such as a running boost, a full roster or a short balance are
/// not reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleActivated {
    /// Building owning the module.
    pub building_id: String,
    /// Module name as declared in the catalog.
    pub module_name: String,
}

type Subscriber<T> = Box<dyn FnMut(&T)>;

/// Ordered list of subscribers for one notification kind.
pub struct Signal<T> {
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
    next_id: u64,
}

impl<T> Signal<T> {
    /// Create a signal with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Register a subscriber. It runs after every previously registered one.
    pub fn subscribe(&mut self, callback: impl FnMut(&T) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if the handle was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every subscriber.
    pub fn emit(&mut self, event: &T) {
        for (_, callback) in &mut self.subscribers {
            callback(event);
        }
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether nobody is listening.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
