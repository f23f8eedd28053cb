//! Subscription identifiers and handles.
//!
//! Every callable registered with a [`Notifier`](super::Notifier) gets a
//! [`SubscriptionId`] and the caller receives a [`Subscription`] handle. The
//! handle only holds a weak reference to the notifier's subscriber list, so
//! it stays valid (and harmless) after the notifier itself is gone.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Weak;

/// Unique identifier for a subscription.
///
/// IDs are drawn from a process-wide counter, so within one notifier they
/// increase in subscription order. The notifier relies on that ordering to
/// resume delivery after a callback mutates the subscriber list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Generate a new unique subscription ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything a [`Subscription`] can be removed from.
///
/// Implemented by the notifier's shared subscriber list. Kept object-safe so
/// that handles from notifiers with different argument types can be stored
/// side by side.
pub(crate) trait SubscriptionTarget: Send + Sync {
    /// Remove the subscription. Returns whether it was still present.
    fn remove(&self, id: SubscriptionId) -> bool;

    /// Whether the subscription is still registered.
    fn contains(&self, id: SubscriptionId) -> bool;
}

/// Handle to a subscription.
///
/// The only meaningful operation is [`unsubscribe`](Subscription::unsubscribe).
/// Dropping the handle does *not* unsubscribe; the callable stays registered
/// for as long as the notifier lives.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    target: Weak<dyn SubscriptionTarget>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, target: Weak<dyn SubscriptionTarget>) -> Self {
        Self { id, target }
    }

    /// Get the subscription's ID.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Remove the subscribed callable from its notifier.
    ///
    /// Idempotent. If the notifier has already been dropped this is a no-op.
    pub fn unsubscribe(&self) {
        if let Some(target) = self.target.upgrade() {
            if target.remove(self.id) {
                tracing::debug!(subscription = self.id.raw(), "unsubscribed");
            }
        }
    }

    /// Whether the callable is still registered with a live notifier.
    pub fn is_active(&self) -> bool {
        self.target
            .upgrade()
            .map(|target| target.contains(self.id))
            .unwrap_or(false)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
