//! Notifier Implementation
//!
//! A Notifier is an ordered multicast callback registry. Callables are
//! delivered to in subscription order, and each [`fire`](Notifier::fire)
//! re-reads the subscriber list before every call:
//!
//! - a callable subscribed during a pass is reached later in that pass,
//! - a callable removed before its turn is skipped,
//! - no callable runs twice in the same pass.
//!
//! # Thread Safety
//!
//! The subscriber list is always behind a short-lived lock, and that lock is
//! never held while a callable runs. The two [`ThreadSafety`] variants differ
//! in how whole delivery passes relate to each other:
//!
//! - `Simple`: passes are not serialized. Fire from the owning thread only.
//! - `Synchronized`: passes are serialized by a reentrant mutex. Concurrent
//!   fires from other threads wait for the running pass. A callable may fire,
//!   subscribe or unsubscribe on the same notifier from inside its own
//!   callback; the nested pass runs immediately on the same thread.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::subscriber::{Subscription, SubscriptionId, SubscriptionTarget};

/// How a notifier's delivery passes are protected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadSafety {
    /// No serialization of delivery passes.
    #[default]
    Simple,

    /// Delivery passes are serialized across threads.
    Synchronized,
}

type Callback<A> = Arc<dyn Fn(&A) + Send + Sync>;

/// The subscriber list shared between a notifier and its handles.
struct NotifierShared<A: ?Sized> {
    /// Subscribers in subscription order (ascending IDs).
    subscribers: Mutex<SmallVec<[(SubscriptionId, Callback<A>); 4]>>,

    /// Held for the duration of a pass by synchronized notifiers.
    delivery: Option<ReentrantMutex<()>>,
}

impl<A: ?Sized> NotifierShared<A> {
    /// Return the first subscriber registered after `cursor`.
    fn next_after(&self, cursor: Option<SubscriptionId>) -> Option<(SubscriptionId, Callback<A>)> {
        let subscribers = self.subscribers.lock();
        let start = match cursor {
            None => 0,
            Some(last) => subscribers.partition_point(|(id, _)| *id <= last),
        };
        subscribers
            .get(start)
            .map(|(id, callback)| (*id, Arc::clone(callback)))
    }
}

impl<A: ?Sized + 'static> SubscriptionTarget for NotifierShared<A> {
    fn remove(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        match subscribers.iter().position(|(sub_id, _)| *sub_id == id) {
            Some(index) => {
                // Keep the order intact; delivery resumes by ID.
                subscribers.remove(index);
                true
            }
            None => false,
        }
    }

    fn contains(&self, id: SubscriptionId) -> bool {
        self.subscribers
            .lock()
            .iter()
            .any(|(sub_id, _)| *sub_id == id)
    }
}

/// An ordered list of subscribed callables.
///
/// # Type Parameters
///
/// - `A`: The argument passed by reference to every callable. Use a tuple
///   for several arguments.
///
/// # Example
///
/// ```rust,ignore
/// let notifier = Notifier::<i32>::new();
/// let sub = notifier.subscribe(|value| println!("got {value}"));
///
/// notifier.fire(&42);
/// sub.unsubscribe();
/// ```
pub struct Notifier<A: ?Sized> {
    shared: Arc<NotifierShared<A>>,
    thread_safety: ThreadSafety,
}

impl<A: ?Sized + 'static> Notifier<A> {
    /// Create a simple (unserialized) notifier.
    pub fn new() -> Self {
        Self::with_thread_safety(ThreadSafety::Simple)
    }

    /// Create a notifier whose delivery passes are serialized.
    pub fn synchronized() -> Self {
        Self::with_thread_safety(ThreadSafety::Synchronized)
    }

    /// Create a notifier with the given thread-safety variant.
    pub fn with_thread_safety(thread_safety: ThreadSafety) -> Self {
        let delivery = match thread_safety {
            ThreadSafety::Simple => None,
            ThreadSafety::Synchronized => Some(ReentrantMutex::new(())),
        };

        Self {
            shared: Arc::new(NotifierShared {
                subscribers: Mutex::new(SmallVec::new()),
                delivery,
            }),
            thread_safety,
        }
    }

    /// Get the thread-safety variant.
    pub fn thread_safety(&self) -> ThreadSafety {
        self.thread_safety
    }

    /// Append a callable to the delivery list.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&A) + Send + Sync + 'static,
    {
        let id = {
            let mut subscribers = self.shared.subscribers.lock();
            // Allocated under the lock so IDs stay ordered within the list
            let id = SubscriptionId::new();
            subscribers.push((id, Arc::new(callback)));
            id
        };

        tracing::trace!(subscription = id.raw(), "subscribed");

        let shared: Weak<NotifierShared<A>> = Arc::downgrade(&self.shared);
        let target: Weak<dyn SubscriptionTarget> = shared;
        Subscription::new(id, target)
    }

    /// Subscribe a callable that ignores the notification arguments.
    pub fn subscribe_paramless<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.subscribe(move |_| callback())
    }

    /// Remove a subscription. Safe to call repeatedly.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.shared.remove(subscription.id());
    }

    /// Remove every subscription.
    ///
    /// A pass that is currently delivering stops at its next step.
    pub fn unsubscribe_all(&self) {
        self.shared.subscribers.lock().clear();
    }

    /// Invoke every subscribed callable in subscription order.
    pub fn fire(&self, args: &A) {
        let _serial = self.shared.delivery.as_ref().map(|mutex| mutex.lock());

        let mut cursor = None;
        let mut delivered = 0usize;
        while let Some((id, callback)) = self.shared.next_after(cursor) {
            cursor = Some(id);
            callback(args);
            delivered += 1;
        }

        tracing::trace!(delivered, "notifier fired");
    }

    /// Get the number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.shared.subscribers.lock().len()
    }

    /// Whether nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscriber_count() == 0
    }
}

impl<A: ?Sized + 'static> Default for Notifier<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: ?Sized + 'static> fmt::Debug for Notifier<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("thread_safety", &self.thread_safety)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, Arc<Mutex<Vec<&'static str>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        (log.clone(), log)
    }

    #[test]
    fn delivers_in_subscription_order() {
        let notifier = Notifier::<i32>::new();
        let (log, log_clone) = recorder();

        let l1 = log_clone.clone();
        notifier.subscribe(move |_| l1.lock().push("first"));
        let l2 = log_clone.clone();
        notifier.subscribe(move |_| l2.lock().push("second"));
        let l3 = log_clone;
        notifier.subscribe(move |_| l3.lock().push("third"));

        notifier.fire(&0);
        assert_eq!(*log.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn passes_arguments() {
        let notifier = Notifier::<(i32, &'static str)>::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = seen.clone();

        notifier.subscribe(move |(n, s)| *seen_clone.lock() = Some((*n, *s)));
        notifier.fire(&(7, "seven"));

        assert_eq!(*seen.lock(), Some((7, "seven")));
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let notifier = Notifier::<()>::new();
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let sub = notifier.subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        notifier.fire(&());
        sub.unsubscribe();
        sub.unsubscribe();
        notifier.unsubscribe(&sub);
        notifier.fire(&());

        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(!sub.is_active());
        assert!(notifier.is_empty());
    }

    #[test]
    fn unsubscribe_after_notifier_dropped() {
        let notifier = Notifier::<()>::new();
        let sub = notifier.subscribe(|_| {});
        assert!(sub.is_active());

        drop(notifier);

        assert!(!sub.is_active());
        sub.unsubscribe();
    }

    #[test]
    fn removal_before_run_is_honored() {
        let notifier = Arc::new(Notifier::<()>::new());
        let second_calls = Arc::new(AtomicI32::new(0));

        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let victim_clone = victim.clone();
        notifier.subscribe(move |_| {
            if let Some(sub) = victim_clone.lock().as_ref() {
                sub.unsubscribe();
            }
        });

        let second_clone = second_calls.clone();
        let sub = notifier.subscribe(move |_| {
            second_clone.fetch_add(1, Ordering::SeqCst);
        });
        *victim.lock() = Some(sub);

        notifier.fire(&());
        assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn self_unsubscribe_runs_once() {
        let notifier = Arc::new(Notifier::<()>::new());
        let calls = Arc::new(AtomicI32::new(0));
        let own: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let calls_clone = calls.clone();
        let own_clone = own.clone();
        let sub = notifier.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = own_clone.lock().as_ref() {
                sub.unsubscribe();
            }
        });
        *own.lock() = Some(sub);

        notifier.fire(&());
        notifier.fire(&());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscribe_during_fire_is_visible_in_same_pass() {
        let notifier = Arc::new(Notifier::<()>::new());
        let late_calls = Arc::new(AtomicI32::new(0));
        let added = Arc::new(AtomicBool::new(false));

        let notifier_clone = Arc::clone(&notifier);
        let late_clone = late_calls.clone();
        let added_clone = added.clone();
        notifier.subscribe(move |_| {
            if !added_clone.swap(true, Ordering::SeqCst) {
                let late = late_clone.clone();
                notifier_clone.subscribe(move |_| {
                    late.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        notifier.fire(&());
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);

        notifier.fire(&());
        assert_eq!(late_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn nested_fire_does_not_repeat_outer_callables() {
        let notifier = Arc::new(Notifier::<i32>::new());
        let (log, log_clone) = recorder();

        let notifier_clone = Arc::clone(&notifier);
        let l1 = log_clone.clone();
        notifier.subscribe(move |depth| {
            l1.lock().push("a");
            if *depth == 0 {
                notifier_clone.fire(&1);
            }
        });
        let l2 = log_clone;
        notifier.subscribe(move |_| l2.lock().push("b"));

        notifier.fire(&0);
        // outer a, nested a b, outer b
        assert_eq!(*log.lock(), vec!["a", "a", "b", "b"]);
    }

    #[test]
    fn unsubscribe_all_stops_running_pass() {
        let notifier = Arc::new(Notifier::<()>::new());
        let later = Arc::new(AtomicI32::new(0));

        let notifier_clone = Arc::clone(&notifier);
        notifier.subscribe(move |_| notifier_clone.unsubscribe_all());
        let later_clone = later.clone();
        notifier.subscribe(move |_| {
            later_clone.fetch_add(1, Ordering::SeqCst);
        });

        notifier.fire(&());
        assert_eq!(later.load(Ordering::SeqCst), 0);
        assert!(notifier.is_empty());
    }

    #[test]
    fn paramless_subscriber() {
        let notifier = Notifier::<String>::new();
        let calls = Arc::new(AtomicI32::new(0));
        let calls_clone = calls.clone();

        notifier.subscribe_paramless(move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        notifier.fire(&"ignored".to_string());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn synchronized_allows_reentrant_use_on_same_thread() {
        let notifier = Arc::new(Notifier::<i32>::synchronized());
        let calls = Arc::new(AtomicI32::new(0));

        let notifier_clone = Arc::clone(&notifier);
        let calls_clone = calls.clone();
        notifier.subscribe(move |depth| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            if *depth < 3 {
                // subscribe and fire from inside our own callback
                notifier_clone.subscribe(|_| {}).unsubscribe();
                notifier_clone.fire(&(depth + 1));
            }
        });

        notifier.fire(&0);
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn synchronized_serializes_concurrent_passes() {
        let notifier = Arc::new(Notifier::<()>::synchronized());
        let in_flight = Arc::new(AtomicBool::new(false));
        let overlapped = Arc::new(AtomicBool::new(false));

        let in_flight_clone = in_flight.clone();
        let overlapped_clone = overlapped.clone();
        notifier.subscribe(move |_| {
            if in_flight_clone.swap(true, Ordering::SeqCst) {
                overlapped_clone.store(true, Ordering::SeqCst);
            }
            std::thread::sleep(std::time::Duration::from_millis(1));
            in_flight_clone.store(false, Ordering::SeqCst);
        });

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let notifier = Arc::clone(&notifier);
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        notifier.fire(&());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!(!overlapped.load(Ordering::SeqCst));
    }
}
