//! Property Implementation
//!
//! A Property is an observable value slot. It owns a [`Backing`] that stores
//! the value and a [`Notifier`] that announces changes.
//!
//! # How Properties Work
//!
//! 1. `set` offers the value to the backing.
//!
//! 2. If the backing reports a change and the property has validators,
//!    `on_validate` fires first. A validator that rejects the value makes
//!    the backing put the previous value back, and nobody else hears about
//!    the write. [`try_set`](Property::try_set) returns the rejection.
//!
//! 3. Otherwise `on_change` fires synchronously, before `set` returns.
//!
//! 4. Subscribers receive the [`PropertyCell`] itself rather than a copy of
//!    the value. Reading it always yields the value stored *now*, so a
//!    subscriber that rewrites the property is seen by every later
//!    subscriber in the same pass.
//!
//! # Ownership
//!
//! A `Property` is the single owner of its cell and is not `Clone`. Bindings,
//! derived properties and core updaters keep a [`WeakProperty`] and check
//! liveness before every use. When the owner drops the property, those
//! links go quiet instead of dangling.
//!
//! # Thread Safety
//!
//! `get` and `set` may be called from any thread. The value lock is released
//! before subscribers run. Delivery uses the notifier variant picked at
//! construction (see [`ThreadSafety`]). While validators run, readers on
//! other threads may briefly see the proposed value.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::backing::{Backing, GetterSetterBacking, SetterBacking, Streaming, TransformBacking, Value, ValueBacking};
use super::notifier::{Notifier, ThreadSafety};
use super::subscriber::Subscription;
use crate::error::{CoreError, Result};

/// Counter for generating unique property IDs.
static PROPERTY_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PropertyId(u64);

impl PropertyId {
    fn next() -> Self {
        Self(PROPERTY_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A write awaiting approval, handed to `on_validate` subscribers.
///
/// The property already holds the proposed value, so validators simply read
/// it. Calling [`reject`](Validation::reject) refuses the write; the first
/// rejection is the one reported.
#[derive(Debug, Default)]
pub struct Validation {
    rejection: Mutex<Option<CoreError>>,
}

impl Validation {
    /// Refuse the proposed value.
    pub fn reject(&self, error: CoreError) {
        let mut rejection = self.rejection.lock();
        if rejection.is_none() {
            *rejection = Some(error);
        }
    }

    /// Whether a validator has refused the value.
    pub fn is_rejected(&self) -> bool {
        self.rejection.lock().is_some()
    }

    fn into_rejection(self) -> Option<CoreError> {
        self.rejection.into_inner()
    }
}

/// The shared state of a property, and the live accessor handed to
/// `on_change` subscribers.
pub struct PropertyCell<T: Value> {
    id: PropertyId,
    backing: Box<dyn Backing<T>>,
    on_validate: Notifier<Validation>,
    on_change: Notifier<PropertyCell<T>>,
    /// Subscriptions on upstream properties (derived properties only).
    upstream: Mutex<SmallVec<[Subscription; 1]>>,
}

impl<T: Value> PropertyCell<T> {
    fn new(backing: Box<dyn Backing<T>>, thread_safety: ThreadSafety) -> Self {
        Self {
            id: PropertyId::next(),
            backing,
            on_validate: Notifier::with_thread_safety(thread_safety),
            on_change: Notifier::with_thread_safety(thread_safety),
            upstream: Mutex::new(SmallVec::new()),
        }
    }

    /// Get the property's unique ID.
    pub fn id(&self) -> PropertyId {
        self.id
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.backing.get()
    }

    /// Set a new value and notify subscribers if it changed.
    ///
    /// A value refused by a validator is dropped without a trace; use
    /// [`try_set`](Self::try_set) to learn why.
    pub fn set(&self, value: T) {
        let _ = self.try_set(value);
    }

    /// Set a new value, reporting a validator's rejection.
    ///
    /// Returns whether the value changed.
    pub fn try_set(&self, value: T) -> Result<bool> {
        let previous = (!self.on_validate.is_empty()).then(|| self.backing.get());
        if !self.backing.set(value) {
            return Ok(false);
        }

        if let Some(previous) = previous {
            let validation = Validation::default();
            self.on_validate.fire(&validation);
            if let Some(error) = validation.into_rejection() {
                self.backing.restore(previous);
                tracing::debug!(property = self.id.raw(), %error, "write rejected by validator");
                return Err(error);
            }
        }

        self.notify();
        Ok(true)
    }

    /// Set a new value without notifying subscribers.
    ///
    /// Validators are not consulted.
    pub fn set_silently(&self, value: T) {
        self.backing.set_silently(value);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let new_value = f(&self.get());
        self.set(new_value);
    }

    /// The change notifier.
    pub fn on_change(&self) -> &Notifier<PropertyCell<T>> {
        &self.on_change
    }

    /// The notifier consulted before a write is announced.
    pub fn on_validate(&self) -> &Notifier<Validation> {
        &self.on_validate
    }

    /// Whether writes are always declined.
    pub fn is_read_only(&self) -> bool {
        self.backing.is_read_only()
    }

    fn notify(&self) {
        tracing::trace!(property = self.id.raw(), "property changed");
        self.on_change.fire(self);
    }

    /// Called when an upstream property changed.
    fn upstream_changed(&self) {
        if self.backing.refresh() {
            self.notify();
        }
    }
}

impl<T: Value> Drop for PropertyCell<T> {
    fn drop(&mut self) {
        for subscription in self.upstream.get_mut().drain(..) {
            subscription.unsubscribe();
        }
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for PropertyCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyCell")
            .field("id", &self.id)
            .field("value", &self.get())
            .finish()
    }
}

/// An observable value of type T.
///
/// # Example
///
/// ```rust,ignore
/// let label = Property::new(String::new());
/// label.on_change().subscribe(|cell| println!("label is now {}", cell.get()));
///
/// label.set("hi".to_string());
/// ```
pub struct Property<T: Value> {
    cell: Arc<PropertyCell<T>>,
}

impl<T: Value> Property<T> {
    /// Create a property with plain storage and a simple notifier.
    pub fn new(value: T) -> Self {
        Self::from_backing(ValueBacking::new(value), ThreadSafety::Simple)
    }

    /// Create a property with plain storage and a synchronized notifier.
    pub fn synchronized(value: T) -> Self {
        Self::from_backing(ValueBacking::new(value), ThreadSafety::Synchronized)
    }

    /// Create a property whose writes pass through `setter`.
    ///
    /// See [`SetterBacking`].
    pub fn with_setter<F>(initial: T, setter: F) -> Self
    where
        F: Fn(&T, T) -> Option<T> + Send + Sync + 'static,
    {
        Self::from_backing(SetterBacking::new(initial, setter), ThreadSafety::Simple)
    }

    /// Create a property over a value owned elsewhere.
    ///
    /// See [`GetterSetterBacking`].
    pub fn with_getter_setter<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) -> bool + Send + Sync + 'static,
    {
        Self::from_backing(GetterSetterBacking::new(getter, setter), ThreadSafety::Simple)
    }

    /// Create a property over a custom backing.
    pub fn from_backing<B>(backing: B, thread_safety: ThreadSafety) -> Self
    where
        B: Backing<T> + 'static,
    {
        Self {
            cell: Arc::new(PropertyCell::new(Box::new(backing), thread_safety)),
        }
    }

    /// Create a read-only property computed from `source`.
    pub fn derived<S, F>(source: &Property<S>, forward: F) -> Self
    where
        S: Value,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        Self::derive(source, Box::new(forward), None)
    }

    /// Create a property computed from `source` that writes back through
    /// `inverse`.
    pub fn derived_with_inverse<S, F, G>(source: &Property<S>, forward: F, inverse: G) -> Self
    where
        S: Value,
        F: Fn(&S) -> T + Send + Sync + 'static,
        G: Fn(&T) -> S + Send + Sync + 'static,
    {
        Self::derive(source, Box::new(forward), Some(Box::new(inverse)))
    }

    #[allow(clippy::type_complexity)]
    fn derive<S: Value>(
        source: &Property<S>,
        forward: Box<dyn Fn(&S) -> T + Send + Sync>,
        inverse: Option<Box<dyn Fn(&T) -> S + Send + Sync>>,
    ) -> Self {
        let initial = forward(&source.get());
        let backing = TransformBacking::new(Arc::downgrade(&source.cell), initial, forward, inverse);
        let property = Self::from_backing(backing, source.thread_safety());

        let derived = Arc::downgrade(&property.cell);
        let subscription = source.on_change().subscribe(move |_| {
            if let Some(cell) = derived.upgrade() {
                cell.upstream_changed();
            }
        });
        property.cell.upstream.lock().push(subscription);

        property
    }

    /// Get the property's unique ID.
    pub fn id(&self) -> PropertyId {
        self.cell.id()
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.cell.get()
    }

    /// Set a new value and notify subscribers if it changed.
    pub fn set(&self, value: T) {
        self.cell.set(value);
    }

    /// Set a new value, reporting a validator's rejection.
    ///
    /// Returns whether the value changed.
    pub fn try_set(&self, value: T) -> Result<bool> {
        self.cell.try_set(value)
    }

    /// Set a new value without notifying subscribers.
    pub fn set_silently(&self, value: T) {
        self.cell.set_silently(value);
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.cell.update(f);
    }

    /// The change notifier.
    pub fn on_change(&self) -> &Notifier<PropertyCell<T>> {
        self.cell.on_change()
    }

    /// The notifier consulted before a write is announced.
    pub fn on_validate(&self) -> &Notifier<Validation> {
        self.cell.on_validate()
    }

    /// Get the notifier's thread-safety variant.
    pub fn thread_safety(&self) -> ThreadSafety {
        self.cell.on_change().thread_safety()
    }

    /// Whether writes are always declined.
    pub fn is_read_only(&self) -> bool {
        self.cell.is_read_only()
    }

    /// The live accessor for this property.
    pub fn cell(&self) -> &PropertyCell<T> {
        &self.cell
    }

    /// Create a non-owning handle.
    pub fn downgrade(&self) -> WeakProperty<T> {
        WeakProperty {
            cell: Arc::downgrade(&self.cell),
        }
    }
}

impl Property<String> {
    /// Create a read-only string property assembled from `streaming`.
    ///
    /// The text is rebuilt whenever one of the streamed properties changes.
    pub fn streaming(streaming: Streaming) -> Self {
        let (backing, watches) = streaming.into_parts();
        let property = Self::from_backing(backing, ThreadSafety::Simple);

        let streamed = Arc::downgrade(&property.cell);
        let changed: Arc<dyn Fn() + Send + Sync> = Arc::new(move || {
            if let Some(cell) = streamed.upgrade() {
                cell.upstream_changed();
            }
        });
        property
            .cell
            .upstream
            .lock()
            .extend(watches.into_iter().filter_map(|watch| watch(Arc::clone(&changed))));

        property
    }
}

impl<T: Value + Default> Default for Property<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Value> PartialEq<T> for Property<T> {
    fn eq(&self, other: &T) -> bool {
        self.get() == *other
    }
}

impl<T: Value + fmt::Display> fmt::Display for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.get(), f)
    }
}

impl<T: Value + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.id())
            .field("value", &self.get())
            .field("subscriber_count", &self.on_change().subscriber_count())
            .finish()
    }
}

/// Non-owning handle to a [`Property`].
pub struct WeakProperty<T: Value> {
    cell: Weak<PropertyCell<T>>,
}

impl<T: Value> WeakProperty<T> {
    /// Whether the property still exists.
    pub fn is_alive(&self) -> bool {
        self.cell.strong_count() > 0
    }

    /// Get the current value, if the property still exists.
    pub fn get(&self) -> Option<T> {
        self.cell.upgrade().map(|cell| cell.get())
    }

    /// Set the value. Returns false if the property is gone.
    pub fn set(&self, value: T) -> bool {
        match self.cell.upgrade() {
            Some(cell) => {
                cell.set(value);
                true
            }
            None => false,
        }
    }

    /// Run `f` against the live cell, if the property still exists.
    pub fn with<R>(&self, f: impl FnOnce(&PropertyCell<T>) -> R) -> Option<R> {
        self.cell.upgrade().map(|cell| f(&cell))
    }

    pub(crate) fn upgrade(&self) -> Option<Arc<PropertyCell<T>>> {
        self.cell.upgrade()
    }
}

impl<T: Value> Clone for WeakProperty<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Weak::clone(&self.cell),
        }
    }
}

impl<T: Value> fmt::Debug for WeakProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakProperty")
            .field("alive", &self.is_alive())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn property_get_and_set() {
        let property = Property::new(0);
        assert_eq!(property.get(), 0);

        property.set(42);
        assert_eq!(property.get(), 42);
        assert!(property == 42);
    }

    #[test]
    fn property_update() {
        let property = Property::new(10);
        property.update(|v| v + 5);
        assert_eq!(property.get(), 15);
    }

    #[test]
    fn property_notifies_only_on_change() {
        let property = Property::new("Hallo Welt".to_string());
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        property.on_change().subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        property.set("Hallo Welt".to_string());
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        property.set("Hello World".to_string());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn set_silently_skips_notification() {
        let property = Property::new(1);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        property.on_change().subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        property.set_silently(2);
        assert_eq!(property.get(), 2);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn subscribers_observe_live_value() {
        let property = Property::new(0);
        let observed = Arc::new(Mutex::new(Vec::new()));

        // First subscriber rewrites 1 to 2
        property.on_change().subscribe(|cell| {
            if cell.get() == 1 {
                cell.set(2);
            }
        });

        let observed_clone = observed.clone();
        property.on_change().subscribe(move |cell| {
            observed_clone.lock().push(cell.get());
        });

        property.set(1);

        // Nested pass and outer pass both see the rewritten value
        assert_eq!(*observed.lock(), vec![2, 2]);
        assert_eq!(property.get(), 2);
    }

    #[test]
    fn rejecting_setter_never_notifies() {
        let property = Property::with_setter(7, |_, _: i32| None);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        property.on_change().subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        for value in 0..10 {
            property.set(value);
        }

        assert_eq!(property.get(), 7);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn derived_property_follows_source() {
        let source = Property::new(2);
        let doubled = Property::derived(&source, |v: &i32| v * 2);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        doubled.on_change().subscribe(move |cell| {
            assert_eq!(cell.get() % 2, 0);
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(doubled.get(), 4);

        source.set(5);
        assert_eq!(doubled.get(), 10);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn derived_property_skips_unchanged_results() {
        let source = Property::new(1);
        let positive = Property::derived(&source, |v: &i32| *v > 0);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        positive.on_change().subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        source.set(2);
        source.set(3);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        source.set(-1);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(!positive.get());
    }

    #[test]
    fn derived_property_writes_through_inverse() {
        let celsius = Property::new(0.0_f64);
        let fahrenheit = Property::derived_with_inverse(
            &celsius,
            |c: &f64| c * 9.0 / 5.0 + 32.0,
            |f: &f64| (f - 32.0) * 5.0 / 9.0,
        );
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        fahrenheit.on_change().subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        fahrenheit.set(212.0);
        assert_eq!(celsius.get(), 100.0);
        assert_eq!(fahrenheit.get(), 212.0);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn silent_write_through_inverse_stays_silent() {
        let source = Property::new(1);
        let next = Property::derived_with_inverse(&source, |v: &i32| v + 1, |v: &i32| v - 1);
        let source_count = Arc::new(AtomicI32::new(0));
        let next_count = Arc::new(AtomicI32::new(0));

        let source_count_clone = source_count.clone();
        source.on_change().subscribe(move |_| {
            source_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        let next_count_clone = next_count.clone();
        next.on_change().subscribe(move |_| {
            next_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        next.set_silently(10);
        assert_eq!(source.get(), 9);
        assert_eq!(next.get(), 10);
        assert_eq!(source_count.load(Ordering::SeqCst), 0);
        assert_eq!(next_count.load(Ordering::SeqCst), 0);

        source.set(20);
        assert_eq!(next_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn read_only_derived_property_rejects_writes() {
        let source = Property::new(3);
        let squared = Property::derived(&source, |v: &i32| v * v);

        assert!(squared.is_read_only());
        squared.set(100);
        assert_eq!(squared.get(), 9);
        assert_eq!(source.get(), 3);
    }

    #[test]
    fn derived_property_outlives_source() {
        let source = Property::new(4);
        let halved = Property::derived(&source, |v: &i32| v / 2);

        drop(source);

        // Last announced value is kept
        assert_eq!(halved.get(), 2);
    }

    #[test]
    fn dropping_derived_unsubscribes_from_source() {
        let source = Property::new(0);
        let derived = Property::derived(&source, |v: &i32| v + 1);
        assert_eq!(source.on_change().subscriber_count(), 1);

        drop(derived);
        assert_eq!(source.on_change().subscriber_count(), 0);
    }

    #[test]
    fn getter_setter_property_notifies_on_change() {
        let external = Arc::new(Mutex::new("a".to_string()));
        let property = {
            let read = external.clone();
            let write = external.clone();
            Property::with_getter_setter(
                move || read.lock().clone(),
                move |value: String| {
                    *write.lock() = value;
                    true
                },
            )
        };
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();
        property.on_change().subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        property.set("b".to_string());
        assert_eq!(*external.lock(), "b");
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        property.set("b".to_string());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn streaming_property_follows_its_parts() {
        let name = Property::new("World".to_string());
        let count = Property::new(1_u32);
        let greeting = Property::streaming(
            Streaming::new()
                .text("Hello, ")
                .property(&name)
                .text(" x")
                .property(&count),
        );
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();
        greeting.on_change().subscribe(move |cell| seen_clone.lock().push(cell.get()));

        assert_eq!(greeting.get(), "Hello, World x1");
        assert!(greeting.is_read_only());

        name.set("Trellis".to_string());
        count.set(2);
        assert_eq!(
            *seen.lock(),
            vec!["Hello, Trellis x1".to_string(), "Hello, Trellis x2".to_string()]
        );

        greeting.set("ignored".to_string());
        assert_eq!(greeting.get(), "Hello, Trellis x2");

        drop(greeting);
        assert!(name.on_change().is_empty());
        assert!(count.on_change().is_empty());
    }

    #[test]
    fn rejected_write_is_never_announced() {
        let property = Property::new(1);
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();
        property.on_change().subscribe(move |_| {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let weak = property.downgrade();
        property.on_validate().subscribe(move |validation| {
            if weak.get() == Some(13) {
                validation.reject(CoreError::NoCoreType);
            }
        });

        assert_eq!(property.try_set(13), Err(CoreError::NoCoreType));
        assert_eq!(property.get(), 1);

        property.set(13);
        assert_eq!(property.get(), 1);
        assert_eq!(call_count.load(Ordering::SeqCst), 0);

        assert_eq!(property.try_set(2), Ok(true));
        assert_eq!(property.try_set(2), Ok(false));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rejected_write_restores_past_setter() {
        // Only increasing values are accepted by the setter
        let property = Property::with_setter(1, |current: &i32, proposed| {
            (proposed > *current).then_some(proposed)
        });
        property.on_validate().subscribe(|validation| validation.reject(CoreError::NoCoreType));

        assert!(property.try_set(5).is_err());
        assert_eq!(property.get(), 1);
    }

    #[test]
    fn weak_property_tracks_liveness() {
        let property = Property::new(1);
        let weak = property.downgrade();

        assert!(weak.set(5));
        assert_eq!(weak.get(), Some(5));
        assert_eq!(property.get(), 5);

        drop(property);
        assert!(!weak.is_alive());
        assert_eq!(weak.get(), None);
        assert!(!weak.set(6));
    }

    #[test]
    fn set_from_other_thread_is_visible() {
        let property = Arc::new(Property::synchronized(0));

        let handles: Vec<_> = (1..=4)
            .map(|n| {
                let property = Arc::clone(&property);
                std::thread::spawn(move || property.set(n))
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert!((1..=4).contains(&property.get()));
    }

    #[test]
    fn synchronized_property_rewrite_in_subscriber() {
        let property = Property::synchronized(0);
        property.on_change().subscribe(|cell| {
            if cell.get() > 10 {
                cell.set(10);
            }
        });

        property.set(50);
        assert_eq!(property.get(), 10);
    }
}
