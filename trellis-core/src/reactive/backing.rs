//! Backing strategies
//!
//! A [`Backing`] is the storage behind a single [`Property`](super::Property)
//! value slot. The property owns exactly one backing and routes every read
//! and write through it; the backing decides what "storing" means and tells
//! the property whether the stored value actually changed.
//!
//! Strategies that ship with the crate:
//!
//! - [`ValueBacking`]: plain in-memory storage.
//! - [`SetterBacking`]: storage mediated by a setter that can reject or
//!   rewrite proposed values.
//! - [`GetterSetterBacking`]: a value owned elsewhere, reached through a
//!   getter and a setter.
//! - [`TransformBacking`]: a value derived from another property, with an
//!   optional inverse for writes.
//! - [`Streaming`]: read-only text assembled from literals and the live
//!   values of other properties.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use super::property::{Property, PropertyCell};
use super::subscriber::Subscription;

/// Bounds every property value type must satisfy.
///
/// `PartialEq` lets backings report whether a write changed anything, which
/// is what keeps redundant notifications (and binding echoes) from happening.
pub trait Value: Clone + PartialEq + Send + Sync + 'static {}

impl<T> Value for T where T: Clone + PartialEq + Send + Sync + 'static {}

/// Storage strategy for a single property value.
pub trait Backing<T: Value>: Send + Sync {
    /// Return the current value.
    fn get(&self) -> T;

    /// Offer a new value. Returns whether the stored value changed.
    ///
    /// A backing that declines the value returns `false` and keeps its
    /// current value.
    fn set(&self, value: T) -> bool;

    /// Offer a new value on behalf of a silent write.
    ///
    /// Backings that write through to other properties must keep those
    /// quiet as well.
    fn set_silently(&self, value: T) -> bool {
        self.set(value)
    }

    /// Put back a value after a validator refused the one just stored.
    ///
    /// Unlike `set`, this must not decline.
    fn restore(&self, value: T) {
        self.set(value);
    }

    /// Re-evaluate after an upstream change. Returns whether the value changed.
    fn refresh(&self) -> bool {
        false
    }

    /// Whether every write will be declined.
    fn is_read_only(&self) -> bool {
        false
    }
}

/// Plain in-memory storage.
pub struct ValueBacking<T> {
    value: RwLock<T>,
}

impl<T: Value> ValueBacking<T> {
    /// Create a backing holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }
}

impl<T: Value> Backing<T> for ValueBacking<T> {
    fn get(&self) -> T {
        self.value.read().clone()
    }

    fn set(&self, value: T) -> bool {
        let mut guard = self.value.write();
        if *guard == value {
            return false;
        }
        *guard = value;
        true
    }
}

type SetterFn<T> = Box<dyn Fn(&T, T) -> Option<T> + Send + Sync>;

/// Storage mediated by a user-supplied setter.
///
/// The setter receives the current and the proposed value and returns the
/// value to store, or `None` to reject the write.
///
/// ```rust,ignore
/// // Clamp to 0..=100
/// let backing = SetterBacking::new(0, |_, proposed: i32| Some(proposed.clamp(0, 100)));
/// ```
pub struct SetterBacking<T> {
    value: RwLock<T>,
    setter: SetterFn<T>,
}

impl<T: Value> SetterBacking<T> {
    /// Create a setter-mediated backing with an initial value.
    ///
    /// The initial value is stored as-is; it does not pass through the setter.
    pub fn new<F>(initial: T, setter: F) -> Self
    where
        F: Fn(&T, T) -> Option<T> + Send + Sync + 'static,
    {
        Self {
            value: RwLock::new(initial),
            setter: Box::new(setter),
        }
    }
}

impl<T: Value> Backing<T> for SetterBacking<T> {
    fn get(&self) -> T {
        self.value.read().clone()
    }

    fn set(&self, value: T) -> bool {
        // The setter may read the property, so it runs without the lock held
        let current = self.value.read().clone();
        let Some(effective) = (self.setter)(&current, value) else {
            return false;
        };

        let mut guard = self.value.write();
        if *guard == effective {
            return false;
        }
        *guard = effective;
        true
    }

    fn restore(&self, value: T) {
        *self.value.write() = value;
    }
}

type GetterFn<T> = Box<dyn Fn() -> T + Send + Sync>;
type ExternalSetterFn<T> = Box<dyn Fn(T) -> bool + Send + Sync>;

/// A value that lives outside the property.
///
/// Reads call the getter. Writes of a value equal to the current one are
/// skipped; otherwise the setter stores it and reports whether anything
/// changed.
///
/// ```rust,ignore
/// let volume = Arc::new(AtomicU8::new(3));
/// let (get, put) = (volume.clone(), volume.clone());
/// let backing = GetterSetterBacking::new(
///     move || get.load(Ordering::SeqCst),
///     move |v| put.swap(v, Ordering::SeqCst) != v,
/// );
/// ```
pub struct GetterSetterBacking<T> {
    getter: GetterFn<T>,
    setter: ExternalSetterFn<T>,
}

impl<T: Value> GetterSetterBacking<T> {
    /// Create a backing over an external getter and setter.
    pub fn new<G, S>(getter: G, setter: S) -> Self
    where
        G: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) -> bool + Send + Sync + 'static,
    {
        Self {
            getter: Box::new(getter),
            setter: Box::new(setter),
        }
    }
}

impl<T: Value> Backing<T> for GetterSetterBacking<T> {
    fn get(&self) -> T {
        (self.getter)()
    }

    fn set(&self, value: T) -> bool {
        if (self.getter)() == value {
            return false;
        }
        (self.setter)(value)
    }
}

type ForwardFn<S, T> = Box<dyn Fn(&S) -> T + Send + Sync>;
type InverseFn<T, S> = Box<dyn Fn(&T) -> S + Send + Sync>;

/// A value computed from another property.
///
/// Reads recompute from the source while it is alive. `last` holds the value
/// most recently announced to subscribers; [`refresh`](Backing::refresh)
/// compares against it, and it is what reads return once the source is gone.
///
/// Writes go through the inverse function into the source. The derived
/// property's notification then arrives through the source's change
/// notification, so `set` itself always reports "unchanged".
pub struct TransformBacking<S: Value, T: Value> {
    source: Weak<PropertyCell<S>>,
    forward: ForwardFn<S, T>,
    inverse: Option<InverseFn<T, S>>,
    last: RwLock<T>,
}

impl<S: Value, T: Value> TransformBacking<S, T> {
    pub(crate) fn new(
        source: Weak<PropertyCell<S>>,
        initial: T,
        forward: ForwardFn<S, T>,
        inverse: Option<InverseFn<T, S>>,
    ) -> Self {
        Self {
            source,
            forward,
            inverse,
            last: RwLock::new(initial),
        }
    }
}

impl<S: Value, T: Value> TransformBacking<S, T> {
    /// The source and the value to write into it, if writes are possible.
    fn write_back(&self, value: T) -> Option<(Arc<PropertyCell<S>>, S)> {
        let Some(inverse) = &self.inverse else {
            tracing::warn!("write to read-only derived property rejected");
            return None;
        };

        let Some(source) = self.source.upgrade() else {
            tracing::warn!("write to derived property whose source is gone rejected");
            return None;
        };

        let value = inverse(&value);
        Some((source, value))
    }
}

impl<S: Value, T: Value> Backing<T> for TransformBacking<S, T> {
    fn get(&self) -> T {
        match self.source.upgrade() {
            Some(source) => (self.forward)(&source.get()),
            None => self.last.read().clone(),
        }
    }

    fn set(&self, value: T) -> bool {
        if let Some((source, value)) = self.write_back(value) {
            source.set(value);
        }
        false
    }

    fn set_silently(&self, value: T) -> bool {
        let Some((source, value)) = self.write_back(value) else {
            return false;
        };

        // Nobody hears about this write, so it becomes the announced value
        source.set_silently(value);
        *self.last.write() = (self.forward)(&source.get());
        false
    }

    fn refresh(&self) -> bool {
        let Some(source) = self.source.upgrade() else {
            return false;
        };

        let value = (self.forward)(&source.get());
        let mut last = self.last.write();
        if *last == value {
            return false;
        }
        *last = value;
        true
    }

    fn is_read_only(&self) -> bool {
        self.inverse.is_none()
    }
}

// ----------------------------------------------------------------------------
// Streaming
// ----------------------------------------------------------------------------

type RenderFn = Box<dyn Fn() -> Option<String> + Send + Sync>;

/// Subscribes a change callback to one streamed property.
pub(crate) type Watch = Box<dyn FnOnce(Arc<dyn Fn() + Send + Sync>) -> Option<Subscription> + Send>;

enum Segment {
    Text(String),
    Live(RenderFn),
}

/// Builder for a streamed string property.
///
/// Literals are formatted once. Property segments are formatted from the
/// property's current value each time any streamed property changes.
///
/// ```rust,ignore
/// let name = Property::new("World".to_string());
/// let greeting = Property::streaming(Streaming::new().text("Hello, ").property(&name).text("!"));
/// assert_eq!(greeting.get(), "Hello, World!");
/// ```
#[derive(Default)]
pub struct Streaming {
    segments: Vec<Segment>,
    watches: Vec<Watch>,
}

impl Streaming {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a literal.
    pub fn text(mut self, text: impl fmt::Display) -> Self {
        self.segments.push(Segment::Text(text.to_string()));
        self
    }

    /// Append the live value of `property`.
    pub fn property<T: Value + fmt::Display>(mut self, property: &Property<T>) -> Self {
        let handle = property.downgrade();
        self.segments
            .push(Segment::Live(Box::new(move || handle.get().map(|value| value.to_string()))));

        let handle = property.downgrade();
        self.watches.push(Box::new(move |changed| {
            handle.with(|cell| cell.on_change().subscribe_paramless(move || changed()))
        }));
        self
    }

    pub(crate) fn into_parts(self) -> (StreamingBacking, Vec<Watch>) {
        (StreamingBacking::new(self.segments), self.watches)
    }
}

impl fmt::Debug for Streaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Streaming")
            .field("segments", &self.segments.len())
            .field("properties", &self.watches.len())
            .finish()
    }
}

/// Backing of a streamed string property. Read-only.
///
/// A segment whose property has been dropped keeps its last rendering.
pub(crate) struct StreamingBacking {
    segments: Vec<Segment>,
    rendered: Mutex<Vec<String>>,
    value: RwLock<String>,
}

impl StreamingBacking {
    fn new(segments: Vec<Segment>) -> Self {
        let rendered: Vec<String> = segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => text.clone(),
                Segment::Live(render) => render().unwrap_or_default(),
            })
            .collect();
        let value = rendered.concat();

        Self {
            segments,
            rendered: Mutex::new(rendered),
            value: RwLock::new(value),
        }
    }

    fn render(&self) -> String {
        let mut rendered = self.rendered.lock();
        for (segment, slot) in self.segments.iter().zip(rendered.iter_mut()) {
            if let Segment::Live(render) = segment {
                if let Some(text) = render() {
                    *slot = text;
                }
            }
        }
        rendered.concat()
    }
}

impl Backing<String> for StreamingBacking {
    fn get(&self) -> String {
        self.value.read().clone()
    }

    fn set(&self, _value: String) -> bool {
        tracing::warn!("write to streamed property rejected");
        false
    }

    fn refresh(&self) -> bool {
        let text = self.render();
        let mut value = self.value.write();
        if *value == text {
            return false;
        }
        *value = text;
        true
    }

    fn is_read_only(&self) -> bool {
        true
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
