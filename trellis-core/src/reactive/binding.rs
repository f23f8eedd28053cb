//! Binding Implementation
//!
//! A Binding keeps a target property in sync with a source property.
//!
//! # How Bindings Work
//!
//! 1. On creation the source's (transformed) value is copied into the
//!    target.
//!
//! 2. The binding subscribes to the source's `on_change`. In bidirectional
//!    mode it also subscribes to the target's.
//!
//! 3. When an endpoint changes, the binding writes the other endpoint from
//!    inside a [`PropagationContext`]. The write makes the other endpoint
//!    notify, which would call straight back into the binding; the context
//!    recognises that echo and drops it.
//!
//! 4. Once the write returns, both endpoints are checked. If a subscriber
//!    further down rewrote the endpoint the binding read from, that change
//!    was swallowed as an echo, so the binding propagates it again in the
//!    same direction. If the written endpoint holds something else (a
//!    subscriber overrode it, or a setter clamped it), a bidirectional
//!    binding writes back the other way. This repeats until nothing moves
//!    or the settle limit is reached.
//!
//! # Lifetime
//!
//! Bindings hold only weak handles to their endpoints. Once either property
//! is dropped, the next notification finds it gone and the binding disposes
//! itself. Dropping a [`Binding`] handle does not remove the binding; call
//! [`Binding::unbind`] for that.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::backing::Value;
use super::context::PropagationContext;
use super::property::{Property, PropertyCell, WeakProperty};
use super::subscriber::Subscription;

/// Default number of write rounds a bidirectional binding performs to settle.
pub const DEFAULT_SETTLE_LIMIT: u32 = 16;

/// Unique identifier for a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(u64);

impl BindingId {
    /// Generate a new unique binding ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for BindingId {
    fn default() -> Self {
        Self::new()
    }
}

/// Direction(s) in which a binding propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindMode {
    /// Source changes flow into the target only.
    Unidirectional,

    /// Changes flow both ways.
    #[default]
    Bidirectional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    SourceToTarget,
    TargetToSource,
}

impl Direction {
    fn reversed(self) -> Self {
        match self {
            Self::SourceToTarget => Self::TargetToSource,
            Self::TargetToSource => Self::SourceToTarget,
        }
    }
}

/// Type-erased control surface of a binding.
trait BindingControl: Send + Sync {
    fn id(&self) -> BindingId;
    fn mode(&self) -> BindMode;
    fn is_active(&self) -> bool;
    fn dispose(&self);
}

type ForwardFn<S, T> = Box<dyn Fn(&S) -> T + Send + Sync>;
type InverseFn<T, S> = Box<dyn Fn(&T) -> S + Send + Sync>;

struct BindingShared<S: Value, T: Value> {
    id: BindingId,
    mode: BindMode,
    source: WeakProperty<S>,
    target: WeakProperty<T>,
    forward: ForwardFn<S, T>,
    inverse: Option<InverseFn<T, S>>,
    settle_limit: u32,
    disposed: AtomicBool,
    links: Mutex<SmallVec<[Subscription; 2]>>,
}

impl<S: Value, T: Value> BindingShared<S, T> {
    fn endpoints(&self) -> Option<(Arc<PropertyCell<S>>, Arc<PropertyCell<T>>)> {
        Some((self.source.upgrade()?, self.target.upgrade()?))
    }

    fn propagate(&self, start: Direction) {
        if self.disposed.load(Ordering::Acquire) {
            return;
        }

        let Some(_ctx) = PropagationContext::enter(self.id) else {
            tracing::trace!(binding = self.id.raw(), "echo suppressed");
            return;
        };

        let mut direction = start;
        for _ in 0..self.settle_limit {
            let Some((source, target)) = self.endpoints() else {
                tracing::debug!(binding = self.id.raw(), "endpoint dropped, binding now inert");
                self.dispose();
                return;
            };

            tracing::trace!(binding = self.id.raw(), ?direction, "propagating");

            // Each step reads one endpoint and writes the other. Afterwards
            // either endpoint may have been rewritten by a subscriber.
            let (origin_moved, overridden) = match direction {
                Direction::SourceToTarget => {
                    let origin = source.get();
                    let value = (self.forward)(&origin);
                    target.set(value.clone());
                    (source.get() != origin, target.get() != value)
                }
                Direction::TargetToSource => {
                    let Some(inverse) = &self.inverse else {
                        return;
                    };
                    let origin = target.get();
                    let value = inverse(&origin);
                    source.set(value.clone());
                    (target.get() != origin, source.get() != value)
                }
            };

            if origin_moved {
                // The endpoint we read from changed underneath us; its own
                // notification was swallowed as an echo, so go again
                continue;
            }
            if !overridden || self.mode == BindMode::Unidirectional {
                return;
            }
            direction = direction.reversed();
        }

        tracing::warn!(
            binding = self.id.raw(),
            settle_limit = self.settle_limit,
            "binding endpoints did not settle"
        );
    }
}

impl<S: Value, T: Value> BindingControl for BindingShared<S, T> {
    fn id(&self) -> BindingId {
        self.id
    }

    fn mode(&self) -> BindMode {
        self.mode
    }

    fn is_active(&self) -> bool {
        !self.disposed.load(Ordering::Acquire) && self.source.is_alive() && self.target.is_alive()
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        for link in self.links.lock().drain(..) {
            link.unsubscribe();
        }
    }
}

/// Handle to a live binding between two properties.
#[derive(Clone)]
pub struct Binding {
    inner: Arc<dyn BindingControl>,
}

impl Binding {
    /// Get the binding's unique ID.
    pub fn id(&self) -> BindingId {
        self.inner.id()
    }

    /// Get the binding mode.
    pub fn mode(&self) -> BindMode {
        self.inner.mode()
    }

    /// Whether the binding is still propagating.
    ///
    /// False once unbound or once either endpoint has been dropped.
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Remove the binding. Idempotent.
    pub fn unbind(&self) {
        self.inner.dispose();
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id())
            .field("mode", &self.mode())
            .field("active", &self.is_active())
            .finish()
    }
}

/// Creates bindings with a fixed settle limit.
#[derive(Debug, Clone, Copy)]
pub struct Binder {
    settle_limit: u32,
}

impl Default for Binder {
    fn default() -> Self {
        Self::new(DEFAULT_SETTLE_LIMIT)
    }
}

impl Binder {
    /// Create a binder. A limit of zero is raised to one.
    pub fn new(settle_limit: u32) -> Self {
        Self {
            settle_limit: settle_limit.max(1),
        }
    }

    /// Get the settle limit.
    pub fn settle_limit(&self) -> u32 {
        self.settle_limit
    }

    /// Bind two properties of the same type.
    pub fn bind<T: Value>(&self, target: &Property<T>, source: &Property<T>, mode: BindMode) -> Binding {
        let inverse: Option<InverseFn<T, T>> = match mode {
            BindMode::Unidirectional => None,
            BindMode::Bidirectional => Some(Box::new(T::clone)),
        };
        self.establish(target, source, mode, Box::new(T::clone), inverse)
    }

    /// Bind bidirectionally through a transform and its inverse.
    pub fn bind_with<S, T, F, G>(&self, target: &Property<T>, source: &Property<S>, forward: F, inverse: G) -> Binding
    where
        S: Value,
        T: Value,
        F: Fn(&S) -> T + Send + Sync + 'static,
        G: Fn(&T) -> S + Send + Sync + 'static,
    {
        self.establish(
            target,
            source,
            BindMode::Bidirectional,
            Box::new(forward),
            Some(Box::new(inverse)),
        )
    }

    /// Bind unidirectionally through a transform.
    pub fn bind_one_way<S, T, F>(&self, target: &Property<T>, source: &Property<S>, forward: F) -> Binding
    where
        S: Value,
        T: Value,
        F: Fn(&S) -> T + Send + Sync + 'static,
    {
        self.establish(target, source, BindMode::Unidirectional, Box::new(forward), None)
    }

    fn establish<S: Value, T: Value>(
        &self,
        target: &Property<T>,
        source: &Property<S>,
        mode: BindMode,
        forward: ForwardFn<S, T>,
        inverse: Option<InverseFn<T, S>>,
    ) -> Binding {
        let shared = Arc::new(BindingShared {
            id: BindingId::new(),
            mode,
            source: source.downgrade(),
            target: target.downgrade(),
            forward,
            inverse,
            settle_limit: self.settle_limit,
            disposed: AtomicBool::new(false),
            links: Mutex::new(SmallVec::new()),
        });

        tracing::debug!(
            binding = shared.id.raw(),
            source = source.id().raw(),
            target = target.id().raw(),
            ?mode,
            "binding established"
        );

        shared.propagate(Direction::SourceToTarget);

        let forward_link = {
            let shared = Arc::clone(&shared);
            source
                .on_change()
                .subscribe(move |_| shared.propagate(Direction::SourceToTarget))
        };
        shared.links.lock().push(forward_link);

        if mode == BindMode::Bidirectional {
            let reverse_link = {
                let shared = Arc::clone(&shared);
                target
                    .on_change()
                    .subscribe(move |_| shared.propagate(Direction::TargetToSource))
            };
            shared.links.lock().push(reverse_link);
        }

        Binding { inner: shared }
    }
}

/// Bind `target` to `source` using the default settle limit.
pub fn bind<T: Value>(target: &Property<T>, source: &Property<T>, mode: BindMode) -> Binding {
    Binder::default().bind(target, source, mode)
}

/// Bind bidirectionally through a transform and its inverse.
pub fn bind_with<S, T, F, G>(target: &Property<T>, source: &Property<S>, forward: F, inverse: G) -> Binding
where
    S: Value,
    T: Value,
    F: Fn(&S) -> T + Send + Sync + 'static,
    G: Fn(&T) -> S + Send + Sync + 'static,
{
    Binder::default().bind_with(target, source, forward, inverse)
}

/// Bind unidirectionally through a transform.
pub fn bind_one_way<S, T, F>(target: &Property<T>, source: &Property<S>, forward: F) -> Binding
where
    S: Value,
    T: Value,
    F: Fn(&S) -> T + Send + Sync + 'static,
{
    Binder::default().bind_one_way(target, source, forward)
}

impl<T: Value> Property<T> {
    /// Bind this property (the target) to `source`.
    pub fn bind(&self, source: &Property<T>, mode: BindMode) -> Binding {
        bind(self, source, mode)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
