//! Reactive Primitives
//!
//! This module implements the observable value layer: notifiers, properties
//! and bindings. Everything a view exposes to user code is built from these.
//!
//! # Concepts
//!
//! ## Notifiers
//!
//! A Notifier is an ordered list of callbacks. Firing it calls every
//! callback in subscription order. Subscribing or unsubscribing from inside
//! a callback is allowed and takes effect for the remainder of the pass.
//!
//! ## Properties
//!
//! A Property is a value slot with a change notifier. Its storage is a
//! pluggable [`Backing`]: plain storage, a setter that may reject or rewrite
//! writes, an external getter and setter, a transform of another property,
//! or text streamed from several properties.
//!
//! Validators subscribed to `on_validate` see a write before `on_change`
//! does and may refuse it.
//!
//! ## Bindings
//!
//! A Binding keeps two properties in sync, one way or both ways, optionally
//! through a transform. Bindings hold their endpoints weakly and never keep
//! a property alive.
//!
//! # Implementation Notes
//!
//! Bindings use a thread-local propagation context to recognise their own
//! echo. When a binding writes an endpoint, the resulting notification finds
//! the binding already on this thread's stack and is ignored.

mod backing;
mod binding;
mod context;
mod notifier;
mod property;
mod subscriber;

pub use backing::{Backing, GetterSetterBacking, SetterBacking, Streaming, TransformBacking, Value, ValueBacking};
pub use binding::{bind, bind_one_way, bind_with, BindMode, Binder, Binding, BindingId, DEFAULT_SETTLE_LIMIT};
pub use context::PropagationContext;
pub use notifier::{Notifier, ThreadSafety};
pub use property::{Property, PropertyCell, PropertyId, Validation, WeakProperty};
pub use subscriber::{Subscription, SubscriptionId};
