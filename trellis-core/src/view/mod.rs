//! Core Glue
//!
//! This module connects reactive properties to platform cores.
//!
//! # Concepts
//!
//! ## Cores
//!
//! A core is the platform object behind a widget. Cores are created by a
//! [`ViewCoreFactory`] and expose small capability traits through a
//! [`CapabilitySet`].
//!
//! ## Views
//!
//! A [`View`] holds at most one attached core. Core-creating properties
//! decide which core type that is, and a change to one of them may replace
//! the core.
//!
//! ## Updaters
//!
//! A [`CorePropertyUpdater`] pushes a property's value into one capability
//! setter whenever the property changes or a new core is attached.
//!
//! ## Dispatchers
//!
//! Cores belong to the main thread. A [`Dispatcher`] carries core work
//! there from whichever thread changed a property.

mod core;
mod dispatch;
mod factory;
mod host;
mod updater;

pub use self::core::{CapabilitySet, CoreTypeName, ViewCore};
pub use dispatch::{DispatchLoop, Dispatcher, QueueDispatcher, Task, TokioDispatcher};
pub use factory::ViewCoreFactory;
pub use host::{register_core_creating_properties, ChangeSource, LinkId, View, ViewContext, ViewId};
pub use updater::{CorePropertyUpdater, Influence, Layout};
