//! Trellis Core
//!
//! This crate provides the property layer of the Trellis UI framework.
//! It implements:
//!
//! - Notifiers: ordered multicast callbacks with handle-based unsubscribe
//! - Properties: observable value slots over pluggable backings
//! - Bindings: one-way and two-way links between properties
//! - Core glue: pushing property values into platform cores, and creating
//!   or replacing cores when core-selecting properties change
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Notifiers, properties, backings and bindings
//! - `view`: Core factory, views, updaters and main-thread dispatch
//! - `config`: Runtime tunables loaded from JSON
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use trellis_core::reactive::{BindMode, Property};
//!
//! let checked = Property::new(false);
//! let label = Property::new(String::new());
//!
//! label.on_change().subscribe(|cell| println!("label: {}", cell.get()));
//!
//! let mirror = Property::new(false);
//! mirror.bind(&checked, BindMode::Bidirectional);
//!
//! checked.set(true);
//! assert!(mirror.get());
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod view;

pub use config::ReactiveConfig;
pub use error::{ConfigError, CoreError, DispatchError, Result};
pub use reactive::{bind, bind_one_way, bind_with, BindMode, Binding, Notifier, Property, Subscription};
pub use view::{register_core_creating_properties, CorePropertyUpdater, View, ViewContext};
