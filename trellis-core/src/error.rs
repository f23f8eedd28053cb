//! Error types
//!
//! Writes refused by a setter and dangling binding endpoints are not errors;
//! they are silent no-ops. The only failures callers see are the ones below.
//! A validator refusing a write reports a [`CoreError`] through
//! `Property::try_set`.

use thiserror::Error;

use crate::view::CoreTypeName;

/// Failures while creating or attaching a core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The factory has no constructor for the requested core type.
    #[error("unsupported core type `{core_type}` (factory `{factory}`)")]
    UnsupportedCoreType {
        core_type: CoreTypeName,
        factory: String,
    },

    /// The view cannot pick a core type yet.
    #[error("view has no core type yet")]
    NoCoreType,
}

/// Failures while handing work to a dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The dispatch loop has shut down.
    #[error("dispatcher is closed")]
    Closed,
}

/// Failures while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
