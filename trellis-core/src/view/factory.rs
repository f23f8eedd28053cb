//! Core factory
//!
//! The factory maps core type names to constructors. A platform registers
//! one constructor per view kind it can render.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use super::core::{CoreTypeName, ViewCore};
use crate::error::{CoreError, Result};

type Constructor = Arc<dyn Fn() -> Arc<dyn ViewCore> + Send + Sync>;

/// Registry of core constructors keyed by core type name.
pub struct ViewCoreFactory {
    name: String,
    constructors: DashMap<CoreTypeName, Constructor>,
}

impl ViewCoreFactory {
    /// Create an empty factory.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructors: DashMap::new(),
        }
    }

    /// The factory's name, used in error reports.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a constructor, replacing any previous one for `core_type`.
    pub fn register<F>(&self, core_type: CoreTypeName, constructor: F)
    where
        F: Fn() -> Arc<dyn ViewCore> + Send + Sync + 'static,
    {
        if self.constructors.insert(core_type, Arc::new(constructor)).is_some() {
            tracing::debug!(factory = %self.name, core_type, "core constructor replaced");
        }
    }

    /// Whether a constructor is registered for `core_type`.
    pub fn supports(&self, core_type: &str) -> bool {
        self.constructors.contains_key(core_type)
    }

    /// Fail with `UnsupportedCoreType` unless `core_type` is registered.
    pub fn check(&self, core_type: CoreTypeName) -> Result<()> {
        if self.supports(core_type) {
            return Ok(());
        }
        Err(self.unsupported(core_type))
    }

    fn unsupported(&self, core_type: CoreTypeName) -> CoreError {
        CoreError::UnsupportedCoreType {
            core_type,
            factory: self.name.clone(),
        }
    }

    /// Registered core type names.
    pub fn core_types(&self) -> Vec<CoreTypeName> {
        self.constructors.iter().map(|entry| *entry.key()).collect()
    }

    /// Construct a core of the given type.
    pub fn create(&self, core_type: CoreTypeName) -> Result<Arc<dyn ViewCore>> {
        // Cloned out so the constructor runs without a shard lock held
        let constructor = self
            .constructors
            .get(core_type)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| self.unsupported(core_type))?;

        let core = constructor();
        debug_assert_eq!(
            core.core_type(),
            core_type,
            "constructor registered for `{core_type}` built a `{}`",
            core.core_type()
        );
        Ok(core)
    }
}

impl fmt::Debug for ViewCoreFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCoreFactory")
            .field("name", &self.name)
            .field("core_types", &self.core_types())
            .finish()
    }
}
