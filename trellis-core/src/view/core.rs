//! Platform cores
//!
//! A core is the platform object that actually renders a view. The crate
//! never implements one; platforms do, and register constructors with a
//! [`ViewCoreFactory`](super::ViewCoreFactory).
//!
//! # Capabilities
//!
//! Cores are built from small capability traits (`TextCore`,
//! `VisibilityCore`, ...) that the crate knows nothing about. A core lists
//! the capabilities it implements in a [`CapabilitySet`]. The set is built
//! once when the core is attached, and updaters look their capability up in
//! it by type:
//!
//! ```rust,ignore
//! trait TextCore: Send + Sync {
//!     fn set_text(&self, text: String);
//! }
//!
//! impl ViewCore for LabelCore {
//!     fn core_type(&self) -> CoreTypeName {
//!         "label"
//!     }
//!
//!     fn capabilities(self: Arc<Self>) -> CapabilitySet {
//!         CapabilitySet::new().with::<dyn TextCore>(self)
//!     }
//! }
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

/// Name under which a core type is registered.
pub type CoreTypeName = &'static str;

/// A platform core attached to a view.
pub trait ViewCore: Send + Sync + 'static {
    /// The registered type name of this core.
    fn core_type(&self) -> CoreTypeName;

    /// The capabilities this core implements.
    fn capabilities(self: Arc<Self>) -> CapabilitySet;

    /// Called once when the view lets go of the core. No updater calls the
    /// core after this returns.
    fn detach(&self) {}
}

/// Capability handles of one core, keyed by capability type.
#[derive(Default)]
pub struct CapabilitySet {
    entries: SmallVec<[(TypeId, Box<dyn Any + Send + Sync>); 4]>,
}

impl CapabilitySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a capability. A later entry for the same type replaces the earlier.
    pub fn with<C>(mut self, capability: Arc<C>) -> Self
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let key = TypeId::of::<C>();
        self.entries.retain(|(id, _)| *id != key);
        self.entries.push((key, Box::new(capability)));
        self
    }

    /// Look up a capability.
    pub fn get<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let key = TypeId::of::<C>();
        self.entries
            .iter()
            .find(|(id, _)| *id == key)
            .and_then(|(_, entry)| entry.downcast_ref::<Arc<C>>())
            .cloned()
    }

    /// Whether the capability is present.
    pub fn contains<C>(&self) -> bool
    where
        C: ?Sized + 'static,
    {
        let key = TypeId::of::<C>();
        self.entries.iter().any(|(id, _)| *id == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitySet")
            .field("len", &self.entries.len())
            .finish()
    }
}

/// A core together with the capabilities resolved when it was attached.
pub(crate) struct AttachedCore {
    pub(crate) core: Arc<dyn ViewCore>,
    pub(crate) capabilities: CapabilitySet,
}

impl AttachedCore {
    pub(crate) fn new(core: Arc<dyn ViewCore>) -> Self {
        let capabilities = Arc::clone(&core).capabilities();
        Self { core, capabilities }
    }
}
