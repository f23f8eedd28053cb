//! Core property updaters
//!
//! An updater forwards a property's value into one setter of a core
//! capability:
//!
//! ```rust,ignore
//! view.add_updater(
//!     &label.text,
//!     CorePropertyUpdater::<dyn TextCore, String>::new(|core, text| core.set_text(text))
//!         .influences(Influence::PREFERRED_SIZE),
//! );
//! ```
//!
//! The updater runs whenever the property changes, and again whenever a new
//! core is attached so the fresh core starts out with the current values.
//! It looks the core up when it runs, never when it was scheduled, so a core
//! replaced in between is never touched.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use bitflags::bitflags;

use super::core::AttachedCore;
use super::host::ViewId;
use crate::reactive::{Value, WeakProperty};

bitflags! {
    /// Layout consequences of a property change.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Influence: u8 {
        /// The view's own preferred size may change.
        const PREFERRED_SIZE = 0b0000_0001;
        /// The parent has to lay out its children again.
        const PARENT_LAYOUT  = 0b0000_0010;
        /// The view has to lay out its own content again.
        const CONTENT_LAYOUT = 0b0000_0100;
    }
}

/// Receives layout invalidations.
pub trait Layout: Send + Sync {
    fn mark_dirty(&self, view: ViewId);
}

/// Forwards a property of type `T` into capability `C` of the attached core.
pub struct CorePropertyUpdater<C: ?Sized, T> {
    setter: Arc<dyn Fn(&C, T) + Send + Sync>,
    influence: Influence,
    _capability: PhantomData<fn(&C)>,
}

impl<C, T> CorePropertyUpdater<C, T>
where
    C: ?Sized + Send + Sync + 'static,
    T: Value,
{
    /// Create an updater calling `setter` with each new value.
    pub fn new<F>(setter: F) -> Self
    where
        F: Fn(&C, T) + Send + Sync + 'static,
    {
        Self {
            setter: Arc::new(setter),
            influence: Influence::empty(),
            _capability: PhantomData,
        }
    }

    /// Declare the layout consequences of a change.
    pub fn influences(mut self, influence: Influence) -> Self {
        self.influence |= influence;
        self
    }

    /// The declared layout consequences.
    pub fn influence(&self) -> Influence {
        self.influence
    }
}

impl<C: ?Sized, T> Clone for CorePropertyUpdater<C, T> {
    fn clone(&self) -> Self {
        Self {
            setter: Arc::clone(&self.setter),
            influence: self.influence,
            _capability: PhantomData,
        }
    }
}

impl<C: ?Sized, T> fmt::Debug for CorePropertyUpdater<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CorePropertyUpdater")
            .field("capability", &std::any::type_name::<C>())
            .field("influence", &self.influence)
            .finish()
    }
}

/// A property-to-core link held by a view.
pub(crate) trait CoreLink: Send + Sync {
    /// Push the current value into `core`. Returns whether a setter ran.
    fn push(&self, core: &AttachedCore) -> bool;

    fn influence(&self) -> Influence;
}

/// An updater bound to the property it reads.
pub(crate) struct PropertyLink<C: ?Sized, T: Value> {
    pub(crate) property: WeakProperty<T>,
    pub(crate) updater: CorePropertyUpdater<C, T>,
}

impl<C, T> CoreLink for PropertyLink<C, T>
where
    C: ?Sized + Send + Sync + 'static,
    T: Value,
{
    fn push(&self, core: &AttachedCore) -> bool {
        let Some(capability) = core.capabilities.get::<C>() else {
            return false;
        };
        let Some(value) = self.property.get() else {
            return false;
        };

        tracing::trace!(core_type = core.core.core_type(), "core property updated");
        (self.updater.setter)(&*capability, value);
        true
    }

    fn influence(&self) -> Influence {
        self.updater.influence
    }
}
