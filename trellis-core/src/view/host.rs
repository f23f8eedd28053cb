//! View Host
//!
//! A [`View`] owns the link between a widget's properties and the platform
//! core that renders it.
//!
//! # How Core Attachment Works
//!
//! 1. A view asks its selector which core type it needs. A view whose
//!    selector depends on properties (a web view needs a URL first) returns
//!    `None` until those are set, and no core is created.
//!
//! 2. Properties registered as core-creating are validated before a write
//!    is announced: the selector runs against the proposed value, and a
//!    core type the factory cannot build refuses the write. The property
//!    keeps its old value and nobody else sees the refused one.
//!
//! 3. Once a write to a core-creating property is announced, the selector
//!    runs again. If the answer is the core type already attached, nothing
//!    happens. Otherwise the new core is created first, swapped in, and only
//!    then is the old one detached. A failed creation leaves the old core in
//!    place.
//!
//! 4. Every updater pushes its property's current value into the fresh core.
//!
//! # Threading
//!
//! Core work runs on the dispatcher's main thread. A property written on any
//! other thread updates immediately; the matching core update is enqueued.
//! Core operations on one view are serialized by a reentrant lock, so no
//! updater ever runs against a core that is being detached.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::{Mutex, ReentrantMutex, RwLock};
use smallvec::SmallVec;

use super::core::{AttachedCore, CoreTypeName, ViewCore};
use super::dispatch::Dispatcher;
use super::factory::ViewCoreFactory;
use super::updater::{CoreLink, CorePropertyUpdater, Layout, PropertyLink};
use crate::config::ReactiveConfig;
use crate::error::{CoreError, Result};
use crate::reactive::{Binder, Property, Subscription, Validation, Value, ValueBacking};

/// Unique identifier for a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewId(u64);

impl ViewId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// Identifies an updater registered on a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(u64);

impl LinkId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Services a view needs, passed in at construction.
#[derive(Clone)]
pub struct ViewContext {
    factory: Arc<ViewCoreFactory>,
    dispatcher: Arc<dyn Dispatcher>,
    layout: Option<Arc<dyn Layout>>,
    config: ReactiveConfig,
}

impl ViewContext {
    pub fn new(factory: Arc<ViewCoreFactory>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            factory,
            dispatcher,
            layout: None,
            config: ReactiveConfig::default(),
        }
    }

    pub fn with_layout(mut self, layout: Arc<dyn Layout>) -> Self {
        self.layout = Some(layout);
        self
    }

    pub fn with_config(mut self, config: ReactiveConfig) -> Self {
        self.config = config;
        self
    }

    pub fn factory(&self) -> &Arc<ViewCoreFactory> {
        &self.factory
    }

    pub fn dispatcher(&self) -> &Arc<dyn Dispatcher> {
        &self.dispatcher
    }

    pub fn layout(&self) -> Option<&Arc<dyn Layout>> {
        self.layout.as_ref()
    }

    pub fn config(&self) -> &ReactiveConfig {
        &self.config
    }

    /// Create a property using the configured notifier variant.
    pub fn property<T: Value>(&self, value: T) -> Property<T> {
        Property::from_backing(ValueBacking::new(value), self.config.default_thread_safety)
    }

    /// A binder using the configured settle limit.
    pub fn binder(&self) -> Binder {
        self.config.binder()
    }

    fn on_core_thread(&self) -> bool {
        !self.config.marshal_core_updates || self.dispatcher.is_main_thread()
    }
}

impl fmt::Debug for ViewContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewContext")
            .field("factory", &self.factory.name())
            .field("layout", &self.layout.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Anything whose changes can trigger core (re)creation.
pub trait ChangeSource {
    /// Call `callback` after every announced change.
    fn subscribe_change(&self, callback: Box<dyn Fn() + Send + Sync>) -> Subscription;

    /// Call `callback` with every proposed change, before it is announced.
    fn subscribe_validate(&self, callback: Box<dyn Fn(&Validation) + Send + Sync>) -> Subscription;
}

impl<T: Value> ChangeSource for Property<T> {
    fn subscribe_change(&self, callback: Box<dyn Fn() + Send + Sync>) -> Subscription {
        self.on_change().subscribe_paramless(callback)
    }

    fn subscribe_validate(&self, callback: Box<dyn Fn(&Validation) + Send + Sync>) -> Subscription {
        self.on_validate().subscribe(callback)
    }
}

type Selector = Box<dyn Fn() -> Option<CoreTypeName> + Send + Sync>;

struct LinkEntry {
    link: Arc<dyn CoreLink>,
    subscription: Subscription,
}

struct ViewShared {
    id: ViewId,
    context: ViewContext,
    selector: Selector,
    attached: RwLock<Option<Arc<AttachedCore>>>,
    links: RwLock<IndexMap<LinkId, LinkEntry>>,
    creating: Mutex<SmallVec<[Subscription; 4]>>,
    core_op: ReentrantMutex<()>,
}

impl ViewShared {
    fn current(&self) -> Option<Arc<AttachedCore>> {
        self.attached.read().clone()
    }

    fn ensure_core(&self) -> Result<Arc<dyn ViewCore>> {
        let _op = self.core_op.lock();

        let wanted = (self.selector)().ok_or(CoreError::NoCoreType)?;
        if let Some(current) = self.current() {
            if current.core.core_type() == wanted {
                return Ok(Arc::clone(&current.core));
            }
        }
        self.replace_core(wanted)
    }

    fn replace_core(&self, wanted: CoreTypeName) -> Result<Arc<dyn ViewCore>> {
        let core = self.context.factory.create(wanted).map_err(|err| {
            tracing::error!(view = self.id.raw(), core_type = wanted, error = %err, "core creation failed");
            err
        })?;

        let attached = Arc::new(AttachedCore::new(core));
        let previous = self.attached.write().replace(Arc::clone(&attached));

        if let Some(previous) = previous {
            tracing::debug!(
                view = self.id.raw(),
                core_type = previous.core.core_type(),
                "detaching replaced core"
            );
            previous.core.detach();
        }

        for link in self.link_snapshot() {
            link.push(&attached);
        }
        self.mark_dirty();

        tracing::debug!(view = self.id.raw(), core_type = wanted, "core attached");
        Ok(Arc::clone(&attached.core))
    }

    fn detach_core(&self) -> bool {
        let _op = self.core_op.lock();

        let Some(previous) = self.attached.write().take() else {
            return false;
        };
        tracing::debug!(
            view = self.id.raw(),
            core_type = previous.core.core_type(),
            "core detached"
        );
        previous.core.detach();
        true
    }

    fn resync_core(&self) {
        let _op = self.core_op.lock();

        let Some(attached) = self.current() else {
            return;
        };
        for link in self.link_snapshot() {
            link.push(&attached);
        }
        self.mark_dirty();
    }

    fn push_link(&self, link: &dyn CoreLink) -> bool {
        let _op = self.core_op.lock();
        match self.current() {
            Some(attached) => link.push(&attached),
            None => false,
        }
    }

    fn apply_link(&self, link: &dyn CoreLink) {
        self.push_link(link);
        if !link.influence().is_empty() {
            self.mark_dirty();
        }
    }

    /// Refuse a proposed core-creating value whose core type cannot be built.
    fn validate(&self, validation: &Validation) {
        let Some(wanted) = (self.selector)() else {
            return;
        };
        if let Err(err) = self.context.factory.check(wanted) {
            tracing::error!(view = self.id.raw(), core_type = wanted, error = %err, "core-creating value refused");
            validation.reject(err);
        }
    }

    fn core_creating_changed(&self) {
        match self.ensure_core() {
            Ok(_) => {}
            Err(CoreError::NoCoreType) => {
                tracing::trace!(view = self.id.raw(), "core creation deferred");
            }
            // Logged by replace_core; the previous core stays attached
            Err(_) => {}
        }
    }

    fn mark_dirty(&self) {
        if let Some(layout) = &self.context.layout {
            layout.mark_dirty(self.id);
        }
    }

    fn link_snapshot(&self) -> Vec<Arc<dyn CoreLink>> {
        self.links
            .read()
            .values()
            .map(|entry| Arc::clone(&entry.link))
            .collect()
    }

    /// Run `task` on the main thread: inline if we are on it, else enqueued.
    fn schedule<F>(self: &Arc<Self>, task: F)
    where
        F: FnOnce(&ViewShared) + Send + 'static,
    {
        if self.context.on_core_thread() {
            task(&**self);
            return;
        }

        let view = Arc::downgrade(self);
        let queued = self.context.dispatcher.enqueue(Box::new(move || {
            if let Some(view) = view.upgrade() {
                task(&*view);
            }
        }));

        if queued.is_err() {
            tracing::warn!(view = self.id.raw(), "core update dropped, dispatcher closed");
        }
    }
}

impl Drop for ViewShared {
    fn drop(&mut self) {
        for subscription in self.creating.get_mut().drain(..) {
            subscription.unsubscribe();
        }
        for (_, entry) in self.links.get_mut().drain(..) {
            entry.subscription.unsubscribe();
        }
        if let Some(attached) = self.attached.get_mut().take() {
            attached.core.detach();
        }
    }
}

/// A widget's attachment point for a platform core.
pub struct View {
    shared: Arc<ViewShared>,
}

impl View {
    /// Create a view that always uses `core_type`.
    pub fn new(context: ViewContext, core_type: CoreTypeName) -> Self {
        Self::with_selector(context, move || Some(core_type))
    }

    /// Create a view whose core type is decided by `selector`.
    ///
    /// The selector typically reads core-creating properties; see
    /// [`register_core_creating_properties`].
    pub fn with_selector<F>(context: ViewContext, selector: F) -> Self
    where
        F: Fn() -> Option<CoreTypeName> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(ViewShared {
                id: ViewId::next(),
                context,
                selector: Box::new(selector),
                attached: RwLock::new(None),
                links: RwLock::new(IndexMap::new()),
                creating: Mutex::new(SmallVec::new()),
                core_op: ReentrantMutex::new(()),
            }),
        }
    }

    pub fn id(&self) -> ViewId {
        self.shared.id
    }

    pub fn context(&self) -> &ViewContext {
        &self.shared.context
    }

    /// Create or replace the core so it matches the selector.
    ///
    /// Must run on the main thread.
    pub fn ensure_core(&self) -> Result<Arc<dyn ViewCore>> {
        self.debug_assert_core_thread();
        self.shared.ensure_core()
    }

    /// The attached core, if any.
    pub fn current_core(&self) -> Option<Arc<dyn ViewCore>> {
        self.shared.current().map(|attached| Arc::clone(&attached.core))
    }

    /// Look up a capability of the attached core.
    pub fn capability<C>(&self) -> Option<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        self.shared.current()?.capabilities.get::<C>()
    }

    /// Detach the core. The next `ensure_core` creates a new one.
    ///
    /// Returns whether a core was attached.
    pub fn detach_core(&self) -> bool {
        self.debug_assert_core_thread();
        self.shared.detach_core()
    }

    /// Push every updater's current value into the attached core.
    pub fn resync_core(&self) {
        self.debug_assert_core_thread();
        self.shared.resync_core();
    }

    /// Assign a core-creating property and report whether the resulting core
    /// type can be created.
    ///
    /// A refused value never reaches the property's subscribers, and the
    /// attached core stays as it was. A plain `set` behaves the same but
    /// drops the error.
    pub fn set_core_property<T: Value>(&self, property: &Property<T>, value: T) -> Result<()> {
        property.try_set(value).map(|_| ())
    }

    /// Forward changes of `property` into the core through `updater`.
    pub fn add_updater<C, T>(&self, property: &Property<T>, updater: CorePropertyUpdater<C, T>) -> LinkId
    where
        C: ?Sized + Send + Sync + 'static,
        T: Value,
    {
        let id = LinkId::next();
        let link: Arc<dyn CoreLink> = Arc::new(PropertyLink {
            property: property.downgrade(),
            updater,
        });

        let subscription = {
            let view = Arc::downgrade(&self.shared);
            let link = Arc::clone(&link);
            property.on_change().subscribe_paramless(move || {
                let Some(view) = view.upgrade() else {
                    return;
                };
                let link = Arc::clone(&link);
                view.schedule(move |view| view.apply_link(link.as_ref()));
            })
        };

        self.shared.links.write().insert(
            id,
            LinkEntry {
                link: Arc::clone(&link),
                subscription,
            },
        );

        // Bring an already attached core up to date
        self.shared.schedule(move |view| {
            view.push_link(link.as_ref());
        });

        id
    }

    /// Remove an updater. Returns whether it was registered.
    pub fn remove_updater(&self, id: LinkId) -> bool {
        match self.shared.links.write().shift_remove(&id) {
            Some(entry) => {
                entry.subscription.unsubscribe();
                true
            }
            None => false,
        }
    }

    /// Number of registered updaters.
    pub fn updater_count(&self) -> usize {
        self.shared.links.read().len()
    }

    /// Validate writes to `property` against the factory, and re-run core
    /// selection whenever it changes.
    pub fn register_core_creating(&self, property: &dyn ChangeSource) {
        let validation = {
            let view = Arc::downgrade(&self.shared);
            property.subscribe_validate(Box::new(move |validation| {
                if let Some(view) = view.upgrade() {
                    view.validate(validation);
                }
            }))
        };

        let view = Arc::downgrade(&self.shared);
        let change = property.subscribe_change(Box::new(move || {
            if let Some(view) = view.upgrade() {
                view.schedule(ViewShared::core_creating_changed);
            }
        }));

        self.shared.creating.lock().extend([validation, change]);
    }

    fn debug_assert_core_thread(&self) {
        debug_assert!(
            self.shared.context.on_core_thread(),
            "core operation on view {} called off the main thread",
            self.shared.id.raw()
        );
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.shared.id)
            .field(
                "core_type",
                &self.shared.current().map(|attached| attached.core.core_type()),
            )
            .field("updaters", &self.updater_count())
            .finish()
    }
}

/// Mark `properties` as core-creating for `view`.
///
/// Core creation is deferred until one of them changes; each change re-runs
/// the view's selector and replaces the core if the answer differs.
pub fn register_core_creating_properties(view: &View, properties: &[&dyn ChangeSource]) {
    for property in properties {
        view.register_core_creating(*property);
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
