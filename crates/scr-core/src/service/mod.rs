//! # SCR Core Service Lookup
//!
//! The capability-lookup seam consumed by the runtime. Components find their
//! dependency providers here and publish the capabilities they provide.
//!
//! - [`ServiceRegistry`]: the trait the core consumes (register, unregister,
//!   look up, track).
//! - [`ServiceReference`]: a shared handle on one registration. A deferred
//!   registration (a delayed component that has not been activated yet)
//!   carries no object until its component activates.
//! - [`InMemoryServiceRegistry`](memory::InMemoryServiceRegistry): the
//!   process-local implementation shipped with the crate.
pub mod memory;

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::holder::component::Component;

pub use memory::InMemoryServiceRegistry;

/// Identifier of a service registration
pub type ServiceId = u64;

/// Identifier of an open tracker
pub type TrackerId = u64;

/// The object a service consumer receives
pub type ServiceObject = Arc<dyn Component>;

/// Who registered a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceOwner {
    /// Registered by the runtime on behalf of a managed component
    Component(String),
    /// Registered by code outside the runtime
    External(String),
}

impl fmt::Display for ServiceOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceOwner::Component(name) => write!(f, "component:{}", name),
            ServiceOwner::External(name) => write!(f, "external:{}", name),
        }
    }
}

/// Handle on a registered service. Clones share the same object slot.
#[derive(Clone)]
pub struct ServiceReference {
    id: ServiceId,
    interfaces: Arc<Vec<String>>,
    owner: ServiceOwner,
    slot: Arc<RwLock<Option<ServiceObject>>>,
}

impl ServiceReference {
    pub(crate) fn new(
        id: ServiceId,
        interfaces: Vec<String>,
        owner: ServiceOwner,
        object: Option<ServiceObject>,
    ) -> Self {
        Self {
            id,
            interfaces: Arc::new(interfaces),
            owner,
            slot: Arc::new(RwLock::new(object)),
        }
    }

    pub fn id(&self) -> ServiceId {
        self.id
    }

    pub fn interfaces(&self) -> &[String] {
        &self.interfaces
    }

    pub fn provides(&self, interface: &str) -> bool {
        self.interfaces.iter().any(|i| i == interface)
    }

    pub fn owner(&self) -> &ServiceOwner {
        &self.owner
    }

    /// Name of the managed component behind this service, if any
    pub fn component_name(&self) -> Option<&str> {
        match &self.owner {
            ServiceOwner::Component(name) => Some(name),
            ServiceOwner::External(_) => None,
        }
    }

    /// The service object, `None` while the registration is deferred
    pub fn object(&self) -> Option<ServiceObject> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Downcast the service object to a concrete implementation type
    pub fn with_object<T: 'static, R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        let object = self.object()?;
        object.as_any().downcast_ref::<T>().map(f)
    }

    pub fn is_deferred(&self) -> bool {
        self.object().is_none()
    }

    pub(crate) fn fill(&self, object: ServiceObject) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(object);
    }

    pub(crate) fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl PartialEq for ServiceReference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceReference {}

impl fmt::Debug for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceReference")
            .field("id", &self.id)
            .field("interfaces", &self.interfaces)
            .field("owner", &self.owner)
            .field("deferred", &self.is_deferred())
            .finish()
    }
}

/// Change notification delivered to trackers
#[derive(Debug, Clone)]
pub enum ServiceEvent {
    Registered(ServiceReference),
    Unregistering(ServiceReference),
}

impl ServiceEvent {
    pub fn reference(&self) -> &ServiceReference {
        match self {
            ServiceEvent::Registered(reference) | ServiceEvent::Unregistering(reference) => reference,
        }
    }
}

/// Receives add/remove notifications for a tracked interface.
/// Called on the registering thread; implementations must not block.
pub trait ServiceListener: Send + Sync {
    fn service_changed(&self, event: &ServiceEvent);
}

/// Capability lookup consumed by the runtime
pub trait ServiceRegistry: Send + Sync {
    /// Register `object` under `interfaces`. A `None` object registers a
    /// deferred service to be filled once its component activates.
    fn register(
        &self,
        interfaces: &[String],
        owner: ServiceOwner,
        object: Option<ServiceObject>,
    ) -> ServiceReference;

    /// Remove a registration; returns `false` if it was not registered
    fn unregister(&self, id: ServiceId) -> bool;

    /// Current providers of `interface`, ordered by registration
    fn providers(&self, interface: &str) -> Vec<ServiceReference>;

    /// Start delivering change notifications for `interface`
    fn track(&self, interface: &str, listener: Arc<dyn ServiceListener>) -> TrackerId;

    fn untrack(&self, id: TrackerId) -> bool;
}
