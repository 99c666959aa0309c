use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::service::{
    ServiceEvent, ServiceId, ServiceListener, ServiceObject, ServiceOwner, ServiceReference,
    ServiceRegistry, TrackerId,
};

struct Tracker {
    interface: String,
    listener: Arc<dyn ServiceListener>,
}

struct Inner {
    services: BTreeMap<ServiceId, ServiceReference>,
    trackers: BTreeMap<TrackerId, Tracker>,
    next_service_id: ServiceId,
    next_tracker_id: TrackerId,
}

/// Process-local service registry.
///
/// Listeners are collected under the lock and notified after it is released,
/// so a listener may call back into the registry.
pub struct InMemoryServiceRegistry {
    inner: Mutex<Inner>,
}

impl InMemoryServiceRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                services: BTreeMap::new(),
                trackers: BTreeMap::new(),
                next_service_id: 1,
                next_tracker_id: 1,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn listeners_for(inner: &Inner, reference: &ServiceReference) -> Vec<Arc<dyn ServiceListener>> {
        inner
            .trackers
            .values()
            .filter(|t| reference.provides(&t.interface))
            .map(|t| t.listener.clone())
            .collect()
    }

    pub fn service_count(&self) -> usize {
        self.lock().services.len()
    }

    pub fn tracker_count(&self) -> usize {
        self.lock().trackers.len()
    }
}

impl Default for InMemoryServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for InMemoryServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("InMemoryServiceRegistry")
            .field("services", &inner.services.len())
            .field("trackers", &inner.trackers.len())
            .finish()
    }
}

impl ServiceRegistry for InMemoryServiceRegistry {
    fn register(
        &self,
        interfaces: &[String],
        owner: ServiceOwner,
        object: Option<ServiceObject>,
    ) -> ServiceReference {
        let (reference, listeners) = {
            let mut inner = self.lock();
            let id = inner.next_service_id;
            inner.next_service_id += 1;
            let reference = ServiceReference::new(id, interfaces.to_vec(), owner, object);
            inner.services.insert(id, reference.clone());
            let listeners = Self::listeners_for(&inner, &reference);
            (reference, listeners)
        };

        log::debug!(
            "Registered service {} ({}) for {:?}",
            reference.id(),
            reference.owner(),
            reference.interfaces()
        );
        let event = ServiceEvent::Registered(reference.clone());
        for listener in listeners {
            listener.service_changed(&event);
        }
        reference
    }

    fn unregister(&self, id: ServiceId) -> bool {
        let (reference, listeners) = {
            let mut inner = self.lock();
            let Some(reference) = inner.services.remove(&id) else {
                return false;
            };
            let listeners = Self::listeners_for(&inner, &reference);
            (reference, listeners)
        };

        log::debug!("Unregistered service {} ({})", id, reference.owner());
        let event = ServiceEvent::Unregistering(reference);
        for listener in listeners {
            listener.service_changed(&event);
        }
        true
    }

    fn providers(&self, interface: &str) -> Vec<ServiceReference> {
        self.lock()
            .services
            .values()
            .filter(|s| s.provides(interface))
            .cloned()
            .collect()
    }

    fn track(&self, interface: &str, listener: Arc<dyn ServiceListener>) -> TrackerId {
        let mut inner = self.lock();
        let id = inner.next_tracker_id;
        inner.next_tracker_id += 1;
        inner.trackers.insert(
            id,
            Tracker {
                interface: interface.to_string(),
                listener,
            },
        );
        id
    }

    fn untrack(&self, id: TrackerId) -> bool {
        self.lock().trackers.remove(&id).is_some()
    }
}
