use std::sync::Weak;

use crate::actor::{ActorHandle, LifecycleTask};
use crate::holder::ComponentHolder;
use crate::service::{ServiceEvent, ServiceListener};

/// A provider of one of a holder's references appeared or went away
#[derive(Debug, Clone)]
pub struct DependencyChange {
    /// Name of the affected reference
    pub reference: String,
    pub event: ServiceEvent,
}

/// Tracker callback turning service events into actor tasks.
///
/// Runs on whichever thread changed the service registry, so it only
/// enqueues and returns.
pub(crate) struct ReferenceListener {
    pub(crate) holder: Weak<ComponentHolder>,
    pub(crate) reference: String,
    pub(crate) actor: ActorHandle,
}

impl ServiceListener for ReferenceListener {
    fn service_changed(&self, event: &ServiceEvent) {
        let Some(holder) = self.holder.upgrade() else {
            return;
        };
        let name = holder.name().to_string();
        let task = LifecycleTask::DependencyChanged {
            holder,
            change: DependencyChange {
                reference: self.reference.clone(),
                event: event.clone(),
            },
        };
        if let Err(e) = self.actor.submit(task) {
            log::debug!(
                "[{}] Dropping change of reference '{}': {}",
                name,
                self.reference,
                e
            );
        }
    }
}
