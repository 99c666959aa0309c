use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::actor::{ActorHandle, LifecycleTask};
use crate::holder::{ComponentHolder, DeactivationReason};
use crate::kernel::error::Result;
use crate::metadata::ComponentMetadata;
use crate::module::{ModuleContext, ModuleInfo};
use crate::registry::ComponentRegistry;

/// Registers the components of one module and disposes them when the
/// module goes away.
///
/// A failing descriptor is logged and skipped; it never prevents the other
/// descriptors of the module from loading.
pub struct ModuleComponentManager {
    context: Arc<ModuleContext>,
    registry: Arc<ComponentRegistry>,
    actor: ActorHandle,
    holders: Mutex<Vec<Arc<ComponentHolder>>>,
}

impl ModuleComponentManager {
    pub fn new(context: Arc<ModuleContext>, registry: Arc<ComponentRegistry>, actor: ActorHandle) -> Self {
        Self {
            context,
            registry,
            actor,
            holders: Mutex::new(Vec::new()),
        }
    }

    fn owned(&self) -> MutexGuard<'_, Vec<Arc<ComponentHolder>>> {
        self.holders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn module_info(&self) -> &ModuleInfo {
        self.context.info()
    }

    pub fn context(&self) -> &Arc<ModuleContext> {
        &self.context
    }

    /// Register every descriptor; returns how many were accepted
    pub fn load(&self, descriptors: Vec<ComponentMetadata>) -> usize {
        let total = descriptors.len();
        let loaded = descriptors
            .into_iter()
            .filter_map(|metadata| self.register_component(metadata).ok())
            .count();
        log::debug!(
            "Module {} registered {} of {} component(s)",
            self.module_info(),
            loaded,
            total
        );
        loaded
    }

    /// Reserve the name, validate, allocate an id, build and bind the
    /// holder, then enable it if the descriptor says so.
    pub fn register_component(&self, metadata: ComponentMetadata) -> Result<Arc<ComponentHolder>> {
        let name = metadata.name.clone();

        // A conflicting slot belongs to someone else and is left untouched
        if let Err(e) = self.registry.reserve_name(&name) {
            log::error!(
                "[{}] Cannot register component of module {}: {}",
                name,
                self.module_info(),
                e
            );
            return Err(e.into());
        }

        let metadata = match metadata.validate() {
            Ok(metadata) => metadata,
            Err(e) => {
                self.registry.unbind(&name);
                log::error!("[{}] Invalid component descriptor in module {}: {}", name, self.module_info(), e);
                return Err(e.into());
            }
        };

        let id = self.registry.allocate_id();
        let holder = self
            .registry
            .create_holder(id, self.context.clone(), metadata.clone(), self.actor.clone());
        if let Err(e) = self.registry.bind_holder(&name, holder.clone()) {
            self.registry.release_id(id);
            if self.registry.is_reserved(&name) {
                self.registry.unbind(&name);
            }
            log::error!("[{}] {}", name, e);
            return Err(e.into());
        }

        self.owned().push(holder.clone());
        log::debug!("[{}] Registered component with id {}", name, id);

        if metadata.enabled {
            if let Err(e) = self.actor.submit(LifecycleTask::Enable(holder.clone())) {
                log::warn!("[{}] Component not enabled: {}", name, e);
            }
        }
        Ok(holder)
    }

    /// Queue disposal of every owned holder and forget them
    pub fn dispose(&self, reason: DeactivationReason) {
        let holders = std::mem::take(&mut *self.owned());
        log::debug!(
            "Disposing {} component(s) of module {}",
            holders.len(),
            self.module_info()
        );
        for holder in holders {
            let name = holder.name().to_string();
            if let Err(e) = self.actor.submit(LifecycleTask::Dispose { holder, reason }) {
                log::warn!("[{}] Component not disposed: {}", name, e);
            }
        }
    }

    /// Take over the holders of `other`
    pub(crate) fn absorb(&self, other: &ModuleComponentManager) {
        let moved = std::mem::take(&mut *other.owned());
        self.owned().extend(moved);
    }

    pub fn holders(&self) -> Vec<Arc<ComponentHolder>> {
        self.owned().clone()
    }

    pub fn len(&self) -> usize {
        self.owned().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owned().is_empty()
    }
}

impl fmt::Debug for ModuleComponentManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleComponentManager")
            .field("module", self.module_info())
            .field("components", &self.len())
            .finish()
    }
}
