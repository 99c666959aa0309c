use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::actor::ActorHandle;
use crate::holder::DeactivationReason;
use crate::module::manager::ModuleComponentManager;
use crate::module::{is_module_active, Module, ModuleContext, ModuleEvent, ModuleId};
use crate::registry::ComponentRegistry;
use crate::service::ServiceRegistry;

enum LoadRecord {
    Loading,
    Loaded(Arc<ModuleComponentManager>),
}

/// Reacts to module lifecycle events, loading each module's components at
/// most once no matter how many start notifications race in.
pub struct ModuleLoader {
    registry: Arc<ComponentRegistry>,
    services: Arc<dyn ServiceRegistry>,
    actor: ActorHandle,
    records: Mutex<BTreeMap<ModuleId, LoadRecord>>,
}

impl ModuleLoader {
    pub fn new(registry: Arc<ComponentRegistry>, services: Arc<dyn ServiceRegistry>, actor: ActorHandle) -> Self {
        Self {
            registry,
            services,
            actor,
            records: Mutex::new(BTreeMap::new()),
        }
    }

    fn records(&self) -> MutexGuard<'_, BTreeMap<ModuleId, LoadRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn new_manager(&self, module: Arc<dyn Module>) -> Arc<ModuleComponentManager> {
        let context = Arc::new(ModuleContext::new(module, self.services.clone()));
        Arc::new(ModuleComponentManager::new(
            context,
            self.registry.clone(),
            self.actor.clone(),
        ))
    }

    pub fn module_changed(&self, event: &ModuleEvent) {
        log::debug!("Module event '{}' for {}", event.name(), event.module().info());
        match event {
            ModuleEvent::Started(module) | ModuleEvent::LazyActivation(module) => {
                self.load_components(module.clone());
            }
            ModuleEvent::Stopping(module) => {
                self.dispose_components(module.as_ref(), DeactivationReason::ModuleStopped);
            }
        }
    }

    /// Load the components of `module` unless it is already loading or
    /// loaded. Returns `true` when this call did the loading.
    pub fn load_components(&self, module: Arc<dyn Module>) -> bool {
        let info = module.info();
        {
            let mut records = self.records();
            if records.contains_key(&info.id) {
                log::debug!("Module {} is already loading or loaded", info);
                return false;
            }
            records.insert(info.id, LoadRecord::Loading);
        }

        let descriptors = match module.component_descriptors() {
            Ok(descriptors) => descriptors,
            Err(e) => {
                self.records().remove(&info.id);
                if is_module_active(module.as_ref()) {
                    log::error!("Cannot read component descriptors of module {}: {}", info, e);
                } else {
                    log::info!(
                        "Module {} is no longer active, component descriptors not read: {}",
                        info,
                        e
                    );
                }
                return false;
            }
        };

        let manager = self.new_manager(module);
        let loaded = manager.load(descriptors);

        let orphaned = {
            let mut records = self.records();
            match records.get(&info.id) {
                Some(LoadRecord::Loading) => {
                    records.insert(info.id, LoadRecord::Loaded(manager.clone()));
                    false
                }
                Some(LoadRecord::Loaded(existing)) => {
                    existing.absorb(&manager);
                    false
                }
                None => true,
            }
        };
        if orphaned {
            log::info!("Module {} stopped while loading, disposing its components", info);
            manager.dispose(DeactivationReason::ModuleStopped);
            return true;
        }

        log::info!("Loaded {} component(s) of module {}", loaded, info);
        true
    }

    /// Forget the module and queue disposal of its components
    pub fn dispose_components(&self, module: &dyn Module, reason: DeactivationReason) {
        let info = module.info();
        let record = self.records().remove(&info.id);
        match record {
            Some(LoadRecord::Loaded(manager)) => {
                log::info!("Disposing components of module {}", info);
                manager.dispose(reason);
            }
            // The loading call finds its record gone and disposes what it built
            Some(LoadRecord::Loading) => {}
            None => log::debug!("Module {} has no loaded components", info),
        }
    }

    /// Load every module that is active, or starting with lazy activation
    pub fn load_all(&self, modules: &[Arc<dyn Module>]) {
        for module in modules {
            if is_module_active(module.as_ref()) {
                self.load_components(module.clone());
            }
        }
    }

    /// Manager of `module` for programmatic registration, loading the
    /// module's descriptors first if that has not happened yet.
    pub fn manager_for(&self, module: Arc<dyn Module>) -> Arc<ModuleComponentManager> {
        let id = module.info().id;
        if !self.records().contains_key(&id) {
            self.load_components(module.clone());
        }
        let mut records = self.records();
        if let Some(LoadRecord::Loaded(manager)) = records.get(&id) {
            return manager.clone();
        }
        let manager = self.new_manager(module);
        records.insert(id, LoadRecord::Loaded(manager.clone()));
        manager
    }

    pub fn dispose_all(&self, reason: DeactivationReason) {
        let records = std::mem::take(&mut *self.records());
        for record in records.into_values() {
            if let LoadRecord::Loaded(manager) = record {
                manager.dispose(reason);
            }
        }
    }

    pub fn is_loaded(&self, module: ModuleId) -> bool {
        matches!(self.records().get(&module), Some(LoadRecord::Loaded(_)))
    }

    pub fn managers(&self) -> Vec<Arc<ModuleComponentManager>> {
        self.records()
            .values()
            .filter_map(|record| match record {
                LoadRecord::Loaded(manager) => Some(manager.clone()),
                LoadRecord::Loading => None,
            })
            .collect()
    }
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("modules", &self.records().len())
            .finish()
    }
}
