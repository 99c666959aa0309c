use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::actor::{ActorHandle, LifecycleTask, SerializingActor};
use crate::holder::{ComponentHolder, ComponentSnapshot, DeactivationReason, LifecycleError};
use crate::kernel::config::ScrConfig;
use crate::kernel::constants;
use crate::kernel::error::Result;
use crate::metadata::ComponentMetadata;
use crate::module::{is_module_active, Module, ModuleError, ModuleEvent, ModuleId, ModuleLoader};
use crate::registry::{ComponentId, ComponentRegistry, RegistryError};
use crate::service::{InMemoryServiceRegistry, ServiceObject, ServiceRegistry};

/// The component runtime: owns the registry, the lifecycle actor, the
/// module loader and the service registry it was given.
///
/// Construct it inside a tokio runtime; [`ScrRuntime::stop`] bounds its life.
pub struct ScrRuntime {
    config: ScrConfig,
    registry: Arc<ComponentRegistry>,
    services: Arc<dyn ServiceRegistry>,
    actor: SerializingActor,
    loader: ModuleLoader,
    stopped: AtomicBool,
}

impl ScrRuntime {
    pub fn new(config: ScrConfig, services: Arc<dyn ServiceRegistry>) -> Self {
        log::info!("Initializing {} v{}", constants::APP_NAME, constants::APP_VERSION);
        let registry = Arc::new(ComponentRegistry::new());
        let actor = SerializingActor::spawn();
        let loader = ModuleLoader::new(registry.clone(), services.clone(), actor.handle());
        Self {
            config,
            registry,
            services,
            actor,
            loader,
            stopped: AtomicBool::new(false),
        }
    }

    /// Runtime with default configuration over an in-memory service registry
    pub fn with_defaults() -> Self {
        Self::new(ScrConfig::default(), Arc::new(InMemoryServiceRegistry::new()))
    }

    pub fn config(&self) -> &ScrConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ComponentRegistry> {
        &self.registry
    }

    pub fn services(&self) -> &Arc<dyn ServiceRegistry> {
        &self.services
    }

    pub fn actor(&self) -> ActorHandle {
        self.actor.handle()
    }

    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }

    /// Load the components of every already active module
    pub fn start(&self, modules: &[Arc<dyn Module>]) {
        log::info!("Starting {} with {} module(s)", constants::APP_NAME, modules.len());
        self.loader.load_all(modules);
    }

    /// Entry point for host module lifecycle notifications. May be called
    /// from any thread; it never waits for component lifecycle work.
    pub fn module_changed(&self, event: &ModuleEvent) {
        if self.stopped.load(Ordering::Acquire) {
            log::debug!("Ignoring module event '{}' after stop", event.name());
            return;
        }
        self.loader.module_changed(event);
    }

    /// Wait until all queued lifecycle work has run
    pub async fn settle(&self) -> Result<()> {
        self.actor.handle().settle().await?;
        Ok(())
    }

    /// Dispose every component and terminate the actor. Idempotent.
    ///
    /// The disposals always run. `drain_on_stop` only decides the fate of
    /// tasks other threads manage to queue before the actor stops accepting.
    pub async fn stop(&self) -> Result<()> {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        log::info!("Stopping {}", constants::APP_NAME);
        self.loader.dispose_all(DeactivationReason::Disposed);
        self.actor.handle().settle().await?;
        self.actor.terminate(self.config.drain_on_stop).await?;
        Ok(())
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    // ---- introspection ----

    /// Every component and factory instance, ordered by id
    pub fn list_components(&self) -> Vec<ComponentSnapshot> {
        let mut snapshots: Vec<ComponentSnapshot> = self
            .registry
            .list_holders(|_| true)
            .iter()
            .flat_map(|holder| holder.snapshots())
            .collect();
        snapshots.sort_by_key(|snapshot| snapshot.id);
        snapshots
    }

    pub fn get_component(&self, id: ComponentId) -> Option<ComponentSnapshot> {
        self.registry.holder_by_id(id).and_then(|holder| holder.snapshot_for(id))
    }

    /// Components declared by module `module`
    pub fn get_components(&self, module: ModuleId) -> Vec<ComponentSnapshot> {
        self.registry
            .list_holders(|holder| holder.module_info().id == module)
            .iter()
            .flat_map(|holder| holder.snapshots())
            .collect()
    }

    /// The component registered as `name` and its factory instances
    pub fn get_components_by_name(&self, name: &str) -> Vec<ComponentSnapshot> {
        self.registry
            .lookup(name)
            .map(|holder| holder.snapshots())
            .unwrap_or_default()
    }

    /// Id of the component registered as `name`
    pub fn component_id(&self, name: &str) -> Option<ComponentId> {
        self.registry.lookup(name).map(|holder| holder.id())
    }

    // ---- administrative requests ----

    fn holder(&self, id: ComponentId) -> Result<Arc<ComponentHolder>> {
        Ok(self
            .registry
            .holder_by_id(id)
            .ok_or(RegistryError::UnknownComponent(id))?)
    }

    pub fn enable_component(&self, id: ComponentId) -> Result<()> {
        let holder = self.holder(id)?;
        self.actor.handle().submit(LifecycleTask::Enable(holder))?;
        Ok(())
    }

    pub fn disable_component(&self, id: ComponentId) -> Result<()> {
        let holder = self.holder(id)?;
        self.actor.handle().submit(LifecycleTask::Disable {
            holder,
            reason: DeactivationReason::Disabled,
        })?;
        Ok(())
    }

    /// Instance of component `id`, activating it first if it is delayed
    pub async fn request_instance(&self, id: ComponentId) -> Result<ServiceObject> {
        let holder = self.holder(id)?;
        let instance = self
            .actor
            .handle()
            .request(|reply| LifecycleTask::Activate { holder, reply })
            .await??;
        Ok(instance)
    }

    /// Create an instance of factory component `id`; returns the instance id
    pub async fn new_factory_instance(
        &self,
        id: ComponentId,
        properties: BTreeMap<String, serde_json::Value>,
    ) -> Result<ComponentId> {
        let holder = self.holder(id)?;
        if !self.config.factory_enabled {
            return Err(LifecycleError::FactoryDisabled(holder.name().to_string()).into());
        }
        let instance = self
            .actor
            .handle()
            .request(|reply| LifecycleTask::NewInstance {
                holder,
                properties,
                reply,
            })
            .await??;
        Ok(instance)
    }

    /// Dispose the factory instance `id`
    pub async fn dispose_factory_instance(&self, id: ComponentId) -> Result<()> {
        let holder = self.holder(id)?;
        self.actor
            .handle()
            .request(|reply| LifecycleTask::DisposeInstance { holder, id, reply })
            .await??;
        Ok(())
    }

    /// Register a component on behalf of an active module
    pub fn register_component(&self, module: Arc<dyn Module>, metadata: ComponentMetadata) -> Result<ComponentId> {
        if !is_module_active(module.as_ref()) {
            return Err(ModuleError::ModuleNotActive(module.info().to_string()).into());
        }
        let manager = self.loader.manager_for(module);
        let holder = manager.register_component(metadata)?;
        Ok(holder.id())
    }
}
