#![cfg(test)]

use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::actor::{LifecycleTask, SerializingActor};
use crate::holder::{Component, ComponentContext, ComponentError, ComponentHolder, DeactivationReason};
use crate::metadata::{ComponentMetadata, ReferenceMetadata};
use crate::module::{Module, ModuleComponentManager, ModuleContext, ModuleError, ModuleInfo, ModuleState};
use crate::registry::ComponentRegistry;
use crate::service::{InMemoryServiceRegistry, ServiceOwner, ServiceReference, ServiceRegistry};

// ===== EVENT LOG =====

/// Shared, ordered record of hook invocations, e.g. `A:activate` or `A:bind:7`
/// where 7 is the bound service id
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Entries recorded for `component`
    pub fn of(&self, component: &str) -> Vec<String> {
        let prefix = format!("{}:", component);
        self.entries()
            .into_iter()
            .filter(|entry| entry.starts_with(&prefix))
            .collect()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.entries().iter().filter(|e| e.as_str() == entry).count()
    }
}

// ===== FAILURE SWITCHES =====

/// Names of components (or `component:hook` pairs) whose hooks should fail
#[derive(Clone, Default)]
pub struct Failures(Arc<Mutex<HashSet<String>>>);

impl Failures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, key: &str) {
        self.0.lock().unwrap().insert(key.to_string());
    }

    pub fn heal(&self, key: &str) {
        self.0.lock().unwrap().remove(key);
    }

    fn should_fail(&self, key: &str) -> bool {
        self.0.lock().unwrap().contains(key)
    }
}

// ===== MOCK COMPONENT =====

/// Component recording every hook into an [`EventLog`]
pub struct RecordingComponent {
    name: String,
    log: EventLog,
    failures: Failures,
}

impl RecordingComponent {
    pub fn new(name: &str, log: EventLog, failures: Failures) -> Self {
        Self {
            name: name.to_string(),
            log,
            failures,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn hook(&self, hook: &str) -> Result<(), ComponentError> {
        if self.failures.should_fail(&format!("{}:{}", self.name, hook)) {
            self.log.push(format!("{}:{}-failed", self.name, hook));
            return Err(ComponentError::failed(format!("{} refused to {}", self.name, hook)));
        }
        Ok(())
    }
}

#[async_trait]
impl Component for RecordingComponent {
    async fn activate(&self, _method: &str, _context: &ComponentContext) -> Result<(), ComponentError> {
        self.hook("activate")?;
        self.log.push(format!("{}:activate", self.name));
        Ok(())
    }

    async fn deactivate(
        &self,
        _method: &str,
        _context: &ComponentContext,
        reason: DeactivationReason,
    ) -> Result<(), ComponentError> {
        self.log.push(format!("{}:deactivate:{}", self.name, reason));
        self.hook("deactivate")
    }

    async fn bind(&self, _method: &str, service: &ServiceReference) -> Result<(), ComponentError> {
        self.hook("bind")?;
        self.log.push(format!("{}:bind:{}", self.name, service.id()));
        Ok(())
    }

    async fn unbind(&self, _method: &str, service: &ServiceReference) -> Result<(), ComponentError> {
        self.log.push(format!("{}:unbind:{}", self.name, service.id()));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ===== MOCK MODULE =====

/// Module whose descriptors and state are set by the test. Every
/// implementation name resolves to a [`RecordingComponent`] named after it.
pub struct TestModule {
    info: ModuleInfo,
    state: Mutex<ModuleState>,
    lazy: bool,
    descriptors: Mutex<Option<Vec<ComponentMetadata>>>,
    pub log: EventLog,
    pub failures: Failures,
    descriptor_reads: AtomicUsize,
    instances: Mutex<BTreeMap<String, usize>>,
}

impl TestModule {
    pub fn new(id: u64, name: &str, descriptors: Vec<ComponentMetadata>) -> Arc<Self> {
        Self::with_log(id, name, descriptors, EventLog::new(), Failures::new())
    }

    pub fn with_log(
        id: u64,
        name: &str,
        descriptors: Vec<ComponentMetadata>,
        log: EventLog,
        failures: Failures,
    ) -> Arc<Self> {
        Arc::new(Self {
            info: ModuleInfo::new(id, name, "1.0.0"),
            state: Mutex::new(ModuleState::Active),
            lazy: false,
            descriptors: Mutex::new(Some(descriptors)),
            log,
            failures,
            descriptor_reads: AtomicUsize::new(0),
            instances: Mutex::new(BTreeMap::new()),
        })
    }

    /// Module in `Starting` state with lazy activation
    pub fn lazy(id: u64, name: &str, descriptors: Vec<ComponentMetadata>) -> Arc<Self> {
        Arc::new(Self {
            info: ModuleInfo::new(id, name, "1.0.0"),
            state: Mutex::new(ModuleState::Starting),
            lazy: true,
            descriptors: Mutex::new(Some(descriptors)),
            log: EventLog::new(),
            failures: Failures::new(),
            descriptor_reads: AtomicUsize::new(0),
            instances: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn set_state(&self, state: ModuleState) {
        *self.state.lock().unwrap() = state;
    }

    /// Make `component_descriptors` fail from now on
    pub fn break_descriptors(&self) {
        *self.descriptors.lock().unwrap() = None;
    }

    pub fn set_descriptors(&self, descriptors: Vec<ComponentMetadata>) {
        *self.descriptors.lock().unwrap() = Some(descriptors);
    }

    pub fn descriptor_reads(&self) -> usize {
        self.descriptor_reads.load(Ordering::SeqCst)
    }

    /// How many instances of `implementation` were created
    pub fn instances_of(&self, implementation: &str) -> usize {
        self.instances
            .lock()
            .unwrap()
            .get(implementation)
            .copied()
            .unwrap_or(0)
    }
}

impl Module for TestModule {
    fn info(&self) -> ModuleInfo {
        self.info.clone()
    }

    fn state(&self) -> ModuleState {
        *self.state.lock().unwrap()
    }

    fn lazy_activation(&self) -> bool {
        self.lazy
    }

    fn component_descriptors(&self) -> Result<Vec<ComponentMetadata>, ModuleError> {
        self.descriptor_reads.fetch_add(1, Ordering::SeqCst);
        self.descriptors
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ModuleError::DescriptorsUnavailable {
                module: self.info.symbolic_name.clone(),
                message: "descriptor source is broken".to_string(),
            })
    }

    fn create_instance(&self, implementation: &str) -> Result<Arc<dyn Component>, ComponentError> {
        if self.failures.should_fail(&format!("{}:instantiate", implementation)) {
            return Err(ComponentError::failed(format!("cannot instantiate {}", implementation)));
        }
        *self
            .instances
            .lock()
            .unwrap()
            .entry(implementation.to_string())
            .or_default() += 1;
        Ok(Arc::new(RecordingComponent::new(
            implementation,
            self.log.clone(),
            self.failures.clone(),
        )))
    }
}

// ===== DESCRIPTOR HELPERS =====

/// Immediate component without references or services
pub fn plain(name: &str) -> ComponentMetadata {
    ComponentMetadata::new(name, name)
}

/// Immediate component providing `interface`
pub fn provider(name: &str, interface: &str) -> ComponentMetadata {
    ComponentMetadata::new(name, name).provides(interface).immediate(true)
}

/// Reference to `interface` with recorded bind and unbind hooks
pub fn requiring(interface: &str) -> ReferenceMetadata {
    ReferenceMetadata::new(interface)
        .bind("bind")
        .unbind("unbind")
}

// ===== HOLDER FIXTURE =====

/// One module wired to a fresh registry, actor and service registry,
/// without a full runtime around it
pub struct Fixture {
    pub services: Arc<InMemoryServiceRegistry>,
    pub registry: Arc<ComponentRegistry>,
    pub actor: SerializingActor,
    pub module: Arc<TestModule>,
    pub manager: ModuleComponentManager,
}

impl Fixture {
    pub fn new() -> Self {
        let services = Arc::new(InMemoryServiceRegistry::new());
        let registry = Arc::new(ComponentRegistry::new());
        let actor = SerializingActor::spawn();
        let module = TestModule::new(1, "fixture", vec![]);
        let context = Arc::new(ModuleContext::new(module.clone(), services.clone()));
        let manager = ModuleComponentManager::new(context, registry.clone(), actor.handle());
        Self {
            services,
            registry,
            actor,
            module,
            manager,
        }
    }

    pub fn register(&self, metadata: ComponentMetadata) -> Arc<ComponentHolder> {
        self.manager.register_component(metadata).unwrap()
    }

    /// Register a provider of `interface` from outside the runtime
    pub fn external(&self, interface: &str) -> ServiceReference {
        self.services.register(
            &[interface.to_string()],
            ServiceOwner::External("test".to_string()),
            Some(Arc::new(RecordingComponent::new("external", EventLog::new(), Failures::new()))),
        )
    }

    pub fn submit(&self, task: LifecycleTask) {
        self.actor.handle().submit(task).unwrap();
    }

    pub async fn settle(&self) {
        self.actor.handle().settle().await.unwrap();
    }

    pub fn log(&self) -> &EventLog {
        &self.module.log
    }
}
