use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::holder::component::Component;
use crate::holder::error::ComponentError;
use crate::metadata::ComponentMetadata;
use crate::module::error::ModuleError;
use crate::service::ServiceRegistry;

/// Identifier of a module, unique for the lifetime of the host
pub type ModuleId = u64;

/// Identity of a module as reported in logs and snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleInfo {
    pub id: ModuleId,
    pub symbolic_name: String,
    pub version: String,
}

impl ModuleInfo {
    pub fn new(id: ModuleId, symbolic_name: &str, version: &str) -> Self {
        Self {
            id,
            symbolic_name: symbolic_name.to_string(),
            version: version.to_string(),
        }
    }
}

impl fmt::Display for ModuleInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.symbolic_name, self.id)
    }
}

/// Host-side lifecycle state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    Installed,
    Resolved,
    Starting,
    Active,
    Stopping,
    Uninstalled,
}

/// A unit of code contributing component descriptors.
///
/// Implemented by the host module system; the runtime only reads
/// descriptors and asks the module to instantiate implementations.
pub trait Module: Send + Sync {
    fn info(&self) -> ModuleInfo;

    fn state(&self) -> ModuleState;

    /// Whether the module starts lazily, announcing itself before it is active
    fn lazy_activation(&self) -> bool {
        false
    }

    /// Component descriptors declared by this module
    fn component_descriptors(&self) -> Result<Vec<ComponentMetadata>, ModuleError>;

    /// Create a fresh instance of `implementation`
    fn create_instance(&self, implementation: &str) -> Result<Arc<dyn Component>, ComponentError>;
}

/// Whether the components of `module` should be loaded right now.
/// A starting module only counts when it activates lazily.
pub fn is_module_active(module: &dyn Module) -> bool {
    match module.state() {
        ModuleState::Active => true,
        ModuleState::Starting => module.lazy_activation(),
        _ => false,
    }
}

/// Lifecycle notifications delivered by the host module system
#[derive(Clone)]
pub enum ModuleEvent {
    Started(Arc<dyn Module>),
    /// Sent for lazily activated modules before they are fully started
    LazyActivation(Arc<dyn Module>),
    Stopping(Arc<dyn Module>),
}

impl ModuleEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ModuleEvent::Started(_) => "module.started",
            ModuleEvent::LazyActivation(_) => "module.lazy_activation",
            ModuleEvent::Stopping(_) => "module.stopping",
        }
    }

    pub fn module(&self) -> &Arc<dyn Module> {
        match self {
            ModuleEvent::Started(module)
            | ModuleEvent::LazyActivation(module)
            | ModuleEvent::Stopping(module) => module,
        }
    }
}

impl fmt::Debug for ModuleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEvent")
            .field("name", &self.name())
            .field("module", &self.module().info())
            .finish()
    }
}

/// Per-module execution context handed to every holder of the module.
/// Dependency lookups and service registrations go through it.
pub struct ModuleContext {
    module: Arc<dyn Module>,
    info: ModuleInfo,
    services: Arc<dyn ServiceRegistry>,
}

impl ModuleContext {
    pub fn new(module: Arc<dyn Module>, services: Arc<dyn ServiceRegistry>) -> Self {
        let info = module.info();
        Self {
            module,
            info,
            services,
        }
    }

    pub fn module(&self) -> &Arc<dyn Module> {
        &self.module
    }

    pub fn info(&self) -> &ModuleInfo {
        &self.info
    }

    pub fn services(&self) -> &Arc<dyn ServiceRegistry> {
        &self.services
    }
}

impl fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleContext")
            .field("module", &self.info)
            .finish_non_exhaustive()
    }
}
