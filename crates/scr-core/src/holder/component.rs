use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;

use crate::holder::error::ComponentError;
use crate::module::ModuleInfo;
use crate::registry::ComponentId;
use crate::service::ServiceReference;

/// Why a component instance is being deactivated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeactivationReason {
    Unspecified,
    /// The component was explicitly disabled
    Disabled,
    /// A required reference lost its provider or a static reference changed
    ReferenceUnavailable,
    /// The component was disposed (runtime shutdown or factory instance disposal)
    Disposed,
    /// The owning module is stopping
    ModuleStopped,
}

impl fmt::Display for DeactivationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            DeactivationReason::Unspecified => "unspecified",
            DeactivationReason::Disabled => "disabled",
            DeactivationReason::ReferenceUnavailable => "reference unavailable",
            DeactivationReason::Disposed => "disposed",
            DeactivationReason::ModuleStopped => "module stopped",
        };
        f.write_str(text)
    }
}

/// Lifecycle hooks of a component implementation.
///
/// Method names come from the component's metadata, so an implementation
/// matches on `method` the way it would dispatch a named callback. Hooks run
/// on the runtime's actor and never under a registry lock.
#[async_trait]
pub trait Component: Any + Send + Sync {
    /// Called once all references are bound
    async fn activate(&self, _method: &str, _context: &ComponentContext) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called before the instance is released. Failures are logged only.
    async fn deactivate(
        &self,
        _method: &str,
        _context: &ComponentContext,
        _reason: DeactivationReason,
    ) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called for every provider bound to a reference declaring a bind method
    async fn bind(&self, method: &str, _service: &ServiceReference) -> Result<(), ComponentError> {
        Err(ComponentError::UnknownMethod {
            method: method.to_string(),
        })
    }

    /// Called for every provider released from a reference declaring an unbind method
    async fn unbind(&self, method: &str, _service: &ServiceReference) -> Result<(), ComponentError> {
        Err(ComponentError::UnknownMethod {
            method: method.to_string(),
        })
    }

    /// Cast to Any for downcasting
    fn as_any(&self) -> &dyn Any;
}

/// What a component sees of its own configuration during activation
#[derive(Debug, Clone)]
pub struct ComponentContext {
    name: String,
    id: ComponentId,
    module: ModuleInfo,
    properties: BTreeMap<String, serde_json::Value>,
    bound: BTreeMap<String, Vec<ServiceReference>>,
}

impl ComponentContext {
    pub(crate) fn new(
        name: &str,
        id: ComponentId,
        module: ModuleInfo,
        properties: BTreeMap<String, serde_json::Value>,
        bound: BTreeMap<String, Vec<ServiceReference>>,
    ) -> Self {
        Self {
            name: name.to_string(),
            id,
            module,
            properties,
            bound,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn module(&self) -> &ModuleInfo {
        &self.module
    }

    pub fn properties(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.properties
    }

    pub fn property<T: for<'de> serde::Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.properties
            .get(key)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// First provider bound to `reference`
    pub fn locate_service(&self, reference: &str) -> Option<&ServiceReference> {
        self.bound.get(reference).and_then(|services| services.first())
    }

    /// All providers bound to `reference`
    pub fn locate_services(&self, reference: &str) -> &[ServiceReference] {
        self.bound.get(reference).map(Vec::as_slice).unwrap_or(&[])
    }
}
