use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::module::ModuleId;
use crate::registry::ComponentId;
use crate::service::ServiceId;

/// Lifecycle state of a component holder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentState {
    /// Enabled or not, at least one required reference has no provider
    Unsatisfied,
    /// All required references are bound; waiting for activation
    Satisfied,
    Activating,
    Active,
    Deactivating,
    /// Activation failed; cleanup in progress before falling back to `Unsatisfied`
    Failed,
    /// Terminal
    Disposed,
}

impl ComponentState {
    pub fn is_disposed(&self) -> bool {
        matches!(self, ComponentState::Disposed)
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ComponentState::Unsatisfied => "unsatisfied",
            ComponentState::Satisfied => "satisfied",
            ComponentState::Activating => "activating",
            ComponentState::Active => "active",
            ComponentState::Deactivating => "deactivating",
            ComponentState::Failed => "failed",
            ComponentState::Disposed => "disposed",
        };
        f.write_str(text)
    }
}

/// The two kinds of holder the registry creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HolderKind {
    /// Instantiates its single instance directly once satisfied
    Unconfigured,
    /// Instantiates only when an instance is requested through the factory
    Factory,
}

/// Point-in-time view of a component, as returned to introspection callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentSnapshot {
    pub id: ComponentId,
    pub name: String,
    pub implementation: String,
    pub module_id: ModuleId,
    pub module_name: String,
    pub state: ComponentState,
    pub enabled: bool,
    pub kind: HolderKind,
    /// Set on factory-produced instances: the id of the factory holder
    pub factory_of: Option<ComponentId>,
    /// Bound service ids per reference name
    pub references: BTreeMap<String, Vec<ServiceId>>,
    pub last_error: Option<String>,
}
