use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::metadata::error::ValidationError;
use crate::metadata::reference::ReferenceMetadata;

/// Default name of the activation hook
pub const DEFAULT_ACTIVATE: &str = "activate";
/// Default name of the deactivation hook
pub const DEFAULT_DEACTIVATE: &str = "deactivate";

fn default_activate() -> String {
    DEFAULT_ACTIVATE.to_string()
}

fn default_deactivate() -> String {
    DEFAULT_DEACTIVATE.to_string()
}

fn default_enabled() -> bool {
    true
}

/// Declarative description of a component.
///
/// Built with the chaining setters and turned into an immutable, shared
/// `Arc<ComponentMetadata>` by [`ComponentMetadata::validate`]. Nothing can
/// mutate the metadata after that point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentMetadata {
    /// Globally unique component name
    pub name: String,

    /// Implementation identifier resolved by the owning module
    pub implementation: String,

    /// Declared references, in binding order
    #[serde(default)]
    pub references: Vec<ReferenceMetadata>,

    /// Capability interfaces registered on behalf of the component
    #[serde(default)]
    pub provides: Vec<String>,

    #[serde(default = "default_activate")]
    pub activate: String,

    #[serde(default = "default_deactivate")]
    pub deactivate: String,

    /// Immediate flag as declared; `None` until resolved by validation
    #[serde(default)]
    pub immediate: Option<bool>,

    /// Factory identifier; a factory component only instantiates on request
    #[serde(default)]
    pub factory: Option<String>,

    /// Whether the component is enabled as soon as its module is loaded
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl ComponentMetadata {
    /// Create metadata for `name` implemented by `implementation`
    pub fn new(name: &str, implementation: &str) -> Self {
        Self {
            name: name.to_string(),
            implementation: implementation.to_string(),
            references: Vec::new(),
            provides: Vec::new(),
            activate: default_activate(),
            deactivate: default_deactivate(),
            immediate: None,
            factory: None,
            enabled: true,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_reference(mut self, reference: ReferenceMetadata) -> Self {
        self.references.push(reference);
        self
    }

    pub fn provides(mut self, interface: &str) -> Self {
        self.provides.push(interface.to_string());
        self
    }

    pub fn activate_method(mut self, method: &str) -> Self {
        self.activate = method.to_string();
        self
    }

    pub fn deactivate_method(mut self, method: &str) -> Self {
        self.deactivate = method.to_string();
        self
    }

    pub fn immediate(mut self, immediate: bool) -> Self {
        self.immediate = Some(immediate);
        self
    }

    pub fn factory(mut self, factory: &str) -> Self {
        self.factory = Some(factory.to_string());
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn property<V: Into<serde_json::Value>>(mut self, key: &str, value: V) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Whether the component instantiates as soon as it is satisfied.
    /// Only meaningful on validated metadata.
    pub fn is_immediate(&self) -> bool {
        self.immediate.unwrap_or(false)
    }

    pub fn is_factory(&self) -> bool {
        self.factory.is_some()
    }

    pub fn provides_service(&self) -> bool {
        !self.provides.is_empty()
    }

    pub fn reference(&self, name: &str) -> Option<&ReferenceMetadata> {
        self.references.iter().find(|r| r.name == name)
    }

    /// Validate the descriptor, resolve defaults and freeze it.
    pub fn validate(mut self) -> Result<Arc<ComponentMetadata>, ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.implementation.trim().is_empty() {
            return Err(ValidationError::EmptyImplementation {
                component: self.name.clone(),
            });
        }

        let mut seen = HashSet::new();
        for reference in &mut self.references {
            reference.validate(&self.name)?;
            if !seen.insert(reference.name.clone()) {
                return Err(ValidationError::DuplicateReference {
                    component: self.name.clone(),
                    reference: reference.name.clone(),
                });
            }
        }

        match (self.immediate, self.is_factory(), self.provides_service()) {
            (Some(true), true, _) => {
                return Err(ValidationError::FactoryImmediate {
                    component: self.name.clone(),
                });
            }
            (Some(false), false, false) => {
                return Err(ValidationError::DelayedWithoutService {
                    component: self.name.clone(),
                });
            }
            (None, is_factory, provides) => {
                self.immediate = Some(!is_factory && !provides);
            }
            _ => {}
        }

        Ok(Arc::new(self))
    }
}
