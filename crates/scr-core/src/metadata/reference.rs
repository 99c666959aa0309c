use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::metadata::error::ValidationError;

/// How many providers a reference accepts and whether it must be bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Cardinality {
    /// `0..1` - optional, at most one provider
    #[serde(rename = "0..1")]
    Optional,
    /// `1..1` - exactly one provider required
    #[default]
    #[serde(rename = "1..1")]
    Mandatory,
    /// `0..n` - any number of providers
    #[serde(rename = "0..n")]
    Multiple,
    /// `1..n` - at least one provider required
    #[serde(rename = "1..n")]
    AtLeastOne,
}

impl Cardinality {
    /// Whether the component cannot be satisfied without a bound provider
    pub fn is_required(&self) -> bool {
        matches!(self, Cardinality::Mandatory | Cardinality::AtLeastOne)
    }

    /// Whether more than one provider may be bound at the same time
    pub fn is_multiple(&self) -> bool {
        matches!(self, Cardinality::Multiple | Cardinality::AtLeastOne)
    }

    /// Whether a reference currently holding `bound` providers accepts another one
    pub fn accepts_more(&self, bound: usize) -> bool {
        self.is_multiple() || bound == 0
    }
}

impl FromStr for Cardinality {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "0..1" => Ok(Cardinality::Optional),
            "1..1" => Ok(Cardinality::Mandatory),
            "0..n" => Ok(Cardinality::Multiple),
            "1..n" => Ok(Cardinality::AtLeastOne),
            other => Err(ValidationError::InvalidCardinality(other.to_string())),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Cardinality::Optional => "0..1",
            Cardinality::Mandatory => "1..1",
            Cardinality::Multiple => "0..n",
            Cardinality::AtLeastOne => "1..n",
        };
        f.write_str(text)
    }
}

/// Binding policy of a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReferencePolicy {
    /// Bound set is frozen while the component is active; changes reactivate it
    #[default]
    Static,
    /// Providers may come and go while the component stays active
    Dynamic,
}

impl FromStr for ReferencePolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "static" => Ok(ReferencePolicy::Static),
            "dynamic" => Ok(ReferencePolicy::Dynamic),
            other => Err(ValidationError::InvalidPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for ReferencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferencePolicy::Static => f.write_str("static"),
            ReferencePolicy::Dynamic => f.write_str("dynamic"),
        }
    }
}

/// A declared dependency of a component on a capability interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceMetadata {
    /// Reference name, defaults to the interface name during validation
    #[serde(default)]
    pub name: String,

    /// Capability interface the providers must offer
    pub interface: String,

    /// Method invoked on the component for every bound provider
    #[serde(default)]
    pub bind: Option<String>,

    /// Method invoked on the component when a provider is released
    #[serde(default)]
    pub unbind: Option<String>,

    #[serde(default)]
    pub cardinality: Cardinality,

    #[serde(default)]
    pub policy: ReferencePolicy,
}

impl ReferenceMetadata {
    /// Create a mandatory, static reference on the given interface
    pub fn new(interface: &str) -> Self {
        Self {
            name: String::new(),
            interface: interface.to_string(),
            bind: None,
            unbind: None,
            cardinality: Cardinality::default(),
            policy: ReferencePolicy::default(),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn bind(mut self, method: &str) -> Self {
        self.bind = Some(method.to_string());
        self
    }

    pub fn unbind(mut self, method: &str) -> Self {
        self.unbind = Some(method.to_string());
        self
    }

    pub fn cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn policy(mut self, policy: ReferencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn is_required(&self) -> bool {
        self.cardinality.is_required()
    }

    pub fn is_dynamic(&self) -> bool {
        self.policy == ReferencePolicy::Dynamic
    }

    pub(crate) fn validate(&mut self, component: &str) -> Result<(), ValidationError> {
        if self.interface.trim().is_empty() {
            return Err(ValidationError::EmptyInterface {
                component: component.to_string(),
                reference: self.name.clone(),
            });
        }
        if self.name.trim().is_empty() {
            self.name = self.interface.clone();
        }
        Ok(())
    }
}

impl fmt::Display for ReferenceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({}, {})",
            self.name, self.interface, self.cardinality, self.policy
        )
    }
}
