//! # SCR Core Lifecycle Errors
//!
//! [`ComponentError`] is what user component hooks return. [`LifecycleError`]
//! covers failures of the holder state machine itself: activation failures,
//! requests against disposed holders, factory misuse.
use crate::registry::ComponentId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Method '{method}' is not implemented by the component")]
    UnknownMethod { method: String },

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ComponentError {
    pub fn failed(message: impl Into<String>) -> Self {
        ComponentError::Failed(message.into())
    }
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Activation of component '{component}' failed during {phase}: {source}")]
    ActivationFailure {
        component: String,
        phase: &'static str,
        #[source]
        source: ComponentError,
    },

    #[error("Circular dependency detected while activating: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("Component '{0}' has been disposed")]
    Disposed(String),

    #[error("Component '{0}' is not satisfied")]
    NotSatisfied(String),

    #[error("Component '{0}' is disabled")]
    Disabled(String),

    #[error("Component '{0}' is not a factory component")]
    NotAFactory(String),

    #[error("Component '{0}' is a factory component and only instantiates through the factory")]
    IsAFactory(String),

    #[error("Component factories are disabled by configuration (component '{0}')")]
    FactoryDisabled(String),

    #[error("Component '{component}' has no instance with id {id}")]
    UnknownInstance { component: String, id: ComponentId },
}
