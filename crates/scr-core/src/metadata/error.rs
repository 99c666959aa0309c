//! # SCR Core Metadata Errors
//!
//! Defines [`ValidationError`], raised when a component descriptor does not
//! describe a component the runtime is able to manage. A validation failure
//! aborts the registration of that single descriptor only.
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Component name must not be empty")]
    EmptyName,

    #[error("Component '{component}' does not declare an implementation")]
    EmptyImplementation { component: String },

    #[error("Reference '{reference}' of component '{component}' does not declare an interface")]
    EmptyInterface { component: String, reference: String },

    #[error("Component '{component}' declares reference '{reference}' more than once")]
    DuplicateReference { component: String, reference: String },

    #[error("Factory component '{component}' cannot be immediate")]
    FactoryImmediate { component: String },

    #[error("Component '{component}' provides no service and therefore cannot be delayed")]
    DelayedWithoutService { component: String },

    #[error("Invalid reference cardinality '{0}', expected one of 0..1, 1..1, 0..n, 1..n")]
    InvalidCardinality(String),

    #[error("Invalid reference policy '{0}', expected 'static' or 'dynamic'")]
    InvalidPolicy(String),
}
