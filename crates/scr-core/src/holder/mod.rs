//! # SCR Core Component Holders
//!
//! A [`ComponentHolder`] owns one component's lifecycle: it tracks the
//! providers of the component's references, decides when the component is
//! satisfied, and drives instantiation, binding, activation and teardown.
//!
//! Holders come in two kinds ([`HolderKind`]): unconfigured holders run a
//! single instance, factory holders create instances on request. All state
//! transitions are executed by the serializing actor.
pub mod component;
pub mod dependency;
pub mod error;
pub mod lifecycle;
pub mod state;

pub use component::{Component, ComponentContext, DeactivationReason};
pub use dependency::DependencyChange;
pub use error::{ComponentError, LifecycleError};
pub use lifecycle::ComponentHolder;
pub use state::{ComponentSnapshot, ComponentState, HolderKind};

// Test module declaration
#[cfg(test)]
mod tests;
