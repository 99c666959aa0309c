//! # SCR Core
//!
//! A declarative component runtime. Modules contribute component
//! descriptors; the runtime enforces unique component names, hands out
//! stable ids, resolves each component's references against a service
//! registry and drives the component through activation and deactivation
//! as modules come and go and providers appear or vanish.
//!
//! All lifecycle transitions run on a single serializing actor, so racing
//! module and service notifications resolve into one total order.
pub mod actor;
pub mod holder;
pub mod kernel;
pub mod metadata;
pub mod module;
pub mod registry;
pub mod service;

pub use actor::{ActorHandle, LifecycleTask, SerializingActor};
pub use holder::{
    Component, ComponentContext, ComponentError, ComponentHolder, ComponentSnapshot, ComponentState,
    DeactivationReason, HolderKind, LifecycleError,
};
pub use kernel::error::Error as KernelError;
pub use kernel::{ScrConfig, ScrRuntime};
pub use metadata::{Cardinality, ComponentMetadata, ReferenceMetadata, ReferencePolicy};
pub use module::{Module, ModuleContext, ModuleEvent, ModuleId, ModuleInfo, ModuleState};
pub use registry::{ComponentId, ComponentRegistry};
pub use service::{InMemoryServiceRegistry, ServiceObject, ServiceReference, ServiceRegistry};

#[cfg(test)]
mod tests;
