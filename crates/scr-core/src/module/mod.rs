//! # SCR Core Module Integration
//!
//! The seam between the host module system and the runtime.
//!
//! - [`Module`], [`ModuleEvent`] and [`ModuleContext`]: what the runtime
//!   consumes from the host.
//! - [`ModuleComponentManager`]: registers one module's descriptors and
//!   disposes them on unload.
//! - [`ModuleLoader`]: per-module load records with an atomic
//!   check-then-mark, so racing start notifications load a module once.
pub mod error;
pub mod loader;
pub mod manager;
pub mod traits;

pub use error::ModuleError;
pub use loader::ModuleLoader;
pub use manager::ModuleComponentManager;
pub use traits::{is_module_active, Module, ModuleContext, ModuleEvent, ModuleId, ModuleInfo, ModuleState};
