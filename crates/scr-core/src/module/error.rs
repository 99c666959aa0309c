//! # SCR Core Module Errors
//!
//! Errors raised while reading a module's component descriptors. They are
//! logged by the module loader and never stop the module's own lifecycle.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("Component descriptors of module '{module}' are unavailable: {message}")]
    DescriptorsUnavailable { module: String, message: String },

    #[error("Module '{0}' is not active")]
    ModuleNotActive(String),
}
