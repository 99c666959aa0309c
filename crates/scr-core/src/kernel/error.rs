//! # SCR Core Kernel Errors
//!
//! [`Error`] aggregates the typed errors of every subsystem so runtime
//! callers deal with a single error type, and [`Result`] is the matching
//! shorthand.
use std::result::Result as StdResult;

use thiserror::Error as ThisError;

use crate::actor::ActorError;
use crate::holder::LifecycleError;
use crate::kernel::config::ConfigError;
use crate::metadata::ValidationError;
use crate::module::ModuleError;
use crate::registry::RegistryError;

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Invalid component descriptor: {0}")]
    Validation(#[from] ValidationError),

    #[error("Lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("Module error: {0}")]
    Module(#[from] ModuleError),

    #[error("Actor error: {0}")]
    Actor(#[from] ActorError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Generic error with message
    #[error("Error: {0}")]
    Other(String),
}

/// Shorthand for Result with our Error type
pub type Result<T> = StdResult<T, Error>;

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}
