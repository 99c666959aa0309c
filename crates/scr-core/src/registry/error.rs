//! # SCR Core Registry Errors
//!
//! Errors raised by the component name and id bookkeeping. A
//! [`RegistryError::NameConflict`] carries the identity of the current owner
//! so the rejected registration can be reported against both modules.
use std::fmt;

use crate::registry::ComponentId;

/// Who currently owns a contested component name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictOwner {
    /// Module identity, `symbolic-name/id`
    pub module: String,
    pub implementation: String,
}

impl fmt::Display for ConflictOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} in module {}", self.implementation, self.module)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("The component name '{name}' has already been registered{}", owner_suffix(.owner))]
    NameConflict {
        name: String,
        /// `None` while the name is only reserved by a registration in flight
        owner: Option<ConflictOwner>,
    },

    #[error("Illegal registry state for component '{name}': {message}")]
    IllegalState { name: String, message: String },

    #[error("No component registered with id {0}")]
    UnknownComponent(ComponentId),
}

fn owner_suffix(owner: &Option<ConflictOwner>) -> String {
    match owner {
        Some(owner) => format!(" by {}", owner),
        None => " (registration in progress)".to_string(),
    }
}
