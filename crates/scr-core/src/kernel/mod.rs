//! # SCR Core Kernel
//!
//! The runtime context object and its ambient pieces.
//!
//! - **Runtime**: [`ScrRuntime`](bootstrap::ScrRuntime) owns the component
//!   registry, the lifecycle actor, the module loader and the service
//!   registry, with explicit start and stop bounds.
//! - **Configuration**: [`ScrConfig`](config::ScrConfig), loaded from
//!   JSON, YAML or TOML files or from `ds.*` properties.
//! - **Errors**: the aggregated [`Error`](error::Error) and its `Result` alias.
pub mod bootstrap;
pub mod config;
pub mod constants;
pub mod error;

pub use bootstrap::ScrRuntime;
pub use config::{ConfigError, ConfigFormat, ScrConfig};
pub use error::{Error, Result};
