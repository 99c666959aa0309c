//! # SCR Runtime Configuration
//!
//! [`ScrConfig`] is read from a JSON, YAML or TOML file (chosen by file
//! extension) or from `ds.*` framework properties. Missing keys take their
//! defaults.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kernel::constants;

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unknown or unsupported configuration format for path: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("Failed to parse {format} configuration: {message}")]
    Parse { format: &'static str, message: String },

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("Invalid value '{value}' for property '{key}'")]
    InvalidProperty { key: String, value: String },
}

/// Runtime settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`, `off`
    pub log_level: String,
    /// Run tasks queued by other threads while the runtime stops. The
    /// disposals `stop` itself queues always run.
    pub drain_on_stop: bool,
    /// Whether factory components may create instances
    pub factory_enabled: bool,
}

impl Default for ScrConfig {
    fn default() -> Self {
        Self {
            log_level: constants::DEFAULT_LOG_LEVEL.to_string(),
            drain_on_stop: true,
            factory_enabled: true,
        }
    }
}

impl ScrConfig {
    /// Load from a file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format =
            ConfigFormat::from_path(path).ok_or_else(|| ConfigError::UnsupportedFormat(path.to_path_buf()))?;
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, format)?;
        config.level_filter()?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self, ConfigError> {
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| ConfigError::Parse {
                format: "JSON",
                message: e.to_string(),
            }),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
                format: "YAML",
                message: e.to_string(),
            }),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| ConfigError::Parse {
                format: "TOML",
                message: e.to_string(),
            }),
        }
    }

    /// Build from framework properties such as `ds.loglevel=debug`.
    /// Unrelated keys are ignored.
    pub fn from_properties<K, V>(properties: impl IntoIterator<Item = (K, V)>) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let properties: BTreeMap<String, String> = properties
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().trim().to_string()))
            .collect();

        let mut config = Self::default();
        if let Some(level) = properties.get(constants::PROP_LOG_LEVEL) {
            config.log_level = normalize_level(level)?.to_string();
        }
        if let Some(value) = properties.get(constants::PROP_FACTORY_ENABLED) {
            config.factory_enabled = parse_flag(constants::PROP_FACTORY_ENABLED, value)?;
        }
        if let Some(value) = properties.get(constants::PROP_ACTOR_DRAIN) {
            config.drain_on_stop = parse_flag(constants::PROP_ACTOR_DRAIN, value)?;
        }
        Ok(config)
    }

    /// The configured level as a `log` filter
    pub fn level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        normalize_level(&self.log_level)?
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }
}

/// Map level names and the numeric `1`..`4` form onto `log` level names
fn normalize_level(level: &str) -> Result<&'static str, ConfigError> {
    match level.trim().to_lowercase().as_str() {
        "off" => Ok("off"),
        "1" | "error" => Ok("error"),
        "2" | "warn" | "warning" => Ok("warn"),
        "3" | "info" => Ok("info"),
        "4" | "debug" => Ok("debug"),
        "trace" => Ok("trace"),
        _ => Err(ConfigError::InvalidLogLevel(level.to_string())),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(ConfigError::InvalidProperty {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
