//! Configuration management for Tessera
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (TSR_* prefix, `__` between nested keys)
//! 2. tessera.local.toml (gitignored, local overrides)
//! 3. tessera.toml (git-tracked, project config)
//! 4. ~/.config/tessera/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;

/// Main Tessera configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    pub project: ProjectConfig,
    pub store: StoreConfig,
    pub reads: ReadConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "tessera-project".to_string(),
        }
    }
}

/// Which record store backend to run, and the properties handed to its
/// `init`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: String,
    pub properties: BTreeMap<String, String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            properties: BTreeMap::new(),
        }
    }
}

/// Defaults for reads issued through the facade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadConfig {
    /// Partition hint used when a caller does not pass one.
    pub default_partitions: usize,
    /// Resolve record groups on a worker pool instead of sequentially.
    pub parallel: bool,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            default_partitions: 4,
            parallel: true,
        }
    }
}

impl TesseraConfig {
    /// Parse a single TOML document, without layering
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML, suitable for writing a tessera.toml
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Configuration for an in-memory store with the given properties
    pub fn in_memory<I, K, V>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            store: StoreConfig {
                backend: "memory".to_string(),
                properties: properties
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            },
            ..Default::default()
        }
    }

    /// Check structural constraints the type system cannot express
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.backend.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store.backend must name a backend".to_string(),
            ));
        }
        if self.store.properties.keys().any(|k| k.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "store.properties keys must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
