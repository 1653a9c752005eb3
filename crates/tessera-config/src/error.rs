//! Configuration error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse TOML config: {source}")]
    ParseError {
        #[from]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config as TOML: {source}")]
    SerializeError {
        #[from]
        source: toml::ser::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}
