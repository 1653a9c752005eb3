//! Error types for the Tessera facade.

use tessera_config::ConfigError;
use tessera_store::{ErrorKind, StoreError};

/// Result type for Tessera operations.
pub type Result<T> = std::result::Result<T, TesseraError>;

/// Errors that can occur in Tessera operations.
#[derive(Debug, thiserror::Error)]
pub enum TesseraError {
    /// The record store rejected or failed the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A configuration document was malformed or inconsistent.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Layered configuration could not be loaded.
    #[error("failed to load configuration: {0:#}")]
    ConfigLoad(anyhow::Error),

    /// `store.backend` names a backend that is not compiled in.
    #[error("unknown record store backend '{0}'")]
    UnknownBackend(String),
}

impl TesseraError {
    /// Classifies the error the same way the store does.
    ///
    /// Everything that is not a missing table is a storage error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TesseraError::Store(e) => e.kind(),
            _ => ErrorKind::Storage,
        }
    }

    pub fn is_table_not_available(&self) -> bool {
        self.kind() == ErrorKind::TableNotAvailable
    }
}
