//! Store error types.

use tessera_types::{TableName, TenantId};

/// Result type for record store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Coarse classification of a [`StoreError`].
///
/// Callers branch on this: a missing table can be handled (for example by
/// creating it lazily on first write) while everything else is an outage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The `(tenant, table)` does not exist.
    TableNotAvailable,
    /// Any other backend-level failure.
    Storage,
}

/// Errors from a record store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The named table does not exist for the tenant.
    #[error("table '{table}' is not available for tenant {tenant}")]
    TableNotAvailable { tenant: TenantId, table: TableName },

    /// An operation was issued before `init`.
    #[error("record store has not been initialized")]
    NotInitialized,

    /// `init` was called more than once.
    #[error("record store is already initialized")]
    AlreadyInitialized,

    /// An operation was issued after `destroy`.
    #[error("record store has been destroyed")]
    Destroyed,

    /// A caller-supplied argument is out of range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A backend property passed to `init` could not be used.
    #[error("invalid property '{key}': {reason}")]
    InvalidProperty { key: String, reason: String },

    /// The schema violates a structural constraint.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// The backend does not implement the requested capability.
    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    /// A record group produced by a different backend was passed in.
    #[error("record group belongs to backend '{actual}', expected '{expected}'")]
    ForeignRecordGroup { expected: String, actual: String },

    /// A record group payload could not be encoded or decoded.
    #[error("record group codec error: {0}")]
    Codec(#[from] postcard::Error),

    /// An internal lock was poisoned by a panicking writer.
    #[error("lock poisoned")]
    LockPoisoned,

    /// Any other backend failure (I/O, connectivity, resource exhaustion).
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn table_not_available(tenant: TenantId, table: &TableName) -> Self {
        StoreError::TableNotAvailable {
            tenant,
            table: table.clone(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::TableNotAvailable { .. } => ErrorKind::TableNotAvailable,
            _ => ErrorKind::Storage,
        }
    }

    pub fn is_table_not_available(&self) -> bool {
        self.kind() == ErrorKind::TableNotAvailable
    }
}
