//! # Tessera
//!
//! Storage-agnostic, multi-tenant store for schemaless, timestamped
//! analytics records.
//!
//! Tessera separates *what* callers do with records (create tables, write,
//! read time ranges, delete) from *where* records live. Every backend
//! implements the [`RecordStore`] contract; this crate wires one backend in
//! and exposes it per tenant.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                          Tessera                           │
//! │  ┌──────────────┐   ┌─────────────┐   ┌─────────────────┐  │
//! │  │ TenantHandle │ → │   planner   │ → │ resolve_groups  │  │
//! │  │ (isolation)  │   │ (get_range) │   │ (rayon workers) │  │
//! │  └──────────────┘   └─────────────┘   └─────────────────┘  │
//! │                  dyn RecordStore (memory, ...)             │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use tessera::{Tessera, TesseraConfig, TenantId, Record, TimeRange};
//!
//! let db = Tessera::open(&TesseraConfig::in_memory([("shards", "8")]))?;
//! let tenant = db.tenant(TenantId::new(5));
//!
//! tenant.create_table("events")?;
//! tenant.put(&mut [
//!     Record::new(TenantId::new(5), "events", 100).with_value("user", "ann"),
//!     Record::new(TenantId::new(5), "events", 200).with_value("user", "bob"),
//! ])?;
//!
//! assert_eq!(tenant.count("events", TimeRange::new(0, 150))?, 1);
//! # Ok::<(), tessera::TesseraError>(())
//! ```

mod error;
mod tenant;
mod tessera;

#[cfg(test)]
mod tests;

pub use error::{Result, TesseraError};
pub use tenant::TenantHandle;
pub use tessera::{ReadOptions, Tessera, resolve_groups};

// Re-export configuration
pub use tessera_config::{ConfigLoader, TesseraConfig};

// Re-export the store contract
pub use tessera_store::{
    ErrorKind, MemoryRecordStore, Pagination, Properties, RecordIter, RecordStore, StoreError,
};

// Re-export core types
pub use tessera_types::{
    ColumnDefinition, ColumnType, Record, RecordGroup, RecordId, Schema, TableName, TenantId,
    TimeRange, Value,
};
