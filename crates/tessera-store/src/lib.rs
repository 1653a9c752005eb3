//! # tessera-store: Record store contract for `Tessera`
//!
//! This crate defines the storage-agnostic contract for schemaless,
//! multi-tenant, timestamped analytics records, and ships one reference
//! backend that implements it entirely in memory.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     dyn RecordStore                      │
//! │  registry ─ create/set_schema/exists/delete/list tables  │
//! │  engine   ─ put / record_count / delete_range / ids      │
//! │  planner  ─ get_range / get_ids  → Vec<RecordGroup>      │
//! │  resolver ─ read_records(&RecordGroup) → RecordIter      │
//! └──────────────────────────────────────────────────────────┘
//!              ▲                              ▲
//!     MemoryRecordStore              (columnar / relational
//!                                     backends, out of tree)
//! ```
//!
//! Reads are two-phase. Planning returns [`RecordGroup`]s that partition the
//! matching records disjointly and completely; each group can then be
//! resolved independently, on any thread, in any order.
//!
//! # Example
//!
//! ```
//! use tessera_store::{MemoryRecordStore, Pagination, Properties, RecordStore};
//! use tessera_types::{Record, TableName, TenantId, TimeRange};
//!
//! let store = MemoryRecordStore::open(&Properties::new()).unwrap();
//! let tenant = TenantId::new(5);
//! let events = TableName::new("events");
//!
//! store.create_table(tenant, &events).unwrap();
//! store
//!     .put(&mut [Record::new(tenant, "events", 1_000).with_value("user", "ann")])
//!     .unwrap();
//!
//! let groups = store
//!     .get_range(tenant, &events, 2, None, TimeRange::ALL, Pagination::ALL)
//!     .unwrap();
//! let total: usize = groups
//!     .iter()
//!     .map(|g| store.read_records(g).unwrap().count())
//!     .sum();
//! assert_eq!(total, 1);
//! ```
//!
//! [`RecordGroup`]: tessera_types::RecordGroup

mod error;
mod memory;
pub mod pagination;
pub mod planner;
mod store;

#[cfg(any(test, feature = "conformance"))]
pub mod conformance;

#[cfg(test)]
mod tests;

pub use error::{ErrorKind, Result, StoreError};
pub use memory::{DEFAULT_SHARDS, MEMORY_BACKEND_ID, MemoryConfig, MemoryRecordStore};
pub use pagination::Pagination;
pub use store::{Properties, RecordIter, RecordStore};
