//! The record store contract.
//!
//! [`RecordStore`] abstracts the physical backend (columnar, relational,
//! in-memory) behind one set of operations whose semantics every backend
//! must honor identically. Backends differ in native capabilities; the one
//! difference callers may observe is [`RecordStore::is_pagination_supported`].
//!
//! All methods take `&self` so a single backend instance can be shared
//! behind an `Arc` across threads. Backends use interior locking.

use std::collections::BTreeMap;
use std::fmt::Debug;

use tessera_types::{Record, RecordGroup, RecordId, Schema, TableName, TenantId, TimeRange};

use crate::error::Result;
use crate::pagination::Pagination;

/// Backend configuration handed to [`RecordStore::init`].
pub type Properties = BTreeMap<String, String>;

/// Lazy, forward-only sequence of records produced by resolving a group.
///
/// Dropping the iterator before it is exhausted releases whatever cursor or
/// connection the backend acquired for it.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<Record>> + Send + 'a>;

/// Storage contract for schemaless, multi-tenant, timestamped records.
///
/// # Lifecycle
///
/// [`init`](Self::init) is called exactly once before any other method and
/// [`destroy`](Self::destroy) exactly once at the end. Calls outside that
/// window fail with `NotInitialized` or `Destroyed`.
///
/// # Errors
///
/// Data-access operations on a table that does not exist fail with
/// `TableNotAvailable`. `create_table`, `table_exists`, `delete_table` and
/// `list_tables` never do. Every other failure is a storage error and is
/// always returned, never swallowed.
pub trait RecordStore: Send + Sync + Debug {
    /// Stable id of the backend, stamped on every [`RecordGroup`] it plans.
    fn backend_id(&self) -> &str;

    /// Initializes the backend with its configuration.
    fn init(&self, properties: &Properties) -> Result<()>;

    /// Creates a schemaless table if it does not exist. Idempotent.
    fn create_table(&self, tenant: TenantId, table: &TableName) -> Result<()>;

    /// Replaces the table's schema wholesale.
    fn set_table_schema(&self, tenant: TenantId, table: &TableName, schema: Schema) -> Result<()>;

    /// Returns the table's schema, or the empty schema if none was set.
    fn table_schema(&self, tenant: TenantId, table: &TableName) -> Result<Schema>;

    fn table_exists(&self, tenant: TenantId, table: &TableName) -> Result<bool>;

    /// Drops the table with its schema and records. Absent tables are a no-op.
    fn delete_table(&self, tenant: TenantId, table: &TableName) -> Result<()>;

    /// Lists the tenant's tables in normalized form, without duplicates.
    fn list_tables(&self, tenant: TenantId) -> Result<Vec<TableName>>;

    /// Whether offset/limit reads and record counts are exact.
    ///
    /// This is a static property of the backend instance. When it is false
    /// the backend may ignore a requested [`Pagination`] window and
    /// [`record_count`](Self::record_count) may be unsupported; callers must
    /// emulate both by scanning.
    fn is_pagination_supported(&self) -> bool;

    /// Counts records with a timestamp inside `range`.
    fn record_count(&self, tenant: TenantId, table: &TableName, range: TimeRange) -> Result<u64>;

    /// Writes records, possibly across many tenants and tables.
    ///
    /// Records without an id receive a generated one, written back into the
    /// slice. A record whose id already exists replaces the stored record
    /// entirely; fields are never merged. Each record is applied atomically.
    ///
    /// Every target table is validated before the first write: a missing
    /// table fails the call with nothing written. A backend failure after
    /// validation leaves the records already applied in place.
    fn put(&self, records: &mut [Record]) -> Result<()>;

    /// Plans a time-range read.
    ///
    /// Returns groups that together cover the matching records exactly once.
    /// `partitions_hint` is advisory. `columns = None` projects every column.
    fn get_range(
        &self,
        tenant: TenantId,
        table: &TableName,
        partitions_hint: usize,
        columns: Option<&[String]>,
        range: TimeRange,
        pagination: Pagination,
    ) -> Result<Vec<RecordGroup>>;

    /// Plans a read of explicit ids. Unknown ids are silently absent.
    fn get_ids(
        &self,
        tenant: TenantId,
        table: &TableName,
        partitions_hint: usize,
        columns: Option<&[String]>,
        ids: &[RecordId],
    ) -> Result<Vec<RecordGroup>>;

    /// Resolves a group planned by this backend into its records.
    ///
    /// Groups are independent: they may be resolved in any order, on any
    /// thread, concurrently.
    fn read_records(&self, group: &RecordGroup) -> Result<RecordIter<'_>>;

    /// Deletes the records whose timestamp falls inside `range`.
    fn delete_range(&self, tenant: TenantId, table: &TableName, range: TimeRange) -> Result<()>;

    /// Deletes the records with the given ids. Unknown ids are ignored.
    fn delete_ids(&self, tenant: TenantId, table: &TableName, ids: &[RecordId]) -> Result<()>;

    /// Releases every resource held by the backend.
    fn destroy(&self) -> Result<()>;
}
