//! Tenant-scoped handle for record store operations.
//!
//! A `TenantHandle` binds every call to one tenant id, so callers cannot
//! address another tenant's tables by accident. It also papers over the one
//! capability difference between backends: when a backend cannot paginate or
//! count, the handle falls back to scanning.

use tessera_store::{Pagination, StoreError, pagination};
use tessera_types::{Record, RecordId, Schema, TableName, TenantId, TimeRange};

use crate::error::Result;
use crate::tessera::{Tessera, resolve_groups};

/// Handle for operations scoped to a single tenant.
#[derive(Debug, Clone)]
pub struct TenantHandle {
    db: Tessera,
    tenant_id: TenantId,
}

impl TenantHandle {
    pub(crate) fn new(db: Tessera, tenant_id: TenantId) -> Self {
        Self { db, tenant_id }
    }

    /// Returns the tenant ID for this handle.
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    // ========================================================================
    // Tables
    // ========================================================================

    /// Creates a schemaless table. Creating an existing table is a no-op.
    pub fn create_table(&self, table: impl Into<TableName>) -> Result<()> {
        let table = table.into();
        self.db.store().create_table(self.tenant_id, &table)?;
        Ok(())
    }

    /// Creates the table unless it already exists.
    ///
    /// Meant for writers that create tables lazily on first use. Returns
    /// whether the table was created by this call.
    pub fn ensure_table(&self, table: impl Into<TableName>) -> Result<bool> {
        let table = table.into();
        let store = self.db.store();
        if store.table_exists(self.tenant_id, &table)? {
            return Ok(false);
        }
        store.create_table(self.tenant_id, &table)?;
        tracing::debug!(tenant = %self.tenant_id, %table, "table created on demand");
        Ok(true)
    }

    pub fn set_schema(&self, table: impl Into<TableName>, schema: Schema) -> Result<()> {
        let table = table.into();
        self.db
            .store()
            .set_table_schema(self.tenant_id, &table, schema)?;
        Ok(())
    }

    pub fn schema(&self, table: impl Into<TableName>) -> Result<Schema> {
        let table = table.into();
        Ok(self.db.store().table_schema(self.tenant_id, &table)?)
    }

    pub fn table_exists(&self, table: impl Into<TableName>) -> Result<bool> {
        let table = table.into();
        Ok(self.db.store().table_exists(self.tenant_id, &table)?)
    }

    /// Drops the table with its schema and records.
    pub fn drop_table(&self, table: impl Into<TableName>) -> Result<()> {
        let table = table.into();
        self.db.store().delete_table(self.tenant_id, &table)?;
        Ok(())
    }

    pub fn list_tables(&self) -> Result<Vec<TableName>> {
        Ok(self.db.store().list_tables(self.tenant_id)?)
    }

    // ========================================================================
    // Records
    // ========================================================================

    /// Writes records into this tenant's tables.
    ///
    /// Every record must belong to this tenant. Generated ids are written
    /// back into `records`.
    pub fn put(&self, records: &mut [Record]) -> Result<()> {
        if let Some(foreign) = records.iter().find(|r| r.tenant() != self.tenant_id) {
            return Err(StoreError::InvalidArgument(format!(
                "record for tenant {} written through handle for tenant {}",
                foreign.tenant(),
                self.tenant_id
            ))
            .into());
        }
        self.db.store().put(records)?;
        Ok(())
    }

    /// Counts records in `range`.
    ///
    /// Uses the backend's count when it has one and scans otherwise.
    pub fn count(&self, table: impl Into<TableName>, range: TimeRange) -> Result<u64> {
        let table = table.into();
        let store = self.db.store();

        if store.is_pagination_supported() {
            match store.record_count(self.tenant_id, &table, range) {
                Err(StoreError::Unsupported(_)) => {}
                other => return Ok(other?),
            }
        }

        tracing::warn!(
            tenant = %self.tenant_id,
            %table,
            backend = store.backend_id(),
            "backend cannot count records, falling back to a scan"
        );
        let no_columns: &[String] = &[];
        let records = self.read(table, range, Some(no_columns))?;
        Ok(records.len() as u64)
    }

    /// Reads every record in `range`, projected to `columns`.
    pub fn read(
        &self,
        table: impl Into<TableName>,
        range: TimeRange,
        columns: Option<&[String]>,
    ) -> Result<Vec<Record>> {
        let table = table.into();
        let store = self.db.store();
        let options = self.db.options();
        let groups = store.get_range(
            self.tenant_id,
            &table,
            options.default_partitions,
            columns,
            range,
            Pagination::ALL,
        )?;
        resolve_groups(store.as_ref(), &groups, options.parallel)
    }

    /// Reads the records with the given ids. Unknown ids are skipped.
    pub fn read_by_ids(
        &self,
        table: impl Into<TableName>,
        ids: &[RecordId],
        columns: Option<&[String]>,
    ) -> Result<Vec<Record>> {
        let table = table.into();
        let store = self.db.store();
        let options = self.db.options();
        let groups = store.get_ids(
            self.tenant_id,
            &table,
            options.default_partitions,
            columns,
            ids,
        )?;
        resolve_groups(store.as_ref(), &groups, options.parallel)
    }

    /// Reads one page of `range` in canonical (timestamp, id) order.
    ///
    /// Backends without pagination support return the full range, which is
    /// then windowed here.
    pub fn read_page(
        &self,
        table: impl Into<TableName>,
        range: TimeRange,
        columns: Option<&[String]>,
        page: Pagination,
    ) -> Result<Vec<Record>> {
        let table = table.into();
        let store = self.db.store();
        let options = self.db.options();

        if store.is_pagination_supported() {
            let groups = store.get_range(
                self.tenant_id,
                &table,
                options.default_partitions,
                columns,
                range,
                page,
            )?;
            let mut records = resolve_groups(store.as_ref(), &groups, options.parallel)?;
            records.sort_by(Record::scan_order);
            return Ok(records);
        }

        tracing::debug!(
            tenant = %self.tenant_id,
            %table,
            offset = page.offset,
            limit = ?page.limit,
            "emulating pagination client side"
        );
        let all = self.read(table, range, columns)?;
        Ok(pagination::emulate(all, page))
    }

    pub fn delete_range(&self, table: impl Into<TableName>, range: TimeRange) -> Result<()> {
        let table = table.into();
        self.db.store().delete_range(self.tenant_id, &table, range)?;
        Ok(())
    }

    pub fn delete_ids(&self, table: impl Into<TableName>, ids: &[RecordId]) -> Result<()> {
        let table = table.into();
        self.db.store().delete_ids(self.tenant_id, &table, ids)?;
        Ok(())
    }
}
