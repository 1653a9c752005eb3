//! Record type.
//!
//! A record is a single timestamped datum belonging to exactly one
//! `(tenant, table)`. Its fields are an open map from column name to
//! [`Value`]; the table schema does not restrict which columns appear.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{RecordId, TableName, TenantId, Value};

/// A single analytics record.
///
/// Inbound records may omit the id, in which case the store generates one
/// on `put`. Records returned by reads always carry an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    tenant: TenantId,
    table: TableName,
    id: Option<RecordId>,
    timestamp: i64,
    values: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a record without an id; the store assigns one on write.
    pub fn new(tenant: TenantId, table: impl Into<TableName>, timestamp: i64) -> Self {
        Self {
            tenant,
            table: table.into(),
            id: None,
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Creates a record with an explicit id.
    pub fn with_id(
        tenant: TenantId,
        table: impl Into<TableName>,
        id: impl Into<RecordId>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::new(tenant, table, timestamp)
        }
    }

    /// Adds a field, replacing any previous value for the column.
    pub fn with_value(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn with_values(mut self, values: BTreeMap<String, Value>) -> Self {
        self.values = values;
        self
    }

    pub fn tenant(&self) -> TenantId {
        self.tenant
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.values
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn set_id(&mut self, id: RecordId) {
        self.id = Some(id);
    }

    pub fn set_tenant(&mut self, tenant: TenantId) {
        self.tenant = tenant;
    }

    /// Returns the id, generating and storing a fresh one if absent.
    pub fn ensure_id(&mut self) -> &RecordId {
        self.id.get_or_insert_with(RecordId::generate)
    }

    /// Returns a copy restricted to the given columns.
    ///
    /// `None` keeps every column. Requested columns the record does not carry
    /// are simply absent from the result.
    pub fn project(&self, columns: Option<&[String]>) -> Record {
        match columns {
            None => self.clone(),
            Some(columns) => Record {
                tenant: self.tenant,
                table: self.table.clone(),
                id: self.id.clone(),
                timestamp: self.timestamp,
                values: columns
                    .iter()
                    .filter_map(|c| self.values.get(c).map(|v| (c.clone(), v.clone())))
                    .collect(),
            },
        }
    }

    /// Canonical scan order: timestamp, then id.
    ///
    /// Pagination windows are defined over this order.
    pub fn scan_order(&self, other: &Record) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| self.id.cmp(&other.id))
    }
}
