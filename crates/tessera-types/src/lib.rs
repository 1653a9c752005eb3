//! # tessera-types: Core types for `Tessera`
//!
//! This crate contains the value objects shared by every part of the
//! analytics record store:
//! - Identifiers ([`TenantId`], [`TableName`], [`RecordId`])
//! - Temporal filtering ([`TimeRange`])
//! - Dynamically typed record fields ([`Value`])
//! - Table schemas ([`Schema`], [`ColumnDefinition`], [`ColumnType`])
//! - Records ([`Record`])
//! - Partition handles ([`RecordGroup`])
//!
//! None of these types carry behavior beyond construction, comparison and
//! (de)serialization. Storage semantics live in `tessera-store`.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

mod group;
mod record;
mod schema;
mod value;


pub use group::RecordGroup;
pub use record::Record;
pub use schema::{ColumnDefinition, ColumnType, Schema};
pub use value::Value;

// ============================================================================
// Entity IDs
// ============================================================================

/// Identifier of a tenant, the isolation domain every table belongs to.
///
/// Tenant ids are signed: the platform reserves negative ids for system
/// tenants (the super tenant is `-1234`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(i32);

impl TenantId {
    /// The platform super tenant.
    pub const SUPER_TENANT: TenantId = TenantId(-1234);

    pub fn new(id: i32) -> Self {
        Self(id)
    }

    pub fn as_i32(self) -> i32 {
        self.0
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for TenantId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl From<TenantId> for i32 {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Name of a table within a tenant.
///
/// Table names are case-insensitive. The name is trimmed and lower-cased on
/// construction so that equality, hashing and listing all operate on the
/// normalized form.
///
/// # Examples
///
/// ```
/// # use tessera_types::TableName;
/// assert_eq!(TableName::new(" Events "), TableName::new("events"));
/// assert_eq!(TableName::new("Events").as_str(), "events");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TableName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TableName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<TableName> for String {
    fn from(name: TableName) -> Self {
        name.0
    }
}

impl AsRef<str> for TableName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of a record, unique within its `(tenant, table)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a globally unique id (a random UUID).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Time Range
// ============================================================================

/// A half-open time window `[from, to)` in milliseconds relative to epoch.
///
/// `i64::MIN` as `from` and `i64::MAX` as `to` are sentinels meaning "no
/// lower bound" and "no upper bound". They are never compared as literal
/// timestamps: a record stamped `i64::MAX` is inside a range whose `to` is
/// the upper sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    from: i64,
    to: i64,
}

impl TimeRange {
    /// Sentinel lower bound.
    pub const UNBOUNDED_FROM: i64 = i64::MIN;
    /// Sentinel upper bound.
    pub const UNBOUNDED_TO: i64 = i64::MAX;

    /// The range that matches every timestamp.
    pub const ALL: TimeRange = TimeRange {
        from: Self::UNBOUNDED_FROM,
        to: Self::UNBOUNDED_TO,
    };

    pub fn new(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    /// Range with only a lower bound.
    pub fn since(from: i64) -> Self {
        Self::new(from, Self::UNBOUNDED_TO)
    }

    /// Range with only an upper bound.
    pub fn until(to: i64) -> Self {
        Self::new(Self::UNBOUNDED_FROM, to)
    }

    pub fn from(&self) -> i64 {
        self.from
    }

    pub fn to(&self) -> i64 {
        self.to
    }

    pub fn is_unbounded(&self) -> bool {
        self.from == Self::UNBOUNDED_FROM && self.to == Self::UNBOUNDED_TO
    }

    /// Returns true if `timestamp` falls inside the window.
    pub fn contains(&self, timestamp: i64) -> bool {
        let above_from = self.from == Self::UNBOUNDED_FROM || timestamp >= self.from;
        let below_to = self.to == Self::UNBOUNDED_TO || timestamp < self.to;
        above_from && below_to
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::ALL
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        if self.from == Self::UNBOUNDED_FROM {
            f.write_str("-inf")?;
        } else {
            write!(f, "{}", self.from)?;
        }
        f.write_str(", ")?;
        if self.to == Self::UNBOUNDED_TO {
            f.write_str("+inf")?;
        } else {
            write!(f, "{}", self.to)?;
        }
        f.write_str(")")
    }
}
