//! Table schema model.
//!
//! A schema declares the columns a table is expected to carry, how each one
//! is indexed, and which columns form the primary key. It constrains indexing
//! and query behavior only: records may still carry undeclared columns.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// Declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Binary,
}

impl Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::String => "STRING",
            ColumnType::Integer => "INTEGER",
            ColumnType::Long => "LONG",
            ColumnType::Float => "FLOAT",
            ColumnType::Double => "DOUBLE",
            ColumnType::Boolean => "BOOLEAN",
            ColumnType::Binary => "BINARY",
        };
        f.write_str(name)
    }
}

/// Type and indexing metadata for a single column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub column_type: ColumnType,
    /// Whether the backend should index this column for lookups.
    pub indexed: bool,
    /// Whether the column participates in relevance scoring.
    pub scoring_param: bool,
}

impl ColumnDefinition {
    /// Creates a non-indexed column of the given type.
    pub fn new(column_type: ColumnType) -> Self {
        Self {
            column_type,
            indexed: false,
            scoring_param: false,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn scoring_param(mut self) -> Self {
        self.scoring_param = true;
        self
    }
}

/// The declared column set of a table.
///
/// Column order is irrelevant; the map is kept sorted only so that
/// serialized schemas are deterministic. Primary-key order is significant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    columns: BTreeMap<String, ColumnDefinition>,
    primary_keys: Vec<String>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a column definition.
    pub fn with_column(mut self, name: impl Into<String>, definition: ColumnDefinition) -> Self {
        self.columns.insert(name.into(), definition);
        self
    }

    /// Sets the primary-key columns, in order.
    pub fn with_primary_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn columns(&self) -> &BTreeMap<String, ColumnDefinition> {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.get(name)
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.primary_keys.is_empty()
    }

    /// Returns the primary-key columns that are not declared as columns.
    pub fn undeclared_primary_keys(&self) -> Vec<&str> {
        self.primary_keys
            .iter()
            .filter(|key| !self.columns.contains_key(key.as_str()))
            .map(String::as_str)
            .collect()
    }
}
