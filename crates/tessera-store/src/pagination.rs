//! Pagination windows and the client-side fallback.
//!
//! A [`Pagination`] window selects `limit` records starting at the zero-based
//! `offset` of a read's canonical order (timestamp, then id). Backends that
//! report pagination support apply the window themselves. For the others the
//! caller reads the unpaginated result and applies the window with
//! [`emulate`].

use serde::{Deserialize, Serialize};
use tessera_types::Record;

use crate::error::{Result, StoreError};

/// Offset/limit window over a read's canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pagination {
    /// Zero-based index of the first record, inclusive.
    pub offset: u64,
    /// Maximum number of records, `None` for unbounded.
    pub limit: Option<u64>,
}

impl Pagination {
    /// No window: every matching record.
    pub const ALL: Pagination = Pagination {
        offset: 0,
        limit: None,
    };

    pub fn new(offset: u64, limit: Option<u64>) -> Self {
        Self { offset, limit }
    }

    /// Builds a window from wire-style arguments.
    ///
    /// `records_count = -1` means unbounded. Any other negative value is
    /// rejected.
    pub fn from_raw(records_from: i32, records_count: i32) -> Result<Self> {
        let offset = u64::try_from(records_from).map_err(|_| {
            StoreError::InvalidArgument(format!(
                "records_from must be non-negative, got {records_from}"
            ))
        })?;
        let limit = match records_count {
            -1 => None,
            n => Some(u64::try_from(n).map_err(|_| {
                StoreError::InvalidArgument(format!(
                    "records_count must be -1 or non-negative, got {n}"
                ))
            })?),
        };
        Ok(Self { offset, limit })
    }

    /// True if the window actually restricts the result.
    pub fn is_windowed(&self) -> bool {
        self.offset > 0 || self.limit.is_some()
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::ALL
    }
}

/// Applies a window to an iterator already in canonical order.
pub fn apply_window<I>(records: I, pagination: Pagination) -> impl Iterator<Item = I::Item>
where
    I: Iterator,
{
    let skip = usize::try_from(pagination.offset).unwrap_or(usize::MAX);
    let take = pagination
        .limit
        .map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
    records.skip(skip).take(take)
}

/// Client-side pagination: sorts into canonical order, then applies the
/// window, discarding everything outside it.
pub fn emulate(mut records: Vec<Record>, pagination: Pagination) -> Vec<Record> {
    records.sort_by(Record::scan_order);
    if !pagination.is_windowed() {
        return records;
    }
    apply_window(records.into_iter(), pagination).collect()
}
