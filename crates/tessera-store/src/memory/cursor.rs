//! Group descriptors and cursors of the in-memory backend.
//!
//! A planned group is a [`GroupSpec`] encoded with postcard into the
//! [`RecordGroup`] payload. Resolving it takes shard snapshots at that moment
//! and walks them lazily. Each cursor holds a [`CursorGuard`] that is released
//! as soon as the cursor is exhausted or dropped, whichever comes first.
//! A cursor still open when its store is destroyed yields one
//! `StoreError::Destroyed` and then ends.

use std::ops::Bound;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tessera_types::{Record, RecordId, TableName, TenantId, TimeRange};

use crate::error::{Result, StoreError};
use crate::memory::table::ShardSnapshot;
use crate::pagination::{Pagination, apply_window};

/// Decoded payload of a group planned by the in-memory backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GroupSpec {
    /// Store instance that planned the group.
    pub instance: u64,
    pub tenant: TenantId,
    pub table: TableName,
    pub incarnation: u64,
    pub columns: Option<Vec<String>>,
    pub selection: Selection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Selection {
    /// Records of the listed shards inside the range.
    Range { shards: Vec<usize>, range: TimeRange },
    /// A pagination window over the whole table in canonical order.
    Window {
        range: TimeRange,
        pagination: Pagination,
    },
    /// Explicit ids, already routed to their shards.
    Ids { routed: Vec<(usize, Vec<RecordId>)> },
}

impl GroupSpec {
    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub(crate) fn decode(payload: &[u8]) -> Result<Self> {
        Ok(postcard::from_bytes(payload)?)
    }
}

/// Counts a live cursor for as long as it exists, and observes whether the
/// store that opened it is still running.
#[derive(Debug)]
pub(crate) struct CursorGuard {
    open: Arc<AtomicUsize>,
    running: Arc<AtomicBool>,
}

impl CursorGuard {
    pub(crate) fn acquire(open: &Arc<AtomicUsize>, running: &Arc<AtomicBool>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self {
            open: Arc::clone(open),
            running: Arc::clone(running),
        }
    }

    fn store_destroyed(&self) -> bool {
        !self.running.load(Ordering::SeqCst)
    }
}

impl Drop for CursorGuard {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// True once the guard's store has been destroyed. A released guard is
/// never reported, so the error is yielded at most once.
fn destroyed(guard: Option<&CursorGuard>) -> bool {
    guard.is_some_and(CursorGuard::store_destroyed)
}

/// Lazy walk over a set of shard snapshots.
///
/// Position is kept as the last emitted key so the cursor never borrows from
/// the snapshots it owns.
pub(crate) struct RangeCursor {
    snapshots: Vec<ShardSnapshot>,
    range: TimeRange,
    columns: Option<Vec<String>>,
    shard: usize,
    last: Option<RecordId>,
    guard: Option<CursorGuard>,
}

impl RangeCursor {
    pub(crate) fn new(
        snapshots: Vec<ShardSnapshot>,
        range: TimeRange,
        columns: Option<Vec<String>>,
        guard: CursorGuard,
    ) -> Self {
        Self {
            snapshots,
            range,
            columns,
            shard: 0,
            last: None,
            guard: Some(guard),
        }
    }

    fn release(&mut self) {
        self.snapshots.clear();
        self.guard = None;
    }
}

impl Iterator for RangeCursor {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if destroyed(self.guard.as_ref()) {
            self.release();
            return Some(Err(StoreError::Destroyed));
        }
        while self.shard < self.snapshots.len() {
            let snapshot = &self.snapshots[self.shard];
            let lower = match &self.last {
                Some(id) => Bound::Excluded(id),
                None => Bound::Unbounded,
            };
            let found = snapshot
                .range::<RecordId, _>((lower, Bound::Unbounded))
                .find(|(_, r)| self.range.contains(r.timestamp()));

            match found {
                Some((id, record)) => {
                    self.last = Some(id.clone());
                    return Some(Ok(record.project(self.columns.as_deref())));
                }
                None => {
                    self.shard += 1;
                    self.last = None;
                }
            }
        }
        self.release();
        None
    }
}

/// Lazy lookup of explicit ids in their shard snapshots.
pub(crate) struct IdCursor {
    lookups: Vec<(ShardSnapshot, RecordId)>,
    columns: Option<Vec<String>>,
    position: usize,
    guard: Option<CursorGuard>,
}

impl IdCursor {
    pub(crate) fn new(
        lookups: Vec<(ShardSnapshot, RecordId)>,
        columns: Option<Vec<String>>,
        guard: CursorGuard,
    ) -> Self {
        Self {
            lookups,
            columns,
            position: 0,
            guard: Some(guard),
        }
    }

    fn release(&mut self) {
        self.lookups.clear();
        self.guard = None;
    }
}

impl Iterator for IdCursor {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if destroyed(self.guard.as_ref()) {
            self.release();
            return Some(Err(StoreError::Destroyed));
        }
        while self.position < self.lookups.len() {
            let (snapshot, id) = &self.lookups[self.position];
            self.position += 1;
            if let Some(record) = snapshot.get(id) {
                return Some(Ok(record.project(self.columns.as_deref())));
            }
        }
        self.release();
        None
    }
}

/// Materializes a pagination window over every shard.
///
/// The window is defined over the canonical order of the whole matching set,
/// so it cannot be computed shard by shard.
pub(crate) fn window(
    snapshots: &[ShardSnapshot],
    range: TimeRange,
    pagination: Pagination,
    columns: Option<&[String]>,
) -> Vec<Record> {
    let mut matching: Vec<&Record> = snapshots
        .iter()
        .flat_map(|s| s.values())
        .filter(|r| range.contains(r.timestamp()))
        .collect();
    matching.sort_by(|a, b| a.scan_order(b));
    apply_window(matching.into_iter(), pagination)
        .map(|r| r.project(columns))
        .collect()
}

/// Iterator over an already materialized window, holding its guard.
pub(crate) struct WindowCursor {
    records: std::vec::IntoIter<Record>,
    guard: Option<CursorGuard>,
}

impl WindowCursor {
    pub(crate) fn new(records: Vec<Record>, guard: CursorGuard) -> Self {
        Self {
            records: records.into_iter(),
            guard: Some(guard),
        }
    }
}

impl Iterator for WindowCursor {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if destroyed(self.guard.as_ref()) {
            self.records = Vec::new().into_iter();
            self.guard = None;
            return Some(Err(StoreError::Destroyed));
        }
        let next = self.records.next();
        if next.is_none() {
            self.guard = None;
        }
        next.map(Ok)
    }
}
