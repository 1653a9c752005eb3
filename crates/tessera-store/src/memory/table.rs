//! Per-table state of the in-memory backend.
//!
//! Records are hash-partitioned by id across a fixed number of shards. Each
//! shard is an immutable `BTreeMap` behind an `Arc`; writers replace it
//! copy-on-write under the shard's write lock and readers clone the `Arc`.
//! A reader therefore sees a whole map from before or after a write, never
//! a record with a mix of old and new fields.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tessera_types::{Record, RecordId, Schema, TimeRange};

use crate::error::{Result, StoreError};
use crate::planner::shard_for;

/// Immutable view of one shard.
pub(crate) type ShardSnapshot = Arc<BTreeMap<RecordId, Record>>;

/// One table's schema and shards.
///
/// Shards are copy-on-write. Readers take an `Arc` snapshot and writers
/// swap in a modified map with `Arc::make_mut`, which clones the whole
/// shard map when any cursor still holds the previous snapshot. A
/// long-lived reader therefore makes every write to its shards
/// O(shard size) until the reader is dropped.
#[derive(Debug)]
pub(crate) struct TableData {
    /// Distinguishes this table from a later one created under the same name.
    incarnation: u64,
    schema: RwLock<Schema>,
    shards: Vec<RwLock<ShardSnapshot>>,
}

impl TableData {
    pub(crate) fn new(incarnation: u64, shard_count: usize) -> Self {
        debug_assert!(shard_count > 0, "table must have at least one shard");
        Self {
            incarnation,
            schema: RwLock::new(Schema::default()),
            shards: (0..shard_count)
                .map(|_| RwLock::new(Arc::new(BTreeMap::new())))
                .collect(),
        }
    }

    pub(crate) fn incarnation(&self) -> u64 {
        self.incarnation
    }

    pub(crate) fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub(crate) fn schema(&self) -> Result<Schema> {
        Ok(self
            .schema
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .clone())
    }

    pub(crate) fn set_schema(&self, schema: Schema) -> Result<()> {
        *self.schema.write().map_err(|_| StoreError::LockPoisoned)? = schema;
        Ok(())
    }

    pub(crate) fn snapshot(&self, shard: usize) -> Result<ShardSnapshot> {
        let slot = self.shards.get(shard).ok_or_else(|| {
            StoreError::Backend(format!(
                "shard {shard} out of range (table has {})",
                self.shards.len()
            ))
        })?;
        Ok(Arc::clone(
            &*slot.read().map_err(|_| StoreError::LockPoisoned)?,
        ))
    }

    pub(crate) fn snapshots(&self) -> Result<Vec<ShardSnapshot>> {
        (0..self.shards.len()).map(|s| self.snapshot(s)).collect()
    }

    /// Inserts or fully replaces a record. The record must carry an id.
    pub(crate) fn upsert(&self, record: Record) -> Result<()> {
        let id = record
            .id()
            .cloned()
            .ok_or_else(|| StoreError::Backend("record reached storage without an id".into()))?;
        let shard = shard_for(&id, self.shards.len());
        let mut slot = self.shards[shard]
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        Arc::make_mut(&mut *slot).insert(id, record);
        Ok(())
    }

    pub(crate) fn remove_ids(&self, ids: &[RecordId]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            let shard = shard_for(id, self.shards.len());
            let mut slot = self.shards[shard]
                .write()
                .map_err(|_| StoreError::LockPoisoned)?;
            if slot.contains_key(id) {
                Arc::make_mut(&mut *slot).remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub(crate) fn remove_range(&self, range: TimeRange) -> Result<usize> {
        let mut removed = 0;
        for shard in &self.shards {
            let mut slot = shard.write().map_err(|_| StoreError::LockPoisoned)?;
            let matching = slot
                .values()
                .filter(|r| range.contains(r.timestamp()))
                .count();
            if matching > 0 {
                Arc::make_mut(&mut *slot).retain(|_, r| !range.contains(r.timestamp()));
                removed += matching;
            }
        }
        Ok(removed)
    }

    pub(crate) fn count(&self, range: TimeRange) -> Result<u64> {
        let mut total = 0u64;
        for snapshot in self.snapshots()? {
            total += snapshot
                .values()
                .filter(|r| range.contains(r.timestamp()))
                .count() as u64;
        }
        Ok(total)
    }
}
