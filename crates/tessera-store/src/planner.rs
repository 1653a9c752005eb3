//! Partitioned read planning helpers.
//!
//! A read is planned into [`RecordGroup`](tessera_types::RecordGroup)s by
//! assigning the backend's physical shards to groups. The helpers here are
//! backend-agnostic: given a shard count and a caller's partition hint they
//! produce an assignment that is disjoint and complete, so the union of the
//! groups is exactly the matching record set whatever the hint.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use tessera_types::RecordId;

/// Clamps a partition hint to at least one group.
pub fn normalize_hint(partitions_hint: usize) -> usize {
    partitions_hint.max(1)
}

/// Maps a record id to one of `shard_count` shards.
///
/// # Panics
///
/// Panics if `shard_count` is zero.
pub fn shard_for(id: &RecordId, shard_count: usize) -> usize {
    assert!(shard_count > 0, "shard_count must be positive");
    let mut hasher = DefaultHasher::new();
    id.as_str().hash(&mut hasher);
    (hasher.finish() % shard_count as u64) as usize
}

/// Splits shards `0..shard_count` into at most `partitions_hint` contiguous,
/// non-empty runs.
///
/// Every shard appears in exactly one run. Fewer runs than requested are
/// returned when there are fewer shards than the hint.
///
/// # Examples
///
/// ```
/// # use tessera_store::planner::assign_shards;
/// assert_eq!(assign_shards(5, 2), vec![vec![0, 1, 2], vec![3, 4]]);
/// assert_eq!(assign_shards(2, 8), vec![vec![0], vec![1]]);
/// ```
pub fn assign_shards(shard_count: usize, partitions_hint: usize) -> Vec<Vec<usize>> {
    let groups = normalize_hint(partitions_hint).min(shard_count);
    if groups == 0 {
        return Vec::new();
    }

    let base = shard_count / groups;
    let extra = shard_count % groups;
    let mut assignment = Vec::with_capacity(groups);
    let mut next = 0;
    for group in 0..groups {
        let len = base + usize::from(group < extra);
        assignment.push((next..next + len).collect());
        next += len;
    }

    debug_assert_eq!(next, shard_count, "assignment must cover every shard");
    assignment
}

/// Buckets ids by shard, dropping duplicates.
///
/// Returns one entry per shard (possibly empty), indexed by shard number,
/// with ids kept in first-seen order.
pub fn route_ids(ids: &[RecordId], shard_count: usize) -> Vec<Vec<RecordId>> {
    let mut routed: Vec<Vec<RecordId>> = vec![Vec::new(); shard_count];
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if seen.insert(id) {
            routed[shard_for(id, shard_count)].push(id.clone());
        }
    }
    routed
}
