//! Unit tests for tessera-store

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use proptest::prelude::*;
use test_case::test_case;
use tessera_types::{Record, RecordId, TableName, TenantId, TimeRange, Value};

use crate::conformance;
use crate::planner::{assign_shards, normalize_hint, route_ids, shard_for};
use crate::{
    ErrorKind, MemoryConfig, MemoryRecordStore, Pagination, Properties, RecordStore, StoreError,
};

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn open(pairs: &[(&str, &str)]) -> MemoryRecordStore {
    MemoryRecordStore::open(&props(pairs)).unwrap()
}

fn events() -> TableName {
    TableName::new("events")
}

// ============================================================================
// Conformance
// ============================================================================

#[test]
fn memory_store_conforms_with_pagination() {
    conformance::run_all(|| Box::new(open(&[])));
}

#[test]
fn memory_store_conforms_without_pagination() {
    conformance::run_all(|| Box::new(open(&[("pagination", "false")])));
}

#[test]
fn memory_store_conforms_with_single_shard() {
    conformance::run_all(|| Box::new(open(&[("shards", "1")])));
}

#[test]
fn memory_store_conforms_with_many_shards() {
    conformance::run_all(|| Box::new(open(&[("shards", "37")])));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn memory_config_defaults() {
    let config = MemoryConfig::from_properties(&Properties::new()).unwrap();
    assert_eq!(config, MemoryConfig::default());
    assert_eq!(config.shards, 4);
    assert!(config.pagination);
    assert_eq!(config.locations, vec!["localhost".to_string()]);
}

#[test]
fn memory_config_parses_every_key() {
    let config = MemoryConfig::from_properties(&props(&[
        ("shards", " 8 "),
        ("pagination", "false"),
        ("locations", "node-a, node-b,,"),
        ("unrelated", "ignored"),
    ]))
    .unwrap();
    assert_eq!(config.shards, 8);
    assert!(!config.pagination);
    assert_eq!(config.locations, vec!["node-a", "node-b"]);
}

#[test_case("shards", "0"; "zero shards")]
#[test_case("shards", "-3"; "negative shards")]
#[test_case("shards", "many"; "non numeric shards")]
#[test_case("pagination", "yes"; "non boolean pagination")]
fn memory_config_rejects_bad_values(key: &str, value: &str) {
    let err = MemoryConfig::from_properties(&props(&[(key, value)])).unwrap_err();
    assert!(matches!(err, StoreError::InvalidProperty { key: ref k, .. } if k == key));
}

#[test]
fn init_with_bad_property_leaves_store_uninitialized() {
    let store = MemoryRecordStore::new();
    assert!(store.init(&props(&[("shards", "0")])).is_err());
    store.init(&Properties::new()).unwrap();
    assert!(store.table_exists(TenantId::new(1), &events()).is_ok());
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn calls_before_init_fail() {
    let store = MemoryRecordStore::new();
    let tenant = TenantId::new(1);
    assert!(matches!(
        store.create_table(tenant, &events()),
        Err(StoreError::NotInitialized)
    ));
    assert!(matches!(
        store.list_tables(tenant),
        Err(StoreError::NotInitialized)
    ));
    assert!(matches!(store.destroy(), Err(StoreError::NotInitialized)));
}

#[test]
fn second_init_fails() {
    let store = open(&[]);
    assert!(matches!(
        store.init(&Properties::new()),
        Err(StoreError::AlreadyInitialized)
    ));
}

#[test]
fn calls_after_destroy_fail() {
    let store = open(&[]);
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();
    store.destroy().unwrap();

    assert!(matches!(
        store.table_exists(tenant, &events()),
        Err(StoreError::Destroyed)
    ));
    assert!(matches!(store.init(&Properties::new()), Err(StoreError::Destroyed)));
    assert!(matches!(store.destroy(), Err(StoreError::Destroyed)));
}

#[test]
fn lifecycle_errors_are_storage_errors() {
    assert_eq!(StoreError::NotInitialized.kind(), ErrorKind::Storage);
    assert_eq!(StoreError::Destroyed.kind(), ErrorKind::Storage);
    let missing = StoreError::table_not_available(TenantId::new(1), &events());
    assert!(missing.is_table_not_available());
    assert_eq!(
        missing.to_string(),
        "table 'events' is not available for tenant 1"
    );
}

// ============================================================================
// Memory Backend Behavior
// ============================================================================

#[test]
fn count_is_unsupported_without_pagination() {
    let store = open(&[("pagination", "false")]);
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();

    assert!(!store.is_pagination_supported());
    assert!(matches!(
        store.record_count(tenant, &events(), TimeRange::ALL),
        Err(StoreError::Unsupported(_))
    ));
}

#[test]
fn windowed_read_is_single_group() {
    let store = open(&[("shards", "8")]);
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();

    let windowed = store
        .get_range(tenant, &events(), 8, None, TimeRange::ALL, Pagination::new(0, Some(10)))
        .unwrap();
    assert_eq!(windowed.len(), 1);

    let full = store
        .get_range(tenant, &events(), 8, None, TimeRange::ALL, Pagination::ALL)
        .unwrap();
    assert_eq!(full.len(), 8);
}

#[test]
fn groups_carry_configured_locations() {
    let store = open(&[("locations", "a.example, b.example")]);
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();

    let groups = store
        .get_range(tenant, &events(), 2, None, TimeRange::ALL, Pagination::ALL)
        .unwrap();
    for group in groups {
        assert_eq!(group.backend(), "memory");
        assert_eq!(group.locations(), ["a.example", "b.example"]);
    }
}

#[test]
fn groups_from_another_instance_are_rejected() {
    let a = open(&[]);
    let b = open(&[]);
    let tenant = TenantId::new(1);
    a.create_table(tenant, &events()).unwrap();
    b.create_table(tenant, &events()).unwrap();

    let groups = a
        .get_range(tenant, &events(), 1, None, TimeRange::ALL, Pagination::ALL)
        .unwrap();
    assert!(matches!(
        b.read_records(&groups[0]).map(|_| ()),
        Err(StoreError::ForeignRecordGroup { .. })
    ));
}

#[test]
fn corrupt_payload_is_a_codec_error() {
    let store = open(&[]);
    let garbage = tessera_types::RecordGroup::new(
        "memory",
        Vec::new(),
        bytes::Bytes::from_static(&[0xff, 0xff, 0xff]),
    );
    assert!(matches!(
        store.read_records(&garbage).map(|_| ()),
        Err(StoreError::Codec(_))
    ));
}

#[test]
fn resolution_sees_writes_made_after_planning() {
    let store = open(&[]);
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();

    let groups = store
        .get_range(tenant, &events(), 1, None, TimeRange::ALL, Pagination::ALL)
        .unwrap();
    store.put(&mut [Record::new(tenant, "events", 1)]).unwrap();

    assert_eq!(conformance::read_groups(&store, &groups).len(), 1);
}

#[test]
fn cursor_is_released_on_exhaustion_and_drop() {
    let store = open(&[("shards", "1")]);
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();
    let mut records: Vec<Record> = (0..10).map(|t| Record::new(tenant, "events", t)).collect();
    store.put(&mut records).unwrap();

    let groups = store
        .get_range(tenant, &events(), 1, None, TimeRange::ALL, Pagination::ALL)
        .unwrap();

    let mut partial = store.read_records(&groups[0]).unwrap();
    assert!(partial.next().is_some());
    assert_eq!(store.open_cursors(), 1);
    drop(partial);
    assert_eq!(store.open_cursors(), 0);

    let mut full = store.read_records(&groups[0]).unwrap();
    assert_eq!(full.by_ref().count(), 10);
    assert_eq!(store.open_cursors(), 0);
    drop(full);
    assert_eq!(store.open_cursors(), 0);
}

#[test]
fn writes_during_an_open_cursor_do_not_reach_its_snapshot() {
    let store = open(&[("shards", "1")]);
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();
    let mut records: Vec<Record> = (0..4)
        .map(|t| Record::with_id(tenant, "events", format!("r{t}"), t))
        .collect();
    store.put(&mut records).unwrap();

    let groups = store
        .get_range(tenant, &events(), 1, None, TimeRange::ALL, Pagination::ALL)
        .unwrap();
    let mut cursor = store.read_records(&groups[0]).unwrap();
    assert!(matches!(cursor.next(), Some(Ok(_))));

    store
        .put(&mut [Record::with_id(tenant, "events", "late", 100)])
        .unwrap();
    store
        .delete_ids(tenant, &events(), &[RecordId::new("r3")])
        .unwrap();

    let rest: Vec<Record> = cursor.map(Result::unwrap).collect();
    let ids: Vec<&str> = rest
        .iter()
        .filter_map(Record::id)
        .map(RecordId::as_str)
        .collect();
    assert_eq!(ids, vec!["r1", "r2", "r3"]);
    assert_eq!(store.open_cursors(), 0);
    assert_eq!(store.record_count(tenant, &events(), TimeRange::ALL).unwrap(), 4);
}

#[test]
fn open_cursors_end_with_destroyed_after_destroy() {
    let store = open(&[("shards", "1")]);
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();
    let mut records: Vec<Record> = (0..5)
        .map(|t| Record::with_id(tenant, "events", format!("r{t}"), t))
        .collect();
    store.put(&mut records).unwrap();

    let table = events();
    let by_range = store
        .get_range(tenant, &table, 1, None, TimeRange::ALL, Pagination::ALL)
        .unwrap();
    let window = Pagination::new(1, Some(3));
    let windowed = store
        .get_range(tenant, &table, 1, None, TimeRange::ALL, window)
        .unwrap();
    let ids = [RecordId::new("r0"), RecordId::new("r1"), RecordId::new("r2")];
    let by_id = store.get_ids(tenant, &table, 1, None, &ids).unwrap();

    let mut cursors = vec![
        store.read_records(&by_range[0]).unwrap(),
        store.read_records(&windowed[0]).unwrap(),
        store.read_records(&by_id[0]).unwrap(),
    ];
    for cursor in &mut cursors {
        assert!(matches!(cursor.next(), Some(Ok(_))));
    }
    assert_eq!(store.open_cursors(), 3);

    store.destroy().unwrap();

    for cursor in &mut cursors {
        assert!(matches!(cursor.next(), Some(Err(StoreError::Destroyed))));
        assert!(cursor.next().is_none());
    }
    assert_eq!(store.open_cursors(), 0);
}

#[test]
fn put_writes_across_tenants_and_tables() {
    let store = open(&[]);
    let a = TenantId::new(1);
    let b = TenantId::new(2);
    store.create_table(a, &events()).unwrap();
    store.create_table(b, &TableName::new("audit")).unwrap();

    store
        .put(&mut [Record::new(a, "Events", 1), Record::new(b, "AUDIT", 2)])
        .unwrap();

    assert_eq!(store.record_count(a, &events(), TimeRange::ALL).unwrap(), 1);
    assert_eq!(
        store
            .record_count(b, &TableName::new("audit"), TimeRange::ALL)
            .unwrap(),
        1
    );
}

#[test]
fn readers_never_observe_partial_records() {
    let store = Arc::new(open(&[("shards", "2")]));
    let tenant = TenantId::new(1);
    store.create_table(tenant, &events()).unwrap();
    store
        .put(&mut [Record::with_id(tenant, "events", "hot", 0)
            .with_value("left", 0i64)
            .with_value("right", 0i64)])
        .unwrap();

    let done = AtomicBool::new(false);
    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 1..500i64 {
                store
                    .put(&mut [Record::with_id(tenant, "events", "hot", i)
                        .with_value("left", i)
                        .with_value("right", i)])
                    .unwrap();
            }
            done.store(true, Ordering::SeqCst);
        });

        for _ in 0..2 {
            s.spawn(|| {
                while !done.load(Ordering::SeqCst) {
                    let groups = store
                        .get_ids(tenant, &events(), 1, None, &[RecordId::new("hot")])
                        .unwrap();
                    for record in conformance::read_groups(store.as_ref(), &groups) {
                        let left = record.value("left").and_then(Value::as_i64);
                        let right = record.value("right").and_then(Value::as_i64);
                        assert_eq!(left, right);
                        assert_eq!(left, Some(record.timestamp()));
                    }
                }
            });
        }
    });
}

// ============================================================================
// Pagination
// ============================================================================

#[test_case(0, -1, Pagination::ALL; "everything")]
#[test_case(5, 3, Pagination::new(5, Some(3)); "window")]
#[test_case(0, 0, Pagination::new(0, Some(0)); "empty window")]
#[test_case(10, -1, Pagination::new(10, None); "unbounded tail")]
fn pagination_from_raw(from: i32, count: i32, expected: Pagination) {
    assert_eq!(Pagination::from_raw(from, count).unwrap(), expected);
}

#[test_case(-1, 3; "negative offset")]
#[test_case(0, -2; "negative count other than minus one")]
fn pagination_from_raw_rejects(from: i32, count: i32) {
    assert!(matches!(
        Pagination::from_raw(from, count),
        Err(StoreError::InvalidArgument(_))
    ));
}

#[test]
fn emulate_applies_window_in_canonical_order() {
    let tenant = TenantId::new(1);
    let records: Vec<Record> = [40, 10, 30, 20, 10]
        .iter()
        .enumerate()
        .map(|(i, &t)| Record::with_id(tenant, "events", format!("r{i}"), t))
        .collect();

    let page = crate::pagination::emulate(records.clone(), Pagination::new(1, Some(2)));
    let ids: Vec<&str> = page.iter().filter_map(|r| r.id()).map(RecordId::as_str).collect();
    assert_eq!(ids, vec!["r4", "r3"]);

    let all = crate::pagination::emulate(records, Pagination::ALL);
    let stamps: Vec<i64> = all.iter().map(Record::timestamp).collect();
    assert_eq!(stamps, vec![10, 10, 20, 30, 40]);
}

// ============================================================================
// Planner
// ============================================================================

#[test]
fn hint_is_clamped_to_one() {
    assert_eq!(normalize_hint(0), 1);
    assert_eq!(normalize_hint(6), 6);
}

#[test]
fn zero_shards_produce_no_assignment() {
    assert!(assign_shards(0, 4).is_empty());
}

proptest! {
    #[test]
    fn assignment_is_disjoint_and_complete(shards in 1usize..64, hint in 0usize..128) {
        let assignment = assign_shards(shards, hint);

        prop_assert!(!assignment.is_empty());
        prop_assert!(assignment.len() <= normalize_hint(hint));
        prop_assert!(assignment.iter().all(|g| !g.is_empty()));

        let flat: Vec<usize> = assignment.into_iter().flatten().collect();
        prop_assert_eq!(flat, (0..shards).collect::<Vec<_>>());
    }

    #[test]
    fn routing_is_stable_and_deduplicated(
        raw in prop::collection::vec("[a-z0-9]{1,8}", 0..40),
        shards in 1usize..16,
    ) {
        let ids: Vec<RecordId> = raw.iter().map(RecordId::new).collect();
        let routed = route_ids(&ids, shards);

        prop_assert_eq!(routed.len(), shards);
        for (shard, bucket) in routed.iter().enumerate() {
            for id in bucket {
                prop_assert_eq!(shard_for(id, shards), shard);
            }
        }
        let unique: BTreeSet<&RecordId> = ids.iter().collect();
        prop_assert_eq!(routed.iter().map(Vec::len).sum::<usize>(), unique.len());
    }

    #[test]
    fn range_reads_match_direct_filter(
        stamps in prop::collection::vec(-1_000i64..1_000, 0..60),
        from in -1_200i64..1_200,
        len in 0i64..1_500,
        hint in 0usize..12,
        shards in 1usize..9,
    ) {
        let shards = shards.to_string();
        let store = open(&[("shards", shards.as_str())]);
        let tenant = TenantId::new(9);
        store.create_table(tenant, &events()).unwrap();
        let mut records: Vec<Record> = stamps
            .iter()
            .map(|&t| Record::new(tenant, "events", t))
            .collect();
        store.put(&mut records).unwrap();

        let range = TimeRange::new(from, from + len);
        let groups = store
            .get_range(tenant, &events(), hint, None, range, Pagination::ALL)
            .unwrap();
        let read = conformance::read_groups(&store, &groups);

        let mut expected: Vec<i64> =
            stamps.iter().copied().filter(|&t| range.contains(t)).collect();
        let mut actual: Vec<i64> = read.iter().map(Record::timestamp).collect();
        expected.sort_unstable();
        actual.sort_unstable();
        prop_assert_eq!(actual, expected);

        let distinct: BTreeSet<_> = read.iter().filter_map(|r| r.id().cloned()).collect();
        prop_assert_eq!(distinct.len(), read.len());
        prop_assert_eq!(
            store.record_count(tenant, &events(), range).unwrap(),
            read.len() as u64
        );
    }
}
