//! Backend-agnostic conformance suite.
//!
//! Every [`RecordStore`] implementation must pass these checks. A backend
//! crate enables the `conformance` feature in its dev-dependencies and
//! calls [`run_all`] with a factory producing fresh, initialized stores:
//!
//! ```ignore
//! #[test]
//! fn my_backend_conforms() {
//!     tessera_store::conformance::run_all(|| Box::new(MyStore::open(&props()).unwrap()));
//! }
//! ```
//!
//! Checks panic on the first violated property, like any test assertion.
//! Pagination-dependent checks adapt to what the backend reports through
//! [`RecordStore::is_pagination_supported`].

#![allow(clippy::missing_panics_doc)]

use std::collections::BTreeSet;

use tessera_types::{
    ColumnDefinition, ColumnType, Record, RecordGroup, RecordId, Schema, TableName, TenantId,
    TimeRange, Value,
};

use crate::error::{ErrorKind, StoreError};
use crate::pagination::Pagination;
use crate::store::RecordStore;

/// Partition hints every coverage check is run with.
pub const PARTITION_HINTS: [usize; 7] = [0, 1, 2, 3, 7, 16, 64];

/// Runs every check, each against its own store from `factory`.
pub fn run_all<F>(factory: F)
where
    F: Fn() -> Box<dyn RecordStore>,
{
    let checks: [(&str, fn(&dyn RecordStore)); 12] = [
        ("tenant_isolation", tenant_isolation),
        ("table_lifecycle", table_lifecycle),
        ("missing_table_errors", missing_table_errors),
        ("schema_round_trip", schema_round_trip),
        ("put_generates_ids", put_generates_ids),
        ("put_replaces_whole_record", put_replaces_whole_record),
        ("time_range_bounds", time_range_bounds),
        ("partition_coverage", partition_coverage),
        ("id_reads", id_reads),
        ("deletes", deletes),
        ("pagination_capability", pagination_capability),
        ("stale_groups_rejected", stale_groups_rejected),
    ];

    for (name, check) in checks {
        let store = factory();
        tracing::debug!(check = name, backend = store.backend_id(), "running conformance check");
        check(store.as_ref());
        store.destroy().expect("destroy after conformance check");
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Resolves every group sequentially and concatenates the records.
pub fn read_groups(store: &dyn RecordStore, groups: &[RecordGroup]) -> Vec<Record> {
    groups
        .iter()
        .flat_map(|g| store.read_records(g).expect("resolve group"))
        .collect::<Result<Vec<_>, _>>()
        .expect("read record")
}

/// Reads every record of a table inside `range`.
pub fn read_range(
    store: &dyn RecordStore,
    tenant: TenantId,
    table: &TableName,
    range: TimeRange,
) -> Vec<Record> {
    let groups = store
        .get_range(tenant, table, 1, None, range, Pagination::ALL)
        .expect("plan range read");
    read_groups(store, &groups)
}

fn timestamps(records: &[Record]) -> Vec<i64> {
    let mut ts: Vec<i64> = records.iter().map(Record::timestamp).collect();
    ts.sort_unstable();
    ts
}

fn ids(records: &[Record]) -> BTreeSet<RecordId> {
    records.iter().filter_map(|r| r.id().cloned()).collect()
}

fn assert_table_not_available<T: std::fmt::Debug>(result: Result<T, StoreError>, op: &str) {
    match result {
        Err(e) => assert_eq!(
            e.kind(),
            ErrorKind::TableNotAvailable,
            "{op}: expected TableNotAvailable, got {e}"
        ),
        Ok(v) => panic!("{op}: expected TableNotAvailable, got Ok({v:?})"),
    }
}

fn seed(
    store: &dyn RecordStore,
    tenant: TenantId,
    table: &str,
    timestamps: &[i64],
) -> Vec<RecordId> {
    store
        .create_table(tenant, &TableName::new(table))
        .expect("create table");
    let mut records: Vec<Record> = timestamps
        .iter()
        .enumerate()
        .map(|(i, &ts)| Record::new(tenant, table, ts).with_value("n", i as i64))
        .collect();
    store.put(&mut records).expect("put records");
    records.iter().filter_map(|r| r.id().cloned()).collect()
}

// ============================================================================
// Checks
// ============================================================================

/// Data written under one tenant is invisible to every other tenant.
pub fn tenant_isolation(store: &dyn RecordStore) {
    let a = TenantId::new(1);
    let b = TenantId::new(2);
    let table = TableName::new("shared");

    seed(store, a, "shared", &[1, 2, 3]);

    assert!(store.table_exists(a, &table).unwrap());
    assert!(!store.table_exists(b, &table).unwrap());
    assert!(store.list_tables(b).unwrap().is_empty());
    assert_table_not_available(
        store.get_range(b, &table, 1, None, TimeRange::ALL, Pagination::ALL),
        "get_range for other tenant",
    );

    seed(store, b, "shared", &[10]);
    assert_eq!(read_range(store, a, &table, TimeRange::ALL).len(), 3);
    assert_eq!(read_range(store, b, &table, TimeRange::ALL).len(), 1);

    store.delete_table(b, &table).unwrap();
    assert!(store.table_exists(a, &table).unwrap());
    assert_eq!(read_range(store, a, &table, TimeRange::ALL).len(), 3);
}

/// Create is idempotent, names are case-insensitive, delete is total.
pub fn table_lifecycle(store: &dyn RecordStore) {
    let tenant = TenantId::new(7);
    let table = TableName::new("Metrics");

    assert!(!store.table_exists(tenant, &table).unwrap());
    store.create_table(tenant, &table).unwrap();
    store.create_table(tenant, &TableName::new("METRICS")).unwrap();
    store.create_table(tenant, &TableName::new("alpha")).unwrap();
    assert!(store.table_exists(tenant, &TableName::new("metrics")).unwrap());

    let listed = store.list_tables(tenant).unwrap();
    assert_eq!(listed, vec![TableName::new("alpha"), TableName::new("metrics")]);

    store.delete_table(tenant, &table).unwrap();
    assert!(!store.table_exists(tenant, &table).unwrap());
    store.delete_table(tenant, &table).unwrap();
    assert_eq!(store.list_tables(tenant).unwrap(), vec![TableName::new("alpha")]);

    let empty = store.create_table(tenant, &TableName::new("   "));
    assert!(matches!(empty, Err(StoreError::InvalidArgument(_))));
}

/// Data-access operations on an absent table fail with TableNotAvailable.
pub fn missing_table_errors(store: &dyn RecordStore) {
    let tenant = TenantId::new(3);
    let table = TableName::new("ghost");

    assert_table_not_available(store.table_schema(tenant, &table), "table_schema");
    assert_table_not_available(
        store.set_table_schema(tenant, &table, Schema::default()),
        "set_table_schema",
    );
    assert_table_not_available(store.put(&mut [Record::new(tenant, "ghost", 1)]), "put");
    assert_table_not_available(
        store.get_range(tenant, &table, 1, None, TimeRange::ALL, Pagination::ALL),
        "get_range",
    );
    assert_table_not_available(
        store.get_ids(tenant, &table, 1, None, &[RecordId::new("x")]),
        "get_ids",
    );
    assert_table_not_available(
        store.delete_range(tenant, &table, TimeRange::ALL),
        "delete_range",
    );
    assert_table_not_available(
        store.delete_ids(tenant, &table, &[RecordId::new("x")]),
        "delete_ids",
    );
    if store.is_pagination_supported() {
        assert_table_not_available(
            store.record_count(tenant, &table, TimeRange::ALL),
            "record_count",
        );
    }

    // A batch touching one missing table writes nothing.
    store.create_table(tenant, &TableName::new("real")).unwrap();
    let mut batch = [Record::new(tenant, "real", 1), Record::new(tenant, "ghost", 2)];
    assert_table_not_available(store.put(&mut batch), "put with mixed targets");
    assert!(read_range(store, tenant, &TableName::new("real"), TimeRange::ALL).is_empty());
}

/// Schemas round-trip exactly and are overwritten wholesale.
pub fn schema_round_trip(store: &dyn RecordStore) {
    let tenant = TenantId::new(11);
    let table = TableName::new("profiles");
    store.create_table(tenant, &table).unwrap();

    assert!(store.table_schema(tenant, &table).unwrap().is_empty());

    let first = Schema::new()
        .with_column("user", ColumnDefinition::new(ColumnType::String).indexed())
        .with_column("score", ColumnDefinition::new(ColumnType::Double).scoring_param())
        .with_primary_keys(["user"]);
    store.set_table_schema(tenant, &table, first.clone()).unwrap();
    assert_eq!(store.table_schema(tenant, &table).unwrap(), first);

    let second = Schema::new().with_column("age", ColumnDefinition::new(ColumnType::Integer));
    store.set_table_schema(tenant, &table, second.clone()).unwrap();
    assert_eq!(store.table_schema(tenant, &table).unwrap(), second);

    let bad = Schema::new().with_primary_keys(["missing"]);
    assert!(matches!(
        store.set_table_schema(tenant, &table, bad),
        Err(StoreError::InvalidSchema(_))
    ));
    assert_eq!(store.table_schema(tenant, &table).unwrap(), second);

    // Undeclared columns are still accepted on write.
    store
        .put(&mut [Record::new(tenant, "profiles", 1).with_value("free_form", true)])
        .unwrap();
}

/// Records without ids get unique ids written back to the caller.
pub fn put_generates_ids(store: &dyn RecordStore) {
    let tenant = TenantId::new(12);
    let written = seed(store, tenant, "clicks", &[1, 2, 3, 4]);
    assert_eq!(written.len(), 4);
    assert_eq!(written.iter().collect::<BTreeSet<_>>().len(), 4);

    let read = read_range(store, tenant, &TableName::new("clicks"), TimeRange::ALL);
    assert_eq!(ids(&read), written.into_iter().collect());
    assert!(read.iter().all(|r| r.id().is_some()));
}

/// Writing an existing id replaces the record; fields are never merged.
pub fn put_replaces_whole_record(store: &dyn RecordStore) {
    let tenant = TenantId::new(13);
    let table = TableName::new("docs");
    store.create_table(tenant, &table).unwrap();

    store
        .put(&mut [Record::with_id(tenant, "docs", "r1", 10)
            .with_value("a", 1)
            .with_value("b", "x")])
        .unwrap();
    store
        .put(&mut [Record::with_id(tenant, "docs", "r1", 20).with_value("a", 2)])
        .unwrap();

    let read = read_range(store, tenant, &table, TimeRange::ALL);
    assert_eq!(read.len(), 1);
    let record = &read[0];
    assert_eq!(record.timestamp(), 20);
    assert_eq!(record.value("a"), Some(&Value::Integer(2)));
    assert_eq!(record.value("b"), None);
}

/// Ranges are half-open and honor both sentinels.
pub fn time_range_bounds(store: &dyn RecordStore) {
    let tenant = TenantId::new(14);
    let table = TableName::new("ticks");
    seed(store, tenant, "ticks", &[i64::MIN, -5, 0, 10, 19, 20, i64::MAX]);

    let cases = [
        (TimeRange::ALL, vec![i64::MIN, -5, 0, 10, 19, 20, i64::MAX]),
        (TimeRange::new(0, 20), vec![0, 10, 19]),
        (TimeRange::since(10), vec![10, 19, 20, i64::MAX]),
        (TimeRange::until(0), vec![i64::MIN, -5]),
        (TimeRange::new(5, 5), vec![]),
        (TimeRange::new(30, 10), vec![]),
    ];
    for (range, expected) in cases {
        let read = read_range(store, tenant, &table, range);
        assert_eq!(timestamps(&read), expected, "range {range}");
    }
}

/// The groups of any plan cover every matching record exactly once.
pub fn partition_coverage(store: &dyn RecordStore) {
    let tenant = TenantId::new(15);
    let table = TableName::new("wide");
    let stamps: Vec<i64> = (0..200).collect();
    let written: BTreeSet<RecordId> = seed(store, tenant, "wide", &stamps).into_iter().collect();

    for hint in PARTITION_HINTS {
        let groups = store
            .get_range(tenant, &table, hint, None, TimeRange::ALL, Pagination::ALL)
            .unwrap();
        assert!(!groups.is_empty(), "hint {hint}: no groups");
        assert!(groups.iter().all(|g| g.backend() == store.backend_id()));

        let read = read_groups(store, &groups);
        assert_eq!(read.len(), written.len(), "hint {hint}: duplicates or gaps");
        assert_eq!(ids(&read), written, "hint {hint}");

        let id_groups = store
            .get_ids(tenant, &table, hint, None, &written.iter().cloned().collect::<Vec<_>>())
            .unwrap();
        let read = read_groups(store, &id_groups);
        assert_eq!(read.len(), written.len(), "hint {hint}: id read");
    }

    // Groups resolve independently in any order.
    let groups = store
        .get_range(tenant, &table, 4, None, TimeRange::new(50, 150), Pagination::ALL)
        .unwrap();
    let reversed: Vec<RecordGroup> = groups.iter().rev().cloned().collect();
    assert_eq!(read_groups(store, &reversed).len(), 100);
}

/// Unknown ids are absent, duplicates are returned once, columns project.
pub fn id_reads(store: &dyn RecordStore) {
    let tenant = TenantId::new(16);
    let table = TableName::new("people");
    store.create_table(tenant, &table).unwrap();
    store
        .put(&mut [
            Record::with_id(tenant, "people", "a", 1)
                .with_value("name", "ann")
                .with_value("age", 30),
            Record::with_id(tenant, "people", "b", 2)
                .with_value("name", "bob")
                .with_value("age", 40),
        ])
        .unwrap();

    let wanted = [RecordId::new("a"), RecordId::new("zzz"), RecordId::new("a")];
    let columns = ["name".to_string()];
    let groups = store
        .get_ids(tenant, &table, 2, Some(&columns), &wanted)
        .unwrap();
    let read = read_groups(store, &groups);

    assert_eq!(read.len(), 1);
    assert_eq!(read[0].id(), Some(&RecordId::new("a")));
    assert_eq!(read[0].value("name"), Some(&Value::from("ann")));
    assert_eq!(read[0].value("age"), None);

    let none = store.get_ids(tenant, &table, 2, None, &[]).unwrap();
    assert!(read_groups(store, &none).is_empty());
}

/// Deletes remove exactly the selected records and tolerate empty selections.
pub fn deletes(store: &dyn RecordStore) {
    let tenant = TenantId::new(17);
    let table = TableName::new("logs");
    let written = seed(store, tenant, "logs", &[1, 2, 3, 4, 5]);

    store.delete_range(tenant, &table, TimeRange::new(2, 4)).unwrap();
    assert_eq!(timestamps(&read_range(store, tenant, &table, TimeRange::ALL)), vec![1, 4, 5]);

    store.delete_range(tenant, &table, TimeRange::new(100, 200)).unwrap();
    store
        .delete_ids(tenant, &table, &[written[0].clone(), RecordId::new("unknown")])
        .unwrap();
    assert_eq!(timestamps(&read_range(store, tenant, &table, TimeRange::ALL)), vec![4, 5]);

    store.delete_table(tenant, &table).unwrap();
    store.create_table(tenant, &table).unwrap();
    assert!(read_range(store, tenant, &table, TimeRange::ALL).is_empty());
}

/// Counts and windows are exact when the backend claims pagination support.
pub fn pagination_capability(store: &dyn RecordStore) {
    let tenant = TenantId::new(18);
    let table = TableName::new("paged");
    let stamps: Vec<i64> = (0..20).map(|i| 100 - i).collect();
    seed(store, tenant, "paged", &stamps);

    if !store.is_pagination_supported() {
        // Unpaginated reads must still be complete.
        let all = store
            .get_range(tenant, &table, 3, None, TimeRange::ALL, Pagination::new(5, Some(3)))
            .unwrap();
        assert!(read_groups(store, &all).len() >= 3);
        return;
    }

    assert_eq!(store.record_count(tenant, &table, TimeRange::ALL).unwrap(), 20);
    assert_eq!(store.record_count(tenant, &table, TimeRange::new(90, 95)).unwrap(), 5);

    let groups = store
        .get_range(tenant, &table, 3, None, TimeRange::ALL, Pagination::new(5, Some(3)))
        .unwrap();
    let page: Vec<i64> = read_groups(store, &groups).iter().map(Record::timestamp).collect();
    assert_eq!(page, vec![86, 87, 88]);

    let tail = store
        .get_range(tenant, &table, 3, None, TimeRange::ALL, Pagination::new(18, None))
        .unwrap();
    assert_eq!(read_groups(store, &tail).len(), 2);

    let past_end = store
        .get_range(tenant, &table, 3, None, TimeRange::ALL, Pagination::new(50, Some(5)))
        .unwrap();
    assert!(read_groups(store, &past_end).is_empty());
}

/// Groups planned before a table was dropped cannot be resolved.
pub fn stale_groups_rejected(store: &dyn RecordStore) {
    let tenant = TenantId::new(19);
    let table = TableName::new("ephemeral");
    seed(store, tenant, "ephemeral", &[1, 2]);

    let groups = store
        .get_range(tenant, &table, 1, None, TimeRange::ALL, Pagination::ALL)
        .unwrap();
    store.delete_table(tenant, &table).unwrap();
    store.create_table(tenant, &table).unwrap();

    for group in &groups {
        assert_table_not_available(
            store.read_records(group).map(|_| ()),
            "read_records after drop",
        );
    }

    let foreign = RecordGroup::new("some-other-backend", Vec::new(), bytes::Bytes::new());
    assert!(matches!(
        store.read_records(&foreign).map(|_| ()),
        Err(StoreError::ForeignRecordGroup { .. })
    ));
}
