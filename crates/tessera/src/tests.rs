//! Unit tests for the Tessera facade

use std::sync::Arc;

use proptest::prelude::*;
use tessera_config::TesseraConfig;
use tessera_store::{MemoryRecordStore, Pagination, Properties, RecordStore, StoreError};
use tessera_types::{Record, RecordId, TableName, TenantId, TimeRange, Value};

use crate::{ReadOptions, Tessera, TesseraError, resolve_groups};

fn memory(pagination: bool) -> Tessera {
    let config = TesseraConfig::in_memory([
        ("shards", "5"),
        ("pagination", if pagination { "true" } else { "false" }),
    ]);
    Tessera::open(&config).unwrap()
}

fn seed(db: &Tessera, tenant: TenantId, table: &str, stamps: &[i64]) {
    let handle = db.tenant(tenant);
    handle.create_table(table).unwrap();
    let mut records: Vec<Record> = stamps
        .iter()
        .map(|&t| Record::with_id(tenant, table, format!("r{t:04}"), t).with_value("t", t))
        .collect();
    handle.put(&mut records).unwrap();
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn open_selects_memory_backend() {
    let db = Tessera::open(&TesseraConfig::default()).unwrap();
    assert_eq!(db.store().backend_id(), "memory");
    assert_eq!(db.options(), ReadOptions::default());
    assert!(db.store().is_pagination_supported());
}

#[test]
fn open_rejects_unknown_backend() {
    let mut config = TesseraConfig::default();
    config.store.backend = "hbase".to_string();
    assert!(matches!(
        Tessera::open(&config),
        Err(TesseraError::UnknownBackend(name)) if name == "hbase"
    ));
}

#[test]
fn open_surfaces_backend_property_errors() {
    let config = TesseraConfig::in_memory([("shards", "none")]);
    let err = Tessera::open(&config).unwrap_err();
    assert!(matches!(
        err,
        TesseraError::Store(StoreError::InvalidProperty { .. })
    ));
}

#[test]
fn open_project_reads_tessera_toml() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("tessera.toml"),
        "[store.properties]\npagination = \"false\"\n\n[reads]\ndefault_partitions = 3\n",
    )
    .unwrap();

    let db = Tessera::open_project(dir.path()).unwrap();
    assert!(!db.store().is_pagination_supported());
    assert_eq!(db.options().default_partitions, 3);
}

#[test]
fn injected_store_is_used_as_is() {
    let store = Arc::new(MemoryRecordStore::open(&Properties::new()).unwrap());
    let db = Tessera::new(store.clone(), ReadOptions::default().sequential());
    let tenant = TenantId::new(1);

    db.tenant(tenant).create_table("direct").unwrap();
    assert!(store.table_exists(tenant, &TableName::new("direct")).unwrap());
}

#[test]
fn close_destroys_backend_once() {
    let db = memory(true);
    let handle = db.tenant(TenantId::new(1));
    handle.create_table("t").unwrap();

    db.close().unwrap();
    db.close().unwrap();
    assert!(matches!(
        handle.table_exists("t"),
        Err(TesseraError::Store(StoreError::Destroyed))
    ));
}

// ============================================================================
// Tenant Handle
// ============================================================================

#[test]
fn put_rejects_records_of_other_tenants() {
    let db = memory(true);
    let handle = db.tenant(TenantId::new(1));
    handle.create_table("events").unwrap();

    let mut records = [
        Record::new(TenantId::new(1), "events", 1),
        Record::new(TenantId::new(2), "events", 2),
    ];
    let err = handle.put(&mut records).unwrap_err();
    assert!(matches!(
        err,
        TesseraError::Store(StoreError::InvalidArgument(_))
    ));
    assert!(handle.read("events", TimeRange::ALL, None).unwrap().is_empty());
}

#[test]
fn put_writes_back_generated_ids() {
    let db = memory(true);
    let tenant = TenantId::new(1);
    let handle = db.tenant(tenant);
    handle.create_table("events").unwrap();

    let mut records = [Record::new(tenant, "events", 1)];
    handle.put(&mut records).unwrap();
    let id = records[0].id().cloned().unwrap();

    let read = handle.read_by_ids("events", &[id.clone()], None).unwrap();
    assert_eq!(read.len(), 1);
    assert_eq!(read[0].id(), Some(&id));
}

#[test]
fn ensure_table_creates_once() {
    let db = memory(true);
    let handle = db.tenant(TenantId::new(1));
    assert!(handle.ensure_table("lazy").unwrap());
    assert!(!handle.ensure_table("LAZY").unwrap());
    assert_eq!(handle.list_tables().unwrap(), vec![TableName::new("lazy")]);
}

#[test]
fn missing_table_is_distinguishable() {
    let db = memory(true);
    let err = db
        .tenant(TenantId::new(1))
        .read("nowhere", TimeRange::ALL, None)
        .unwrap_err();
    assert!(err.is_table_not_available());

    let unknown = TesseraError::UnknownBackend("x".into());
    assert!(!unknown.is_table_not_available());
}

#[test]
fn count_falls_back_to_scan() {
    let db = memory(false);
    let tenant = TenantId::new(3);
    seed(&db, tenant, "events", &[1, 2, 3, 10, 20]);

    let handle = db.tenant(tenant);
    assert_eq!(handle.count("events", TimeRange::ALL).unwrap(), 5);
    assert_eq!(handle.count("events", TimeRange::new(2, 11)).unwrap(), 3);
}

#[test]
fn count_on_missing_table_fails_in_both_modes() {
    for pagination in [true, false] {
        let db = memory(pagination);
        let err = db
            .tenant(TenantId::new(1))
            .count("missing", TimeRange::ALL)
            .unwrap_err();
        assert!(err.is_table_not_available(), "pagination={pagination}");
    }
}

#[test]
fn read_projects_columns() {
    let db = memory(true);
    let tenant = TenantId::new(1);
    let handle = db.tenant(tenant);
    handle.create_table("wide").unwrap();
    handle
        .put(&mut [Record::with_id(tenant, "wide", "x", 1)
            .with_value("a", 1)
            .with_value("b", 2)
            .with_value("c", 3)])
        .unwrap();

    let columns = ["a".to_string(), "c".to_string(), "zz".to_string()];
    let read = handle.read("wide", TimeRange::ALL, Some(&columns)).unwrap();
    assert_eq!(read.len(), 1);
    let names: Vec<&str> = read[0].values().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["a", "c"]);
    assert_eq!(read[0].value("c"), Some(&Value::Integer(3)));
}

#[test]
fn parallel_and_sequential_resolution_agree() {
    let db = memory(true);
    let tenant = TenantId::new(4);
    let stamps: Vec<i64> = (0..300).collect();
    seed(&db, tenant, "events", &stamps);

    let store = db.store();
    let groups = store
        .get_range(
            tenant,
            &TableName::new("events"),
            5,
            None,
            TimeRange::ALL,
            Pagination::ALL,
        )
        .unwrap();
    assert_eq!(groups.len(), 5);

    let parallel = resolve_groups(store.as_ref(), &groups, true).unwrap();
    let sequential = resolve_groups(store.as_ref(), &groups, false).unwrap();
    assert_eq!(parallel, sequential);
    assert_eq!(parallel.len(), 300);
}

#[test]
fn delete_by_range_and_ids() {
    let db = memory(true);
    let tenant = TenantId::new(6);
    seed(&db, tenant, "events", &[1, 2, 3, 4]);
    let handle = db.tenant(tenant);

    handle.delete_range("events", TimeRange::new(3, 100)).unwrap();
    handle.delete_ids("events", &[RecordId::new("r0001")]).unwrap();

    let left = handle.read("events", TimeRange::ALL, None).unwrap();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].id(), Some(&RecordId::new("r0002")));
}

// ============================================================================
// Pagination
// ============================================================================

proptest! {
    #[test]
    fn emulated_pages_match_native_pages(
        stamps in prop::collection::btree_set(-500i64..500, 0..40),
        offset in 0u64..50,
        limit in prop::option::of(0u64..20),
    ) {
        let stamps: Vec<i64> = stamps.into_iter().collect();
        let native = memory(true);
        let emulated = memory(false);
        let tenant = TenantId::new(8);
        seed(&native, tenant, "events", &stamps);
        seed(&emulated, tenant, "events", &stamps);

        let page = Pagination::new(offset, limit);
        let a = native.tenant(tenant).read_page("events", TimeRange::ALL, None, page).unwrap();
        let b = emulated.tenant(tenant).read_page("events", TimeRange::ALL, None, page).unwrap();

        prop_assert_eq!(&a, &b);

        let expected = stamps.len().saturating_sub(offset as usize);
        let expected = limit.map_or(expected, |l| expected.min(l as usize));
        prop_assert_eq!(a.len(), expected);
    }
}
