//! In-memory reference backend.
//!
//! [`MemoryRecordStore`] implements the full [`RecordStore`] contract without
//! any external system. It exists for conformance testing and embedded use,
//! and can be configured to behave like a backend without pagination support
//! so callers' fallback paths can be exercised.
//!
//! # Properties
//!
//! | Key | Default | Meaning |
//! |-----|---------|---------|
//! | `shards` | `4` | Physical partitions per table (at least 1) |
//! | `pagination` | `true` | Whether offset/limit windows and counts are honored |
//! | `locations` | `localhost` | Comma-separated host hints stamped on groups |

mod cursor;
mod table;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use tessera_types::{Record, RecordGroup, RecordId, Schema, TableName, TenantId, TimeRange};

use crate::error::{Result, StoreError};
use crate::pagination::Pagination;
use crate::planner::{assign_shards, route_ids};
use crate::store::{Properties, RecordIter, RecordStore};

use cursor::{CursorGuard, GroupSpec, IdCursor, RangeCursor, Selection, WindowCursor, window};
use table::TableData;

/// Backend id stamped on every group this backend plans.
pub const MEMORY_BACKEND_ID: &str = "memory";

/// Default number of shards per table.
pub const DEFAULT_SHARDS: usize = 4;

/// Source of per-process store instance numbers.
static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Settings parsed from the properties given to `init`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    pub shards: usize,
    pub pagination: bool,
    pub locations: Vec<String>,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            shards: DEFAULT_SHARDS,
            pagination: true,
            locations: vec!["localhost".to_string()],
        }
    }
}

impl MemoryConfig {
    /// Parses backend properties, falling back to defaults for absent keys.
    pub fn from_properties(properties: &Properties) -> Result<Self> {
        let mut config = Self::default();

        for (key, value) in properties {
            match key.as_str() {
                "shards" => {
                    config.shards = value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|&n| n > 0)
                        .ok_or_else(|| StoreError::InvalidProperty {
                            key: key.clone(),
                            reason: format!("expected a positive integer, got '{value}'"),
                        })?;
                }
                "pagination" => {
                    config.pagination =
                        value
                            .trim()
                            .parse::<bool>()
                            .map_err(|_| StoreError::InvalidProperty {
                                key: key.clone(),
                                reason: format!("expected true or false, got '{value}'"),
                            })?;
                }
                "locations" => {
                    config.locations = value
                        .split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect();
                }
                _ => tracing::debug!(%key, "ignoring unknown memory store property"),
            }
        }

        Ok(config)
    }
}

#[derive(Debug)]
enum Lifecycle {
    Uninitialized,
    Running(Arc<Engine>),
    Destroyed,
}

/// State that exists between `init` and `destroy`.
#[derive(Debug)]
struct Engine {
    config: MemoryConfig,
    tables: RwLock<HashMap<(TenantId, TableName), Arc<TableData>>>,
    next_incarnation: AtomicU64,
}

impl Engine {
    fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            tables: RwLock::new(HashMap::new()),
            next_incarnation: AtomicU64::new(1),
        }
    }

    fn table(&self, tenant: TenantId, name: &TableName) -> Result<Arc<TableData>> {
        self.tables
            .read()
            .map_err(|_| StoreError::LockPoisoned)?
            .get(&(tenant, name.clone()))
            .cloned()
            .ok_or_else(|| StoreError::table_not_available(tenant, name))
    }
}

/// Thread-safe, sharded, in-memory [`RecordStore`].
#[derive(Debug)]
pub struct MemoryRecordStore {
    instance: u64,
    state: RwLock<Lifecycle>,
    open_cursors: Arc<AtomicUsize>,
    /// Cleared by `destroy`; open cursors watch it.
    running: Arc<AtomicBool>,
}

impl MemoryRecordStore {
    /// Creates an uninitialized store. Call [`RecordStore::init`] before use.
    pub fn new() -> Self {
        Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            state: RwLock::new(Lifecycle::Uninitialized),
            open_cursors: Arc::new(AtomicUsize::new(0)),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Creates and initializes a store in one step.
    pub fn open(properties: &Properties) -> Result<Self> {
        let store = Self::new();
        store.init(properties)?;
        Ok(store)
    }

    /// Number of record cursors that have been handed out and not yet
    /// exhausted or dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }

    fn engine(&self) -> Result<Arc<Engine>> {
        match &*self.state.read().map_err(|_| StoreError::LockPoisoned)? {
            Lifecycle::Running(engine) => Ok(Arc::clone(engine)),
            Lifecycle::Uninitialized => Err(StoreError::NotInitialized),
            Lifecycle::Destroyed => Err(StoreError::Destroyed),
        }
    }

    fn group(&self, engine: &Engine, spec: &GroupSpec) -> Result<RecordGroup> {
        Ok(RecordGroup::new(
            MEMORY_BACKEND_ID,
            engine.config.locations.clone(),
            Bytes::from(spec.encode()?),
        ))
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

fn check_name(table: &TableName) -> Result<()> {
    if table.is_empty() {
        return Err(StoreError::InvalidArgument(
            "table name must not be empty".into(),
        ));
    }
    Ok(())
}

impl RecordStore for MemoryRecordStore {
    fn backend_id(&self) -> &str {
        MEMORY_BACKEND_ID
    }

    fn init(&self, properties: &Properties) -> Result<()> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        match &*state {
            Lifecycle::Uninitialized => {}
            Lifecycle::Running(_) => return Err(StoreError::AlreadyInitialized),
            Lifecycle::Destroyed => return Err(StoreError::Destroyed),
        }

        let config = MemoryConfig::from_properties(properties)?;
        tracing::info!(
            instance = self.instance,
            shards = config.shards,
            pagination = config.pagination,
            "memory record store initialized"
        );
        *state = Lifecycle::Running(Arc::new(Engine::new(config)));
        Ok(())
    }

    fn create_table(&self, tenant: TenantId, table: &TableName) -> Result<()> {
        check_name(table)?;
        let engine = self.engine()?;
        let mut tables = engine
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned)?;
        if !tables.contains_key(&(tenant, table.clone())) {
            let incarnation = engine.next_incarnation.fetch_add(1, Ordering::Relaxed);
            tables.insert(
                (tenant, table.clone()),
                Arc::new(TableData::new(incarnation, engine.config.shards)),
            );
            tracing::debug!(%tenant, %table, incarnation, "table created");
        }
        Ok(())
    }

    fn set_table_schema(&self, tenant: TenantId, table: &TableName, schema: Schema) -> Result<()> {
        let undeclared = schema.undeclared_primary_keys();
        if !undeclared.is_empty() {
            return Err(StoreError::InvalidSchema(format!(
                "primary key columns not declared: {}",
                undeclared.join(", ")
            )));
        }
        self.engine()?.table(tenant, table)?.set_schema(schema)?;
        tracing::debug!(%tenant, %table, "table schema set");
        Ok(())
    }

    fn table_schema(&self, tenant: TenantId, table: &TableName) -> Result<Schema> {
        self.engine()?.table(tenant, table)?.schema()
    }

    fn table_exists(&self, tenant: TenantId, table: &TableName) -> Result<bool> {
        let engine = self.engine()?;
        let tables = engine.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(tables.contains_key(&(tenant, table.clone())))
    }

    fn delete_table(&self, tenant: TenantId, table: &TableName) -> Result<()> {
        let engine = self.engine()?;
        let removed = engine
            .tables
            .write()
            .map_err(|_| StoreError::LockPoisoned)?
            .remove(&(tenant, table.clone()));
        if removed.is_some() {
            tracing::debug!(%tenant, %table, "table deleted");
        }
        Ok(())
    }

    fn list_tables(&self, tenant: TenantId) -> Result<Vec<TableName>> {
        let engine = self.engine()?;
        let tables = engine.tables.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut names: Vec<TableName> = tables
            .keys()
            .filter(|(t, _)| *t == tenant)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    fn is_pagination_supported(&self) -> bool {
        // Before init the store has no configuration; report the default.
        self.engine()
            .map_or(MemoryConfig::default().pagination, |e| e.config.pagination)
    }

    fn record_count(&self, tenant: TenantId, table: &TableName, range: TimeRange) -> Result<u64> {
        let engine = self.engine()?;
        let data = engine.table(tenant, table)?;
        if !engine.config.pagination {
            return Err(StoreError::Unsupported("record count"));
        }
        data.count(range)
    }

    fn put(&self, records: &mut [Record]) -> Result<()> {
        let engine = self.engine()?;

        let mut targets = Vec::with_capacity(records.len());
        for record in records.iter() {
            check_name(record.table())?;
            targets.push(engine.table(record.tenant(), record.table())?);
        }

        for (record, target) in records.iter_mut().zip(targets) {
            record.ensure_id();
            target.upsert(record.clone())?;
        }

        tracing::debug!(records = records.len(), "records written");
        Ok(())
    }

    fn get_range(
        &self,
        tenant: TenantId,
        table: &TableName,
        partitions_hint: usize,
        columns: Option<&[String]>,
        range: TimeRange,
        pagination: Pagination,
    ) -> Result<Vec<RecordGroup>> {
        let engine = self.engine()?;
        let data = engine.table(tenant, table)?;
        let spec = |selection| GroupSpec {
            instance: self.instance,
            tenant,
            table: table.clone(),
            incarnation: data.incarnation(),
            columns: columns.map(<[String]>::to_vec),
            selection,
        };

        if engine.config.pagination && pagination.is_windowed() {
            let group = self.group(&engine, &spec(Selection::Window { range, pagination }))?;
            return Ok(vec![group]);
        }

        let groups = assign_shards(data.shard_count(), partitions_hint)
            .into_iter()
            .map(|shards| self.group(&engine, &spec(Selection::Range { shards, range })))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(%tenant, %table, %range, groups = groups.len(), "range read planned");
        Ok(groups)
    }

    fn get_ids(
        &self,
        tenant: TenantId,
        table: &TableName,
        partitions_hint: usize,
        columns: Option<&[String]>,
        ids: &[RecordId],
    ) -> Result<Vec<RecordGroup>> {
        let engine = self.engine()?;
        let data = engine.table(tenant, table)?;
        let mut routed = route_ids(ids, data.shard_count());

        let mut groups = Vec::new();
        for shards in assign_shards(data.shard_count(), partitions_hint) {
            let selected: Vec<(usize, Vec<RecordId>)> = shards
                .into_iter()
                .map(|s| (s, std::mem::take(&mut routed[s])))
                .filter(|(_, ids)| !ids.is_empty())
                .collect();
            if selected.is_empty() {
                continue;
            }
            let spec = GroupSpec {
                instance: self.instance,
                tenant,
                table: table.clone(),
                incarnation: data.incarnation(),
                columns: columns.map(<[String]>::to_vec),
                selection: Selection::Ids { routed: selected },
            };
            groups.push(self.group(&engine, &spec)?);
        }

        tracing::debug!(%tenant, %table, ids = ids.len(), groups = groups.len(), "id read planned");
        Ok(groups)
    }

    fn read_records(&self, group: &RecordGroup) -> Result<RecordIter<'_>> {
        if group.backend() != MEMORY_BACKEND_ID {
            return Err(StoreError::ForeignRecordGroup {
                expected: MEMORY_BACKEND_ID.to_string(),
                actual: group.backend().to_string(),
            });
        }
        let spec = GroupSpec::decode(group.payload())?;
        if spec.instance != self.instance {
            return Err(StoreError::ForeignRecordGroup {
                expected: format!("{MEMORY_BACKEND_ID}#{}", self.instance),
                actual: format!("{MEMORY_BACKEND_ID}#{}", spec.instance),
            });
        }

        let engine = self.engine()?;
        let data = engine.table(spec.tenant, &spec.table)?;
        if data.incarnation() != spec.incarnation {
            return Err(StoreError::table_not_available(spec.tenant, &spec.table));
        }

        let guard = CursorGuard::acquire(&self.open_cursors, &self.running);
        let iter: RecordIter<'_> = match spec.selection {
            Selection::Range { shards, range } => {
                let snapshots = shards
                    .iter()
                    .map(|&s| data.snapshot(s))
                    .collect::<Result<Vec<_>>>()?;
                Box::new(RangeCursor::new(snapshots, range, spec.columns, guard))
            }
            Selection::Window { range, pagination } => {
                let records = window(
                    &data.snapshots()?,
                    range,
                    pagination,
                    spec.columns.as_deref(),
                );
                Box::new(WindowCursor::new(records, guard))
            }
            Selection::Ids { routed } => {
                let mut lookups = Vec::new();
                for (shard, ids) in routed {
                    let snapshot = data.snapshot(shard)?;
                    lookups.extend(ids.into_iter().map(|id| (Arc::clone(&snapshot), id)));
                }
                Box::new(IdCursor::new(lookups, spec.columns, guard))
            }
        };
        Ok(iter)
    }

    fn delete_range(&self, tenant: TenantId, table: &TableName, range: TimeRange) -> Result<()> {
        let removed = self.engine()?.table(tenant, table)?.remove_range(range)?;
        tracing::debug!(%tenant, %table, %range, removed, "records deleted by range");
        Ok(())
    }

    fn delete_ids(&self, tenant: TenantId, table: &TableName, ids: &[RecordId]) -> Result<()> {
        let removed = self.engine()?.table(tenant, table)?.remove_ids(ids)?;
        tracing::debug!(%tenant, %table, removed, "records deleted by id");
        Ok(())
    }

    fn destroy(&self) -> Result<()> {
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        match std::mem::replace(&mut *state, Lifecycle::Destroyed) {
            Lifecycle::Running(_) => {
                self.running.store(false, Ordering::SeqCst);
                tracing::info!(instance = self.instance, "memory record store destroyed");
                Ok(())
            }
            Lifecycle::Uninitialized => {
                *state = Lifecycle::Uninitialized;
                Err(StoreError::NotInitialized)
            }
            Lifecycle::Destroyed => Err(StoreError::Destroyed),
        }
    }
}
