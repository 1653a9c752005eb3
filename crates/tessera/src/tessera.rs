//! Main entry point for the Tessera SDK.
//!
//! The `Tessera` struct owns the record store backend and the read defaults
//! shared by every tenant handle. The backend is either injected explicitly
//! with [`Tessera::new`] or selected from configuration with
//! [`Tessera::open`].

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use tessera_config::{ConfigLoader, ReadConfig, TesseraConfig};
use tessera_store::{MEMORY_BACKEND_ID, MemoryRecordStore, RecordStore};
use tessera_types::{Record, RecordGroup, TenantId};

use crate::error::{Result, TesseraError};
use crate::tenant::TenantHandle;

/// Defaults applied to reads issued through tenant handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Partition hint passed to the planner.
    pub default_partitions: usize,
    /// Resolve groups on the rayon pool instead of sequentially.
    pub parallel: bool,
}

impl ReadOptions {
    pub fn with_partitions(mut self, partitions: usize) -> Self {
        self.default_partitions = partitions;
        self
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self::from(&ReadConfig::default())
    }
}

impl From<&ReadConfig> for ReadOptions {
    fn from(config: &ReadConfig) -> Self {
        Self {
            default_partitions: config.default_partitions,
            parallel: config.parallel,
        }
    }
}

struct TesseraInner {
    store: Arc<dyn RecordStore>,
    options: ReadOptions,
    closed: AtomicBool,
}

/// The main Tessera handle.
///
/// Cheap to clone; clones share the same backend.
///
/// # Example
///
/// ```
/// use tessera::{Tessera, TesseraConfig, TenantId, Record, TimeRange};
///
/// let db = Tessera::open(&TesseraConfig::default()).unwrap();
/// let tenant = db.tenant(TenantId::new(5));
///
/// tenant.create_table("events").unwrap();
/// tenant
///     .put(&mut [Record::with_id(TenantId::new(5), "events", "a", 100)])
///     .unwrap();
///
/// let records = tenant.read("events", TimeRange::ALL, None).unwrap();
/// assert_eq!(records.len(), 1);
/// db.close().unwrap();
/// ```
#[derive(Clone)]
pub struct Tessera {
    inner: Arc<TesseraInner>,
}

impl Tessera {
    /// Wraps an already initialized backend.
    pub fn new(store: Arc<dyn RecordStore>, options: ReadOptions) -> Self {
        tracing::info!(backend = store.backend_id(), ?options, "tessera started");
        Self {
            inner: Arc::new(TesseraInner {
                store,
                options,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Selects, initializes and wraps the backend named in the configuration.
    pub fn open(config: &TesseraConfig) -> Result<Self> {
        config.validate()?;
        let store = open_backend(&config.store.backend, config)?;
        Ok(Self::new(store, ReadOptions::from(&config.reads)))
    }

    /// Loads layered configuration rooted at `project_dir`, then opens it.
    pub fn open_project(project_dir: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigLoader::new()
            .with_project_dir(project_dir)
            .load()
            .map_err(TesseraError::ConfigLoad)?;
        Self::open(&config)
    }

    /// Returns a tenant-scoped handle.
    pub fn tenant(&self, id: TenantId) -> TenantHandle {
        TenantHandle::new(self.clone(), id)
    }

    /// The underlying backend.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.inner.store
    }

    pub fn options(&self) -> ReadOptions {
        self.inner.options
    }

    /// Destroys the backend. Only the first call has an effect.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.inner.store.destroy()?;
        tracing::info!(backend = self.inner.store.backend_id(), "tessera closed");
        Ok(())
    }
}

impl std::fmt::Debug for Tessera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tessera")
            .field("backend", &self.inner.store.backend_id())
            .field("options", &self.inner.options)
            .field("closed", &self.inner.closed.load(Ordering::SeqCst))
            .finish()
    }
}

fn open_backend(name: &str, config: &TesseraConfig) -> Result<Arc<dyn RecordStore>> {
    match name.trim() {
        MEMORY_BACKEND_ID => Ok(Arc::new(MemoryRecordStore::open(&config.store.properties)?)),
        other => Err(TesseraError::UnknownBackend(other.to_string())),
    }
}

/// Resolves every group and concatenates their records.
///
/// Groups are independent, so with `parallel` set they are resolved on the
/// rayon pool. Output order follows group order either way.
pub fn resolve_groups(
    store: &dyn RecordStore,
    groups: &[RecordGroup],
    parallel: bool,
) -> Result<Vec<Record>> {
    let resolve = |group: &RecordGroup| -> Result<Vec<Record>> {
        Ok(store
            .read_records(group)?
            .collect::<tessera_store::Result<Vec<_>>>()?)
    };

    let batches = if parallel && groups.len() > 1 {
        groups.par_iter().map(resolve).collect::<Result<Vec<_>>>()?
    } else {
        groups.iter().map(resolve).collect::<Result<Vec<_>>>()?
    };

    Ok(batches.into_iter().flatten().collect())
}
