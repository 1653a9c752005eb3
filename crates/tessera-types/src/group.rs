//! Record group descriptors.
//!
//! A [`RecordGroup`] names where one partition of a read's result set lives.
//! It is produced by a planning call and resolved later, possibly on another
//! worker, by the backend that produced it. The descriptor holds no live
//! connection state: the payload is an opaque encoding only the producing
//! backend interprets.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Opaque, serializable handle to one partition of a read's result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordGroup {
    backend: String,
    locations: Vec<String>,
    payload: Bytes,
}

impl RecordGroup {
    pub fn new(backend: impl Into<String>, locations: Vec<String>, payload: Bytes) -> Self {
        Self {
            backend: backend.into(),
            locations,
            payload,
        }
    }

    /// Id of the backend that produced (and can resolve) this group.
    pub fn backend(&self) -> &str {
        &self.backend
    }

    /// Hosts where the group's data is local, most preferred first.
    ///
    /// A distributed caller uses these hints to schedule resolution close to
    /// the data. Empty means "no preference".
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    /// Backend-specific encoding of the partition.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }
}
