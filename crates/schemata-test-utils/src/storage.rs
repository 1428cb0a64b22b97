//! Test store with operation tracing.
//!
//! Wraps [`MemoryCatalogStore`] and records every call for test assertions.
//! Failures and latency can be injected to exercise store-unavailable and
//! timeout paths.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use schemata_core::error::{Error, Result};
use schemata_core::{
    CatalogStore, DeleteStatus, MemoryCatalogStore, SearchHits, StoredDocument, StructuredQuery,
};
use serde_json::Value;

/// Record of a store operation for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    /// Put operation.
    Put {
        /// Requested id, if any.
        id: Option<String>,
    },
    /// Get operation.
    Get {
        /// Id that was read.
        id: String,
    },
    /// Multi-get operation.
    MultiGet {
        /// Ids that were read, in request order.
        ids: Vec<String>,
    },
    /// Update operation.
    Update {
        /// Id that was replaced.
        id: String,
    },
    /// Delete operation.
    Delete {
        /// Id that was deleted.
        id: String,
    },
    /// Bulk delete operation.
    BulkDelete {
        /// Ids that were deleted.
        ids: Vec<String>,
    },
    /// Search operation.
    Search {
        /// Number of filter clauses.
        filters: usize,
        /// Requested offset.
        from: usize,
        /// Requested page size.
        size: usize,
    },
}

/// In-memory catalog store with operation tracing.
///
/// Clones share documents, the operation log, and injected behavior.
#[derive(Debug, Clone, Default)]
pub struct RecordingStore {
    inner: MemoryCatalogStore,
    operations: Arc<Mutex<Vec<StoreOp>>>,
    fail_ids: Arc<Mutex<Vec<String>>>,
    latency: Arc<Mutex<Option<Duration>>>,
}

impl RecordingStore {
    /// Creates a new empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps an existing in-memory store.
    #[must_use]
    pub fn wrapping(inner: MemoryCatalogStore) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    /// Returns all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<StoreOp> {
        self.operations.lock().expect("lock").clone()
    }

    /// Clears recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().expect("lock").clear();
    }

    /// Injects a failure for ids with the given prefix. An empty prefix
    /// fails every call, searches included.
    pub fn inject_failure(&self, id_prefix: impl Into<String>) {
        self.fail_ids.lock().expect("lock").push(id_prefix.into());
    }

    /// Clears all injected failures.
    pub fn clear_failures(&self) {
        self.fail_ids.lock().expect("lock").clear();
    }

    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock().expect("lock") = Some(latency);
    }

    /// Removes injected latency.
    pub fn clear_latency(&self) {
        *self.latency.lock().expect("lock") = None;
    }

    /// Returns the number of stored documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len().expect("store lock")
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn record(&self, op: StoreOp) {
        self.operations.lock().expect("lock").push(op);
    }

    fn check_failure<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Result<()> {
        let fail_ids = self.fail_ids.lock().expect("lock");
        for id in ids {
            if fail_ids.iter().any(|p| id.starts_with(p.as_str())) {
                return Err(Error::storage(format!("injected failure for id: {id}")));
            }
        }
        Ok(())
    }

    async fn maybe_delay(&self) {
        let latency = *self.latency.lock().expect("lock");
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait::async_trait]
impl CatalogStore for RecordingStore {
    async fn put(&self, source: Value, id: Option<&str>) -> Result<String> {
        self.maybe_delay().await;
        self.check_failure([id.unwrap_or_default()])?;
        self.record(StoreOp::Put {
            id: id.map(str::to_string),
        });
        self.inner.put(source, id).await
    }

    async fn get(&self, id: &str) -> Result<Value> {
        self.maybe_delay().await;
        self.check_failure([id])?;
        self.record(StoreOp::Get { id: id.to_string() });
        self.inner.get(id).await
    }

    async fn multi_get(&self, ids: &[String]) -> Result<Vec<StoredDocument>> {
        self.maybe_delay().await;
        self.check_failure(ids.iter().map(String::as_str))?;
        self.record(StoreOp::MultiGet { ids: ids.to_vec() });
        self.inner.multi_get(ids).await
    }

    async fn update(&self, id: &str, source: Value) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure([id])?;
        self.record(StoreOp::Update { id: id.to_string() });
        self.inner.update(id, source).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.maybe_delay().await;
        self.check_failure([id])?;
        self.record(StoreOp::Delete { id: id.to_string() });
        self.inner.delete(id).await
    }

    async fn bulk_delete(&self, ids: &[String]) -> Result<BTreeMap<String, DeleteStatus>> {
        self.maybe_delay().await;
        self.check_failure(ids.iter().map(String::as_str))?;
        self.record(StoreOp::BulkDelete { ids: ids.to_vec() });
        self.inner.bulk_delete(ids).await
    }

    async fn search(&self, query: &StructuredQuery) -> Result<SearchHits> {
        self.maybe_delay().await;
        self.check_failure([""])?;
        self.record(StoreOp::Search {
            filters: query.filters.len(),
            from: query.from,
            size: query.size,
        });
        self.inner.search(query).await
    }
}
