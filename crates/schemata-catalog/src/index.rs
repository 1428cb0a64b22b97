//! Catalog index: typed access to the document store.
//!
//! Wraps a [`CatalogStore`] with envelope encoding and a per-call deadline.
//! Every store call is bounded by the configured operation timeout; an
//! elapsed deadline surfaces as [`CatalogError::Timeout`], never as a miss.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use schemata_core::{CatalogStore, DeleteStatus, SearchHits, StructuredQuery};

use crate::error::{CatalogError, Result};
use crate::model::document::{CatalogDocument, EncodeOptions};

/// Typed, deadline-bounded view over the document store.
#[derive(Clone)]
pub struct CatalogIndex {
    store: Arc<dyn CatalogStore>,
    timeout: Duration,
}

impl std::fmt::Debug for CatalogIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogIndex")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl CatalogIndex {
    /// Creates an index over `store` with a per-call deadline.
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: Future<Output = schemata_core::Result<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(CatalogError::from),
            Err(_) => {
                tracing::warn!(operation, timeout_ms = self.timeout.as_millis(), "store call timed out");
                Err(CatalogError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }

    /// Persists a new document, returning its id.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if `id` is taken, `Timeout` or `StoreUnavailable`
    /// on store failure.
    pub async fn create(&self, doc: &CatalogDocument, id: Option<&str>) -> Result<String> {
        let source = doc.to_structured(EncodeOptions::STORAGE)?;
        let id = self.bounded("put", self.store.put(source, id)).await?;
        tracing::debug!(id = %id, object_type = %doc.object_type(), "document created");
        Ok(id)
    }

    /// Fetches one document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent, or a decode error if the stored source
    /// is invalid.
    pub async fn get(&self, id: &str) -> Result<CatalogDocument> {
        let source = self
            .bounded("get", self.store.get(id))
            .await
            .inspect_err(|e| {
                if matches!(e, CatalogError::NotFound { .. }) {
                    tracing::warn!(id, "document not found");
                }
            })?;
        CatalogDocument::from_structured(&source, Some(id))
    }

    /// Fetches several documents in one round trip, omitting misses.
    ///
    /// # Errors
    ///
    /// Returns store failures or decode errors; misses are not errors.
    pub async fn multi_get(&self, ids: &[String]) -> Result<Vec<CatalogDocument>> {
        let found = self.bounded("multi_get", self.store.multi_get(ids)).await?;
        if found.len() < ids.len() {
            tracing::warn!(
                requested = ids.len(),
                found = found.len(),
                "multi-get returned fewer documents than requested"
            );
        }
        found
            .iter()
            .map(|hit| CatalogDocument::from_structured(&hit.source, Some(&hit.id)))
            .collect()
    }

    /// Replaces a stored document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the document does not exist.
    pub async fn update(&self, doc: &CatalogDocument) -> Result<()> {
        let source = doc.to_structured(EncodeOptions::STORAGE)?;
        self.bounded("update", self.store.update(&doc.id, source))
            .await
    }

    /// Deletes one document.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the document does not exist.
    pub async fn delete(&self, id: &str) -> Result<()> {
        self.bounded("delete", self.store.delete(id)).await
    }

    /// Deletes several documents in one call.
    ///
    /// # Errors
    ///
    /// Returns store failures.
    pub async fn bulk_delete(&self, ids: &[String]) -> Result<BTreeMap<String, DeleteStatus>> {
        self.bounded("bulk_delete", self.store.bulk_delete(ids))
            .await
    }

    /// Runs a structured query.
    ///
    /// # Errors
    ///
    /// Returns store failures.
    pub async fn search(&self, query: &StructuredQuery) -> Result<SearchHits> {
        self.bounded("search", self.store.search(query)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payload::SchemaEntityType;
    use chrono::Utc;
    use schemata_core::{MemoryCatalogStore, TenantId};

    fn index() -> CatalogIndex {
        CatalogIndex::new(Arc::new(MemoryCatalogStore::new()), Duration::from_secs(5))
    }

    fn doc() -> CatalogDocument {
        let now = Utc::now();
        CatalogDocument {
            id: String::new(),
            updated_at: now,
            created_at: now,
            tenant: TenantId::new("acme").unwrap(),
            access: vec!["User:alice".into()],
            payload: SchemaEntityType::default().into(),
        }
    }

    #[tokio::test]
    async fn create_then_get_uses_store_id() {
        let index = index();
        let id = index.create(&doc(), None).await.unwrap();
        let fetched = index.get(&id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.tenant.as_str(), "acme");
    }

    #[tokio::test]
    async fn duplicate_id_is_conflict() {
        let index = index();
        index.create(&doc(), Some("same")).await.unwrap();
        let err = index.create(&doc(), Some("same")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Conflict { .. }));
    }

    #[tokio::test]
    async fn missing_get_is_not_found() {
        let err = index().get("ghost").await.unwrap_err();
        assert!(matches!(err, CatalogError::NotFound { .. }));
    }
}
