//! Catalog store port: the document-store contract the catalog depends on.
//!
//! Documents are stored in their structured (JSON) form. The store knows
//! nothing about payload types; it only evaluates [`StructuredQuery`]
//! filters over document sources.
//!
//! ## Contract
//!
//! - `put` never overwrites: an existing id yields [`Error::Conflict`].
//! - `get`, `update` and `delete` report a missing id as [`Error::NotFound`].
//! - `multi_get` omits misses and never fails because of them.
//! - Timeouts are not applied here; callers bound each call themselves.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::error::{Error, Result};
use crate::id::ObjectId;
use crate::query::{SearchHit, SearchHits, StructuredQuery, TotalHitRelation, compare_for_sort};

/// Default bound on exact hit counting, matching the document store's
/// `track_total_hits` default.
pub const DEFAULT_TRACK_TOTAL_HITS_UP_TO: u64 = 10_000;

/// A document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    /// Document id.
    pub id: String,
    /// Structured document source.
    pub source: Value,
}

/// Outcome of deleting one id in a bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeleteStatus {
    /// The document was removed.
    Deleted,
    /// No document had this id.
    NotFound,
}

impl fmt::Display for DeleteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deleted => "DELETED",
            Self::NotFound => "NOT_FOUND",
        })
    }
}

/// Document store abstraction consumed by the catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    /// Creates a document, returning its id.
    ///
    /// Generates an id when `id` is `None`. Returns `Error::Conflict` if the
    /// id is already taken.
    async fn put(&self, source: Value, id: Option<&str>) -> Result<String>;

    /// Fetches a document source.
    ///
    /// Returns `Error::NotFound` if the id is absent.
    async fn get(&self, id: &str) -> Result<Value>;

    /// Fetches several documents in one call.
    ///
    /// Missing ids are omitted. Hits come back in request order.
    async fn multi_get(&self, ids: &[String]) -> Result<Vec<StoredDocument>>;

    /// Replaces an existing document's source.
    ///
    /// Returns `Error::NotFound` if the id is absent.
    async fn update(&self, id: &str, source: Value) -> Result<()>;

    /// Deletes a document.
    ///
    /// Returns `Error::NotFound` if the id is absent.
    async fn delete(&self, id: &str) -> Result<()>;

    /// Deletes several documents, reporting a status per id.
    async fn bulk_delete(&self, ids: &[String]) -> Result<BTreeMap<String, DeleteStatus>>;

    /// Executes a structured query.
    async fn search(&self, query: &StructuredQuery) -> Result<SearchHits>;
}

/// In-memory catalog store for tests and embedded use.
///
/// Thread-safe via `RwLock`. Default search order is insertion order.
/// Clones share the same underlying documents.
#[derive(Debug, Clone)]
pub struct MemoryCatalogStore {
    state: Arc<RwLock<MemoryState>>,
    track_total_hits_up_to: u64,
}

#[derive(Debug, Default)]
struct MemoryState {
    documents: HashMap<String, MemoryEntry>,
    next_seq: u64,
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    seq: u64,
    source: Value,
}

impl Default for MemoryCatalogStore {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            track_total_hits_up_to: DEFAULT_TRACK_TOTAL_HITS_UP_TO,
        }
    }
}

impl MemoryCatalogStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bound above which hit counts are reported as lower bounds.
    #[must_use]
    pub fn with_track_total_hits_up_to(mut self, bound: u64) -> Self {
        self.track_total_hits_up_to = bound;
        self
    }

    /// Returns the number of stored documents.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the lock is poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.documents.len())
    }

    /// Returns true if the store holds no documents.
    ///
    /// # Errors
    ///
    /// Returns `Error::Internal` if the lock is poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryState>> {
        self.state.read().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryState>> {
        self.state.write().map_err(|_| Error::Internal {
            message: "lock poisoned".into(),
        })
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalogStore {
    async fn put(&self, source: Value, id: Option<&str>) -> Result<String> {
        let id = match id {
            Some(id) => ObjectId::new(id)?.into_string(),
            None => ObjectId::generate().into_string(),
        };

        let mut state = self.write()?;
        if state.documents.contains_key(&id) {
            return Err(Error::Conflict { id });
        }
        let seq = state.next_seq;
        state.next_seq += 1;
        state.documents.insert(id.clone(), MemoryEntry { seq, source });
        drop(state);

        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Value> {
        self.read()?
            .documents
            .get(id)
            .map(|entry| entry.source.clone())
            .ok_or_else(|| Error::document_not_found(id))
    }

    async fn multi_get(&self, ids: &[String]) -> Result<Vec<StoredDocument>> {
        let state = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| {
                state.documents.get(id).map(|entry| StoredDocument {
                    id: id.clone(),
                    source: entry.source.clone(),
                })
            })
            .collect())
    }

    async fn update(&self, id: &str, source: Value) -> Result<()> {
        let mut state = self.write()?;
        let entry = state
            .documents
            .get_mut(id)
            .ok_or_else(|| Error::document_not_found(id))?;
        entry.source = source;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.write()?
            .documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::document_not_found(id))
    }

    async fn bulk_delete(&self, ids: &[String]) -> Result<BTreeMap<String, DeleteStatus>> {
        let mut state = self.write()?;
        Ok(ids
            .iter()
            .map(|id| {
                let status = if state.documents.remove(id).is_some() {
                    DeleteStatus::Deleted
                } else {
                    DeleteStatus::NotFound
                };
                (id.clone(), status)
            })
            .collect())
    }

    async fn search(&self, query: &StructuredQuery) -> Result<SearchHits> {
        let state = self.read()?;
        let mut matched: Vec<(&String, &MemoryEntry)> = state
            .documents
            .iter()
            .filter(|(_, entry)| query.matches(&entry.source))
            .collect();

        matched.sort_by(|(_, a), (_, b)| {
            let by_key = query.sort.as_ref().map_or(std::cmp::Ordering::Equal, |sort| {
                compare_for_sort(sort.key(&a.source), sort.key(&b.source), sort.order)
            });
            by_key.then(a.seq.cmp(&b.seq))
        });

        let total = matched.len() as u64;
        let (total_hits, relation) = if total > self.track_total_hits_up_to {
            (
                self.track_total_hits_up_to,
                TotalHitRelation::GreaterThanOrEqualTo,
            )
        } else {
            (total, TotalHitRelation::EqualTo)
        };

        let hits = matched
            .into_iter()
            .skip(query.from)
            .take(query.size)
            .map(|(id, entry)| SearchHit {
                id: id.clone(),
                source: entry.source.clone(),
            })
            .collect();

        Ok(SearchHits {
            hits,
            total_hits,
            relation,
        })
    }
}
