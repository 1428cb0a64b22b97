//! # schemata-core
//!
//! Core abstractions shared by the schemata catalog crates.
//!
//! - **Tenancy**: the isolation boundary every catalog document belongs to
//! - **Identifiers**: caller-chosen or generated object ids
//! - **Catalog Store Port**: the document-store contract plus an in-memory
//!   implementation
//! - **Structured Queries**: the filter DSL the store executes
//! - **Error Types**: shared error definitions and result types
//!
//! ## Example
//!
//! ```rust
//! use schemata_core::prelude::*;
//!
//! let tenant = TenantId::new("acme-corp").unwrap();
//! let store = MemoryCatalogStore::new();
//! let query = StructuredQuery {
//!     filters: vec![Clause::term("tenant", tenant.as_str())],
//!     size: 10,
//!     ..StructuredQuery::default()
//! };
//! # let _ = (store, query);
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod id;
pub mod observability;
pub mod query;
pub mod store;
pub mod tenant;

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust
/// use schemata_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::id::ObjectId;
    pub use crate::query::{
        Clause, SearchHit, SearchHits, SortOrder, SortSpec, StructuredQuery, TotalHitRelation,
    };
    pub use crate::store::{CatalogStore, DeleteStatus, MemoryCatalogStore, StoredDocument};
    pub use crate::tenant::TenantId;
}

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use id::ObjectId;
pub use observability::{LogFormat, catalog_span, domain_span, init_logging};
pub use query::{
    Clause, SearchHit, SearchHits, SortOrder, SortSpec, StructuredQuery, TotalHitRelation,
};
pub use store::{CatalogStore, DeleteStatus, MemoryCatalogStore, StoredDocument};
pub use tenant::{DEFAULT_TENANT, TenantId};
