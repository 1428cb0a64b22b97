//! # schemata-catalog
//!
//! Typed schema-object catalog built on the schemata store port.
//!
//! This crate provides:
//!
//! - **Payload Registry**: one codec entry per object type; the document
//!   envelope stays closed over an open set of payload kinds
//! - **Dual Codecs**: a binary wire form and a structured (JSON) form for
//!   every document, request, and response
//! - **Domains**: reference-validated aggregates, compiled once into a
//!   process-wide registry
//! - **Search**: typed requests turned into structured store queries, with
//!   tenant and access filtering
//!
//! ## Document Shape
//!
//! ```text
//! {
//!   "objectId": "...",            # REST output only
//!   "lastUpdatedTimeMs": 1638482208790,
//!   "createdTimeMs": 1638482208790,
//!   "tenant": "__user__",
//!   "access": ["User:alice"],     # omitted when empty or hidden
//!   "<type tag>": { ... }         # exactly one payload
//! }
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use schemata_catalog::prelude::*;
//! use schemata_core::MemoryCatalogStore;
//!
//! let service = CatalogService::new(Arc::new(MemoryCatalogStore::new()), CatalogConfig::default());
//! let caller: Caller = User::new("alice").into();
//!
//! let book = service.create(&caller, CreateObjectRequest::new(SchemaEntityType::default())).await?;
//! let domain = service
//!     .create_domain(&caller, CreateDomainRequest::new("library", vec![book.object_id]))
//!     .await?;
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod access;
pub mod codec;
pub mod config;
pub mod domain;
pub mod error;
pub mod index;
pub mod model;
pub mod query_builder;
pub mod registry;
pub mod request;
pub mod response;
pub mod service;

// Re-export main types at crate root
pub use access::{AccessControl, Caller, CallerIdentity, RoleAccessControl, User};
pub use config::CatalogConfig;
pub use domain::{DomainCompiler, DomainLinks, DomainRegistry, DomainResource};
pub use error::{CatalogError, Result};
pub use index::CatalogIndex;
pub use model::{
    CatalogDocument, EncodeOptions, IndexProvider, ObjectPayload, ObjectType, Ontology,
    SchemaDomain, SchemaEntityType, SearchResult,
};
pub use query_builder::{SearchRequest, SearchScope};
pub use registry::{PayloadCodec, PayloadVariant};
pub use request::{
    CreateDomainRequest, CreateObjectRequest, DeleteObjectRequest, GetDomainRequest,
    GetObjectRequest, UpdateObjectRequest,
};
pub use response::{
    CreateDomainResponse, CreateObjectResponse, DeleteObjectResponse, GetDomainResponse,
    GetObjectResponse, ObjectIdResponse, UpdateObjectResponse,
};
pub use service::CatalogService;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::access::{Caller, User};
    pub use crate::codec::{FromStructured, Readable, ToStructured, Writeable};
    pub use crate::config::CatalogConfig;
    pub use crate::error::{CatalogError, Result};
    pub use crate::model::{
        CatalogDocument, IndexProvider, ObjectPayload, ObjectType, Ontology, SchemaDomain,
        SchemaEntityType,
    };
    pub use crate::query_builder::SearchRequest;
    pub use crate::request::{
        CreateDomainRequest, CreateObjectRequest, DeleteObjectRequest, GetDomainRequest,
        GetObjectRequest, UpdateObjectRequest,
    };
    pub use crate::service::CatalogService;
}
