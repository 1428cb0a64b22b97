//! Catalog data model: type tags, payload variants, the document envelope,
//! and the search result envelope.

pub mod document;
pub mod object_type;
pub mod payload;
pub mod search_result;

pub use document::{CatalogDocument, EncodeOptions};
pub use object_type::ObjectType;
pub use payload::{IndexProvider, ObjectPayload, Ontology, SchemaDomain, SchemaEntityType};
pub use search_result::SearchResult;
