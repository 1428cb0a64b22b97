//! Compiled domain artifacts.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

use crate::codec::structured::{ObjectBuilder, ToStructured};

/// A compiled domain: a name plus references that were verified to exist
/// when it was compiled. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainResource {
    name: String,
    entities: Vec<String>,
    created_at: DateTime<Utc>,
}

/// Schema endpoints derived from a domain name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainLinks {
    /// GraphQL schema endpoint.
    pub graphql: String,
    /// Index mapping endpoint.
    pub index: String,
    /// Ontology endpoint.
    pub ontology: String,
}

impl DomainResource {
    /// Creates a resource stamped with the current time.
    pub fn new(name: impl Into<String>, entities: Vec<String>) -> Self {
        Self {
            name: name.into(),
            entities,
            created_at: Utc::now(),
        }
    }

    /// Domain name; unique within the registry.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validated references, in the order the caller supplied them.
    #[must_use]
    pub fn entities(&self) -> &[String] {
        &self.entities
    }

    /// Compilation time.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the schema endpoints for this domain.
    #[must_use]
    pub fn links(&self) -> DomainLinks {
        let encoded = urlencoding::encode(&self.name);
        DomainLinks {
            graphql: format!("/domain/{encoded}/schema/graphql"),
            index: format!("/domain/{encoded}/schema/index"),
            ontology: format!("/domain/{encoded}/schema/ontology"),
        }
    }
}

impl ToStructured for DomainResource {
    fn to_structured(&self) -> Value {
        let links = self.links();
        ObjectBuilder::new()
            .field("schema", self.name.as_str())
            .field(
                "creation",
                self.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            )
            .field("entities", self.entities.clone())
            .field(
                "links",
                ObjectBuilder::new()
                    .field("graphql", links.graphql)
                    .field("index", links.index)
                    .field("ontology", links.ontology)
                    .build(),
            )
            .build()
    }
}
