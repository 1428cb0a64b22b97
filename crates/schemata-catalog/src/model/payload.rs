//! Payload variants.
//!
//! Each variant is an immutable record with a binary and a structured
//! encoding. [`ObjectPayload`] is the closed sum over all variants; the
//! registry maps each [`ObjectType`] to the codec for its variant.

use serde_json::Value;

use crate::codec::binary::{Readable, StreamInput, StreamOutput, Writeable};
use crate::codec::structured::{
    self, FromStructured, ObjectBuilder, ToStructured, optional_string, optional_string_list,
    required, skip_unknown, string, string_list,
};
use crate::error::Result;
use crate::model::object_type::ObjectType;
use crate::registry::PayloadVariant;

/// Placeholder for unset type and name fields.
pub const UNDEFINED: &str = "Undefined";

/// Placeholder for unset content.
pub const EMPTY_CONTENT: &str = "{}";

const TYPE_FIELD: &str = "type";
const NAME_FIELD: &str = "name";
const DESCRIPTION_FIELD: &str = "description";
const CATALOG_FIELD: &str = "catalog";
const CONTENT_FIELD: &str = "content";
const INDICES_FIELD: &str = "indices";
const ONTOLOGY_FIELD: &str = "ontology";
const NAMESPACE_FIELD: &str = "namespace";
const ENTITIES_FIELD: &str = "entities";

/// An entity-type definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntityType {
    /// Sub-type label (structured field `type`).
    pub kind: String,
    /// Display name.
    pub name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Catalogs this entity belongs to.
    pub catalog: Option<Vec<String>>,
    /// Raw SDL or JSON definition.
    pub content: String,
}

impl Default for SchemaEntityType {
    fn default() -> Self {
        Self {
            kind: UNDEFINED.to_string(),
            name: None,
            description: None,
            catalog: None,
            content: EMPTY_CONTENT.to_string(),
        }
    }
}

impl Writeable for SchemaEntityType {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.kind)?;
        out.write_optional_string(self.name.as_deref())?;
        out.write_optional_string(self.description.as_deref())?;
        out.write_optional_string_list(self.catalog.as_deref())?;
        out.write_string(&self.content)
    }
}

impl Readable for SchemaEntityType {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            kind: input.read_string()?,
            name: input.read_optional_string()?,
            description: input.read_optional_string()?,
            catalog: input.read_optional_string_list()?,
            content: input.read_string()?,
        })
    }
}

impl ToStructured for SchemaEntityType {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(TYPE_FIELD, self.kind.as_str())
            .field_if_some(NAME_FIELD, self.name.as_deref())
            .field_if_some(DESCRIPTION_FIELD, self.description.as_deref())
            .field_if_some(CATALOG_FIELD, self.catalog.clone())
            .field(CONTENT_FIELD, self.content.as_str())
            .build()
    }
}

impl FromStructured for SchemaEntityType {
    fn from_structured(value: &Value) -> Result<Self> {
        let mut parsed = Self::default();
        for (field, value) in structured::object(value, ObjectType::SchemaEntityType.tag())? {
            match field.as_str() {
                TYPE_FIELD => parsed.kind = string(value, field)?,
                NAME_FIELD => parsed.name = optional_string(value, field)?,
                DESCRIPTION_FIELD => parsed.description = optional_string(value, field)?,
                CATALOG_FIELD => parsed.catalog = optional_string_list(value, field)?,
                CONTENT_FIELD => parsed.content = string(value, field)?,
                _ => skip_unknown(ObjectType::SchemaEntityType.tag(), field),
            }
        }
        Ok(parsed)
    }
}

impl PayloadVariant for SchemaEntityType {
    const TYPE: ObjectType = ObjectType::SchemaEntityType;

    fn extract(payload: &ObjectPayload) -> Option<&Self> {
        match payload {
            ObjectPayload::SchemaEntityType(v) => Some(v),
            _ => None,
        }
    }
}

/// An index-provider descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexProvider {
    /// Sub-type label (structured field `type`).
    pub kind: String,
    /// Display name.
    pub name: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Indices the provider maps onto.
    pub indices: Option<Vec<String>>,
    /// Ontology the provider serves.
    pub ontology: String,
    /// Raw JSON mapping definition.
    pub content: String,
}

impl Default for IndexProvider {
    fn default() -> Self {
        Self {
            kind: UNDEFINED.to_string(),
            name: None,
            description: None,
            indices: None,
            ontology: UNDEFINED.to_string(),
            content: EMPTY_CONTENT.to_string(),
        }
    }
}

impl Writeable for IndexProvider {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.kind)?;
        out.write_optional_string(self.name.as_deref())?;
        out.write_optional_string(self.description.as_deref())?;
        out.write_optional_string_list(self.indices.as_deref())?;
        out.write_string(&self.ontology)?;
        out.write_string(&self.content)
    }
}

impl Readable for IndexProvider {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            kind: input.read_string()?,
            name: input.read_optional_string()?,
            description: input.read_optional_string()?,
            indices: input.read_optional_string_list()?,
            ontology: input.read_string()?,
            content: input.read_string()?,
        })
    }
}

impl ToStructured for IndexProvider {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(TYPE_FIELD, self.kind.as_str())
            .field_if_some(NAME_FIELD, self.name.as_deref())
            .field_if_some(DESCRIPTION_FIELD, self.description.as_deref())
            .field_if_some(INDICES_FIELD, self.indices.clone())
            .field(ONTOLOGY_FIELD, self.ontology.as_str())
            .field(CONTENT_FIELD, self.content.as_str())
            .build()
    }
}

impl FromStructured for IndexProvider {
    fn from_structured(value: &Value) -> Result<Self> {
        let mut parsed = Self::default();
        for (field, value) in structured::object(value, ObjectType::IndexProvider.tag())? {
            match field.as_str() {
                TYPE_FIELD => parsed.kind = string(value, field)?,
                NAME_FIELD => parsed.name = optional_string(value, field)?,
                DESCRIPTION_FIELD => parsed.description = optional_string(value, field)?,
                INDICES_FIELD => parsed.indices = optional_string_list(value, field)?,
                ONTOLOGY_FIELD => parsed.ontology = string(value, field)?,
                CONTENT_FIELD => parsed.content = string(value, field)?,
                _ => skip_unknown(ObjectType::IndexProvider.tag(), field),
            }
        }
        Ok(parsed)
    }
}

impl PayloadVariant for IndexProvider {
    const TYPE: ObjectType = ObjectType::IndexProvider;

    fn extract(payload: &ObjectPayload) -> Option<&Self> {
        match payload {
            ObjectPayload::IndexProvider(v) => Some(v),
            _ => None,
        }
    }
}

/// An ontology definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ontology {
    /// Sub-type label (structured field `type`).
    pub kind: String,
    /// Ontology name.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Namespaces the ontology spans.
    pub namespace: Option<Vec<String>>,
    /// Raw ontology definition.
    pub content: String,
}

impl Default for Ontology {
    fn default() -> Self {
        Self {
            kind: UNDEFINED.to_string(),
            name: UNDEFINED.to_string(),
            description: None,
            namespace: None,
            content: EMPTY_CONTENT.to_string(),
        }
    }
}

impl Writeable for Ontology {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.kind)?;
        out.write_string(&self.name)?;
        out.write_optional_string(self.description.as_deref())?;
        out.write_optional_string_list(self.namespace.as_deref())?;
        out.write_string(&self.content)
    }
}

impl Readable for Ontology {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            kind: input.read_string()?,
            name: input.read_string()?,
            description: input.read_optional_string()?,
            namespace: input.read_optional_string_list()?,
            content: input.read_string()?,
        })
    }
}

impl ToStructured for Ontology {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(TYPE_FIELD, self.kind.as_str())
            .field(NAME_FIELD, self.name.as_str())
            .field_if_some(DESCRIPTION_FIELD, self.description.as_deref())
            .field_if_some(NAMESPACE_FIELD, self.namespace.clone())
            .field(CONTENT_FIELD, self.content.as_str())
            .build()
    }
}

impl FromStructured for Ontology {
    fn from_structured(value: &Value) -> Result<Self> {
        let mut parsed = Self::default();
        for (field, value) in structured::object(value, ObjectType::Ontology.tag())? {
            match field.as_str() {
                TYPE_FIELD => parsed.kind = string(value, field)?,
                NAME_FIELD => parsed.name = string(value, field)?,
                DESCRIPTION_FIELD => parsed.description = optional_string(value, field)?,
                NAMESPACE_FIELD => parsed.namespace = optional_string_list(value, field)?,
                CONTENT_FIELD => parsed.content = string(value, field)?,
                _ => skip_unknown(ObjectType::Ontology.tag(), field),
            }
        }
        Ok(parsed)
    }
}

impl PayloadVariant for Ontology {
    const TYPE: ObjectType = ObjectType::Ontology;

    fn extract(payload: &ObjectPayload) -> Option<&Self> {
        match payload {
            ObjectPayload::Ontology(v) => Some(v),
            _ => None,
        }
    }
}

/// A domain: a named set of references to other catalog objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDomain {
    /// Domain name; also the document id.
    pub name: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Catalogs this domain belongs to.
    pub catalog: Option<Vec<String>>,
    /// Referenced object ids, in caller order.
    pub entities: Vec<String>,
}

impl SchemaDomain {
    /// Creates a domain payload with no description or catalog.
    pub fn new(name: impl Into<String>, entities: Vec<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            catalog: None,
            entities,
        }
    }
}

impl Writeable for SchemaDomain {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.name)?;
        out.write_optional_string(self.description.as_deref())?;
        out.write_optional_string_list(self.catalog.as_deref())?;
        out.write_string_list(&self.entities)
    }
}

impl Readable for SchemaDomain {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            name: input.read_string()?,
            description: input.read_optional_string()?,
            catalog: input.read_optional_string_list()?,
            entities: input.read_string_list()?,
        })
    }
}

impl ToStructured for SchemaDomain {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(NAME_FIELD, self.name.as_str())
            .field_if_some(DESCRIPTION_FIELD, self.description.as_deref())
            .field_if_some(CATALOG_FIELD, self.catalog.clone())
            .field(ENTITIES_FIELD, self.entities.clone())
            .build()
    }
}

impl FromStructured for SchemaDomain {
    fn from_structured(value: &Value) -> Result<Self> {
        let mut name = None;
        let mut description = None;
        let mut catalog = None;
        let mut entities = None;
        for (field, value) in structured::object(value, ObjectType::SchemaDomain.tag())? {
            match field.as_str() {
                NAME_FIELD => name = Some(string(value, field)?),
                DESCRIPTION_FIELD => description = optional_string(value, field)?,
                CATALOG_FIELD => catalog = optional_string_list(value, field)?,
                ENTITIES_FIELD => entities = Some(string_list(value, field)?),
                _ => skip_unknown(ObjectType::SchemaDomain.tag(), field),
            }
        }
        Ok(Self {
            name: required(name, NAME_FIELD)?,
            description,
            catalog,
            entities: required(entities, ENTITIES_FIELD)?,
        })
    }
}

impl PayloadVariant for SchemaDomain {
    const TYPE: ObjectType = ObjectType::SchemaDomain;

    fn extract(payload: &ObjectPayload) -> Option<&Self> {
        match payload {
            ObjectPayload::SchemaDomain(v) => Some(v),
            _ => None,
        }
    }
}

/// The payload of a catalog document, tagged by its [`ObjectType`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectPayload {
    /// See [`SchemaEntityType`].
    SchemaEntityType(SchemaEntityType),
    /// See [`IndexProvider`].
    IndexProvider(IndexProvider),
    /// See [`SchemaDomain`].
    SchemaDomain(SchemaDomain),
    /// See [`Ontology`].
    Ontology(Ontology),
}

impl ObjectPayload {
    /// Returns the type tag matching this payload.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        match self {
            Self::SchemaEntityType(_) => ObjectType::SchemaEntityType,
            Self::IndexProvider(_) => ObjectType::IndexProvider,
            Self::SchemaDomain(_) => ObjectType::SchemaDomain,
            Self::Ontology(_) => ObjectType::Ontology,
        }
    }

    /// Returns the display name, if the payload has one.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::SchemaEntityType(v) => v.name.as_deref(),
            Self::IndexProvider(v) => v.name.as_deref(),
            Self::SchemaDomain(v) => Some(&v.name),
            Self::Ontology(v) => Some(&v.name),
        }
    }

    /// Returns the domain payload, if this is one.
    #[must_use]
    pub const fn as_domain(&self) -> Option<&SchemaDomain> {
        match self {
            Self::SchemaDomain(v) => Some(v),
            _ => None,
        }
    }
}

impl From<SchemaEntityType> for ObjectPayload {
    fn from(value: SchemaEntityType) -> Self {
        Self::SchemaEntityType(value)
    }
}

impl From<IndexProvider> for ObjectPayload {
    fn from(value: IndexProvider) -> Self {
        Self::IndexProvider(value)
    }
}

impl From<SchemaDomain> for ObjectPayload {
    fn from(value: SchemaDomain) -> Self {
        Self::SchemaDomain(value)
    }
}

impl From<Ontology> for ObjectPayload {
    fn from(value: Ontology) -> Self {
        Self::Ontology(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CatalogError;
    use serde_json::json;

    #[test]
    fn entity_defaults_fill_missing_fields() {
        let parsed = SchemaEntityType::from_structured(&json!({"name": "Author"})).unwrap();
        assert_eq!(parsed.kind, UNDEFINED);
        assert_eq!(parsed.content, EMPTY_CONTENT);
        assert_eq!(parsed.name.as_deref(), Some("Author"));
    }

    #[test]
    fn unknown_payload_fields_are_skipped() {
        let parsed = IndexProvider::from_structured(&json!({
            "type": "mapping",
            "shards": 3,
            "ontology": "books",
        }))
        .unwrap();
        assert_eq!(parsed.kind, "mapping");
        assert_eq!(parsed.ontology, "books");
    }

    #[test]
    fn domain_requires_entities() {
        let err = SchemaDomain::from_structured(&json!({"name": "d"})).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload { .. }));

        let err = SchemaDomain::from_structured(&json!({"entities": []})).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload { .. }));
    }

    #[test]
    fn structured_output_omits_absent_optionals() {
        let entity = SchemaEntityType {
            name: Some("Author".into()),
            ..SchemaEntityType::default()
        };
        assert_eq!(
            entity.to_structured(),
            json!({"type": "Undefined", "name": "Author", "content": "{}"})
        );
    }

    #[test]
    fn ontology_binary_roundtrip() {
        let ontology = Ontology {
            kind: "graph".into(),
            name: "library".into(),
            description: Some("books and authors".into()),
            namespace: Some(vec!["lib".into()]),
            content: "type Book { id: ID! }".into(),
        };
        let bytes = ontology.to_bytes().unwrap();
        assert_eq!(Ontology::from_bytes(&bytes).unwrap(), ontology);
    }

    #[test]
    fn payload_reports_its_type() {
        let payload: ObjectPayload = SchemaDomain::new("d", vec![]).into();
        assert_eq!(payload.object_type(), ObjectType::SchemaDomain);
        assert_eq!(payload.name(), Some("d"));
        assert!(payload.as_domain().is_some());
    }
}
