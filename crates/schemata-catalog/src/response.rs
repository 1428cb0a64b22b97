//! Outbound response types.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use schemata_core::DeleteStatus;

use crate::codec::binary::{Readable, StreamInput, StreamOutput, Writeable};
use crate::codec::structured::{
    self, FromStructured, ObjectBuilder, ToStructured, required, skip_unknown, string,
    string_list,
};
use crate::domain::resource::DomainResource;
use crate::error::{CatalogError, Result};
use crate::model::document::{EncodeOptions, OBJECT_ID_FIELD};
use crate::model::payload::SchemaDomain;
use crate::model::search_result::SearchResult;
use crate::request::ENTITY_LIST_FIELD;

/// Structured field mapping deleted ids to their status.
pub const DELETE_RESPONSE_LIST_FIELD: &str = "deleteResponseList";

const NAME_FIELD: &str = "name";
const DESCRIPTION_FIELD: &str = "description";
const CATALOG_FIELD: &str = "catalog";
const DOMAIN_FIELD: &str = "domain";

/// Id of a created or updated object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdResponse {
    /// The object's id.
    pub object_id: String,
}

/// Returned by create.
pub type CreateObjectResponse = ObjectIdResponse;
/// Returned by update.
pub type UpdateObjectResponse = ObjectIdResponse;

impl ObjectIdResponse {
    /// Wraps an id.
    pub fn new(object_id: impl Into<String>) -> Self {
        Self {
            object_id: object_id.into(),
        }
    }
}

impl ToStructured for ObjectIdResponse {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(OBJECT_ID_FIELD, self.object_id.as_str())
            .build()
    }
}

impl FromStructured for ObjectIdResponse {
    fn from_structured(value: &Value) -> Result<Self> {
        const CONTEXT: &str = "objectIdResponse";
        let mut object_id = None;
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_FIELD => object_id = Some(string(value, field)?),
                _ => skip_unknown(CONTEXT, field),
            }
        }
        Ok(Self {
            object_id: required(object_id, OBJECT_ID_FIELD)?,
        })
    }
}

impl Writeable for ObjectIdResponse {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.object_id)
    }
}

impl Readable for ObjectIdResponse {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            object_id: input.read_string()?,
        })
    }
}

/// A page of objects plus how to present them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetObjectResponse {
    /// The fetched objects.
    pub result: SearchResult,
    /// Presentation options for the structured form.
    pub options: EncodeOptions,
}

impl GetObjectResponse {
    /// Renders the structured form with this response's options.
    ///
    /// # Errors
    ///
    /// Returns an error if any payload type has no registered codec.
    pub fn to_structured(&self) -> Result<Value> {
        self.result.to_structured(self.options)
    }
}

/// Per-id outcome of a delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectResponse {
    /// Status for each requested id.
    pub statuses: BTreeMap<String, DeleteStatus>,
}

fn parse_delete_status(value: &str) -> Result<DeleteStatus> {
    match value {
        "DELETED" => Ok(DeleteStatus::Deleted),
        "NOT_FOUND" => Ok(DeleteStatus::NotFound),
        other => Err(CatalogError::malformed(format!(
            "unknown delete status {other}"
        ))),
    }
}

const fn delete_status_ordinal(status: DeleteStatus) -> u32 {
    match status {
        DeleteStatus::Deleted => 0,
        DeleteStatus::NotFound => 1,
    }
}

impl ToStructured for DeleteObjectResponse {
    fn to_structured(&self) -> Value {
        let statuses: Map<String, Value> = self
            .statuses
            .iter()
            .map(|(id, status)| (id.clone(), Value::from(status.to_string())))
            .collect();
        ObjectBuilder::new()
            .field(DELETE_RESPONSE_LIST_FIELD, Value::Object(statuses))
            .build()
    }
}

impl FromStructured for DeleteObjectResponse {
    fn from_structured(value: &Value) -> Result<Self> {
        const CONTEXT: &str = "deleteObjectResponse";
        let mut statuses = None;
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                DELETE_RESPONSE_LIST_FIELD => {
                    let mut parsed = BTreeMap::new();
                    for (id, status) in structured::object(value, field)? {
                        parsed.insert(id.clone(), parse_delete_status(&string(status, id)?)?);
                    }
                    statuses = Some(parsed);
                }
                _ => skip_unknown(CONTEXT, field),
            }
        }
        Ok(Self {
            statuses: required(statuses, DELETE_RESPONSE_LIST_FIELD)?,
        })
    }
}

impl Writeable for DeleteObjectResponse {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        let len = u32::try_from(self.statuses.len())
            .map_err(|_| CatalogError::malformed("too many delete statuses"))?;
        out.write_vint(len);
        for (id, status) in &self.statuses {
            out.write_string(id)?;
            out.write_enum(delete_status_ordinal(*status));
        }
        Ok(())
    }
}

impl Readable for DeleteObjectResponse {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let mut statuses = BTreeMap::new();
        for _ in 0..input.read_vint()? {
            let id = input.read_string()?;
            let status = match input.read_enum()? {
                0 => DeleteStatus::Deleted,
                1 => DeleteStatus::NotFound,
                other => {
                    return Err(CatalogError::malformed(format!(
                        "unknown delete status ordinal {other}"
                    )));
                }
            };
            statuses.insert(id, status);
        }
        Ok(Self { statuses })
    }
}

/// Returned by domain creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDomainResponse {
    /// Id of the stored domain document (the domain name).
    pub object_id: String,
    /// Validated references, in caller order.
    pub entities: Vec<String>,
}

impl ToStructured for CreateDomainResponse {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(OBJECT_ID_FIELD, self.object_id.as_str())
            .field(ENTITY_LIST_FIELD, self.entities.clone())
            .build()
    }
}

impl FromStructured for CreateDomainResponse {
    fn from_structured(value: &Value) -> Result<Self> {
        const CONTEXT: &str = "createDomainResponse";
        let mut object_id = None;
        let mut entities = None;
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_FIELD => object_id = Some(string(value, field)?),
                ENTITY_LIST_FIELD => entities = Some(string_list(value, field)?),
                _ => skip_unknown(CONTEXT, field),
            }
        }
        Ok(Self {
            object_id: required(object_id, OBJECT_ID_FIELD)?,
            entities: required(entities, ENTITY_LIST_FIELD)?,
        })
    }
}

impl Writeable for CreateDomainResponse {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.object_id)?;
        out.write_string_list(&self.entities)
    }
}

impl Readable for CreateDomainResponse {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            object_id: input.read_string()?,
            entities: input.read_string_list()?,
        })
    }
}

/// A stored domain plus its compiled resource, when registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDomainResponse {
    /// Id of the domain document.
    pub object_id: String,
    /// The stored domain.
    pub domain: SchemaDomain,
    /// The compiled resource; absent if this process never compiled it.
    pub compiled: Option<Arc<DomainResource>>,
}

impl ToStructured for GetDomainResponse {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(OBJECT_ID_FIELD, self.object_id.as_str())
            .field(NAME_FIELD, self.domain.name.as_str())
            .field(ENTITY_LIST_FIELD, self.domain.entities.clone())
            .field_if_some(DESCRIPTION_FIELD, self.domain.description.as_deref())
            .field_if_some(CATALOG_FIELD, self.domain.catalog.clone())
            .field_if_some(
                DOMAIN_FIELD,
                self.compiled.as_ref().map(|resource| resource.to_structured()),
            )
            .build()
    }
}

/// The compiled resource is process-local and does not cross the wire.
impl Writeable for GetDomainResponse {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.object_id)?;
        out.write_string(&self.domain.name)?;
        out.write_string_list(&self.domain.entities)?;
        out.write_optional_string(self.domain.description.as_deref())?;
        out.write_optional_string_list(self.domain.catalog.as_deref())
    }
}

impl Readable for GetDomainResponse {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let object_id = input.read_string()?;
        let name = input.read_string()?;
        let entities = input.read_string_list()?;
        Ok(Self {
            object_id,
            domain: SchemaDomain {
                name,
                entities,
                description: input.read_optional_string()?,
                catalog: input.read_optional_string_list()?,
            },
            compiled: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn delete_response_uses_status_names() {
        let response = DeleteObjectResponse {
            statuses: BTreeMap::from([
                ("a".to_string(), DeleteStatus::Deleted),
                ("b".to_string(), DeleteStatus::NotFound),
            ]),
        };
        let value = response.to_structured();
        assert_eq!(
            value,
            json!({ "deleteResponseList": { "a": "DELETED", "b": "NOT_FOUND" } })
        );
        assert_eq!(DeleteObjectResponse::from_structured(&value).unwrap(), response);
        let bytes = response.to_bytes().unwrap();
        assert_eq!(DeleteObjectResponse::from_bytes(&bytes).unwrap(), response);
    }

    #[test]
    fn delete_response_requires_list() {
        let err = DeleteObjectResponse::from_structured(&json!({ "objectId2": "x" })).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload { .. }));
    }

    #[test]
    fn create_domain_response_shape() {
        let response = CreateDomainResponse {
            object_id: "schemaWithEntity".into(),
            entities: vec!["E1".into()],
        };
        assert_eq!(
            response.to_structured(),
            json!({ "objectId": "schemaWithEntity", "entityList": ["E1"] })
        );
    }

    #[test]
    fn get_domain_response_attaches_compiled_resource() {
        let mut domain = SchemaDomain::new("d", vec!["a".into()]);
        domain.description = Some("books".into());
        let response = GetDomainResponse {
            object_id: "d".into(),
            domain,
            compiled: Some(Arc::new(DomainResource::new("d", vec!["a".into()]))),
        };
        let value = response.to_structured();
        assert_eq!(value["name"], "d");
        assert_eq!(value["entityList"], json!(["a"]));
        assert_eq!(value["description"], "books");
        assert!(value.get("catalog").is_none());
        assert_eq!(value["domain"]["schema"], "d");

        let bytes = response.to_bytes().unwrap();
        let decoded = GetDomainResponse::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.domain, response.domain);
        assert!(decoded.compiled.is_none());
    }
}
