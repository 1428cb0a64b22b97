//! The catalog document envelope.
//!
//! A [`CatalogDocument`] always carries a payload; its type is derived from
//! the payload, so the two cannot disagree. Both wire forms are implemented
//! here, independently:
//!
//! - **Binary**: id, updatedAt, createdAt, tenant, access, type, type again,
//!   then the payload as an optional value. Readers consume the type twice
//!   and decode the payload with the codec for the second read.
//! - **Structured**: `objectId` (when requested), `lastUpdatedTimeMs`,
//!   `createdTimeMs`, `tenant`, `access` (when requested and non-empty), and
//!   the payload nested under its type tag.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use schemata_core::TenantId;

use crate::codec::binary::{Readable, StreamInput, StreamOutput, Writeable};
use crate::codec::structured::{self, long, required, skip_unknown, string, string_list};
use crate::error::{CatalogError, Result};
use crate::model::object_type::ObjectType;
use crate::model::payload::ObjectPayload;
use crate::registry;

/// Structured field holding the document id.
pub const OBJECT_ID_FIELD: &str = "objectId";
/// Structured field holding the last update time in epoch millis.
pub const UPDATED_TIME_FIELD: &str = "lastUpdatedTimeMs";
/// Structured field holding the creation time in epoch millis.
pub const CREATED_TIME_FIELD: &str = "createdTimeMs";
/// Structured field holding the tenant.
pub const TENANT_FIELD: &str = "tenant";
/// Structured field holding the access list.
pub const ACCESS_FIELD: &str = "access";

const CONTEXT: &str = "catalogDocument";

/// Presentation options for the structured encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Emit `objectId`.
    pub include_id: bool,
    /// Emit `access` when non-empty.
    pub include_access: bool,
}

impl EncodeOptions {
    /// Options for the stored document source: no id, with access.
    pub const STORAGE: Self = Self {
        include_id: false,
        include_access: true,
    };

    /// Options for REST output: with id and access.
    pub const REST: Self = Self {
        include_id: true,
        include_access: true,
    };

    /// Returns these options with access lists hidden.
    #[must_use]
    pub const fn without_access(self) -> Self {
        Self {
            include_access: false,
            ..self
        }
    }
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self::STORAGE
    }
}

/// A stored catalog object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogDocument {
    /// Document id.
    pub id: String,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Creation time; immutable after first write.
    pub created_at: DateTime<Utc>,
    /// Owning tenant; immutable.
    pub tenant: TenantId,
    /// Access-group tokens captured from the writer.
    pub access: Vec<String>,
    /// Typed payload.
    pub payload: ObjectPayload,
}

impl CatalogDocument {
    /// Returns the document's type, derived from its payload.
    #[must_use]
    pub const fn object_type(&self) -> ObjectType {
        self.payload.object_type()
    }

    /// Renders the structured form.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload type has no registered codec.
    pub fn to_structured(&self, options: EncodeOptions) -> Result<Value> {
        let mut fields = Map::new();
        if options.include_id {
            fields.insert(OBJECT_ID_FIELD.to_string(), Value::from(self.id.as_str()));
        }
        fields.insert(
            UPDATED_TIME_FIELD.to_string(),
            Value::from(self.updated_at.timestamp_millis()),
        );
        fields.insert(
            CREATED_TIME_FIELD.to_string(),
            Value::from(self.created_at.timestamp_millis()),
        );
        fields.insert(TENANT_FIELD.to_string(), Value::from(self.tenant.as_str()));
        if options.include_access && !self.access.is_empty() {
            fields.insert(ACCESS_FIELD.to_string(), Value::from(self.access.clone()));
        }
        fields.insert(
            self.object_type().tag().to_string(),
            self.payload.to_structured_value()?,
        );
        Ok(Value::Object(fields))
    }

    /// Parses the structured form.
    ///
    /// `use_id` supplies the id for stored sources, which do not carry one.
    /// The first field whose name is a registered tag becomes the payload;
    /// any later tagged field and all unrecognized fields are skipped.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` when the id, either timestamp, or the
    /// payload is absent, and `UnknownType` when the only candidate payload
    /// fields carry unregistered tags.
    pub fn from_structured(value: &Value, use_id: Option<&str>) -> Result<Self> {
        let mut id = use_id.map(str::to_string);
        let mut updated_at = None;
        let mut created_at = None;
        let mut tenant = None;
        let mut access = Vec::new();
        let mut payload = TaggedPayload::default();

        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_FIELD => id = Some(string(value, field)?),
                UPDATED_TIME_FIELD => updated_at = Some(millis(long(value, field)?, field)?),
                CREATED_TIME_FIELD => created_at = Some(millis(long(value, field)?, field)?),
                TENANT_FIELD => tenant = Some(string(value, field)?),
                ACCESS_FIELD => access = string_list(value, field)?,
                tag => payload.offer(CONTEXT, tag, value)?,
            }
        }
        let payload = payload.finish()?;

        Ok(Self {
            id: required(id, OBJECT_ID_FIELD)?,
            updated_at: required(updated_at, UPDATED_TIME_FIELD)?,
            created_at: required(created_at, CREATED_TIME_FIELD)?,
            tenant: tenant.map_or_else(TenantId::default_tenant, TenantId::new_unchecked),
            access,
            payload,
        })
    }
}

/// Collects the first type-tagged payload among an object's fields.
#[derive(Default)]
pub(crate) struct TaggedPayload<'a> {
    payload: Option<ObjectPayload>,
    first_unknown: Option<&'a str>,
}

impl<'a> TaggedPayload<'a> {
    pub(crate) fn offer(&mut self, context: &str, field: &'a str, value: &Value) -> Result<()> {
        match registry::codec_for_tag(field) {
            Some(codec) if self.payload.is_none() => {
                self.payload = Some((codec.decode_structured)(value)?);
            }
            _ => {
                if self.payload.is_none() && self.first_unknown.is_none() {
                    self.first_unknown = Some(field);
                }
                skip_unknown(context, field);
            }
        }
        Ok(())
    }

    pub(crate) fn finish(self) -> Result<ObjectPayload> {
        match (self.payload, self.first_unknown) {
            (Some(payload), _) => Ok(payload),
            (None, Some(tag)) => Err(CatalogError::UnknownType {
                tag: tag.to_string(),
            }),
            (None, None) => Err(CatalogError::malformed("object type field absent")),
        }
    }
}

pub(crate) fn write_tagged_payload(out: &mut StreamOutput, payload: &ObjectPayload) -> Result<()> {
    out.write_enum(payload.object_type().ordinal());
    out.write_enum(payload.object_type().ordinal());
    out.write_optional(Some(payload))
}

pub(crate) fn read_tagged_payload(input: &mut StreamInput<'_>) -> Result<ObjectPayload> {
    let declared = read_object_type(input)?;
    let selector = read_object_type(input)?;
    if declared != selector {
        return Err(CatalogError::malformed(format!(
            "type mismatch: {declared} then {selector}"
        )));
    }
    let codec = registry::codec_for(selector)?;
    if !input.read_bool()? {
        return Err(CatalogError::malformed("object data field absent"));
    }
    (codec.decode_binary)(input)
}

fn millis(value: i64, field: &str) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value)
        .ok_or_else(|| CatalogError::malformed(format!("{field}: {value} is out of range")))
}

impl Writeable for CatalogDocument {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.id)?;
        out.write_instant(&self.updated_at);
        out.write_instant(&self.created_at);
        out.write_string(self.tenant.as_str())?;
        out.write_string_list(&self.access)?;
        write_tagged_payload(out, &self.payload)
    }
}

impl Readable for CatalogDocument {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let id = input.read_string()?;
        let updated_at = input.read_instant()?;
        let created_at = input.read_instant()?;
        let tenant = TenantId::new_unchecked(input.read_string()?);
        let access = input.read_string_list()?;
        let payload = read_tagged_payload(input)?;
        Ok(Self {
            id,
            updated_at,
            created_at,
            tenant,
            access,
            payload,
        })
    }
}

pub(crate) fn read_object_type(input: &mut StreamInput<'_>) -> Result<ObjectType> {
    let ordinal = input.read_enum()?;
    ObjectType::from_ordinal(ordinal)
        .ok_or_else(|| CatalogError::malformed(format!("unknown type ordinal {ordinal}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payload::{SchemaDomain, SchemaEntityType};
    use serde_json::json;

    fn sample() -> CatalogDocument {
        let at = DateTime::from_timestamp_millis(1_638_482_208_790).unwrap();
        CatalogDocument {
            id: "e1".into(),
            updated_at: at,
            created_at: at,
            tenant: TenantId::new("acme").unwrap(),
            access: vec!["User:alice".into()],
            payload: SchemaEntityType {
                name: Some("Author".into()),
                ..SchemaEntityType::default()
            }
            .into(),
        }
    }

    #[test]
    fn structured_layout_matches_wire_contract() {
        let value = sample().to_structured(EncodeOptions::REST).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(
            keys,
            vec![
                "objectId",
                "lastUpdatedTimeMs",
                "createdTimeMs",
                "tenant",
                "access",
                "schemaEntityType"
            ]
        );
        assert_eq!(value["lastUpdatedTimeMs"], json!(1_638_482_208_790_i64));
    }

    #[test]
    fn storage_form_omits_id() {
        let value = sample().to_structured(EncodeOptions::STORAGE).unwrap();
        assert!(value.get("objectId").is_none());
        let parsed = CatalogDocument::from_structured(&value, Some("e1")).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn access_can_be_hidden() {
        let value = sample()
            .to_structured(EncodeOptions::REST.without_access())
            .unwrap();
        assert!(value.get("access").is_none());
    }

    #[test]
    fn first_tagged_field_wins() {
        let value = json!({
            "objectId": "x",
            "lastUpdatedTimeMs": 1,
            "createdTimeMs": 1,
            "schemaDomain": {"name": "d", "entities": []},
            "schemaEntityType": {"name": "ignored"},
        });
        let parsed = CatalogDocument::from_structured(&value, None).unwrap();
        assert_eq!(parsed.object_type(), ObjectType::SchemaDomain);
        assert_eq!(parsed.payload, SchemaDomain::new("d", vec![]).into());
    }

    #[test]
    fn tenant_and_access_have_defaults() {
        let value = json!({
            "objectId": "x",
            "lastUpdatedTimeMs": 1,
            "createdTimeMs": 1,
            "ontology": {},
        });
        let parsed = CatalogDocument::from_structured(&value, None).unwrap();
        assert!(parsed.tenant.is_default());
        assert!(parsed.access.is_empty());
    }

    #[test]
    fn unregistered_tag_is_unknown_type() {
        let value = json!({
            "objectId": "x",
            "lastUpdatedTimeMs": 1,
            "createdTimeMs": 1,
            "graphSchema": {"name": "g"},
        });
        let err = CatalogDocument::from_structured(&value, None).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownType { ref tag } if tag == "graphSchema"));
    }

    #[test]
    fn missing_fields_are_malformed() {
        let no_payload = json!({"objectId": "x", "lastUpdatedTimeMs": 1, "createdTimeMs": 1});
        assert!(matches!(
            CatalogDocument::from_structured(&no_payload, None),
            Err(CatalogError::MalformedPayload { .. })
        ));

        let no_id = json!({"lastUpdatedTimeMs": 1, "createdTimeMs": 1, "ontology": {}});
        assert!(matches!(
            CatalogDocument::from_structured(&no_id, None),
            Err(CatalogError::MalformedPayload { .. })
        ));

        let no_created = json!({"objectId": "x", "lastUpdatedTimeMs": 1, "ontology": {}});
        assert!(matches!(
            CatalogDocument::from_structured(&no_created, None),
            Err(CatalogError::MalformedPayload { .. })
        ));
    }

    #[test]
    fn binary_writes_type_twice() {
        let bytes = sample().to_bytes().unwrap();
        let decoded = CatalogDocument::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn binary_none_type_is_unknown() {
        let mut out = StreamOutput::new();
        out.write_string("x").unwrap();
        let at = Utc::now();
        out.write_instant(&at);
        out.write_instant(&at);
        out.write_string("acme").unwrap();
        out.write_string_list(&[]).unwrap();
        out.write_enum(ObjectType::None.ordinal());
        out.write_enum(ObjectType::None.ordinal());
        out.write_bool(false);
        let err = CatalogDocument::from_bytes(&out.freeze()).unwrap_err();
        assert!(matches!(err, CatalogError::UnknownType { .. }));
    }

    #[test]
    fn binary_absent_payload_is_malformed() {
        let mut out = StreamOutput::new();
        out.write_string("x").unwrap();
        let at = Utc::now();
        out.write_instant(&at);
        out.write_instant(&at);
        out.write_string("acme").unwrap();
        out.write_string_list(&[]).unwrap();
        out.write_enum(ObjectType::Ontology.ordinal());
        out.write_enum(ObjectType::Ontology.ordinal());
        out.write_bool(false);
        let err = CatalogDocument::from_bytes(&out.freeze()).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload { .. }));
    }
}
