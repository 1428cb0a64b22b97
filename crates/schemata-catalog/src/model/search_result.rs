//! Paginated search result envelope.

use serde_json::Value;

use schemata_core::TotalHitRelation;

use crate::codec::binary::{Readable, StreamInput, StreamOutput, Writeable};
use crate::codec::structured::{self, long, required, skip_unknown, string};
use crate::error::{CatalogError, Result};
use crate::model::document::{CatalogDocument, EncodeOptions};

const START_INDEX_FIELD: &str = "startIndex";
const TOTAL_HITS_FIELD: &str = "totalHits";
const TOTAL_HIT_RELATION_FIELD: &str = "totalHitRelation";
/// Structured field holding the returned objects.
pub const OBJECT_LIST_FIELD: &str = "schemaObjectList";

const CONTEXT: &str = "searchResult";

/// One page of catalog documents.
///
/// `objects.len()` never exceeds `total_hits` or the requested page size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Offset of the first returned object.
    pub start_index: u64,
    /// Number of matching objects (see `total_hit_relation`).
    pub total_hits: u64,
    /// Whether `total_hits` is exact or a lower bound.
    pub total_hit_relation: TotalHitRelation,
    /// Returned objects, in result order.
    pub objects: Vec<CatalogDocument>,
}

impl SearchResult {
    /// Wraps a complete list of objects as an exact, unpaged result.
    #[must_use]
    pub fn from_objects(objects: Vec<CatalogDocument>) -> Self {
        Self {
            start_index: 0,
            total_hits: objects.len() as u64,
            total_hit_relation: TotalHitRelation::EqualTo,
            objects,
        }
    }

    /// Renders the structured form, encoding each object with `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if any object fails to encode.
    pub fn to_structured(&self, options: EncodeOptions) -> Result<Value> {
        let objects = self
            .objects
            .iter()
            .map(|doc| doc.to_structured(options))
            .collect::<Result<Vec<_>>>()?;
        Ok(structured::ObjectBuilder::new()
            .field(START_INDEX_FIELD, self.start_index)
            .field(TOTAL_HITS_FIELD, self.total_hits)
            .field(TOTAL_HIT_RELATION_FIELD, self.total_hit_relation.as_str())
            .field(OBJECT_LIST_FIELD, objects)
            .build())
    }

    /// Parses the structured form. Objects must carry their ids.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` for absent or invalid fields.
    pub fn from_structured(value: &Value) -> Result<Self> {
        let mut start_index = None;
        let mut total_hits = None;
        let mut relation = None;
        let mut objects = None;

        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                START_INDEX_FIELD => start_index = Some(unsigned(long(value, field)?, field)?),
                TOTAL_HITS_FIELD => total_hits = Some(unsigned(long(value, field)?, field)?),
                TOTAL_HIT_RELATION_FIELD => {
                    let wire = string(value, field)?;
                    relation = Some(TotalHitRelation::from_wire(&wire).ok_or_else(|| {
                        CatalogError::malformed(format!("{field}: unknown relation {wire}"))
                    })?);
                }
                OBJECT_LIST_FIELD => {
                    let items = value.as_array().ok_or_else(|| {
                        CatalogError::malformed(format!("{field}: expected an array"))
                    })?;
                    objects = Some(
                        items
                            .iter()
                            .map(|item| CatalogDocument::from_structured(item, None))
                            .collect::<Result<Vec<_>>>()?,
                    );
                }
                _ => skip_unknown(CONTEXT, field),
            }
        }

        Ok(Self {
            start_index: start_index.unwrap_or(0),
            total_hits: required(total_hits, TOTAL_HITS_FIELD)?,
            total_hit_relation: relation.unwrap_or_default(),
            objects: required(objects, OBJECT_LIST_FIELD)?,
        })
    }
}

fn unsigned(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| CatalogError::malformed(format!("{field}: negative value")))
}

fn relation_ordinal(relation: TotalHitRelation) -> u32 {
    match relation {
        TotalHitRelation::EqualTo => 0,
        TotalHitRelation::GreaterThanOrEqualTo => 1,
    }
}

impl Writeable for SearchResult {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_long(signed(self.start_index)?);
        out.write_long(signed(self.total_hits)?);
        out.write_enum(relation_ordinal(self.total_hit_relation));
        out.write_list(&self.objects)
    }
}

impl Readable for SearchResult {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let start_index = unsigned(input.read_long()?, START_INDEX_FIELD)?;
        let total_hits = unsigned(input.read_long()?, TOTAL_HITS_FIELD)?;
        let total_hit_relation = match input.read_enum()? {
            0 => TotalHitRelation::EqualTo,
            1 => TotalHitRelation::GreaterThanOrEqualTo,
            other => {
                return Err(CatalogError::malformed(format!(
                    "unknown total hit relation ordinal {other}"
                )));
            }
        };
        Ok(Self {
            start_index,
            total_hits,
            total_hit_relation,
            objects: input.read_list()?,
        })
    }
}

fn signed(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| CatalogError::internal(format!("{value} exceeds i64")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::payload::SchemaDomain;
    use chrono::DateTime;
    use schemata_core::TenantId;
    use serde_json::json;

    fn doc(id: &str) -> CatalogDocument {
        let at = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        CatalogDocument {
            id: id.into(),
            updated_at: at,
            created_at: at,
            tenant: TenantId::default_tenant(),
            access: vec![],
            payload: SchemaDomain::new(id, vec![]).into(),
        }
    }

    #[test]
    fn structured_uses_object_list_field() {
        let result = SearchResult::from_objects(vec![doc("a"), doc("b")]);
        let value = result.to_structured(EncodeOptions::REST).unwrap();
        assert_eq!(value["totalHits"], json!(2));
        assert_eq!(value["totalHitRelation"], json!("eq"));
        assert_eq!(value["schemaObjectList"][1]["objectId"], json!("b"));
        assert_eq!(SearchResult::from_structured(&value).unwrap(), result);
    }

    #[test]
    fn binary_keeps_lower_bound_relation() {
        let result = SearchResult {
            start_index: 10,
            total_hits: 10_000,
            total_hit_relation: TotalHitRelation::GreaterThanOrEqualTo,
            objects: vec![doc("a")],
        };
        let bytes = result.to_bytes().unwrap();
        assert_eq!(SearchResult::from_bytes(&bytes).unwrap(), result);
    }

    #[test]
    fn missing_object_list_is_malformed() {
        let err = SearchResult::from_structured(&json!({"totalHits": 0})).unwrap_err();
        assert!(matches!(err, CatalogError::MalformedPayload { .. }));
    }
}
