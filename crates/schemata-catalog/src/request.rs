//! Inbound request types.
//!
//! Each request has a structured form (as sent over REST) and a binary form
//! (as sent between nodes). Structured readers skip unknown fields.

use std::collections::BTreeMap;

use serde_json::Value;

use schemata_core::SortOrder;

use crate::codec::binary::{Readable, StreamInput, StreamOutput, Writeable};
use crate::codec::structured::{
    self, FromStructured, ObjectBuilder, ToStructured, optional_string, optional_string_list,
    required, skip_unknown, string, string_list,
};
use crate::error::{CatalogError, Result};
use crate::model::document::{
    OBJECT_ID_FIELD, TaggedPayload, read_object_type, read_tagged_payload, write_tagged_payload,
};
use crate::model::object_type::ObjectType;
use crate::model::payload::ObjectPayload;
use crate::query_builder::SearchRequest;

/// Structured field listing object ids.
pub const OBJECT_ID_LIST_FIELD: &str = "objectIdList";
/// Structured field listing a domain's referenced ids.
pub const ENTITY_LIST_FIELD: &str = "entityList";

const OBJECT_TYPE_FIELD: &str = "objectType";
const FROM_INDEX_FIELD: &str = "fromIndex";
const MAX_ITEMS_FIELD: &str = "maxItems";
const SORT_FIELD_FIELD: &str = "sortField";
const SORT_ORDER_FIELD: &str = "sortOrder";
const FILTER_PARAM_LIST_FIELD: &str = "filterParamList";
const DESCRIPTION_FIELD: &str = "description";
const CATALOG_FIELD: &str = "catalog";

/// Creates a catalog object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateObjectRequest {
    /// Caller-chosen id; generated when absent.
    pub object_id: Option<String>,
    /// The object to store.
    pub payload: ObjectPayload,
}

impl CreateObjectRequest {
    /// Creates a request with a generated id.
    pub fn new(payload: impl Into<ObjectPayload>) -> Self {
        Self {
            object_id: None,
            payload: payload.into(),
        }
    }

    /// Sets the object id.
    #[must_use]
    pub fn with_id(mut self, object_id: impl Into<String>) -> Self {
        self.object_id = Some(object_id.into());
        self
    }

    /// Parses the structured form. `default_id` is used when the body has
    /// no `objectId`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownType` or `MalformedPayload` when no registered
    /// payload field is present.
    pub fn parse(value: &Value, default_id: Option<&str>) -> Result<Self> {
        const CONTEXT: &str = "createObjectRequest";
        let mut object_id = default_id.map(str::to_string);
        let mut payload = TaggedPayload::default();
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_FIELD => object_id = Some(string(value, field)?),
                tag => payload.offer(CONTEXT, tag, value)?,
            }
        }
        Ok(Self {
            object_id,
            payload: payload.finish()?,
        })
    }

    /// Renders the structured form.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload type has no registered codec.
    pub fn to_structured(&self) -> Result<Value> {
        Ok(ObjectBuilder::new()
            .field_if_some(OBJECT_ID_FIELD, self.object_id.as_deref())
            .field(self.payload.object_type().tag(), self.payload.to_structured_value()?)
            .build())
    }
}

impl FromStructured for CreateObjectRequest {
    fn from_structured(value: &Value) -> Result<Self> {
        Self::parse(value, None)
    }
}

impl Writeable for CreateObjectRequest {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_optional_string(self.object_id.as_deref())?;
        write_tagged_payload(out, &self.payload)
    }
}

impl Readable for CreateObjectRequest {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            object_id: input.read_optional_string()?,
            payload: read_tagged_payload(input)?,
        })
    }
}

/// Replaces a catalog object's payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateObjectRequest {
    /// Id of the object to update.
    pub object_id: String,
    /// The replacement payload; must have the stored object's type.
    pub payload: ObjectPayload,
}

impl UpdateObjectRequest {
    /// Creates an update request.
    pub fn new(object_id: impl Into<String>, payload: impl Into<ObjectPayload>) -> Self {
        Self {
            object_id: object_id.into(),
            payload: payload.into(),
        }
    }

    /// Parses the structured form. A `path_id` overrides any `objectId` in
    /// the body.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` when no id is available, and the payload
    /// errors of [`CreateObjectRequest::parse`].
    pub fn parse(value: &Value, path_id: Option<&str>) -> Result<Self> {
        const CONTEXT: &str = "updateObjectRequest";
        let mut object_id = None;
        let mut payload = TaggedPayload::default();
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_FIELD => object_id = Some(string(value, field)?),
                tag => payload.offer(CONTEXT, tag, value)?,
            }
        }
        let object_id = path_id.map(str::to_string).or(object_id);
        Ok(Self {
            object_id: required(object_id, OBJECT_ID_FIELD)?,
            payload: payload.finish()?,
        })
    }

    /// Renders the structured form.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload type has no registered codec.
    pub fn to_structured(&self) -> Result<Value> {
        Ok(ObjectBuilder::new()
            .field(OBJECT_ID_FIELD, self.object_id.as_str())
            .field(self.payload.object_type().tag(), self.payload.to_structured_value()?)
            .build())
    }
}

impl FromStructured for UpdateObjectRequest {
    fn from_structured(value: &Value) -> Result<Self> {
        Self::parse(value, None)
    }
}

impl Writeable for UpdateObjectRequest {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.object_id)?;
        write_tagged_payload(out, &self.payload)
    }
}

impl Readable for UpdateObjectRequest {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            object_id: input.read_string()?,
            payload: read_tagged_payload(input)?,
        })
    }
}

/// Fetches objects by id, or searches when no ids are given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetObjectRequest {
    /// Ids to fetch, deduplicated, in request order.
    pub object_ids: Vec<String>,
    /// Search parameters; used only when `object_ids` is empty.
    pub search: SearchRequest,
}

impl GetObjectRequest {
    /// Fetches the given ids.
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            object_ids: dedup(ids.into_iter().map(Into::into)),
            search: SearchRequest::default(),
        }
    }

    /// Runs a search.
    #[must_use]
    pub fn search(search: SearchRequest) -> Self {
        Self {
            object_ids: Vec::new(),
            search,
        }
    }
}

fn dedup(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}

/// Reads a non-negative count written either as a number or as a string.
fn count(value: &Value, field: &str) -> Result<usize> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| {
        CatalogError::malformed(format!("{field}: expected a non-negative integer"))
    })
}

fn object_types(value: &Value, field: &str) -> Result<Vec<ObjectType>> {
    let tags: Vec<String> = match value {
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => string_list(value, field)?,
    };
    tags.iter().map(|tag| tag.parse()).collect()
}

/// Reads one type-filter entry; the `none` sentinel is not a searchable type.
fn read_filter_type(input: &mut StreamInput<'_>) -> Result<ObjectType> {
    match read_object_type(input)? {
        ObjectType::None => Err(CatalogError::UnknownType {
            tag: ObjectType::None.tag().to_string(),
        }),
        object_type => Ok(object_type),
    }
}

fn filter_params(value: &Value, field: &str) -> Result<BTreeMap<String, String>> {
    structured::object(value, field)?
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(_) | Value::Bool(_) => value.to_string(),
                _ => {
                    return Err(CatalogError::malformed(format!(
                        "{field}.{key}: expected a scalar"
                    )));
                }
            };
            Ok((key.clone(), value))
        })
        .collect()
}

impl FromStructured for GetObjectRequest {
    fn from_structured(value: &Value) -> Result<Self> {
        const CONTEXT: &str = "getObjectRequest";
        let mut request = Self::default();
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_LIST_FIELD => {
                    request.object_ids = dedup(string_list(value, field)?.into_iter());
                }
                OBJECT_TYPE_FIELD => request.search.types = object_types(value, field)?,
                FROM_INDEX_FIELD => request.search.from_index = count(value, field)?,
                MAX_ITEMS_FIELD => request.search.max_items = Some(count(value, field)?),
                SORT_FIELD_FIELD => request.search.sort_field = optional_string(value, field)?,
                SORT_ORDER_FIELD => {
                    let order: SortOrder = string(value, field)?.parse()?;
                    request.search.sort_order = Some(order);
                }
                FILTER_PARAM_LIST_FIELD => request.search.filters = filter_params(value, field)?,
                _ => skip_unknown(CONTEXT, field),
            }
        }
        Ok(request)
    }
}

impl ToStructured for GetObjectRequest {
    fn to_structured(&self) -> Value {
        let search = &self.search;
        let types: Vec<&str> = search.types.iter().map(|t| t.tag()).collect();
        let filters: serde_json::Map<String, Value> = search
            .filters
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.as_str())))
            .collect();
        ObjectBuilder::new()
            .field_if_some(
                OBJECT_ID_LIST_FIELD,
                (!self.object_ids.is_empty()).then(|| self.object_ids.clone()),
            )
            .field_if_some(OBJECT_TYPE_FIELD, (!types.is_empty()).then_some(types))
            .field(FROM_INDEX_FIELD, search.from_index)
            .field_if_some(MAX_ITEMS_FIELD, search.max_items)
            .field_if_some(SORT_FIELD_FIELD, search.sort_field.as_deref())
            .field_if_some(SORT_ORDER_FIELD, search.sort_order.map(|o| o.to_string()))
            .field_if_some(
                FILTER_PARAM_LIST_FIELD,
                (!filters.is_empty()).then_some(Value::Object(filters)),
            )
            .build()
    }
}

fn to_u32(value: usize, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| CatalogError::malformed(format!("{field}: {value} too large")))
}

const fn sort_order_ordinal(order: SortOrder) -> u32 {
    match order {
        SortOrder::Asc => 0,
        SortOrder::Desc => 1,
    }
}

impl Writeable for GetObjectRequest {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        let search = &self.search;
        out.write_string_list(&self.object_ids)?;
        out.write_vint(to_u32(search.types.len(), OBJECT_TYPE_FIELD)?);
        for object_type in &search.types {
            out.write_enum(object_type.ordinal());
        }
        out.write_vint(to_u32(search.from_index, FROM_INDEX_FIELD)?);
        out.write_bool(search.max_items.is_some());
        if let Some(max_items) = search.max_items {
            out.write_vint(to_u32(max_items, MAX_ITEMS_FIELD)?);
        }
        out.write_optional_string(search.sort_field.as_deref())?;
        out.write_bool(search.sort_order.is_some());
        if let Some(order) = search.sort_order {
            out.write_enum(sort_order_ordinal(order));
        }
        out.write_vint(to_u32(search.filters.len(), FILTER_PARAM_LIST_FIELD)?);
        for (key, value) in &search.filters {
            out.write_string(key)?;
            out.write_string(value)?;
        }
        Ok(())
    }
}

impl Readable for GetObjectRequest {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        let object_ids = input.read_string_list()?;
        let type_count = input.read_vint()?;
        let types = (0..type_count)
            .map(|_| read_filter_type(input))
            .collect::<Result<Vec<_>>>()?;
        let from_index = input.read_vint()? as usize;
        let max_items = if input.read_bool()? {
            Some(input.read_vint()? as usize)
        } else {
            None
        };
        let sort_field = input.read_optional_string()?;
        let sort_order = if input.read_bool()? {
            Some(match input.read_enum()? {
                0 => SortOrder::Asc,
                1 => SortOrder::Desc,
                other => {
                    return Err(CatalogError::malformed(format!(
                        "unknown sort order ordinal {other}"
                    )));
                }
            })
        } else {
            None
        };
        let mut filters = BTreeMap::new();
        for _ in 0..input.read_vint()? {
            let key = input.read_string()?;
            filters.insert(key, input.read_string()?);
        }
        Ok(Self {
            object_ids,
            search: SearchRequest {
                from_index,
                max_items,
                types,
                sort_field,
                sort_order,
                filters,
            },
        })
    }
}

/// Deletes one or more objects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteObjectRequest {
    /// Ids to delete, deduplicated, in request order.
    pub object_ids: Vec<String>,
}

impl DeleteObjectRequest {
    /// Deletes the given ids.
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            object_ids: dedup(ids.into_iter().map(Into::into)),
        }
    }
}

impl FromStructured for DeleteObjectRequest {
    fn from_structured(value: &Value) -> Result<Self> {
        const CONTEXT: &str = "deleteObjectRequest";
        let mut object_ids = None;
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_LIST_FIELD => object_ids = Some(string_list(value, field)?),
                OBJECT_ID_FIELD => object_ids = Some(vec![string(value, field)?]),
                _ => skip_unknown(CONTEXT, field),
            }
        }
        Ok(Self::new(required(object_ids, OBJECT_ID_LIST_FIELD)?))
    }
}

impl ToStructured for DeleteObjectRequest {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(OBJECT_ID_LIST_FIELD, self.object_ids.clone())
            .build()
    }
}

impl Writeable for DeleteObjectRequest {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string_list(&self.object_ids)
    }
}

impl Readable for DeleteObjectRequest {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            object_ids: input.read_string_list()?,
        })
    }
}

/// Compiles and stores a domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDomainRequest {
    /// Domain name; also the id of the stored domain document.
    pub name: String,
    /// Referenced object ids, in caller order.
    pub entities: Vec<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Catalogs the domain belongs to.
    pub catalog: Option<Vec<String>>,
}

impl CreateDomainRequest {
    /// Creates a domain request.
    pub fn new(name: impl Into<String>, entities: Vec<String>) -> Self {
        Self {
            name: name.into(),
            entities,
            description: None,
            catalog: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl FromStructured for CreateDomainRequest {
    fn from_structured(value: &Value) -> Result<Self> {
        const CONTEXT: &str = "createDomainRequest";
        let mut name = None;
        let mut entities = Vec::new();
        let mut description = None;
        let mut catalog = None;
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_FIELD => name = Some(string(value, field)?),
                ENTITY_LIST_FIELD => entities = string_list(value, field)?,
                DESCRIPTION_FIELD => description = optional_string(value, field)?,
                CATALOG_FIELD => catalog = optional_string_list(value, field)?,
                _ => skip_unknown(CONTEXT, field),
            }
        }
        Ok(Self {
            name: required(name, OBJECT_ID_FIELD)?,
            entities,
            description,
            catalog,
        })
    }
}

impl ToStructured for CreateDomainRequest {
    fn to_structured(&self) -> Value {
        ObjectBuilder::new()
            .field(OBJECT_ID_FIELD, self.name.as_str())
            .field(ENTITY_LIST_FIELD, self.entities.clone())
            .field_if_some(DESCRIPTION_FIELD, self.description.as_deref())
            .field_if_some(CATALOG_FIELD, self.catalog.clone())
            .build()
    }
}

impl Writeable for CreateDomainRequest {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.name)?;
        out.write_string_list(&self.entities)?;
        out.write_optional_string(self.description.as_deref())?;
        out.write_optional_string_list(self.catalog.as_deref())
    }
}

impl Readable for CreateDomainRequest {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            name: input.read_string()?,
            entities: input.read_string_list()?,
            description: input.read_optional_string()?,
            catalog: input.read_optional_string_list()?,
        })
    }
}

/// Fetches a domain by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDomainRequest {
    /// Domain name.
    pub name: String,
}

impl GetDomainRequest {
    /// Creates a request for the named domain.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl FromStructured for GetDomainRequest {
    fn from_structured(value: &Value) -> Result<Self> {
        const CONTEXT: &str = "getDomainRequest";
        let mut name = None;
        for (field, value) in structured::object(value, CONTEXT)? {
            match field.as_str() {
                OBJECT_ID_FIELD => name = Some(string(value, field)?),
                _ => skip_unknown(CONTEXT, field),
            }
        }
        Ok(Self {
            name: required(name, OBJECT_ID_FIELD)?,
        })
    }
}

impl Writeable for GetDomainRequest {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        out.write_string(&self.name)
    }
}

impl Readable for GetDomainRequest {
    fn read_from(input: &mut StreamInput<'_>) -> Result<Self> {
        Ok(Self {
            name: input.read_string()?,
        })
    }
}
