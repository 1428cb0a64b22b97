//! Object type registry: maps a type tag to its payload codec.
//!
//! The envelope never names a concrete payload type. It asks the registry
//! for the [`PayloadCodec`] of a tag and calls through the codec's function
//! pointers. Registering a new variant means implementing [`PayloadVariant`]
//! for it and adding one `codec::<V>()` entry to the table below.

use serde_json::Value;

use crate::codec::binary::{Readable, StreamInput, StreamOutput, Writeable};
use crate::codec::structured::{FromStructured, ToStructured};
use crate::error::{CatalogError, Result};
use crate::model::object_type::ObjectType;
use crate::model::payload::{IndexProvider, ObjectPayload, Ontology, SchemaDomain, SchemaEntityType};

/// A concrete payload type with both encodings.
pub trait PayloadVariant:
    Writeable + Readable + ToStructured + FromStructured + Into<ObjectPayload>
{
    /// The tag this variant is registered under.
    const TYPE: ObjectType;

    /// Borrows the variant out of a payload, if the payload holds it.
    fn extract(payload: &ObjectPayload) -> Option<&Self>;
}

/// Encode/decode entry points for one registered payload type.
#[derive(Debug, Clone, Copy)]
pub struct PayloadCodec {
    /// The tag this codec handles.
    pub object_type: ObjectType,
    /// Reads a payload from the binary stream.
    pub decode_binary: fn(&mut StreamInput<'_>) -> Result<ObjectPayload>,
    /// Writes a payload to the binary stream.
    pub encode_binary: fn(&ObjectPayload, &mut StreamOutput) -> Result<()>,
    /// Parses a payload from its structured form.
    pub decode_structured: fn(&Value) -> Result<ObjectPayload>,
    /// Renders a payload in its structured form.
    pub encode_structured: fn(&ObjectPayload) -> Result<Value>,
}

static REGISTRY: [PayloadCodec; 4] = [
    codec::<SchemaEntityType>(),
    codec::<IndexProvider>(),
    codec::<SchemaDomain>(),
    codec::<Ontology>(),
];

const fn codec<V: PayloadVariant>() -> PayloadCodec {
    PayloadCodec {
        object_type: V::TYPE,
        decode_binary: decode_binary::<V>,
        encode_binary: encode_binary::<V>,
        decode_structured: decode_structured::<V>,
        encode_structured: encode_structured::<V>,
    }
}

fn decode_binary<V: PayloadVariant>(input: &mut StreamInput<'_>) -> Result<ObjectPayload> {
    V::read_from(input).map(Into::into)
}

fn encode_binary<V: PayloadVariant>(payload: &ObjectPayload, out: &mut StreamOutput) -> Result<()> {
    extract::<V>(payload)?.write_to(out)
}

fn decode_structured<V: PayloadVariant>(value: &Value) -> Result<ObjectPayload> {
    V::from_structured(value).map(Into::into)
}

fn encode_structured<V: PayloadVariant>(payload: &ObjectPayload) -> Result<Value> {
    Ok(extract::<V>(payload)?.to_structured())
}

fn extract<V: PayloadVariant>(payload: &ObjectPayload) -> Result<&V> {
    V::extract(payload).ok_or_else(|| {
        CatalogError::internal(format!(
            "{} codec given a {} payload",
            V::TYPE,
            payload.object_type()
        ))
    })
}

/// Returns the codec registered for a type.
///
/// # Errors
///
/// Returns `UnknownType` if nothing is registered for `object_type`
/// (always the case for [`ObjectType::None`]).
pub fn codec_for(object_type: ObjectType) -> Result<&'static PayloadCodec> {
    REGISTRY
        .iter()
        .find(|c| c.object_type == object_type)
        .ok_or_else(|| CatalogError::UnknownType {
            tag: object_type.tag().to_string(),
        })
}

/// Returns the codec registered under a structured field name, if any.
#[must_use]
pub fn codec_for_tag(tag: &str) -> Option<&'static PayloadCodec> {
    REGISTRY.iter().find(|c| c.object_type.tag() == tag)
}

/// Iterates every registered type.
pub fn registered_types() -> impl Iterator<Item = ObjectType> {
    REGISTRY.iter().map(|c| c.object_type)
}

/// Decodes a structured payload of the given type.
///
/// # Errors
///
/// Returns `UnknownType` for unregistered types, `MalformedPayload` when
/// required fields are absent.
pub fn decode(object_type: ObjectType, value: &Value) -> Result<ObjectPayload> {
    (codec_for(object_type)?.decode_structured)(value)
}

impl ObjectPayload {
    /// Renders the payload in its structured form via the registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload's type has no registered codec.
    pub fn to_structured_value(&self) -> Result<Value> {
        (codec_for(self.object_type())?.encode_structured)(self)
    }
}

impl Writeable for ObjectPayload {
    fn write_to(&self, out: &mut StreamOutput) -> Result<()> {
        (codec_for(self.object_type())?.encode_binary)(self, out)
    }
}
