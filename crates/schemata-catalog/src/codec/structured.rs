//! Structured (JSON) codec helpers.
//!
//! The structured form is field-named and forward compatible: readers walk
//! an object's fields in document order, pick out the names they know, and
//! log and skip the rest. Field order matters for the envelope, where the
//! first type-tagged field wins, so `serde_json` is built with
//! `preserve_order`.

use serde_json::{Map, Value};

use crate::error::{CatalogError, Result};

/// Types with a structured (JSON) representation.
pub trait ToStructured {
    /// Returns the structured form of `self`.
    fn to_structured(&self) -> Value;
}

/// Types that can be parsed from their structured representation.
pub trait FromStructured: Sized {
    /// Parses `Self` from a structured value.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` when required fields are absent or have
    /// the wrong shape.
    fn from_structured(value: &Value) -> Result<Self>;

    /// Parses `Self` from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `MalformedPayload` for invalid JSON or an invalid shape.
    fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_structured(&value)
    }
}

/// Returns the fields of a JSON object.
///
/// # Errors
///
/// Returns `MalformedPayload` if `value` is not an object.
pub fn object<'a>(value: &'a Value, context: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| CatalogError::malformed(format!("{context}: expected an object")))
}

/// Reads a string field value.
///
/// # Errors
///
/// Returns `MalformedPayload` if the value is not a string.
pub fn string(value: &Value, field: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CatalogError::malformed(format!("{field}: expected a string")))
}

/// Reads a nullable string field value.
///
/// # Errors
///
/// Returns `MalformedPayload` if the value is neither null nor a string.
pub fn optional_string(value: &Value, field: &str) -> Result<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    string(value, field).map(Some)
}

/// Reads a list of strings.
///
/// # Errors
///
/// Returns `MalformedPayload` if the value is not an array of strings.
pub fn string_list(value: &Value, field: &str) -> Result<Vec<String>> {
    value
        .as_array()
        .ok_or_else(|| CatalogError::malformed(format!("{field}: expected an array")))?
        .iter()
        .map(|item| string(item, field))
        .collect()
}

/// Reads a nullable list of strings.
///
/// # Errors
///
/// Returns `MalformedPayload` if the value is neither null nor an array of
/// strings.
pub fn optional_string_list(value: &Value, field: &str) -> Result<Option<Vec<String>>> {
    if value.is_null() {
        return Ok(None);
    }
    string_list(value, field).map(Some)
}

/// Reads an integer field value.
///
/// # Errors
///
/// Returns `MalformedPayload` if the value is not an integer.
pub fn long(value: &Value, field: &str) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| CatalogError::malformed(format!("{field}: expected an integer")))
}

/// Fails with `MalformedPayload` naming the absent field.
///
/// # Errors
///
/// Returns `MalformedPayload` when `value` is `None`.
pub fn required<T>(value: Option<T>, field: &str) -> Result<T> {
    value.ok_or_else(|| CatalogError::malformed(format!("{field} field absent")))
}

/// Logs a skipped field.
pub fn skip_unknown(context: &str, field: &str) {
    tracing::info!(context, field, "skipping unknown field");
}

/// Builds a JSON object, omitting `None` values.
#[derive(Debug, Default)]
pub struct ObjectBuilder {
    fields: Map<String, Value>,
}

impl ObjectBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(name.to_string(), value.into());
        self
    }

    /// Adds a field only when `value` is `Some`.
    #[must_use]
    pub fn field_if_some<V: Into<Value>>(self, name: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.field(name, value),
            None => self,
        }
    }

    /// Returns the built object.
    #[must_use]
    pub fn build(self) -> Value {
        Value::Object(self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_omits_none_and_keeps_order() {
        let value = ObjectBuilder::new()
            .field("z", "last-declared-first")
            .field_if_some::<String>("skip", None)
            .field("a", 1)
            .build();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn string_list_rejects_mixed_arrays() {
        assert!(string_list(&json!(["a", 1]), "catalog").is_err());
        assert_eq!(
            string_list(&json!(["a", "b"]), "catalog").unwrap(),
            vec!["a", "b"]
        );
    }

    #[test]
    fn nulls_read_as_absent() {
        assert_eq!(optional_string(&Value::Null, "name").unwrap(), None);
        assert_eq!(optional_string_list(&Value::Null, "catalog").unwrap(), None);
    }

    #[test]
    fn required_names_the_field() {
        let err = required::<String>(None, "entities").unwrap_err();
        assert_eq!(err.to_string(), "malformed payload: entities field absent");
    }
}
