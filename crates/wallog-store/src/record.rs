//! Record field maps.
//!
//! Shard records travel as plain JSON objects; [`RecordData`] wraps one
//! with the typed accessors the engine needs. Missing fields, JSON
//! nulls and wrong-typed values all read as absent - a corrupt optional
//! field must never abort a pagination loop.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One remote record as a JSON field map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordData {
    fields: Map<String, Value>,
}

impl RecordData {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self { fields: Map::new() }
    }

    /// Wrap a JSON object. Returns `None` for non-object values.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// Raw field value, if present.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// String field; `None` when absent, null or not a string.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Boolean field; `None` when absent, null or not a boolean.
    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.fields.get(name).and_then(Value::as_bool)
    }

    /// Integer field; `None` when absent, null or not an integer.
    #[must_use]
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.fields.get(name).and_then(Value::as_i64)
    }

    /// The field's canonical text form (see [`value_text`]); empty
    /// string when the field is absent.
    #[must_use]
    pub fn field_text(&self, name: &str) -> String {
        self.fields.get(name).map(value_text).unwrap_or_default()
    }

    /// Set a field.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.fields.insert(name.into(), value);
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.insert(name, value);
        self
    }

    /// Whether the field exists on the record (even as null).
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Iterate over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Unwrap into the underlying map.
    #[must_use]
    pub fn into_inner(self) -> Map<String, Value> {
        self.fields
    }
}

impl From<Map<String, Value>> for RecordData {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Canonical text form of a field value.
///
/// Null maps to the empty string, scalars to their literal text, and
/// anything structured to its JSON encoding. Diff detection compares
/// these forms, which is what makes `null`, a missing field and `""`
/// mutually equal, and the string `"1"` equal to the number `1`.
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
