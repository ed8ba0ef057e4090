//! Core data model types.
//!
//! Record-like input is expressed as a tagged [`Value`] tree, so any JSON-like source can be
//! handed to the batcher. A finished upload is summarized by [`DatasetMetadata`].

use std::fmt;

use serde::Serialize;

use crate::error::{UploadError, UploadResult};

/// A single JSON-like value in an input record.
///
/// Maps keep their keys in insertion order; that order decides column order when a schema
/// is inferred from records.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// Boolean.
    Bool(bool),
    /// 64-bit signed integer.
    Int(i64),
    /// Unsigned integer above `i64::MAX`.
    UInt(u64),
    /// 64-bit floating point number.
    Float(f64),
    /// UTF-8 string.
    Str(String),
    /// Ordered list of values.
    List(Vec<Value>),
    /// String-keyed mapping, in insertion order.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Look up a key if this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Remove a key if this value is a map, returning the removed value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        match self {
            Value::Map(entries) => {
                let idx = entries.iter().position(|(k, _)| k == key)?;
                Some(entries.remove(idx).1)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Value::Int(i),
                (None, Some(u)) => Value::UInt(u),
                (None, None) => n.as_f64().map(Value::Float).unwrap_or(Value::Null),
            },
            serde_json::Value::String(s) => Value::Str(s),
            serde_json::Value::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(map) => {
                Value::Map(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        match v {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::UInt(u) => serde_json::Value::from(*u),
            // Non-finite floats have no JSON form and become null.
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => serde_json::Value::Array(items.iter().map(Into::into).collect()),
            Value::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Value::UInt(v), Value::Int)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Collect `(key, value)` pairs into a [`Value::Map`].
impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Map(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Summary of a completed upload.
///
/// Immutable once constructed; [`DatasetMetadata::new`] rejects empty fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetMetadata {
    name: String,
    id: String,
    url: String,
    size: usize,
}

impl DatasetMetadata {
    /// Create metadata, failing with a validation error if any text field is empty.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<String>,
        url: impl Into<String>,
        size: usize,
    ) -> UploadResult<Self> {
        let name = name.into();
        let id = id.into();
        let url = url.into();
        for (field, value) in [("name", &name), ("id", &id), ("url", &url)] {
            if value.trim().is_empty() {
                return Err(UploadError::validation(format!(
                    "Field '{field}' must be a non-empty string. Got: '{value}'"
                )));
            }
        }
        Ok(Self { name, id, url, size })
    }

    /// Dataset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server-assigned dataset id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Dashboard URL for the dataset.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of rows persisted.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl fmt::Display for DatasetMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dataset '{}' (id={}, rows={}) at {}",
            self.name, self.id, self.size, self.url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{DatasetMetadata, Value};

    #[test]
    fn json_conversion_keeps_key_order() {
        let json = serde_json::json!({"b": 1, "a": [1.5, null], "c": {"x": "y"}});
        let v = Value::from(json.clone());
        match &v {
            Value::Map(entries) => {
                let keys: Vec<&str> = entries.iter().map(|(k, _)| k.as_str()).collect();
                assert_eq!(keys, vec!["b", "a", "c"]);
            }
            other => panic!("expected map, got {other:?}"),
        }
        assert_eq!(serde_json::Value::from(&v), json);
    }

    #[test]
    fn map_helpers_work() {
        let mut v: Value = [("a", Value::Int(1)), ("b", Value::Null)].into_iter().collect();
        assert_eq!(v.get("a"), Some(&Value::Int(1)));
        assert_eq!(v.remove("b"), Some(Value::Null));
        assert_eq!(v.get("b"), None);
        let mut scalar = Value::Int(3);
        assert_eq!(scalar.remove("k"), None);
    }

    #[test]
    fn unsigned_integers_beyond_i64_stay_exact() {
        let json = serde_json::json!({"max": u64::MAX, "small": 7_u64});
        let v = Value::from(json.clone());
        assert_eq!(v.get("max"), Some(&Value::UInt(u64::MAX)));
        assert_eq!(v.get("small"), Some(&Value::Int(7)));
        assert_eq!(Value::from(u64::MAX), Value::UInt(u64::MAX));
        assert_eq!(serde_json::Value::from(&v), json);
    }

    #[test]
    fn non_finite_float_serializes_as_null() {
        assert_eq!(serde_json::Value::from(&Value::Float(f64::NAN)), serde_json::Value::Null);
    }

    #[test]
    fn metadata_rejects_empty_fields() {
        let ok = DatasetMetadata::new("n", "id", "https://x", 3).unwrap();
        assert_eq!(ok.size(), 3);
        assert_eq!(ok.name(), "n");

        let err = DatasetMetadata::new("", "id", "https://x", 3).unwrap_err();
        assert!(err.to_string().contains("Field 'name'"));
        let err = DatasetMetadata::new("n", "id", " ", 3).unwrap_err();
        assert!(err.to_string().contains("Field 'url'"));
    }
}
