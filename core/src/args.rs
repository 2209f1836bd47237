//! Request arguments and their two wire encodings.
//!
//! GET requests carry arguments in the query string, flattened the way the
//! InvoiceXpress API expects (`status[0]=draft&status[1]=sent`). Every other
//! verb sends them as a JSON object body.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ApiError;

/// Caller-supplied or default request arguments keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Builder-style `insert`.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Fill `defaults` first, then apply `caller` on top. On a key collision
    /// the caller's value replaces the default as a whole, arrays included.
    pub fn merged(defaults: &Arguments, caller: &Arguments) -> Arguments {
        let mut merged = defaults.clone();
        for (key, value) in caller.iter() {
            merged.0.insert(key.clone(), value.clone());
        }
        merged
    }

    /// Flatten into url-encodable pairs.
    ///
    /// Scalars are written as text, booleans as `1`/`0`, arrays as
    /// `key[0]`, `key[1]`, ..., objects as `key[field]`. Nulls are skipped.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for (key, value) in self.iter() {
            flatten(key, value, &mut pairs);
        }
        pairs
    }

    pub fn to_json(&self) -> Result<String, ApiError> {
        serde_json::to_string(&self.0).map_err(|e| ApiError::SerializationError(e.to_string()))
    }

    /// Human-readable JSON preview of what a write request would send.
    pub fn to_pretty_json(&self) -> Result<String, ApiError> {
        serde_json::to_string_pretty(&self.0)
            .map_err(|e| ApiError::SerializationError(e.to_string()))
    }
}

fn flatten(key: &str, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => pairs.push((key.to_string(), if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => pairs.push((key.to_string(), n.to_string())),
        Value::String(s) => pairs.push((key.to_string(), s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(&format!("{key}[{i}]"), item, pairs);
            }
        }
        Value::Object(fields) => {
            for (field, item) in fields {
                flatten(&format!("{key}[{field}]"), item, pairs);
            }
        }
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Arguments {
    type Error = ApiError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ApiError::SerializationError(format!(
                "arguments must be a JSON object, got {other}"
            ))),
        }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
