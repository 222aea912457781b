//! The wire value grammar shared by every frame payload.
//!
//! A [`Value`] is the structural subset the codec can carry: strings, numbers,
//! booleans, ordered sequences, string-keyed mappings, and opaque byte
//! strings. It is deliberately a closed tagged sum rather than a generic
//! `serde_json::Value` so that the byte-string leaf has a first-class
//! representation instead of living behind a sentinel key at every call site.

use std::fmt;

/// A structured value that can cross the wire.
///
/// `Map` keeps insertion order in a `Vec` of pairs rather than a sorted map:
/// the spec requires unique keys per nesting level but never requires sorted
/// order, and a `Vec` keeps single-field payloads (the common case for
/// module traffic) allocation-light.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    pub fn map(pairs: impl IntoIterator<Item = (impl Into<String>, Value)>) -> Value {
        Value::Map(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Value {
        Value::List(items.into_iter().collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(pairs) => Some(pairs.as_slice()),
            _ => None,
        }
    }

    /// Checked projection: look up a key in a `Map` value, yielding `None` on
    /// a type mismatch or missing key rather than panicking. Callers at a
    /// delivery boundary (module dispatch) are expected to fail closed on
    /// `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map()?.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Value::List(items) => write!(f, "[{} items]", items.len()),
            Value::Map(pairs) => write!(f, "{{{} fields}}", pairs.len()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_lookup_roundtrips() {
        let v = Value::map([("text", Value::str("hi")), ("count", Value::Int(3))]);
        assert_eq!(v.get("text").and_then(Value::as_str), Some("hi"));
        assert_eq!(v.get("count").and_then(Value::as_int), Some(3));
        assert!(v.get("missing").is_none());
    }

    #[test]
    fn projection_fails_closed_on_type_mismatch() {
        let v = Value::str("not a map");
        assert!(v.get("anything").is_none());
        assert!(v.as_list().is_none());
    }
}
