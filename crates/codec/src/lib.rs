//! Frame codec
//!
//! Frames and unframes typed packets for the wire. A frame is a JSON
//! document shaped `{"type": TAG, "payload": VALUE}`. Because JSON has no
//! byte-string primitive, every [`Value::Bytes`] leaf is transformed on
//! encode into a `{"__bytes__": base64}` mapping and restored on decode. The
//! transform recurses through nested maps and lists.
//!
//! Decode failure never panics or returns a `Result` error: malformed input
//! yields `None`, and the caller's only contractual response is to drop the
//! frame (see the relay's handler loop).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use onionmesh_core::{Frame, Tag, Value};
use serde_json::{Map, Number, Value as Json};

const BYTES_SENTINEL: &str = "__bytes__";

/// Encode a tag and value into the wire byte representation.
pub fn encode(tag: Tag, value: &Value) -> Vec<u8> {
    let mut doc = Map::new();
    doc.insert("type".to_string(), Json::String(tag.as_wire_str().to_string()));
    doc.insert("payload".to_string(), value_to_json(value));
    serde_json::to_vec(&Json::Object(doc)).expect("JSON map is always serializable")
}

/// Decode wire bytes back into a tag and value.
///
/// Returns `None` for anything that isn't a well-formed `{"type", "payload"}`
/// document with a recognized tag string.
pub fn decode(bytes: &[u8]) -> Option<(Tag, Value)> {
    let doc: Json = serde_json::from_slice(bytes).ok()?;
    let obj = doc.as_object()?;
    let tag = Tag::from_wire_str(obj.get("type")?.as_str()?)?;
    let payload = obj.get("payload")?;
    Some((tag, json_to_value(payload)))
}

/// Convenience wrapper producing a [`Frame`] directly.
pub fn decode_frame(bytes: &[u8]) -> Option<Frame> {
    decode(bytes).map(|(tag, payload)| Frame::new(tag, payload))
}

fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => Json::Number((*i).into()),
        Value::Float(f) => Number::from_f64(*f).map(Json::Number).unwrap_or(Json::Null),
        Value::Str(s) => Json::String(s.clone()),
        Value::Bytes(b) => {
            let mut wrapper = Map::new();
            wrapper.insert(BYTES_SENTINEL.to_string(), Json::String(STANDARD.encode(b)));
            Json::Object(wrapper)
        }
        Value::List(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(pairs) => {
            let mut obj = Map::new();
            for (k, v) in pairs {
                obj.insert(k.clone(), value_to_json(v));
            }
            Json::Object(obj)
        }
    }
}

fn json_to_value(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        Json::String(s) => Value::Str(s.clone()),
        Json::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        Json::Object(obj) => {
            if obj.len() == 1 {
                if let Some(Json::String(b64)) = obj.get(BYTES_SENTINEL) {
                    if let Ok(bytes) = STANDARD.decode(b64) {
                        return Value::Bytes(bytes);
                    }
                }
            }
            Value::Map(obj.iter().map(|(k, v)| (k.clone(), json_to_value(v))).collect())
        }
    }
}
