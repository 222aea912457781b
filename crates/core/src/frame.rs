//! Frame tags and the on-wire `{type, payload}` envelope.

use serde::{Deserialize, Serialize};

use crate::Value;

/// The five frame kinds carried over both the discovery datagram socket and
/// the relay's connection-oriented transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tag {
    Hello,
    Pex,
    Onion,
    Chunk,
    Direct,
}

impl Tag {
    /// The string used on the wire inside the `{"type": ...}` envelope.
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Tag::Hello => "HELLO",
            Tag::Pex => "PEX",
            Tag::Onion => "ONION_MSG",
            Tag::Chunk => "FILE_CHUNK",
            Tag::Direct => "DIRECT",
        }
    }

    pub fn from_wire_str(s: &str) -> Option<Tag> {
        match s {
            "HELLO" => Some(Tag::Hello),
            "PEX" => Some(Tag::Pex),
            "ONION_MSG" => Some(Tag::Onion),
            "FILE_CHUNK" => Some(Tag::Chunk),
            "DIRECT" => Some(Tag::Direct),
            _ => None,
        }
    }
}

/// A decoded frame: its tag plus the structured payload it carries.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub tag: Tag,
    pub payload: Value,
}

impl Frame {
    pub fn new(tag: Tag, payload: Value) -> Self {
        Self { tag, payload }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_strings_roundtrip() {
        for tag in [Tag::Hello, Tag::Pex, Tag::Onion, Tag::Chunk, Tag::Direct] {
            let s = tag.as_wire_str();
            assert_eq!(Tag::from_wire_str(s), Some(tag));
        }
    }

    #[test]
    fn unknown_wire_string_is_absent() {
        assert!(Tag::from_wire_str("BOGUS").is_none());
    }
}
