//! The Primitive type - the values a store can hold directly.
//!
//! Richer types are mapped onto primitives by codecs in higher layers. A store
//! never interprets a primitive beyond keeping it and handing it back.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A value that can be written to or read from a store without a codec.
///
/// Absence is not a variant: "no entry" is `Option<Primitive>::None` at every
/// store boundary.
///
/// # Design Notes
///
/// - Uses `i64` for integers and `f64` for floats, matching what persistent
///   settings stores can represent natively
/// - Includes `Bytes` for binary data; the JSON file store encodes it as base64
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    /// Boolean value.
    Bool(bool),
    /// Signed 64-bit integer.
    Integer(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Bytes(#[serde(with = "base64_bytes")] Bytes),
}

impl Primitive {
    /// Short name of the variant, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Primitive::Bool(_) => "bool",
            Primitive::Integer(_) => "integer",
            Primitive::Float(_) => "float",
            Primitive::String(_) => "string",
            Primitive::Bytes(_) => "bytes",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Primitive::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Primitive::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Primitive::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Primitive::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

// Conversion from common types

impl From<bool> for Primitive {
    fn from(v: bool) -> Self {
        Primitive::Bool(v)
    }
}

impl From<i64> for Primitive {
    fn from(v: i64) -> Self {
        Primitive::Integer(v)
    }
}

impl From<i32> for Primitive {
    fn from(v: i32) -> Self {
        Primitive::Integer(v as i64)
    }
}

impl From<f64> for Primitive {
    fn from(v: f64) -> Self {
        Primitive::Float(v)
    }
}

impl From<String> for Primitive {
    fn from(v: String) -> Self {
        Primitive::String(v)
    }
}

impl From<&str> for Primitive {
    fn from(v: &str) -> Self {
        Primitive::String(v.to_string())
    }
}

impl From<Vec<u8>> for Primitive {
    fn from(v: Vec<u8>) -> Self {
        Primitive::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Primitive {
    fn from(v: Bytes) -> Self {
        Primitive::Bytes(v)
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
