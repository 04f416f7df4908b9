//! Attribute codec.
//!
//! Converts the multi-valued and structured parts of the domain types
//! (scope sets, settings, token metadata, id-token claims, authorization
//! attributes) to and from the flat text representation stored in a single
//! column.
//!
//! # Format
//!
//! Sets are JSON arrays. Maps are JSON objects whose values carry an explicit
//! type tag, so a decoded value always has the type it was encoded with:
//!
//! ```json
//! {"expires":{"type":"instant","value":"2024-05-01T10:00:00Z"},
//!  "max_age":{"type":"integer","value":300}}
//! ```
//!
//! Instants are RFC 3339 text carrying the full nanosecond fraction and the
//! original offset.
//!
//! Values that cannot be represented faithfully (non-finite floats, JSON
//! `null`, instants RFC 3339 cannot express) are rejected with
//! [`CodecError::Unsupported`] instead of being dropped or rewritten.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Errors raised by the attribute codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// Serialization of an otherwise supported value failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// Stored data could not be decoded.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The value has no faithful representation in the stored format.
    #[error("unsupported value: {0}")]
    Unsupported(String),
}

/// Ordered map of typed attribute values.
pub type AttributeMap = BTreeMap<String, AttributeValue>;

/// A typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AttributeValue {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Instant(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    List(Vec<AttributeValue>),
    Map(AttributeMap),
}

impl AttributeValue {
    /// Returns the string value, if this is a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_instant(&self) -> Option<OffsetDateTime> {
        match self {
            Self::Instant(t) => Some(*t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&AttributeMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Walks the value and fails on anything the stored format cannot carry.
    fn check_supported(&self, path: &str) -> Result<(), CodecError> {
        match self {
            Self::Float(f) if !f.is_finite() => Err(CodecError::Unsupported(format!(
                "non-finite float at '{path}'"
            ))),
            Self::Instant(at) => ensure_instant_encodable(*at)
                .map_err(|e| CodecError::Unsupported(format!("{e} at '{path}'"))),
            Self::List(items) => items
                .iter()
                .enumerate()
                .try_for_each(|(i, v)| v.check_supported(&format!("{path}[{i}]"))),
            Self::Map(map) => check_map(map, path),
            _ => Ok(()),
        }
    }
}

fn check_map(map: &AttributeMap, prefix: &str) -> Result<(), CodecError> {
    map.iter().try_for_each(|(k, v)| {
        let path = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        v.check_supported(&path)
    })
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<OffsetDateTime> for AttributeValue {
    fn from(value: OffsetDateTime) -> Self {
        Self::Instant(value)
    }
}

impl From<AttributeMap> for AttributeValue {
    fn from(value: AttributeMap) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(value: Vec<AttributeValue>) -> Self {
        Self::List(value)
    }
}

impl TryFrom<serde_json::Value> for AttributeValue {
    type Error = CodecError;

    /// Converts untyped JSON (e.g. claims received from a token issuer).
    ///
    /// Strings stay strings; no instant detection is attempted.
    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        use serde_json::Value;

        match value {
            Value::Null => Err(CodecError::Unsupported("null".into())),
            Value::Bool(b) => Ok(Self::Boolean(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Integer(i))
                } else if n.is_u64() {
                    Err(CodecError::Unsupported(format!("integer {n} out of range")))
                } else {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(Self::Float)
                        .ok_or_else(|| CodecError::Unsupported(format!("number {n}")))
                }
            }
            Value::String(s) => Ok(Self::String(s)),
            Value::Array(items) => items
                .into_iter()
                .map(Self::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Self::List),
            Value::Object(obj) => obj
                .into_iter()
                .map(|(k, v)| Self::try_from(v).map(|v| (k, v)))
                .collect::<Result<AttributeMap, _>>()
                .map(Self::Map),
        }
    }
}

// =============================================================================
// Set / Map Encoding
// =============================================================================

/// Encodes a set as a JSON array.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if an element fails to serialize.
pub fn encode_set<T: Serialize + Ord>(set: &BTreeSet<T>) -> Result<String, CodecError> {
    serde_json::to_string(set).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Decodes a set previously produced by [`encode_set`].
///
/// # Errors
///
/// Returns [`CodecError::Decode`] on malformed input.
pub fn decode_set<T: DeserializeOwned + Ord>(raw: &str) -> Result<BTreeSet<T>, CodecError> {
    serde_json::from_str(raw).map_err(|e| CodecError::Decode(e.to_string()))
}

/// Encodes an attribute map.
///
/// # Errors
///
/// Returns [`CodecError::Unsupported`] if any nested value has no faithful
/// representation, or [`CodecError::Encode`] if serialization fails.
pub fn encode_map(map: &AttributeMap) -> Result<String, CodecError> {
    check_map(map, "")?;
    serde_json::to_string(map).map_err(|e| CodecError::Encode(e.to_string()))
}

/// Fails exactly when [`encode_map`] would fail on an unsupported value,
/// without producing the encoded text.
///
/// # Errors
///
/// Returns [`CodecError::Unsupported`] naming the offending path.
pub fn ensure_encodable(map: &AttributeMap) -> Result<(), CodecError> {
    check_map(map, "")
}

/// Decodes an attribute map previously produced by [`encode_map`].
///
/// # Errors
///
/// Returns [`CodecError::Decode`] on malformed or untagged input.
pub fn decode_map(raw: &str) -> Result<AttributeMap, CodecError> {
    serde_json::from_str(raw).map_err(|e| CodecError::Decode(e.to_string()))
}

// =============================================================================
// Instants
// =============================================================================

/// Formats an instant as RFC 3339, keeping sub-microsecond precision and the
/// offset it was created with.
///
/// # Errors
///
/// Returns [`CodecError::Unsupported`] for instants RFC 3339 cannot express:
/// years outside `0000..=9999` or offsets with a seconds component.
pub fn encode_instant(at: OffsetDateTime) -> Result<String, CodecError> {
    at.format(&Rfc3339)
        .map_err(|e| CodecError::Unsupported(format!("instant {at}: {e}")))
}

/// Fails exactly when [`encode_instant`] would.
///
/// # Errors
///
/// Returns [`CodecError::Unsupported`] for instants with no RFC 3339 form.
pub fn ensure_instant_encodable(at: OffsetDateTime) -> Result<(), CodecError> {
    encode_instant(at).map(drop)
}

/// Parses an instant produced by [`encode_instant`].
///
/// # Errors
///
/// Returns [`CodecError::Decode`] on malformed input.
pub fn decode_instant(raw: &str) -> Result<OffsetDateTime, CodecError> {
    OffsetDateTime::parse(raw, &Rfc3339).map_err(|e| CodecError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample_map() -> AttributeMap {
        let mut nested = AttributeMap::new();
        nested.insert("acr".into(), "urn:mace:incommon:iap:silver".into());
        nested.insert("auth_time".into(), datetime!(2024-05-01 10:00:00 UTC).into());

        let mut map = AttributeMap::new();
        map.insert("nonce".into(), "n-0S6_WzA2Mj".into());
        map.insert("max_age".into(), 300i64.into());
        map.insert("ratio".into(), 0.25f64.into());
        map.insert("remember".into(), true.into());
        map.insert(
            "issued".into(),
            datetime!(2024-05-01 12:30:15.123456789 +02:00).into(),
        );
        map.insert(
            "audiences".into(),
            vec!["api".into(), AttributeValue::from(7i64)].into(),
        );
        map.insert("claims".into(), nested.into());
        map
    }

    #[test]
    fn test_map_round_trip() {
        let map = sample_map();
        let raw = encode_map(&map).unwrap();
        assert_eq!(decode_map(&raw).unwrap(), map);
    }

    #[test]
    fn test_integer_and_float_stay_distinct() {
        let mut map = AttributeMap::new();
        map.insert("a".into(), 1i64.into());
        map.insert("b".into(), 1.0f64.into());
        let decoded = decode_map(&encode_map(&map).unwrap()).unwrap();
        assert_eq!(decoded["a"], AttributeValue::Integer(1));
        assert_eq!(decoded["b"], AttributeValue::Float(1.0));
    }

    #[test]
    fn test_empty_set_round_trip() {
        let set: BTreeSet<String> = BTreeSet::new();
        let raw = encode_set(&set).unwrap();
        assert_eq!(raw, "[]");
        assert_eq!(decode_set::<String>(&raw).unwrap(), set);
    }

    #[test]
    fn test_large_set_round_trip() {
        let set: BTreeSet<String> = (0..64)
            .map(|i| format!("scope:{i},with,commas and spaces"))
            .collect();
        let raw = encode_set(&set).unwrap();
        assert_eq!(decode_set::<String>(&raw).unwrap(), set);
    }

    #[test]
    fn test_non_finite_float_rejected() {
        let mut inner = AttributeMap::new();
        inner.insert("score".into(), f64::NAN.into());
        let mut map = AttributeMap::new();
        map.insert("outer".into(), inner.into());

        let err = encode_map(&map).unwrap_err();
        assert_eq!(
            err,
            CodecError::Unsupported("non-finite float at 'outer.score'".into())
        );
    }

    #[test]
    fn test_instant_keeps_nanoseconds_and_offset() {
        let at = datetime!(2024-05-01 12:30:15.123456789 +02:00);
        let raw = encode_instant(at).unwrap();
        assert_eq!(raw, "2024-05-01T12:30:15.123456789+02:00");

        let decoded = decode_instant(&raw).unwrap();
        assert_eq!(decoded, at);
        assert_eq!(decoded.offset(), at.offset());
        assert_eq!(decoded.nanosecond(), 123_456_789);
    }

    #[test]
    fn test_instant_without_rfc3339_form_rejected() {
        let at = datetime!(2024-05-01 12:30:15 UTC).to_offset(time::macros::offset!(+02:00:30));
        assert!(matches!(encode_instant(at), Err(CodecError::Unsupported(_))));

        let mut map = AttributeMap::new();
        map.insert("auth_time".into(), at.into());
        assert!(matches!(encode_map(&map), Err(CodecError::Unsupported(_))));
        assert!(matches!(
            decode_instant("yesterday"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_untagged_values() {
        let err = decode_map(r#"{"nonce":"abc"}"#).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_set::<String>("read,write"),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_from_json() {
        let json = serde_json::json!({
            "sub": "alice",
            "exp": 1714557600,
            "email_verified": true,
            "amr": ["pwd", "otp"],
        });
        let value = AttributeValue::try_from(json).unwrap();
        let map = value.as_map().unwrap();
        assert_eq!(map["sub"].as_str(), Some("alice"));
        assert_eq!(map["exp"].as_i64(), Some(1714557600));
        assert_eq!(map["email_verified"].as_bool(), Some(true));
    }

    #[test]
    fn test_from_json_rejects_null() {
        let json = serde_json::json!({ "middle_name": null });
        assert_eq!(
            AttributeValue::try_from(json),
            Err(CodecError::Unsupported("null".into()))
        );
    }
}
