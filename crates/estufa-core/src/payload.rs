//! Response-shape detection for `/api/estufas`.
//!
//! Backends answer with a bare array, an `{ "estufas": [...] }` wrapper, or a
//! single installation object. The shape is decided once, here, and the rest
//! of the crate only ever sees `Vec<Entity>`.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::Entity;

/// Key of the wrapper object.
pub const WRAPPER_KEY: &str = "estufas";

/// A decoded `/api/estufas` body.
#[derive(Debug, Clone, PartialEq)]
pub enum EntitiesPayload {
    Array(Vec<Entity>),
    Wrapped(Vec<Entity>),
    Single(Box<Entity>),
    /// Scalars, `null`, or anything else: no entities.
    Unrecognized,
}

impl EntitiesPayload {
    pub fn decode(value: Value) -> Self {
        match value {
            Value::Array(items) => Self::Array(decode_items(items)),
            Value::Object(mut map) => match map.remove(WRAPPER_KEY) {
                Some(Value::Array(items)) => Self::Wrapped(decode_items(items)),
                other => {
                    if let Some(v) = other {
                        map.insert(WRAPPER_KEY.to_string(), v);
                    }
                    match serde_json::from_value(Value::Object(map)) {
                        Ok(entity) => Self::Single(Box::new(entity)),
                        Err(_) => Self::Unrecognized,
                    }
                }
            },
            _ => Self::Unrecognized,
        }
    }

    /// Decode raw body bytes. Invalid JSON is an error, a valid but
    /// unexpected document is [`EntitiesPayload::Unrecognized`].
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        Ok(Self::decode(serde_json::from_slice(body)?))
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Self::Array(_) => "array",
            Self::Wrapped(_) => "wrapped",
            Self::Single(_) => "single",
            Self::Unrecognized => "unrecognized",
        }
    }

    pub fn into_entities(self) -> Vec<Entity> {
        match self {
            Self::Array(v) | Self::Wrapped(v) => v,
            Self::Single(e) => vec![*e],
            Self::Unrecognized => Vec::new(),
        }
    }
}

fn decode_items<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// Response shapes the mock backend can be asked to emit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PayloadShape {
    #[default]
    Array,
    Wrapped,
    Single,
}

impl PayloadShape {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "array" => Some(Self::Array),
            "wrapped" => Some(Self::Wrapped),
            "single" => Some(Self::Single),
            _ => None,
        }
    }

    /// Encode entities in this shape. `Single` emits the first entity, or
    /// `null` when there is none.
    pub fn encode(self, entities: &[Entity]) -> Value {
        let list = || serde_json::to_value(entities).unwrap_or(Value::Array(Vec::new()));
        match self {
            Self::Array => list(),
            Self::Wrapped => serde_json::json!({ WRAPPER_KEY: list() }),
            Self::Single => entities
                .first()
                .and_then(|e| serde_json::to_value(e).ok())
                .unwrap_or(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(p: EntitiesPayload) -> Vec<String> {
        p.into_entities().into_iter().map(|e| e.id).collect()
    }

    #[test]
    fn bare_array() {
        let p = EntitiesPayload::decode(json!([{ "id": "a" }, { "id": "b" }]));
        assert_eq!(p.shape(), "array");
        assert_eq!(ids(p), ["a", "b"]);
    }

    #[test]
    fn wrapped_array() {
        let p = EntitiesPayload::decode(json!({ "estufas": [{ "id": "x" }] }));
        assert_eq!(p.shape(), "wrapped");
        assert_eq!(ids(p), ["x"]);
    }

    #[test]
    fn single_object_is_wrapped_into_list() {
        let p = EntitiesPayload::decode(json!({ "id": "y" }));
        assert_eq!(p.shape(), "single");
        assert_eq!(ids(p), ["y"]);
    }

    #[test]
    fn non_array_wrapper_key_is_a_single_object() {
        let p = EntitiesPayload::decode(json!({ "id": "z", "estufas": 3 }));
        assert_eq!(ids(p), ["z"]);
    }

    #[test]
    fn garbage_is_empty() {
        for v in [json!("garbage"), json!(42), json!(null), json!(true)] {
            let p = EntitiesPayload::decode(v);
            assert_eq!(p, EntitiesPayload::Unrecognized);
            assert!(p.into_entities().is_empty());
        }
    }

    #[test]
    fn undecodable_array_items_are_skipped() {
        let p = EntitiesPayload::decode(json!([{ "id": "a" }, 7, "x"]));
        assert_eq!(ids(p), ["a"]);
    }

    #[test]
    fn invalid_json_bytes_are_an_error() {
        assert!(EntitiesPayload::from_slice(b"<html>").is_err());
        assert_eq!(
            EntitiesPayload::from_slice(b"[]").unwrap(),
            EntitiesPayload::Array(Vec::new())
        );
    }

    #[test]
    fn shapes_encode_back_to_decodable_bodies() {
        let entities = vec![Entity::new("a"), Entity::new("b")];
        assert_eq!(
            EntitiesPayload::decode(PayloadShape::Wrapped.encode(&entities)).shape(),
            "wrapped"
        );
        assert_eq!(ids(EntitiesPayload::decode(PayloadShape::Single.encode(&entities))), ["a"]);
        assert_eq!(PayloadShape::Single.encode(&[]), Value::Null);
        assert_eq!(PayloadShape::parse("WRAPPED"), Some(PayloadShape::Wrapped));
        assert_eq!(PayloadShape::parse("xml"), None);
    }
}
