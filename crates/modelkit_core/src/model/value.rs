//! Attribute values held by records.
//!
//! # Responsibility
//! - Represent raw wire values and their typed in-memory forms in one enum.
//! - Convert between `serde_json::Value` payloads and attribute values.
//!
//! # Invariants
//! - An absent key means "undefined"; `Value::Null` is an explicit null.
//! - Records and collections compare by identity, everything else by value.

use crate::model::collection::CollectionRef;
use crate::model::projection::JsonOptions;
use crate::model::record::RecordRef;
use crate::types::{CoercionError, CoercionResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Attribute mapping of one record.
pub type Attributes = BTreeMap<String, Value>;

/// Largest integer a 64-bit float represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// One attribute value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Object(Attributes),
    Record(RecordRef),
    Collection(CollectionRef),
}

impl Value {
    /// Runtime type name used in coercion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Record(_) => "record",
            Self::Collection(_) => "collection",
        }
    }

    /// Falsy values are null, `false`, zero, NaN and the empty string.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(flag) => *flag,
            Self::Number(number) => *number != 0.0 && !number.is_nan(),
            Self::String(text) => !text.is_empty(),
            _ => true,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => Some(*number),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(flag) => Some(*flag),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<&DateTime<Utc>> {
        match self {
            Self::Date(date) => Some(date),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordRef> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&CollectionRef> {
        match self {
            Self::Collection(collection) => Some(collection),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Attributes> {
        match self {
            Self::Object(attributes) => Some(attributes),
            _ => None,
        }
    }

    /// Serializes the value for the wire.
    ///
    /// Dates become ISO-8601 strings, non-finite numbers become null and
    /// nested records/collections are projected with default options.
    pub fn to_json(&self) -> CoercionResult<JsonValue> {
        Ok(match self {
            Self::Null => JsonValue::Null,
            Self::Bool(flag) => JsonValue::Bool(*flag),
            Self::Number(number) => number_to_json(*number),
            Self::String(text) => JsonValue::String(text.clone()),
            Self::Date(date) => JsonValue::String(format_iso8601(date)),
            Self::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<CoercionResult<Vec<_>>>()?,
            ),
            Self::Object(attributes) => {
                let mut map = Map::new();
                for (key, value) in attributes {
                    map.insert(key.clone(), value.to_json()?);
                }
                JsonValue::Object(map)
            }
            Self::Record(record) => match record.try_borrow() {
                Ok(record) => record.to_json(&JsonOptions::default())?,
                Err(_) => return Err(CoercionError::invalid_input("borrowed record", "JSON")),
            },
            Self::Collection(collection) => match collection.try_borrow() {
                Ok(collection) => collection.to_json(&JsonOptions::default())?,
                Err(_) => {
                    return Err(CoercionError::invalid_input("borrowed collection", "JSON"))
                }
            },
        })
    }

    /// Human-readable string form used by the `string` coercer.
    pub fn to_display_string(&self) -> CoercionResult<String> {
        Ok(match self {
            Self::Null => String::new(),
            Self::Bool(flag) => flag.to_string(),
            Self::Number(number) => format_number(*number),
            Self::String(text) => text.clone(),
            Self::Date(date) => format_iso8601(date),
            Self::Array(items) => items
                .iter()
                .map(Value::to_display_string)
                .collect::<CoercionResult<Vec<_>>>()?
                .join(","),
            Self::Object(_) | Self::Record(_) | Self::Collection(_) => self.to_json()?.to_string(),
        })
    }
}

/// Formats a UTC datetime as ISO-8601 with milliseconds and a `Z` suffix.
pub fn format_iso8601(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn number_to_json(number: f64) -> JsonValue {
    if !number.is_finite() {
        return JsonValue::Null;
    }
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        return JsonValue::Number(Number::from(number as i64));
    }
    Number::from_f64(number)
        .map(JsonValue::Number)
        .unwrap_or(JsonValue::Null)
}

fn format_number(number: f64) -> String {
    if number.is_nan() {
        return "NaN".to_string();
    }
    if number.is_infinite() {
        return if number > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
        return (number as i64).to_string();
    }
    number.to_string()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Date(left), Self::Date(right)) => left == right,
            (Self::Array(left), Self::Array(right)) => left == right,
            (Self::Object(left), Self::Object(right)) => left == right,
            (Self::Record(left), Self::Record(right)) => Rc::ptr_eq(left, right),
            (Self::Collection(left), Self::Collection(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Bool(flag) => write!(f, "Bool({flag})"),
            Self::Number(number) => write!(f, "Number({number})"),
            Self::String(text) => write!(f, "String({text:?})"),
            Self::Date(date) => write!(f, "Date({})", format_iso8601(date)),
            Self::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Self::Object(attributes) => f.debug_tuple("Object").field(attributes).finish(),
            // Nested graphs may be cyclic; print identity only.
            Self::Record(record) => match record.try_borrow() {
                Ok(record) => write!(f, "Record({}#{})", record.model_name(), record.cid()),
                Err(_) => write!(f, "Record(<borrowed>)"),
            },
            Self::Collection(collection) => match collection.try_borrow() {
                Ok(collection) => write!(
                    f,
                    "Collection({}; len={})",
                    collection.type_name(),
                    collection.len()
                ),
                Err(_) => write!(f, "Collection(<borrowed>)"),
            },
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(flag) => Self::Bool(flag),
            JsonValue::Number(number) => Self::Number(number.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(text) => Self::String(text),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Date(value)
    }
}

impl From<RecordRef> for Value {
    fn from(value: RecordRef) -> Self {
        Self::Record(value)
    }
}

impl From<CollectionRef> for Value {
    fn from(value: CollectionRef) -> Self {
        Self::Collection(value)
    }
}

/// Converts a JSON object payload into attributes.
///
/// Returns `None` when `payload` is not an object.
pub fn attributes_from_json(payload: JsonValue) -> Option<Attributes> {
    match Value::from(payload) {
        Value::Object(attributes) => Some(attributes),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{attributes_from_json, Value};
    use serde_json::json;

    #[test]
    fn truthiness_matches_wire_conventions() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Bool(false).is_truthy());
        assert!(!Value::from(0.0).is_truthy());
        assert!(!Value::from(f64::NAN).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("0").is_truthy());
        assert!(Value::Array(vec![]).is_truthy());
        assert!(Value::Object(Default::default()).is_truthy());
    }

    #[test]
    fn json_round_trip_keeps_integers_integral() {
        let payload = json!({"id": 7, "ratio": 0.25, "tags": ["a", null], "nested": {"ok": true}});
        let value = Value::from(payload.clone());
        assert_eq!(value.to_json().expect("to_json"), payload);
    }

    #[test]
    fn non_finite_numbers_serialize_as_null() {
        assert_eq!(
            Value::from(f64::NAN).to_json().expect("to_json"),
            serde_json::Value::Null
        );
    }

    #[test]
    fn attributes_from_json_requires_object() {
        assert!(attributes_from_json(json!({"a": 1})).is_some());
        assert!(attributes_from_json(json!([1, 2])).is_none());
    }
}
