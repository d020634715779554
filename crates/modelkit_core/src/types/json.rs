//! `json` coercer: nested structured attributes as anonymous records.

use crate::model::projection::JsonOptions;
use crate::model::record::Record;
use crate::model::value::Value;
use crate::types::{Coercer, CoercionError, CoercionResult};

/// Coercer for the `json` tag.
///
/// Loading wraps an object in an anonymous record (inheritance disabled)
/// whose model name is the attribute name. Dumping projects records
/// through their own `to_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonType;

impl Coercer for JsonType {
    fn load(&self, raw: &Value, attribute: &str) -> CoercionResult<Value> {
        match raw {
            Value::Object(attributes) => Ok(Value::Record(
                Record::anonymous(attribute, attributes.clone()).into_ref(),
            )),
            Value::Record(_) => Ok(raw.clone()),
            other => Err(CoercionError::invalid_input(other.type_name(), "JSON")),
        }
    }

    fn dump(&self, value: &Value, _attribute: &str) -> CoercionResult<Value> {
        match value {
            Value::Record(record) => match record.try_borrow() {
                Ok(record) => record.to_json(&JsonOptions::default()).map(Value::from),
                Err(_) => Err(CoercionError::invalid_input("borrowed record", "JSON")),
            },
            other => Ok(other.clone()),
        }
    }
}
