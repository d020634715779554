//! `string` coercer.

use crate::model::value::Value;
use crate::types::{Coercer, CoercionResult};

/// Coercer for the `string` tag. Null passes through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringType;

impl Coercer for StringType {
    fn load(&self, raw: &Value, _attribute: &str) -> CoercionResult<Value> {
        stringify(raw)
    }

    fn dump(&self, value: &Value, _attribute: &str) -> CoercionResult<Value> {
        stringify(value)
    }
}

fn stringify(value: &Value) -> CoercionResult<Value> {
    match value {
        Value::Null | Value::String(_) => Ok(value.clone()),
        other => other.to_display_string().map(Value::String),
    }
}
