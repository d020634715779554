//! `boolean` coercer.

use crate::model::value::Value;
use crate::types::{Coercer, CoercionResult};

/// Coercer for the `boolean` tag.
///
/// Only the literal string `"true"` loads as `true` among strings; other
/// values load by truthiness.
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanType;

impl Coercer for BooleanType {
    fn load(&self, raw: &Value, _attribute: &str) -> CoercionResult<Value> {
        Ok(match raw {
            Value::String(text) => Value::Bool(text == "true"),
            other => Value::Bool(other.is_truthy()),
        })
    }

    fn dump(&self, value: &Value, _attribute: &str) -> CoercionResult<Value> {
        Ok(value.clone())
    }
}
