//! `number` coercer.

use crate::model::value::Value;
use crate::types::{Coercer, CoercionResult};

/// Coercer for the `number` tag.
///
/// Thousands separators (`,`) are stripped from strings and blank strings
/// load as null. Input that is not numeric loads as NaN.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumberType;

impl Coercer for NumberType {
    fn load(&self, raw: &Value, _attribute: &str) -> CoercionResult<Value> {
        let number = match raw {
            Value::String(text) => {
                let stripped = text.replace(',', "");
                let trimmed = stripped.trim();
                if trimmed.is_empty() {
                    return Ok(Value::Null);
                }
                trimmed.parse::<f64>().unwrap_or(f64::NAN)
            }
            Value::Number(number) => *number,
            Value::Bool(flag) => {
                if *flag {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Null => 0.0,
            Value::Date(date) => date.timestamp_millis() as f64,
            Value::Array(_) | Value::Object(_) | Value::Record(_) | Value::Collection(_) => {
                f64::NAN
            }
        };
        Ok(Value::Number(number))
    }

    fn dump(&self, value: &Value, _attribute: &str) -> CoercionResult<Value> {
        Ok(value.clone())
    }
}
