//! Type registry and attribute coercers.
//!
//! # Responsibility
//! - Map type tags (`date`, `number`, ...) to coercers that convert raw wire
//!   values into typed in-memory values and back.
//! - Apply the `array` modifier of a field rule element-wise.
//!
//! # Invariants
//! - A field rule whose tag is not registered fails with
//!   `CoercionError::Unsupported`; it is never skipped.
//! - Coercers are pure: `load`/`dump` never mutate their input.
//!
//! # See also
//! - `crate::model::record::Record::coerce_attributes`

pub mod boolean;
pub mod date;
pub mod json;
pub mod number;
pub mod string;

use crate::model::value::Value;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Tag for ISO-8601 date attributes.
pub const TYPE_DATE: &str = "date";
/// Tag for nested structured attributes loaded as anonymous records.
pub const TYPE_JSON: &str = "json";
/// Tag for numeric attributes.
pub const TYPE_NUMBER: &str = "number";
/// Tag for string attributes.
pub const TYPE_STRING: &str = "string";
/// Tag for boolean attributes.
pub const TYPE_BOOLEAN: &str = "boolean";

const BUILTIN_TYPE_TAGS: &[&str] = &[TYPE_BOOLEAN, TYPE_DATE, TYPE_JSON, TYPE_NUMBER, TYPE_STRING];

/// Returns the tags registered by `TypeRegistry::with_builtin_types`.
pub fn builtin_type_tags() -> &'static [&'static str] {
    BUILTIN_TYPE_TAGS
}

pub type CoercionResult<T> = Result<T, CoercionError>;

/// Raised when a value cannot be converted for a declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// No coercer is registered for the tag.
    Unsupported(String),
    /// The runtime shape of the input is rejected by the coercer.
    InvalidInput { found: String, target: String },
    /// A date string could not be parsed.
    InvalidDate(String),
    /// A field declared with `array: true` received a non-sequence value.
    NotAnArray { attribute: String, found: String },
    /// A tag was registered twice.
    DuplicateType(String),
}

impl CoercionError {
    pub(crate) fn invalid_input(found: impl Into<String>, target: impl Into<String>) -> Self {
        Self::InvalidInput {
            found: found.into(),
            target: target.into(),
        }
    }
}

impl Display for CoercionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(tag) => write!(f, "Coercion of {tag} unsupported"),
            Self::InvalidInput { found, target } => {
                write!(f, "{found} can't be coerced into {target}")
            }
            Self::InvalidDate(raw) => write!(f, "invalid ISO-8601 date: `{raw}`"),
            Self::NotAnArray { attribute, found } => {
                write!(f, "{found} can't be coerced into an array for `{attribute}`")
            }
            Self::DuplicateType(tag) => write!(f, "type tag already registered: {tag}"),
        }
    }
}

impl Error for CoercionError {}

/// Converts one declared type between its wire and in-memory forms.
pub trait Coercer {
    /// Loads a raw wire value for `attribute`.
    fn load(&self, raw: &Value, attribute: &str) -> CoercionResult<Value>;
    /// Dumps a typed value for `attribute` back to its wire form.
    fn dump(&self, value: &Value, attribute: &str) -> CoercionResult<Value>;
}

/// Coercion rule declared for one scalar attribute of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRule {
    /// Registry tag, e.g. `date`.
    pub type_tag: String,
    /// Coerce element-wise over a sequence.
    pub array: bool,
    /// Default applied at construction when the attribute is absent.
    pub default: Option<JsonValue>,
}

impl FieldRule {
    pub fn new(type_tag: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            array: false,
            default: None,
        }
    }

    /// Marks the rule as a sequence of `type_tag` values.
    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn with_default(mut self, default: JsonValue) -> Self {
        self.default = Some(default);
        self
    }
}

/// Tag to coercer mapping consulted by records during `set` and `to_json`.
pub struct TypeRegistry {
    coercers: BTreeMap<String, Box<dyn Coercer>>,
}

impl TypeRegistry {
    /// Creates a registry without any coercer.
    pub fn empty() -> Self {
        Self {
            coercers: BTreeMap::new(),
        }
    }

    /// Creates a registry with the `date|number|string|boolean|json` coercers.
    pub fn with_builtin_types() -> Self {
        let mut coercers: BTreeMap<String, Box<dyn Coercer>> = BTreeMap::new();
        coercers.insert(TYPE_BOOLEAN.to_string(), Box::new(boolean::BooleanType));
        coercers.insert(TYPE_DATE.to_string(), Box::new(date::DateType));
        coercers.insert(TYPE_JSON.to_string(), Box::new(json::JsonType));
        coercers.insert(TYPE_NUMBER.to_string(), Box::new(number::NumberType));
        coercers.insert(TYPE_STRING.to_string(), Box::new(string::StringType));
        Self { coercers }
    }

    /// Registers a custom coercer under a new tag.
    pub fn register(
        &mut self,
        tag: impl Into<String>,
        coercer: Box<dyn Coercer>,
    ) -> CoercionResult<()> {
        let tag = tag.into();
        if self.coercers.contains_key(tag.as_str()) {
            return Err(CoercionError::DuplicateType(tag));
        }
        self.coercers.insert(tag, coercer);
        Ok(())
    }

    /// Returns the coercer for `tag`.
    pub fn get(&self, tag: &str) -> CoercionResult<&dyn Coercer> {
        self.coercers
            .get(tag)
            .map(|coercer| coercer.as_ref())
            .ok_or_else(|| CoercionError::Unsupported(tag.to_string()))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.coercers.contains_key(tag)
    }

    /// Returns sorted registered tags.
    pub fn tags(&self) -> Vec<String> {
        self.coercers.keys().cloned().collect()
    }

    /// Loads `raw` for `attribute` according to `rule`.
    pub fn load(&self, rule: &FieldRule, raw: &Value, attribute: &str) -> CoercionResult<Value> {
        let coercer = self.get(rule.type_tag.as_str())?;
        if !rule.array {
            return coercer.load(raw, attribute);
        }

        match raw {
            Value::Array(items) => items
                .iter()
                .map(|item| coercer.load(item, attribute))
                .collect::<CoercionResult<Vec<_>>>()
                .map(Value::Array),
            other => Err(CoercionError::NotAnArray {
                attribute: attribute.to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Dumps `value` for `attribute` according to `rule`.
    pub fn dump(&self, rule: &FieldRule, value: &Value, attribute: &str) -> CoercionResult<Value> {
        let coercer = self.get(rule.type_tag.as_str())?;
        if !rule.array {
            return coercer.dump(value, attribute);
        }

        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| coercer.dump(item, attribute))
                .collect::<CoercionResult<Vec<_>>>()
                .map(Value::Array),
            other => Err(CoercionError::NotAnArray {
                attribute: attribute.to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::with_builtin_types()
    }
}

impl Debug for TypeRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        builtin_type_tags, Coercer, CoercionError, CoercionResult, FieldRule, TypeRegistry,
        TYPE_NUMBER,
    };
    use crate::model::value::Value;

    struct UppercaseType;

    impl Coercer for UppercaseType {
        fn load(&self, raw: &Value, _attribute: &str) -> CoercionResult<Value> {
            match raw {
                Value::String(text) => Ok(Value::String(text.to_uppercase())),
                other => Err(CoercionError::invalid_input(other.type_name(), "Uppercase")),
            }
        }

        fn dump(&self, value: &Value, _attribute: &str) -> CoercionResult<Value> {
            Ok(value.clone())
        }
    }

    #[test]
    fn builtin_registry_exposes_all_builtin_tags() {
        let registry = TypeRegistry::with_builtin_types();
        for tag in builtin_type_tags() {
            assert!(registry.contains(tag), "missing builtin tag {tag}");
        }
        assert_eq!(registry.tags().len(), builtin_type_tags().len());
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let registry = TypeRegistry::with_builtin_types();
        let err = registry
            .load(&FieldRule::new("money"), &Value::from(1.0), "price")
            .expect_err("unknown tag must fail");
        assert_eq!(err, CoercionError::Unsupported("money".to_string()));
        assert_eq!(err.to_string(), "Coercion of money unsupported");
    }

    #[test]
    fn registers_custom_coercer_once() {
        let mut registry = TypeRegistry::empty();
        registry
            .register("upper", Box::new(UppercaseType))
            .expect("custom tag should register");
        let err = registry
            .register("upper", Box::new(UppercaseType))
            .expect_err("duplicate tag must fail");
        assert_eq!(err, CoercionError::DuplicateType("upper".to_string()));

        let loaded = registry
            .load(&FieldRule::new("upper"), &Value::from("abc"), "code")
            .expect("custom load");
        assert_eq!(loaded, Value::from("ABC"));
    }

    #[test]
    fn array_rule_coerces_element_wise() {
        let registry = TypeRegistry::with_builtin_types();
        let rule = FieldRule::new(TYPE_NUMBER).array();
        let raw = Value::Array(vec![Value::from("1,000"), Value::from(2.0)]);

        let loaded = registry.load(&rule, &raw, "totals").expect("array load");
        assert_eq!(
            loaded,
            Value::Array(vec![Value::from(1000.0), Value::from(2.0)])
        );
    }

    #[test]
    fn array_rule_rejects_scalar_input() {
        let registry = TypeRegistry::with_builtin_types();
        let rule = FieldRule::new(TYPE_NUMBER).array();
        let err = registry
            .load(&rule, &Value::from(3.0), "totals")
            .expect_err("scalar input must fail for array rule");
        assert!(matches!(err, CoercionError::NotAnArray { .. }));
    }
}
