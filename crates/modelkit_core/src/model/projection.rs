//! Include graph for JSON projection.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Options for `Record::to_json`: which associations to nest, recursively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonOptions {
    include: BTreeMap<String, JsonOptions>,
}

impl JsonOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Includes `name` with default nested options.
    pub fn include(self, name: impl Into<String>) -> Self {
        self.include_with(name, JsonOptions::default())
    }

    pub fn include_with(mut self, name: impl Into<String>, nested: JsonOptions) -> Self {
        self.include.insert(name.into(), nested);
        self
    }

    /// Nested options when `name` is included.
    pub fn included(&self, name: &str) -> Option<&JsonOptions> {
        self.include.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.include.is_empty()
    }

    /// Normalizes an include value: `"ship"`, `["ship", "ships"]`, or
    /// `{"ship": {"include": ...}}`. Falsy map entries are not included.
    pub fn from_include(include: &JsonValue) -> Self {
        let mut options = Self::default();
        match include {
            JsonValue::String(name) => {
                options.include.insert(name.clone(), Self::default());
            }
            JsonValue::Array(names) => {
                for name in names.iter().filter_map(JsonValue::as_str) {
                    options.include.insert(name.to_string(), Self::default());
                }
            }
            JsonValue::Object(entries) => {
                for (name, nested) in entries {
                    match nested {
                        JsonValue::Null | JsonValue::Bool(false) => {}
                        nested => {
                            options
                                .include
                                .insert(name.clone(), Self::from_options(nested));
                        }
                    }
                }
            }
            _ => {}
        }
        options
    }

    /// Reads an options object such as `{"include": "ship"}`.
    pub fn from_options(options: &JsonValue) -> Self {
        options
            .get("include")
            .map(Self::from_include)
            .unwrap_or_default()
    }
}
