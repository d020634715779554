//! Record save workflow.
//!
//! # Responsibility
//! - Build persistence requests from records and apply their outcomes.
//!
//! # Invariants
//! - New records are created; persisted ones are updated, or patched when
//!   requested.
//! - Validation rejections are stored on the record and reported as
//!   `SaveOutcome::Invalid`; only transport failures are errors.

use crate::error::{ModelError, ModelResult};
use crate::model::projection::JsonOptions;
use crate::model::record::{Record, SetOptions, ValidationErrors};
use crate::model::value::{attributes_from_json, Attributes, Value};
use crate::schema::model_schema::ModelSchema;
use crate::schema::registry::ModelRegistry;
use crate::sync::persist::{Persist, PersistMethod, PersistRequest, PersistResponse};
use chrono::Utc;
use log::{info, warn};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeSet;

/// Options for one save.
#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// Send a partial update for a persisted record.
    pub patch: bool,
    /// Associations nested into the request body.
    pub include: JsonOptions,
    /// Attributes set on the record before saving. A patch sends only these.
    pub attributes: Option<Attributes>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved,
    Invalid(ValidationErrors),
}

/// Use-case service wrapper around one `Persist` transport.
pub struct RecordService<'r, P: Persist> {
    registry: &'r ModelRegistry,
    persist: P,
}

impl<'r, P: Persist> RecordService<'r, P> {
    pub fn new(registry: &'r ModelRegistry, persist: P) -> Self {
        Self { registry, persist }
    }

    pub fn registry(&self) -> &ModelRegistry {
        self.registry
    }

    /// Saves `record` through the transport.
    ///
    /// # Contract
    /// - A `Saved` body that is a JSON object is applied with `set`.
    /// - An `Invalid` response is stored with `set_errors`.
    ///
    /// # Errors
    /// - Coercion/resolution errors from `set` or `to_json`.
    /// - `ModelError::Persist` for transport failures.
    pub fn save(&self, record: &mut Record, options: &SaveOptions) -> ModelResult<SaveOutcome> {
        if let Some(attributes) = &options.attributes {
            record.set(self.registry, attributes.clone(), SetOptions::default())?;
        }

        let method = if record.is_new() {
            PersistMethod::Create
        } else if options.patch {
            PersistMethod::Patch
        } else {
            PersistMethod::Update
        };

        let projection = record.to_json(&options.include)?;
        let payload = match (method, &options.attributes, projection) {
            (PersistMethod::Patch, Some(attributes), JsonValue::Object(map)) => {
                JsonValue::Object(patch_subset(map, &patch_keys(record.model(), attributes)))
            }
            (_, _, projection) => projection,
        };

        let request = PersistRequest::new(method, record.url(), record.param_root(), payload);
        match self.persist.persist(&request) {
            Ok(PersistResponse::Saved(body)) => {
                if let Some(attributes) = attributes_from_json(body) {
                    record.set(self.registry, attributes, SetOptions::default())?;
                }
                info!(
                    "event=record_save module=service status=ok model={} method={} url={}",
                    record.model_name(),
                    method.as_str(),
                    request.url
                );
                Ok(SaveOutcome::Saved)
            }
            Ok(PersistResponse::Invalid(errors)) => {
                warn!(
                    "event=record_save module=service status=invalid model={} method={} attributes={}",
                    record.model_name(),
                    method.as_str(),
                    errors.len()
                );
                record.set_errors(errors.clone());
                Ok(SaveOutcome::Invalid(errors))
            }
            Err(err) => {
                warn!(
                    "event=record_save module=service status=error model={} method={} code={}",
                    record.model_name(),
                    method.as_str(),
                    err.code
                );
                Err(ModelError::from(err))
            }
        }
    }

    /// Constructs a record of type `name` and saves it.
    pub fn create(&self, name: &str, attributes: Attributes) -> ModelResult<(Record, SaveOutcome)> {
        let mut record = self.registry.instantiate(name, attributes)?;
        let outcome = self.save(&mut record, &SaveOptions::default())?;
        Ok((record, outcome))
    }

    /// Sets `attributes` and sends them as a patch.
    pub fn update_attributes(
        &self,
        record: &mut Record,
        attributes: Attributes,
    ) -> ModelResult<SaveOutcome> {
        let options = SaveOptions {
            patch: true,
            attributes: Some(attributes),
            ..SaveOptions::default()
        };
        self.save(record, &options)
    }

    /// Patches `updated_at` and each of `columns` to the current time.
    pub fn touch(&self, record: &mut Record, columns: &[&str]) -> ModelResult<SaveOutcome> {
        let now = Value::Date(Utc::now());
        let mut attributes = Attributes::new();
        attributes.insert("updated_at".to_string(), now.clone());
        for column in columns {
            attributes.insert((*column).to_string(), now.clone());
        }
        self.update_attributes(record, attributes)
    }
}

/// Projected keys a patch of `attributes` may send: the attribute names,
/// their `<name>_attributes` forms, and for singular associations the
/// `<name>_id` and `<name>_type` columns `set` derives from them.
fn patch_keys(model: &ModelSchema, attributes: &Attributes) -> BTreeSet<String> {
    let mut keys = BTreeSet::new();
    for name in attributes.keys() {
        keys.insert(name.clone());
        keys.insert(format!("{name}_attributes"));
        if let Some(association) = model.reflect_on_association(name) {
            if !association.kind().is_collection() {
                keys.insert(association.id_key());
                keys.insert(association.type_key());
            }
        }
    }
    keys
}

fn patch_subset(map: Map<String, JsonValue>, keys: &BTreeSet<String>) -> Map<String, JsonValue> {
    map.into_iter()
        .filter(|(key, _)| keys.contains(key))
        .collect()
}
