//! Record: an attribute bag typed by its model schema.
//!
//! # Responsibility
//! - Coerce inbound attributes through field rules and materialize
//!   associations as records and collections.
//! - Re-type itself when the STI discriminator names another type.
//! - Project itself to wire JSON with nested `<name>_attributes`.
//!
//! # Invariants
//! - The discriminator is resolved before any coercion runs.
//! - hasMany/habtm collections are created eagerly and keep their identity;
//!   reassignment replaces their contents.
//! - Construction leaves the change map and the event queue empty.
//! - Coercion and resolution failures abort the call; associations already
//!   materialized by that call are not rolled back.
//!
//! # See also
//! - `crate::schema::registry::ModelRegistry::instantiate`

use crate::error::{ModelResult, NameResolutionError};
use crate::model::collection::{replace_members, Collection, CollectionRef, CollectionType};
use crate::model::projection::JsonOptions;
use crate::model::value::{Attributes, Value};
use crate::schema::association::{AssociationDescriptor, AssociationKind, ResolvedClass};
use crate::schema::model_schema::ModelSchema;
use crate::schema::registry::ModelRegistry;
use crate::types::{CoercionError, CoercionResult};
use log::{debug, warn};
use serde_json::{Map, Value as JsonValue};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::{Rc, Weak};
use uuid::Uuid;

pub type RecordRef = Rc<RefCell<Record>>;

/// Server-side validation messages keyed by attribute.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

/// Notification queued on a record until the caller drains it.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEvent {
    Change { attribute: String },
    Selected,
    Unselected,
    Invalid { errors: ValidationErrors },
}

/// Options for `Record::set`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetOptions {
    /// Remove the given keys instead of writing them.
    pub unset: bool,
}

pub struct Record {
    cid: String,
    model: Rc<ModelSchema>,
    attributes: Attributes,
    changed: BTreeMap<String, Option<Value>>,
    collection: Weak<RefCell<Collection>>,
    selected: bool,
    validation_errors: Option<ValidationErrors>,
    events: Vec<RecordEvent>,
}

impl Record {
    fn blank(model: Rc<ModelSchema>) -> Self {
        Self {
            cid: Uuid::new_v4().to_string(),
            model,
            attributes: Attributes::new(),
            changed: BTreeMap::new(),
            collection: Weak::new(),
            selected: false,
            validation_errors: None,
            events: Vec::new(),
        }
    }

    /// Constructs a record of `model`.
    ///
    /// Attributes are merged over field defaults, the discriminator is
    /// resolved and stamped, collections are created, and the result goes
    /// through `set`.
    pub fn build(
        registry: &ModelRegistry,
        model: Rc<ModelSchema>,
        attributes: Attributes,
    ) -> ModelResult<Self> {
        let mut merged = model.defaults();
        merged.extend(attributes);

        let model = match registry.resolve_inheritance(&model, &merged)? {
            Some(target) => {
                debug!(
                    "event=record_retype module=model status=ok from={} to={} stage=build",
                    model.model_name(),
                    target.model_name()
                );
                target
            }
            None => model,
        };
        registry.stamp_discriminator(&model, &mut merged);

        let mut record = Self::blank(model);
        record.init_collections(registry)?;
        record.set(registry, merged, SetOptions::default())?;
        record.changed.clear();
        record.events.clear();
        Ok(record)
    }

    /// Record for a nested `json` attribute named `attribute`.
    pub fn anonymous(attribute: &str, attributes: Attributes) -> Self {
        let mut record = Self::blank(Rc::new(ModelSchema::anonymous(attribute)));
        record.attributes = attributes;
        record
    }

    /// Unfetched record whose only attribute is `id`.
    pub fn with_id(model: Rc<ModelSchema>, id: Value) -> Self {
        let mut record = Self::blank(model);
        record.attributes.insert("id".to_string(), id);
        record
    }

    pub fn into_ref(self) -> RecordRef {
        Rc::new(RefCell::new(self))
    }

    pub fn cid(&self) -> &str {
        &self.cid
    }

    pub fn model(&self) -> &Rc<ModelSchema> {
        &self.model
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// True when `key` holds a non-null value.
    pub fn has(&self, key: &str) -> bool {
        self.attributes
            .get(key)
            .is_some_and(|value| !value.is_null())
    }

    pub fn id(&self) -> Option<Value> {
        self.attributes
            .get("id")
            .filter(|value| !value.is_null())
            .cloned()
    }

    pub fn is_new(&self) -> bool {
        self.id().is_none()
    }

    /// Changes applied since construction; `None` marks a removed key.
    pub fn changed(&self) -> &BTreeMap<String, Option<Value>> {
        &self.changed
    }

    /// Collection this record is a member of, if it is still alive.
    pub fn collection(&self) -> Option<CollectionRef> {
        self.collection.upgrade()
    }

    pub(crate) fn set_collection(&mut self, collection: Weak<RefCell<Collection>>) {
        self.collection = collection;
    }

    fn init_collections(&mut self, registry: &ModelRegistry) -> ModelResult<()> {
        let model = Rc::clone(&self.model);
        for association in model.collection_associations() {
            if self.attributes.contains_key(association.name()) {
                continue;
            }
            let kind = association.resolve_collection(registry)?;
            self.attributes.insert(
                association.name().to_string(),
                Value::Collection(Collection::new(kind).into_ref()),
            );
        }
        Ok(())
    }

    /// Applies `attributes`: STI re-typing, coercion, association handling
    /// and change tracking.
    pub fn set(
        &mut self,
        registry: &ModelRegistry,
        attributes: Attributes,
        options: SetOptions,
    ) -> ModelResult<()> {
        if let Some(target) = registry.resolve_inheritance(&self.model, &attributes)? {
            debug!(
                "event=record_retype module=model status=ok from={} to={} stage=set",
                self.model.model_name(),
                target.model_name()
            );
            self.model = target;
            self.init_collections(registry)?;
        }

        let coerced = self.coerce_attributes(registry, attributes)?;
        let model = Rc::clone(&self.model);
        let mut rest = Vec::with_capacity(coerced.len());
        for (key, value) in coerced {
            match model.reflect_on_association(&key) {
                Some(association) if association.kind().is_collection() => {
                    self.replace_collection(registry, association, &value)?;
                }
                Some(association) if association.kind() == AssociationKind::BelongsTo => {
                    self.assign_foreign_key(association, &value, options.unset);
                    rest.push((key, value));
                }
                _ => rest.push((key, value)),
            }
        }

        for (key, value) in rest {
            if options.unset {
                self.remove_attribute(&key);
            } else {
                self.write_attribute(key, value);
            }
        }
        Ok(())
    }

    /// Sets one attribute.
    pub fn set_value(
        &mut self,
        registry: &ModelRegistry,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> ModelResult<()> {
        let mut attributes = Attributes::new();
        attributes.insert(key.into(), value.into());
        self.set(registry, attributes, SetOptions::default())
    }

    /// Removes one attribute through `set`.
    pub fn unset(&mut self, registry: &ModelRegistry, key: &str) -> ModelResult<()> {
        let mut attributes = Attributes::new();
        attributes.insert(key.to_string(), Value::Null);
        self.set(registry, attributes, SetOptions { unset: true })
    }

    fn replace_collection(
        &mut self,
        registry: &ModelRegistry,
        association: &AssociationDescriptor,
        value: &Value,
    ) -> ModelResult<()> {
        let owned = match self.attributes.get(association.name()) {
            Some(Value::Collection(collection)) => Rc::clone(collection),
            _ => {
                let collection =
                    Collection::new(association.resolve_collection(registry)?).into_ref();
                self.attributes.insert(
                    association.name().to_string(),
                    Value::Collection(Rc::clone(&collection)),
                );
                collection
            }
        };

        let members = match value {
            Value::Collection(incoming) => incoming
                .try_borrow()
                .map(|incoming| incoming.to_array())
                .map_err(|_| {
                    CoercionError::invalid_input(
                        "borrowed collection",
                        association.collection_name().unwrap_or(association.name()),
                    )
                })?,
            _ => Vec::new(),
        };
        replace_members(&owned, members)?;
        Ok(())
    }

    fn assign_foreign_key(&mut self, association: &AssociationDescriptor, value: &Value, unset: bool) {
        let id_key = association.id_key();
        if !value.is_truthy() {
            if unset {
                self.attributes.remove(&id_key);
            } else {
                self.attributes.insert(id_key, value.clone());
            }
            return;
        }

        if let Value::Record(target) = value {
            match target.try_borrow() {
                Ok(target) => match target.id() {
                    Some(id) => {
                        self.attributes.insert(id_key, id);
                    }
                    None => {
                        self.attributes.remove(&id_key);
                    }
                },
                Err(_) => warn!(
                    "event=foreign_key_skip module=model status=error model={} association={}",
                    self.model.model_name(),
                    association.name()
                ),
            }
        }
    }

    fn write_attribute(&mut self, key: String, value: Value) {
        if self.attributes.get(&key) == Some(&value) {
            return;
        }
        self.changed.insert(key.clone(), Some(value.clone()));
        self.events.push(RecordEvent::Change {
            attribute: key.clone(),
        });
        self.attributes.insert(key, value);
    }

    fn remove_attribute(&mut self, key: &str) {
        if self.attributes.remove(key).is_some() {
            self.changed.insert(key.to_string(), None);
            self.events.push(RecordEvent::Change {
                attribute: key.to_string(),
            });
        }
    }

    /// Materializes associations and loads declared fields of `attributes`.
    ///
    /// Only truthy association values are touched; fields are loaded when
    /// truthy or `false`.
    pub fn coerce_attributes(
        &self,
        registry: &ModelRegistry,
        mut attributes: Attributes,
    ) -> ModelResult<Attributes> {
        let model = &self.model;
        for association in model.associations().values() {
            let name = association.name();
            let value = match attributes.get(name) {
                Some(value) if value.is_truthy() => value.clone(),
                _ => continue,
            };

            if association.is_polymorphic() {
                if let Value::Record(target) = &value {
                    if let Ok(target) = target.try_borrow() {
                        match target.id() {
                            Some(id) => attributes.insert(association.id_key(), id),
                            None => attributes.remove(&association.id_key()),
                        };
                        attributes.insert(
                            association.type_key(),
                            Value::String(target.model_name().to_string()),
                        );
                    }
                    continue;
                }

                let type_name = match attributes.get(&association.type_key()) {
                    Some(Value::String(type_name)) if !type_name.is_empty() => type_name.clone(),
                    _ => {
                        return Err(
                            NameResolutionError::MissingPolymorphicType(name.to_string()).into(),
                        )
                    }
                };
                let target = registry.model(&type_name)?;
                let wrapped = wrap_record(registry, &target, &value)?;
                attributes.insert(name.to_string(), Value::Record(wrapped));
                continue;
            }

            let wrapped = match association.resolve_class(registry)? {
                ResolvedClass::Model(target) => Value::Record(wrap_record(registry, &target, &value)?),
                ResolvedClass::Collection(kind) => wrap_collection(registry, &kind, &value)?,
            };
            attributes.insert(name.to_string(), wrapped);
        }

        for (key, rule) in model.fields() {
            let value = match attributes.get(key) {
                Some(value) if value.is_truthy() || matches!(value, Value::Bool(false)) => value,
                _ => continue,
            };
            let loaded = model.types().load(rule, value, key).map_err(|err| {
                warn!(
                    "event=coerce_attribute module=model status=error model={} attribute={} type={} error={}",
                    model.model_name(),
                    key,
                    rule.type_tag,
                    err
                );
                err
            })?;
            attributes.insert(key.clone(), loaded);
        }

        Ok(attributes)
    }

    /// Projects the record to wire JSON.
    ///
    /// Unincluded associations are dropped. Included singular associations
    /// become `<name>_attributes` (replacing `<name>` and `<name>_id`);
    /// included collections become arrays of member projections. Declared
    /// fields are dumped through their coercers.
    pub fn to_json(&self, options: &JsonOptions) -> CoercionResult<JsonValue> {
        let mut data = self.attributes.clone();
        let mut nested = Map::new();

        for association in self.model.associations().values() {
            let name = association.name();
            let Some(included) = options.included(name) else {
                data.remove(name);
                continue;
            };

            match data.get(name) {
                Some(value) if value.is_truthy() => {
                    nested.insert(association.attributes_key(), project(value, included)?);
                    data.remove(name);
                    if !association.kind().is_collection() {
                        data.remove(&association.id_key());
                    }
                }
                Some(Value::Null) if !association.kind().is_collection() => {
                    nested.insert(association.attributes_key(), JsonValue::Null);
                    data.remove(name);
                    data.remove(&association.id_key());
                }
                _ => {}
            }
        }

        let types = self.model.types();
        for (key, rule) in self.model.fields() {
            let Some(value) = data.get(key) else {
                continue;
            };
            if value.is_truthy() || matches!(value, Value::Bool(false)) {
                let dumped = types.dump(rule, value, key)?;
                data.insert(key.clone(), dumped);
            }
        }

        let mut map = Map::new();
        for (key, value) in &data {
            map.insert(key.clone(), value.to_json()?);
        }
        map.extend(nested);
        Ok(JsonValue::Object(map))
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Marks the record selected; inside a collection, other members are
    /// unselected unless `multiple`.
    pub fn select(&mut self, multiple: bool) {
        if !multiple {
            if let Some(collection) = self.collection() {
                if let Ok(collection) = collection.try_borrow() {
                    collection.unselect_others(&self.cid);
                }
            }
        }
        self.mark_selected();
    }

    pub(crate) fn mark_selected(&mut self) {
        if !self.selected {
            self.selected = true;
            self.events.push(RecordEvent::Selected);
        }
    }

    pub fn unselect(&mut self) {
        if self.selected {
            self.selected = false;
            self.events.push(RecordEvent::Unselected);
        }
    }

    /// Stores server validation errors and queues `Invalid`. Empty maps
    /// are ignored.
    pub fn set_errors(&mut self, errors: ValidationErrors) {
        if errors.is_empty() {
            return;
        }
        self.validation_errors = Some(errors.clone());
        self.events.push(RecordEvent::Invalid { errors });
    }

    pub fn errors_on(&self, attribute: &str) -> Option<&[String]> {
        self.validation_errors
            .as_ref()
            .and_then(|errors| errors.get(attribute))
            .map(Vec::as_slice)
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        self.validation_errors.as_ref()
    }

    pub fn clear_errors(&mut self) {
        self.validation_errors = None;
    }

    pub fn events(&self) -> &[RecordEvent] {
        &self.events
    }

    /// Returns and clears queued events.
    pub fn drain_events(&mut self) -> Vec<RecordEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn param_root(&self) -> &str {
        self.model.param_root()
    }

    /// `id` unless the record is new.
    pub fn to_param(&self) -> Option<Value> {
        self.id()
    }

    /// URL root, plus `/<id>` once persisted.
    pub fn url(&self) -> String {
        let root = self.model.url_root();
        match self.to_param() {
            None => root.to_string(),
            Some(id) => {
                let id = id.to_display_string().unwrap_or_default();
                if root.ends_with('/') {
                    format!("{root}{id}")
                } else {
                    format!("{root}/{id}")
                }
            }
        }
    }
}

impl Debug for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("cid", &self.cid)
            .field("model", &self.model.model_name())
            .field("attributes", &self.attributes)
            .field("selected", &self.selected)
            .finish()
    }
}

fn project(value: &Value, options: &JsonOptions) -> CoercionResult<JsonValue> {
    match value {
        Value::Record(record) => match record.try_borrow() {
            Ok(record) => record.to_json(options),
            Err(_) => Err(CoercionError::invalid_input("borrowed record", "JSON")),
        },
        Value::Collection(collection) => match collection.try_borrow() {
            Ok(collection) => collection.to_json(options),
            Err(_) => Err(CoercionError::invalid_input("borrowed collection", "JSON")),
        },
        other => other.to_json(),
    }
}

/// Keeps records already typed as `target` (or a descendant) and builds
/// one from an object otherwise.
fn wrap_record(
    registry: &ModelRegistry,
    target: &Rc<ModelSchema>,
    value: &Value,
) -> ModelResult<RecordRef> {
    match value {
        Value::Record(record) => {
            if let Ok(existing) = record.try_borrow() {
                if !existing.model().is_a(target.model_name()) {
                    return Err(CoercionError::invalid_input(
                        existing.model_name(),
                        target.model_name(),
                    )
                    .into());
                }
            }
            Ok(Rc::clone(record))
        }
        Value::Object(attributes) => {
            Ok(Record::build(registry, Rc::clone(target), attributes.clone())?.into_ref())
        }
        other => Err(CoercionError::invalid_input(other.type_name(), target.model_name()).into()),
    }
}

fn wrap_collection(
    registry: &ModelRegistry,
    kind: &CollectionType,
    value: &Value,
) -> ModelResult<Value> {
    let items = match value {
        Value::Collection(collection) => {
            let Ok(existing) = collection.try_borrow() else {
                return Ok(value.clone());
            };
            if existing.type_name() == kind.name() {
                return Ok(value.clone());
            }
            existing
                .models()
                .iter()
                .map(|member| Value::Record(Rc::clone(member)))
                .collect::<Vec<_>>()
        }
        Value::Array(items) => items.clone(),
        other => return Err(CoercionError::invalid_input(other.type_name(), kind.name()).into()),
    };

    let element = registry.model(kind.model_name())?;
    let members = items
        .iter()
        .map(|item| wrap_record(registry, &element, item))
        .collect::<ModelResult<Vec<_>>>()?;
    Ok(Value::Collection(
        Collection::with_models(kind.clone(), members).into_ref(),
    ))
}

#[cfg(test)]
mod tests {
    use super::{Record, RecordEvent, SetOptions, ValidationErrors};
    use crate::model::projection::JsonOptions;
    use crate::model::value::{Attributes, Value};
    use crate::schema::registry::{ModelDeclaration, ModelRegistry};
    use crate::types::{FieldRule, TYPE_NUMBER};
    use serde_json::json;

    fn registry() -> ModelRegistry {
        let mut registry = ModelRegistry::new();
        registry
            .declare_with_collection(
                ModelDeclaration::new("ship")
                    .belongs_to("ship")
                    .has_many("ships")
                    .field("crew", FieldRule::new(TYPE_NUMBER).with_default(json!(0))),
            )
            .expect("declare ship");
        registry
    }

    fn attrs(payload: serde_json::Value) -> Attributes {
        crate::model::value::attributes_from_json(payload).expect("object payload")
    }

    #[test]
    fn construction_applies_defaults_and_clears_tracking() {
        let registry = registry();
        let ship = registry
            .instantiate("ship", attrs(json!({"name": "Argo"})))
            .expect("instantiate");

        assert_eq!(ship.get("crew"), Some(&Value::from(0.0)));
        assert!(ship.get("ships").and_then(Value::as_collection).is_some());
        assert!(ship.changed().is_empty());
        assert!(ship.events().is_empty());
        assert!(ship.is_new());
    }

    #[test]
    fn set_tracks_changes_and_queues_events() {
        let registry = registry();
        let mut ship = registry
            .instantiate("ship", Attributes::new())
            .expect("instantiate");

        ship.set_value(&registry, "name", "Argo").expect("set name");
        ship.set_value(&registry, "name", "Argo").expect("set same name");
        assert_eq!(
            ship.drain_events(),
            vec![RecordEvent::Change {
                attribute: "name".to_string()
            }]
        );

        ship.unset(&registry, "name").expect("unset name");
        assert!(!ship.has("name"));
        assert_eq!(ship.changed().get("name"), Some(&None));
    }

    #[test]
    fn belongs_to_null_keeps_explicit_foreign_key() {
        let registry = registry();
        let mut ship = registry
            .instantiate("ship", Attributes::new())
            .expect("instantiate");

        let mut attributes = Attributes::new();
        attributes.insert("ship".to_string(), Value::Null);
        ship.set(&registry, attributes.clone(), SetOptions::default())
            .expect("set null");
        assert_eq!(ship.get("ship_id"), Some(&Value::Null));

        ship.set(&registry, attributes, SetOptions { unset: true })
            .expect("unset association");
        assert!(ship.get("ship_id").is_none());
        assert!(ship.get("ship").is_none());
    }

    #[test]
    fn belongs_to_record_copies_its_id() {
        let registry = registry();
        let ship = registry
            .instantiate("ship", attrs(json!({"ship": {"id": 12, "name": "Tender"}})))
            .expect("instantiate");
        assert_eq!(ship.get("ship_id"), Some(&Value::from(12.0)));
        assert_eq!(
            ship.to_json(&JsonOptions::default()).expect("to_json"),
            json!({"crew": 0, "ship_id": 12})
        );
    }

    #[test]
    fn selection_without_collection_toggles_flag() {
        let mut record = Record::anonymous("ship", Attributes::new());
        record.select(false);
        record.select(false);
        record.unselect();
        record.unselect();
        assert_eq!(
            record.drain_events(),
            vec![RecordEvent::Selected, RecordEvent::Unselected]
        );
    }

    #[test]
    fn set_errors_ignores_empty_maps() {
        let mut record = Record::anonymous("ship", Attributes::new());
        record.set_errors(ValidationErrors::new());
        assert!(record.events().is_empty());

        let mut errors = ValidationErrors::new();
        errors.insert("name".to_string(), vec!["can't be blank".to_string()]);
        record.set_errors(errors);
        assert_eq!(
            record.errors_on("name"),
            Some(&["can't be blank".to_string()][..])
        );
        assert!(matches!(
            record.events().last(),
            Some(RecordEvent::Invalid { .. })
        ));
        assert!(record.errors_on("crew").is_none());
    }

    #[test]
    fn url_appends_id_once_persisted() {
        let registry = registry();
        let fresh = registry
            .instantiate("ship", Attributes::new())
            .expect("instantiate");
        assert_eq!(fresh.url(), "/ships");
        assert_eq!(fresh.param_root(), "ship");

        let found = registry.find("ship", 42_i64).expect("find");
        assert_eq!(found.url(), "/ships/42");
        assert_eq!(found.to_param(), Some(Value::from(42_i64)));
        assert_eq!(found.attributes().len(), 1);
    }
}
