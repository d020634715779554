//! Ordered record container backing hasMany/habtm associations.
//!
//! # Invariants
//! - Members are shared `RecordRef`s; a member points back to the collection
//!   that owns it through a weak reference.
//! - Replacing contents never changes the collection's identity.

use crate::model::projection::JsonOptions;
use crate::model::record::RecordRef;
use crate::types::{CoercionError, CoercionResult};
use serde_json::Value as JsonValue;
use std::cell::RefCell;
use std::rc::Rc;

pub type CollectionRef = Rc<RefCell<Collection>>;

/// Declared collection type: its name and element model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionType {
    name: String,
    model_name: String,
}

impl CollectionType {
    pub fn new(name: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_name: model_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[derive(Debug)]
pub struct Collection {
    kind: CollectionType,
    models: Vec<RecordRef>,
}

impl Collection {
    pub fn new(kind: CollectionType) -> Self {
        Self {
            kind,
            models: Vec::new(),
        }
    }

    pub fn with_models(kind: CollectionType, models: Vec<RecordRef>) -> Self {
        Self { kind, models }
    }

    pub fn into_ref(self) -> CollectionRef {
        Rc::new(RefCell::new(self))
    }

    pub fn kind(&self) -> &CollectionType {
        &self.kind
    }

    pub fn type_name(&self) -> &str {
        self.kind.name()
    }

    pub fn model_name(&self) -> &str {
        self.kind.model_name()
    }

    pub fn models(&self) -> &[RecordRef] {
        &self.models
    }

    pub fn to_array(&self) -> Vec<RecordRef> {
        self.models.clone()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Finds a member by client id.
    pub fn get(&self, cid: &str) -> Option<RecordRef> {
        self.models
            .iter()
            .find(|member| {
                member
                    .try_borrow()
                    .map(|record| record.cid() == cid)
                    .unwrap_or(false)
            })
            .cloned()
    }

    pub fn add(&mut self, record: RecordRef) {
        self.models.push(record);
    }

    /// Replaces the contents.
    pub fn set(&mut self, records: Vec<RecordRef>) {
        self.models = records;
    }

    /// Members whose `selected` flag is set.
    pub fn selected(&self) -> Vec<RecordRef> {
        self.models
            .iter()
            .filter(|member| {
                member
                    .try_borrow()
                    .map(|record| record.is_selected())
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// Selects `record`; other members are unselected unless `multiple`.
    pub fn select(&self, record: &RecordRef, multiple: bool) {
        if !multiple {
            if let Ok(target) = record.try_borrow() {
                self.unselect_others(target.cid());
            }
        }
        if let Ok(mut target) = record.try_borrow_mut() {
            target.mark_selected();
        }
    }

    /// Unselects every member except the one with `cid`. Members that are
    /// currently borrowed are skipped.
    pub(crate) fn unselect_others(&self, cid: &str) {
        for member in &self.models {
            if let Ok(mut record) = member.try_borrow_mut() {
                if record.cid() != cid {
                    record.unselect();
                }
            }
        }
    }

    /// Array of member projections.
    pub fn to_json(&self, options: &JsonOptions) -> CoercionResult<JsonValue> {
        self.models
            .iter()
            .map(|member| match member.try_borrow() {
                Ok(record) => record.to_json(options),
                Err(_) => Err(CoercionError::invalid_input("borrowed record", "JSON")),
            })
            .collect::<CoercionResult<Vec<_>>>()
            .map(JsonValue::Array)
    }
}

/// Replaces the contents of `collection` and re-points each member's
/// back-reference to it.
///
/// # Errors
/// - `CoercionError::InvalidInput` when the collection or a member is
///   currently borrowed; nothing is changed in that case.
pub fn replace_members(collection: &CollectionRef, records: Vec<RecordRef>) -> CoercionResult<()> {
    let mut target = collection
        .try_borrow_mut()
        .map_err(|_| CoercionError::invalid_input("borrowed collection", "members"))?;
    let mut members = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        if records[..index].iter().any(|seen| Rc::ptr_eq(seen, record)) {
            continue;
        }
        let member = record
            .try_borrow_mut()
            .map_err(|_| CoercionError::invalid_input("borrowed record", target.type_name()))?;
        members.push(member);
    }
    for member in &mut members {
        member.set_collection(Rc::downgrade(collection));
    }
    drop(members);
    target.set(records);
    Ok(())
}

/// Appends `record` to `collection` and points it back to the collection.
///
/// # Errors
/// - `CoercionError::InvalidInput` when the collection or the record is
///   currently borrowed.
pub fn add_member(collection: &CollectionRef, record: RecordRef) -> CoercionResult<()> {
    let mut target = collection
        .try_borrow_mut()
        .map_err(|_| CoercionError::invalid_input("borrowed collection", "members"))?;
    record
        .try_borrow_mut()
        .map_err(|_| CoercionError::invalid_input("borrowed record", target.type_name()))?
        .set_collection(Rc::downgrade(collection));
    target.add(record);
    Ok(())
}
