//! Association reflection: one declared relationship between models.
//!
//! # Invariants
//! - Targets are stored by name and resolved against the registry at first
//!   use, never at declaration time.
//! - Polymorphic singular associations carry no target model name.

use crate::error::NameResolutionError;
use crate::model::collection::CollectionType;
use crate::naming::{singularize, NameDescriptor};
use crate::schema::model_schema::ModelSchema;
use crate::schema::registry::ModelRegistry;
use serde::Serialize;
use std::rc::Rc;

/// Association macro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AssociationKind {
    BelongsTo,
    HasOne,
    HasMany,
    HasAndBelongsToMany,
}

impl AssociationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BelongsTo => "belongsTo",
            Self::HasOne => "hasOne",
            Self::HasMany => "hasMany",
            Self::HasAndBelongsToMany => "hasAndBelongsToMany",
        }
    }

    /// True for the collection-valued macros.
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany | Self::HasAndBelongsToMany)
    }
}

/// Options accepted by every association macro.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssociationOptions {
    pub model_name: Option<String>,
    pub collection_name: Option<String>,
    pub polymorphic: bool,
}

impl AssociationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn model_name(mut self, model_name: impl Into<String>) -> Self {
        self.model_name = Some(model_name.into());
        self
    }

    pub fn collection_name(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = Some(collection_name.into());
        self
    }

    pub fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }
}

/// Target of an association after registry lookup.
#[derive(Debug, Clone)]
pub enum ResolvedClass {
    Model(Rc<ModelSchema>),
    Collection(CollectionType),
}

/// Reflection of one declared association.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociationDescriptor {
    kind: AssociationKind,
    name: String,
    model_name: Option<NameDescriptor>,
    collection_name: Option<String>,
    options: AssociationOptions,
}

impl AssociationDescriptor {
    pub fn new(kind: AssociationKind, name: impl Into<String>, options: AssociationOptions) -> Self {
        let name = name.into();
        if kind.is_collection() {
            let model_name = NameDescriptor::new(
                options
                    .model_name
                    .clone()
                    .unwrap_or_else(|| singularize(&name))
                    .as_str(),
            );
            let collection_name = options
                .collection_name
                .clone()
                .unwrap_or_else(|| model_name.collection_name.clone());
            return Self {
                kind,
                name,
                model_name: Some(model_name),
                collection_name: Some(collection_name),
                options,
            };
        }

        let model_name = if options.polymorphic {
            None
        } else {
            Some(NameDescriptor::new(
                options.model_name.as_deref().unwrap_or(name.as_str()),
            ))
        };
        Self {
            kind,
            name,
            model_name,
            collection_name: None,
            options,
        }
    }

    pub fn belongs_to(name: impl Into<String>, options: AssociationOptions) -> Self {
        Self::new(AssociationKind::BelongsTo, name, options)
    }

    pub fn has_one(name: impl Into<String>, options: AssociationOptions) -> Self {
        Self::new(AssociationKind::HasOne, name, options)
    }

    pub fn has_many(name: impl Into<String>, options: AssociationOptions) -> Self {
        Self::new(AssociationKind::HasMany, name, options)
    }

    pub fn has_and_belongs_to_many(name: impl Into<String>, options: AssociationOptions) -> Self {
        Self::new(AssociationKind::HasAndBelongsToMany, name, options)
    }

    pub fn kind(&self) -> AssociationKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Naming of the target (element) model; `None` when polymorphic.
    pub fn model_name(&self) -> Option<&NameDescriptor> {
        self.model_name.as_ref()
    }

    /// Collection type name for hasMany/habtm.
    pub fn collection_name(&self) -> Option<&str> {
        self.collection_name.as_deref()
    }

    pub fn options(&self) -> &AssociationOptions {
        &self.options
    }

    /// Polymorphism only applies to singular associations.
    pub fn is_polymorphic(&self) -> bool {
        self.options.polymorphic && !self.kind.is_collection()
    }

    /// Foreign-key attribute, e.g. `ship_id`.
    pub fn id_key(&self) -> String {
        format!("{}_id", self.name)
    }

    /// Polymorphic discriminator attribute, e.g. `ship_type`.
    pub fn type_key(&self) -> String {
        format!("{}_type", self.name)
    }

    /// Nested-attributes key used by `to_json`, e.g. `ship_attributes`.
    pub fn attributes_key(&self) -> String {
        format!("{}_attributes", self.name)
    }

    /// Looks up the target (element) model.
    pub fn resolve_model(
        &self,
        registry: &ModelRegistry,
    ) -> Result<Rc<ModelSchema>, NameResolutionError> {
        match &self.model_name {
            Some(model_name) => registry.model(&model_name.name),
            None => Err(NameResolutionError::MissingPolymorphicType(self.name.clone())),
        }
    }

    /// Looks up the collection type of a hasMany/habtm association.
    pub fn resolve_collection(
        &self,
        registry: &ModelRegistry,
    ) -> Result<CollectionType, NameResolutionError> {
        match &self.collection_name {
            Some(collection_name) => registry.collection_type(collection_name).cloned(),
            None => Err(NameResolutionError::UnknownCollection(format!(
                "{} has no collection",
                self.name
            ))),
        }
    }

    /// Collection type for hasMany/habtm, model type otherwise.
    pub fn resolve_class(
        &self,
        registry: &ModelRegistry,
    ) -> Result<ResolvedClass, NameResolutionError> {
        if self.kind.is_collection() {
            self.resolve_collection(registry)
                .map(ResolvedClass::Collection)
        } else {
            self.resolve_model(registry).map(ResolvedClass::Model)
        }
    }
}
