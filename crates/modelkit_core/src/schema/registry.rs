//! Model declaration and the explicit type namespace.
//!
//! # Responsibility
//! - Build `ModelSchema` values from declarations, composing inherited
//!   associations and field rules.
//! - Resolve model and collection names for associations and STI.
//!
//! # Invariants
//! - Model names are unique after camelization; collection names are unique.
//! - A type is its own base model when its parent is abstract (the implicit
//!   root included) or inheritance is disabled; otherwise it is listed as a
//!   descendant of its parent's base.
//! - Within one declaration the first entry for a name wins; a child entry
//!   overrides its parent's.

use crate::config::CoreConfig;
use crate::error::{DeclarationError, ModelError, ModelResult, NameResolutionError};
use crate::model::collection::CollectionType;
use crate::model::record::Record;
use crate::model::value::{attributes_from_json, Attributes, Value};
use crate::naming::{camelize, NameDescriptor};
use crate::schema::association::{AssociationDescriptor, AssociationOptions};
use crate::schema::model_schema::ModelSchema;
use crate::types::{Coercer, FieldRule, TypeRegistry};
use log::debug;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::rc::Rc;

/// STI discriminator setting of one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InheritanceKey {
    /// Use the parent's key, or the configured root key.
    #[default]
    Inherit,
    /// Disable STI for this type and, unless overridden, its children.
    Disabled,
    Key(String),
}

/// Builder describing one model type.
#[derive(Debug, Clone)]
pub struct ModelDeclaration {
    name: String,
    parent: Option<String>,
    is_abstract: bool,
    inheritance_key: InheritanceKey,
    url_root: Option<String>,
    associations: Vec<AssociationDescriptor>,
    fields: Vec<(String, FieldRule)>,
}

impl ModelDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            is_abstract: false,
            inheritance_key: InheritanceKey::Inherit,
            url_root: None,
            associations: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Derives from a declared model.
    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Children of an abstract type are their own base models.
    pub fn abstract_model(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn inheritance_key(mut self, key: impl Into<String>) -> Self {
        self.inheritance_key = InheritanceKey::Key(key.into());
        self
    }

    pub fn without_inheritance(mut self) -> Self {
        self.inheritance_key = InheritanceKey::Disabled;
        self
    }

    pub fn url_root(mut self, url_root: impl Into<String>) -> Self {
        self.url_root = Some(url_root.into());
        self
    }

    pub fn belongs_to(self, name: impl Into<String>) -> Self {
        self.belongs_to_with(name, AssociationOptions::new())
    }

    pub fn belongs_to_with(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.associations
            .push(AssociationDescriptor::belongs_to(name, options));
        self
    }

    pub fn has_one(self, name: impl Into<String>) -> Self {
        self.has_one_with(name, AssociationOptions::new())
    }

    pub fn has_one_with(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.associations
            .push(AssociationDescriptor::has_one(name, options));
        self
    }

    pub fn has_many(self, name: impl Into<String>) -> Self {
        self.has_many_with(name, AssociationOptions::new())
    }

    pub fn has_many_with(mut self, name: impl Into<String>, options: AssociationOptions) -> Self {
        self.associations
            .push(AssociationDescriptor::has_many(name, options));
        self
    }

    pub fn has_and_belongs_to_many(self, name: impl Into<String>) -> Self {
        self.has_and_belongs_to_many_with(name, AssociationOptions::new())
    }

    pub fn has_and_belongs_to_many_with(
        mut self,
        name: impl Into<String>,
        options: AssociationOptions,
    ) -> Self {
        self.associations
            .push(AssociationDescriptor::has_and_belongs_to_many(name, options));
        self
    }

    pub fn field(mut self, name: impl Into<String>, rule: FieldRule) -> Self {
        self.fields.push((name.into(), rule));
        self
    }
}

/// Registry of declared model and collection types.
#[derive(Debug)]
pub struct ModelRegistry {
    types: Rc<TypeRegistry>,
    root_inheritance_key: String,
    models: BTreeMap<String, Rc<ModelSchema>>,
    descendants: BTreeMap<String, Vec<String>>,
    collections: BTreeMap<String, CollectionType>,
}

impl ModelRegistry {
    /// Registry with the builtin coercers and default configuration.
    pub fn new() -> Self {
        Self::with_config(&CoreConfig::default(), TypeRegistry::with_builtin_types())
    }

    pub fn with_config(config: &CoreConfig, types: TypeRegistry) -> Self {
        Self {
            types: Rc::new(types),
            root_inheritance_key: config.inheritance_key.clone(),
            models: BTreeMap::new(),
            descendants: BTreeMap::new(),
            collections: BTreeMap::new(),
        }
    }

    pub fn types(&self) -> &Rc<TypeRegistry> {
        &self.types
    }

    /// Registers a custom coercer.
    ///
    /// # Errors
    /// - `DeclarationError::TypeRegistrySealed` once a model is declared.
    /// - `CoercionError::DuplicateType` when the tag already exists.
    pub fn register_type(
        &mut self,
        tag: impl Into<String>,
        coercer: Box<dyn Coercer>,
    ) -> ModelResult<()> {
        let tag = tag.into();
        match Rc::get_mut(&mut self.types) {
            Some(types) => types.register(tag, coercer).map_err(ModelError::from),
            None => Err(DeclarationError::TypeRegistrySealed(tag).into()),
        }
    }

    /// Declares one model type and returns its effective schema.
    pub fn declare(
        &mut self,
        declaration: ModelDeclaration,
    ) -> Result<Rc<ModelSchema>, DeclarationError> {
        let raw_name = declaration.name.trim();
        if raw_name.is_empty() {
            return Err(DeclarationError::EmptyName);
        }
        let naming = NameDescriptor::new(raw_name);
        if self.models.contains_key(naming.name.as_str()) {
            return Err(DeclarationError::DuplicateModel(naming.name));
        }

        let parent = match declaration.parent.as_deref() {
            Some(parent_name) => Some(self.model(parent_name).map_err(|_| {
                DeclarationError::UnknownParent {
                    model: naming.name.clone(),
                    parent: parent_name.to_string(),
                }
            })?),
            None => None,
        };

        let inheritance_key = match declaration.inheritance_key {
            InheritanceKey::Inherit => match &parent {
                Some(parent) => parent.inheritance_key.clone(),
                None => Some(self.root_inheritance_key.clone()),
            },
            InheritanceKey::Disabled => None,
            InheritanceKey::Key(key) => Some(key),
        };

        let base_model = match &parent {
            Some(parent) if !parent.is_abstract && inheritance_key.is_some() => {
                parent.base_model.clone()
            }
            _ => naming.name.clone(),
        };

        let mut lineage = vec![naming.name.clone()];
        let mut associations = BTreeMap::new();
        let mut fields = BTreeMap::new();
        for association in declaration.associations {
            associations
                .entry(association.name().to_string())
                .or_insert(association);
        }
        for (name, rule) in declaration.fields {
            fields.entry(name).or_insert(rule);
        }
        if let Some(parent) = &parent {
            lineage.extend(parent.lineage.iter().cloned());
            for (name, association) in &parent.associations {
                associations
                    .entry(name.clone())
                    .or_insert_with(|| association.clone());
            }
            for (name, rule) in &parent.fields {
                fields.entry(name.clone()).or_insert_with(|| rule.clone());
            }
        }

        let base_schema = self.models.get(base_model.as_str()).cloned();
        let (base_naming, base_url_root) = match &base_schema {
            Some(base) => (&base.naming, base.own_url_root.clone()),
            None => (&naming, None),
        };
        let url_root = declaration
            .url_root
            .clone()
            .or(base_url_root)
            .unwrap_or_else(|| format!("/{}", base_naming.plural));
        let param_root = base_naming.param_key.clone();

        let schema = Rc::new(ModelSchema {
            model_name: naming.name.clone(),
            lineage,
            base_model: base_model.clone(),
            is_abstract: declaration.is_abstract,
            inheritance_key,
            own_url_root: declaration.url_root,
            url_root,
            param_root,
            associations,
            fields,
            types: Rc::clone(&self.types),
            naming,
        });

        if !schema.is_base_model() {
            self.descendants
                .entry(base_model)
                .or_default()
                .push(schema.model_name.clone());
        }
        self.models
            .insert(schema.model_name.clone(), Rc::clone(&schema));

        debug!(
            "event=model_declare module=schema status=ok model={} base={} associations={} fields={}",
            schema.model_name,
            schema.base_model,
            schema.associations.len(),
            schema.fields.len()
        );
        Ok(schema)
    }

    /// Declares a collection type holding `model_name` elements.
    pub fn declare_collection(
        &mut self,
        name: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<(), DeclarationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DeclarationError::EmptyName);
        }
        if self.collections.contains_key(name.as_str()) {
            return Err(DeclarationError::DuplicateCollection(name));
        }

        let model_name = camelize(model_name.into().trim(), true);
        debug!(
            "event=collection_declare module=schema status=ok collection={} model={}",
            name, model_name
        );
        self.collections
            .insert(name.clone(), CollectionType::new(name, model_name));
        Ok(())
    }

    /// Declares a model together with its `<Name>Collection` type.
    pub fn declare_with_collection(
        &mut self,
        declaration: ModelDeclaration,
    ) -> Result<Rc<ModelSchema>, DeclarationError> {
        let schema = self.declare(declaration)?;
        self.declare_collection(schema.naming.collection_name.clone(), schema.model_name())?;
        Ok(schema)
    }

    /// Looks up a model by canonical or raw (`admin/user`) name.
    pub fn model(&self, name: &str) -> Result<Rc<ModelSchema>, NameResolutionError> {
        self.models
            .get(name)
            .or_else(|| self.models.get(camelize(name, true).as_str()))
            .cloned()
            .ok_or_else(|| NameResolutionError::UnknownModel(name.to_string()))
    }

    pub fn collection_type(&self, name: &str) -> Result<&CollectionType, NameResolutionError> {
        self.collections
            .get(name)
            .ok_or_else(|| NameResolutionError::UnknownCollection(name.to_string()))
    }

    /// Descendant type names of `base_model`, in declaration order.
    pub fn descendants(&self, base_model: &str) -> &[String] {
        self.descendants
            .get(base_model)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn model_names(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn collection_names(&self) -> Vec<String> {
        self.collections.keys().cloned().collect()
    }

    /// Returns the type named by the STI discriminator in `attributes` when
    /// it differs from `current`.
    ///
    /// # Errors
    /// - `UnknownModel` when the discriminator names no declared type.
    /// - `OutsideInheritance` when it names a type with another base model.
    pub fn resolve_inheritance(
        &self,
        current: &Rc<ModelSchema>,
        attributes: &Attributes,
    ) -> Result<Option<Rc<ModelSchema>>, NameResolutionError> {
        let Some(key) = current.inheritance_key() else {
            return Ok(None);
        };
        let discriminator = match attributes.get(key) {
            Some(Value::String(discriminator)) if !discriminator.is_empty() => discriminator,
            _ => return Ok(None),
        };
        if discriminator == current.model_name() {
            return Ok(None);
        }

        let target = self.model(discriminator)?;
        if target.model_name() == current.model_name() {
            return Ok(None);
        }
        if target.base_model() != current.base_model() {
            return Err(NameResolutionError::OutsideInheritance {
                discriminator: discriminator.clone(),
                base: current.base_model().to_string(),
            });
        }
        Ok(Some(target))
    }

    /// Writes the discriminator for bases with descendants and for
    /// registered descendants.
    pub fn stamp_discriminator(&self, schema: &ModelSchema, attributes: &mut Attributes) {
        let Some(key) = schema.inheritance_key() else {
            return;
        };
        let descendants = self.descendants(schema.base_model());
        let stamp = if schema.is_base_model() {
            !descendants.is_empty()
        } else {
            descendants.iter().any(|name| name == schema.model_name())
        };
        if stamp {
            attributes.insert(
                key.to_string(),
                Value::String(schema.model_name().to_string()),
            );
        }
    }

    /// Constructs a record of type `name`.
    pub fn instantiate(&self, name: &str, attributes: Attributes) -> ModelResult<Record> {
        Record::build(self, self.model(name)?, attributes)
    }

    /// Constructs a record of type `name` from a JSON object payload.
    pub fn instantiate_json(&self, name: &str, payload: JsonValue) -> ModelResult<Record> {
        let attributes = match payload {
            JsonValue::Object(_) => attributes_from_json(payload).unwrap_or_default(),
            other => {
                return Err(ModelError::InvalidPayload(
                    Value::from(other).type_name().to_string(),
                ))
            }
        };
        self.instantiate(name, attributes)
    }

    /// Constructs an unfetched record of type `name` holding only `id`.
    pub fn find(&self, name: &str, id: impl Into<Value>) -> ModelResult<Record> {
        Ok(Record::with_id(self.model(name)?, id.into()))
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
