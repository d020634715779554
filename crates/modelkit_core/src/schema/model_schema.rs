//! Per-model-type schema produced by declaration.

use crate::model::value::{Attributes, Value};
use crate::naming::NameDescriptor;
use crate::schema::association::{AssociationDescriptor, AssociationKind};
use crate::types::{FieldRule, TypeRegistry};
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Effective schema of one declared model type.
///
/// Association and field maps already contain inherited declarations;
/// the schema is immutable once declared.
pub struct ModelSchema {
    pub(crate) naming: NameDescriptor,
    pub(crate) model_name: String,
    pub(crate) lineage: Vec<String>,
    pub(crate) base_model: String,
    pub(crate) is_abstract: bool,
    pub(crate) inheritance_key: Option<String>,
    pub(crate) own_url_root: Option<String>,
    pub(crate) url_root: String,
    pub(crate) param_root: String,
    pub(crate) associations: BTreeMap<String, AssociationDescriptor>,
    pub(crate) fields: BTreeMap<String, FieldRule>,
    pub(crate) types: Rc<TypeRegistry>,
}

impl ModelSchema {
    /// Schema for nested `json` attributes: no associations, no fields and
    /// inheritance disabled. The model name is `key` verbatim.
    pub fn anonymous(key: &str) -> Self {
        let naming = NameDescriptor::new(key);
        Self {
            model_name: key.to_string(),
            lineage: vec![key.to_string()],
            base_model: key.to_string(),
            is_abstract: false,
            inheritance_key: None,
            own_url_root: None,
            url_root: format!("/{}", naming.plural),
            param_root: naming.param_key.clone(),
            naming,
            associations: BTreeMap::new(),
            fields: BTreeMap::new(),
            types: Rc::new(TypeRegistry::empty()),
        }
    }

    pub fn naming(&self) -> &NameDescriptor {
        &self.naming
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Name of the STI root this type dispatches from.
    pub fn base_model(&self) -> &str {
        &self.base_model
    }

    pub fn is_base_model(&self) -> bool {
        self.base_model == self.model_name
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    /// Attribute holding the STI discriminator; `None` when disabled.
    pub fn inheritance_key(&self) -> Option<&str> {
        self.inheritance_key.as_deref()
    }

    pub fn url_root(&self) -> &str {
        &self.url_root
    }

    /// Key the attributes are namespaced under when saving.
    pub fn param_root(&self) -> &str {
        &self.param_root
    }

    /// This type followed by its ancestors, nearest first.
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// True when this type is `model_name` or one of its descendants.
    pub fn is_a(&self, model_name: &str) -> bool {
        self.lineage.iter().any(|name| name == model_name)
    }

    pub fn types(&self) -> &Rc<TypeRegistry> {
        &self.types
    }

    pub fn reflect_on_association(&self, name: &str) -> Option<&AssociationDescriptor> {
        self.associations.get(name)
    }

    /// All associations, or only those of `kind`, ordered by name.
    pub fn reflect_on_associations(
        &self,
        kind: Option<AssociationKind>,
    ) -> Vec<&AssociationDescriptor> {
        self.associations
            .values()
            .filter(|association| kind.map_or(true, |kind| association.kind() == kind))
            .collect()
    }

    /// hasMany and habtm associations.
    pub fn collection_associations(&self) -> impl Iterator<Item = &AssociationDescriptor> {
        self.associations
            .values()
            .filter(|association| association.kind().is_collection())
    }

    pub fn associations(&self) -> &BTreeMap<String, AssociationDescriptor> {
        &self.associations
    }

    pub fn field(&self, name: &str) -> Option<&FieldRule> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldRule> {
        &self.fields
    }

    /// Field defaults applied at construction.
    pub fn defaults(&self) -> Attributes {
        self.fields
            .iter()
            .filter_map(|(key, rule)| {
                rule.default
                    .clone()
                    .map(|default| (key.clone(), Value::from(default)))
            })
            .collect()
    }
}

impl Debug for ModelSchema {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSchema")
            .field("model_name", &self.model_name)
            .field("base_model", &self.base_model)
            .field("inheritance_key", &self.inheritance_key)
            .field("associations", &self.associations.keys().collect::<Vec<_>>())
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::ModelSchema;

    #[test]
    fn anonymous_schema_keeps_raw_key_and_disables_inheritance() {
        let schema = ModelSchema::anonymous("settings");
        assert_eq!(schema.model_name(), "settings");
        assert!(schema.inheritance_key().is_none());
        assert!(schema.is_base_model());
        assert!(schema.associations().is_empty());
        assert!(schema.defaults().is_empty());
        assert!(schema.types().tags().is_empty());
    }
}
