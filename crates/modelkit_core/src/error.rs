//! Hard error types shared across the crate.
//!
//! # Responsibility
//! - Name the failure classes of declaration, name resolution, coercion
//!   and persistence.
//! - Aggregate them into `ModelError` for record-level entry points.
//!
//! # Invariants
//! - Validation errors are soft and never appear here; see
//!   `crate::model::record::ValidationErrors`.

use crate::sync::persist::PersistError;
use crate::types::CoercionError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ModelResult<T> = Result<T, ModelError>;

/// A model or collection name could not be resolved in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameResolutionError {
    UnknownModel(String),
    UnknownCollection(String),
    /// Polymorphic association without a record value or `<name>_type`.
    MissingPolymorphicType(String),
    /// STI discriminator names a type from another inheritance family.
    OutsideInheritance { discriminator: String, base: String },
}

impl Display for NameResolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownModel(name) => write!(f, "unknown model: {name}"),
            Self::UnknownCollection(name) => write!(f, "unknown collection: {name}"),
            Self::MissingPolymorphicType(name) => {
                write!(f, "polymorphic association `{name}` has no `{name}_type`")
            }
            Self::OutsideInheritance {
                discriminator,
                base,
            } => write!(f, "{discriminator} is not a descendant of {base}"),
        }
    }
}

impl Error for NameResolutionError {}

/// A model or collection declaration was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    EmptyName,
    DuplicateModel(String),
    DuplicateCollection(String),
    UnknownParent { model: String, parent: String },
    /// Custom type registered after the first model declaration.
    TypeRegistrySealed(String),
}

impl Display for DeclarationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "model name must not be empty"),
            Self::DuplicateModel(name) => write!(f, "model already declared: {name}"),
            Self::DuplicateCollection(name) => write!(f, "collection already declared: {name}"),
            Self::UnknownParent { model, parent } => {
                write!(f, "model {model} extends undeclared parent {parent}")
            }
            Self::TypeRegistrySealed(tag) => {
                write!(f, "type `{tag}` must be registered before declaring models")
            }
        }
    }
}

impl Error for DeclarationError {}

/// Aggregate error for record construction, `set`, and persistence.
#[derive(Debug)]
pub enum ModelError {
    Coercion(CoercionError),
    NameResolution(NameResolutionError),
    Declaration(DeclarationError),
    Persist(PersistError),
    /// Inbound payload was not a JSON object.
    InvalidPayload(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Coercion(err) => write!(f, "{err}"),
            Self::NameResolution(err) => write!(f, "{err}"),
            Self::Declaration(err) => write!(f, "{err}"),
            Self::Persist(err) => write!(f, "{err}"),
            Self::InvalidPayload(found) => write!(f, "expected a JSON object, found {found}"),
        }
    }
}

impl Error for ModelError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Coercion(err) => Some(err),
            Self::NameResolution(err) => Some(err),
            Self::Declaration(err) => Some(err),
            Self::Persist(err) => Some(err),
            Self::InvalidPayload(_) => None,
        }
    }
}

impl From<CoercionError> for ModelError {
    fn from(value: CoercionError) -> Self {
        Self::Coercion(value)
    }
}

impl From<NameResolutionError> for ModelError {
    fn from(value: NameResolutionError) -> Self {
        Self::NameResolution(value)
    }
}

impl From<DeclarationError> for ModelError {
    fn from(value: DeclarationError) -> Self {
        Self::Declaration(value)
    }
}

impl From<PersistError> for ModelError {
    fn from(value: PersistError) -> Self {
        Self::Persist(value)
    }
}
