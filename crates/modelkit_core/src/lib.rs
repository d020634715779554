//! Client-side model layer: typed attributes, associations, single-table
//! inheritance and JSON projection over plain attribute bags.

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod naming;
pub mod schema;
pub mod service;
pub mod sync;
pub mod types;

pub use config::{ConfigError, CoreConfig, DEFAULT_INHERITANCE_KEY};
pub use error::{DeclarationError, ModelError, ModelResult, NameResolutionError};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::collection::{
    add_member, replace_members, Collection, CollectionRef, CollectionType,
};
pub use model::projection::JsonOptions;
pub use model::record::{Record, RecordEvent, RecordRef, SetOptions, ValidationErrors};
pub use model::value::{attributes_from_json, Attributes, Value};
pub use naming::NameDescriptor;
pub use schema::{
    AssociationDescriptor, AssociationKind, AssociationOptions, InheritanceKey, ModelDeclaration,
    ModelRegistry, ModelSchema, ResolvedClass,
};
pub use service::record_service::{RecordService, SaveOptions, SaveOutcome};
pub use sync::persist::{
    Persist, PersistError, PersistMethod, PersistRequest, PersistResponse, PersistResult,
};
pub use types::{
    Coercer, CoercionError, CoercionResult, FieldRule, TypeRegistry, TYPE_BOOLEAN, TYPE_DATE,
    TYPE_JSON, TYPE_NUMBER, TYPE_STRING,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
