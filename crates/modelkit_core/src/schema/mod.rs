//! Model declaration, schemas and association reflection.
//!
//! # Responsibility
//! - Turn declarations into immutable `ModelSchema` values.
//! - Keep the explicit type namespace used for association and STI
//!   resolution.
//!
//! # Invariants
//! - Schemas never change after declaration; records share them via `Rc`.
//! - Name resolution is lazy and returns `NameResolutionError` on failure.

pub mod association;
pub mod model_schema;
pub mod registry;

pub use association::{AssociationDescriptor, AssociationKind, AssociationOptions, ResolvedClass};
pub use model_schema::ModelSchema;
pub use registry::{InheritanceKey, ModelDeclaration, ModelRegistry};
