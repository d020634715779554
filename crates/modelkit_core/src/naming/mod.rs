//! Model naming and inflection.
//!
//! # Responsibility
//! - Derive every naming form a model needs (keys, routes, labels) from
//!   its declared name.
//! - Expose the inflection helpers used by association reflection.
//!
//! # Invariants
//! - `NameDescriptor::new` is a pure deterministic function of its input.

pub mod inflector;
pub mod name;

pub use inflector::{
    camelize, capitalize, demodulize, humanize, pluralize, singularize, titleize, underscore,
};
pub use name::NameDescriptor;
