//! Runtime model layer: values, records and collections.
//!
//! # Responsibility
//! - Hold typed attribute values and the records/collections built from
//!   declared schemas.
//! - Project records back to wire JSON.
//!
//! # Invariants
//! - Records and collections are shared through `Rc<RefCell<_>>`; member
//!   back-references are weak.
//! - Nothing in this layer is `Send` or `Sync`.
//!
//! # See also
//! - `crate::schema` for declarations and name resolution.

pub mod collection;
pub mod projection;
pub mod record;
pub mod value;
