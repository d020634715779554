//! Persistence hand-off.
//!
//! # Responsibility
//! - Define the `Persist` SPI that saves leave the core through.
//!
//! # See also
//! - `crate::service::record_service` for the save workflow.

pub mod persist;
