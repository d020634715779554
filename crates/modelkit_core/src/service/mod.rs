//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate record projection and the `Persist` SPI into save/create
//!   entry points.
//! - Keep transports decoupled from coercion and schema details.

pub mod record_service;
