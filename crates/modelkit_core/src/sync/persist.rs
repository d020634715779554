//! Persistence SPI: the transport seam records are saved through.
//!
//! # Responsibility
//! - Describe one save request in wire terms (method, url, namespaced body).
//! - Let callers plug in any transport; the core never performs I/O.
//!
//! # Invariants
//! - The body is always `{ <param_root>: <projection> }`.
//! - No retries; transport failures surface as `PersistError`.

use crate::model::record::ValidationErrors;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type PersistResult<T> = Result<T, PersistError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMethod {
    Create,
    Update,
    Patch,
}

impl PersistMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Patch => "patch",
        }
    }
}

/// One save request handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistRequest {
    pub method: PersistMethod,
    pub url: String,
    pub body: JsonValue,
}

impl PersistRequest {
    /// Namespaces `payload` under `param_root`.
    pub fn new(
        method: PersistMethod,
        url: impl Into<String>,
        param_root: &str,
        payload: JsonValue,
    ) -> Self {
        let mut body = Map::new();
        body.insert(param_root.to_string(), payload);
        Self {
            method,
            url: url.into(),
            body: JsonValue::Object(body),
        }
    }
}

/// Transport outcome for a request that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistResponse {
    /// Server-side attributes to apply to the record.
    Saved(JsonValue),
    /// Validation rejection; stored on the record, never raised.
    Invalid(ValidationErrors),
}

/// Opaque transport failure envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistError {
    pub method: PersistMethod,
    pub code: String,
    pub message: String,
}

impl PersistError {
    pub fn new(method: PersistMethod, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            method,
            code: code.into(),
            message: message.into(),
        }
    }
}

impl Display for PersistError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "persist {} failed [{}]: {}",
            self.method.as_str(),
            self.code,
            self.message
        )
    }
}

impl Error for PersistError {}

/// Transport implemented by the embedding application.
pub trait Persist {
    fn persist(&self, request: &PersistRequest) -> PersistResult<PersistResponse>;
}

impl<P: Persist + ?Sized> Persist for &P {
    fn persist(&self, request: &PersistRequest) -> PersistResult<PersistResponse> {
        (**self).persist(request)
    }
}
