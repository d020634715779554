//! Core configuration.
//!
//! # Responsibility
//! - Carry process-wide defaults: the root STI key and logging settings.
//! - Parse and validate configuration supplied as JSON text.
//!
//! # Invariants
//! - Every field has a default; an empty object is a valid configuration.
//! - A validated config always has a non-empty inheritance key, a supported
//!   log level and, when set, an absolute log directory.

use crate::logging::{default_log_level, init_logging, normalize_level};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Default STI discriminator attribute.
pub const DEFAULT_INHERITANCE_KEY: &str = "type";

/// Configuration rejected by `CoreConfig::from_json_str` or `validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    Parse(String),
    EmptyInheritanceKey,
    UnsupportedLogLevel(String),
    RelativeLogDir(String),
    Logging(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(message) => write!(f, "invalid config json: {message}"),
            Self::EmptyInheritanceKey => write!(f, "inheritance_key cannot be empty"),
            Self::UnsupportedLogLevel(message) => write!(f, "{message}"),
            Self::RelativeLogDir(dir) => {
                write!(f, "log_dir must be an absolute path, got `{dir}`")
            }
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    /// Root STI discriminator attribute.
    pub inheritance_key: String,
    pub log_level: String,
    /// Rolling log directory; logging stays off when absent.
    pub log_dir: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            inheritance_key: DEFAULT_INHERITANCE_KEY.to_string(),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Parses and validates a JSON config document.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inheritance_key.trim().is_empty() {
            return Err(ConfigError::EmptyInheritanceKey);
        }
        normalize_level(&self.log_level).map_err(ConfigError::UnsupportedLogLevel)?;
        if let Some(dir) = &self.log_dir {
            if !Path::new(dir.trim()).is_absolute() {
                return Err(ConfigError::RelativeLogDir(dir.clone()));
            }
        }
        Ok(())
    }

    /// Starts file logging when `log_dir` is set; returns whether it did.
    pub fn init_logging(&self) -> Result<bool, ConfigError> {
        match &self.log_dir {
            Some(dir) => {
                init_logging(&self.log_level, dir).map_err(ConfigError::Logging)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
