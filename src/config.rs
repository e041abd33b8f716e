//! Configuration System
//!
//! Layered configuration: built-in defaults, the global file under
//! `$XDG_CONFIG_HOME/notegen`, workspace files, then `NOTEGEN_*` environment
//! variables.

use crate::logging::LoggingConfig;
use crate::service::ServiceConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod facade;
mod merge;
pub mod paths;
mod sources;

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotegenConfig {
    /// Generation service connection
    #[serde(default)]
    pub service: ServiceConfig,

    /// Local persistence
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the active task is persisted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// sled database directory. Defaults to `$XDG_DATA_HOME/notegen/state`.
    #[serde(default)]
    pub state_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Configured state path, or the default one. Relative paths resolve
    /// against `workspace_root`.
    pub fn resolve_state_path(&self, workspace_root: &std::path::Path) -> PathBuf {
        match &self.state_path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => workspace_root.join(path),
            None => paths::default_state_path(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Service(String),
    Storage(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Service(msg) => write!(f, "Service: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl NotegenConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.service.validate() {
            errors.push(ValidationError::Service(e));
        }

        if let Some(path) = &self.storage.state_path {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError::Storage(
                    "State path cannot be empty".to_string(),
                ));
            }
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            errors.push(ValidationError::Logging(format!(
                "Invalid log format '{}'",
                self.logging.format
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
