//! Config loading entry point.

use std::path::{Path, PathBuf};

use config::{Environment, File};

use super::merge::merge_policy::builder_with_defaults;
use super::sources::{global_file, workspace_file};
use super::NotegenConfig;
use crate::error::ApiError;

/// Loads [`NotegenConfig`] from its layered sources.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Defaults, global file, workspace files, then `NOTEGEN_*` variables.
    pub fn load(workspace_root: &Path) -> Result<NotegenConfig, ApiError> {
        let builder = builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder.add_source(env_source()).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Defaults and a single explicit file, then `NOTEGEN_*` variables.
    pub fn load_from_file(path: &Path) -> Result<NotegenConfig, ApiError> {
        if !path.exists() {
            return Err(ApiError::ConfigError(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(env_source())
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Built-in defaults only.
    pub fn default() -> NotegenConfig {
        NotegenConfig::default()
    }

    /// Global config file location.
    pub fn xdg_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("NOTEGEN")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
