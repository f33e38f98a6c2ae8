// src/core/settings.rs

use crate::core::paths::{self, PathError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading `launcher.toml`.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// Reading or writing the file failed.
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    /// The launcher directory could not be located.
    #[error("Path error: {0}")]
    Path(#[from] PathError),
    /// The file is not valid TOML for [`LauncherConfig`].
    #[error("Failed to parse launcher.toml: {0}")]
    TomlParse(#[from] toml::de::Error),
    /// The defaults could not be written out.
    #[error("Failed to serialize launcher settings to TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn default_generation() -> u8 {
    3
}

/// Contents of `launcher.toml`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Path template of the engine/project store. `~` and `$VARS` are expanded.
    /// Defaults to `store.bin` next to `launcher.toml`.
    #[serde(default)]
    pub store_path: Option<String>,
    /// Base URL of the remote engine catalog.
    #[serde(default)]
    pub remote_url: Option<String>,
    /// Generation used by `project new` when none is given.
    #[serde(default = "default_generation")]
    pub default_generation: u8,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            remote_url: None,
            default_generation: default_generation(),
        }
    }
}

impl LauncherConfig {
    /// Resolves the store location, expanding the configured template if any.
    pub fn resolve_store_path(&self) -> Result<PathBuf, PathError> {
        match &self.store_path {
            Some(template) => paths::expand_path_template(template),
            None => paths::get_default_store_path(),
        }
    }
}

/// Loads `launcher.toml` from the launcher config directory, writing the defaults
/// on first use.
pub fn load_launcher_config() -> Result<LauncherConfig, SettingsError> {
    let config_path = paths::get_launcher_config_path()?;
    load_launcher_config_from(&config_path)
}

/// [`load_launcher_config`] against an explicit file.
pub fn load_launcher_config_from(config_path: &Path) -> Result<LauncherConfig, SettingsError> {
    if !config_path.exists() {
        let default_config = LauncherConfig::default();
        let toml_string = toml::to_string_pretty(&default_config)?;
        fs::write(config_path, toml_string)?;
        log::debug!("Wrote default launcher settings to {}", config_path.display());
        Ok(default_config)
    } else {
        let content = fs::read_to_string(config_path)?;
        Ok(toml::from_str(&content)?)
    }
}
