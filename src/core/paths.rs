// src/core/paths.rs

use crate::constants::{LAUNCHER_CONFIG_FILENAME, LAUNCHER_DIR, STORE_FILENAME};
use lazy_static::lazy_static;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

lazy_static! {
    static ref LAUNCHER_CONFIG_DIR: Mutex<Option<PathBuf>> = Mutex::new(None);
}

/// Errors raised while locating launcher directories.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// The launcher directory could not be created.
    #[error("Could not create config directory at '{path}': {source}")]
    ConfigDirCreation {
        /// Directory that was being created.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A `~` or `$VAR` in a path template could not be expanded.
    #[error("Failed to expand path template '{template}': {reason}")]
    Expansion {
        /// Template as written.
        template: String,
        /// Expansion error.
        reason: String,
    },
}

/// Returns the path to the launcher configuration directory (`~/.config/gdlauncher`).
/// Creates it if it doesn't exist.
///
/// The first call computes and caches the path; later calls return the cached value.
pub fn get_launcher_config_dir() -> Result<PathBuf, PathError> {
    let mut cached_path_guard = LAUNCHER_CONFIG_DIR
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(path) = &*cached_path_guard {
        return Ok(path.clone());
    }

    let config_path = dirs::config_dir()
        .ok_or(PathError::ConfigDirNotFound)?
        .join(LAUNCHER_DIR);

    if !config_path.exists() {
        fs::create_dir_all(&config_path).map_err(|e| PathError::ConfigDirCreation {
            path: config_path.display().to_string(),
            source: e,
        })?;
    }

    *cached_path_guard = Some(config_path.clone());
    Ok(config_path)
}

/// Path of `launcher.toml`.
pub fn get_launcher_config_path() -> Result<PathBuf, PathError> {
    get_launcher_config_dir().map(|dir| dir.join(LAUNCHER_CONFIG_FILENAME))
}

/// Default location of the persisted store.
pub fn get_default_store_path() -> Result<PathBuf, PathError> {
    get_launcher_config_dir().map(|dir| dir.join(STORE_FILENAME))
}

/// Expands a path template, resolving the home directory (`~`) and environment
/// variables (`$VAR` / `${VAR}`).
pub fn expand_path_template(template: &str) -> Result<PathBuf, PathError> {
    let expanded = shellexpand::full(template).map_err(|e| PathError::Expansion {
        template: template.to_string(),
        reason: e.to_string(),
    })?;
    Ok(PathBuf::from(expanded.into_owned()))
}
