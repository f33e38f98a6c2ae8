// src/cli/handlers/commons.rs

// Shared helpers for the command handlers.

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use crate::{
    CancellationToken,
    core::{
        catalog::VersionCatalog,
        library::Library,
        settings::{self, LauncherConfig},
        store::FileStore,
    },
};

/// Everything a handler needs: the launcher settings and the persisted library.
#[derive(Debug)]
pub struct LauncherContext {
    /// Parsed `launcher.toml`.
    pub config: LauncherConfig,
    /// Engines, projects and settings from the store.
    pub library: Library<FileStore>,
}

impl LauncherContext {
    /// Loads `launcher.toml` and opens the store it points to.
    pub fn load() -> Result<Self> {
        let config = settings::load_launcher_config()?;
        let store_path = config.resolve_store_path()?;
        log::debug!("Using store at {}", store_path.display());
        let store = FileStore::open(&store_path)
            .with_context(|| format!("Could not open store '{}'", store_path.display()))?;
        Ok(Self {
            config,
            library: Library::new(store, VersionCatalog::godot()),
        })
    }
}

/// Fails if the user asked to stop.
pub fn check_for_cancellation(cancellation_token: &CancellationToken) -> Result<()> {
    if cancellation_token.load(Ordering::SeqCst) {
        return Err(anyhow!("Operation cancelled."));
    }
    Ok(())
}

/// Turns an optional user-supplied directory into an absolute path.
/// Defaults to the current directory. Existing paths are canonicalized.
pub fn resolve_directory(path: Option<&str>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => PathBuf::from(p),
        None => env::current_dir()?,
    };
    absolutize(&path)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(dunce::canonicalize(path)?);
    }
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}

/// Prints `value` as pretty JSON on standard output.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Renders an empty path as a dash.
pub fn display_path(path: &Path) -> String {
    if path.as_os_str().is_empty() {
        "-".to_string()
    } else {
        path.display().to_string()
    }
}
