//! Discovery, validation and launching of Godot Engine builds, plus reading of
//! Godot project files.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared flag raised to ask a background task to stop.
pub type CancellationToken = Arc<AtomicBool>;

/// Command-line front end.
pub mod cli;
/// Fixed names, markers and file names shared across the crate.
pub mod constants;
/// Engines, projects and the persistent library that ties them together.
pub mod core;
pub(crate) mod dev_utils;
/// Processes, platform detection and the remote catalog.
pub mod system;
