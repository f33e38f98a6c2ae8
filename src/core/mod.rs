// src/core/mod.rs

/// Known engine generations and their project file names.
pub mod catalog;
/// Engine executable validation and version probing.
pub mod engine;
pub mod ini;
/// Registered engines and projects, backed by a [`store::Store`].
pub mod library;
/// Launcher directories and path templates.
pub mod paths;
/// Godot project directories and their project files.
pub mod project;
/// `launcher.toml` settings.
pub mod settings;
/// File content-type detection.
pub mod sniff;
pub mod store;
