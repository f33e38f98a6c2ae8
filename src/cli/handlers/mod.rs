// src/cli/handlers/mod.rs

// One module per CLI command.

/// Shared state and output helpers.
pub mod commons;
/// `config`
pub mod config;
/// `engine`
pub mod engine;
/// `launch`
pub mod launch;
/// `project`
pub mod project;
/// `remote`
pub mod remote;
