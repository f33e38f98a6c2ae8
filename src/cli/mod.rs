// src/cli/mod.rs

use clap::Parser;

/// Argument types shared by the engine and project commands.
pub mod args;
/// Command handlers.
pub mod handlers;

/// gdlauncher: discovers, validates and launches Godot Engine builds.
///
/// Usage: `gdlauncher <command> [args...]`
///
/// Commands:
/// - `engine`   list, add, remove, inspect and pick the default engine
/// - `project`  list, add, create, inspect and bind projects
/// - `launch`   run an engine, optionally on a project
/// - `config`   read and write launcher settings
/// - `remote`   print the remote catalog URL for downloadable engines
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command to run.
    pub command: Option<String>,

    /// Arguments for the command. Run `gdlauncher <command> --help` for details.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
