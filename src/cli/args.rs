// src/cli/args.rs

use clap::{Parser, Subcommand};

/// Arguments of the `engine` command.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Manages registered engines.")]
pub struct EngineArgs {
    /// What to do.
    #[command(subcommand)]
    pub command: EngineCommand,
}

/// Subcommands of `engine`.
#[derive(Subcommand, Debug)]
pub enum EngineCommand {
    /// Lists registered engines that still validate.
    #[command(alias = "ls")]
    List {
        /// Print the list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Validates, probes and registers an engine executable.
    Add {
        /// Path to the engine executable.
        path: String,
        /// Make it the default engine.
        #[arg(long)]
        default: bool,
    },
    /// Forgets a registered engine. Projects bound to it are unbound.
    #[command(alias = "rm")]
    Remove {
        /// Display name of the engine, as shown by `engine list`.
        name: String,
    },
    /// Makes a registered engine the default one.
    Default {
        /// Display name of the engine.
        name: String,
    },
    /// Validates and probes an executable without registering it.
    Info {
        /// Path to the engine executable.
        path: String,
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Arguments of the `project` command.
#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Manages registered projects.")]
pub struct ProjectArgs {
    /// What to do.
    #[command(subcommand)]
    pub command: ProjectCommand,
}

/// Subcommands of `project`.
#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    /// Lists registered projects that can still be read.
    #[command(alias = "ls")]
    List {
        /// Print the list as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Registers an existing project directory.
    Add {
        /// Project directory. Defaults to the current directory.
        path: Option<String>,
        /// Engine to bind the project to.
        #[arg(long, short)]
        engine: Option<String>,
    },
    /// Creates and registers a new, empty project.
    New {
        /// Target directory. Must not exist or be empty. Defaults to the current directory.
        path: Option<String>,
        /// Engine generation (1-4). Asked interactively if omitted.
        #[arg(long, short)]
        generation: Option<u8>,
        /// Engine to bind the project to.
        #[arg(long, short)]
        engine: Option<String>,
        /// Do not ask for user input, use the configured default generation.
        #[arg(long)]
        autosolve: bool,
    },
    /// Forgets a registered project. Its files are left untouched.
    #[command(alias = "rm")]
    Remove {
        /// Project directory. Defaults to the current directory.
        path: Option<String>,
    },
    /// Shows the metadata of a project directory.
    Info {
        /// Project directory. Defaults to the current directory.
        path: Option<String>,
        /// Print the metadata as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Lists the scene files of a project.
    Scenes {
        /// Project directory. Defaults to the current directory.
        path: Option<String>,
    },
    /// Binds a registered project to an engine, or unbinds it.
    Bind {
        /// Project directory. Defaults to the current directory.
        path: Option<String>,
        /// Engine to bind the project to.
        #[arg(long, short, conflicts_with = "clear")]
        engine: Option<String>,
        /// Remove the current binding.
        #[arg(long)]
        clear: bool,
    },
}
