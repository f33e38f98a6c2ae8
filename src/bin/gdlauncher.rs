// src/bin/gdlauncher.rs

//! `gdlauncher` command-line entry point.

use anyhow::Result;
use clap::Parser;
use colored::*;
use gdlauncher::{
    CancellationToken,
    cli::{Cli, handlers},
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

// --- Command Definition and Registry ---

/// A command, its aliases and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    about: &'static str,
    handler: fn(Vec<String>, &CancellationToken) -> Result<()>,
}

/// Every command the launcher understands. To add one, add an entry here.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "config",
        aliases: &["cfg"],
        about: "Read and write launcher settings",
        handler: handlers::config::handle,
    },
    CommandDefinition {
        name: "engine",
        aliases: &["engines"],
        about: "List, add, remove, inspect and pick the default engine",
        handler: handlers::engine::handle,
    },
    CommandDefinition {
        name: "launch",
        aliases: &["run", "open"],
        about: "Run an engine, optionally on a project",
        handler: handlers::launch::handle,
    },
    CommandDefinition {
        name: "project",
        aliases: &["projects"],
        about: "List, add, create, inspect and bind projects",
        handler: handlers::project::handle,
    },
    CommandDefinition {
        name: "remote",
        aliases: &[],
        about: "Print the remote catalog URL for downloadable engines",
        handler: handlers::remote::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn print_commands() {
    println!("{} gdlauncher <command> [args...]\n", "Usage:".yellow().bold());
    println!("{}", "Commands:".yellow().bold());
    for cmd in COMMAND_REGISTRY {
        println!("  {:<10} {}", cmd.name.cyan(), cmd.about);
    }
    println!(
        "\nRun `gdlauncher <command> --help` for the options of a command."
    );
}

fn main() {
    // Nothing raises the token yet; handlers poll it between long-running steps.
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse(), cancellation_token) {
        // clap renders its own help and usage errors.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }
        eprintln!("\n{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli, cancellation_token: CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(command_name) = cli.command else {
        print_commands();
        return Ok(());
    };

    match find_command(&command_name) {
        Some(command) => (command.handler)(cli.args, &cancellation_token),
        None => {
            print_commands();
            Err(anyhow::anyhow!("Unknown command '{}'.", command_name))
        }
    }
}
