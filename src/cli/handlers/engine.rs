// src/cli/handlers/engine.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::commons::{self, LauncherContext};
use crate::{
    CancellationToken,
    cli::args::{EngineArgs, EngineCommand},
    core::{catalog::VersionCatalog, engine::EngineDescriptor},
};

/// Row of `engine list --json` and `engine info --json`.
#[derive(Serialize, Debug)]
struct EngineSummary {
    name: String,
    path: PathBuf,
    is_default: bool,
    version: Option<String>,
    kind: Option<String>,
    generation: Option<u8>,
}

impl EngineSummary {
    /// Probes the engine; a failed probe leaves the version fields empty.
    fn build(name: String, engine: &EngineDescriptor) -> Self {
        let info = match engine.probe() {
            Ok(info) => Some(info),
            Err(e) => {
                log::warn!("Could not probe {}: {}", engine.path().display(), e);
                None
            }
        };
        Self {
            name,
            path: engine.path().to_path_buf(),
            is_default: engine.is_default(),
            version: info.map(|i| i.version.clone()),
            kind: info.map(|i| i.kind.to_string()),
            generation: info
                .and_then(|i| i.generation(&VersionCatalog::godot()))
                .map(|g| g.ordinal),
        }
    }
}

/// Runs an `engine` subcommand.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let engine_args = EngineArgs::try_parse_from(&args)?;

    match engine_args.command {
        EngineCommand::List { json } => list(json),
        EngineCommand::Add { path, default } => add(Path::new(&path), default),
        EngineCommand::Remove { name } => {
            let context = LauncherContext::load()?;
            if !context.library.remove_engine(&name)? {
                return Err(anyhow!("No engine named '{}' is registered.", name));
            }
            println!("Engine '{}' removed.", name.yellow());
            Ok(())
        }
        EngineCommand::Default { name } => {
            let context = LauncherContext::load()?;
            context.library.set_default_engine(&name)?;
            println!("Default engine is now '{}'.", name.yellow());
            Ok(())
        }
        EngineCommand::Info { path, json } => info(Path::new(&path), json),
    }
}

fn list(json: bool) -> Result<()> {
    let context = LauncherContext::load()?;
    let engines = context.library.engines()?;

    if json {
        let summaries: Vec<EngineSummary> = engines
            .into_iter()
            .map(|registered| EngineSummary::build(registered.name, &registered.engine))
            .collect();
        return commons::print_json(&summaries);
    }

    if engines.is_empty() {
        println!("{}", "No engines registered. Use `gdlauncher engine add <path>`.".dimmed());
        return Ok(());
    }

    println!("\n--- {} ---", "Engines".yellow());
    for registered in &engines {
        let marker = if registered.engine.is_default() {
            " (default)".green().to_string()
        } else {
            String::new()
        };
        println!("  {}{}", registered.name.cyan(), marker);
        println!("    {}", registered.engine.path().display().to_string().dimmed());
    }
    Ok(())
}

fn add(path: &Path, default: bool) -> Result<()> {
    let engine = EngineDescriptor::open_with_default(path, default)?;
    let context = LauncherContext::load()?;
    let name = context.library.register_engine(&engine)?;

    println!("{}", "Engine registered.".green());
    println!("  {:<10} {}", "Name:".blue(), name);
    println!("  {:<10} {}", "Path:".blue(), engine.path().display());
    if default {
        println!("  {:<10} {}", "Default:".blue(), "yes");
    }
    Ok(())
}

fn info(path: &Path, json: bool) -> Result<()> {
    let engine = EngineDescriptor::open(path)?;
    let name = engine.display_name()?;
    let summary = EngineSummary::build(name, &engine);

    if json {
        return commons::print_json(&summary);
    }

    println!("\n--- {} '{}' ---", "Engine".yellow(), summary.name);
    println!("  {:<12} {}", "Path:".blue(), summary.path.display());
    if let Some(version) = &summary.version {
        println!("  {:<12} {}", "Version:".blue(), version);
    }
    if let Some(kind) = &summary.kind {
        println!("  {:<12} {}", "Kind:".blue(), kind);
    }
    match summary.generation {
        Some(ordinal) => println!("  {:<12} {}", "Generation:".blue(), ordinal),
        None => println!("  {:<12} {}", "Generation:".blue(), "unknown".dimmed()),
    }
    Ok(())
}
