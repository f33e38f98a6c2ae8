// src/cli/handlers/project.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use dialoguer::{Select, theme::ColorfulTheme};

use super::commons::{self, LauncherContext, check_for_cancellation};
use crate::{
    CancellationToken,
    cli::args::{ProjectArgs, ProjectCommand},
    core::{
        catalog::{Generation, VersionCatalog},
        project::{self, ProjectDescriptor, ProjectSummary},
    },
};

/// Runs a `project` subcommand.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let project_args = ProjectArgs::try_parse_from(&args)?;

    match project_args.command {
        ProjectCommand::List { json } => list(json),
        ProjectCommand::Add { path, engine } => {
            let directory = commons::resolve_directory(path.as_deref())?;
            let context = LauncherContext::load()?;
            let project = ProjectDescriptor::open(&directory, context.library.catalog())?;
            context
                .library
                .register_project(&project, engine.as_deref())?;
            println!(
                "Project '{}' registered from {}.",
                project.name().yellow(),
                project.directory().display()
            );
            Ok(())
        }
        ProjectCommand::New {
            path,
            generation,
            engine,
            autosolve,
        } => new(
            path.as_deref(),
            generation,
            engine.as_deref(),
            autosolve,
            cancellation_token,
        ),
        ProjectCommand::Remove { path } => {
            let directory = commons::resolve_directory(path.as_deref())?;
            let context = LauncherContext::load()?;
            if !context.library.remove_project(&directory)? {
                return Err(anyhow!(
                    "Project '{}' is not registered.",
                    directory.display()
                ));
            }
            println!("Project at {} unregistered.", directory.display());
            Ok(())
        }
        ProjectCommand::Info { path, json } => {
            let directory = commons::resolve_directory(path.as_deref())?;
            let project = ProjectDescriptor::open(&directory, &VersionCatalog::godot())?;
            if json {
                return commons::print_json(&project.summary());
            }
            print_summary(&project.summary());
            Ok(())
        }
        ProjectCommand::Scenes { path } => {
            let directory = commons::resolve_directory(path.as_deref())?;
            let project = ProjectDescriptor::open(&directory, &VersionCatalog::godot())?;
            let scenes = project.list_scenes();
            if scenes.is_empty() {
                println!("{}", "No scenes found.".dimmed());
            }
            for scene in scenes {
                let shown = scene.strip_prefix(project.directory()).unwrap_or(&scene);
                println!("  {}", shown.display());
            }
            Ok(())
        }
        ProjectCommand::Bind {
            path,
            engine,
            clear,
        } => {
            if engine.is_none() && !clear {
                return Err(anyhow!("Pass --engine <name> or --clear."));
            }
            let directory = commons::resolve_directory(path.as_deref())?;
            let context = LauncherContext::load()?;
            context
                .library
                .set_project_engine(&directory, engine.as_deref())?;
            match engine {
                Some(name) => println!("Project bound to '{}'.", name.yellow()),
                None => println!("Project unbound."),
            }
            Ok(())
        }
    }
}

fn list(json: bool) -> Result<()> {
    let context = LauncherContext::load()?;
    let summaries: Vec<ProjectSummary> = context
        .library
        .projects()?
        .iter()
        .map(ProjectDescriptor::summary)
        .collect();

    if json {
        return commons::print_json(&summaries);
    }
    if summaries.is_empty() {
        println!("{}", "No projects registered. Use `gdlauncher project add`.".dimmed());
        return Ok(());
    }

    println!("\n--- {} ---", "Projects".yellow());
    for summary in &summaries {
        println!(
            "  {} {}",
            summary.name.cyan(),
            format!("[generation {}]", summary.generation).dimmed()
        );
        println!("    {}", summary.directory.display().to_string().dimmed());
    }
    Ok(())
}

fn new(
    path: Option<&str>,
    generation: Option<u8>,
    engine: Option<&str>,
    autosolve: bool,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let directory = commons::resolve_directory(path)?;
    let context = LauncherContext::load()?;
    let catalog = *context.library.catalog();

    let generation = resolve_generation(
        &catalog,
        generation,
        context.config.default_generation,
        !autosolve,
    )?;
    check_for_cancellation(cancellation_token)?;

    let project = project::create_project(&directory, generation)?;
    context.library.register_project(&project, engine)?;

    println!("{}", "Project created.".green());
    print_summary(&project.summary());
    Ok(())
}

/// Picks the generation from the flag, a prompt, or the configured default.
fn resolve_generation(
    catalog: &VersionCatalog,
    requested: Option<u8>,
    configured_default: u8,
    is_interactive: bool,
) -> Result<Generation> {
    if let Some(ordinal) = requested {
        return catalog
            .by_ordinal(ordinal)
            .ok_or_else(|| anyhow!("Unknown engine generation {}.", ordinal));
    }

    if !is_interactive {
        return catalog.by_ordinal(configured_default).ok_or_else(|| {
            anyhow!(
                "Configured default generation {} is unknown.",
                configured_default
            )
        });
    }

    let entries = catalog.entries();
    let items: Vec<String> = entries.iter().map(ToString::to_string).collect();
    let default_index = entries
        .iter()
        .position(|g| g.ordinal == configured_default)
        .unwrap_or(0);
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Engine generation")
        .items(&items)
        .default(default_index)
        .interact()?;

    entries
        .get(selection)
        .copied()
        .ok_or_else(|| anyhow!("Invalid selection."))
}

fn print_summary(summary: &ProjectSummary) {
    let optional = |path: &Option<std::path::PathBuf>| {
        path.as_deref()
            .map_or_else(|| "-".to_string(), commons::display_path)
    };
    println!("\n--- {} '{}' ---", "Project".yellow(), summary.name);
    println!("  {:<14} {}", "Directory:".blue(), summary.directory.display());
    println!("  {:<14} {}", "Project file:".blue(), summary.project_file.display());
    println!("  {:<14} {}", "Generation:".blue(), summary.generation);
    println!("  {:<14} {}", "Icon:".blue(), optional(&summary.icon));
    println!("  {:<14} {}", "Main scene:".blue(), optional(&summary.main_scene));
}
