// src/cli/handlers/config.rs

use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use colored::*;

use super::commons::LauncherContext;
use crate::{
    CancellationToken,
    core::{
        paths,
        store::{Record, RecordSet, Store},
    },
};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, about = "Reads and writes launcher settings.")]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Prints the value of a stored setting.
    Get { name: String },
    /// Stores a setting, replacing any previous value.
    Set { name: String, value: String },
    /// Removes a stored setting.
    Unset { name: String },
    /// Lists every stored setting.
    #[command(alias = "ls")]
    List,
    /// Prints where the launcher keeps its files.
    Path,
}

/// Entry point of the command; `args` excludes the command name.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let config_args = ConfigArgs::try_parse_from(&args)?;
    let context = LauncherContext::load()?;
    let library = &context.library;

    match config_args.command {
        ConfigCommand::Get { name } => match library.config_value(&name)? {
            Some(value) => println!("{}", value),
            None => return Err(anyhow!("Setting '{}' is not set.", name)),
        },
        ConfigCommand::Set { name, value } => {
            library.set_config_value(&name, &value)?;
            println!("{} = {}", name.cyan(), value);
        }
        ConfigCommand::Unset { name } => {
            if !library.remove_config_value(&name)? {
                return Err(anyhow!("Setting '{}' is not set.", name));
            }
            println!("Setting '{}' removed.", name);
        }
        ConfigCommand::List => {
            let records = library.store().list(RecordSet::Config)?;
            if records.is_empty() {
                println!("{}", "No settings stored.".dimmed());
            }
            for record in records {
                if let Record::Config(setting) = record {
                    println!("{} = {}", setting.name.cyan(), setting.value);
                }
            }
        }
        ConfigCommand::Path => {
            println!(
                "  {:<10} {}",
                "Settings:".blue(),
                paths::get_launcher_config_path()?.display()
            );
            println!(
                "  {:<10} {}",
                "Store:".blue(),
                library.store().path().display()
            );
        }
    }
    Ok(())
}
