// src/cli/handlers/launch.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use std::io::{self, Write};
use std::path::Path;

use super::commons::{self, LauncherContext};
use crate::{
    CancellationToken,
    core::{engine::EngineDescriptor, library::Library, store::Store},
    system::process::EngineProcess,
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Runs an engine, optionally on a project, and streams its output."
)]
struct LaunchArgs {
    /// Project directory to open. Its bound engine is used unless --engine is given.
    project: Option<String>,

    /// Name of the engine to run. Defaults to the project's engine, then the default engine.
    #[arg(long, short)]
    engine: Option<String>,

    /// Open the project in the editor instead of running it.
    #[arg(long)]
    editor: bool,

    /// Extra arguments for the engine, as a single shell-quoted string.
    #[arg(long, allow_hyphen_values = true)]
    args: Option<String>,
}

/// Launches an engine and forwards its output until it exits or the user cancels.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let launch_args = LaunchArgs::try_parse_from(&args)?;
    let context = LauncherContext::load()?;

    let project_dir = match &launch_args.project {
        Some(path) => Some(commons::resolve_directory(Some(path))?),
        None => None,
    };
    let engine = resolve_engine(
        &context.library,
        launch_args.engine.as_deref(),
        project_dir.as_deref(),
    )?;
    let engine_args = build_engine_args(
        project_dir.as_deref(),
        launch_args.editor,
        launch_args.args.as_deref(),
    )?;

    let process = EngineProcess::new(&engine);
    let session = process.session();
    let output = session.on_output();
    let end = session.on_end();

    session.launch(engine_args.as_slice())?;

    // The output channel disconnects once the session is over.
    let mut stdout = io::stdout().lock();
    for event in output.iter() {
        if commons::check_for_cancellation(cancellation_token).is_err() {
            session.kill();
        }
        if event.is_error {
            eprintln!("{}", event.text().red());
        } else {
            stdout.write_all(&event.data)?;
            stdout.write_all(b"\n")?;
        }
    }
    session.join();

    match end.recv() {
        Ok(end_event) if end_event.killed => {
            println!("\n{}", "Engine stopped.".yellow());
        }
        Ok(end_event) => match end_event.exit_code {
            Some(0) | None => log::info!("Engine exited: {:?}", end_event.exit_code),
            Some(code) => println!("\n{} {}", "Engine exited with code".yellow(), code),
        },
        Err(_) => log::warn!("Session ended without an end event"),
    }
    Ok(())
}

/// `--engine` first, then the engine bound to the project, then the default engine.
fn resolve_engine<S: Store>(
    library: &Library<S>,
    requested: Option<&str>,
    project_dir: Option<&Path>,
) -> Result<EngineDescriptor> {
    if let Some(name) = requested {
        return Ok(library.engine(name)?);
    }

    if let Some(dir) = project_dir {
        match library.project_engine(dir) {
            Ok(Some(engine)) => return Ok(engine),
            Ok(None) => {}
            Err(e) => log::debug!("No bound engine for {}: {}", dir.display(), e),
        }
    }

    library
        .default_engine()?
        .map(|registered| registered.engine)
        .ok_or_else(|| {
            anyhow!("No engine to launch. Pass --engine or set one with `gdlauncher engine default`.")
        })
}

fn build_engine_args(
    project_dir: Option<&Path>,
    editor: bool,
    extra: Option<&str>,
) -> Result<Vec<String>> {
    let mut args = Vec::new();
    if let Some(dir) = project_dir {
        args.push("--path".to_string());
        args.push(dir.display().to_string());
    }
    if editor {
        args.push("--editor".to_string());
    }
    if let Some(extra) = extra {
        let parts =
            shlex::split(extra).ok_or_else(|| anyhow!("Could not parse --args '{}'.", extra))?;
        args.extend(parts);
    }
    Ok(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{catalog::VersionCatalog, store::MemoryStore};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_engine_args_for_editor_on_project() {
        let args = build_engine_args(
            Some(Path::new("/games/demo")),
            true,
            Some("--verbose --resolution '1280x720'"),
        )
        .unwrap();
        assert_eq!(
            args,
            vec!["--path", "/games/demo", "--editor", "--verbose", "--resolution", "1280x720"]
        );
    }

    #[test]
    fn test_engine_args_reject_unbalanced_quotes() {
        assert!(build_engine_args(None, false, Some("'unterminated")).is_err());
    }

    #[test]
    fn test_no_engine_available() {
        let library = Library::new(MemoryStore::new(), VersionCatalog::godot());
        assert!(resolve_engine(&library, None, None).is_err());
        assert!(resolve_engine(&library, Some("missing"), None).is_err());
    }
}
