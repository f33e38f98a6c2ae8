// src/cli/handlers/remote.rs

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};

use super::commons::LauncherContext;
use crate::{
    CancellationToken,
    core::engine::EngineKind,
    system::{platform::Platform, remote::RemoteCatalog},
};

#[derive(ValueEnum, Debug, Clone, Copy)]
enum KindArg {
    Standard,
    Mono,
}

impl From<KindArg> for EngineKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Standard => Self::Standard,
            KindArg::Mono => Self::Mono,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    no_binary_name = true,
    about = "Prints the remote catalog URL listing downloadable engines for this platform."
)]
struct RemoteArgs {
    /// Restrict the listing to one engine kind.
    #[arg(long, value_enum)]
    kind: Option<KindArg>,

    /// Catalog base URL. Defaults to `remote_url` in launcher.toml.
    #[arg(long)]
    url: Option<String>,
}

/// Prints the catalog URL for the current platform.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let remote_args = RemoteArgs::try_parse_from(&args)?;

    let base_url = match remote_args.url {
        Some(url) => url,
        None => LauncherContext::load()?.config.remote_url.ok_or_else(|| {
            anyhow!("No remote catalog configured. Set `remote_url` in launcher.toml or pass --url.")
        })?,
    };

    let platform = Platform::current();
    if !platform.is_supported() {
        log::warn!("Platform '{}' is not supported by the remote catalog", platform);
    }

    let catalog = RemoteCatalog::new(&base_url)?;
    let url = catalog.engines_url(remote_args.kind.map(EngineKind::from))?;
    println!("{}", url);
    Ok(())
}
