//! CLI for reqpace: paced, retried HTTP requests.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use reqpace_core::config::{self, ReqpaceConfig};
use reqpace_core::interval::IntervalRegistry;

use commands::{run_fetch, run_intervals, FetchArgs, IntervalsCommand};

/// Top-level CLI for reqpace.
#[derive(Debug, Parser)]
#[command(name = "reqpace")]
#[command(about = "reqpace: HTTP requests with retry ceilings and per-name pacing", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send one request, retrying and pacing it, and print the payload.
    Fetch(FetchArgs),

    /// Inspect or edit the persisted interval registry.
    Intervals {
        #[command(subcommand)]
        command: IntervalsCommand,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let store = registry_path(&cfg)?;
        let registry = Arc::new(load_registry(&cfg, store.as_ref())?);

        match cli.command {
            CliCommand::Fetch(args) => {
                let result = run_fetch(&cfg, Arc::clone(&registry), args).await;
                // Keep completion stamps even when the request itself failed.
                if let Some(path) = &store {
                    registry.save_to_path(path)?;
                }
                result?;
            }
            CliCommand::Intervals { command } => {
                let path = match store {
                    Some(path) => path,
                    None => anyhow::bail!("persist_intervals is disabled in config"),
                };
                run_intervals(&registry, &path, &cfg, command)?;
            }
        }

        Ok(())
    }
}

/// Where the registry lives on disk, or `None` when persistence is off.
fn registry_path(cfg: &ReqpaceConfig) -> Result<Option<PathBuf>> {
    if cfg.persist_intervals {
        Ok(Some(IntervalRegistry::default_path()?))
    } else {
        Ok(None)
    }
}

/// Config intervals first, then the persisted file on top. The file wins on
/// interval length; completion times keep the later of the two.
fn load_registry(cfg: &ReqpaceConfig, store: Option<&PathBuf>) -> Result<IntervalRegistry> {
    let registry = IntervalRegistry::with_entries(cfg.intervals.clone());
    if let Some(path) = store {
        if let Some(snapshot) = IntervalRegistry::load_snapshot(path)? {
            registry.restore(snapshot);
        }
    }
    tracing::debug!(identities = registry.len(), "interval registry loaded");
    Ok(registry)
}

#[cfg(test)]
mod tests;
