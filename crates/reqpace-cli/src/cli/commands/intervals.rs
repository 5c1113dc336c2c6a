//! `reqpace intervals` – list and edit the persisted interval registry.

use std::path::Path;

use anyhow::Result;
use clap::Subcommand;
use reqpace_core::config::ReqpaceConfig;
use reqpace_core::interval::{IntervalEntry, IntervalRegistry};

#[derive(Debug, Subcommand)]
pub enum IntervalsCommand {
    /// Show every registered identity and how long it must still wait.
    List,

    /// Register an identity, or change its interval.
    Set {
        /// Identity (the `--name` given to `fetch`).
        name: String,
        /// Minimum milliseconds between completions.
        interval_ms: u64,
    },

    /// Unregister one or more identities.
    Remove {
        #[arg(required = true)]
        names: Vec<String>,
    },
}

pub fn run_intervals(
    registry: &IntervalRegistry,
    path: &Path,
    cfg: &ReqpaceConfig,
    command: IntervalsCommand,
) -> Result<()> {
    match command {
        IntervalsCommand::List => print_list(registry),
        IntervalsCommand::Set { name, interval_ms } => {
            // Changing the interval keeps the completion history.
            let entry = match registry.get(&name).and_then(|e| e.last_completed_ms) {
                Some(last) => IntervalEntry::with_last_completed(interval_ms, last),
                None => IntervalEntry::new(interval_ms),
            };
            registry.merge([(name.clone(), entry)]);
            registry.save_to_path(path)?;
            println!("{name}: {interval_ms} ms");
        }
        IntervalsCommand::Remove { names } => {
            let missing: Vec<&String> = names.iter().filter(|n| !registry.contains(n)).collect();
            for name in &missing {
                eprintln!("not registered: {name}");
            }
            registry.remove(&names);
            registry.save_to_path(path)?;
            for name in defined_in_config(&names, cfg) {
                eprintln!(
                    "warning: {name} is also defined in config.toml and will be registered again on the next run"
                );
            }
        }
    }
    Ok(())
}

/// Names that `load_registry` will put back from `[intervals.<name>]`.
pub(crate) fn defined_in_config<'a>(names: &'a [String], cfg: &ReqpaceConfig) -> Vec<&'a str> {
    names
        .iter()
        .filter(|n| cfg.intervals.contains_key(n.as_str()))
        .map(String::as_str)
        .collect()
}

fn print_list(registry: &IntervalRegistry) {
    if registry.is_empty() {
        println!("No intervals registered.");
        return;
    }
    let now = registry.now_ms();
    let entries = registry.entries();
    println!("{:<24} {:<12} {:<16} {}", "NAME", "INTERVAL_MS", "LAST_COMPLETED", "WAIT_MS");
    for name in registry.identities() {
        let Some(entry) = entries.get(&name) else {
            continue;
        };
        println!(
            "{:<24} {:<12} {:<16} {}",
            name,
            entry.interval_ms,
            entry
                .last_completed_ms
                .map_or_else(|| "-".to_string(), |t| t.to_string()),
            entry.remaining_ms(now).unwrap_or(0)
        );
    }
}
