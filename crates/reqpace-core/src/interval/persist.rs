//! Persist the interval registry to disk (JSON under XDG state dir) so spacing survives restarts.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::registry::IntervalRegistry;
use super::snapshot::PersistedIntervals;

impl IntervalRegistry {
    /// Default path for the registry file: `~/.local/state/reqpace/intervals.json`.
    pub fn default_path() -> Result<PathBuf> {
        let xdg_dirs = xdg::BaseDirectories::with_prefix("reqpace")?;
        Ok(xdg_dirs.get_state_home().join("reqpace").join("intervals.json"))
    }

    /// Save the current registry to the given path (creates parent dir if needed).
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let snapshot = self.to_snapshot();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir: {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&snapshot).context("serialize intervals")?;
        std::fs::write(path, json)
            .with_context(|| format!("write intervals: {}", path.display()))?;
        tracing::debug!(path = %path.display(), entries = snapshot.entries.len(), "intervals saved");
        Ok(())
    }

    /// Read a snapshot from the given path. A missing file yields `None`.
    pub fn load_snapshot(path: &Path) -> Result<Option<PersistedIntervals>> {
        let bytes = match std::fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("read intervals: {}", path.display()))
            }
        };
        let snapshot: PersistedIntervals = serde_json::from_slice(&bytes)
            .with_context(|| format!("parse intervals: {}", path.display()))?;
        Ok(Some(snapshot))
    }

    /// Load a registry from the given path. If the file is missing, returns None
    /// (caller can fall back to `IntervalRegistry::new`).
    pub fn load_from_path(path: &Path) -> Result<Option<IntervalRegistry>> {
        Ok(Self::load_snapshot(path)?.map(IntervalRegistry::from_snapshot))
    }
}
