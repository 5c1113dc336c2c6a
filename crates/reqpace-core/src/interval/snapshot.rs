//! Serializable snapshot of the interval registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::entry::IntervalEntry;
use super::registry::IntervalRegistry;

/// On-disk form of the registry. A `BTreeMap` keeps the file stable between saves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedIntervals {
    #[serde(default = "default_version")]
    pub version: u8,
    pub entries: BTreeMap<String, IntervalEntry>,
}

fn default_version() -> u8 {
    1
}

impl IntervalRegistry {
    /// Build a serializable snapshot of every entry.
    pub fn to_snapshot(&self) -> PersistedIntervals {
        PersistedIntervals {
            version: 1,
            entries: self.entries().into_iter().collect(),
        }
    }

    /// New registry holding the snapshot's entries.
    pub fn from_snapshot(snapshot: PersistedIntervals) -> Self {
        Self::with_entries(snapshot.entries)
    }

    /// Merge a snapshot into this registry. Entries already present keep the
    /// later of the two completion times so a reload never undoes spacing.
    pub fn restore(&self, snapshot: PersistedIntervals) {
        let current = self.entries();
        let merged = snapshot.entries.into_iter().map(|(identity, mut entry)| {
            if let Some(existing) = current.get(&identity) {
                entry.last_completed_ms = match (existing.last_completed_ms, entry.last_completed_ms) {
                    (Some(a), Some(b)) => Some(a.max(b)),
                    (a, b) => a.or(b),
                };
            }
            (identity, entry)
        });
        self.merge(merged);
    }
}
