//! Shared, lock-protected map from identity to interval entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use crate::clock::Clock;

use super::entry::IntervalEntry;

/// Identity used by requests that were not given a name.
pub const UNNAMED: &str = "unnamed";

static GLOBAL: OnceLock<Arc<IntervalRegistry>> = OnceLock::new();

/// Registry of per-identity throttle state.
///
/// All reads and writes of an identity's entry happen under one lock, so a
/// check-then-bootstrap in the gate and a completion write from another
/// request cannot interleave.
#[derive(Debug, Default)]
pub struct IntervalRegistry {
    entries: Mutex<HashMap<String, IntervalEntry>>,
    clock: Clock,
}

impl IntervalRegistry {
    /// Empty registry with its own clock anchor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with `entries`.
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, IntervalEntry)>,
    {
        let registry = Self::new();
        registry.merge(entries);
        registry
    }

    /// The process-wide registry used by requests that don't carry their own.
    /// Starts empty.
    pub fn global() -> Arc<IntervalRegistry> {
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(IntervalRegistry::new())))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, IntervalEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Current time in the registry's clock (unix-epoch milliseconds).
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn get(&self, identity: &str) -> Option<IntervalEntry> {
        self.lock().get(identity).copied()
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.lock().contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Registered identities, sorted.
    pub fn identities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Copy of every entry, for snapshots and listings.
    pub fn entries(&self) -> HashMap<String, IntervalEntry> {
        self.lock().clone()
    }

    /// Replace the whole registry with `entries`.
    pub fn set_all<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, IntervalEntry)>,
    {
        let mut map = self.lock();
        map.clear();
        map.extend(entries);
        tracing::debug!(count = map.len(), "interval registry replaced");
    }

    /// Add `entries`, overwriting any identity already present.
    pub fn merge<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, IntervalEntry)>,
    {
        let mut map = self.lock();
        for (identity, entry) in entries {
            tracing::debug!(%identity, interval_ms = entry.interval_ms, "interval registered");
            map.insert(identity, entry);
        }
    }

    /// Remove the given identities. Identities that are not registered are ignored.
    pub fn remove<I, S>(&self, identities: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut map = self.lock();
        for identity in identities {
            if map.remove(identity.as_ref()).is_some() {
                tracing::debug!(identity = identity.as_ref(), "interval removed");
            }
        }
    }

    /// How long `identity` must still wait before its next dispatch, or `None`
    /// when it may go now (including when it is not registered at all).
    ///
    /// An entry without a completion time is bootstrapped to exactly one
    /// interval in the past, which makes it eligible now and gives every later
    /// check a concrete timestamp to measure from.
    pub fn remaining_wait(&self, identity: &str) -> Option<Duration> {
        let now = self.now_ms();
        let mut map = self.lock();
        let entry = map.get_mut(identity)?;
        if entry.last_completed_ms.is_none() {
            entry.last_completed_ms = Some(now.saturating_sub(entry.interval_ms));
        }
        entry.remaining_ms(now).map(Duration::from_millis)
    }

    /// Stamp `identity` as completed now. Returns false (and does nothing) for
    /// identities that are not registered. Timestamps never move backwards.
    pub fn record_completion(&self, identity: &str) -> bool {
        let now = self.now_ms();
        let mut map = self.lock();
        match map.get_mut(identity) {
            Some(entry) => {
                let stamped = entry.last_completed_ms.map_or(now, |prev| prev.max(now));
                entry.last_completed_ms = Some(stamped);
                true
            }
            None => false,
        }
    }
}
