//! Per-identity interval registry.
//!
//! Tracks, for each request identity, the minimum spacing required between
//! completed requests and when the last one completed:
//! - entries are registered in bulk (replace-all or merge) and removed by name
//! - the throttle gate reads them to decide whether a request must wait
//! - the request lifecycle writes the completion time when a request finishes
//!
//! One shared instance lives for the whole process (`IntervalRegistry::global`);
//! a request may be handed a private registry instead for an isolated
//! throttling scope. Snapshots can be persisted as JSON so spacing observed
//! before a restart is still honoured afterwards.

mod entry;
mod persist;
mod registry;
mod snapshot;

pub use entry::IntervalEntry;
pub use registry::{IntervalRegistry, UNNAMED};
pub use snapshot::PersistedIntervals;
