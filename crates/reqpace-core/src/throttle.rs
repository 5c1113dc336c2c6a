//! Throttle gate: hold a request back until its identity's interval has passed.
//!
//! The wait is a polling loop rather than one computed sleep. After each sleep
//! the remaining time is derived again from the registry, because the entry
//! may have been replaced, removed, or re-stamped by another request of the
//! same identity completing in the meantime.

use tokio_util::sync::CancellationToken;

use crate::interval::IntervalRegistry;

/// How a gate wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateWait {
    /// The identity is eligible to dispatch.
    Ready,
    /// The cancel token fired before the identity became eligible.
    Canceled,
}

/// Read-side view of an interval registry used before dispatch.
#[derive(Debug, Clone, Copy)]
pub struct ThrottleGate<'a> {
    registry: &'a IntervalRegistry,
}

impl<'a> ThrottleGate<'a> {
    pub fn new(registry: &'a IntervalRegistry) -> Self {
        Self { registry }
    }

    /// True if `identity` must wait before dispatching now.
    pub fn is_wait_required(&self, identity: &str) -> bool {
        self.registry.remaining_wait(identity).is_some()
    }

    /// Suspend until `identity` is eligible, or until `cancel` fires.
    pub async fn wait(&self, identity: &str, cancel: &CancellationToken) -> GateWait {
        while let Some(remaining) = self.registry.remaining_wait(identity) {
            tracing::debug!(
                %identity,
                wait_ms = remaining.as_millis() as u64,
                "throttled, waiting for interval"
            );
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = cancel.cancelled() => return GateWait::Canceled,
            }
        }
        if cancel.is_cancelled() {
            GateWait::Canceled
        } else {
            GateWait::Ready
        }
    }
}
