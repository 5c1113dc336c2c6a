//! Lifecycle state shared between a request and its cancel handles.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    /// Waiting for the identity's interval to pass.
    Throttled,
    /// Building the outgoing parameters.
    Dispatching,
    /// Transport call running under the timeout guard.
    InFlight,
    /// Waiting out a retry delay.
    BackingOff,
    Succeeded,
    /// Attempt ceiling reached.
    Exhausted,
    /// Non-retryable failure after a successful attempt (payload could not be saved).
    Failed,
    Canceled,
}

impl LifecycleState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LifecycleState::Succeeded
                | LifecycleState::Exhausted
                | LifecycleState::Failed
                | LifecycleState::Canceled
        )
    }
}

/// What a cancel request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelResult {
    Canceled,
    AlreadyCanceled,
    /// The request had already reached a terminal state; its result stands.
    AlreadyCompleted,
}

#[derive(Debug)]
pub(super) struct Shared {
    state: Mutex<LifecycleState>,
    pub(super) token: CancellationToken,
}

impl Shared {
    pub(super) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(LifecycleState::Created),
            token: CancellationToken::new(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, LifecycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(super) fn state(&self) -> LifecycleState {
        *self.lock()
    }

    /// Move to `next` unless the request is already terminal. Returns false when
    /// the transition was refused (typically because it was canceled).
    pub(super) fn transition(&self, next: LifecycleState) -> bool {
        let mut state = self.lock();
        if state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }

    pub(super) fn cancel(&self, identity: &str) -> CancelResult {
        let mut state = self.lock();
        match *state {
            LifecycleState::Canceled => {
                tracing::info!(%identity, "cancel ignored: request already canceled");
                CancelResult::AlreadyCanceled
            }
            s if s.is_terminal() => {
                tracing::info!(%identity, state = ?s, "cancel ignored: request already completed");
                CancelResult::AlreadyCompleted
            }
            prev => {
                *state = LifecycleState::Canceled;
                self.token.cancel();
                tracing::info!(%identity, from = ?prev, "request canceled");
                CancelResult::Canceled
            }
        }
    }
}

/// Cloneable handle that cancels a request from another task.
///
/// Cancellation is cooperative: it is honoured before dispatch, before a
/// scheduled retry, and during any throttle wait or backoff. An in-flight
/// transport call is aborted through the transport's own abort path.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    pub(super) shared: Arc<Shared>,
    pub(super) identity: Arc<str>,
}

impl CancelHandle {
    pub fn cancel(&self) -> CancelResult {
        self.shared.cancel(&self.identity)
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.token.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states_refuse_transitions() {
        let shared = Shared::new();
        assert!(shared.transition(LifecycleState::InFlight));
        assert!(shared.transition(LifecycleState::Succeeded));
        assert!(!shared.transition(LifecycleState::Dispatching));
        assert_eq!(shared.state(), LifecycleState::Succeeded);
    }

    #[test]
    fn cancel_is_idempotent() {
        let shared = Shared::new();
        assert_eq!(shared.cancel("x"), CancelResult::Canceled);
        assert!(shared.token.is_cancelled());
        assert_eq!(shared.cancel("x"), CancelResult::AlreadyCanceled);
        assert!(!shared.transition(LifecycleState::Dispatching));
    }

    #[test]
    fn cancel_after_success_is_noop() {
        let shared = Shared::new();
        shared.transition(LifecycleState::Succeeded);
        assert_eq!(shared.cancel("x"), CancelResult::AlreadyCompleted);
        assert!(!shared.token.is_cancelled());
        assert_eq!(shared.state(), LifecycleState::Succeeded);
    }
}
