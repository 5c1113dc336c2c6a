//! Single-shot completion signal with two ways to observe it.
//!
//! A request delivers its payload at most once, either to a callback given at
//! construction or to an awaitable `Completion`. Only one observer is allowed.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::error::RequestError;
use super::payload::Payload;

pub(super) type Callback = Box<dyn FnOnce(Payload) + Send>;

enum Observer {
    Callback(Callback),
    Waiter(oneshot::Sender<Payload>),
}

#[derive(Default)]
pub(super) struct CompletionSignal {
    observer: Option<Observer>,
    fired: bool,
}

impl fmt::Debug for CompletionSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let observer = match self.observer {
            Some(Observer::Callback(_)) => "callback",
            Some(Observer::Waiter(_)) => "waiter",
            None => "none",
        };
        f.debug_struct("CompletionSignal")
            .field("observer", &observer)
            .field("fired", &self.fired)
            .finish()
    }
}

impl CompletionSignal {
    pub(super) fn with_callback(callback: Option<Callback>) -> Self {
        Self {
            observer: callback.map(Observer::Callback),
            fired: false,
        }
    }

    /// Register the awaitable observer. Fails if a callback is already registered.
    pub(super) fn subscribe(&mut self) -> Result<Completion, RequestError> {
        if matches!(self.observer, Some(Observer::Callback(_))) {
            return Err(RequestError::ObserverAlreadySet);
        }
        let (tx, rx) = oneshot::channel();
        self.observer = Some(Observer::Waiter(tx));
        Ok(Completion { rx })
    }

    /// Deliver the payload. Only the first call has any effect.
    pub(super) fn fire(&mut self, payload: Payload) -> bool {
        if self.fired {
            return false;
        }
        self.fired = true;
        match self.observer.take() {
            Some(Observer::Callback(callback)) => callback(payload),
            Some(Observer::Waiter(tx)) => {
                // Receiver may have been dropped; nothing to deliver to then.
                let _ = tx.send(payload);
            }
            None => {}
        }
        true
    }

    /// Drop the observer without delivering (cancellation, exhaustion).
    /// An awaiting `Completion` resolves to `None`.
    pub(super) fn close(&mut self) {
        self.fired = true;
        self.observer = None;
    }
}

/// Resolves to the request's payload once it finishes, or `None` if the
/// request is canceled, exhausted, fails, or is dropped first.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<Payload>,
}

impl Future for Completion {
    type Output = Option<Payload>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}
