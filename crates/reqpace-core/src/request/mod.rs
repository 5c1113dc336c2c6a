//! Request lifecycle: throttle, dispatch under a timeout guard, classify, retry.
//!
//! A `Request` owns one logical request and drives it through
//! `Created → (Throttled)* → Dispatching → InFlight` and on to
//! `Succeeded`, `Exhausted` or `Canceled`, with `BackingOff` between
//! failed attempts. Only one attempt is ever in flight per request; the
//! interval registry is the only state shared with other requests.

mod builder;
mod completion;
mod error;
mod lifecycle;
mod payload;
mod state;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::interval::IntervalRegistry;
use crate::retry::{Classifier, RetryController};
use crate::transport::{Method, RequestBody, Transport};

pub use builder::{split_header_line, RequestBuilder};
pub use completion::Completion;
pub use error::{BuildError, RequestError};
pub use lifecycle::RunStatus;
pub use payload::Payload;
pub use state::{CancelHandle, CancelResult, LifecycleState};

use completion::CompletionSignal;
use state::Shared;

/// When an identity's interval clock is restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacingPolicy {
    /// Measure spacing between successful completions, so fast retries can't
    /// burst several requests into one interval.
    #[default]
    Completion,
    /// Measure spacing between dispatches, for a strict request cadence.
    Dispatch,
}

/// Fixed delays used by the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// How far beyond the transport's own timeout the guard fires.
    pub guard_margin: Duration,
    /// Retry delay after the guard aborts a hung call.
    pub guard_trip_backoff: Duration,
    /// Retry delay after a transport error.
    pub transport_error_backoff: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            guard_margin: Duration::from_secs(2),
            guard_trip_backoff: Duration::from_millis(100),
            transport_error_backoff: Duration::from_secs(10),
        }
    }
}

/// Body given by the caller, before it is framed for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PostBody {
    Fields(Vec<(String, String)>),
    Raw(Vec<u8>),
}

impl PostBody {
    fn frame(&self, no_multipart: bool) -> RequestBody {
        match self {
            PostBody::Fields(fields) if no_multipart => RequestBody::Form(fields.clone()),
            PostBody::Fields(fields) => RequestBody::Multipart(fields.clone()),
            PostBody::Raw(bytes) => RequestBody::Raw(bytes.clone()),
        }
    }
}

/// One logical request and its retry/throttle state.
pub struct Request {
    identity: String,
    url: String,
    method: Method,
    headers: Vec<(String, String)>,
    post: Option<PostBody>,
    no_multipart: bool,
    binary: bool,
    save_as: Option<PathBuf>,
    spacing: SpacingPolicy,
    timings: Timings,
    registry: Arc<IntervalRegistry>,
    transport: Arc<dyn Transport>,
    classifier: Arc<dyn Classifier>,
    retry: RetryController,
    last_status: Option<u32>,
    last_headers: Vec<(String, String)>,
    last_payload: Option<Payload>,
    shared: Arc<Shared>,
    completion: CompletionSignal,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("identity", &self.identity)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("state", &self.state())
            .field("attempts", &self.retry.attempts())
            .field("max_retries", &self.retry.ceiling())
            .field("last_status", &self.last_status)
            .finish_non_exhaustive()
    }
}

impl Request {
    /// Start building a request for `url`.
    pub fn builder(url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(url)
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn is_binary(&self) -> bool {
        self.binary
    }

    pub fn state(&self) -> LifecycleState {
        self.shared.state()
    }

    /// Failed attempts so far.
    pub fn attempts(&self) -> u32 {
        self.retry.attempts()
    }

    /// Attempt ceiling; 0 means unlimited.
    pub fn max_retries(&self) -> u32 {
        self.retry.ceiling()
    }

    pub fn last_status(&self) -> Option<u32> {
        self.last_status
    }

    pub fn last_headers(&self) -> &[(String, String)] {
        &self.last_headers
    }

    pub fn last_payload(&self) -> Option<&Payload> {
        self.last_payload.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.state() == LifecycleState::Succeeded
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.token.is_cancelled()
    }

    /// Handle for canceling this request from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            shared: Arc::clone(&self.shared),
            identity: Arc::from(self.identity.as_str()),
        }
    }

    pub fn cancel(&self) -> CancelResult {
        self.shared.cancel(&self.identity)
    }

    /// Awaitable form of the completion notification. Not available when a
    /// callback was registered with `on_complete`.
    pub fn completion(&mut self) -> Result<Completion, RequestError> {
        self.completion.subscribe()
    }

    /// Run the lifecycle and return the payload directly.
    /// `Ok(None)` means the request was canceled.
    pub async fn send(mut self) -> Result<Option<Payload>, RequestError> {
        let completion = self.completion()?;
        match self.run().await? {
            RunStatus::Succeeded => Ok(completion.await),
            RunStatus::Canceled => Ok(None),
        }
    }
}
