//! Error types for building and running requests.

use std::path::PathBuf;

/// Invalid request construction parameters.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("malformed header {0:?}; expected \"Name: Value\"")]
    MalformedHeader(String),
    #[error("unsupported method {0:?}")]
    UnknownMethod(String),
}

/// Terminal failure of a request lifecycle. Cancellation is not an error.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// The attempt ceiling was reached. No completion was delivered.
    #[error(
        "request {identity:?} gave up after {attempts} attempts ({method} {url}, last status {}): {reason}",
        .last_status.map_or_else(|| "none".to_string(), |s| s.to_string())
    )]
    Exhausted {
        identity: String,
        method: crate::transport::Method,
        url: String,
        attempts: u32,
        last_status: Option<u32>,
        reason: String,
    },
    /// Writing the binary payload to its `save_as` path failed.
    #[error("save payload to {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `run` was called on a request that had already failed terminally.
    #[error("request already ended ({0:?})")]
    AlreadyEnded(super::state::LifecycleState),
    /// A completion callback was already registered, so the awaitable form is unavailable.
    #[error("completion is already observed by a callback")]
    ObserverAlreadySet,
}

impl RequestError {
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RequestError::Exhausted { .. })
    }
}
