//! Retry control and outcome classification.
//!
//! The controller counts failed attempts against a ceiling; the classifier is
//! the pluggable decision of whether a completed attempt is a success or a
//! failure worth retrying (and after how long).

mod classify;
mod policy;

pub use classify::{
    classify_http_status, AcceptAll, Attempt, Classifier, ErrorKind, MarkerClassifier, Outcome,
    StatusClassifier,
};
pub use policy::{RetryController, RetryDecision};
