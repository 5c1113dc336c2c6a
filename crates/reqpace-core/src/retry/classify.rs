//! Outcome classification for completed attempts.

use std::time::Duration;

use crate::request::Payload;

/// What a completed attempt looked like, as seen by a classifier.
#[derive(Debug, Clone, Copy)]
pub struct Attempt<'a> {
    pub identity: &'a str,
    pub url: &'a str,
    /// 1-based number of this attempt.
    pub number: u32,
    pub status: u32,
    pub headers: &'a [(String, String)],
    pub payload: &'a Payload,
}

impl Attempt<'_> {
    /// First response header named `name` (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Result of classifying one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The attempt's payload is the final result.
    Finish,
    /// Retry after `delay`; `reason` ends up in logs and the exhaustion error.
    Fail { delay: Duration, reason: String },
}

impl Outcome {
    pub fn fail(delay: Duration, reason: impl Into<String>) -> Self {
        Outcome::Fail {
            delay,
            reason: reason.into(),
        }
    }
}

/// Decides success vs. retry for a completed attempt.
pub trait Classifier: Send + Sync {
    fn classify(&self, attempt: &Attempt<'_>) -> Outcome;
}

impl<F> Classifier for F
where
    F: Fn(&Attempt<'_>) -> Outcome + Send + Sync,
{
    fn classify(&self, attempt: &Attempt<'_>) -> Outcome {
        self(attempt)
    }
}

/// Treats every response the transport returned as final. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl Classifier for AcceptAll {
    fn classify(&self, _attempt: &Attempt<'_>) -> Outcome {
        Outcome::Finish
    }
}

/// High-level classification of an HTTP status for retry purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Server asked us to slow down (429, 503).
    Throttled,
    /// Retryable server error (other 5xx).
    Http5xx(u16),
    /// Anything else; not retried by `StatusClassifier`.
    Other,
}

/// Classify an HTTP status code for retry decisions.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::Other,
    }
}

/// Retries throttling and server-error statuses, finishes on anything else.
///
/// A `Retry-After` header given in seconds overrides `throttled_delay`.
#[derive(Debug, Clone, Copy)]
pub struct StatusClassifier {
    pub throttled_delay: Duration,
    pub server_error_delay: Duration,
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self {
            throttled_delay: Duration::from_secs(60),
            server_error_delay: Duration::from_secs(10),
        }
    }
}

impl Classifier for StatusClassifier {
    fn classify(&self, attempt: &Attempt<'_>) -> Outcome {
        match classify_http_status(attempt.status) {
            ErrorKind::Throttled => {
                let delay = attempt
                    .header("retry-after")
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs)
                    .unwrap_or(self.throttled_delay);
                Outcome::fail(delay, format!("throttled by server (HTTP {})", attempt.status))
            }
            ErrorKind::Http5xx(code) => {
                Outcome::fail(self.server_error_delay, format!("server error (HTTP {code})"))
            }
            ErrorKind::Other => Outcome::Finish,
        }
    }
}

/// Looks inside text bodies for failure markers.
///
/// A blank body fails with `blank_delay`; a body containing one of the
/// configured markers fails with that marker's delay (e.g. an API's
/// "rate limit exceeded" message with an hour-long backoff). Binary payloads
/// are only checked for emptiness.
#[derive(Debug, Clone)]
pub struct MarkerClassifier {
    pub blank_delay: Duration,
    markers: Vec<(String, Duration)>,
}

impl MarkerClassifier {
    pub fn new(blank_delay: Duration) -> Self {
        Self {
            blank_delay,
            markers: Vec::new(),
        }
    }

    /// Fail with `delay` whenever the body contains `marker`.
    pub fn marker(mut self, marker: impl Into<String>, delay: Duration) -> Self {
        self.markers.push((marker.into(), delay));
        self
    }
}

impl Classifier for MarkerClassifier {
    fn classify(&self, attempt: &Attempt<'_>) -> Outcome {
        if attempt.payload.is_blank() {
            return Outcome::fail(self.blank_delay, "blank response");
        }
        if let Some(text) = attempt.payload.as_text() {
            for (marker, delay) in &self.markers {
                if text.contains(marker.as_str()) {
                    return Outcome::fail(*delay, format!("response contains {marker:?}"));
                }
            }
        }
        Outcome::Finish
    }
}
