//! The `run` loop: throttle, dispatch under the timeout guard, classify, retry.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::retry::{Attempt, Outcome, RetryDecision};
use crate::throttle::{GateWait, ThrottleGate};
use crate::transport::{TransportRequest, TransportResponse};

use super::error::RequestError;
use super::payload::Payload;
use super::state::LifecycleState;
use super::{Request, SpacingPolicy};

/// How `run` ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// The classifier accepted a response and the completion was delivered.
    Succeeded,
    /// The request was canceled; no completion was delivered.
    Canceled,
}

/// Result of one dispatch.
enum Step {
    Finish,
    Fail { delay: Duration, reason: String },
    Canceled,
}

impl Request {
    /// Drive the request to a terminal state.
    ///
    /// Returns `Ok(Succeeded)` after delivering the completion, `Ok(Canceled)`
    /// (silently, with no completion) if canceled, and
    /// `Err(RequestError::Exhausted)` once the attempt ceiling is reached.
    /// Calling it again after a terminal state does not dispatch anything.
    pub async fn run(&mut self) -> Result<RunStatus, RequestError> {
        loop {
            match self.state() {
                LifecycleState::Canceled => return Ok(self.canceled()),
                LifecycleState::Succeeded => return Ok(RunStatus::Succeeded),
                state @ (LifecycleState::Exhausted | LifecycleState::Failed) => {
                    return Err(RequestError::AlreadyEnded(state))
                }
                _ => {}
            }

            let registry = Arc::clone(&self.registry);
            let gate = ThrottleGate::new(&registry);
            if gate.is_wait_required(&self.identity) {
                if !self.shared.transition(LifecycleState::Throttled) {
                    continue;
                }
                if gate.wait(&self.identity, &self.shared.token).await == GateWait::Canceled {
                    return Ok(self.canceled());
                }
                // Back to the top: re-check cancellation and the interval.
                continue;
            }

            let (delay, reason) = match self.attempt().await {
                Step::Canceled => continue,
                Step::Finish => return self.finish().await,
                Step::Fail { delay, reason } => (delay, reason),
            };

            match self.retry.on_failure(delay) {
                RetryDecision::Exhausted => return Err(self.exhausted(reason)),
                RetryDecision::RetryAfter(delay) => {
                    tracing::warn!(
                        identity = %self.identity,
                        url = %self.url,
                        status = ?self.last_status,
                        attempt = self.retry.attempts(),
                        remaining = %self.remaining_label(),
                        retry_in_ms = delay.as_millis() as u64,
                        %reason,
                        "attempt failed, retrying"
                    );
                    if !self.shared.transition(LifecycleState::BackingOff) {
                        continue;
                    }
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.shared.token.cancelled() => {}
                    }
                }
            }
        }
    }

    /// One dispatch: build parameters, call the transport under the guard,
    /// then classify.
    async fn attempt(&mut self) -> Step {
        if !self.shared.transition(LifecycleState::Dispatching) {
            return Step::Canceled;
        }
        let request = self.transport_request();
        let number = self.retry.attempts() + 1;

        if self.spacing == SpacingPolicy::Dispatch {
            self.registry.record_completion(&self.identity);
        }

        let transport = Arc::clone(&self.transport);
        let guard = transport.timeout() + self.timings.guard_margin;
        let abort = self.shared.token.child_token();
        if !self.shared.transition(LifecycleState::InFlight) {
            return Step::Canceled;
        }
        tracing::debug!(
            identity = %self.identity,
            method = %self.method,
            url = %self.url,
            attempt = number,
            guard_ms = guard.as_millis() as u64,
            "dispatching"
        );

        let result = tokio::select! {
            r = transport.send(request, abort.clone()) => Some(r),
            _ = tokio::time::sleep(guard) => None,
            _ = self.shared.token.cancelled() => return Step::Canceled,
        };

        match result {
            None => {
                // The transport ignored its own timeout; abort it ourselves.
                abort.cancel();
                tracing::warn!(
                    identity = %self.identity,
                    url = %self.url,
                    attempt = number,
                    guard_ms = guard.as_millis() as u64,
                    "timeout guard fired, aborting transport call"
                );
                Step::Fail {
                    delay: self.timings.guard_trip_backoff,
                    reason: format!("no response within {}ms timeout guard", guard.as_millis()),
                }
            }
            Some(Err(_)) if self.shared.token.is_cancelled() => Step::Canceled,
            Some(Err(e)) => Step::Fail {
                delay: self.timings.transport_error_backoff,
                reason: format!("transport error: {e}"),
            },
            Some(Ok(response)) => self.classify(number, response),
        }
    }

    fn transport_request(&self) -> TransportRequest {
        TransportRequest {
            url: self.url.clone(),
            method: self.method,
            headers: self.headers.clone(),
            body: self.post.as_ref().map(|p| p.frame(self.no_multipart)),
            accept_compressed: true,
        }
    }

    /// Record the response on the request and ask the classifier about it.
    fn classify(&mut self, number: u32, response: TransportResponse) -> Step {
        let TransportResponse {
            status,
            headers,
            body,
        } = response;
        let payload = Payload::decode(body, self.binary);
        let outcome = self.classifier.classify(&Attempt {
            identity: &self.identity,
            url: &self.url,
            number,
            status,
            headers: &headers,
            payload: &payload,
        });
        self.last_status = Some(status);
        self.last_headers = headers;
        self.last_payload = Some(payload);
        match outcome {
            Outcome::Finish => Step::Finish,
            Outcome::Fail { delay, reason } => Step::Fail { delay, reason },
        }
    }

    async fn finish(&mut self) -> Result<RunStatus, RequestError> {
        if self.shared.token.is_cancelled() {
            return Ok(self.canceled());
        }
        let payload = self
            .last_payload
            .clone()
            .unwrap_or_else(|| Payload::decode(Vec::new(), self.binary));

        if let Some(path) = self.save_as.clone() {
            if let Err(source) = save_payload(&path, &payload, &self.shared.token).await {
                if self.shared.token.is_cancelled() {
                    return Ok(self.canceled());
                }
                self.shared.transition(LifecycleState::Failed);
                self.completion.close();
                tracing::error!(identity = %self.identity, path = %path.display(), error = %source, "saving payload failed");
                return Err(RequestError::Save { path, source });
            }
        }

        if !self.shared.transition(LifecycleState::Succeeded) {
            // Canceled between the save and now; the file must not outlive the request.
            if let Some(path) = &self.save_as {
                discard(path).await;
            }
            return Ok(self.canceled());
        }
        if self.spacing == SpacingPolicy::Completion {
            self.registry.record_completion(&self.identity);
        }
        tracing::info!(
            identity = %self.identity,
            url = %self.url,
            status = ?self.last_status,
            attempts = self.retry.attempts() + 1,
            bytes = payload.len(),
            "request completed"
        );
        self.completion.fire(payload);
        Ok(RunStatus::Succeeded)
    }

    fn exhausted(&mut self, reason: String) -> RequestError {
        self.shared.transition(LifecycleState::Exhausted);
        self.completion.close();
        tracing::error!(
            identity = %self.identity,
            method = %self.method,
            url = %self.url,
            status = ?self.last_status,
            attempts = self.retry.attempts(),
            %reason,
            "retries exhausted"
        );
        RequestError::Exhausted {
            identity: self.identity.clone(),
            method: self.method,
            url: self.url.clone(),
            attempts: self.retry.attempts(),
            last_status: self.last_status,
            reason,
        }
    }

    fn canceled(&mut self) -> RunStatus {
        self.completion.close();
        tracing::debug!(identity = %self.identity, url = %self.url, "run stopped: canceled");
        RunStatus::Canceled
    }

    fn remaining_label(&self) -> String {
        match self.retry.remaining() {
            Some(n) => n.to_string(),
            None => "unlimited".to_string(),
        }
    }
}

/// Write the payload next to `path` and move it into place, unless the
/// request is canceled in the meantime. An existing file at `path` is
/// only replaced by a complete payload.
async fn save_payload(
    path: &Path,
    payload: &Payload,
    cancel: &CancellationToken,
) -> std::io::Result<()> {
    let partial = partial_path(path);
    if let Err(e) = tokio::fs::write(&partial, payload.as_bytes()).await {
        discard(&partial).await;
        return Err(e);
    }
    if cancel.is_cancelled() {
        discard(&partial).await;
        return Err(std::io::Error::new(
            std::io::ErrorKind::Interrupted,
            "request canceled while saving",
        ));
    }
    if let Err(e) = tokio::fs::rename(&partial, path).await {
        discard(&partial).await;
        return Err(e);
    }
    Ok(())
}

/// `dir/name` -> `dir/.name.part`.
fn partial_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(path.file_name().unwrap_or_else(|| OsStr::new("payload")));
    name.push(".part");
    path.with_file_name(name)
}

async fn discard(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed unsaved payload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove unsaved payload"),
    }
}
