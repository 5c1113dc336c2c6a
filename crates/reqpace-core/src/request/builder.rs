//! Construction parameters for a request.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;

use crate::config::ReqpaceConfig;
use crate::interval::{IntervalRegistry, UNNAMED};
use crate::retry::{AcceptAll, Classifier, RetryController};
use crate::transport::{CurlTransport, Method, Transport};

use super::completion::{Callback, CompletionSignal};
use super::error::BuildError;
use super::payload::Payload;
use super::state::Shared;
use super::{PostBody, Request, SpacingPolicy, Timings};

const DEFAULT_MAX_RETRIES: u32 = 10;

/// Split a `"Name: Value"` header line on its first colon only, so values
/// that contain colons (URLs, times) stay intact.
pub fn split_header_line(line: &str) -> Result<(String, String), BuildError> {
    match line.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(BuildError::MalformedHeader(line.to_string())),
    }
}

/// String form of a JSON value sent as a form field. Strings go as-is,
/// everything else as its JSON text.
fn field_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Builder for [`Request`]. Only the URL is required.
pub struct RequestBuilder {
    url: String,
    method: Method,
    name: String,
    max_retries: u32,
    no_multipart: bool,
    save_as: Option<PathBuf>,
    binary: Option<bool>,
    headers: Vec<(String, String)>,
    post: Option<PostBody>,
    spacing: SpacingPolicy,
    timings: Timings,
    registry: Option<Arc<IntervalRegistry>>,
    transport: Option<Arc<dyn Transport>>,
    classifier: Arc<dyn Classifier>,
    on_complete: Option<Callback>,
}

impl RequestBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: Method::Get,
            name: UNNAMED.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            no_multipart: false,
            save_as: None,
            binary: None,
            headers: Vec::new(),
            post: None,
            spacing: SpacingPolicy::default(),
            timings: Timings::default(),
            registry: None,
            transport: None,
            classifier: Arc::new(AcceptAll),
            on_complete: None,
        }
    }

    /// Take retry ceiling, timings, spacing policy and transport settings from config.
    pub fn apply_config(mut self, cfg: &ReqpaceConfig) -> Self {
        self.max_retries = cfg.retry.max_retries;
        self.timings = cfg.retry.timings();
        self.spacing = cfg.spacing;
        if self.transport.is_none() {
            self.transport = Some(Arc::new(CurlTransport::from_config(&cfg.transport)));
        }
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Throttle identity. Requests sharing a name share an interval budget.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Total attempts allowed (first one included); 0 = unlimited.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Send form fields url-encoded instead of as multipart, for APIs that reject multipart.
    pub fn no_multipart_header(mut self, no_multipart: bool) -> Self {
        self.no_multipart = no_multipart;
        self
    }

    /// Write the payload to `path` on success. Makes the request binary unless overridden.
    pub fn save_as(mut self, path: impl Into<PathBuf>) -> Self {
        self.save_as = Some(path.into());
        self
    }

    pub fn binary(mut self, binary: bool) -> Self {
        self.binary = Some(binary);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Add a header from a `"Name: Value"` line.
    pub fn header_line(self, line: &str) -> Result<Self, BuildError> {
        let (name, value) = split_header_line(line)?;
        Ok(self.header(name, value))
    }

    /// Request body from JSON. An object becomes form fields (non-string
    /// values serialized to JSON text); any other value is sent raw.
    pub fn post_data(mut self, data: Value) -> Self {
        self.post = Some(match data {
            Value::Object(map) => PostBody::Fields(
                map.into_iter()
                    .map(|(k, v)| (k, field_value(v)))
                    .collect(),
            ),
            Value::String(s) => PostBody::Raw(s.into_bytes()),
            other => PostBody::Raw(other.to_string().into_bytes()),
        });
        self
    }

    /// Append one form field. Replaces a raw body if one was set.
    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let field = (name.into(), value.into());
        match &mut self.post {
            Some(PostBody::Fields(fields)) => fields.push(field),
            _ => self.post = Some(PostBody::Fields(vec![field])),
        }
        self
    }

    /// Raw request body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.post = Some(PostBody::Raw(body.into()));
        self
    }

    pub fn spacing(mut self, spacing: SpacingPolicy) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Use a private registry instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<IntervalRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn classifier(mut self, classifier: impl Classifier + 'static) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Callback invoked once with the final payload. Never invoked on
    /// cancellation or exhaustion.
    pub fn on_complete<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Payload) + Send + 'static,
    {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn build(self) -> Result<Request, BuildError> {
        url::Url::parse(&self.url).map_err(|source| BuildError::InvalidUrl {
            url: self.url.clone(),
            source,
        })?;
        let binary = self.binary.unwrap_or(self.save_as.is_some());
        Ok(Request {
            identity: self.name,
            url: self.url,
            method: self.method,
            headers: self.headers,
            post: self.post,
            no_multipart: self.no_multipart,
            binary,
            save_as: self.save_as,
            spacing: self.spacing,
            timings: self.timings,
            registry: self.registry.unwrap_or_else(IntervalRegistry::global),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(CurlTransport::default())),
            classifier: self.classifier,
            retry: RetryController::new(self.max_retries),
            last_status: None,
            last_headers: Vec::new(),
            last_payload: None,
            shared: Shared::new(),
            completion: CompletionSignal::with_callback(self.on_complete),
        })
    }
}
