//! Transport capability: the thing that actually talks to the network.
//!
//! The request lifecycle only sees the `Transport` trait. `CurlTransport` is
//! the libcurl-backed implementation; tests plug in scripted transports.

mod libcurl;
mod parse;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::request::BuildError;

pub use libcurl::CurlTransport;
pub use parse::parse_headers;

/// HTTP method of an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Method {
    #[default]
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Head => "HEAD",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// GET and HEAD never carry a body.
    pub fn allows_body(&self) -> bool {
        !matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "HEAD" => Ok(Method::Head),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(BuildError::UnknownMethod(s.to_string())),
        }
    }
}

/// Framed request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// `application/x-www-form-urlencoded` fields.
    Form(Vec<(String, String)>),
    /// `multipart/form-data` fields.
    Multipart(Vec<(String, String)>),
    /// Bytes sent as-is.
    Raw(Vec<u8>),
}

/// Everything a transport needs to perform one attempt.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    /// Negotiate compressed responses (and decode them transparently).
    pub accept_compressed: bool,
}

/// Raw result of one attempt.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u32,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// Transport-level failure (no usable response).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("curl: {0}")]
    Curl(#[from] ::curl::Error),
    #[error("multipart form: {0}")]
    Form(#[from] ::curl::FormError),
    #[error("transfer aborted")]
    Aborted,
    #[error("transport worker failed: {0}")]
    Worker(String),
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// True for the transport's own timeout firing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Curl(e) if e.is_operation_timedout())
    }
}

/// Sends requests. One call is one attempt.
///
/// Implementations must stop work promptly once `abort` is cancelled; the
/// lifecycle cancels it on user cancellation and when its timeout guard trips.
#[async_trait]
pub trait Transport: Send + Sync {
    /// The transport's own overall timeout. The lifecycle arms its guard a
    /// fixed margin above this.
    fn timeout(&self) -> Duration;

    async fn send(
        &self,
        request: TransportRequest,
        abort: CancellationToken,
    ) -> Result<TransportResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_is_case_insensitive() {
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("Delete".parse::<Method>().unwrap(), Method::Delete);
        assert!(matches!(
            "BREW".parse::<Method>(),
            Err(BuildError::UnknownMethod(m)) if m == "BREW"
        ));
    }

    #[test]
    fn get_and_head_have_no_body() {
        assert!(!Method::Get.allows_body());
        assert!(!Method::Head.allows_body());
        assert!(Method::Post.allows_body());
        assert!(Method::Put.allows_body());
    }
}
