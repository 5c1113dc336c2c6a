//! libcurl-backed transport.
//!
//! Each attempt runs one `curl::easy::Easy` transfer on tokio's blocking pool.
//! The abort token is polled from curl's progress callback, so cancelling it
//! stops the transfer within one progress tick.

use std::str;
use std::time::Duration;

use async_trait::async_trait;
use curl::easy::{Easy, Form, List};
use tokio_util::sync::CancellationToken;

use crate::config::TransportConfig;

use super::parse::parse_headers;
use super::{Method, RequestBody, Transport, TransportError, TransportRequest, TransportResponse};

/// Transport that performs requests with libcurl.
#[derive(Debug, Clone)]
pub struct CurlTransport {
    timeout: Duration,
    connect_timeout: Duration,
    user_agent: String,
    max_redirections: u32,
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::from_config(&TransportConfig::default())
    }
}

impl CurlTransport {
    /// Transport with the given overall timeout and default settings otherwise.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Transport from config values. A timeout that is not a positive finite
    /// number falls back to the default: libcurl would read zero as "never
    /// time out" while the lifecycle's guard would still fire at the margin.
    pub fn from_config(cfg: &TransportConfig) -> Self {
        let timeout = if cfg.timeout_secs.is_finite() && cfg.timeout_secs > 0.0 {
            Duration::from_secs_f64(cfg.timeout_secs)
        } else {
            let fallback = TransportConfig::default().timeout_secs;
            tracing::warn!(
                timeout_secs = cfg.timeout_secs,
                fallback_secs = fallback,
                "invalid transport timeout, using default"
            );
            Duration::from_secs_f64(fallback)
        };
        let connect_timeout = if cfg.connect_timeout_secs.is_finite() {
            Duration::from_secs_f64(cfg.connect_timeout_secs.max(0.0))
        } else {
            Duration::ZERO
        };
        Self {
            timeout,
            connect_timeout,
            user_agent: cfg.user_agent.clone(),
            max_redirections: cfg.max_redirections,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Run one transfer on the current thread.
    fn perform(
        &self,
        request: &TransportRequest,
        abort: &CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        if abort.is_cancelled() {
            return Err(TransportError::Aborted);
        }

        let mut easy = Easy::new();
        easy.url(&request.url)?;
        easy.follow_location(true)?;
        easy.max_redirections(self.max_redirections)?;
        easy.connect_timeout(self.connect_timeout)?;
        easy.timeout(self.timeout)?;
        easy.useragent(&self.user_agent)?;
        if request.accept_compressed {
            // Empty string: offer every encoding libcurl was built with.
            easy.accept_encoding("")?;
        }

        let mut list = List::new();
        for (k, v) in &request.headers {
            list.append(&format!("{}: {}", k.trim(), v.trim()))?;
        }
        if !request.headers.is_empty() {
            easy.http_headers(list)?;
        }

        match (&request.body, request.method.allows_body()) {
            (Some(RequestBody::Form(fields)), true) => {
                let encoded = url::form_urlencoded::Serializer::new(String::new())
                    .extend_pairs(fields.iter())
                    .finish();
                easy.post_fields_copy(encoded.as_bytes())?;
            }
            (Some(RequestBody::Multipart(fields)), true) => {
                let mut form = Form::new();
                for (name, value) in fields {
                    form.part(name).contents(value.as_bytes()).add()?;
                }
                easy.httppost(form)?;
            }
            (Some(RequestBody::Raw(bytes)), true) => {
                easy.post_fields_copy(bytes)?;
            }
            (Some(_), false) => {
                tracing::warn!(method = %request.method, url = %request.url, "body ignored for method without body");
            }
            (None, _) => {}
        }

        match request.method {
            Method::Get => easy.get(true)?,
            Method::Head => easy.nobody(true)?,
            Method::Post if request.body.is_some() => {}
            Method::Post => easy.post(true)?,
            other => easy.custom_request(other.as_str())?,
        }

        let mut header_lines: Vec<String> = Vec::new();
        let mut body: Vec<u8> = Vec::new();
        easy.progress(true)?;
        {
            let mut transfer = easy.transfer();
            transfer.header_function(|data| {
                if let Ok(s) = str::from_utf8(data) {
                    header_lines.push(s.trim_end().to_string());
                }
                true
            })?;
            transfer.write_function(|data| {
                body.extend_from_slice(data);
                Ok(data.len())
            })?;
            // Returning false aborts the transfer.
            transfer.progress_function(|_, _, _, _| !abort.is_cancelled())?;
            if let Err(e) = transfer.perform() {
                if e.is_aborted_by_callback() {
                    return Err(TransportError::Aborted);
                }
                return Err(e.into());
            }
        }

        let status = easy.response_code()?;
        Ok(TransportResponse {
            status,
            headers: parse_headers(&header_lines),
            body,
        })
    }
}

#[async_trait]
impl Transport for CurlTransport {
    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn send(
        &self,
        request: TransportRequest,
        abort: CancellationToken,
    ) -> Result<TransportResponse, TransportError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.perform(&request, &abort))
            .await
            .map_err(|e| TransportError::Worker(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_uses_configured_timeout() {
        let cfg = TransportConfig {
            timeout_secs: 2.5,
            ..TransportConfig::default()
        };
        assert_eq!(CurlTransport::from_config(&cfg).timeout(), Duration::from_millis(2500));
    }

    #[test]
    fn zero_timeout_falls_back_to_default() {
        let cfg = TransportConfig {
            timeout_secs: 0.0,
            ..TransportConfig::default()
        };
        let transport = CurlTransport::from_config(&cfg);
        assert_eq!(transport.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn non_finite_values_do_not_panic() {
        let cfg = TransportConfig {
            timeout_secs: f64::INFINITY,
            connect_timeout_secs: f64::NAN,
            ..TransportConfig::default()
        };
        let transport = CurlTransport::from_config(&cfg);
        assert_eq!(transport.timeout(), Duration::from_secs(30));
        assert_eq!(transport.connect_timeout, Duration::ZERO);
    }
}
