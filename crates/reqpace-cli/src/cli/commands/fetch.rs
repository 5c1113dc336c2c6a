//! `reqpace fetch` – send one paced, retried request.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use reqpace_core::config::ReqpaceConfig;
use reqpace_core::interval::{IntervalRegistry, UNNAMED};
use reqpace_core::request::{Payload, Request, RequestBuilder, RunStatus};
use reqpace_core::retry::StatusClassifier;
use reqpace_core::transport::{CurlTransport, Method};

#[derive(Debug, Args)]
pub struct FetchArgs {
    /// HTTP/HTTPS URL to request.
    pub url: String,

    /// HTTP method. Defaults to POST when a body is given, GET otherwise.
    #[arg(short = 'X', long)]
    pub method: Option<Method>,

    /// Throttle identity; requests with the same name share an interval.
    #[arg(long, default_value = UNNAMED)]
    pub name: String,

    /// Total attempts allowed (0 = unlimited). Defaults to the config value.
    #[arg(long, value_name = "N")]
    pub max_retries: Option<u32>,

    /// Extra request header, repeatable.
    #[arg(short = 'H', long = "header", value_name = "NAME: VALUE")]
    pub headers: Vec<String>,

    /// Form field, repeatable.
    #[arg(short = 'd', long = "data", value_name = "KEY=VALUE", conflicts_with = "body")]
    pub data: Vec<String>,

    /// Raw request body.
    #[arg(long)]
    pub body: Option<String>,

    /// Send form fields url-encoded instead of multipart.
    #[arg(long)]
    pub no_multipart: bool,

    /// Write the payload to this file instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub save_as: Option<PathBuf>,

    /// Keep the payload as raw bytes.
    #[arg(long)]
    pub binary: bool,

    /// Transport timeout in seconds. Defaults to the config value.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<f64>,

    /// Retry on 429 and 5xx responses (honouring Retry-After).
    #[arg(long)]
    pub retry_status: bool,
}

/// Split a `KEY=VALUE` form argument.
pub(crate) fn split_field(pair: &str) -> Result<(&str, &str)> {
    pair.split_once('=')
        .ok_or_else(|| anyhow!("expected KEY=VALUE, got {:?}", pair))
}

/// Turn parsed arguments into a request builder.
pub(crate) fn build_request(
    cfg: &ReqpaceConfig,
    registry: Arc<IntervalRegistry>,
    args: &FetchArgs,
) -> Result<RequestBuilder> {
    let mut transport_cfg = cfg.transport.clone();
    if let Some(secs) = args.timeout {
        if !secs.is_finite() || secs <= 0.0 {
            anyhow::bail!("--timeout must be a positive number of seconds");
        }
        transport_cfg.timeout_secs = secs;
    }

    let has_body = !args.data.is_empty() || args.body.is_some();
    let method = args
        .method
        .unwrap_or(if has_body { Method::Post } else { Method::Get });

    let mut builder = Request::builder(&args.url)
        .transport(Arc::new(CurlTransport::from_config(&transport_cfg)))
        .apply_config(cfg)
        .registry(registry)
        .method(method)
        .name(&args.name)
        .no_multipart_header(args.no_multipart);

    if let Some(n) = args.max_retries {
        builder = builder.max_retries(n);
    }
    if args.retry_status {
        builder = builder.classifier(StatusClassifier::default());
    }
    if let Some(path) = &args.save_as {
        builder = builder.save_as(path);
    }
    if args.binary {
        builder = builder.binary(true);
    }
    for line in &args.headers {
        builder = builder.header_line(line)?;
    }
    for pair in &args.data {
        let (key, value) = split_field(pair)?;
        builder = builder.form_field(key, value);
    }
    if let Some(body) = &args.body {
        builder = builder.body(body.as_bytes());
    }
    Ok(builder)
}

pub async fn run_fetch(
    cfg: &ReqpaceConfig,
    registry: Arc<IntervalRegistry>,
    args: FetchArgs,
) -> Result<()> {
    let mut request = build_request(cfg, registry, &args)?.build()?;
    let completion = request.completion()?;

    let handle = request.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.cancel();
        }
    });

    let status = request.run().await;
    ctrl_c.abort();

    match status? {
        RunStatus::Canceled => {
            eprintln!("canceled");
            Ok(())
        }
        RunStatus::Succeeded => {
            let payload = completion
                .await
                .context("request succeeded without a payload")?;
            match &args.save_as {
                Some(path) => {
                    eprintln!("saved {} bytes to {}", payload.len(), path.display());
                }
                None => print_payload(&payload)?,
            }
            Ok(())
        }
    }
}

fn print_payload(payload: &Payload) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(payload.as_bytes())?;
    if let Payload::Text(text) = payload {
        if !text.ends_with('\n') {
            stdout.write_all(b"\n")?;
        }
    }
    stdout.flush()?;
    Ok(())
}
