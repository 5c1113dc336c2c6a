use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::interval::IntervalEntry;
use crate::request::{SpacingPolicy, Timings};

/// Retry parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum attempts per request (including the first); 0 = unlimited.
    pub max_retries: u32,
    /// Backoff in seconds after a transport error (connection failure, bad response).
    pub transport_error_backoff_secs: f64,
    /// Backoff in seconds after the timeout guard aborts a hung call.
    pub guard_trip_backoff_secs: f64,
    /// Seconds the timeout guard waits beyond the transport's own timeout.
    pub guard_margin_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 10,
            transport_error_backoff_secs: 10.0,
            guard_trip_backoff_secs: 0.1,
            guard_margin_secs: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn timings(&self) -> Timings {
        Timings {
            guard_margin: secs(self.guard_margin_secs),
            guard_trip_backoff: secs(self.guard_trip_backoff_secs),
            transport_error_backoff: secs(self.transport_error_backoff_secs),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::from_secs_f64(value.max(0.0))
}

/// Transport parameters (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Overall transfer timeout in seconds.
    pub timeout_secs: f64,
    pub connect_timeout_secs: f64,
    pub user_agent: String,
    pub max_redirections: u32,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30.0,
            connect_timeout_secs: 15.0,
            user_agent: concat!("reqpace/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirections: 10,
        }
    }
}

/// Global configuration loaded from `~/.config/reqpace/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReqpaceConfig {
    /// Whether spacing is measured between completions (default) or dispatches.
    #[serde(default)]
    pub spacing: SpacingPolicy,
    /// Load and save the interval registry under the XDG state dir.
    #[serde(default = "default_persist")]
    pub persist_intervals: bool,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    /// Identities registered at startup, e.g. `[intervals.api] interval_ms = 1000`.
    #[serde(default)]
    pub intervals: HashMap<String, IntervalEntry>,
}

fn default_persist() -> bool {
    true
}

impl ReqpaceConfig {
    /// Reject values that would turn into a disabled or unbounded timer.
    ///
    /// libcurl treats a zero timeout as "no timeout", while the timeout guard
    /// would still fire at zero plus the margin and abort every slow response.
    pub fn validate(&self) -> Result<()> {
        let t = &self.transport;
        ensure!(
            t.timeout_secs.is_finite() && t.timeout_secs > 0.0,
            "transport.timeout_secs must be a positive number of seconds, got {}",
            t.timeout_secs
        );
        ensure!(
            t.connect_timeout_secs.is_finite() && t.connect_timeout_secs >= 0.0,
            "transport.connect_timeout_secs must be zero or more, got {}",
            t.connect_timeout_secs
        );
        let r = &self.retry;
        for (name, value) in [
            ("retry.transport_error_backoff_secs", r.transport_error_backoff_secs),
            ("retry.guard_trip_backoff_secs", r.guard_trip_backoff_secs),
            ("retry.guard_margin_secs", r.guard_margin_secs),
        ] {
            ensure!(
                value.is_finite() && value >= 0.0,
                "{name} must be zero or more seconds, got {value}"
            );
        }
        Ok(())
    }
}

impl Default for ReqpaceConfig {
    fn default() -> Self {
        Self {
            spacing: SpacingPolicy::default(),
            persist_intervals: true,
            retry: RetryConfig::default(),
            transport: TransportConfig::default(),
            intervals: HashMap::new(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("reqpace")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ReqpaceConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ReqpaceConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    parse(&data).with_context(|| format!("config {}", path.display()))
}

/// Parse and validate a config.toml document.
pub fn parse(data: &str) -> Result<ReqpaceConfig> {
    let cfg: ReqpaceConfig = toml::from_str(data)?;
    cfg.validate()?;
    Ok(cfg)
}
