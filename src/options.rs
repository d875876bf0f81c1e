//! Process options read from the environment.
//!
//! Every option has a default, and an unparseable value falls back to the
//! default rather than failing startup.

use std::path::PathBuf;
use std::time::Duration;

use crate::github::ThrottleConfig;
use crate::worker::periodic::{MAX_PERIOD, clamp_period};

/// Default HTTP port.
const DEFAULT_PORT: u16 = 8888;

/// Default scan interval (24 hours).
const DEFAULT_UPDATE_PERIOD_MINS: u64 = 24 * 60;

/// Default configuration poll interval.
const DEFAULT_CONFIG_RELOAD_SECS: u64 = 60;

/// Default cap on concurrent webhook reconciliations.
const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Default time shutdown waits for in-flight reconciliations.
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

/// Options for the `needs-retitle` server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOptions {
    /// Port the webhook server listens on.
    ///
    /// Configure via `NEEDS_RETITLE_PORT`.
    pub port: u16,

    /// Policy configuration file, polled for changes.
    ///
    /// Configure via `NEEDS_RETITLE_CONFIG_PATH`.
    pub config_path: PathBuf,

    /// File holding the webhook HMAC secret.
    ///
    /// Configure via `NEEDS_RETITLE_HMAC_SECRET_FILE`.
    pub hmac_secret_file: PathBuf,

    /// File holding the GitHub token. `GITHUB_TOKEN` is used if unset.
    ///
    /// Configure via `NEEDS_RETITLE_GITHUB_TOKEN_FILE`.
    pub github_token_file: Option<PathBuf>,

    /// Only read from GitHub; log mutations instead of performing them.
    ///
    /// Configure via `NEEDS_RETITLE_DRY_RUN`. Default: true.
    pub dry_run: bool,

    /// Interval between bulk scans.
    ///
    /// Configure via `NEEDS_RETITLE_UPDATE_PERIOD_MINS`.
    pub update_period: Duration,

    /// Interval between configuration reloads.
    ///
    /// Configure via `NEEDS_RETITLE_CONFIG_RELOAD_SECS`.
    pub config_reload_interval: Duration,

    /// Maximum concurrent webhook reconciliations.
    ///
    /// Configure via `NEEDS_RETITLE_MAX_IN_FLIGHT`.
    pub max_in_flight: usize,

    /// How long shutdown waits for in-flight reconciliations.
    ///
    /// Configure via `NEEDS_RETITLE_SHUTDOWN_GRACE_SECS`.
    pub shutdown_grace: Duration,

    /// Configure via `NEEDS_RETITLE_LOG_FORMAT` (`json` or `text`).
    pub log_format: LogFormat,

    /// Client-side limit on GitHub calls.
    ///
    /// Configure via `NEEDS_RETITLE_THROTTLE_PER_HOUR` (0 disables) and
    /// `NEEDS_RETITLE_THROTTLE_BURST`. Default: 360 per hour, burst 360.
    pub throttle: ThrottleConfig,
}

impl Default for ServerOptions {
    fn default() -> Self {
        ServerOptions {
            port: DEFAULT_PORT,
            config_path: PathBuf::from("/etc/needs-retitle/config.yaml"),
            hmac_secret_file: PathBuf::from("/etc/webhook/hmac"),
            github_token_file: Some(PathBuf::from("/etc/github/oauth")),
            dry_run: true,
            update_period: Duration::from_secs(DEFAULT_UPDATE_PERIOD_MINS * 60),
            config_reload_interval: Duration::from_secs(DEFAULT_CONFIG_RELOAD_SECS),
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
            log_format: LogFormat::Json,
            throttle: ThrottleConfig::DEFAULT,
        }
    }
}

impl ServerOptions {
    /// Reads options from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads options through `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parsed = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u64>().ok());
        let parsed_u32 = |name: &str| lookup(name).and_then(|v| v.trim().parse::<u32>().ok());

        let github_token_file = match lookup("NEEDS_RETITLE_GITHUB_TOKEN_FILE") {
            Some(path) if path.is_empty() => None,
            Some(path) => Some(PathBuf::from(path)),
            None => defaults.github_token_file,
        };

        ServerOptions {
            port: lookup("NEEDS_RETITLE_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            config_path: lookup("NEEDS_RETITLE_CONFIG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.config_path),
            hmac_secret_file: lookup("NEEDS_RETITLE_HMAC_SECRET_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.hmac_secret_file),
            github_token_file,
            dry_run: lookup("NEEDS_RETITLE_DRY_RUN")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.dry_run),
            update_period: parsed("NEEDS_RETITLE_UPDATE_PERIOD_MINS")
                .filter(|&m| m > 0)
                .map(|m| Duration::from_secs(m.saturating_mul(60)))
                .map(clamp_period)
                .unwrap_or(defaults.update_period),
            config_reload_interval: parsed("NEEDS_RETITLE_CONFIG_RELOAD_SECS")
                .filter(|&s| s > 0)
                .map(Duration::from_secs)
                .map(clamp_period)
                .unwrap_or(defaults.config_reload_interval),
            max_in_flight: parsed("NEEDS_RETITLE_MAX_IN_FLIGHT")
                .filter(|&n| n > 0)
                .map(|n| n as usize)
                .unwrap_or(defaults.max_in_flight),
            shutdown_grace: parsed("NEEDS_RETITLE_SHUTDOWN_GRACE_SECS")
                .map(|s| Duration::from_secs(s).min(MAX_PERIOD))
                .unwrap_or(defaults.shutdown_grace),
            log_format: match lookup("NEEDS_RETITLE_LOG_FORMAT").as_deref() {
                Some("text") => LogFormat::Text,
                _ => LogFormat::Json,
            },
            throttle: ThrottleConfig {
                per_hour: parsed_u32("NEEDS_RETITLE_THROTTLE_PER_HOUR")
                    .unwrap_or(defaults.throttle.per_hour),
                burst: parsed_u32("NEEDS_RETITLE_THROTTLE_BURST")
                    .filter(|&b| b > 0)
                    .unwrap_or(defaults.throttle.burst),
            },
        }
    }
}
