//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use channels::{Beds24Config, ChannexConfig};
use engine::DispatcherConfig;

const DEFAULT_BEDS24_BASE_URL: &str = "https://api.beds24.com";
const DEFAULT_CHANNEX_BASE_URL: &str = "https://app.channex.io";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Per-client request budget for the guest-facing endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(600),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `json` for JSON logs, anything else for text
/// - `DATABASE_URL`: PostgreSQL URL; without it an in-memory store is used
/// - `ROOM_MAPPINGS_PATH`: JSON file with room/channel mappings
/// - `BEDS24_BASE_URL`, `BEDS24_API_KEY`, `BEDS24_PROP_KEY`
/// - `CHANNEX_BASE_URL`, `CHANNEX_API_KEY`, `CHANNEX_PROPERTY_ID`
/// - `CHANNEL_TIMEOUT_SECS` (default 10)
/// - `RATE_LIMIT_MAX_REQUESTS` (default 5), `RATE_LIMIT_WINDOW_SECS` (default 600)
/// - `NOTIFY_MAX_ATTEMPTS` (default 3), `NOTIFY_QUEUE_CAPACITY` (default 256)
///
/// A channel whose credentials are incomplete is left unregistered.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub room_mappings_path: Option<PathBuf>,
    pub beds24: Beds24Config,
    pub channex: ChannexConfig,
    pub rate_limit: RateLimitConfig,
    pub notifications: DispatcherConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let env: &dyn Fn(&str) -> Option<String> = &lookup;

        let channel_timeout =
            Duration::from_secs(parsed(env, "CHANNEL_TIMEOUT_SECS").unwrap_or(10));
        let notify = DispatcherConfig::default();

        Self {
            host: var(env, "HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parsed(env, "PORT").unwrap_or(3000),
            log_level: var(env, "RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format: parsed(env, "LOG_FORMAT").unwrap_or_default(),
            database_url: var(env, "DATABASE_URL"),
            room_mappings_path: var(env, "ROOM_MAPPINGS_PATH").map(PathBuf::from),
            beds24: Beds24Config::new(
                var(env, "BEDS24_BASE_URL").unwrap_or_else(|| DEFAULT_BEDS24_BASE_URL.to_string()),
                var(env, "BEDS24_API_KEY").unwrap_or_default(),
                var(env, "BEDS24_PROP_KEY").unwrap_or_default(),
            )
            .with_timeout(channel_timeout),
            channex: ChannexConfig::new(
                var(env, "CHANNEX_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_CHANNEX_BASE_URL.to_string()),
                var(env, "CHANNEX_API_KEY").unwrap_or_default(),
                var(env, "CHANNEX_PROPERTY_ID").unwrap_or_default(),
            )
            .with_timeout(channel_timeout),
            rate_limit: RateLimitConfig {
                max_requests: parsed(env, "RATE_LIMIT_MAX_REQUESTS").unwrap_or(5),
                window: Duration::from_secs(parsed(env, "RATE_LIMIT_WINDOW_SECS").unwrap_or(600)),
            },
            notifications: DispatcherConfig {
                queue_capacity: parsed(env, "NOTIFY_QUEUE_CAPACITY")
                    .unwrap_or(notify.queue_capacity),
                max_attempts: parsed(env, "NOTIFY_MAX_ATTEMPTS").unwrap_or(notify.max_attempts),
                retry_delay: notify.retry_delay,
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// A set, non-blank variable.
fn var(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    env(name).filter(|v| !v.trim().is_empty())
}

/// A variable parsed as `T`; unparsable values count as unset.
fn parsed<T: FromStr>(env: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    var(env, name).and_then(|v| v.trim().parse().ok())
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        })
    }
}
