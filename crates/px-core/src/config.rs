//! Configuration for the gateway SDK.
//!
//! Everything has a production default, so an empty JSON object is a valid
//! config. Credentials may be left out of the file and supplied through the
//! `PROJECTX_USERNAME` / `PROJECTX_API_KEY` environment variables instead.
//!
//! # Example config
//!
//! ```json
//! {
//!   "api_base_url": "https://api.topstepx.com",
//!   "realtime": { "base_reconnect_delay_ms": 1000, "max_reconnect_delay_ms": 30000 },
//!   "logging": { "level": "debug", "log_dir": "/var/log/projectx" },
//!   "credentials": { "user_name": "trader", "api_key": "..." }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

use crate::channel::ReconnectPolicy;

pub const USERNAME_ENV: &str = "PROJECTX_USERNAME";
pub const API_KEY_ENV: &str = "PROJECTX_API_KEY";

/// Top-level SDK config, deserialized from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// REST API base URL.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Market-data hub URL (without the token).
    #[serde(default = "default_market_hub_url")]
    pub market_hub_url: String,

    /// User-data hub URL (without the token).
    #[serde(default = "default_user_hub_url")]
    pub user_hub_url: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout for REST calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub realtime: RealtimeConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub credentials: Option<Credentials>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            market_hub_url: default_market_hub_url(),
            user_hub_url: default_user_hub_url(),
            user_agent: default_user_agent(),
            request_timeout_secs: default_request_timeout_secs(),
            realtime: RealtimeConfig::default(),
            logging: LoggingConfig::default(),
            credentials: None,
        }
    }
}

/// The three service URLs, parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub api_base: Url,
    pub market_hub: Url,
    pub user_hub: Url,
}

impl ClientConfig {
    /// Parse and check the configured URLs.
    pub fn endpoints(&self) -> anyhow::Result<Endpoints> {
        Ok(Endpoints {
            api_base: parse_url("api_base_url", &self.api_base_url)?,
            market_hub: parse_url("market_hub_url", &self.market_hub_url)?,
            user_hub: parse_url("user_hub_url", &self.user_hub_url)?,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Credentials from the file, falling back to the environment.
    pub fn resolve_credentials(&self) -> Option<Credentials> {
        self.credentials.clone().or_else(Credentials::from_env)
    }
}

/// Reconnect and health-check tuning of the realtime channels.
#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_base_reconnect_delay_ms")]
    pub base_reconnect_delay_ms: u64,

    /// Upper bound of the exponential backoff.
    #[serde(default = "default_max_reconnect_delay_ms")]
    pub max_reconnect_delay_ms: u64,

    #[serde(default = "default_health_check_interval_secs")]
    pub health_check_interval_secs: u64,

    #[serde(default = "default_health_check_timeout_secs")]
    pub health_check_timeout_secs: u64,

    /// Timeout of the ping that validates a freshly reconnected session.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            base_reconnect_delay_ms: default_base_reconnect_delay_ms(),
            max_reconnect_delay_ms: default_max_reconnect_delay_ms(),
            health_check_interval_secs: default_health_check_interval_secs(),
            health_check_timeout_secs: default_health_check_timeout_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
        }
    }
}

impl RealtimeConfig {
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            base_delay: Duration::from_millis(self.base_reconnect_delay_ms),
            max_delay: Duration::from_millis(self.max_reconnect_delay_ms),
            health_interval: Duration::from_secs(self.health_check_interval_secs),
            health_timeout: Duration::from_secs(self.health_check_timeout_secs),
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
        }
    }
}

/// Logging section, consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotating log files. Console only when absent.
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), log_dir: None, file_prefix: default_file_prefix() }
    }
}

/// API-key login credentials.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub user_name: String,
    pub api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").field("user_name", &self.user_name).field("api_key", &"***").finish()
    }
}

impl Credentials {
    /// Read `PROJECTX_USERNAME` and `PROJECTX_API_KEY`. Both must be set and
    /// non-empty.
    pub fn from_env() -> Option<Self> {
        let user_name = std::env::var(USERNAME_ENV).ok().filter(|v| !v.is_empty())?;
        let api_key = std::env::var(API_KEY_ENV).ok().filter(|v| !v.is_empty())?;
        Some(Self { user_name, api_key })
    }
}

// ---------------------------------------------------------------------------
// Defaults (used by serde)
// ---------------------------------------------------------------------------

fn default_api_base_url() -> String {
    "https://api.topstepx.com".into()
}

fn default_market_hub_url() -> String {
    "https://rtc.topstepx.com/hubs/market".into()
}

fn default_user_hub_url() -> String {
    "https://rtc.topstepx.com/hubs/user".into()
}

fn default_user_agent() -> String {
    concat!("projectx-rs/", env!("CARGO_PKG_VERSION")).into()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_base_reconnect_delay_ms() -> u64 {
    1000
}

fn default_max_reconnect_delay_ms() -> u64 {
    30_000
}

fn default_health_check_interval_secs() -> u64 {
    5
}

fn default_health_check_timeout_secs() -> u64 {
    10
}

fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".into()
}

fn default_file_prefix() -> String {
    "projectx".into()
}

fn parse_url(field: &str, raw: &str) -> anyhow::Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid {field}: {raw:?}"))?;
    anyhow::ensure!(matches!(url.scheme(), "http" | "https" | "ws" | "wss"), "{field} has unsupported scheme: {raw}");
    Ok(url)
}

/// Parse a JSON config string and validate its URLs.
pub fn parse_config(content: &str) -> anyhow::Result<ClientConfig> {
    let config: ClientConfig = serde_json::from_str(content).context("malformed config")?;
    config.endpoints()?;
    anyhow::ensure!(
        config.realtime.base_reconnect_delay_ms <= config.realtime.max_reconnect_delay_ms,
        "base_reconnect_delay_ms must not exceed max_reconnect_delay_ms"
    );
    anyhow::ensure!(config.realtime.health_check_interval_secs > 0, "health_check_interval_secs must be positive");
    Ok(config)
}

/// Load and parse a JSON config file.
pub fn load_config(path: &Path) -> anyhow::Result<ClientConfig> {
    let content = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let cfg = parse_config("{}").unwrap();
        assert_eq!(cfg.api_base_url, "https://api.topstepx.com");
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.realtime.reconnect_policy(), ReconnectPolicy::default());
        assert_eq!(cfg.logging.level, "info");
        assert!(cfg.credentials.is_none());
        let ep = cfg.endpoints().unwrap();
        assert_eq!(ep.user_hub.path(), "/hubs/user");
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let cfg = parse_config(
            r#"{
                "realtime": { "max_reconnect_delay_ms": 60000 },
                "logging": { "log_dir": "/tmp/px" },
                "credentials": { "user_name": "u", "api_key": "k" }
            }"#,
        )
        .unwrap();
        let policy = cfg.realtime.reconnect_policy();
        assert_eq!(policy.max_delay, Duration::from_secs(60));
        assert_eq!(policy.base_delay, Duration::from_secs(1));
        assert_eq!(cfg.logging.log_dir.as_deref(), Some("/tmp/px"));
        assert_eq!(cfg.logging.file_prefix, "projectx");
        assert_eq!(cfg.resolve_credentials().unwrap().user_name, "u");
    }

    #[test]
    fn bad_urls_are_rejected() {
        assert!(parse_config(r#"{ "market_hub_url": "not a url" }"#).is_err());
        assert!(parse_config(r#"{ "api_base_url": "ftp://api.example.com" }"#).is_err());
    }

    #[test]
    fn inverted_backoff_bounds_are_rejected() {
        let err = parse_config(r#"{ "realtime": { "base_reconnect_delay_ms": 50000 } }"#).unwrap_err();
        assert!(err.to_string().contains("base_reconnect_delay_ms"));
    }

    #[test]
    fn zero_health_interval_is_rejected() {
        let err = parse_config(r#"{ "realtime": { "health_check_interval_secs": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("health_check_interval_secs"));
    }

    #[test]
    fn api_key_is_not_printed() {
        let creds = Credentials { user_name: "u".into(), api_key: "secret".into() };
        assert!(!format!("{creds:?}").contains("secret"));
    }
}
