//! Server configuration loading from file and environment variables.

use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Alert suppression and auto-close settings.
    #[serde(default)]
    pub alerting: AlertingConfig,

    /// Earthquake report feed polling.
    #[serde(default)]
    pub feed: FeedConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// How long a writer waits for the lock before failing, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,

    /// How long a caller waits for a free pooled connection, in milliseconds.
    #[serde(default = "default_checkout_timeout_ms")]
    pub checkout_timeout_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "quake_alert=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Alerting configuration.
///
/// The suppression window and the sweep timeout are independent: one decides
/// whether a new alert fires, the other how long an open event may wait at
/// any stage before it is closed as unprocessed.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertingConfig {
    /// Suppression window used when the settings table has no value.
    #[serde(default = "default_suppress_minutes")]
    pub default_suppress_minutes: u32,

    /// Minutes an open event may wait at any stage before the sweeper
    /// closes it.
    #[serde(default = "default_sweep_timeout_minutes")]
    pub sweep_timeout_minutes: u32,

    /// Seconds between sweeper runs. `0` disables the sweeper.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

/// Report feed configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_feed_url")]
    pub url: String,

    /// Dataset authorization key.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u64,

    /// Maximum number of reports requested per poll.
    #[serde(default = "default_feed_limit")]
    pub limit: u32,
}

impl FeedConfig {
    pub fn client_settings(&self) -> quake_feed::FeedSettings {
        quake_feed::FeedSettings {
            url: self.url.clone(),
            api_key: self.api_key.clone(),
            limit: self.limit,
            request_timeout: Duration::from_secs(self.request_timeout_seconds),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3000
}

fn default_db_path() -> String {
    "quake.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_pool_max_size() -> u32 {
    8
}

fn default_checkout_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_suppress_minutes() -> u32 {
    quake_types::DEFAULT_SUPPRESS_MINUTES
}

fn default_sweep_timeout_minutes() -> u32 {
    60
}

fn default_sweep_interval_seconds() -> u64 {
    60
}

fn default_feed_url() -> String {
    "https://opendata.cwa.gov.tw/api/v1/rest/datastore/E-A0015-001".to_string()
}

fn default_poll_interval_seconds() -> u64 {
    60
}

fn default_request_timeout_seconds() -> u64 {
    10
}

fn default_feed_limit() -> u32 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
            checkout_timeout_ms: default_checkout_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            default_suppress_minutes: default_suppress_minutes(),
            sweep_timeout_minutes: default_sweep_timeout_minutes(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: default_feed_url(),
            api_key: String::new(),
            poll_interval_seconds: default_poll_interval_seconds(),
            request_timeout_seconds: default_request_timeout_seconds(),
            limit: default_feed_limit(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `QUAKE_HOST` overrides `server.host`
/// - `QUAKE_PORT` overrides `server.port`
/// - `QUAKE_DB_PATH` overrides `database.path`
/// - `QUAKE_LOG_LEVEL` overrides `logging.level`
/// - `QUAKE_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `QUAKE_SWEEP_TIMEOUT_MINUTES` overrides `alerting.sweep_timeout_minutes`
/// - `QUAKE_FEED_API_KEY` overrides `feed.api_key`
/// - `QUAKE_FEED_ENABLED` overrides `feed.enabled`
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}

/// Applies overrides from `lookup`, which maps variable names to values.
fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("QUAKE_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("QUAKE_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = lookup("QUAKE_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("QUAKE_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("QUAKE_LOG_JSON") {
        config.logging.json = is_truthy(&json);
    }
    if let Some(timeout) = lookup("QUAKE_SWEEP_TIMEOUT_MINUTES") {
        if let Ok(parsed) = timeout.parse() {
            config.alerting.sweep_timeout_minutes = parsed;
        }
    }
    if let Some(key) = lookup("QUAKE_FEED_API_KEY") {
        config.feed.api_key = key;
    }
    if let Some(enabled) = lookup("QUAKE_FEED_ENABLED") {
        config.feed.enabled = is_truthy(&enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.path, "quake.db");
        assert_eq!(config.database.busy_timeout_ms, 5_000);
        assert_eq!(config.alerting.default_suppress_minutes, 30);
        assert_eq!(config.alerting.sweep_timeout_minutes, 60);
        assert!(!config.feed.enabled);
        assert_eq!(config.feed.limit, 100);
    }

    #[test]
    fn sections_are_parsed() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "0.0.0.0"
            port = 8080

            [alerting]
            default_suppress_minutes = 15
            sweep_timeout_minutes = 1

            [feed]
            enabled = true
            api_key = "CWA-KEY"
            poll_interval_seconds = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.alerting.default_suppress_minutes, 15);
        assert_eq!(config.alerting.sweep_timeout_minutes, 1);
        assert_eq!(config.alerting.sweep_interval_seconds, 60);
        assert!(config.feed.enabled);
        assert_eq!(config.feed.client_settings().api_key, "CWA-KEY");
        assert_eq!(
            config.feed.client_settings().request_timeout,
            Duration::from_secs(10)
        );
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("QUAKE_PORT", "9000"),
            ("QUAKE_HOST", "not-an-ip"),
            ("QUAKE_LOG_JSON", "1"),
            ("QUAKE_SWEEP_TIMEOUT_MINUTES", "5"),
            ("QUAKE_FEED_ENABLED", "true"),
            ("QUAKE_FEED_API_KEY", "from-env"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, default_host(), "unparsable host is ignored");
        assert!(config.logging.json);
        assert_eq!(config.alerting.sweep_timeout_minutes, 5);
        assert!(config.feed.enabled);
        assert_eq!(config.feed.api_key, "from-env");
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.database.pool_max_size, 8);
        assert_eq!(config.database.checkout_timeout_ms, 5_000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "[server\nport = ").unwrap();
        let err = load_config(file.path().to_str()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
