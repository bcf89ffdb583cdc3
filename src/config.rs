//! Configuration types for pikpak-relay

use crate::error::{Error, Result};
use crate::types::FolderPath;
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};

/// PikPak account and endpoint configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PikPakConfig {
    /// Account username (email or phone)
    #[serde(default)]
    pub username: String,

    /// Account password
    #[serde(default)]
    pub password: String,

    /// Destination folder for offline downloads, e.g. "/Downloads/slack" (default: root)
    #[serde(default)]
    pub offline_path: FolderPath,

    /// Drive API base URL (default: "https://api-drive.mypikpak.com")
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// User/auth API base URL (default: "https://user.mypikpak.com")
    #[serde(default = "default_user_base")]
    pub user_base: String,

    /// Timeout applied to every HTTP request (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for PikPakConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            offline_path: FolderPath::default(),
            api_base: default_api_base(),
            user_base: default_user_base(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Completion tracking configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Delay between two task-list polls (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Total time a job is tracked before giving up (default: 300 seconds)
    ///
    /// Giving up does not cancel the remote job; it keeps running on PikPak.
    #[serde(default = "default_max_wait", with = "duration_serde")]
    pub max_wait: Duration,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_wait: default_max_wait(),
        }
    }
}

/// Slack integration configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Bot token used for chat.postMessage (xoxb-...)
    #[serde(default)]
    pub bot_token: String,

    /// Signing secret used to verify Events API requests
    #[serde(default)]
    pub signing_secret: String,

    /// Web API base URL (default: "https://slack.com/api")
    #[serde(default = "default_slack_api_base")]
    pub api_base: String,

    /// Hosts whose URLs are never submitted (message permalinks etc.)
    #[serde(default = "default_ignored_hosts")]
    pub ignored_hosts: Vec<String>,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            signing_secret: String::new(),
            api_base: default_slack_api_base(),
            ignored_hosts: default_ignored_hosts(),
        }
    }
}

/// Message processing configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Links of one message processed at the same time (default: 1 = sequential)
    ///
    /// Report lines always keep the order the links appeared in the message.
    #[serde(default = "default_link_concurrency")]
    pub link_concurrency: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            link_concurrency: default_link_concurrency(),
        }
    }
}

/// HTTP server configuration for the Slack events endpoint
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 0.0.0.0:3000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for the relay
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// PikPak account and endpoints
    #[serde(default)]
    pub pikpak: PikPakConfig,

    /// Completion tracking timings
    #[serde(default)]
    pub tracking: TrackingConfig,

    /// Slack credentials and link filtering
    #[serde(default)]
    pub slack: SlackConfig,

    /// Message processing
    #[serde(default)]
    pub relay: RelayConfig,

    /// Events endpoint
    #[serde(default)]
    pub server: ServerConfig,

    /// Retry policy for outbound chat replies and startup login
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Build a configuration from environment variables
    ///
    /// Required: `PIKPAK_USERNAME`, `PIKPAK_PASSWORD`, `SLACK_BOT_TOKEN`,
    /// `SLACK_SIGNING_SECRET`. Everything else falls back to defaults.
    /// A `.env` file is not loaded here; call `dotenvy::dotenv()` first.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| Error::config(format!("{key} is not set"), key))
        };
        let secs = |key: &str| -> Result<Option<Duration>> {
            lookup(key)
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .map(Duration::from_secs)
                        .map_err(|_| Error::config(format!("{key} must be whole seconds"), key))
                })
                .transpose()
        };

        let mut config = Config::default();

        config.pikpak.username = required("PIKPAK_USERNAME")?;
        config.pikpak.password = required("PIKPAK_PASSWORD")?;
        if let Some(path) = lookup("PIKPAK_OFFLINE_PATH") {
            config.pikpak.offline_path = FolderPath::parse(&path);
        }
        if let Some(base) = lookup("PIKPAK_API_BASE") {
            config.pikpak.api_base = base;
        }
        if let Some(base) = lookup("PIKPAK_USER_BASE") {
            config.pikpak.user_base = base;
        }
        if let Some(timeout) = secs("PIKPAK_REQUEST_TIMEOUT")? {
            config.pikpak.request_timeout = timeout;
        }
        if let Some(interval) = secs("PIKPAK_POLL_INTERVAL")? {
            config.tracking.poll_interval = interval;
        }
        if let Some(max_wait) = secs("PIKPAK_MAX_WAIT")? {
            config.tracking.max_wait = max_wait;
        }

        config.slack.bot_token = required("SLACK_BOT_TOKEN")?;
        config.slack.signing_secret = required("SLACK_SIGNING_SECRET")?;
        if let Some(base) = lookup("SLACK_API_BASE") {
            config.slack.api_base = base;
        }
        if let Some(hosts) = lookup("SLACK_IGNORED_HOSTS") {
            config.slack.ignored_hosts = hosts
                .split(',')
                .map(|h| h.trim().to_ascii_lowercase())
                .filter(|h| !h.is_empty())
                .collect();
        }

        if let Some(addr) = lookup("RELAY_BIND_ADDRESS") {
            config.server.bind_address = addr.trim().parse().map_err(|_| {
                Error::config(
                    format!("invalid socket address: {addr}"),
                    "RELAY_BIND_ADDRESS",
                )
            })?;
        }
        if let Some(n) = lookup("RELAY_LINK_CONCURRENCY") {
            config.relay.link_concurrency = n.trim().parse().map_err(|_| {
                Error::config("must be a positive integer", "RELAY_LINK_CONCURRENCY")
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.pikpak.username.trim().is_empty() {
            return Err(Error::config("must not be empty", "PIKPAK_USERNAME"));
        }
        if self.pikpak.password.is_empty() {
            return Err(Error::config("must not be empty", "PIKPAK_PASSWORD"));
        }
        if self.slack.bot_token.trim().is_empty() {
            return Err(Error::config("must not be empty", "SLACK_BOT_TOKEN"));
        }
        if self.slack.signing_secret.is_empty() {
            return Err(Error::config("must not be empty", "SLACK_SIGNING_SECRET"));
        }
        if self.tracking.poll_interval.is_zero() {
            return Err(Error::config(
                "poll interval must be greater than zero",
                "PIKPAK_POLL_INTERVAL",
            ));
        }
        if self.tracking.poll_interval > self.tracking.max_wait {
            return Err(Error::config(
                "poll interval must not exceed the maximum wait",
                "PIKPAK_MAX_WAIT",
            ));
        }
        if self.relay.link_concurrency == 0 {
            return Err(Error::config(
                "must be at least 1",
                "RELAY_LINK_CONCURRENCY",
            ));
        }
        Ok(())
    }
}

fn default_api_base() -> String {
    "https://api-drive.mypikpak.com".to_string()
}

fn default_user_base() -> String {
    "https://user.mypikpak.com".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_wait() -> Duration {
    Duration::from_secs(300)
}

fn default_slack_api_base() -> String {
    "https://slack.com/api".to_string()
}

fn default_ignored_hosts() -> Vec<String> {
    vec!["slack.com".to_string()]
}

fn default_link_concurrency() -> usize {
    1
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("PIKPAK_USERNAME", "user@example.com"),
        ("PIKPAK_PASSWORD", "hunter2"),
        ("SLACK_BOT_TOKEN", "xoxb-test"),
        ("SLACK_SIGNING_SECRET", "secret"),
    ];

    #[test]
    fn from_lookup_applies_defaults() {
        let config = Config::from_lookup(env(REQUIRED)).unwrap();

        assert_eq!(config.pikpak.username, "user@example.com");
        assert!(config.pikpak.offline_path.is_root());
        assert_eq!(config.pikpak.api_base, "https://api-drive.mypikpak.com");
        assert_eq!(config.tracking.poll_interval, Duration::from_secs(5));
        assert_eq!(config.tracking.max_wait, Duration::from_secs(300));
        assert_eq!(config.slack.ignored_hosts, vec!["slack.com".to_string()]);
        assert_eq!(config.relay.link_concurrency, 1);
    }

    #[test]
    fn from_lookup_reads_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("PIKPAK_OFFLINE_PATH", "/Downloads//slack/"),
            ("PIKPAK_POLL_INTERVAL", "2"),
            ("PIKPAK_MAX_WAIT", "60"),
            ("SLACK_IGNORED_HOSTS", "slack.com, Example.ORG ,"),
            ("RELAY_BIND_ADDRESS", "127.0.0.1:8080"),
            ("RELAY_LINK_CONCURRENCY", "3"),
        ]);
        let config = Config::from_lookup(env(&pairs)).unwrap();

        assert_eq!(config.pikpak.offline_path.segments(), ["Downloads", "slack"]);
        assert_eq!(config.tracking.poll_interval, Duration::from_secs(2));
        assert_eq!(config.tracking.max_wait, Duration::from_secs(60));
        assert_eq!(config.slack.ignored_hosts, vec!["slack.com", "example.org"]);
        assert_eq!(config.server.bind_address.port(), 8080);
        assert_eq!(config.relay.link_concurrency, 3);
    }

    #[test]
    fn missing_credentials_name_the_key() {
        let err = Config::from_lookup(env(&[("PIKPAK_USERNAME", "u")])).unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("PIKPAK_PASSWORD")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn non_numeric_interval_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("PIKPAK_POLL_INTERVAL", "fast"));
        assert!(Config::from_lookup(env(&pairs)).is_err());
    }

    #[test]
    fn poll_interval_longer_than_max_wait_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([("PIKPAK_POLL_INTERVAL", "30"), ("PIKPAK_MAX_WAIT", "10")]);
        assert!(Config::from_lookup(env(&pairs)).is_err());
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("RELAY_LINK_CONCURRENCY", "0"));
        assert!(Config::from_lookup(env(&pairs)).is_err());
    }

    #[test]
    fn duration_serde_serializes_as_seconds() {
        let json = serde_json::to_value(TrackingConfig::default()).unwrap();
        assert_eq!(json["poll_interval"], 5);
        assert_eq!(json["max_wait"], 300);
    }

    #[test]
    fn config_deserializes_with_missing_sections() {
        let config: Config =
            serde_json::from_str(r#"{"tracking":{"poll_interval":1,"max_wait":10}}"#).unwrap();
        assert_eq!(config.tracking.poll_interval, Duration::from_secs(1));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.server.bind_address.port(), 3000);
    }
}
