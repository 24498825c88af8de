use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CHANNEL: &str = "kaicenat";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_JOURNAL_CAPACITY: usize = 200;
pub const DEFAULT_SINK_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const PLACEHOLDER_CLIENT_ID: &str = "YOUR_CLIENT_ID_HERE";
pub const PLACEHOLDER_CLIENT_SECRET: &str = "YOUR_CLIENT_SECRET_HERE";

/// Root configuration structure. Deserialized from `<data dir>/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Twitch login names to watch, polled in this order.
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    /// Seconds to sleep between full polling rounds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Maximum number of events kept in each channel's history file.
    #[serde(default = "default_journal_capacity")]
    pub journal_capacity: usize,
    /// `tracing` filter directive used when no env override is set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub sinks: SinksConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            journal_capacity: DEFAULT_JOURNAL_CAPACITY,
            log_level: default_log_level(),
            sinks: SinksConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

/// Which notification sinks receive went-live / went-offline events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinksConfig {
    #[serde(default = "default_true")]
    pub desktop: bool,
    /// Upper bound on each sink's delivery of one event, in seconds.
    /// Applies to every sink independently of the webhook request timeout.
    #[serde(default = "default_sink_timeout")]
    pub sink_timeout_secs: u64,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

impl Default for SinksConfig {
    fn default() -> Self {
        Self {
            desktop: true,
            sink_timeout_secs: DEFAULT_SINK_TIMEOUT_SECS,
            webhook: WebhookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Discord-compatible webhook URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// HTTP request timeout for the webhook POST, in seconds.
    #[serde(default = "default_webhook_timeout")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            url: None,
            timeout_secs: DEFAULT_WEBHOOK_TIMEOUT_SECS,
        }
    }
}

impl WebhookConfig {
    /// The URL to post to, if the sink is enabled and has a non-blank URL.
    pub fn active_url(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

/// Twitch application credentials for the client-credentials grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            client_id: PLACEHOLDER_CLIENT_ID.to_string(),
            client_secret: PLACEHOLDER_CLIENT_SECRET.to_string(),
        }
    }
}

impl Config {
    /// Normalizes user input: interval, capacity and timeouts are at least 1,
    /// channel ids are trimmed with blanks and duplicates removed (first one
    /// wins), and an enabled webhook without a URL is turned off.
    pub fn validate(mut self) -> Self {
        self.poll_interval_secs = self.poll_interval_secs.max(1);
        self.journal_capacity = self.journal_capacity.max(1);
        self.sinks.sink_timeout_secs = self.sinks.sink_timeout_secs.max(1);
        self.sinks.webhook.timeout_secs = self.sinks.webhook.timeout_secs.max(1);

        let mut seen = std::collections::HashSet::new();
        self.channels = self
            .channels
            .into_iter()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty() && seen.insert(c.clone()))
            .collect();

        if self.sinks.webhook.enabled && self.sinks.webhook.active_url().is_none() {
            tracing::warn!("webhook sink enabled without a URL; disabling it");
            self.sinks.webhook.enabled = false;
        }
        self
    }
}

/// Loads the config file at `path`. A missing file is created with the
/// default values, which are then returned.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_create(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        write_default(path, &config)?;
        return Ok(config);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

fn write_default(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize default config")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write default config: {}", path.display()))
}

fn default_channels() -> Vec<String> {
    vec![DEFAULT_CHANNEL.to_string()]
}

fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_journal_capacity() -> usize {
    DEFAULT_JOURNAL_CAPACITY
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_sink_timeout() -> u64 {
    DEFAULT_SINK_TIMEOUT_SECS
}

fn default_webhook_timeout() -> u64 {
    DEFAULT_WEBHOOK_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn config_default_values() {
        let c = Config::default();
        assert_eq!(c.channels, vec![DEFAULT_CHANNEL.to_string()]);
        assert_eq!(c.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);
        assert_eq!(c.journal_capacity, DEFAULT_JOURNAL_CAPACITY);
        assert!(c.sinks.desktop);
        assert!(!c.sinks.webhook.enabled);
        assert_eq!(c.credentials.client_id, PLACEHOLDER_CLIENT_ID);
    }

    // ── validate ──────────────────────────────────────────────────────────────

    #[test]
    fn validate_clamps_zero_interval_and_capacity() {
        let c = Config {
            poll_interval_secs: 0,
            journal_capacity: 0,
            ..Config::default()
        }
        .validate();
        assert_eq!(c.poll_interval_secs, 1);
        assert_eq!(c.journal_capacity, 1);
    }

    #[test]
    fn validate_clamps_zero_timeouts() {
        let mut c = Config::default();
        c.sinks.sink_timeout_secs = 0;
        c.sinks.webhook.timeout_secs = 0;
        let c = c.validate();
        assert_eq!(c.sinks.sink_timeout_secs, 1);
        assert_eq!(c.sinks.webhook.timeout_secs, 1);
    }

    #[test]
    fn validate_dedups_channels_preserving_order() {
        let c = Config {
            channels: vec![
                "b".into(),
                " A ".into(),
                "".into(),
                "b".into(),
                "c".into(),
            ],
            ..Config::default()
        }
        .validate();
        assert_eq!(c.channels, vec!["b", "a", "c"]);
    }

    #[test]
    fn validate_disables_webhook_without_url() {
        let mut c = Config::default();
        c.sinks.webhook.enabled = true;
        c.sinks.webhook.url = Some("   ".into());
        let c = c.validate();
        assert!(!c.sinks.webhook.enabled);
    }

    #[test]
    fn active_url_requires_enabled() {
        let w = WebhookConfig {
            enabled: false,
            url: Some("https://example.invalid/hook".into()),
            timeout_secs: 5,
        };
        assert!(w.active_url().is_none());
        let w = WebhookConfig { enabled: true, ..w };
        assert_eq!(w.active_url(), Some("https://example.invalid/hook"));
    }

    // ── load_or_create ────────────────────────────────────────────────────────

    #[test]
    fn load_or_create_missing_file_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.poll_interval_secs, DEFAULT_POLL_INTERVAL_SECS);

        let reloaded = load_or_create(&path).unwrap();
        assert_eq!(reloaded.channels, config.channels);
        assert_eq!(reloaded.credentials.client_secret, PLACEHOLDER_CLIENT_SECRET);
    }

    #[test]
    fn load_or_create_parses_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
channels = ["kaicenat", "xqc"]
poll_interval_secs = 30
journal_capacity = 50

[sinks]
desktop = false

[sinks.webhook]
enabled = true
url = "https://discord.com/api/webhooks/1/abc"

[credentials]
client_id = "id"
client_secret = "secret"
"#,
        )
        .unwrap();

        let config = load_or_create(&path).unwrap();
        assert_eq!(config.channels, vec!["kaicenat", "xqc"]);
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.journal_capacity, 50);
        assert!(!config.sinks.desktop);
        assert_eq!(
            config.sinks.webhook.active_url(),
            Some("https://discord.com/api/webhooks/1/abc")
        );
        assert_eq!(config.sinks.webhook.timeout_secs, DEFAULT_WEBHOOK_TIMEOUT_SECS);
        assert_eq!(config.sinks.sink_timeout_secs, DEFAULT_SINK_TIMEOUT_SECS);
        assert_eq!(config.credentials.client_id, "id");
    }

    #[test]
    fn load_or_create_partial_toml_uses_field_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "poll_interval_secs = 90\n").unwrap();

        let config = load_or_create(&path).unwrap();
        assert_eq!(config.poll_interval_secs, 90);
        assert_eq!(config.channels, vec![DEFAULT_CHANNEL.to_string()]);
        assert!(config.sinks.desktop);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
    }

    #[test]
    fn load_or_create_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is not valid toml ][[[").unwrap();
        assert!(load_or_create(&path).is_err());
    }
}
