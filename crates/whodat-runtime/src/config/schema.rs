//! Configuration schema definitions.
//!
//! ```toml
//! [bot]
//! token = "123456:ABC-DEF"
//! api_url_template = "https://api.telegram.org/bot{token}/{method}"
//!
//! [webhook]
//! host = "127.0.0.1"
//! port = 8080
//! secret = "long-random-string"
//! base_url = "https://example.com/"
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use whodat_transport::DEFAULT_API_URL_TEMPLATE;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoDatConfig {
    /// Bot API access.
    #[serde(default)]
    pub bot: BotConfig,

    /// Inbound webhook listener.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Logging setup.
    #[serde(default)]
    pub logging: LoggingConfig,
}

// =============================================================================
// Bot
// =============================================================================

/// Bot API settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot API token.
    #[serde(default)]
    pub token: String,

    /// Endpoint template with `{token}` and `{method}` fields.
    #[serde(default = "default_api_url_template")]
    pub api_url_template: String,

    /// Timeout for Bot API calls in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            api_url_template: default_api_url_template(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("token", &redacted(&self.token))
            .field("api_url_template", &self.api_url_template)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_api_url_template() -> String {
    DEFAULT_API_URL_TEMPLATE.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Webhook
// =============================================================================

/// Webhook listener settings.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default)]
    pub port: u16,

    /// Secret path segment; surrounding `/` are ignored.
    #[serde(default)]
    pub secret: String,

    /// Public base URL. When set, `base_url` joined with the secret is
    /// registered as the webhook at startup.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Seconds to wait for in-flight requests on shutdown.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: 0,
            secret: String::new(),
            base_url: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("secret", &redacted(&self.secret))
            .field("base_url", &self.base_url)
            .field("shutdown_grace_secs", &self.shutdown_grace_secs)
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "<redacted>" }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Global log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file path, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Log span open and close, e.g. around every handled update.
    #[serde(default)]
    pub span_events: bool,

    /// Per-target levels, e.g. `whodat_transport = "trace"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::default(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            thread_ids: false,
            file_location: false,
            span_events: false,
            filters: BTreeMap::new(),
        }
    }
}

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Returns the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// Converts to a `tracing` level.
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Needs the `json-log` feature; falls back to `compact` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WhoDatConfig::default();
        assert_eq!(config.bot.api_url_template, DEFAULT_API_URL_TEMPLATE);
        assert_eq!(config.webhook.host, "127.0.0.1");
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let mut config = WhoDatConfig::default();
        config.bot.token = "123:abc".into();
        config.webhook.secret = "s3cret".into();

        let debug = format!("{config:?}");
        assert!(!debug.contains("123:abc"));
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("<redacted>"));
    }
}
