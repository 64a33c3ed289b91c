//! Configuration validation utilities.

use url::Url;
use whodat_transport::{UrlTemplate, normalize_secret};

use super::error::{ConfigError, ConfigResult};
use super::schema::{BotConfig, LogOutput, LoggingConfig, WebhookConfig, WhoDatConfig};

/// Validates the entire configuration.
pub fn validate_config(config: &WhoDatConfig) -> ConfigResult<()> {
    validate_bot_config(&config.bot)?;
    validate_webhook_config(&config.webhook)?;
    validate_logging_config(&config.logging)?;
    Ok(())
}

/// Validates Bot API settings.
fn validate_bot_config(bot: &BotConfig) -> ConfigResult<()> {
    if bot.token.trim().is_empty() {
        return Err(ConfigError::missing_field("bot.token"));
    }

    UrlTemplate::parse(&bot.api_url_template).map_err(|err| {
        ConfigError::validation(format!("bot.api_url_template: {err}"))
    })?;

    if bot.timeout_secs == 0 {
        return Err(ConfigError::validation("Timeout must be greater than 0"));
    }

    Ok(())
}

/// Validates webhook listener settings.
fn validate_webhook_config(webhook: &WebhookConfig) -> ConfigResult<()> {
    if webhook.host.is_empty() {
        return Err(ConfigError::missing_field("webhook.host"));
    }

    validate_port(webhook.port)?;

    if normalize_secret(&webhook.secret).is_empty() {
        return Err(ConfigError::missing_field("webhook.secret"));
    }

    if let Some(base_url) = &webhook.base_url {
        validate_url(base_url)?;
    }

    Ok(())
}

/// Validates logging settings.
fn validate_logging_config(logging: &LoggingConfig) -> ConfigResult<()> {
    if logging.output == LogOutput::File && logging.file_path.is_none() {
        return Err(ConfigError::missing_field("logging.file_path"));
    }
    Ok(())
}

/// Validates a public base URL.
fn validate_url(url: &str) -> ConfigResult<()> {
    let parsed = Url::parse(url).map_err(|err| ConfigError::invalid_url(url, err.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::invalid_url(
            url,
            "URL must start with one of: [\"http://\", \"https://\"]",
        ));
    }
    if parsed.cannot_be_a_base() {
        return Err(ConfigError::invalid_url(url, "URL cannot be used as a base"));
    }

    Ok(())
}

/// Validates a port number.
fn validate_port(port: u16) -> ConfigResult<()> {
    if port == 0 {
        return Err(ConfigError::InvalidPort(port));
    }
    Ok(())
}
