//! Configuration module for the whodat runtime.
//!
//! This module provides TOML/environment-based configuration loading and
//! validation for the bot token, the webhook listener and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{CONFIG_FILE_NAMES, ConfigLoader, ENV_PREFIX};
pub use schema::{
    BotConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, WebhookConfig, WhoDatConfig,
};
pub use validation::validate_config;
