//! WhoDat Runtime - configuration, logging and lifecycle for the whodat bot.
//!
//! This crate provides:
//! - Layered configuration (`whodat.toml`, `WHODAT_*` environment variables,
//!   programmatic overrides) with validation
//! - Logging setup on top of `tracing-subscriber`
//! - [`WhoDatRuntime`], which performs the startup Bot API calls, serves the
//!   webhook and drains the dispatcher on shutdown
//!
//! ```ignore
//! use whodat_runtime::WhoDatRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = WhoDatRuntime::builder()
//!         .set("bot.token", "123:abc")
//!         .set("webhook.port", 8080)
//!         .set("webhook.secret", "s3cret")
//!         .build()?;
//!
//!     // Run until Ctrl+C or SIGTERM
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Configuration Sources
//!
//! Later sources win:
//!
//! 1. Built-in defaults
//! 2. The first `whodat.toml` / `config.toml` found in the search paths, or an
//!    explicit file
//! 3. `WHODAT_*` environment variables, `__` separating nested keys
//!    (`WHODAT_WEBHOOK__PORT=8080`)
//! 4. Overrides set through [`ConfigLoader::set`] or [`RuntimeBuilder::set`]

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use config::{
    BotConfig, ConfigError, ConfigLoader, ConfigResult, LogFormat, LogLevel, LogOutput,
    LoggingConfig, WebhookConfig, WhoDatConfig, validate_config,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use runtime::{RuntimeBuilder, WhoDatRuntime, wait_for_shutdown};
