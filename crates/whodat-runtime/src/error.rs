//! Runtime error types.

use thiserror::Error;
use whodat_core::RegistryError;
use whodat_transport::ApiError;

use crate::config::ConfigError;

/// Errors that abort startup or end the serving loop.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A startup call to the Bot API failed.
    #[error("Bot API error: {0}")]
    Api(#[from] ApiError),

    /// Handler registration failed.
    #[error("Handler registration failed: {0}")]
    Registry(#[from] RegistryError),

    /// The webhook URL could not be built from the base URL.
    #[error("Invalid webhook URL '{base_url}': {reason}")]
    WebhookUrl { base_url: String, reason: String },

    /// The listener could not be bound.
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The webhook server failed while serving.
    #[error("Webhook server error: {0}")]
    Server(#[source] std::io::Error),

    /// A background task panicked.
    #[error("{task} task panicked")]
    TaskPanicked { task: &'static str },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
