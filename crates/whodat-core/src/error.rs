//! Error types for the update pipeline.
//!
//! Errors raised while processing an update that was already accepted over
//! the webhook never leave the dispatcher; they are only logged. Registry
//! errors are configuration errors and surface at startup.

use thiserror::Error;

/// Boxed error returned by update handlers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Update Errors
// =============================================================================

/// Errors that can occur while routing or handling a single update.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// The update is not a JSON object.
    #[error("invalid update: not an object")]
    NotAnObject,

    /// The update has no `update_id` key.
    #[error("update_id not found: {keys:?}")]
    MissingUpdateId {
        /// Keys present on the update.
        keys: Vec<String>,
    },

    /// The update does not carry exactly one type tag next to `update_id`.
    #[error("invalid update: {keys:?}")]
    InvalidShape {
        /// Keys present on the update besides `update_id`.
        keys: Vec<String>,
    },

    /// No handler is registered for the update's type tag.
    #[error("unsupported update type: {update_type}")]
    UnsupportedType {
        /// The unregistered type tag.
        update_type: String,
    },

    /// The handler returned an error.
    #[error("handler for '{update_type}' failed: {source}")]
    Handler {
        /// Type tag of the failing handler.
        update_type: String,
        /// Error reported by the handler.
        #[source]
        source: BoxError,
    },

    /// The handler panicked.
    #[error("handler for '{update_type}' panicked")]
    HandlerPanicked {
        /// Type tag of the failing handler.
        update_type: String,
    },

    /// The handler task was cancelled before it finished.
    #[error("handler for '{update_type}' was cancelled")]
    HandlerCancelled {
        /// Type tag of the cancelled handler.
        update_type: String,
    },
}

impl UpdateError {
    /// Returns `true` if the update itself was malformed.
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            Self::NotAnObject | Self::MissingUpdateId { .. } | Self::InvalidShape { .. }
        )
    }

    /// Returns `true` if the failure happened inside a handler.
    pub fn is_handler_error(&self) -> bool {
        matches!(
            self,
            Self::Handler { .. } | Self::HandlerPanicked { .. } | Self::HandlerCancelled { .. }
        )
    }
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Errors raised while building the update type registry.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A handler is already registered for this type tag.
    #[error("already registered: {update_type}")]
    Conflict {
        /// The duplicated type tag.
        update_type: String,
    },

    /// The type tag is empty or equals the reserved `update_id` key.
    #[error("invalid update type tag: '{update_type}'")]
    InvalidTag {
        /// The rejected type tag.
        update_type: String,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for update processing.
pub type UpdateResult<T> = Result<T, UpdateError>;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

/// Result type returned by [`UpdateHandler`](crate::handler::UpdateHandler) implementations.
pub type HandlerResult = Result<(), BoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_classification() {
        assert!(UpdateError::NotAnObject.is_shape_error());
        assert!(UpdateError::MissingUpdateId { keys: vec![] }.is_shape_error());
        assert!(
            !UpdateError::UnsupportedType {
                update_type: "poll".into()
            }
            .is_shape_error()
        );
        assert!(
            UpdateError::HandlerPanicked {
                update_type: "message".into()
            }
            .is_handler_error()
        );
    }

    #[test]
    fn test_messages() {
        let err = UpdateError::MissingUpdateId {
            keys: vec!["message".into()],
        };
        assert_eq!(err.to_string(), "update_id not found: [\"message\"]");

        let err = RegistryError::Conflict {
            update_type: "message".into(),
        };
        assert_eq!(err.to_string(), "already registered: message");
    }
}
