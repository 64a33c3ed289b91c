//! Error types for the webhook server and the Bot API client.

use thiserror::Error;

// =============================================================================
// Webhook Errors
// =============================================================================

/// Why an inbound webhook request was turned away.
///
/// Only used for logging. Every rejection is answered with the same bare
/// `403 Forbidden`, so a caller cannot tell a wrong secret from a bad body.
#[derive(Debug, Error)]
pub enum WebhookRejection {
    /// Wrong method or a path other than the secret.
    #[error("forbidden: {method} {path}")]
    Forbidden {
        /// Request method.
        method: String,
        /// Request path.
        path: String,
    },

    /// The body could not be read or is not valid JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
}

// =============================================================================
// Template Errors
// =============================================================================

/// Errors raised while validating a URL template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// A field carries a format spec, e.g. `{token:s}`.
    #[error("format_spec is forbidden: {0}")]
    FormatSpec(String),

    /// A field carries a conversion, e.g. `{token!r}`.
    #[error("conversion is forbidden: {0}")]
    Conversion(String),

    /// A field that is neither required nor optional.
    #[error("unexpected field: {0}")]
    UnexpectedField(String),

    /// Required fields absent from the template, sorted.
    #[error("missing field(s): {}", .0.join(", "))]
    MissingFields(Vec<String>),

    /// A lone `{` or `}`.
    #[error("unbalanced brace at offset {0}")]
    Unbalanced(usize),
}

// =============================================================================
// API Errors
// =============================================================================

/// Errors returned by the Bot API client.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be sent or the response body not read.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status without a decodable API envelope.
    #[error("unexpected HTTP status {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The platform answered with `ok: false`.
    #[error("[{error_code}] {description}")]
    Api {
        /// Error code reported by the platform.
        error_code: i64,
        /// Human-readable description reported by the platform.
        description: String,
    },

    /// The response is not the expected JSON.
    #[error("invalid API response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A field expected in the result is absent.
    #[error("missing field in API response: {0}")]
    MissingField(&'static str),

    /// The URL template is invalid.
    #[error("invalid API URL template: {0}")]
    Template(#[from] TemplateError),
}

impl ApiError {
    /// Returns the platform error code, if the platform reported one.
    pub fn error_code(&self) -> Option<i64> {
        match self {
            Self::Api { error_code, .. } => Some(*error_code),
            _ => None,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for Bot API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for template parsing.
pub type TemplateResult<T> = Result<T, TemplateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_messages() {
        assert_eq!(
            TemplateError::MissingFields(vec!["bar".into(), "foo".into()]).to_string(),
            "missing field(s): bar, foo"
        );
        assert_eq!(
            TemplateError::FormatSpec("bar".into()).to_string(),
            "format_spec is forbidden: bar"
        );
    }

    #[test]
    fn test_api_error_code() {
        let err = ApiError::Api {
            error_code: 401,
            description: "Unauthorized".into(),
        };
        assert_eq!(err.error_code(), Some(401));
        assert_eq!(err.to_string(), "[401] Unauthorized");
        assert_eq!(ApiError::MissingField("username").error_code(), None);
    }
}
