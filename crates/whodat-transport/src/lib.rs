//! # WhoDat Transport
//!
//! Network edges of the whodat bot.
//!
//! ```text
//!  platform ──POST /<secret>──► WebhookServer ──► UpdateQueue (whodat-core)
//!  platform ◄──getMe / setWebhook── BotApiClient
//! ```
//!
//! | Type | Direction | Built on |
//! |------|-----------|----------|
//! | [`WebhookServer`] | inbound | axum |
//! | [`BotApiClient`] | outbound | reqwest |
//! | [`UrlTemplate`] | outbound endpoint | - |

pub mod client;
pub mod error;
pub mod template;
pub mod webhook;

pub use client::{BotApiClient, DEFAULT_TIMEOUT};
pub use error::{ApiError, ApiResult, TemplateError, TemplateResult, WebhookRejection};
pub use template::{API_URL_FIELDS, DEFAULT_API_URL_TEMPLATE, Template, TemplateFields, UrlTemplate};
pub use webhook::{DEFAULT_BODY_LIMIT, WebhookServer, normalize_secret};

// Re-exported so callers can drive `WebhookServer::serve`.
pub use tokio_util::sync::CancellationToken;
