//! # WhoDat
//!
//! A Telegram bot that answers "who is that?": for every message it receives
//! through its webhook it lists the distinct human users the message mentions
//! (sender, forwarded-from, reply targets, joined and left members).
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────┐     ┌─────────────┐     ┌────────────────────┐     ┌────────────────┐
//! │ WebhookServer │────▶│ UpdateQueue │────▶│ UpdateDispatcher   │────▶│ MessageHandler │──▶ UserSink
//! │ POST /<secret>│     │ (unbounded) │     │ (one at a time)    │     │ extract_users  │
//! └───────────────┘     └─────────────┘     └────────────────────┘     └────────────────┘
//! ```
//!
//! - **Transport**: the webhook server authenticates by path and enqueues
//!   decoded updates; the Bot API client performs `getMe` / `setWebhook`
//! - **Core**: the dispatcher routes each update by its type tag through the
//!   [`UpdateTypeRegistry`](whodat_core::UpdateTypeRegistry)
//! - **Runtime**: configuration, logging and the startup/shutdown sequence
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use whodat::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = WhoDatRuntime::builder()
//!         .set("bot.token", "123:abc")
//!         .set("webhook.port", 8080)
//!         .set("webhook.secret", "s3cret")
//!         .build()?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `json-log`: JSON log output

pub use whodat_core as core;
pub use whodat_runtime as runtime;
pub use whodat_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use whodat::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use whodat_runtime::{ConfigLoader, RuntimeBuilder, WhoDatConfig, WhoDatRuntime};

    // Handlers - for routing custom update types
    pub use whodat_core::{
        HandlerResult, MessageHandler, UpdateHandler, UpdateTypeRegistry, UserSink, async_trait,
    };

    // Model
    pub use whodat_core::{User, UserId, extract_users};
}
