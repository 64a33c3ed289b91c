//! # WhoDat Core
//!
//! The update pipeline of the whodat bot, without any networking.
//!
//! - **Model**: [`Update`], [`User`], [`UserId`]
//! - **Extraction**: [`extract_users`] walks an update body and returns the
//!   distinct human users in it
//! - **Handlers**: the [`UpdateHandler`] trait and the built-in
//!   [`MessageHandler`]
//! - **Routing**: [`UpdateTypeRegistry`] maps type tags to handlers
//! - **Dispatch**: [`UpdateDispatcher`] consumes the [`UpdateQueue`] one
//!   update at a time
//!
//! ```text
//! UpdateQueue ──► UpdateDispatcher ──► UpdateTypeRegistry ──► MessageHandler
//!                                                                  │
//!                                                   extract_users ◄┘──► UserSink
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use whodat_core::{UpdateDispatcher, UpdateTypeRegistry};
//!
//! let dispatcher = Arc::new(UpdateDispatcher::new(UpdateTypeRegistry::with_defaults()));
//! let queue = dispatcher.queue();
//!
//! tokio::spawn({
//!     let dispatcher = dispatcher.clone();
//!     async move { dispatcher.run().await }
//! });
//!
//! queue.push(serde_json::json!({"update_id": 1, "message": {}}));
//! queue.shutdown();
//! ```

pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod handler;
pub mod registry;
pub mod update;

pub use dispatcher::{DispatcherStats, QueueItem, UpdateDispatcher, UpdateQueue};
pub use error::{
    BoxError, HandlerResult, RegistryError, RegistryResult, UpdateError, UpdateResult,
};
pub use extractor::{extract_users, extract_users_from_value};
pub use handler::{BoxedHandler, LogSink, MemorySink, MessageHandler, UpdateHandler, UserSink};
pub use registry::UpdateTypeRegistry;
pub use update::{UPDATE_ID_KEY, Update, User, UserId};

// Re-exported for handler implementations.
pub use async_trait::async_trait;
