//! Update handlers.
//!
//! A handler owns one update type. The dispatcher hands it the update id and
//! the body found under the type tag; the handler decides what to do with it.
//!
//! The built-in [`MessageHandler`] extracts users from message bodies and
//! reports each of them to a [`UserSink`].

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::HandlerResult;
use crate::extractor::extract_users;
use crate::update::User;

/// Processes the body of one update type.
///
/// Handlers run on the dispatcher's single consumer, one update at a time,
/// so an implementation that never returns stalls the whole pipeline.
#[async_trait]
pub trait UpdateHandler: Send + Sync + 'static {
    /// Handles one update body.
    async fn handle(&self, update_id: &Value, body: &Value) -> HandlerResult;
}

/// Shared handler reference.
pub type BoxedHandler = Arc<dyn UpdateHandler>;

// =============================================================================
// User Sinks
// =============================================================================

/// Receives every user a handler discovers.
pub trait UserSink: Send + Sync + 'static {
    /// Records one user found in the update identified by `update_id`.
    fn record(&self, update_id: &Value, user: &User);
}

/// Sink that emits one `info` event per user.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl UserSink for LogSink {
    fn record(&self, update_id: &Value, user: &User) {
        info!(
            update_id = %update_id,
            user_id = %user.id,
            first_name = %user.first_name,
            last_name = ?user.last_name,
            username = ?user.username,
            "Found user"
        );
    }
}

/// Sink that keeps every recorded user in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    users: Mutex<Vec<User>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    pub fn users(&self) -> Vec<User> {
        self.users.lock().clone()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<User> {
        std::mem::take(&mut *self.users.lock())
    }
}

impl UserSink for MemorySink {
    fn record(&self, _update_id: &Value, user: &User) {
        self.users.lock().push(user.clone());
    }
}

impl<S: UserSink> UserSink for Arc<S> {
    fn record(&self, update_id: &Value, user: &User) {
        (**self).record(update_id, user);
    }
}

// =============================================================================
// Message Handler
// =============================================================================

/// Handler for `message` updates.
pub struct MessageHandler {
    sink: Box<dyn UserSink>,
}

impl MessageHandler {
    /// Type tag this handler is registered under by default.
    pub const UPDATE_TYPE: &'static str = "message";

    /// Creates a handler that logs every user it finds.
    pub fn new() -> Self {
        Self::with_sink(LogSink)
    }

    /// Creates a handler reporting to a custom sink.
    pub fn with_sink(sink: impl UserSink) -> Self {
        Self {
            sink: Box::new(sink),
        }
    }
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UpdateHandler for MessageHandler {
    async fn handle(&self, update_id: &Value, body: &Value) -> HandlerResult {
        let Value::Object(message) = body else {
            return Err(format!("message body must be an object, got {body}").into());
        };

        let users = extract_users(message);
        debug!(update_id = %update_id, count = users.len(), "Extracted users");

        for user in &users {
            self.sink.record(update_id, user);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_message_handler_records_users() {
        let sink = Arc::new(MemorySink::new());
        let handler = MessageHandler::with_sink(sink.clone());

        handler
            .handle(
                &json!(1),
                &json!({
                    "from": {"id": 123, "first_name": "John", "is_bot": false},
                    "chat": {"id": 123, "first_name": "John", "type": "private"},
                    "entities": [{"type": "bot_command", "offset": 0, "length": 6}],
                }),
            )
            .await
            .unwrap();

        assert_eq!(sink.users(), vec![User::new(123, "John")]);
    }

    #[tokio::test]
    async fn test_message_handler_empty_body() {
        let sink = Arc::new(MemorySink::new());
        let handler = MessageHandler::with_sink(sink.clone());

        handler.handle(&json!(1), &json!({})).await.unwrap();
        assert!(sink.users().is_empty());
    }

    #[test]
    fn test_message_handler_rejects_non_object() {
        let handler = MessageHandler::with_sink(MemorySink::new());
        let err = tokio_test::block_on(handler.handle(&json!(1), &json!("text"))).unwrap_err();
        assert!(err.to_string().contains("must be an object"));
    }

    #[test]
    fn test_memory_sink_take() {
        let sink = MemorySink::new();
        sink.record(&json!(1), &User::new(1, "A"));
        assert_eq!(sink.take().len(), 1);
        assert!(sink.users().is_empty());
    }
}
