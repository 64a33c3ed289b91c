//! Update type registry.
//!
//! Maps a type tag (the single key next to `update_id`) to the handler for
//! that update type. The registry is filled once at startup and then moved
//! into the dispatcher behind an `Arc`, after which it is read-only.
//! Supporting a new update type only takes another [`register`] call.
//!
//! [`register`]: UpdateTypeRegistry::register

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{RegistryError, RegistryResult};
use crate::handler::{BoxedHandler, MessageHandler, UpdateHandler};
use crate::update::UPDATE_ID_KEY;

/// Registry of update handlers keyed by type tag.
#[derive(Default)]
pub struct UpdateTypeRegistry {
    handlers: HashMap<String, BoxedHandler>,
}

impl UpdateTypeRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in handlers.
    ///
    /// Currently that is [`MessageHandler`] under `"message"`, logging every
    /// user it finds.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .handlers
            .insert(MessageHandler::UPDATE_TYPE.to_string(), Arc::new(MessageHandler::new()));
        registry
    }

    /// Registers `handler` for `update_type`.
    ///
    /// Fails if the tag is already taken, empty, or equal to `update_id`.
    pub fn register(
        &mut self,
        update_type: impl Into<String>,
        handler: impl UpdateHandler,
    ) -> RegistryResult<()> {
        self.register_shared(update_type, Arc::new(handler))
    }

    /// Registers an already shared handler.
    pub fn register_shared(
        &mut self,
        update_type: impl Into<String>,
        handler: BoxedHandler,
    ) -> RegistryResult<()> {
        let update_type = update_type.into();

        if update_type.is_empty() || update_type == UPDATE_ID_KEY {
            return Err(RegistryError::InvalidTag { update_type });
        }
        if self.handlers.contains_key(&update_type) {
            return Err(RegistryError::Conflict { update_type });
        }

        debug!(update_type = %update_type, "Registered update handler");
        self.handlers.insert(update_type, handler);
        Ok(())
    }

    /// Builder-style variant of [`register`](Self::register).
    pub fn with(
        mut self,
        update_type: impl Into<String>,
        handler: impl UpdateHandler,
    ) -> RegistryResult<Self> {
        self.register(update_type, handler)?;
        Ok(self)
    }

    /// Returns the handler for `update_type`.
    pub fn get(&self, update_type: &str) -> Option<&BoxedHandler> {
        self.handlers.get(update_type)
    }

    /// Returns `true` if a handler is registered for `update_type`.
    pub fn contains(&self, update_type: &str) -> bool {
        self.handlers.contains_key(update_type)
    }

    /// Returns all registered type tags, sorted.
    pub fn update_types(&self) -> Vec<&str> {
        let mut types: Vec<_> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Returns the number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for UpdateTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateTypeRegistry")
            .field("update_types", &self.update_types())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerResult;
    use async_trait::async_trait;
    use serde_json::Value;

    struct Noop;

    #[async_trait]
    impl UpdateHandler for Noop {
        async fn handle(&self, _update_id: &Value, _body: &Value) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = UpdateTypeRegistry::new();
        registry.register("edited_message", Noop).unwrap();

        assert!(registry.contains("edited_message"));
        assert!(registry.get("message").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = UpdateTypeRegistry::with_defaults();
        let err = registry.register("message", Noop).unwrap_err();

        assert!(matches!(err, RegistryError::Conflict { .. }));
        assert_eq!(err.to_string(), "already registered: message");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reserved_and_empty_tags() {
        let mut registry = UpdateTypeRegistry::new();
        assert!(matches!(
            registry.register("update_id", Noop),
            Err(RegistryError::InvalidTag { .. })
        ));
        assert!(matches!(
            registry.register("", Noop),
            Err(RegistryError::InvalidTag { .. })
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_builder_and_listing() {
        let registry = UpdateTypeRegistry::with_defaults()
            .with("channel_post", Noop)
            .unwrap();

        assert_eq!(registry.update_types(), vec!["channel_post", "message"]);
    }
}
