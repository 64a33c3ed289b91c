//! Update data model.
//!
//! Updates arrive as free-form JSON. Only the fields the pipeline actually
//! inspects are modelled: the `update_id` key, the single type tag next to
//! it, and the user-shaped objects found inside the body.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Key carrying the platform-issued update identifier.
pub const UPDATE_ID_KEY: &str = "update_id";

/// Platform-assigned user identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for UserId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A human user discovered inside an update body.
///
/// Absent optional fields are kept as `None` rather than omitted, so every
/// serialized user carries all four keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User identifier; identity for de-duplication.
    pub id: UserId,
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: Option<String>,
    /// Username without the leading `@`.
    pub username: Option<String>,
}

impl User {
    /// Creates a user with only the mandatory fields.
    pub fn new(id: impl Into<UserId>, first_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: first_name.into(),
            last_name: None,
            username: None,
        }
    }

    /// Sets the last name.
    pub fn with_last_name(mut self, last_name: impl Into<String>) -> Self {
        self.last_name = Some(last_name.into());
        self
    }

    /// Sets the username.
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.first_name, self.id)?;
        if let Some(username) = &self.username {
            write!(f, " @{username}")?;
        }
        Ok(())
    }
}

/// A validated update: its identifier, type tag and body.
///
/// Produced by the dispatcher once the raw JSON passed the shape checks.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Opaque `update_id` value; only its presence is checked.
    pub update_id: Value,
    /// The type tag, e.g. `"message"`.
    pub update_type: String,
    /// The payload stored under the type tag.
    pub body: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_serializes_absent_fields_as_null() {
        let user = User::new(123, "John");
        assert_eq!(
            serde_json::to_value(&user).unwrap(),
            json!({"id": 123, "first_name": "John", "last_name": null, "username": null})
        );
    }

    #[test]
    fn test_user_display() {
        let user = User::new(45, "Peter").with_username("pak01");
        assert_eq!(user.to_string(), "Peter (45) @pak01");
    }
}
