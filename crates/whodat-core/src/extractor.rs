//! Recursive user extraction.
//!
//! The platform's payload schema is large and changes over time, so users
//! are found structurally instead of through a typed model: any object with
//! both `id` and `first_name` is a *candidate*.
//!
//! ```text
//! message
//! ├── from            {id, first_name, is_bot: false}   → recorded, not descended
//! ├── chat            {id, first_name, type}            → same id, already seen
//! ├── forward_from    {id, first_name, is_bot: true}    → excluded
//! └── entities [ {type, offset, length} ]               → not a candidate, walked
//! ```
//!
//! The walk is depth-first and pre-order, following key order inside each
//! object and element order inside arrays. The first occurrence of an id
//! wins. A recorded user is a leaf: its own children are never visited.
//! Candidates that are not recorded (bots, ids already seen, ids that are
//! not integers) are walked like any other object.

use std::collections::HashSet;

use serde_json::{Map, Value};

use crate::update::{User, UserId};

/// Returns the distinct human users referenced anywhere inside `root`,
/// in order of first discovery.
pub fn extract_users(root: &Map<String, Value>) -> Vec<User> {
    let mut walker = Walker::default();
    walker.visit(root);
    walker.users
}

/// Like [`extract_users`], for a body that may not be an object.
///
/// Only objects are valid roots; any other value yields no users.
pub fn extract_users_from_value(root: &Value) -> Vec<User> {
    match root {
        Value::Object(map) => extract_users(map),
        _ => Vec::new(),
    }
}

#[derive(Default)]
struct Walker {
    seen: HashSet<UserId>,
    users: Vec<User>,
}

impl Walker {
    fn visit(&mut self, node: &Map<String, Value>) {
        if let Some(user) = Candidate::parse(node).and_then(Candidate::into_human)
            && self.seen.insert(user.id)
        {
            self.users.push(user);
            return;
        }

        for value in node.values() {
            match value {
                Value::Object(child) => self.visit(child),
                Value::Array(items) => {
                    for item in items {
                        if let Value::Object(child) = item {
                            self.visit(child);
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

/// A user-shaped object: has both `id` and `first_name`.
struct Candidate<'a> {
    node: &'a Map<String, Value>,
    id: &'a Value,
    first_name: &'a Value,
}

impl<'a> Candidate<'a> {
    fn parse(node: &'a Map<String, Value>) -> Option<Self> {
        Some(Self {
            node,
            id: node.get("id")?,
            first_name: node.get("first_name")?,
        })
    }

    /// Any truthy `is_bot` marks a bot: `true`, a non-zero number, or a
    /// non-empty string, array or object.
    fn is_bot(&self) -> bool {
        match self.node.get("is_bot") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
            Some(Value::String(s)) => !s.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(fields)) => !fields.is_empty(),
        }
    }

    /// Builds the user unless the candidate is a bot or its fields have the
    /// wrong types.
    fn into_human(self) -> Option<User> {
        if self.is_bot() {
            return None;
        }

        let text = |key: &str| self.node.get(key).and_then(Value::as_str).map(String::from);

        Some(User {
            id: UserId(self.id.as_i64()?),
            first_name: self.first_name.as_str()?.to_string(),
            last_name: text("last_name"),
            username: text("username"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extract(value: Value) -> Vec<User> {
        extract_users_from_value(&value)
    }

    #[test]
    fn test_empty_body() {
        assert!(extract(json!({})).is_empty());
    }

    #[test]
    fn test_private_chat_counts_once() {
        let users = extract(json!({
            "message_id": 2,
            "date": 1573660000,
            "text": "/start",
            "from": {"is_bot": false, "first_name": "John", "id": 123},
            "chat": {"type": "private", "first_name": "John", "id": 123},
            "entities": [{"type": "bot_command", "length": 5, "offset": 0}],
        }));

        assert_eq!(users, vec![User::new(123, "John")]);
    }

    #[test]
    fn test_supergroup_with_last_name() {
        let users = extract(json!({
            "message_id": 3,
            "date": 1573660000,
            "text": "/start",
            "from": {"is_bot": false, "first_name": "John", "last_name": "Smith", "id": 123},
            "chat": {"type": "supergroup", "title": "group name", "id": -456},
        }));

        assert_eq!(users, vec![User::new(123, "John").with_last_name("Smith")]);
    }

    #[test]
    fn test_forwarded_from_human() {
        let users = extract(json!({
            "message_id": 4,
            "forward_date": 1573660000,
            "date": 1573660005,
            "from": {"is_bot": false, "first_name": "John", "id": 123},
            "chat": {"type": "private", "first_name": "John", "id": 123},
            "forward_from": {"is_bot": false, "username": "pak01", "first_name": "Peter", "id": 45},
            "text": "test",
        }));

        assert_eq!(
            users,
            vec![
                User::new(123, "John"),
                User::new(45, "Peter").with_username("pak01"),
            ]
        );
    }

    #[test]
    fn test_forwarded_from_bot_is_excluded() {
        let users = extract(json!({
            "message_id": 5,
            "forward_date": 1573660000,
            "date": 1573660005,
            "from": {"is_bot": false, "first_name": "John", "id": 123},
            "chat": {"type": "private", "first_name": "John", "id": 123},
            "forward_from": {
                "is_bot": true,
                "username": "tinystash_bot",
                "first_name": "tiny[stash]",
                "id": 419864769,
            },
            "text": "test",
        }));

        assert_eq!(users, vec![User::new(123, "John")]);
    }

    #[test]
    fn test_reply_to_message_is_walked() {
        let users = extract(json!({
            "message_id": 6,
            "date": 1573660005,
            "from": {"is_bot": false, "first_name": "John", "id": 123},
            "chat": {"type": "supergroup", "title": "group name", "id": -456},
            "reply_to_message": {
                "message_id": 3,
                "date": 1573660000,
                "from": {"is_bot": false, "username": "pak01", "first_name": "Peter", "id": 45},
                "chat": {"type": "supergroup", "title": "group name", "id": -456},
                "text": "ping",
            },
            "text": "pong",
        }));

        assert_eq!(
            users,
            vec![
                User::new(123, "John"),
                User::new(45, "Peter").with_username("pak01"),
            ]
        );
    }

    #[test]
    fn test_left_member_duplicates() {
        let users = extract(json!({
            "message_id": 7,
            "date": 1573660005,
            "from": {"is_bot": false, "first_name": "John", "id": 123},
            "chat": {"type": "supergroup", "title": "group name", "id": -456},
            "left_chat_member": {"is_bot": false, "username": "pak01", "first_name": "Peter", "id": 45},
            "left_chat_participant": {"is_bot": false, "username": "pak01", "first_name": "Peter", "id": 45},
        }));

        assert_eq!(users.len(), 2);
        assert_eq!(users[1], User::new(45, "Peter").with_username("pak01"));
    }

    #[test]
    fn test_new_members_list() {
        let users = extract(json!({
            "message_id": 8,
            "date": 1573660005,
            "from": {"is_bot": false, "first_name": "John", "id": 123},
            "chat": {"type": "supergroup", "title": "group name", "id": -456},
            "new_chat_member": {"is_bot": false, "username": "pak01", "first_name": "Peter", "id": 45},
            "new_chat_members": [
                {"is_bot": false, "username": "asdf", "first_name": "Roger", "last_name": "Smith", "id": 67},
                {"is_bot": false, "username": "pak01", "first_name": "Peter", "id": 45},
            ],
        }));

        assert_eq!(
            users,
            vec![
                User::new(123, "John"),
                User::new(45, "Peter").with_username("pak01"),
                User::new(67, "Roger")
                    .with_last_name("Smith")
                    .with_username("asdf"),
            ]
        );
    }

    #[test]
    fn test_first_occurrence_wins() {
        let users = extract(json!({
            "from": {"id": 1, "first_name": "First"},
            "reply_to_message": {"from": {"id": 1, "first_name": "Second", "username": "x"}},
        }));

        assert_eq!(users, vec![User::new(1, "First")]);
    }

    #[test]
    fn test_recorded_user_is_not_descended() {
        let users = extract(json!({
            "from": {
                "id": 1,
                "first_name": "Outer",
                "nested": {"id": 2, "first_name": "Inner"},
            },
        }));

        assert_eq!(users, vec![User::new(1, "Outer")]);
    }

    #[test]
    fn test_bot_children_are_still_walked() {
        let users = extract(json!({
            "via_bot": {
                "id": 10,
                "first_name": "Helper",
                "is_bot": true,
                "owner": {"id": 11, "first_name": "Owner"},
            },
        }));

        assert_eq!(users, vec![User::new(11, "Owner")]);
    }

    #[test]
    fn test_truthy_is_bot_excludes() {
        let users = extract(json!({
            "a": {"id": 1, "first_name": "One", "is_bot": 1},
            "b": {"id": 2, "first_name": "Yes", "is_bot": "yes"},
            "c": {"id": 3, "first_name": "Zero", "is_bot": 0},
            "d": {"id": 4, "first_name": "Empty", "is_bot": ""},
            "e": {"id": 5, "first_name": "Null", "is_bot": null},
        }));

        assert_eq!(
            users,
            vec![
                User::new(3, "Zero"),
                User::new(4, "Empty"),
                User::new(5, "Null"),
            ]
        );
    }

    #[test]
    fn test_deeply_nested_bot_is_excluded() {
        let users = extract(json!({
            "a": [{"b": {"c": [{"id": 5, "first_name": "Bot", "is_bot": true}]}}],
        }));

        assert!(users.is_empty());
    }

    #[test]
    fn test_scalars_inside_arrays_are_ignored() {
        let users = extract(json!({
            "list": [1, "two", null, [{"id": 3, "first_name": "Nested"}], {"id": 4, "first_name": "Kept"}],
        }));

        // Arrays nested directly inside arrays are not walked.
        assert_eq!(users, vec![User::new(4, "Kept")]);
    }

    #[test]
    fn test_non_integer_id_is_not_a_user() {
        let users = extract(json!({
            "chat": {"id": "channel", "first_name": "Odd", "from": {"id": 9, "first_name": "Real"}},
        }));

        assert_eq!(users, vec![User::new(9, "Real")]);
    }

    #[test]
    fn test_extraction_is_repeatable() {
        let body = json!({
            "from": {"id": 2, "first_name": "B"},
            "forward_from": {"id": 1, "first_name": "A"},
        });

        let first = extract(body.clone());
        let second = extract(body);
        assert_eq!(first, second);
        assert_eq!(first[0].id, UserId(2));
    }

    #[test]
    fn test_non_object_root() {
        assert!(extract(json!([{"id": 1, "first_name": "A"}])).is_empty());
        assert!(extract(json!(42)).is_empty());
    }
}
