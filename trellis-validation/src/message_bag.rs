// Per-request snapshot of validation messages

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use trellis_log::debug;
use trellis_session::Session;

/// Validation messages keyed by field name.
///
/// Built once per request from the `errors` entry flashed by the previous
/// request, so messages set before a failed-validation redirect are visible
/// on the very next page only. Lookups on unknown fields are soft: `false`,
/// `None` or an empty slice.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
/// use trellis_validation::MessageBag;
///
/// let mut messages = BTreeMap::new();
/// messages.insert("email".to_string(), vec!["required".to_string()]);
///
/// let mut bag = MessageBag::new();
/// bag.set_messages(messages);
///
/// assert!(bag.has("email"));
/// assert_eq!(bag.first("email"), Some("required"));
/// assert!(!bag.has("name"));
/// assert!(bag.get("name").is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageBag {
    messages: BTreeMap<String, Vec<String>>,
}

impl MessageBag {
    /// Flash key the bag is read from.
    pub const FLASH_KEY: &'static str = "errors";

    /// Create an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the bag from the session's flashed `errors` entry.
    ///
    /// Consumes the flash entry. An absent or unreadable entry yields an
    /// empty bag.
    pub fn from_session(session: &mut Session) -> Self {
        let messages = session
            .take_flash::<BTreeMap<String, Vec<String>>>(Self::FLASH_KEY)
            .unwrap_or_default();

        if !messages.is_empty() {
            debug!("Restored validation messages for {} fields", messages.len());
        }

        Self { messages }
    }

    /// Replace the field to messages mapping.
    pub fn set_messages(&mut self, messages: impl Into<BTreeMap<String, Vec<String>>>) {
        self.messages = messages.into();
    }

    /// Whether the field has at least one message.
    pub fn has(&self, field: &str) -> bool {
        self.messages.get(field).is_some_and(|list| !list.is_empty())
    }

    /// First message for the field.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.messages
            .get(field)
            .and_then(|list| list.first())
            .map(String::as_str)
    }

    /// All messages for the field, in the order they were recorded.
    pub fn get(&self, field: &str) -> &[String] {
        self.messages.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every message, grouped by field name order.
    pub fn all(&self) -> Vec<&str> {
        self.messages
            .values()
            .flat_map(|list| list.iter().map(String::as_str))
            .collect()
    }

    /// Field names with messages.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    /// Underlying mapping.
    pub fn messages(&self) -> &BTreeMap<String, Vec<String>> {
        &self.messages
    }

    /// True when no field has messages.
    pub fn is_empty(&self) -> bool {
        self.messages.values().all(Vec::is_empty)
    }

    /// Total number of messages.
    pub fn count(&self) -> usize {
        self.messages.values().map(Vec::len).sum()
    }

    /// JSON object of field to message list.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "errors": self.messages })
    }
}

impl From<BTreeMap<String, Vec<String>>> for MessageBag {
    fn from(messages: BTreeMap<String, Vec<String>>) -> Self {
        Self { messages }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_session::SessionConfig;

    fn bag(entries: &[(&str, &[&str])]) -> MessageBag {
        entries
            .iter()
            .map(|(field, list)| {
                (
                    field.to_string(),
                    list.iter().map(|m| m.to_string()).collect(),
                )
            })
            .collect::<BTreeMap<_, _>>()
            .into()
    }

    #[test]
    fn test_accessors() {
        let bag = bag(&[
            ("email", &["required", "must be a valid email"]),
            ("name", &["too short"]),
        ]);

        assert!(bag.has("email"));
        assert_eq!(bag.first("email"), Some("required"));
        assert_eq!(bag.get("email").len(), 2);
        assert_eq!(bag.all(), vec!["required", "must be a valid email", "too short"]);
        assert_eq!(bag.count(), 3);
        assert_eq!(bag.keys().collect::<Vec<_>>(), vec!["email", "name"]);
    }

    #[test]
    fn test_absent_fields_are_soft() {
        let bag = MessageBag::new();
        assert!(!bag.has("email"));
        assert_eq!(bag.first("email"), None);
        assert!(bag.get("email").is_empty());
        assert!(bag.all().is_empty());
        assert!(bag.is_empty());
    }

    #[test]
    fn test_field_with_empty_list() {
        let bag = bag(&[("email", &[])]);
        assert!(!bag.has("email"));
        assert_eq!(bag.first("email"), None);
        assert!(bag.is_empty());
    }

    #[test]
    fn test_set_messages_replaces() {
        let mut bag = bag(&[("email", &["required"])]);
        let mut replacement = BTreeMap::new();
        replacement.insert("name".to_string(), vec!["required".to_string()]);
        bag.set_messages(replacement);

        assert!(!bag.has("email"));
        assert!(bag.has("name"));
    }

    #[test]
    fn test_from_session_is_one_shot() {
        let config = SessionConfig::default();
        let mut session = Session::start(&config);
        let messages = bag(&[("email", &["required"])]);
        session.flash(MessageBag::FLASH_KEY, &messages).unwrap();

        let mut session = Session::resume(session.into_record(), &config);
        let restored = MessageBag::from_session(&mut session);
        assert_eq!(restored, messages);

        assert!(MessageBag::from_session(&mut session).is_empty());
    }

    #[test]
    fn test_from_session_ignores_unexpected_shape() {
        let config = SessionConfig::default();
        let mut session = Session::start(&config);
        session.flash(MessageBag::FLASH_KEY, "not a map").unwrap();

        let mut session = Session::resume(session.into_record(), &config);
        assert!(MessageBag::from_session(&mut session).is_empty());
    }

    #[test]
    fn test_to_json() {
        let bag = bag(&[("email", &["required"])]);
        assert_eq!(
            bag.to_json(),
            serde_json::json!({"errors": {"email": ["required"]}})
        );
    }
}
