//! Two-slot flash state machine.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flash data carried across exactly one request boundary.
///
/// Writes land in `pending`. [`advance`](FlashState::advance) runs once per
/// request: `pending` becomes `active`, the previous `active` is dropped and
/// a fresh `pending` opens. Reads consume from `active`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlashState {
    /// Written during the current request, readable during the next one
    #[serde(default)]
    pub pending: Map<String, Value>,
    /// Written during the previous request, readable now
    #[serde(default)]
    pub active: Map<String, Value>,
}

impl FlashState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cross a request boundary.
    ///
    /// Returns the number of active entries discarded without being read.
    pub fn advance(&mut self) -> usize {
        let discarded = self.active.len();
        self.active = std::mem::take(&mut self.pending);
        discarded
    }

    /// Store a value for the next request.
    pub fn put(&mut self, key: impl Into<String>, value: Value) {
        self.pending.insert(key.into(), value);
    }

    /// Consume a value flashed by the previous request.
    pub fn take(&mut self, key: &str) -> Option<Value> {
        self.active.remove(key)
    }

    /// Read a value flashed by the previous request without consuming it.
    pub fn peek(&self, key: &str) -> Option<&Value> {
        self.active.get(key)
    }

    /// True when neither slot holds anything.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_survives_exactly_one_boundary() {
        let mut state = FlashState::new();
        state.put("status", json!("saved"));
        assert_eq!(state.take("status"), None);

        state.advance();
        assert_eq!(state.peek("status"), Some(&json!("saved")));

        state.advance();
        assert_eq!(state.take("status"), None);
    }

    #[test]
    fn test_take_is_one_shot() {
        let mut state = FlashState::new();
        state.put("status", json!("saved"));
        state.advance();

        assert_eq!(state.take("status"), Some(json!("saved")));
        assert_eq!(state.take("status"), None);
    }

    #[test]
    fn test_advance_reports_unread_entries() {
        let mut state = FlashState::new();
        state.put("a", json!(1));
        state.put("b", json!(2));
        assert_eq!(state.advance(), 0);

        state.take("a");
        assert_eq!(state.advance(), 1);
        assert!(state.is_empty());
    }

    #[test]
    fn test_serde_tolerates_missing_slots() {
        let state: FlashState = serde_json::from_value(json!({"pending": {"k": "v"}})).unwrap();
        assert_eq!(state.pending.get("k"), Some(&json!("v")));
        assert!(state.active.is_empty());
    }
}
