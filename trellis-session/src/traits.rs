//! Session record and store trait definition.

use crate::error::{SessionError, SessionResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::time::Duration;

/// Persisted form of a session.
///
/// `data` is the flat key space shared by every logical namespace; the
/// [`Session`](crate::Session) handle layers flash, old-input and
/// previous-URI semantics on top of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Unique session identifier
    pub id: String,
    /// Session data as key-value pairs
    pub data: HashMap<String, serde_json::Value>,
    /// Session creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last access timestamp
    pub last_accessed_at: DateTime<Utc>,
    /// Session expiration timestamp
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a new empty record with the given ID and TTL.
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            data: HashMap::new(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    /// Check if the record has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Get a typed value from the record data.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.data
            .get(key)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in the record data.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    /// Remove a value from the record data.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Check if a key exists in the record data.
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Clear all record data.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Update the last accessed timestamp.
    pub fn touch(&mut self) {
        self.last_accessed_at = Utc::now();
    }

    /// Extend the expiration.
    pub fn extend(&mut self, ttl: Duration) {
        self.expires_at = Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default();
    }
}

/// Persistence backend for session records.
///
/// This is the only contract the request lifecycle has with physical
/// storage. Implementations map a session id to a [`SessionRecord`].
///
/// No implementation is required to serialize concurrent access to a single
/// session id; see [`Session`](crate::Session) for the consequences.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create and persist a new empty session.
    ///
    /// `ttl` falls back to the store's default when `None`.
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<SessionRecord>;

    /// Get a session by ID.
    ///
    /// Returns `Ok(None)` if not found or expired.
    async fn get(&self, session_id: &str) -> SessionResult<Option<SessionRecord>>;

    /// Save/update a session.
    async fn save(&self, record: &SessionRecord) -> SessionResult<()>;

    /// Delete a session.
    async fn delete(&self, session_id: &str) -> SessionResult<()>;

    /// Check if a session exists and is valid.
    async fn exists(&self, session_id: &str) -> SessionResult<bool>;

    /// Get the number of stored sessions.
    async fn count(&self) -> SessionResult<usize>;

    /// Remove expired sessions, returning how many were dropped.
    async fn cleanup_expired(&self) -> SessionResult<usize>;

    // ========== Convenience Methods ==========

    /// Get a direct value by key.
    async fn get_value<T: DeserializeOwned + Send>(
        &self,
        session_id: &str,
        key: &str,
    ) -> SessionResult<Option<T>>
    where
        Self: Sized,
    {
        Ok(self
            .get(session_id)
            .await?
            .and_then(|record| record.get(key)))
    }

    /// Set a direct value by key.
    async fn set_value<T: Serialize + Send>(
        &self,
        session_id: &str,
        key: &str,
        value: T,
    ) -> SessionResult<()>
    where
        Self: Sized,
    {
        let mut record = self
            .get(session_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        record.set(key, value)?;
        self.save(&record).await
    }
}

/// Generate a new unique session ID.
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Check that a client-supplied session ID has the shape we issue.
pub fn is_valid_session_id(session_id: &str) -> bool {
    uuid::Uuid::parse_str(session_id).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_typed_roundtrip() {
        let mut record = SessionRecord::new("abc", Duration::from_secs(60));
        record.set("user_id", 42).unwrap();

        assert_eq!(record.get::<i32>("user_id"), Some(42));
        assert_eq!(record.get::<String>("user_id"), None);
        assert!(record.contains("user_id"));
        assert!(!record.is_expired());
    }

    #[test]
    fn test_record_expiry() {
        let mut record = SessionRecord::new("abc", Duration::from_secs(60));
        record.expires_at = Utc::now() - chrono::Duration::seconds(1);
        assert!(record.is_expired());

        record.extend(Duration::from_secs(60));
        assert!(!record.is_expired());
    }

    #[test]
    fn test_session_id_shape() {
        let id = generate_session_id();
        assert!(is_valid_session_id(&id));
        assert!(!is_valid_session_id("../../etc/passwd"));
        assert_ne!(id, generate_session_id());
    }
}
