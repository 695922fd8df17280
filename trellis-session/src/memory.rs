//! In-memory session storage.

use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::traits::{SessionRecord, SessionStore, generate_session_id};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use trellis_log::debug;

/// Process-local session store.
///
/// Suitable for tests and single-process deployments. Records live in a
/// map keyed by [`SessionConfig::session_key`]. Expired records are swept
/// whenever a new session is saved, so the map is bounded by the number of
/// live sessions.
///
/// # Examples
///
/// ```
/// use trellis_session::{MemorySessionStore, SessionConfig, SessionStore};
///
/// # tokio_test::block_on(async {
/// let store = MemorySessionStore::new(SessionConfig::default());
/// let mut record = store.create(None).await.unwrap();
/// record.set("user_id", 7).unwrap();
/// store.save(&record).await.unwrap();
///
/// let loaded = store.get(&record.id).await.unwrap().unwrap();
/// assert_eq!(loaded.get::<i32>("user_id"), Some(7));
/// # });
/// ```
#[derive(Clone)]
pub struct MemorySessionStore {
    records: Arc<RwLock<HashMap<String, SessionRecord>>>,
    config: SessionConfig,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Store configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn key(&self, session_id: &str) -> String {
        self.config.session_key(session_id)
    }
}

fn prune(records: &mut HashMap<String, SessionRecord>) -> usize {
    let before = records.len();
    records.retain(|_, record| !record.is_expired());
    let removed = before - records.len();
    if removed > 0 {
        debug!("Removed {} expired sessions", removed);
    }
    removed
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<SessionRecord> {
        let record = SessionRecord::new(generate_session_id(), self.config.effective_ttl(ttl));
        self.save(&record).await?;
        debug!("Created session {}", record.id);
        Ok(record)
    }

    async fn get(&self, session_id: &str) -> SessionResult<Option<SessionRecord>> {
        let key = self.key(session_id);

        let record = self.records.read().await.get(&key).cloned();
        match record {
            Some(record) if record.is_expired() => {
                self.records.write().await.remove(&key);
                debug!("Session {} expired", session_id);
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, record: &SessionRecord) -> SessionResult<()> {
        let key = self.key(&record.id);
        let mut records = self.records.write().await;
        if !records.contains_key(&key) {
            prune(&mut records);
        }
        records.insert(key, record.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> SessionResult<()> {
        let key = self.key(session_id);
        self.records.write().await.remove(&key);
        Ok(())
    }

    async fn exists(&self, session_id: &str) -> SessionResult<bool> {
        Ok(self.get(session_id).await?.is_some())
    }

    async fn count(&self) -> SessionResult<usize> {
        Ok(self.records.read().await.len())
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        Ok(prune(&mut *self.records.write().await))
    }
}
