// Mock session store for testing

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trellis_session::{
    MemorySessionStore, SessionError, SessionRecord, SessionResult, SessionStore,
};

/// One call made against a [`MockSessionStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Create,
    Get(String),
    Save(String),
    Delete(String),
}

/// Session store that records every call and can be told to fail.
///
/// Storage itself is delegated to a [`MemorySessionStore`].
#[derive(Clone, Default)]
pub struct MockSessionStore {
    inner: MemorySessionStore,
    calls: Arc<Mutex<Vec<StoreCall>>>,
    failing: Arc<AtomicBool>,
}

impl MockSessionStore {
    /// Create a new mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with a connection error.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded saves
    pub fn save_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, StoreCall::Save(_)))
            .count()
    }

    /// Check if a session id was deleted
    pub fn was_deleted(&self, session_id: &str) -> bool {
        self.calls()
            .contains(&StoreCall::Delete(session_id.to_string()))
    }

    /// Clear all recorded calls
    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: StoreCall) -> SessionResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.load(Ordering::SeqCst) {
            return Err(SessionError::Connection("mock store is failing".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn create(&self, ttl: Option<Duration>) -> SessionResult<SessionRecord> {
        self.record(StoreCall::Create)?;
        self.inner.create(ttl).await
    }

    async fn get(&self, session_id: &str) -> SessionResult<Option<SessionRecord>> {
        self.record(StoreCall::Get(session_id.to_string()))?;
        self.inner.get(session_id).await
    }

    async fn save(&self, record: &SessionRecord) -> SessionResult<()> {
        self.record(StoreCall::Save(record.id.clone()))?;
        self.inner.save(record).await
    }

    async fn delete(&self, session_id: &str) -> SessionResult<()> {
        self.record(StoreCall::Delete(session_id.to_string()))?;
        self.inner.delete(session_id).await
    }

    async fn exists(&self, session_id: &str) -> SessionResult<bool> {
        self.inner.exists(session_id).await
    }

    async fn count(&self) -> SessionResult<usize> {
        self.inner.count().await
    }

    async fn cleanup_expired(&self) -> SessionResult<usize> {
        self.inner.cleanup_expired().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls() {
        let store = MockSessionStore::new();
        let record = store.create(None).await.unwrap();
        store.get(&record.id).await.unwrap();
        store.delete(&record.id).await.unwrap();

        assert_eq!(store.save_count(), 0);
        assert!(store.was_deleted(&record.id));
        assert_eq!(store.calls().first(), Some(&StoreCall::Create));

        store.clear_calls();
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MockSessionStore::new();
        store.fail(true);
        assert!(matches!(
            store.get("anything").await,
            Err(SessionError::Connection(_))
        ));
        store.fail(false);
        assert_eq!(store.get("anything").await.unwrap(), None);
    }
}
