//! Per-request session handle.

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::flash::FlashState;
use crate::traits::{SessionRecord, generate_session_id};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use trellis_log::{debug, warn};

/// Session handle for one request.
///
/// Wraps a [`SessionRecord`] and exposes four logical namespaces over its
/// flat key space:
///
/// - **direct**: [`get`](Session::get) / [`put`](Session::put), persists until overwritten;
/// - **flash**: [`flash`](Session::flash) writes for the next request,
///   [`take_flash`](Session::take_flash) consumes what the previous request wrote;
/// - **old input**: flashed form fields, read with [`old_input`](Session::old_input);
/// - **previous URI**: a single direct slot set after output was produced.
///
/// Constructing a handle with [`resume`](Session::resume) or
/// [`start`](Session::start) performs the request-boundary transition, so it
/// happens exactly once per request.
///
/// # Concurrency
///
/// The handle owns a copy of the record for the duration of the request.
/// Two requests for the same session id running at once each advance the
/// flash state from the same stored record and the last save wins: a
/// flashed value can then be shown twice or lost. Callers that need stronger
/// guarantees must serialize requests per session id outside this crate.
///
/// # Examples
///
/// ```
/// use trellis_session::{Session, SessionConfig};
///
/// let config = SessionConfig::default();
///
/// // Request N
/// let mut session = Session::start(&config);
/// session.flash("status", "Profile saved").unwrap();
/// assert_eq!(session.take_flash::<String>("status"), None);
/// let record = session.into_record();
///
/// // Request N + 1
/// let mut session = Session::resume(record, &config);
/// assert_eq!(session.take_flash::<String>("status").as_deref(), Some("Profile saved"));
/// let record = session.into_record();
///
/// // Request N + 2
/// let mut session = Session::resume(record, &config);
/// assert_eq!(session.take_flash::<String>("status"), None);
/// ```
#[derive(Debug, Clone)]
pub struct Session {
    record: SessionRecord,
    flash: FlashState,
    config: SessionConfig,
    superseded_id: Option<String>,
}

impl Session {
    /// Start a brand new session.
    pub fn start(config: &SessionConfig) -> Self {
        let record = SessionRecord::new(generate_session_id(), config.effective_ttl(None));
        debug!("Starting session {}", record.id);
        Self::resume(record, config)
    }

    /// Resume a stored session and cross the request boundary.
    ///
    /// Every resume pushes the expiry one TTL past now, so a session only
    /// lapses after a full TTL without requests.
    pub fn resume(mut record: SessionRecord, config: &SessionConfig) -> Self {
        let mut flash = match record.remove(&config.flash_key) {
            Some(raw) => serde_json::from_value::<FlashState>(raw).unwrap_or_else(|e| {
                warn!("Discarding unreadable flash state in session {}: {}", record.id, e);
                FlashState::default()
            }),
            None => FlashState::default(),
        };

        let discarded = flash.advance();
        if discarded > 0 {
            debug!(
                "Session {}: {} flashed entries expired unread",
                record.id, discarded
            );
        }

        record.touch();
        record.extend(config.effective_ttl(None));

        Self {
            record,
            flash,
            config: config.clone(),
            superseded_id: None,
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The id this session had before [`invalidate`](Session::invalidate)
    /// or [`regenerate_id`](Session::regenerate_id), if either ran.
    pub fn superseded_id(&self) -> Option<&str> {
        self.superseded_id.as_deref()
    }

    /// Check if the underlying record has expired.
    pub fn is_expired(&self) -> bool {
        self.record.is_expired()
    }

    // ========== Direct namespace ==========

    /// Read a direct value. `None` when absent or of another type.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.record.get(key)
    }

    /// Read a raw direct value.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.record.data.get(key)
    }

    /// Write a direct value.
    pub fn put<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        self.record.set(key, value)
    }

    /// Check whether a direct value exists.
    pub fn has(&self, key: &str) -> bool {
        self.record.contains(key)
    }

    /// Remove a direct value.
    pub fn forget(&mut self, key: &str) -> Option<Value> {
        self.record.remove(key)
    }

    // ========== Flash namespace ==========

    /// Flash a value for the next request.
    pub fn flash<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.flash.put(key, value);
        Ok(())
    }

    /// Consume a value flashed by the previous request.
    ///
    /// The entry is removed even when it cannot be read as `T`.
    pub fn take_flash<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let raw = self.flash.take(key)?;
        serde_json::from_value(raw).ok()
    }

    /// Read a value flashed by the previous request without consuming it.
    pub fn peek_flash<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.flash
            .peek(key)
            .and_then(|raw| serde_json::from_value(raw.clone()).ok())
    }

    // ========== Old input ==========

    /// Flash submitted form fields so the next request can repopulate the form.
    pub fn flash_input<I, K, V>(&mut self, fields: I) -> SessionResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        for (key, value) in fields {
            let key = self.old_input_key(key.as_ref());
            self.flash(&key, value)?;
        }
        Ok(())
    }

    /// Consume one field of the previous request's flashed input.
    pub fn old_input<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        let key = self.old_input_key(key);
        self.take_flash(&key)
    }

    fn old_input_key(&self, key: &str) -> String {
        format!("{}{}", self.config.old_input_prefix, key)
    }

    // ========== Previous URI ==========

    /// Record the URI just served so the next request can refer back to it.
    ///
    /// Call only after the response output was produced.
    pub fn set_previous_uri(&mut self, uri: impl Into<String>) {
        let key = self.config.previous_uri_key.clone();
        self.record.data.insert(key, Value::String(uri.into()));
    }

    /// URI of the previous request, if any.
    pub fn previous_uri(&self) -> Option<String> {
        self.record.get(&self.config.previous_uri_key)
    }

    // ========== Lifetime ==========

    /// End the session: drop every namespace and issue a new id.
    pub fn invalidate(&mut self) {
        self.record.clear();
        self.flash = FlashState::default();
        self.regenerate_id();
    }

    /// Issue a new id while keeping the data.
    pub fn regenerate_id(&mut self) {
        let old = std::mem::replace(&mut self.record.id, generate_session_id());
        debug!("Session {} re-issued as {}", old, self.record.id);
        if self.superseded_id.is_none() {
            self.superseded_id = Some(old);
        }
    }

    /// Hand the record back for persistence, folding the flash state in.
    pub fn into_record(self) -> SessionRecord {
        let Self {
            mut record,
            flash,
            config,
            ..
        } = self;

        if !flash.is_empty() {
            match serde_json::to_value(&flash) {
                Ok(raw) => {
                    record.data.insert(config.flash_key, raw);
                }
                Err(e) => warn!("Dropping flash state of session {}: {}", record.id, e),
            }
        }

        record
    }
}
