//! Session state for the Trellis request lifecycle.
//!
//! A [`SessionStore`] persists [`SessionRecord`]s keyed by session id. Each
//! request turns the stored record into a [`Session`] handle, which crosses
//! the flash request boundary once and exposes the direct, flash, old-input
//! and previous-URI namespaces. At the end of the request the handle is
//! folded back into a record and saved.
//!
//! # Examples
//!
//! ```
//! use trellis_session::*;
//!
//! # tokio_test::block_on(async {
//! let config = SessionConfig::default();
//! let store = MemorySessionStore::new(config.clone());
//!
//! // First request: a failed form submission
//! let mut session = Session::start(&config);
//! session.flash("status", "Please fix the errors below").unwrap();
//! session.flash_input([("email", "ada@example")]).unwrap();
//! let id = session.id().to_string();
//! store.save(&session.into_record()).await.unwrap();
//!
//! // Second request: the redirected form page
//! let record = store.get(&id).await.unwrap().unwrap();
//! let mut session = Session::resume(record, &config);
//! assert_eq!(session.old_input::<String>("email").as_deref(), Some("ada@example"));
//! # });
//! ```

pub mod config;
pub mod error;
pub mod flash;
pub mod memory;
pub mod session;
pub mod traits;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use flash::FlashState;
pub use memory::MemorySessionStore;
pub use session::Session;
pub use traits::{SessionRecord, SessionStore, generate_session_id, is_valid_session_id};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::error::{SessionError, SessionResult};
    pub use crate::memory::MemorySessionStore;
    pub use crate::session::Session;
    pub use crate::traits::{SessionRecord, SessionStore};
}
