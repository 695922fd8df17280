//! Session errors.

use thiserror::Error;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    /// A value could not be stored as JSON.
    #[error("Cannot store session value: {0}")]
    Serialization(String),

    #[error("No session with id {0}")]
    NotFound(String),

    /// The backing store could not be reached.
    #[error("Session store unavailable: {0}")]
    Connection(String),
}
