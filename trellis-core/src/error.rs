// Error types for the Trellis request cycle

use http::{Method, StatusCode};
use thiserror::Error;
use trellis_session::SessionError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Method {method} not allowed for {path}")]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    #[error("Route load error: {0}")]
    RouteLoad(String),

    #[error("Not registered: {0}")]
    NotRegistered(String),

    #[error("Registry entry '{name}' is not a {expected}")]
    RegistryTypeMismatch { name: String, expected: &'static str },

    #[error("CSRF token mismatch: {0}")]
    CsrfMismatch(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.status().as_u16()
    }

    /// Get the HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            Error::RouteNotFound(_) => StatusCode::NOT_FOUND,
            Error::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            Error::CsrfMismatch(_) | Error::Forbidden(_) => StatusCode::FORBIDDEN,
            Error::BadRequest(_) | Error::Deserialization(_) => StatusCode::BAD_REQUEST,
            Error::RouteLoad(_)
            | Error::NotRegistered(_)
            | Error::RegistryTypeMismatch { .. }
            | Error::Session(_)
            | Error::Serialization(_)
            | Error::Config(_)
            | Error::Internal(_)
            | Error::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Message safe to show to the client.
    ///
    /// Server errors are reduced to the status reason so internals do not leak.
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            self.status()
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            self.to_string()
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
