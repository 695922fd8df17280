use thiserror::Error;
use trellis_session::SessionError;

#[derive(Error, Debug)]
pub enum CsrfError {
    #[error("CSRF token does not match")]
    Mismatch,

    #[error("Missing CSRF token")]
    MissingToken,

    #[error("Token generation failed: {0}")]
    GenerationFailed(String),

    #[error("Invalid CSRF configuration: {0}")]
    InvalidConfig(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

pub type Result<T> = std::result::Result<T, CsrfError>;

impl From<CsrfError> for trellis_core::Error {
    fn from(err: CsrfError) -> Self {
        match err {
            CsrfError::Mismatch | CsrfError::MissingToken => {
                trellis_core::Error::CsrfMismatch(err.to_string())
            }
            CsrfError::Session(e) => trellis_core::Error::Session(e),
            CsrfError::GenerationFailed(_) | CsrfError::InvalidConfig(_) => {
                trellis_core::Error::Internal(err.to_string())
            }
        }
    }
}
