use crate::error::{CsrfError, Result};
use trellis_core::Method;

/// Smallest accepted token size in bytes.
pub const MIN_TOKEN_BYTES: usize = 16;

/// CSRF protection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrfConfig {
    /// Direct session key holding the token
    pub session_key: String,

    /// Header name for CSRF token
    pub header_name: String,

    /// Form field name for CSRF token
    pub field_name: String,

    /// Random bytes per token
    pub token_bytes: usize,

    /// Safe HTTP methods (not checked for CSRF)
    pub safe_methods: Vec<Method>,

    /// Path prefixes to exclude from CSRF protection
    pub exclude_paths: Vec<String>,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            session_key: "_csrf_token".to_string(),
            header_name: "X-CSRF-Token".to_string(),
            field_name: "_token".to_string(),
            token_bytes: 32,
            safe_methods: vec![Method::GET, Method::HEAD, Method::OPTIONS],
            exclude_paths: Vec::new(),
        }
    }
}

impl CsrfConfig {
    /// Create a new CSRF configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session key
    pub fn with_session_key(mut self, key: impl Into<String>) -> Self {
        self.session_key = key.into();
        self
    }

    /// Set header name
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into();
        self
    }

    /// Set field name
    pub fn with_field_name(mut self, name: impl Into<String>) -> Self {
        self.field_name = name.into();
        self
    }

    /// Set token size in bytes
    pub fn with_token_bytes(mut self, bytes: usize) -> Self {
        self.token_bytes = bytes;
        self
    }

    /// Set safe methods
    pub fn with_safe_methods(mut self, methods: Vec<Method>) -> Self {
        self.safe_methods = methods;
        self
    }

    /// Add a path prefix that skips the check, e.g. a webhook endpoint
    pub fn exclude_path(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_paths.push(prefix.into());
        self
    }

    /// Reject settings that would weaken the token.
    pub fn validate(&self) -> Result<()> {
        if self.token_bytes < MIN_TOKEN_BYTES {
            return Err(CsrfError::InvalidConfig(format!(
                "token must be at least {} bytes, got {}",
                MIN_TOKEN_BYTES, self.token_bytes
            )));
        }
        if self.session_key.is_empty()
            || self.field_name.is_empty()
            || self.header_name.is_empty()
        {
            return Err(CsrfError::InvalidConfig(
                "session key, field and header names must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Check whether a request with this method and normalized path is checked.
    pub fn needs_protection(&self, method: &Method, uri: &str) -> bool {
        if self.safe_methods.contains(method) {
            return false;
        }

        !self
            .exclude_paths
            .iter()
            .any(|prefix| path_has_prefix(uri, prefix))
    }
}

/// Segment-aware prefix test: `/webhooks` covers `/webhooks/stripe` but not
/// `/webhooks-admin`.
fn path_has_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
