//! Session configuration.

use std::time::Duration;

/// Session configuration.
///
/// Besides lifetime settings this names the reserved keys under which the
/// flash, old-input and previous-URI namespaces live in the flat key space
/// of a [`SessionRecord`](crate::SessionRecord).
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Session namespace/prefix used by stores
    pub namespace: String,
    /// Name of the cookie carrying the session id
    pub cookie_name: String,
    /// Default session TTL
    pub default_ttl: Duration,
    /// Maximum session TTL
    pub max_ttl: Duration,
    /// Reserved key holding the pending/active flash maps
    pub flash_key: String,
    /// Prefix for flashed form input
    pub old_input_prefix: String,
    /// Reserved direct key holding the previous request URI
    pub previous_uri_key: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            namespace: "trellis:session".to_string(),
            cookie_name: "trellis_session".to_string(),
            default_ttl: Duration::from_secs(7200),   // 2 hours
            max_ttl: Duration::from_secs(86400 * 7), // 7 days
            flash_key: "_flash".to_string(),
            old_input_prefix: "_old_input.".to_string(),
            previous_uri_key: "_previous_uri".to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session namespace/prefix.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the session cookie name.
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    /// Set the default session TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Set the maximum session TTL.
    pub fn with_max_ttl(mut self, ttl: Duration) -> Self {
        self.max_ttl = ttl;
        self
    }

    /// Set the reserved flash key.
    pub fn with_flash_key(mut self, key: impl Into<String>) -> Self {
        self.flash_key = key.into();
        self
    }

    /// Set the prefix used for flashed form input.
    pub fn with_old_input_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.old_input_prefix = prefix.into();
        self
    }

    /// Set the reserved previous-URI key.
    pub fn with_previous_uri_key(mut self, key: impl Into<String>) -> Self {
        self.previous_uri_key = key.into();
        self
    }

    /// Effective TTL for a requested value, capped at `max_ttl`.
    pub fn effective_ttl(&self, requested: Option<Duration>) -> Duration {
        requested.unwrap_or(self.default_ttl).min(self.max_ttl)
    }

    /// Build the storage key with namespace.
    pub fn session_key(&self, session_id: &str) -> String {
        format!("{}:{}", self.namespace, session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.cookie_name, "trellis_session");
        assert_eq!(config.flash_key, "_flash");
        assert_eq!(config.old_input_prefix, "_old_input.");
        assert_eq!(config.previous_uri_key, "_previous_uri");
    }

    #[test]
    fn test_session_key() {
        let config = SessionConfig::new().with_namespace("shop");
        assert_eq!(config.session_key("abc"), "shop:abc");
    }

    #[test]
    fn test_effective_ttl_is_capped() {
        let config = SessionConfig::new()
            .with_default_ttl(Duration::from_secs(60))
            .with_max_ttl(Duration::from_secs(120));

        assert_eq!(config.effective_ttl(None), Duration::from_secs(60));
        assert_eq!(
            config.effective_ttl(Some(Duration::from_secs(600))),
            Duration::from_secs(120)
        );
    }
}
