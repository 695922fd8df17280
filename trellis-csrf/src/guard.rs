// Session-bound CSRF guard

use crate::config::CsrfConfig;
use crate::error::{CsrfError, Result};
use crate::token::{generate_token, tokens_match};
use std::sync::Arc;
use trellis_core::{ApplicationBuilder, Guard, GuardContext, HttpRequest, RequestContext};
use trellis_log::{debug, warn};
use trellis_session::Session;

/// Registry name the guard is published under.
pub const SERVICE_NAME: &str = "csrf";

/// Issues one token per session and checks it on state-changing requests.
///
/// The token lives under a direct session key, so it survives across
/// requests and is dropped together with everything else when the session
/// is invalidated.
#[derive(Debug, Clone)]
pub struct CsrfGuard {
    config: CsrfConfig,
}

impl Default for CsrfGuard {
    fn default() -> Self {
        Self {
            config: CsrfConfig::default(),
        }
    }
}

impl CsrfGuard {
    pub fn new(config: CsrfConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// Current token for the session, minting one on first use.
    ///
    /// Calling it again within the same session lifetime returns the same
    /// token.
    pub fn generate(&self, session: &mut Session) -> Result<String> {
        if let Some(existing) = self.token(session) {
            return Ok(existing);
        }
        self.regenerate(session)
    }

    /// Replace the session's token, e.g. after login.
    pub fn regenerate(&self, session: &mut Session) -> Result<String> {
        let token = generate_token(self.config.token_bytes)?;
        session.put(&self.config.session_key, &token)?;
        debug!("Issued CSRF token for session {}", session.id());
        Ok(token)
    }

    /// Token stored in the session, without minting.
    pub fn token(&self, session: &Session) -> Option<String> {
        session.get::<String>(&self.config.session_key)
    }

    /// Hidden form field carrying the session's token.
    pub fn csrf_field(&self, session: &mut Session) -> Result<String> {
        let token = self.generate(session)?;
        Ok(format!(
            r#"<input type="hidden" name="{}" value="{}">"#,
            self.config.field_name, token
        ))
    }

    /// Compare a submitted token against the session's.
    pub fn validate(&self, session: &Session, submitted: Option<&str>) -> Result<()> {
        let expected = self.token(session).ok_or(CsrfError::MissingToken)?;
        let submitted = submitted.ok_or(CsrfError::MissingToken)?;

        if tokens_match(&expected, submitted) {
            Ok(())
        } else {
            Err(CsrfError::Mismatch)
        }
    }

    /// Pull the token from the form field, falling back to the header.
    pub fn submitted_token(&self, request: &HttpRequest) -> Option<String> {
        request
            .input(&self.config.field_name)
            .or_else(|| request.header(&self.config.header_name).map(str::to_string))
    }

    pub fn validate_request(&self, request: &HttpRequest, session: &Session) -> Result<()> {
        let submitted = self.submitted_token(request);
        self.validate(session, submitted.as_deref())
    }
}

impl Guard for CsrfGuard {
    fn can_activate(&self, context: &GuardContext<'_>) -> trellis_core::Result<bool> {
        if !self.config.needs_protection(context.method, context.uri) {
            return Ok(true);
        }

        self.validate_request(context.request, context.session)
            .inspect_err(|e| {
                warn!("CSRF check failed for {} {}: {}", context.method, context.uri, e)
            })?;
        Ok(true)
    }

    fn name(&self) -> &str {
        "CsrfGuard"
    }
}

/// Wire the guard into an application.
pub trait CsrfApplicationExt {
    /// Check every unsafe request and publish the guard as the `csrf` service.
    fn csrf(self, guard: CsrfGuard) -> Self;
}

impl CsrfApplicationExt for ApplicationBuilder {
    fn csrf(self, guard: CsrfGuard) -> Self {
        self.service(SERVICE_NAME, guard.clone()).guard(guard)
    }
}

/// Token helpers for handlers.
pub trait CsrfContextExt {
    fn csrf_token(&mut self) -> trellis_core::Result<String>;
    fn csrf_field(&mut self) -> trellis_core::Result<String>;
}

impl CsrfContextExt for RequestContext<'_> {
    fn csrf_token(&mut self) -> trellis_core::Result<String> {
        let guard: Arc<CsrfGuard> = self.service(SERVICE_NAME)?;
        Ok(guard.generate(self.session_mut())?)
    }

    fn csrf_field(&mut self) -> trellis_core::Result<String> {
        let guard: Arc<CsrfGuard> = self.service(SERVICE_NAME)?;
        Ok(guard.csrf_field(self.session_mut())?)
    }
}
