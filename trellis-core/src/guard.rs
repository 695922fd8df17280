// Guards run before dispatch

use crate::{Error, HttpRequest};
use http::Method;
use trellis_session::Session;

/// What a guard can inspect before the handler runs.
pub struct GuardContext<'a> {
    pub request: &'a HttpRequest,
    /// Effective method, overrides applied.
    pub method: &'a Method,
    /// Normalized path.
    pub uri: &'a str,
    pub session: &'a Session,
}

impl<'a> GuardContext<'a> {
    pub fn new(
        request: &'a HttpRequest,
        method: &'a Method,
        uri: &'a str,
        session: &'a Session,
    ) -> Self {
        Self {
            request,
            method,
            uri,
            session,
        }
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.request.header(name)
    }
}

/// Pre-dispatch check.
///
/// `Ok(false)` rejects with `403 Forbidden`; an `Err` is surfaced as is, so
/// a guard can pick its own status.
pub trait Guard: Send + Sync {
    /// Determine if the request can proceed
    fn can_activate(&self, context: &GuardContext<'_>) -> Result<bool, Error>;

    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Custom guard builder
pub struct CustomGuard<F>
where
    F: Fn(&GuardContext<'_>) -> Result<bool, Error> + Send + Sync,
{
    predicate: F,
}

impl<F> CustomGuard<F>
where
    F: Fn(&GuardContext<'_>) -> Result<bool, Error> + Send + Sync,
{
    pub fn new(predicate: F) -> Self {
        Self { predicate }
    }
}

impl<F> Guard for CustomGuard<F>
where
    F: Fn(&GuardContext<'_>) -> Result<bool, Error> + Send + Sync,
{
    fn can_activate(&self, context: &GuardContext<'_>) -> Result<bool, Error> {
        (self.predicate)(context)
    }

    fn name(&self) -> &str {
        "CustomGuard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_session::SessionConfig;

    #[test]
    fn test_custom_guard() {
        let guard = CustomGuard::new(|ctx: &GuardContext<'_>| {
            Ok(ctx.get_header("x-api-key") == Some("secret"))
        });

        let session = Session::start(&SessionConfig::default());
        let allowed = HttpRequest::get("/").with_header("X-Api-Key", "secret");
        let denied = HttpRequest::get("/");

        let ctx = GuardContext::new(&allowed, &Method::GET, "/", &session);
        assert!(guard.can_activate(&ctx).unwrap());

        let ctx = GuardContext::new(&denied, &Method::GET, "/", &session);
        assert!(!guard.can_activate(&ctx).unwrap());
        assert_eq!(guard.name(), "CustomGuard");
    }
}
