// Per-request context handed to handlers

use crate::{Error, HttpRequest, Registry};
use http::Method;
use serde::{Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::sync::Arc;
use trellis_log::warn;
use trellis_session::Session;
use trellis_validation::{MessageBag, ValidationErrors};

/// Registry name of the validation message bag.
pub const ERRORS_KEY: &str = "errors";

/// Registry name of the framework configuration.
pub const CONFIG_KEY: &str = "config";

/// Form fields never flashed back as old input.
const UNFLASHED_FIELDS: [&str; 2] = ["_token", "_method"];

/// Everything a handler can see and touch for one request.
///
/// The context borrows the request and the session for the length of the
/// handler call and owns the request's [`Registry`]. Besides returning an
/// [`Output`](crate::Output), a handler may write the response directly
/// through [`write`](RequestContext::write), [`render`](RequestContext::render)
/// or the redirect helpers.
pub struct RequestContext<'a> {
    request: &'a HttpRequest,
    session: &'a mut Session,
    registry: Registry,
    method: Method,
    uri: String,
    json: bool,
    response: ResponseParts,
}

/// Response state written by a handler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseParts {
    pub status: Option<u16>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ResponseParts {
    /// Check if a header was set, case-insensitively.
    pub fn has_header(&self, name: &str) -> bool {
        self.headers.keys().any(|k| k.eq_ignore_ascii_case(name))
    }
}

impl<'a> RequestContext<'a> {
    /// Context for `request`. An unparsable verb is treated as `GET` here;
    /// [`Application`](crate::Application) rejects it with 400 before a
    /// context is ever built.
    pub fn new(request: &'a HttpRequest, session: &'a mut Session, registry: Registry) -> Self {
        let method = request.method().unwrap_or_else(|e| {
            warn!("{}; treating request as GET", e);
            Method::GET
        });
        Self {
            method,
            uri: request.uri(),
            json: request.is_json_request(),
            request,
            session,
            registry,
            response: ResponseParts::default(),
        }
    }

    /// Replace the effective method, e.g. after applying configured
    /// override names.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    // ========== Request ==========

    pub fn request(&self) -> &HttpRequest {
        self.request
    }

    /// Effective method, overrides applied.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Normalized request path.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn is_json_request(&self) -> bool {
        self.json
    }

    // ========== Session ==========

    pub fn session(&self) -> &Session {
        &*self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut *self.session
    }

    /// Flash a value for the next request.
    pub fn flash<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), Error> {
        Ok(self.session.flash(key, value)?)
    }

    /// Consume a value flashed by the previous request.
    pub fn take_flash<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.session.take_flash(key)
    }

    /// Consume one field of the previous request's input.
    pub fn old<T: DeserializeOwned>(&mut self, key: &str) -> Option<T> {
        self.session.old_input(key)
    }

    // ========== Registry ==========

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Fetch a registered service.
    pub fn service<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, Error> {
        self.registry.get(name)
    }

    /// Validation messages flashed by the previous request.
    ///
    /// Empty when the application did not register a bag.
    pub fn errors(&self) -> Arc<MessageBag> {
        self.registry
            .get::<MessageBag>(ERRORS_KEY)
            .unwrap_or_else(|_| Arc::new(MessageBag::new()))
    }

    // ========== Response ==========

    /// Append raw bytes to the response body.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        self.response.body.extend_from_slice(bytes.as_ref());
    }

    /// Append rendered HTML to the response body.
    pub fn render(&mut self, html: impl AsRef<str>) {
        if !self.response.has_header("Content-Type") {
            self.set_header("Content-Type", "text/html; charset=utf-8");
        }
        self.write(html.as_ref());
    }

    pub fn set_status(&mut self, status: u16) {
        self.response.status = Some(status);
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.response.headers.insert(name.into(), value.into());
    }

    /// Answer with `302 Found` to `location`.
    pub fn redirect(&mut self, location: impl Into<String>) {
        self.set_status(302);
        self.set_header("Location", location);
    }

    /// Redirect to the page served before this request, or `/`.
    pub fn redirect_back(&mut self) {
        let location = self.session.previous_uri().unwrap_or_else(|| "/".to_string());
        self.redirect(location);
    }

    /// Flash validation errors plus the submitted form and redirect back.
    ///
    /// The next page sees the messages through [`errors`](RequestContext::errors)
    /// and the fields through [`old`](RequestContext::old).
    pub fn fail_validation(&mut self, errors: ValidationErrors) -> Result<(), Error> {
        let input: Vec<(String, String)> = self
            .request
            .form()
            .map(|form| {
                form.into_iter()
                    .filter(|(key, _)| !UNFLASHED_FIELDS.contains(&key.as_str()))
                    .collect()
            })
            .unwrap_or_default();

        errors.flash(&mut *self.session, input)?;
        self.redirect_back();
        Ok(())
    }

    pub fn response(&self) -> &ResponseParts {
        &self.response
    }

    /// Release the borrows and keep what the handler wrote.
    pub fn finish(self) -> ResponseParts {
        self.response
    }
}
