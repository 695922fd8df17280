// HTTP request and response types

use crate::negotiation::Accept;
use crate::routing::normalize_path;
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Verbs a `POST` may be rewritten to through the override convention.
///
/// Safe verbs are excluded so an override can never turn a form submission
/// into a request that skips CSRF checks.
const OVERRIDABLE_METHODS: [Method; 3] = [Method::PUT, Method::PATCH, Method::DELETE];

/// Where a `POST` request may carry the verb it stands in for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodOverride {
    /// Form field name, `_method` by default.
    pub field: String,
    /// Header name, `X-HTTP-Method-Override` by default.
    pub header: String,
}

impl Default for MethodOverride {
    fn default() -> Self {
        Self {
            field: "_method".to_string(),
            header: "X-HTTP-Method-Override".to_string(),
        }
    }
}

/// HTTP request wrapper
///
/// `path` holds the raw request target, query string included; the
/// normalized form is available through [`uri`](HttpRequest::uri).
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
    pub query_params: HashMap<String, String>,
}

impl HttpRequest {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        let query_params = path
            .split_once('?')
            .map(|(_, query)| parse_query_string(query.split('#').next().unwrap_or_default()))
            .unwrap_or_default();

        Self {
            method: method.into(),
            path,
            headers: HashMap::new(),
            body: Vec::new(),
            query_params,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new("GET", path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new("POST", path)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Set an urlencoded form body.
    pub fn with_form<T: Serialize>(mut self, form: &T) -> Result<Self, crate::Error> {
        let encoded = serde_urlencoded::to_string(form)
            .map_err(|e| crate::Error::Serialization(e.to_string()))?;
        self.body = encoded.into_bytes();
        self.headers.insert(
            "Content-Type".to_string(),
            "application/x-www-form-urlencoded".to_string(),
        );
        Ok(self)
    }

    /// Set a JSON body.
    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, crate::Error> {
        self.body =
            serde_json::to_vec(value).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    // ========== Facade ==========

    /// Normalized path: query and fragment stripped, single leading slash,
    /// no trailing slash.
    pub fn uri(&self) -> String {
        normalize_path(&self.path)
    }

    /// Canonical upper-case verb, honouring the default override names.
    pub fn method(&self) -> crate::Result<Method> {
        self.method_with(&MethodOverride::default())
    }

    /// Canonical upper-case verb with explicit override names.
    ///
    /// Only a `POST` can be overridden, and only to `PUT`, `PATCH` or
    /// `DELETE`. The form field wins over the header. Anything else is
    /// ignored. A request line verb that is not a valid token is a
    /// [`BadRequest`](crate::Error::BadRequest).
    pub fn method_with(&self, overrides: &MethodOverride) -> crate::Result<Method> {
        let raw = self.method.trim();
        let method = Method::from_bytes(raw.to_ascii_uppercase().as_bytes())
            .map_err(|_| crate::Error::BadRequest(format!("invalid method '{}'", raw)))?;

        if method != Method::POST {
            return Ok(method);
        }

        let requested = self
            .input(&overrides.field)
            .or_else(|| self.header(&overrides.header).map(str::to_string));

        Ok(requested
            .and_then(|verb| Method::from_bytes(verb.trim().to_ascii_uppercase().as_bytes()).ok())
            .filter(|verb| OVERRIDABLE_METHODS.contains(verb))
            .unwrap_or(method))
    }

    /// Whether the client negotiated a JSON response.
    pub fn is_json_request(&self) -> bool {
        if self
            .header("X-Requested-With")
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        {
            return true;
        }

        self.header("Accept")
            .map(|accept| Accept::parse(accept).prefers_json())
            .unwrap_or(false)
    }

    // ========== Accessors ==========

    /// Header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Get a query parameter by name
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params.get(name).map(String::as_str)
    }

    /// Parse the body as an urlencoded form.
    pub fn form(&self) -> Result<HashMap<String, String>, crate::Error> {
        serde_urlencoded::from_bytes::<Vec<(String, String)>>(&self.body)
            .map(|pairs| pairs.into_iter().collect())
            .map_err(|e| crate::Error::Deserialization(e.to_string()))
    }

    /// Form field from an urlencoded body.
    pub fn input(&self, name: &str) -> Option<String> {
        if !self.has_form_body() {
            return None;
        }
        self.form().ok()?.remove(name)
    }

    /// Parse the request body as JSON
    pub fn json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, crate::Error> {
        serde_json::from_slice(&self.body).map_err(|e| crate::Error::Deserialization(e.to_string()))
    }

    /// Cookie value from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.header("Cookie")?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim_matches('"'))
    }

    /// Absolute URL for `uri` on the host this request was sent to.
    pub fn url(&self, uri: &str) -> String {
        let scheme = match self.header("X-Forwarded-Proto") {
            Some(proto) if proto.eq_ignore_ascii_case("https") => "https",
            _ => "http",
        };
        let host = self.header("Host").unwrap_or("localhost");
        format!("{}://{}/{}", scheme, host, sanitize_uri(uri))
    }

    /// Absolute URL of this request.
    pub fn current_url(&self) -> String {
        self.url(&self.uri())
    }

    fn has_form_body(&self) -> bool {
        !self.body.is_empty()
            && self.header("Content-Type").is_none_or(|ct| {
                ct.to_ascii_lowercase()
                    .starts_with("application/x-www-form-urlencoded")
            })
    }
}

/// Drop a leading slash and every character outside the URL-safe set.
pub fn sanitize_uri(uri: &str) -> String {
    uri.strip_prefix('/')
        .unwrap_or(uri)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "$-_.+!*'(),{}|\\^~[]`<>#%\";/?:@&=".contains(*c))
        .collect()
}

/// Parse query string into a map
pub fn parse_query_string(query: &str) -> HashMap<String, String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .map(|pairs| pairs.into_iter().collect())
        .unwrap_or_default()
}

/// HTTP response wrapper
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn ok() -> Self {
        Self::new(200)
    }

    pub fn not_found() -> Self {
        Self::new(404)
    }

    pub fn internal_server_error() -> Self {
        Self::new(500)
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_header("Content-Type", "text/plain; charset=utf-8")
            .with_body(text.into())
    }

    pub fn with_json<T: Serialize>(mut self, value: &T) -> Result<Self, crate::Error> {
        self.body =
            serde_json::to_vec(value).map_err(|e| crate::Error::Serialization(e.to_string()))?;
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Header value, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Body as UTF-8 text, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status)
    }
}
