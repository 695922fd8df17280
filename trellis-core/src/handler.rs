// Handler capability and its output union
//
// A handler is a plain synchronous function of the bound path parameters and
// the per-request context. It returns an `Output`, and may additionally write
// to the response through the context.

use crate::{Error, RequestContext};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Type-erased route handler.
pub type Handler =
    Arc<dyn Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error> + Send + Sync>;

/// Wrap a closure or function as a [`Handler`].
///
/// # Example
///
/// ```
/// use trellis_core::{handler, Output};
///
/// let show = handler(|params, _ctx| {
///     Ok(format!("user {}", params.get("id").unwrap_or("?")).into())
/// });
/// # let _ = show;
/// ```
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Value returned by a handler.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Output {
    /// Ready-to-send text.
    Text(String),
    /// Structured value, serialized as JSON when emitted.
    Json(serde_json::Value),
    /// Nothing beyond what the handler wrote to the context.
    #[default]
    Empty,
}

impl Output {
    /// Serialize any value into [`Output::Json`].
    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        serde_json::to_value(value)
            .map(Output::Json)
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Output::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Empty)
    }
}

impl From<String> for Output {
    fn from(text: String) -> Self {
        Output::Text(text)
    }
}

impl From<&str> for Output {
    fn from(text: &str) -> Self {
        Output::Text(text.to_string())
    }
}

impl From<serde_json::Value> for Output {
    fn from(value: serde_json::Value) -> Self {
        Output::Json(value)
    }
}

impl From<()> for Output {
    fn from(_: ()) -> Self {
        Output::Empty
    }
}

/// Placeholder values bound by a route match, already percent-decoded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: HashMap<String, String>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.insert(name.into(), value.into());
    }

    /// Get a parameter by name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Parse a parameter, failing with `BadRequest` when absent or malformed.
    pub fn parse<T>(&self, name: &str) -> Result<T, Error>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        let raw = self
            .get(name)
            .ok_or_else(|| Error::BadRequest(format!("missing route parameter '{}'", name)))?;
        raw.parse()
            .map_err(|e| Error::BadRequest(format!("invalid route parameter '{}': {}", name, e)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RouteParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Named handlers that route definition files refer to.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under a name such as `"UserController@show"`.
    pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
            + Send
            + Sync
            + 'static,
    {
        self.handlers.insert(name.into(), handler(f));
        self
    }

    /// Builder form of [`register`](HandlerRegistry::register).
    pub fn with<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
            + Send
            + Sync
            + 'static,
    {
        self.register(name, f);
        self
    }

    pub fn get(&self, name: &str) -> Option<Handler> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry")
            .field("handlers", &names)
            .finish()
    }
}
