// Routing system for HTTP requests

use crate::{Error, Handler, Output, RequestContext, RouteParams, handler};
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use trellis_log::{debug, trace};

/// Normalize a request target for matching.
///
/// Strips the query string and fragment, collapses repeated slashes, drops
/// the trailing slash and guarantees a single leading one.
///
/// ```
/// use trellis_core::routing::normalize_path;
///
/// assert_eq!(normalize_path("//users//42/?page=2"), "/users/42");
/// assert_eq!(normalize_path(""), "/");
/// ```
pub fn normalize_path(path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", segments.join("/"))
}

fn split_segments(normalized: &str) -> Vec<&str> {
    normalized.split('/').filter(|s| !s.is_empty()).collect()
}

/// One segment of a route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Param(String),
}

/// Parsed route template such as `/users/{id}/posts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    template: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    /// Parse a template. Placeholders are whole segments written `{name}`,
    /// with names made of ASCII letters, digits and `_`, each used once.
    pub fn parse(template: &str) -> Result<Self, Error> {
        let template = template.trim();
        if !template.starts_with('/') {
            return Err(Error::RouteLoad(format!(
                "pattern '{}' must start with '/'",
                template
            )));
        }
        if template.contains(['?', '#']) {
            return Err(Error::RouteLoad(format!(
                "pattern '{}' must not contain a query or fragment",
                template
            )));
        }

        let mut seen = HashSet::new();
        let mut segments = Vec::new();

        for raw in split_segments(template) {
            let segment = match raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => {
                    if name.is_empty()
                        || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
                    {
                        return Err(Error::RouteLoad(format!(
                            "invalid placeholder '{}' in pattern '{}'",
                            raw, template
                        )));
                    }
                    if !seen.insert(name) {
                        return Err(Error::RouteLoad(format!(
                            "placeholder '{}' appears twice in pattern '{}'",
                            name, template
                        )));
                    }
                    Segment::Param(name.to_string())
                }
                None if raw.contains(['{', '}']) => {
                    return Err(Error::RouteLoad(format!(
                        "placeholder '{}' must span the whole segment in pattern '{}'",
                        raw, template
                    )));
                }
                None => Segment::Literal(raw.to_string()),
            };
            segments.push(segment);
        }

        Ok(Self {
            template: normalize_path(template),
            segments,
        })
    }

    /// Normalized template text.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Placeholder names in order of appearance.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Structural match against the segments of a normalized path.
    ///
    /// Literals compare exactly; placeholders take any non-empty segment and
    /// bind its percent-decoded value.
    pub fn match_segments(&self, path: &[&str]) -> Option<RouteParams> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = RouteParams::new();
        for (segment, value) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(literal) if literal == value => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    let decoded = urlencoding::decode(value)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| value.to_string());
                    params.insert(name.clone(), decoded);
                }
            }
        }
        Some(params)
    }

    /// Match a raw path, normalizing it first.
    pub fn matches(&self, path: &str) -> Option<RouteParams> {
        let normalized = normalize_path(path);
        self.match_segments(&split_segments(&normalized))
    }

    /// Fill the placeholders, percent-encoding each value.
    pub fn build(&self, params: &[(&str, &str)]) -> Option<String> {
        let mut parts = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(literal) => parts.push(literal.clone()),
                Segment::Param(name) => {
                    let value = params.iter().find(|(k, _)| k == name)?.1;
                    parts.push(urlencoding::encode(value).into_owned());
                }
            }
        }
        Some(format!("/{}", parts.join("/")))
    }
}

impl FromStr for RoutePattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

/// Route definition
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: RoutePattern,
    pub handler: Handler,
    pub name: Option<String>,
}

impl Route {
    pub fn new(method: Method, path: &str, handler: Handler) -> Result<Self, Error> {
        Ok(Self {
            method,
            pattern: RoutePattern::parse(path)?,
            handler,
            name: None,
        })
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.template())
            .field("name", &self.name)
            .finish()
    }
}

/// Ordered list of routes. Declaration order decides precedence.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route.
    pub fn add(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Builder form of [`add`](RouteTable::add) for a closure handler.
    pub fn route<F>(mut self, method: Method, path: &str, f: F) -> Result<Self, Error>
    where
        F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
            + Send
            + Sync
            + 'static,
    {
        self.add(Route::new(method, path, handler(f))?);
        Ok(self)
    }

    pub fn get<F>(self, path: &str, f: F) -> Result<Self, Error>
    where
        F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
            + Send
            + Sync
            + 'static,
    {
        self.route(Method::GET, path, f)
    }

    pub fn post<F>(self, path: &str, f: F) -> Result<Self, Error>
    where
        F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
            + Send
            + Sync
            + 'static,
    {
        self.route(Method::POST, path, f)
    }

    pub fn put<F>(self, path: &str, f: F) -> Result<Self, Error>
    where
        F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
            + Send
            + Sync
            + 'static,
    {
        self.route(Method::PUT, path, f)
    }

    pub fn patch<F>(self, path: &str, f: F) -> Result<Self, Error>
    where
        F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
            + Send
            + Sync
            + 'static,
    {
        self.route(Method::PATCH, path, f)
    }

    pub fn delete<F>(self, path: &str, f: F) -> Result<Self, Error>
    where
        F: Fn(&RouteParams, &mut RequestContext<'_>) -> Result<Output, Error>
            + Send
            + Sync
            + 'static,
    {
        self.route(Method::DELETE, path, f)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Path of a named route with its placeholders filled in.
    pub fn path_for(&self, name: &str, params: &[(&str, &str)]) -> Option<String> {
        self.routes
            .iter()
            .find(|route| route.name.as_deref() == Some(name))
            .and_then(|route| route.pattern.build(params))
    }
}

/// How a path that matches some routes but not the request method is
/// classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPolicy {
    /// Scan every route: 404 only when no route matches the path for any
    /// method, 405 when some do but none for this method.
    #[default]
    ScanAll,
    /// Stop at the first route matching the path; its method alone decides
    /// between dispatch and 405.
    FirstStructural,
}

impl FromStr for MatchPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "scan_all" => Ok(MatchPolicy::ScanAll),
            "first_structural" => Ok(MatchPolicy::FirstStructural),
            other => Err(Error::Config(format!("unknown match policy '{}'", other))),
        }
    }
}

/// A route selected for a request.
#[derive(Debug)]
pub struct RouteMatch<'r> {
    pub route: &'r Route,
    pub params: RouteParams,
}

/// Dispatches requests over a [`RouteTable`].
///
/// Lookup is a pure function of the table, the policy, the path and the
/// method.
#[derive(Debug, Clone)]
pub struct Router {
    table: RouteTable,
    policy: MatchPolicy,
    head_fallback: bool,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(RouteTable::default())
    }
}

impl Router {
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            policy: MatchPolicy::default(),
            head_fallback: true,
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Let `GET` routes answer `HEAD` requests (on by default).
    ///
    /// When off, `HEAD` is only served by explicit `HEAD` routes and is not
    /// advertised in `Allow` for `GET`-only paths.
    pub fn with_head_fallback(mut self, enabled: bool) -> Self {
        self.head_fallback = enabled;
        self
    }

    pub fn policy(&self) -> MatchPolicy {
        self.policy
    }

    pub fn head_fallback(&self) -> bool {
        self.head_fallback
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Select the route for `path` and `method` without running it.
    ///
    /// Unless disabled with [`with_head_fallback`](Router::with_head_fallback),
    /// a `HEAD` request is served by a `GET` route when no `HEAD` route
    /// matches the path.
    pub fn resolve(&self, path: &str, method: &Method) -> Result<RouteMatch<'_>, Error> {
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);

        let mut allowed: Vec<Method> = Vec::new();
        let mut get_fallback = None;

        for route in self.table.routes() {
            let Some(params) = route.pattern.match_segments(&segments) else {
                continue;
            };

            if route.method == *method {
                return Ok(RouteMatch { route, params });
            }

            let serves_head = self.head_fallback && route.method == Method::GET;
            if *method == Method::HEAD && serves_head && get_fallback.is_none() {
                get_fallback = Some(RouteMatch { route, params });
            } else if !allowed.contains(&route.method) {
                allowed.push(route.method.clone());
            }

            if self.policy == MatchPolicy::FirstStructural {
                break;
            }
        }

        if let Some(fallback) = get_fallback {
            return Ok(fallback);
        }

        if allowed.is_empty() {
            Err(Error::RouteNotFound(normalized))
        } else {
            Err(Error::MethodNotAllowed {
                method: method.clone(),
                path: normalized,
                allowed: self.advertised(allowed),
            })
        }
    }

    /// Run the handler selected for `path` and `method`, returning its output
    /// untouched.
    pub fn dispatch(
        &self,
        path: &str,
        method: &Method,
        ctx: &mut RequestContext<'_>,
    ) -> Result<Output, Error> {
        let matched = self.resolve(path, method).inspect_err(|e| {
            debug!("No dispatch for {} {}: {}", method, path, e);
        })?;

        trace!(
            "Dispatching {} {} to {}",
            method,
            path,
            matched.route.name.as_deref().unwrap_or(matched.route.pattern.template())
        );

        (matched.route.handler)(&matched.params, ctx)
    }

    /// Methods of every route whose pattern matches `path`, in declaration
    /// order. `HEAD` is listed whenever `GET` is and the fallback is on.
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let normalized = normalize_path(path);
        let segments = split_segments(&normalized);

        let mut methods: Vec<Method> = Vec::new();
        for route in self.table.routes() {
            if route.pattern.match_segments(&segments).is_some() && !methods.contains(&route.method)
            {
                methods.push(route.method.clone());
            }
        }
        self.advertised(methods)
    }

    fn advertised(&self, mut methods: Vec<Method>) -> Vec<Method> {
        if self.head_fallback && methods.contains(&Method::GET) && !methods.contains(&Method::HEAD)
        {
            methods.push(Method::HEAD);
        }
        methods
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HttpRequest, Registry};
    use trellis_session::{Session, SessionConfig};

    fn text(s: &'static str) -> Handler {
        handler(move |_, _| Ok(Output::from(s)))
    }

    fn dispatch(router: &Router, method: Method, path: &str) -> Result<Output, Error> {
        let request = HttpRequest::new(method.as_str(), path);
        let mut session = Session::start(&SessionConfig::default());
        let mut ctx = RequestContext::new(&request, &mut session, Registry::new());
        router.dispatch(path, &method, &mut ctx)
    }

    fn table(routes: &[(Method, &str, &'static str)]) -> RouteTable {
        let mut table = RouteTable::new();
        for (method, path, body) in routes {
            table.add(Route::new(method.clone(), path, text(*body)).unwrap());
        }
        table
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/users/"), "/users");
        assert_eq!(normalize_path("users"), "/users");
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("///"), "/");
        assert_eq!(normalize_path("/a#frag"), "/a");
    }

    #[test]
    fn test_pattern_parse() {
        let pattern = RoutePattern::parse("/users/{id}/posts/{post_id}/").unwrap();
        assert_eq!(pattern.template(), "/users/{id}/posts/{post_id}");
        assert_eq!(pattern.param_names().collect::<Vec<_>>(), vec!["id", "post_id"]);
    }

    #[test]
    fn test_pattern_parse_errors() {
        assert!(matches!(RoutePattern::parse("users"), Err(Error::RouteLoad(_))));
        assert!(matches!(RoutePattern::parse("/users/{}"), Err(Error::RouteLoad(_))));
        assert!(matches!(RoutePattern::parse("/users/{my-id}"), Err(Error::RouteLoad(_))));
        assert!(matches!(RoutePattern::parse("/a/{id}/b/{id}"), Err(Error::RouteLoad(_))));
        assert!(matches!(RoutePattern::parse("/users/id{id}"), Err(Error::RouteLoad(_))));
        assert!(matches!(RoutePattern::parse("/users?x=1"), Err(Error::RouteLoad(_))));
    }

    #[test]
    fn test_pattern_matching() {
        let pattern = RoutePattern::parse("/users/{id}").unwrap();
        assert_eq!(pattern.matches("/users/42").unwrap().get("id"), Some("42"));
        assert_eq!(pattern.matches("/users/42/?x=y").unwrap().get("id"), Some("42"));
        assert!(pattern.matches("/users").is_none());
        assert!(pattern.matches("/users/42/edit").is_none());
        assert!(pattern.matches("/Users/42").is_none());
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let pattern = RoutePattern::parse("/tags/{tag}").unwrap();
        assert_eq!(pattern.matches("/tags/rust%20lang").unwrap().get("tag"), Some("rust lang"));
    }

    #[test]
    fn test_root_pattern() {
        let pattern = RoutePattern::parse("/").unwrap();
        assert!(pattern.matches("").is_some());
        assert!(pattern.matches("/?q=1").is_some());
        assert!(pattern.matches("/a").is_none());
    }

    #[test]
    fn test_dispatch_binds_params() {
        let table = RouteTable::new()
            .get("/users/{id}", |params, _| {
                Ok(format!("user {}", params.get("id").unwrap_or_default()).into())
            })
            .unwrap();
        let router = Router::new(table);

        assert_eq!(
            dispatch(&router, Method::GET, "/users/42").unwrap(),
            Output::Text("user 42".into())
        );
    }

    #[test]
    fn test_not_found_and_method_not_allowed() {
        let router = Router::new(table(&[(Method::POST, "/login", "login")]));

        match dispatch(&router, Method::GET, "/login") {
            Err(Error::MethodNotAllowed { allowed, .. }) => assert_eq!(allowed, vec![Method::POST]),
            other => panic!("expected 405, got {:?}", other),
        }
        assert!(matches!(
            dispatch(&router, Method::GET, "/unknown"),
            Err(Error::RouteNotFound(path)) if path == "/unknown"
        ));
    }

    #[test]
    fn test_declaration_order_wins() {
        let router = Router::new(table(&[
            (Method::GET, "/posts/{slug}", "by slug"),
            (Method::GET, "/posts/latest", "latest"),
        ]));
        assert_eq!(
            dispatch(&router, Method::GET, "/posts/latest").unwrap(),
            Output::Text("by slug".into())
        );
    }

    #[test]
    fn test_scan_all_finds_later_method_match() {
        let router = Router::new(table(&[
            (Method::POST, "/items/{id}", "update"),
            (Method::GET, "/items/{id}", "show"),
        ]));
        assert_eq!(router.policy(), MatchPolicy::ScanAll);
        assert_eq!(
            dispatch(&router, Method::GET, "/items/1").unwrap(),
            Output::Text("show".into())
        );
    }

    #[test]
    fn test_first_structural_stops_at_first_match() {
        let router = Router::new(table(&[
            (Method::POST, "/items/{id}", "update"),
            (Method::GET, "/items/{id}", "show"),
        ]))
        .with_policy(MatchPolicy::FirstStructural);

        match dispatch(&router, Method::GET, "/items/1") {
            Err(Error::MethodNotAllowed { allowed, .. }) => assert_eq!(allowed, vec![Method::POST]),
            other => panic!("expected 405, got {:?}", other),
        }
        assert_eq!(
            dispatch(&router, Method::POST, "/items/1").unwrap(),
            Output::Text("update".into())
        );
        assert!(matches!(
            dispatch(&router, Method::GET, "/nothing"),
            Err(Error::RouteNotFound(_))
        ));
    }

    #[test]
    fn test_head_falls_back_to_get() {
        let router = Router::new(table(&[(Method::GET, "/", "home")]));
        assert_eq!(
            dispatch(&router, Method::HEAD, "/").unwrap(),
            Output::Text("home".into())
        );

        let router = Router::new(table(&[
            (Method::GET, "/", "home"),
            (Method::HEAD, "/", "head"),
        ]));
        assert_eq!(
            dispatch(&router, Method::HEAD, "/").unwrap(),
            Output::Text("head".into())
        );
    }

    #[test]
    fn test_strict_head_classification() {
        let router = Router::new(table(&[(Method::GET, "/", "home")])).with_head_fallback(false);
        match dispatch(&router, Method::HEAD, "/") {
            Err(Error::MethodNotAllowed { allowed, .. }) => assert_eq!(allowed, vec![Method::GET]),
            other => panic!("expected 405, got {:?}", other),
        }
        assert_eq!(router.allowed_methods("/"), vec![Method::GET]);

        let router = Router::new(table(&[
            (Method::GET, "/", "home"),
            (Method::HEAD, "/", "head"),
        ]))
        .with_head_fallback(false);
        assert_eq!(
            dispatch(&router, Method::HEAD, "/").unwrap(),
            Output::Text("head".into())
        );
    }

    #[test]
    fn test_allowed_methods() {
        let router = Router::new(table(&[
            (Method::GET, "/posts", "index"),
            (Method::POST, "/posts", "store"),
            (Method::GET, "/posts", "duplicate"),
        ]));
        assert_eq!(
            router.allowed_methods("/posts/"),
            vec![Method::GET, Method::POST, Method::HEAD]
        );
        assert!(router.allowed_methods("/nope").is_empty());

        match dispatch(&router, Method::DELETE, "/posts") {
            Err(Error::MethodNotAllowed { allowed, .. }) => {
                assert_eq!(allowed, vec![Method::GET, Method::POST, Method::HEAD])
            }
            other => panic!("expected 405, got {:?}", other),
        }
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let router = Router::new(table(&[(Method::GET, "/a/{x}", "a")]));
        for _ in 0..3 {
            let matched = router.resolve("/a/1", &Method::GET).unwrap();
            assert_eq!(matched.params.get("x"), Some("1"));
            assert!(router.resolve("/b", &Method::GET).is_err());
        }
    }

    #[test]
    fn test_path_for_named_route() {
        let mut table = RouteTable::new();
        table.add(
            Route::new(Method::GET, "/users/{id}", text("show"))
                .unwrap()
                .named("users.show"),
        );
        assert_eq!(
            table.path_for("users.show", &[("id", "a b")]).as_deref(),
            Some("/users/a%20b")
        );
        assert_eq!(table.path_for("users.show", &[]), None);
        assert_eq!(table.path_for("missing", &[("id", "1")]), None);
    }

    #[test]
    fn test_match_policy_from_str() {
        assert_eq!("scan-all".parse::<MatchPolicy>().unwrap(), MatchPolicy::ScanAll);
        assert_eq!(
            "FIRST_STRUCTURAL".parse::<MatchPolicy>().unwrap(),
            MatchPolicy::FirstStructural
        );
        assert!("best".parse::<MatchPolicy>().is_err());
    }
}
