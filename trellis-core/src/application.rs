// Application request cycle

use crate::config::{EmissionPolicy, FrameworkConfig};
use crate::context::{CONFIG_KEY, ERRORS_KEY, ResponseParts};
use crate::guard::{Guard, GuardContext};
use crate::route_loader::RouteLoader;
use crate::routing::{RouteTable, Router};
use crate::{Error, HandlerRegistry, HttpRequest, HttpResponse, Output, Registry, RequestContext};
use http::Method;
use std::sync::Arc;
use trellis_log::{debug, error, info, warn};
use trellis_session::{
    MemorySessionStore, Session, SessionConfig, SessionRecord, SessionStore, is_valid_session_id,
};
use trellis_validation::MessageBag;

/// The main application struct
///
/// Holds everything shared between requests. `Application` is cheap to
/// clone and can serve requests from many tasks at once; each request gets
/// its own [`Session`], [`Registry`] and [`RequestContext`].
#[derive(Clone)]
pub struct Application {
    router: Arc<Router>,
    config: Arc<FrameworkConfig>,
    session_config: SessionConfig,
    store: Arc<dyn SessionStore>,
    services: Registry,
    guards: Vec<Arc<dyn Guard>>,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    pub fn session_config(&self) -> &SessionConfig {
        &self.session_config
    }

    pub fn session_store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Serve one request end to end.
    ///
    /// Loads the session named by the session cookie (or starts one), runs
    /// [`run_cycle`](Application::run_cycle), renders dispatch errors, then
    /// persists the session and sets the cookie.
    pub async fn handle(&self, request: HttpRequest) -> HttpResponse {
        let mut session = match self.load_session(&request).await {
            Ok(session) => session,
            Err(e) => {
                error!("Failed to load session: {}", e);
                return self.render_error(&e, &request);
            }
        };

        let mut response = match self.run_cycle(&mut session, &request) {
            Ok(response) => response,
            Err(e) => self.render_error(&e, &request),
        };

        match self.persist_session(session).await {
            Ok(cookie) => {
                response.headers.insert("Set-Cookie".to_string(), cookie);
            }
            Err(e) => {
                error!("Failed to save session: {}", e);
                response = self.render_error(&e, &request);
            }
        }

        debug!("{} {} -> {}", request.method, request.path, response.status);
        response
    }

    /// Run one request against an already resumed session.
    ///
    /// Builds the per-request registry and message bag, runs the guards,
    /// dispatches, applies the emission policy and finally records the URI
    /// as the previous one. Errors are returned unrendered and leave the
    /// previous URI untouched.
    pub fn run_cycle(
        &self,
        session: &mut Session,
        request: &HttpRequest,
    ) -> Result<HttpResponse, Error> {
        let method = request.method_with(&self.config.method_override())?;
        let uri = request.uri();

        let mut registry = self.services.clone();
        registry.register_arc(CONFIG_KEY, Arc::clone(&self.config));
        registry.register(ERRORS_KEY, MessageBag::from_session(session));

        self.check_guards(request, &method, &uri, session)?;

        let mut ctx = RequestContext::new(request, session, registry).with_method(method.clone());
        let json = ctx.is_json_request();
        let output = self.router.dispatch(&uri, &method, &mut ctx)?;
        let parts = ctx.finish();

        let mut response = self.emit(parts, output, json)?;
        if method == Method::HEAD {
            response.body.clear();
        }

        session.set_previous_uri(uri);
        Ok(response)
    }

    fn check_guards(
        &self,
        request: &HttpRequest,
        method: &Method,
        uri: &str,
        session: &Session,
    ) -> Result<(), Error> {
        let context = GuardContext::new(request, method, uri, session);
        for guard in &self.guards {
            if !guard.can_activate(&context)? {
                debug!("Guard {} rejected {} {}", guard.name(), method, uri);
                return Err(Error::Forbidden(format!("rejected by {}", guard.name())));
            }
        }
        Ok(())
    }

    /// Turn what the handler wrote and returned into the response.
    fn emit(
        &self,
        parts: ResponseParts,
        output: Output,
        json: bool,
    ) -> Result<HttpResponse, Error> {
        let ResponseParts {
            status,
            headers,
            mut body,
        } = parts;
        let mut response = HttpResponse::new(status.unwrap_or(200));
        response.headers = headers;

        match (self.config.emission, output) {
            (_, Output::Empty) => {}
            (EmissionPolicy::JsonText, Output::Text(text)) if json => {
                body.extend_from_slice(text.as_bytes());
                set_default_header(&mut response, "Content-Type", "application/json");
            }
            (EmissionPolicy::JsonText, output) => {
                debug!("Return value not emitted under json_text policy: {:?}", output);
            }
            (EmissionPolicy::Always, Output::Text(text)) => {
                body.extend_from_slice(text.as_bytes());
                set_default_header(&mut response, "Content-Type", "text/html; charset=utf-8");
            }
            (EmissionPolicy::Always, Output::Json(value)) => {
                let encoded = serde_json::to_vec(&value)
                    .map_err(|e| Error::Serialization(e.to_string()))?;
                body.extend_from_slice(&encoded);
                set_default_header(&mut response, "Content-Type", "application/json");
            }
        }

        response.body = body;
        Ok(response)
    }

    /// Render an error as a response, JSON for JSON-negotiated requests.
    pub fn render_error(&self, err: &Error, request: &HttpRequest) -> HttpResponse {
        if err.is_server_error() {
            error!("{} {} failed: {}", request.method, request.path, err);
        } else {
            debug!("{} {} rejected: {}", request.method, request.path, err);
        }

        let message = err.public_message();
        let response = HttpResponse::new(err.status_code());

        let mut response = if request.is_json_request() {
            response
                .with_json(&serde_json::json!({ "error": message }))
                .unwrap_or_else(|_| HttpResponse::new(err.status_code()).with_text(message))
        } else {
            response.with_text(message)
        };

        if let Error::MethodNotAllowed { allowed, .. } = err {
            let allow = allowed.iter().map(Method::as_str).collect::<Vec<_>>().join(", ");
            response.headers.insert("Allow".to_string(), allow);
        }

        response
    }

    async fn load_session(&self, request: &HttpRequest) -> Result<Session, Error> {
        let cookie = request.cookie(&self.session_config.cookie_name);

        let record = match cookie {
            Some(id) if is_valid_session_id(id) => self.store.get(id).await?,
            Some(id) => {
                warn!("Ignoring malformed session id '{}'", id);
                None
            }
            None => None,
        };

        Ok(match record {
            Some(record) => Session::resume(record, &self.session_config),
            None => Session::start(&self.session_config),
        })
    }

    /// Save the session and return the `Set-Cookie` value for it.
    async fn persist_session(&self, session: Session) -> Result<String, Error> {
        if let Some(old) = session.superseded_id() {
            self.store.delete(old).await?;
        }

        let record: SessionRecord = session.into_record();
        self.store.save(&record).await?;

        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.session_config.cookie_name, record.id
        );
        if self.config.secure_cookies {
            cookie.push_str("; Secure");
        }
        Ok(cookie)
    }
}

fn set_default_header(response: &mut HttpResponse, name: &str, value: &str) {
    if response.header(name).is_none() {
        response.headers.insert(name.to_string(), value.to_string());
    }
}

/// Builder for [`Application`].
#[derive(Default)]
pub struct ApplicationBuilder {
    router: Option<Router>,
    table: Option<RouteTable>,
    handlers: Option<HandlerRegistry>,
    config: Option<FrameworkConfig>,
    session_config: Option<SessionConfig>,
    store: Option<Arc<dyn SessionStore>>,
    services: Registry,
    guards: Vec<Arc<dyn Guard>>,
}

impl ApplicationBuilder {
    /// Use a ready router as is, policy included.
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Use a route table with the configured match policy.
    pub fn routes(mut self, table: RouteTable) -> Self {
        self.table = Some(table);
        self
    }

    /// Handlers for the route file named by [`FrameworkConfig::routes`].
    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }

    pub fn config(mut self, config: FrameworkConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = Some(config);
        self
    }

    pub fn session_store<S: SessionStore + 'static>(mut self, store: S) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    pub fn shared_session_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register a service visible to every request.
    pub fn service<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.services.register(name, value);
        self
    }

    /// Add a pre-dispatch guard. Guards run in insertion order.
    pub fn guard<G: Guard + 'static>(mut self, guard: G) -> Self {
        self.guards.push(Arc::new(guard));
        self
    }

    /// Assemble the application.
    ///
    /// Routes come from, in order of preference, the router, the route
    /// table, or the route file named in the configuration. Without any of
    /// them the application answers every request with 404.
    pub fn build(self) -> Result<Application, Error> {
        let config = self.config.unwrap_or_default();
        let session_config = self.session_config.unwrap_or_default();

        let configured = |table: RouteTable| {
            Router::new(table)
                .with_policy(config.match_policy)
                .with_head_fallback(config.head_fallback)
        };

        let router = match (self.router, self.table, &config.routes) {
            (Some(router), _, _) => router,
            (None, Some(table), _) => configured(table),
            (None, None, Some(path)) => {
                let handlers = self.handlers.unwrap_or_default();
                configured(RouteLoader::auto(path)?.load_file(path, &handlers)?)
            }
            (None, None, None) => {
                warn!("No routes configured");
                configured(RouteTable::new())
            }
        };

        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new(session_config.clone())));

        info!(
            "{} ready: {} routes, {} guards, {:?} matching, {:?} emission",
            config.app_name,
            router.table().len(),
            self.guards.len(),
            router.policy(),
            config.emission
        );

        Ok(Application {
            router: Arc::new(router),
            config: Arc::new(config),
            session_config,
            store,
            services: self.services,
            guards: self.guards,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guard::CustomGuard;
    use crate::routing::MatchPolicy;

    fn app(config: FrameworkConfig) -> Application {
        let table = RouteTable::new()
            .get("/text", |_, _| Ok("TEXT".into()))
            .unwrap()
            .get("/json", |_, _| Ok(serde_json::json!({"ok": true}).into()))
            .unwrap()
            .get("/view", |_, ctx| {
                ctx.render("<p>view</p>");
                Ok("ignored".into())
            })
            .unwrap()
            .post("/login", |_, _| Ok("".into()))
            .unwrap();

        Application::builder().routes(table).config(config).build().unwrap()
    }

    fn cycle(app: &Application, request: &HttpRequest) -> Result<HttpResponse, Error> {
        let mut session = Session::start(app.session_config());
        app.run_cycle(&mut session, request)
    }

    #[test]
    fn test_json_text_emits_text_for_json_requests_only() {
        let app = app(FrameworkConfig::default());

        let json = HttpRequest::get("/text").with_header("Accept", "application/json");
        let response = cycle(&app, &json).unwrap();
        assert_eq!(response.text(), "TEXT");
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        let html = HttpRequest::get("/text").with_header("Accept", "text/html");
        assert_eq!(cycle(&app, &html).unwrap().text(), "");
    }

    #[test]
    fn test_json_text_ignores_structured_output() {
        let app = app(FrameworkConfig::default());
        let request = HttpRequest::get("/json").with_header("Accept", "application/json");
        assert!(cycle(&app, &request).unwrap().body.is_empty());
    }

    #[test]
    fn test_side_channel_output_always_sent() {
        let app = app(FrameworkConfig::default());
        let response = cycle(&app, &HttpRequest::get("/view")).unwrap();
        assert_eq!(response.text(), "<p>view</p>");
        assert_eq!(response.header("content-type"), Some("text/html; charset=utf-8"));
    }

    #[test]
    fn test_always_policy() {
        let app = app(FrameworkConfig {
            emission: EmissionPolicy::Always,
            ..FrameworkConfig::default()
        });

        assert_eq!(cycle(&app, &HttpRequest::get("/text")).unwrap().text(), "TEXT");

        let response = cycle(&app, &HttpRequest::get("/json")).unwrap();
        assert_eq!(response.text(), r#"{"ok":true}"#);
        assert_eq!(response.header("Content-Type"), Some("application/json"));

        assert_eq!(
            cycle(&app, &HttpRequest::get("/view")).unwrap().text(),
            "<p>view</p>ignored"
        );
    }

    #[test]
    fn test_previous_uri_recorded_after_output() {
        let app = app(FrameworkConfig::default());
        let mut session = Session::start(app.session_config());

        app.run_cycle(&mut session, &HttpRequest::get("/text/?x=1")).unwrap();
        assert_eq!(session.previous_uri().as_deref(), Some("/text"));

        assert!(app.run_cycle(&mut session, &HttpRequest::get("/missing")).is_err());
        assert_eq!(session.previous_uri().as_deref(), Some("/text"));
    }

    #[test]
    fn test_render_error() {
        let app = app(FrameworkConfig::default());

        let request = HttpRequest::get("/login");
        let err = cycle(&app, &request).unwrap_err();
        let response = app.render_error(&err, &request);
        assert_eq!(response.status, 405);
        assert_eq!(response.header("Allow"), Some("POST"));

        let request = HttpRequest::get("/nope").with_header("Accept", "application/json");
        let err = cycle(&app, &request).unwrap_err();
        let response = app.render_error(&err, &request);
        assert_eq!(response.status, 404);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "Route not found: /nope");
    }

    #[test]
    fn test_head_request_has_no_body() {
        let app = app(FrameworkConfig {
            emission: EmissionPolicy::Always,
            ..FrameworkConfig::default()
        });
        let response = cycle(&app, &HttpRequest::new("HEAD", "/text")).unwrap();
        assert_eq!(response.status, 200);
        assert!(response.body.is_empty());
    }

    #[test]
    fn test_guard_rejection() {
        let table = RouteTable::new().get("/", |_, _| Ok("home".into())).unwrap();
        let app = Application::builder()
            .routes(table)
            .guard(CustomGuard::new(|ctx: &GuardContext<'_>| Ok(ctx.uri != "/")))
            .build()
            .unwrap();

        assert!(matches!(
            cycle(&app, &HttpRequest::get("/")),
            Err(Error::Forbidden(_))
        ));
    }

    #[test]
    fn test_registry_has_config_and_errors() {
        let table = RouteTable::new()
            .get("/", |_, ctx| {
                let config = ctx.service::<FrameworkConfig>(CONFIG_KEY)?;
                let errors = ctx.service::<MessageBag>(ERRORS_KEY)?;
                let greeting = ctx.service::<String>("greeting")?;
                Ok(format!("{} {} {}", config.app_name, errors.count(), greeting).into())
            })
            .unwrap();
        let app = Application::builder()
            .routes(table)
            .service("greeting", String::from("hello"))
            .config(FrameworkConfig {
                emission: EmissionPolicy::Always,
                ..FrameworkConfig::default()
            })
            .build()
            .unwrap();

        assert_eq!(cycle(&app, &HttpRequest::get("/")).unwrap().text(), "Trellis 0 hello");
    }

    #[test]
    fn test_malformed_method_is_rejected_before_guards() {
        let app = app(FrameworkConfig::default());
        let request = HttpRequest::new("GE T", "/text");
        let err = cycle(&app, &request).unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
        assert_eq!(app.render_error(&err, &request).status, 400);
    }

    #[test]
    fn test_head_fallback_follows_config() {
        let strict = app(FrameworkConfig {
            head_fallback: false,
            ..FrameworkConfig::default()
        });
        let request = HttpRequest::new("HEAD", "/text");
        let err = cycle(&strict, &request).unwrap_err();
        let response = strict.render_error(&err, &request);
        assert_eq!(response.status, 405);
        assert_eq!(response.header("Allow"), Some("GET"));

        let lenient = app(FrameworkConfig::default());
        assert_eq!(cycle(&lenient, &request).unwrap().status, 200);
    }

    #[test]
    fn test_routes_use_configured_policy() {
        let table = RouteTable::new()
            .post("/a", |_, _| Ok("post".into()))
            .unwrap()
            .get("/a", |_, _| Ok("get".into()))
            .unwrap();
        let app = Application::builder()
            .routes(table)
            .config(FrameworkConfig {
                match_policy: MatchPolicy::FirstStructural,
                ..FrameworkConfig::default()
            })
            .build()
            .unwrap();

        assert!(matches!(
            cycle(&app, &HttpRequest::get("/a")),
            Err(Error::MethodNotAllowed { .. })
        ));
    }

    #[tokio::test]
    async fn test_handle_sets_session_cookie() {
        let app = app(FrameworkConfig::default());
        let response = app.handle(HttpRequest::get("/text")).await;
        let cookie = response.header("Set-Cookie").unwrap();
        assert!(cookie.starts_with("trellis_session="));
        assert!(cookie.contains("HttpOnly"));
        assert_eq!(app.session_store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_handle_replaces_malformed_cookie() {
        let app = app(FrameworkConfig::default());
        let response = app
            .handle(HttpRequest::get("/text").with_header("Cookie", "trellis_session=../../etc"))
            .await;
        assert_eq!(response.status, 200);
        assert!(!response.header("Set-Cookie").unwrap().contains("../../etc"));
    }
}
