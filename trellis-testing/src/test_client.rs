// Test HTTP Client

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use trellis_core::{Application, Error, HttpRequest, HttpResponse};
use trellis_csrf::CsrfConfig;
use trellis_session::is_valid_session_id;

/// Drives an [`Application`] like a browser would.
///
/// The client remembers the session cookie from each response and sends it
/// with the next request, so flash data, old input and the previous URI
/// carry across calls exactly as they do in production.
pub struct TestClient {
    app: Application,
    cookie: Mutex<Option<String>>,
    default_headers: HashMap<String, String>,
}

impl TestClient {
    /// Create a new test client
    pub fn new(app: Application) -> Self {
        Self {
            app,
            cookie: Mutex::new(None),
            default_headers: HashMap::new(),
        }
    }

    /// Send this header with every request.
    pub fn with_default_header(mut self, key: &str, value: &str) -> Self {
        self.default_headers.insert(key.to_string(), value.to_string());
        self
    }

    /// Behave like a script: ask for JSON on every request.
    pub fn json(self) -> Self {
        self.with_default_header("Accept", "application/json")
    }

    pub fn app(&self) -> &Application {
        &self.app
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(HttpRequest::get(path)).await
    }

    /// POST an urlencoded form.
    pub async fn post_form<T: Serialize>(&self, path: &str, form: &T) -> TestResponse {
        let request = HttpRequest::post(path)
            .with_form(form)
            .expect("form must be urlencodable");
        self.send(request).await
    }

    /// POST a JSON body.
    pub async fn post_json<T: Serialize>(&self, path: &str, body: &T) -> TestResponse {
        let request = HttpRequest::post(path)
            .with_json(body)
            .expect("body must be serializable");
        self.send(request).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(HttpRequest::new("DELETE", path)).await
    }

    /// Send a prepared request through the full cycle.
    pub async fn send(&self, mut request: HttpRequest) -> TestResponse {
        for (key, value) in &self.default_headers {
            if request.header(key).is_none() {
                request.headers.insert(key.clone(), value.clone());
            }
        }
        if request.header("Cookie").is_none()
            && let Some(cookie) = self.cookie.lock().unwrap().clone()
        {
            request.headers.insert("Cookie".to_string(), cookie);
        }

        let response = self.app.handle(request).await;

        if let Some(set_cookie) = response.header("Set-Cookie") {
            let pair = set_cookie.split(';').next().unwrap_or_default().trim();
            *self.cookie.lock().unwrap() = Some(pair.to_string());
        }

        TestResponse::new(response)
    }

    /// Id of the session the client currently carries.
    pub fn session_id(&self) -> Option<String> {
        let cookie = self.cookie.lock().unwrap().clone()?;
        let (_, id) = cookie.split_once('=')?;
        is_valid_session_id(id).then(|| id.to_string())
    }

    /// Forget the session cookie, as if the browser was closed.
    pub fn clear_cookies(&self) {
        *self.cookie.lock().unwrap() = None;
    }

    /// Read a direct session value from the application's store.
    pub async fn session_value<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let id = self.session_id()?;
        let record = self.app.session_store().get(&id).await.ok()??;
        record.get(key)
    }

    /// CSRF token of the current session, if one was issued.
    pub async fn csrf_token(&self) -> Option<String> {
        self.session_value(&CsrfConfig::default().session_key).await
    }
}

/// Response from a test request
#[derive(Debug, Clone)]
pub struct TestResponse {
    inner: HttpResponse,
}

impl TestResponse {
    pub fn new(inner: HttpResponse) -> Self {
        Self { inner }
    }

    /// Get the status code
    pub fn status(&self) -> u16 {
        self.inner.status
    }

    /// Get the response body as string
    pub fn text(&self) -> String {
        self.inner.text()
    }

    /// Get the response body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.inner.body).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Get a header value
    pub fn header(&self, key: &str) -> Option<&str> {
        self.inner.header(key)
    }

    /// Redirect target, if this is a redirect.
    pub fn location(&self) -> Option<&str> {
        if self.inner.is_redirect() {
            self.inner.header("Location")
        } else {
            None
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.inner.is_redirect()
    }

    pub fn response(&self) -> &HttpResponse {
        &self.inner
    }

    pub fn into_inner(self) -> HttpResponse {
        self.inner
    }
}

impl From<HttpResponse> for TestResponse {
    fn from(response: HttpResponse) -> Self {
        Self::new(response)
    }
}
