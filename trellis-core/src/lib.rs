//! Core request cycle for the Trellis web framework.
//!
//! This crate resolves an incoming method and path to a handler, runs it
//! with a per-request [`RequestContext`], and turns the result into an
//! [`HttpResponse`]. Cross-request state lives in the session
//! ([`trellis_session`]); validation messages come from
//! [`trellis_validation`].
//!
//! # Example
//!
//! ```
//! use trellis_core::{Application, HttpRequest, RouteTable};
//!
//! # tokio_test::block_on(async {
//! let routes = RouteTable::new()
//!     .get("/users/{id}", |params, ctx| {
//!         ctx.render(format!("<h1>User {}</h1>", params.get("id").unwrap_or_default()));
//!         Ok(().into())
//!     })
//!     .unwrap();
//!
//! let app = Application::builder().routes(routes).build().unwrap();
//!
//! let response = app.handle(HttpRequest::get("/users/42")).await;
//! assert_eq!(response.status, 200);
//! assert_eq!(response.text(), "<h1>User 42</h1>");
//!
//! let response = app.handle(HttpRequest::get("/nope")).await;
//! assert_eq!(response.status, 404);
//! # });
//! ```

pub mod application;
pub mod config;
pub mod context;
pub mod error;
pub mod guard;
pub mod handler;
pub mod http;
pub mod negotiation;
pub mod registry;
pub mod route_loader;
pub mod routing;

// Re-export commonly used types
pub use application::{Application, ApplicationBuilder};
pub use config::{EmissionPolicy, FileFormat, FrameworkConfig};
pub use context::{CONFIG_KEY, ERRORS_KEY, RequestContext, ResponseParts};
pub use error::{Error, Result};
pub use guard::{CustomGuard, Guard, GuardContext};
pub use handler::{Handler, HandlerRegistry, Output, RouteParams, handler};
pub use crate::http::{HttpRequest, HttpResponse, MethodOverride};
pub use negotiation::{Accept, MediaType};
pub use registry::Registry;
pub use route_loader::{RouteDefinition, RouteLoader};
pub use routing::{MatchPolicy, Route, RouteMatch, RoutePattern, RouteTable, Router};

/// Re-exported so handlers can name methods without a direct dependency.
pub use ::http::{Method, StatusCode};
