//! # Trellis CSRF Protection
//!
//! Cross-Site Request Forgery protection bound to the session.
//!
//! Each session carries one random token under the `_csrf_token` key.
//! Forms echo it back in the `_token` field, scripts send it in the
//! `X-CSRF-Token` header. `GET`, `HEAD` and `OPTIONS` requests are never
//! checked.
//!
//! ## Quick Start
//!
//! ```rust
//! use trellis_core::{Application, HttpRequest, Output, RouteTable};
//! use trellis_csrf::{CsrfApplicationExt, CsrfContextExt, CsrfGuard};
//!
//! # tokio_test::block_on(async {
//! let routes = RouteTable::new()
//!     .get("/profile", |_, ctx| {
//!         let field = ctx.csrf_field()?;
//!         ctx.render(format!("<form method=\"post\">{}</form>", field));
//!         Ok(Output::Empty)
//!     })
//!     .unwrap()
//!     .post("/profile", |_, _| Ok("saved".into()))
//!     .unwrap();
//!
//! let app = Application::builder()
//!     .routes(routes)
//!     .csrf(CsrfGuard::default())
//!     .build()
//!     .unwrap();
//!
//! let response = app.handle(HttpRequest::post("/profile")).await;
//! assert_eq!(response.status, 403);
//! # });
//! ```
//!
//! ## Manual Checks
//!
//! ```rust
//! use trellis_csrf::{CsrfError, CsrfGuard};
//! use trellis_session::{Session, SessionConfig};
//!
//! let guard = CsrfGuard::default();
//! let mut session = Session::start(&SessionConfig::default());
//!
//! let token = guard.generate(&mut session).unwrap();
//! assert!(guard.validate(&session, Some(&token)).is_ok());
//! assert!(matches!(
//!     guard.validate(&session, Some("forged")),
//!     Err(CsrfError::Mismatch)
//! ));
//! ```

pub mod config;
pub mod error;
pub mod guard;
pub mod token;

pub use config::CsrfConfig;
pub use error::{CsrfError, Result};
pub use guard::{CsrfApplicationExt, CsrfContextExt, CsrfGuard, SERVICE_NAME};
pub use token::{generate_token, tokens_match};
