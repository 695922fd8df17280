//! Testing utilities for Trellis applications.
//!
//! - **TestClient** - drives an [`Application`](trellis_core::Application)
//!   across requests, carrying the session cookie like a browser
//! - **MockSessionStore** - records store calls and can simulate outages
//! - **Assertions** - response assertions with readable failure messages
//!
//! ## Quick Start
//!
//! ```
//! use trellis_core::{Application, Output, RouteTable};
//! use trellis_testing::*;
//!
//! # tokio_test::block_on(async {
//! let routes = RouteTable::new()
//!     .post("/profile", |_, ctx| {
//!         ctx.flash("status", "Profile saved")?;
//!         ctx.redirect("/profile");
//!         Ok(Output::Empty)
//!     })
//!     .unwrap()
//!     .get("/profile", |_, ctx| {
//!         let status: Option<String> = ctx.take_flash("status");
//!         ctx.write(status.unwrap_or_default());
//!         Ok(Output::Empty)
//!     })
//!     .unwrap();
//!
//! let client = TestClient::new(Application::builder().routes(routes).build().unwrap());
//!
//! let response = client.post_form("/profile", &[("name", "Ada")]).await;
//! assert_redirect(&response, "/profile");
//!
//! let response = client.get("/profile").await;
//! assert_body_contains(&response, "Profile saved");
//! # });
//! ```
//!
//! ## Store Failures
//!
//! ```
//! use trellis_core::{Application, RouteTable};
//! use trellis_testing::*;
//!
//! # tokio_test::block_on(async {
//! let store = MockSessionStore::new();
//! let app = Application::builder()
//!     .routes(RouteTable::new())
//!     .session_store(store.clone())
//!     .build()
//!     .unwrap();
//!
//! store.fail(true);
//! let response = TestClient::new(app).get("/").await;
//! assert_status(&response, 500);
//! # });
//! ```

mod assertions;
mod mock;
mod test_client;

pub use assertions::{
    assert_body_contains, assert_client_error, assert_header, assert_json, assert_redirect,
    assert_status,
};
pub use mock::{MockSessionStore, StoreCall};
pub use test_client::{TestClient, TestResponse};
