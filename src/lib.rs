// Trellis - a request-cycle framework for Rust
//
// Routing with 404/405 discrimination, sessions with flash data and old
// input, validation message bags and session-bound CSRF protection.

// Re-export core functionality
pub use trellis_core::*;

// Re-export companion crates
pub use trellis_log as log;
pub use trellis_session as session;
pub use trellis_validation as validation;

// Re-export optional crates
#[cfg(feature = "csrf")]
pub use trellis_csrf as csrf;

#[cfg(feature = "testing")]
pub use trellis_testing as testing;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        Application,
        Error,
        HandlerRegistry,
        HttpRequest,
        HttpResponse,
        MatchPolicy,
        Method,
        Output,
        RequestContext,
        RouteParams,
        RouteTable,
        Router,
    };
    pub use trellis_session::{MemorySessionStore, Session, SessionConfig, SessionStore};
    pub use trellis_validation::{MessageBag, ValidationErrors};

    #[cfg(feature = "csrf")]
    pub use trellis_csrf::{CsrfApplicationExt, CsrfContextExt, CsrfGuard};
}
