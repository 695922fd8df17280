//! Validation support for Trellis
//!
//! The request lifecycle only needs the [`MessageBag`]: an immutable,
//! per-request view of the messages flashed by a failed form submission.
//! The validators and [`ValidationErrors`] produce those messages.
//!
//! # Examples
//!
//! ```
//! use trellis_session::{Session, SessionConfig};
//! use trellis_validation::{IsEmail, MessageBag, NotEmpty, ValidationErrors};
//!
//! let config = SessionConfig::default();
//!
//! // POST /register fails validation
//! let mut session = Session::start(&config);
//! let mut errors = ValidationErrors::default();
//! errors
//!     .check(NotEmpty::validate("", "name"))
//!     .check(IsEmail::validate("ada@", "email"));
//! errors.flash(&mut session, [("email", "ada@")]).unwrap();
//!
//! // GET /register after the redirect
//! let mut session = Session::resume(session.into_record(), &config);
//! let bag = MessageBag::from_session(&mut session);
//! assert_eq!(bag.first("name"), Some("The name field is required."));
//! assert_eq!(session.old_input::<String>("email").as_deref(), Some("ada@"));
//! ```

mod errors;
mod message_bag;
mod traits;
mod validators;

pub use errors::*;
pub use message_bag::*;
pub use traits::*;
pub use validators::*;
