//! Integration tests for trellis-validation

use std::collections::BTreeMap;
use trellis_session::{Session, SessionConfig};
use trellis_validation::*;

struct RegisterForm {
    name: String,
    email: String,
}

impl Validate for RegisterForm {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        errors
            .check(NotEmpty::validate(&self.name, "name"))
            .check(MinLength(2).validate(&self.name, "name"))
            .check(MaxLength(40).validate(&self.name, "name"))
            .check(IsEmail::validate(&self.email, "email"));
        errors.into_result()
    }
}

#[test]
fn test_valid_form_passes() {
    let form = RegisterForm {
        name: "Ada".into(),
        email: "ada@example.com".into(),
    };
    assert!(form.validate().is_ok());
}

#[test]
fn test_errors_reach_next_request_only() {
    let config = SessionConfig::default();
    let form = RegisterForm {
        name: String::new(),
        email: "nope".into(),
    };

    let mut session = Session::start(&config);
    let errors = form.validate().unwrap_err();
    assert_eq!(errors.get_field_errors("name").len(), 2);

    let mut input = BTreeMap::new();
    input.insert("name", form.name.clone());
    input.insert("email", form.email.clone());
    errors.flash(&mut session, input).unwrap();

    // Same request: nothing visible yet
    assert!(MessageBag::from_session(&mut session).is_empty());

    // Next request
    let mut session = Session::resume(session.into_record(), &config);
    let bag = MessageBag::from_session(&mut session);
    assert!(bag.has("name"));
    assert!(bag.has("email"));
    assert_eq!(bag.get("name").len(), 2);
    assert_eq!(bag.first("email"), Some("The email must be a valid email address."));
    assert_eq!(session.old_input::<String>("email").as_deref(), Some("nope"));

    // The request after that
    let mut session = Session::resume(session.into_record(), &config);
    assert!(MessageBag::from_session(&mut session).is_empty());
    assert_eq!(session.old_input::<String>("name"), None);
}

#[test]
fn test_message_bag_from_validation_errors() {
    let bag = ValidationErrors::new(vec![ValidationError::new("email", "required")])
        .into_message_bag();

    assert!(bag.has("email"));
    assert_eq!(bag.first("email"), Some("required"));
    assert!(!bag.has("name"));
}
