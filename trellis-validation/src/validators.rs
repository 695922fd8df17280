// Built-in field validators

use crate::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+",
        r"@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
        r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)+$",
    ))
    .expect("email pattern is valid")
});

/// Validates that a string is not blank
pub struct NotEmpty;

impl NotEmpty {
    pub fn validate(value: &str, field: &str) -> Result<(), ValidationError> {
        if value.trim().is_empty() {
            Err(ValidationError::new(field, format!("The {} field is required.", field))
                .with_constraint("required"))
        } else {
            Ok(())
        }
    }
}

/// Validates minimum length in characters
pub struct MinLength(pub usize);

impl MinLength {
    pub fn validate(&self, value: &str, field: &str) -> Result<(), ValidationError> {
        if value.chars().count() < self.0 {
            Err(ValidationError::new(
                field,
                format!("The {} must be at least {} characters.", field, self.0),
            )
            .with_constraint("min")
            .with_value(value))
        } else {
            Ok(())
        }
    }
}

/// Validates maximum length in characters
pub struct MaxLength(pub usize);

impl MaxLength {
    pub fn validate(&self, value: &str, field: &str) -> Result<(), ValidationError> {
        if value.chars().count() > self.0 {
            Err(ValidationError::new(
                field,
                format!("The {} may not be greater than {} characters.", field, self.0),
            )
            .with_constraint("max")
            .with_value(value))
        } else {
            Ok(())
        }
    }
}

/// Validates email format
pub struct IsEmail;

impl IsEmail {
    pub fn validate(value: &str, field: &str) -> Result<(), ValidationError> {
        if EMAIL_REGEX.is_match(value) {
            Ok(())
        } else {
            Err(
                ValidationError::new(field, format!("The {} must be a valid email address.", field))
                    .with_constraint("email")
                    .with_value(value),
            )
        }
    }
}
