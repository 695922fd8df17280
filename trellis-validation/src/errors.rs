// Validation errors

use crate::MessageBag;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use trellis_session::{Session, SessionResult};

/// Validation error for a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Field name that failed validation
    pub field: String,

    /// Error message
    pub message: String,

    /// Validation constraint that failed
    pub constraint: String,

    /// Value that failed validation (optional)
    pub value: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            constraint: "custom".to_string(),
            value: None,
        }
    }

    /// Set the constraint name
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = constraint.into();
        self
    }

    /// Set the invalid value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create a new validation errors collection
    pub fn new(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }

    /// Check if there are any errors
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Get the number of errors
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Add an error
    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    /// Record the outcome of a single check
    pub fn check(&mut self, outcome: Result<(), ValidationError>) -> &mut Self {
        if let Err(error) = outcome {
            self.add(error);
        }
        self
    }

    /// `Ok(())` when nothing failed
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Get errors for a specific field
    pub fn get_field_errors(&self, field: &str) -> Vec<&ValidationError> {
        self.errors.iter().filter(|e| e.field == field).collect()
    }

    /// Group messages by field, keeping per-field order
    pub fn into_messages(self) -> BTreeMap<String, Vec<String>> {
        let mut messages: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for error in self.errors {
            messages.entry(error.field).or_default().push(error.message);
        }
        messages
    }

    /// Convert into the bag shape rendered on the next page
    pub fn into_message_bag(self) -> MessageBag {
        MessageBag::from(self.into_messages())
    }

    /// Flash the errors and the submitted input for the redirect round-trip.
    ///
    /// The next request sees the errors through
    /// [`MessageBag::from_session`] and the input through
    /// [`Session::old_input`].
    pub fn flash<I, K, V>(self, session: &mut Session, input: I) -> SessionResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Serialize,
    {
        session.flash(MessageBag::FLASH_KEY, self.into_messages())?;
        session.flash_input(input)
    }

    /// Convert to JSON representation
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "errors": self.errors.iter().map(|e| {
                serde_json::json!({
                    "field": e.field,
                    "message": e.message,
                    "constraint": e.constraint,
                })
            }).collect::<Vec<_>>()
        })
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self::new(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ValidationErrors {
        ValidationErrors::new(vec![
            ValidationError::new("email", "required"),
            ValidationError::new("name", "too short"),
            ValidationError::new("email", "must be a valid email"),
        ])
    }

    #[test]
    fn test_into_messages_groups_in_order() {
        let messages = sample().into_messages();
        assert_eq!(
            messages.get("email"),
            Some(&vec!["required".to_string(), "must be a valid email".to_string()])
        );
        assert_eq!(messages.get("name"), Some(&vec!["too short".to_string()]));
    }

    #[test]
    fn test_check_and_into_result() {
        let mut errors = ValidationErrors::default();
        errors
            .check(Ok(()))
            .check(Err(ValidationError::new("email", "required")));

        assert_eq!(errors.len(), 1);
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::default().into_result().is_ok());
    }

    #[test]
    fn test_field_errors() {
        let errors = sample();
        assert_eq!(errors.get_field_errors("email").len(), 2);
        assert!(errors.get_field_errors("age").is_empty());
    }

    #[test]
    fn test_display() {
        let error = ValidationError::new("email", "required").with_constraint("notEmpty");
        assert_eq!(error.to_string(), "email: required");
        assert_eq!(error.constraint, "notEmpty");
    }
}
