// Validation traits

use crate::ValidationErrors;

/// A submitted form or payload that can check itself.
pub trait Validate {
    /// Validate the value, collecting every failure
    fn validate(&self) -> Result<(), ValidationErrors>;
}
