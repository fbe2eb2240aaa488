//! Error types shared across the form engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::schema::ViolationCode;

/// Boxed error returned by injected collaborators (submit handlers, async validators)
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A single validation failure, keyed by the dotted field path it applies to.
///
/// `field` is `None` for failures that cannot be attributed to a specific
/// field (e.g., the submitted object no longer matches the aggregate shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormError {
    pub field: Option<String>,
    pub message: String,
    pub code: Option<ViolationCode>,
}

impl FormError {
    /// Create a field-scoped error
    pub fn field(field: impl Into<String>, message: impl Into<String>, code: ViolationCode) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
            code: Some(code),
        }
    }

    /// Create an error not attributable to any field
    pub fn form(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
            code: None,
        }
    }
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}: {}", field, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Errors surfaced by the step orchestrator
#[derive(Debug, Error)]
pub enum FormEngineError {
    /// Caller supplied an unusable step configuration (e.g., empty step list).
    /// Programmer error; never recovered.
    #[error("invalid form configuration: {0}")]
    Configuration(String),

    /// Whole-object validation failed at submission; the submit handler was
    /// never invoked
    #[error("validation failed with {} error(s)", .0.len())]
    Validation(Vec<FormError>),

    /// The validated object could not be decoded into the typed aggregate
    #[error("form data does not match the aggregate shape: {0}")]
    Decode(#[from] serde_json::Error),

    /// The injected submit handler rejected the submission
    #[error("submission failed: {0}")]
    Submission(#[source] BoxError),
}

impl FormEngineError {
    /// Validation failures carried by this error, if any
    pub fn validation_errors(&self) -> &[FormError] {
        match self {
            FormEngineError::Validation(errors) => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_field() {
        let err = FormError::field("contact_email", "must be a valid email", ViolationCode::InvalidFormat);
        assert_eq!(err.to_string(), "contact_email: must be a valid email");
    }

    #[test]
    fn test_display_without_field() {
        let err = FormError::form("something went wrong");
        assert_eq!(err.to_string(), "something went wrong");
    }

    #[test]
    fn test_validation_errors_accessor() {
        let errors = vec![FormError::form("bad")];
        let err = FormEngineError::Validation(errors.clone());
        assert_eq!(err.validation_errors(), errors.as_slice());

        let err = FormEngineError::Configuration("empty".to_string());
        assert!(err.validation_errors().is_empty());
    }
}
