//! Validation engine: schema execution, single-field checks, live error
//! state, and concurrent async validator fan-out

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde_json::Value;

use crate::error::FormError;
use crate::schema::{path, Schema, ViolationCode};

/// Result of running a schema (and optionally async validators) over data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<FormError>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn invalid(errors: Vec<FormError>) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// A semantic/remote check that runs after structural validation passes
/// (e.g., address existence against a geocoder). Returns one error per
/// failed check, empty when satisfied.
#[async_trait]
pub trait AsyncValidator: Send + Sync {
    async fn validate(&self, data: &Value) -> Vec<FormError>;
}

/// Run a schema against data, mapping every violation to a uniform
/// [`FormError`] with a dotted-path field
pub fn validate(data: &Value, schema: &Schema) -> ValidationOutcome {
    let errors: Vec<FormError> = schema
        .validate(data)
        .into_iter()
        .map(|v| FormError::field(v.path, v.message, v.code))
        .collect();
    ValidationOutcome::invalid(errors)
}

/// Validate one field's value in isolation.
///
/// Uses the field's own rules when the schema has an exact entry for the
/// path; otherwise validates a single-path object against the schema subset
/// for that field's root, keeping only violations at the exact path. Fields
/// with no schema representation are treated as valid — whole-step and
/// whole-object validation remain authoritative.
pub fn validate_field(field: &str, value: &Value, schema: &Schema) -> Option<FormError> {
    if schema.field_rules(field).is_some() {
        return schema
            .validate_value(field, value)
            .map(|v| FormError::field(v.path, v.message, v.code));
    }

    let root = path::root_segment(field);
    let subset = schema.pick(&[root]);
    if subset.is_empty() {
        return None;
    }

    let probe = single_path_object(field, value.clone());
    subset
        .validate(&probe)
        .into_iter()
        .find(|v| v.path == field)
        .map(|v| FormError::field(v.path, v.message, v.code))
}

/// Build `{"a": {"b": value}}` from a dotted path `a.b`
fn single_path_object(field: &str, value: Value) -> Value {
    let mut current = value;
    for segment in field.split('.').rev() {
        let mut map = serde_json::Map::new();
        map.insert(segment.to_string(), current);
        current = Value::Object(map);
    }
    current
}

/// Live per-keystroke error state, maintained independently of the
/// orchestrator's step-gate errors
#[derive(Debug, Clone, Default)]
pub struct ErrorState {
    errors: BTreeMap<String, String>,
}

impl ErrorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(field.into(), message.into());
    }

    pub fn clear_field_error(&mut self, field: &str) {
        self.errors.remove(field);
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Record the outcome of a single-field check: sets the error when
    /// present, clears it otherwise
    pub fn apply(&mut self, field: &str, result: Option<&FormError>) {
        match result {
            Some(err) => self.set_field_error(field, err.message.clone()),
            None => self.clear_field_error(field),
        }
    }
}

/// Structural validation first (fails fast, cheap), then every async
/// validator concurrently. All async validators settle before the combined
/// result is returned; one failing early never drops the others' findings.
pub async fn validate_async(
    data: &Value,
    schema: &Schema,
    validators: &[Arc<dyn AsyncValidator>],
) -> ValidationOutcome {
    let structural = validate(data, schema);
    if !structural.is_valid {
        return structural;
    }

    let checks = validators.iter().map(|v| v.validate(data));
    let errors: Vec<FormError> = join_all(checks).await.into_iter().flatten().collect();
    ValidationOutcome::invalid(errors)
}

/// Convenience for callers that want the engine's uniform error shape for a
/// failure that has no field (unexpected condition during validation)
pub fn unexpected_error(message: impl Into<String>) -> FormError {
    FormError {
        field: None,
        message: message.into(),
        code: Some(ViolationCode::Custom),
    }
}
