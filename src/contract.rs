//! Contracts between the orchestrator and its collaborators
//!
//! Step views, submit handlers, and lifecycle hooks are all injected; the
//! engine never owns rendering or transport.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BoxError, FormEngineError};
use crate::schema::Schema;

/// Describes one wizard step: the fields it owns, the schema validating just
/// those fields, and a reference to the view responsible for rendering it.
/// Immutable once handed to the engine.
#[derive(Debug, Clone)]
pub struct FormStepConfig {
    /// Stable identifier (also the default view reference)
    pub id: String,
    pub title: String,
    pub description: String,
    /// Top-level form fields this step owns. Ownership across steps is
    /// disjoint; the engine validates each step against exactly these.
    pub fields: Vec<String>,
    pub schema: Schema,
    /// Reference to the view that renders this step
    pub view: String,
}

impl FormStepConfig {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        fields: &[&str],
        schema: Schema,
    ) -> Self {
        let id = id.into();
        Self {
            view: id.clone(),
            id,
            title: title.into(),
            description: description.into(),
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
            schema,
        }
    }

    pub fn with_view(mut self, view: impl Into<String>) -> Self {
        self.view = view.into();
        self
    }
}

/// Everything a step view receives from the engine: the subset of form data
/// the step owns, the current step-gate errors, and the busy flag
#[derive(Debug, Clone)]
pub struct StepProps {
    pub data: Value,
    pub errors: BTreeMap<String, String>,
    pub is_loading: bool,
}

/// What a step view hands back to the engine after user interaction
#[derive(Debug, Clone)]
pub enum StepEvent {
    /// Merge a partial update into the form data
    DataChanged(Value),
    /// Advance to the next step (validation-gated)
    Next,
    /// Retreat to the previous step (never validated)
    Previous,
}

/// A view capable of rendering one step.
///
/// The view only renders and captures input; all shared state flows through
/// the engine via the returned [`StepEvent`].
pub trait StepView {
    fn render(&mut self, props: &StepProps) -> Option<StepEvent>;
}

/// Performs the actual submission (network transport lives here, not in the
/// engine). Must return `Err` on failure; the engine does not retry.
#[async_trait]
pub trait SubmitHandler<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn submit(&self, data: T) -> Result<(), BoxError>;
}

/// Fired on every successful step transition (next/previous/jump) with the
/// new current step and the full form data. Side-effect only.
pub type StepChangeHook = Box<dyn Fn(&FormStepConfig, &Value) + Send + Sync>;

/// Notification channel for submission failures and unexpected errors. The
/// engine always also returns the error to its caller; this never replaces
/// that surface.
pub type ErrorHook = Box<dyn Fn(&FormEngineError) + Send + Sync>;
