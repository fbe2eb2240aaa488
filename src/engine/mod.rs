//! Step orchestrator: the state machine driving the multi-step form
//!
//! Owns the working form data, the current step index, loading/submitting
//! flags and the error map. Transitions are validation-gated going forward,
//! free going backward, and the whole-object schema runs once at submission.
//! Edits schedule a debounced draft autosave; a valid persisted draft is
//! restored on construction.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::contract::{
    ErrorHook, FormStepConfig, StepChangeHook, StepEvent, StepProps, SubmitHandler,
};
use crate::error::{FormEngineError, FormError};
use crate::schema::Schema;
use crate::storage::{FormStorage, StorageBackend, DEFAULT_PERSISTENCE_KEY};
use crate::validation::{self, ErrorState};

/// Recognized options on engine construction
pub struct FormEngineOptions {
    /// Storage namespace suffix for the draft key
    pub persistence_key: String,
    /// Whether edits schedule a debounced draft save
    pub auto_save: bool,
    /// Idle time before a scheduled autosave fires
    pub autosave_delay: Duration,
    pub on_step_change: Option<StepChangeHook>,
    pub on_error: Option<ErrorHook>,
}

impl Default for FormEngineOptions {
    fn default() -> Self {
        Self {
            persistence_key: DEFAULT_PERSISTENCE_KEY.to_string(),
            auto_save: true,
            autosave_delay: Duration::from_secs(1),
            on_step_change: None,
            on_error: None,
        }
    }
}

/// Step progress snapshot for step-indicator UIs
#[derive(Debug, Clone)]
pub struct FormProgress {
    pub current_index: usize,
    pub total_steps: usize,
    pub titles: Vec<String>,
}

impl FormProgress {
    /// Format as a progress string like "Contact > [Locations] > Items"
    pub fn format_progress(&self) -> String {
        self.titles
            .iter()
            .enumerate()
            .map(|(i, title)| {
                if i == self.current_index {
                    format!("[{title}]")
                } else {
                    title.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" > ")
    }

    pub fn percentage_complete(&self) -> u8 {
        if self.total_steps == 0 {
            100
        } else {
            ((self.current_index as f32 / self.total_steps as f32) * 100.0) as u8
        }
    }
}

/// The multi-step form state machine.
///
/// `T` is the typed aggregate handed to the submit handler; internally the
/// engine works on a JSON object so partial merges and dotted-path
/// validation stay uniform across steps.
pub struct FormEngine<T, B>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    B: StorageBackend + 'static,
{
    steps: Vec<FormStepConfig>,
    full_schema: Schema,
    defaults: Value,
    data: Value,
    current_step_index: usize,
    is_loading: bool,
    is_submitting: bool,
    is_draft: bool,
    errors: Vec<FormError>,
    field_errors: ErrorState,
    storage: Arc<FormStorage<Value, B>>,
    submit: Arc<dyn SubmitHandler<T>>,
    options: FormEngineOptions,
    autosave_task: Option<JoinHandle<()>>,
}

impl<T, B> FormEngine<T, B>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    B: StorageBackend + 'static,
{
    /// Build an engine for the given steps, restoring a valid persisted
    /// draft if one exists.
    ///
    /// An empty step list is a caller bug and is rejected here rather than
    /// surfacing later as an undefined current step.
    pub fn new(
        steps: Vec<FormStepConfig>,
        defaults: &T,
        submit: Arc<dyn SubmitHandler<T>>,
        backend: B,
        options: FormEngineOptions,
    ) -> Result<Self, FormEngineError> {
        if steps.is_empty() {
            return Err(FormEngineError::Configuration(
                "step list must not be empty".to_string(),
            ));
        }
        let defaults = serde_json::to_value(defaults).map_err(|e| {
            FormEngineError::Configuration(format!("defaults are not serializable: {e}"))
        })?;

        let full_schema = steps
            .iter()
            .map(|step| step.schema.clone())
            .fold(Schema::new(), Schema::merge);

        let storage = Arc::new(FormStorage::new(backend, options.persistence_key.clone()));
        let (data, is_draft) = match storage.load_data() {
            Some(draft) => {
                debug!("restored persisted draft");
                (draft, true)
            }
            None => (defaults.clone(), false),
        };

        Ok(Self {
            steps,
            full_schema,
            defaults,
            data,
            current_step_index: 0,
            is_loading: false,
            is_submitting: false,
            is_draft,
            errors: Vec::new(),
            field_errors: ErrorState::new(),
            storage,
            submit,
            options,
            autosave_task: None,
        })
    }

    // ─── Data updates ───────────────────────────────────────────────────────

    /// Merge a partial update into the form data. Performs no validation —
    /// validation is deferred to transition time. Schedules a debounced
    /// autosave when enabled.
    pub fn update_form_data(&mut self, partial: Value) {
        deep_merge(&mut self.data, partial);
        self.is_draft = true;
        self.arm_autosave();
    }

    /// Validate one field's current value for live feedback, maintained in
    /// the side error map independent of the step-gate errors
    pub fn validate_field_live(&mut self, field: &str, value: &Value) -> Option<FormError> {
        let result = validation::validate_field(field, value, &self.full_schema);
        self.field_errors.apply(field, result.as_ref());
        result
    }

    // ─── Step transitions ───────────────────────────────────────────────────

    /// Validate the subset of form data the current step owns. Replaces the
    /// step-gate errors with the result (empty on success).
    pub fn validate_current_step(&mut self) -> bool {
        self.is_loading = true;
        let subset = self.step_data(self.current_step_index);
        let outcome = validation::validate(&subset, &self.steps[self.current_step_index].schema);
        self.errors = outcome.errors;
        self.is_loading = false;
        outcome.is_valid
    }

    /// Advance to the next step if the current one validates. Returns
    /// `false` (leaving the user on the step with populated errors) when
    /// validation fails or the last step is already active.
    pub fn next_step(&mut self) -> bool {
        if !self.validate_current_step() {
            debug!(
                step = self.current_step_index,
                errors = self.errors.len(),
                "step blocked by validation"
            );
            return false;
        }
        if self.is_last_step() {
            return false;
        }
        self.current_step_index += 1;
        self.errors.clear();
        self.notify_step_change();
        true
    }

    /// Retreat to the previous step. Never validates — users may always go
    /// back. Returns `false` only on the first step.
    pub fn previous_step(&mut self) -> bool {
        if self.is_first_step() {
            return false;
        }
        self.current_step_index -= 1;
        self.errors.clear();
        self.notify_step_change();
        true
    }

    /// Jump directly to a step (step-indicator navigation). The index is
    /// clamped to the valid range; intervening steps are not validated.
    /// Returns the effective index.
    pub fn go_to_step(&mut self, index: usize) -> usize {
        let clamped = index.min(self.steps.len() - 1);
        self.current_step_index = clamped;
        self.errors.clear();
        self.notify_step_change();
        clamped
    }

    /// Apply an event returned by a step view
    pub fn handle_step_event(&mut self, event: StepEvent) {
        match event {
            StepEvent::DataChanged(partial) => self.update_form_data(partial),
            StepEvent::Next => {
                self.next_step();
            }
            StepEvent::Previous => {
                self.previous_step();
            }
        }
    }

    // ─── Submission lifecycle ───────────────────────────────────────────────

    /// Validate the entire aggregate against the whole-object schema, then
    /// invoke the submit handler. On success the persisted draft is cleared
    /// and state resets to defaults; on failure data and step are preserved
    /// so the user can retry. The submit handler is invoked at most once and
    /// only when validation passes.
    pub async fn submit_form(&mut self) -> Result<(), FormEngineError> {
        self.is_submitting = true;
        self.errors.clear();
        // A pending autosave must not rewrite the draft after a successful
        // submission clears it
        self.cancel_autosave();

        let outcome = validation::validate(&self.data, &self.full_schema);
        if !outcome.is_valid {
            self.errors.clone_from(&outcome.errors);
            self.is_submitting = false;
            return Err(FormEngineError::Validation(outcome.errors));
        }

        let typed: T = match serde_json::from_value(self.data.clone()) {
            Ok(typed) => typed,
            Err(err) => {
                let engine_err = FormEngineError::Decode(err);
                self.errors = vec![validation::unexpected_error(engine_err.to_string())];
                self.notify_error(&engine_err);
                self.is_submitting = false;
                return Err(engine_err);
            }
        };

        let submit = Arc::clone(&self.submit);
        match submit.submit(typed).await {
            Ok(()) => {
                self.storage.clear_data();
                self.data = self.defaults.clone();
                self.current_step_index = 0;
                self.errors.clear();
                self.field_errors.clear_errors();
                self.is_draft = false;
                self.is_submitting = false;
                debug!("submission succeeded, form reset");
                Ok(())
            }
            Err(err) => {
                error!("submission failed: {err}");
                let engine_err = FormEngineError::Submission(err);
                self.notify_error(&engine_err);
                self.is_submitting = false;
                Err(engine_err)
            }
        }
    }

    /// Restore defaults and clear the persisted draft
    pub fn reset_form(&mut self) {
        self.cancel_autosave();
        self.data = self.defaults.clone();
        self.current_step_index = 0;
        self.errors.clear();
        self.field_errors.clear_errors();
        self.is_draft = false;
        self.storage.clear_data();
    }

    // ─── Explicit draft lifecycle (independent of the autosave timer) ───────

    pub fn save_draft(&self) {
        self.storage.save_data(&self.data);
    }

    /// Load the persisted draft into the working data. Returns whether a
    /// valid draft existed.
    pub fn load_draft(&mut self) -> bool {
        match self.storage.load_data() {
            Some(draft) => {
                self.data = draft;
                self.is_draft = true;
                true
            }
            None => false,
        }
    }

    pub fn clear_draft(&self) {
        self.storage.clear_data();
    }

    pub fn has_saved_draft(&self) -> bool {
        self.storage.has_saved_data()
    }

    // ─── Derived / read-only state ──────────────────────────────────────────

    pub fn current_step(&self) -> &FormStepConfig {
        &self.steps[self.current_step_index]
    }

    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    pub fn total_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn is_first_step(&self) -> bool {
        self.current_step_index == 0
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step_index + 1 == self.steps.len()
    }

    pub fn can_go_next(&self) -> bool {
        !self.is_last_step() && !self.is_busy()
    }

    pub fn can_go_previous(&self) -> bool {
        !self.is_first_step() && !self.is_busy()
    }

    pub fn is_busy(&self) -> bool {
        self.is_loading || self.is_submitting
    }

    pub fn is_submitting(&self) -> bool {
        self.is_submitting
    }

    pub fn is_draft(&self) -> bool {
        self.is_draft
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Decode the working data into the typed aggregate
    pub fn typed_data(&self) -> Result<T, FormEngineError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    pub fn errors(&self) -> &[FormError] {
        &self.errors
    }

    /// Step-gate errors as a `field → message` map for display. Errors with
    /// no field are keyed under `form`.
    pub fn error_map(&self) -> BTreeMap<String, String> {
        self.errors
            .iter()
            .map(|e| {
                (
                    e.field.clone().unwrap_or_else(|| "form".to_string()),
                    e.message.clone(),
                )
            })
            .collect()
    }

    pub fn field_errors(&self) -> &ErrorState {
        &self.field_errors
    }

    /// Everything the current step's view needs: the data subset the step
    /// owns, the error map, and the busy flag
    pub fn step_props(&self) -> StepProps {
        StepProps {
            data: self.step_data(self.current_step_index),
            errors: self.error_map(),
            is_loading: self.is_busy(),
        }
    }

    pub fn progress(&self) -> FormProgress {
        FormProgress {
            current_index: self.current_step_index,
            total_steps: self.steps.len(),
            titles: self.steps.iter().map(|s| s.title.clone()).collect(),
        }
    }

    // ─── Internals ──────────────────────────────────────────────────────────

    fn step_data(&self, index: usize) -> Value {
        let mut subset = serde_json::Map::new();
        if let Value::Object(data) = &self.data {
            for field in &self.steps[index].fields {
                if let Some(value) = data.get(field) {
                    subset.insert(field.clone(), value.clone());
                }
            }
        }
        Value::Object(subset)
    }

    fn notify_step_change(&self) {
        debug!(step = self.current_step_index, "step changed");
        if let Some(hook) = &self.options.on_step_change {
            hook(&self.steps[self.current_step_index], &self.data);
        }
    }

    fn notify_error(&self, err: &FormEngineError) {
        if let Some(hook) = &self.options.on_error {
            hook(err);
        }
    }

    /// (Re)arm the single-shot autosave timer with a snapshot of the
    /// current data; rapid edits collapse to one write
    fn arm_autosave(&mut self) {
        if !self.options.auto_save {
            return;
        }
        self.cancel_autosave();
        let Ok(handle) = Handle::try_current() else {
            debug!("autosave skipped: no async runtime");
            return;
        };
        let storage = Arc::clone(&self.storage);
        let snapshot = self.data.clone();
        let delay = self.options.autosave_delay;
        self.autosave_task = Some(handle.spawn(async move {
            tokio::time::sleep(delay).await;
            storage.save_data(&snapshot);
        }));
    }

    fn cancel_autosave(&mut self) {
        if let Some(task) = self.autosave_task.take() {
            task.abort();
        }
    }
}

impl<T, B> Drop for FormEngine<T, B>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    B: StorageBackend + 'static,
{
    fn drop(&mut self) {
        self.cancel_autosave();
    }
}

/// Merge a partial JSON object into a target: nested objects merge key-wise,
/// arrays and scalars replace
fn deep_merge(target: &mut Value, patch: Value) {
    match patch {
        Value::Object(patch_map) => {
            if let Value::Object(target_map) = target {
                for (key, value) in patch_map {
                    match target_map.get_mut(&key) {
                        Some(slot) => deep_merge(slot, value),
                        None => {
                            target_map.insert(key, value);
                        }
                    }
                }
            } else {
                *target = Value::Object(patch_map);
            }
        }
        other => *target = other,
    }
}
