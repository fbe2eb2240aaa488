//! End-to-end wizard scenarios against the public API
//!
//! Drives the engine the way a host application would: seed the service
//! request steps, edit via partial updates, navigate with validation gates,
//! and submit through an injected handler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use moveform::engine::{FormEngine, FormEngineOptions};
use moveform::error::BoxError;
use moveform::request::{default_form_data, service_request_steps, ServiceRequestFormData};
use moveform::storage::{FileBackend, FormStorage, MemoryBackend, DEFAULT_PERSISTENCE_KEY};
use moveform::{FormEngineError, SubmitHandler, ViolationCode};

struct CountingSubmit {
    calls: AtomicUsize,
    fail: bool,
}

impl CountingSubmit {
    fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
        })
    }
}

#[async_trait]
impl SubmitHandler<ServiceRequestFormData> for CountingSubmit {
    async fn submit(&self, data: ServiceRequestFormData) -> Result<(), BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!data.contact_email.is_empty(), "validated data expected");
        if self.fail {
            Err("gateway timeout".into())
        } else {
            Ok(())
        }
    }
}

fn new_engine(
    submit: Arc<CountingSubmit>,
) -> FormEngine<ServiceRequestFormData, MemoryBackend> {
    FormEngine::new(
        service_request_steps(),
        &ServiceRequestFormData::default(),
        submit,
        MemoryBackend::new(),
        FormEngineOptions::default(),
    )
    .expect("step configuration is valid")
}

fn fill_all_steps(engine: &mut FormEngine<ServiceRequestFormData, MemoryBackend>) {
    engine.update_form_data(json!({
        "contact_name": "Jo Bloggs",
        "contact_email": "jo@example.com",
        "contact_phone": "+44 20 7946 0958",
        "pickup_location": {"address": "123 Main St", "postcode": "N1 9GU"},
        "dropoff_location": {"address": "9 Station Road"},
        "moving_items": [
            {"name": "Sofa", "category": "furniture", "quantity": 1, "fragile": false},
            {"name": "Boxes", "category": "misc", "quantity": 12}
        ],
        "service_type": "residential_move",
        "item_size": "medium",
        "preferred_date": "2026-09-14",
        "preferred_time": "morning",
        "priority": "standard"
    }));
}

#[test]
fn invalid_email_blocks_first_step_then_fix_advances() {
    let mut engine = new_engine(CountingSubmit::ok());
    engine.update_form_data(json!({
        "contact_name": "Jo",
        "contact_email": "not-an-email",
        "contact_phone": "+44 20 7946 0958"
    }));

    assert!(!engine.next_step());
    assert_eq!(engine.current_step_index(), 0);
    let email_error = engine
        .errors()
        .iter()
        .find(|e| e.field.as_deref() == Some("contact_email"))
        .expect("email error reported");
    assert_eq!(email_error.code, Some(ViolationCode::InvalidFormat));

    engine.update_form_data(json!({"contact_email": "jo@example.com"}));
    assert!(engine.next_step());
    assert_eq!(engine.current_step_index(), 1);
    assert!(engine.errors().is_empty());
}

#[tokio::test]
async fn identical_addresses_fail_submission_regardless_of_other_fields() {
    let submit = CountingSubmit::ok();
    let mut engine = new_engine(Arc::clone(&submit));
    fill_all_steps(&mut engine);
    engine.update_form_data(json!({
        "dropoff_location": {"address": "123 Main St"}
    }));

    let err = engine.submit_form().await.expect_err("must fail validation");
    let errors = err.validation_errors();
    assert!(errors
        .iter()
        .any(|e| e.field.as_deref() == Some("dropoff_location.address")));
    assert_eq!(submit.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn full_walkthrough_submits_once_and_resets() {
    let submit = CountingSubmit::ok();
    let mut engine = new_engine(Arc::clone(&submit));
    fill_all_steps(&mut engine);

    assert!(engine.next_step());
    assert!(engine.next_step());
    assert!(engine.next_step());
    assert!(engine.is_last_step());
    engine.save_draft();

    engine.submit_form().await.expect("submission succeeds");
    assert_eq!(submit.calls.load(Ordering::SeqCst), 1);
    assert!(!engine.has_saved_draft());
    assert_eq!(engine.data(), &default_form_data());
    assert!(engine.is_first_step());
}

#[tokio::test]
async fn failed_submission_keeps_everything_for_retry() {
    let submit = CountingSubmit::failing();
    let mut engine = new_engine(Arc::clone(&submit));
    fill_all_steps(&mut engine);
    engine.go_to_step(3);
    engine.save_draft();

    let err = engine.submit_form().await.expect_err("handler rejects");
    assert!(matches!(err, FormEngineError::Submission(_)));
    assert_eq!(submit.calls.load(Ordering::SeqCst), 1);
    assert!(engine.has_saved_draft());
    assert_eq!(engine.current_step_index(), 3);
    assert_eq!(engine.data()["contact_name"], "Jo Bloggs");
    assert!(engine.can_go_previous());
}

#[test]
fn jumping_over_steps_skips_their_validation() {
    let mut engine = new_engine(CountingSubmit::ok());
    // Nothing is filled in, yet direct jumps land anywhere
    assert_eq!(engine.go_to_step(3), 3);
    assert!(engine.errors().is_empty());
    assert_eq!(engine.go_to_step(0), 0);
}

#[test]
fn draft_survives_engine_restart_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    {
        let backend = FileBackend::new(dir.path()).unwrap();
        let mut engine = FormEngine::new(
            service_request_steps(),
            &ServiceRequestFormData::default(),
            CountingSubmit::ok(),
            backend,
            FormEngineOptions::default(),
        )
        .unwrap();
        engine.update_form_data(json!({"contact_name": "Saved Jo"}));
        engine.save_draft();
    }

    let backend = FileBackend::new(dir.path()).unwrap();
    let engine = FormEngine::new(
        service_request_steps(),
        &ServiceRequestFormData::default(),
        CountingSubmit::ok(),
        backend,
        FormEngineOptions::default(),
    )
    .unwrap();
    assert!(engine.is_draft());
    assert_eq!(engine.data()["contact_name"], "Saved Jo");
}

#[test]
fn save_round_trips_typed_aggregate() {
    let storage: FormStorage<ServiceRequestFormData, MemoryBackend> =
        FormStorage::new(MemoryBackend::new(), DEFAULT_PERSISTENCE_KEY);
    let data = ServiceRequestFormData {
        contact_name: "Round Trip".to_string(),
        staff_count: 3,
        ..ServiceRequestFormData::default()
    };

    storage.save_data(&data);
    assert!(storage.has_saved_data());
    assert_eq!(storage.load_data(), Some(data));
}
