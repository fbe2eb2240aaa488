//! Moveform - multi-step service request form engine
//!
//! Coordinates step navigation, per-step and whole-form validation, draft
//! auto-persistence with expiry/versioning, and the submission lifecycle.
//! Rendering and transport are injected collaborators (see [`contract`]);
//! the engine owns only the state machine.

pub mod contract;
pub mod engine;
pub mod error;
pub mod request;
pub mod schema;
pub mod storage;
pub mod validation;

pub use contract::{FormStepConfig, StepEvent, StepProps, StepView, SubmitHandler};
pub use engine::{FormEngine, FormEngineOptions, FormProgress};
pub use error::{BoxError, FormEngineError, FormError};
pub use request::ServiceRequestFormData;
pub use schema::{FieldRules, Schema, ViolationCode};
pub use storage::{FileBackend, FormStorage, MemoryBackend, StorageBackend};
pub use validation::{AsyncValidator, ErrorState, ValidationOutcome};
