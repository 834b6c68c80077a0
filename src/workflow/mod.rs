//! Submission workflow
//!
//! Turns a [`SubmissionForm`] into exactly one scan job:
//!
//! ```text
//! CollectingInput ─► Validating ─► CreatingRecord ─► Dispatching ─► Initiated
//!                        │                                 │
//!                        └──────────► Failed ◄─────────────┘
//! ```
//!
//! Validation failures never touch the store or the network. Record creation
//! always precedes dispatch; if it fails the job is still dispatched, only
//! without a `Test ID`.

mod error;
mod form;
mod validate;

pub use error::SubmissionError;
pub use form::{BatchSource, CorsSettings, InputMode, SubmissionForm, TestSelection};
pub use validate::{
    ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES, MAX_ATTACHMENT_BYTES, Targets, ValidatedSubmission,
    validate, validate_attachment,
};

use std::sync::Arc;

use serde_json::Value;

use crate::dispatch::{AnalysisDispatch, SourceType};
use crate::identity::Session;
use crate::store::TestStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionPhase {
    CollectingInput,
    Validating,
    CreatingRecord,
    Dispatching,
    Initiated,
    Failed,
}

/// Result of a submission that reached the workflow
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    /// Record created before dispatch, if creation succeeded
    pub test_id: Option<String>,
    pub url_count: usize,
    pub source: SourceType,
    /// Webhook response body
    pub response: Value,
}

impl SubmissionOutcome {
    /// Confirmation shown to the submitter
    pub fn message(&self) -> String {
        match self.source {
            SourceType::Upload => {
                "File uploaded successfully! Track progress in Test History.".to_string()
            }
            SourceType::Manual => {
                let noun = if self.url_count == 1 { "URL" } else { "URLs" };
                format!(
                    "Testing started for {} {}. Track progress in Test History.",
                    self.url_count, noun
                )
            }
        }
    }
}

/// Drives one form through validation, record creation and dispatch
pub struct SubmissionWorkflow {
    tests: Arc<dyn TestStore>,
    dispatcher: Arc<dyn AnalysisDispatch>,
    phase: SubmissionPhase,
}

impl SubmissionWorkflow {
    pub fn new(tests: Arc<dyn TestStore>, dispatcher: Arc<dyn AnalysisDispatch>) -> Self {
        Self {
            tests,
            dispatcher,
            phase: SubmissionPhase::CollectingInput,
        }
    }

    pub fn phase(&self) -> SubmissionPhase {
        self.phase
    }

    /// Validate, create the record, dispatch. The form is reset on success.
    pub async fn submit(
        &mut self,
        session: Option<&Session>,
        form: &mut SubmissionForm,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        self.enter(SubmissionPhase::Validating);
        let validated = match validate(session, form) {
            Ok(validated) => validated,
            Err(e) => {
                tracing::debug!("Submission rejected: {} ({})", e, e.code());
                self.enter(SubmissionPhase::Failed);
                return Err(e);
            }
        };

        self.enter(SubmissionPhase::CreatingRecord);
        let user_id = &validated.session.user_id;
        let test_id = match self.tests.create(user_id, validated.new_record()).await {
            Ok(record) => {
                tracing::info!("Created test record {} for {}", record.id, user_id);
                Some(record.id)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to create test record for {}, dispatching without Test ID: {}",
                    user_id,
                    e
                );
                None
            }
        };

        self.enter(SubmissionPhase::Dispatching);
        let payload = validated.payload(test_id.as_deref());
        let response = match self
            .dispatcher
            .dispatch(&validated.session, &payload, validated.attachment())
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(
                    "Dispatch failed (test id: {}): {}",
                    test_id.as_deref().unwrap_or("none"),
                    e
                );
                self.enter(SubmissionPhase::Failed);
                return Err(SubmissionError::DispatchFailed(e));
            }
        };

        let outcome = SubmissionOutcome {
            test_id,
            url_count: validated.urls().len(),
            source: validated.source_type(),
            response,
        };
        form.reset();
        self.enter(SubmissionPhase::Initiated);
        tracing::info!("{}", outcome.message());
        Ok(outcome)
    }

    fn enter(&mut self, next: SubmissionPhase) {
        tracing::debug!("Submission phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
    }
}
