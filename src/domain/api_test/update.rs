//! Writes performed by the external automation workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ApiTest, TestResultSummary, TestStatus};

/// A partial update as written back by the automation workflow
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessorUpdate {
    pub status: Option<TestStatus>,
    pub progress: Option<u8>,
    pub result_summary: Option<TestResultSummary>,
    pub report_url: Option<String>,
    pub error_message: Option<String>,
    pub email_sent: Option<bool>,
}

impl ProcessorUpdate {
    pub fn processing(progress: u8) -> Self {
        Self {
            status: Some(TestStatus::Processing),
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn completed(summary: TestResultSummary) -> Self {
        Self {
            status: Some(TestStatus::Completed),
            result_summary: Some(summary),
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: Some(TestStatus::Failed),
            error_message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn with_report_url(mut self, url: impl Into<String>) -> Self {
        self.report_url = Some(url.into());
        self
    }

    pub fn with_email_sent(mut self, sent: bool) -> Self {
        self.email_sent = Some(sent);
        self
    }
}

/// A processor update that would break a record invariant
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("status cannot move from {from} to {to}")]
    StatusRegression { from: TestStatus, to: TestStatus },

    #[error("progress cannot go back from {from} to {to}")]
    ProgressRegression { from: u8, to: u8 },

    #[error("progress {0} is outside 0-100")]
    ProgressOutOfRange(u8),

    #[error("result summary is only allowed on completed tests")]
    SummaryWithoutCompletion,

    #[error("error message is only allowed on failed tests")]
    ErrorWithoutFailure,
}

impl ApiTest {
    /// Apply a workflow update, rejecting it as a whole if any invariant would break.
    ///
    /// `started_at` is stamped on the first move out of `pending`, `completed_at`
    /// on the move into a terminal status. Completion pins progress at 100.
    pub fn apply_processor_update(
        &mut self,
        update: ProcessorUpdate,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        let next = update.status.unwrap_or(self.status);
        if !self.status.can_transition_to(next) {
            return Err(TransitionError::StatusRegression {
                from: self.status,
                to: next,
            });
        }
        if update.result_summary.is_some() && next != TestStatus::Completed {
            return Err(TransitionError::SummaryWithoutCompletion);
        }
        if update.error_message.is_some() && next != TestStatus::Failed {
            return Err(TransitionError::ErrorWithoutFailure);
        }

        let mut progress = match update.progress {
            Some(p) if p > 100 => return Err(TransitionError::ProgressOutOfRange(p)),
            Some(p) if p < self.progress => {
                return Err(TransitionError::ProgressRegression {
                    from: self.progress,
                    to: p,
                });
            }
            Some(p) => p,
            None => self.progress,
        };

        if next != TestStatus::Pending && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if next.is_terminal() && !self.status.is_terminal() {
            self.completed_at = Some(now);
        }
        if next == TestStatus::Completed {
            progress = 100;
        }

        self.status = next;
        self.progress = progress;
        if let Some(summary) = update.result_summary {
            self.result_summary = Some(summary);
        }
        if let Some(message) = update.error_message {
            self.error_message = Some(message);
        }
        if let Some(url) = update.report_url {
            self.report_url = Some(url);
        }
        if let Some(sent) = update.email_sent {
            self.email_sent = sent;
        }
        Ok(())
    }
}
