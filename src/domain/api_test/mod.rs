//! Scan job records tracked per user.

mod status;
mod summary;
mod types;
mod update;

pub use status::TestStatus;
pub use summary::TestResultSummary;
pub use types::{CorsMode, TestType};
pub use update::{ProcessorUpdate, TransitionError};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Name shown when a record carries no `test_name`
const FALLBACK_NAME: &str = "Your test";

/// A persisted scan job.
///
/// The client creates the record and afterwards only reads it, apart from
/// flipping `notification_read`. Everything else after creation is owned by
/// the external automation workflow (see [`ProcessorUpdate`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTest {
    /// Store-assigned id, immutable
    pub id: String,
    /// Owner, immutable
    pub user_id: String,

    pub test_name: Option<String>,
    /// Targets in submission order; empty while an uploaded sheet awaits extraction
    pub urls: Vec<String>,
    pub test_types: Vec<TestType>,
    pub cors_mode: Option<CorsMode>,
    /// Only set for active CORS tests
    pub origin_url: Option<String>,
    #[serde(default)]
    pub recipient_emails: Vec<String>,

    pub status: TestStatus,
    /// 0-100
    pub progress: u8,

    /// Present only when `status == Completed`
    pub result_summary: Option<TestResultSummary>,
    pub report_url: Option<String>,
    /// Present only when `status == Failed`
    pub error_message: Option<String>,

    #[serde(default)]
    pub email_sent: bool,
    #[serde(default)]
    pub notification_read: bool,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl ApiTest {
    /// Name for notices and listings
    pub fn display_name(&self) -> &str {
        self.test_name.as_deref().unwrap_or(FALLBACK_NAME)
    }

    /// A finished scan the user has not been told about yet
    pub fn needs_completion_notice(&self) -> bool {
        self.status == TestStatus::Completed && !self.notification_read
    }
}

/// Client-supplied fields for a new record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewApiTest {
    pub test_name: Option<String>,
    pub urls: Vec<String>,
    pub test_types: Vec<TestType>,
    pub cors_mode: Option<CorsMode>,
    pub origin_url: Option<String>,
    pub recipient_emails: Vec<String>,
    /// Contact stored in metadata, falls back to the session email
    pub user_email: Option<String>,
    /// Display name stored in metadata
    pub username: Option<String>,
}

impl NewApiTest {
    /// Explicit name, or one derived from the selection,
    /// e.g. `"http header analysis, SSL / TLS analysis - 2 URLs - Oct 19, 02:56 PM"`.
    ///
    /// CORS has no analysis name and is left out. A pending upload has no
    /// urls yet and counts as one target.
    pub fn resolved_name(&self, now: DateTime<Utc>) -> String {
        if let Some(name) = self.test_name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }

        let names: Vec<&str> = self
            .test_types
            .iter()
            .filter_map(|t| t.analysis_name())
            .collect();
        let types = if names.is_empty() {
            "Security Test".to_string()
        } else {
            names.join(", ")
        };
        let count = self.urls.len().max(1);
        let plural = if count == 1 { "" } else { "s" };
        let stamp = now.with_timezone(&Local).format("%b %-d, %I:%M %p");

        format!("{types} - {count} URL{plural} - {stamp}")
    }
}

/// Per-user record counts grouped by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStatistics {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl TestStatistics {
    /// Recount from a full set of statuses
    pub fn from_statuses(statuses: impl IntoIterator<Item = TestStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut stats, status| {
            stats.total += 1;
            match status {
                TestStatus::Pending => stats.pending += 1,
                TestStatus::Processing => stats.processing += 1,
                TestStatus::Completed => stats.completed += 1,
                TestStatus::Failed => stats.failed += 1,
            }
            stats
        })
    }
}
