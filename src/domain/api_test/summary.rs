use serde::{Deserialize, Serialize};

/// Result counters written by the automation workflow on completion.
///
/// Unknown keys are kept in `extra` so nothing the workflow reports is lost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestResultSummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_urls: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities_found: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub high: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medium: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TestResultSummary {
    /// Sum of the per-severity counters that were reported
    pub fn severity_total(&self) -> u32 {
        [self.critical, self.high, self.medium, self.low]
            .into_iter()
            .flatten()
            .sum()
    }
}
