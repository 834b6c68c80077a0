//! Wire shape of a dispatch request.
//!
//! Field names are a contract with the automation workflow and must keep
//! their exact casing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the targets were entered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMethod {
    /// One URL
    Single,
    /// Several pasted links
    Multiple,
    /// An uploaded sheet the workflow extracts URLs from
    List,
}

/// Where the targets came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Manual,
    Upload,
}

/// The job description sent to the automation workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(rename = "Input Method")]
    pub input_method: InputMethod,

    #[serde(rename = "Source Type")]
    pub source_type: SourceType,

    /// First target, or empty for uploads
    #[serde(rename = "Landing Page Url")]
    pub landing_page_url: String,

    #[serde(rename = "Batch URLs")]
    pub batch_urls: Vec<String>,

    #[serde(rename = "Analysis Type")]
    pub analysis_types: Vec<String>,

    #[serde(
        rename = "Cors Analysis Type",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub cors_analysis_type: Option<String>,

    #[serde(rename = "Origin", default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Comma-space joined
    #[serde(
        rename = "Recipient Emails",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub recipient_emails: Option<String>,

    /// Record id, when one was created before dispatch
    #[serde(rename = "Test ID", default, skip_serializing_if = "Option::is_none")]
    pub test_id: Option<String>,
}

impl AnalysisPayload {
    /// Payload and identity merged into one flat object
    pub fn wire_fields(
        &self,
        identity: &IdentityFields,
    ) -> Result<Map<String, Value>, serde_json::Error> {
        let mut fields = into_object(serde_json::to_value(self)?);
        fields.extend(into_object(serde_json::to_value(identity)?));
        Ok(fields)
    }
}

/// Who submitted the job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityFields {
    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "userEmail")]
    pub user_email: String,

    pub username: String,

    #[serde(rename = "googleEmail", default, skip_serializing_if = "Option::is_none")]
    pub google_email: Option<String>,

    #[serde(rename = "googleConnected")]
    pub google_connected: bool,
}

/// Multipart companion value: strings go as-is, everything else as JSON
pub fn form_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
