//! Analysis dispatch
//!
//! Hands a validated job to the external automation webhook. A job with an
//! attachment is sent as `multipart/form-data` with the file under
//! [`FILE_FIELD`]; otherwise the same fields go as a JSON object. Identity
//! fields are resolved from the stored profile on every call.

mod client;
mod multipart;
mod payload;

pub use client::WebhookClient;
pub use multipart::MultipartForm;
pub use payload::{AnalysisPayload, IdentityFields, InputMethod, SourceType, form_value};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::WebhookConfig;
use crate::domain::Attachment;
use crate::identity::Session;
use crate::store::{ProfileStore, StoreError};

/// Multipart field that carries the uploaded sheet
pub const FILE_FIELD: &str = "data";

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("User profile not found. Please complete your profile setup.")]
    ProfileNotFound,

    #[error("profile lookup failed: {0}")]
    ProfileLookup(#[source] StoreError),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("webhook failed: {status}")]
    Status { status: u16, body: String },

    #[error("webhook unreachable: {0}")]
    Transport(String),

    #[error("webhook returned an unreadable body: {0}")]
    Decode(String),

    #[error("dispatch task aborted: {0}")]
    Aborted(String),
}

impl DispatchError {
    /// Stable code shown to the submitter
    pub fn code(&self) -> &'static str {
        match self {
            DispatchError::ProfileNotFound | DispatchError::ProfileLookup(_) => {
                "PROFILE_NOT_FOUND"
            }
            _ => "DISPATCH_FAILED",
        }
    }
}

/// Outbound seam to the analysis workflow
#[async_trait]
pub trait AnalysisDispatch: Send + Sync {
    /// Returns the parsed JSON response body
    async fn dispatch(
        &self,
        session: &Session,
        payload: &AnalysisPayload,
        attachment: Option<&Attachment>,
    ) -> Result<Value, DispatchError>;
}

/// Build the identity block from the session and the stored profile
pub async fn resolve_identity(
    session: &Session,
    profiles: &dyn ProfileStore,
) -> Result<IdentityFields, DispatchError> {
    let profile = profiles
        .get_profile(&session.user_id)
        .await
        .map_err(DispatchError::ProfileLookup)?
        .ok_or(DispatchError::ProfileNotFound)?;

    let session_email = session.email.clone().filter(|e| !e.trim().is_empty());

    Ok(IdentityFields {
        user_id: session.user_id.clone(),
        user_email: session_email.clone().unwrap_or_else(|| profile.email.clone()),
        username: profile.username,
        google_email: profile.google_email.or(session_email),
        google_connected: profile.google_connected,
    })
}

/// [`AnalysisDispatch`] over the configured webhook
pub struct WebhookDispatcher {
    client: WebhookClient,
    profiles: Arc<dyn ProfileStore>,
}

impl WebhookDispatcher {
    pub fn new(client: WebhookClient, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { client, profiles }
    }

    pub fn from_config(config: &WebhookConfig, profiles: Arc<dyn ProfileStore>) -> Self {
        Self::new(
            WebhookClient::new(config.url.clone(), config.connect_timeout()),
            profiles,
        )
    }
}

#[async_trait]
impl AnalysisDispatch for WebhookDispatcher {
    async fn dispatch(
        &self,
        session: &Session,
        payload: &AnalysisPayload,
        attachment: Option<&Attachment>,
    ) -> Result<Value, DispatchError> {
        let identity = resolve_identity(session, self.profiles.as_ref()).await?;
        let fields = payload.wire_fields(&identity)?;

        tracing::info!(
            "Dispatching {:?} analysis for {} to {} (test id: {})",
            payload.input_method,
            identity.user_id,
            self.client.url(),
            payload.test_id.as_deref().unwrap_or("none")
        );

        let client = self.client.clone();
        let file = attachment.cloned();
        tokio::task::spawn_blocking(move || match file {
            Some(file) => client.post_multipart(&fields, &file),
            None => client.post_json(&fields),
        })
        .await
        .map_err(|e| DispatchError::Aborted(e.to_string()))?
    }
}
