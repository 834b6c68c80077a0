//! Blocking HTTP client for the automation webhook.

use std::time::Duration;

use serde_json::{Map, Value};

use super::multipart::MultipartForm;
use super::payload::form_value;
use super::{DispatchError, FILE_FIELD};
use crate::domain::Attachment;

/// Posts analysis jobs to one webhook URL
#[derive(Clone)]
pub struct WebhookClient {
    url: String,
    client: ureq::Agent,
}

impl WebhookClient {
    pub fn new(url: impl Into<String>, connect_timeout: Duration) -> Self {
        let client = ureq::AgentBuilder::new()
            .timeout_connect(connect_timeout)
            .build();

        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send the fields as one JSON object
    pub fn post_json(&self, fields: &Map<String, Value>) -> Result<Value, DispatchError> {
        tracing::debug!("POST {} (json, {} fields)", self.url, fields.len());
        let response = self.client.post(&self.url).send_json(fields);
        read_response(response)
    }

    /// Send the file under `data` plus every field as a text part
    pub fn post_multipart(
        &self,
        fields: &Map<String, Value>,
        file: &Attachment,
    ) -> Result<Value, DispatchError> {
        let mut form = MultipartForm::new();
        form.file(
            FILE_FIELD,
            &file.file_name,
            file.wire_content_type(),
            &file.bytes,
        );
        for (name, value) in fields {
            form.text(name, &form_value(value));
        }
        let (content_type, body) = form.finish();

        tracing::debug!(
            "POST {} (multipart, {} bytes, file {})",
            self.url,
            body.len(),
            file.file_name
        );
        let response = self
            .client
            .post(&self.url)
            .set("Content-Type", &content_type)
            .send_bytes(&body);
        read_response(response)
    }
}

fn read_response(result: Result<ureq::Response, ureq::Error>) -> Result<Value, DispatchError> {
    match result {
        Ok(response) => {
            let status = response.status();
            let text = response
                .into_string()
                .map_err(|e| DispatchError::Transport(e.to_string()))?;
            tracing::debug!("Webhook answered {} ({} bytes)", status, text.len());
            parse_body(&text).inspect_err(|e| tracing::error!("Webhook reply dropped: {}", e))
        }
        Err(ureq::Error::Status(status, response)) => {
            let body = response.into_string().unwrap_or_default();
            tracing::error!("Webhook rejected job: {} {}", status, body);
            Err(DispatchError::Status { status, body })
        }
        Err(ureq::Error::Transport(transport)) => {
            tracing::error!("Webhook unreachable: {}", transport);
            Err(DispatchError::Transport(transport.to_string()))
        }
    }
}

/// A success reply must carry JSON; an empty body counts as unreadable too
fn parse_body(text: &str) -> Result<Value, DispatchError> {
    serde_json::from_str(text).map_err(|e| DispatchError::Decode(e.to_string()))
}
