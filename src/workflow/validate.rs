//! Submit-time validation and payload construction.

use super::SubmissionError;
use super::form::{BatchSource, InputMode, SubmissionForm};
use crate::dispatch::{AnalysisPayload, InputMethod, SourceType};
use crate::domain::{Attachment, CorsMode, NewApiTest, TestType};
use crate::identity::Session;

/// Upload size limit (5 MiB)
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

pub const ALLOWED_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".csv"];

pub const ALLOWED_MIME_TYPES: [&str; 3] = [
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.ms-excel",
    "text/csv",
];

/// Type check first (extension or MIME may match), then size
pub fn validate_attachment(attachment: &Attachment) -> Result<(), SubmissionError> {
    let extension_ok = attachment
        .extension()
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()));
    let mime_ok = attachment
        .content_type
        .as_deref()
        .is_some_and(|mime| ALLOWED_MIME_TYPES.contains(&mime));

    if !extension_ok && !mime_ok {
        return Err(SubmissionError::InvalidFileType {
            file_name: attachment.file_name.clone(),
        });
    }
    if attachment.size() > MAX_ATTACHMENT_BYTES {
        return Err(SubmissionError::FileTooLarge {
            size: attachment.size(),
        });
    }
    Ok(())
}

/// What the job scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Targets {
    /// Typed or pasted URLs, blanks removed
    Urls(Vec<String>),
    /// A sheet the workflow extracts URLs from
    Upload(Attachment),
}

/// A form that passed every check, bound to the submitting session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSubmission {
    pub session: Session,
    pub targets: Targets,
    pub test_types: Vec<TestType>,
    pub cors_mode: Option<CorsMode>,
    /// Set only for active CORS
    pub origin_url: Option<String>,
    /// Trimmed, blank-free, first occurrence wins
    pub recipients: Vec<String>,
}

/// Check the form in a fixed order; the first violation wins
pub fn validate(
    session: Option<&Session>,
    form: &SubmissionForm,
) -> Result<ValidatedSubmission, SubmissionError> {
    let session = session.ok_or(SubmissionError::NotAuthenticated)?;

    let targets = match form.input() {
        None => return Err(SubmissionError::NoInputMode),
        Some(InputMode::Single { url }) => {
            let url = url.trim();
            if url.is_empty() {
                return Err(SubmissionError::MissingUrl);
            }
            Targets::Urls(vec![url.to_string()])
        }
        Some(InputMode::Batch { source: None }) => return Err(SubmissionError::NoListSource),
        Some(InputMode::Batch {
            source: Some(BatchSource::Links(links)),
        }) => {
            let urls: Vec<String> = links
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect();
            if urls.is_empty() {
                return Err(SubmissionError::NoValidUrls);
            }
            Targets::Urls(urls)
        }
        Some(InputMode::Batch {
            source: Some(BatchSource::File(file)),
        }) => {
            let file = file.as_ref().ok_or(SubmissionError::NoFile)?;
            validate_attachment(file)?;
            Targets::Upload(file.clone())
        }
    };

    if form.selection().is_empty() {
        return Err(SubmissionError::NoTestType);
    }

    let mut cors_mode = None;
    let mut origin_url = None;
    if form.selection().contains(TestType::Cors) {
        let cors = form.cors();
        let mode = cors.mode.ok_or(SubmissionError::NoCorsMode)?;
        if mode == CorsMode::Active {
            let origin = cors.origin_url.trim();
            if origin.is_empty() {
                return Err(SubmissionError::OriginRequired);
            }
            origin_url = Some(origin.to_string());
        }
        cors_mode = Some(mode);
    }

    Ok(ValidatedSubmission {
        session: session.clone(),
        targets,
        test_types: form.selection().iter().collect(),
        cors_mode,
        origin_url,
        recipients: clean_recipients(&form.recipients),
    })
}

fn clean_recipients(raw: &[String]) -> Vec<String> {
    let mut cleaned: Vec<String> = Vec::new();
    for email in raw.iter().map(|e| e.trim()).filter(|e| !e.is_empty()) {
        if !cleaned.iter().any(|seen| seen == email) {
            cleaned.push(email.to_string());
        }
    }
    cleaned
}

impl ValidatedSubmission {
    /// Target URLs; empty for uploads
    pub fn urls(&self) -> &[String] {
        match &self.targets {
            Targets::Urls(urls) => urls,
            Targets::Upload(_) => &[],
        }
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        match &self.targets {
            Targets::Upload(file) => Some(file),
            Targets::Urls(_) => None,
        }
    }

    pub fn input_method(&self) -> InputMethod {
        match &self.targets {
            Targets::Upload(_) => InputMethod::List,
            Targets::Urls(urls) if urls.len() > 1 => InputMethod::Multiple,
            Targets::Urls(_) => InputMethod::Single,
        }
    }

    pub fn source_type(&self) -> SourceType {
        match self.targets {
            Targets::Upload(_) => SourceType::Upload,
            Targets::Urls(_) => SourceType::Manual,
        }
    }

    /// Wire payload; `test_id` is the pre-created record, if any
    pub fn payload(&self, test_id: Option<&str>) -> AnalysisPayload {
        let urls = self.urls().to_vec();
        AnalysisPayload {
            input_method: self.input_method(),
            source_type: self.source_type(),
            landing_page_url: urls.first().cloned().unwrap_or_default(),
            batch_urls: urls,
            analysis_types: self
                .test_types
                .iter()
                .filter_map(|t| t.analysis_name())
                .map(str::to_string)
                .collect(),
            cors_analysis_type: self.cors_mode.map(|m| m.analysis_name().to_string()),
            origin: self.origin_url.clone(),
            recipient_emails: (!self.recipients.is_empty()).then(|| self.recipients.join(", ")),
            test_id: test_id.map(str::to_string),
        }
    }

    /// Record to create before dispatch
    pub fn new_record(&self) -> NewApiTest {
        NewApiTest {
            test_name: None,
            urls: self.urls().to_vec(),
            test_types: self.test_types.clone(),
            cors_mode: self.cors_mode,
            origin_url: self.origin_url.clone(),
            recipient_emails: self.recipients.clone(),
            user_email: self
                .recipients
                .first()
                .cloned()
                .or_else(|| self.session.email.clone()),
            username: self.session.display_name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("uid-1").with_email("ops@example.com")
    }

    fn code(form: &SubmissionForm) -> &'static str {
        validate(Some(&session()), form).unwrap_err().code()
    }

    #[test]
    fn rules_apply_in_order() {
        let mut form = SubmissionForm::new();
        assert_eq!(
            validate(None, &form).unwrap_err().code(),
            "NOT_AUTHENTICATED"
        );
        assert_eq!(code(&form), "NO_INPUT_MODE");

        form.set_single_url("   ");
        assert_eq!(code(&form), "MISSING_URL");

        form.choose_batch();
        assert_eq!(code(&form), "NO_LIST_SOURCE");

        form.set_links(["", "  "]);
        assert_eq!(code(&form), "NO_VALID_URLS");

        form.set_links(["https://a.example"]);
        assert_eq!(code(&form), "NO_TEST_TYPE");

        form.toggle_test(TestType::Cors);
        assert_eq!(code(&form), "NO_CORS_MODE");

        form.set_cors_mode(CorsMode::Active);
        assert_eq!(code(&form), "ORIGIN_REQUIRED");

        form.set_origin_url("https://evil.example");
        assert!(validate(Some(&session()), &form).is_ok());
    }

    #[test]
    fn file_source_without_file() {
        let mut form = SubmissionForm::new();
        let _ = form.attach_file(Attachment::new("x.exe", None, vec![0]));
        form.toggle_test(TestType::Http);
        assert_eq!(code(&form), "NO_FILE");
    }

    #[test]
    fn attachment_checks() {
        let by_mime = Attachment::new("export", Some("text/csv".into()), vec![0]);
        assert!(validate_attachment(&by_mime).is_ok());

        let by_extension = Attachment::new("Targets.XLSX", None, vec![0]);
        assert!(validate_attachment(&by_extension).is_ok());

        let too_big = Attachment::new(
            "big.csv",
            None,
            vec![0; MAX_ATTACHMENT_BYTES as usize + 1],
        );
        assert_eq!(validate_attachment(&too_big).unwrap_err().code(), "FILE_TOO_LARGE");

        let exactly_max = Attachment::new("max.csv", None, vec![0; MAX_ATTACHMENT_BYTES as usize]);
        assert!(validate_attachment(&exactly_max).is_ok());
    }

    #[test]
    fn links_payload_uses_multiple_method() {
        let mut form = SubmissionForm::new();
        form.set_links(["https://a.example", " ", "https://b.example"]);
        form.toggle_test(TestType::Http);

        let payload = validate(Some(&session()), &form).unwrap().payload(Some("t-1"));
        assert_eq!(payload.input_method, InputMethod::Multiple);
        assert_eq!(payload.source_type, SourceType::Manual);
        assert_eq!(payload.landing_page_url, "https://a.example");
        assert_eq!(payload.batch_urls, vec!["https://a.example", "https://b.example"]);
        assert_eq!(payload.analysis_types, vec!["http header analysis"]);
        assert_eq!(payload.test_id.as_deref(), Some("t-1"));
    }

    #[test]
    fn two_types_and_two_links_reach_the_wire() {
        let validated = ValidatedSubmission {
            session: session(),
            targets: Targets::Urls(vec![
                "https://a.example".into(),
                "https://b.example".into(),
            ]),
            test_types: vec![TestType::Http, TestType::Ssl],
            cors_mode: None,
            origin_url: None,
            recipients: vec![],
        };

        let wire = serde_json::to_value(validated.payload(None)).unwrap();
        assert_eq!(wire["Input Method"], "multiple");
        assert_eq!(wire["Source Type"], "manual");
        assert_eq!(wire["Landing Page Url"], "https://a.example");
        assert_eq!(
            wire["Batch URLs"],
            serde_json::json!(["https://a.example", "https://b.example"])
        );
        assert_eq!(
            wire["Analysis Type"],
            serde_json::json!(["http header analysis", "SSL / TLS analysis"])
        );
        assert!(wire.get("Cors Analysis Type").is_none());
        assert!(wire.get("Recipient Emails").is_none());

        let record = validated.new_record();
        assert_eq!(record.test_types, vec![TestType::Http, TestType::Ssl]);
        assert_eq!(record.user_email.as_deref(), Some("ops@example.com"));
    }

    #[test]
    fn single_link_batch_is_single() {
        let mut form = SubmissionForm::new();
        form.set_links(["https://a.example", ""]);
        form.toggle_test(TestType::Ssl);
        let validated = validate(Some(&session()), &form).unwrap();
        assert_eq!(validated.input_method(), InputMethod::Single);
        assert_eq!(validated.payload(None).analysis_types, vec!["SSL / TLS analysis"]);
    }

    #[test]
    fn upload_payload_has_no_urls() {
        let mut form = SubmissionForm::new();
        form.attach_file(Attachment::new("urls.csv", None, b"https://a.example".to_vec()))
            .unwrap();
        form.toggle_test(TestType::Sensitive);

        let validated = validate(Some(&session()), &form).unwrap();
        let payload = validated.payload(None);
        assert_eq!(payload.input_method, InputMethod::List);
        assert_eq!(payload.source_type, SourceType::Upload);
        assert_eq!(payload.landing_page_url, "");
        assert!(payload.batch_urls.is_empty());
        assert!(validated.attachment().is_some());
        assert!(validated.new_record().urls.is_empty());
    }

    #[test]
    fn active_cors_carries_origin() {
        let mut form = SubmissionForm::new();
        form.set_single_url("https://api.example.com");
        form.toggle_test(TestType::Cors);
        form.set_cors_mode(CorsMode::Active);
        form.set_origin_url(" https://evil.example ");

        let payload = validate(Some(&session()), &form).unwrap().payload(None);
        assert_eq!(payload.cors_analysis_type.as_deref(), Some("Active CORS Test"));
        assert_eq!(payload.origin.as_deref(), Some("https://evil.example"));
        assert!(payload.analysis_types.is_empty());
    }

    #[test]
    fn recipients_are_cleaned() {
        let mut form = SubmissionForm::new();
        form.set_single_url("https://api.example.com");
        form.toggle_test(TestType::Url);
        form.recipients = vec![
            " a@example.com".into(),
            "".into(),
            "b@example.com".into(),
            "a@example.com ".into(),
        ];

        let validated = validate(Some(&session()), &form).unwrap();
        assert_eq!(
            validated.payload(None).recipient_emails.as_deref(),
            Some("a@example.com, b@example.com")
        );
        assert_eq!(validated.new_record().user_email.as_deref(), Some("a@example.com"));
    }

    #[test]
    fn no_recipients_omits_the_field() {
        let mut form = SubmissionForm::new();
        form.set_single_url("https://api.example.com");
        form.toggle_test(TestType::Error);
        let validated = validate(Some(&session()), &form).unwrap();
        assert!(validated.payload(None).recipient_emails.is_none());
        assert_eq!(validated.new_record().user_email.as_deref(), Some("ops@example.com"));
    }
}
