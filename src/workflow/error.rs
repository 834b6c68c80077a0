use crate::dispatch::DispatchError;

/// Why a submission was rejected or did not go through
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Please sign in to run security tests")]
    NotAuthenticated,

    #[error("Please select an input mode")]
    NoInputMode,

    #[error("Please enter an API URL")]
    MissingUrl,

    #[error("Please select a list source")]
    NoListSource,

    #[error("Please enter at least one valid URL")]
    NoValidUrls,

    #[error("Please upload an Excel file")]
    NoFile,

    #[error("Invalid file type: please upload an Excel file (.xlsx, .xls) or CSV file (.csv)")]
    InvalidFileType { file_name: String },

    #[error("File too large: please upload a file smaller than 5MB ({size} bytes)")]
    FileTooLarge { size: u64 },

    #[error("Please select at least one testing method")]
    NoTestType,

    #[error("Please select CORS mode (Active or Passive)")]
    NoCorsMode,

    #[error("Please enter Origin URL for Active CORS")]
    OriginRequired,

    #[error("Failed to run analysis: {0}")]
    DispatchFailed(#[source] DispatchError),
}

impl SubmissionError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            SubmissionError::NotAuthenticated => "NOT_AUTHENTICATED",
            SubmissionError::NoInputMode => "NO_INPUT_MODE",
            SubmissionError::MissingUrl => "MISSING_URL",
            SubmissionError::NoListSource => "NO_LIST_SOURCE",
            SubmissionError::NoValidUrls => "NO_VALID_URLS",
            SubmissionError::NoFile => "NO_FILE",
            SubmissionError::InvalidFileType { .. } => "INVALID_FILE_TYPE",
            SubmissionError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            SubmissionError::NoTestType => "NO_TEST_TYPE",
            SubmissionError::NoCorsMode => "NO_CORS_MODE",
            SubmissionError::OriginRequired => "ORIGIN_REQUIRED",
            SubmissionError::DispatchFailed(inner) => inner.code(),
        }
    }

    /// Rejected before any store or network call
    pub fn is_validation(&self) -> bool {
        !matches!(self, SubmissionError::DispatchFailed(_))
    }
}
