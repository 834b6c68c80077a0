//! Editable submission form.
//!
//! Mutators keep the form's invariants: the test selection holds at most one
//! type, and CORS settings only survive while CORS is selected.

use std::collections::BTreeSet;

use super::SubmissionError;
use super::validate::validate_attachment;
use crate::domain::{Attachment, CorsMode, TestType};

/// Single URL or a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Single { url: String },
    Batch { source: Option<BatchSource> },
}

/// Where a batch gets its targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchSource {
    /// Pasted links; blank rows are allowed while editing
    Links(Vec<String>),
    /// Uploaded sheet, `None` until a file passes the attach check
    File(Option<Attachment>),
}

/// Selected test types, kept to a single entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSelection {
    types: BTreeSet<TestType>,
}

impl TestSelection {
    /// Clicking the selected type clears it, any other type replaces it
    pub fn toggle(&mut self, test_type: TestType) {
        let was_selected = self.types.contains(&test_type);
        self.types.clear();
        if !was_selected {
            self.types.insert(test_type);
        }
    }

    pub fn contains(&self, test_type: TestType) -> bool {
        self.types.contains(&test_type)
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TestType> + '_ {
        self.types.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsSettings {
    pub mode: Option<CorsMode>,
    /// Only meaningful in active mode
    pub origin_url: String,
}

impl CorsSettings {
    fn clear(&mut self) {
        self.mode = None;
        self.origin_url.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionForm {
    input: Option<InputMode>,
    selection: TestSelection,
    cors: CorsSettings,
    /// Report recipients as typed; cleaned up at submit time
    pub recipients: Vec<String>,
}

impl SubmissionForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(&self) -> Option<&InputMode> {
        self.input.as_ref()
    }

    pub fn selection(&self) -> &TestSelection {
        &self.selection
    }

    pub fn cors(&self) -> &CorsSettings {
        &self.cors
    }

    /// Switch to single-URL mode, dropping any batch input
    pub fn set_single_url(&mut self, url: impl Into<String>) {
        self.input = Some(InputMode::Single { url: url.into() });
    }

    /// Switch to batch mode with no source chosen yet
    pub fn choose_batch(&mut self) {
        if !matches!(self.input, Some(InputMode::Batch { .. })) {
            self.input = Some(InputMode::Batch { source: None });
        }
    }

    pub fn set_links<I, S>(&mut self, links: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let links = links.into_iter().map(Into::into).collect();
        self.input = Some(InputMode::Batch {
            source: Some(BatchSource::Links(links)),
        });
    }

    /// Validate and store an uploaded sheet.
    ///
    /// A rejected file leaves the batch in file mode with an empty slot.
    pub fn attach_file(&mut self, attachment: Attachment) -> Result<(), SubmissionError> {
        let checked = validate_attachment(&attachment);
        let slot = match checked {
            Ok(()) => {
                tracing::debug!(
                    "Attached {} ({:.1} KB)",
                    attachment.file_name,
                    attachment.size() as f64 / 1024.0
                );
                Some(attachment)
            }
            Err(ref e) => {
                tracing::debug!("Rejected attachment {}: {}", attachment.file_name, e);
                None
            }
        };
        self.input = Some(InputMode::Batch {
            source: Some(BatchSource::File(slot)),
        });
        checked
    }

    pub fn toggle_test(&mut self, test_type: TestType) {
        self.selection.toggle(test_type);
        if !self.selection.contains(TestType::Cors) {
            self.cors.clear();
        }
    }

    /// Ignored unless CORS is selected. Passive mode drops the origin.
    pub fn set_cors_mode(&mut self, mode: CorsMode) {
        if !self.selection.contains(TestType::Cors) {
            return;
        }
        self.cors.mode = Some(mode);
        if mode == CorsMode::Passive {
            self.cors.origin_url.clear();
        }
    }

    /// Ignored unless active CORS is selected
    pub fn set_origin_url(&mut self, origin: impl Into<String>) {
        if self.selection.contains(TestType::Cors) && self.cors.mode == Some(CorsMode::Active) {
            self.cors.origin_url = origin.into();
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
