use std::path::Path;

use anyhow::{Context, Result};

/// A URL sheet uploaded for batch scanning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    /// MIME type as reported by the source, if known
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Read a sheet from disk, guessing the MIME type from the extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read attachment: {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = mime_for_extension(&file_name).map(str::to_string);
        Ok(Self::new(file_name, content_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased extension including the dot, e.g. `".csv"`
    pub fn extension(&self) -> Option<String> {
        let lower = self.file_name.to_lowercase();
        lower.rfind('.').map(|idx| lower[idx..].to_string())
    }

    /// MIME type to put on the wire
    pub fn wire_content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .or_else(|| mime_for_extension(&self.file_name))
            .unwrap_or("application/octet-stream")
    }
}

fn mime_for_extension(file_name: &str) -> Option<&'static str> {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".xlsx") {
        Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    } else if lower.ends_with(".xls") {
        Some("application/vnd.ms-excel")
    } else if lower.ends_with(".csv") {
        Some("text/csv")
    } else {
        None
    }
}
