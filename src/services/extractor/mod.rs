//! Plain-text extraction from uploaded documents.
//!
//! Dispatch is by declared content type. Every format handler is fallible, but
//! [`DocumentProcessor::extract`] never fails: errors are logged and degraded to
//! empty text so that one bad file cannot abort a batch ingestion.

mod docx;
mod pdf;
mod pptx;
mod spreadsheet;
mod text;

use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::models::Document;

/// Document format selected from a content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Word,
    Spreadsheet,
    Presentation,
    Text,
    /// Unrecognised type, decoded as text.
    Unknown,
}

impl DocumentKind {
    /// Classify a MIME-like content type by substring, first match wins.
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.to_lowercase();
        if ct.contains("pdf") {
            DocumentKind::Pdf
        } else if ct.contains("word") || ct.contains("docx") {
            DocumentKind::Word
        } else if ct.contains("excel") || ct.contains("spreadsheet") {
            DocumentKind::Spreadsheet
        } else if ct.contains("presentation") || ct.contains("ppt") {
            DocumentKind::Presentation
        } else if ct.starts_with("text/") {
            DocumentKind::Text
        } else {
            DocumentKind::Unknown
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Pdf => write!(f, "pdf"),
            DocumentKind::Word => write!(f, "word"),
            DocumentKind::Spreadsheet => write!(f, "spreadsheet"),
            DocumentKind::Presentation => write!(f, "presentation"),
            DocumentKind::Text => write!(f, "text"),
            DocumentKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Format-dispatching text extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentProcessor;

impl DocumentProcessor {
    /// Extract text, returning an empty string on any failure.
    pub fn extract(path: &Path, content_type: &str) -> String {
        match Self::try_extract(path, content_type) {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    file = %path.display(),
                    content_type,
                    error = %e,
                    "text extraction failed, continuing with empty text"
                );
                String::new()
            }
        }
    }

    /// Extract text, surfacing the failure.
    pub fn try_extract(path: &Path, content_type: &str) -> Result<String, ExtractionError> {
        let kind = DocumentKind::from_content_type(content_type);
        debug!(file = %path.display(), %kind, "extracting text");

        match kind {
            DocumentKind::Pdf => pdf::extract(path),
            DocumentKind::Word => docx::extract(path),
            DocumentKind::Spreadsheet => spreadsheet::extract(path),
            DocumentKind::Presentation => pptx::extract(path),
            DocumentKind::Text => text::extract(path),
            DocumentKind::Unknown => {
                warn!(content_type, "unknown file type, treating as text");
                text::extract(path)
            }
        }
    }

    /// Extract a file into a [`Document`].
    pub fn process(path: &Path, content_type: &str) -> Document {
        let text = Self::extract(path, content_type);
        Document::new(path.to_string_lossy(), content_type, text)
    }
}

/// Guess a content type from the file name, for callers that have none.
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or_default()
        .to_string()
}

/// Read a single UTF-8 entry out of an OOXML (zip) container.
pub(crate) fn read_archive_entry(
    archive: &mut zip::ZipArchive<std::fs::File>,
    name: &str,
) -> Result<String, ExtractionError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|e| ExtractionError::Archive(format!("{}: {}", name, e)))?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}

pub(crate) fn open_archive(path: &Path) -> Result<zip::ZipArchive<std::fs::File>, ExtractionError> {
    let file = std::fs::File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| ExtractionError::Archive(e.to_string()))
}
