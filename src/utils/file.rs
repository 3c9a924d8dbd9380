//! File naming and classification helpers for uploads and ingestion.

use std::path::Path;

use uuid::Uuid;

/// Extensions the extractor has a dedicated handler for, plus common text types.
const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "xlsx", "xls", "xlsm", "ods", "pptx", "txt", "md", "markdown", "csv", "tsv",
    "json", "yaml", "yml", "toml", "xml", "html", "htm", "rst", "log",
];

/// Random storage name for an upload, keeping the original extension.
///
/// `report.PDF` becomes `<uuid>.PDF`; names without an extension get none.
pub fn upload_file_name(original: &str) -> String {
    let id = Uuid::new_v4();
    match Path::new(original).extension() {
        Some(ext) => format!("{}.{}", id, ext.to_string_lossy()),
        None => id.to_string(),
    }
}

/// Reduce a client-supplied file name to its final path component.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base.to_string())
    }
}

/// First `max_chars` characters of `text`.
pub fn preview(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Whether a file looks like something worth ingesting.
pub fn is_document_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            DOCUMENT_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Human-readable byte count.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
