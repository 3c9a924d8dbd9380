use std::path::Path;

use crate::error::ExtractionError;

/// Concatenate the text of every page in page order.
pub(super) fn extract(path: &Path) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load(path).map_err(|e| ExtractionError::Pdf(e.to_string()))?;

    let mut text = String::new();
    // get_pages is keyed by page number, so iteration is already in order
    for page_num in doc.get_pages().keys() {
        let page_text = doc
            .extract_text(&[*page_num])
            .map_err(|e| ExtractionError::Pdf(format!("page {}: {}", page_num, e)))?;
        text.push_str(&page_text);
    }

    Ok(text)
}
