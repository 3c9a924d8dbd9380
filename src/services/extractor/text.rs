use std::borrow::Cow;
use std::path::Path;

use crate::error::ExtractionError;

/// Decode a file as UTF-8, dropping invalid byte sequences.
pub(super) fn extract(path: &Path) -> Result<String, ExtractionError> {
    let bytes = std::fs::read(path)?;
    Ok(decode_lossy(&bytes))
}

fn decode_lossy(bytes: &[u8]) -> String {
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(valid) => valid.to_string(),
        Cow::Owned(replaced) => replaced
            .chars()
            .filter(|c| *c != char::REPLACEMENT_CHARACTER)
            .collect(),
    }
}
