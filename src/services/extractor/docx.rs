use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{open_archive, read_archive_entry};
use crate::error::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Join the body paragraphs of a Word document with newlines.
pub(super) fn extract(path: &Path) -> Result<String, ExtractionError> {
    let mut archive = open_archive(path)?;
    let xml = read_archive_entry(&mut archive, DOCUMENT_PART)?;
    let paragraphs = body_paragraphs(&xml)?;
    Ok(paragraphs.join("\n"))
}

/// Collect top-level body paragraphs.
///
/// Paragraphs nested in tables or text boxes are skipped.
fn body_paragraphs(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut nested = 0usize;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => nested += 1,
                b"w:p" if nested == 0 => current = Some(String::new()),
                b"w:t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"w:tbl" | b"w:txbxContent" => nested = nested.saturating_sub(1),
                b"w:p" if nested == 0 => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                b"w:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"w:p" if nested == 0 => paragraphs.push(String::new()),
                b"w:tab" if nested == 0 => push_char(&mut current, '\t'),
                b"w:br" | b"w:cr" if nested == 0 => push_char(&mut current, '\n'),
                _ => {}
            },
            Ok(Event::Text(t)) if in_text && nested == 0 => {
                if let Some(paragraph) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| ExtractionError::Xml(e.to_string()))?;
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractionError::Xml(format!(
                    "{} at position {}",
                    e,
                    reader.buffer_position()
                )));
            }
        }
    }

    Ok(paragraphs)
}

fn push_char(current: &mut Option<String>, c: char) {
    if let Some(paragraph) = current.as_mut() {
        paragraph.push(c);
    }
}
