use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use super::{open_archive, read_archive_entry};
use crate::error::ExtractionError;

/// Concatenate the text of every top-level text shape, slide by slide.
///
/// Each shape's text is followed by a newline; paragraphs inside a shape are
/// joined with newlines.
pub(super) fn extract(path: &Path) -> Result<String, ExtractionError> {
    let mut archive = open_archive(path)?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut text = String::new();
    for (_, name) in slides {
        let xml = read_archive_entry(&mut archive, &name)?;
        for shape in shape_texts(&xml)? {
            text.push_str(&shape);
            text.push('\n');
        }
    }

    Ok(text)
}

/// Slide number of a `ppt/slides/slideN.xml` part.
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix("ppt/slides/slide")?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Text of each top-level shape that carries a text body.
fn shape_texts(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut shapes = Vec::new();
    let mut group_depth = 0usize;
    let mut in_shape = false;
    let mut has_body = false;
    let mut paragraphs: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"p:grpSp" => group_depth += 1,
                b"p:sp" if group_depth == 0 => {
                    in_shape = true;
                    has_body = false;
                    paragraphs.clear();
                }
                b"p:txBody" if in_shape => has_body = true,
                b"a:p" if in_shape => paragraphs.push(String::new()),
                b"a:t" => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"p:grpSp" => group_depth = group_depth.saturating_sub(1),
                b"p:sp" if in_shape && group_depth == 0 => {
                    in_shape = false;
                    if has_body {
                        shapes.push(paragraphs.join("\n"));
                    }
                }
                b"a:t" => in_text = false,
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"a:p" if in_shape => paragraphs.push(String::new()),
                b"a:br" if in_shape => {
                    if let Some(paragraph) = paragraphs.last_mut() {
                        paragraph.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_text && in_shape => {
                let text = t
                    .unescape()
                    .map_err(|e| ExtractionError::Xml(e.to_string()))?;
                if let Some(paragraph) = paragraphs.last_mut() {
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

    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractor::test_support::write_zip;

    fn slide_xml(shapes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>"#,
            shapes
        )
    }

    fn text_shape(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", p))
            .collect();
        format!("<p:sp><p:nvSpPr/><p:txBody><a:bodyPr/>{}</p:txBody></p:sp>", body)
    }

    #[test]
    fn test_slide_number() {
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide1.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn test_slides_in_numeric_order() {
        let slide1 = slide_xml(&text_shape(&["Title", "Subtitle"]));
        let slide2 = slide_xml(&text_shape(&["Second"]));
        let slide10 = slide_xml(&format!(
            "{}<p:pic><p:nvPicPr/></p:pic>{}",
            text_shape(&["Tenth"]),
            text_shape(&["Notes"])
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            "deck.pptx",
            &[
                ("ppt/slides/slide10.xml", &slide10),
                ("ppt/slides/slide2.xml", &slide2),
                ("ppt/slides/slide1.xml", &slide1),
            ],
        );

        assert_eq!(
            extract(&path).unwrap(),
            "Title\nSubtitle\nSecond\nTenth\nNotes\n"
        );
    }

    #[test]
    fn test_grouped_shapes_skipped() {
        let xml = slide_xml(&format!(
            "<p:grpSp>{}</p:grpSp>{}",
            text_shape(&["Grouped"]),
            text_shape(&["Top"])
        ));
        assert_eq!(shape_texts(&xml).unwrap(), vec!["Top"]);
    }

    #[test]
    fn test_shape_without_text_body_skipped() {
        let xml = slide_xml("<p:sp><p:nvSpPr/><p:spPr/></p:sp>");
        assert!(shape_texts(&xml).unwrap().is_empty());
    }
}
