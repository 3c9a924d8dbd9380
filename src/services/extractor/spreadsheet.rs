use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};

use crate::error::ExtractionError;

/// Render every sheet as a titled, column-aligned table.
///
/// Each sheet becomes `Sheet: <name>\n<table>\n\n`. The first row is treated
/// as the header like any other row.
pub(super) fn extract(path: &Path) -> Result<String, ExtractionError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

    let mut text = String::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ExtractionError::Spreadsheet(format!("{}: {}", name, e)))?;

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(render_cell).collect())
            .collect();

        text.push_str(&format!("Sheet: {}\n{}\n\n", name, render_table(&rows)));
    }

    Ok(text)
}

fn render_cell(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Right-align each column to its widest cell, two spaces between columns.
fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            widths
                .iter()
                .enumerate()
                .map(|(i, width)| {
                    let cell = row.get(i).map(String::as_str).unwrap_or("");
                    format!("{:>width$}", cell, width = width)
                })
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::extractor::test_support::write_zip;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Stock" sheetId="1" r:id="rId1"/><sheet name="Notes" sheetId="2" r:id="rId2"/></sheets></workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

    fn inline(cell: &str, text: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, cell, text)
    }

    fn worksheet(rows: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            rows
        )
    }

    #[test]
    fn test_extract_two_sheet_workbook() {
        let stock = worksheet(&format!(
            r#"<row r="1">{}{}</row><row r="2">{}<c r="B2"><v>3</v></c></row>"#,
            inline("A1", "name"),
            inline("B1", "qty"),
            inline("A2", "apple"),
        ));
        let notes = worksheet(&format!(r#"<row r="1">{}</row>"#, inline("A1", "fresh")));

        let dir = tempfile::tempdir().unwrap();
        let path = write_zip(
            dir.path(),
            "stock.xlsx",
            &[
                ("[Content_Types].xml", CONTENT_TYPES),
                ("xl/workbook.xml", WORKBOOK),
                ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS),
                ("xl/worksheets/sheet1.xml", &stock),
                ("xl/worksheets/sheet2.xml", &notes),
            ],
        );

        assert_eq!(
            extract(&path).unwrap(),
            "Sheet: Stock\n name  qty\napple    3\n\nSheet: Notes\nfresh\n\n"
        );
    }

    #[test]
    fn test_extract_rejects_non_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, "not a zip").unwrap();

        assert!(matches!(extract(&path), Err(ExtractionError::Spreadsheet(_))));
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_render_table_aligns_right() {
        let rows = vec![row(&["name", "qty"]), row(&["apple", "3"]), row(&["kiwi", "12"])];
        assert_eq!(
            render_table(&rows),
            " name  qty\napple    3\n kiwi   12"
        );
    }

    #[test]
    fn test_render_table_ragged_rows() {
        let rows = vec![row(&["a", "b", "c"]), row(&["dd"])];
        assert_eq!(render_table(&rows), " a  b  c\ndd      ");
    }

    #[test]
    fn test_render_empty_sheet() {
        assert_eq!(render_table(&[]), "");
    }

    #[test]
    fn test_render_cell() {
        assert_eq!(render_cell(&Data::Empty), "");
        assert_eq!(render_cell(&Data::String("x".into())), "x");
        assert_eq!(render_cell(&Data::Int(7)), "7");
        assert_eq!(render_cell(&Data::Bool(true)), "true");
    }
}
