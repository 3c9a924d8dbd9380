use std::fmt::{Result as FmtResult, Write as FmtWrite};

use console::style;
use serde::Serialize;

use crate::models::{Document, OutputFormat, SearchResults};
use crate::services::CollectionInfo;

pub trait Formatter {
    fn format_search_results(&self, results: &SearchResults) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_ingest_stats(&self, stats: &IngestStats) -> String;
    fn format_document(&self, document: &Document) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub driver: String,
    pub location: String,
    pub connected: bool,
    pub collections: Vec<CollectionInfo>,
    pub default_model: String,
    pub local_model_dir: Option<String>,
    pub local_model_present: bool,
    pub upload_dir: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestStats {
    pub collection: String,
    pub files_scanned: u64,
    pub files_ingested: u64,
    /// Files that produced no text.
    pub files_empty: u64,
    pub files_failed: u64,
    pub chunks_created: u64,
    pub duration_ms: u64,
}

fn render(build: impl FnOnce(&mut String) -> FmtResult) -> String {
    let mut output = String::new();
    // Writing into a String cannot fail.
    let _ = build(&mut output);
    output
}

fn truncate(content: &str, max: usize) -> String {
    let preview: String = content.chars().take(max).collect();
    if content.chars().count() > max {
        format!("{}...", preview)
    } else {
        preview
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", results.query);
        }

        render(|out| {
            writeln!(out, "Search results for: \"{}\"", results.query)?;
            writeln!(
                out,
                "Found {} results in {} ({}ms)\n",
                results.results.len(),
                results.collection,
                results.duration_ms
            )?;

            for (i, content) in results.results.iter().enumerate() {
                writeln!(out, "{}.", style(i + 1).bold())?;
                for line in truncate(content, 300).lines() {
                    writeln!(out, "   {}", line)?;
                }
                writeln!(out)?;
            }
            Ok(())
        })
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        render(|out| {
            writeln!(out, "Status")?;
            writeln!(out, "------")?;

            let store_status = if status.connected {
                style("[CONNECTED]").green()
            } else {
                style("[DISCONNECTED]").red()
            };
            writeln!(out, "Vector Store:  {} {}", status.driver, store_status)?;
            writeln!(out, "  Location:    {}", status.location)?;
            if status.collections.is_empty() {
                writeln!(out, "  Collections: none")?;
            } else {
                writeln!(out, "  Collections:")?;
                for c in &status.collections {
                    let dim = c
                        .dimension
                        .map_or_else(|| "-".to_string(), |d| d.to_string());
                    writeln!(out, "    {} ({} chunks, dim {})", c.name, c.count, dim)?;
                }
            }
            writeln!(out)?;

            writeln!(out, "Embedding:     {}", status.default_model)?;
            let local_status = if status.local_model_present {
                style("[FOUND]").green()
            } else {
                style("[MISSING]").yellow()
            };
            writeln!(
                out,
                "  Local model: {} {}",
                status.local_model_dir.as_deref().unwrap_or("-"),
                local_status
            )?;
            writeln!(out)?;

            writeln!(out, "Uploads:       {}", status.upload_dir)?;
            Ok(())
        })
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        render(|out| {
            writeln!(out, "Ingestion Complete")?;
            writeln!(out, "------------------")?;
            writeln!(out, "Collection: {}", stats.collection)?;
            writeln!(out, "Files scanned: {}", stats.files_scanned)?;
            writeln!(out, "Files ingested: {}", stats.files_ingested)?;
            writeln!(out, "Files without text: {}", stats.files_empty)?;
            if stats.files_failed > 0 {
                writeln!(out, "Files failed: {}", style(stats.files_failed).red())?;
            }
            writeln!(out, "Chunks created: {}", stats.chunks_created)?;
            writeln!(out, "Duration: {}ms", stats.duration_ms)?;
            Ok(())
        })
    }

    fn format_document(&self, document: &Document) -> String {
        if document.is_empty() {
            return format!("No text extracted from {}\n", document.file_path);
        }
        format!("{}\n", document.text)
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}\n", style("Error:").red().bold(), error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn to_json<T: Serialize>(&self, value: &T) -> String {
        let encoded = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        encoded.unwrap_or_else(|e| serde_json::json!({"error": e.to_string()}).to_string())
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        self.to_json(results)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.to_json(status)
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        self.to_json(stats)
    }

    fn format_document(&self, document: &Document) -> String {
        self.to_json(document)
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", results.query);
        }

        render(|out| {
            writeln!(out, "## Search Results\n")?;
            writeln!(out, "**Query:** `{}`\n", results.query)?;
            writeln!(out, "**Collection:** `{}`\n", results.collection)?;
            writeln!(
                out,
                "Found {} results in {}ms\n",
                results.results.len(),
                results.duration_ms
            )?;

            for (i, content) in results.results.iter().enumerate() {
                writeln!(out, "### {}\n", i + 1)?;
                writeln!(out, "```")?;
                writeln!(out, "{}", content)?;
                writeln!(out, "```\n")?;
            }
            Ok(())
        })
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        render(|out| {
            writeln!(out, "## Status\n")?;

            let store_status = if status.connected { "✅" } else { "❌" };
            writeln!(out, "### Vector Store ({}) {}\n", status.driver, store_status)?;
            writeln!(out, "- **Location:** `{}`\n", status.location)?;

            if !status.collections.is_empty() {
                writeln!(out, "| Collection | Chunks | Dimension |")?;
                writeln!(out, "|------------|--------|-----------|")?;
                for c in &status.collections {
                    let dim = c
                        .dimension
                        .map_or_else(|| "-".to_string(), |d| d.to_string());
                    writeln!(out, "| `{}` | {} | {} |", c.name, c.count, dim)?;
                }
                writeln!(out)?;
            }

            let local_status = if status.local_model_present {
                "✅"
            } else {
                "❌"
            };
            writeln!(out, "### Embedding\n")?;
            writeln!(out, "- **Default model:** `{}`", status.default_model)?;
            writeln!(
                out,
                "- **Local model:** `{}` {}",
                status.local_model_dir.as_deref().unwrap_or("-"),
                local_status
            )?;
            writeln!(out, "- **Uploads:** `{}`", status.upload_dir)?;
            Ok(())
        })
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        render(|out| {
            writeln!(out, "## Ingestion Complete\n")?;
            writeln!(out, "| Metric | Value |")?;
            writeln!(out, "|--------|-------|")?;
            writeln!(out, "| Collection | `{}` |", stats.collection)?;
            writeln!(out, "| Files scanned | {} |", stats.files_scanned)?;
            writeln!(out, "| Files ingested | {} |", stats.files_ingested)?;
            writeln!(out, "| Files without text | {} |", stats.files_empty)?;
            writeln!(out, "| Files failed | {} |", stats.files_failed)?;
            writeln!(out, "| Chunks created | {} |", stats.chunks_created)?;
            writeln!(out, "| Duration | {}ms |", stats.duration_ms)?;
            Ok(())
        })
    }

    fn format_document(&self, document: &Document) -> String {
        render(|out| {
            writeln!(out, "## {}\n", document.file_path)?;
            writeln!(out, "*{}*, {} words\n", document.content_type, document.word_count())?;
            writeln!(out, "```")?;
            writeln!(out, "{}", document.text)?;
            writeln!(out, "```")?;
            Ok(())
        })
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results(items: &[&str]) -> SearchResults {
        SearchResults::new(
            "ownership".to_string(),
            "docs".to_string(),
            items.iter().map(|s| s.to_string()).collect(),
            12,
        )
    }

    #[test]
    fn test_text_empty_results() {
        let out = TextFormatter.format_search_results(&results(&[]));
        assert_eq!(out, "No results found for: ownership\n");
    }

    #[test]
    fn test_text_truncates_long_results() {
        let long = "a".repeat(400);
        let out = TextFormatter.format_search_results(&results(&[&long]));
        assert!(out.contains(&format!("{}...", "a".repeat(300))));
        assert!(!out.contains(&"a".repeat(301)));
    }

    #[test]
    fn test_json_search_results() {
        let out = JsonFormatter::new(false).format_search_results(&results(&["first", "second"]));
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["collection"], "docs");
        assert_eq!(value["results"], serde_json::json!(["first", "second"]));
    }

    #[test]
    fn test_markdown_ingest_stats() {
        let stats = IngestStats {
            collection: "docs".to_string(),
            files_scanned: 3,
            files_ingested: 2,
            files_empty: 1,
            chunks_created: 7,
            ..Default::default()
        };
        let out = MarkdownFormatter.format_ingest_stats(&stats);
        assert!(out.contains("| Chunks created | 7 |"));
        assert!(out.contains("| Collection | `docs` |"));
    }

    #[test]
    fn test_json_message_and_error() {
        let f = JsonFormatter::new(true);
        assert_eq!(f.format_message("ok"), r#"{"message":"ok"}"#);
        assert_eq!(f.format_error("bad"), r#"{"error":"bad"}"#);
    }
}
