use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use crate::cli::output::get_formatter;
use crate::models::{Document, OutputFormat};
use crate::services::{DocumentKind, DocumentProcessor, guess_content_type};

#[derive(Debug, Args)]
pub struct ExtractArgs {
    /// File to extract text from
    #[arg(required = true)]
    pub file: PathBuf,

    /// Content type to dispatch on (guessed from the extension if omitted)
    #[arg(long)]
    pub content_type: Option<String>,

    /// Report extraction failures instead of printing empty text
    #[arg(long)]
    pub strict: bool,
}

pub async fn handle_extract(args: ExtractArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    if !args.file.is_file() {
        anyhow::bail!("file not found: {}", args.file.display());
    }

    let formatter = get_formatter(format);
    let content_type = args
        .content_type
        .unwrap_or_else(|| guess_content_type(&args.file));

    if verbose {
        eprintln!(
            "Extracting {} as {} ({})",
            args.file.display(),
            DocumentKind::from_content_type(&content_type),
            if content_type.is_empty() { "-" } else { &content_type }
        );
    }

    let path = args.file.clone();
    let strict = args.strict;
    let document = tokio::task::spawn_blocking(move || -> Result<Document> {
        if strict {
            let text = DocumentProcessor::try_extract(&path, &content_type)
                .with_context(|| format!("failed to extract {}", path.display()))?;
            Ok(Document::new(path.to_string_lossy(), content_type, text))
        } else {
            Ok(DocumentProcessor::process(&path, &content_type))
        }
    })
    .await
    .context("extraction task failed")??;

    print!("{}", formatter.format_document(&document));
    Ok(())
}
