//! Ingest command implementation.

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;
use walkdir::WalkDir;

use crate::cli::output::{IngestStats, get_formatter};
use crate::context::AppContext;
use crate::models::{Config, OutputFormat};
use crate::services::{DocumentProcessor, StoreRequest, TextChunker, guess_content_type};
use crate::utils::is_document_file;

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// File or directory to ingest
    #[arg(required = true)]
    pub path: PathBuf,

    /// Target collection
    #[arg(long, short = 'c')]
    pub collection: Option<String>,

    /// Embedding model (text-embedding-*, gemini, or a local model name)
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// API key for the embedding provider
    #[arg(long)]
    pub api_key: Option<String>,

    /// Window size in words
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Words shared between consecutive windows
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// File patterns to exclude (can be specified multiple times)
    #[arg(long, short = 'e')]
    pub exclude: Vec<String>,

    /// Show what would be ingested without doing it
    #[arg(long)]
    pub dry_run: bool,
}

pub async fn handle_ingest(
    args: IngestArgs,
    config: Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let path = args
        .path
        .canonicalize()
        .with_context(|| format!("invalid path: {}", args.path.display()))?;

    let chunk_size = args.chunk_size.unwrap_or(config.indexing.chunk_size);
    let chunk_overlap = args.chunk_overlap.unwrap_or(config.indexing.chunk_overlap);
    TextChunker::new(chunk_size, chunk_overlap).context("invalid chunk window")?;

    let files = collect_files(&path, &args.exclude, &config.indexing.exclude_patterns)?;
    if files.is_empty() {
        println!("{}", formatter.format_message("No files found to ingest."));
        return Ok(());
    }

    if verbose {
        eprintln!("Found {} files to process", files.len());
    }

    if args.dry_run {
        println!(
            "{}",
            formatter.format_message(&format!("Dry run: Would ingest {} files", files.len()))
        );
        for file in &files {
            println!("  {}", file.display());
        }
        return Ok(());
    }

    let collection = args
        .collection
        .unwrap_or_else(|| config.indexing.default_collection.clone());
    let model = args
        .model
        .unwrap_or_else(|| config.embedding.default_model.clone());
    let api_key = args.api_key.unwrap_or_default();

    let ctx = AppContext::from_config(config).await?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )?
            .progress_chars("#>-"),
    );

    let mut stats = IngestStats {
        collection: collection.clone(),
        files_scanned: files.len() as u64,
        ..Default::default()
    };
    let mut last_error = None;

    for file_path in &files {
        pb.inc(1);

        let content_type = guess_content_type(file_path);
        let extract_path = file_path.clone();
        let text = tokio::task::spawn_blocking(move || {
            DocumentProcessor::extract(&extract_path, &content_type)
        })
        .await
        .context("extraction task failed")?;

        if text.trim().is_empty() {
            if verbose {
                pb.println(format!("No text in {}", file_path.display()));
            }
            stats.files_empty += 1;
            continue;
        }

        let file_str = file_path.to_string_lossy();
        let result = ctx
            .pipeline
            .store_document(StoreRequest {
                file_path: &file_str,
                text: &text,
                embedding_model: &model,
                api_key: &api_key,
                collection_name: &collection,
                chunk_size,
                chunk_overlap,
            })
            .await;

        match result {
            Ok(report) => {
                stats.files_ingested += 1;
                stats.chunks_created += report.chunks as u64;
            }
            Err(e) => {
                warn!(file = %file_path.display(), error = %e, "ingestion failed");
                pb.println(format!("Failed {}: {}", file_path.display(), e));
                stats.files_failed += 1;
                last_error = Some(e);
            }
        }
    }

    pb.finish_and_clear();
    stats.duration_ms = start_time.elapsed().as_millis() as u64;
    print!("{}", formatter.format_ingest_stats(&stats));

    if stats.files_ingested == 0
        && let Some(e) = last_error
    {
        return Err(e).context("no files were ingested");
    }

    Ok(())
}

/// Files under `path` that look like documents and match no exclude pattern.
///
/// A single file is returned as-is, whatever its extension.
fn collect_files(path: &Path, exclude: &[String], default_exclude: &[String]) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    let patterns = exclude
        .iter()
        .chain(default_exclude)
        .map(|p| glob::Pattern::new(p).with_context(|| format!("invalid exclude pattern: {}", p)))
        .collect::<Result<Vec<_>>>()?;

    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(false).sort_by_file_name() {
        let entry = entry.context("failed to read directory entry")?;
        let entry_path = entry.path();

        if !entry.file_type().is_file() || !is_document_file(entry_path) {
            continue;
        }

        let path_str = entry_path.to_string_lossy();
        if patterns.iter().any(|p| p.matches(&path_str)) {
            continue;
        }

        files.push(entry_path.to_path_buf());
    }

    Ok(files)
}
