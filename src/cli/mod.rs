//! Command-line interface for the ragflow backend.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// RAG workflow backend: upload, extract, embed and retrieve documents.
#[derive(Debug, Parser)]
#[command(name = "ragflow")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Path to a config file")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP API
    Serve(commands::ServeArgs),

    /// Extract, chunk, embed and store files in a collection
    Ingest(commands::IngestArgs),

    /// Query a collection
    Search(commands::SearchArgs),

    /// Print the text extracted from a file
    Extract(commands::ExtractArgs),

    /// Check vector store and embedding model status
    Status,

    /// List or delete collections
    #[command(subcommand)]
    Collections(commands::CollectionsCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
