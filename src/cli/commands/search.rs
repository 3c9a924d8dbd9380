use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;

use crate::cli::output::get_formatter;
use crate::context::AppContext;
use crate::models::{Config, OutputFormat, QueryFailurePolicy, SearchResults};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'c', help = "Collection to search")]
    pub collection: Option<String>,

    #[arg(long, short = 'm', help = "Embedding model used at ingestion")]
    pub model: Option<String>,

    #[arg(long, help = "API key for the embedding provider")]
    pub api_key: Option<String>,

    #[arg(long, short = 'n', help = "Maximum number of results to return")]
    pub limit: Option<usize>,

    #[arg(long, help = "Fail on errors instead of returning no results")]
    pub strict: bool,
}

pub async fn handle_search(
    args: SearchArgs,
    config: Config,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let query = args.query.trim().to_string();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }
    if args.limit == Some(0) {
        anyhow::bail!("limit must be at least 1");
    }

    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let ctx = AppContext::from_config(config).await?;
    let search_query = ctx.search_query(
        query,
        args.model,
        args.api_key,
        args.collection,
        args.limit,
    );

    let policy = if args.strict {
        QueryFailurePolicy::Strict
    } else {
        ctx.pipeline.failure_policy()
    };

    if verbose {
        eprintln!("Query: \"{}\"", search_query.query);
        eprintln!("  Collection: {}", search_query.collection_name);
        eprintln!("  Model: {}", search_query.embedding_model);
        eprintln!("  Limit: {}", search_query.n_results);
        eprintln!("  Policy: {:?}", policy);
    }

    let results = ctx
        .pipeline
        .query_with_policy(&search_query, policy)
        .await
        .context("search failed")?;

    let duration_ms = start_time.elapsed().as_millis() as u64;
    if verbose {
        eprintln!("Total: {duration_ms}ms");
        eprintln!();
    }

    let search_results = SearchResults::new(
        search_query.query,
        search_query.collection_name,
        results,
        duration_ms,
    );
    print!("{}", formatter.format_search_results(&search_results));

    Ok(())
}
