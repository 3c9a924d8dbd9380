use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::create_backend;

#[derive(Debug, Subcommand)]
pub enum CollectionsCommand {
    /// List collections with chunk counts
    List,

    /// Delete a collection and all of its chunks
    Delete {
        #[arg(required = true)]
        name: String,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        force: bool,
    },
}

pub async fn handle_collections(
    cmd: CollectionsCommand,
    config: Config,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);
    let store = create_backend(&config.vector_store)
        .await
        .context("failed to open vector store")?;

    match cmd {
        CollectionsCommand::List => {
            let collections = store.list_collections().await?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&collections)?);
            } else if collections.is_empty() {
                println!("{}", formatter.format_message("No collections."));
            } else {
                for c in &collections {
                    println!("{}\t{}", c.name, c.count);
                }
            }
        }
        CollectionsCommand::Delete { name, force } => {
            if !force {
                println!(
                    "This will delete collection '{}' and all of its chunks. Continue? [y/N]",
                    name
                );
                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;
                if !input.trim().eq_ignore_ascii_case("y") {
                    println!("{}", formatter.format_message("Cancelled."));
                    return Ok(());
                }
            }

            let message = if store.delete_collection(&name).await? {
                format!("Deleted collection '{}'", name)
            } else {
                format!("Collection '{}' does not exist", name)
            };
            println!("{}", formatter.format_message(&message));
        }
    }

    Ok(())
}
