use anyhow::Result;

use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat, VectorDriver};
use crate::services::create_backend;

pub async fn handle_status(config: Config, format: OutputFormat, verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    let (connected, collections) = match create_backend(&config.vector_store).await {
        Ok(store) => {
            let connected = store.health_check().await.unwrap_or(false);
            let collections = if connected {
                store.list_collections().await.unwrap_or_default()
            } else {
                Vec::new()
            };
            (connected, collections)
        }
        Err(e) => {
            if verbose {
                eprintln!("Vector store unavailable: {}", e);
            }
            (false, Vec::new())
        }
    };

    let local_model_dir = config.embedding.local.resolved_model_dir();
    let local_model_present = local_model_dir
        .as_ref()
        .is_some_and(|dir| dir.join("model.onnx").exists() && dir.join("tokenizer.json").exists());

    let status = StatusInfo {
        driver: config.vector_store.driver.to_string(),
        location: config.vector_store.location(),
        connected,
        collections,
        default_model: config.embedding.default_model.clone(),
        local_model_dir: local_model_dir.map(|d| d.display().to_string()),
        local_model_present,
        upload_dir: config.storage.upload_dir.display().to_string(),
    };

    print!("{}", formatter.format_status(&status));

    if !connected {
        eprintln!();
        match config.vector_store.driver {
            VectorDriver::Qdrant => {
                eprintln!("Warning: Qdrant not running. Start with: docker-compose up -d qdrant");
            }
            VectorDriver::Sqlite => {
                eprintln!(
                    "Warning: could not open the index at {}. Check the path and permissions.",
                    config.vector_store.path.display()
                );
            }
        }
    }

    Ok(())
}
