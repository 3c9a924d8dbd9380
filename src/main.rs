use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ragflow::cli::commands::{
    handle_collections, handle_config, handle_extract, handle_ingest, handle_search, handle_serve,
    handle_status,
};
use ragflow::cli::{Cli, Commands};
use ragflow::models::{Config, OutputFormat, ResolvedConfig};

/// Detect ONNX Runtime library path and set ORT_DYLIB_PATH if not already set.
/// Must be called before any ort code runs.
fn detect_and_set_ort_path() {
    if std::env::var("ORT_DYLIB_PATH")
        .map(|p| Path::new(&p).exists())
        .unwrap_or(false)
    {
        return;
    }

    let home = std::env::var("HOME").unwrap_or_default();

    let found = if cfg!(target_os = "macos") {
        [
            format!("{home}/.local/lib/ragflow/libonnxruntime.dylib"),
            "/opt/homebrew/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
            "/usr/local/opt/onnxruntime/lib/libonnxruntime.dylib".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else if cfg!(target_os = "linux") {
        [
            format!("{home}/.local/lib/ragflow/libonnxruntime.so"),
            "/usr/lib/libonnxruntime.so".into(),
            "/usr/local/lib/libonnxruntime.so".into(),
            "/usr/lib/x86_64-linux-gnu/libonnxruntime.so".into(),
            "/usr/lib/aarch64-linux-gnu/libonnxruntime.so".into(),
        ]
        .into_iter()
        .find(|p| Path::new(p).exists())
    } else {
        None
    };

    if let Some(path) = found {
        // SAFETY: Called at program start before any threads are spawned.
        unsafe {
            std::env::set_var("ORT_DYLIB_PATH", path);
        }
    }
}

/// Uses `RUST_LOG` if set, otherwise `ragflow=info` (`ragflow=debug` with `-v`).
fn init_logging(verbose: bool) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if verbose {
        EnvFilter::new("ragflow=debug,tower_http=debug")
    } else {
        EnvFilter::new("ragflow=info")
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    detect_and_set_ort_path();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
    let resolved = Config::load(cli.config.as_deref())?;
    let format = cli.format.unwrap_or_default();
    run_command(cli.command, resolved, format, cli.verbose).await
}

async fn run_command(
    command: Commands,
    resolved: ResolvedConfig,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    match command {
        Commands::Serve(args) => {
            handle_serve(args, resolved.config).await?;
        }
        Commands::Ingest(args) => {
            handle_ingest(args, resolved.config, format, verbose).await?;
        }
        Commands::Search(args) => {
            handle_search(args, resolved.config, format, verbose).await?;
        }
        Commands::Extract(args) => {
            handle_extract(args, format, verbose).await?;
        }
        Commands::Status => {
            handle_status(resolved.config, format, verbose).await?;
        }
        Commands::Collections(cmd) => {
            handle_collections(cmd, resolved.config, format).await?;
        }
        Commands::Config(cmd) => {
            handle_config(cmd, resolved, format).await?;
        }
    }

    Ok(())
}
