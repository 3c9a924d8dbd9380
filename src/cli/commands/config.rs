use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, ResolvedConfig};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(
            long,
            short = 'g',
            help = "Create global config instead of ./ragflow.toml"
        )]
        global: bool,
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show current configuration")]
    Show,
    #[command(about = "Show configuration file paths")]
    Path,
}

pub async fn handle_config(
    cmd: ConfigCommand,
    resolved: ResolvedConfig,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        ConfigCommand::Init { global, force } => handle_init(global, force, format),
        ConfigCommand::Show => handle_show(&resolved, format),
        ConfigCommand::Path => handle_path(&resolved),
    }
}

fn handle_init(global: bool, force: bool, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    let config_path = if global {
        Config::global_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?
    } else {
        Config::project_path()
    };

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    Config::default()
        .save(&config_path)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", config_path.display()))
    );
    Ok(())
}

fn handle_show(resolved: &ResolvedConfig, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": resolved.config,
            "path": resolved.path,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match &resolved.path {
        Some(path) => println!("# Loaded from: {}", path.display()),
        None => println!("# No config file found, using defaults"),
    }
    println!();
    print!("{}", toml::to_string_pretty(&resolved.config)?);

    let keys = [
        ("openai", resolved.config.embedding.openai.api_key.is_some()),
        ("gemini", resolved.config.embedding.gemini.api_key.is_some()),
    ];
    println!();
    for (provider, set) in keys {
        println!(
            "# {} api key: {}",
            provider,
            if set { "set" } else { "not set" }
        );
    }

    Ok(())
}

fn handle_path(resolved: &ResolvedConfig) -> Result<()> {
    println!("Configuration paths:");
    println!();

    if let Some(ref path) = resolved.path {
        println!("Active config: {}", path.display());
    } else {
        println!("Active config: none (defaults)");
    }

    let project = Config::project_path();
    println!(
        "Project config: {}{}",
        project.display(),
        if project.exists() { "" } else { " (missing)" }
    );

    if let Some(global) = Config::global_path() {
        println!(
            "Global config: {}{}",
            global.display(),
            if global.exists() { "" } else { " (missing)" }
        );
    }

    if let Ok(cwd) = std::env::current_dir() {
        let env_path = cwd.join(".env");
        println!(
            ".env file: {}{}",
            env_path.display(),
            if env_path.exists() { "" } else { " (missing)" }
        );
    }

    Ok(())
}
