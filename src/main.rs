//! Kimi Agent CLI entry point.

use anyhow::Result;
use clap::Parser;
use kimi_agent::cli::{commands, Cli, Commands};
use kimi_agent::config::{load_env_file, Settings};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // API keys and OPENAI_API_BASE may come from a .env file
    let env_file = load_env_file(None);

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    kimi_agent::logging::init(cli.verbose, &settings);
    if let Some(path) = env_file {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    // Ensure data directories exist
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match cli.command {
        None | Some(Commands::Chat) => {
            commands::run_chat(settings).await?;
        }

        Some(Commands::Ask { command, tools }) => {
            commands::run_ask(&command, tools, settings).await?;
        }

        Some(Commands::Config { action }) => {
            commands::run_config(&action, config_path, settings)?;
        }
    }

    Ok(())
}
