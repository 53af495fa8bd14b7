//! Sommelier
//!
//! A retrieval-augmented wine chatbot.
//!
//! # Usage
//!
//! ```bash
//! sommelier chat [-k LIMIT] [--data PATH]
//! sommelier search "QUERY" [-k LIMIT] [--text] [--data PATH]
//! sommelier build [--data PATH]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/sommelier/config.toml)
//! 3. `--config` file
//! 4. Environment variables (SOMMELIER_*)
//! 5. CLI flags

use anyhow::Result;
use clap::Parser;

use sommelier_cli::{
    init_logging, load_settings, run_build, run_chat, run_search, Cli, Commands, Overrides,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (data, limit) = match &cli.command {
        Commands::Chat { data, limit } => (data.clone(), *limit),
        Commands::Search { data, limit, .. } => (data.clone(), *limit),
        Commands::Build { data } => (data.clone(), None),
    };
    let overrides = Overrides {
        log_level: cli.log_level.clone(),
        data,
        limit,
    };
    let settings = load_settings(cli.config.as_deref(), &overrides)?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Chat { .. } => {
            run_chat(&settings).await?;
        }
        Commands::Search { query, text, .. } => {
            run_search(&settings, &query, text, &mut std::io::stdout().lock())?;
        }
        Commands::Build { .. } => {
            run_build(&settings, &mut std::io::stdout().lock())?;
        }
    }

    Ok(())
}
