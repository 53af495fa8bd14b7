//! CLI argument parsing for the sommelier binary.
//!
//! CLI flags override every other configuration source.

use clap::{Parser, Subcommand};

/// Sommelier
///
/// A retrieval-augmented wine chatbot over a local vector index.
#[derive(Parser, Debug)]
#[command(name = "sommelier")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/sommelier/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the index and start an interactive chat on stdin/stdout
    Chat {
        /// Search results fed to the model per turn
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        /// Override dataset path
        #[arg(long)]
        data: Option<String>,
    },

    /// Build the index and run a single search
    Search {
        /// Query text
        query: String,

        /// Maximum results
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        /// Print the indented text form instead of summary lines
        #[arg(long)]
        text: bool,

        /// Override dataset path
        #[arg(long)]
        data: Option<String>,
    },

    /// Build the index and report its size
    Build {
        /// Override dataset path
        #[arg(long)]
        data: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_chat_defaults() {
        let cli = Cli::parse_from(["sommelier", "chat"]);
        match cli.command {
            Commands::Chat { limit, data } => {
                assert!(limit.is_none());
                assert!(data.is_none());
            }
            _ => panic!("Expected Chat command"),
        }
    }

    #[test]
    fn test_cli_search_with_options() {
        let cli = Cli::parse_from([
            "sommelier",
            "search",
            "Suggest me an amazing wine from Saint Emilion",
            "-k",
            "5",
            "--text",
        ]);
        match cli.command {
            Commands::Search {
                query, limit, text, ..
            } => {
                assert_eq!(query, "Suggest me an amazing wine from Saint Emilion");
                assert_eq!(limit, Some(5));
                assert!(text);
            }
            _ => panic!("Expected Search command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "sommelier",
            "build",
            "--data",
            "wines.csv",
            "--config",
            "/tmp/s.toml",
            "-l",
            "debug",
        ]);
        assert_eq!(cli.config.as_deref(), Some("/tmp/s.toml"));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        match cli.command {
            Commands::Build { data } => assert_eq!(data.as_deref(), Some("wines.csv")),
            _ => panic!("Expected Build command"),
        }
    }

    #[test]
    fn test_cli_search_requires_query() {
        assert!(Cli::try_parse_from(["sommelier", "search"]).is_err());
    }
}
