//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Harbor using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Harbor - PHI document-intake pipeline
#[derive(Parser, Debug)]
#[command(name = "harbor")]
#[command(version, about, long_about = None)]
#[command(author = "Harbor Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "harbor.toml", env = "HARBOR_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HARBOR_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Process a single document through the intake pipeline
    Process(commands::process::ProcessArgs),

    /// Process many documents concurrently
    Batch(commands::batch::BatchArgs),

    /// Search stored documents
    Search(commands::search::SearchArgs),

    /// Show store statistics and dependency health
    Stats(commands::stats::StatsArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_process() {
        let cli = Cli::parse_from(["harbor", "process", "note.txt"]);
        assert_eq!(cli.config, "harbor.toml");
        assert!(matches!(cli.command, Commands::Process(_)));
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["harbor", "--config", "custom.toml", "stats"]);
        assert_eq!(cli.config, "custom.toml");
        assert!(matches!(cli.command, Commands::Stats(_)));
    }

    #[test]
    fn test_cli_parse_batch_multiple_paths() {
        let cli = Cli::parse_from(["harbor", "batch", "a.pdf", "b.docx", "scans/"]);
        match cli.command {
            Commands::Batch(args) => assert_eq!(args.inputs.len(), 3),
            _ => panic!("expected batch command"),
        }
    }

    #[test]
    fn test_cli_parse_search() {
        let cli = Cli::parse_from(["harbor", "search", "diabetes", "--phi-only"]);
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query, "diabetes");
                assert!(args.phi_only);
            }
            _ => panic!("expected search command"),
        }
    }

    #[test]
    fn test_cli_parse_validate_and_init() {
        assert!(matches!(
            Cli::parse_from(["harbor", "validate-config"]).command,
            Commands::ValidateConfig(_)
        ));
        assert!(matches!(
            Cli::parse_from(["harbor", "init"]).command,
            Commands::Init(_)
        ));
    }
}
