//! CLI argument definitions using clap
//!
//! Commands:
//! - scrapedef validate --config <path>
//! - scrapedef effective --config <path>
//! - scrapedef compile --config <path> [--dry-run] [--at <instant>]
//! - scrapedef history --config <path> --name <name>
//! - scrapedef members --config <path> --name <name> [--at <instant>]

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// scrapedef - compile and version scraper definitions
#[derive(Parser, Debug)]
#[command(name = "scrapedef")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the defined and effective definitions
    Validate {
        /// Path to configuration file
        #[arg(long, default_value = "./scrapedef.yml")]
        config: PathBuf,
    },

    /// Print the effective definitions as YAML
    Effective {
        /// Path to configuration file
        #[arg(long, default_value = "./scrapedef.yml")]
        config: PathBuf,
    },

    /// Compile DataDefs and reconcile them into the store
    Compile {
        /// Path to configuration file
        #[arg(long, default_value = "./scrapedef.yml")]
        config: PathBuf,

        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Run timestamp (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// List every stored version of a DataDef
    History {
        /// Path to configuration file
        #[arg(long, default_value = "./scrapedef.yml")]
        config: PathBuf,

        /// DataDef name
        #[arg(long)]
        name: String,
    },

    /// Expand the member tuples of a DataDef
    Members {
        /// Path to configuration file
        #[arg(long, default_value = "./scrapedef.yml")]
        config: PathBuf,

        /// DataDef name
        #[arg(long)]
        name: String,

        /// Version active at this instant (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_flags() {
        let cli = Cli::try_parse_from([
            "scrapedef",
            "compile",
            "--config",
            "conf/scrapedef.yml",
            "--dry-run",
            "--at",
            "2024-03-01T10:00:00Z",
        ])
        .unwrap();
        match cli.command {
            Command::Compile { config, dry_run, at } => {
                assert_eq!(config, PathBuf::from("conf/scrapedef.yml"));
                assert!(dry_run);
                assert_eq!(at.unwrap().to_rfc3339(), "2024-03-01T10:00:00+00:00");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_history_requires_name() {
        assert!(Cli::try_parse_from(["scrapedef", "history"]).is_err());
    }

    #[test]
    fn test_default_config_path() {
        let cli = Cli::try_parse_from(["scrapedef", "validate"]).unwrap();
        match cli.command {
            Command::Validate { config } => assert_eq!(config, PathBuf::from("./scrapedef.yml")),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
