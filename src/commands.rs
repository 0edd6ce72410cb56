//! CLI command definitions
//!
//! Defines the clap commands for the flagrun CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run one or more suite files
    Run {
        /// Paths to YAML suite files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Only run scenarios carrying this tag
        #[arg(long, short)]
        tag: Option<String>,

        /// Override the base URL of every suite
        #[arg(long)]
        base_url: Option<String>,

        /// Phase timeout in milliseconds (default from config: 30000)
        #[arg(long)]
        phase_timeout: Option<u64>,

        /// Serve empty 200 responses instead of touching the network
        #[arg(long)]
        dry_run: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,

        /// Print every log entry, not only failures
        #[arg(long, short)]
        verbose: bool,
    },

    /// Parse suite files without running them
    Validate {
        /// Paths to YAML suite files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Only print where configuration is read from
        #[arg(long)]
        path: bool,
    },
}
