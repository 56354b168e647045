//! CLI command definitions
//!
//! Defines the clap commands for the conformance CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run scenario suites against the API
    Run {
        /// YAML suite files, run in the given order (default: built-in suites)
        suites: Vec<PathBuf>,

        /// Base URL of the API under test (overrides BASE_URL)
        #[arg(long)]
        base_url: Option<String>,

        /// Per-scenario timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Only run scenarios whose "group / scenario" name contains this text
        #[arg(long, short)]
        filter: Option<String>,

        /// Stop the run at the first transport error
        #[arg(long)]
        abort_on_transport_error: bool,

        /// Configuration file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the report as JSON instead of colored text
        #[arg(long)]
        json: bool,

        /// Verbose output
        #[arg(long, short)]
        verbose: bool,
    },

    /// List groups and scenarios without sending any request
    List {
        /// YAML suite files (default: built-in suites)
        suites: Vec<PathBuf>,
    },
}
