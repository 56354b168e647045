//! API conformance CLI
//!
//! Runs the scenario suites for the authentication and users API against
//! the service at `BASE_URL` and exits non-zero unless every scenario passes.

use clap::Parser;
use commands::Commands;
use conformance::common::logging;
use conformance::{cli, commands};

#[derive(Parser)]
#[command(name = "conformance", about = "Scenario-driven REST API conformance runner")]
#[command(version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = matches!(cli.command, Commands::Run { verbose: true, .. });
    logging::init_cli(verbose);

    match cli::dispatch(cli.command).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    }
}
