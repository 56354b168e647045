//! CLI command handling
//!
//! Dispatches CLI commands and turns run reports into exit codes.

use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::commands::Commands;
use crate::common::config::{Config, Overrides, Settings};
use crate::common::Result;
use crate::http::HttpClient;
use crate::scenario::{Printer, RunOptions, Runner, Suite};
use crate::suites;

/// Dispatch a CLI command, returning the process exit code
pub async fn dispatch(command: Commands) -> Result<i32> {
    match command {
        Commands::Run {
            suites,
            base_url,
            timeout,
            filter,
            abort_on_transport_error,
            config,
            json,
            verbose,
        } => {
            let overrides = Overrides {
                base_url,
                timeout_secs: timeout,
                abort_on_transport_error,
            };
            run(&suites, config.as_deref(), overrides, filter, json, verbose).await
        }

        Commands::List { suites } => {
            list(&suites)?;
            Ok(0)
        }
    }
}

async fn run(
    paths: &[PathBuf],
    config_path: Option<&Path>,
    overrides: Overrides,
    filter: Option<String>,
    json: bool,
    verbose: bool,
) -> Result<i32> {
    // Configuration problems abort before any scenario executes
    let config = match config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let settings = Settings::from_env(config, overrides)?;
    let suites = suites::load_or_builtin(paths)?;

    tracing::info!(
        base_url = %settings.base_url,
        suites = suites.len(),
        timeout_secs = settings.timeout.as_secs(),
        "starting run"
    );

    let client = HttpClient::new(&settings)?;
    let options = RunOptions::from_settings(&settings, filter);
    let mut runner = Runner::new(&client, options).with_printer(Printer::new(!json, verbose));
    let report = runner.run(&suites).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    Ok(report.exit_code())
}

fn list(paths: &[PathBuf]) -> Result<()> {
    let suites = suites::load_or_builtin(paths)?;
    for suite in &suites {
        print_suite(suite)?;
    }
    Ok(())
}

fn print_suite(suite: &Suite) -> Result<()> {
    println!(
        "\n{} {}",
        suite.name.white().bold(),
        format!("({} scenarios)", suite.scenario_count()).dimmed()
    );
    for group in &suite.groups {
        println!("  {}", group.name.cyan());
        for scenario in &group.scenarios {
            let needs = scenario.preconditions()?;
            if needs.is_empty() {
                println!("    {}", scenario.name);
            } else {
                println!(
                    "    {} {}",
                    scenario.name,
                    format!("[needs: {}]", needs.join(", ")).dimmed()
                );
            }
        }
    }
    Ok(())
}
