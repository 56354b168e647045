//! Scenario runner
//!
//! Reads YAML suites, executes their scenarios in order against the API
//! under test, and threads fixture values (tokens, created ids) from one
//! scenario to the next. Assertions are evaluated against parsed JSON
//! rather than raw response text.

mod config;
mod expect;
mod fixture;
mod report;
mod runner;

pub use config::*;
pub use expect::{check, evaluate, lookup, AssertionFailure};
pub use fixture::{is_empty, value_to_string, FixtureContext};
pub use report::{
    format_summary, GroupReport, Outcome, Printer, RunReport, ScenarioResult, ScenarioState,
    Summary,
};
pub use runner::{build_request, execute, RunOptions, Runner};
