//! API conformance runner
//!
//! This library runs declarative HTTP scenarios against a REST API,
//! chaining tokens and created ids between steps and reporting every
//! divergence from the expected responses.

pub mod cli;
pub mod commands;
pub mod common;
pub mod http;
pub mod scenario;
pub mod suites;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use http::{HttpRequest, HttpResponse, Method, Transport, TransportError};
pub use scenario::{FixtureContext, Outcome, RunOptions, RunReport, Runner, Suite};
