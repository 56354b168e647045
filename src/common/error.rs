//! Error types for the conformance runner
//!
//! Only errors that abort a whole run live here. Assertion failures,
//! missing fixtures and transport errors are captured as scenario outcomes
//! by the runner and never surface as `Error`.

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the conformance runner
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("No base URL configured. Set BASE_URL, pass --base-url, or add base_url under [http] in {0}")]
    MissingBaseUrl(String),

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Suite Errors ===
    #[error("Failed to parse suite '{name}': {reason}")]
    SuiteParse { name: String, reason: String },

    #[error("Invalid scenario '{scenario}': {reason}")]
    InvalidScenario { scenario: String, reason: String },

    // === IO Errors ===
    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a suite parse error
    pub fn suite_parse(name: &str, reason: impl ToString) -> Self {
        Self::SuiteParse {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid scenario error
    pub fn invalid_scenario(scenario: &str, reason: impl ToString) -> Self {
        Self::InvalidScenario {
            scenario: scenario.to_string(),
            reason: reason.to_string(),
        }
    }
}
