//! Configuration file handling
//!
//! Settings are layered: built-in defaults, then the TOML config file, then
//! the `BASE_URL` environment variable, then command-line flags.

use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::paths::{config_path, config_path_display};
use super::{Error, Result};

/// Environment variable naming the API under test
pub const BASE_URL_ENV: &str = "BASE_URL";

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Run behaviour
    #[serde(default)]
    pub run: RunConfig,
}

/// HTTP client settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    /// Base URL of the API under test
    pub base_url: Option<String>,

    /// Default per-scenario timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("api-conformance/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Run behaviour
#[derive(Debug, Deserialize, Default)]
pub struct RunConfig {
    /// Stop the run after the first scenario that errors at the transport level
    #[serde(default)]
    pub abort_on_transport_error: bool,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse(e.to_string()))
    }
}

/// Command-line values that override the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub abort_on_transport_error: bool,
}

/// Fully resolved settings for a single run
#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
    pub abort_on_transport_error: bool,
}

impl Settings {
    /// Resolve settings from the config file, the process environment and
    /// command-line overrides
    pub fn from_env(config: Config, overrides: Overrides) -> Result<Self> {
        let env_base_url = std::env::var(BASE_URL_ENV).ok();
        Self::resolve(config, overrides, env_base_url)
    }

    /// Resolve settings with an explicit `BASE_URL` value
    ///
    /// Precedence for the base URL: flag, environment, config file. Empty
    /// values are treated as unset.
    pub fn resolve(
        config: Config,
        overrides: Overrides,
        env_base_url: Option<String>,
    ) -> Result<Self> {
        let raw = [overrides.base_url, env_base_url, config.http.base_url]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .find(|s| !s.is_empty())
            .ok_or_else(|| Error::MissingBaseUrl(config_path_display()))?;

        let base_url = parse_base_url(&raw)?;

        let timeout_secs = overrides.timeout_secs.unwrap_or(config.http.timeout_secs);
        if timeout_secs == 0 {
            return Err(Error::Config("timeout must be at least 1 second".to_string()));
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(timeout_secs),
            user_agent: config.http.user_agent,
            abort_on_transport_error: overrides.abort_on_transport_error
                || config.run.abort_on_transport_error,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| Error::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(Error::InvalidBaseUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
