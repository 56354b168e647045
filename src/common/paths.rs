//! Platform configuration paths

use std::path::PathBuf;

/// Name used for the configuration directory
const APP_NAME: &str = "api-conformance";

/// Environment variable that overrides the config file location
pub const CONFIG_ENV: &str = "CONFORMANCE_CONFIG";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/api-conformance/`
/// - macOS: `~/Library/Application Support/api-conformance/`
/// - Windows: `%APPDATA%\api-conformance\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
///
/// `CONFORMANCE_CONFIG` wins over the platform default.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Human-readable config location for error messages
pub fn config_path_display() -> String {
    config_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "config.toml".to_string())
}
