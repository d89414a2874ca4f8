//! Configuration management for atlas.
//!
//! Loads configuration from ${ATLAS_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default base URL of the places API.
pub const DEFAULT_BASE_URL: &str = "https://api.atlas.place/v1";

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the places API. Overridden by `ATLAS_BASE_URL`.
    pub base_url: String,
    /// Refresh endpoint path, relative to the base URL.
    pub refresh_path: String,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            refresh_path: "/auth/refresh".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Loads configuration from the default location.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if the file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the base URL with precedence: env > config > default.
    ///
    /// Trailing slashes are trimmed so paths can be appended verbatim.
    ///
    /// # Errors
    /// Returns an error if the resolved value is not a well-formed URL.
    pub fn resolved_base_url(&self) -> Result<String> {
        if let Ok(env_url) = std::env::var("ATLAS_BASE_URL") {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                validate_url(trimmed)?;
                return Ok(trimmed.trim_end_matches('/').to_string());
            }
        }

        let trimmed = self.base_url.trim();
        validate_url(trimmed)?;
        Ok(trimmed.trim_end_matches('/').to_string())
    }

    /// Absolute URL of the credential refresh endpoint.
    ///
    /// # Errors
    /// Returns an error if the base URL is not well-formed.
    pub fn refresh_url(&self) -> Result<String> {
        Ok(format!("{}{}", self.resolved_base_url()?, self.refresh_path))
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Validates that a URL is well-formed.
fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid base URL: {url}"))?;
    Ok(())
}

pub mod paths {
    //! Path resolution for atlas configuration and session data.
    //!
    //! ATLAS_HOME resolution order:
    //! 1. ATLAS_HOME environment variable (if set)
    //! 2. ~/.config/atlas (default)

    use std::path::PathBuf;

    /// Returns the atlas home directory.
    ///
    /// Checks ATLAS_HOME env var first, falls back to ~/.config/atlas
    pub fn atlas_home() -> PathBuf {
        if let Ok(home) = std::env::var("ATLAS_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("atlas"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        atlas_home().join("config.toml")
    }

    /// Returns the path to the persisted session tokens.
    pub fn session_path() -> PathBuf {
        atlas_home().join("session.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_missing() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.refresh_path, "/auth/refresh");
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://localhost:9000/\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:9000/");
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_refresh_url_joins_without_double_slash() {
        let config = Config {
            base_url: "http://localhost:9000/".to_string(),
            ..Config::default()
        };
        // Ignores the env override only when ATLAS_BASE_URL is unset; CI
        // never sets it.
        assert_eq!(config.refresh_url().unwrap(), "http://localhost:9000/auth/refresh");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = Config {
            base_url: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.resolved_base_url().is_err());
    }
}
