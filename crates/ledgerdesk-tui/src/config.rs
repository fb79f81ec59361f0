//! Configuration file handling.
//!
//! Reads from `~/.config/ledgerdesk/ledgerdesk.toml`

use anyhow::{Context, Result};
use ledgerdesk_core::Resource;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

/// Environment variable overriding the configured endpoint.
pub const ENDPOINT_ENV: &str = "LEDGERDESK_ENDPOINT";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// GraphQL endpoint of the bookkeeping service.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Where the session token is kept. Defaults to the data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_path: Option<PathBuf>,
    /// Per-request timeout. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Page shown after login.
    #[serde(default = "default_start_route")]
    pub start_route: String,
}

fn default_endpoint() -> String {
    "http://localhost:3000/graphql".to_string()
}

fn default_start_route() -> String {
    Resource::Expense.route().to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            session_path: None,
            request_timeout_secs: None,
            start_route: default_start_route(),
        }
    }
}

impl Config {
    /// Load configuration from the config file.
    ///
    /// If `custom_path` is provided, load from that path and fail when it is
    /// missing. Otherwise use the default location, writing a default config
    /// there on first run.
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self> {
        match custom_path {
            Some(path) => Self::load_from(&path, false),
            None => Self::load_from(&Self::config_path()?, true),
        }
    }

    fn load_from(path: &Path, create_if_missing: bool) -> Result<Self> {
        if !path.exists() {
            if !create_if_missing {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            let config = Config::default();
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        tracing::info!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Apply overrides in increasing precedence: environment, then CLI.
    pub fn with_overrides(mut self, env_endpoint: Option<String>, cli_endpoint: Option<String>) -> Self {
        if let Some(endpoint) = cli_endpoint.or(env_endpoint).filter(|e| !e.trim().is_empty()) {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn endpoint_url(&self) -> Result<Url> {
        Url::parse(&self.endpoint).with_context(|| format!("Invalid endpoint URL: {}", self.endpoint))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.filter(|s| *s > 0).map(Duration::from_secs)
    }

    /// Resolved session file location.
    pub fn session_path(&self) -> Result<PathBuf> {
        match &self.session_path {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join("session.toml")),
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("ledgerdesk").join("ledgerdesk.toml"))
    }
}

/// Per-user data directory for the session and the log.
pub fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_dir().context("Could not determine data directory")?;
    Ok(dir.join("ledgerdesk"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_custom_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(dir.path().join("nope.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn default_is_written_on_first_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledgerdesk").join("ledgerdesk.toml");

        let config = Config::load_from(&path, true).unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());
        assert_eq!(Config::load_from(&path, false).unwrap(), config);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledgerdesk.toml");
        std::fs::write(&path, "request_timeout_secs = 15\nstart_route = \"/workers\"\n").unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.endpoint, "http://localhost:3000/graphql");
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(15)));
        assert_eq!(config.start_route, "/workers");
    }

    #[test]
    fn cli_beats_env_beats_file() {
        let config = Config::default();
        let env = Some("http://env/graphql".to_string());
        let cli = Some("http://cli/graphql".to_string());

        assert_eq!(config.clone().with_overrides(env.clone(), cli).endpoint, "http://cli/graphql");
        assert_eq!(config.clone().with_overrides(env, None).endpoint, "http://env/graphql");
        assert_eq!(config.with_overrides(None, None).endpoint, default_endpoint());
    }

    #[test]
    fn bad_endpoint_is_reported() {
        let config = Config {
            endpoint: "not a url".to_string(),
            ..Config::default()
        };
        assert!(config.endpoint_url().is_err());
        assert!(Config::default().endpoint_url().is_ok());
    }
}
