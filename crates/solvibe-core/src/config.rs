//! Configuration management for the SolVibe client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend URL (can be overridden at compile time via SOLVIBE_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("SOLVIBE_API_URL") {
    Some(url) => url,
    None => "http://localhost:3000",
};

/// Page opened when no wallet extension is installed.
pub const DEFAULT_WALLET_INSTALL_URL: &str = "https://phantom.app/";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default application-level timeout for backend calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// How many times a verify rejected for a stale challenge is retried with a
/// freshly requested one before the attempt fails.
pub const DEFAULT_MAX_CHALLENGE_REFRESHES: u32 = 1;

/// Backend URL baked in at build time.
pub fn compile_time_api_url() -> &'static str {
    DEFAULT_API_URL
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend base URL; endpoint paths are joined onto it.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Timeout applied to every backend request.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Install page opened when the wallet extension is missing.
    #[serde(default = "default_wallet_install_url")]
    pub wallet_install_url: String,
    /// Bound on automatic fresh-challenge retries after a stale verify.
    #[serde(default = "default_max_challenge_refreshes")]
    pub max_challenge_refreshes: u32,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_wallet_install_url() -> String {
    DEFAULT_WALLET_INSTALL_URL.to_string()
}

fn default_max_challenge_refreshes() -> u32 {
    DEFAULT_MAX_CHALLENGE_REFRESHES
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            wallet_install_url: default_wallet_install_url(),
            max_challenge_refreshes: DEFAULT_MAX_CHALLENGE_REFRESHES,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Some(url) = env_non_empty("SOLVIBE_API_URL") {
            self.api_base_url = url;
        }
        if let Some(level) = env_non_empty("SOLVIBE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(raw) = env_non_empty("SOLVIBE_REQUEST_TIMEOUT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) => self.request_timeout_secs = secs,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid SOLVIBE_REQUEST_TIMEOUT_SECS"),
            }
        }
    }

    /// Reject values that would make the client unusable.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        if self.request_timeout_secs == 0 {
            return Err(CoreError::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the backend URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
        assert_eq!(config.request_timeout_secs, 15);
        assert_eq!(config.wallet_install_url, "https://phantom.app/");
        assert_eq!(config.max_challenge_refreshes, 1);
    }

    #[test]
    fn test_config_load_from_file_fills_missing_fields() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(&config_path, r#"{ "log_level": "debug" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_config_save_and_load_file_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config {
            log_level: "trace".to_string(),
            api_base_url: "https://api.solvibe.test".to_string(),
            request_timeout_secs: 5,
            max_challenge_refreshes: 3,
            ..Config::default()
        };
        config.save(&paths).unwrap();

        let loaded = Config::load_from_file(&paths.config_file()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent_file_is_valid() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert!(config.api_base_url().is_ok());
    }

    #[test]
    fn test_config_api_url_parse() {
        let config = Config {
            api_base_url: "http://localhost:3000".to_string(),
            ..Config::default()
        };
        let url = config.api_base_url().unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.port(), Some(3000));
    }

    #[test]
    fn test_config_invalid_url() {
        let config = Config {
            api_base_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(config.api_base_url().is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config {
            request_timeout_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_request_timeout_duration() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
    }
}
