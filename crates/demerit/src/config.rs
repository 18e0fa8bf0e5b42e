//! Configuration management for demerit.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "demerit";

/// Default database file name.
const DATABASE_FILE_NAME: &str = "records.db";

/// Default token file name.
const TOKEN_FILE_NAME: &str = "token";

/// Default server address, the sync server's local development port.
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `DEMERIT_`, sections separated
///    by a double underscore, e.g. `DEMERIT_SERVER__BASE_URL`)
/// 2. TOML config file at `~/.config/demerit/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sync server configuration.
    pub server: ServerConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Recorder identity defaults.
    pub recorder: RecorderConfig,
}

/// Sync-server-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the sync server.
    pub base_url: String,
    /// Request timeout in seconds. Set to 0 to disable the timeout.
    pub request_timeout_secs: u64,
    /// Path to the stored login token.
    /// Defaults to `~/.local/share/demerit/token`
    pub token_path: Option<PathBuf>,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `~/.local/share/demerit/records.db`
    pub database_path: Option<PathBuf>,
}

/// Default identity of the recording teacher.
///
/// Used when the `record` command is not given explicit `--recorder` and
/// `--recorder-class` values. Both default to empty, in which case the
/// command requires the flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// The recorder's name.
    pub name: String,
    /// The class the recorder is responsible for.
    pub class_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            token_path: None, // Will be resolved to default at runtime
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. TOML config file (if exists)
    /// 3. Environment variables (prefixed with `DEMERIT_`)
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(Env::prefixed("DEMERIT_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let url = reqwest::Url::parse(&self.server.base_url).map_err(|e| {
            Error::ConfigValidation {
                message: format!("invalid base_url {:?}: {e}", self.server.base_url),
            }
        })?;

        if url.cannot_be_a_base() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "base_url {:?} cannot carry API paths",
                    self.server.base_url
                ),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(DATABASE_FILE_NAME))
    }

    /// Get the token file path, resolving defaults if not set.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.server
            .token_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(TOKEN_FILE_NAME))
    }

    /// Get the request timeout, `None` when disabled.
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        if self.server.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.server.request_timeout_secs))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.server.base_url, "http://127.0.0.1:5000");
        assert_eq!(config.server.request_timeout_secs, 30);
        assert!(config.server.token_path.is_none());
        assert!(config.storage.database_path.is_none());
        assert!(config.recorder.name.is_empty());
        assert!(config.recorder.class_name.is_empty());
    }

    #[test]
    fn test_validate_valid_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_unparseable_url() {
        let mut config = Config::default();
        config.server.base_url = "not a url".to_string();

        let result = config.validate();
        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("base_url"));
    }

    #[test]
    fn test_validate_rejects_non_base_url() {
        let mut config = Config::default();
        config.server.base_url = "mailto:admin@example.com".to_string();

        let result = config.validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_database_path_default() {
        let config = Config::default();
        let path = config.database_path();

        assert!(path.to_string_lossy().contains("records.db"));
        assert!(path.to_string_lossy().contains("demerit"));
    }

    #[test]
    fn test_database_path_custom() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/custom/path/db.sqlite"));

        assert_eq!(
            config.database_path(),
            PathBuf::from("/custom/path/db.sqlite")
        );
    }

    #[test]
    fn test_token_path_default() {
        let config = Config::default();
        let path = config.token_path();

        assert!(path.to_string_lossy().ends_with("token"));
    }

    #[test]
    fn test_token_path_custom() {
        let mut config = Config::default();
        config.server.token_path = Some(PathBuf::from("/custom/token"));

        assert_eq!(config.token_path(), PathBuf::from("/custom/token"));
    }

    #[test]
    fn test_request_timeout_none_when_zero() {
        let mut config = Config::default();
        config.server.request_timeout_secs = 0;

        assert!(config.request_timeout().is_none());
    }

    #[test]
    fn test_request_timeout_some_when_set() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("demerit"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_default_data_dir() {
        let path = Config::default_data_dir();
        assert!(path.to_string_lossy().contains("demerit"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        // Loading from a nonexistent path should work (uses defaults)
        let result = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")));
        assert!(result.is_ok());

        let config = result.unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_toml_file() {
        let temp_dir = std::env::temp_dir();
        let config_path = temp_dir.join(format!("demerit_config_{}.toml", std::process::id()));
        std::fs::write(
            &config_path,
            r#"
            [server]
            base_url = "https://conduct.example.edu"
            request_timeout_secs = 5

            [recorder]
            name = "Ms. Tran"
            class_name = "10A"
            "#,
        )
        .unwrap();

        let config = Config::load_from(Some(config_path.clone())).unwrap();
        assert_eq!(config.server.base_url, "https://conduct.example.edu");
        assert_eq!(config.server.request_timeout_secs, 5);
        assert_eq!(config.recorder.name, "Ms. Tran");
        assert_eq!(config.recorder.class_name, "10A");

        let _ = std::fs::remove_file(&config_path);
    }

    #[test]
    fn test_load_rejects_invalid_base_url() {
        let temp_dir = std::env::temp_dir();
        let config_path = temp_dir.join(format!("demerit_badcfg_{}.toml", std::process::id()));
        std::fs::write(
            &config_path,
            r#"
            [server]
            base_url = "::::"
            "#,
        )
        .unwrap();

        let result = Config::load_from(Some(config_path.clone()));
        assert!(result.is_err());

        let _ = std::fs::remove_file(&config_path);
    }

    #[test]
    fn test_server_config_serialize() {
        let server = ServerConfig::default();
        let json = serde_json::to_string(&server).unwrap();
        assert!(json.contains("base_url"));
        assert!(json.contains("request_timeout_secs"));
    }

    #[test]
    fn test_server_config_deserialize() {
        let json = r#"{"base_url": "http://10.0.0.2:8000", "request_timeout_secs": 10}"#;
        let server: ServerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(server.base_url, "http://10.0.0.2:8000");
        assert_eq!(server.request_timeout_secs, 10);
    }

    #[test]
    fn test_config_clone() {
        let config = Config::default();
        let cloned = config.clone();
        assert_eq!(config, cloned);
    }
}
