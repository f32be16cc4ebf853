//! Configuration management for Wildspot

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::{ClientConfig, jwt::DEFAULT_EXPIRY_LEEWAY_SECS};
use crate::error::{ConfigError, Result};

/// Environment variable overriding the API base URL
pub const API_URL_ENV: &str = "WILDSPOT_API_URL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API base URL, e.g. `https://api.example.org/api`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Timeout for ordinary calls, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Timeout for uploads, in seconds
    #[serde(default = "default_upload_timeout_secs")]
    pub upload_timeout_secs: u64,

    /// Seconds before expiry at which the access token is renewed up front
    #[serde(default = "default_expiry_leeway_secs")]
    pub expiry_leeway_secs: i64,

    /// Token database location (defaults to the platform data directory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_store: Option<PathBuf>,
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_upload_timeout_secs() -> u64 {
    60
}

fn default_expiry_leeway_secs() -> i64 {
    DEFAULT_EXPIRY_LEEWAY_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            timeout_secs: default_timeout_secs(),
            upload_timeout_secs: default_upload_timeout_secs(),
            expiry_leeway_secs: default_expiry_leeway_secs(),
            token_store: None,
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".wildspot").join("config.yaml"))
    }

    /// Resolve an optional override into a concrete path
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;
        config.validate()?;

        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is absent
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load_from(path) {
            Err(crate::error::Error::Config(ConfigError::NotFound(_))) => {
                log::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(path, contents)?;

        // Set file permissions to 600 on Unix systems
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(path, perms)?;
        }

        Ok(())
    }

    /// Apply environment and command-line overrides (CLI flag wins over env)
    pub fn with_api_url_override(mut self, api_url: Option<&str>) -> Self {
        let from_env = std::env::var(API_URL_ENV).ok().filter(|v| !v.is_empty());
        if let Some(url) = api_url.map(str::to_string).or(from_env) {
            self.api_url = Some(url);
        }
        self
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 || self.upload_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be at least 1 second".to_string()).into());
        }
        if self.expiry_leeway_secs < 0 {
            return Err(
                ConfigError::Invalid("expiry_leeway_secs must not be negative".to_string()).into(),
            );
        }
        if let Some(url) = &self.api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "api_url must start with http:// or https://, got `{}`",
                    url
                ))
                .into());
            }
        }
        Ok(())
    }

    /// Build the client settings; requires an API URL
    pub fn client_config(&self) -> Result<ClientConfig> {
        self.validate()?;
        let base_url = self.api_url.clone().ok_or(ConfigError::MissingApiUrl)?;

        Ok(ClientConfig::new(base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_upload_timeout(Duration::from_secs(self.upload_timeout_secs))
            .with_expiry_leeway(self.expiry_leeway_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.api_url.is_none());
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.upload_timeout_secs, 60);
        assert_eq!(config.expiry_leeway_secs, 60);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "api_url: https://api.example.org/api\ntimeout_secs: 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_url.as_deref(), Some("https://api.example.org/api"));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.upload_timeout_secs, 60);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config {
            api_url: Some("http://localhost:8000/api".to_string()),
            token_store: Some(dir.path().join("tokens.db")),
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_url, config.api_url);
        assert_eq!(loaded.token_store, config.token_store);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.yaml");

        assert!(Config::load_from(&path).is_err());
        let config = Config::load_or_default(&path).unwrap();
        assert!(config.api_url.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = Config {
            timeout_secs: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            api_url: Some("ftp://example.org".to_string()),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_config_requires_api_url() {
        let err = Config::default().client_config().unwrap_err();
        assert!(err.to_string().contains("API URL not configured"));

        let client = Config::default()
            .with_api_url_override(Some("https://api.example.org/api"))
            .client_config()
            .unwrap();
        assert_eq!(client.base_url, "https://api.example.org/api");
        assert_eq!(client.timeout, Duration::from_secs(15));
        assert_eq!(client.upload_timeout, Duration::from_secs(60));
    }
}
