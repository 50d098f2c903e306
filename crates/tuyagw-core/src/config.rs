//! Gateway configuration.
//!
//! Settings come from `~/.config/tuya-gateway/config.json` when present and
//! are then overridden by `TUYA_*` environment variables. The client secret is
//! never written to the config file: it is read from `TUYA_CLIENT_SECRET` or
//! from the OS keychain.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::{Credentials, SecretStore, TokenFile, DEFAULT_AUTH_TIMEOUT};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "tuya-gateway";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Token file name
const AUTH_FILE: &str = "auth.json";

pub const ENV_REGION: &str = "TUYA_REGION";
pub const ENV_CLIENT_ID: &str = "TUYA_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "TUYA_CLIENT_SECRET";
pub const ENV_AUTH_FILE: &str = "TUYA_AUTH_FILE";
pub const ENV_AUTH_TIMEOUT_SECS: &str = "TUYA_AUTH_TIMEOUT_SECS";
pub const ENV_API_BASE_URL: &str = "TUYA_API_BASE_URL";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error("No client secret: set TUYA_CLIENT_SECRET or store one in the keychain ({0})")]
    NoSecret(#[source] keyring::Error),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Upstream region code: us, eu, cn, in.
    pub region: Option<String>,
    pub client_id: Option<String>,
    pub auth_file: Option<PathBuf>,
    pub auth_timeout_secs: Option<u64>,
    /// Overrides the region-derived OpenAPI base URL.
    pub api_base_url: Option<String>,
}

impl Config {
    /// Load the config file, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                debug!(path = %path.display(), "Loading config file");
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents)?
            }
            _ => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Overlay values found through `lookup` (normally the process environment).
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(region) = get(ENV_REGION) {
            self.region = Some(region);
        }
        if let Some(client_id) = get(ENV_CLIENT_ID) {
            self.client_id = Some(client_id);
        }
        if let Some(path) = get(ENV_AUTH_FILE) {
            self.auth_file = Some(PathBuf::from(path));
        }
        if let Some(secs) = get(ENV_AUTH_TIMEOUT_SECS) {
            let parsed = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                name: ENV_AUTH_TIMEOUT_SECS,
                value: secs.clone(),
            })?;
            self.auth_timeout_secs = Some(parsed);
        }
        if let Some(url) = get(ENV_API_BASE_URL) {
            self.api_base_url = Some(url);
        }
        Ok(())
    }

    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn region(&self) -> Result<&str, ConfigError> {
        let region = self.region.as_deref().ok_or(ConfigError::Missing(ENV_REGION))?;
        if region.is_empty() || !region.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::Invalid {
                name: ENV_REGION,
                value: region.to_string(),
            });
        }
        Ok(region)
    }

    pub fn client_id(&self) -> Result<&str, ConfigError> {
        self.client_id.as_deref().ok_or(ConfigError::Missing(ENV_CLIENT_ID))
    }

    /// Resolve the full credentials; `secret` is the value of
    /// `TUYA_CLIENT_SECRET` if set, otherwise the keychain is consulted.
    pub fn credentials(&self, secret: Option<String>) -> Result<Credentials, ConfigError> {
        let region = self.region()?;
        let client_id = self.client_id()?;
        let secret = match secret.filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => SecretStore::get(client_id).map_err(ConfigError::NoSecret)?,
        };
        Ok(Credentials::new(region, client_id, secret))
    }

    /// Credentials from the environment or keychain.
    pub fn credentials_from_env(&self) -> Result<Credentials, ConfigError> {
        self.credentials(std::env::var(ENV_CLIENT_SECRET).ok())
    }

    pub fn token_file(&self) -> TokenFile {
        let path = self.auth_file.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(APP_NAME)
                .join(AUTH_FILE)
        });
        TokenFile::new(path)
    }

    pub fn auth_timeout(&self) -> Duration {
        self.auth_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_AUTH_TIMEOUT)
    }

    pub fn api_base_url(&self, credentials: &Credentials) -> String {
        self.api_base_url
            .clone()
            .unwrap_or_else(|| credentials.api_base_url())
    }
}
