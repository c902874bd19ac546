//! Configuration management.
//!
//! Settings are resolved in layers, lowest to highest precedence: built-in
//! defaults, an optional config file, `IMAP_*` environment variables, and an
//! explicit in-process [`ConfigOverrides`] mapping (filled from CLI flags).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::client::USER_AGENT;

/// Default service endpoint.
pub const DEFAULT_DATA_ACCESS_URL: &str = "https://api.dev.imap-mission.com";

/// Default data directory, relative to the working directory.
const DEFAULT_DATA_SUBDIR: &str = "data";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 30;

pub const ENV_DATA_DIR: &str = "IMAP_DATA_DIR";
pub const ENV_DATA_ACCESS_URL: &str = "IMAP_DATA_ACCESS_URL";
pub const ENV_API_KEY: &str = "IMAP_API_KEY";
pub const ENV_REQUEST_TIMEOUT: &str = "IMAP_REQUEST_TIMEOUT";
pub const ENV_USER_AGENT: &str = "IMAP_USER_AGENT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {format} config {}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("data directory does not exist: {}", .0.display())]
    DataDirMissing(PathBuf),

    #[error("invalid request timeout '{0}', expected a number of seconds")]
    InvalidTimeout(String),

    #[error("unknown configuration key '{0}' (expected DATA_DIR, DATA_ACCESS_URL or API_KEY)")]
    UnknownKey(String),
}

/// Application settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root of the local mirror of the archive.
    pub data_dir: PathBuf,
    /// Base URL of the data access service.
    pub data_access_url: String,
    /// Key sent with uploads.
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    pub request_timeout: u64,
    /// User agent for HTTP requests.
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::with_data_dir(cwd.join(DEFAULT_DATA_SUBDIR))
    }
}

impl Settings {
    /// Default settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            data_access_url: DEFAULT_DATA_ACCESS_URL.to_string(),
            api_key: None,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: USER_AGENT.to_string(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    /// Resolve every layer on top of the defaults.
    ///
    /// `env` looks up a variable by name, so callers can substitute the process
    /// environment. `cwd` anchors relative paths that do not come from a file.
    pub fn resolve<F>(
        config: &Config,
        env: F,
        overrides: &ConfigOverrides,
        cwd: &Path,
    ) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::with_data_dir(cwd.join(DEFAULT_DATA_SUBDIR));

        let base_dir = config.base_dir().unwrap_or_else(|| cwd.to_path_buf());
        config.apply_to_settings(&mut settings, &base_dir);

        apply_env_overrides(&mut settings, env, cwd)?;
        overrides.apply_to_settings(&mut settings, cwd)?;

        tracing::debug!(
            "Resolved settings: data_dir={}, url={}, api_key={}",
            settings.data_dir.display(),
            settings.data_access_url,
            if settings.api_key.is_some() { "set" } else { "unset" }
        );
        Ok(settings)
    }
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, prefer::FromValue)]
pub struct Config {
    /// Data directory path, relative to the config file when not absolute.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,
    /// Data access service URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_access_url: Option<String>,
    /// API key for uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
    /// User agent string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    #[prefer(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Discover a config file named `imap-data-access` in the standard locations.
    pub async fn load() -> Self {
        match prefer::load("imap-data-access").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => config,
                    Err(e) => {
                        tracing::warn!("Ignoring config file: {}", e);
                        Self::default()
                    }
                },
                None => Self::default(),
            },
            Err(_) => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");
        let parse_error = |format: &'static str, message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            format,
            message,
        };

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents).map_err(|e| parse_error("TOML", e.to_string()))?,
            "yaml" | "yml" => {
                serde_yaml::from_str(&contents).map_err(|e| parse_error("YAML", e.to_string()))?
            }
            _ => serde_json::from_str(&contents).map_err(|e| parse_error("JSON", e.to_string()))?,
        };

        config.source_path = Some(path.to_path_buf());
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Directory of the config file, used to resolve relative paths.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn apply_to_settings(&self, settings: &mut Settings, base_dir: &Path) {
        if let Some(ref data_dir) = self.data_dir {
            settings.data_dir = resolve_path(data_dir, base_dir);
        }
        if let Some(ref url) = self.data_access_url {
            settings.data_access_url = url.clone();
        }
        if let Some(ref key) = self.api_key {
            settings.api_key = Some(key.clone());
        }
        if let Some(timeout) = self.request_timeout {
            settings.request_timeout = timeout;
        }
        if let Some(ref user_agent) = self.user_agent {
            settings.user_agent = user_agent.clone();
        }
    }
}

/// Explicit in-process configuration, the highest precedence layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub data_dir: Option<PathBuf>,
    pub data_access_url: Option<String>,
    pub api_key: Option<String>,
}

impl ConfigOverrides {
    /// Build overrides from a `KEY -> value` mapping using the
    /// `DATA_DIR`, `DATA_ACCESS_URL` and `API_KEY` keys.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut overrides = Self::default();
        for (key, value) in map {
            match key.as_str() {
                "DATA_DIR" => overrides.data_dir = Some(PathBuf::from(value)),
                "DATA_ACCESS_URL" => overrides.data_access_url = Some(value.clone()),
                "API_KEY" => overrides.api_key = Some(value.clone()),
                other => return Err(ConfigError::UnknownKey(other.to_string())),
            }
        }
        Ok(overrides)
    }

    /// An explicitly chosen data directory must already exist.
    pub fn apply_to_settings(&self, settings: &mut Settings, cwd: &Path) -> Result<(), ConfigError> {
        if let Some(ref data_dir) = self.data_dir {
            let path = resolve_path(&data_dir.to_string_lossy(), cwd);
            if !path.is_dir() {
                return Err(ConfigError::DataDirMissing(path));
            }
            settings.data_dir = path;
        }
        if let Some(ref url) = self.data_access_url {
            settings.data_access_url = url.clone();
        }
        if let Some(ref key) = self.api_key {
            settings.api_key = Some(key.clone());
        }
        Ok(())
    }
}

/// Options for loading settings.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Explicit config file path (overrides auto-discovery).
    pub config_path: Option<PathBuf>,
    /// Highest precedence values, usually from CLI flags.
    pub overrides: ConfigOverrides,
}

/// Expand `~` and resolve relative paths against `base_dir`.
fn resolve_path(path_str: &str, base_dir: &Path) -> PathBuf {
    let expanded = shellexpand::tilde(path_str);
    let path = Path::new(expanded.as_ref());

    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn apply_env_overrides<F>(settings: &mut Settings, env: F, cwd: &Path) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| env(name).filter(|s| !s.is_empty());

    if let Some(data_dir) = var(ENV_DATA_DIR) {
        tracing::debug!("Using {} from environment: {}", ENV_DATA_DIR, data_dir);
        settings.data_dir = resolve_path(&data_dir, cwd);
    }
    if let Some(url) = var(ENV_DATA_ACCESS_URL) {
        tracing::debug!("Using {} from environment: {}", ENV_DATA_ACCESS_URL, url);
        settings.data_access_url = url;
    }
    if let Some(key) = var(ENV_API_KEY) {
        tracing::debug!("Using {} from environment", ENV_API_KEY);
        settings.api_key = Some(key);
    }
    if let Some(timeout) = var(ENV_REQUEST_TIMEOUT) {
        settings.request_timeout = timeout
            .parse()
            .map_err(|_| ConfigError::InvalidTimeout(timeout.clone()))?;
    }
    if let Some(user_agent) = var(ENV_USER_AGENT) {
        settings.user_agent = user_agent;
    }
    Ok(())
}

/// Load the config file (explicit or discovered) and resolve settings
/// against the process environment.
pub async fn load_settings_with_options(
    options: LoadOptions,
) -> Result<(Settings, Config), ConfigError> {
    let config = match options.config_path {
        Some(ref path) => Config::load_from_path(path).await?,
        None => Config::load().await,
    };

    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings = Settings::resolve(
        &config,
        |name| std::env::var(name).ok(),
        &options.overrides,
        &cwd,
    )?;

    Ok((settings, config))
}
