use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default Devbox package search endpoint
pub const DEFAULT_REGISTRY_URL: &str = "https://search.devbox.sh/v2/";

/// Environment variable overriding the registry URL
pub const REGISTRY_URL_ENV: &str = "DEVBOX_REGISTRY_URL";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid registry URL {url:?}: {source}")]
    InvalidRegistryUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Registry URL {0:?} must use http or https")]
    UnsupportedScheme(String),

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Settings for talking to a package registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Base URL, always ending in `/`
    pub registry_url: Url,
    pub timeout: Duration,
}

impl RegistryConfig {
    pub fn new(registry_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            registry_url: parse_registry_url(registry_url)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Uses $DEVBOX_REGISTRY_URL if set, otherwise the public registry.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(&registry_url_with_env(std::env::var(REGISTRY_URL_ENV).ok()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn registry_url_with_env(env_value: Option<String>) -> String {
    env_value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string())
}

fn parse_registry_url(raw: &str) -> Result<Url, ConfigError> {
    let raw = raw.trim();
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };

    let url = Url::parse(&with_slash).map_err(|source| ConfigError::InvalidRegistryUrl {
        url: raw.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigError::UnsupportedScheme(raw.to_string())),
    }
}

/// Returns the path to the data directory for devbox-releases.
/// Uses $XDG_DATA_HOME/devbox-releases if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/devbox-releases,
/// or ./devbox-releases if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join("devbox-releases.log")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join("devbox-releases")
}
