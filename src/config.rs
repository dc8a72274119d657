use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};

/// Prefix for environment variables that override file configuration.
pub const ENV_PREFIX: &str = "CURRENCY_RATES_";

fn default_api_key_header() -> String {
    "X-API-KEY".to_string()
}

fn default_api_key() -> SecretString {
    SecretString::from(String::new())
}

fn deserialize_secret<'de, D>(deserializer: D) -> std::result::Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

/// Upstream rate provider endpoints and credentials.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the provider, e.g. `https://rates.example.com`.
    pub base_url: String,

    /// Path of the fiat endpoint, appended to `base_url`.
    pub fiat_path: String,

    /// Path of the crypto endpoint, appended to `base_url`.
    pub crypto_path: String,

    /// Static API key sent with every request.
    #[serde(default = "default_api_key", deserialize_with = "deserialize_secret")]
    pub api_key: SecretString,

    /// Header name carrying the API key.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            fiat_path: String::new(),
            crypto_path: String::new(),
            api_key: default_api_key(),
            api_key_header: default_api_key_header(),
        }
    }
}

/// Timeout and retry settings for upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-attempt timeout.
    pub timeout_seconds: u64,

    /// Number of retries after the first failed attempt.
    pub retry_max_attempts: u32,

    /// Base delay of the exponential backoff between retries.
    pub retry_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 3,
            retry_max_attempts: 1,
            retry_backoff_ms: 200,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_backoff(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.retry_backoff_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Append-only JSON-lines files under the data directory.
    #[default]
    Jsonl,
    /// In-process rows; nothing survives a restart.
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the server listens on.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

/// A configuration value that failed validation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must not be blank")]
    Blank(&'static str),

    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }

    /// Apply `CURRENCY_RATES_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_overrides(std::env::vars())
    }

    /// Apply overrides from `(name, value)` pairs. Unknown names are ignored.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (name, value) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match key {
                "BASE_URL" => self.upstream.base_url = value,
                "FIAT_PATH" => self.upstream.fiat_path = value,
                "CRYPTO_PATH" => self.upstream.crypto_path = value,
                "API_KEY" => self.upstream.api_key = SecretString::from(value),
                "API_KEY_HEADER" => self.upstream.api_key_header = value,
                "TIMEOUT_SECONDS" => {
                    self.http.timeout_seconds = value
                        .parse()
                        .with_context(|| format!("Invalid {name}: {value}"))?;
                }
                "RETRY_MAX_ATTEMPTS" => {
                    self.http.retry_max_attempts = value
                        .parse()
                        .with_context(|| format!("Invalid {name}: {value}"))?;
                }
                "RETRY_BACKOFF_MS" => {
                    self.http.retry_backoff_ms = value
                        .parse()
                        .with_context(|| format!("Invalid {name}: {value}"))?;
                }
                "DATA_DIR" => self.data_dir = Some(PathBuf::from(value)),
                "BIND" => self.server.bind = value,
                _ => {}
            }
        }
        Ok(())
    }

    /// Check the upstream and HTTP settings required to reach the provider.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        validate_settings(&self.upstream, &self.http)
    }
}

fn validate_settings(
    upstream: &UpstreamConfig,
    http: &HttpConfig,
) -> std::result::Result<(), ConfigError> {
    let required = [
        ("upstream.base_url", upstream.base_url.as_str()),
        ("upstream.fiat_path", upstream.fiat_path.as_str()),
        ("upstream.crypto_path", upstream.crypto_path.as_str()),
        ("upstream.api_key", upstream.api_key.expose_secret()),
        ("upstream.api_key_header", upstream.api_key_header.as_str()),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::Blank(field));
        }
    }

    if http.timeout_seconds == 0 {
        return Err(ConfigError::NotPositive("http.timeout_seconds"));
    }
    if http.retry_max_attempts == 0 {
        return Err(ConfigError::NotPositive("http.retry_max_attempts"));
    }
    if http.retry_backoff_ms == 0 {
        return Err(ConfigError::NotPositive("http.retry_backoff_ms"));
    }

    Ok(())
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    pub upstream: UpstreamConfig,

    pub http: HttpConfig,

    pub storage: StorageConfig,

    pub server: ServerConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./currency-rates.toml` if it exists in current directory
/// 2. `~/.config/currency-rates/currency-rates.toml` (XDG config directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("currency-rates.toml");
    if local_config.exists() {
        return local_config;
    }

    if let Some(config_dir) = dirs::config_dir() {
        return config_dir
            .join("currency-rates")
            .join("currency-rates.toml");
    }

    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    /// Environment overrides are applied before resolution.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let mut config = Config::load(&config_path)?;
        config.apply_env()?;
        Ok(Self::from_config(config, config_dir))
    }

    /// Load config, falling back to defaults if the file doesn't exist.
    ///
    /// If the config file doesn't exist, uses the config file's intended
    /// parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            return Self::load(config_path);
        }

        let config_path = if config_path.is_relative() {
            std::env::current_dir()
                .context("Failed to get current directory")?
                .join(config_path)
        } else {
            config_path.to_path_buf()
        };

        let config_dir = config_path
            .parent()
            .context("Config path has no parent directory")?;

        let mut config = Config::default();
        config.apply_env()?;
        Ok(Self::from_config(config, config_dir))
    }

    fn from_config(config: Config, config_dir: &Path) -> Self {
        Self {
            data_dir: config.resolve_data_dir(config_dir),
            upstream: config.upstream,
            http: config.http,
            storage: config.storage,
            server: config.server,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        validate_settings(&self.upstream, &self.http)
    }
}
