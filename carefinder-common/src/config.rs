//! Configuration loading and secret resolution
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments (handled by the binary)
//! 2. Environment variables (`CAREFINDER_*`)
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing TOML file is not an error: defaults are used and a warning is logged.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CAREFINDER_CONFIG";

/// Environment variable carrying the registry application token
pub const REGISTRY_TOKEN_ENV_VAR: &str = "CAREFINDER_REGISTRY_APP_TOKEN";

/// Environment variable carrying the Google Maps Platform API key
pub const GOOGLE_API_KEY_ENV_VAR: &str = "CAREFINDER_GOOGLE_API_KEY";

/// Application directory name under the platform config/cache/data dirs
const APP_DIR: &str = "carefinder";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub registry: RegistryConfig,
    pub google: GoogleConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// Licensing registry endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    /// Query endpoint (Socrata view query URL)
    pub endpoint: String,
    /// Application token sent as `X-App-Token`
    pub app_token: Option<String>,
    /// Records requested per page; should exceed the provider count of any zip
    pub page_size: u32,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://data.colorado.gov/api/v3/views/a9rr-k8mu/query.json".to_string(),
            app_token: None,
            page_size: 1000,
        }
    }
}

/// Google Maps Platform endpoints and key
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GoogleConfig {
    pub api_key: Option<String>,
    pub geocode_url: String,
    pub places_url: String,
    pub static_map_url: String,
    /// Optional cloud map style id for rendered images
    pub map_id: Option<String>,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            geocode_url: "https://maps.googleapis.com/maps/api/geocode/json".to_string(),
            places_url: "https://places.googleapis.com/v1/places:searchText".to_string(),
            static_map_url: "https://maps.googleapis.com/maps/api/staticmap".to_string(),
            map_id: None,
        }
    }
}

/// Local static-map image cache settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CacheConfig {
    /// Image directory; platform cache dir when unset
    pub dir: Option<PathBuf>,
    /// Age in days after which a cached image is re-fetched
    pub staleness_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            staleness_days: 30,
        }
    }
}

/// Pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Records reconciled concurrently (1 = sequential)
    pub concurrency: usize,
    /// Per-request timeout for every external call
    pub request_timeout_secs: u64,
    /// Upper bound on requests per second, per external service
    pub requests_per_second: u32,
    /// State used when the registry omits it
    pub default_state: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            request_timeout_secs: 15,
            requests_per_second: 10,
            default_state: "CO".to_string(),
        }
    }
}

/// Durable provider store settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database file; platform data dir when unset
    pub database_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or an EnvFilter string)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Resolve which config file to read
///
/// Priority: explicit path → `CAREFINDER_CONFIG` → `<config dir>/carefinder/config.toml`.
/// Returns `None` when no candidate exists.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join(APP_DIR).join("config.toml"))
        .filter(|p| p.exists())
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// No candidate file; compiled defaults
    Defaults,
    /// Named file does not exist; compiled defaults
    Missing(PathBuf),
}

impl ConfigSource {
    /// Report the source through `tracing`
    ///
    /// Separate from loading so the binary can call it once a subscriber is
    /// installed.
    pub fn log(&self) {
        match self {
            ConfigSource::File(path) => info!(path = %path.display(), "Loaded config file"),
            ConfigSource::Defaults => warn!("No config file found, using compiled defaults"),
            ConfigSource::Missing(path) => {
                warn!(path = %path.display(), "Config file not found, using compiled defaults")
            }
        }
    }
}

/// Read TOML configuration without logging
///
/// A missing file yields defaults; only unreadable or malformed files fail.
pub fn read_toml_config(path: Option<&Path>) -> Result<(TomlConfig, ConfigSource)> {
    let Some(path) = path else {
        return Ok((TomlConfig::default(), ConfigSource::Defaults));
    };

    if !path.exists() {
        return Ok((TomlConfig::default(), ConfigSource::Missing(path.to_path_buf())));
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    Ok((config, ConfigSource::File(path.to_path_buf())))
}

/// Load TOML configuration, falling back to defaults when the file is missing
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let (config, source) = read_toml_config(path)?;
    source.log();
    Ok(config)
}

/// Validate a secret value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve a secret from environment then TOML
///
/// Warns when both sources carry a valid value; the environment wins.
pub fn resolve_secret(env_var: &str, toml_value: Option<&str>, label: &str) -> Option<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k)).map(str::to_string);

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} found in both environment ({}) and TOML config. Using environment.",
            label, env_var
        );
    }

    match (env_key, toml_key) {
        (Some(key), _) => {
            info!("{} loaded from environment variable", label);
            Some(key)
        }
        (None, Some(key)) => {
            info!("{} loaded from TOML config", label);
            Some(key)
        }
        (None, None) => None,
    }
}

/// Resolve a required secret, failing with setup instructions when absent
pub fn require_secret(env_var: &str, toml_value: Option<&str>, label: &str) -> Result<String> {
    resolve_secret(env_var, toml_value, label).ok_or_else(|| {
        Error::Config(format!(
            "{} not configured. Please configure using one of:\n\
             1. Environment: {}=your-key-here\n\
             2. TOML config: ~/.config/{}/config.toml",
            label, env_var, APP_DIR
        ))
    })
}

/// Image cache directory: configured value or `<cache dir>/carefinder/maps`
pub fn cache_dir(config: &CacheConfig) -> PathBuf {
    config.dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR).join("maps"))
            .unwrap_or_else(|| PathBuf::from("./carefinder_cache/maps"))
    })
}

/// Provider database path: configured value or `<data dir>/carefinder/providers.db`
pub fn database_path(config: &StoreConfig) -> PathBuf {
    config.database_path.clone().unwrap_or_else(|| {
        dirs::data_local_dir()
            .map(|d| d.join(APP_DIR).join("providers.db"))
            .unwrap_or_else(|| PathBuf::from("./carefinder_data/providers.db"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   \t"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [pipeline]
            concurrency = 2
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.concurrency, 2);
        assert_eq!(config.pipeline.default_state, "CO");
        assert_eq!(config.cache.staleness_days, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_explicit_cache_dir_is_used() {
        let config = CacheConfig {
            dir: Some(PathBuf::from("/tmp/maps")),
            staleness_days: 30,
        };
        assert_eq!(cache_dir(&config), PathBuf::from("/tmp/maps"));
    }
}
