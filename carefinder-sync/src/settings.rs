//! Explicit settings handed to the clients and the engine
//!
//! Built once from the TOML configuration plus resolved secrets. Nothing in
//! the pipeline reads the environment itself.

use crate::clients::ResultPolicy;
use carefinder_common::config::{self, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SyncSettings {
    // Registry
    pub registry_endpoint: String,
    pub registry_app_token: Option<String>,
    pub page_size: u32,

    // Google Maps Platform
    pub google_api_key: String,
    pub geocode_url: String,
    pub places_url: String,
    pub static_map_url: String,
    pub map_id: Option<String>,
    /// Which result wins when geocode/place services return several
    pub result_policy: ResultPolicy,

    // Image cache
    pub cache_dir: PathBuf,
    pub staleness_window: chrono::Duration,

    // Pipeline
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub requests_per_second: u32,
    pub default_state: String,
}

impl SyncSettings {
    /// Settings from a loaded config file and already-resolved secrets
    pub fn from_config(
        toml: &TomlConfig,
        google_api_key: String,
        registry_app_token: Option<String>,
    ) -> Self {
        Self {
            registry_endpoint: toml.registry.endpoint.clone(),
            registry_app_token,
            page_size: toml.registry.page_size.max(1),
            google_api_key,
            geocode_url: toml.google.geocode_url.clone(),
            places_url: toml.google.places_url.clone(),
            static_map_url: toml.google.static_map_url.clone(),
            map_id: toml.google.map_id.clone(),
            result_policy: ResultPolicy::First,
            cache_dir: config::cache_dir(&toml.cache),
            staleness_window: chrono::Duration::days(i64::from(toml.cache.staleness_days)),
            concurrency: toml.pipeline.concurrency.max(1),
            request_timeout: Duration::from_secs(toml.pipeline.request_timeout_secs.max(1)),
            requests_per_second: toml.pipeline.requests_per_second.max(1),
            default_state: toml.pipeline.default_state.clone(),
        }
    }

    /// Compiled defaults with the given API key
    pub fn new(google_api_key: impl Into<String>) -> Self {
        Self::from_config(&TomlConfig::default(), google_api_key.into(), None)
    }
}
