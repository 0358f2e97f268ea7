//! Static map image renderer client
//!
//! Downloads a 400x300 (@2x) roadmap image centred on a coordinate with a
//! single marker. Caching lives in [`crate::cache::StaticMapCache`].

use super::{throttle, Throttle, USER_AGENT};
use crate::models::Coordinate;
use crate::settings::SyncSettings;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const ZOOM: &str = "15";
const SIZE: &str = "400x300";
const SCALE: &str = "2";
const MAP_TYPE: &str = "roadmap";
const MARKER_COLOR: &str = "0x8B8B8B";

#[derive(Debug, Error)]
pub enum MapFetchError {
    #[error("Map request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Map renderer returned {0}: {1}")]
    Api(u16, String),

    #[error("Map renderer returned an empty image")]
    EmptyImage,

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Source of rendered map images
#[async_trait]
pub trait MapImageSource: Send + Sync {
    async fn render(&self, coordinate: Coordinate) -> Result<Vec<u8>, MapFetchError>;
}

/// HTTP static map client
pub struct StaticMapClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    map_id: Option<String>,
    throttle: Arc<Throttle>,
}

impl StaticMapClient {
    pub fn new(settings: &SyncSettings) -> Result<Self, MapFetchError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| MapFetchError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: settings.static_map_url.clone(),
            api_key: settings.google_api_key.clone(),
            map_id: settings.map_id.clone(),
            throttle: throttle(settings.requests_per_second),
        })
    }

    fn query(&self, coordinate: Coordinate) -> Vec<(&'static str, String)> {
        let center = format!("{},{}", coordinate.lat, coordinate.lng);
        let mut params = vec![
            ("center", center.clone()),
            ("zoom", ZOOM.to_string()),
            ("size", SIZE.to_string()),
            ("scale", SCALE.to_string()),
            ("maptype", MAP_TYPE.to_string()),
            ("markers", format!("color:{}|{}", MARKER_COLOR, center)),
            ("key", self.api_key.clone()),
        ];
        if let Some(map_id) = &self.map_id {
            params.push(("map_id", map_id.clone()));
        }
        params
    }
}

fn transport_error(e: reqwest::Error) -> MapFetchError {
    if e.is_timeout() {
        MapFetchError::Timeout
    } else {
        MapFetchError::Network(e.to_string())
    }
}

#[async_trait]
impl MapImageSource for StaticMapClient {
    async fn render(&self, coordinate: Coordinate) -> Result<Vec<u8>, MapFetchError> {
        self.throttle.until_ready().await;

        debug!(lat = coordinate.lat, lng = coordinate.lng, "Downloading static map");

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&self.query(coordinate))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(MapFetchError::Api(status.as_u16(), error_text));
        }

        let bytes = response.bytes().await.map_err(transport_error)?;
        if bytes.is_empty() {
            return Err(MapFetchError::EmptyImage);
        }

        Ok(bytes.to_vec())
    }
}
