//! Geocoding client
//!
//! Resolves a free-form postal address to a coordinate and a normalized
//! place id. No match is an expected outcome ([`GeocodeError::NotFound`]):
//! the engine skips the provider until a later pass succeeds.
//!
//! Endpoint: `GET <geocode_url>?address=<address>&key=<api key>`

use super::{throttle, ResultPolicy, Throttle, USER_AGENT};
use crate::models::{Coordinate, GeoMatch};
use crate::settings::SyncSettings;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Geocoding errors
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("No location found for address")]
    NotFound,

    #[error("Geocode request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Geocoder returned {0}: {1}")]
    Api(String, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl GeocodeError {
    /// Outcomes that mean "this address has no usable location right now"
    pub fn is_no_location(&self) -> bool {
        matches!(self, GeocodeError::NotFound | GeocodeError::Timeout)
    }
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoMatch, GeocodeError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Option<Geometry>,
    #[serde(default)]
    place_id: String,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Coordinate,
}

/// HTTP geocoding client
pub struct GeocodeClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    policy: ResultPolicy,
    throttle: Arc<Throttle>,
}

impl GeocodeClient {
    pub fn new(settings: &SyncSettings) -> Result<Self, GeocodeError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: settings.geocode_url.clone(),
            api_key: settings.google_api_key.clone(),
            policy: settings.result_policy,
            throttle: throttle(settings.requests_per_second),
        })
    }

    fn select(&self, response: GeocodeResponse) -> Result<GeoMatch, GeocodeError> {
        match response.status.as_str() {
            "" | "OK" => {}
            "ZERO_RESULTS" => return Err(GeocodeError::NotFound),
            other => {
                return Err(GeocodeError::Api(
                    other.to_string(),
                    response.error_message.unwrap_or_default(),
                ))
            }
        }

        let result = self
            .policy
            .select(response.results)
            .ok_or(GeocodeError::NotFound)?;
        let geometry = result.geometry.ok_or(GeocodeError::NotFound)?;

        Ok(GeoMatch {
            coordinate: geometry.location,
            place_id: result.place_id,
        })
    }
}

#[async_trait]
impl Geocoder for GeocodeClient {
    async fn geocode(&self, address: &str) -> Result<GeoMatch, GeocodeError> {
        self.throttle.until_ready().await;

        debug!(address = %address, "Geocoding address");

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&[("address", address), ("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GeocodeError::Timeout
                } else {
                    GeocodeError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GeocodeError::Api(status.to_string(), error_text));
        }

        let body: GeocodeResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeocodeError::Timeout
            } else {
                GeocodeError::Parse(e.to_string())
            }
        })?;

        self.select(body)
    }
}
