//! Place search client
//!
//! Looks up contact metadata (formatted address, phone, website) by provider
//! name, biased to a circle around the geocoded coordinate so that
//! same-named businesses elsewhere do not win.

use super::{throttle, ResultPolicy, Throttle, USER_AGENT};
use crate::models::{Coordinate, PlaceInfo};
use crate::settings::SyncSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Radius of the location bias circle
pub const PLACE_BIAS_RADIUS_METERS: f64 = 500.0;

/// Response fields requested from the place search
const FIELD_MASK: &str = "places.formattedAddress,places.nationalPhoneNumber,places.websiteUri";

#[derive(Debug, Error)]
pub enum PlaceError {
    #[error("No place found")]
    NotFound,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Place search returned {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[async_trait]
pub trait PlaceLookup: Send + Sync {
    async fn lookup(&self, name: &str, coordinate: Coordinate) -> Result<PlaceInfo, PlaceError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchTextRequest<'a> {
    text_query: &'a str,
    location_bias: LocationBias,
}

#[derive(Debug, Serialize)]
struct LocationBias {
    circle: Circle,
}

#[derive(Debug, Serialize)]
struct Circle {
    center: LatLng,
    radius: f64,
}

#[derive(Debug, Serialize)]
struct LatLng {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct SearchTextResponse {
    #[serde(default)]
    places: Vec<Place>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Place {
    formatted_address: Option<String>,
    national_phone_number: Option<String>,
    website_uri: Option<String>,
}

impl From<Place> for PlaceInfo {
    fn from(place: Place) -> Self {
        PlaceInfo {
            formatted_address: place.formatted_address.unwrap_or_default(),
            phone: place.national_phone_number.unwrap_or_default(),
            website: place.website_uri.unwrap_or_default(),
        }
    }
}

fn search_request(name: &str, coordinate: Coordinate) -> SearchTextRequest<'_> {
    SearchTextRequest {
        text_query: name,
        location_bias: LocationBias {
            circle: Circle {
                center: LatLng {
                    latitude: coordinate.lat,
                    longitude: coordinate.lng,
                },
                radius: PLACE_BIAS_RADIUS_METERS,
            },
        },
    }
}

/// HTTP place search client
pub struct PlacesClient {
    http_client: reqwest::Client,
    endpoint: String,
    api_key: String,
    policy: ResultPolicy,
    throttle: Arc<Throttle>,
}

impl PlacesClient {
    pub fn new(settings: &SyncSettings) -> Result<Self, PlaceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|e| PlaceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: settings.places_url.clone(),
            api_key: settings.google_api_key.clone(),
            policy: settings.result_policy,
            throttle: throttle(settings.requests_per_second),
        })
    }
}

#[async_trait]
impl PlaceLookup for PlacesClient {
    async fn lookup(&self, name: &str, coordinate: Coordinate) -> Result<PlaceInfo, PlaceError> {
        self.throttle.until_ready().await;

        debug!(name = %name, lat = coordinate.lat, lng = coordinate.lng, "Searching places");

        let response = self
            .http_client
            .post(&self.endpoint)
            .header("X-Goog-Api-Key", &self.api_key)
            .header("X-Goog-FieldMask", FIELD_MASK)
            .json(&search_request(name, coordinate))
            .send()
            .await
            .map_err(|e| PlaceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlaceError::Api(status.as_u16(), error_text));
        }

        let body: SearchTextResponse = response
            .json()
            .await
            .map_err(|e| PlaceError::Parse(e.to_string()))?;

        self.policy
            .select(body.places)
            .map(PlaceInfo::from)
            .ok_or(PlaceError::NotFound)
    }
}
