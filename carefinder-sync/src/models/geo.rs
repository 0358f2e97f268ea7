//! Geographic and contact values returned by the enrichment services

use serde::{Deserialize, Serialize};

/// WGS84 coordinate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Best geocoder match for an address
#[derive(Debug, Clone, PartialEq)]
pub struct GeoMatch {
    pub coordinate: Coordinate,
    /// Normalized place identifier (may be empty)
    pub place_id: String,
}

/// Contact metadata from the place-search service
///
/// `Default` is the blank record used when the lookup finds nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaceInfo {
    pub formatted_address: String,
    pub phone: String,
    pub website: String,
}
