//! Licensing registry records
//!
//! Field names match the registry's wire names so records deserialize
//! directly from the query endpoint and serialize flat into stored documents.

use super::lenient;
use super::quality::QualityTier;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Snapshot of one provider as published by the licensing registry
///
/// The registry is the source of truth for licensing facts and is
/// re-queried on every pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryRecord {
    /// Registry identity; also the store key
    #[serde(default, deserialize_with = "lenient::string")]
    pub provider_id: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub provider_name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub provider_service_type: String,

    // Postal address
    #[serde(default, deserialize_with = "lenient::string")]
    pub street_address: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub city: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub state: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub zip: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub county: String,

    // Administrative
    #[serde(default, deserialize_with = "lenient::string")]
    pub ecc: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub ccrr: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub school_district_operated_program: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub school_district: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub governing_body: String,

    #[serde(flatten)]
    pub licensing: LicensingFacts,
}

/// Licensing facts patched onto cached entries on every pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicensingFacts {
    #[serde(default, deserialize_with = "lenient::count")]
    pub total_licensed_capacity: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub licensed_home_capacity: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub licensed_infant_capacity: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub licensed_toddler_capacity: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub licensed_preschool_capacity: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub licensed_school_age_capacity: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub licensed_preschool_and_school_age_capacity: u32,
    #[serde(default, deserialize_with = "lenient::count")]
    pub licensed_resident_camp_capacity: u32,

    /// Raw rating as published ("1".."5", or empty when unrated)
    #[serde(default, deserialize_with = "lenient::string")]
    pub quality_rating: String,
    #[serde(default, deserialize_with = "lenient::date")]
    pub award_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub expiration_date: Option<NaiveDate>,

    // Program authorization flags
    #[serde(default, deserialize_with = "lenient::flag")]
    pub cccap_authorization_status: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub cccap_fa_status_d1: bool,
}

impl RegistryRecord {
    /// Free-form address handed to the geocoder
    ///
    /// Format: `{street}, {city}, {state} {zip}`. The registry occasionally
    /// omits the state; `default_state` fills the gap.
    pub fn full_address(&self, default_state: &str) -> String {
        let state = if self.state.trim().is_empty() {
            default_state
        } else {
            self.state.as_str()
        };
        format!(
            "{}, {}, {} {}",
            self.street_address, self.city, state, self.zip
        )
    }

    pub fn quality_tier(&self) -> QualityTier {
        QualityTier::from_rating(&self.licensing.quality_rating)
    }
}
