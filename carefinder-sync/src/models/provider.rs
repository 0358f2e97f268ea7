//! Enriched providers: the unit persisted in the provider store

use super::geo::{Coordinate, GeoMatch, PlaceInfo};
use super::registry::{LicensingFacts, RegistryRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registry record plus geocoded, contact and imagery data
///
/// Serialized flat: registry fields sit beside the enrichment fields, and
/// `synced_at` is stored under the document field name `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedProvider {
    #[serde(flatten)]
    pub record: RegistryRecord,
    pub location: Coordinate,
    #[serde(default)]
    pub place_id: String,
    #[serde(default)]
    pub formatted_address: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub formatted_phone_number: String,
    /// `file://` URI of the rendered map image, empty when none is available
    #[serde(default)]
    pub static_map_uri: String,
    #[serde(rename = "updated_at")]
    pub synced_at: DateTime<Utc>,
}

impl EnrichedProvider {
    /// Merge a registry record with enrichment results
    ///
    /// An empty registry state is replaced by `default_state` so stored
    /// documents always carry one.
    pub fn compose(
        mut record: RegistryRecord,
        geo: &GeoMatch,
        place: PlaceInfo,
        static_map_uri: String,
        synced_at: DateTime<Utc>,
        default_state: &str,
    ) -> Self {
        if record.state.trim().is_empty() {
            record.state = default_state.to_string();
        }

        Self {
            record,
            location: geo.coordinate,
            place_id: geo.place_id.clone(),
            formatted_address: place.formatted_address,
            website: place.website,
            formatted_phone_number: place.phone,
            static_map_uri,
            synced_at,
        }
    }

    pub fn provider_id(&self) -> &str {
        &self.record.provider_id
    }

    /// Strip enrichment fields back to the registry view
    pub fn registry_record(&self) -> RegistryRecord {
        self.record.clone()
    }

    pub fn apply_patch(&mut self, patch: &ProviderPatch) {
        if let Some(licensing) = &patch.licensing {
            self.record.licensing = licensing.clone();
        }
        if let Some(uri) = &patch.static_map_uri {
            self.static_map_uri = uri.clone();
        }
        if let Some(synced_at) = patch.synced_at {
            self.synced_at = synced_at;
        }
    }
}

/// Partial document for keyed store updates
///
/// `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderPatch {
    pub licensing: Option<LicensingFacts>,
    pub static_map_uri: Option<String>,
    pub synced_at: Option<DateTime<Utc>>,
}

impl ProviderPatch {
    /// Fast-path patch: fresh licensing facts and a new sync timestamp
    pub fn licensing(facts: LicensingFacts, synced_at: DateTime<Utc>) -> Self {
        Self {
            licensing: Some(facts),
            synced_at: Some(synced_at),
            ..Default::default()
        }
    }

    /// Read-path repair of the map image reference
    pub fn static_map(uri: String) -> Self {
        Self {
            static_map_uri: Some(uri),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> EnrichedProvider {
        let record = RegistryRecord {
            provider_id: "42".to_string(),
            provider_name: "Acorn House".to_string(),
            street_address: "1 Oak Ave".to_string(),
            city: "Erie".to_string(),
            zip: "80516".to_string(),
            ..Default::default()
        };
        let geo = GeoMatch {
            coordinate: Coordinate::new(40.05, -105.05),
            place_id: "place-42".to_string(),
        };
        let place = PlaceInfo {
            formatted_address: "1 Oak Ave, Erie, CO 80516, USA".to_string(),
            phone: "(303) 555-0100".to_string(),
            website: "https://acorn.example".to_string(),
        };
        EnrichedProvider::compose(record, &geo, place, "file:///maps/42.jpg".to_string(), Utc::now(), "CO")
    }

    #[test]
    fn test_compose_defaults_state() {
        let provider = sample();
        assert_eq!(provider.record.state, "CO");
        assert_eq!(provider.formatted_phone_number, "(303) 555-0100");
        assert_eq!(provider.place_id, "place-42");
    }

    #[test]
    fn test_document_shape_is_flat() {
        let provider = sample();
        let doc = serde_json::to_value(&provider).unwrap();

        assert_eq!(doc["provider_id"], "42");
        assert_eq!(doc["licensed_infant_capacity"], 0);
        assert_eq!(doc["location"]["lat"], 40.05);
        assert!(doc.get("updated_at").is_some());
        assert!(doc.get("synced_at").is_none());

        let back: EnrichedProvider = serde_json::from_value(doc).unwrap();
        assert_eq!(back, provider);
    }

    #[test]
    fn test_registry_record_strips_enrichment() {
        let provider = sample();

        let record = provider.registry_record();

        assert_eq!(record, provider.record);
        let doc = serde_json::to_value(&record).unwrap();
        assert_eq!(doc["provider_id"], "42");
        assert_eq!(doc["state"], "CO");
        for enrichment in ["location", "place_id", "website", "static_map_uri", "updated_at"] {
            assert!(doc.get(enrichment).is_none(), "{} leaked", enrichment);
        }
    }

    #[test]
    fn test_patch_touches_only_named_fields() {
        let mut provider = sample();
        let before = provider.clone();
        let later = before.synced_at + chrono::Duration::seconds(5);
        let facts = LicensingFacts {
            licensed_infant_capacity: 12,
            quality_rating: "2".to_string(),
            ..Default::default()
        };

        provider.apply_patch(&ProviderPatch::licensing(facts.clone(), later));

        assert_eq!(provider.record.licensing, facts);
        assert_eq!(provider.synced_at, later);
        assert_eq!(provider.static_map_uri, before.static_map_uri);
        assert_eq!(provider.website, before.website);
        assert_eq!(provider.location, before.location);
    }
}
