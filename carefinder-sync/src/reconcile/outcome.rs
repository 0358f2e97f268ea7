//! Per-record reconciliation results

use crate::clients::GeocodeError;
use crate::models::EnrichedProvider;
use crate::store::StoreError;
use thiserror::Error;

/// Why a candidate was left out without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The geocoder found no location (or timed out)
    NoLocation,
    /// The registry record has no provider id
    MissingIdentity,
}

#[derive(Debug, Error)]
pub enum RecordFailure {
    #[error("Geocoding failed: {0}")]
    Geocode(GeocodeError),

    #[error("Store write failed: {0}")]
    StoreWrite(StoreError),
}

/// Result of reconciling one registry candidate
#[derive(Debug)]
pub enum RecordOutcome {
    /// Cached entry reused; licensing facts and sync time refreshed
    FastPatched(EnrichedProvider),
    /// Fully enriched and written to the store
    Enriched(EnrichedProvider),
    Skipped {
        provider_id: String,
        reason: SkipReason,
    },
    Failed {
        provider_id: String,
        error: RecordFailure,
    },
}

impl RecordOutcome {
    pub fn provider(&self) -> Option<&EnrichedProvider> {
        match self {
            RecordOutcome::FastPatched(p) | RecordOutcome::Enriched(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_provider(self) -> Option<EnrichedProvider> {
        match self {
            RecordOutcome::FastPatched(p) | RecordOutcome::Enriched(p) => Some(p),
            _ => None,
        }
    }

    pub fn provider_id(&self) -> &str {
        match self {
            RecordOutcome::FastPatched(p) | RecordOutcome::Enriched(p) => p.provider_id(),
            RecordOutcome::Skipped { provider_id, .. }
            | RecordOutcome::Failed { provider_id, .. } => provider_id,
        }
    }
}

/// Everything one reconciliation pass did, in registry order
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub outcomes: Vec<RecordOutcome>,
    /// Set when cancellation stopped candidates from starting
    pub cancelled: bool,
}

impl ReconcileReport {
    /// Providers that ended up in the store during this pass
    pub fn providers(&self) -> impl Iterator<Item = &EnrichedProvider> {
        self.outcomes.iter().filter_map(RecordOutcome::provider)
    }

    pub fn into_providers(self) -> Vec<EnrichedProvider> {
        self.outcomes
            .into_iter()
            .filter_map(RecordOutcome::into_provider)
            .collect()
    }

    pub fn fast_patched(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::FastPatched(_)))
    }

    pub fn enriched(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Enriched(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, RecordOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&RecordOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_providers() {
        let report = ReconcileReport {
            outcomes: vec![
                RecordOutcome::Skipped {
                    provider_id: "1".to_string(),
                    reason: SkipReason::NoLocation,
                },
                RecordOutcome::Failed {
                    provider_id: "2".to_string(),
                    error: RecordFailure::Geocode(GeocodeError::Network("reset".to_string())),
                },
            ],
            cancelled: false,
        };

        assert_eq!(report.skipped(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.enriched(), 0);
        assert_eq!(report.providers().count(), 0);
        assert_eq!(report.outcomes[1].provider_id(), "2");
    }
}
