//! Reconciliation engine
//!
//! Merges registry candidates with the provider store. For each candidate:
//!
//! 1. Look up the stored document (skipped with `force_refresh`).
//! 2. Same street address as stored: patch licensing facts and the sync time,
//!    no enrichment calls.
//! 3. Otherwise geocode, look up contact details, fetch the static map, and
//!    replace the stored document.
//!
//! Failures are contained per record and reported as [`RecordOutcome`]s;
//! only filter and registry errors abort the pass.

use super::outcome::{ReconcileReport, RecordFailure, RecordOutcome, SkipReason};
use crate::cache::{FsImageStore, StaticMapCache};
use crate::clients::{
    GeocodeClient, Geocoder, PlaceError, PlaceLookup, PlacesClient, RegistryClient,
    RegistrySource, StaticMapClient,
};
use crate::error::{SyncError, SyncResult};
use crate::favorites::{FavoritesSource, NoFavorites};
use crate::models::{EnrichedProvider, FilterSet, PlaceInfo, ProviderPatch, RegistryRecord};
use crate::query;
use crate::settings::SyncSettings;
use crate::store::{CachedStore, StoreError};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    /// Ignore stored documents and re-enrich every candidate
    pub force_refresh: bool,
}

pub struct ReconciliationEngine {
    settings: Arc<SyncSettings>,
    registry: Arc<dyn RegistrySource>,
    geocoder: Arc<dyn Geocoder>,
    places: Arc<dyn PlaceLookup>,
    maps: Arc<StaticMapCache>,
    store: Arc<dyn CachedStore>,
    favorites: Arc<dyn FavoritesSource>,
}

impl ReconciliationEngine {
    pub fn new(
        settings: Arc<SyncSettings>,
        registry: Arc<dyn RegistrySource>,
        geocoder: Arc<dyn Geocoder>,
        places: Arc<dyn PlaceLookup>,
        maps: Arc<StaticMapCache>,
        store: Arc<dyn CachedStore>,
    ) -> Self {
        Self {
            settings,
            registry,
            geocoder,
            places,
            maps,
            store,
            favorites: Arc::new(NoFavorites),
        }
    }

    /// Engine wired to the HTTP clients and the local image directory
    pub fn from_settings(settings: SyncSettings, store: Arc<dyn CachedStore>) -> SyncResult<Self> {
        let registry = RegistryClient::new(&settings).map_err(client_error)?;
        let geocoder = GeocodeClient::new(&settings).map_err(client_error)?;
        let places = PlacesClient::new(&settings).map_err(client_error)?;
        let renderer = StaticMapClient::new(&settings).map_err(client_error)?;

        let maps = StaticMapCache::new(
            Arc::new(renderer),
            Arc::new(FsImageStore),
            settings.cache_dir.clone(),
            settings.staleness_window,
        );

        Ok(Self::new(
            Arc::new(settings),
            Arc::new(registry),
            Arc::new(geocoder),
            Arc::new(places),
            Arc::new(maps),
            store,
        ))
    }

    pub fn with_favorites(mut self, favorites: Arc<dyn FavoritesSource>) -> Self {
        self.favorites = favorites;
        self
    }

    /// Reconcile and return the stored providers in registry order
    pub async fn reconcile(
        &self,
        zip: &str,
        filters: &FilterSet,
        options: ReconcileOptions,
        cancel_token: &CancellationToken,
    ) -> SyncResult<Vec<EnrichedProvider>> {
        Ok(self
            .reconcile_with_report(zip, filters, options, cancel_token)
            .await?
            .into_providers())
    }

    pub async fn reconcile_with_report(
        &self,
        zip: &str,
        filters: &FilterSet,
        options: ReconcileOptions,
        cancel_token: &CancellationToken,
    ) -> SyncResult<ReconcileReport> {
        let run_id = Uuid::new_v4();

        if cancel_token.is_cancelled() {
            info!(run_id = %run_id, zip = %zip, "Reconciliation cancelled before start");
            return Ok(ReconcileReport {
                outcomes: Vec::new(),
                cancelled: true,
            });
        }

        let candidates = self.candidates(run_id, zip, filters).await?;
        let total = candidates.len();

        info!(
            run_id = %run_id,
            zip = %zip,
            candidates = total,
            force_refresh = options.force_refresh,
            "Reconciliation started"
        );

        let mut indexed: Vec<(usize, RecordOutcome)> = stream::iter(candidates.into_iter().enumerate())
            .map(|(index, record)| async move {
                // Check cancellation before processing
                if cancel_token.is_cancelled() {
                    return None;
                }
                Some((index, self.reconcile_record(run_id, record, options).await))
            })
            .buffer_unordered(self.settings.concurrency)
            .filter_map(|outcome| async move { outcome })
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);

        let report = ReconcileReport {
            cancelled: indexed.len() < total,
            outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
        };

        info!(
            run_id = %run_id,
            zip = %zip,
            fast_patched = report.fast_patched(),
            enriched = report.enriched(),
            skipped = report.skipped(),
            failed = report.failed(),
            cancelled = report.cancelled,
            "Reconciliation complete"
        );

        Ok(report)
    }

    /// Stored providers for the registry candidates, without enrichment
    ///
    /// A provider whose map image is missing on disk gets it downloaded
    /// again and its `static_map_uri` updated. Candidates with no stored
    /// document are left out.
    pub async fn lookup(
        &self,
        zip: &str,
        filters: &FilterSet,
        cancel_token: &CancellationToken,
    ) -> SyncResult<Vec<EnrichedProvider>> {
        let run_id = Uuid::new_v4();

        if cancel_token.is_cancelled() {
            return Ok(Vec::new());
        }

        let candidates = self.candidates(run_id, zip, filters).await?;

        let mut indexed: Vec<(usize, EnrichedProvider)> = stream::iter(candidates.into_iter().enumerate())
            .map(|(index, record)| async move {
                if cancel_token.is_cancelled() {
                    return None;
                }
                self.stored_provider(run_id, &record.provider_id)
                    .await
                    .map(|provider| (index, provider))
            })
            .buffer_unordered(self.settings.concurrency)
            .filter_map(|found| async move { found })
            .collect()
            .await;

        indexed.sort_by_key(|(index, _)| *index);

        info!(run_id = %run_id, zip = %zip, found = indexed.len(), "Lookup complete");
        Ok(indexed.into_iter().map(|(_, provider)| provider).collect())
    }

    /// Single stored provider by id
    pub async fn provider(&self, provider_id: &str) -> Result<Option<EnrichedProvider>, StoreError> {
        self.store.get(provider_id).await
    }

    /// Registry candidates, deduplicated and filtered by favorites
    async fn candidates(
        &self,
        run_id: Uuid,
        zip: &str,
        filters: &FilterSet,
    ) -> SyncResult<Vec<RegistryRecord>> {
        if zip.trim().is_empty() {
            debug!(run_id = %run_id, "Empty zip, no candidates");
            return Ok(Vec::new());
        }

        let predicate = query::build(zip, filters);
        let records = self
            .registry
            .fetch(&predicate, self.settings.page_size)
            .await?;

        let mut seen = HashSet::new();
        let mut candidates: Vec<RegistryRecord> = records
            .into_iter()
            .filter(|record| {
                if record.provider_id.is_empty() || seen.insert(record.provider_id.clone()) {
                    true
                } else {
                    warn!(
                        run_id = %run_id,
                        provider_id = %record.provider_id,
                        "Duplicate provider in registry page, keeping the first"
                    );
                    false
                }
            })
            .collect();

        if filters.only_favorites {
            let favorites = self.favorites.favorite_ids().await;
            candidates.retain(|record| favorites.contains(&record.provider_id));
            debug!(
                run_id = %run_id,
                favorites = favorites.len(),
                remaining = candidates.len(),
                "Applied favorites filter"
            );
        }

        Ok(candidates)
    }

    async fn reconcile_record(
        &self,
        run_id: Uuid,
        record: RegistryRecord,
        options: ReconcileOptions,
    ) -> RecordOutcome {
        if record.provider_id.trim().is_empty() {
            warn!(
                run_id = %run_id,
                provider_name = %record.provider_name,
                "Registry record has no provider id, skipping"
            );
            return RecordOutcome::Skipped {
                provider_id: String::new(),
                reason: SkipReason::MissingIdentity,
            };
        }

        let cached = if options.force_refresh {
            None
        } else {
            match self.store.get(&record.provider_id).await {
                Ok(cached) => cached,
                Err(e) => {
                    warn!(
                        run_id = %run_id,
                        provider_id = %record.provider_id,
                        error = %e,
                        "Store read failed, treating as uncached"
                    );
                    None
                }
            }
        };

        match cached {
            Some(cached) if cached.record.street_address == record.street_address => {
                self.fast_patch(run_id, cached, record).await
            }
            cached => {
                let previous_uri = cached.map(|c| c.static_map_uri).unwrap_or_default();
                self.enrich(run_id, record, previous_uri).await
            }
        }
    }

    async fn fast_patch(
        &self,
        run_id: Uuid,
        mut cached: EnrichedProvider,
        record: RegistryRecord,
    ) -> RecordOutcome {
        let provider_id = record.provider_id;
        let patch = ProviderPatch::licensing(record.licensing, Utc::now());

        if let Err(e) = self.store.update(&provider_id, &patch).await {
            warn!(
                run_id = %run_id,
                provider_id = %provider_id,
                error = %e,
                "Failed to patch stored provider"
            );
            return RecordOutcome::Failed {
                provider_id,
                error: RecordFailure::StoreWrite(e),
            };
        }

        cached.apply_patch(&patch);
        debug!(run_id = %run_id, provider_id = %provider_id, "Patched cached provider");
        RecordOutcome::FastPatched(cached)
    }

    async fn enrich(
        &self,
        run_id: Uuid,
        record: RegistryRecord,
        previous_uri: String,
    ) -> RecordOutcome {
        let provider_id = record.provider_id.clone();
        let address = record.full_address(&self.settings.default_state);

        let geo = match self.geocoder.geocode(&address).await {
            Ok(geo) => geo,
            Err(e) if e.is_no_location() => {
                warn!(
                    run_id = %run_id,
                    provider_id = %provider_id,
                    address = %address,
                    error = %e,
                    "No location for provider, skipping"
                );
                return RecordOutcome::Skipped {
                    provider_id,
                    reason: SkipReason::NoLocation,
                };
            }
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    provider_id = %provider_id,
                    address = %address,
                    error = %e,
                    "Geocoding failed"
                );
                return RecordOutcome::Failed {
                    provider_id,
                    error: RecordFailure::Geocode(e),
                };
            }
        };

        let place = match self.places.lookup(&record.provider_name, geo.coordinate).await {
            Ok(place) => place,
            Err(PlaceError::NotFound) => {
                debug!(run_id = %run_id, provider_id = %provider_id, "No place match");
                PlaceInfo::default()
            }
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    provider_id = %provider_id,
                    error = %e,
                    "Place lookup failed, contact fields left blank"
                );
                PlaceInfo::default()
            }
        };

        let static_map_uri = match self.maps.get_or_fetch(&provider_id, geo.coordinate).await {
            Ok(image) => image.uri(),
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    provider_id = %provider_id,
                    error = %e,
                    "Static map unavailable, keeping best available reference"
                );
                self.fallback_map_uri(&provider_id, previous_uri).await
            }
        };

        let provider = EnrichedProvider::compose(
            record,
            &geo,
            place,
            static_map_uri,
            Utc::now(),
            &self.settings.default_state,
        );

        match self.store.set(&provider_id, &provider).await {
            Ok(()) => {
                debug!(run_id = %run_id, provider_id = %provider_id, "Enriched provider stored");
                RecordOutcome::Enriched(provider)
            }
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    provider_id = %provider_id,
                    error = %e,
                    "Failed to store enriched provider"
                );
                RecordOutcome::Failed {
                    provider_id,
                    error: RecordFailure::StoreWrite(e),
                }
            }
        }
    }

    /// Previous reference, else any file already on disk, else empty
    async fn fallback_map_uri(&self, provider_id: &str, previous_uri: String) -> String {
        if !previous_uri.is_empty() {
            return previous_uri;
        }
        self.maps
            .existing(provider_id)
            .await
            .map(|image| image.uri())
            .unwrap_or_default()
    }

    async fn stored_provider(&self, run_id: Uuid, provider_id: &str) -> Option<EnrichedProvider> {
        let mut provider = match self.store.get(provider_id).await {
            Ok(found) => found?,
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    provider_id = %provider_id,
                    error = %e,
                    "Store read failed during lookup"
                );
                return None;
            }
        };

        if self.maps.existing(provider_id).await.is_some() {
            return Some(provider);
        }

        match self.maps.get_or_fetch(provider_id, provider.location).await {
            Ok(image) => {
                let uri = image.uri();
                if uri != provider.static_map_uri {
                    let patch = ProviderPatch::static_map(uri);
                    if let Err(e) = self.store.update(provider_id, &patch).await {
                        warn!(
                            run_id = %run_id,
                            provider_id = %provider_id,
                            error = %e,
                            "Failed to record repaired static map"
                        );
                    }
                    provider.apply_patch(&patch);
                }
                debug!(run_id = %run_id, provider_id = %provider_id, "Repaired missing static map");
            }
            Err(e) => {
                warn!(
                    run_id = %run_id,
                    provider_id = %provider_id,
                    error = %e,
                    "Static map missing and could not be downloaded"
                );
            }
        }

        Some(provider)
    }
}

fn client_error(e: impl std::fmt::Display) -> SyncError {
    SyncError::Client(e.to_string())
}
