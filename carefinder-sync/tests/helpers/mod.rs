//! Shared fakes for engine integration tests
//!
//! Every fake counts its calls so tests can assert which upstream services a
//! reconciliation pass touched.

#![allow(dead_code)]

use async_trait::async_trait;
use carefinder_sync::cache::{MemoryImageStore, StaticMapCache};
use carefinder_sync::clients::{
    GeocodeError, Geocoder, MapFetchError, MapImageSource, PageRequest, PlaceError, PlaceLookup,
    RegistryError, RegistrySource,
};
use carefinder_sync::models::{
    Coordinate, EnrichedProvider, GeoMatch, LicensingFacts, PlaceInfo, ProviderPatch,
    RegistryRecord,
};
use carefinder_sync::query::Predicate;
use carefinder_sync::store::{CachedStore, MemoryStore, StoreError};
use carefinder_sync::{ReconciliationEngine, SyncSettings};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

pub const CACHE_DIR: &str = "/cache/maps";

pub fn record(id: &str, name: &str, street: &str) -> RegistryRecord {
    RegistryRecord {
        provider_id: id.to_string(),
        provider_name: name.to_string(),
        provider_service_type: "Child Care Center".to_string(),
        street_address: street.to_string(),
        city: "Erie".to_string(),
        state: "CO".to_string(),
        zip: "80516".to_string(),
        licensing: LicensingFacts {
            total_licensed_capacity: 40,
            licensed_infant_capacity: 8,
            quality_rating: "2".to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn coordinate_for(address: &str) -> Coordinate {
    let seed = address.len() as f64;
    Coordinate::new(40.0 + seed / 1000.0, -105.0 - seed / 1000.0)
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRegistry {
    records: Mutex<Vec<RegistryRecord>>,
    fail_with: Mutex<Option<u16>>,
    pub calls: AtomicUsize,
    pub last_query: Mutex<Option<String>>,
}

impl FakeRegistry {
    pub fn with(records: Vec<RegistryRecord>) -> Arc<Self> {
        let registry = Self::default();
        *registry.records.lock().unwrap() = records;
        Arc::new(registry)
    }

    pub fn set_records(&self, records: Vec<RegistryRecord>) {
        *self.records.lock().unwrap() = records;
    }

    pub fn fail_with_status(&self, status: u16) {
        *self.fail_with.lock().unwrap() = Some(status);
    }
}

#[async_trait]
impl RegistrySource for FakeRegistry {
    async fn fetch_page(
        &self,
        predicate: &Predicate,
        _page: PageRequest,
    ) -> Result<Vec<RegistryRecord>, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_query.lock().unwrap() = Some(predicate.to_string());
        if let Some(status) = *self.fail_with.lock().unwrap() {
            return Err(RegistryError::Api(status, "unavailable".to_string()));
        }
        Ok(self.records.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------------
// Geocoder
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeGeocoder {
    pub calls: AtomicUsize,
    /// Street fragments that produce no location
    not_found: Mutex<HashSet<String>>,
    /// Street fragments that produce a hard error
    broken: Mutex<HashSet<String>>,
    /// Street fragments whose lookup times out
    timeouts: Mutex<HashSet<String>>,
    /// Cancelled as the first geocode call starts
    cancel_on_call: Mutex<Option<CancellationToken>>,
}

impl FakeGeocoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn not_found_for(&self, street: &str) {
        self.not_found.lock().unwrap().insert(street.to_string());
    }

    pub fn broken_for(&self, street: &str) {
        self.broken.lock().unwrap().insert(street.to_string());
    }

    pub fn timeout_for(&self, street: &str) {
        self.timeouts.lock().unwrap().insert(street.to_string());
    }

    /// Simulates an interrupt arriving while the first record is in flight
    pub fn cancel_on_first_call(&self, token: CancellationToken) {
        *self.cancel_on_call.lock().unwrap() = Some(token);
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoMatch, GeocodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(token) = self.cancel_on_call.lock().unwrap().take() {
            token.cancel();
        }
        if self.not_found.lock().unwrap().iter().any(|s| address.contains(s.as_str())) {
            return Err(GeocodeError::NotFound);
        }
        if self.timeouts.lock().unwrap().iter().any(|s| address.contains(s.as_str())) {
            return Err(GeocodeError::Timeout);
        }
        if self.broken.lock().unwrap().iter().any(|s| address.contains(s.as_str())) {
            return Err(GeocodeError::Api("REQUEST_DENIED".to_string(), String::new()));
        }
        Ok(GeoMatch {
            coordinate: coordinate_for(address),
            place_id: format!("place:{}", address),
        })
    }
}

// ---------------------------------------------------------------------------
// Places
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakePlaces {
    pub calls: AtomicUsize,
    /// Provider names whose lookup fails
    failing: Mutex<HashSet<String>>,
}

impl FakePlaces {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_for(&self, name: &str) {
        self.failing.lock().unwrap().insert(name.to_string());
    }
}

#[async_trait]
impl PlaceLookup for FakePlaces {
    async fn lookup(&self, name: &str, _coordinate: Coordinate) -> Result<PlaceInfo, PlaceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.lock().unwrap().contains(name) {
            return Err(PlaceError::Api(500, "backend error".to_string()));
        }
        Ok(PlaceInfo {
            formatted_address: format!("{} (formatted)", name),
            phone: "(303) 555-0100".to_string(),
            website: format!("https://{}.example", name.to_lowercase().replace(' ', "-")),
        })
    }
}

// ---------------------------------------------------------------------------
// Map renderer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeMapSource {
    pub calls: AtomicUsize,
    failing: AtomicBool,
}

impl FakeMapSource {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl MapImageSource for FakeMapSource {
    async fn render(&self, coordinate: Coordinate) -> Result<Vec<u8>, MapFetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(MapFetchError::Timeout);
        }
        Ok(format!("map:{},{}", coordinate.lat, coordinate.lng).into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Store wrapper with injectable failures
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    failing_writes: Mutex<HashSet<String>>,
    failing_reads: AtomicBool,
    pub reads: AtomicUsize,
    pub sets: AtomicUsize,
    pub updates: AtomicUsize,
}

impl FlakyStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_writes_for(&self, provider_id: &str) {
        self.failing_writes
            .lock()
            .unwrap()
            .insert(provider_id.to_string());
    }

    pub fn set_failing_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    fn write_fails(&self, provider_id: &str) -> bool {
        self.failing_writes.lock().unwrap().contains(provider_id)
    }
}

#[async_trait]
impl CachedStore for FlakyStore {
    async fn get(&self, provider_id: &str) -> Result<Option<EnrichedProvider>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("read refused".to_string()));
        }
        self.inner.get(provider_id).await
    }

    async fn set(&self, provider_id: &str, provider: &EnrichedProvider) -> Result<(), StoreError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        if self.write_fails(provider_id) {
            return Err(StoreError::Unavailable("write refused".to_string()));
        }
        self.inner.set(provider_id, provider).await
    }

    async fn update(&self, provider_id: &str, patch: &ProviderPatch) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.write_fails(provider_id) {
            return Err(StoreError::Unavailable("write refused".to_string()));
        }
        self.inner.update(provider_id, patch).await
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub registry: Arc<FakeRegistry>,
    pub geocoder: Arc<FakeGeocoder>,
    pub places: Arc<FakePlaces>,
    pub maps: Arc<FakeMapSource>,
    pub images: Arc<MemoryImageStore>,
    pub store: Arc<FlakyStore>,
    pub settings: Arc<SyncSettings>,
}

impl Harness {
    pub fn new(records: Vec<RegistryRecord>) -> Self {
        let mut settings = SyncSettings::new("test-key");
        settings.cache_dir = CACHE_DIR.into();
        settings.requests_per_second = 1000;

        Self {
            registry: FakeRegistry::with(records),
            geocoder: FakeGeocoder::new(),
            places: FakePlaces::new(),
            maps: FakeMapSource::new(),
            images: Arc::new(MemoryImageStore::new()),
            store: FlakyStore::new(),
            settings: Arc::new(settings),
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        let mut settings = (*self.settings).clone();
        settings.concurrency = concurrency;
        self.settings = Arc::new(settings);
        self
    }

    pub fn engine(&self) -> ReconciliationEngine {
        let cache = StaticMapCache::new(
            self.maps.clone(),
            self.images.clone(),
            CACHE_DIR,
            self.settings.staleness_window,
        );
        ReconciliationEngine::new(
            self.settings.clone(),
            self.registry.clone(),
            self.geocoder.clone(),
            self.places.clone(),
            Arc::new(cache),
            self.store.clone(),
        )
    }

    /// Enrichment calls made so far: (geocode, place, map)
    pub fn enrichment_calls(&self) -> (usize, usize, usize) {
        (
            self.geocoder.calls.load(Ordering::SeqCst),
            self.places.calls.load(Ordering::SeqCst),
            self.maps.calls.load(Ordering::SeqCst),
        )
    }

    pub async fn stored(&self, provider_id: &str) -> Option<EnrichedProvider> {
        self.store.inner.get(provider_id).await.unwrap()
    }
}

pub fn by_id(providers: &[EnrichedProvider]) -> HashMap<String, EnrichedProvider> {
    providers
        .iter()
        .map(|p| (p.provider_id().to_string(), p.clone()))
        .collect()
}
