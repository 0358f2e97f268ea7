//! External service clients
//!
//! Each upstream service sits behind a small async trait so the engine can be
//! driven by fakes in tests. The concrete clients share the same shape: one
//! `reqwest::Client` with a per-request timeout, a `governor` throttle, and a
//! `thiserror` enum describing what can go wrong.

pub mod geocode_client;
pub mod places_client;
pub mod registry_client;
pub mod static_map_client;

pub use geocode_client::{GeocodeClient, GeocodeError, Geocoder};
pub use places_client::{PlaceError, PlaceLookup, PlacesClient, PLACE_BIAS_RADIUS_METERS};
pub use registry_client::{PageRequest, RegistryClient, RegistryError, RegistrySource};
pub use static_map_client::{MapFetchError, MapImageSource, StaticMapClient};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// User-Agent sent with every request
pub(crate) const USER_AGENT: &str = concat!("carefinder-sync/", env!("CARGO_PKG_VERSION"));

/// Which upstream result a client keeps when a service returns several
///
/// Upstream services order results by relevance, so the first one wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultPolicy {
    #[default]
    First,
}

impl ResultPolicy {
    pub fn select<T>(self, results: impl IntoIterator<Item = T>) -> Option<T> {
        match self {
            ResultPolicy::First => results.into_iter().next(),
        }
    }
}

/// Shared request throttle for one upstream service
pub(crate) type Throttle = DefaultDirectRateLimiter;

pub(crate) fn throttle(requests_per_second: u32) -> Arc<Throttle> {
    let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(rate)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_policy() {
        assert_eq!(ResultPolicy::First.select(vec![3, 1, 2]), Some(3));
        assert_eq!(ResultPolicy::First.select(Vec::<u8>::new()), None);
    }

    #[tokio::test]
    async fn test_throttle_admits_first_request_immediately() {
        let limiter = throttle(1);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
