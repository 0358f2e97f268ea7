//! Value types flowing through the pipeline

pub mod filters;
pub mod geo;
mod lenient;
pub mod provider;
pub mod quality;
pub mod registry;

pub use filters::{CapacityBand, FilterSet, InvalidFilterKey, ProgramFlag, ServiceType};
pub use geo::{Coordinate, GeoMatch, PlaceInfo};
pub use provider::{EnrichedProvider, ProviderPatch};
pub use quality::QualityTier;
pub use registry::{LicensingFacts, RegistryRecord};
