//! User-selected provider filters
//!
//! Filters are tagged by category so that every selection maps to exactly one
//! predicate bucket. The legacy flat string keys (`licensed_infant_capacity`,
//! `provider_service_type.Child Care Center`, ...) are accepted only at the
//! edge through [`FilterSet::from_flags`].

use std::collections::BTreeSet;
use thiserror::Error;

/// Prefix of legacy service-type filter keys
const SERVICE_TYPE_PREFIX: &str = "provider_service_type.";

/// Legacy key of the favorites toggle
const ONLY_FAVORITES_KEY: &str = "only_favorites";

/// A filter key that maps to no known filter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid filter key: {0}")]
pub struct InvalidFilterKey(pub String);

/// Licensed capacity by age band
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CapacityBand {
    Infant,
    Toddler,
    Preschool,
    SchoolAge,
}

impl CapacityBand {
    pub const ALL: [CapacityBand; 4] = [
        CapacityBand::Infant,
        CapacityBand::Toddler,
        CapacityBand::Preschool,
        CapacityBand::SchoolAge,
    ];

    /// Registry field holding this band's capacity
    pub fn field(self) -> &'static str {
        match self {
            CapacityBand::Infant => "licensed_infant_capacity",
            CapacityBand::Toddler => "licensed_toddler_capacity",
            CapacityBand::Preschool => "licensed_preschool_capacity",
            CapacityBand::SchoolAge => "licensed_school_age_capacity",
        }
    }
}

/// Licensed service type (the registry's `provider_service_type` values)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceType {
    SchoolAgeChildCareCenter,
    PreschoolProgram,
    LargeFamilyChildCareHome,
    ChildCareCenter,
    NeighborhoodYouthOrganization,
}

impl ServiceType {
    pub const ALL: [ServiceType; 5] = [
        ServiceType::SchoolAgeChildCareCenter,
        ServiceType::PreschoolProgram,
        ServiceType::LargeFamilyChildCareHome,
        ServiceType::ChildCareCenter,
        ServiceType::NeighborhoodYouthOrganization,
    ];

    /// Value as published by the registry
    pub fn registry_value(self) -> &'static str {
        match self {
            ServiceType::SchoolAgeChildCareCenter => "School-Age Child Care Center",
            ServiceType::PreschoolProgram => "Preschool Program",
            ServiceType::LargeFamilyChildCareHome => "Large Family Child Care Home",
            ServiceType::ChildCareCenter => "Child Care Center",
            ServiceType::NeighborhoodYouthOrganization => "Neighborhood Youth Organization",
        }
    }

    pub fn from_registry_value(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.registry_value().eq_ignore_ascii_case(value.trim()))
    }
}

/// Program authorization flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProgramFlag {
    /// Child Care Assistance Program authorization
    CccapAuthorization,
}

impl ProgramFlag {
    pub const ALL: [ProgramFlag; 1] = [ProgramFlag::CccapAuthorization];

    pub fn field(self) -> &'static str {
        match self {
            ProgramFlag::CccapAuthorization => "cccap_authorization_status",
        }
    }
}

/// Filter selection for one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    pub capacity: BTreeSet<CapacityBand>,
    pub settings: BTreeSet<ServiceType>,
    pub programs: BTreeSet<ProgramFlag>,
    pub only_favorites: bool,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, band: CapacityBand) -> Self {
        self.capacity.insert(band);
        self
    }

    pub fn with_setting(mut self, setting: ServiceType) -> Self {
        self.settings.insert(setting);
        self
    }

    pub fn with_program(mut self, program: ProgramFlag) -> Self {
        self.programs.insert(program);
        self
    }

    pub fn only_favorites(mut self, only: bool) -> Self {
        self.only_favorites = only;
        self
    }

    /// True when no bucket contributes a clause
    pub fn is_unfiltered(&self) -> bool {
        self.capacity.is_empty() && self.settings.is_empty() && self.programs.is_empty()
    }

    /// Build from legacy `key → bool` flags
    ///
    /// Only `true` entries are applied, but every key is validated.
    pub fn from_flags<I, K>(flags: I) -> Result<Self, InvalidFilterKey>
    where
        I: IntoIterator<Item = (K, bool)>,
        K: AsRef<str>,
    {
        let mut filters = FilterSet::default();
        for (key, enabled) in flags {
            filters.apply_key(key.as_ref(), enabled)?;
        }
        Ok(filters)
    }

    /// Build from the list of enabled legacy keys
    pub fn from_keys<I, K>(keys: I) -> Result<Self, InvalidFilterKey>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        Self::from_flags(keys.into_iter().map(|k| (k, true)))
    }

    fn apply_key(&mut self, key: &str, enabled: bool) -> Result<(), InvalidFilterKey> {
        if key == ONLY_FAVORITES_KEY {
            self.only_favorites |= enabled;
            return Ok(());
        }

        if let Some(value) = key.strip_prefix(SERVICE_TYPE_PREFIX) {
            let setting = ServiceType::from_registry_value(value)
                .ok_or_else(|| InvalidFilterKey(key.to_string()))?;
            if enabled {
                self.settings.insert(setting);
            }
            return Ok(());
        }

        if let Some(band) = CapacityBand::ALL.into_iter().find(|b| b.field() == key) {
            if enabled {
                self.capacity.insert(band);
            }
            return Ok(());
        }

        if let Some(program) = ProgramFlag::ALL.into_iter().find(|p| p.field() == key) {
            if enabled {
                self.programs.insert(program);
            }
            return Ok(());
        }

        Err(InvalidFilterKey(key.to_string()))
    }
}
