//! Filter → registry predicate translation
//!
//! The predicate always starts with the zip clause. Each non-empty filter
//! bucket adds exactly one AND-ed clause, in the order capacity → setting →
//! program:
//!
//! ```text
//! SELECT * WHERE zip = '80516'
//!   AND (`licensed_infant_capacity` > 0 OR `licensed_toddler_capacity` > 0)
//!   AND caseless_one_of(`provider_service_type`, "Child Care Center")
//!   AND (`cccap_authorization_status` == TRUE)
//! ```

use crate::models::FilterSet;
use std::fmt;

/// Registry field holding the licensed service type
const SERVICE_TYPE_FIELD: &str = "provider_service_type";

/// One AND-ed condition following the zip clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `(a > 0 OR b > 0 ...)`
    AnyPositive(Vec<&'static str>),
    /// `caseless_one_of(field, v1, v2 ...)`
    CaselessOneOf {
        field: &'static str,
        values: Vec<&'static str>,
    },
    /// `(a == TRUE OR b == TRUE ...)`
    AnyTrue(Vec<&'static str>),
}

/// Immutable registry query condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    zip: String,
    clauses: Vec<Clause>,
}

impl Predicate {
    pub fn zip(&self) -> &str {
        &self.zip
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }
}

/// Build the registry predicate for `zip` and `filters`
///
/// Total over every `FilterSet`; an unfiltered set yields the bare zip clause.
pub fn build(zip: &str, filters: &FilterSet) -> Predicate {
    let mut clauses = Vec::with_capacity(3);

    if !filters.capacity.is_empty() {
        clauses.push(Clause::AnyPositive(
            filters.capacity.iter().map(|band| band.field()).collect(),
        ));
    }

    if !filters.settings.is_empty() {
        clauses.push(Clause::CaselessOneOf {
            field: SERVICE_TYPE_FIELD,
            values: filters
                .settings
                .iter()
                .map(|setting| setting.registry_value())
                .collect(),
        });
    }

    if !filters.programs.is_empty() {
        clauses.push(Clause::AnyTrue(
            filters.programs.iter().map(|program| program.field()).collect(),
        ));
    }

    Predicate {
        zip: zip.trim().to_string(),
        clauses,
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Clause::AnyPositive(fields) => {
                let terms: Vec<String> = fields.iter().map(|field| format!("`{}` > 0", field)).collect();
                write!(f, "({})", terms.join(" OR "))
            }
            Clause::CaselessOneOf { field, values } => {
                let quoted: Vec<String> = values.iter().map(|value| format!("\"{}\"", value)).collect();
                write!(f, "caseless_one_of(`{}`, {})", field, quoted.join(", "))
            }
            Clause::AnyTrue(fields) => {
                let terms: Vec<String> = fields.iter().map(|field| format!("`{}` == TRUE", field)).collect();
                write!(f, "({})", terms.join(" OR "))
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Single quotes are escaped by doubling in the registry query language
        write!(f, "SELECT * WHERE zip = '{}'", self.zip.replace('\'', "''"))?;
        for clause in &self.clauses {
            write!(f, " AND {}", clause)?;
        }
        Ok(())
    }
}
