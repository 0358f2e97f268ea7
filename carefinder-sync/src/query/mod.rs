//! Registry query construction

pub mod filter_query;

pub use filter_query::{build, Clause, Predicate};
