//! Registry/store reconciliation

pub mod engine;
pub mod outcome;

pub use engine::{ReconcileOptions, ReconciliationEngine};
pub use outcome::{ReconcileReport, RecordFailure, RecordOutcome, SkipReason};
