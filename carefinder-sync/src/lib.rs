//! carefinder-sync library interface
//!
//! Provider reconciliation and enrichment pipeline: registry query, store
//! reconciliation, geocode/place/static-map enrichment.

pub mod cache;
pub mod clients;
pub mod error;
pub mod favorites;
pub mod models;
pub mod query;
pub mod reconcile;
pub mod settings;
pub mod store;

pub use crate::error::{SyncError, SyncResult};
pub use crate::reconcile::{ReconcileOptions, ReconcileReport, ReconciliationEngine, RecordOutcome};
pub use crate::settings::SyncSettings;
