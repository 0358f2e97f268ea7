//! Errors that abort a whole reconciliation
//!
//! Per-record problems never surface here; they are reported as
//! [`crate::reconcile::RecordOutcome`] values.

use crate::clients::RegistryError;
use crate::models::InvalidFilterKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    InvalidFilterKey(#[from] InvalidFilterKey),

    #[error("Registry fetch failed: {0}")]
    RegistryFetch(#[from] RegistryError),

    #[error("Client setup failed: {0}")]
    Client(String),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;
