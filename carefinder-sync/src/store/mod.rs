//! Durable provider store
//!
//! Documents are keyed by `provider_id`. `set` replaces the whole document;
//! `update` merges a [`ProviderPatch`] into an existing one.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::models::{EnrichedProvider, ProviderPatch};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No stored provider with id {0}")]
    Missing(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CachedStore: Send + Sync {
    async fn get(&self, provider_id: &str) -> Result<Option<EnrichedProvider>, StoreError>;

    async fn set(&self, provider_id: &str, provider: &EnrichedProvider) -> Result<(), StoreError>;

    /// Merge `patch` into the stored document; [`StoreError::Missing`] if absent
    async fn update(&self, provider_id: &str, patch: &ProviderPatch) -> Result<(), StoreError>;
}
