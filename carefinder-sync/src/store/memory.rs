//! In-process store

use super::{CachedStore, StoreError};
use crate::models::{EnrichedProvider, ProviderPatch};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, EnrichedProvider>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl CachedStore for MemoryStore {
    async fn get(&self, provider_id: &str) -> Result<Option<EnrichedProvider>, StoreError> {
        Ok(self.documents.read().await.get(provider_id).cloned())
    }

    async fn set(&self, provider_id: &str, provider: &EnrichedProvider) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .insert(provider_id.to_string(), provider.clone());
        Ok(())
    }

    async fn update(&self, provider_id: &str, patch: &ProviderPatch) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        let provider = documents
            .get_mut(provider_id)
            .ok_or_else(|| StoreError::Missing(provider_id.to_string()))?;
        provider.apply_patch(patch);
        Ok(())
    }
}
