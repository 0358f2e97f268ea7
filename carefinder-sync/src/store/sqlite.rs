//! SQLite-backed provider store
//!
//! One row per provider. The full document is kept as JSON; `synced_at` is
//! duplicated into its own column so stale rows can be found with SQL.

use super::{CachedStore, StoreError};
use crate::models::{EnrichedProvider, ProviderPatch};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `path`
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let newly_created = !path.exists();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA busy_timeout = 5000")
            .execute(&pool)
            .await?;

        if newly_created {
            info!("Initialized new provider store: {}", path.display());
        } else {
            info!("Opened existing provider store: {}", path.display());
        }

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        create_providers_table(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn create_providers_table(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS providers (
            provider_id TEXT PRIMARY KEY,
            document TEXT NOT NULL,
            synced_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

#[async_trait]
impl CachedStore for SqliteStore {
    async fn get(&self, provider_id: &str) -> Result<Option<EnrichedProvider>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT document FROM providers WHERE provider_id = ?")
                .bind(provider_id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((document,)) => Ok(Some(serde_json::from_str(&document)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, provider_id: &str, provider: &EnrichedProvider) -> Result<(), StoreError> {
        let document = serde_json::to_string(provider)?;

        sqlx::query(
            r#"
            INSERT INTO providers (provider_id, document, synced_at)
            VALUES (?, ?, ?)
            ON CONFLICT(provider_id) DO UPDATE SET
                document = excluded.document,
                synced_at = excluded.synced_at
            "#,
        )
        .bind(provider_id)
        .bind(&document)
        .bind(provider.synced_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update(&self, provider_id: &str, patch: &ProviderPatch) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let row: Option<(String,)> =
            sqlx::query_as("SELECT document FROM providers WHERE provider_id = ?")
                .bind(provider_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((document,)) = row else {
            return Err(StoreError::Missing(provider_id.to_string()));
        };

        let mut provider: EnrichedProvider = serde_json::from_str(&document)?;
        provider.apply_patch(patch);

        sqlx::query("UPDATE providers SET document = ?, synced_at = ? WHERE provider_id = ?")
            .bind(serde_json::to_string(&provider)?)
            .bind(provider.synced_at.to_rfc3339())
            .bind(provider_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
