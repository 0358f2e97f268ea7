//! Staleness-aware static map cache
//!
//! One image per provider, stored as `{provider_id}.jpg` in the cache
//! directory. An image younger than the staleness window is served without a
//! network call; an older or missing one is downloaded and overwritten.

use super::image_store::ImageStore;
use crate::clients::{MapFetchError, MapImageSource};
use crate::models::Coordinate;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Extension of cached image files
pub const IMAGE_EXTENSION: &str = ".jpg";

/// Reference to a cached image on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    path: PathBuf,
}

impl ImageRef {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `file://` URI persisted on the provider document
    pub fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }
}

pub struct StaticMapCache {
    source: Arc<dyn MapImageSource>,
    store: Arc<dyn ImageStore>,
    dir: PathBuf,
    staleness_window: chrono::Duration,
}

impl StaticMapCache {
    pub fn new(
        source: Arc<dyn MapImageSource>,
        store: Arc<dyn ImageStore>,
        dir: impl Into<PathBuf>,
        staleness_window: chrono::Duration,
    ) -> Self {
        Self {
            source,
            store,
            dir: dir.into(),
            staleness_window,
        }
    }

    /// Canonical file for `key`
    ///
    /// Keys become file names, so anything that could escape the cache
    /// directory is rejected.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, MapFetchError> {
        let invalid = key.is_empty()
            || key == "."
            || key == ".."
            || key.contains(|c: char| c == '/' || c == '\\' || c == '\0');
        if invalid {
            return Err(MapFetchError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{}{}", key, IMAGE_EXTENSION)))
    }

    /// Fresh while `now - modified` is strictly below the staleness window
    pub fn is_fresh(&self, modified: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(modified) < self.staleness_window
    }

    /// Existing image for `key`, regardless of age
    pub async fn existing(&self, key: &str) -> Option<ImageRef> {
        let path = self.path_for(key).ok()?;
        if self.store.exists(&path).await {
            Some(ImageRef { path })
        } else {
            None
        }
    }

    pub async fn get_or_fetch(
        &self,
        key: &str,
        coordinate: Coordinate,
    ) -> Result<ImageRef, MapFetchError> {
        self.get_or_fetch_at(key, coordinate, Utc::now()).await
    }

    /// [`Self::get_or_fetch`] evaluated at an explicit instant
    pub async fn get_or_fetch_at(
        &self,
        key: &str,
        coordinate: Coordinate,
        now: DateTime<Utc>,
    ) -> Result<ImageRef, MapFetchError> {
        let path = self.path_for(key)?;

        if self.store.exists(&path).await {
            match self.store.modified_at(&path).await {
                Ok(modified) if self.is_fresh(modified, now) => {
                    debug!(key = %key, "Static map served from cache");
                    return Ok(ImageRef { path });
                }
                Ok(modified) => {
                    debug!(key = %key, modified = %modified, "Cached static map is stale");
                }
                Err(e) => {
                    debug!(key = %key, error = %e, "Cached static map has no readable timestamp");
                }
            }
        }

        self.store.ensure_dir(&self.dir).await?;
        let bytes = self.source.render(coordinate).await?;
        self.store.write(&path, &bytes).await?;

        debug!(key = %key, bytes = bytes.len(), "Static map downloaded");
        Ok(ImageRef { path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryImageStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl MapImageSource for CountingSource {
        async fn render(&self, _coordinate: Coordinate) -> Result<Vec<u8>, MapFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"fresh-image".to_vec())
        }
    }

    fn cache() -> (StaticMapCache, Arc<CountingSource>, Arc<MemoryImageStore>) {
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
        });
        let store = Arc::new(MemoryImageStore::new());
        let cache = StaticMapCache::new(
            source.clone(),
            store.clone(),
            "/cache/maps",
            chrono::Duration::days(30),
        );
        (cache, source, store)
    }

    #[test]
    fn test_path_for_rejects_traversal() {
        let (cache, _, _) = cache();

        assert_eq!(
            cache.path_for("1471234").unwrap(),
            PathBuf::from("/cache/maps/1471234.jpg")
        );
        for key in ["", "..", "../etc/passwd", "a/b", "a\\b"] {
            assert!(matches!(cache.path_for(key), Err(MapFetchError::InvalidKey(_))));
        }
    }

    #[tokio::test]
    async fn test_missing_file_is_fetched() {
        let (cache, source, store) = cache();

        let image = cache.get_or_fetch("42", Coordinate::new(1.0, 2.0)).await.unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(image.uri(), "file:///cache/maps/42.jpg");
        assert_eq!(store.read(image.path()).await.unwrap(), b"fresh-image");
    }

    #[tokio::test]
    async fn test_image_just_inside_window_is_served_from_cache() {
        let (cache, source, store) = cache();
        let now = Utc::now();
        let modified = now - chrono::Duration::days(30) + chrono::Duration::seconds(1);
        store
            .insert("/cache/maps/7.jpg", b"cached".to_vec(), modified)
            .await;

        let image = cache
            .get_or_fetch_at("7", Coordinate::new(1.0, 2.0), now)
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.read(image.path()).await.unwrap(), b"cached");
    }

    #[tokio::test]
    async fn test_image_at_window_boundary_is_refetched() {
        let (cache, source, store) = cache();
        let now = Utc::now();
        store
            .insert(
                "/cache/maps/7.jpg",
                b"cached".to_vec(),
                now - chrono::Duration::days(30),
            )
            .await;

        let image = cache
            .get_or_fetch_at("7", Coordinate::new(1.0, 2.0), now)
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.read(image.path()).await.unwrap(), b"fresh-image");
    }

    #[tokio::test]
    async fn test_existing_ignores_age() {
        let (cache, _, store) = cache();
        assert!(cache.existing("9").await.is_none());

        store
            .insert(
                "/cache/maps/9.jpg",
                b"old".to_vec(),
                Utc::now() - chrono::Duration::days(365),
            )
            .await;

        assert!(cache.existing("9").await.is_some());
    }

    #[tokio::test]
    async fn test_invalid_key_fails_without_fetch() {
        let (cache, source, _) = cache();

        let result = cache.get_or_fetch("../x", Coordinate::new(1.0, 2.0)).await;

        assert!(matches!(result, Err(MapFetchError::InvalidKey(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }
}
