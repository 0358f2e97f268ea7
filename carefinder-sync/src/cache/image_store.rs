//! Directory-scoped file storage for cached images

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Minimal file operations needed by the map cache
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn modified_at(&self, path: &Path) -> io::Result<DateTime<Utc>>;

    /// Write `bytes` to `path`, replacing any existing file
    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    async fn ensure_dir(&self, dir: &Path) -> io::Result<()>;
}

/// Local filesystem store
///
/// Writes go to a sibling `.tmp` file first and are renamed into place, so a
/// reader never sees a half-written image.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsImageStore;

#[async_trait]
impl ImageStore for FsImageStore {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn modified_at(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(DateTime::<Utc>::from(metadata.modified()?))
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut temp = path.as_os_str().to_owned();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);

        tokio::fs::write(&temp, bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e);
        }
        Ok(())
    }

    async fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        tokio::fs::create_dir_all(dir).await
    }
}

/// In-memory store with controllable modification times
#[derive(Debug, Default)]
pub struct MemoryImageStore {
    files: RwLock<HashMap<PathBuf, (Vec<u8>, DateTime<Utc>)>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a file with an explicit modification time
    pub async fn insert(&self, path: impl Into<PathBuf>, bytes: Vec<u8>, modified: DateTime<Utc>) {
        self.files.write().await.insert(path.into(), (bytes, modified));
    }

    pub async fn read(&self, path: &Path) -> Option<Vec<u8>> {
        self.files.read().await.get(path).map(|(bytes, _)| bytes.clone())
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn exists(&self, path: &Path) -> bool {
        self.files.read().await.contains_key(path)
    }

    async fn modified_at(&self, path: &Path) -> io::Result<DateTime<Utc>> {
        self.files
            .read()
            .await
            .get(path)
            .map(|(_, modified)| *modified)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        self.files
            .write()
            .await
            .insert(path.to_path_buf(), (bytes.to_vec(), Utc::now()));
        Ok(())
    }

    async fn ensure_dir(&self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }
}
