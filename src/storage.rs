use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::sync::Mutex;

/// Key/value blob storage. The journal keeps its whole state under one key.
#[async_trait]
pub trait BlobStore: Send + Sync + 'static {
    async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>>;

    async fn put_blob(&self, key: &str, bytes: Vec<u8>) -> Result<()>;
}

/// Stores each key as `<root>/<key>.json`, replacing the file atomically on write.
pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                Err(err).with_context(|| format!("failed to read blob {}", path.display()))
            }
        }
    }

    async fn put_blob(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let root = self.root.clone();
        let path = self.path_for(key);
        tokio::task::spawn_blocking(move || -> Result<()> {
            std::fs::create_dir_all(&root)
                .with_context(|| format!("failed to create data dir {}", root.display()))?;
            let mut staged =
                NamedTempFile::new_in(&root).context("failed to create staging file")?;
            staged
                .write_all(&bytes)
                .context("failed to write staging file")?;
            staged
                .as_file()
                .sync_all()
                .context("failed to flush staging file")?;
            staged
                .persist(&path)
                .with_context(|| format!("failed to replace blob {}", path.display()))?;
            Ok(())
        })
        .await
        .context("blob write task panicked")?
    }
}

/// Process-local store, used for ephemeral journals and tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get_blob(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let guard = self.blobs.lock().await;
        Ok(guard.get(key).cloned())
    }

    async fn put_blob(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let mut guard = self.blobs.lock().await;
        guard.insert(key.to_string(), bytes);
        Ok(())
    }
}
