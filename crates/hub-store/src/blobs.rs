//! Filesystem blob store.
//!
//! Objects live at `<base>/<bucket>/<path>`. Paths are namespaced by owner id
//! (`<owner>/<millis>-<file name>`) by the client, and every key is checked
//! so it cannot escape the base directory.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{Result, StoreError};

#[derive(Debug, Clone)]
pub struct BlobStore {
    base_path: PathBuf,
    max_size: usize,
}

impl BlobStore {
    pub async fn new(base_path: PathBuf, max_size: usize) -> Result<Self> {
        fs::create_dir_all(&base_path).await?;

        info!(path = %base_path.display(), "Blob store initialized");

        Ok(Self {
            base_path,
            max_size,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Store a new object. Existing objects are never overwritten.
    pub async fn put(&self, bucket: &str, key: &str, data: &[u8]) -> Result<PathBuf> {
        if data.is_empty() {
            return Err(StoreError::EmptyBlob);
        }
        if data.len() > self.max_size {
            return Err(StoreError::BlobTooLarge {
                size: data.len(),
                max: self.max_size,
            });
        }

        let path = self.object_path(bucket, key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(StoreError::BlobExists(format!("{bucket}/{key}")));
            }
            Err(e) => return Err(e.into()),
        };
        file.write_all(data).await?;
        file.flush().await?;

        debug!(bucket, key, size = data.len(), "Stored blob");
        Ok(path)
    }

    pub async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(bucket, key)?;

        match fs::read(&path).await {
            Ok(data) => {
                debug!(bucket, key, size = data.len(), "Retrieved blob");
                Ok(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::BlobNotFound(format!("{bucket}/{key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Resolve `bucket/key` to a path inside the base directory.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        let bucket_ok = !bucket.is_empty()
            && bucket
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !bucket_ok || key.is_empty() || key.contains('\\') {
            return Err(StoreError::PathTraversal);
        }

        let mut resolved = self.base_path.join(bucket);
        for component in Path::new(key).components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                // `..`, `.`, root and prefixes are all refused
                _ => return Err(StoreError::PathTraversal),
            }
        }

        if !resolved.starts_with(&self.base_path) {
            return Err(StoreError::PathTraversal);
        }
        Ok(resolved)
    }
}

/// Public URL of an object served under `base_url`. Each key segment is
/// percent-encoded, so the URL always names the stored key.
pub fn public_url(base_url: &str, bucket: &str, key: &str) -> Result<String> {
    let mut url = Url::parse(base_url).map_err(|e| StoreError::InvalidUrl(format!("{base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidUrl(base_url.to_string()))?
        .pop_if_empty()
        .extend(["storage", "v1", "object", "public", bucket])
        .extend(key.split('/'));
    Ok(url.into())
}
