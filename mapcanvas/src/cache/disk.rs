//! Durable cache layer: one file per key under the cache root.
//!
//! The cache key doubles as the relative path, producing the hierarchy
//! `<root>/<source>/<zoom>/<column>/<row>.tile`. Each file is the payload
//! followed by the 16-byte expiration trailer (see
//! [`crate::cache::TileCacheEntry::to_bytes`]), so payload and expiration
//! come back from a single read. Writes are whole-entry: the bytes land in a
//! temporary file that is renamed into place, so two racing loads of the
//! same key can never interleave.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::fs;

use super::types::{CacheError, TileCacheEntry};

/// Counter distinguishing temp files of racing writes within this process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Durable byte-store keyed by cache key.
pub struct DiskCache {
    root: PathBuf,
}

impl DiskCache {
    /// Opens (creating if needed) a disk cache rooted at `root`.
    pub fn new(root: PathBuf) -> Result<Self, CacheError> {
        std::fs::create_dir_all(&root).map_err(CacheError::Write)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            path.push(segment);
        }
        path.set_extension("tile");
        path
    }

    /// Reads an entry, returning `Ok(None)` when the key has no file.
    ///
    /// Corrupt files surface as `CacheError::CorruptEntry`; the caller is
    /// expected to downgrade that to a miss.
    pub async fn read(&self, key: &str) -> Result<Option<TileCacheEntry>, CacheError> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::Read(e)),
        };

        TileCacheEntry::from_bytes(bytes).map(Some)
    }

    /// Writes an entry as a single atomic file replacement.
    pub async fn write(&self, key: &str, entry: &TileCacheEntry) -> Result<(), CacheError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(CacheError::Write)?;
        }

        let temp = path.with_extension(format!(
            "tmp.{}.{}",
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        fs::write(&temp, entry.to_bytes())
            .await
            .map_err(CacheError::Write)?;
        fs::rename(&temp, &path).await.map_err(CacheError::Write)?;
        Ok(())
    }

    /// Deletes the durable artifact for `key`; missing files are not an
    /// error.
    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Write(e)),
        }
    }
}
