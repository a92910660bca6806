//! Cache entry and key types.

use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

use crate::tile::TileId;

/// Fixed 8-byte ASCII marker separating the image payload from the
/// expiration trailer in a durable cache file.
pub const EXPIRES_TAG: &[u8; 8] = b"EXPIRES:";

/// Total trailer length: tag plus 8-byte little-endian expiration ticks.
pub const TRAILER_LEN: usize = 16;

/// Errors that can occur during cache operations.
///
/// All variants are non-fatal to tile loading: reads downgrade to a miss,
/// writes and removes downgrade to a no-op. They exist so the downgrade
/// sites can log what actually went wrong.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed reading from the durable store.
    #[error("Cache read failed: {0}")]
    Read(#[source] std::io::Error),

    /// Failed writing to the durable store.
    #[error("Cache write failed: {0}")]
    Write(#[source] std::io::Error),

    /// Durable entry is too short or its expiration trailer is malformed.
    #[error("Corrupt cache entry: {0}")]
    CorruptEntry(String),
}

/// A cached tile: payload bytes plus an absolute expiration timestamp.
///
/// An empty buffer is a cached negative result — the server confirmed there
/// is no tile — and is distinct from "not present". Negative results expire
/// like any other entry, so an absent tile is re-queried periodically.
#[derive(Debug, Clone, PartialEq)]
pub struct TileCacheEntry {
    /// Image payload; empty means "confirmed no tile available".
    pub buffer: Vec<u8>,
    /// Absolute expiration timestamp.
    pub expires: DateTime<Utc>,
}

impl TileCacheEntry {
    pub fn new(buffer: Vec<u8>, expires: DateTime<Utc>) -> Self {
        Self { buffer, expires }
    }

    /// Whether the entry has passed its expiration at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Whether this is a cached negative result.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Serializes to the durable file layout:
    /// `[payload][EXPIRES_TAG][8-byte LE expiration millis]`.
    ///
    /// Expiration ticks are milliseconds since the Unix epoch, so a reader
    /// can recover payload and expiration from the final 16 bytes without a
    /// sidecar index.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.buffer.len() + TRAILER_LEN);
        bytes.extend_from_slice(&self.buffer);
        bytes.extend_from_slice(EXPIRES_TAG);
        bytes.extend_from_slice(&self.expires.timestamp_millis().to_le_bytes());
        bytes
    }

    /// Parses the durable file layout produced by
    /// [`TileCacheEntry::to_bytes`].
    pub fn from_bytes(mut bytes: Vec<u8>) -> Result<Self, CacheError> {
        if bytes.len() < TRAILER_LEN {
            return Err(CacheError::CorruptEntry(format!(
                "entry is {} bytes, shorter than the {}-byte trailer",
                bytes.len(),
                TRAILER_LEN
            )));
        }

        let trailer_start = bytes.len() - TRAILER_LEN;
        let (tag, ticks) = bytes[trailer_start..].split_at(8);
        if tag != EXPIRES_TAG {
            return Err(CacheError::CorruptEntry(
                "missing expiration tag".to_string(),
            ));
        }

        let mut raw = [0u8; 8];
        raw.copy_from_slice(ticks);
        let millis = i64::from_le_bytes(raw);
        let expires = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| {
                CacheError::CorruptEntry(format!("expiration ticks {} out of range", millis))
            })?;

        bytes.truncate(trailer_start);
        Ok(Self {
            buffer: bytes,
            expires,
        })
    }
}

/// Builds the stable cache key for a tile of a source.
///
/// The key doubles as the durable store's relative path, so every segment
/// must be filesystem-safe; the source id is sanitized at source
/// construction.
pub fn cache_key(source_id: &str, tile: TileId) -> String {
    format!("{}/{}/{}/{}", source_id, tile.zoom, tile.column, tile.row)
}
