//! Image decoding boundary.
//!
//! Decoding is an opaque "bytes in, displayable image out" capability as
//! far as the pipeline is concerned. The default implementation uses the
//! `image` crate; embedders with their own rendering stack provide a
//! [`TileDecoder`] of their own.

use thiserror::Error;

/// Decode failure for one tile's bytes.
///
/// Non-fatal: the tile stays unresolved for this generation and the cache
/// entry is left intact, since the bytes may be valid while the decoder is
/// transiently unable (or the wrong decoder is configured).
#[derive(Debug, Clone, Error)]
#[error("Failed to decode tile image: {0}")]
pub struct DecodeError(pub String);

/// A decoded tile image ready for display: tightly packed RGBA8.
#[derive(Debug, Clone, PartialEq)]
pub struct TileImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Decoder boundary used by the tile loader.
pub trait TileDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<TileImage, DecodeError>;
}

/// Default decoder backed by the `image` crate (PNG/JPEG/WebP as enabled by
/// its default features).
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl TileDecoder for ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<TileImage, DecodeError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| DecodeError(e.to_string()))?
            .into_rgba8();

        let (width, height) = image.dimensions();
        Ok(TileImage {
            width,
            height,
            pixels: image.into_raw(),
        })
    }
}
