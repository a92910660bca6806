//! Runtime tile objects tracked by the loader.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::decode::TileImage;

use super::TileId;

/// A tile in the currently visible set.
///
/// Created when a tile enters the visible set and discarded when it leaves
/// or a newer viewport generation supersedes it. The image slot is written
/// at most once per load generation; assignment is idempotent, so a racing
/// re-assignment of the same image is harmless.
#[derive(Debug)]
pub struct Tile {
    id: TileId,
    image: Mutex<Option<Arc<TileImage>>>,
    cancellation: CancellationToken,
}

impl Tile {
    /// Creates a tile bound to the given load generation's cancellation
    /// token.
    pub fn new(id: TileId, cancellation: CancellationToken) -> Self {
        Self {
            id,
            image: Mutex::new(None),
            cancellation,
        }
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    /// The decoded image, if this tile has been satisfied.
    pub fn image(&self) -> Option<Arc<TileImage>> {
        self.image.lock().clone()
    }

    /// Assigns the decoded image to the display slot.
    pub fn set_image(&self, image: Arc<TileImage>) {
        *self.image.lock() = Some(image);
    }

    /// Whether the load generation owning this tile has been superseded.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}
