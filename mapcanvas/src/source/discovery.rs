//! One-time provider metadata discovery.

use tracing::info;

use crate::config::LayerConfig;
use crate::fetch::BoxFuture;

/// Provider capabilities resolved from a metadata document.
///
/// Produced once at layer activation, never on the per-tile hot path. How
/// the document is fetched and parsed (HTTP, XML, JSON) is the embedder's
/// business; malformed or incomplete documents must surface as `None` from
/// [`MetadataDiscovery::discover`], never as an error out of activation.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageryMetadata {
    /// URL template with `{x}`/`{y}`/`{z}` (and optionally `{s}`)
    /// placeholders.
    pub url_template: String,
    /// Subdomains to substitute for `{s}`.
    pub subdomains: Vec<String>,
    /// Provider's minimum zoom level, if advertised.
    pub zoom_min: Option<u8>,
    /// Provider's maximum zoom level, if advertised.
    pub zoom_max: Option<u8>,
}

impl ImageryMetadata {
    /// Narrows a layer's configured zoom range by the discovered one.
    ///
    /// Discovery only ever tightens the range: a discovered minimum raises
    /// the configured minimum and a discovered maximum lowers the
    /// configured maximum. Absent values leave the configuration untouched.
    pub fn narrow_zoom_range(&self, config: &mut LayerConfig) {
        if let Some(zoom_min) = self.zoom_min {
            if zoom_min > config.min_zoom {
                info!(zoom_min, "Raising minimum zoom from provider metadata");
                config.min_zoom = zoom_min;
            }
        }
        if let Some(zoom_max) = self.zoom_max {
            if zoom_max < config.max_zoom {
                info!(zoom_max, "Lowering maximum zoom from provider metadata");
                config.max_zoom = zoom_max;
            }
        }
    }
}

/// Asynchronous, one-shot metadata discovery boundary.
pub trait MetadataDiscovery: Send + Sync {
    /// Attempts discovery; `None` means "no discovery available" and the
    /// layer keeps its caller-configured defaults.
    fn discover(&self) -> BoxFuture<'_, Option<ImageryMetadata>>;
}
