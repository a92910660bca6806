//! HTTP tile fetching abstraction.
//!
//! The loader talks to the network through the [`TileFetcher`] trait so
//! tests can substitute a mock, mirroring how providers are injected
//! elsewhere in the crate. The real implementation rides on an async
//! `reqwest` client.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors from a single tile fetch.
///
/// All variants are non-fatal: the tile stays unresolved for this load
/// generation and may be retried by the next generation that still needs
/// it. Fetch failures are never written to the cache.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The request exceeded the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Transport-level failure (DNS, TLS, connection reset).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Failed to construct the HTTP client.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),
}

/// A successfully fetched tile.
///
/// An empty buffer means the server confirmed there is no tile at these
/// coordinates — a cacheable negative result, distinct from a fetch
/// failure.
#[derive(Debug, Clone)]
pub struct FetchedTile {
    /// Raw image bytes; possibly empty.
    pub buffer: Vec<u8>,
    /// Freshness hint from the response's `Cache-Control: max-age`, if any.
    pub max_age: Option<Duration>,
}

/// Network boundary for tile downloads.
pub trait TileFetcher: Send + Sync {
    /// Fetches one tile URL.
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedTile, FetchError>>;
}

/// Real fetcher backed by `reqwest`.
pub struct HttpTileFetcher {
    client: reqwest::Client,
}

impl HttpTileFetcher {
    /// Creates a fetcher whose requests are bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("mapcanvas/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

impl TileFetcher for HttpTileFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<FetchedTile, FetchError>> {
        Box::pin(async move {
            let response = self.client.get(url).send().await.map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout(url.to_string())
                } else {
                    FetchError::Transport(e.to_string())
                }
            })?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let max_age = response
                .headers()
                .get(reqwest::header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_max_age);

            let buffer = response
                .bytes()
                .await
                .map_err(|e| FetchError::Transport(e.to_string()))?
                .to_vec();

            Ok(FetchedTile { buffer, max_age })
        })
    }
}

/// Extracts `max-age` seconds from a `Cache-Control` header value.
fn parse_max_age(header: &str) -> Option<Duration> {
    header
        .split(',')
        .map(str::trim)
        .find_map(|directive| directive.strip_prefix("max-age="))
        .and_then(|secs| secs.parse::<u64>().ok())
        .map(Duration::from_secs)
}
