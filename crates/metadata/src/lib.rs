pub mod cache;
pub mod fetch;
pub mod fingerprint;
pub mod normalize;
pub mod source;

use thiserror::Error;

/// Fetch-side failures. Transport and upstream errors are recovered locally
/// via stale-cache fallback; they only surface when no cached body exists.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("upstream returned status {0}")]
    Upstream(u16),

    #[error("parse metadata document: {0}")]
    Parse(String),

    #[error("http client: {0}")]
    Client(String),

    #[error("fetch failed with no cached copy to fall back to: {0}")]
    Unavailable(String),
}

/// Normalization failures: the document fetched fine but does not contain
/// the configured show.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("document has no top-level `metadata` mapping")]
    MissingMetadata,

    #[error("show key `{0}` not found in metadata document")]
    ShowNotFound(String),
}

pub use cache::{CacheEntry, CacheStore, DiskCache, MemoryCache};
pub use fetch::{FetchStats, MetadataFetcher};
pub use fingerprint::{
    DiskFingerprintStore, FingerprintEngine, FingerprintStore, MemoryFingerprintStore,
    MetadataChangeResult, ShowFingerprint, fingerprint,
};
pub use normalize::normalize;
pub use source::{HttpSource, RemoteResponse, RemoteSource, Validators};
