//! On-disk metadata cache, keyed by source URL.
//!
//! Stores are injected into the fetcher rather than reached through any
//! global state, so tests can run against [`MemoryCache`]. Store problems
//! are logged and degrade to cache misses; they never fail a fetch.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::source::Validators;

/// One cached metadata document plus its HTTP validators.
///
/// An expired entry is invisible to normal reads, but its validators stay
/// usable for conditional revalidation and its body for stale fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Source URL.
    pub key: String,
    pub content: serde_json::Value,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    pub fetched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn validators(&self) -> Validators {
        Validators {
            etag: self.etag.clone(),
            last_modified: self.last_modified.clone(),
        }
    }
}

/// Persistence seam for cache entries.
pub trait CacheStore: Send + Sync {
    fn load(&self, key: &str) -> Option<CacheEntry>;
    fn store(&self, entry: &CacheEntry);
}

/// JSON file per entry under the configured cache directory, named by the
/// SHA-256 of the source URL.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_bytes()));
        self.dir.join(format!("{digest}.json"))
    }
}

impl CacheStore for DiskCache {
    fn load(&self, key: &str) -> Option<CacheEntry> {
        let path = self.path_for(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "cache entry corrupt, ignoring");
                None
            }
        }
    }

    fn store(&self, entry: &CacheEntry) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "cache dir create failed");
            return;
        }
        let path = self.path_for(&entry.key);
        let json = match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "cache entry serialize failed");
                return;
            }
        };
        if let Err(e) = std::fs::write(&path, json) {
            warn!(path = %path.display(), error = %e, "cache write failed");
        }
    }
}

/// In-memory store for tests and one-shot runs.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn load(&self, key: &str) -> Option<CacheEntry> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn store(&self, entry: &CacheEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(entry.key.clone(), entry.clone());
        }
    }
}
