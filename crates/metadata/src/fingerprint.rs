//! Content fingerprints over normalized metadata trees.
//!
//! A fingerprint is a digest over the whole show plus one hash per season
//! and per episode, so a later fetch can report exactly which slices
//! changed. Hashing is pure: identical normalized input always yields an
//! identical fingerprint, and map iteration order never leaks into the
//! digest.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::warn;

use matchday_core::model::Show;

/// Per-slice hashes for one show.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowFingerprint {
    pub digest: String,
    pub season_hashes: BTreeMap<String, String>,
    /// season key → episode index (as string) → hash.
    pub episode_hashes: BTreeMap<String, BTreeMap<String, String>>,
}

/// Which slices of a show changed since the previous fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataChangeResult {
    pub changed_seasons: BTreeSet<String>,
    pub changed_episodes: BTreeMap<String, BTreeSet<String>>,
    /// A show-identity-level change not explained by any per-season hash.
    pub invalidate_all: bool,
    pub updated: bool,
}

/// Fingerprint a normalized show.
///
/// Episode hashes cover title/summary/air date/aliases/display number;
/// season hashes cover season-level fields only, so an episode edit never
/// shows up as a season change.
pub fn fingerprint(show: &Show) -> ShowFingerprint {
    let mut season_hashes = BTreeMap::new();
    let mut episode_hashes = BTreeMap::new();

    for season in &show.seasons {
        season_hashes.insert(
            season.key.clone(),
            hash_value(&serde_json::json!([
                season.key,
                season.title,
                season.summary,
                season.sort_title,
                season.round_number,
                season.display_number,
            ])),
        );
        let mut per_episode = BTreeMap::new();
        for episode in &season.episodes {
            per_episode.insert(
                episode.index.to_string(),
                hash_value(&serde_json::json!([
                    episode.title,
                    episode.summary,
                    episode.originally_available.map(|d| d.to_string()),
                    episode.aliases,
                    episode.display_number,
                ])),
            );
        }
        episode_hashes.insert(season.key.clone(), per_episode);
    }

    let mut hasher = Sha256::new();
    hasher.update(hash_value(&serde_json::json!([
        show.key,
        show.title,
        show.summary,
    ])));
    for (key, hash) in &season_hashes {
        hasher.update(key.as_bytes());
        hasher.update(hash.as_bytes());
    }
    for (season_key, per_episode) in &episode_hashes {
        hasher.update(season_key.as_bytes());
        for (episode_key, hash) in per_episode {
            hasher.update(episode_key.as_bytes());
            hasher.update(hash.as_bytes());
        }
    }

    ShowFingerprint {
        digest: hex::encode(hasher.finalize()),
        season_hashes,
        episode_hashes,
    }
}

fn hash_value(value: &serde_json::Value) -> String {
    let json = serde_json::to_string(value).unwrap_or_default();
    hex::encode(Sha256::digest(json.as_bytes()))
}

/// Persistence seam for the previous fingerprint per sport.
pub trait FingerprintStore: Send + Sync {
    fn load(&self, sport_id: &str) -> Option<ShowFingerprint>;
    fn save(&self, sport_id: &str, fingerprint: &ShowFingerprint);
}

/// JSON file per sport id under a directory.
pub struct DiskFingerprintStore {
    dir: PathBuf,
}

impl DiskFingerprintStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, sport_id: &str) -> PathBuf {
        self.dir.join(format!("{sport_id}.fingerprint.json"))
    }
}

impl FingerprintStore for DiskFingerprintStore {
    fn load(&self, sport_id: &str) -> Option<ShowFingerprint> {
        let path = self.path_for(sport_id);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "fingerprint read failed");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(fingerprint) => Some(fingerprint),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "fingerprint corrupt, ignoring");
                None
            }
        }
    }

    fn save(&self, sport_id: &str, fingerprint: &ShowFingerprint) {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "fingerprint dir create failed");
            return;
        }
        let path = self.path_for(sport_id);
        match serde_json::to_string(fingerprint) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(path = %path.display(), error = %e, "fingerprint write failed");
                }
            }
            Err(e) => warn!(error = %e, "fingerprint serialize failed"),
        }
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryFingerprintStore {
    entries: Mutex<HashMap<String, ShowFingerprint>>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintStore for MemoryFingerprintStore {
    fn load(&self, sport_id: &str) -> Option<ShowFingerprint> {
        self.entries.lock().ok()?.get(sport_id).cloned()
    }

    fn save(&self, sport_id: &str, fingerprint: &ShowFingerprint) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(sport_id.to_string(), fingerprint.clone());
        }
    }
}

/// Diffs fresh fingerprints against the stored one per sport.
///
/// Not internally synchronized; the caller runs at most one update per
/// sport id at a time.
pub struct FingerprintEngine {
    store: Arc<dyn FingerprintStore>,
}

impl FingerprintEngine {
    pub fn new(store: Arc<dyn FingerprintStore>) -> Self {
        Self { store }
    }

    /// Record `new` for `sport_id` and report what changed since the
    /// previous fingerprint. The first-ever call has nothing to diff
    /// against: it records and returns `updated = true` with empty sets.
    /// The new fingerprint always replaces the stored one.
    pub fn update(&self, sport_id: &str, new: &ShowFingerprint) -> MetadataChangeResult {
        let previous = self.store.load(sport_id);
        self.store.save(sport_id, new);
        match previous {
            None => MetadataChangeResult {
                updated: true,
                ..Default::default()
            },
            Some(old) => diff_fingerprints(&old, new),
        }
    }
}

fn diff_fingerprints(old: &ShowFingerprint, new: &ShowFingerprint) -> MetadataChangeResult {
    let mut changed_seasons = BTreeSet::new();
    let season_keys: BTreeSet<&String> = old
        .season_hashes
        .keys()
        .chain(new.season_hashes.keys())
        .collect();
    for key in season_keys {
        if old.season_hashes.get(key) != new.season_hashes.get(key) {
            changed_seasons.insert(key.clone());
        }
    }

    // Episodes are only diffed for still-existing seasons; added or removed
    // seasons are already reported whole.
    let mut changed_episodes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (season_key, new_episodes) in &new.episode_hashes {
        let Some(old_episodes) = old.episode_hashes.get(season_key) else {
            continue;
        };
        let episode_keys: BTreeSet<&String> =
            old_episodes.keys().chain(new_episodes.keys()).collect();
        let mut changed: BTreeSet<String> = BTreeSet::new();
        for key in episode_keys {
            if old_episodes.get(key) != new_episodes.get(key) {
                changed.insert(key.clone());
            }
        }
        if !changed.is_empty() {
            changed_episodes.insert(season_key.clone(), changed);
        }
    }

    let updated = old.digest != new.digest;
    let invalidate_all = updated && changed_seasons.is_empty() && changed_episodes.is_empty();

    MetadataChangeResult {
        changed_seasons,
        changed_episodes,
        invalidate_all,
        updated,
    }
}
