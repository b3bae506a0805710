use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Quality attributes extracted from a release filename.
///
/// Immutable value object; every field is optional because extraction never
/// fails, it just leaves unrecognized axes empty. Round-trips losslessly
/// through a plain JSON object mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityInfo {
    #[serde(default)]
    pub resolution: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub release_group: Option<String>,
    #[serde(default)]
    pub is_proper: bool,
    #[serde(default)]
    pub is_repack: bool,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub hdr_format: Option<String>,
    #[serde(default)]
    pub frame_rate: Option<u32>,
    #[serde(default)]
    pub bit_depth: Option<u32>,
    #[serde(default)]
    pub audio: Option<String>,
    #[serde(default)]
    pub broadcaster: Option<String>,
}

impl QualityInfo {
    /// Serialize to a plain JSON object mapping.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Rebuild from a mapping produced by [`QualityInfo::to_value`].
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }
}

/// Weight tables and bonuses that turn a [`QualityInfo`] into a score.
///
/// `None` bonuses mean "inherit" when profiles are merged; an effective
/// profile treats them as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScoring {
    #[serde(default)]
    pub resolution: BTreeMap<String, i64>,
    #[serde(default)]
    pub source: BTreeMap<String, i64>,
    #[serde(default)]
    pub release_group: BTreeMap<String, i64>,
    #[serde(default)]
    pub proper_bonus: Option<i64>,
    #[serde(default)]
    pub repack_bonus: Option<i64>,
    #[serde(default)]
    pub hdr_bonus: Option<i64>,
}

/// Upgrade policy for one sport (or the global default).
///
/// Scalar fields are optional so a sport-level profile can state only what
/// it overrides; see `effective_profile` in `matchday-quality`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityProfile {
    #[serde(default)]
    pub enabled: Option<bool>,
    /// Score at which upgrades stop (PROPER/REPACK excepted).
    #[serde(default)]
    pub cutoff: Option<i64>,
    /// Score below which a candidate is rejected outright.
    #[serde(default)]
    pub min_score: Option<i64>,
    #[serde(default)]
    pub scoring: QualityScoring,
}

impl QualityProfile {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

/// Score breakdown for one candidate file. `total` is the sum of all
/// components and is never negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityScore {
    pub total: i64,
    pub resolution_score: i64,
    pub source_score: i64,
    pub release_group_score: i64,
    pub proper_bonus: i64,
    pub repack_bonus: i64,
    pub hdr_bonus: i64,
}

/// Verdict on whether a candidate should replace the linked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityComparison {
    pub should_upgrade: bool,
    pub reason: String,
    pub cutoff_reached: bool,
    pub new_score: QualityScore,
}
