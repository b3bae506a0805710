//! Quality scoring and upgrade decisions.

use tracing::debug;

use matchday_core::quality::{
    QualityComparison, QualityInfo, QualityProfile, QualityScore, QualityScoring,
};

/// Convert extracted attributes into a weighted score.
///
/// Pure table lookups: an attribute that is absent, or present but not in
/// the profile's table, contributes zero.
pub fn score(info: &QualityInfo, profile: &QualityProfile) -> QualityScore {
    let scoring = &profile.scoring;
    let resolution_score = table_lookup(&scoring.resolution, info.resolution.as_deref());
    let source_score = table_lookup(&scoring.source, info.source.as_deref());
    let release_group_score = table_lookup(&scoring.release_group, info.release_group.as_deref());
    let proper_bonus = if info.is_proper {
        scoring.proper_bonus.unwrap_or(0)
    } else {
        0
    };
    let repack_bonus = if info.is_repack {
        scoring.repack_bonus.unwrap_or(0)
    } else {
        0
    };
    let hdr_bonus = if info.hdr_format.is_some() {
        scoring.hdr_bonus.unwrap_or(0)
    } else {
        0
    };

    let sum = resolution_score
        + source_score
        + release_group_score
        + proper_bonus
        + repack_bonus
        + hdr_bonus;

    QualityScore {
        total: sum.max(0),
        resolution_score,
        source_score,
        release_group_score,
        proper_bonus,
        repack_bonus,
        hdr_bonus,
    }
}

fn table_lookup(table: &std::collections::BTreeMap<String, i64>, key: Option<&str>) -> i64 {
    key.and_then(|k| table.get(k)).copied().unwrap_or(0)
}

/// Decide whether a candidate should replace the already-linked file.
pub fn compare(
    info: &QualityInfo,
    existing_score: Option<i64>,
    profile: &QualityProfile,
) -> QualityComparison {
    let new_score = score(info, profile);

    let Some(existing) = existing_score else {
        return verdict(true, "No existing file", false, new_score);
    };

    if let Some(min_score) = profile.min_score {
        if new_score.total < min_score {
            return verdict(
                false,
                format!("Score {} is below minimum score {}", new_score.total, min_score),
                false,
                new_score,
            );
        }
    }

    if let Some(cutoff) = profile.cutoff {
        if existing >= cutoff {
            // Past the cutoff only a fixed release gets through.
            if info.is_proper {
                return verdict(true, "PROPER release overrides cutoff", true, new_score);
            }
            if info.is_repack {
                return verdict(true, "REPACK release overrides cutoff", true, new_score);
            }
            return verdict(false, "Cutoff reached", true, new_score);
        }
    }

    if new_score.total > existing {
        verdict(
            true,
            format!("Higher quality ({} > {})", new_score.total, existing),
            false,
            new_score,
        )
    } else {
        verdict(
            false,
            format!("Not a quality upgrade ({} <= {})", new_score.total, existing),
            false,
            new_score,
        )
    }
}

fn verdict(
    should_upgrade: bool,
    reason: impl Into<String>,
    cutoff_reached: bool,
    new_score: QualityScore,
) -> QualityComparison {
    let reason = reason.into();
    debug!(should_upgrade, cutoff_reached, reason = reason.as_str(), "quality comparison");
    QualityComparison {
        should_upgrade,
        reason,
        cutoff_reached,
        new_score,
    }
}

/// Overlay a sport-level profile onto the global one.
///
/// Scalar fields take the sport value when set; each scoring table merges
/// key-wise with sport entries overriding and unset keys inherited.
pub fn effective_profile(
    sport: Option<&QualityProfile>,
    global: &QualityProfile,
) -> QualityProfile {
    let Some(sport) = sport else {
        return global.clone();
    };

    let mut scoring = QualityScoring {
        resolution: global.scoring.resolution.clone(),
        source: global.scoring.source.clone(),
        release_group: global.scoring.release_group.clone(),
        proper_bonus: sport.scoring.proper_bonus.or(global.scoring.proper_bonus),
        repack_bonus: sport.scoring.repack_bonus.or(global.scoring.repack_bonus),
        hdr_bonus: sport.scoring.hdr_bonus.or(global.scoring.hdr_bonus),
    };
    for (key, value) in &sport.scoring.resolution {
        scoring.resolution.insert(key.clone(), *value);
    }
    for (key, value) in &sport.scoring.source {
        scoring.source.insert(key.clone(), *value);
    }
    for (key, value) in &sport.scoring.release_group {
        scoring.release_group.insert(key.clone(), *value);
    }

    QualityProfile {
        enabled: sport.enabled.or(global.enabled),
        cutoff: sport.cutoff.or(global.cutoff),
        min_score: sport.min_score.or(global.min_score),
        scoring,
    }
}
