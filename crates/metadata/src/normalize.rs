//! Normalization of raw metadata documents into [`Show`] trees.
//!
//! Wire shape: top-level `metadata` → per-show key → `{title, summary,
//! seasons: {seasonKey: {title, sort_title, episodes: [...]}}}`. The tree is
//! rebuilt fresh on every fetch; indexes are 1-based positions in document
//! order.

use chrono::NaiveDate;
use serde_json::Value;

use matchday_core::model::{Episode, Season, Show};

use crate::NormalizeError;

/// Build a [`Show`] from a fetched document.
pub fn normalize(document: &Value, show_key: &str) -> Result<Show, NormalizeError> {
    let shows = document
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or(NormalizeError::MissingMetadata)?;
    let show_doc = shows
        .get(show_key)
        .ok_or_else(|| NormalizeError::ShowNotFound(show_key.to_string()))?;

    let mut seasons = Vec::new();
    if let Some(seasons_doc) = show_doc.get("seasons").and_then(Value::as_object) {
        for (position, (key, season_doc)) in seasons_doc.iter().enumerate() {
            seasons.push(normalize_season(key, season_doc, position as u32 + 1));
        }
    }

    // Sequential-position fallback for round/display numbers applies per
    // show, and only when no season anywhere carries a numeric hint. A show
    // that mixes hinted and hintless seasons keeps the gaps.
    if seasons.iter().all(|s| s.round_number.is_none()) {
        for (position, season) in seasons.iter_mut().enumerate() {
            season.round_number = Some(position as u32 + 1);
            season.display_number = Some(position as u32 + 1);
        }
    }

    Ok(Show {
        key: show_key.to_string(),
        title: str_field(show_doc, "title").unwrap_or_else(|| show_key.to_string()),
        summary: str_field(show_doc, "summary"),
        seasons,
    })
}

fn normalize_season(key: &str, season_doc: &Value, index: u32) -> Season {
    let title = str_field(season_doc, "title").unwrap_or_else(|| key.to_string());
    let sort_title = str_field(season_doc, "sort_title");
    // "01 Bahrain" style sort titles carry the round; the title is the
    // fallback hint.
    let hint = sort_title
        .as_deref()
        .and_then(first_integer)
        .or_else(|| first_integer(&title));

    let mut episodes = Vec::new();
    if let Some(episode_docs) = season_doc.get("episodes").and_then(Value::as_array) {
        for (position, episode_doc) in episode_docs.iter().enumerate() {
            episodes.push(normalize_episode(episode_doc, position as u32 + 1));
        }
    }

    Season {
        key: key.to_string(),
        title,
        summary: str_field(season_doc, "summary"),
        index,
        display_number: hint,
        round_number: hint,
        sort_title,
        episodes,
    }
}

fn normalize_episode(episode_doc: &Value, index: u32) -> Episode {
    Episode {
        title: str_field(episode_doc, "title").unwrap_or_else(|| format!("Episode {index}")),
        summary: str_field(episode_doc, "summary"),
        originally_available: str_field(episode_doc, "originally_available")
            .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()),
        index,
        display_number: episode_doc
            .get("episode_number")
            .and_then(Value::as_u64)
            .map(|n| n as u32)
            .or(Some(index)),
        aliases: episode_doc
            .get("aliases")
            .and_then(Value::as_array)
            .map(|aliases| {
                aliases
                    .iter()
                    .filter_map(|a| a.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default(),
    }
}

fn str_field(doc: &Value, field: &str) -> Option<String> {
    doc.get(field).and_then(Value::as_str).map(str::to_string)
}

/// First run of ASCII digits in a string, as a number.
fn first_integer(text: &str) -> Option<u32> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
