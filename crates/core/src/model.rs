use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A show's full metadata tree.
///
/// Rebuilt fresh from the metadata document on every fetch; nothing here is
/// mutated in place. Index fields are stable 1-based positions assigned at
/// normalization time, in metadata-source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub seasons: Vec<Season>,
}

impl Show {
    /// Look up a season by its document key.
    pub fn season(&self, key: &str) -> Option<&Season> {
        self.seasons.iter().find(|s| s.key == key)
    }

    /// Look up a season by its round number.
    pub fn season_by_round(&self, round: u32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.round_number == Some(round))
    }

    /// Look up a season by its 1-based position.
    pub fn season_by_index(&self, index: u32) -> Option<&Season> {
        self.seasons.iter().find(|s| s.index == index)
    }
}

/// One season (for most sports: one event/round) of a show.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    /// 1-based position in the metadata document.
    pub index: u32,
    #[serde(default)]
    pub display_number: Option<u32>,
    #[serde(default)]
    pub round_number: Option<u32>,
    #[serde(default)]
    pub sort_title: Option<String>,
    pub episodes: Vec<Episode>,
}

impl Season {
    /// Look up an episode by its 1-based position.
    pub fn episode(&self, index: u32) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.index == index)
    }
}

/// One episode (session, game, ...) of a season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub originally_available: Option<NaiveDate>,
    /// 1-based position in the metadata document.
    pub index: u32,
    #[serde(default)]
    pub display_number: Option<u32>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl Episode {
    /// Case-insensitive test against the episode title and aliases.
    pub fn is_known_as(&self, name: &str) -> bool {
        self.title.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_show() -> Show {
        Show {
            key: "f1".into(),
            title: "Formula 1".into(),
            summary: None,
            seasons: vec![Season {
                key: "bahrain".into(),
                title: "Bahrain Grand Prix".into(),
                summary: None,
                index: 1,
                display_number: Some(1),
                round_number: Some(1),
                sort_title: Some("01 Bahrain".into()),
                episodes: vec![Episode {
                    title: "Free Practice 1".into(),
                    summary: None,
                    originally_available: NaiveDate::from_ymd_opt(2026, 3, 6),
                    index: 1,
                    display_number: Some(1),
                    aliases: vec!["FP1".into()],
                }],
            }],
        }
    }

    #[test]
    fn season_lookup_by_key_and_round() {
        let show = sample_show();
        assert!(show.season("bahrain").is_some());
        assert!(show.season("monaco").is_none());
        assert_eq!(show.season_by_round(1).unwrap().key, "bahrain");
        assert!(show.season_by_round(99).is_none());
    }

    #[test]
    fn episode_alias_is_case_insensitive() {
        let show = sample_show();
        let ep = &show.seasons[0].episodes[0];
        assert!(ep.is_known_as("fp1"));
        assert!(ep.is_known_as("Free practice 1"));
        assert!(!ep.is_known_as("fp2"));
    }
}
