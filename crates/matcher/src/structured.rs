use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use matchday_core::model::{Episode, Season, Show};

/// Loosely structured facts pulled out of one filename.
///
/// Ephemeral: built per file, for sports matched by team pairing rather than
/// strict pattern regex. Parsing never fails; unresolved tokens are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredName {
    pub raw: String,
    pub date: Option<NaiveDate>,
    pub teams: Vec<String>,
    pub round: Option<u32>,
    pub session: Option<String>,
}

// YYYY-MM-DD / YYYY.MM.DD / YYYY_MM_DD
static RE_DATE_YMD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})[-._ ](\d{2})[-._ ](\d{2})\b").unwrap());

// DD.MM.YYYY
static RE_DATE_DMY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2})[-._ ](\d{2})[-._ ](\d{4})\b").unwrap());

// Compact YYYYMMDD
static RE_DATE_COMPACT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b(\d{8})\b").unwrap());

// Round 5 / Rnd05 / R05 / Week 12
static RE_ROUND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:round|rnd|week|r)[. _-]?(\d{1,3})\b").unwrap());

// Game 3 (playoff series position doubles as a session marker)
static RE_GAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bgame[. _-]?(\d{1,2})\b").unwrap());

/// Session keywords recognized across sports.
static SESSION_KEYWORDS: &[&str] = &[
    "fp1",
    "fp2",
    "fp3",
    "q1",
    "q2",
    "q3",
    "qualifying",
    "quali",
    "sprint",
    "shootout",
    "race",
    "practice",
    "highlights",
];

/// Lowercased alias → canonical team name.
///
/// Seeded from the show's episode titles (each side of a "vs" pairing plus
/// its trailing nickname word), then overlaid with per-sport config entries.
#[derive(Debug, Clone, Default)]
pub struct AliasLookup {
    names: HashMap<String, String>,
}

impl AliasLookup {
    pub fn build(show: &Show, overrides: &BTreeMap<String, String>) -> Self {
        let mut lookup = Self::default();
        for season in &show.seasons {
            for episode in &season.episodes {
                for team in title_teams(&episode.title) {
                    lookup.insert(&team, &team);
                    // Trailing word covers nickname-only filenames
                    // ("Celtics" for "Boston Celtics").
                    if let Some(nick) = team.rsplit(' ').next() {
                        if nick.len() >= 3 && nick != team {
                            lookup.insert(nick, &team);
                        }
                    }
                }
            }
        }
        for (alias, canonical) in overrides {
            lookup.insert(alias, canonical);
        }
        lookup
    }

    fn insert(&mut self, alias: &str, canonical: &str) {
        self.names
            .insert(alias.trim().to_lowercase(), canonical.trim().to_string());
    }

    /// Resolve an alias to its canonical team name.
    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.names
            .get(token.trim().to_lowercase().as_str())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Split a head-to-head episode title into its two team names.
///
/// Returns an empty vec for titles that are not team pairings.
pub fn title_teams(title: &str) -> Vec<String> {
    static RE_PAIR: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\s+(?:vs\.?|v\.?|at|@)\s+").unwrap());
    let Some(m) = RE_PAIR.find(title) else {
        return Vec::new();
    };
    let left = title[..m.start()].trim();
    let right = title[m.end()..].trim();
    // A trailing qualifier after the pairing ("... vs Heat Game 3") stays on
    // the right side token; strip round/game noise before accepting it.
    let right = RE_GAME.replace(right, "");
    let right = right.trim().trim_end_matches(['-', '.', ',']).trim();
    if left.is_empty() || right.is_empty() {
        return Vec::new();
    }
    vec![left.to_string(), right.to_string()]
}

/// Parse a filename into a [`StructuredName`].
pub fn parse(raw: &str, lookup: &AliasLookup) -> StructuredName {
    let stem = strip_extension(raw);
    StructuredName {
        raw: raw.to_string(),
        date: extract_date(stem),
        teams: extract_teams(stem, lookup),
        round: RE_ROUND
            .captures(stem)
            .and_then(|c| c[1].parse().ok()),
        session: extract_session(stem),
    }
}

/// Pull the first plausible date out of a filename, trying several formats.
pub fn extract_date(stem: &str) -> Option<NaiveDate> {
    if let Some(caps) = RE_DATE_YMD.captures(stem) {
        if let Some(date) = ymd(&caps[1], &caps[2], &caps[3]) {
            return Some(date);
        }
    }
    if let Some(caps) = RE_DATE_DMY.captures(stem) {
        if let Some(date) = ymd(&caps[3], &caps[2], &caps[1]) {
            return Some(date);
        }
    }
    if let Some(caps) = RE_DATE_COMPACT.captures(stem) {
        let raw = &caps[1];
        if let Some(date) = ymd(&raw[..4], &raw[4..6], &raw[6..8]) {
            return Some(date);
        }
    }
    None
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}

fn extract_session(stem: &str) -> Option<String> {
    let cleaned = clean_tokens(stem);
    for token in cleaned.split(' ') {
        if SESSION_KEYWORDS.contains(&token) {
            return Some(token.to_string());
        }
    }
    RE_GAME
        .captures(stem)
        .map(|c| format!("game {}", c[1].parse::<u32>().unwrap_or(0)))
}

/// Resolve team names via the alias lookup, longest window first so
/// multi-word names win over their nickname fragments.
fn extract_teams(stem: &str, lookup: &AliasLookup) -> Vec<String> {
    let cleaned = clean_tokens(stem);
    let words: Vec<&str> = cleaned.split(' ').filter(|w| !w.is_empty()).collect();
    let mut teams: Vec<String> = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let mut advanced = false;
        for window in (1..=3.min(words.len() - i)).rev() {
            let candidate = words[i..i + window].join(" ");
            if let Some(canonical) = lookup.resolve(&candidate) {
                if !teams.iter().any(|t| t == canonical) {
                    teams.push(canonical.to_string());
                }
                i += window;
                advanced = true;
                break;
            }
        }
        if !advanced {
            i += 1;
        }
    }
    teams
}

fn clean_tokens(stem: &str) -> String {
    stem.replace(['.', '_', '-'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

static VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "flv", "webm", "ts", "mpg", "mpeg", "ogv",
];

fn strip_extension(raw: &str) -> &str {
    match raw.rfind('.') {
        Some(pos) if VIDEO_EXTENSIONS.contains(&raw[pos + 1..].to_lowercase().as_str()) => {
            &raw[..pos]
        }
        _ => raw,
    }
}

/// Score how well a structured name fits one episode, in `[0, 1]`.
///
/// Team evidence is all-or-nothing: unless the filename's team set equals
/// exactly the set implied by the episode title, the score is 0.0. A partial
/// overlap (one team right, one wrong) is a different fixture and must never
/// be treated as a weak match.
pub fn score_structured_match(
    structured: &StructuredName,
    season: &Season,
    episode: &Episode,
    lookup: &AliasLookup,
) -> f64 {
    // A round in the filename that contradicts the season is disqualifying.
    if let (Some(round), Some(season_round)) = (structured.round, season.round_number) {
        if round != season_round {
            return 0.0;
        }
    }

    let date_matches = match (structured.date, episode.originally_available) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    };
    let session_matches = structured
        .session
        .as_deref()
        .is_some_and(|s| session_hits_episode(s, episode));

    if structured.teams.is_empty() {
        // No team evidence: date and session alone can carry a match.
        let mut score = 0.0;
        if date_matches {
            score += 0.6;
        }
        if session_matches {
            score += 0.4;
        }
        return score;
    }

    let implied: BTreeSet<String> = title_teams(&episode.title)
        .iter()
        .map(|side| {
            lookup
                .resolve(side)
                .map(str::to_string)
                .unwrap_or_else(|| side.trim().to_string())
        })
        .map(|t| t.to_lowercase())
        .collect();
    let ours: BTreeSet<String> = structured.teams.iter().map(|t| t.to_lowercase()).collect();

    if implied.is_empty() || ours != implied {
        return 0.0;
    }

    let mut score: f64 = 0.6;
    if date_matches {
        score += 0.3;
    }
    if session_matches {
        score += 0.1;
    }
    score.min(1.0)
}

fn session_hits_episode(session: &str, episode: &Episode) -> bool {
    episode.is_known_as(session) || episode.title.to_lowercase().contains(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nba_show() -> Show {
        Show {
            key: "nba".into(),
            title: "NBA".into(),
            summary: None,
            seasons: vec![Season {
                key: "playoffs-2026".into(),
                title: "Playoffs 2026".into(),
                summary: None,
                index: 1,
                display_number: Some(1),
                round_number: Some(1),
                sort_title: None,
                episodes: vec![
                    Episode {
                        title: "Boston Celtics vs Miami Heat".into(),
                        summary: None,
                        originally_available: NaiveDate::from_ymd_opt(2026, 4, 20),
                        index: 1,
                        display_number: Some(1),
                        aliases: vec![],
                    },
                    Episode {
                        title: "Indiana Pacers vs Boston Celtics".into(),
                        summary: None,
                        originally_available: NaiveDate::from_ymd_opt(2026, 4, 22),
                        index: 2,
                        display_number: Some(2),
                        aliases: vec![],
                    },
                ],
            }],
        }
    }

    #[test]
    fn lookup_resolves_full_names_and_nicknames() {
        let lookup = AliasLookup::build(&nba_show(), &BTreeMap::new());
        assert_eq!(lookup.resolve("boston celtics"), Some("Boston Celtics"));
        assert_eq!(lookup.resolve("Celtics"), Some("Boston Celtics"));
        assert_eq!(lookup.resolve("PACERS"), Some("Indiana Pacers"));
        assert_eq!(lookup.resolve("lakers"), None);
    }

    #[test]
    fn overrides_extend_the_lookup() {
        let mut overrides = BTreeMap::new();
        overrides.insert("bos".to_string(), "Boston Celtics".to_string());
        let lookup = AliasLookup::build(&nba_show(), &overrides);
        assert_eq!(lookup.resolve("BOS"), Some("Boston Celtics"));
    }

    #[test]
    fn parse_extracts_teams_date_and_session() {
        let lookup = AliasLookup::build(&nba_show(), &BTreeMap::new());
        let s = parse("NBA.2026.04.22.Pacers.vs.Celtics.1080p.WEB.mkv", &lookup);
        assert_eq!(s.date, NaiveDate::from_ymd_opt(2026, 4, 22));
        assert_eq!(s.teams, vec!["Indiana Pacers", "Boston Celtics"]);
        assert_eq!(s.session, None);
    }

    #[test]
    fn parse_reads_dmy_and_compact_dates() {
        let lookup = AliasLookup::default();
        assert_eq!(
            parse("Race.06.03.2026.mkv", &lookup).date,
            NaiveDate::from_ymd_opt(2026, 3, 6)
        );
        assert_eq!(
            parse("Race.20260306.mkv", &lookup).date,
            NaiveDate::from_ymd_opt(2026, 3, 6)
        );
    }

    #[test]
    fn parse_reads_round_and_session_keywords() {
        let lookup = AliasLookup::default();
        let s = parse("F1.Round.05.Sprint.1080p.mkv", &lookup);
        assert_eq!(s.round, Some(5));
        assert_eq!(s.session.as_deref(), Some("sprint"));
    }

    #[test]
    fn parse_never_fails_on_noise() {
        let lookup = AliasLookup::default();
        let s = parse("!!!.mkv", &lookup);
        assert_eq!(s.date, None);
        assert!(s.teams.is_empty());
        assert_eq!(s.round, None);
    }

    #[test]
    fn exact_team_set_scores_above_threshold() {
        let show = nba_show();
        let lookup = AliasLookup::build(&show, &BTreeMap::new());
        let season = &show.seasons[0];
        let s = parse("Pacers.vs.Celtics.2026.04.22.mkv", &lookup);
        let score = score_structured_match(&s, season, &season.episodes[1], &lookup);
        assert!(score >= 0.9, "teams + date should score high, got {score}");
    }

    #[test]
    fn partial_team_overlap_scores_exactly_zero() {
        // Regression: "Pacers vs Celtics" against "Celtics vs Heat" shares
        // one team and must not be a weak match.
        let show = nba_show();
        let lookup = AliasLookup::build(&show, &BTreeMap::new());
        let season = &show.seasons[0];
        let s = parse("Pacers.vs.Celtics.mkv", &lookup);
        let score = score_structured_match(&s, season, &season.episodes[0], &lookup);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn reversed_team_order_still_matches() {
        let show = nba_show();
        let lookup = AliasLookup::build(&show, &BTreeMap::new());
        let season = &show.seasons[0];
        let s = parse("Celtics.vs.Pacers.mkv", &lookup);
        let score = score_structured_match(&s, season, &season.episodes[1], &lookup);
        assert!(score > 0.0);
    }

    #[test]
    fn contradicting_round_disqualifies() {
        let show = nba_show();
        let lookup = AliasLookup::build(&show, &BTreeMap::new());
        let season = &show.seasons[0];
        let s = parse("Round.7.Pacers.vs.Celtics.mkv", &lookup);
        assert_eq!(
            score_structured_match(&s, season, &season.episodes[1], &lookup),
            0.0
        );
    }

    #[test]
    fn date_and_session_alone_can_match() {
        let show = Show {
            key: "f1".into(),
            title: "Formula 1".into(),
            summary: None,
            seasons: vec![Season {
                key: "r1".into(),
                title: "Bahrain".into(),
                summary: None,
                index: 1,
                display_number: Some(1),
                round_number: Some(1),
                sort_title: None,
                episodes: vec![Episode {
                    title: "Qualifying".into(),
                    summary: None,
                    originally_available: NaiveDate::from_ymd_opt(2026, 3, 7),
                    index: 1,
                    display_number: Some(1),
                    aliases: vec![],
                }],
            }],
        };
        let lookup = AliasLookup::build(&show, &BTreeMap::new());
        let season = &show.seasons[0];
        let s = parse("F1.2026.03.07.Qualifying.mkv", &lookup);
        let score = score_structured_match(&s, season, &season.episodes[0], &lookup);
        assert_eq!(score, 1.0);

        let no_evidence = parse("F1.Nothing.Useful.mkv", &lookup);
        assert_eq!(
            score_structured_match(&no_evidence, season, &season.episodes[0], &lookup),
            0.0
        );
    }
}
