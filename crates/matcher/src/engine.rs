use std::collections::BTreeMap;

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tracing::{debug, warn};

use matchday_core::config::{PatternConfig, SeasonSelector};
use matchday_core::diag::{AttemptStatus, Diagnostic, MatchTrace, PatternAttempt};
use matchday_core::model::{Episode, Season, Show};

use crate::structured::{self, AliasLookup};

/// Raised only for malformed pattern configuration; ordinary non-matches
/// never error.
#[derive(Debug, Error)]
pub enum PatternError {
    #[error("pattern {index} (`{regex}`): {source}")]
    BadRegex {
        index: usize,
        regex: String,
        #[source]
        source: regex::Error,
    },
}

/// A pattern ready to run against filenames.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pub regex: Regex,
    pub selector: SeasonSelector,
    pub priority: i32,
}

/// Compile a sport's patterns, sorted by descending priority with source
/// order preserved on ties. Filenames are matched case-insensitively.
pub fn compile(patterns: &[PatternConfig]) -> Result<Vec<CompiledPattern>, PatternError> {
    let mut compiled = Vec::with_capacity(patterns.len());
    for (index, pattern) in patterns.iter().enumerate() {
        let regex = RegexBuilder::new(&pattern.regex)
            .case_insensitive(true)
            .build()
            .map_err(|source| PatternError::BadRegex {
                index,
                regex: pattern.regex.clone(),
                source,
            })?;
        compiled.push(CompiledPattern {
            regex,
            selector: pattern.season.clone(),
            priority: pattern.priority,
        });
    }
    // Stable sort keeps source order for equal priorities.
    compiled.sort_by_key(|p| std::cmp::Reverse(p.priority));
    Ok(compiled)
}

/// Knobs for one match run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchOptions {
    /// Demote season-resolution warnings to `ignored` and skip logging;
    /// used by high-volume preview scans.
    pub suppress_warnings: bool,
}

/// A successful resolution of a filename to a season + episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub season_key: String,
    pub season_index: u32,
    pub episode_index: u32,
    /// Source text of the winning pattern.
    pub pattern: String,
    pub groups: BTreeMap<String, String>,
    /// Diagnostics accumulated before the winning pattern resolved.
    pub diagnostics: Vec<Diagnostic>,
}

/// Outcome of matching one filename against a sport's patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    Matched(MatchResult),
    /// At least one pattern matched the filename but its season never
    /// resolved.
    SeasonUnresolved { diagnostics: Vec<Diagnostic> },
    /// A season resolved but no episode could be pinned down.
    EpisodeUnresolved { diagnostics: Vec<Diagnostic> },
    /// No pattern matched the filename at all.
    NoPatternMatched { diagnostics: Vec<Diagnostic> },
}

impl MatchOutcome {
    pub fn as_match(&self) -> Option<&MatchResult> {
        match self {
            Self::Matched(result) => Some(result),
            _ => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        match self {
            Self::Matched(result) => &result.diagnostics,
            Self::SeasonUnresolved { diagnostics }
            | Self::EpisodeUnresolved { diagnostics }
            | Self::NoPatternMatched { diagnostics } => diagnostics,
        }
    }
}

/// Resolve a filename to a season + episode of `show`.
///
/// Patterns are tried in compiled order; the first to resolve both season
/// and episode wins and the function returns immediately. Season-resolution
/// failures are diagnostics, not errors: the engine moves on to the next
/// pattern. Identical inputs always produce identical outcomes and
/// diagnostics.
pub fn match_file(
    filename: &str,
    show: &Show,
    patterns: &[CompiledPattern],
    lookup: &AliasLookup,
    options: &MatchOptions,
    mut trace: Option<&mut MatchTrace>,
) -> MatchOutcome {
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    let mut saw_season_unresolved = false;
    let mut saw_episode_unresolved = false;

    for pattern in patterns {
        let Some(caps) = pattern.regex.captures(filename) else {
            if let Some(trace) = trace.as_deref_mut() {
                trace.record(attempt(pattern, None, None, BTreeMap::new(), AttemptStatus::NoMatch));
            }
            continue;
        };

        let mut groups = BTreeMap::new();
        for name in pattern.regex.capture_names().flatten() {
            if let Some(m) = caps.name(name) {
                groups.insert(name.to_string(), m.as_str().to_string());
            }
        }

        let Some(season) = resolve_season(show, &pattern.selector, &groups, filename) else {
            let message = format!(
                "season not resolved for `{}` by pattern `{}`",
                filename,
                pattern.regex.as_str()
            );
            let diag = if options.suppress_warnings {
                Diagnostic::warning(&message).demoted()
            } else {
                warn!(filename, pattern = pattern.regex.as_str(), "season not resolved");
                Diagnostic::warning(&message)
            };
            diagnostics.push(diag);
            saw_season_unresolved = true;
            if let Some(trace) = trace.as_deref_mut() {
                trace.message(message);
                trace.record(attempt(pattern, None, None, groups, AttemptStatus::SeasonUnresolved));
            }
            continue;
        };

        let selector_group = selector_group(&pattern.selector);
        match resolve_episode(season, &groups, selector_group, filename, lookup) {
            Some(episode) => {
                debug!(
                    filename,
                    season = season.key.as_str(),
                    episode = episode.index,
                    pattern = pattern.regex.as_str(),
                    "matched"
                );
                if let Some(trace) = trace.as_deref_mut() {
                    trace.record(attempt(
                        pattern,
                        Some(season.key.clone()),
                        Some(episode.index),
                        groups.clone(),
                        AttemptStatus::Matched,
                    ));
                }
                return MatchOutcome::Matched(MatchResult {
                    season_key: season.key.clone(),
                    season_index: season.index,
                    episode_index: episode.index,
                    pattern: pattern.regex.as_str().to_string(),
                    groups,
                    diagnostics,
                });
            }
            None => {
                let message = format!(
                    "episode not resolved in season `{}` for `{}`",
                    season.key, filename
                );
                let diag = if options.suppress_warnings {
                    Diagnostic::warning(&message).demoted()
                } else {
                    Diagnostic::warning(&message)
                };
                diagnostics.push(diag);
                saw_episode_unresolved = true;
                if let Some(trace) = trace.as_deref_mut() {
                    trace.message(message);
                    trace.record(attempt(
                        pattern,
                        Some(season.key.clone()),
                        None,
                        groups,
                        AttemptStatus::EpisodeUnresolved,
                    ));
                }
            }
        }
    }

    if saw_episode_unresolved {
        MatchOutcome::EpisodeUnresolved { diagnostics }
    } else if saw_season_unresolved {
        MatchOutcome::SeasonUnresolved { diagnostics }
    } else {
        MatchOutcome::NoPatternMatched { diagnostics }
    }
}

fn attempt(
    pattern: &CompiledPattern,
    season: Option<String>,
    episode: Option<u32>,
    groups: BTreeMap<String, String>,
    status: AttemptStatus,
) -> PatternAttempt {
    PatternAttempt {
        pattern: pattern.regex.as_str().to_string(),
        season,
        episode,
        groups,
        status,
    }
}

fn selector_group(selector: &SeasonSelector) -> Option<&str> {
    match selector {
        SeasonSelector::Round { group } => Some(group.as_str()),
        SeasonSelector::Date { group } => group.as_deref(),
        SeasonSelector::Explicit { .. } => None,
    }
}

fn resolve_season<'a>(
    show: &'a Show,
    selector: &SeasonSelector,
    groups: &BTreeMap<String, String>,
    filename: &str,
) -> Option<&'a Season> {
    match selector {
        SeasonSelector::Round { group } => {
            let round: u32 = groups.get(group)?.trim().parse().ok()?;
            show.season_by_round(round)
        }
        SeasonSelector::Explicit { key, index } => key
            .as_deref()
            .and_then(|k| show.season(k))
            .or_else(|| index.and_then(|i| show.season_by_index(i))),
        SeasonSelector::Date { group } => {
            let date = group
                .as_deref()
                .and_then(|g| groups.get(g))
                .and_then(|v| structured::extract_date(v))
                .or_else(|| structured::extract_date(filename))?;
            show.seasons
                .iter()
                .find(|s| s.episodes.iter().any(|e| e.originally_available == Some(date)))
        }
    }
}

/// Direct alias/session lookup first, then structured fuzzy scoring.
fn resolve_episode<'a>(
    season: &'a Season,
    groups: &BTreeMap<String, String>,
    selector_group: Option<&str>,
    filename: &str,
    lookup: &AliasLookup,
) -> Option<&'a Episode> {
    let mut tokens: Vec<&str> = Vec::new();
    for name in ["session", "episode"] {
        if selector_group != Some(name) {
            if let Some(value) = groups.get(name) {
                tokens.push(value);
            }
        }
    }
    for (name, value) in groups {
        if selector_group == Some(name.as_str()) || tokens.contains(&value.as_str()) {
            continue;
        }
        if name != "session" && name != "episode" {
            tokens.push(value);
        }
    }

    for token in tokens {
        if let Some(episode) = season.episodes.iter().find(|e| e.is_known_as(token)) {
            return Some(episode);
        }
        if token.len() >= 3 {
            let lowered = token.to_lowercase();
            if let Some(episode) = season
                .episodes
                .iter()
                .find(|e| e.title.to_lowercase().contains(&lowered))
            {
                return Some(episode);
            }
        }
        if let Ok(number) = token.trim().parse::<u32>() {
            if let Some(episode) = season
                .episodes
                .iter()
                .find(|e| e.display_number == Some(number))
                .or_else(|| season.episode(number))
            {
                return Some(episode);
            }
        }
    }

    // Fuzzy fallback: score every episode against the structured name.
    let structured = structured::parse(filename, lookup);
    let mut best: Option<(&Episode, f64)> = None;
    for episode in &season.episodes {
        let score = structured::score_structured_match(&structured, season, episode, lookup);
        if score >= 0.5 && best.map_or(true, |(_, b)| score > b) {
            best = Some((episode, score));
        }
    }
    best.map(|(episode, _)| episode)
}
