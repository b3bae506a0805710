use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Severity attached to a match diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    /// A demoted warning: the fact is kept for aggregation but not logged.
    Ignored,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Ignored => "ignored",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One fact about why a file did or did not match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self { severity: Severity::Info, message: message.into() }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, message: message.into() }
    }

    /// Demote to [`Severity::Ignored`], keeping the message.
    pub fn demoted(mut self) -> Self {
        self.severity = Severity::Ignored;
        self
    }
}

/// Terminal status of one pattern attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    NoMatch,
    SeasonUnresolved,
    EpisodeUnresolved,
    Matched,
}

impl AttemptStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoMatch => "no_match",
            Self::SeasonUnresolved => "season_unresolved",
            Self::EpisodeUnresolved => "episode_unresolved",
            Self::Matched => "matched",
        }
    }
}

impl std::fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a single pattern tried against a filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternAttempt {
    pub pattern: String,
    pub season: Option<String>,
    pub episode: Option<u32>,
    pub groups: BTreeMap<String, String>,
    pub status: AttemptStatus,
}

/// Optional trace of a whole match run, sufficient to reconstruct why a
/// file matched or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTrace {
    /// Status of the run as a whole; mirrors the final attempt.
    pub status: Option<AttemptStatus>,
    pub attempts: Vec<PatternAttempt>,
    pub messages: Vec<String>,
}

impl MatchTrace {
    pub fn record(&mut self, attempt: PatternAttempt) {
        self.status = Some(attempt.status);
        self.attempts.push(attempt);
    }

    pub fn message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }
}
