pub mod engine;
pub mod structured;

pub use engine::{
    CompiledPattern, MatchOptions, MatchOutcome, MatchResult, PatternError, compile, match_file,
};
pub use structured::{AliasLookup, StructuredName, parse, score_structured_match};
