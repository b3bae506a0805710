use thiserror::Error;

/// Configuration problems, raised eagerly at load time so bad config fails
/// before any file is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(String),

    #[error("sport `{sport}` references unknown pattern set `{set}`")]
    UnknownPatternSet { sport: String, set: String },

    #[error("pattern set `{set}`, pattern {index}: {reason}")]
    InvalidSelector {
        set: String,
        index: usize,
        reason: String,
    },

    #[error("sport `{sport}`: metadata ttl_hours must be at least 1")]
    InvalidTtl { sport: String },
}
