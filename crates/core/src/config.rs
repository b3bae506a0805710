use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::quality::QualityProfile;

/// How a pattern's capture maps onto a season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SeasonSelector {
    /// A numeric capture group equal to the season's round number.
    Round { group: String },
    /// A literal season, by document key or 1-based index.
    Explicit {
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        index: Option<u32>,
    },
    /// A captured (or structurally parsed) date matched against episode
    /// air dates; the owning season wins.
    Date {
        #[serde(default)]
        group: Option<String>,
    },
}

/// One filename pattern for a sport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternConfig {
    pub regex: String,
    pub season: SeasonSelector,
    /// Higher priority is tried first; ties keep source order.
    #[serde(default)]
    pub priority: i32,
}

/// Where a sport's metadata document lives and how long to trust it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataConfig {
    pub url: String,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: i64,
    /// Key under the document's top-level `metadata` mapping.
    pub show_key: String,
}

fn default_ttl_hours() -> i64 {
    24
}

/// A configured content category: metadata source, patterns, quality policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportConfig {
    pub title: String,
    pub metadata: MetadataConfig,
    /// Names of pattern sets in [`Config::pattern_sets`], in try order.
    #[serde(default)]
    pub pattern_sets: Vec<String>,
    /// Destination path template for the external linker, e.g.
    /// `{show}/{season}/{episode}`.
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub quality: Option<QualityProfile>,
    /// Extra alias → canonical-team entries overlaid on the metadata-derived
    /// lookup.
    #[serde(default)]
    pub team_aliases: BTreeMap<String, String>,
}

/// Global settings shared by all sports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub quality: QualityProfile,
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            request_timeout_secs: default_request_timeout_secs(),
            quality: QualityProfile::default(),
        }
    }
}

/// Whole configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub pattern_sets: BTreeMap<String, Vec<PatternConfig>>,
    #[serde(default)]
    pub sports: BTreeMap<String, SportConfig>,
}

impl Config {
    /// Load from a YAML or JSON file and validate.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::parse(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from a string, accepting JSON first and YAML second.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str(raw) {
            Ok(config) => Ok(config),
            Err(json_err) => serde_yaml::from_str(raw).map_err(|yaml_err| {
                ConfigError::Parse(format!("not JSON ({json_err}) nor YAML ({yaml_err})"))
            }),
        }
    }

    /// Structural validation. Regex syntax is checked when patterns are
    /// compiled, which callers also do at load time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (set_name, patterns) in &self.pattern_sets {
            for (index, pattern) in patterns.iter().enumerate() {
                validate_selector(set_name, index, &pattern.season)?;
            }
        }
        for (sport_id, sport) in &self.sports {
            for set in &sport.pattern_sets {
                if !self.pattern_sets.contains_key(set) {
                    return Err(ConfigError::UnknownPatternSet {
                        sport: sport_id.clone(),
                        set: set.clone(),
                    });
                }
            }
            if sport.metadata.ttl_hours < 1 {
                return Err(ConfigError::InvalidTtl {
                    sport: sport_id.clone(),
                });
            }
        }
        Ok(())
    }

    /// All patterns for a sport, concatenated in pattern-set order.
    ///
    /// Callers must have validated the config; unknown sets are skipped here.
    pub fn patterns_for(&self, sport: &SportConfig) -> Vec<PatternConfig> {
        sport
            .pattern_sets
            .iter()
            .filter_map(|set| self.pattern_sets.get(set))
            .flatten()
            .cloned()
            .collect()
    }
}

fn validate_selector(
    set: &str,
    index: usize,
    selector: &SeasonSelector,
) -> Result<(), ConfigError> {
    let reason = match selector {
        SeasonSelector::Round { group } if group.is_empty() => {
            Some("round selector needs a capture group name".to_string())
        }
        SeasonSelector::Explicit { key: None, index: None } => {
            Some("explicit selector needs a season key or index".to_string())
        }
        SeasonSelector::Date { group: Some(group) } if group.is_empty() => {
            Some("date selector group name must not be empty".to_string())
        }
        _ => None,
    };
    match reason {
        Some(reason) => Err(ConfigError::InvalidSelector {
            set: set.to_string(),
            index,
            reason,
        }),
        None => Ok(()),
    }
}
