//! One full decision cycle: fetch → normalize → fingerprint → match →
//! extract → compare, the way the processor drives the library.

use std::sync::Arc;

use chrono::Utc;

use matchday_core::config::{Config, MetadataConfig};
use matchday_matcher::{AliasLookup, MatchOptions, compile, match_file};
use matchday_metadata::{
    FetchError, FetchStats, FingerprintEngine, MemoryCache, MemoryFingerprintStore,
    MetadataFetcher, RemoteResponse, RemoteSource, Validators, fingerprint, normalize,
};
use matchday_quality::{compare, effective_profile, extract};

const CONFIG: &str = r#"
settings:
  cache_dir: /tmp/matchday
  quality:
    cutoff: 400
    scoring:
      resolution: { "2160p": 300, "1080p": 200, "720p": 100 }
      source: { "webdl": 100, "hdtv": 50 }
      proper_bonus: 25
pattern_sets:
  round-session:
    - regex: '^(?:F1[._-])?(?P<round>\d+)[._-]*(?P<session>[A-Z0-9]+)'
      season: { mode: round, group: round }
      priority: 10
sports:
  formula1:
    title: Formula 1
    metadata:
      url: https://example.com/f1.yaml
      ttl_hours: 12
      show_key: formula1
    pattern_sets: [round-session]
    quality:
      scoring:
        resolution: { "1080p": 220 }
"#;

const DOCUMENT: &str = r#"
metadata:
  formula1:
    title: Formula 1
    seasons:
      bahrain:
        title: Bahrain Grand Prix
        sort_title: 01 Bahrain Grand Prix
        episodes:
          - title: Free Practice 1
            originally_available: "2026-03-06"
            aliases: [FP1]
          - title: Race
            originally_available: "2026-03-08"
"#;

struct OneShotSource {
    body: String,
}

#[async_trait::async_trait]
impl RemoteSource for OneShotSource {
    async fn get(
        &self,
        _url: &str,
        _validators: &Validators,
    ) -> Result<RemoteResponse, FetchError> {
        Ok(RemoteResponse::Body {
            text: self.body.clone(),
            etag: Some("\"v1\"".to_string()),
            last_modified: None,
        })
    }
}

fn metadata_cfg(config: &Config) -> MetadataConfig {
    config.sports["formula1"].metadata.clone()
}

#[tokio::test]
async fn full_refresh_and_match_cycle() {
    let config = Config::parse(CONFIG).unwrap();
    config.validate().unwrap();

    // Fetch and normalize the metadata document.
    let fetcher = MetadataFetcher::new(
        Arc::new(OneShotSource { body: DOCUMENT.to_string() }),
        Arc::new(MemoryCache::new()),
    );
    let mut stats = FetchStats::default();
    let document = fetcher
        .fetch_at(&metadata_cfg(&config), Utc::now(), &mut stats)
        .await
        .unwrap();
    let show = normalize(&document, "formula1").unwrap();
    assert_eq!(show.seasons[0].round_number, Some(1));

    // First fingerprint update has nothing to diff against.
    let engine = FingerprintEngine::new(Arc::new(MemoryFingerprintStore::new()));
    let changes = engine.update("formula1", &fingerprint(&show));
    assert!(changes.updated);
    assert!(changes.changed_seasons.is_empty());

    // Match a downloaded file against the show.
    let patterns = compile(&config.patterns_for(&config.sports["formula1"])).unwrap();
    let lookup = AliasLookup::build(&show, &config.sports["formula1"].team_aliases);
    let filename = "F1.01.FP1.2160p.F1TV.WEB-DL-EGORTECH.mkv";
    let outcome = match_file(
        filename,
        &show,
        &patterns,
        &lookup,
        &MatchOptions::default(),
        None,
    );
    let result = outcome.as_match().expect("file should match FP1");
    assert_eq!(result.season_key, "bahrain");
    assert_eq!(result.episode_index, 1);

    // Score the candidate against an existing 720p link.
    let profile = effective_profile(
        config.sports["formula1"].quality.as_ref(),
        &config.settings.quality,
    );
    // The sport override bumps 1080p while inheriting everything else.
    assert_eq!(profile.scoring.resolution["1080p"], 220);
    assert_eq!(profile.scoring.resolution["2160p"], 300);

    let info = extract(filename, Some(&result.groups.clone().into_iter().collect()));
    assert_eq!(info.resolution.as_deref(), Some("2160p"));
    assert_eq!(info.source.as_deref(), Some("webdl"));

    let comparison = compare(&info, Some(150), &profile);
    assert!(comparison.should_upgrade);
    assert_eq!(comparison.new_score.total, 400);

    // A second metadata refresh with an edited episode reports exactly that
    // episode as changed.
    let mut edited = show.clone();
    edited.seasons[0].episodes[1].summary = Some("Lights out at 18:00 local".to_string());
    let changes = engine.update("formula1", &fingerprint(&edited));
    assert_eq!(
        changes.changed_episodes["bahrain"],
        std::collections::BTreeSet::from(["2".to_string()])
    );
    assert!(changes.changed_seasons.is_empty());
}
