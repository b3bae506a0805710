//! TTL + conditional-revalidation fetch of metadata documents.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, warn};

use matchday_core::config::MetadataConfig;

use crate::FetchError;
use crate::cache::{CacheEntry, CacheStore};
use crate::source::{RemoteResponse, RemoteSource, Validators};

/// Counters accumulated across fetches, surfaced to the caller for
/// per-sport reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub network_requests: u64,
    pub not_modified: u64,
    pub stale_used: u64,
    pub failures: u64,
}

/// Fetches metadata documents through an injected transport and cache.
///
/// No internal synchronization: the caller serializes refreshes per sport,
/// at most one fetch cycle per source at a time.
pub struct MetadataFetcher {
    source: Arc<dyn RemoteSource>,
    cache: Arc<dyn CacheStore>,
}

impl MetadataFetcher {
    pub fn new(source: Arc<dyn RemoteSource>, cache: Arc<dyn CacheStore>) -> Self {
        Self { source, cache }
    }

    /// Fetch the document configured by `cfg`.
    ///
    /// A fresh cache entry short-circuits with zero network calls. Otherwise
    /// one conditional GET is issued; any failure falls back to the last
    /// cached body regardless of expiry. Only a failure with no cached body
    /// at all raises.
    pub async fn fetch(
        &self,
        cfg: &MetadataConfig,
        stats: &mut FetchStats,
    ) -> Result<serde_json::Value, FetchError> {
        self.fetch_at(cfg, Utc::now(), stats).await
    }

    /// [`MetadataFetcher::fetch`] with an explicit clock, so TTL behavior is
    /// testable without sleeping.
    pub async fn fetch_at(
        &self,
        cfg: &MetadataConfig,
        now: DateTime<Utc>,
        stats: &mut FetchStats,
    ) -> Result<serde_json::Value, FetchError> {
        let cached = self.cache.load(&cfg.url);

        if let Some(entry) = &cached {
            if entry.is_fresh(now) {
                stats.cache_hits += 1;
                debug!(url = cfg.url.as_str(), "metadata cache hit");
                return Ok(entry.content.clone());
            }
        }
        stats.cache_misses += 1;

        let validators = cached
            .as_ref()
            .map(CacheEntry::validators)
            .unwrap_or_default();
        let ttl = TimeDelta::hours(cfg.ttl_hours);

        stats.network_requests += 1;
        match self.source.get(&cfg.url, &validators).await {
            Ok(RemoteResponse::NotModified) => {
                stats.not_modified += 1;
                match cached {
                    Some(mut entry) => {
                        // Same body, new lease; no re-parse.
                        entry.fetched_at = now;
                        entry.expires_at = now + ttl;
                        self.cache.store(&entry);
                        Ok(entry.content)
                    }
                    None => {
                        stats.failures += 1;
                        Err(FetchError::Unavailable(
                            "server answered 304 but nothing is cached".to_string(),
                        ))
                    }
                }
            }
            Ok(RemoteResponse::Body {
                text,
                etag,
                last_modified,
            }) => match parse_document(&text) {
                Ok(content) => {
                    let entry = CacheEntry {
                        key: cfg.url.clone(),
                        content,
                        etag,
                        last_modified,
                        fetched_at: now,
                        expires_at: now + ttl,
                    };
                    self.cache.store(&entry);
                    Ok(entry.content)
                }
                Err(err) => self.stale_fallback(cfg, cached, err, stats),
            },
            Err(err) => self.stale_fallback(cfg, cached, err, stats),
        }
    }

    fn stale_fallback(
        &self,
        cfg: &MetadataConfig,
        cached: Option<CacheEntry>,
        err: FetchError,
        stats: &mut FetchStats,
    ) -> Result<serde_json::Value, FetchError> {
        stats.failures += 1;
        match cached {
            Some(entry) => {
                stats.stale_used += 1;
                warn!(
                    url = cfg.url.as_str(),
                    error = %err,
                    "metadata fetch failed, serving stale cache"
                );
                Ok(entry.content)
            }
            None => Err(FetchError::Unavailable(err.to_string())),
        }
    }
}

/// Parse a document body as JSON first, then as YAML. YAML covers documents
/// using anchors, aliases, merge keys, or folded scalars that are not valid
/// JSON.
fn parse_document(text: &str) -> Result<serde_json::Value, FetchError> {
    match serde_json::from_str(text) {
        Ok(value) => Ok(value),
        Err(json_err) => {
            let mut yaml: serde_yaml::Value = serde_yaml::from_str(text).map_err(|yaml_err| {
                FetchError::Parse(format!("not JSON ({json_err}) nor YAML ({yaml_err})"))
            })?;
            yaml.apply_merge()
                .map_err(|e| FetchError::Parse(e.to_string()))?;
            serde_json::to_value(yaml).map_err(|e| FetchError::Parse(e.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct FakeSource {
        script: Mutex<VecDeque<Result<RemoteResponse, FetchError>>>,
        calls: Mutex<Vec<Validators>>,
    }

    impl FakeSource {
        fn new(script: Vec<Result<RemoteResponse, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Validators> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl RemoteSource for FakeSource {
        async fn get(
            &self,
            _url: &str,
            validators: &Validators,
        ) -> Result<RemoteResponse, FetchError> {
            self.calls.lock().unwrap().push(validators.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected network call")
        }
    }

    fn cfg() -> MetadataConfig {
        MetadataConfig {
            url: "https://example.com/f1.yaml".to_string(),
            ttl_hours: 12,
            show_key: "formula1".to_string(),
        }
    }

    fn body(text: &str, etag: Option<&str>) -> Result<RemoteResponse, FetchError> {
        Ok(RemoteResponse::Body {
            text: text.to_string(),
            etag: etag.map(str::to_string),
            last_modified: None,
        })
    }

    const DOC: &str = r#"{"metadata": {"formula1": {"title": "Formula 1"}}}"#;

    #[tokio::test]
    async fn fresh_cache_short_circuits_with_zero_network_calls() {
        let source = FakeSource::new(vec![body(DOC, Some("\"v1\""))]);
        let fetcher = MetadataFetcher::new(source.clone(), Arc::new(MemoryCache::new()));
        let mut stats = FetchStats::default();
        let t0 = Utc::now();

        let first = fetcher.fetch_at(&cfg(), t0, &mut stats).await.unwrap();
        assert_eq!(first["metadata"]["formula1"]["title"], "Formula 1");
        assert_eq!(stats.network_requests, 1);
        assert_eq!(stats.cache_misses, 1);

        // Second fetch one hour later: still inside the 12h TTL.
        let second = fetcher
            .fetch_at(&cfg(), t0 + TimeDelta::hours(1), &mut stats)
            .await
            .unwrap();
        assert_eq!(second, first);
        assert_eq!(stats.network_requests, 1);
        assert_eq!(stats.cache_hits, 1);
        assert_eq!(source.calls().len(), 1);
        // The very first request carries no validators.
        assert_eq!(source.calls()[0], Validators::default());
    }

    #[tokio::test]
    async fn expired_entry_revalidates_with_etag_and_reuses_body_on_304() {
        let source = FakeSource::new(vec![
            body(DOC, Some("\"v1\"")),
            Ok(RemoteResponse::NotModified),
        ]);
        let fetcher = MetadataFetcher::new(source.clone(), Arc::new(MemoryCache::new()));
        let mut stats = FetchStats::default();
        let t0 = Utc::now();

        let first = fetcher.fetch_at(&cfg(), t0, &mut stats).await.unwrap();

        // Past the TTL the fetcher must revalidate, carrying If-None-Match.
        let t1 = t0 + TimeDelta::hours(13);
        let second = fetcher.fetch_at(&cfg(), t1, &mut stats).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(stats.network_requests, 2);
        assert_eq!(stats.not_modified, 1);
        assert_eq!(source.calls()[1].etag.as_deref(), Some("\"v1\""));

        // The 304 renewed the lease: a third fetch inside the new TTL is a
        // pure cache hit.
        let third = fetcher
            .fetch_at(&cfg(), t1 + TimeDelta::hours(1), &mut stats)
            .await
            .unwrap();
        assert_eq!(third, first);
        assert_eq!(stats.network_requests, 2);
    }

    #[tokio::test]
    async fn transport_failure_serves_stale_body() {
        let source = FakeSource::new(vec![
            body(DOC, None),
            Err(FetchError::Network("connection refused".to_string())),
        ]);
        let fetcher = MetadataFetcher::new(source, Arc::new(MemoryCache::new()));
        let mut stats = FetchStats::default();
        let t0 = Utc::now();

        let first = fetcher.fetch_at(&cfg(), t0, &mut stats).await.unwrap();
        let stale = fetcher
            .fetch_at(&cfg(), t0 + TimeDelta::hours(24), &mut stats)
            .await
            .unwrap();
        assert_eq!(stale, first);
        assert_eq!(stats.stale_used, 1);
        assert_eq!(stats.failures, 1);
    }

    #[tokio::test]
    async fn upstream_error_serves_stale_body_too() {
        let source = FakeSource::new(vec![body(DOC, None), Err(FetchError::Upstream(503))]);
        let fetcher = MetadataFetcher::new(source, Arc::new(MemoryCache::new()));
        let mut stats = FetchStats::default();
        let t0 = Utc::now();

        fetcher.fetch_at(&cfg(), t0, &mut stats).await.unwrap();
        let stale = fetcher
            .fetch_at(&cfg(), t0 + TimeDelta::hours(24), &mut stats)
            .await;
        assert!(stale.is_ok());
        assert_eq!(stats.stale_used, 1);
    }

    #[tokio::test]
    async fn failure_with_no_cache_raises() {
        let source = FakeSource::new(vec![Err(FetchError::Network("down".to_string()))]);
        let fetcher = MetadataFetcher::new(source, Arc::new(MemoryCache::new()));
        let mut stats = FetchStats::default();

        let err = fetcher
            .fetch_at(&cfg(), Utc::now(), &mut stats)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Unavailable(_)));
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.stale_used, 0);
    }

    #[tokio::test]
    async fn yaml_documents_with_anchors_parse() {
        let yaml = r#"
defaults: &defaults
  summary: Grand Prix weekend
metadata:
  formula1:
    title: Formula 1
    seasons:
      bahrain:
        <<: *defaults
        title: Bahrain Grand Prix
"#;
        let source = FakeSource::new(vec![body(yaml, None)]);
        let fetcher = MetadataFetcher::new(source, Arc::new(MemoryCache::new()));
        let mut stats = FetchStats::default();

        let doc = fetcher
            .fetch_at(&cfg(), Utc::now(), &mut stats)
            .await
            .unwrap();
        assert_eq!(
            doc["metadata"]["formula1"]["seasons"]["bahrain"]["summary"],
            "Grand Prix weekend"
        );
    }

    #[tokio::test]
    async fn unparseable_body_falls_back_to_stale() {
        let source = FakeSource::new(vec![body(DOC, None), body("{ unclosed: [", None)]);
        let fetcher = MetadataFetcher::new(source, Arc::new(MemoryCache::new()));
        let mut stats = FetchStats::default();
        let t0 = Utc::now();

        let first = fetcher.fetch_at(&cfg(), t0, &mut stats).await.unwrap();
        let fallback = fetcher
            .fetch_at(&cfg(), t0 + TimeDelta::hours(24), &mut stats)
            .await
            .unwrap();
        assert_eq!(fallback, first);
        assert_eq!(stats.stale_used, 1);
    }
}
