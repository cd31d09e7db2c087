use crate::game_sources::ManifestEntry;
use crate::model::GameRecord;
use crate::steam_store::AppDetailsSource;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info};

/// Enriched Steam records keyed by app id.
pub type GameCache = BTreeMap<String, GameRecord>;

/// Pause after every store request; the API has informal rate limits.
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(200);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentReport {
    pub cache_updated: bool,
    pub failed_requests: usize,
}

impl EnrichmentReport {
    pub fn any_failed(&self) -> bool {
        self.failed_requests > 0
    }
}

/// Turns discovered manifests into cached game records, calling the store at
/// most once per app id.
pub struct Enricher<'a> {
    source: &'a dyn AppDetailsSource,
    rate_limit: Duration,
    report: EnrichmentReport,
}

impl<'a> Enricher<'a> {
    pub fn new(source: &'a dyn AppDetailsSource, rate_limit: Duration) -> Self {
        Self {
            source,
            rate_limit,
            report: EnrichmentReport::default(),
        }
    }

    pub fn enrich(
        &mut self,
        entry: &ManifestEntry,
        cache: &mut GameCache,
        api_key: &str,
    ) -> GameRecord {
        if let Some(cached) = cache.get(&entry.app_id) {
            return cached.clone();
        }

        let mut record = GameRecord::steam(entry.app_id.clone(), entry.name.clone());

        if !api_key.is_empty() {
            match self.source.fetch_details(&entry.app_id) {
                Ok(details) => {
                    if let Some(details) = details {
                        record.cover_art = details.header_image;
                        record.background_video = details.background_video;
                    }
                    if !self.rate_limit.is_zero() {
                        std::thread::sleep(self.rate_limit);
                    }
                }
                Err(e) => {
                    error!(
                        "Failed to fetch store details for appid {}: {:#}",
                        entry.app_id, e
                    );
                    self.report.failed_requests += 1;
                }
            }
        }

        info!("Cached new game: {} ({})", record.title, record.id);
        cache.insert(record.id.clone(), record.clone());
        self.report.cache_updated = true;
        record
    }

    pub fn report(&self) -> EnrichmentReport {
        self.report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::steam_store::AppDetails;
    use anyhow::{anyhow, Result};
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed table and counts the calls it receives.
    #[derive(Default)]
    pub(crate) struct FakeStore {
        pub calls: AtomicUsize,
        pub failing: Vec<String>,
    }

    impl FakeStore {
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl AppDetailsSource for FakeStore {
        fn fetch_details(&self, app_id: &str) -> Result<Option<AppDetails>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.iter().any(|id| id == app_id) {
                return Err(anyhow!("connection reset"));
            }
            Ok(Some(AppDetails {
                header_image: format!("https://cdn/{app_id}/header.jpg"),
                background_video: Some(format!("https://cdn/{app_id}/480.webm")),
            }))
        }
    }

    fn entry(app_id: &str, name: &str) -> ManifestEntry {
        ManifestEntry {
            app_id: app_id.to_string(),
            name: name.to_string(),
            manifest_path: PathBuf::from(format!("/lib/steamapps/appmanifest_{app_id}.acf")),
        }
    }

    #[test]
    fn test_cache_hit_skips_network() {
        let store = FakeStore::default();
        let mut cache = GameCache::new();
        let mut enricher = Enricher::new(&store, Duration::ZERO);

        let first = enricher.enrich(&entry("570", "Dota 2"), &mut cache, "key");
        let second = enricher.enrich(&entry("570", "Dota 2"), &mut cache, "key");

        assert_eq!(first, second);
        assert_eq!(store.calls(), 1);
        assert_eq!(first.cover_art, "https://cdn/570/header.jpg");
        assert_eq!(
            first.background_video.as_deref(),
            Some("https://cdn/570/480.webm")
        );
    }

    #[test]
    fn test_cached_record_is_returned_unchanged() {
        let store = FakeStore::default();
        let mut cache = GameCache::new();
        let mut cached = GameRecord::steam("570", "Old Name");
        cached.cover_art = "https://old/cover.jpg".to_string();
        cache.insert("570".to_string(), cached.clone());

        let mut enricher = Enricher::new(&store, Duration::ZERO);
        let record = enricher.enrich(&entry("570", "Dota 2"), &mut cache, "key");

        assert_eq!(record, cached);
        assert_eq!(store.calls(), 0);
        assert!(!enricher.report().cache_updated);
    }

    #[test]
    fn test_no_api_key_means_no_request() {
        let store = FakeStore::default();
        let mut cache = GameCache::new();
        let mut enricher = Enricher::new(&store, Duration::ZERO);

        let record = enricher.enrich(&entry("620", "Portal 2"), &mut cache, "");

        assert_eq!(store.calls(), 0);
        assert!(record.cover_art.is_empty());
        assert_eq!(record.background_video, None);
        assert!(cache.contains_key("620"));
        assert!(enricher.report().cache_updated);
    }

    #[test]
    fn test_failed_request_is_absorbed_and_cached() {
        let store = FakeStore {
            failing: vec!["620".to_string()],
            ..Default::default()
        };
        let mut cache = GameCache::new();
        let mut enricher = Enricher::new(&store, Duration::ZERO);

        let record = enricher.enrich(&entry("620", "Portal 2"), &mut cache, "key");
        let other = enricher.enrich(&entry("400", "Portal"), &mut cache, "key");

        assert_eq!(record.title, "Portal 2");
        assert!(record.cover_art.is_empty());
        assert!(other.has_cover());
        assert_eq!(cache.len(), 2);
        assert_eq!(enricher.report().failed_requests, 1);
        assert!(enricher.report().any_failed());
    }
}
