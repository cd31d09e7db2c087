use crate::covers::CoverStore;
use crate::enrichment::{Enricher, EnrichmentReport, DEFAULT_RATE_LIMIT};
use crate::game_sources::{enumerate_library_folders, scan_manifests, IgnoredApps};
use crate::launcher::{self, LaunchError, LaunchHandle};
use crate::manual_games::{self, ManualGameError};
use crate::model::{GameRecord, GameSource, ManualGameUpdate, NewManualGame};
use crate::steam_path::{HostSteamRoot, SteamRootResolver};
use crate::steam_store::{AppDetailsSource, SteamStoreClient};
use crate::storage::{project_dirs, AppTheme, Settings, SettingsStore, ViewMode};
use anyhow::Context;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("A library scan is already running.")]
    ScanInProgress,
    #[error(transparent)]
    ManualGame(#[from] ManualGameError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Result of one discovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibrarySnapshot {
    pub games: Vec<GameRecord>,
    /// At least one store request failed during this run.
    pub enrichment_failed: bool,
}

/// The game library: discovery, enrichment cache, manual entries and
/// settings behind one handle.
pub struct Library {
    store: Mutex<SettingsStore>,
    covers: CoverStore,
    steam_root: Box<dyn SteamRootResolver>,
    details: Box<dyn AppDetailsSource>,
    ignored: IgnoredApps,
    rate_limit: Duration,
    scan_in_flight: AtomicBool,
}

/// Clears the in-flight flag when a scan ends, however it ends.
struct ScanGuard<'a>(&'a AtomicBool);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Library {
    pub fn new(store: SettingsStore, covers: CoverStore) -> Self {
        Self {
            store: Mutex::new(store),
            covers,
            steam_root: Box::new(HostSteamRoot),
            details: Box::new(SteamStoreClient::new()),
            ignored: IgnoredApps::default(),
            rate_limit: DEFAULT_RATE_LIMIT,
            scan_in_flight: AtomicBool::new(false),
        }
    }

    /// Library backed by the per-user settings file and data directory.
    pub fn open_default() -> anyhow::Result<Self> {
        let store = SettingsStore::open_default()?;
        info!("Using settings file {:?}", store.path());
        let data_dir = project_dirs()
            .context("Could not determine data directory")?
            .data_dir()
            .to_path_buf();

        let mut ignored = IgnoredApps::default();
        for app_id in &store.settings().ignored_app_ids {
            ignored.insert(app_id.trim());
        }
        Ok(Self::new(store, CoverStore::new(data_dir)).with_ignored_apps(ignored))
    }

    #[cfg(test)]
    pub fn with_steam_root(mut self, resolver: impl SteamRootResolver + 'static) -> Self {
        self.steam_root = Box::new(resolver);
        self
    }

    #[cfg(test)]
    pub fn with_details_source(mut self, source: impl AppDetailsSource + 'static) -> Self {
        self.details = Box::new(source);
        self
    }

    pub fn with_ignored_apps(mut self, ignored: IgnoredApps) -> Self {
        self.ignored = ignored;
        self
    }

    #[cfg(test)]
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn covers(&self) -> &CoverStore {
        &self.covers
    }

    fn store(&self) -> MutexGuard<'_, SettingsStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Discover Steam games, enrich new ones, and merge them with the manual
    /// entries. Only one run may be active at a time.
    pub fn get_all_games(&self) -> Result<LibrarySnapshot, LibraryError> {
        if self
            .scan_in_flight
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            warn!("Ignoring library scan request: a scan is already running");
            return Err(LibraryError::ScanInProgress);
        }
        let _guard = ScanGuard(&self.scan_in_flight);

        let (steam_games, report) = self.scan_steam_games();
        let manual = self.store().settings().manual_games.clone();

        Ok(LibrarySnapshot {
            games: merge_games(steam_games, manual),
            enrichment_failed: report.any_failed(),
        })
    }

    fn scan_steam_games(&self) -> (Vec<GameRecord>, EnrichmentReport) {
        let Some(root) = self.steam_root.resolve() else {
            warn!("Steam path not found, skipping Steam game detection.");
            return (Vec::new(), EnrichmentReport::default());
        };

        let folders = enumerate_library_folders(&root);
        let scan = scan_manifests(&folders, &self.ignored);
        if !scan.failed.is_empty() {
            warn!("{} app manifest(s) could not be read", scan.failed.len());
        }

        // Work on a snapshot so the store stays available while requests run.
        let (api_key, mut cache) = {
            let store = self.store();
            let settings = store.settings();
            (settings.api_key.clone(), settings.game_cache.clone())
        };

        let mut enricher = Enricher::new(self.details.as_ref(), self.rate_limit);
        let games: Vec<GameRecord> = scan
            .entries
            .iter()
            .map(|entry| enricher.enrich(entry, &mut cache, &api_key))
            .collect();
        let report = enricher.report();

        if report.cache_updated {
            let mut store = self.store();
            let stored = &mut store.settings_mut().game_cache;
            for (id, record) in cache {
                stored.entry(id).or_insert(record);
            }
            match store.save() {
                Ok(()) => info!("Game cache updated."),
                Err(e) => warn!("Failed to persist game cache: {:#}", e),
            }
        }

        info!(
            "Found {} Steam games in {} library folders",
            games.len(),
            folders.len()
        );
        (games, report)
    }

    /// Forget all enrichment results; the next scan rebuilds them. Refused
    /// while a scan runs, since that scan would merge the old entries back.
    pub fn refresh_library(&self) -> Result<(), LibraryError> {
        if self.scan_in_flight.load(Ordering::Acquire) {
            warn!("Ignoring cache refresh: a library scan is running");
            return Err(LibraryError::ScanInProgress);
        }
        let mut store = self.store();
        store.settings_mut().game_cache.clear();
        store.save()?;
        info!("Game cache cleared.");
        Ok(())
    }

    pub fn save_manual_game(&self, input: NewManualGame) -> Result<GameRecord, LibraryError> {
        let mut store = self.store();
        let game = manual_games::create(&mut store.settings_mut().manual_games, &self.covers, input)?;
        store.save()?;
        Ok(game)
    }

    pub fn update_manual_game(
        &self,
        update: ManualGameUpdate,
    ) -> Result<Option<GameRecord>, LibraryError> {
        let mut store = self.store();
        let result =
            manual_games::update(&mut store.settings_mut().manual_games, &self.covers, update);
        // A failed copy can leave the record without its deleted cover.
        if matches!(result, Ok(Some(_)) | Err(ManualGameError::CoverImport(_))) {
            store.save()?;
        }
        Ok(result?)
    }

    pub fn delete_manual_game(&self, id: &str) -> Result<(), LibraryError> {
        let mut store = self.store();
        if manual_games::delete(&mut store.settings_mut().manual_games, &self.covers, id).is_some()
        {
            store.save()?;
        }
        Ok(())
    }

    pub fn launch_game(&self, game: &GameRecord) -> Result<LaunchHandle, LaunchError> {
        launcher::launch_game(game)
    }

    pub fn api_key(&self) -> String {
        self.store().settings().api_key.clone()
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<(), LibraryError> {
        self.update_settings(|settings| settings.api_key = api_key.trim().to_string())
    }

    pub fn default_view_mode(&self) -> ViewMode {
        self.store().settings().default_view_mode
    }

    pub fn set_default_view_mode(&self, view_mode: ViewMode) -> Result<(), LibraryError> {
        self.update_settings(|settings| settings.default_view_mode = view_mode)
    }

    pub fn is_first_launch(&self) -> bool {
        !self.store().settings().has_launched_before
    }

    pub fn set_has_launched(&self) -> Result<(), LibraryError> {
        self.update_settings(|settings| settings.has_launched_before = true)
    }

    pub fn theme(&self) -> AppTheme {
        self.store().settings().app_theme
    }

    pub fn set_theme(&self, theme: AppTheme) -> Result<(), LibraryError> {
        self.update_settings(|settings| settings.app_theme = theme)
    }

    fn update_settings(
        &self,
        f: impl FnOnce(&mut Settings),
    ) -> Result<(), LibraryError> {
        let mut store = self.store();
        f(store.settings_mut());
        store.save()?;
        Ok(())
    }
}

/// Steam games first, then manual ones; later records sharing a title with an
/// earlier one are dropped. Manual records get a fresh `path_valid`.
pub fn merge_games(steam: Vec<GameRecord>, manual: Vec<GameRecord>) -> Vec<GameRecord> {
    let manual = manual.into_iter().map(|mut game| {
        if game.source == GameSource::Manual {
            game.path_valid = Some(
                game.executable_path
                    .as_deref()
                    .is_some_and(|path| path.exists()),
            );
        }
        game
    });

    let mut seen = HashSet::new();
    steam
        .into_iter()
        .chain(manual)
        .filter(|game| seen.insert(game.title.clone()))
        .collect()
}

/// Case-insensitive title search; an empty query matches everything.
pub fn filter_by_title<'a>(games: &'a [GameRecord], query: &str) -> Vec<&'a GameRecord> {
    let query = query.trim().to_lowercase();
    games
        .iter()
        .filter(|game| query.is_empty() || game.title.to_lowercase().contains(&query))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::tests::FakeStore;
    use crate::game_sources::tests::write_manifest;
    use crate::steam_path::FixedSteamRoot;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct SharedStore(Arc<FakeStore>);

    impl AppDetailsSource for SharedStore {
        fn fetch_details(
            &self,
            app_id: &str,
        ) -> anyhow::Result<Option<crate::steam_store::AppDetails>> {
            self.0.fetch_details(app_id)
        }
    }

    struct Fixture {
        dir: TempDir,
        details: Arc<FakeStore>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_details(FakeStore::default())
        }

        fn with_details(details: FakeStore) -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                details: Arc::new(details),
            }
        }

        fn steam_root(&self) -> PathBuf {
            self.dir.path().join("steam")
        }

        fn settings_path(&self) -> PathBuf {
            self.dir.path().join("settings.json")
        }

        fn library(&self, root: Option<PathBuf>, api_key: &str) -> Library {
            let mut store = SettingsStore::open(self.settings_path()).unwrap();
            store.settings_mut().api_key = api_key.to_string();
            Library::new(store, CoverStore::new(self.dir.path().join("data")))
                .with_steam_root(FixedSteamRoot(root))
                .with_details_source(SharedStore(self.details.clone()))
                .with_rate_limit(Duration::ZERO)
        }

        fn executable(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, b"#!/bin/sh\n").unwrap();
            path
        }
    }

    fn manual_game(title: &str, exe: &Path) -> NewManualGame {
        NewManualGame {
            title: title.to_string(),
            executable_path: exe.to_path_buf(),
            cover_source: None,
        }
    }

    fn titles(games: &[GameRecord]) -> Vec<&str> {
        games.iter().map(|g| g.title.as_str()).collect()
    }

    #[test]
    fn test_merge_prefers_first_title() {
        let steam = vec![GameRecord::steam("1", "A")];
        let manual = vec![
            GameRecord::manual("A", PathBuf::from("/a")),
            GameRecord::manual("B", PathBuf::from("/b")),
            GameRecord::manual("B", PathBuf::from("/b2")),
            GameRecord::manual("a", PathBuf::from("/a2")),
        ];

        let merged = merge_games(steam, manual.clone());

        assert_eq!(titles(&merged), vec!["A", "B", "a"]);
        assert_eq!(merged[0].source, GameSource::Steam);
        assert_eq!(merged[1].id, manual[1].id);
    }

    #[test]
    fn test_merge_computes_path_validity() {
        let fx = Fixture::new();
        let exe = fx.executable("game.sh");
        let manual = vec![
            GameRecord::manual("Here", exe),
            GameRecord::manual("Gone", PathBuf::from("/no/such/game")),
        ];

        let merged = merge_games(vec![GameRecord::steam("1", "S")], manual);

        assert_eq!(merged[0].path_valid, None);
        assert_eq!(merged[1].path_valid, Some(true));
        assert_eq!(merged[2].path_valid, Some(false));
        assert!(!merged[2].is_launchable());
    }

    #[test]
    fn test_unresolvable_steam_root_returns_manual_games() {
        let fx = Fixture::new();
        let library = fx.library(None, "key");
        let exe = fx.executable("doom.sh");
        library.save_manual_game(manual_game("Doom", &exe)).unwrap();
        library
            .save_manual_game(manual_game("Quake", Path::new("/missing/quake")))
            .unwrap();

        let snapshot = library.get_all_games().unwrap();

        assert_eq!(titles(&snapshot.games), vec!["Doom", "Quake"]);
        assert_eq!(snapshot.games[0].path_valid, Some(true));
        assert_eq!(snapshot.games[1].path_valid, Some(false));
        assert!(!snapshot.enrichment_failed);
        assert_eq!(fx.details.calls(), 0);
    }

    #[test]
    fn test_scan_enriches_once_and_persists_cache() {
        let fx = Fixture::new();
        write_manifest(&fx.steam_root(), "570", "Dota 2");
        write_manifest(&fx.steam_root(), "620", "Portal 2");
        let library = fx.library(Some(fx.steam_root()), "key");

        let first = library.get_all_games().unwrap();
        let second = library.get_all_games().unwrap();

        assert_eq!(titles(&first.games), vec!["Dota 2", "Portal 2"]);
        assert_eq!(first, second);
        assert_eq!(fx.details.calls(), 2);

        let persisted = SettingsStore::open(fx.settings_path()).unwrap();
        let cache = &persisted.settings().game_cache;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache["570"].cover_art, "https://cdn/570/header.jpg");
    }

    #[test]
    fn test_refresh_forces_re_enrichment() {
        let fx = Fixture::new();
        write_manifest(&fx.steam_root(), "570", "Dota 2");
        let library = fx.library(Some(fx.steam_root()), "key");

        library.get_all_games().unwrap();
        library.refresh_library().unwrap();
        assert!(SettingsStore::open(fx.settings_path())
            .unwrap()
            .settings()
            .game_cache
            .is_empty());

        library.get_all_games().unwrap();
        assert_eq!(fx.details.calls(), 2);
    }

    #[test]
    fn test_enrichment_failures_are_reported() {
        let fx = Fixture::with_details(FakeStore {
            failing: vec!["620".to_string()],
            ..Default::default()
        });
        write_manifest(&fx.steam_root(), "570", "Dota 2");
        write_manifest(&fx.steam_root(), "620", "Portal 2");
        let library = fx.library(Some(fx.steam_root()), "key");

        let snapshot = library.get_all_games().unwrap();

        assert!(snapshot.enrichment_failed);
        assert_eq!(snapshot.games.len(), 2);
        assert!(snapshot.games[1].cover_art.is_empty());
    }

    #[test]
    fn test_steam_title_wins_over_manual_entry() {
        let fx = Fixture::new();
        write_manifest(&fx.steam_root(), "570", "Dota 2");
        let library = fx.library(Some(fx.steam_root()), "");
        let exe = fx.executable("dota.sh");
        library.save_manual_game(manual_game("Dota 2", &exe)).unwrap();

        let snapshot = library.get_all_games().unwrap();

        assert_eq!(snapshot.games.len(), 1);
        assert_eq!(snapshot.games[0].source, GameSource::Steam);
        assert_eq!(fx.details.calls(), 0);
    }

    #[test]
    fn test_concurrent_scan_is_rejected() {
        let fx = Fixture::new();
        let library = fx.library(None, "");

        library.scan_in_flight.store(true, Ordering::SeqCst);
        assert!(matches!(
            library.get_all_games(),
            Err(LibraryError::ScanInProgress)
        ));

        library.scan_in_flight.store(false, Ordering::SeqCst);
        assert!(library.get_all_games().is_ok());
        assert!(!library.scan_in_flight.load(Ordering::SeqCst));
    }

    #[test]
    fn test_manual_crud_persists() {
        let fx = Fixture::new();
        let library = fx.library(None, "");
        let exe = fx.executable("game.sh");
        let cover = fx.executable("cover.png");

        let err = library
            .save_manual_game(manual_game("", &exe))
            .unwrap_err();
        assert!(matches!(
            err,
            LibraryError::ManualGame(ManualGameError::Validation(_))
        ));

        let game = library
            .save_manual_game(NewManualGame {
                cover_source: Some(cover),
                ..manual_game("Game", &exe)
            })
            .unwrap();
        let cover_file = library.covers().resolve(&game.cover_art).unwrap();
        assert!(cover_file.exists());

        let updated = library
            .update_manual_game(ManualGameUpdate {
                id: game.id.clone(),
                title: Some("Renamed".to_string()),
                ..Default::default()
            })
            .unwrap()
            .unwrap();
        assert_eq!(updated.cover_art, game.cover_art);

        let persisted = SettingsStore::open(fx.settings_path()).unwrap();
        assert_eq!(persisted.settings().manual_games[0].title, "Renamed");

        library.delete_manual_game(&game.id).unwrap();
        assert!(!cover_file.exists());
        let persisted = SettingsStore::open(fx.settings_path()).unwrap();
        assert!(persisted.settings().manual_games.is_empty());
    }

    #[test]
    fn test_failed_cover_update_keeps_disk_and_memory_in_sync() {
        let fx = Fixture::new();
        let library = fx.library(None, "");
        let exe = fx.executable("game.sh");
        let game = library
            .save_manual_game(NewManualGame {
                cover_source: Some(fx.executable("old.png")),
                ..manual_game("Game", &exe)
            })
            .unwrap();
        let old_file = library.covers().resolve(&game.cover_art).unwrap();

        let err = library
            .update_manual_game(ManualGameUpdate {
                id: game.id.clone(),
                cover_art: Some("/no/such/new.jpg".to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(
            err,
            LibraryError::ManualGame(ManualGameError::CoverImport(_))
        ));
        assert!(old_file.exists());

        // Copying onto a directory fails after the old cover is gone.
        let new_source = fx.executable("new.jpg");
        fs::create_dir_all(library.covers().covers_dir().join(format!("{}.jpg", game.id)))
            .unwrap();
        library
            .update_manual_game(ManualGameUpdate {
                id: game.id.clone(),
                cover_art: Some(new_source.to_string_lossy().to_string()),
                ..Default::default()
            })
            .unwrap_err();
        assert!(!old_file.exists());

        library.set_theme(AppTheme::Monotone).unwrap();
        let persisted = SettingsStore::open(fx.settings_path()).unwrap();
        let stored = &persisted.settings().manual_games[0];
        assert_eq!(stored.cover_art, "");
        assert_eq!(stored.title, "Game");
    }

    #[test]
    fn test_refresh_refused_while_scanning() {
        let fx = Fixture::new();
        let library = fx.library(None, "");
        library
            .update_settings(|settings| {
                settings
                    .game_cache
                    .insert("570".to_string(), GameRecord::steam("570", "Dota 2"));
            })
            .unwrap();

        library.scan_in_flight.store(true, Ordering::Release);
        assert!(matches!(
            library.refresh_library(),
            Err(LibraryError::ScanInProgress)
        ));
        assert!(library.store().settings().game_cache.contains_key("570"));

        library.scan_in_flight.store(false, Ordering::Release);
        library.refresh_library().unwrap();
        assert!(library.store().settings().game_cache.is_empty());
    }

    #[test]
    fn test_settings_accessors() {
        let store = SettingsStore::in_memory(Settings::default());
        let library = Library::new(store, CoverStore::new(PathBuf::from("/unused")));

        assert!(library.is_first_launch());
        library.set_has_launched().unwrap();
        assert!(!library.is_first_launch());

        library.set_api_key("  abc ").unwrap();
        assert_eq!(library.api_key(), "abc");

        library.set_default_view_mode(ViewMode::Carousel).unwrap();
        assert_eq!(library.default_view_mode(), ViewMode::Carousel);

        library.set_theme(AppTheme::Monotone).unwrap();
        assert_eq!(library.theme(), AppTheme::Monotone);
    }

    #[test]
    fn test_filter_by_title() {
        let games = vec![
            GameRecord::steam("1", "Portal 2"),
            GameRecord::steam("2", "Dota 2"),
        ];

        assert_eq!(filter_by_title(&games, "").len(), 2);
        let found = filter_by_title(&games, " PORT ");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "1");
        assert!(filter_by_title(&games, "zelda").is_empty());
    }
}
