use crate::enrichment::GameCache;
use crate::model::GameRecord;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Grid,
    Carousel,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Grid => ViewMode::Carousel,
            ViewMode::Carousel => ViewMode::Grid,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ViewMode::Grid => "Grid",
            ViewMode::Carousel => "Carousel",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppTheme {
    #[default]
    Default,
    Monotone,
}

impl AppTheme {
    pub fn title(self) -> &'static str {
        match self {
            AppTheme::Default => "Default",
            AppTheme::Monotone => "Monotone",
        }
    }
}

/// Everything the launcher persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub api_key: String,
    pub game_cache: GameCache,
    pub manual_games: Vec<GameRecord>,
    pub default_view_mode: ViewMode,
    pub has_launched_before: bool,
    pub app_theme: AppTheme,
    /// Extra Steam app ids to hide, on top of the built-in tool list.
    pub ignored_app_ids: Vec<String>,
}

/// Returns the project directories for this application.
/// Centralized to ensure consistent paths across all modules.
pub fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "game-shelf", "game-shelf")
        .context("Could not determine project directories")
}

pub fn settings_path() -> Result<PathBuf> {
    let proj_dirs = project_dirs()?;
    let config_dir = proj_dirs.config_dir();
    if !config_dir.exists() {
        fs::create_dir_all(config_dir).context("Failed to create config directory")?;
    }
    Ok(config_dir.join("settings.json"))
}

/// Owned handle on the settings document. A store without a path lives only
/// in memory.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    settings: Settings,
}

impl SettingsStore {
    pub fn in_memory(settings: Settings) -> Self {
        Self {
            path: None,
            settings,
        }
    }

    /// Load the document at `path`. A missing file yields defaults; an
    /// unparsable one is moved aside to `*.bak` and replaced by defaults.
    pub fn open(path: PathBuf) -> Result<Self> {
        let settings = if path.exists() {
            let content = fs::read_to_string(&path).context("Failed to read settings file")?;
            match serde_json::from_str::<Settings>(&content) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Settings file {:?} is corrupt ({}), starting fresh", path, e);
                    backup_corrupt_file(&path);
                    Settings::default()
                }
            }
        } else {
            Settings::default()
        };

        Ok(Self {
            path: Some(path),
            settings,
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(settings_path()?)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content =
            serde_json::to_string_pretty(&self.settings).context("Failed to serialize settings")?;
        fs::write(path, content).context("Failed to write settings file")?;
        Ok(())
    }
}

fn backup_corrupt_file(path: &Path) {
    let backup = path.with_extension("json.bak");
    if let Err(e) = fs::rename(path, &backup) {
        warn!("Failed to back up corrupt settings to {:?}: {}", backup, e);
    }
}
