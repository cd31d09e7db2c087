use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameSource {
    Steam,
    Manual,
}

/// A single entry of the game library, either discovered from Steam or
/// registered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub source: GameSource,
    pub title: String,
    /// Remote URL or `local-file://` reference; empty when there is no art.
    #[serde(default)]
    pub cover_art: String,
    #[serde(default)]
    pub background_video: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable_path: Option<PathBuf>,
    /// Recomputed on every library merge, never persisted.
    #[serde(skip)]
    pub path_valid: Option<bool>,
}

impl GameRecord {
    pub fn steam(app_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: app_id.into(),
            source: GameSource::Steam,
            title: title.into(),
            cover_art: String::new(),
            background_video: None,
            executable_path: None,
            path_valid: None,
        }
    }

    pub fn manual(title: impl Into<String>, executable_path: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            source: GameSource::Manual,
            title: title.into(),
            cover_art: String::new(),
            background_video: None,
            executable_path: Some(executable_path),
            path_valid: None,
        }
    }

    pub fn has_cover(&self) -> bool {
        !self.cover_art.is_empty()
    }

    /// Manual games whose executable vanished cannot be launched.
    pub fn is_launchable(&self) -> bool {
        self.path_valid != Some(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    All,
    Steam,
    Manual,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::All, Category::Steam, Category::Manual];

    pub fn title(self) -> &'static str {
        match self {
            Category::All => "All",
            Category::Steam => "Steam",
            Category::Manual => "Manual",
        }
    }

    pub fn matches(self, game: &GameRecord) -> bool {
        match self {
            Category::All => true,
            Category::Steam => game.source == GameSource::Steam,
            Category::Manual => game.source == GameSource::Manual,
        }
    }
}

/// Fields supplied by the user when registering a game by hand.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewManualGame {
    pub title: String,
    pub executable_path: PathBuf,
    /// Image file to copy into app-owned storage.
    pub cover_source: Option<PathBuf>,
}

/// Partial update of a manual game; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManualGameUpdate {
    pub id: String,
    pub title: Option<String>,
    pub executable_path: Option<PathBuf>,
    /// Either an existing `local-file://` reference or a path to a new image.
    pub cover_art: Option<String>,
}
