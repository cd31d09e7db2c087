use crate::model::GameRecord;
use crate::storage::{AppTheme, ViewMode};

/// Text inputs of the modal forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    ApiKey,
    Title,
    Executable,
    Cover,
}

pub enum ModalState {
    None,
    Welcome,
    Settings(SettingsForm),
    GameForm(GameForm),
    ContextMenu { game: GameRecord, index: usize },
    ConfirmLaunch(GameRecord),
    ConfirmDelete(GameRecord),
}

impl ModalState {
    pub fn is_open(&self) -> bool {
        !matches!(self, ModalState::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    ApiKey,
    DefaultView,
    Theme,
    RefreshLibrary,
    Save,
}

impl SettingsRow {
    pub const ALL: [SettingsRow; 5] = [
        SettingsRow::ApiKey,
        SettingsRow::DefaultView,
        SettingsRow::Theme,
        SettingsRow::RefreshLibrary,
        SettingsRow::Save,
    ];
}

#[derive(Debug, Clone)]
pub struct SettingsForm {
    pub api_key: String,
    pub default_view: ViewMode,
    pub theme: AppTheme,
    pub row: usize,
}

impl SettingsForm {
    pub fn selected_row(&self) -> SettingsRow {
        SettingsRow::ALL[self.row.min(SettingsRow::ALL.len() - 1)]
    }
}

/// Add or edit form for a manual game. `editing` holds the id of the game
/// being edited.
#[derive(Debug, Clone, Default)]
pub struct GameForm {
    pub editing: Option<String>,
    pub title: String,
    pub executable: String,
    pub cover: String,
    pub error: Option<String>,
}

impl GameForm {
    pub fn for_game(game: &GameRecord) -> Self {
        Self {
            editing: Some(game.id.clone()),
            title: game.title.clone(),
            executable: game
                .executable_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            cover: String::new(),
            error: None,
        }
    }
}

pub const CONTEXT_MENU_ITEMS: [&str; 4] = ["Launch", "Edit", "Delete", "Close"];
