use iced::keyboard::{self, key::Named, Key};
use iced::mouse::{self, ScrollDelta};
use iced::widget::{Column, Container, Stack};
use iced::{window, Element, Event, Length, Subscription, Task};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::art_cache::ArtCache;
use crate::covers::CoverStore;
use crate::gamepad::gamepad_subscription;
use crate::input::Action;
use crate::launcher::LaunchHandle;
use crate::library::{filter_by_title, Library};
use crate::messages::Message;
use crate::model::{GameRecord, GameSource, ManualGameUpdate, NewManualGame};
use crate::navigation::{CarouselNav, NavEvent, NavFocus};
use crate::storage::{AppTheme, Settings, SettingsStore, ViewMode};
use crate::ui_main_view::{
    grid_columns, render_carousel, render_controls_hint, render_empty, render_grid,
    render_header, render_search, render_status, CoverLookup,
};
use crate::ui_components::render_backdrop;
use crate::ui_modals::{
    render_confirm_delete, render_confirm_launch, render_context_menu, render_game_form,
    render_running, render_settings, render_welcome,
};
use crate::ui_state::{
    FormField, GameForm, ModalState, SettingsForm, SettingsRow, CONTEXT_MENU_ITEMS,
};
use crate::ui_theme::*;

pub const ENRICHMENT_FAILED_NOTICE: &str = "Steam API error: failed to fetch some game details.";
const INITIAL_WINDOW_WIDTH: f32 = 1280.0;

pub struct Launcher {
    library: Arc<Library>,
    art_cache: Option<ArtCache>,
    /// Downloaded remote covers by game id.
    art: HashMap<String, PathBuf>,
    nav: CarouselNav,
    view_mode: ViewMode,
    theme: AppTheme,
    search: String,
    grid_index: usize,
    cols: usize,
    modal: ModalState,
    status_message: Option<String>,
    loaded: bool,
    loading: bool,
    reload_pending: bool,
    // Set while a manual game runs; disables input subscriptions
    running_game: Option<String>,
    /// Selected game, drawn as the window backdrop.
    backdrop: Option<GameRecord>,
}

impl Launcher {
    pub fn new() -> (Self, Task<Message>) {
        let library = match Library::open_default() {
            Ok(library) => library,
            Err(e) => {
                warn!("Could not open settings, changes will not persist: {:#}", e);
                Library::new(
                    SettingsStore::in_memory(Settings::default()),
                    CoverStore::new(std::env::temp_dir().join("game-shelf")),
                )
            }
        };
        let art_cache = match ArtCache::new() {
            Ok(cache) => Some(cache),
            Err(e) => {
                warn!("Cover art cache unavailable: {:#}", e);
                None
            }
        };

        let mut launcher = Self::with_library(Arc::new(library), art_cache);
        let task = launcher.load_library();
        (launcher, task)
    }

    fn with_library(library: Arc<Library>, art_cache: Option<ArtCache>) -> Self {
        let modal = if library.is_first_launch() {
            ModalState::Welcome
        } else {
            ModalState::None
        };

        Self {
            view_mode: library.default_view_mode(),
            theme: library.theme(),
            library,
            art_cache,
            art: HashMap::new(),
            nav: CarouselNav::default(),
            search: String::new(),
            grid_index: 0,
            cols: grid_columns(INITIAL_WINDOW_WIDTH),
            modal,
            status_message: None,
            loaded: false,
            loading: false,
            reload_pending: false,
            running_game: None,
            backdrop: None,
        }
    }

    pub fn title(&self) -> String {
        String::from("Game Shelf")
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::LibraryLoaded(result) => {
                self.loading = false;
                self.loaded = true;
                let task = match result {
                    Ok(snapshot) => {
                        if snapshot.enrichment_failed {
                            self.status_message = Some(ENRICHMENT_FAILED_NOTICE.to_string());
                        }
                        self.set_games(snapshot.games);
                        self.fetch_art()
                    }
                    Err(err) => {
                        warn!("Failed to load library: {}", err);
                        self.status_message = Some(err);
                        Task::none()
                    }
                };

                if std::mem::take(&mut self.reload_pending) {
                    Task::batch(vec![task, self.load_library()])
                } else {
                    task
                }
            }
            Message::ArtFetched(paths) => {
                self.art.extend(paths);
                Task::none()
            }
            Message::Input(action) => self.handle_navigation(action),
            Message::WheelScrolled(delta_y) => {
                if !self.modal.is_open() && self.view_mode == ViewMode::Carousel {
                    let event = self.nav.scroll(delta_y);
                    return self.apply_nav_event(event);
                }
                Task::none()
            }
            Message::WindowResized(width, _height) => {
                self.cols = grid_columns(width);
                Task::none()
            }
            Message::SearchChanged(query) => {
                self.search = query;
                self.grid_index = 0;
                self.sync_backdrop();
                Task::none()
            }
            Message::FieldChanged(field, value) => {
                self.set_field(field, value);
                Task::none()
            }
            Message::ActivateRow(index) => self.activate_row(index),
            Message::SubmitForm => self.submit_modal(),
            Message::CloseModal => self.close_modal(),
            Message::GameExited => {
                info!("Game process exited, resuming input.");
                self.running_game = None;
                Task::none()
            }
        }
    }

    /// Start a discovery run in the background. A request made while one is
    /// running is queued behind it.
    fn load_library(&mut self) -> Task<Message> {
        if self.loading {
            self.reload_pending = true;
            return Task::none();
        }
        self.loading = true;

        let library = self.library.clone();
        Task::perform(
            async move {
                let scan = tokio::task::spawn_blocking(move || {
                    library.get_all_games().map_err(|e| e.to_string())
                });
                match scan.await {
                    Ok(result) => result,
                    Err(e) => Err(format!("Library scan task failed: {}", e)),
                }
            },
            Message::LibraryLoaded,
        )
    }

    /// Download remote covers that are not cached yet, one after another.
    fn fetch_art(&mut self) -> Task<Message> {
        let Some(cache) = self.art_cache.clone() else {
            return Task::none();
        };

        let mut pending = Vec::new();
        for game in self.nav.games() {
            let is_remote = game.cover_art.starts_with("http://")
                || game.cover_art.starts_with("https://");
            if !is_remote || self.art.contains_key(&game.id) {
                continue;
            }
            match cache.find_existing(&game.id) {
                Some(path) => {
                    self.art.insert(game.id.clone(), path);
                }
                None => pending.push((game.id.clone(), game.cover_art.clone())),
            }
        }
        if pending.is_empty() {
            return Task::none();
        }

        info!("Fetching cover art for {} games", pending.len());
        let (width, height) = (CAROUSEL_POSTER_WIDTH as u32, CAROUSEL_POSTER_HEIGHT as u32);
        Task::perform(
            async move {
                tokio::task::spawn_blocking(move || {
                    pending
                        .into_iter()
                        .filter_map(|(id, url)| match cache.fetch(&id, &url, width, height) {
                            Ok(path) => Some((id, path)),
                            Err(e) => {
                                warn!("Failed to fetch cover art for {}: {:#}", id, e);
                                None
                            }
                        })
                        .collect::<Vec<_>>()
                })
                .await
                .unwrap_or_default()
            },
            Message::ArtFetched,
        )
    }

    fn set_games(&mut self, games: Vec<GameRecord>) {
        let event = self.nav.set_games(games);
        let _ = self.apply_nav_event(Some(event));
        let visible = self.grid_games().len();
        self.grid_index = self.grid_index.min(visible.saturating_sub(1));
        self.sync_backdrop();
    }

    fn grid_games(&self) -> Vec<&GameRecord> {
        let category = self.nav.category();
        filter_by_title(self.nav.games(), &self.search)
            .into_iter()
            .filter(|game| category.matches(game))
            .collect()
    }

    fn selected_game(&self) -> Option<&GameRecord> {
        match self.view_mode {
            ViewMode::Carousel => self.nav.active_game(),
            ViewMode::Grid => self.grid_games().get(self.grid_index).copied(),
        }
    }

    fn sync_backdrop(&mut self) {
        self.backdrop = self.selected_game().cloned();
    }

    fn handle_navigation(&mut self, action: Action) -> Task<Message> {
        if self.running_game.is_some() {
            return Task::none();
        }
        if action == Action::Quit {
            return iced::exit();
        }
        if self.modal.is_open() {
            return self.handle_modal_navigation(action);
        }

        match action {
            Action::AddGame => {
                self.modal = ModalState::GameForm(GameForm::default());
                Task::none()
            }
            Action::OpenSettings => {
                self.open_settings();
                Task::none()
            }
            Action::ToggleView => {
                self.view_mode = self.view_mode.toggled();
                self.sync_backdrop();
                Task::none()
            }
            Action::Refresh => self.refresh_library(),
            Action::Back => {
                self.status_message = None;
                Task::none()
            }
            Action::ContextMenu => {
                let manual = self
                    .selected_game()
                    .filter(|game| game.source == GameSource::Manual)
                    .cloned();
                if let Some(game) = manual {
                    self.modal = ModalState::ContextMenu { game, index: 0 };
                }
                Task::none()
            }
            Action::PrevCategory | Action::NextCategory => {
                let step = if action == Action::PrevCategory { -1 } else { 1 };
                let event = self.nav.step_category(step);
                self.grid_index = 0;
                self.apply_nav_event(event)
            }
            _ => match self.view_mode {
                ViewMode::Carousel => {
                    let event = self.nav.handle(action);
                    self.apply_nav_event(event)
                }
                ViewMode::Grid => self.handle_grid_navigation(action),
            },
        }
    }

    fn handle_grid_navigation(&mut self, action: Action) -> Task<Message> {
        let list_len = self.grid_games().len();
        if list_len == 0 {
            return Task::none();
        }

        if action == Action::Select {
            return self.activate_grid_item(self.grid_index);
        }
        self.grid_index = Self::next_grid_index(self.grid_index, action, self.cols, list_len);
        self.sync_backdrop();
        Task::none()
    }

    fn next_grid_index(current: usize, action: Action, cols: usize, len: usize) -> usize {
        match action {
            Action::Up if current >= cols => current - cols,
            Action::Down if current + cols < len => current + cols,
            Action::Left if current > 0 => current - 1,
            Action::Right if current + 1 < len => current + 1,
            _ => current,
        }
    }

    fn activate_grid_item(&mut self, index: usize) -> Task<Message> {
        let Some(game) = self.grid_games().get(index).map(|game| (*game).clone()) else {
            return Task::none();
        };
        self.grid_index = index;
        self.sync_backdrop();
        self.request_launch(game)
    }

    fn apply_nav_event(&mut self, event: Option<NavEvent>) -> Task<Message> {
        match event {
            Some(NavEvent::Launch(game)) => self.request_launch(game),
            Some(NavEvent::Selected(game)) => {
                if self.view_mode == ViewMode::Carousel {
                    if let Some(game) = &game {
                        debug!("Selected {} ({})", game.title, game.id);
                    }
                    self.backdrop = game;
                } else {
                    self.sync_backdrop();
                }
                Task::none()
            }
            None => Task::none(),
        }
    }

    /// Ask for confirmation, unless the game is known to be unlaunchable.
    fn request_launch(&mut self, game: GameRecord) -> Task<Message> {
        if !game.is_launchable() {
            let path = game
                .executable_path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default();
            self.status_message = Some(format!("Executable not found: {}", path));
            return Task::none();
        }
        self.modal = ModalState::ConfirmLaunch(game);
        Task::none()
    }

    fn launch(&mut self, game: GameRecord) -> Task<Message> {
        match self.library.launch_game(&game) {
            Ok(LaunchHandle::Detached) => {
                self.status_message = Some(format!("Starting {} through Steam...", game.title));
                Task::none()
            }
            Ok(LaunchHandle::Child(mut child)) => {
                self.status_message = None;
                self.running_game = Some(game.title.clone());
                let title = game.title;
                Task::perform(
                    async move {
                        match tokio::task::spawn_blocking(move || child.wait()).await {
                            Ok(Ok(status)) => info!("{} exited with {}", title, status),
                            Ok(Err(e)) => warn!("Failed to wait for {}: {}", title, e),
                            Err(e) => warn!("Wait task for {} failed: {}", title, e),
                        }
                    },
                    |_| Message::GameExited,
                )
            }
            Err(e) => {
                warn!("Failed to launch {}: {}", game.title, e);
                self.status_message = Some(e.to_string());
                Task::none()
            }
        }
    }

    fn refresh_library(&mut self) -> Task<Message> {
        if self.loading {
            self.status_message = Some("A library scan is already running.".to_string());
            return Task::none();
        }
        match self.library.refresh_library() {
            Ok(()) => {
                self.status_message = Some("Refreshing library...".to_string());
                self.art.clear();
                if let Some(cache) = &self.art_cache {
                    if let Err(e) = cache.clear() {
                        warn!("Failed to clear cover art cache: {:#}", e);
                    }
                }
            }
            Err(e) => {
                warn!("Failed to clear game cache: {}", e);
                self.status_message = Some(e.to_string());
            }
        }
        self.load_library()
    }

    fn open_settings(&mut self) {
        self.modal = ModalState::Settings(SettingsForm {
            api_key: self.library.api_key(),
            default_view: self.library.default_view_mode(),
            theme: self.theme,
            row: 0,
        });
    }

    fn mark_launched(&self) {
        if let Err(e) = self.library.set_has_launched() {
            warn!("Failed to record first launch: {}", e);
        }
    }

    fn handle_modal_navigation(&mut self, action: Action) -> Task<Message> {
        match action {
            Action::Back => return self.close_modal(),
            Action::Select => {
                let row = match &self.modal {
                    ModalState::Settings(form) => Some(form.row),
                    ModalState::ContextMenu { index, .. } => Some(*index),
                    _ => None,
                };
                return match row {
                    Some(row) => self.activate_row(row),
                    None => self.submit_modal(),
                };
            }
            _ => {}
        }

        match &mut self.modal {
            ModalState::Settings(form) => match action {
                Action::Up => form.row = form.row.saturating_sub(1),
                Action::Down => form.row = (form.row + 1).min(SettingsRow::ALL.len() - 1),
                Action::Left | Action::Right => cycle_setting(form),
                _ => {}
            },
            ModalState::ContextMenu { index, .. } => match action {
                Action::Up => *index = index.saturating_sub(1),
                Action::Down => *index = (*index + 1).min(CONTEXT_MENU_ITEMS.len() - 1),
                Action::ContextMenu => return self.close_modal(),
                _ => {}
            },
            _ => {}
        }
        Task::none()
    }

    /// A row of the open list was chosen, by click or by confirm.
    fn activate_row(&mut self, index: usize) -> Task<Message> {
        if !self.modal.is_open() {
            if self.view_mode == ViewMode::Grid {
                return self.activate_grid_item(index);
            }
            return Task::none();
        }

        match &mut self.modal {
            ModalState::Settings(form) => {
                form.row = index.min(SettingsRow::ALL.len() - 1);
                match form.selected_row() {
                    SettingsRow::ApiKey => Task::none(),
                    SettingsRow::DefaultView | SettingsRow::Theme => {
                        cycle_setting(form);
                        Task::none()
                    }
                    SettingsRow::RefreshLibrary => {
                        self.modal = ModalState::None;
                        self.refresh_library()
                    }
                    SettingsRow::Save => self.submit_modal(),
                }
            }
            ModalState::ContextMenu { game, .. } => {
                let game = game.clone();
                self.modal = ModalState::None;
                match CONTEXT_MENU_ITEMS.get(index).copied() {
                    Some("Launch") => self.request_launch(game),
                    Some("Edit") => {
                        self.modal = ModalState::GameForm(GameForm::for_game(&game));
                        Task::none()
                    }
                    Some("Delete") => {
                        self.modal = ModalState::ConfirmDelete(game);
                        Task::none()
                    }
                    _ => Task::none(),
                }
            }
            _ => Task::none(),
        }
    }

    fn submit_modal(&mut self) -> Task<Message> {
        match std::mem::replace(&mut self.modal, ModalState::None) {
            ModalState::Welcome => {
                self.mark_launched();
                self.open_settings();
                Task::none()
            }
            ModalState::Settings(form) => self.save_settings(form),
            ModalState::GameForm(form) => self.save_game_form(form),
            ModalState::ConfirmLaunch(game) => self.launch(game),
            ModalState::ConfirmDelete(game) => self.delete_game(game),
            ModalState::ContextMenu { game, index } => {
                self.modal = ModalState::ContextMenu { game, index };
                self.activate_row(index)
            }
            ModalState::None => Task::none(),
        }
    }

    fn close_modal(&mut self) -> Task<Message> {
        if matches!(self.modal, ModalState::Welcome) {
            self.mark_launched();
        }
        self.modal = ModalState::None;
        Task::none()
    }

    fn set_field(&mut self, field: FormField, value: String) {
        match (&mut self.modal, field) {
            (ModalState::Settings(form), FormField::ApiKey) => form.api_key = value,
            (ModalState::GameForm(form), FormField::Title) => form.title = value,
            (ModalState::GameForm(form), FormField::Executable) => form.executable = value,
            (ModalState::GameForm(form), FormField::Cover) => form.cover = value,
            _ => {}
        }
    }

    fn save_settings(&mut self, form: SettingsForm) -> Task<Message> {
        let api_key_changed = form.api_key.trim() != self.library.api_key();
        let results = [
            self.library.set_api_key(&form.api_key),
            self.library.set_default_view_mode(form.default_view),
            self.library.set_theme(form.theme),
        ];
        if let Some(err) = results.into_iter().find_map(Result::err) {
            warn!("Failed to save settings: {}", err);
            self.status_message = Some(format!("Failed to save settings: {}", err));
        }

        self.theme = form.theme;
        self.view_mode = form.default_view;
        if api_key_changed {
            info!("API key changed, rebuilding game metadata");
            return self.refresh_library();
        }
        Task::none()
    }

    fn save_game_form(&mut self, form: GameForm) -> Task<Message> {
        let executable_path = PathBuf::from(form.executable.trim());
        let cover = Some(form.cover.trim()).filter(|c| !c.is_empty());

        let result = match &form.editing {
            None => self
                .library
                .save_manual_game(NewManualGame {
                    title: form.title.clone(),
                    executable_path,
                    cover_source: cover.map(PathBuf::from),
                })
                .map(|_| ()),
            Some(id) => self
                .library
                .update_manual_game(ManualGameUpdate {
                    id: id.clone(),
                    title: Some(form.title.clone()),
                    executable_path: Some(executable_path),
                    cover_art: cover.map(str::to_string),
                })
                .map(|_| ()),
        };

        match result {
            Ok(()) => self.load_library(),
            Err(e) => {
                self.modal = ModalState::GameForm(GameForm {
                    error: Some(e.to_string()),
                    ..form
                });
                Task::none()
            }
        }
    }

    fn delete_game(&mut self, game: GameRecord) -> Task<Message> {
        match self.library.delete_manual_game(&game.id) {
            Ok(()) => self.load_library(),
            Err(e) => {
                warn!("Failed to delete {}: {}", game.title, e);
                self.status_message = Some(e.to_string());
                Task::none()
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let palette = Palette::for_theme(self.theme);
        let lookup = CoverLookup {
            covers: self.library.covers(),
            art: &self.art,
        };
        let categories_focused =
            self.view_mode == ViewMode::Grid || self.nav.focus() == NavFocus::Categories;

        let content: Element<'_, Message> = if !self.loaded {
            render_empty("Scanning library...", palette)
        } else {
            match self.view_mode {
                ViewMode::Grid => {
                    let games = self.grid_games();
                    let body = if games.is_empty() {
                        render_empty("No games found.", palette)
                    } else {
                        render_grid(&games, self.grid_index, self.cols, &lookup, palette)
                    };
                    Column::new()
                        .push(
                            Container::new(render_search(&self.search, palette))
                                .padding([0.0, OUTER_PADDING]),
                        )
                        .push(body)
                        .spacing(12)
                        .into()
                }
                ViewMode::Carousel => render_carousel(&self.nav, &lookup, palette),
            }
        };

        let mut column = Column::new()
            .push(render_header(
                self.nav.category(),
                categories_focused,
                self.view_mode,
                palette,
            ))
            .push(content)
            .spacing(16)
            .padding([OUTER_PADDING, 0.0]);
        if let Some(status) = &self.status_message {
            column = column.push(render_status(status, palette));
        }
        if !self.modal.is_open() {
            column = column.push(render_controls_hint(palette));
        }

        let backdrop_image = self
            .backdrop
            .as_ref()
            .and_then(|game| lookup.image_for(game));
        let foreground = Container::new(column)
            .width(Length::Fill)
            .height(Length::Fill)
            .style(move |_theme| iced::widget::container::Style {
                text_color: Some(palette.text),
                ..Default::default()
            });
        let main_content: Element<'_, Message> = Stack::new()
            .push(render_backdrop(backdrop_image.as_deref(), palette))
            .push(foreground)
            .into();

        match self.render_modal_layer(palette) {
            Some(overlay) => Stack::new().push(main_content).push(overlay).into(),
            None => main_content,
        }
    }

    fn render_modal_layer(&self, palette: Palette) -> Option<Element<'_, Message>> {
        if let Some(title) = &self.running_game {
            return Some(render_running(title, palette));
        }
        match &self.modal {
            ModalState::Welcome => Some(render_welcome(palette)),
            ModalState::Settings(form) => Some(render_settings(form, palette)),
            ModalState::GameForm(form) => Some(render_game_form(form, palette)),
            ModalState::ContextMenu { game, index } => {
                Some(render_context_menu(game, *index, palette))
            }
            ModalState::ConfirmLaunch(game) => Some(render_confirm_launch(game, palette)),
            ModalState::ConfirmDelete(game) => Some(render_confirm_delete(game, palette)),
            ModalState::None => None,
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        // Input stays off while a launched game is running
        if self.running_game.is_some() {
            return Subscription::none();
        }

        let gamepad = gamepad_subscription().map(Message::Input);

        let window_events = iced::event::listen_with(|event, _status, _window| match event {
            Event::Window(window::Event::Resized(size)) => {
                Some(Message::WindowResized(size.width, size.height))
            }
            _ => None,
        });

        let input = iced::event::listen_with(|event, status, _window| {
            if let iced::event::Status::Captured = status {
                return None;
            }

            match event {
                Event::Keyboard(keyboard::Event::KeyPressed { key, modifiers, .. }) => {
                    action_for_key(key.as_ref(), modifiers.shift()).map(Message::Input)
                }
                // Wheel down moves forward through the carousel.
                Event::Mouse(mouse::Event::WheelScrolled { delta }) => {
                    let y = match delta {
                        ScrollDelta::Lines { y, .. } | ScrollDelta::Pixels { y, .. } => y,
                    };
                    Some(Message::WheelScrolled(-y))
                }
                _ => None,
            }
        });

        Subscription::batch(vec![gamepad, input, window_events])
    }
}

fn action_for_key(key: Key<&str>, shift: bool) -> Option<Action> {
    match key {
        Key::Named(Named::ArrowUp) => Some(Action::Up),
        Key::Named(Named::ArrowDown) => Some(Action::Down),
        Key::Named(Named::ArrowLeft) => Some(Action::Left),
        Key::Named(Named::ArrowRight) => Some(Action::Right),
        Key::Named(Named::Enter) => Some(Action::Select),
        Key::Named(Named::Escape) => Some(Action::Back),
        Key::Named(Named::Tab) if shift => Some(Action::PrevCategory),
        Key::Named(Named::Tab) => Some(Action::NextCategory),
        Key::Named(Named::F4) => Some(Action::Quit),
        Key::Named(Named::F5) => Some(Action::Refresh),
        Key::Character("c") => Some(Action::ContextMenu),
        Key::Character("a") | Key::Character("+") => Some(Action::AddGame),
        Key::Character("v") => Some(Action::ToggleView),
        Key::Character("s") => Some(Action::OpenSettings),
        _ => None,
    }
}

fn cycle_setting(form: &mut SettingsForm) {
    match form.selected_row() {
        SettingsRow::DefaultView => form.default_view = form.default_view.toggled(),
        SettingsRow::Theme => {
            form.theme = match form.theme {
                AppTheme::Default => AppTheme::Monotone,
                AppTheme::Monotone => AppTheme::Default,
            }
        }
        _ => {}
    }
}
