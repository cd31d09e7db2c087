//! Focus state machine of the carousel view.
//!
//! Two rows can hold focus: the category selector and the game carousel.
//! Every change of the visible list or of the active game is reported as a
//! [`NavEvent::Selected`], so the caller can keep its background art in sync.

use crate::input::Action;
use crate::model::{Category, GameRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavFocus {
    Categories,
    Carousel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavEvent {
    /// The active game changed; `None` when the category is empty.
    Selected(Option<GameRecord>),
    Launch(GameRecord),
}

#[derive(Debug, Clone)]
pub struct CarouselNav {
    games: Vec<GameRecord>,
    focus: NavFocus,
    selected_category: usize,
    active_game: usize,
}

impl Default for CarouselNav {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl CarouselNav {
    pub fn new(games: Vec<GameRecord>) -> Self {
        Self {
            games,
            focus: NavFocus::Categories,
            selected_category: 0,
            active_game: 0,
        }
    }

    pub fn focus(&self) -> NavFocus {
        self.focus
    }

    pub fn category(&self) -> Category {
        Category::ALL[self.selected_category]
    }

    pub fn active_index(&self) -> usize {
        self.active_game
    }

    pub fn games(&self) -> &[GameRecord] {
        &self.games
    }

    /// Games of the selected category, in library order.
    pub fn filtered(&self) -> Vec<&GameRecord> {
        let category = self.category();
        self.games.iter().filter(|g| category.matches(g)).collect()
    }

    pub fn active_game(&self) -> Option<&GameRecord> {
        self.filtered().get(self.active_game).copied()
    }

    /// Replace the library contents, keeping the category and clamping the
    /// active index.
    pub fn set_games(&mut self, games: Vec<GameRecord>) -> NavEvent {
        self.games = games;
        let len = self.filtered().len();
        if len == 0 {
            self.active_game = 0;
            self.focus = NavFocus::Categories;
        } else if self.active_game >= len {
            self.active_game = len - 1;
        }
        self.selection()
    }

    /// Apply a directional or confirm input. Returns an event when the
    /// selection changed or a launch was requested.
    pub fn handle(&mut self, action: Action) -> Option<NavEvent> {
        match self.focus {
            NavFocus::Categories => match action {
                Action::Left => self.select_category(self.selected_category.saturating_sub(1)),
                Action::Right => self.select_category(
                    (self.selected_category + 1).min(Category::ALL.len() - 1),
                ),
                Action::Down => {
                    if !self.filtered().is_empty() {
                        self.focus = NavFocus::Carousel;
                    }
                    None
                }
                _ => None,
            },
            NavFocus::Carousel => match action {
                Action::Up => {
                    self.focus = NavFocus::Categories;
                    None
                }
                Action::Left => self.move_active(-1),
                Action::Right => self.move_active(1),
                Action::Select => self.active_game().cloned().map(NavEvent::Launch),
                _ => None,
            },
        }
    }

    /// Move the category selection by `step`, clamped to the ends, from
    /// either focus row.
    pub fn step_category(&mut self, step: isize) -> Option<NavEvent> {
        let index = self
            .selected_category
            .saturating_add_signed(step)
            .min(Category::ALL.len() - 1);
        let event = self.select_category(index);
        if self.filtered().is_empty() {
            self.focus = NavFocus::Categories;
        }
        event
    }

    /// Mouse wheel input; only moves the carousel while it has focus.
    pub fn scroll(&mut self, delta_y: f32) -> Option<NavEvent> {
        if self.focus != NavFocus::Carousel {
            return None;
        }
        if delta_y < 0.0 {
            self.move_active(-1)
        } else if delta_y > 0.0 {
            self.move_active(1)
        } else {
            None
        }
    }

    fn select_category(&mut self, index: usize) -> Option<NavEvent> {
        if index == self.selected_category {
            return None;
        }
        self.selected_category = index;
        self.active_game = 0;
        Some(self.selection())
    }

    fn move_active(&mut self, step: isize) -> Option<NavEvent> {
        let len = self.filtered().len();
        if len == 0 {
            return None;
        }
        let next = self
            .active_game
            .saturating_add_signed(step)
            .min(len - 1);
        if next == self.active_game {
            return None;
        }
        self.active_game = next;
        Some(self.selection())
    }

    fn selection(&self) -> NavEvent {
        NavEvent::Selected(self.active_game().cloned())
    }
}
