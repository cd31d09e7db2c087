use iced::alignment::{Horizontal, Vertical};
use iced::widget::{mouse_area, text_input, Column, Container, Grid, Row, Scrollable, Text};
use iced::{Color, Element, Length};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::covers::CoverStore;
use crate::messages::Message;
use crate::model::{Category, GameRecord};
use crate::navigation::{CarouselNav, NavFocus};
use crate::storage::ViewMode;
use crate::ui_components::render_cover;
use crate::ui_theme::*;

/// Where the displayable image of each game lives.
pub struct CoverLookup<'a> {
    pub covers: &'a CoverStore,
    pub art: &'a HashMap<String, PathBuf>,
}

impl CoverLookup<'_> {
    pub fn image_for(&self, game: &GameRecord) -> Option<PathBuf> {
        if CoverStore::is_app_owned(&game.cover_art) {
            self.covers.resolve(&game.cover_art)
        } else {
            self.art.get(&game.id).cloned()
        }
    }
}

pub fn grid_columns(window_width: f32) -> usize {
    let available_width = window_width - 2.0 * OUTER_PADDING;
    let cols = (available_width / (GRID_ITEM_WIDTH + ITEM_SPACING)).floor() as usize;
    cols.max(1)
}

pub fn render_header<'a>(
    category: Category,
    categories_focused: bool,
    view_mode: ViewMode,
    palette: Palette,
) -> Element<'a, Message> {
    let mut tabs = Row::new().spacing(12).align_y(Vertical::Center);
    for tab_category in Category::ALL {
        let is_selected = tab_category == category;
        let (background, color) = match (is_selected, categories_focused) {
            (true, true) => (palette.accent, palette.on_accent()),
            (true, false) => (palette.panel, palette.text),
            (false, _) => (Color::TRANSPARENT, palette.text_muted),
        };

        let tab = Container::new(Text::new(tab_category.title()).size(22).color(color))
            .padding(8)
            .style(move |_theme| iced::widget::container::Style {
                background: Some(background.into()),
                border: iced::Border {
                    color: palette.accent,
                    width: if is_selected { 1.0 } else { 0.0 },
                    radius: 4.0.into(),
                },
                ..Default::default()
            });
        tabs = tabs.push(tab);
    }

    let mode = Text::new(format!("{} view", view_mode.title()))
        .size(14)
        .color(palette.text_dim);

    Row::new()
        .push(Container::new(tabs).width(Length::Fill))
        .push(mode)
        .align_y(Vertical::Center)
        .padding([0.0, OUTER_PADDING])
        .into()
}

pub fn render_search<'a>(query: &str, palette: Palette) -> Element<'a, Message> {
    let input = text_input("Search games...", query)
        .on_input(Message::SearchChanged)
        .padding(8)
        .size(16);

    Container::new(input)
        .width(Length::Fixed(420.0))
        .style(move |_| iced::widget::container::Style {
            text_color: Some(palette.text),
            ..Default::default()
        })
        .into()
}

pub fn render_empty<'a>(message: &str, palette: Palette) -> Element<'a, Message> {
    Container::new(Text::new(message.to_string()).size(18).color(palette.text_muted))
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

pub fn render_grid<'a>(
    games: &[&GameRecord],
    selected_index: usize,
    cols: usize,
    lookup: &CoverLookup<'_>,
    palette: Palette,
) -> Element<'a, Message> {
    let mut grid = Grid::new()
        .columns(cols)
        .spacing(ITEM_SPACING)
        .height(Length::Shrink);

    for (i, game) in games.iter().enumerate() {
        let is_selected = i == selected_index;
        let item = render_grid_item(game, is_selected, lookup, palette);
        grid = grid.push(mouse_area(item).on_press(Message::ActivateRow(i)));
    }

    Scrollable::new(Container::new(grid).padding([0.0, OUTER_PADDING]))
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

fn render_grid_item<'a>(
    game: &GameRecord,
    is_selected: bool,
    lookup: &CoverLookup<'_>,
    palette: Palette,
) -> Element<'a, Message> {
    let cover = render_cover(
        lookup.image_for(game).as_deref(),
        &game.title,
        GAME_POSTER_WIDTH,
        GAME_POSTER_HEIGHT,
        palette,
    );

    let content = Column::new()
        .push(Container::new(cover).padding(6))
        .push(render_game_label(game, GRID_ITEM_WIDTH, 14.0, palette))
        .align_x(iced::Alignment::Center)
        .spacing(5);

    Container::new(content)
        .width(Length::Fixed(GRID_ITEM_WIDTH))
        .padding(6)
        .style(move |_theme| selection_style(is_selected, palette))
        .into()
}

/// Title plus a marker for manual games whose executable is gone.
fn render_game_label<'a>(
    game: &GameRecord,
    width: f32,
    size: f32,
    palette: Palette,
) -> Element<'a, Message> {
    let title_color = if game.is_launchable() {
        palette.text
    } else {
        palette.text_dim
    };
    let mut label = Column::new().width(Length::Fixed(width)).push(
        Text::new(game.title.clone())
            .size(size)
            .width(Length::Fill)
            .align_x(Horizontal::Center)
            .color(title_color),
    );
    if !game.is_launchable() {
        label = label.push(
            Text::new("Executable missing")
                .size(size * 0.8)
                .width(Length::Fill)
                .align_x(Horizontal::Center)
                .color(COLOR_ERROR),
        );
    }
    label.into()
}

fn selection_style(is_selected: bool, palette: Palette) -> iced::widget::container::Style {
    if is_selected {
        iced::widget::container::Style {
            border: iced::Border {
                color: palette.accent,
                width: 2.0,
                radius: 4.0.into(),
            },
            ..Default::default()
        }
    } else {
        iced::widget::container::Style::default()
    }
}

/// One horizontal row centered on the active game, with a few neighbours on
/// each side.
pub fn render_carousel<'a>(
    nav: &CarouselNav,
    lookup: &CoverLookup<'_>,
    palette: Palette,
) -> Element<'a, Message> {
    let games = nav.filtered();
    let Some(active) = games.get(nav.active_index()) else {
        return render_empty("No games in this category.", palette);
    };
    let carousel_focused = nav.focus() == NavFocus::Carousel;

    let first = nav
        .active_index()
        .saturating_sub(CAROUSEL_VISIBLE_NEIGHBOURS);
    let last = (nav.active_index() + CAROUSEL_VISIBLE_NEIGHBOURS).min(games.len() - 1);

    let mut row = Row::new()
        .spacing(ITEM_SPACING * 2.0)
        .align_y(Vertical::Center);
    for (offset, game) in games[first..=last].iter().enumerate() {
        let is_active = first + offset == nav.active_index();
        let (width, height) = if is_active {
            (CAROUSEL_POSTER_WIDTH, CAROUSEL_POSTER_HEIGHT)
        } else {
            (GAME_POSTER_WIDTH * 0.8, GAME_POSTER_HEIGHT * 0.8)
        };
        let cover = render_cover(
            lookup.image_for(game).as_deref(),
            &game.title,
            width,
            height,
            palette,
        );
        row = row.push(
            Container::new(cover)
                .padding(4)
                .style(move |_| selection_style(is_active && carousel_focused, palette)),
        );
    }

    let details = Column::new()
        .push(render_game_label(active, CAROUSEL_POSTER_WIDTH * 3.0, 32.0, palette))
        .push(
            Text::new(format!("{} of {}", nav.active_index() + 1, games.len()))
                .size(14)
                .color(palette.text_dim),
        )
        .align_x(iced::Alignment::Center)
        .spacing(8);

    Container::new(
        Column::new()
            .push(row)
            .push(details)
            .align_x(iced::Alignment::Center)
            .spacing(24),
    )
    .width(Length::Fill)
    .height(Length::Fill)
    .center_x(Length::Fill)
    .center_y(Length::Fill)
    .into()
}

pub fn render_status<'a>(status: &str, palette: Palette) -> Element<'a, Message> {
    Container::new(Text::new(status.to_string()).color(COLOR_STATUS_TEXT))
        .padding(8)
        .width(Length::Fill)
        .center_x(Length::Fill)
        .style(move |_theme| iced::widget::container::Style {
            background: Some(palette.panel.into()),
            ..Default::default()
        })
        .into()
}

pub fn render_controls_hint<'a>(palette: Palette) -> Element<'a, Message> {
    let hint = Text::new(
        "Enter: launch   C: menu   A: add game   V: switch view   S: settings   F5: refresh",
    )
    .size(14)
    .color(palette.text_dim);

    Container::new(hint)
        .width(Length::Fill)
        .center_x(Length::Fill)
        .padding(10)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_grid_columns() {
        assert_eq!(grid_columns(0.0), 1);
        assert_eq!(grid_columns(1280.0), 5);
        assert_eq!(grid_columns(1920.0), 8);
    }

    #[test]
    fn test_cover_lookup_prefers_app_owned_files() {
        let dir = TempDir::new().unwrap();
        let covers = CoverStore::new(dir.path().to_path_buf());
        let mut art = HashMap::new();
        art.insert("570".to_string(), PathBuf::from("/cache/570.png"));
        let lookup = CoverLookup {
            covers: &covers,
            art: &art,
        };

        let mut steam = GameRecord::steam("570", "Dota 2");
        steam.cover_art = "https://cdn/570/header.jpg".to_string();
        assert_eq!(lookup.image_for(&steam), Some(PathBuf::from("/cache/570.png")));

        let mut manual = GameRecord::manual("Doom", PathBuf::from("/doom"));
        manual.cover_art = "local-file://covers/doom.png".to_string();
        assert_eq!(
            lookup.image_for(&manual),
            Some(covers.covers_dir().join("doom.png"))
        );

        let bare = GameRecord::steam("10", "Counter-Strike");
        assert_eq!(lookup.image_for(&bare), None);
    }
}
