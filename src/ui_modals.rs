use iced::widget::{button, mouse_area, text_input, Column, Row, Text};
use iced::{Element, Length};

use crate::messages::Message;
use crate::model::GameRecord;
use crate::ui_components::{render_menu_row, render_modal_frame};
use crate::ui_state::{
    FormField, GameForm, SettingsForm, SettingsRow, CONTEXT_MENU_ITEMS,
};
use crate::ui_theme::*;

fn title<'a>(label: &str, palette: Palette) -> Element<'a, Message> {
    Text::new(label.to_string())
        .size(26)
        .color(palette.text)
        .into()
}

fn dialog_buttons<'a>(confirm: &str, cancel: &str) -> Element<'a, Message> {
    Row::new()
        .push(button(Text::new(cancel.to_string())).on_press(Message::CloseModal))
        .push(button(Text::new(confirm.to_string())).on_press(Message::SubmitForm))
        .spacing(12)
        .into()
}

pub fn render_welcome<'a>(palette: Palette) -> Element<'a, Message> {
    let body = Column::new()
        .push(title("Welcome to Game Shelf", palette))
        .push(
            Text::new(
                "Installed Steam games are found automatically. Add a Steam Web API key \
                 in the settings to download cover art, or add other games by hand.",
            )
            .color(palette.text_muted),
        )
        .push(dialog_buttons("Open settings", "Later"))
        .spacing(16);

    render_modal_frame(body.into(), MODAL_WIDTH, palette)
}

pub fn render_settings<'a>(form: &SettingsForm, palette: Palette) -> Element<'a, Message> {
    let selected = form.selected_row();
    let mut rows = Column::new().spacing(6);

    for (i, row) in SettingsRow::ALL.into_iter().enumerate() {
        let label = match row {
            SettingsRow::ApiKey => "Steam API key".to_string(),
            SettingsRow::DefaultView => format!("Default view: < {} >", form.default_view.title()),
            SettingsRow::Theme => format!("Theme: < {} >", form.theme.title()),
            SettingsRow::RefreshLibrary => "Refresh library metadata".to_string(),
            SettingsRow::Save => "Save".to_string(),
        };
        let line = mouse_area(render_menu_row(label, row == selected, palette))
            .on_press(Message::ActivateRow(i));
        rows = rows.push(line);

        if row == SettingsRow::ApiKey {
            rows = rows.push(
                text_input("Paste your Steam Web API key", &form.api_key)
                    .on_input(|value| Message::FieldChanged(FormField::ApiKey, value))
                    .on_submit(Message::SubmitForm)
                    .secure(true)
                    .padding(8),
            );
        }
    }

    let body = Column::new()
        .push(title("Settings", palette))
        .push(rows)
        .push(
            Text::new("Up/Down: select   Left/Right: change   Enter: apply   Esc: close")
                .size(13)
                .color(palette.text_dim),
        )
        .spacing(16);

    render_modal_frame(body.into(), MODAL_WIDTH, palette)
}

pub fn render_game_form<'a>(form: &GameForm, palette: Palette) -> Element<'a, Message> {
    let heading = if form.editing.is_some() {
        "Edit game"
    } else {
        "Add game"
    };
    let cover_hint = if form.editing.is_some() {
        "New cover image (leave empty to keep the current one)"
    } else {
        "Cover image path (optional)"
    };

    let field = |label: &str, placeholder: &str, value: &str, field: FormField| {
        Column::new()
            .push(Text::new(label.to_string()).size(14).color(palette.text_muted))
            .push(
                text_input(placeholder, value)
                    .on_input(move |value| Message::FieldChanged(field, value))
                    .on_submit(Message::SubmitForm)
                    .padding(8),
            )
            .spacing(4)
    };

    let mut body = Column::new()
        .push(title(heading, palette))
        .push(field("Title", "Game title", &form.title, FormField::Title))
        .push(field(
            "Executable",
            "/path/to/game",
            &form.executable,
            FormField::Executable,
        ))
        .push(field(cover_hint, "/path/to/cover.png", &form.cover, FormField::Cover))
        .spacing(14);

    if let Some(error) = &form.error {
        body = body.push(Text::new(error.clone()).color(COLOR_ERROR));
    }
    body = body.push(dialog_buttons("Save", "Cancel"));

    render_modal_frame(body.into(), MODAL_WIDTH, palette)
}

pub fn render_context_menu<'a>(
    game: &GameRecord,
    selected_index: usize,
    palette: Palette,
) -> Element<'a, Message> {
    let mut column = Column::new()
        .push(
            Text::new(game.title.clone())
                .size(18)
                .color(palette.text_dim),
        )
        .spacing(6)
        .width(Length::Fill);

    for (i, item) in CONTEXT_MENU_ITEMS.iter().enumerate() {
        column = column.push(
            mouse_area(render_menu_row(
                item.to_string(),
                i == selected_index,
                palette,
            ))
            .on_press(Message::ActivateRow(i)),
        );
    }

    render_modal_frame(column.into(), MODAL_WIDTH_CONTEXT_MENU, palette)
}

pub fn render_confirm_launch<'a>(game: &GameRecord, palette: Palette) -> Element<'a, Message> {
    let body = Column::new()
        .push(title("Launch game", palette))
        .push(Text::new(format!("Launch \"{}\"?", game.title)).color(palette.text_muted))
        .push(dialog_buttons("Launch", "Cancel"))
        .spacing(16);

    render_modal_frame(body.into(), MODAL_WIDTH, palette)
}

pub fn render_confirm_delete<'a>(game: &GameRecord, palette: Palette) -> Element<'a, Message> {
    let body = Column::new()
        .push(title("Remove game", palette))
        .push(
            Text::new(format!("Remove \"{}\" from the library?", game.title))
                .color(palette.text_muted),
        )
        .push(dialog_buttons("Remove", "Cancel"))
        .spacing(16);

    render_modal_frame(body.into(), MODAL_WIDTH, palette)
}

pub fn render_running<'a>(title: &str, palette: Palette) -> Element<'a, Message> {
    let body = Column::new()
        .push(Text::new(format!("Running {}...", title)).size(22).color(palette.text))
        .push(
            Text::new("The launcher resumes when the game exits.")
                .size(14)
                .color(palette.text_dim),
        )
        .spacing(8);

    render_modal_frame(body.into(), MODAL_WIDTH, palette)
}
