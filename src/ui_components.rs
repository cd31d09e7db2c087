use iced::alignment::Horizontal;
use iced::widget::{Column, Container, Image, Stack, Text};
use iced::{ContentFit, Element, Length};
use std::path::Path;

use crate::ui_theme::{Palette, BACKDROP_OPACITY};

/// Poster image, or the game title on a plain panel when there is no art.
pub fn render_cover<'a, Message>(
    image: Option<&Path>,
    title: &str,
    width: f32,
    height: f32,
    palette: Palette,
) -> Element<'a, Message>
where
    Message: 'a + Clone,
{
    if let Some(path) = image {
        return Image::new(path.to_path_buf())
            .width(Length::Fixed(width))
            .height(Length::Fixed(height))
            .content_fit(ContentFit::Contain)
            .into();
    }

    let text = Text::new(title.to_string())
        .size(18)
        .color(palette.text_muted)
        .align_x(Horizontal::Center);

    Container::new(text)
        .width(Length::Fixed(width))
        .height(Length::Fixed(height))
        .padding(12)
        .center_x(Length::Fixed(width))
        .center_y(Length::Fixed(height))
        .style(move |_theme| iced::widget::container::Style {
            background: Some(palette.panel.into()),
            ..Default::default()
        })
        .into()
}

/// Full-window layer behind the main view: the theme background with the
/// selected game's art faded over it.
pub fn render_backdrop<'a, Message>(image: Option<&Path>, palette: Palette) -> Element<'a, Message>
where
    Message: 'a,
{
    let base = Container::new(Column::new())
        .width(Length::Fill)
        .height(Length::Fill)
        .style(move |_theme| iced::widget::container::Style {
            background: Some(palette.background.into()),
            ..Default::default()
        });

    let mut layers = Stack::new()
        .width(Length::Fill)
        .height(Length::Fill)
        .push(base);
    if let Some(path) = image {
        layers = layers.push(
            Image::new(path.to_path_buf())
                .width(Length::Fill)
                .height(Length::Fill)
                .content_fit(ContentFit::Cover)
                .opacity(BACKDROP_OPACITY),
        );
    }
    layers.into()
}

/// Boxed modal content on a dimmed full-window overlay.
pub fn render_modal_frame<'a, Message>(
    content: Element<'a, Message>,
    width: f32,
    palette: Palette,
) -> Element<'a, Message>
where
    Message: 'a,
{
    let panel = Container::new(content)
        .width(Length::Fixed(width))
        .padding(20)
        .style(move |_| iced::widget::container::Style {
            background: Some(palette.panel.into()),
            text_color: Some(palette.text),
            border: iced::Border {
                color: palette.text_dim,
                width: 1.0,
                radius: 10.0.into(),
            },
            ..Default::default()
        });

    Container::new(panel)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .style(move |_| iced::widget::container::Style {
            background: Some(palette.overlay.into()),
            ..Default::default()
        })
        .into()
}

/// A single selectable line in a menu-like list.
pub fn render_menu_row<'a, Message>(
    label: String,
    is_selected: bool,
    palette: Palette,
) -> Element<'a, Message>
where
    Message: 'a,
{
    let (background, color) = if is_selected {
        (palette.accent, palette.on_accent())
    } else {
        (iced::Color::TRANSPARENT, palette.text_muted)
    };

    Container::new(Text::new(label).size(20).color(color))
        .padding(8)
        .width(Length::Fill)
        .style(move |_| iced::widget::container::Style {
            background: Some(background.into()),
            text_color: Some(color),
            border: iced::Border {
                radius: 4.0.into(),
                ..Default::default()
            },
            ..Default::default()
        })
        .into()
}
