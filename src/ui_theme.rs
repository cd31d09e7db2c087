use iced::Color;

use crate::storage::AppTheme;

// Dimensions
pub const GAME_POSTER_WIDTH: f32 = 200.0;
pub const GAME_POSTER_HEIGHT: f32 = 300.0;
pub const GRID_ITEM_WIDTH: f32 = GAME_POSTER_WIDTH + 16.0;
pub const CAROUSEL_POSTER_WIDTH: f32 = 260.0;
pub const CAROUSEL_POSTER_HEIGHT: f32 = 390.0;
pub const MODAL_WIDTH: f32 = 560.0;
pub const MODAL_WIDTH_CONTEXT_MENU: f32 = 320.0;

// Layout
pub const ITEM_SPACING: f32 = 10.0;
pub const OUTER_PADDING: f32 = 20.0;
pub const CAROUSEL_VISIBLE_NEIGHBOURS: usize = 2;
pub const BACKDROP_OPACITY: f32 = 0.25;

// Fixed status colors, shared by both palettes
pub const COLOR_STATUS_TEXT: Color = Color::from_rgb(0.9, 0.8, 0.4);
pub const COLOR_ERROR: Color = Color::from_rgb(0.96, 0.26, 0.21);

/// Colors of one UI theme.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Palette {
    pub background: Color,
    pub panel: Color,
    pub accent: Color,
    pub text: Color,
    pub text_muted: Color,
    pub text_dim: Color,
    pub overlay: Color,
}

// #0B1016 / #162231 / #4CC9F0
const DEFAULT_PALETTE: Palette = Palette {
    background: Color::from_rgb(0.04, 0.06, 0.09),
    panel: Color::from_rgb(0.09, 0.13, 0.19),
    accent: Color::from_rgb(0.30, 0.79, 0.94),
    text: Color::from_rgb(0.94, 0.96, 0.97),
    text_muted: Color::from_rgb(0.58, 0.64, 0.72),
    text_dim: Color::from_rgb(0.40, 0.44, 0.50),
    overlay: Color::from_rgba(0.04, 0.06, 0.09, 0.7),
};

const MONOTONE_PALETTE: Palette = Palette {
    background: Color::from_rgb(0.07, 0.07, 0.07),
    panel: Color::from_rgb(0.15, 0.15, 0.15),
    accent: Color::from_rgb(0.85, 0.85, 0.85),
    text: Color::from_rgb(0.95, 0.95, 0.95),
    text_muted: Color::from_rgb(0.62, 0.62, 0.62),
    text_dim: Color::from_rgb(0.42, 0.42, 0.42),
    overlay: Color::from_rgba(0.0, 0.0, 0.0, 0.75),
};

impl Palette {
    pub fn for_theme(theme: AppTheme) -> Self {
        match theme {
            AppTheme::Default => DEFAULT_PALETTE,
            AppTheme::Monotone => MONOTONE_PALETTE,
        }
    }

    /// Text drawn on top of the accent color.
    pub fn on_accent(&self) -> Color {
        if self.accent.r + self.accent.g + self.accent.b > 2.2 {
            self.background
        } else {
            Color::WHITE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palettes_differ() {
        assert_ne!(
            Palette::for_theme(AppTheme::Default),
            Palette::for_theme(AppTheme::Monotone)
        );
    }

    #[test]
    fn test_on_accent_keeps_contrast() {
        assert_eq!(
            Palette::for_theme(AppTheme::Default).on_accent(),
            Color::WHITE
        );
        let monotone = Palette::for_theme(AppTheme::Monotone);
        assert_eq!(monotone.on_accent(), monotone.background);
    }
}
