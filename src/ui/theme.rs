//! Greyscale theme for promptsmith
//! High-contrast monochrome palette with a few accent colors for status

use crate::editor::TokenKind;
use ratatui::style::{Color, Modifier, Style};

/// The greyscale color palette
pub struct Theme;

impl Theme {
    // ─────────────────────────────────────────────────────────────────────
    // Core greyscale palette - from brightest to darkest
    // ─────────────────────────────────────────────────────────────────────

    /// Pure white - maximum emphasis
    pub const WHITE: Color = Color::Rgb(255, 255, 255);

    /// Near white - headers, selected items
    pub const GREY_50: Color = Color::Rgb(250, 250, 250);

    /// Bright grey - primary text
    pub const GREY_100: Color = Color::Rgb(220, 220, 220);

    /// Light grey - secondary text
    pub const GREY_200: Color = Color::Rgb(180, 180, 180);

    /// Medium grey - muted text
    pub const GREY_300: Color = Color::Rgb(140, 140, 140);

    /// Dark grey - hints, markup markers
    pub const GREY_400: Color = Color::Rgb(100, 100, 100);

    /// Darker grey - borders
    pub const GREY_500: Color = Color::Rgb(70, 70, 70);

    /// Very dark grey - selection background
    pub const GREY_600: Color = Color::Rgb(45, 45, 45);

    /// Dark grey - overlay backgrounds
    pub const GREY_700: Color = Color::Rgb(35, 35, 35);

    /// Near black - panel background
    pub const GREY_800: Color = Color::Rgb(28, 28, 28);

    /// True black - deepest background
    pub const GREY_900: Color = Color::Rgb(18, 18, 18);

    pub const BG: Color = Self::GREY_900;

    // ─────────────────────────────────────────────────────────────────────
    // Accents
    // ─────────────────────────────────────────────────────────────────────

    pub const GREEN: Color = Color::Rgb(100, 200, 100);
    pub const RED: Color = Color::Rgb(200, 100, 100);
    pub const YELLOW: Color = Color::Rgb(220, 190, 100);
    pub const BLUE: Color = Color::Rgb(120, 160, 220);

    pub const LOGO: &'static str = "p r o m p t s m i t h";
    pub const TAGLINE: &'static str = "sharper prompts, one technique at a time";

    pub const BULLET_FILLED: char = '●';
    pub const BULLET_EMPTY: char = '○';
    pub const STAR: char = '★';
    pub const ARROW_RIGHT: char = '▸';
    pub const CHECK_MARK: char = '✓';
    pub const CROSS_MARK: char = '✗';
    pub const DOT_SEPARATOR: char = '·';

    // ─────────────────────────────────────────────────────────────────────
    // Pre-built styles
    // ─────────────────────────────────────────────────────────────────────

    pub fn bg() -> Style {
        Style::default().bg(Self::GREY_900)
    }

    pub fn overlay_bg() -> Style {
        Style::default().bg(Self::GREY_800)
    }

    /// Primary text style
    pub fn text() -> Style {
        Style::default().fg(Self::GREY_100)
    }

    pub fn text_muted() -> Style {
        Style::default().fg(Self::GREY_300)
    }

    pub fn text_dim() -> Style {
        Style::default().fg(Self::GREY_400)
    }

    pub fn bold() -> Style {
        Style::default()
            .fg(Self::GREY_50)
            .add_modifier(Modifier::BOLD)
    }

    /// Selected/highlighted item
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::WHITE)
            .bg(Self::GREY_600)
            .add_modifier(Modifier::BOLD)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::GREY_500)
    }

    /// Border of the focused control
    pub fn border_active() -> Style {
        Style::default().fg(Self::GREY_100)
    }

    pub fn title() -> Style {
        Style::default()
            .fg(Self::GREY_100)
            .add_modifier(Modifier::BOLD)
    }

    /// Key hint in the footer
    pub fn key() -> Style {
        Style::default()
            .fg(Self::GREY_900)
            .bg(Self::GREY_300)
    }

    pub fn error() -> Style {
        Style::default().fg(Self::RED)
    }

    pub fn success() -> Style {
        Style::default().fg(Self::GREEN)
    }

    /// Color of a highlighted code token
    pub fn token(kind: TokenKind) -> Style {
        match kind {
            TokenKind::Plain => Style::default().fg(Self::GREY_100),
            TokenKind::Keyword => Style::default()
                .fg(Self::BLUE)
                .add_modifier(Modifier::BOLD),
            TokenKind::String => Style::default().fg(Self::GREEN),
            TokenKind::Number => Style::default().fg(Self::YELLOW),
            TokenKind::Comment => Style::default()
                .fg(Self::GREY_400)
                .add_modifier(Modifier::ITALIC),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_and_comment_styles_differ() {
        assert_ne!(Theme::token(TokenKind::Keyword), Theme::token(TokenKind::Comment));
        assert_eq!(Theme::token(TokenKind::Plain), Theme::text());
    }
}
