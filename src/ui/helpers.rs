//! UI helper functions

use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Create a centered rect using up certain percentage of the available rect
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Wrap text to a display width. Words wider than the line are broken
/// at character boundaries; existing line breaks are kept.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let word_width = word.width();
            let current_width = current.width();
            if !current.is_empty() && current_width + 1 + word_width <= width {
                current.push(' ');
                current.push_str(word);
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if word_width <= width {
                current.push_str(word);
            } else {
                let mut used = 0;
                for ch in word.chars() {
                    let w = ch.width().unwrap_or(0);
                    if used + w > width && !current.is_empty() {
                        lines.push(std::mem::take(&mut current));
                        used = 0;
                    }
                    current.push(ch);
                    used += w;
                }
            }
        }
        lines.push(current);
    }
    lines
}

/// Short age label for list rows ("just now", "5m ago", "3d ago")
pub fn relative_time(timestamp_ms: i64, now: DateTime<Utc>) -> String {
    let age_secs = (now.timestamp_millis() - timestamp_ms).max(0) / 1000;
    match age_secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", age_secs / 60),
        3600..=86_399 => format!("{}h ago", age_secs / 3600),
        _ => format!("{}d ago", age_secs / 86_400),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_text_single_line() {
        assert_eq!(wrap_text("hello", 10), vec!["hello"]);
    }

    #[test]
    fn test_wrap_text_multiple_lines() {
        let result = wrap_text("hello world foo bar", 10);
        assert!(result.len() > 1);
        for line in &result {
            assert!(line.width() <= 10);
        }
    }

    #[test]
    fn test_wrap_text_keeps_paragraphs() {
        assert_eq!(wrap_text("one\n\ntwo", 20), vec!["one", "", "two"]);
    }

    #[test]
    fn test_wrap_text_breaks_long_multibyte_words() {
        let result = wrap_text("ééééééé", 3);
        assert_eq!(result, vec!["ééé", "ééé", "é"]);
    }

    #[test]
    fn test_relative_time_buckets() {
        let now = Utc::now();
        let ms = now.timestamp_millis();
        assert_eq!(relative_time(ms - 5_000, now), "just now");
        assert_eq!(relative_time(ms - 5 * 60_000, now), "5m ago");
        assert_eq!(relative_time(ms - 3 * 86_400_000, now), "3d ago");
    }

    #[test]
    fn test_centered_rect() {
        let parent = Rect::new(0, 0, 100, 100);
        let centered = centered_rect(50, 50, parent);
        assert!(centered.x > 0);
        assert!(centered.y > 0);
        assert!(centered.width < 100);
        assert!(centered.height < 100);
    }
}
