//! Styled text for the terminal
//!
//! Two renderers live here: `parse_markdown` turns streamed model output
//! into wrapped lines, `markup_lines` shows the editor's own markup with
//! its markers visible (so the caret maps 1:1 onto the text).

use super::helpers::wrap_text;
use super::theme::Theme;
use crate::editor::markup::{self, Emphasis, TextSize};
use crate::editor::{Editor, Selection};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

/// Parse markdown text and convert to styled Lines
pub fn parse_markdown(text: &str, max_width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut in_code_block = false;

    for line in text.lines() {
        if markup::is_fence(line) {
            in_code_block = !in_code_block;
            continue;
        }

        if in_code_block {
            lines.push(Line::from(Span::styled(
                format!("  {}", line),
                Theme::token(crate::editor::TokenKind::Plain).bg(Theme::GREY_800),
            )));
            continue;
        }

        if line.trim().is_empty() {
            lines.push(Line::from(""));
        } else if let Some(content) = line.strip_prefix("# ") {
            lines.push(heading(content, Theme::WHITE));
        } else if let Some(content) = line.strip_prefix("## ") {
            lines.push(heading(content, Theme::GREY_100));
        } else if let Some(content) = line.strip_prefix("### ") {
            lines.push(heading(content, Theme::GREY_200));
        } else if let Some(marker) = markup::list_marker(line) {
            let content: String = line.chars().skip(marker.prefix_len).collect();
            let bullet = match marker.kind {
                markup::ListKind::Bullet => "• ".to_string(),
                markup::ListKind::Numbered(n) => format!("{}. ", n),
            };
            let indent = " ".repeat(2 + marker.indent);
            let hang = " ".repeat(indent.len() + bullet.len());
            let wrapped = wrap_text(&content, max_width.saturating_sub(hang.len()));
            for (i, part) in wrapped.into_iter().enumerate() {
                let prefix = if i == 0 {
                    format!("{}{}", indent, bullet)
                } else {
                    hang.clone()
                };
                let mut spans = vec![Span::styled(prefix, Theme::text_dim())];
                spans.extend(inline_spans(&part, Theme::text()));
                lines.push(Line::from(spans));
            }
        } else if let Some(content) = line.strip_prefix("> ") {
            for part in wrap_text(content, max_width.saturating_sub(4)) {
                let mut spans = vec![Span::styled("  │ ", Style::default().fg(Theme::GREY_500))];
                spans.extend(inline_spans(&part, Theme::text_muted()));
                lines.push(Line::from(spans));
            }
        } else {
            for part in wrap_text(line, max_width) {
                lines.push(Line::from(inline_spans(&part, Theme::text())));
            }
        }
    }

    lines
}

fn heading(text: &str, color: ratatui::style::Color) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    ))
}

/// Inline emphasis and `code`, markers removed
fn inline_spans(text: &str, base: Style) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    let mut code = false;
    for (i, piece) in text.split('`').enumerate() {
        if i > 0 {
            code = !code;
        }
        if piece.is_empty() {
            continue;
        }
        if code {
            spans.push(Span::styled(
                piece.to_string(),
                Style::default()
                    .fg(Theme::GREY_200)
                    .add_modifier(Modifier::BOLD),
            ));
            continue;
        }

        let chars: Vec<char> = piece.chars().collect();
        let mut cursor = 0;
        for range in markup::inline_ranges(piece) {
            if range.start > cursor {
                spans.push(Span::styled(
                    chars[cursor..range.start].iter().collect::<String>(),
                    base,
                ));
            }
            let inner: String = chars[range.start + range.marker_len..range.end - range.marker_len]
                .iter()
                .collect();
            spans.push(Span::styled(inner, emphasis_style(base, range.emphasis)));
            cursor = range.end;
        }
        if cursor < chars.len() {
            spans.push(Span::styled(chars[cursor..].iter().collect::<String>(), base));
        }
    }
    if spans.is_empty() {
        spans.push(Span::raw(""));
    }
    spans
}

fn emphasis_style(base: Style, emphasis: Emphasis) -> Style {
    match emphasis {
        Emphasis::Bold => base.fg(Theme::WHITE).add_modifier(Modifier::BOLD),
        Emphasis::Italic => base.add_modifier(Modifier::ITALIC),
    }
}

// ─────────────────────────────────────────────────────────────────────────
//  Editor markup
// ─────────────────────────────────────────────────────────────────────────

/// One styled line per editor line. Markers stay visible but dimmed;
/// code lines use the editor's cached highlighting.
pub fn markup_lines(editor: &Editor, selection: Option<Selection>) -> Vec<Line<'static>> {
    let text = editor.text();
    let code = markup::code_line_flags(text);
    let starts = markup::line_starts(text);

    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            let mut styles = if markup::is_fence(line) {
                vec![Theme::text_dim(); line.chars().count()]
            } else if code.get(idx).copied().unwrap_or(false) {
                code_line_styles(editor, idx, line)
            } else {
                prose_line_styles(line)
            };

            if let Some(sel) = selection.filter(|s| !s.is_empty()) {
                let line_start = starts.get(idx).copied().unwrap_or(0);
                for (col, style) in styles.iter_mut().enumerate() {
                    if sel.contains(line_start + col) {
                        *style = style.bg(Theme::GREY_500);
                    }
                }
            }
            group_spans(line, &styles)
        })
        .collect()
}

fn code_line_styles(editor: &Editor, idx: usize, line: &str) -> Vec<Style> {
    let base = Theme::text().bg(Theme::GREY_800);
    let tokens = editor
        .highlights()
        .iter()
        .find(|block| idx >= block.first_line && idx < block.first_line + block.lines.len())
        .and_then(|block| block.lines.get(idx - block.first_line));

    let mut styles = Vec::with_capacity(line.len());
    if let Some(tokens) = tokens {
        for token in tokens {
            let style = Theme::token(token.kind).bg(Theme::GREY_800);
            styles.extend(std::iter::repeat(style).take(token.text.chars().count()));
        }
    }
    styles.resize(line.chars().count(), base);
    styles
}

fn prose_line_styles(line: &str) -> Vec<Style> {
    let (size, rest) = markup::split_size_prefix(line);
    let prefix_len = line.chars().count() - rest.chars().count();
    let base = match size {
        TextSize::Large => Theme::bold(),
        TextSize::Small => Theme::text_muted(),
        TextSize::Normal => Theme::text(),
    };

    let mut styles = vec![base; line.chars().count()];
    for style in styles.iter_mut().take(prefix_len) {
        *style = Theme::text_dim();
    }

    let marker_len = markup::list_marker(rest).map_or(0, |m| m.prefix_len);
    for style in styles.iter_mut().skip(prefix_len).take(marker_len) {
        *style = Style::default().fg(Theme::GREY_300);
    }

    let body_offset = prefix_len + marker_len;
    let body: String = rest.chars().skip(marker_len).collect();
    for range in markup::inline_ranges(&body) {
        let start = body_offset + range.start;
        let end = body_offset + range.end;
        for (i, style) in styles.iter_mut().enumerate().take(end).skip(start) {
            *style = if i < start + range.marker_len || i >= end - range.marker_len {
                Theme::text_dim()
            } else {
                emphasis_style(base, range.emphasis)
            };
        }
    }
    styles
}

/// Merge runs of equally styled chars into spans
fn group_spans(line: &str, styles: &[Style]) -> Line<'static> {
    let mut spans = Vec::new();
    let mut current = String::new();
    let mut current_style: Option<Style> = None;

    for (ch, style) in line.chars().zip(styles.iter().copied()) {
        if current_style != Some(style) && !current.is_empty() {
            spans.push(Span::styled(
                std::mem::take(&mut current),
                current_style.unwrap_or_default(),
            ));
        }
        current_style = Some(style);
        current.push(ch);
    }
    if !current.is_empty() {
        spans.push(Span::styled(current, current_style.unwrap_or_default()));
    }
    Line::from(spans)
}
