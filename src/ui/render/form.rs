//! Left column: prompt editor, context note, mode, category and techniques

use crate::catalog;
use crate::ui::markdown::markup_lines;
use crate::ui::theme::Theme;
use crate::ui::{App, Focus, LineInput, Overlay};
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use unicode_width::UnicodeWidthStr;

const MAX_TECHNIQUE_ROWS: u16 = 6;

fn panel(title: &str, focused: bool) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(if focused {
            Theme::border_active()
        } else {
            Theme::border()
        })
        .title(Span::styled(format!(" {} ", title), Theme::title()))
}

pub(super) fn render_form(frame: &mut Frame, area: Rect, app: &App) {
    let draft = app.orchestrator.draft();
    let validation = app.orchestrator.validation_error();

    let mut constraints = vec![Constraint::Min(6)];
    if draft.automatic {
        constraints.push(Constraint::Length(3));
    }
    constraints.push(Constraint::Length(4));
    if !draft.automatic {
        let rows = (draft.techniques.len() as u16).clamp(1, MAX_TECHNIQUE_ROWS);
        constraints.push(Constraint::Length(rows + 2));
    }
    if validation.is_some() {
        constraints.push(Constraint::Length(1));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    let mut next = chunks.iter().copied();

    if let Some(rect) = next.next() {
        render_editor(frame, rect, app);
    }
    if draft.automatic {
        if let Some(rect) = next.next() {
            render_line_input(
                frame,
                rect,
                "CONTEXT (optional)",
                &app.context_input,
                app.focus == Focus::Context && app.overlay == Overlay::None,
                "Audience, tone, constraints...",
            );
        }
    }
    if let Some(rect) = next.next() {
        render_mode_and_category(frame, rect, app);
    }
    if !draft.automatic {
        if let Some(rect) = next.next() {
            render_techniques(frame, rect, app);
        }
    }
    if let (Some(err), Some(rect)) = (validation, next.next()) {
        frame.render_widget(
            Paragraph::new(Span::styled(
                format!(" {} {}", Theme::CROSS_MARK, err),
                Theme::error(),
            )),
            rect,
        );
    }
}

fn render_editor(frame: &mut Frame, area: Rect, app: &App) {
    let focused = app.focus == Focus::Editor;
    let title = format!("PROMPT {} {} chars", Theme::DOT_SEPARATOR, app.editor.char_count());
    let block = panel(&title, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.editor.text().is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "Describe what you want the model to do...",
                Theme::text_dim(),
            )),
            inner,
        );
    } else {
        let selection = focused.then(|| app.editor.selection());
        let lines = markup_lines(&app.editor, selection);
        let (line, _) = app.editor.cursor_line_col();
        let scroll = (line as u16).saturating_sub(inner.height.saturating_sub(1));
        frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);
    }

    if focused && app.overlay == Overlay::None {
        let (line, col) = app.editor.cursor_line_col();
        let text_line = app.editor.text().split('\n').nth(line).unwrap_or("");
        let before: String = text_line.chars().take(col).collect();
        let scroll = (line as u16).saturating_sub(inner.height.saturating_sub(1));
        let x = inner.x + (before.width() as u16).min(inner.width.saturating_sub(1));
        let y = inner.y + (line as u16).saturating_sub(scroll);
        frame.set_cursor_position(Position::new(x, y));
    }
}

pub(super) fn render_line_input(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    input: &LineInput,
    focused: bool,
    placeholder: &str,
) {
    let block = panel(title, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let content = if input.is_empty() {
        Span::styled(placeholder.to_string(), Theme::text_dim())
    } else {
        Span::styled(input.text().to_string(), Theme::text())
    };
    frame.render_widget(Paragraph::new(content), inner);

    if focused {
        let before: String = input.text().chars().take(input.cursor()).collect();
        let x = inner.x + (before.width() as u16).min(inner.width.saturating_sub(1));
        frame.set_cursor_position(Position::new(x, inner.y));
    }
}

fn render_mode_and_category(frame: &mut Frame, area: Rect, app: &App) {
    let draft = app.orchestrator.draft();
    let focused = matches!(app.focus, Focus::Mode | Focus::Category);
    let block = panel("SETTINGS", focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let option = |on: bool, label: &'static str| {
        let (mark, style) = if on {
            (Theme::BULLET_FILLED, Theme::bold())
        } else {
            (Theme::BULLET_EMPTY, Theme::text_dim())
        };
        Span::styled(format!("{} {}  ", mark, label), style)
    };
    let label_style = |f: Focus| {
        if app.focus == f {
            Theme::selected()
        } else {
            Theme::text_muted()
        }
    };

    let mode = Line::from(vec![
        Span::styled(" MODE     ", label_style(Focus::Mode)),
        Span::raw(" "),
        option(draft.automatic, "automatic"),
        option(!draft.automatic, "manual"),
    ]);

    let mut category = vec![
        Span::styled(" CATEGORY ", label_style(Focus::Category)),
        Span::raw(" "),
        Span::styled("‹ ", Theme::text_dim()),
        Span::styled(draft.category.label(), Theme::text()),
        Span::styled(" ›", Theme::text_dim()),
    ];
    if app.orchestrator.suggesting_category() {
        category.push(Span::styled(
            format!("  {} suggesting", app.spinner()),
            Theme::text_dim(),
        ));
    }

    frame.render_widget(Paragraph::new(vec![mode, Line::from(category)]), inner);
}

fn render_techniques(frame: &mut Frame, area: Rect, app: &App) {
    let draft = app.orchestrator.draft();
    let focused = app.focus == Focus::Techniques;
    let title = format!("TECHNIQUES {} {}", Theme::DOT_SEPARATOR, draft.techniques.len());
    let block = panel(&title, focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if draft.techniques.is_empty() {
        frame.render_widget(
            Paragraph::new(Span::styled(
                "None selected. Press Enter to pick techniques.",
                Theme::text_dim(),
            )),
            inner,
        );
        return;
    }

    let lines: Vec<Line> = draft
        .techniques
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let highlighted = focused && i == app.technique_cursor;
            let style = if highlighted {
                Theme::selected()
            } else {
                Theme::text()
            };
            let description = catalog::describe(name);
            Line::from(vec![
                Span::styled(format!(" {} {}", Theme::ARROW_RIGHT, name), style),
                Span::styled(
                    format!("  {}", description),
                    Style::default()
                        .fg(Theme::GREY_400)
                        .add_modifier(Modifier::ITALIC),
                ),
            ])
        })
        .collect();
    let scroll = (app.technique_cursor as u16).saturating_sub(inner.height.saturating_sub(1));
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), inner);
}
