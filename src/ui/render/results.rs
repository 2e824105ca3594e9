//! Right column: error panel and result cards

use crate::ui::helpers::wrap_text;
use crate::ui::markdown::parse_markdown;
use crate::ui::theme::Theme;
use crate::ui::{App, Focus};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};
use std::time::Instant;

pub(super) fn render_results(frame: &mut Frame, area: Rect, app: &App) {
    let area = match app.orchestrator.error() {
        Some(error) => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(5), Constraint::Min(3)])
                .split(area);
            let block = Block::default()
                .borders(Borders::ALL)
                .border_style(Theme::error())
                .title(Span::styled(
                    format!(" {} {} ", Theme::CROSS_MARK, error.title()),
                    Theme::error().add_modifier(Modifier::BOLD),
                ));
            let body = vec![
                Line::from(Span::styled(error.user_message(), Theme::text())),
                Line::from(Span::styled("Esc to dismiss", Theme::text_dim())),
            ];
            frame.render_widget(
                Paragraph::new(body).block(block).wrap(Wrap { trim: true }),
                chunks[0],
            );
            chunks[1]
        }
        None => area,
    };

    let focused = app.focus == Focus::Results;
    let results = app.orchestrator.results();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if focused {
            Theme::border_active()
        } else {
            Theme::border()
        })
        .title(Span::styled(
            format!(" RESULTS {} {} ", Theme::DOT_SEPARATOR, results.len()),
            Theme::title(),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if results.is_empty() {
        frame.render_widget(Paragraph::new(placeholder(app)), inner);
        return;
    }

    let width = inner.width.saturating_sub(4) as usize;
    let now = Instant::now();
    let mut lines: Vec<Line> = Vec::new();
    let mut selected_top = 0u16;

    for (i, result) in results.iter().enumerate() {
        let card = app.cards.get(i);
        let selected = focused && i == app.cards.selected;
        if i == app.cards.selected {
            selected_top = lines.len() as u16;
        }

        let marker = if selected { Theme::ARROW_RIGHT } else { ' ' };
        let mut title = vec![Span::styled(
            format!("{} {}. {}", marker, i + 1, result.technique),
            if selected {
                Theme::selected()
            } else {
                Theme::bold()
            },
        )];
        if card.is_some_and(|c| c.is_copied(now)) {
            title.push(Span::styled(
                format!("  {} copied", Theme::CHECK_MARK),
                Theme::success(),
            ));
        }
        if card.is_some_and(|c| c.is_running()) {
            title.push(Span::styled(
                format!("  {} running", app.spinner()),
                Style::default().fg(Theme::YELLOW),
            ));
        }
        lines.push(Line::from(title));

        for part in wrap_text(&result.prompt, width) {
            lines.push(Line::from(Span::styled(format!("    {}", part), Theme::text())));
        }
        if !result.explanation.is_empty() {
            for part in wrap_text(&result.explanation, width) {
                lines.push(Line::from(Span::styled(
                    format!("    {}", part),
                    Theme::text_dim().add_modifier(Modifier::ITALIC),
                )));
            }
        }

        if let Some(card) = card.filter(|c| c.has_output() || c.is_running()) {
            lines.push(Line::from(Span::styled(
                "    ── output ──",
                Style::default().fg(Theme::GREY_500),
            )));
            for line in parse_markdown(&card.output, width) {
                let mut spans = vec![Span::raw("    ")];
                spans.extend(line.spans);
                lines.push(Line::from(spans));
            }
            if let Some(err) = &card.error {
                lines.push(Line::from(Span::styled(
                    format!("    {} {}", Theme::CROSS_MARK, err.user_message()),
                    Theme::error(),
                )));
            }
        }
        lines.push(Line::from(""));
    }

    let pending = app.orchestrator.pending_reveals();
    if pending > 0 {
        lines.push(Line::from(Span::styled(
            format!("  {} {} more on the way", app.spinner(), pending),
            Theme::text_dim(),
        )));
    }

    frame.render_widget(Paragraph::new(lines).scroll((selected_top, 0)), inner);
}

fn placeholder(app: &App) -> Vec<Line<'static>> {
    let phase = app.orchestrator.phase();
    if !phase.is_busy() {
        return vec![
            Line::from(""),
            Line::from(Span::styled(
                "  Write a prompt and press F5 to enhance it.",
                Theme::text_dim(),
            )),
        ];
    }

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  {} {}", app.spinner(), phase.label()),
            Style::default().fg(Theme::YELLOW),
        )),
    ];
    let techniques = app.orchestrator.techniques_in_use();
    if !techniques.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("  Applying", Theme::text_muted())));
        for name in techniques {
            lines.push(Line::from(Span::styled(
                format!("    {} {}", Theme::ARROW_RIGHT, name),
                Theme::text(),
            )));
        }
    }
    lines
}
