use crate::catalog::{self, Category};
use crate::ui::helpers::{centered_rect, relative_time, wrap_text};
use crate::ui::theme::Theme;
use crate::ui::{App, HistoryBrowser, HistoryMode, LineInput};
use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

fn overlay_block(title: &str) -> Block<'static> {
    Block::default()
        .title(format!(" {} ", title))
        .title_style(Theme::title())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Theme::GREY_400))
        .style(Theme::overlay_bg())
}

fn key_row(key: &str, desc: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!(" {} ", key), Theme::key()),
        Span::styled(format!("  {}", desc), Style::default().fg(Theme::GREY_200)),
    ])
}

fn section(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("  ── {} ──", title),
        Style::default()
            .fg(Theme::WHITE)
            .add_modifier(Modifier::BOLD),
    ))
}

/// Search field as one line; places the cursor when `active`
fn search_line(
    frame: &mut Frame,
    area: Rect,
    label: &str,
    input: &LineInput,
    active: bool,
) {
    let prefix = format!(" {} ", label);
    let mut spans = vec![Span::styled(prefix.clone(), Theme::text_muted())];
    if input.is_empty() && !active {
        spans.push(Span::styled("type to filter", Theme::text_dim()));
    } else {
        spans.push(Span::styled(input.text().to_string(), Theme::text()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);

    if active {
        let before: String = input.text().chars().take(input.cursor()).collect();
        let x = area.x + (prefix.width() + before.width()) as u16;
        frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
    }
}

fn split_search(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(area);
    (chunks[0], chunks[2])
}

pub(super) fn render_guide(frame: &mut Frame, search: &LineInput, scroll: usize) {
    let area = centered_rect(70, 85, frame.area());
    frame.render_widget(Clear, area);
    let block = overlay_block("Technique guide");
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let (search_area, body) = split_search(inner);
    search_line(frame, search_area, "/", search, true);

    let width = body.width.saturating_sub(6) as usize;
    let matches = catalog::search_techniques(search.text());
    let mut lines: Vec<Line<'static>> = Vec::new();
    if matches.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No technique matches that search.",
            Theme::text_dim(),
        )));
    }
    for technique in matches {
        lines.push(Line::from(Span::styled(
            format!("  {} {}", Theme::ARROW_RIGHT, technique.name),
            Theme::bold(),
        )));
        for part in wrap_text(technique.description, width) {
            lines.push(Line::from(Span::styled(format!("      {}", part), Theme::text())));
        }
        lines.push(Line::from(""));
    }

    if search.is_empty() {
        lines.push(section("Editor"));
        lines.push(key_row("Alt+B", "Bold"));
        lines.push(key_row("Alt+I", "Italic"));
        lines.push(key_row("Alt+K", "Code block"));
        lines.push(key_row("Alt+U", "Bullet list"));
        lines.push(key_row("Alt+O", "Numbered list"));
        lines.push(key_row("Alt+1/2/3", "Small / normal / large text"));
        lines.push(key_row("Tab", "Indent list item (Shift+Tab outdents)"));
        lines.push(Line::from(""));
        lines.push(section("Workbench"));
        lines.push(key_row("F5", "Enhance the prompt"));
        lines.push(key_row("Tab", "Next control"));
        lines.push(key_row("F2", "History"));
        lines.push(key_row("F3", "Templates"));
        lines.push(key_row("F4", "Save as template"));
        lines.push(key_row("Esc", "Close / dismiss error"));
        lines.push(key_row("Ctrl+Q", "Quit"));
    }

    let scroll = scroll.min(lines.len().saturating_sub(1));
    frame.render_widget(Paragraph::new(lines).scroll((scroll as u16, 0)), body);
}

pub(super) fn render_history(frame: &mut Frame, app: &App, browser: &HistoryBrowser) {
    let area = centered_rect(80, 85, frame.area());
    frame.render_widget(Clear, area);
    let now = Utc::now();
    let items = app.orchestrator.history().view(&browser.filter, now);
    let block = overlay_block(&format!(
        "History {} {} of {}",
        Theme::DOT_SEPARATOR,
        items.len(),
        app.orchestrator.history().len()
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // search
            Constraint::Length(1), // filters
            Constraint::Length(1),
            Constraint::Min(3),    // list
            Constraint::Length(1), // mode line
        ])
        .split(inner);

    search_line(
        frame,
        chunks[0],
        "/",
        &browser.search,
        browser.mode == HistoryMode::Search,
    );

    let filter = &browser.filter;
    let filters = Line::from(vec![
        Span::styled(" category ", Theme::text_dim()),
        Span::styled(
            filter.category.map_or("All", |c| c.label()).to_string(),
            Theme::text(),
        ),
        Span::styled("   date ", Theme::text_dim()),
        Span::styled(filter.date.label(), Theme::text()),
        Span::styled("   ", Theme::text_dim()),
        Span::styled(
            if filter.favorites_only {
                format!("{} favorites only", Theme::STAR)
            } else {
                "all items".to_string()
            },
            Theme::text(),
        ),
    ]);
    frame.render_widget(Paragraph::new(filters), chunks[1]);

    let width = chunks[3].width.saturating_sub(8) as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut selected_top = 0u16;
    if items.is_empty() {
        lines.push(Line::from(Span::styled(
            "  Nothing here yet. Enhanced prompts are saved automatically.",
            Theme::text_dim(),
        )));
    }
    for (i, item) in items.iter().enumerate() {
        let selected = i == browser.selected;
        if selected {
            selected_top = lines.len() as u16;
        }
        let star = if item.is_favorite { Theme::STAR } else { ' ' };
        let prompt = item.plain_prompt().replace('\n', " ");
        let first = wrap_text(&prompt, width).into_iter().next().unwrap_or_default();
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {} {} ", if selected { Theme::ARROW_RIGHT } else { ' ' }, star),
                Style::default().fg(Theme::YELLOW),
            ),
            Span::styled(
                first,
                if selected {
                    Theme::selected()
                } else {
                    Theme::text()
                },
            ),
        ]));

        let mut meta = vec![Span::styled(
            format!(
                "      {} {} {} {} {} results",
                relative_time(item.timestamp, now),
                Theme::DOT_SEPARATOR,
                item.category.label(),
                Theme::DOT_SEPARATOR,
                item.outputs.len()
            ),
            Theme::text_dim(),
        )];
        for (t, tag) in item.tags.iter().enumerate() {
            let picking = selected && browser.mode == (HistoryMode::RemoveTag { index: t });
            meta.push(Span::raw(" "));
            meta.push(Span::styled(
                format!("#{}", tag),
                if picking {
                    Style::default().fg(Theme::GREY_900).bg(Theme::RED)
                } else {
                    Style::default().fg(Theme::BLUE)
                },
            ));
        }
        lines.push(Line::from(meta));
    }
    frame.render_widget(Paragraph::new(lines).scroll((selected_top, 0)), chunks[3]);

    let mode_line = match &browser.mode {
        HistoryMode::AddTag(input) => {
            search_line(frame, chunks[4], "tag:", input, true);
            return;
        }
        HistoryMode::ConfirmClear => Line::from(vec![
            Span::styled(" Delete all history? ", Theme::error().add_modifier(Modifier::BOLD)),
            Span::styled(" y ", Theme::key()),
            Span::styled(" yes  ", Theme::text_muted()),
            Span::styled(" n ", Theme::key()),
            Span::styled(" no", Theme::text_muted()),
        ]),
        HistoryMode::RemoveTag { .. } => Line::from(Span::styled(
            " ←→ pick tag   Enter remove   Esc cancel",
            Theme::text_muted(),
        )),
        HistoryMode::Search => Line::from(Span::styled(
            " Enter/Esc done",
            Theme::text_muted(),
        )),
        HistoryMode::Browse => Line::from(Span::styled(
            " ↵ load  / search  c category  d date  f favorites  s star  t tag  r untag  e export  X clear",
            Theme::text_muted(),
        )),
    };
    frame.render_widget(Paragraph::new(mode_line), chunks[4]);
}

pub(super) fn render_templates(frame: &mut Frame, app: &App, selected: usize, confirm_delete: bool) {
    let area = centered_rect(60, 70, frame.area());
    frame.render_widget(Clear, area);
    let block = overlay_block("Templates");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(1)])
        .split(inner);

    let templates = app.orchestrator.templates().templates();
    let mut lines: Vec<Line<'static>> = Vec::new();
    if templates.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No templates yet. Press F4 to save the current form.",
            Theme::text_dim(),
        )));
    }
    for (i, template) in templates.iter().enumerate() {
        let is_selected = i == selected;
        let mode = if template.is_automatic {
            "automatic".to_string()
        } else {
            format!("{} techniques", template.techniques.len())
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!(" {} {}", if is_selected { Theme::ARROW_RIGHT } else { ' ' }, template.name),
                if is_selected {
                    Theme::selected()
                } else {
                    Theme::text()
                },
            ),
            Span::styled(
                format!(
                    "  {} {} {}",
                    template.category.label(),
                    Theme::DOT_SEPARATOR,
                    mode
                ),
                Theme::text_dim(),
            ),
        ]));
    }
    let scroll = (selected as u16).saturating_sub(chunks[0].height.saturating_sub(1));
    frame.render_widget(Paragraph::new(lines).scroll((scroll, 0)), chunks[0]);

    let footer = if confirm_delete {
        Line::from(vec![
            Span::styled(" Delete this template? ", Theme::error().add_modifier(Modifier::BOLD)),
            Span::styled(" y ", Theme::key()),
            Span::styled(" yes  ", Theme::text_muted()),
            Span::styled(" n ", Theme::key()),
            Span::styled(" no", Theme::text_muted()),
        ])
    } else {
        Line::from(Span::styled(" ↵ load  d delete  Esc close", Theme::text_muted()))
    };
    frame.render_widget(Paragraph::new(footer), chunks[1]);
}

pub(super) fn render_save_template(frame: &mut Frame, name: &LineInput, error: Option<&str>) {
    let outer = frame.area();
    let width = 56.min(outer.width);
    let area = Rect {
        x: outer.width.saturating_sub(width) / 2,
        y: outer.height.saturating_sub(7) / 2,
        width,
        height: 7.min(outer.height),
    };
    frame.render_widget(Clear, area);
    let block = overlay_block("Save as template");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(1),
        ])
        .split(inner);

    search_line(frame, chunks[0], "name:", name, true);
    if let Some(error) = error {
        frame.render_widget(
            Paragraph::new(Span::styled(format!(" {}", error), Theme::error())),
            chunks[2],
        );
    }
    frame.render_widget(
        Paragraph::new(Span::styled(" ↵ save  Esc cancel", Theme::text_muted()))
            .wrap(Wrap { trim: false }),
        chunks[3],
    );
}

pub(super) fn render_technique_picker(
    frame: &mut Frame,
    app: &App,
    search: &LineInput,
    selected: usize,
) {
    let area = centered_rect(65, 80, frame.area());
    frame.render_widget(Clear, area);
    let chosen = &app.orchestrator.draft().techniques;
    let block = overlay_block(&format!(
        "Add techniques {} {} selected",
        Theme::DOT_SEPARATOR,
        chosen.len()
    ));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    let (search_area, body) = split_search(inner);
    search_line(frame, search_area, "/", search, true);

    let matches = catalog::search_techniques(search.text());
    let width = body.width.saturating_sub(8) as usize;
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut selected_top = 0u16;
    for (i, technique) in matches.iter().enumerate() {
        let is_selected = i == selected;
        if is_selected {
            selected_top = lines.len() as u16;
        }
        let mark = if chosen.iter().any(|n| n == technique.name) {
            Theme::CHECK_MARK
        } else {
            ' '
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {} ", mark), Theme::success()),
            Span::styled(
                technique.name.to_string(),
                if is_selected {
                    Theme::selected()
                } else {
                    Theme::text()
                },
            ),
        ]));
        if is_selected {
            for part in wrap_text(technique.description, width) {
                lines.push(Line::from(Span::styled(
                    format!("     {}", part),
                    Theme::text_dim(),
                )));
            }
        }
    }
    if matches.is_empty() {
        lines.push(Line::from(Span::styled(
            "  No technique matches that search.",
            Theme::text_dim(),
        )));
    }
    frame.render_widget(Paragraph::new(lines).scroll((selected_top, 0)), body);
}

pub(super) fn render_category_picker(frame: &mut Frame, app: &App, selected: usize) {
    let outer = frame.area();
    let height = (Category::ALL.len() as u16 + 2).min(outer.height);
    let width = 48.min(outer.width);
    let area = Rect {
        x: outer.width.saturating_sub(width) / 2,
        y: outer.height.saturating_sub(height) / 2,
        width,
        height,
    };
    frame.render_widget(Clear, area);
    let block = overlay_block("Category");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let current = app.orchestrator.draft().category;
    let lines: Vec<Line<'static>> = Category::ALL
        .iter()
        .enumerate()
        .map(|(i, category)| {
            let mark = if *category == current {
                Theme::BULLET_FILLED
            } else {
                Theme::BULLET_EMPTY
            };
            Line::from(Span::styled(
                format!(" {} {}", mark, category.label()),
                if i == selected {
                    Theme::selected()
                } else {
                    Theme::text()
                },
            ))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}
