use crate::ui::theme::Theme;
use crate::ui::{App, Focus};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub(super) fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::raw("  ")];

    let phase = app.orchestrator.phase();
    if phase.is_busy() {
        spans.push(Span::styled(
            format!("{} {}", app.spinner(), phase.label()),
            Style::default().fg(Theme::YELLOW),
        ));
    } else if app.orchestrator.suggesting_category() {
        spans.push(Span::styled(
            format!("{} suggesting category", app.spinner()),
            Theme::text_muted(),
        ));
    } else {
        spans.push(Span::styled(phase.label(), Theme::text_muted()));
    }

    spans.push(Span::styled(
        format!(
            "  {} {} chars {} {} words",
            Theme::DOT_SEPARATOR,
            app.editor.char_count(),
            Theme::DOT_SEPARATOR,
            app.orchestrator.draft().word_count()
        ),
        Theme::text_dim(),
    ));
    spans.push(Span::styled("  │ ", Style::default().fg(Theme::GREY_500)));

    for (key, label) in hints(app.focus) {
        spans.push(Span::styled(format!(" {} ", key), Theme::key()));
        spans.push(Span::styled(format!(" {}  ", label), Theme::text_muted()));
    }

    let lines = vec![Line::from(""), Line::from(spans)];
    frame.render_widget(Paragraph::new(lines).style(Theme::bg()), area);
}

fn hints(focus: Focus) -> Vec<(&'static str, &'static str)> {
    let mut hints = vec![("F5", "enhance")];
    match focus {
        Focus::Editor => hints.push(("Alt+B/I/K", "format")),
        Focus::Mode => hints.push(("Space", "toggle")),
        Focus::Category => hints.push(("←→/Enter", "category")),
        Focus::Techniques => hints.push(("Enter/Del", "add/remove")),
        Focus::Results => hints.extend([("c", "copy"), ("e", "run"), ("x", "stop")]),
        Focus::Context => {}
    }
    hints.extend([
        ("Tab", "next"),
        ("F1", "guide"),
        ("F2", "history"),
        ("F3", "templates"),
        ("F4", "save"),
        ("^Q", "quit"),
    ]);
    hints
}
