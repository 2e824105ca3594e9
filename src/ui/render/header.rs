use crate::ui::theme::Theme;
use crate::ui::App;
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

pub(super) fn render_header(frame: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            format!("   {}", Theme::LOGO),
            Style::default()
                .fg(Theme::WHITE)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("   {}", Theme::TAGLINE), Theme::text_dim()),
    ];

    let history = app.orchestrator.history().len();
    let templates = app.orchestrator.templates().len();
    if history + templates > 0 {
        spans.push(Span::styled(
            format!(
                "   {} saved {} {} templates",
                history,
                Theme::DOT_SEPARATOR,
                templates
            ),
            Theme::text_muted(),
        ));
    }

    let lines = vec![Line::from(""), Line::from(spans)];
    frame.render_widget(Paragraph::new(lines).style(Theme::bg()), area);
}
