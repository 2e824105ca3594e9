mod footer;
mod form;
mod header;
mod overlays;
mod results;
mod toast;

use crate::ui::theme::Theme;
use crate::ui::{App, Overlay};
use ratatui::{
    layout::{Constraint, Direction, Layout},
    widgets::Block,
    Frame,
};

use footer::render_footer;
use form::render_form;
use header::render_header;
use overlays::{
    render_category_picker, render_guide, render_history, render_save_template,
    render_technique_picker, render_templates,
};
use results::render_results;
use toast::render_toast;

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    frame.render_widget(Block::default().style(Theme::bg()), area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(10),   // Form and results
            Constraint::Length(2), // Footer
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(layout[1]);

    render_header(frame, layout[0], app);
    render_form(frame, columns[0], app);
    render_results(frame, columns[1], app);
    render_footer(frame, layout[2], app);

    match &app.overlay {
        Overlay::Guide { search, scroll } => render_guide(frame, search, *scroll),
        Overlay::History(browser) => render_history(frame, app, browser),
        Overlay::Templates {
            selected,
            confirm_delete,
        } => render_templates(frame, app, *selected, *confirm_delete),
        Overlay::SaveTemplate { name, error } => {
            render_save_template(frame, name, error.as_deref())
        }
        Overlay::TechniquePicker { search, selected } => {
            render_technique_picker(frame, app, search, *selected)
        }
        Overlay::CategoryPicker { selected } => render_category_picker(frame, app, *selected),
        Overlay::None => {}
    }

    if let Some(toast) = &app.toast {
        render_toast(frame, toast);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::{result, FakeService};
    use crate::store::Store;
    use crate::ui::test_support::app_with;
    use crate::ui::HistoryBrowser;
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::{Duration, Instant};

    fn screen(app: &App) -> String {
        let backend = TestBackend::new(120, 40);
        let mut terminal = Terminal::new(backend).expect("test terminal");
        terminal.draw(|f| render(f, app)).expect("draw");
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_empty_app_renders_form() {
        let (app, _rx) = app_with(FakeService::default(), Store::in_memory());
        let text = screen(&app);
        assert!(text.contains("p r o m p t s m i t h"));
        assert!(text.contains("PROMPT"));
        assert!(text.contains("automatic"));
        assert!(text.contains("F5"));
    }

    #[test]
    fn test_validation_error_is_inline() {
        let (mut app, _rx) = app_with(FakeService::default(), Store::in_memory());
        let _ = app.orchestrator.submit(Instant::now());
        let text = screen(&app);
        assert!(text.contains("Enter a prompt first."));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_revealed_results_render_as_cards() {
        let service = FakeService {
            enhanced: Ok(vec![result("Few-Shot Prompting", "Here are two examples.")]),
            ..FakeService::default()
        };
        let (mut app, rx) = app_with(service, Store::in_memory());
        let start = Instant::now();
        app.orchestrator.set_prompt("Summarize book X in 200 words", start);
        app.orchestrator.submit(start).expect("valid draft");

        let deadline = start + Duration::from_secs(5);
        while app.orchestrator.is_busy() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
            crate::app::background::drain_messages(&mut app, &rx);
            app.orchestrator.tick(Instant::now());
        }
        app.sync_cards();

        let text = screen(&app);
        assert!(text.contains("Few-Shot Prompting"));
        assert!(text.contains("Here are two examples."));
    }

    #[test]
    fn test_every_overlay_renders() {
        let (mut app, _rx) = app_with(FakeService::default(), Store::in_memory());
        let overlays = [
            Overlay::Guide {
                search: Default::default(),
                scroll: 0,
            },
            Overlay::History(HistoryBrowser::default()),
            Overlay::Templates {
                selected: 0,
                confirm_delete: false,
            },
            Overlay::SaveTemplate {
                name: Default::default(),
                error: Some("Template name cannot be empty".into()),
            },
            Overlay::TechniquePicker {
                search: Default::default(),
                selected: 0,
            },
            Overlay::CategoryPicker { selected: 0 },
        ];
        for overlay in overlays {
            app.overlay = overlay;
            let text = screen(&app);
            assert!(!text.trim().is_empty());
        }
        app.overlay = Overlay::Guide {
            search: Default::default(),
            scroll: 0,
        };
        assert!(screen(&app).contains("Chain-of-Thought"));
    }
}
