//! Input handling for the promptsmith TUI
//!
//! Every key maps to at most one orchestrator intent; the widgets only
//! hold what is being typed.

use crate::ui::{App, HistoryBrowser, LineInput, Overlay, ToastKind};
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

mod form;
mod overlay;

use form::handle_form_input;
use overlay::handle_overlay_input;

// ═══════════════════════════════════════════════════════════════════════════
//  MAIN INPUT DISPATCHER
// ═══════════════════════════════════════════════════════════════════════════

pub fn handle_key_event(app: &mut App, key: KeyEvent) -> Result<()> {
    let now = Instant::now();

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('q') {
        app.should_quit = true;
        return Ok(());
    }

    if app.overlay != Overlay::None {
        return handle_overlay_input(app, key, now);
    }

    match key.code {
        KeyCode::F(5) => submit(app, now),
        KeyCode::F(1) => {
            app.overlay = Overlay::Guide {
                search: LineInput::default(),
                scroll: 0,
            }
        }
        KeyCode::F(2) => app.overlay = Overlay::History(HistoryBrowser::default()),
        KeyCode::F(3) => {
            app.overlay = Overlay::Templates {
                selected: 0,
                confirm_delete: false,
            }
        }
        KeyCode::F(4) => {
            app.overlay = Overlay::SaveTemplate {
                name: LineInput::default(),
                error: None,
            }
        }
        KeyCode::Esc => {
            if app.orchestrator.error().is_some() || app.orchestrator.validation_error().is_some()
            {
                app.orchestrator.dismiss_error();
            }
        }
        _ => handle_form_input(app, key, now),
    }
    Ok(())
}

fn submit(app: &mut App, now: Instant) {
    match app.orchestrator.submit(now) {
        Ok(id) => tracing::info!(submission = id, "Submitted prompt"),
        // Shown inline under the form
        Err(err) => tracing::debug!("Submission rejected: {}", err),
    }
}

/// Apply a key to a single-line input. Returns true when the text changed.
pub(crate) fn edit_line(input: &mut LineInput, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Char(c)
            if !key
                .modifiers
                .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
        {
            input.insert(c);
            true
        }
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => {
            input.left();
            false
        }
        KeyCode::Right => {
            input.right();
            false
        }
        KeyCode::Home => {
            input.home();
            false
        }
        KeyCode::End => {
            input.end();
            false
        }
        _ => false,
    }
}

/// Toast for intents the core refused because a submission is running
pub(crate) fn busy_toast(app: &mut App) {
    app.show_toast_kind(
        "Wait for the current enhancement to finish",
        ToastKind::Info,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::fake::FakeService;
    use crate::store::Store;
    use crate::ui::test_support::app_with;
    use crate::ui::Focus;

    pub(super) fn press(app: &mut App, code: KeyCode) {
        handle_key_event(app, KeyEvent::new(code, KeyModifiers::NONE)).expect("key handled");
    }

    pub(super) fn press_mod(app: &mut App, code: KeyCode, modifiers: KeyModifiers) {
        handle_key_event(app, KeyEvent::new(code, modifiers)).expect("key handled");
    }

    pub(super) fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_ctrl_q_quits() {
        let (mut app, _rx) = app_with(FakeService::default(), Store::in_memory());
        press_mod(&mut app, KeyCode::Char('q'), KeyModifiers::CONTROL);
        assert!(app.should_quit);
    }

    #[test]
    fn test_function_keys_open_overlays() {
        let (mut app, _rx) = app_with(FakeService::default(), Store::in_memory());
        press(&mut app, KeyCode::F(2));
        assert!(matches!(app.overlay, Overlay::History(_)));
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.overlay, Overlay::None);
        press(&mut app, KeyCode::F(1));
        assert!(matches!(app.overlay, Overlay::Guide { .. }));
    }

    #[test]
    fn test_empty_submit_sets_inline_error_and_esc_clears_it() {
        let (mut app, _rx) = app_with(FakeService::default(), Store::in_memory());
        press(&mut app, KeyCode::F(5));
        assert_eq!(
            app.orchestrator.validation_error(),
            Some(crate::app::orchestrator::ValidationError::EmptyPrompt)
        );
        assert!(app.orchestrator.error().is_none());
        press(&mut app, KeyCode::Esc);
        assert!(app.orchestrator.validation_error().is_none());
    }

    #[test]
    fn test_typing_reaches_the_draft() {
        let (mut app, _rx) = app_with(FakeService::default(), Store::in_memory());
        assert_eq!(app.focus, Focus::Editor);
        type_text(&mut app, "hi there");
        assert_eq!(app.orchestrator.draft().prompt, "hi there");
    }

    #[test]
    fn test_edit_line_ignores_control_chords() {
        let mut input = LineInput::default();
        assert!(edit_line(
            &mut input,
            KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE)
        ));
        assert!(!edit_line(
            &mut input,
            KeyEvent::new(KeyCode::Char('b'), KeyModifiers::CONTROL)
        ));
        assert_eq!(input.text(), "a");
    }
}
