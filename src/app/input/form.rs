use super::{busy_toast, edit_line};
use crate::catalog::Category;
use crate::editor::{FormatCommand, TextSize};
use crate::ui::{App, Focus, LineInput, Overlay, ToastKind};
use crate::util;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::Instant;

/// Keys for the main screen, routed by focus
pub(super) fn handle_form_input(app: &mut App, key: KeyEvent, now: Instant) {
    if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
        handle_tab(app, key, now);
        return;
    }

    match app.focus {
        Focus::Editor => handle_editor(app, key, now),
        Focus::Context => {
            if edit_line(&mut app.context_input, key) {
                let note = app.context_input.text().to_string();
                app.orchestrator.set_context_note(&note, now);
            }
        }
        Focus::Mode => {
            if matches!(
                key.code,
                KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Left | KeyCode::Right
            ) {
                let automatic = !app.orchestrator.draft().automatic;
                if app.orchestrator.set_automatic(automatic, now) {
                    app.sync_from_draft();
                } else if app.orchestrator.is_busy() {
                    busy_toast(app);
                }
            }
        }
        Focus::Category => handle_category(app, key, now),
        Focus::Techniques => handle_techniques(app, key),
        Focus::Results => handle_results(app, key, now),
    }
}

fn handle_tab(app: &mut App, key: KeyEvent, now: Instant) {
    let shift = key.code == KeyCode::BackTab || key.modifiers.contains(KeyModifiers::SHIFT);
    if app.focus == Focus::Editor {
        let outcome = app.editor.handle_tab(shift);
        if outcome.changed_content() {
            push_prompt(app, now);
            return;
        }
    }
    let automatic = app.orchestrator.draft().automatic;
    let next = app.focus.cycle(automatic, !shift);
    app.set_focus(next);
}

fn push_prompt(app: &mut App, now: Instant) {
    let text = app.editor.text().to_string();
    app.orchestrator.set_prompt(&text, now);
}

fn format_command(c: char) -> Option<FormatCommand> {
    match c.to_ascii_lowercase() {
        'b' => Some(FormatCommand::Bold),
        'i' => Some(FormatCommand::Italic),
        'k' => Some(FormatCommand::CodeBlock),
        'u' => Some(FormatCommand::BulletList),
        'o' => Some(FormatCommand::NumberedList),
        '1' => Some(FormatCommand::TextSize(TextSize::Small)),
        '2' => Some(FormatCommand::TextSize(TextSize::Normal)),
        '3' => Some(FormatCommand::TextSize(TextSize::Large)),
        _ => None,
    }
}

fn handle_editor(app: &mut App, key: KeyEvent, now: Instant) {
    let shift = key.modifiers.contains(KeyModifiers::SHIFT);
    let alt = key.modifiers.contains(KeyModifiers::ALT);
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let editor = &mut app.editor;

    let changed = match key.code {
        KeyCode::Char(c) if alt => match format_command(c) {
            Some(command) => editor.apply(command),
            None => false,
        },
        KeyCode::Char('a') if ctrl => {
            editor.select_all();
            false
        }
        KeyCode::Char(c) if !ctrl => editor.insert_char(c),
        KeyCode::Enter => editor.newline(),
        KeyCode::Backspace => editor.backspace(),
        KeyCode::Delete => editor.delete(),
        KeyCode::Left => {
            editor.move_left(shift);
            false
        }
        KeyCode::Right => {
            editor.move_right(shift);
            false
        }
        KeyCode::Up => {
            editor.move_up(shift);
            false
        }
        KeyCode::Down => {
            editor.move_down(shift);
            false
        }
        KeyCode::Home => {
            editor.move_home(shift);
            false
        }
        KeyCode::End => {
            editor.move_end(shift);
            false
        }
        _ => false,
    };

    if changed {
        push_prompt(app, now);
    }
}

fn handle_category(app: &mut App, key: KeyEvent, now: Instant) {
    let current = app.orchestrator.draft().category;
    match key.code {
        KeyCode::Left => app.orchestrator.set_category(current.prev(), now),
        KeyCode::Right => app.orchestrator.set_category(current.next(), now),
        KeyCode::Enter | KeyCode::Char(' ') => {
            let selected = Category::ALL
                .iter()
                .position(|c| *c == current)
                .unwrap_or(0);
            app.overlay = Overlay::CategoryPicker { selected };
        }
        _ => {}
    }
}

fn handle_techniques(app: &mut App, key: KeyEvent) {
    let count = app.orchestrator.draft().techniques.len();
    match key.code {
        KeyCode::Up => app.technique_cursor = app.technique_cursor.saturating_sub(1),
        KeyCode::Down => {
            if app.technique_cursor + 1 < count {
                app.technique_cursor += 1;
            }
        }
        KeyCode::Enter | KeyCode::Char('a') => {
            app.overlay = Overlay::TechniquePicker {
                search: LineInput::default(),
                selected: 0,
            };
        }
        KeyCode::Delete | KeyCode::Backspace => {
            let name = app
                .orchestrator
                .draft()
                .techniques
                .get(app.technique_cursor)
                .cloned();
            if let Some(name) = name {
                app.orchestrator.remove_technique(&name);
                app.sync_from_draft();
            }
        }
        _ => {}
    }
}

fn handle_results(app: &mut App, key: KeyEvent, now: Instant) {
    let index = app.cards.selected;
    match key.code {
        KeyCode::Up => app.cards.select_prev(),
        KeyCode::Down => app.cards.select_next(),
        KeyCode::Char('c') => {
            let Some(prompt) = app.orchestrator.results().get(index).map(|r| r.prompt.clone())
            else {
                return;
            };
            match util::copy_to_clipboard(&prompt) {
                Ok(()) => app.cards.mark_copied(index, now),
                Err(e) => {
                    tracing::warn!("Clipboard copy failed: {:#}", e);
                    app.show_toast_kind("Copy failed", ToastKind::Error);
                }
            }
        }
        KeyCode::Char('e') | KeyCode::Enter => {
            if let Some(prompt) = app.orchestrator.results().get(index).map(|r| r.prompt.clone()) {
                app.cards.execute(index, prompt);
            }
        }
        KeyCode::Char('x') => app.cards.cancel(index),
        _ => {}
    }
}
