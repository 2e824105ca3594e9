use super::{busy_toast, edit_line};
use crate::catalog::{self, Category};
use crate::history::{self, HistoryFilter, HistoryItem};
use crate::ui::{App, HistoryBrowser, HistoryMode, LineInput, Overlay, ToastKind};
use anyhow::Result;
use chrono::{Local, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use std::time::Instant;

const GUIDE_PAGE: usize = 10;

/// Handle key events when an overlay is active.
///
/// The overlay is taken out of the app while its handler runs; the handler
/// hands back the overlay to show next (`Overlay::None` closes it).
pub(super) fn handle_overlay_input(app: &mut App, key: KeyEvent, now: Instant) -> Result<()> {
    let overlay = std::mem::take(&mut app.overlay);
    let next = match overlay {
        Overlay::None => Overlay::None,
        Overlay::Guide { search, scroll } => handle_guide(key, search, scroll),
        Overlay::History(browser) => handle_history(app, key, browser, now),
        Overlay::Templates {
            selected,
            confirm_delete,
        } => handle_templates(app, key, selected, confirm_delete, now),
        Overlay::SaveTemplate { name, error } => handle_save_template(app, key, name, error),
        Overlay::TechniquePicker { search, selected } => {
            handle_technique_picker(app, key, search, selected)
        }
        Overlay::CategoryPicker { selected } => handle_category_picker(app, key, selected, now),
    };
    // A handler may have opened something else through the app
    if app.overlay == Overlay::None {
        app.overlay = next;
    }
    Ok(())
}

fn handle_guide(key: KeyEvent, mut search: LineInput, mut scroll: usize) -> Overlay {
    match key.code {
        KeyCode::Esc | KeyCode::F(1) => return Overlay::None,
        KeyCode::Up => scroll = scroll.saturating_sub(1),
        KeyCode::Down => scroll += 1,
        KeyCode::PageUp => scroll = scroll.saturating_sub(GUIDE_PAGE),
        KeyCode::PageDown => scroll += GUIDE_PAGE,
        _ => {
            if edit_line(&mut search, key) {
                scroll = 0;
            }
        }
    }
    Overlay::Guide { search, scroll }
}

// ─────────────────────────────────────────────────────────────────────────
//  History
// ─────────────────────────────────────────────────────────────────────────

fn history_view(app: &App, filter: &HistoryFilter) -> Vec<HistoryItem> {
    app.orchestrator
        .history()
        .view(filter, Utc::now())
        .into_iter()
        .cloned()
        .collect()
}

fn handle_history(
    app: &mut App,
    key: KeyEvent,
    mut browser: HistoryBrowser,
    now: Instant,
) -> Overlay {
    let view = history_view(app, &browser.filter);
    let current = view.get(browser.selected).cloned();

    match std::mem::take(&mut browser.mode) {
        HistoryMode::Browse => match key.code {
            KeyCode::Esc | KeyCode::F(2) => return Overlay::None,
            KeyCode::Up => browser.selected = browser.selected.saturating_sub(1),
            KeyCode::Down => {
                if browser.selected + 1 < view.len() {
                    browser.selected += 1;
                }
            }
            KeyCode::Enter => {
                if let Some(item) = current {
                    if app.orchestrator.select_history_item(&item.id, now) {
                        app.sync_from_draft();
                        return Overlay::None;
                    }
                    busy_toast(app);
                }
            }
            KeyCode::Char('/') => browser.mode = HistoryMode::Search,
            KeyCode::Char('c') => {
                browser.filter.cycle_category();
                browser.selected = 0;
            }
            KeyCode::Char('d') => {
                browser.filter.date = browser.filter.date.next();
                browser.selected = 0;
            }
            KeyCode::Char('f') => {
                browser.filter.favorites_only = !browser.filter.favorites_only;
                browser.selected = 0;
            }
            KeyCode::Char('s') | KeyCode::Char(' ') => {
                if let Some(item) = current {
                    app.orchestrator.toggle_favorite(&item.id);
                    // Favorites sort first, so keep the same item selected
                    let view = history_view(app, &browser.filter);
                    browser.selected = view
                        .iter()
                        .position(|i| i.id == item.id)
                        .unwrap_or(0);
                }
            }
            KeyCode::Char('t') if current.is_some() => {
                browser.mode = HistoryMode::AddTag(LineInput::default());
            }
            KeyCode::Char('r') if current.as_ref().is_some_and(|i| !i.tags.is_empty()) => {
                browser.mode = HistoryMode::RemoveTag { index: 0 };
            }
            KeyCode::Char('e') => export_view(app, &view),
            KeyCode::Char('X') if !app.orchestrator.history().is_empty() => {
                browser.mode = HistoryMode::ConfirmClear;
            }
            _ => {}
        },
        HistoryMode::Search => match key.code {
            KeyCode::Esc | KeyCode::Enter => {}
            _ => {
                if edit_line(&mut browser.search, key) {
                    browser.sync_search();
                }
                browser.mode = HistoryMode::Search;
            }
        },
        HistoryMode::AddTag(mut input) => match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => {
                if let Some(item) = current {
                    if !app.orchestrator.add_tag(&item.id, input.text()) {
                        tracing::debug!("Tag not added (empty or already present)");
                    }
                }
            }
            _ => {
                edit_line(&mut input, key);
                browser.mode = HistoryMode::AddTag(input);
            }
        },
        HistoryMode::RemoveTag { index } => {
            let tags = current.as_ref().map(|i| i.tags.clone()).unwrap_or_default();
            match key.code {
                KeyCode::Esc => {}
                KeyCode::Left => {
                    browser.mode = HistoryMode::RemoveTag {
                        index: index.saturating_sub(1),
                    }
                }
                KeyCode::Right => {
                    browser.mode = HistoryMode::RemoveTag {
                        index: (index + 1).min(tags.len().saturating_sub(1)),
                    }
                }
                KeyCode::Enter => {
                    if let (Some(item), Some(tag)) = (&current, tags.get(index)) {
                        app.orchestrator.remove_tag(&item.id, tag);
                    }
                }
                _ => browser.mode = HistoryMode::RemoveTag { index },
            }
        }
        HistoryMode::ConfirmClear => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                app.orchestrator.clear_history();
                browser.selected = 0;
                app.show_toast_kind("History cleared", ToastKind::Success);
            }
            KeyCode::Char('n') | KeyCode::Esc => {}
            _ => browser.mode = HistoryMode::ConfirmClear,
        },
    }

    let len = history_view(app, &browser.filter).len();
    browser.selected = browser.selected.min(len.saturating_sub(1));
    Overlay::History(browser)
}

fn export_view(app: &mut App, view: &[HistoryItem]) {
    let items: Vec<&HistoryItem> = view.iter().collect();
    match history::export(&items, &app.export_dir, Local::now().date_naive()) {
        Ok(path) => {
            tracing::info!(items = items.len(), path = %path.display(), "Exported history");
            app.show_toast_kind(
                &format!("Exported {} items to {}", items.len(), path.display()),
                ToastKind::Success,
            );
        }
        Err(e) => {
            tracing::warn!("History export failed: {:#}", e);
            app.show_toast_kind(&format!("Export failed: {}", e), ToastKind::Error);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
//  Templates
// ─────────────────────────────────────────────────────────────────────────

fn handle_templates(
    app: &mut App,
    key: KeyEvent,
    mut selected: usize,
    confirm_delete: bool,
    now: Instant,
) -> Overlay {
    let template = app
        .orchestrator
        .templates()
        .templates()
        .get(selected)
        .map(|t| (t.id.clone(), t.name.clone()));

    if confirm_delete {
        if let (KeyCode::Char('y') | KeyCode::Char('Y'), Some((id, name))) = (key.code, &template)
        {
            app.orchestrator.delete_template(id);
            app.show_toast_kind(&format!("Deleted template \"{}\"", name), ToastKind::Success);
        }
        let len = app.orchestrator.templates().len();
        return Overlay::Templates {
            selected: selected.min(len.saturating_sub(1)),
            confirm_delete: false,
        };
    }

    match key.code {
        KeyCode::Esc | KeyCode::F(3) => return Overlay::None,
        KeyCode::Up => selected = selected.saturating_sub(1),
        KeyCode::Down => {
            if selected + 1 < app.orchestrator.templates().len() {
                selected += 1;
            }
        }
        KeyCode::Enter => {
            if let Some((id, name)) = template {
                if app.orchestrator.load_template(&id, now) {
                    app.sync_from_draft();
                    app.show_toast_kind(&format!("Loaded \"{}\"", name), ToastKind::Success);
                    return Overlay::None;
                }
                busy_toast(app);
            }
        }
        KeyCode::Char('d') | KeyCode::Delete if template.is_some() => {
            return Overlay::Templates {
                selected,
                confirm_delete: true,
            };
        }
        _ => {}
    }
    Overlay::Templates {
        selected,
        confirm_delete: false,
    }
}

fn handle_save_template(
    app: &mut App,
    key: KeyEvent,
    mut name: LineInput,
    error: Option<String>,
) -> Overlay {
    match key.code {
        KeyCode::Esc | KeyCode::F(4) => Overlay::None,
        KeyCode::Enter => match app.orchestrator.save_template(name.text()) {
            Ok(_) => {
                app.show_toast_kind(
                    &format!("Saved template \"{}\"", name.text().trim()),
                    ToastKind::Success,
                );
                Overlay::None
            }
            Err(e) => Overlay::SaveTemplate {
                name,
                error: Some(e.to_string()),
            },
        },
        _ => {
            let changed = edit_line(&mut name, key);
            Overlay::SaveTemplate {
                name,
                error: if changed { None } else { error },
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────
//  Pickers
// ─────────────────────────────────────────────────────────────────────────

fn handle_technique_picker(
    app: &mut App,
    key: KeyEvent,
    mut search: LineInput,
    mut selected: usize,
) -> Overlay {
    let matches = catalog::search_techniques(search.text());
    match key.code {
        KeyCode::Esc => return Overlay::None,
        KeyCode::Up => selected = selected.saturating_sub(1),
        KeyCode::Down => {
            if selected + 1 < matches.len() {
                selected += 1;
            }
        }
        KeyCode::Enter => {
            if let Some(technique) = matches.get(selected) {
                if app.orchestrator.add_technique(technique.name) {
                    app.show_toast_kind(&format!("Added {}", technique.name), ToastKind::Info);
                }
            }
        }
        _ => {
            if edit_line(&mut search, key) {
                selected = 0;
            }
        }
    }
    Overlay::TechniquePicker { search, selected }
}

fn handle_category_picker(app: &mut App, key: KeyEvent, mut selected: usize, now: Instant) -> Overlay {
    match key.code {
        KeyCode::Esc => return Overlay::None,
        KeyCode::Up => selected = selected.saturating_sub(1),
        KeyCode::Down => selected = (selected + 1).min(Category::ALL.len() - 1),
        KeyCode::Enter => {
            if let Some(category) = Category::ALL.get(selected) {
                app.orchestrator.set_category(*category, now);
            }
            return Overlay::None;
        }
        _ => {}
    }
    Overlay::CategoryPicker { selected }
}
