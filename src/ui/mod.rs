//! promptsmith UI - a two-column prompt workbench
//!
//! Layout:
//! ╔══════════════════════════════════════════════════════════════╗
//! ║                 p r o m p t s m i t h                        ║
//! ╠═══════════════════════════╦══════════════════════════════════╣
//! ║  PROMPT                   ║  RESULTS                         ║
//! ║  Summarize book X in...   ║  1. Chain-of-Thought      copied ║
//! ║  CONTEXT                  ║     Think step by step...        ║
//! ║  MODE  ● automatic        ║  2. Persona Prompting            ║
//! ║  CATEGORY  Writing        ║     As a literary critic...      ║
//! ╠═══════════════════════════╩══════════════════════════════════╣
//! ║  ⠋ Enhancing · 42 chars │ F5 enhance  F1 guide  F2 history   ║
//! ╚══════════════════════════════════════════════════════════════╝

pub mod helpers;
pub mod markdown;
mod render;
pub mod theme;

pub use render::render;

use crate::app::cards::CardDeck;
use crate::app::orchestrator::Orchestrator;
use crate::editor::Editor;
use crate::history::HistoryFilter;
use std::path::PathBuf;
use std::time::Instant;

/// Spinner animation frames (braille pattern)
pub const SPINNER_FRAMES: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Which control of the main screen receives keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Editor,
    Context,
    Mode,
    Category,
    Techniques,
    Results,
}

impl Focus {
    /// The controls visible in the current mode, in tab order
    pub fn order(automatic: bool) -> Vec<Focus> {
        let mut order = vec![Focus::Editor];
        if automatic {
            order.push(Focus::Context);
        }
        order.extend([Focus::Mode, Focus::Category]);
        if !automatic {
            order.push(Focus::Techniques);
        }
        order.push(Focus::Results);
        order
    }

    pub fn cycle(self, automatic: bool, forward: bool) -> Focus {
        let order = Self::order(automatic);
        let len = order.len();
        let idx = order.iter().position(|f| *f == self).unwrap_or(0);
        let next = if forward {
            (idx + 1) % len
        } else {
            (idx + len - 1) % len
        };
        order[next]
    }
}

/// Single-line text input used by the context note, searches and dialogs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineInput {
    text: String,
    /// Char offset of the caret
    cursor: usize,
}

impl LineInput {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: text.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn byte_at(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map_or(self.text.len(), |(b, _)| b)
    }

    pub fn insert(&mut self, ch: char) {
        let at = self.byte_at(self.cursor);
        self.text.insert(at, ch);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        let at = self.byte_at(self.cursor);
        self.text.remove(at);
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.text.chars().count() {
            return false;
        }
        let at = self.byte_at(self.cursor);
        self.text.remove(at);
        true
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }
}

/// Sub-mode of the history browser
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HistoryMode {
    #[default]
    Browse,
    Search,
    AddTag(LineInput),
    /// Picking one of the selected item's tags to remove
    RemoveTag {
        index: usize,
    },
    ConfirmClear,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryBrowser {
    pub search: LineInput,
    pub filter: HistoryFilter,
    pub selected: usize,
    pub mode: HistoryMode,
}

impl HistoryBrowser {
    /// Copy the search input into the filter
    pub fn sync_search(&mut self) {
        self.filter.search = self.search.text().to_string();
        self.selected = 0;
    }
}

/// Overlay state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Overlay {
    #[default]
    None,
    /// Searchable technique reference
    Guide {
        search: LineInput,
        scroll: usize,
    },
    History(HistoryBrowser),
    Templates {
        selected: usize,
        confirm_delete: bool,
    },
    SaveTemplate {
        name: LineInput,
        error: Option<String>,
    },
    TechniquePicker {
        search: LineInput,
        selected: usize,
    },
    CategoryPicker {
        selected: usize,
    },
}

/// Toast notification kind - affects duration and styling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToastKind {
    #[default]
    Info,
    Success,
    Error,
}

impl ToastKind {
    /// Duration in seconds before toast expires
    pub fn duration_secs(&self) -> u64 {
        match self {
            ToastKind::Info => 3,
            ToastKind::Success => 3,
            ToastKind::Error => 10,
        }
    }
}

pub struct Toast {
    pub message: String,
    pub created_at: Instant,
    pub kind: ToastKind,
}

impl Toast {
    pub fn new(message: &str, kind: ToastKind) -> Self {
        Self {
            message: message.to_string(),
            created_at: Instant::now(),
            kind,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed().as_secs() >= self.kind.duration_secs()
    }
}

/// Everything the event loop owns
pub struct App {
    pub orchestrator: Orchestrator,
    pub cards: CardDeck,
    pub editor: Editor,
    pub context_input: LineInput,
    pub focus: Focus,
    pub overlay: Overlay,
    pub toast: Option<Toast>,
    /// Highlighted entry of the manual technique list
    pub technique_cursor: usize,
    pub loading_frame: usize,
    pub should_quit: bool,
    pub export_dir: PathBuf,
}

impl App {
    pub fn new(orchestrator: Orchestrator, cards: CardDeck, export_dir: PathBuf) -> Self {
        let mut app = Self {
            orchestrator,
            cards,
            editor: Editor::default(),
            context_input: LineInput::default(),
            focus: Focus::Editor,
            overlay: Overlay::None,
            toast: None,
            technique_cursor: 0,
            loading_frame: 0,
            should_quit: false,
            export_dir,
        };
        app.sync_from_draft();
        app
    }

    /// Pull draft text into the input widgets after the core replaced it
    pub fn sync_from_draft(&mut self) {
        let draft = self.orchestrator.draft();
        self.editor.set_content(&draft.prompt);
        if self.context_input.text() != draft.context_note {
            self.context_input = LineInput::new(&draft.context_note);
        }
        let techniques = draft.techniques.len();
        if self.technique_cursor >= techniques {
            self.technique_cursor = techniques.saturating_sub(1);
        }
        if !Focus::order(draft.automatic).contains(&self.focus) {
            self.focus = Focus::Mode;
        }
    }

    /// Keep the card deck in step with the revealed results
    pub fn sync_cards(&mut self) {
        self.cards.sync(
            self.orchestrator.results_epoch(),
            self.orchestrator.results().len(),
        );
    }

    pub fn is_animating(&self) -> bool {
        self.orchestrator.is_busy()
            || self.orchestrator.suggesting_category()
            || self.cards.is_any_running()
    }

    /// Tick the loading animation
    pub fn tick_loading(&mut self) {
        if self.is_animating() {
            self.loading_frame = self.loading_frame.wrapping_add(1);
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.loading_frame % SPINNER_FRAMES.len()]
    }

    /// Clear expired toast
    pub fn clear_expired_toast(&mut self) {
        if self.toast.as_ref().is_some_and(Toast::is_expired) {
            self.toast = None;
        }
    }

    pub fn show_toast(&mut self, message: &str) {
        self.show_toast_kind(message, ToastKind::Info);
    }

    pub fn show_toast_kind(&mut self, message: &str, kind: ToastKind) {
        self.toast = Some(Toast::new(message, kind));
    }

    pub fn close_overlay(&mut self) {
        self.overlay = Overlay::None;
    }

    pub fn set_focus(&mut self, focus: Focus) {
        if self.focus == Focus::Editor && focus != Focus::Editor {
            self.editor.blur();
        } else if self.focus != Focus::Editor && focus == Focus::Editor {
            self.editor.focus();
        }
        self.focus = focus;
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::app::messages::BackgroundMessage;
    use crate::llm::fake::FakeService;
    use crate::store::Store;
    use std::sync::{mpsc, Arc};

    /// An app over an in-memory store and a scripted service
    pub(crate) fn app_with(
        service: FakeService,
        store: Store,
    ) -> (App, mpsc::Receiver<BackgroundMessage>) {
        let service = Arc::new(service);
        let (tx, rx) = mpsc::channel();
        let orchestrator = Orchestrator::load(service.clone(), store, tx.clone(), Instant::now());
        let cards = CardDeck::new(service, tx);
        let export_dir = std::env::temp_dir();
        (App::new(orchestrator, cards, export_dir), rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_focus_order_depends_on_mode() {
        assert_eq!(
            Focus::order(true),
            vec![
                Focus::Editor,
                Focus::Context,
                Focus::Mode,
                Focus::Category,
                Focus::Results
            ]
        );
        assert_eq!(Focus::Mode.cycle(false, true), Focus::Category);
        assert_eq!(Focus::Category.cycle(false, true), Focus::Techniques);
        assert_eq!(Focus::Editor.cycle(true, false), Focus::Results);
    }

    #[test]
    fn test_line_input_edits_multibyte_text() {
        let mut input = LineInput::new("héllo");
        input.left();
        input.left();
        input.insert('X');
        assert_eq!(input.text(), "hélXlo");
        input.home();
        assert!(!input.backspace());
        assert!(input.delete());
        assert_eq!(input.text(), "élXlo");
        input.end();
        assert_eq!(input.cursor(), 5);
    }
}
