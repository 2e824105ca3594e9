//! Rich text editing surface
//!
//! The editor owns a markup string plus a caret and an optional anchor. Every
//! input or movement snapshots the selection; formatting commands restore that
//! snapshot before they run, so a command issued after focus moved elsewhere
//! still applies to the text the user actually selected.

pub mod format;
pub mod highlight;
pub mod markup;

pub use format::FormatCommand;
pub use highlight::{HighlightedBlock, Highlighter, KeywordHighlighter, Token, TokenKind};
pub use markup::TextSize;

/// A range of char offsets, `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn new(a: usize, b: usize) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn caret(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// What the editor did with a Tab key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabOutcome {
    Indented,
    Outdented,
    InsertedSpaces,
    /// Not inside a list or code block; the caller should move focus
    NotHandled,
}

impl TabOutcome {
    pub fn changed_content(&self) -> bool {
        !matches!(self, TabOutcome::NotHandled)
    }
}

pub struct Editor {
    text: String,
    cursor: usize,
    anchor: Option<usize>,
    saved: Selection,
    /// Preferred column for vertical movement
    goal_col: Option<usize>,
    highlighter: Box<dyn Highlighter>,
    highlights: Vec<HighlightedBlock>,
    char_count: usize,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new(Box::new(KeywordHighlighter))
    }
}

impl Editor {
    pub fn new(highlighter: Box<dyn Highlighter>) -> Self {
        let mut editor = Self {
            text: String::new(),
            cursor: 0,
            anchor: None,
            saved: Selection::default(),
            goal_col: None,
            highlighter,
            highlights: Vec::new(),
            char_count: 0,
        };
        editor.refresh_derived();
        editor
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The live selection (caret when nothing is selected)
    pub fn selection(&self) -> Selection {
        match self.anchor {
            Some(anchor) => Selection::new(anchor, self.cursor),
            None => Selection::caret(self.cursor),
        }
    }

    /// The last snapshot taken by an input or selection change
    pub fn saved_selection(&self) -> Selection {
        self.saved
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn plain_text(&self) -> String {
        markup::plain_text(&self.text)
    }

    pub fn highlights(&self) -> &[HighlightedBlock] {
        &self.highlights
    }

    /// (line, column) of the caret
    pub fn cursor_line_col(&self) -> (usize, usize) {
        markup::line_col(&self.text, self.cursor)
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn snapshot(&mut self) {
        self.saved = self.selection();
    }

    fn refresh_derived(&mut self) {
        self.char_count = markup::char_count(&self.text);
        self.highlights = markup::code_blocks(&self.text)
            .into_iter()
            .map(|block| HighlightedBlock {
                first_line: block.first_line,
                lines: self
                    .highlighter
                    .highlight(block.language.as_deref(), &block.lines),
            })
            .collect();
    }

    fn replace_text(&mut self, text: String, selection: Selection) {
        self.text = text;
        self.set_selection(selection);
        self.refresh_derived();
    }

    fn set_selection(&mut self, selection: Selection) {
        let len = self.len();
        let start = selection.start.min(len);
        let end = selection.end.min(len);
        if start == end {
            self.anchor = None;
        } else {
            self.anchor = Some(start);
        }
        self.cursor = end;
        self.goal_col = None;
        self.snapshot();
    }

    /// Replace the content from outside. A no-op when the text is unchanged,
    /// so the caret is not disturbed by redundant updates.
    pub fn set_content(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        let caret = text.chars().count();
        self.replace_text(text.to_string(), Selection::caret(caret));
        true
    }

    /// Focus left the editor: the visible selection collapses, the snapshot stays
    pub fn blur(&mut self) {
        self.anchor = None;
    }

    /// Focus returned: bring back the last snapshot
    pub fn focus(&mut self) {
        let saved = self.saved;
        self.set_selection(saved);
    }

    pub fn select(&mut self, selection: Selection) {
        self.set_selection(selection);
    }

    pub fn select_all(&mut self) {
        let len = self.len();
        self.set_selection(Selection::new(0, len));
    }

    pub fn insert_str(&mut self, insert: &str) -> bool {
        if insert.is_empty() && self.selection().is_empty() {
            return false;
        }
        let (text, selection) = format::replace_selection(&self.text, self.selection(), insert);
        self.replace_text(text, selection);
        true
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.insert_str(ch.encode_utf8(&mut buf))
    }

    /// Insert a line break, continuing the current list item.
    /// An empty list item ends the list instead.
    pub fn newline(&mut self) -> bool {
        let selection = self.selection();
        let (line_idx, _) = markup::line_col(&self.text, selection.start);
        let line = self.text.split('\n').nth(line_idx).unwrap_or("").to_string();
        let in_code = markup::code_line_flags(&self.text)
            .get(line_idx)
            .copied()
            .unwrap_or(false);

        if !in_code && selection.is_empty() {
            if let Some(marker) = markup::list_marker(&line) {
                if line.chars().count() == marker.prefix_len {
                    let line_start = markup::offset_of(&self.text, line_idx, 0);
                    let range = Selection::new(line_start, line_start + marker.prefix_len);
                    let (text, sel) = format::replace_selection(&self.text, range, "");
                    self.replace_text(text, sel);
                    return true;
                }
                let next = match marker.kind {
                    markup::ListKind::Bullet => "- ".to_string(),
                    markup::ListKind::Numbered(n) => format!("{}. ", n + 1),
                };
                let continuation = format!("\n{}{}", " ".repeat(marker.indent), next);
                return self.insert_str(&continuation);
            }
        }
        self.insert_str("\n")
    }

    pub fn backspace(&mut self) -> bool {
        let selection = self.selection();
        let range = if selection.is_empty() {
            if self.cursor == 0 {
                return false;
            }
            Selection::new(self.cursor - 1, self.cursor)
        } else {
            selection
        };
        let (text, sel) = format::replace_selection(&self.text, range, "");
        self.replace_text(text, sel);
        true
    }

    pub fn delete(&mut self) -> bool {
        let selection = self.selection();
        let range = if selection.is_empty() {
            if self.cursor >= self.len() {
                return false;
            }
            Selection::new(self.cursor, self.cursor + 1)
        } else {
            selection
        };
        let (text, sel) = format::replace_selection(&self.text, range, "");
        self.replace_text(text, sel);
        true
    }

    fn move_to(&mut self, target: usize, extend: bool) {
        if extend {
            if self.anchor.is_none() {
                self.anchor = Some(self.cursor);
            }
        } else {
            self.anchor = None;
        }
        self.cursor = target.min(self.len());
        if self.anchor == Some(self.cursor) {
            self.anchor = None;
        }
        self.snapshot();
    }

    pub fn move_left(&mut self, extend: bool) {
        let selection = self.selection();
        let target = if !extend && !selection.is_empty() {
            selection.start
        } else {
            self.cursor.saturating_sub(1)
        };
        self.goal_col = None;
        self.move_to(target, extend);
    }

    pub fn move_right(&mut self, extend: bool) {
        let selection = self.selection();
        let target = if !extend && !selection.is_empty() {
            selection.end
        } else {
            self.cursor + 1
        };
        self.goal_col = None;
        self.move_to(target, extend);
    }

    pub fn move_up(&mut self, extend: bool) {
        let (line, col) = self.cursor_line_col();
        let goal = *self.goal_col.get_or_insert(col);
        let target = if line == 0 {
            0
        } else {
            markup::offset_of(&self.text, line - 1, goal)
        };
        self.move_to(target, extend);
    }

    pub fn move_down(&mut self, extend: bool) {
        let (line, col) = self.cursor_line_col();
        let goal = *self.goal_col.get_or_insert(col);
        let line_count = self.text.split('\n').count();
        let target = if line + 1 >= line_count {
            self.len()
        } else {
            markup::offset_of(&self.text, line + 1, goal)
        };
        self.move_to(target, extend);
    }

    pub fn move_home(&mut self, extend: bool) {
        let (line, _) = self.cursor_line_col();
        self.goal_col = None;
        self.move_to(markup::offset_of(&self.text, line, 0), extend);
    }

    pub fn move_end(&mut self, extend: bool) {
        let (line, _) = self.cursor_line_col();
        self.goal_col = None;
        self.move_to(markup::offset_of(&self.text, line, usize::MAX), extend);
    }

    /// Run a formatting command against the last selection snapshot
    pub fn apply(&mut self, command: FormatCommand) -> bool {
        let saved = self.saved;
        self.set_selection(saved);
        let (text, selection) = format::apply(&self.text, self.saved, command);
        if text == self.text {
            self.set_selection(selection);
            return false;
        }
        self.replace_text(text, selection);
        true
    }

    /// Structural Tab handling for list items and code blocks
    pub fn handle_tab(&mut self, shift: bool) -> TabOutcome {
        let selection = self.selection();
        if let Some((text, sel)) = format::shift_list_items(&self.text, selection, shift) {
            self.replace_text(text, sel);
            return if shift {
                TabOutcome::Outdented
            } else {
                TabOutcome::Indented
            };
        }

        let (line, _) = markup::line_col(&self.text, selection.start);
        let in_code = markup::code_line_flags(&self.text)
            .get(line)
            .copied()
            .unwrap_or(false);
        if in_code && !shift {
            let (text, sel) = format::replace_selection(&self.text, selection, markup::INDENT);
            self.replace_text(text, sel);
            return TabOutcome::InsertedSpaces;
        }
        TabOutcome::NotHandled
    }
}
