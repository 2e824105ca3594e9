//! Line-level understanding of the editor markup
//!
//! The markup is a small markdown dialect:
//! `**bold**`, `*italic*`, fenced code blocks, `- ` and `1. ` list items
//! indented in steps of two spaces, and `# ` / `-# ` size prefixes.

use regex::Regex;
use std::sync::OnceLock;

pub const FENCE: &str = "```";
pub const INDENT: &str = "  ";

/// Relative text size of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextSize {
    Small,
    #[default]
    Normal,
    Large,
}

impl TextSize {
    pub fn prefix(&self) -> &'static str {
        match self {
            TextSize::Small => "-# ",
            TextSize::Normal => "",
            TextSize::Large => "# ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Numbered(u32),
}

/// A list marker at the start of a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListMarker {
    pub kind: ListKind,
    /// Leading spaces before the marker
    pub indent: usize,
    /// Chars up to and including the space after the marker
    pub prefix_len: usize,
}

impl ListMarker {
    pub fn level(&self) -> usize {
        self.indent / INDENT.len()
    }
}

fn list_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^( *)(?:(-)|(\d{1,9})\.) ").expect("valid list regex"))
}

fn bold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid bold regex"))
}

fn italic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\*([^*\s](?:[^*]*[^*\s])?)\*").expect("valid italic regex")
    })
}

pub fn list_marker(line: &str) -> Option<ListMarker> {
    let caps = list_marker_re().captures(line)?;
    let indent = caps.get(1).map(|m| m.as_str().len()).unwrap_or(0);
    let kind = match caps.get(3) {
        Some(number) => ListKind::Numbered(number.as_str().parse().unwrap_or(1)),
        None => ListKind::Bullet,
    };
    let prefix_len = caps.get(0).map(|m| m.as_str().chars().count()).unwrap_or(0);
    Some(ListMarker {
        kind,
        indent,
        prefix_len,
    })
}

pub fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

/// Split off a size prefix, returning the size and the remaining text
pub fn split_size_prefix(line: &str) -> (TextSize, &str) {
    if let Some(rest) = line.strip_prefix("-# ") {
        (TextSize::Small, rest)
    } else if let Some(rest) = line.strip_prefix("# ") {
        (TextSize::Large, rest)
    } else {
        (TextSize::Normal, line)
    }
}

/// For each line: is it code inside a fenced block (fence lines excluded)?
pub fn code_line_flags(text: &str) -> Vec<bool> {
    let mut in_code = false;
    text.split('\n')
        .map(|line| {
            if is_fence(line) {
                in_code = !in_code;
                false
            } else {
                in_code
            }
        })
        .collect()
}

/// Is line `idx` a fence line that opens or closes a block?
pub fn fence_flags(text: &str) -> Vec<bool> {
    text.split('\n').map(is_fence).collect()
}

/// A fenced code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    pub language: Option<String>,
    /// Index of the first code line (the line after the opening fence)
    pub first_line: usize,
    pub lines: Vec<String>,
}

pub fn code_blocks(text: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<CodeBlock> = None;

    for (idx, line) in text.split('\n').enumerate() {
        if is_fence(line) {
            match current.take() {
                Some(block) => blocks.push(block),
                None => {
                    let language = line.trim_start()[FENCE.len()..].trim();
                    current = Some(CodeBlock {
                        language: (!language.is_empty()).then(|| language.to_string()),
                        first_line: idx + 1,
                        lines: Vec::new(),
                    });
                }
            }
        } else if let Some(block) = current.as_mut() {
            block.lines.push(line.to_string());
        }
    }

    // An unterminated fence still highlights what follows it
    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}

/// Strip inline emphasis markers
pub fn strip_inline(line: &str) -> String {
    let without_bold = bold_re().replace_all(line, "$1");
    italic_re().replace_all(&without_bold, "$1").into_owned()
}

/// The text with every piece of markup removed
pub fn plain_text(markup: &str) -> String {
    let code = code_line_flags(markup);
    let mut out: Vec<String> = Vec::new();

    for (idx, line) in markup.split('\n').enumerate() {
        if is_fence(line) {
            continue;
        }
        if code.get(idx).copied().unwrap_or(false) {
            out.push(line.to_string());
            continue;
        }
        let (_, rest) = split_size_prefix(line);
        let body = match list_marker(rest) {
            Some(marker) => rest.chars().skip(marker.prefix_len).collect::<String>(),
            None => rest.to_string(),
        };
        out.push(strip_inline(&body));
    }

    out.join("\n")
}

/// Visible characters, not counting the line breaks between blocks
pub fn char_count(markup: &str) -> usize {
    plain_text(markup).chars().filter(|c| *c != '\n').count()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emphasis {
    Bold,
    Italic,
}

/// An emphasized run within one line, in char offsets.
/// `start..end` covers the markers too.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineRange {
    pub emphasis: Emphasis,
    pub start: usize,
    pub end: usize,
    pub marker_len: usize,
}

/// Emphasis runs of a line, matching what `strip_inline` removes
pub fn inline_ranges(line: &str) -> Vec<InlineRange> {
    let char_at = |byte: usize| line[..byte].chars().count();
    let mut ranges = Vec::new();
    let mut masked = line.to_string();

    for m in bold_re().find_iter(line) {
        ranges.push(InlineRange {
            emphasis: Emphasis::Bold,
            start: char_at(m.start()),
            end: char_at(m.end()),
            marker_len: 2,
        });
        // Same byte length, so offsets into `masked` stay valid for `line`
        let blank = " ".repeat(m.end() - m.start());
        masked.replace_range(m.start()..m.end(), &blank);
    }
    for m in italic_re().find_iter(&masked) {
        ranges.push(InlineRange {
            emphasis: Emphasis::Italic,
            start: char_at(m.start()),
            end: char_at(m.end()),
            marker_len: 1,
        });
    }
    ranges.sort_by_key(|r| r.start);
    ranges
}

/// Char offset at which each line starts
pub fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (idx, ch) in text.chars().enumerate() {
        if ch == '\n' {
            starts.push(idx + 1);
        }
    }
    starts
}

/// (line, column) of a char offset, both zero-based
pub fn line_col(text: &str, offset: usize) -> (usize, usize) {
    let starts = line_starts(text);
    let line = match starts.binary_search(&offset) {
        Ok(exact) => exact,
        Err(insert) => insert.saturating_sub(1),
    };
    (line, offset - starts[line])
}

/// Char offset of (line, column), clamped to the line's length
pub fn offset_of(text: &str, line: usize, col: usize) -> usize {
    let lines: Vec<&str> = text.split('\n').collect();
    let starts = line_starts(text);
    let line = line.min(lines.len().saturating_sub(1));
    let len = lines.get(line).map(|l| l.chars().count()).unwrap_or(0);
    starts.get(line).copied().unwrap_or(0) + col.min(len)
}
