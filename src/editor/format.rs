//! Formatting commands as pure transforms over `(text, selection)`.

use super::markup::{self, ListKind, TextSize, FENCE, INDENT};
use super::Selection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCommand {
    Bold,
    Italic,
    CodeBlock,
    BulletList,
    NumberedList,
    TextSize(TextSize),
}

/// Apply a formatting command, returning the new text and selection
pub fn apply(text: &str, sel: Selection, command: FormatCommand) -> (String, Selection) {
    match command {
        FormatCommand::Bold => toggle_inline(text, sel, 2),
        FormatCommand::Italic => toggle_inline(text, sel, 1),
        FormatCommand::CodeBlock => toggle_code_block(text, sel),
        FormatCommand::BulletList => toggle_list(text, sel, false),
        FormatCommand::NumberedList => toggle_list(text, sel, true),
        FormatCommand::TextSize(size) => set_text_size(text, sel, size),
    }
}

/// Replace the selection with `insert`, leaving the caret after it
pub fn replace_selection(text: &str, sel: Selection, insert: &str) -> (String, Selection) {
    let chars: Vec<char> = text.chars().collect();
    let (start, end) = (sel.start.min(chars.len()), sel.end.min(chars.len()));
    let mut out: String = chars[..start].iter().collect();
    out.push_str(insert);
    out.extend(&chars[end..]);
    let caret = start + insert.chars().count();
    (out, Selection::caret(caret))
}

/// Indent (or outdent) every list item touched by the selection.
/// Returns `None` when the selection does not start on a list item.
pub fn shift_list_items(text: &str, sel: Selection, outdent: bool) -> Option<(String, Selection)> {
    let (first, last) = selected_lines(text, sel);
    let code = markup::code_line_flags(text);
    let fences = markup::fence_flags(text);
    let lines: Vec<&str> = text.split('\n').collect();
    let is_code = |idx: usize| {
        code.get(idx).copied().unwrap_or(false) || fences.get(idx).copied().unwrap_or(false)
    };
    if is_code(first) || markup::list_marker(lines.get(first)?).is_none() {
        return None;
    }

    let (out, selection) = rewrite_lines(text, sel, first, last, |idx, line| {
        if is_code(idx) {
            return line.to_string();
        }
        match markup::list_marker(line) {
            Some(_) if outdent => {
                let trim = line.len() - line.trim_start_matches(' ').len();
                line[trim.min(INDENT.len())..].to_string()
            }
            Some(_) => format!("{}{}", INDENT, line),
            None => line.to_string(),
        }
    });
    // Outdenting items already at the margin changes nothing
    if out == text {
        return None;
    }
    Some((out, selection))
}

fn star_run_before(chars: &[char], idx: usize) -> usize {
    chars[..idx].iter().rev().take_while(|c| **c == '*').count()
}

fn star_run_after(chars: &[char], idx: usize) -> usize {
    chars[idx..].iter().take_while(|c| **c == '*').count()
}

fn is_active(width: usize, before: usize, after: usize) -> bool {
    if width == 2 {
        before >= 2 && after >= 2
    } else {
        before % 2 == 1 && after % 2 == 1
    }
}

fn toggle_inline(text: &str, sel: Selection, width: usize) -> (String, Selection) {
    let chars: Vec<char> = text.chars().collect();
    let start = sel.start.min(chars.len());
    let end = sel.end.min(chars.len());

    // Markers just outside the selection: unwrap
    let before = star_run_before(&chars, start);
    let after = star_run_after(&chars, end);
    if end > start && is_active(width, before, after) {
        let mut out: Vec<char> = Vec::with_capacity(chars.len());
        out.extend(&chars[..start - width]);
        out.extend(&chars[start..end]);
        out.extend(&chars[end + width..]);
        return (
            out.into_iter().collect(),
            Selection::new(start - width, end - width),
        );
    }

    // Markers just inside the selection: unwrap
    let inner = &chars[start..end];
    let lead = star_run_after(inner, 0);
    let trail = star_run_before(inner, inner.len());
    if inner.len() >= width * 2 && lead < inner.len() && is_active(width, lead, trail) {
        let mut out: Vec<char> = Vec::with_capacity(chars.len());
        out.extend(&chars[..start]);
        out.extend(&inner[width..inner.len() - width]);
        out.extend(&chars[end..]);
        return (
            out.into_iter().collect(),
            Selection::new(start, end - width * 2),
        );
    }

    let marker: String = "*".repeat(width);
    let mut out: String = chars[..start].iter().collect();
    out.push_str(&marker);
    out.extend(&chars[start..end]);
    out.push_str(&marker);
    out.extend(&chars[end..]);
    (out, Selection::new(start + width, end + width))
}

fn selected_lines(text: &str, sel: Selection) -> (usize, usize) {
    let (first, _) = markup::line_col(text, sel.start);
    let (mut last, last_col) = markup::line_col(text, sel.end);
    // A range ending at column 0 does not include that line
    if sel.end > sel.start && last_col == 0 && last > first {
        last -= 1;
    }
    (first, last)
}

/// Rewrite lines `first..=last` with `f`, keeping the selection on the same content
fn rewrite_lines<F>(text: &str, sel: Selection, first: usize, last: usize, mut f: F) -> (String, Selection)
where
    F: FnMut(usize, &str) -> String,
{
    let old_lines: Vec<&str> = text.split('\n').collect();
    let mut new_lines: Vec<String> = Vec::with_capacity(old_lines.len());
    for (idx, line) in old_lines.iter().enumerate() {
        if idx >= first && idx <= last {
            new_lines.push(f(idx, line));
        } else {
            new_lines.push((*line).to_string());
        }
    }
    let out = new_lines.join("\n");

    let remap = |offset: usize| -> usize {
        let (line, col) = markup::line_col(text, offset);
        let old_len = old_lines.get(line).map(|l| l.chars().count()).unwrap_or(0) as isize;
        let new_len = new_lines.get(line).map(|l| l.chars().count()).unwrap_or(0) as isize;
        let shifted = (col as isize + new_len - old_len).clamp(0, new_len.max(0));
        markup::offset_of(&out, line, shifted as usize)
    };
    let selection = Selection::new(remap(sel.start), remap(sel.end));
    (out, selection)
}

fn strip_list_marker(line: &str) -> String {
    match markup::list_marker(line) {
        Some(marker) => {
            let indent = " ".repeat(marker.indent);
            let body: String = line.chars().skip(marker.prefix_len).collect();
            format!("{}{}", indent, body)
        }
        None => line.to_string(),
    }
}

fn toggle_list(text: &str, sel: Selection, numbered: bool) -> (String, Selection) {
    let (first, last) = selected_lines(text, sel);
    let code = markup::code_line_flags(text);
    let fences = markup::fence_flags(text);
    let lines: Vec<&str> = text.split('\n').collect();
    let eligible = |idx: usize| !code[idx] && !fences[idx];

    let already = (first..=last)
        .filter(|idx| eligible(*idx) && !lines[*idx].trim().is_empty())
        .all(|idx| match markup::list_marker(lines[idx]) {
            Some(marker) => matches!(marker.kind, ListKind::Numbered(_)) == numbered,
            None => false,
        });
    let has_content = (first..=last).any(|idx| eligible(idx) && !lines[idx].trim().is_empty());
    let remove = already && has_content;

    let mut number = 0u32;
    rewrite_lines(text, sel, first, last, |idx, line| {
        if !eligible(idx) {
            return line.to_string();
        }
        let stripped = strip_list_marker(line);
        if remove {
            return stripped.trim_start_matches(' ').to_string();
        }
        let indent_len = stripped.len() - stripped.trim_start_matches(' ').len();
        let (indent, body) = stripped.split_at(indent_len);
        if numbered {
            number += 1;
            format!("{}{}. {}", indent, number, body)
        } else {
            format!("{}- {}", indent, body)
        }
    })
}

fn set_text_size(text: &str, sel: Selection, size: TextSize) -> (String, Selection) {
    let (first, last) = selected_lines(text, sel);
    let code = markup::code_line_flags(text);
    let fences = markup::fence_flags(text);
    rewrite_lines(text, sel, first, last, |idx, line| {
        if code[idx] || fences[idx] {
            return line.to_string();
        }
        let (_, rest) = markup::split_size_prefix(line);
        format!("{}{}", size.prefix(), rest)
    })
}

/// (opening fence, closing fence) line pairs; an unterminated block has no close
fn fence_pairs(fences: &[bool]) -> Vec<(usize, Option<usize>)> {
    let mut pairs = Vec::new();
    let mut open = None;
    for (idx, is_fence) in fences.iter().enumerate() {
        if !*is_fence {
            continue;
        }
        match open.take() {
            Some(start) => pairs.push((start, Some(idx))),
            None => open = Some(idx),
        }
    }
    if let Some(start) = open {
        pairs.push((start, None));
    }
    pairs
}

fn toggle_code_block(text: &str, sel: Selection) -> (String, Selection) {
    let (first, last) = selected_lines(text, sel);
    let code = markup::code_line_flags(text);
    let fences = markup::fence_flags(text);
    let lines: Vec<&str> = text.split('\n').collect();

    if code[first] || fences[first] {
        let Some((open, close)) = fence_pairs(&fences)
            .into_iter()
            .find(|(open, close)| *open <= first && close.map_or(true, |c| first <= c))
        else {
            return (text.to_string(), sel);
        };
        let out = lines
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != open && Some(*idx) != close)
            .map(|(_, line)| *line)
            .collect::<Vec<_>>()
            .join("\n");
        let remap = |offset: usize| -> usize {
            let (line, col) = markup::line_col(text, offset);
            let removed_before =
                usize::from(line > open) + usize::from(close.is_some_and(|c| line > c));
            let col = if line == open || Some(line) == close { 0 } else { col };
            markup::offset_of(&out, line - removed_before, col)
        };
        let selection = Selection::new(remap(sel.start), remap(sel.end));
        return (out, selection);
    }

    let mut out_lines: Vec<String> = Vec::with_capacity(lines.len() + 2);
    for (idx, line) in lines.iter().enumerate() {
        if idx == first {
            out_lines.push(FENCE.to_string());
        }
        out_lines.push((*line).to_string());
        if idx == last {
            out_lines.push(FENCE.to_string());
        }
    }
    let out = out_lines.join("\n");
    let remap = |offset: usize| -> usize {
        let (line, col) = markup::line_col(text, offset);
        let shift = usize::from(line >= first) + usize::from(line > last);
        markup::offset_of(&out, line + shift, col)
    };
    let selection = Selection::new(remap(sel.start), remap(sel.end));
    (out, selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sel(start: usize, end: usize) -> Selection {
        Selection::new(start, end)
    }

    #[test]
    fn test_bold_wraps_and_unwraps() {
        let (text, s) = apply("make it loud", sel(8, 12), FormatCommand::Bold);
        assert_eq!(text, "make it **loud**");
        assert_eq!(s, sel(10, 14));

        let (text, s) = apply(&text, s, FormatCommand::Bold);
        assert_eq!(text, "make it loud");
        assert_eq!(s, sel(8, 12));
    }

    #[test]
    fn test_bold_unwraps_when_markers_are_selected() {
        let (text, s) = apply("a **b** c", sel(2, 7), FormatCommand::Bold);
        assert_eq!(text, "a b c");
        assert_eq!(s, sel(2, 3));
    }

    #[test]
    fn test_italic_inside_bold_adds_single_markers() {
        let (text, _) = apply("**word**", sel(2, 6), FormatCommand::Italic);
        assert_eq!(text, "***word***");

        let (text, _) = apply(&text, sel(3, 7), FormatCommand::Italic);
        assert_eq!(text, "**word**");
    }

    #[test]
    fn test_bold_on_caret_inserts_marker_pair() {
        let (text, s) = apply("ab", Selection::caret(1), FormatCommand::Bold);
        assert_eq!(text, "a****b");
        assert_eq!(s, Selection::caret(3));
    }

    #[test]
    fn test_bullet_list_toggles_over_selected_lines() {
        let (text, s) = apply("one\ntwo", sel(0, 7), FormatCommand::BulletList);
        assert_eq!(text, "- one\n- two");
        assert_eq!(s, sel(2, 11));

        let (text, _) = apply(&text, s, FormatCommand::BulletList);
        assert_eq!(text, "one\ntwo");
    }

    #[test]
    fn test_numbered_list_replaces_bullets() {
        let (text, _) = apply("- one\n- two", sel(0, 11), FormatCommand::NumberedList);
        assert_eq!(text, "1. one\n2. two");
    }

    #[test]
    fn test_text_size_replaces_existing_prefix() {
        let (text, s) = apply("title", Selection::caret(2), FormatCommand::TextSize(TextSize::Large));
        assert_eq!(text, "# title");
        assert_eq!(s, Selection::caret(4));

        let (text, _) = apply(&text, s, FormatCommand::TextSize(TextSize::Small));
        assert_eq!(text, "-# title");
        let (text, _) = apply(&text, Selection::caret(0), FormatCommand::TextSize(TextSize::Normal));
        assert_eq!(text, "title");
    }

    #[test]
    fn test_code_block_wraps_and_unwraps_lines() {
        let (text, s) = apply("a\nlet x = 1;\nb", sel(2, 12), FormatCommand::CodeBlock);
        assert_eq!(text, "a\n```\nlet x = 1;\n```\nb");
        assert_eq!(s, sel(6, 16));

        let (text, _) = apply(&text, Selection::caret(8), FormatCommand::CodeBlock);
        assert_eq!(text, "a\nlet x = 1;\nb");
    }

    #[test]
    fn test_shift_list_items_only_on_list_lines() {
        let (text, s) = shift_list_items("- item", Selection::caret(3), false).unwrap();
        assert_eq!(text, "  - item");
        assert_eq!(s, Selection::caret(5));

        let (text, s) = shift_list_items(&text, s, true).unwrap();
        assert_eq!(text, "- item");
        assert_eq!(s, Selection::caret(3));

        assert!(shift_list_items("plain", Selection::caret(0), false).is_none());
    }

    #[test]
    fn test_shift_list_items_skips_code_lines() {
        assert!(shift_list_items("```\n- x\n```", Selection::caret(6), false).is_none());

        // Indenting a range leaves list-looking code lines alone
        let text = "- a\n```\n- b\n```";
        let (out, _) = shift_list_items(text, sel(0, text.chars().count()), false).unwrap();
        assert_eq!(out, "  - a\n```\n- b\n```");
    }

    #[test]
    fn test_outdent_at_margin_is_not_handled() {
        assert!(shift_list_items("- x", Selection::caret(2), true).is_none());
    }

    #[test]
    fn test_replace_selection() {
        let (text, s) = replace_selection("hello world", sel(6, 11), "there");
        assert_eq!(text, "hello there");
        assert_eq!(s, Selection::caret(11));
    }
}
