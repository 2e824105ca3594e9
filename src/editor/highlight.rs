//! Syntax highlighting for fenced code blocks

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Plain,
    Keyword,
    String,
    Number,
    Comment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

/// Highlighted lines of one code block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedBlock {
    /// Editor line index of the first code line
    pub first_line: usize,
    pub lines: Vec<Vec<Token>>,
}

/// Turns the lines of a code block into styled tokens
pub trait Highlighter: Send {
    fn highlight(&self, language: Option<&str>, lines: &[String]) -> Vec<Vec<Token>>;
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "class", "const", "continue", "def", "elif", "else", "enum",
    "export", "false", "fn", "for", "from", "function", "if", "impl", "import", "in", "let",
    "match", "mut", "None", "null", "pub", "return", "self", "SELECT", "static", "struct",
    "true", "True", "False", "type", "use", "var", "WHERE", "while", "with", "FROM",
];

fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?P<comment>//.*$|#.*$|--.*$)|(?P<string>"(?:[^"\\]|\\.)*"?|'(?:[^'\\]|\\.)*'?)|(?P<number>\b\d+(?:\.\d+)?\b)|(?P<word>[A-Za-z_][A-Za-z0-9_]*)"#,
        )
        .expect("valid token regex")
    })
}

/// Keyword/string/number/comment highlighter that works across common languages
#[derive(Debug, Default, Clone, Copy)]
pub struct KeywordHighlighter;

impl KeywordHighlighter {
    fn highlight_line(line: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut last = 0;
        let push = |tokens: &mut Vec<Token>, kind: TokenKind, text: &str| {
            if text.is_empty() {
                return;
            }
            match tokens.last_mut() {
                Some(prev) if prev.kind == kind => prev.text.push_str(text),
                _ => tokens.push(Token {
                    kind,
                    text: text.to_string(),
                }),
            }
        };

        for caps in token_re().captures_iter(line) {
            let Some(whole) = caps.get(0) else {
                continue;
            };
            push(&mut tokens, TokenKind::Plain, &line[last..whole.start()]);
            let kind = if caps.name("comment").is_some() {
                TokenKind::Comment
            } else if caps.name("string").is_some() {
                TokenKind::String
            } else if caps.name("number").is_some() {
                TokenKind::Number
            } else if KEYWORDS.contains(&whole.as_str()) {
                TokenKind::Keyword
            } else {
                TokenKind::Plain
            };
            push(&mut tokens, kind, whole.as_str());
            last = whole.end();
        }
        push(&mut tokens, TokenKind::Plain, &line[last..]);
        tokens
    }
}

impl Highlighter for KeywordHighlighter {
    fn highlight(&self, _language: Option<&str>, lines: &[String]) -> Vec<Vec<Token>> {
        lines.iter().map(|line| Self::highlight_line(line)).collect()
    }
}
