//! Lexical completeness analysis for accumulated REPL input.
//!
//! `scan` is a single forward pass over the text with a bracket stack and
//! five flags: single-quoted string, double-quoted string, line comment,
//! block comment and pending escape. It is not a C parser; it only answers
//! "should the driver keep reading?".
//!
//! Rules, in priority order for each byte:
//! 1. A pending escape swallows the byte.
//! 2. Inside a string only the matching quote and `\` matter.
//! 3. Inside a line comment only `\n` matters.
//! 4. Inside a block comment only `*/` matters.
//! 5. Openers push, closers pop and must match (a closer on an empty stack
//!    never matches).
//! 6. Quotes open strings, `//` and `/*` open comments.
//!
//! The text handed in always ends with the line terminator just read; that
//! terminator is not scanned, so a trailing backslash is visible as a
//! continuation request. An unterminated string is Incomplete (a newline
//! inside a string keeps the unit open). A line comment running to the end
//! of the text is closed by that final terminator.
//!
//! All significant characters are ASCII, so scanning bytes is safe on UTF-8.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completeness {
    Incomplete,
    Complete,
    Invalid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bracket {
    Paren,
    Square,
    Curly,
}

impl Bracket {
    fn opener(b: u8) -> Option<Self> {
        match b {
            b'(' => Some(Bracket::Paren),
            b'[' => Some(Bracket::Square),
            b'{' => Some(Bracket::Curly),
            _ => None,
        }
    }

    fn closer(b: u8) -> Option<Self> {
        match b {
            b')' => Some(Bracket::Paren),
            b']' => Some(Bracket::Square),
            b'}' => Some(Bracket::Curly),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct Lexer {
    single: bool,
    double: bool,
    line_comment: bool,
    block_comment: bool,
    escape: bool,
}

/// What one byte turned out to be, for callers that need more than flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    /// Inside a comment, or the second byte of a comment marker.
    Comment,
    /// Code or string content.
    Code,
}

impl Lexer {
    fn in_string(&self) -> bool {
        self.single || self.double
    }

    /// Advance over `bytes[*i]`; may consume one extra byte for `/*` and `*/`.
    fn step(&mut self, bytes: &[u8], i: &mut usize) -> Class {
        let c = bytes[*i];
        let next = bytes.get(*i + 1).copied();
        if self.escape {
            self.escape = false;
            return Class::Code;
        }
        if self.in_string() {
            let quote = if self.single { b'\'' } else { b'"' };
            if c == b'\\' {
                self.escape = true;
            } else if c == quote {
                self.single = false;
                self.double = false;
            }
            return Class::Code;
        }
        if self.line_comment {
            if c == b'\n' {
                self.line_comment = false;
                return Class::Code;
            }
            return Class::Comment;
        }
        if self.block_comment {
            if c == b'*' && next == Some(b'/') {
                self.block_comment = false;
                *i += 1;
            }
            return Class::Comment;
        }
        match c {
            b'\'' => self.single = true,
            b'"' => self.double = true,
            b'/' if next == Some(b'/') => {
                self.line_comment = true;
                return Class::Comment;
            }
            b'/' if next == Some(b'*') => {
                self.block_comment = true;
                *i += 1;
                return Class::Comment;
            }
            _ => {}
        }
        Class::Code
    }
}

/// Classify accumulated text (ending in the terminator just read).
pub fn scan(text: &str) -> Completeness {
    let bytes = text.as_bytes();
    let end = bytes.len().saturating_sub(1);
    let mut lex = Lexer::default();
    let mut stack: Vec<Bracket> = Vec::new();
    let mut i = 0;
    while i < end {
        let c = bytes[i];
        let plain = !lex.escape && !lex.in_string() && !lex.line_comment && !lex.block_comment;
        if plain {
            if let Some(open) = Bracket::opener(c) {
                stack.push(open);
                i += 1;
                continue;
            }
            if let Some(close) = Bracket::closer(c) {
                if stack.pop() != Some(close) {
                    return Completeness::Invalid;
                }
                i += 1;
                continue;
            }
        }
        lex.step(bytes, &mut i);
        i += 1;
    }
    if lex.block_comment || lex.in_string() || !stack.is_empty() {
        return Completeness::Incomplete;
    }
    if end >= 1 && bytes[end - 1] == b'\\' {
        return Completeness::Incomplete;
    }
    Completeness::Complete
}

/// Last character outside comments and whitespace, or `None` when there is none.
///
/// Decides Statement (`;` or `}`) versus Expression once a unit is complete.
pub fn last_significant_char(text: &str) -> Option<char> {
    let bytes = text.as_bytes();
    let mut lex = Lexer::default();
    let mut last = None;
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let class = lex.step(bytes, &mut i);
        if class == Class::Code && !bytes[start].is_ascii_whitespace() {
            last = Some(start);
        }
        i += 1;
    }
    // Decode the full character in case the last byte belongs to a multi-byte scalar.
    let at = last?;
    let from = (0..=at).rev().find(|&k| text.is_char_boundary(k))?;
    text[from..].chars().next()
}

/// True when the text (minus its final terminator) ends inside a `//` comment.
pub fn ends_in_line_comment(text: &str) -> bool {
    let bytes = text.strip_suffix('\n').unwrap_or(text).as_bytes();
    let mut lex = Lexer::default();
    let mut i = 0;
    while i < bytes.len() {
        lex.step(bytes, &mut i);
        i += 1;
    }
    lex.line_comment
}

/// Split text into logical lines: a backslash escapes the following byte, so
/// `\` + newline joins two physical lines. Terminators are not included.
pub fn logical_lines(text: &str) -> LogicalLines<'_> {
    LogicalLines { text, pos: 0 }
}

pub struct LogicalLines<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Iterator for LogicalLines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.pos >= self.text.len() {
            return None;
        }
        let bytes = self.text.as_bytes();
        let start = self.pos;
        let mut j = start;
        let mut escaped = false;
        while j < bytes.len() {
            let c = bytes[j];
            if escaped {
                escaped = false;
            } else if c == b'\\' {
                escaped = true;
            } else if c == b'\n' {
                break;
            }
            j += 1;
        }
        self.pos = j + 1;
        Some(&self.text[start..j])
    }
}

/// True when `line` is a preprocessor directive whose name starts with `name`
/// (whitespace allowed before and after the `#`).
pub fn is_directive(line: &str, name: &str) -> bool {
    line.trim_start()
        .strip_prefix('#')
        .is_some_and(|rest| rest.trim_start().starts_with(name))
}

/// Conditional nesting check for preprocessor units: `#if*` opens, `#endif` closes.
pub fn scan_preprocessor(text: &str) -> Completeness {
    let mut depth: i64 = 0;
    for line in logical_lines(text) {
        if is_directive(line, "if") {
            depth += 1;
        } else if is_directive(line, "endif") {
            depth -= 1;
        }
    }
    match depth {
        d if d < 0 => Completeness::Invalid,
        0 => Completeness::Complete,
        _ => Completeness::Incomplete,
    }
}
