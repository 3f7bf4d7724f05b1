//! Tab-completion hook with circular cycling.
//!
//! The first Tab asks the `Completer` for candidates at the cursor and shows
//! the first one. Each further Tab shows the next candidate; after the last
//! one the original text comes back, then the cycle starts over. Escape
//! restores the original text and ends the cycle. Any other key accepts the
//! text currently shown and is then handled normally.

use core_text::EditBuffer;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Text spliced in at `Completions::start`.
    pub replacement: String,
    /// Short label (the bare word) for listings.
    pub display: String,
}

impl Candidate {
    pub fn new(replacement: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            replacement: replacement.into(),
            display: display.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completions {
    /// Codepoint offset within the line where the replacement begins.
    pub start: usize,
    pub candidates: Vec<Candidate>,
}

impl Completions {
    pub fn at(start: usize) -> Self {
        Self {
            start,
            candidates: Vec::new(),
        }
    }

    pub fn add(&mut self, replacement: impl Into<String>, display: impl Into<String>) {
        self.candidates.push(Candidate::new(replacement, display));
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

pub trait Completer {
    /// `line` is the editable text, `cursor` a codepoint offset into it.
    fn complete(&self, line: &str, cursor: usize) -> Completions;
}

impl<F> Completer for F
where
    F: Fn(&str, usize) -> Completions,
{
    fn complete(&self, line: &str, cursor: usize) -> Completions {
        self(line, cursor)
    }
}

/// Active cycle: the text before the first Tab plus the candidate list.
#[derive(Debug)]
pub(crate) struct CompletionCycle {
    original: Vec<char>,
    original_cursor: usize,
    completions: Completions,
    /// `None` while the original text is shown.
    index: Option<usize>,
}

impl CompletionCycle {
    pub(crate) fn start(buf: &EditBuffer, completions: Completions) -> Self {
        Self {
            original: buf.editable().to_vec(),
            original_cursor: buf.editable_cursor(),
            completions,
            index: None,
        }
    }

    /// Show the next entry of the cycle.
    pub(crate) fn advance(&mut self, buf: &mut EditBuffer) {
        let n = self.completions.candidates.len();
        self.index = match self.index {
            None => Some(0),
            Some(i) if i + 1 < n => Some(i + 1),
            Some(_) => None,
        };
        self.show(buf);
    }

    pub(crate) fn restore(&self, buf: &mut EditBuffer) {
        buf.replace_editable(&self.original);
        buf.set_editable_cursor(self.original_cursor);
    }

    fn show(&self, buf: &mut EditBuffer) {
        self.restore(buf);
        if let Some(i) = self.index {
            let replacement: Vec<char> = self.completions.candidates[i].replacement.chars().collect();
            buf.splice_before_cursor(self.completions.start, &replacement);
        }
    }
}
