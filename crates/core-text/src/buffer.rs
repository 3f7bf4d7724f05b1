//! Codepoint edit buffer with an immutable prompt prefix.
//!
//! Invariant: `fixed <= cursor <= len` after every operation. Indices below
//! `fixed` hold the rendered prompt and are never edited. Every mutating
//! method returns `true` when it changed content or cursor so the caller can
//! skip redundant redraws.

use crate::utf8;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditBuffer {
    cps: Vec<char>,
    cursor: usize,
    fixed: usize,
}

impl EditBuffer {
    /// Seed a fresh buffer with `prompt`; cursor starts right after it.
    pub fn with_prompt(prompt: &str) -> Self {
        let cps: Vec<char> = prompt.chars().collect();
        let fixed = cps.len();
        Self {
            cps,
            cursor: fixed,
            fixed,
        }
    }

    /// Replace the prompt and drop any editable content.
    pub fn set_prompt(&mut self, prompt: &str) {
        self.cps.clear();
        self.cps.extend(prompt.chars());
        self.fixed = self.cps.len();
        self.cursor = self.fixed;
    }

    pub fn len(&self) -> usize {
        self.cps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cps.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn fixed(&self) -> usize {
        self.fixed
    }

    /// All codepoints including the prompt prefix.
    pub fn codepoints(&self) -> &[char] {
        &self.cps
    }

    /// Codepoints after the prompt.
    pub fn editable(&self) -> &[char] {
        &self.cps[self.fixed..]
    }

    pub fn has_editable(&self) -> bool {
        self.cps.len() > self.fixed
    }

    /// Cursor offset relative to the start of the editable region.
    pub fn editable_cursor(&self) -> usize {
        self.cursor - self.fixed
    }

    /// Editable region as UTF-8.
    pub fn text(&self) -> String {
        let mut out = String::new();
        utf8::encode_into(self.editable(), &mut out);
        out
    }

    pub fn insert(&mut self, c: char) -> bool {
        self.cps.insert(self.cursor, c);
        self.cursor += 1;
        true
    }

    /// Insert a run of codepoints at the cursor.
    pub fn insert_slice(&mut self, cs: &[char]) -> bool {
        if cs.is_empty() {
            return false;
        }
        let at = self.cursor;
        self.cps.splice(at..at, cs.iter().copied());
        self.cursor += cs.len();
        true
    }

    /// Delete the codepoint left of the cursor (no-op at `fixed`).
    pub fn backspace(&mut self) -> bool {
        if self.cursor == self.fixed {
            return false;
        }
        self.cursor -= 1;
        self.cps.remove(self.cursor);
        true
    }

    /// Delete the codepoint under the cursor (no-op at end).
    pub fn delete(&mut self) -> bool {
        if self.cursor >= self.cps.len() {
            return false;
        }
        self.cps.remove(self.cursor);
        true
    }

    /// Delete the word left of the cursor: trailing spaces first, then the
    /// run of non-space codepoints before them.
    pub fn delete_prev_word(&mut self) -> bool {
        let end = self.cursor;
        let mut start = end;
        while start > self.fixed && self.cps[start - 1] == ' ' {
            start -= 1;
        }
        while start > self.fixed && self.cps[start - 1] != ' ' {
            start -= 1;
        }
        if start == end {
            return false;
        }
        self.cps.drain(start..end);
        self.cursor = start;
        true
    }

    /// Clear from cursor to end of line.
    pub fn delete_to_end(&mut self) -> bool {
        if self.cursor >= self.cps.len() {
            return false;
        }
        self.cps.truncate(self.cursor);
        true
    }

    /// Clear the whole editable region.
    pub fn delete_line(&mut self) -> bool {
        if !self.has_editable() {
            return false;
        }
        self.cps.truncate(self.fixed);
        self.cursor = self.fixed;
        true
    }

    /// Swap the codepoint left of the cursor with the one under it, then advance.
    pub fn transpose(&mut self) -> bool {
        if self.cursor <= self.fixed || self.cursor >= self.cps.len() {
            return false;
        }
        self.cps.swap(self.cursor - 1, self.cursor);
        self.cursor += 1;
        true
    }

    pub fn move_left(&mut self) -> bool {
        if self.cursor > self.fixed {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    pub fn move_right(&mut self) -> bool {
        if self.cursor < self.cps.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    pub fn move_home(&mut self) -> bool {
        let moved = self.cursor != self.fixed;
        self.cursor = self.fixed;
        moved
    }

    pub fn move_end(&mut self) -> bool {
        let moved = self.cursor != self.cps.len();
        self.cursor = self.cps.len();
        moved
    }

    /// Replace the editable region wholesale (history recall); cursor to end.
    pub fn replace_editable(&mut self, cs: &[char]) {
        self.cps.truncate(self.fixed);
        self.cps.extend_from_slice(cs);
        self.cursor = self.cps.len();
    }

    /// Place the cursor at `offset` within the editable region (clamped).
    pub fn set_editable_cursor(&mut self, offset: usize) {
        self.cursor = (self.fixed + offset).min(self.cps.len());
    }

    /// Replace `[fixed + start, cursor)` with `cs` (completion splice).
    /// `start` is relative to the editable region and clamped to the cursor.
    pub fn splice_before_cursor(&mut self, start: usize, cs: &[char]) {
        let from = (self.fixed + start).min(self.cursor);
        let to = self.cursor;
        self.cps.splice(from..to, cs.iter().copied());
        self.cursor = from + cs.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(prompt: &str, text: &str) -> EditBuffer {
        let mut b = EditBuffer::with_prompt(prompt);
        for c in text.chars() {
            b.insert(c);
        }
        b
    }

    #[test]
    fn prompt_is_fixed() {
        let mut b = EditBuffer::with_prompt(" 1) ");
        assert_eq!(b.fixed(), 4);
        assert_eq!(b.cursor(), 4);
        assert!(!b.backspace());
        assert!(!b.move_left());
        assert_eq!(b.text(), "");
    }

    #[test]
    fn insert_in_middle() {
        let mut b = buf("> ", "ac");
        b.move_left();
        b.insert('b');
        assert_eq!(b.text(), "abc");
        assert_eq!(b.editable_cursor(), 2);
    }

    #[test]
    fn delete_prev_word_eats_trailing_spaces() {
        let mut b = buf("> ", "int foo  ");
        assert!(b.delete_prev_word());
        assert_eq!(b.text(), "int ");
        assert!(b.delete_prev_word());
        assert_eq!(b.text(), "");
        assert!(!b.delete_prev_word());
    }

    #[test]
    fn delete_to_end_and_line() {
        let mut b = buf("> ", "hello");
        b.move_home();
        b.move_right();
        assert!(b.delete_to_end());
        assert_eq!(b.text(), "h");
        assert!(b.delete_line());
        assert_eq!(b.cursor(), b.fixed());
        assert!(!b.delete_line());
    }

    #[test]
    fn transpose_advances() {
        let mut b = buf("", "ab");
        b.move_left();
        assert!(b.transpose());
        assert_eq!(b.text(), "ba");
        assert_eq!(b.cursor(), 2);
        assert!(!b.transpose());
    }

    #[test]
    fn splice_for_completion() {
        let mut b = buf("", "x = pri");
        b.splice_before_cursor(4, &"printf(".chars().collect::<Vec<_>>());
        assert_eq!(b.text(), "x = printf(");
        assert_eq!(b.editable_cursor(), 11);
    }

    #[test]
    fn replace_editable_moves_cursor_to_end() {
        let mut b = buf("p ", "abc");
        b.move_home();
        b.replace_editable(&['x', 'y']);
        assert_eq!(b.text(), "xy");
        assert_eq!(b.cursor(), b.len());
    }
}
