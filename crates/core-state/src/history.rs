//! Session history store.
//!
//! Layout: one flat codepoint log plus `{offset, len}` spans into it. Spans
//! are non-overlapping and increase monotonically in offset because entries
//! are only ever appended or popped from the end.
//!
//! Read lifecycle:
//! - `begin_read` pushes an empty provisional entry for the line being edited.
//! - The first recall step (`recall`) snapshots the in-progress edit into that
//!   provisional slot so moving back to position 0 restores it.
//! - `commit` (Enter, or Ctrl-D on an empty line) pops the provisional entry
//!   and pushes the final text unless it is empty or a recalled entry that was
//!   not edited.
//! - `discard` (Ctrl-C) pops the provisional entry.
//!
//! Duplicate suppression: a push whose content equals the current last entry
//! is dropped. When a snapshot is dropped this way the provisional slot no
//! longer exists, and the store tracks that so a later commit never pops a
//! real entry.
//!
//! Telemetry: pushes, skips and pops emit `trace!` events on target `history`
//! with lengths only, never entry content.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub offset: usize,
    pub len: usize,
}

/// Recall direction for `History::recall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recall {
    Older,
    Newer,
}

impl Recall {
    fn delta(self) -> isize {
        match self {
            Recall::Older => 1,
            Recall::Newer => -1,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct History {
    values: Vec<char>,
    entries: Vec<HistoryEntry>,
    pos: usize,
    is_recall: bool,
    provisional: bool,
    duplicates_skipped: u64,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Recall cursor: 0 is the most recent entry.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_recall(&self) -> bool {
        self.is_recall
    }

    /// Whether the previous key was a recall step. The editor sets this after
    /// every key so `commit` can tell an unmodified recalled entry apart.
    pub fn set_recall(&mut self, recall: bool) {
        self.is_recall = recall;
    }

    pub fn duplicates_skipped(&self) -> u64 {
        self.duplicates_skipped
    }

    pub fn entry_spans(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entry by age (0 = newest).
    pub fn get(&self, age: usize) -> Option<&[char]> {
        let idx = self.entries.len().checked_sub(1 + age)?;
        let e = self.entries[idx];
        Some(&self.values[e.offset..e.offset + e.len])
    }

    /// Entries oldest first, as strings.
    pub fn iter_text(&self) -> impl Iterator<Item = String> + '_ {
        self.entries
            .iter()
            .map(|e| self.values[e.offset..e.offset + e.len].iter().collect())
    }

    /// Append an entry; returns `false` when it duplicates the last entry.
    pub fn push(&mut self, entry: &[char]) -> bool {
        if let Some(last) = self.entries.last() {
            if last.len == entry.len()
                && self.values[last.offset..last.offset + last.len] == *entry
            {
                self.duplicates_skipped += 1;
                trace!(target: "history", len = self.entries.len(), skipped = self.duplicates_skipped, "push_duplicate_skip");
                return false;
            }
        }
        let offset = self.values.len();
        self.values.extend_from_slice(entry);
        self.entries.push(HistoryEntry {
            offset,
            len: entry.len(),
        });
        trace!(target: "history", len = self.entries.len(), entry_len = entry.len(), "push");
        true
    }

    /// Remove the newest entry and truncate the value log to its offset.
    pub fn pop(&mut self) {
        if let Some(e) = self.entries.pop() {
            self.values.truncate(e.offset);
            trace!(target: "history", len = self.entries.len(), "pop");
        }
    }

    /// Start a new line read: reset recall state and push the provisional entry.
    pub fn begin_read(&mut self) {
        self.pos = 0;
        self.is_recall = false;
        let offset = self.values.len();
        self.entries.push(HistoryEntry { offset, len: 0 });
        self.provisional = true;
    }

    fn pop_provisional(&mut self) {
        if self.provisional {
            self.pop();
            self.provisional = false;
        }
    }

    /// Save the in-progress edit into the provisional slot. Skipped while
    /// recalling and for empty text.
    pub fn snapshot(&mut self, text: &[char]) {
        if self.is_recall || text.is_empty() {
            return;
        }
        self.pop_provisional();
        self.provisional = self.push(text);
        self.pos = 0;
    }

    /// Finish a read with `text` as the submitted line.
    pub fn commit(&mut self, text: &[char]) {
        self.pop_provisional();
        if self.is_recall && self.pos != 0 {
            trace!(target: "history", pos = self.pos, "commit_recalled_unmodified");
            return;
        }
        if text.is_empty() {
            return;
        }
        self.push(text);
        self.pos = 0;
    }

    /// Abandon the read (Ctrl-C).
    pub fn discard(&mut self) {
        self.pop_provisional();
    }

    /// Move the recall cursor one step. Returns the entry to show, or `None`
    /// when there is nothing to recall or the cursor is already at a bound.
    pub fn recall(&mut self, dir: Recall, current: &[char]) -> Option<Vec<char>> {
        if self.entries.len() <= 1 {
            return None;
        }
        self.snapshot(current);
        let next = self.pos as isize + dir.delta();
        if next < 0 {
            self.pos = 0;
            return None;
        }
        let max = self.entries.len() - 1;
        if next as usize > max {
            self.pos = max;
            return None;
        }
        self.pos = next as usize;
        trace!(target: "history", pos = self.pos, len = self.entries.len(), "recall");
        self.get(self.pos).map(<[char]>::to_vec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    fn committed(h: &mut History, s: &str) {
        h.begin_read();
        h.commit(&cps(s));
        h.set_recall(false);
    }

    #[test]
    fn duplicate_push_does_not_grow() {
        let mut h = History::new();
        assert!(h.push(&cps("a")));
        assert!(!h.push(&cps("a")));
        assert_eq!(h.len(), 1);
        assert!(h.push(&cps("b")));
        assert_eq!(h.len(), 2);
        assert_eq!(h.duplicates_skipped(), 1);
    }

    #[test]
    fn spans_are_monotonic() {
        let mut h = History::new();
        for s in ["int x;", "x", "x + 1"] {
            committed(&mut h, s);
        }
        let spans = h.entry_spans();
        assert!(spans.windows(2).all(|w| w[0].offset + w[0].len <= w[1].offset));
        assert_eq!(h.iter_text().collect::<Vec<_>>(), vec!["int x;", "x", "x + 1"]);
    }

    #[test]
    fn empty_commit_leaves_history_unchanged() {
        let mut h = History::new();
        committed(&mut h, "a");
        committed(&mut h, "");
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn discard_pops_provisional() {
        let mut h = History::new();
        committed(&mut h, "a");
        h.begin_read();
        assert_eq!(h.len(), 2);
        h.discard();
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn recall_round_trip_restores_in_progress_edit() {
        let mut h = History::new();
        for s in ["one", "two", "three"] {
            committed(&mut h, s);
        }
        h.begin_read();
        let mut shown = cps("draft");
        let n = h.len();
        for _ in 0..n - 1 {
            shown = h.recall(Recall::Older, &shown).unwrap();
            h.set_recall(true);
        }
        assert_eq!(shown, cps("one"));
        for _ in 0..n - 1 {
            shown = h.recall(Recall::Newer, &shown).unwrap();
            h.set_recall(true);
        }
        assert_eq!(shown, cps("draft"));
    }

    #[test]
    fn recall_clamps_at_bounds() {
        let mut h = History::new();
        committed(&mut h, "one");
        h.begin_read();
        assert_eq!(h.recall(Recall::Newer, &[]), None);
        assert_eq!(h.recall(Recall::Older, &[]), Some(cps("one")));
        h.set_recall(true);
        assert_eq!(h.recall(Recall::Older, &cps("one")), None);
        assert_eq!(h.pos(), 1);
    }

    #[test]
    fn unmodified_recall_is_not_recommitted() {
        let mut h = History::new();
        committed(&mut h, "one");
        committed(&mut h, "two");
        h.begin_read();
        let shown = h.recall(Recall::Older, &[]).unwrap();
        h.set_recall(true);
        h.commit(&shown);
        assert_eq!(h.iter_text().collect::<Vec<_>>(), vec!["one", "two"]);
    }

    #[test]
    fn snapshot_equal_to_last_entry_keeps_real_entries() {
        let mut h = History::new();
        committed(&mut h, "one");
        committed(&mut h, "two");
        h.begin_read();
        // Draft equals the newest entry: the snapshot is suppressed.
        let shown = h.recall(Recall::Older, &cps("two")).unwrap();
        assert_eq!(shown, cps("one"));
        h.set_recall(false);
        h.commit(&cps("one!"));
        assert_eq!(h.iter_text().collect::<Vec<_>>(), vec!["one", "two", "one!"]);
    }

    #[test]
    fn recall_needs_more_than_provisional() {
        let mut h = History::new();
        h.begin_read();
        assert_eq!(h.recall(Recall::Older, &cps("x")), None);
    }
}
