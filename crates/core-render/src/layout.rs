//! Wrap-aware row layout for one edit buffer.
//!
//! Widths come from `core_text::char_width`. A codepoint whose width would
//! push the running column past the terminal width starts a new virtual row,
//! unless it is already at column 0 (a glyph wider than the terminal is
//! placed anyway). Zero-width codepoints after an exactly full row also
//! begin the next row. Controls (width -1) are never drawn and take no columns.
//!
//! The cursor is tracked at the position of the codepoint it sits on, after
//! that codepoint's wrap decision. A cursor past the last codepoint on an
//! exactly full row moves to column 0 of an extra trailing row.

use core_text::char_width;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowLayout {
    /// Virtual rows occupied (at least 1).
    pub rows: usize,
    pub cursor_row: usize,
    pub cursor_col: usize,
    /// Codepoint indices that begin a new row.
    pub breaks: Vec<usize>,
    /// Whether the cursor sits on a trailing empty row after a full row.
    pub trailing_row: bool,
}

pub fn layout(cps: &[char], cursor: usize, columns: usize) -> RowLayout {
    let columns = columns.max(1);
    let mut out = RowLayout {
        rows: 1,
        ..RowLayout::default()
    };
    let mut row = 0usize;
    let mut col = 0usize;
    for (i, &c) in cps.iter().enumerate() {
        let w = char_width(c);
        let w = if w < 0 { 0 } else { w as usize };
        if col > 0 && col + w.max(1) > columns {
            row += 1;
            col = 0;
            out.breaks.push(i);
        }
        if i == cursor {
            out.cursor_row = row;
            out.cursor_col = col;
        }
        col += w;
    }
    out.rows = row + 1;
    if cursor >= cps.len() {
        if col >= columns {
            out.cursor_row = row + 1;
            out.cursor_col = 0;
            out.rows = row + 2;
            out.trailing_row = true;
        } else {
            out.cursor_row = row;
            out.cursor_col = col;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cps(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn single_row() {
        let l = layout(&cps("> abc"), 5, 80);
        assert_eq!(l.rows, 1);
        assert_eq!((l.cursor_row, l.cursor_col), (0, 5));
        assert!(l.breaks.is_empty());
    }

    #[test]
    fn wraps_at_width() {
        let l = layout(&cps("abcdefg"), 2, 3);
        assert_eq!(l.breaks, vec![3, 6]);
        assert_eq!(l.rows, 3);
        assert_eq!((l.cursor_row, l.cursor_col), (0, 2));
        let l = layout(&cps("abcdefg"), 4, 3);
        assert_eq!((l.cursor_row, l.cursor_col), (1, 1));
    }

    #[test]
    fn exactly_full_row_puts_cursor_on_next_row() {
        let l = layout(&cps("abc"), 3, 3);
        assert!(l.trailing_row);
        assert_eq!(l.rows, 2);
        assert_eq!((l.cursor_row, l.cursor_col), (1, 0));
    }

    #[test]
    fn wide_glyph_does_not_split() {
        // 'a' + '界' needs 3 columns; on a width-2 terminal the glyph wraps.
        let l = layout(&cps("a界b"), 1, 2);
        assert_eq!(l.breaks, vec![1, 2]);
        assert_eq!((l.cursor_row, l.cursor_col), (1, 0));
    }

    #[test]
    fn combining_mark_takes_no_column() {
        let l = layout(&cps("e\u{0301}x"), 3, 80);
        assert_eq!((l.cursor_row, l.cursor_col), (0, 2));
    }

    #[test]
    fn controls_are_skipped() {
        let l = layout(&cps("a\u{07}b"), 3, 80);
        assert_eq!(l.cursor_col, 2);
    }
}
