//! Redraw emission for the line editor.
//!
//! Every refresh repaints the whole buffer: move up to the first row of the
//! previous paint, clear to the end of the screen, print the codepoints with
//! explicit `\r\n` at wrap points, then walk the real cursor back to the
//! tracked row and column. Commands are queued and flushed once per refresh.

use crate::layout::{RowLayout, layout};
use anyhow::Result;
use core_text::char_width;
use crossterm::{
    cursor::{MoveDown, MoveTo, MoveToColumn, MoveUp},
    queue,
    style::Print,
    terminal::{Clear, ClearType},
};
use std::io::Write;
use tracing::trace;

#[derive(Debug, Default)]
pub struct LineRenderer {
    /// Cursor row of the previous paint, relative to its first row.
    prev_cursor_row: usize,
    /// Rows occupied by the previous paint.
    prev_rows: usize,
    refreshes: u64,
}

impl LineRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Repaint `cps` with the cursor at codepoint index `cursor`.
    pub fn refresh<W: Write>(
        &mut self,
        out: &mut W,
        cps: &[char],
        cursor: usize,
        columns: u16,
    ) -> Result<RowLayout> {
        let lay = layout(cps, cursor, usize::from(columns));
        if self.prev_cursor_row > 0 {
            queue!(out, MoveUp(to_u16(self.prev_cursor_row)))?;
        }
        queue!(out, Print("\r"), Clear(ClearType::FromCursorDown))?;

        let mut text = String::with_capacity(cps.len() + 2 * lay.breaks.len());
        let mut breaks = lay.breaks.iter().peekable();
        for (i, &c) in cps.iter().enumerate() {
            if breaks.peek() == Some(&&i) {
                breaks.next();
                text.push_str("\r\n");
            }
            if char_width(c) >= 0 && c != '\0' {
                text.push(c);
            }
        }
        if lay.trailing_row {
            text.push_str("\r\n");
        }
        queue!(out, Print(text))?;

        let last_row = lay.rows - 1;
        if last_row > lay.cursor_row {
            queue!(out, MoveUp(to_u16(last_row - lay.cursor_row)))?;
        }
        queue!(out, MoveToColumn(to_u16(lay.cursor_col)))?;
        out.flush()?;

        self.prev_cursor_row = lay.cursor_row;
        self.prev_rows = lay.rows;
        self.refreshes += 1;
        trace!(target: "render", rows = lay.rows, cursor_row = lay.cursor_row, cursor_col = lay.cursor_col, "refresh");
        Ok(lay)
    }

    /// Leave the edited line: move below its last row and start a fresh line.
    pub fn finish<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let below = self.prev_rows.saturating_sub(1 + self.prev_cursor_row);
        if below > 0 {
            queue!(out, MoveDown(to_u16(below)))?;
        }
        queue!(out, Print("\r\n"))?;
        out.flush()?;
        self.reset();
        Ok(())
    }

    /// Clear the whole screen and home the cursor; the next refresh starts at row 0.
    pub fn clear_screen<W: Write>(&mut self, out: &mut W) -> Result<()> {
        queue!(out, MoveTo(0, 0), Clear(ClearType::All))?;
        self.reset();
        Ok(())
    }

    pub fn reset(&mut self) {
        self.prev_cursor_row = 0;
        self.prev_rows = 0;
    }
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
