//! Raw-mode terminal session and crossterm implementation.
//!
//! The line editor enters raw mode at the start of each read and leaves it
//! when the read ends (Enter, Ctrl-C, Ctrl-D or an I/O error). Unlike a
//! full-screen editor there is no alternate screen: output stays inline with
//! the shell scrollback.

use anyhow::Result;
use crossterm::terminal::{self, disable_raw_mode, enable_raw_mode};
use tracing::debug;

pub mod capabilities;
pub use capabilities::TerminalCapabilities;

/// Fallback when the terminal cannot report its size (pipes, dumb terminals).
pub const DEFAULT_COLUMNS: u16 = 80;

pub trait TerminalBackend {
    fn enter(&mut self) -> Result<()>;
    fn leave(&mut self) -> Result<()>;
    /// Current width in columns, re-queried on every redraw.
    fn columns(&self) -> u16;
}

pub struct CrosstermBackend {
    entered: bool,
}

/// RAII guard restoring the prior terminal mode even on early return or panic.
pub struct TerminalGuard<'a, B: TerminalBackend + ?Sized> {
    backend: &'a mut B,
    active: bool,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self { entered: false }
    }
}

/// Enter raw mode on any backend and return a guard that leaves on drop.
pub fn enter_guard<B: TerminalBackend + ?Sized>(backend: &mut B) -> Result<TerminalGuard<'_, B>> {
    backend.enter()?;
    Ok(TerminalGuard {
        backend,
        active: true,
    })
}

impl<B: TerminalBackend + ?Sized> TerminalGuard<'_, B> {
    pub fn columns(&self) -> u16 {
        self.backend.columns()
    }

    /// Leave now and surface the error instead of swallowing it in `Drop`.
    pub fn release(mut self) -> Result<()> {
        self.active = false;
        self.backend.leave()
    }
}

impl TerminalBackend for CrosstermBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            enable_raw_mode()?;
            self.entered = true;
            debug!(target: "terminal", "raw_mode_enter");
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        if self.entered {
            disable_raw_mode()?;
            self.entered = false;
            debug!(target: "terminal", "raw_mode_leave");
        }
        Ok(())
    }

    fn columns(&self) -> u16 {
        match terminal::size() {
            Ok((cols, _)) if cols > 0 => cols,
            _ => DEFAULT_COLUMNS,
        }
    }
}

impl Drop for CrosstermBackend {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}

impl<B: TerminalBackend + ?Sized> Drop for TerminalGuard<'_, B> {
    fn drop(&mut self) {
        if self.active {
            let _ = self.backend.leave();
        }
    }
}

/// Backend for tests and non-interactive input: tracks mode changes, fixed width.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    pub columns: u16,
    pub entered: bool,
    pub enter_count: usize,
}

impl HeadlessBackend {
    pub fn new(columns: u16) -> Self {
        Self {
            columns,
            entered: false,
            enter_count: 0,
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(DEFAULT_COLUMNS)
    }
}

impl TerminalBackend for HeadlessBackend {
    fn enter(&mut self) -> Result<()> {
        if !self.entered {
            self.entered = true;
            self.enter_count += 1;
        }
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.entered = false;
        Ok(())
    }

    fn columns(&self) -> u16 {
        self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_leaves_on_drop() {
        let mut backend = HeadlessBackend::new(40);
        {
            let guard = enter_guard(&mut backend).unwrap();
            assert_eq!(guard.columns(), 40);
        }
        assert!(!backend.entered);
        assert_eq!(backend.enter_count, 1);
    }

    #[test]
    fn release_leaves_once() {
        let mut backend = HeadlessBackend::default();
        let guard = enter_guard(&mut backend).unwrap();
        guard.release().unwrap();
        assert!(!backend.entered);
    }
}
