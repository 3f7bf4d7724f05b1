//! Terminal capability probing.
//!
//! Runs once at startup. The session uses `interactive` to choose between the
//! raw-mode line editor and plain buffered line reads (piped stdin, CI).

use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct TerminalCapabilities {
    /// Both stdin and stdout are attached to a terminal.
    pub interactive: bool,
}

impl TerminalCapabilities {
    pub fn detect() -> Self {
        Self::from_flags(std::io::stdin().is_terminal(), std::io::stdout().is_terminal())
    }

    pub fn from_flags(stdin_tty: bool, stdout_tty: bool) -> Self {
        Self {
            interactive: stdin_tty && stdout_tty,
        }
    }
}
