//! Accumulated program state for one REPL session.
//!
//! `preamble` holds confirmed top-level fragments (preprocessor units and
//! `;f` statements), `body` holds confirmed statements of the entry
//! function. Both only grow through `commit_*`, which the session calls after
//! the backend reported success for the unit. `line` is the logical line
//! counter stamped into `#line` markers.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// How a synthesized unit is turned into running code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    /// Embedded in-memory compiler.
    Memory,
    /// Compile to a shared library and call its entry point in-process.
    #[default]
    Library,
    /// Compile a standalone executable with the system toolchain and spawn it.
    Toolchain,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Memory => "mem",
            RunMode::Library => "dll",
            RunMode::Toolchain => "cc",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown run mode `{0}` (expected memory, library or toolchain)")]
pub struct ParseRunModeError(pub String);

impl FromStr for RunMode {
    type Err = ParseRunModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" | "m" => Ok(RunMode::Memory),
            "library" | "dll" | "so" | "d" => Ok(RunMode::Library),
            "toolchain" | "cc" | "c" => Ok(RunMode::Toolchain),
            other => Err(ParseRunModeError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramState {
    pub preamble: String,
    pub body: String,
    pub line: usize,
    pub options: Vec<String>,
    pub args: Vec<String>,
    pub run_mode: RunMode,
    pub werror: bool,
    /// Explicit compiler override; `None` means detect from `CC` or defaults.
    pub compiler: Option<String>,
}

impl ProgramState {
    pub fn new() -> Self {
        Self {
            werror: true,
            ..Self::default()
        }
    }

    /// Append a confirmed statement fragment and advance the line counter.
    pub fn commit_statement(&mut self, fragment: &str, next_line: usize) {
        self.body.push_str(fragment);
        self.advance(next_line);
    }

    /// Append a confirmed top-level fragment and advance the line counter.
    pub fn commit_preamble(&mut self, fragment: &str, next_line: usize) {
        self.preamble.push_str(fragment);
        self.advance(next_line);
    }

    fn advance(&mut self, next_line: usize) {
        debug_assert!(next_line >= self.line);
        self.line = next_line.max(self.line);
        debug!(target: "repl.state", line = self.line, preamble_len = self.preamble.len(), body_len = self.body.len(), "state_commit");
    }

    /// Drop accumulated source and reset the line counter. Options,
    /// arguments and run mode survive.
    pub fn clear(&mut self) {
        self.preamble.clear();
        self.body.clear();
        self.line = 0;
        debug!(target: "repl.state", "state_clear");
    }

    /// Listing shown by `;l`.
    pub fn listing(&self) -> String {
        format!("/* top */\n{}/* main */\n{}", self.preamble, self.body)
    }
}
