//! REPL input driver: reads physical lines until a logical unit is complete.
//!
//! Sigils are decided on the first byte of the accumulated unit:
//! `;` command, `>` shell, and `#` (after leading whitespace) preprocessor.
//! Commands and shell lines end the read after one line. Preprocessor units
//! end when conditional nesting balances; everything else ends when the
//! completeness scanner stops reporting Incomplete.
//!
//! A line ending in `\` continues the unit without advancing the logical line
//! counter. For shell units the backslash and newline are removed and the
//! continuation prompt becomes `> `.

use crate::scanner::{Completeness, last_significant_char, scan, scan_preprocessor};
use anyhow::Result;
use core_editor::{LineReader, ReadOutcome};
use tracing::debug;

pub const COMMAND_SIGIL: char = ';';
pub const SHELL_SIGIL: char = '>';
pub const PREPROCESSOR_SIGIL: char = '#';

const SHELL_CONTINUATION_PROMPT: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Empty,
    Expression,
    Statement,
    Command,
    Preprocessor,
    Shell,
    EndOfInput,
}

impl UnitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitKind::Empty => "empty",
            UnitKind::Expression => "expression",
            UnitKind::Statement => "statement",
            UnitKind::Command => "command",
            UnitKind::Preprocessor => "preprocessor",
            UnitKind::Shell => "shell",
            UnitKind::EndOfInput => "end_of_input",
        }
    }
}

/// Prompt shape flags for one read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadRequest {
    /// Reading a top-level statement (after `;f`): prompt ends in `]`.
    pub top: bool,
    /// Reading the statement to time (after `;t`): prompt starts with `t:`.
    pub timed: bool,
}

impl ReadRequest {
    pub fn top() -> Self {
        Self {
            top: true,
            timed: false,
        }
    }

    pub fn timed() -> Self {
        Self {
            top: false,
            timed: true,
        }
    }
}

/// One classified unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub kind: UnitKind,
    /// Accumulated text; every physical line ends in `\n`.
    pub text: String,
    /// Logical line counter after this unit. Callers only adopt it once the
    /// unit has run successfully.
    pub line: usize,
    pub completeness: Completeness,
}

impl Unit {
    fn new(kind: UnitKind, text: String, line: usize) -> Self {
        Self {
            kind,
            text,
            line,
            completeness: Completeness::Complete,
        }
    }

    pub fn is_invalid(&self) -> bool {
        self.completeness == Completeness::Invalid
    }
}

/// Prompt for the next physical line: `t:` when timed, the next logical line
/// number right-aligned to two columns, then `]` at top level or `)`.
pub fn prompt(line: usize, request: ReadRequest) -> String {
    format!(
        "{}{:2}{} ",
        if request.timed { "t:" } else { "" },
        line + 1,
        if request.top { ']' } else { ')' }
    )
}

fn ends_with_continuation(text: &str) -> bool {
    let b = text.as_bytes();
    b.len() >= 2 && b[b.len() - 2] == b'\\'
}

/// Read one unit through `reader`, starting at logical line `line`.
///
/// Ctrl-C yields an `Empty` unit at the starting line. End of input yields
/// `EndOfInput`. Terminal errors propagate.
pub fn read_unit<R: LineReader + ?Sized>(
    reader: &mut R,
    line: usize,
    request: ReadRequest,
) -> Result<Unit> {
    let start = line;
    let mut line = line;
    let mut text = String::new();
    let mut shell_continuation = false;
    let mut completeness = Completeness::Complete;

    let sigil_kind = loop {
        let shown = if shell_continuation {
            SHELL_CONTINUATION_PROMPT.to_string()
        } else {
            prompt(line, request)
        };
        match reader.read_line(&shown)? {
            ReadOutcome::Line(physical) => {
                text.push_str(&physical);
                text.push('\n');
            }
            ReadOutcome::Interrupted => {
                debug!(target: "repl.driver", line = start, "read_interrupted");
                return Ok(Unit::new(UnitKind::Empty, String::new(), start));
            }
            ReadOutcome::EndOfInput => {
                debug!(target: "repl.driver", line, "read_end_of_input");
                return Ok(Unit::new(UnitKind::EndOfInput, text, line));
            }
        }

        if ends_with_continuation(&text) {
            if text.starts_with(SHELL_SIGIL) {
                text.truncate(text.len() - 2);
                shell_continuation = true;
            }
            continue;
        }
        line += 1;

        if text.starts_with(COMMAND_SIGIL) {
            break Some(UnitKind::Command);
        }
        if text.starts_with(SHELL_SIGIL) {
            break Some(UnitKind::Shell);
        }
        if text.trim_start().starts_with(PREPROCESSOR_SIGIL) {
            completeness = scan_preprocessor(&text);
            if completeness != Completeness::Incomplete {
                break Some(UnitKind::Preprocessor);
            }
        } else {
            completeness = scan(&text);
            if completeness != Completeness::Incomplete {
                break None;
            }
        }
    };

    let kind = match sigil_kind {
        Some(kind) => kind,
        None if text.trim().is_empty() => UnitKind::Empty,
        None => match last_significant_char(&text) {
            Some(';' | '}') => UnitKind::Statement,
            _ => UnitKind::Expression,
        },
    };
    debug!(
        target: "repl.driver",
        kind = kind.as_str(),
        lines = line - start,
        len = text.len(),
        invalid = completeness == Completeness::Invalid,
        "unit_read"
    );
    Ok(Unit {
        kind,
        text,
        line,
        completeness,
    })
}
