//! Interactive line input.
//!
//! `LineEditor` is the raw-mode editor with history recall, completion and
//! soft-wrap redraw. `PlainLineReader` reads cooked lines from any `BufRead`
//! and is used when stdin is not a terminal. Both implement `LineReader`,
//! which is all the REPL driver depends on.

pub mod completion;
pub mod editor;
pub mod plain;

pub use completion::{Candidate, Completer, Completions};
pub use editor::LineEditor;
pub use plain::PlainLineReader;

use anyhow::Result;

/// Why a read ended without a submitted line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Ctrl-C.
    Interrupt,
    /// Ctrl-D on an empty line, or the key source ran dry.
    EndOfInput,
}

/// Result of a single edit step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    Continue,
    Finished(String),
    Cancelled(CancelReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    Line(String),
    Interrupted,
    EndOfInput,
}

impl ReadOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            ReadOutcome::Line(_) => "line",
            ReadOutcome::Interrupted => "interrupted",
            ReadOutcome::EndOfInput => "end_of_input",
        }
    }
}

/// What Ctrl-D on an empty line means.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EofPolicy {
    /// End the session.
    #[default]
    End,
    /// Submit the empty line and keep going.
    Commit,
}

pub trait LineReader {
    /// Show `prompt` and read one line (without its terminator).
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;
}

impl<R: LineReader + ?Sized> LineReader for Box<R> {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        (**self).read_line(prompt)
    }
}
