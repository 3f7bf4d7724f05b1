//! Cooked-mode fallback for piped or redirected stdin.

use crate::{LineReader, ReadOutcome};
use anyhow::Result;
use std::io::{BufRead, Write};
use tracing::trace;

pub struct PlainLineReader<R: BufRead, W: Write> {
    input: R,
    out: W,
    echo_prompt: bool,
}

impl<R: BufRead, W: Write> PlainLineReader<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self {
            input,
            out,
            echo_prompt: true,
        }
    }

    /// Suppress prompts (scripted runs that only want program output).
    pub fn quiet(mut self) -> Self {
        self.echo_prompt = false;
        self
    }

    pub fn output(&self) -> &W {
        &self.out
    }
}

impl<R: BufRead, W: Write> LineReader for PlainLineReader<R, W> {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        if self.echo_prompt {
            self.out.write_all(prompt.as_bytes())?;
            self.out.flush()?;
        }
        let mut raw = Vec::new();
        if self.input.read_until(b'\n', &mut raw)? == 0 {
            trace!(target: "editor.feed", "plain_eof");
            return Ok(ReadOutcome::EndOfInput);
        }
        if raw.last() == Some(&b'\n') {
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
        }
        trace!(target: "editor.feed", len = raw.len(), "plain_line");
        Ok(ReadOutcome::Line(String::from_utf8_lossy(&raw).into_owned()))
    }
}
