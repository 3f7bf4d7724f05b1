//! Raw-mode line editor.
//!
//! `LineEditor` owns the terminal backend and an `EditSession` (key source,
//! output sink, history, renderer, completion state). `read_line` enters raw
//! mode through an RAII guard, seeds a fresh `EditBuffer` with the prompt and
//! calls `edit_feed` until it returns something other than `Feed::Continue`.
//!
//! Keys are logged by class only (`printable`, `enter`, `ctrl`, ...), never
//! by the codepoint typed.

use crate::completion::{Completer, CompletionCycle};
use crate::{CancelReason, EofPolicy, Feed, LineReader, ReadOutcome};
use anyhow::Result;
use core_input::{Key, KeySource};
use core_render::LineRenderer;
use core_state::{History, Recall};
use core_terminal::{TerminalBackend, enter_guard};
use core_text::EditBuffer;
use core_text::width::is_control;
use std::io::Write;
use tracing::{debug, trace};

/// Spaces inserted by Tab when no completer is installed.
const TAB_SPACES: usize = 4;

pub struct EditSession<K: KeySource, W: Write> {
    keys: K,
    out: W,
    history: History,
    renderer: LineRenderer,
    completer: Option<Box<dyn Completer>>,
    cycle: Option<CompletionCycle>,
    eof_policy: EofPolicy,
}

pub struct LineEditor<T: TerminalBackend, K: KeySource, W: Write> {
    terminal: T,
    session: EditSession<K, W>,
}

fn key_class(key: &Key) -> &'static str {
    match key {
        Key::Char(_) => "printable",
        Key::Enter => "enter",
        Key::Tab => "tab",
        Key::Backspace => "backspace",
        Key::Delete => "delete",
        Key::Escape => "escape",
        Key::Up | Key::Down => "recall",
        Key::Left | Key::Right | Key::Home | Key::End => "motion",
        Key::Ctrl(_) => "ctrl",
    }
}

impl<T: TerminalBackend, K: KeySource, W: Write> LineEditor<T, K, W> {
    pub fn new(terminal: T, keys: K, out: W) -> Self {
        Self {
            terminal,
            session: EditSession {
                keys,
                out,
                history: History::new(),
                renderer: LineRenderer::new(),
                completer: None,
                cycle: None,
                eof_policy: EofPolicy::default(),
            },
        }
    }

    pub fn with_completer(mut self, completer: Box<dyn Completer>) -> Self {
        self.session.completer = Some(completer);
        self
    }

    pub fn with_eof_policy(mut self, policy: EofPolicy) -> Self {
        self.session.eof_policy = policy;
        self
    }

    pub fn history(&self) -> &History {
        &self.session.history
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn output(&self) -> &W {
        &self.session.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.session.out
    }

    /// Decode one key and apply it to `buf`. Raw mode is the caller's concern.
    pub fn edit_feed(&mut self, buf: &mut EditBuffer) -> Result<Feed> {
        let Self { terminal, session } = self;
        session.edit_feed(buf, &|| terminal.columns())
    }
}

impl<T: TerminalBackend, K: KeySource, W: Write> LineReader for LineEditor<T, K, W> {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        let Self { terminal, session } = self;
        let guard = enter_guard(terminal)?;
        let columns = || guard.columns();
        let outcome = session.read_line(prompt, &columns)?;
        guard.release()?;
        Ok(outcome)
    }
}

impl<K: KeySource, W: Write> EditSession<K, W> {
    fn read_line(&mut self, prompt: &str, columns: &dyn Fn() -> u16) -> Result<ReadOutcome> {
        let mut buf = EditBuffer::with_prompt(prompt);
        self.cycle = None;
        self.history.begin_read();
        self.renderer.reset();
        self.refresh(&buf, columns)?;
        let outcome = loop {
            match self.edit_feed(&mut buf, columns)? {
                Feed::Continue => continue,
                Feed::Finished(text) => break ReadOutcome::Line(text),
                Feed::Cancelled(CancelReason::Interrupt) => break ReadOutcome::Interrupted,
                Feed::Cancelled(CancelReason::EndOfInput) => break ReadOutcome::EndOfInput,
            }
        };
        self.renderer.finish(&mut self.out)?;
        debug!(target: "editor.feed", outcome = outcome.kind(), history_len = self.history.len(), "read_line_done");
        Ok(outcome)
    }

    fn refresh(&mut self, buf: &EditBuffer, columns: &dyn Fn() -> u16) -> Result<()> {
        self.renderer
            .refresh(&mut self.out, buf.codepoints(), buf.cursor(), columns())?;
        Ok(())
    }

    fn edit_feed(&mut self, buf: &mut EditBuffer, columns: &dyn Fn() -> u16) -> Result<Feed> {
        let Some(key) = self.keys.read_key()? else {
            trace!(target: "editor.feed", "key_source_exhausted");
            self.cycle = None;
            self.history.discard();
            return Ok(Feed::Cancelled(CancelReason::EndOfInput));
        };
        trace!(target: "editor.feed", class = key_class(&key), "key");

        if let Some(cycle) = self.cycle.as_mut() {
            match key {
                Key::Tab => {
                    cycle.advance(buf);
                    self.refresh(buf, columns)?;
                    return Ok(Feed::Continue);
                }
                Key::Escape => {
                    cycle.restore(buf);
                    self.cycle = None;
                    self.refresh(buf, columns)?;
                    return Ok(Feed::Continue);
                }
                _ => self.cycle = None,
            }
        }

        let mut recall = false;
        let mut changed = false;
        let feed = match key {
            Key::Char(c) => {
                if !is_control(c) {
                    changed = buf.insert(c);
                }
                Feed::Continue
            }
            Key::Enter => {
                self.history.commit(buf.editable());
                buf.move_end();
                self.refresh(buf, columns)?;
                return Ok(Feed::Finished(buf.text()));
            }
            Key::Ctrl('c') => {
                self.history.discard();
                return Ok(Feed::Cancelled(CancelReason::Interrupt));
            }
            Key::Backspace | Key::Ctrl('h') => {
                changed = buf.backspace();
                Feed::Continue
            }
            Key::Ctrl('d') if buf.has_editable() => {
                changed = buf.delete();
                Feed::Continue
            }
            Key::Ctrl('d') => {
                self.history.commit(buf.editable());
                return Ok(match self.eof_policy {
                    EofPolicy::End => Feed::Cancelled(CancelReason::EndOfInput),
                    EofPolicy::Commit => Feed::Finished(String::new()),
                });
            }
            Key::Delete => {
                changed = buf.delete();
                Feed::Continue
            }
            Key::Left | Key::Ctrl('b') => {
                changed = buf.move_left();
                Feed::Continue
            }
            Key::Right | Key::Ctrl('f') => {
                changed = buf.move_right();
                Feed::Continue
            }
            Key::Home | Key::Ctrl('a') => {
                changed = buf.move_home();
                Feed::Continue
            }
            Key::End | Key::Ctrl('e') => {
                changed = buf.move_end();
                Feed::Continue
            }
            Key::Ctrl('w') => {
                changed = buf.delete_prev_word();
                Feed::Continue
            }
            Key::Ctrl('u') => {
                changed = buf.delete_line();
                Feed::Continue
            }
            Key::Ctrl('k') => {
                changed = buf.delete_to_end();
                Feed::Continue
            }
            Key::Ctrl('t') => {
                changed = buf.transpose();
                Feed::Continue
            }
            Key::Ctrl('l') => {
                self.renderer.clear_screen(&mut self.out)?;
                changed = true;
                Feed::Continue
            }
            Key::Up | Key::Ctrl('p') => {
                recall = true;
                changed = self.recall(buf, Recall::Older);
                Feed::Continue
            }
            Key::Down | Key::Ctrl('n') => {
                recall = true;
                changed = self.recall(buf, Recall::Newer);
                Feed::Continue
            }
            Key::Tab => {
                changed = self.start_completion(buf);
                Feed::Continue
            }
            Key::Escape | Key::Ctrl(_) => Feed::Continue,
        };
        self.history.set_recall(recall);
        if changed {
            self.refresh(buf, columns)?;
        }
        Ok(feed)
    }

    fn recall(&mut self, buf: &mut EditBuffer, dir: Recall) -> bool {
        match self.history.recall(dir, buf.editable()) {
            Some(entry) => {
                buf.replace_editable(&entry);
                true
            }
            None => false,
        }
    }

    fn start_completion(&mut self, buf: &mut EditBuffer) -> bool {
        let Some(completer) = self.completer.as_ref() else {
            let spaces = [' '; TAB_SPACES];
            return buf.insert_slice(&spaces);
        };
        let completions = completer.complete(&buf.text(), buf.editable_cursor());
        trace!(target: "editor.feed", candidates = completions.candidates.len(), "completion_start");
        if completions.is_empty() {
            return false;
        }
        let mut cycle = CompletionCycle::start(buf, completions);
        cycle.advance(buf);
        self.cycle = Some(cycle);
        true
    }
}
