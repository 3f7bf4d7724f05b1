//! Byte-stream key decoder for POSIX raw terminal input.
//!
//! Two layers, fed one byte at a time:
//! 1. UTF-8 assembly turns bytes into scalar values (malformed input becomes U+FFFD).
//! 2. An escape-sequence state machine turns scalars into keys.
//!
//! Escape FSM transitions:
//! - `Ground --ESC--> SawEscape`, any other scalar is emitted as a key.
//! - `SawEscape --'['--> SawCsi`, `--'O'--> SawSs3`.
//! - `SawCsi` maps `A B C D H F` to navigation keys, a digit moves to `SawCsiDigit`.
//! - `SawCsiDigit(d) --'~'-->` Home (1, 7), Delete (3), End (4, 8).
//! - `SawSs3` maps `H F` to Home and End.
//!
//! Any unrecognised follow-up resolves to `Key::Escape` and the consumed
//! scalars are dropped.

use crate::key::{ESC, Key};
use core_text::utf8;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EscState {
    #[default]
    Ground,
    SawEscape,
    SawCsi,
    SawCsiDigit(u8),
    SawSs3,
}

/// Outcome of one escape transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Pending,
    Key(Key),
}

impl EscState {
    /// Single transition function of the escape FSM.
    pub fn step(self, c: char) -> (EscState, Step) {
        use EscState::*;
        match self {
            Ground if c == ESC => (SawEscape, Step::Pending),
            Ground => (Ground, Step::Key(Key::from_scalar(c))),
            SawEscape => match c {
                '[' => (SawCsi, Step::Pending),
                'O' => (SawSs3, Step::Pending),
                _ => (Ground, Step::Key(Key::Escape)),
            },
            SawCsi => match c {
                'A' => (Ground, Step::Key(Key::Up)),
                'B' => (Ground, Step::Key(Key::Down)),
                'C' => (Ground, Step::Key(Key::Right)),
                'D' => (Ground, Step::Key(Key::Left)),
                'H' => (Ground, Step::Key(Key::Home)),
                'F' => (Ground, Step::Key(Key::End)),
                '0'..='9' => (SawCsiDigit(c as u8 - b'0'), Step::Pending),
                _ => (Ground, Step::Key(Key::Escape)),
            },
            SawCsiDigit(d) => {
                let key = match (d, c) {
                    (1 | 7, '~') => Key::Home,
                    (3, '~') => Key::Delete,
                    (4 | 8, '~') => Key::End,
                    _ => Key::Escape,
                };
                (Ground, Step::Key(key))
            }
            SawSs3 => match c {
                'H' => (Ground, Step::Key(Key::Home)),
                'F' => (Ground, Step::Key(Key::End)),
                _ => (Ground, Step::Key(Key::Escape)),
            },
        }
    }
}

#[derive(Debug, Default)]
struct Utf8Accum {
    buf: [u8; 4],
    len: usize,
    need: usize,
}

impl Utf8Accum {
    /// Push a byte, appending every completed scalar to `out`.
    fn push(&mut self, b: u8, out: &mut Vec<char>) {
        if self.need > 0 {
            if b & 0xC0 == 0x80 {
                self.buf[self.len] = b;
                self.len += 1;
                if self.len == self.need {
                    out.push(utf8::decode_scalar(&self.buf[..self.len]));
                    self.reset();
                }
                return;
            }
            // Truncated sequence: report it and restart on this byte.
            out.push(utf8::REPLACEMENT);
            self.reset();
        }
        match utf8::sequence_len(b) {
            Some(1) => out.push(char::from(b)),
            Some(n) => {
                self.buf[0] = b;
                self.len = 1;
                self.need = n;
            }
            None => out.push(utf8::REPLACEMENT),
        }
    }

    fn reset(&mut self) {
        self.len = 0;
        self.need = 0;
    }

    fn is_idle(&self) -> bool {
        self.need == 0
    }
}

/// Incremental byte decoder; feed it bytes and drain decoded keys.
#[derive(Debug, Default)]
pub struct ByteDecoder {
    utf8: Utf8Accum,
    esc: EscState,
    scratch: Vec<char>,
    ready: VecDeque<Key>,
}

impl ByteDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one byte. Returns the oldest decoded key, if any is ready.
    pub fn feed(&mut self, b: u8) -> Option<Key> {
        self.utf8.push(b, &mut self.scratch);
        for c in self.scratch.drain(..) {
            let (next, step) = self.esc.step(c);
            self.esc = next;
            if let Step::Key(k) = step {
                self.ready.push_back(k);
            }
        }
        self.ready.pop_front()
    }

    /// Pop a key decoded by an earlier `feed` without consuming input.
    pub fn next_ready(&mut self) -> Option<Key> {
        self.ready.pop_front()
    }

    /// True when no partial UTF-8 or escape sequence is buffered.
    pub fn is_idle(&self) -> bool {
        self.utf8.is_idle() && self.esc == EscState::Ground
    }

    /// Resolve buffered state at end of input: a dangling escape becomes
    /// `Escape`, a truncated UTF-8 sequence becomes U+FFFD.
    pub fn finish(&mut self) -> Option<Key> {
        if let Some(k) = self.ready.pop_front() {
            return Some(k);
        }
        let partial = !self.utf8.is_idle();
        self.utf8.reset();
        let esc = std::mem::take(&mut self.esc);
        if esc != EscState::Ground {
            return Some(Key::Escape);
        }
        partial.then_some(Key::Char(utf8::REPLACEMENT))
    }
}

/// Decode a whole byte string, for tests and scripted input.
pub fn decode_all(bytes: &[u8]) -> Vec<Key> {
    let mut dec = ByteDecoder::new();
    let mut out = Vec::new();
    for &b in bytes {
        out.extend(dec.feed(b));
        while let Some(k) = dec.next_ready() {
            out.push(k);
        }
    }
    while let Some(k) = dec.finish() {
        out.push(k);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csi_arrows() {
        assert_eq!(
            decode_all(b"\x1b[A\x1b[B\x1b[C\x1b[D"),
            vec![Key::Up, Key::Down, Key::Right, Key::Left]
        );
    }

    #[test]
    fn csi_home_end_letter_and_tilde_forms() {
        assert_eq!(decode_all(b"\x1b[H\x1b[F"), vec![Key::Home, Key::End]);
        assert_eq!(
            decode_all(b"\x1b[1~\x1b[7~\x1b[3~\x1b[4~\x1b[8~"),
            vec![Key::Home, Key::Home, Key::Delete, Key::End, Key::End]
        );
    }

    #[test]
    fn ss3_home_end() {
        assert_eq!(decode_all(b"\x1bOH\x1bOF"), vec![Key::Home, Key::End]);
    }

    #[test]
    fn unknown_follow_up_degrades_to_escape() {
        assert_eq!(decode_all(b"\x1bx"), vec![Key::Escape]);
        assert_eq!(decode_all(b"\x1b[Z"), vec![Key::Escape]);
        assert_eq!(decode_all(b"\x1b[5~"), vec![Key::Escape]);
        assert_eq!(decode_all(b"\x1b[2x"), vec![Key::Escape]);
        assert_eq!(decode_all(b"\x1bOQ"), vec![Key::Escape]);
    }

    #[test]
    fn dangling_escape_resolves_on_finish() {
        assert_eq!(decode_all(b"\x1b"), vec![Key::Escape]);
        assert_eq!(decode_all(b"\x1b["), vec![Key::Escape]);
    }

    #[test]
    fn utf8_multibyte() {
        assert_eq!(
            decode_all("a界😀".as_bytes()),
            vec![Key::Char('a'), Key::Char('界'), Key::Char('😀')]
        );
    }

    #[test]
    fn malformed_utf8_becomes_replacement() {
        assert_eq!(
            decode_all(&[0xE7, 0x41]),
            vec![Key::Char(utf8::REPLACEMENT), Key::Char('A')]
        );
        assert_eq!(decode_all(&[0xFF]), vec![Key::Char(utf8::REPLACEMENT)]);
        assert_eq!(decode_all(&[0xE7, 0x95]), vec![Key::Char(utf8::REPLACEMENT)]);
    }

    #[test]
    fn controls_and_text_mix() {
        assert_eq!(
            decode_all(b"ab\x01\r"),
            vec![Key::Char('a'), Key::Char('b'), Key::Ctrl('a'), Key::Enter]
        );
    }
}
