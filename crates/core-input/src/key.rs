//! Logical key model shared by every decoder.

/// One decoded keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// Printable (or unclassified) Unicode scalar value.
    Char(char),
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    /// Control chord, stored as the lowercase letter (`Ctrl('a')` is 0x01).
    Ctrl(char),
}

pub(crate) const ESC: char = '\u{1b}';

impl Key {
    /// Classify one decoded scalar that is not part of an escape sequence.
    pub fn from_scalar(c: char) -> Key {
        match c as u32 {
            0x0D | 0x0A => Key::Enter,
            0x09 => Key::Tab,
            0x7F => Key::Backspace,
            0x1B => Key::Escape,
            n @ 0x01..=0x1A => Key::Ctrl(char::from(b'a' + (n as u8 - 1))),
            _ => Key::Char(c),
        }
    }

    pub fn is_ctrl(&self, letter: char) -> bool {
        matches!(self, Key::Ctrl(c) if *c == letter)
    }
}
