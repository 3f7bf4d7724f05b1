//! Console-event key decoder (Windows input records).
//!
//! Records carry a key-down flag, a virtual key code and one UTF-16 unit.
//! Only key-down records are used, except that characters entered through
//! Alt+numpad arrive as a key-up of VK_MENU and are accepted too. High
//! surrogates are held until the matching low surrogate arrives.

use crate::key::Key;
use core_text::utf8;

pub const VK_MENU: u16 = 0x12;
pub const VK_END: u16 = 0x23;
pub const VK_HOME: u16 = 0x24;
pub const VK_LEFT: u16 = 0x25;
pub const VK_UP: u16 = 0x26;
pub const VK_RIGHT: u16 = 0x27;
pub const VK_DOWN: u16 = 0x28;
pub const VK_DELETE: u16 = 0x2E;

/// Platform-neutral view of one console key record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleKeyRecord {
    pub key_down: bool,
    pub virtual_key: u16,
    pub unit: u16,
}

impl ConsoleKeyRecord {
    pub fn down(virtual_key: u16, unit: u16) -> Self {
        Self {
            key_down: true,
            virtual_key,
            unit,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConsoleDecoder {
    high_surrogate: Option<u16>,
}

impl ConsoleDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one record; `None` means the record produced no key yet.
    pub fn feed(&mut self, rec: ConsoleKeyRecord) -> Option<Key> {
        if !rec.key_down && rec.virtual_key != VK_MENU {
            return None;
        }
        match rec.unit {
            0 => {
                let key = match rec.virtual_key {
                    VK_UP => Key::Up,
                    VK_DOWN => Key::Down,
                    VK_RIGHT => Key::Right,
                    VK_LEFT => Key::Left,
                    VK_DELETE => Key::Delete,
                    VK_HOME => Key::Home,
                    VK_END => Key::End,
                    _ => return None,
                };
                Some(key)
            }
            0xD800..=0xDBFF => {
                self.high_surrogate = Some(rec.unit - 0xD800);
                None
            }
            0xDC00..=0xDFFF => {
                let c = match self.high_surrogate.take() {
                    Some(high) => {
                        let cp = 0x10000 + ((u32::from(high) << 10) | u32::from(rec.unit - 0xDC00));
                        char::from_u32(cp).unwrap_or(utf8::REPLACEMENT)
                    }
                    None => utf8::REPLACEMENT,
                };
                Some(Key::Char(c))
            }
            unit => {
                // A lone high surrogate followed by a BMP unit is dropped.
                self.high_surrogate = None;
                let c = char::from_u32(u32::from(unit)).unwrap_or(utf8::REPLACEMENT);
                Some(Key::from_scalar(c))
            }
        }
    }
}
