//! Blocking key sources.
//!
//! The line editor pulls one key at a time through `KeySource`. POSIX
//! terminals deliver bytes (`ByteKeySource`), the Windows console delivers
//! input records (`ConsoleKeySource`), tests use `ScriptedKeys`.

use crate::decoder::{ByteDecoder, decode_all};
use crate::key::Key;
use anyhow::Result;
use std::collections::VecDeque;
use std::io::{ErrorKind, Read};
use tracing::trace;

pub trait KeySource {
    /// Block until one key is available. `Ok(None)` means input is exhausted.
    fn read_key(&mut self) -> Result<Option<Key>>;
}

impl<K: KeySource + ?Sized> KeySource for Box<K> {
    fn read_key(&mut self) -> Result<Option<Key>> {
        (**self).read_key()
    }
}

/// Byte-at-a-time decoder over any reader (stdin in raw mode).
pub struct ByteKeySource<R: Read> {
    reader: R,
    decoder: ByteDecoder,
    exhausted: bool,
}

impl<R: Read> ByteKeySource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: ByteDecoder::new(),
            exhausted: false,
        }
    }
}

impl<R: Read> KeySource for ByteKeySource<R> {
    fn read_key(&mut self) -> Result<Option<Key>> {
        if let Some(k) = self.decoder.next_ready() {
            return Ok(Some(k));
        }
        if self.exhausted {
            return Ok(self.decoder.finish());
        }
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => {
                    self.exhausted = true;
                    trace!(target: "input.keys", "byte_source_eof");
                    return Ok(self.decoder.finish());
                }
                Ok(_) => {
                    if let Some(k) = self.decoder.feed(byte[0]) {
                        return Ok(Some(k));
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Pre-recorded keys; returns `None` once drained.
#[derive(Debug, Default, Clone)]
pub struct ScriptedKeys {
    keys: VecDeque<Key>,
}

impl ScriptedKeys {
    pub fn new(keys: impl IntoIterator<Item = Key>) -> Self {
        Self {
            keys: keys.into_iter().collect(),
        }
    }

    /// Decode raw terminal bytes up front (escape sequences included).
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(decode_all(bytes))
    }

    /// Type `text` as characters, with `\n` as Enter.
    pub fn typed(text: &str) -> Self {
        Self::new(text.chars().map(Key::from_scalar))
    }

    pub fn push(&mut self, key: Key) {
        self.keys.push_back(key);
    }

    pub fn extend_typed(&mut self, text: &str) {
        self.keys.extend(text.chars().map(Key::from_scalar));
    }

    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl KeySource for ScriptedKeys {
    fn read_key(&mut self) -> Result<Option<Key>> {
        Ok(self.keys.pop_front())
    }
}

#[cfg(windows)]
pub use windows_console::ConsoleKeySource;

#[cfg(windows)]
mod windows_console {
    use super::KeySource;
    use crate::console::{ConsoleDecoder, ConsoleKeyRecord};
    use crate::key::Key;
    use anyhow::{Result, bail};
    use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::System::Console::{
        GetStdHandle, INPUT_RECORD, KEY_EVENT, ReadConsoleInputW, STD_INPUT_HANDLE,
    };

    pub struct ConsoleKeySource {
        handle: HANDLE,
        decoder: ConsoleDecoder,
    }

    impl ConsoleKeySource {
        pub fn stdin() -> Result<Self> {
            // SAFETY: GetStdHandle has no preconditions.
            let handle = unsafe { GetStdHandle(STD_INPUT_HANDLE) };
            if handle == INVALID_HANDLE_VALUE || handle == 0 {
                bail!("console input handle unavailable");
            }
            Ok(Self {
                handle,
                decoder: ConsoleDecoder::new(),
            })
        }
    }

    impl KeySource for ConsoleKeySource {
        fn read_key(&mut self) -> Result<Option<Key>> {
            loop {
                // SAFETY: INPUT_RECORD is plain data; zeroed is a valid value.
                let mut rec: INPUT_RECORD = unsafe { std::mem::zeroed() };
                let mut count: u32 = 0;
                // SAFETY: handle is a console input handle and rec/count outlive the call.
                let ok = unsafe { ReadConsoleInputW(self.handle, &mut rec, 1, &mut count) };
                if ok == 0 {
                    return Err(std::io::Error::last_os_error().into());
                }
                if count == 0 || rec.EventType as u32 != KEY_EVENT as u32 {
                    continue;
                }
                // SAFETY: EventType is KEY_EVENT so the KeyEvent variant is active.
                let (key_down, virtual_key, unit) = unsafe {
                    let ev = rec.Event.KeyEvent;
                    (ev.bKeyDown != 0, ev.wVirtualKeyCode, ev.uChar.UnicodeChar)
                };
                let record = ConsoleKeyRecord {
                    key_down,
                    virtual_key,
                    unit,
                };
                if let Some(k) = self.decoder.feed(record) {
                    return Ok(Some(k));
                }
            }
        }
    }
}

/// Key source for the controlling terminal on this platform.
pub fn terminal_source() -> Result<Box<dyn KeySource>> {
    #[cfg(windows)]
    {
        Ok(Box::new(ConsoleKeySource::stdin()?))
    }
    #[cfg(not(windows))]
    {
        Ok(Box::new(ByteKeySource::new(std::io::stdin().lock())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn byte_source_decodes_and_ends() {
        let mut src = ByteKeySource::new(Cursor::new(b"a\x1b[D\r".to_vec()));
        assert_eq!(src.read_key().unwrap(), Some(Key::Char('a')));
        assert_eq!(src.read_key().unwrap(), Some(Key::Left));
        assert_eq!(src.read_key().unwrap(), Some(Key::Enter));
        assert_eq!(src.read_key().unwrap(), None);
        assert_eq!(src.read_key().unwrap(), None);
    }

    #[test]
    fn byte_source_flushes_dangling_escape_at_eof() {
        let mut src = ByteKeySource::new(Cursor::new(b"\x1b".to_vec()));
        assert_eq!(src.read_key().unwrap(), Some(Key::Escape));
        assert_eq!(src.read_key().unwrap(), None);
    }

    #[test]
    fn scripted_typed_maps_newline_to_enter() {
        let mut src = ScriptedKeys::typed("x\n");
        assert_eq!(src.read_key().unwrap(), Some(Key::Char('x')));
        assert_eq!(src.read_key().unwrap(), Some(Key::Enter));
        assert_eq!(src.read_key().unwrap(), None);
    }
}
