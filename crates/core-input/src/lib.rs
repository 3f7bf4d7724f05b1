//! Key decoding for the line editor.
//!
//! Raw terminal bytes or console records in, logical `Key`s out. Everything
//! here is synchronous and blocking; the editor reads exactly one key per
//! edit step.

pub mod console;
pub mod decoder;
pub mod key;
pub mod source;

pub use decoder::{ByteDecoder, EscState, decode_all};
pub use key::Key;
pub use source::{ByteKeySource, KeySource, ScriptedKeys, terminal_source};
