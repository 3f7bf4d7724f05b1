//! Codepoint-level text primitives for the line editor.
//!
//! - `buffer`: the editable codepoint buffer with a fixed prompt prefix.
//! - `width`: per-codepoint terminal column widths.
//! - `utf8`: incremental decoding helpers for raw terminal bytes.

pub mod buffer;
pub mod utf8;
pub mod width;

pub use buffer::EditBuffer;
pub use width::char_width;
