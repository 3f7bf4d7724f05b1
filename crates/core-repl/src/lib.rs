//! The C side of the REPL: deciding when input is complete, classifying it,
//! and turning it into a compilable translation unit.

pub mod command;
pub mod complete;
pub mod driver;
pub mod embed;
pub mod scanner;
pub mod synth;
pub mod words;

pub use command::{CompilerChange, HELP, ReplCommand, parse_command};
pub use complete::{CCompleter, complete_c};
pub use driver::{ReadRequest, Unit, UnitKind, prompt, read_unit};
pub use embed::{EmbedError, expand_embeds, expand_embeds_from_disk};
pub use scanner::{Completeness, last_significant_char, scan, scan_preprocessor};
pub use synth::{Fragments, Synthesizer, Target, line_marker};
pub use words::split_words;
