//! `#embed "file"` expansion.
//!
//! Each logical line that is an `#embed` directive is replaced by the file's
//! bytes as a comma-separated `0xNN` list; other lines pass through. Output
//! lines always end in `\n`. File access goes through a caller-supplied
//! reader so synthesis itself stays free of I/O.

use crate::scanner::{is_directive, logical_lines};
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("Invalid #embed directive")]
    InvalidDirective,
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Path between the first pair of double quotes, if there is a non-empty one.
fn quoted_path(directive: &str) -> Option<&str> {
    let open = directive.find('"')?;
    let rest = &directive[open + 1..];
    let close = rest.find('"')?;
    let path = &rest[..close];
    (!path.is_empty()).then_some(path)
}

/// Expand every `#embed` line in `text`.
pub fn expand_embeds<F>(text: &str, mut read: F) -> Result<String, EmbedError>
where
    F: FnMut(&Path) -> io::Result<Vec<u8>>,
{
    let mut out = String::with_capacity(text.len());
    for line in logical_lines(text) {
        if !is_directive(line, "embed") {
            out.push_str(line);
            out.push('\n');
            continue;
        }
        let path = quoted_path(line).ok_or(EmbedError::InvalidDirective)?;
        let path = Path::new(path);
        let bytes = read(path).map_err(|source| EmbedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(target: "repl.embed", bytes = bytes.len(), "embed_expanded");
        for (i, b) in bytes.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let _ = write!(out, "0x{b:02X}");
        }
        out.push('\n');
    }
    Ok(out)
}

/// `expand_embeds` reading from the filesystem, relative to the working directory.
pub fn expand_embeds_from_disk(text: &str) -> Result<String, EmbedError> {
    expand_embeds(text, |p| std::fs::read(p))
}
