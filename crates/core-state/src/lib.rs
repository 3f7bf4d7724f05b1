//! Session state: the line-editor history store and the accumulated program.
//!
//! Both live for the whole process and are mutated only from the session
//! loop thread, so neither carries any locking.

pub mod history;
pub mod program;

pub use history::{History, HistoryEntry, Recall};
pub use program::{ParseRunModeError, ProgramState, RunMode};
