//! Line editor rendering: pure row layout plus terminal emission.

pub mod layout;
pub mod writer;

pub use layout::{RowLayout, layout};
pub use writer::LineRenderer;
