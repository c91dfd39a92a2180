//! Source position infrastructure for the SWAN template parser.
//!
//! Provides byte-offset spans, a line index for offset → line/column
//! conversion, and the gap-aware location calculator used to rebase offsets
//! reported by the script parser against expression fragments.

mod calculator;
mod line_index;
mod span;

pub use calculator::LocationCalculator;
pub use line_index::{LineCol, LineIndex};
pub use span::{ByteOffset, Span};

pub use text_size::TextSize;
