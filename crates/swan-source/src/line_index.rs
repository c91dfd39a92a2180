//! Line index for efficient offset ↔ line/column conversion.

use crate::ByteOffset;
use text_size::TextSize;

/// A line and column position.
///
/// Lines are 1-based, columns are 0-based byte offsets within the line. This
/// is the coordinate convention of the template dialect's tooling surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineCol {
    /// 1-indexed line number.
    pub line: u32,
    /// 0-indexed column (byte offset within the line).
    pub column: u32,
}

impl LineCol {
    /// Creates a new line/column position.
    #[inline]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Default for LineCol {
    fn default() -> Self {
        Self { line: 1, column: 0 }
    }
}

/// An index for conversion from byte offsets to line/column positions.
///
/// The index stores the byte offset of the start of each line, enabling
/// O(log n) lookups.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line.
    /// `line_starts[i]` is the offset where line `i + 1` begins.
    line_starts: Vec<ByteOffset>,
}

impl Default for LineIndex {
    fn default() -> Self {
        Self {
            line_starts: vec![TextSize::from(0)],
        }
    }
}

impl LineIndex {
    /// Creates a new line index from source text.
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];

        for (offset, c) in text.char_indices() {
            if c == '\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }

        Self { line_starts }
    }

    /// Creates a line index from the byte offsets of line terminators.
    ///
    /// Each terminator offset is the position of the final byte of a line
    /// break in the original source (the LF of a CRLF pair).
    pub fn from_line_terminators(terminators: &[ByteOffset]) -> Self {
        let mut line_starts = Vec::with_capacity(terminators.len() + 1);
        line_starts.push(TextSize::from(0));
        for &t in terminators {
            line_starts.push(t + TextSize::from(1));
        }
        Self { line_starts }
    }

    /// Returns the number of lines in the source.
    #[inline]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Converts a byte offset to a line/column position.
    ///
    /// Offsets past the last line start are reported on the last line.
    pub fn line_col(&self, offset: ByteOffset) -> LineCol {
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);

        let line_start = self.line_starts[line];
        LineCol {
            line: (line + 1) as u32,
            column: u32::from(offset) - u32::from(line_start),
        }
    }

    /// Returns the byte offset where a 1-based line starts.
    pub fn line_start(&self, line: u32) -> Option<ByteOffset> {
        self.line_starts.get(line.saturating_sub(1) as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let index = LineIndex::new("hello world");
        assert_eq!(index.line_count(), 1);
        assert_eq!(index.line_col(TextSize::from(0)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::from(5)), LineCol::new(1, 5));
    }

    #[test]
    fn test_multiple_lines() {
        let index = LineIndex::new("hello\nworld\nfoo");
        assert_eq!(index.line_count(), 3);

        assert_eq!(index.line_col(TextSize::from(0)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::from(5)), LineCol::new(1, 5));

        assert_eq!(index.line_col(TextSize::from(6)), LineCol::new(2, 0));
        assert_eq!(index.line_col(TextSize::from(10)), LineCol::new(2, 4));

        assert_eq!(index.line_col(TextSize::from(12)), LineCol::new(3, 0));
    }

    #[test]
    fn test_from_line_terminators() {
        // "a\r\nb": the terminator is the LF at offset 2, so line 2 starts at 3.
        let index = LineIndex::from_line_terminators(&[TextSize::from(2)]);
        assert_eq!(index.line_col(TextSize::from(0)), LineCol::new(1, 0));
        assert_eq!(index.line_col(TextSize::from(3)), LineCol::new(2, 0));
    }

    #[test]
    fn test_line_start() {
        let index = LineIndex::new("hello\nworld\n");
        assert_eq!(index.line_start(1), Some(TextSize::from(0)));
        assert_eq!(index.line_start(2), Some(TextSize::from(6)));
        assert_eq!(index.line_start(3), Some(TextSize::from(12)));
    }
}
