//! Translation of fragment-local offsets back to original source offsets.
//!
//! Expression payloads and embedded script bodies are handed to the script
//! parser as standalone fragments whose text has CRLF pairs collapsed to a
//! single LF. Offsets reported against such a fragment are therefore *behind*
//! the original source wherever a collapse happened; the calculator
//! re-inserts those gaps. A signed shift additionally compensates for
//! synthetic prefixes wrapped around a fragment before parsing (`0(` for
//! plain expressions, `{` for the inline-object form).

use crate::{ByteOffset, Span};
use text_size::TextSize;

/// Maps offsets within a code fragment to absolute offsets in the original
/// source, honouring CRLF gaps.
#[derive(Debug, Clone, Copy)]
pub struct LocationCalculator<'a> {
    /// Absolute offsets of LF bytes elided by CRLF collapsing, ascending.
    gaps: &'a [ByteOffset],
    /// Absolute original-source offset of the fragment start.
    base: u32,
    /// Signed correction applied to fragment offsets before rebasing.
    shift: i64,
    /// Index of the first gap past `base`.
    first_gap: usize,
}

impl<'a> LocationCalculator<'a> {
    /// Creates a calculator for a fragment starting at `base` in the
    /// original source.
    pub fn new(gaps: &'a [ByteOffset], base: ByteOffset) -> Self {
        let base = u32::from(base);
        let first_gap = gaps.partition_point(|&g| u32::from(g) <= base);
        Self {
            gaps,
            base,
            shift: 0,
            first_gap,
        }
    }

    /// Returns the absolute original-source offset of `offset` within the
    /// fragment, re-inserting any CRLF gaps crossed on the way.
    pub fn offset_with_gap(&self, offset: usize) -> ByteOffset {
        let mut abs = self.base as i64 + offset as i64 + self.shift;
        let mut i = self.first_gap;
        while i < self.gaps.len() && i64::from(u32::from(self.gaps[i])) <= abs {
            abs += 1;
            i += 1;
        }
        TextSize::from(abs.max(0) as u32)
    }

    /// Rewrites a fragment-local span into the absolute coordinate system.
    pub fn fix_span(&self, start: usize, end: usize) -> Span {
        Span {
            start: self.offset_with_gap(start),
            end: self.offset_with_gap(end),
        }
    }

    /// Returns a nested calculator whose fragment starts at `offset` within
    /// this fragment.
    pub fn sub_after(&self, offset: usize) -> Self {
        Self::new(self.gaps, self.offset_with_gap(offset))
    }

    /// Returns a calculator identical to this one with `delta` added to the
    /// shift. `sub_shift(-2)` undoes the two-byte `0(` expression prefix.
    pub fn sub_shift(&self, delta: i64) -> Self {
        Self {
            shift: self.shift + delta,
            ..*self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(v: u32) -> TextSize {
        TextSize::from(v)
    }

    #[test]
    fn test_no_gaps() {
        let calc = LocationCalculator::new(&[], ts(10));
        assert_eq!(calc.offset_with_gap(0), ts(10));
        assert_eq!(calc.offset_with_gap(5), ts(15));
    }

    #[test]
    fn test_gap_reinsertion() {
        // Source "a\r\nb": the LF at offset 2 was elided, so fragment
        // offset 2 ("b" after the collapsed break) maps to offset 3.
        let gaps = [ts(2)];
        let calc = LocationCalculator::new(&gaps, ts(0));
        assert_eq!(calc.offset_with_gap(0), ts(0));
        assert_eq!(calc.offset_with_gap(1), ts(1));
        assert_eq!(calc.offset_with_gap(2), ts(3));
    }

    #[test]
    fn test_gap_cascade() {
        // Two consecutive CRLF pairs: "\r\n\r\nx" with gaps at 1 and 3.
        let gaps = [ts(1), ts(3)];
        let calc = LocationCalculator::new(&gaps, ts(0));
        assert_eq!(calc.offset_with_gap(0), ts(0));
        assert_eq!(calc.offset_with_gap(1), ts(2));
        assert_eq!(calc.offset_with_gap(2), ts(4));
    }

    #[test]
    fn test_gaps_before_base_ignored() {
        // A gap before the fragment start is already folded into the base.
        let gaps = [ts(2), ts(20)];
        let calc = LocationCalculator::new(&gaps, ts(10));
        assert_eq!(calc.offset_with_gap(0), ts(10));
        assert_eq!(calc.offset_with_gap(10), ts(21));
    }

    #[test]
    fn test_sub_shift() {
        // Offsets reported against "0(expr)" are two bytes ahead of the
        // actual expression text.
        let calc = LocationCalculator::new(&[], ts(10)).sub_shift(-2);
        assert_eq!(calc.offset_with_gap(2), ts(10));
        assert_eq!(calc.offset_with_gap(6), ts(14));
    }

    #[test]
    fn test_sub_after() {
        let gaps = [ts(12)];
        let calc = LocationCalculator::new(&gaps, ts(10));
        let sub = calc.sub_after(4);
        // 10 + 4 crosses the gap at 12, so the sub-fragment starts at 15.
        assert_eq!(sub.offset_with_gap(0), ts(15));
    }
}
