//! Byte spans over template source text.

use text_size::TextSize;

/// A byte offset into a source string.
pub type ByteOffset = TextSize;

/// A half-open byte range `[start, end)` in the original source.
///
/// Offsets always refer to the source as written: a token whose text had a
/// CRLF pair collapsed still spans both bytes of the pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Span {
    /// The start byte offset (inclusive).
    pub start: ByteOffset,
    /// The end byte offset (exclusive).
    pub end: ByteOffset,
}

impl Span {
    /// Creates a span from `usize` byte indices.
    #[inline]
    pub fn at(start: usize, end: usize) -> Self {
        Self {
            start: TextSize::from(start as u32),
            end: TextSize::from(end as u32),
        }
    }

    /// Returns the length of this span in bytes.
    #[inline]
    pub fn len(self) -> u32 {
        u32::from(self.end - self.start)
    }

    /// Returns true if `other` lies entirely within this span.
    #[inline]
    pub fn contains_span(self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at() {
        // The `{{` opener in `<view s-if="{{cond}}">`.
        let span = Span::at(12, 14);
        assert_eq!(span.start, TextSize::from(12));
        assert_eq!(span.end, TextSize::from(14));
        assert_eq!(span.len(), 2);
    }

    #[test]
    fn test_len_covers_collapsed_pair() {
        // A text token over "a\r\nb" spans all four source bytes even
        // though its decoded value holds three characters.
        assert_eq!(Span::at(0, 4).len(), 4);
    }

    #[test]
    fn test_contains_span() {
        // An attribute span contains its key span but not a sibling's.
        let attr = Span::at(6, 20);
        let key = Span::at(6, 10);
        let next_attr = Span::at(21, 30);
        assert!(attr.contains_span(key));
        assert!(attr.contains_span(attr));
        assert!(!attr.contains_span(next_attr));
        assert!(!key.contains_span(attr));
    }
}
