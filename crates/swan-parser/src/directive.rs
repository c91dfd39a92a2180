//! Directive key parsing and `s-for` header splitting.
//!
//! The directive grammar is
//! `^(s-|bind:?|catch:?|capture-bind:|capture-catch:)(\w[\w-.]+)$`,
//! case-sensitive, with the colon optional after `bind`/`catch`
//! (`bindtap` ≡ `bind:tap`).

use smol_str::SmolStr;

use crate::ast::{DirectivePrefix, XDirectiveKey, XIdentifier};

/// Prefixes in longest-match-first order.
const PREFIXES: &[(&str, DirectivePrefix)] = &[
    ("capture-bind:", DirectivePrefix::CaptureBind),
    ("capture-catch:", DirectivePrefix::CaptureCatch),
    ("bind:", DirectivePrefix::Bind),
    ("catch:", DirectivePrefix::Catch),
    ("bind", DirectivePrefix::Bind),
    ("catch", DirectivePrefix::Catch),
    ("s-", DirectivePrefix::S),
];

/// The outcome of matching an attribute key against the directive grammar.
pub enum DirectiveKeyMatch {
    /// The key is not a directive.
    NotADirective,
    /// The key starts with a directive prefix but the remainder is not a
    /// valid directive name.
    Invalid,
    /// A well-formed directive key.
    Directive(XDirectiveKey),
}

/// Matches an attribute key against the directive grammar.
pub fn parse_directive_key(key: &XIdentifier) -> DirectiveKeyMatch {
    let full = key.name.as_str();
    for &(prefix, kind) in PREFIXES {
        if let Some(rest) = full.strip_prefix(prefix) {
            if !is_directive_name(rest) {
                return DirectiveKeyMatch::Invalid;
            }
            let prefix_len = prefix.len();
            return DirectiveKeyMatch::Directive(XDirectiveKey {
                span: key.span,
                prefix: kind,
                raw_prefix: SmolStr::new(&key.raw_name[..prefix_len]),
                name: SmolStr::new(rest),
                raw_name: SmolStr::new(&key.raw_name[prefix_len..]),
                full_name: SmolStr::new(full),
            });
        }
    }
    DirectiveKeyMatch::NotADirective
}

/// `\w[\w-.]+`: a word character followed by at least one word character,
/// dash or dot.
fn is_directive_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !is_word(first) {
        return false;
    }
    let mut count = 0usize;
    for c in chars {
        if !is_word(c) && c != '-' && c != '.' {
            return false;
        }
        count += 1;
    }
    count >= 1
}

fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// A whitespace-delimited keyword occurrence inside a for-header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForKeyword {
    /// Offset of the keyword within the header.
    pub offset: usize,
    /// Byte length of the keyword.
    pub len: usize,
}

/// The segments of an `s-for` header: `item, index in list trackBy expr`.
#[derive(Debug)]
pub struct ForSegments<'a> {
    /// The loop-target segment before `in`, with its offset.
    pub left: Option<(usize, &'a str)>,
    /// The `in` keyword.
    pub in_keyword: Option<ForKeyword>,
    /// The iterated-expression segment, with its offset.
    pub right: (usize, &'a str),
    /// The `trackBy` keyword.
    pub track_keyword: Option<ForKeyword>,
    /// The track-by segment, with its offset.
    pub track_by: Option<(usize, &'a str)>,
}

/// Splits a for-header on its whitespace-delimited `in` / `trackBy`
/// keywords. Both may appear: the first `in` splits left from right, the
/// first `trackBy` after it splits right from the track-by expression.
/// Without an `in`, the whole header (up to `trackBy`) is the iterated
/// expression.
pub fn split_for_expression(code: &str) -> ForSegments<'_> {
    let in_keyword = find_keyword(code, "in", 0);
    let right_start = in_keyword.map(|k| k.offset + k.len).unwrap_or(0);
    let track_keyword = find_keyword(code, "trackBy", right_start);

    let (right_end, track_by) = match track_keyword {
        Some(k) => {
            let after = k.offset + k.len;
            (k.offset, Some((after, &code[after..])))
        }
        None => (code.len(), None),
    };

    ForSegments {
        left: in_keyword.map(|k| (0, &code[..k.offset])),
        in_keyword,
        right: (right_start, &code[right_start..right_end]),
        track_keyword,
        track_by,
    }
}

/// Finds the first occurrence of `keyword` at or after `from` that is
/// surrounded by whitespace.
fn find_keyword(code: &str, keyword: &str, from: usize) -> Option<ForKeyword> {
    let bytes = code.as_bytes();
    let mut search = from;
    while let Some(found) = code[search..].find(keyword) {
        let offset = search + found;
        let end = offset + keyword.len();
        let before_ws = offset > 0 && bytes[offset - 1].is_ascii_whitespace();
        let after_ws = end < code.len() && bytes[end].is_ascii_whitespace();
        if before_ws && after_ws {
            return Some(ForKeyword {
                offset,
                len: keyword.len(),
            });
        }
        search = offset + 1;
        if search >= code.len() {
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use swan_source::Span;

    fn ident(name: &str) -> XIdentifier {
        XIdentifier {
            span: Span::at(0, name.len()),
            name: SmolStr::new(name),
            raw_name: SmolStr::new(name),
        }
    }

    fn directive(name: &str) -> XDirectiveKey {
        match parse_directive_key(&ident(name)) {
            DirectiveKeyMatch::Directive(key) => key,
            _ => panic!("expected {name} to parse as a directive"),
        }
    }

    #[test]
    fn test_s_prefix() {
        let key = directive("s-if");
        assert_eq!(key.prefix, DirectivePrefix::S);
        assert_eq!(key.name, "if");
    }

    #[test]
    fn test_bind_with_colon() {
        let key = directive("bind:tap");
        assert_eq!(key.prefix, DirectivePrefix::Bind);
        assert_eq!(key.name, "tap");
        assert_eq!(key.raw_prefix, "bind:");
    }

    #[test]
    fn test_bind_without_colon() {
        let key = directive("bindtap");
        assert_eq!(key.prefix, DirectivePrefix::Bind);
        assert_eq!(key.name, "tap");
        assert_eq!(key.raw_prefix, "bind");
    }

    #[test]
    fn test_capture_prefixes() {
        let key = directive("capture-bind:touchstart");
        assert_eq!(key.prefix, DirectivePrefix::CaptureBind);
        assert_eq!(key.name, "touchstart");
        let key = directive("capture-catch:tap");
        assert_eq!(key.prefix, DirectivePrefix::CaptureCatch);
    }

    #[test]
    fn test_dotted_name() {
        let key = directive("s-else-if");
        assert_eq!(key.name, "else-if");
        let key = directive("bind:update.sync");
        assert_eq!(key.name, "update.sync");
    }

    #[test]
    fn test_not_a_directive() {
        assert!(matches!(
            parse_directive_key(&ident("class")),
            DirectiveKeyMatch::NotADirective
        ));
        // `capture-bind` without a colon is not in the grammar.
        assert!(matches!(
            parse_directive_key(&ident("capture-bindtap")),
            DirectiveKeyMatch::NotADirective
        ));
    }

    #[test]
    fn test_invalid_directive_name() {
        // The name must be at least two characters.
        assert!(matches!(
            parse_directive_key(&ident("s-a")),
            DirectiveKeyMatch::Invalid
        ));
        assert!(matches!(
            parse_directive_key(&ident("bind:.x")),
            DirectiveKeyMatch::Invalid
        ));
    }

    #[test]
    fn test_split_full_header() {
        let segs = split_for_expression("item, idx in list trackBy item.id");
        assert_eq!(segs.left, Some((0, "item, idx ")));
        let in_kw = segs.in_keyword.unwrap();
        assert_eq!(&"item, idx in list trackBy item.id"[in_kw.offset..in_kw.offset + in_kw.len], "in");
        assert_eq!(segs.right.1, " list ");
        assert_eq!(segs.track_by.unwrap().1, " item.id");
    }

    #[test]
    fn test_split_without_track_by() {
        let segs = split_for_expression("item in list");
        assert_eq!(segs.left, Some((0, "item ")));
        assert_eq!(segs.right.1, " list");
        assert!(segs.track_by.is_none());
    }

    #[test]
    fn test_split_bare_expression() {
        let segs = split_for_expression("list");
        assert!(segs.left.is_none());
        assert_eq!(segs.right, (0, "list"));
    }

    #[test]
    fn test_in_requires_whitespace() {
        // `in` inside an identifier does not split.
        let segs = split_for_expression("item_in_list");
        assert!(segs.in_keyword.is_none());
        // Nor does a leading `in`.
        let segs = split_for_expression("in list");
        assert!(segs.in_keyword.is_none());
    }

    #[test]
    fn test_track_by_only() {
        let segs = split_for_expression("list trackBy item");
        assert!(segs.left.is_none());
        assert_eq!(segs.right.1, "list ");
        assert_eq!(segs.track_by.unwrap().1, " item");
    }
}
