//! Token types for the SWAN tokenizer.
//!
//! The committed token stream mixes two families: markup tokens produced by
//! the HTML-family state machine, and script tokens spliced in after an
//! expression payload has been parsed by the script backend.

use swan_source::{LineCol, Span};

/// A token with its decoded text and source position.
///
/// `value` holds the lexeme content after input normalisation: CRLF pairs
/// collapsed to LF, and NUL replaced by U+FFFD where the tokenizer demands.
/// `loc` is filled in from the document's line index once the parse
/// completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The decoded lexeme.
    pub value: String,
    /// The span of the token in the original source.
    pub span: Span,
    /// Line/column of the token start.
    pub start_loc: LineCol,
    /// Line/column of the token end.
    pub end_loc: LineCol,
}

impl Token {
    /// Creates a token with default (unfilled) line/column positions.
    pub fn new(kind: TokenKind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
            start_loc: LineCol::default(),
            end_loc: LineCol::default(),
        }
    }
}

/// Token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // === Markup tokens ===
    /// `<name` opening a start tag; the value is the lowercased tag name.
    TagOpen,
    /// `</name` opening an end tag; the value is the lowercased tag name.
    EndTagOpen,
    /// `>` closing a tag.
    TagClose,
    /// `/>` closing a self-closing tag.
    SelfClosingTagClose,
    /// An attribute name; lowercased in the value.
    HtmlIdentifier,
    /// `=` between an attribute name and its value.
    Association,
    /// An attribute value run (quotes excluded).
    HtmlLiteral,
    /// `"` or `'` delimiting an attribute value.
    Quote,
    /// `<!-- … -->`; the value is the comment text.
    HtmlComment,
    /// A malformed comment-like construct; the value is its text.
    HtmlBogusComment,
    /// A text run in DATA content.
    Text,
    /// A whitespace-only run.
    Whitespace,
    /// A text run in RCDATA content (`<textarea>`).
    RcDataText,
    /// A text run in RAWTEXT content (`<filter>`, `<import-sjs>`).
    RawText,
    /// `{{`, or `{=` inside a quoted attribute value.
    MustacheStart,
    /// `}}`, or `=}` inside a quoted attribute value.
    MustacheEnd,

    // === Script tokens (spliced in from the expression parser) ===
    /// A script identifier.
    Identifier,
    /// A script keyword, including the synthetic `in` / `trackBy` keywords
    /// of a for-header.
    Keyword,
    /// `true` or `false`.
    Boolean,
    /// `null`.
    Null,
    /// A punctuator.
    Punctuator,
    /// A numeric literal.
    Numeric,
    /// A string literal.
    Str,
    /// A regular expression literal.
    RegularExpression,
    /// A template literal part.
    Template,
    /// A `//` comment inside an expression or script module.
    LineComment,
    /// A `/* … */` comment inside an expression or script module.
    BlockComment,
}

impl TokenKind {
    /// Returns true for token kinds that carry text content.
    pub fn is_text(self) -> bool {
        matches!(
            self,
            TokenKind::Text | TokenKind::Whitespace | TokenKind::RcDataText | TokenKind::RawText
        )
    }

    /// Returns true for comment token kinds.
    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::HtmlComment
                | TokenKind::HtmlBogusComment
                | TokenKind::LineComment
                | TokenKind::BlockComment
        )
    }

    /// Returns a human-readable name for this token kind.
    pub fn name(self) -> &'static str {
        match self {
            TokenKind::TagOpen => "HTMLTagOpen",
            TokenKind::EndTagOpen => "HTMLEndTagOpen",
            TokenKind::TagClose => "HTMLTagClose",
            TokenKind::SelfClosingTagClose => "HTMLSelfClosingTagClose",
            TokenKind::HtmlIdentifier => "HTMLIdentifier",
            TokenKind::Association => "HTMLAssociation",
            TokenKind::HtmlLiteral => "HTMLLiteral",
            TokenKind::Quote => "HTMLQuote",
            TokenKind::HtmlComment => "HTMLComment",
            TokenKind::HtmlBogusComment => "HTMLBogusComment",
            TokenKind::Text => "HTMLText",
            TokenKind::Whitespace => "HTMLWhitespace",
            TokenKind::RcDataText => "HTMLRCDataText",
            TokenKind::RawText => "HTMLRawText",
            TokenKind::MustacheStart => "XMustacheStart",
            TokenKind::MustacheEnd => "XMustacheEnd",
            TokenKind::Identifier => "Identifier",
            TokenKind::Keyword => "Keyword",
            TokenKind::Boolean => "Boolean",
            TokenKind::Null => "Null",
            TokenKind::Punctuator => "Punctuator",
            TokenKind::Numeric => "Numeric",
            TokenKind::Str => "String",
            TokenKind::RegularExpression => "RegularExpression",
            TokenKind::Template => "Template",
            TokenKind::LineComment => "Line",
            TokenKind::BlockComment => "Block",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_family() {
        assert!(TokenKind::Text.is_text());
        assert!(TokenKind::Whitespace.is_text());
        assert!(TokenKind::RawText.is_text());
        assert!(!TokenKind::HtmlLiteral.is_text());
    }

    #[test]
    fn test_names() {
        assert_eq!(TokenKind::TagOpen.name(), "HTMLTagOpen");
        assert_eq!(TokenKind::MustacheStart.name(), "XMustacheStart");
        assert_eq!(TokenKind::Str.name(), "String");
    }
}
