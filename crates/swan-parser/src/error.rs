//! Parse error types.
//!
//! The pipeline never fails on malformed input: every recoverable problem is
//! recorded as a [`ParseError`] on the document and parsing continues.

use swan_source::{LineCol, Span};
use thiserror::Error;

/// An error recovered during parsing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message. For markup errors this is the code itself; script
    /// errors carry the message reported by the script parser.
    pub message: String,
    /// The location in the original source.
    pub span: Span,
    /// Line/column of the error, filled from the document line index once
    /// the parse completes.
    pub loc: LineCol,
}

impl ParseError {
    /// Creates an error whose message is the code's canonical name.
    pub fn new(code: ErrorCode, span: Span) -> Self {
        Self {
            code,
            message: code.as_str().to_string(),
            span,
            loc: LineCol::default(),
        }
    }

    /// Creates an error with an explicit message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            message: message.into(),
            span,
            loc: LineCol::default(),
        }
    }
}

/// Error codes: the HTML tokenization-spec set used by the state machine,
/// plus the SWAN-specific codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    AbruptClosingOfEmptyComment,
    CdataInHtmlContent,
    ControlCharacterInInputStream,
    DuplicateAttribute,
    EndTagWithAttributes,
    EndTagWithTrailingSolidus,
    EofBeforeTagName,
    EofInComment,
    EofInTag,
    IncorrectlyClosedComment,
    IncorrectlyOpenedComment,
    InvalidFirstCharacterOfTagName,
    MissingAttributeValue,
    MissingEndTagName,
    MissingWhitespaceBetweenAttributes,
    NestedComment,
    NoncharacterInInputStream,
    UnexpectedCharacterInAttributeName,
    UnexpectedCharacterInUnquotedAttributeValue,
    UnexpectedEqualsSignBeforeAttributeName,
    UnexpectedNullCharacter,
    UnexpectedQuestionMarkInsteadOfTagName,
    UnexpectedSolidusInTag,

    // === SWAN-specific codes ===
    MissingExpressionEndTag,
    MissingEndTag,
    XInvalidEndTag,
    XInvalidDirective,
    XExpressionError,
    Unreachable,
}

impl ErrorCode {
    /// Returns the error code as its canonical kebab-case string.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::AbruptClosingOfEmptyComment => "abrupt-closing-of-empty-comment",
            ErrorCode::CdataInHtmlContent => "cdata-in-html-content",
            ErrorCode::ControlCharacterInInputStream => "control-character-in-input-stream",
            ErrorCode::DuplicateAttribute => "duplicate-attribute",
            ErrorCode::EndTagWithAttributes => "end-tag-with-attributes",
            ErrorCode::EndTagWithTrailingSolidus => "end-tag-with-trailing-solidus",
            ErrorCode::EofBeforeTagName => "eof-before-tag-name",
            ErrorCode::EofInComment => "eof-in-comment",
            ErrorCode::EofInTag => "eof-in-tag",
            ErrorCode::IncorrectlyClosedComment => "incorrectly-closed-comment",
            ErrorCode::IncorrectlyOpenedComment => "incorrectly-opened-comment",
            ErrorCode::InvalidFirstCharacterOfTagName => "invalid-first-character-of-tag-name",
            ErrorCode::MissingAttributeValue => "missing-attribute-value",
            ErrorCode::MissingEndTagName => "missing-end-tag-name",
            ErrorCode::MissingWhitespaceBetweenAttributes => {
                "missing-whitespace-between-attributes"
            }
            ErrorCode::NestedComment => "nested-comment",
            ErrorCode::NoncharacterInInputStream => "noncharacter-in-input-stream",
            ErrorCode::UnexpectedCharacterInAttributeName => {
                "unexpected-character-in-attribute-name"
            }
            ErrorCode::UnexpectedCharacterInUnquotedAttributeValue => {
                "unexpected-character-in-unquoted-attribute-value"
            }
            ErrorCode::UnexpectedEqualsSignBeforeAttributeName => {
                "unexpected-equals-sign-before-attribute-name"
            }
            ErrorCode::UnexpectedNullCharacter => "unexpected-null-character",
            ErrorCode::UnexpectedQuestionMarkInsteadOfTagName => {
                "unexpected-question-mark-instead-of-tag-name"
            }
            ErrorCode::UnexpectedSolidusInTag => "unexpected-solidus-in-tag",
            ErrorCode::MissingExpressionEndTag => "missing-expression-end-tag",
            ErrorCode::MissingEndTag => "missing-end-tag",
            ErrorCode::XInvalidEndTag => "x-invalid-end-tag",
            ErrorCode::XInvalidDirective => "x-invalid-directive",
            ErrorCode::XExpressionError => "x-expression-error",
            ErrorCode::Unreachable => "unreachable",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ParseError::new(ErrorCode::DuplicateAttribute, Span::at(0, 5));
        assert_eq!(error.to_string(), "duplicate-attribute");
    }

    #[test]
    fn test_error_with_message() {
        let error = ParseError::with_message(
            ErrorCode::XExpressionError,
            "Unexpected end of expression.",
            Span::at(3, 3),
        );
        assert_eq!(error.code, ErrorCode::XExpressionError);
        assert_eq!(error.to_string(), "Unexpected end of expression.");
    }
}
