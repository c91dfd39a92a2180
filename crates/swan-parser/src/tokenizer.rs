//! Streaming HTML-family tokenizer.
//!
//! A hand-written state machine following the HTML tokenization algorithm
//! for the states it names, with the dialect's deviations: mustache
//! delimiter recognition in data and attribute-value states, `/>` accepted
//! on any tag, and provisional end tags in RCDATA/RAWTEXT content that are
//! rolled back when the speculative name does not match the open tag.

use std::collections::VecDeque;

use smol_str::SmolStr;
use swan_source::{Span, TextSize};

use crate::cursor::Cursor;
use crate::error::{ErrorCode, ParseError};
use crate::token::{Token, TokenKind};

const REPLACEMENT: char = '\u{FFFD}';

/// Tokenizer states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Data,
    TagOpen,
    EndTagOpen,
    TagName,
    Rcdata,
    RcdataLessThanSign,
    RcdataEndTagOpen,
    RcdataEndTagName,
    Rawtext,
    RawtextLessThanSign,
    RawtextEndTagOpen,
    RawtextEndTagName,
    BeforeAttributeName,
    AttributeName,
    AfterAttributeName,
    BeforeAttributeValue,
    AttributeValueDoubleQuoted,
    AttributeValueSingleQuoted,
    AttributeValueUnquoted,
    AfterAttributeValueQuoted,
    SelfClosingStartTag,
    BogusComment,
    MarkupDeclarationOpen,
    CommentStart,
    CommentStartDash,
    Comment,
    CommentLessThanSign,
    CommentLessThanSignBang,
    CommentLessThanSignBangDash,
    CommentLessThanSignBangDashDash,
    CommentEndDash,
    CommentEnd,
    CommentEndBang,
    XExpressionStart,
    XExpressionEnd,
}

/// A token under construction.
#[derive(Debug)]
struct PendingToken {
    kind: TokenKind,
    value: String,
    start: usize,
}

impl PendingToken {
    fn new(kind: TokenKind, start: usize) -> Self {
        Self {
            kind,
            value: String::new(),
            start,
        }
    }

    fn finish(self, end: usize) -> Token {
        Token::new(self.kind, self.value, Span::at(self.start, end))
    }
}

/// The streaming tokenizer.
pub struct Tokenizer<'src> {
    cursor: Cursor<'src>,
    state: State,
    /// State to return to after mustache delimiter detection.
    return_state: State,
    reconsuming: bool,
    last_cp: Option<char>,
    current: Option<PendingToken>,
    /// A speculative end-tag token in RCDATA/RAWTEXT content. Promoted to
    /// the committed queue on a name match, discarded on mismatch. Never
    /// reaches an observer un-promoted.
    provisional: Option<PendingToken>,
    /// Raw characters consumed for the speculative end tag (`</name`).
    end_tag_buffer: String,
    /// Name of the last open tag, for end-tag matching.
    last_tag_open: Option<SmolStr>,
    committed: VecDeque<Token>,
    pub(crate) errors: Vec<ParseError>,
    /// The second character of the open mustache delimiter (`{` for `{{`,
    /// `=` for `{=`), if one is open. While set, `<` is not a tag opener.
    opened_mustache: Option<char>,
    /// Offset of `<` for the token being opened.
    tag_start: usize,
    /// Offset of `/` for a potential `/>`.
    slash_start: usize,
    /// Offset of the first delimiter character under consideration.
    brace_start: usize,
    /// Accumulator for `<!…` discrimination.
    md_buffer: String,
    finished: bool,
    eof_steps: u8,
}

impl<'src> Tokenizer<'src> {
    /// Creates a tokenizer over the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            state: State::Data,
            return_state: State::Data,
            reconsuming: false,
            last_cp: None,
            current: None,
            provisional: None,
            end_tag_buffer: String::new(),
            last_tag_open: None,
            committed: VecDeque::new(),
            errors: Vec::new(),
            opened_mustache: None,
            tag_start: 0,
            slash_start: 0,
            brace_start: 0,
            md_buffer: String::new(),
            finished: false,
            eof_steps: 0,
        }
    }

    /// Returns the next committed token, or `None` after end of input.
    ///
    /// Deterministic: the same input always produces the same stream.
    /// Recoverable problems are pushed to the error list and the state
    /// machine continues.
    pub fn next_token(&mut self) -> Option<Token> {
        while self.committed.is_empty() && !self.finished {
            let cp = if self.reconsuming {
                self.reconsuming = false;
                self.last_cp
            } else {
                let c = self.cursor.consume_next();
                self.last_cp = c;
                c
            };
            if cp.is_none() {
                self.eof_steps += 1;
                if self.eof_steps > 32 {
                    // EOF reconsume chains are short; a longer one is a bug.
                    self.errors.push(ParseError::new(
                        ErrorCode::Unreachable,
                        Span::at(self.cursor.len(), self.cursor.len()),
                    ));
                    self.end_current(self.cursor.len());
                    self.finished = true;
                    break;
                }
            }
            self.state = self.step(self.state, cp);
        }
        self.committed.pop_front()
    }

    /// Switches the content model, used by the tree builder after a
    /// `<textarea>` / `<filter>` / `<import-sjs>` start tag.
    pub fn set_state(&mut self, state: State) {
        self.state = state;
    }

    /// Absolute offsets of LFs elided by CRLF collapsing.
    pub fn gaps(&self) -> &[TextSize] {
        self.cursor.gaps()
    }

    /// Absolute offsets of line terminators.
    pub fn line_terminators(&self) -> &[TextSize] {
        self.cursor.line_terminators()
    }

    /// Byte length of the source.
    pub fn source_len(&self) -> usize {
        self.cursor.len()
    }

    /// Drains all errors recorded by the cursor and the state machine.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        let mut errors = std::mem::take(&mut self.cursor.errors);
        errors.append(&mut self.errors);
        errors
    }

    // === Token construction helpers ===

    fn offset(&self) -> usize {
        self.cursor.offset()
    }

    fn unit_end(&self) -> usize {
        self.cursor.unit_end()
    }

    /// Appends a character to the current token, choosing the token kind
    /// from the content context. Starts a fresh token (ending the current
    /// one) when the kind changes.
    fn append(&mut self, c: char, start: usize, base_kind: TokenKind) {
        let kind = if self.opened_mustache.is_some() {
            TokenKind::Text
        } else if base_kind != TokenKind::HtmlLiteral && is_html_whitespace(c) {
            TokenKind::Whitespace
        } else {
            base_kind
        };

        match &mut self.current {
            Some(p) if p.kind == kind => p.value.push(c),
            _ => {
                self.end_current(start);
                let mut p = PendingToken::new(kind, start);
                p.value.push(c);
                self.current = Some(p);
            }
        }
    }

    fn append_str(&mut self, s: &str, start: usize, base_kind: TokenKind) {
        let mut at = start;
        for c in s.chars() {
            self.append(c, at, base_kind);
            at += c.len_utf8();
        }
    }

    /// Appends to the current token unconditionally (tag names, comments).
    fn append_raw(&mut self, c: char) {
        if let Some(p) = &mut self.current {
            p.value.push(c);
        } else {
            debug_assert!(false, "no current token to append to");
        }
    }

    fn append_raw_str(&mut self, s: &str) {
        for c in s.chars() {
            self.append_raw(c);
        }
    }

    fn start_token(&mut self, kind: TokenKind, start: usize) {
        self.end_current(start);
        self.current = Some(PendingToken::new(kind, start));
    }

    /// Commits the current token, ending at `end`. Tokens with an empty
    /// value and empty range are dropped.
    fn end_current(&mut self, end: usize) {
        if let Some(p) = self.current.take() {
            if p.value.is_empty() && p.start >= end {
                return;
            }
            let is_tag_open = p.kind == TokenKind::TagOpen;
            let value = if is_tag_open {
                Some(SmolStr::new(&p.value))
            } else {
                None
            };
            self.committed.push_back(p.finish(end));
            if is_tag_open {
                self.last_tag_open = value;
            }
        }
    }

    /// Emits a standalone token.
    fn emit(&mut self, kind: TokenKind, value: &str, start: usize, end: usize) {
        self.committed
            .push_back(Token::new(kind, value, Span::at(start, end)));
    }

    fn emit_error(&mut self, code: ErrorCode) {
        self.errors
            .push(ParseError::new(code, Span::at(self.offset(), self.unit_end())));
    }

    fn reconsume(&mut self, state: State) -> State {
        self.reconsuming = true;
        state
    }

    fn eof_done(&mut self) -> State {
        self.end_current(self.cursor.len());
        self.finished = true;
        State::Data
    }

    // === Provisional end tags ===

    fn provisional_matches(&self) -> bool {
        match (&self.provisional, &self.last_tag_open) {
            (Some(p), Some(name)) => p.value == name.as_str(),
            _ => false,
        }
    }

    /// Promotes the speculative end-tag token into the committed stream.
    fn promote_provisional(&mut self, end: usize) {
        if let Some(p) = self.provisional.take() {
            self.committed.push_back(p.finish(end));
        }
        self.end_tag_buffer.clear();
    }

    /// Discards the speculative end-tag token and re-emits the buffered
    /// characters as text.
    fn rollback_provisional(&mut self, text_kind: TokenKind) {
        self.provisional = None;
        let buffer = std::mem::take(&mut self.end_tag_buffer);
        self.append_str(&buffer, self.tag_start, text_kind);
    }

    // === State dispatch ===

    fn step(&mut self, state: State, cp: Option<char>) -> State {
        match state {
            State::Data => self.data(cp, TokenKind::Text),
            State::Rcdata => self.data(cp, TokenKind::RcDataText),
            State::Rawtext => self.data(cp, TokenKind::RawText),
            State::TagOpen => self.tag_open(cp),
            State::EndTagOpen => self.end_tag_open(cp),
            State::TagName => self.tag_name(cp),
            State::RcdataLessThanSign => self.rcdata_less_than_sign(cp, false),
            State::RcdataEndTagOpen => self.rcdata_end_tag_open(cp, false),
            State::RcdataEndTagName => self.rcdata_end_tag_name(cp, false),
            State::RawtextLessThanSign => self.rcdata_less_than_sign(cp, true),
            State::RawtextEndTagOpen => self.rcdata_end_tag_open(cp, true),
            State::RawtextEndTagName => self.rcdata_end_tag_name(cp, true),
            State::BeforeAttributeName => self.before_attribute_name(cp),
            State::AttributeName => self.attribute_name(cp),
            State::AfterAttributeName => self.after_attribute_name(cp),
            State::BeforeAttributeValue => self.before_attribute_value(cp),
            State::AttributeValueDoubleQuoted => self.attribute_value_quoted(cp, '"'),
            State::AttributeValueSingleQuoted => self.attribute_value_quoted(cp, '\''),
            State::AttributeValueUnquoted => self.attribute_value_unquoted(cp),
            State::AfterAttributeValueQuoted => self.after_attribute_value_quoted(cp),
            State::SelfClosingStartTag => self.self_closing_start_tag(cp),
            State::BogusComment => self.bogus_comment(cp),
            State::MarkupDeclarationOpen => self.markup_declaration_open(cp),
            State::CommentStart => self.comment_start(cp),
            State::CommentStartDash => self.comment_start_dash(cp),
            State::Comment => self.comment(cp),
            State::CommentLessThanSign => self.comment_less_than_sign(cp),
            State::CommentLessThanSignBang => self.comment_less_than_sign_bang(cp),
            State::CommentLessThanSignBangDash => self.comment_less_than_sign_bang_dash(cp),
            State::CommentLessThanSignBangDashDash => {
                self.comment_less_than_sign_bang_dash_dash(cp)
            }
            State::CommentEndDash => self.comment_end_dash(cp),
            State::CommentEnd => self.comment_end(cp),
            State::CommentEndBang => self.comment_end_bang(cp),
            State::XExpressionStart => self.x_expression_start(cp),
            State::XExpressionEnd => self.x_expression_end(cp),
        }
    }

    /// DATA, RCDATA and RAWTEXT share everything but the `<` handling and
    /// the text token kind.
    fn data(&mut self, cp: Option<char>, kind: TokenKind) -> State {
        let state = match kind {
            TokenKind::RcDataText => State::Rcdata,
            TokenKind::RawText => State::Rawtext,
            _ => State::Data,
        };
        match cp {
            Some('{') if self.opened_mustache.is_none() => {
                self.brace_start = self.offset();
                self.return_state = state;
                State::XExpressionStart
            }
            Some('}') if self.opened_mustache == Some('{') => {
                self.brace_start = self.offset();
                self.return_state = state;
                State::XExpressionEnd
            }
            Some('<') if self.opened_mustache.is_none() => {
                self.tag_start = self.offset();
                match state {
                    State::Rcdata => State::RcdataLessThanSign,
                    State::Rawtext => State::RawtextLessThanSign,
                    _ => {
                        self.end_current(self.offset());
                        State::TagOpen
                    }
                }
            }
            Some('\0') => {
                self.emit_error(ErrorCode::UnexpectedNullCharacter);
                self.append(REPLACEMENT, self.offset(), kind);
                state
            }
            Some(c) => {
                self.append(c, self.offset(), kind);
                state
            }
            None => self.eof_done(),
        }
    }

    fn tag_open(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('!') => {
                self.md_buffer.clear();
                State::MarkupDeclarationOpen
            }
            Some('/') => State::EndTagOpen,
            Some(c) if c.is_ascii_alphabetic() => {
                self.start_token(TokenKind::TagOpen, self.tag_start);
                self.append_raw(c.to_ascii_lowercase());
                State::TagName
            }
            Some('?') => {
                self.emit_error(ErrorCode::UnexpectedQuestionMarkInsteadOfTagName);
                self.start_token(TokenKind::HtmlBogusComment, self.tag_start);
                self.reconsume(State::BogusComment)
            }
            Some(_) => {
                self.emit_error(ErrorCode::InvalidFirstCharacterOfTagName);
                self.append('<', self.tag_start, TokenKind::Text);
                self.reconsume(State::Data)
            }
            None => {
                self.errors.push(ParseError::new(
                    ErrorCode::EofBeforeTagName,
                    Span::at(self.tag_start, self.cursor.len()),
                ));
                self.append('<', self.tag_start, TokenKind::Text);
                self.eof_done()
            }
        }
    }

    fn end_tag_open(&mut self, cp: Option<char>) -> State {
        match cp {
            Some(c) if c.is_ascii_alphabetic() => {
                self.start_token(TokenKind::EndTagOpen, self.tag_start);
                self.append_raw(c.to_ascii_lowercase());
                State::TagName
            }
            Some('>') => {
                self.emit_error(ErrorCode::MissingEndTagName);
                State::Data
            }
            Some(_) => {
                self.emit_error(ErrorCode::InvalidFirstCharacterOfTagName);
                self.start_token(TokenKind::HtmlBogusComment, self.tag_start);
                self.reconsume(State::BogusComment)
            }
            None => {
                self.errors.push(ParseError::new(
                    ErrorCode::EofBeforeTagName,
                    Span::at(self.tag_start, self.cursor.len()),
                ));
                self.append_str("</", self.tag_start, TokenKind::Text);
                self.eof_done()
            }
        }
    }

    fn tag_name(&mut self, cp: Option<char>) -> State {
        match cp {
            Some(c) if is_html_whitespace(c) => {
                self.end_current(self.offset());
                State::BeforeAttributeName
            }
            Some('/') => {
                self.end_current(self.offset());
                self.slash_start = self.offset();
                State::SelfClosingStartTag
            }
            Some('>') => {
                self.end_current(self.offset());
                self.emit(TokenKind::TagClose, ">", self.offset(), self.unit_end());
                State::Data
            }
            Some('\0') => {
                self.emit_error(ErrorCode::UnexpectedNullCharacter);
                self.append_raw(REPLACEMENT);
                State::TagName
            }
            Some(c) => {
                self.append_raw(c.to_ascii_lowercase());
                State::TagName
            }
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn rcdata_less_than_sign(&mut self, cp: Option<char>, rawtext: bool) -> State {
        let (text_kind, back, open) = if rawtext {
            (TokenKind::RawText, State::Rawtext, State::RawtextEndTagOpen)
        } else {
            (TokenKind::RcDataText, State::Rcdata, State::RcdataEndTagOpen)
        };
        match cp {
            Some('/') => {
                self.end_current(self.tag_start);
                self.end_tag_buffer.clear();
                self.end_tag_buffer.push_str("</");
                open
            }
            _ => {
                self.append('<', self.tag_start, text_kind);
                self.reconsume(back)
            }
        }
    }

    fn rcdata_end_tag_open(&mut self, cp: Option<char>, rawtext: bool) -> State {
        let (text_kind, back, name_state) = if rawtext {
            (TokenKind::RawText, State::Rawtext, State::RawtextEndTagName)
        } else {
            (TokenKind::RcDataText, State::Rcdata, State::RcdataEndTagName)
        };
        match cp {
            Some(c) if c.is_ascii_alphabetic() => {
                let mut p = PendingToken::new(TokenKind::EndTagOpen, self.tag_start);
                p.value.push(c.to_ascii_lowercase());
                self.provisional = Some(p);
                self.end_tag_buffer.push(c);
                name_state
            }
            _ => {
                let buffer = std::mem::take(&mut self.end_tag_buffer);
                self.append_str(&buffer, self.tag_start, text_kind);
                self.reconsume(back)
            }
        }
    }

    fn rcdata_end_tag_name(&mut self, cp: Option<char>, rawtext: bool) -> State {
        let (text_kind, back) = if rawtext {
            (TokenKind::RawText, State::Rawtext)
        } else {
            (TokenKind::RcDataText, State::Rcdata)
        };
        let name_state = if rawtext {
            State::RawtextEndTagName
        } else {
            State::RcdataEndTagName
        };
        match cp {
            Some(c) if is_html_whitespace(c) && self.provisional_matches() => {
                self.promote_provisional(self.offset());
                State::BeforeAttributeName
            }
            Some('/') if self.provisional_matches() => {
                self.promote_provisional(self.offset());
                self.slash_start = self.offset();
                State::SelfClosingStartTag
            }
            Some('>') if self.provisional_matches() => {
                self.promote_provisional(self.offset());
                self.emit(TokenKind::TagClose, ">", self.offset(), self.unit_end());
                State::Data
            }
            // Tag names in this dialect carry dashes (`import-sjs`).
            Some(c) if c.is_ascii_alphanumeric() || c == '-' => {
                if let Some(p) = &mut self.provisional {
                    p.value.push(c.to_ascii_lowercase());
                }
                self.end_tag_buffer.push(c);
                name_state
            }
            Some(_) => {
                self.rollback_provisional(text_kind);
                self.reconsume(back)
            }
            None => {
                self.rollback_provisional(text_kind);
                self.eof_done()
            }
        }
    }

    fn before_attribute_name(&mut self, cp: Option<char>) -> State {
        match cp {
            Some(c) if is_html_whitespace(c) => State::BeforeAttributeName,
            Some('/') => {
                self.slash_start = self.offset();
                State::SelfClosingStartTag
            }
            Some('>') => {
                self.emit(TokenKind::TagClose, ">", self.offset(), self.unit_end());
                State::Data
            }
            Some('=') => {
                self.emit_error(ErrorCode::UnexpectedEqualsSignBeforeAttributeName);
                self.start_token(TokenKind::HtmlIdentifier, self.offset());
                self.append_raw('=');
                State::AttributeName
            }
            Some(_) => {
                self.start_token(TokenKind::HtmlIdentifier, self.offset());
                self.reconsume(State::AttributeName)
            }
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn attribute_name(&mut self, cp: Option<char>) -> State {
        match cp {
            Some(c) if is_html_whitespace(c) => {
                self.end_current(self.offset());
                State::AfterAttributeName
            }
            Some('/') | Some('>') => {
                self.end_current(self.offset());
                self.reconsume(State::AfterAttributeName)
            }
            Some('=') => {
                self.end_current(self.offset());
                self.emit(TokenKind::Association, "=", self.offset(), self.unit_end());
                State::BeforeAttributeValue
            }
            Some('\0') => {
                self.emit_error(ErrorCode::UnexpectedNullCharacter);
                self.append_raw(REPLACEMENT);
                State::AttributeName
            }
            Some(c @ ('"' | '\'' | '<')) => {
                self.emit_error(ErrorCode::UnexpectedCharacterInAttributeName);
                self.append_raw(c);
                State::AttributeName
            }
            Some(c) => {
                self.append_raw(c.to_ascii_lowercase());
                State::AttributeName
            }
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn after_attribute_name(&mut self, cp: Option<char>) -> State {
        match cp {
            Some(c) if is_html_whitespace(c) => State::AfterAttributeName,
            Some('/') => {
                self.slash_start = self.offset();
                State::SelfClosingStartTag
            }
            Some('=') => {
                self.emit(TokenKind::Association, "=", self.offset(), self.unit_end());
                State::BeforeAttributeValue
            }
            Some('>') => {
                self.emit(TokenKind::TagClose, ">", self.offset(), self.unit_end());
                State::Data
            }
            Some(_) => {
                self.start_token(TokenKind::HtmlIdentifier, self.offset());
                self.reconsume(State::AttributeName)
            }
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn before_attribute_value(&mut self, cp: Option<char>) -> State {
        match cp {
            Some(c) if is_html_whitespace(c) => State::BeforeAttributeValue,
            Some('"') => {
                self.emit(TokenKind::Quote, "\"", self.offset(), self.unit_end());
                State::AttributeValueDoubleQuoted
            }
            Some('\'') => {
                self.emit(TokenKind::Quote, "'", self.offset(), self.unit_end());
                State::AttributeValueSingleQuoted
            }
            Some('>') => {
                self.emit_error(ErrorCode::MissingAttributeValue);
                self.emit(TokenKind::TagClose, ">", self.offset(), self.unit_end());
                State::Data
            }
            Some(_) => self.reconsume(State::AttributeValueUnquoted),
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn attribute_value_quoted(&mut self, cp: Option<char>, quote: char) -> State {
        let state = if quote == '"' {
            State::AttributeValueDoubleQuoted
        } else {
            State::AttributeValueSingleQuoted
        };
        match cp {
            Some(c) if c == quote => {
                // A closing quote always ends the value, even with a
                // mustache left open inside it; the unterminated mustache is
                // reported downstream.
                self.end_current(self.offset());
                self.opened_mustache = None;
                self.emit(
                    TokenKind::Quote,
                    if quote == '"' { "\"" } else { "'" },
                    self.offset(),
                    self.unit_end(),
                );
                State::AfterAttributeValueQuoted
            }
            Some('{') if self.opened_mustache.is_none() => {
                self.brace_start = self.offset();
                self.return_state = state;
                State::XExpressionStart
            }
            Some('}') if self.opened_mustache == Some('{') => {
                self.brace_start = self.offset();
                self.return_state = state;
                State::XExpressionEnd
            }
            Some('=') if self.opened_mustache == Some('=') => {
                self.brace_start = self.offset();
                self.return_state = state;
                State::XExpressionEnd
            }
            Some('\0') => {
                // Reported but not rewritten inside attribute values.
                self.emit_error(ErrorCode::UnexpectedNullCharacter);
                self.append('\0', self.offset(), TokenKind::HtmlLiteral);
                state
            }
            Some(c) => {
                self.append(c, self.offset(), TokenKind::HtmlLiteral);
                state
            }
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn attribute_value_unquoted(&mut self, cp: Option<char>) -> State {
        match cp {
            Some(c) if is_html_whitespace(c) && self.opened_mustache.is_none() => {
                self.end_current(self.offset());
                State::BeforeAttributeName
            }
            Some('{') if self.opened_mustache.is_none() => {
                self.brace_start = self.offset();
                self.return_state = State::AttributeValueUnquoted;
                State::XExpressionStart
            }
            Some('}') if self.opened_mustache == Some('{') => {
                self.brace_start = self.offset();
                self.return_state = State::AttributeValueUnquoted;
                State::XExpressionEnd
            }
            Some('>') if self.opened_mustache.is_none() => {
                self.end_current(self.offset());
                self.emit(TokenKind::TagClose, ">", self.offset(), self.unit_end());
                State::Data
            }
            Some('\0') => {
                self.emit_error(ErrorCode::UnexpectedNullCharacter);
                self.append('\0', self.offset(), TokenKind::HtmlLiteral);
                State::AttributeValueUnquoted
            }
            Some(c @ ('"' | '\'' | '<' | '=' | '`')) => {
                self.emit_error(ErrorCode::UnexpectedCharacterInUnquotedAttributeValue);
                self.append(c, self.offset(), TokenKind::HtmlLiteral);
                State::AttributeValueUnquoted
            }
            Some(c) => {
                self.append(c, self.offset(), TokenKind::HtmlLiteral);
                State::AttributeValueUnquoted
            }
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn after_attribute_value_quoted(&mut self, cp: Option<char>) -> State {
        match cp {
            Some(c) if is_html_whitespace(c) => State::BeforeAttributeName,
            Some('/') => {
                self.slash_start = self.offset();
                State::SelfClosingStartTag
            }
            Some('>') => {
                self.emit(TokenKind::TagClose, ">", self.offset(), self.unit_end());
                State::Data
            }
            Some(_) => {
                self.emit_error(ErrorCode::MissingWhitespaceBetweenAttributes);
                self.reconsume(State::BeforeAttributeName)
            }
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn self_closing_start_tag(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('>') => {
                self.emit(
                    TokenKind::SelfClosingTagClose,
                    "/>",
                    self.slash_start,
                    self.unit_end(),
                );
                State::Data
            }
            Some(_) => {
                self.emit_error(ErrorCode::UnexpectedSolidusInTag);
                self.reconsume(State::BeforeAttributeName)
            }
            None => {
                self.emit_error(ErrorCode::EofInTag);
                self.eof_done()
            }
        }
    }

    fn bogus_comment(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('>') => {
                self.end_current(self.unit_end());
                State::Data
            }
            Some('\0') => {
                self.emit_error(ErrorCode::UnexpectedNullCharacter);
                self.append_raw(REPLACEMENT);
                State::BogusComment
            }
            Some(c) => {
                self.append_raw(c);
                State::BogusComment
            }
            None => self.eof_done(),
        }
    }

    fn markup_declaration_open(&mut self, cp: Option<char>) -> State {
        let Some(c) = cp else {
            self.errors.push(ParseError::new(
                ErrorCode::IncorrectlyOpenedComment,
                Span::at(self.tag_start, self.cursor.len()),
            ));
            self.start_token(TokenKind::HtmlBogusComment, self.tag_start);
            let buffer = std::mem::take(&mut self.md_buffer);
            self.append_raw_str(&buffer);
            return self.eof_done();
        };
        self.md_buffer.push(c);

        if "--".starts_with(self.md_buffer.as_str()) {
            if self.md_buffer == "--" {
                self.start_token(TokenKind::HtmlComment, self.tag_start);
                State::CommentStart
            } else {
                State::MarkupDeclarationOpen
            }
        } else if "doctype".starts_with(self.md_buffer.to_ascii_lowercase().as_str()) {
            if self.md_buffer.len() == 7 {
                // The dialect has no document type declaration; swallow it
                // as a bogus comment.
                self.start_token(TokenKind::HtmlBogusComment, self.tag_start);
                let buffer = std::mem::take(&mut self.md_buffer);
                self.append_raw_str(&buffer);
                State::BogusComment
            } else {
                State::MarkupDeclarationOpen
            }
        } else if "[CDATA[".starts_with(self.md_buffer.as_str()) {
            if self.md_buffer.len() == 7 {
                self.errors.push(ParseError::new(
                    ErrorCode::CdataInHtmlContent,
                    Span::at(self.tag_start, self.unit_end()),
                ));
                self.start_token(TokenKind::HtmlBogusComment, self.tag_start);
                let buffer = std::mem::take(&mut self.md_buffer);
                self.append_raw_str(&buffer);
                State::BogusComment
            } else {
                State::MarkupDeclarationOpen
            }
        } else {
            self.errors.push(ParseError::new(
                ErrorCode::IncorrectlyOpenedComment,
                Span::at(self.tag_start, self.offset()),
            ));
            self.md_buffer.pop();
            self.start_token(TokenKind::HtmlBogusComment, self.tag_start);
            let buffer = std::mem::take(&mut self.md_buffer);
            self.append_raw_str(&buffer);
            self.reconsume(State::BogusComment)
        }
    }

    fn comment_start(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('-') => State::CommentStartDash,
            Some('>') => {
                self.emit_error(ErrorCode::AbruptClosingOfEmptyComment);
                self.end_current(self.unit_end());
                State::Data
            }
            Some(_) => self.reconsume(State::Comment),
            None => {
                self.emit_error(ErrorCode::EofInComment);
                self.eof_done()
            }
        }
    }

    fn comment_start_dash(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('-') => State::CommentEnd,
            Some('>') => {
                self.emit_error(ErrorCode::AbruptClosingOfEmptyComment);
                self.end_current(self.unit_end());
                State::Data
            }
            Some(_) => {
                self.append_raw('-');
                self.reconsume(State::Comment)
            }
            None => {
                self.emit_error(ErrorCode::EofInComment);
                self.eof_done()
            }
        }
    }

    fn comment(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('<') => {
                self.append_raw('<');
                State::CommentLessThanSign
            }
            Some('-') => State::CommentEndDash,
            Some('\0') => {
                self.emit_error(ErrorCode::UnexpectedNullCharacter);
                self.append_raw(REPLACEMENT);
                State::Comment
            }
            Some(c) => {
                self.append_raw(c);
                State::Comment
            }
            None => {
                self.emit_error(ErrorCode::EofInComment);
                self.eof_done()
            }
        }
    }

    fn comment_less_than_sign(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('!') => {
                self.append_raw('!');
                State::CommentLessThanSignBang
            }
            Some('<') => {
                self.append_raw('<');
                State::CommentLessThanSign
            }
            _ => self.reconsume(State::Comment),
        }
    }

    fn comment_less_than_sign_bang(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('-') => State::CommentLessThanSignBangDash,
            _ => self.reconsume(State::Comment),
        }
    }

    fn comment_less_than_sign_bang_dash(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('-') => State::CommentLessThanSignBangDashDash,
            _ => self.reconsume(State::CommentEndDash),
        }
    }

    fn comment_less_than_sign_bang_dash_dash(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('>') | None => self.reconsume(State::CommentEnd),
            Some(_) => {
                self.emit_error(ErrorCode::NestedComment);
                self.reconsume(State::CommentEnd)
            }
        }
    }

    fn comment_end_dash(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('-') => State::CommentEnd,
            Some(_) => {
                self.append_raw('-');
                self.reconsume(State::Comment)
            }
            None => {
                self.emit_error(ErrorCode::EofInComment);
                self.eof_done()
            }
        }
    }

    fn comment_end(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('>') => {
                self.end_current(self.unit_end());
                State::Data
            }
            Some('!') => State::CommentEndBang,
            Some('-') => {
                self.append_raw('-');
                State::CommentEnd
            }
            Some(_) => {
                self.append_raw_str("--");
                self.reconsume(State::Comment)
            }
            None => {
                self.emit_error(ErrorCode::EofInComment);
                self.eof_done()
            }
        }
    }

    fn comment_end_bang(&mut self, cp: Option<char>) -> State {
        match cp {
            Some('-') => {
                self.append_raw_str("--!");
                State::CommentEndDash
            }
            Some('>') => {
                self.emit_error(ErrorCode::IncorrectlyClosedComment);
                self.end_current(self.unit_end());
                State::Data
            }
            Some(_) => {
                self.append_raw_str("--!");
                self.reconsume(State::Comment)
            }
            None => {
                self.emit_error(ErrorCode::EofInComment);
                self.eof_done()
            }
        }
    }

    /// A `{` was seen where a mustache may open; decide on the next
    /// character.
    fn x_expression_start(&mut self, cp: Option<char>) -> State {
        let in_quoted_value = matches!(
            self.return_state,
            State::AttributeValueDoubleQuoted | State::AttributeValueSingleQuoted
        );
        match cp {
            Some('{') => {
                self.end_current(self.brace_start);
                self.emit(
                    TokenKind::MustacheStart,
                    "{{",
                    self.brace_start,
                    self.unit_end(),
                );
                self.opened_mustache = Some('{');
                self.return_state
            }
            Some('=') if in_quoted_value => {
                self.end_current(self.brace_start);
                self.emit(
                    TokenKind::MustacheStart,
                    "{=",
                    self.brace_start,
                    self.unit_end(),
                );
                self.opened_mustache = Some('=');
                self.return_state
            }
            Some(_) => {
                self.append_pending_brace('{');
                self.reconsume(self.return_state)
            }
            None => {
                self.append_pending_brace('{');
                self.eof_done()
            }
        }
    }

    /// The first character of a potential closer was seen; decide on the
    /// next one.
    fn x_expression_end(&mut self, cp: Option<char>) -> State {
        let opener = self.opened_mustache;
        match (opener, cp) {
            (Some('{'), Some('}')) => {
                // In a `}}}` run the close shifts right by one so that the
                // innermost braces stay with the payload.
                if self.cursor.peek() == Some('}') {
                    self.append_pending_brace('}');
                    self.brace_start = self.offset();
                    State::XExpressionEnd
                } else {
                    self.end_current(self.brace_start);
                    self.emit(
                        TokenKind::MustacheEnd,
                        "}}",
                        self.brace_start,
                        self.unit_end(),
                    );
                    self.opened_mustache = None;
                    self.return_state
                }
            }
            (Some('='), Some('}')) => {
                self.end_current(self.brace_start);
                self.emit(
                    TokenKind::MustacheEnd,
                    "=}",
                    self.brace_start,
                    self.unit_end(),
                );
                self.opened_mustache = None;
                self.return_state
            }
            (Some('='), Some(_)) => {
                self.append_pending_brace('=');
                self.reconsume(self.return_state)
            }
            (_, Some(_)) => {
                self.append_pending_brace('}');
                self.reconsume(self.return_state)
            }
            (_, None) => {
                self.append_pending_brace(if opener == Some('=') { '=' } else { '}' });
                self.eof_done()
            }
        }
    }

    /// Appends the delimiter character that failed to open or close a
    /// mustache, as ordinary content of the return state.
    fn append_pending_brace(&mut self, c: char) {
        let base_kind = match self.return_state {
            State::Rcdata => TokenKind::RcDataText,
            State::Rawtext => TokenKind::RawText,
            State::AttributeValueDoubleQuoted
            | State::AttributeValueSingleQuoted
            | State::AttributeValueUnquoted => TokenKind::HtmlLiteral,
            _ => TokenKind::Text,
        };
        self.append(c, self.brace_start, base_kind);
    }
}

fn is_html_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\x0C')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(source: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(source);
        let mut tokens = Vec::new();
        while let Some(t) = tokenizer.next_token() {
            tokens.push(t);
        }
        tokens
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_tag() {
        assert_eq!(
            kinds("<view>"),
            vec![TokenKind::TagOpen, TokenKind::TagClose]
        );
    }

    #[test]
    fn test_tag_name_lowercased() {
        let tokens = tokenize("<View>");
        assert_eq!(tokens[0].kind, TokenKind::TagOpen);
        assert_eq!(tokens[0].value, "view");
        assert_eq!(tokens[0].span, Span::at(0, 5));
    }

    #[test]
    fn test_self_closing_tag() {
        assert_eq!(
            kinds("<view/>"),
            vec![TokenKind::TagOpen, TokenKind::SelfClosingTagClose]
        );
    }

    #[test]
    fn test_end_tag() {
        let tokens = tokenize("</view>");
        assert_eq!(tokens[0].kind, TokenKind::EndTagOpen);
        assert_eq!(tokens[0].value, "view");
        assert_eq!(tokens[1].kind, TokenKind::TagClose);
    }

    #[test]
    fn test_attribute_tokens() {
        assert_eq!(
            kinds(r#"<view class="a">"#),
            vec![
                TokenKind::TagOpen,
                TokenKind::HtmlIdentifier,
                TokenKind::Association,
                TokenKind::Quote,
                TokenKind::HtmlLiteral,
                TokenKind::Quote,
                TokenKind::TagClose,
            ]
        );
    }

    #[test]
    fn test_attribute_name_lowercased() {
        let tokens = tokenize("<view DATA-x='1'>");
        assert_eq!(tokens[1].kind, TokenKind::HtmlIdentifier);
        assert_eq!(tokens[1].value, "data-x");
    }

    #[test]
    fn test_mustache_in_data() {
        let tokens = tokenize("{{ name }}");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::MustacheStart,
                TokenKind::Text,
                TokenKind::MustacheEnd
            ]
        );
        assert_eq!(tokens[0].value, "{{");
        assert_eq!(tokens[1].value, " name ");
        assert_eq!(tokens[2].value, "}}");
        assert_eq!(tokens[2].span, Span::at(8, 10));
    }

    #[test]
    fn test_single_brace_is_text() {
        let tokens = tokenize("{a}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Text);
        assert_eq!(tokens[0].value, "{a}");
    }

    #[test]
    fn test_lone_closing_braces_are_text() {
        let tokens = tokenize("a}}b");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].value, "a}}b");
    }

    #[test]
    fn test_tag_open_disabled_inside_mustache() {
        let tokens = tokenize("{{ a < b }}");
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                TokenKind::MustacheStart,
                TokenKind::Text,
                TokenKind::MustacheEnd
            ]
        );
        assert_eq!(tokens[1].value, " a < b ");
    }

    #[test]
    fn test_triple_brace_close_shifts() {
        let tokens = tokenize("{{{a:1}}}");
        assert_eq!(tokens[0].value, "{{");
        assert_eq!(tokens[1].value, "{a:1}");
        assert_eq!(tokens[2].kind, TokenKind::MustacheEnd);
        assert_eq!(tokens[2].span, Span::at(7, 9));
    }

    #[test]
    fn test_two_way_mustache_in_quoted_value() {
        let tokens = tokenize(r#"<input value="{= model =}">"#);
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::TagOpen,
                TokenKind::HtmlIdentifier,
                TokenKind::Association,
                TokenKind::Quote,
                TokenKind::MustacheStart,
                TokenKind::Text,
                TokenKind::MustacheEnd,
                TokenKind::Quote,
                TokenKind::TagClose,
            ]
        );
        assert_eq!(tokens[4].value, "{=");
        assert_eq!(tokens[6].value, "=}");
    }

    #[test]
    fn test_two_way_opener_not_recognised_in_data() {
        let tokens = tokenize("{= a =}");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Text);
    }

    #[test]
    fn test_comment() {
        let tokens = tokenize("<!-- hi -->");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::HtmlComment);
        assert_eq!(tokens[0].value, " hi ");
        assert_eq!(tokens[0].span, Span::at(0, 11));
    }

    #[test]
    fn test_unclosed_comment_reports_eof() {
        let mut tokenizer = Tokenizer::new("<!-- hi");
        while tokenizer.next_token().is_some() {}
        let errors = tokenizer.take_errors();
        assert!(errors.iter().any(|e| e.code == ErrorCode::EofInComment));
    }

    #[test]
    fn test_bogus_comment() {
        let tokens = tokenize("<?xml?>");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::HtmlBogusComment);
    }

    #[test]
    fn test_rawtext_provisional_promote() {
        let mut tokenizer = Tokenizer::new("<filter>var x;</filter>");
        let mut tokens = Vec::new();
        loop {
            let Some(t) = tokenizer.next_token() else { break };
            if t.kind == TokenKind::TagClose && tokens.len() == 1 {
                tokenizer.set_state(State::Rawtext);
            }
            tokens.push(t);
        }
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::TagOpen,
                TokenKind::TagClose,
                TokenKind::RawText,
                TokenKind::EndTagOpen,
                TokenKind::TagClose,
            ]
        );
        assert_eq!(tokens[2].value, "var x;");
    }

    #[test]
    fn test_rawtext_provisional_rollback() {
        // `</filte>` does not match the open tag and must be re-emitted as
        // raw text.
        let mut tokenizer = Tokenizer::new("<filter>a</filte>b</filter>");
        let mut tokens = Vec::new();
        loop {
            let Some(t) = tokenizer.next_token() else { break };
            if t.kind == TokenKind::TagClose && tokens.len() == 1 {
                tokenizer.set_state(State::Rawtext);
            }
            tokens.push(t);
        }
        let text: String = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::RawText)
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(text, "a</filte>b");
        assert!(tokens.iter().any(|t| t.kind == TokenKind::EndTagOpen));
        // Committed tokens stay monotonic in source offset.
        let mut last = 0u32;
        for t in &tokens {
            assert!(u32::from(t.span.start) >= last);
            last = u32::from(t.span.start);
        }
    }

    #[test]
    fn test_null_in_data_replaced() {
        let tokens = tokenize("a\0b");
        assert_eq!(tokens[0].value, "a\u{FFFD}b");
    }

    #[test]
    fn test_null_in_attribute_value_kept() {
        let tokens = tokenize("<view a=\"x\0\">");
        let lit = tokens
            .iter()
            .find(|t| t.kind == TokenKind::HtmlLiteral)
            .unwrap();
        assert_eq!(lit.value, "x\0");
    }

    #[test]
    fn test_crlf_collapsed_in_value() {
        let tokens = tokenize("a\r\nb");
        let joined: String = tokens.iter().map(|t| t.value.as_str()).collect();
        assert_eq!(joined, "a\nb");
        // The collapsed pair keeps token spans contiguous over both bytes.
        assert_eq!(tokens[0].span, Span::at(0, 1));
        assert_eq!(tokens[1].span, Span::at(1, 3));
        assert_eq!(tokens[2].span, Span::at(3, 4));
    }

    #[test]
    fn test_whitespace_token_split() {
        let kinds = kinds("a b");
        assert_eq!(
            kinds,
            vec![TokenKind::Text, TokenKind::Whitespace, TokenKind::Text]
        );
    }

    #[test]
    fn test_unquoted_attribute_value() {
        let tokens = tokenize("<view a=b>");
        let lit = tokens
            .iter()
            .find(|t| t.kind == TokenKind::HtmlLiteral)
            .unwrap();
        assert_eq!(lit.value, "b");
    }

    #[test]
    fn test_missing_end_tag_name() {
        let mut tokenizer = Tokenizer::new("</>");
        while tokenizer.next_token().is_some() {}
        let errors = tokenizer.take_errors();
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::MissingEndTagName));
    }

    #[test]
    fn test_eof_closes_open_token() {
        let tokens = tokenize("hello");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].span, Span::at(0, 5));
    }
}
