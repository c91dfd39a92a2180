//! Intermediate tokenizer: merges the low-level token stream into coarser
//! start-tag / end-tag / text / mustache records for the tree builder.
//!
//! Text-family tokens merge only while they stay contiguous (`prev.end ==
//! next.start`); a gap commits the run. While a mustache is pending, text
//! tokens accumulate into the expression buffer instead. Every committed
//! token is also appended to the document token list here, comments to the
//! comment list.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use swan_source::{Span, TextSize};

use crate::ast::{AttributeNode, XAttribute, XAttributeValuePiece, XIdentifier, XLiteral, XMustache};
use crate::error::{ErrorCode, ParseError};
use crate::token::{Token, TokenKind};
use crate::tokenizer::{State, Tokenizer};

/// A coarse record produced by the intermediate tokenizer.
#[derive(Debug)]
pub enum IntermediateToken {
    StartTag(StartTag),
    EndTag(EndTag),
    Text(IntermediateText),
    Mustache(IntermediateMustache),
}

/// A completed start tag with its assembled attributes.
#[derive(Debug)]
pub struct StartTag {
    pub span: Span,
    pub name: SmolStr,
    pub raw_name: SmolStr,
    pub self_closing: bool,
    pub attributes: Vec<AttributeNode>,
}

/// A completed end tag.
#[derive(Debug)]
pub struct EndTag {
    pub span: Span,
    pub name: SmolStr,
    pub raw_name: SmolStr,
}

/// A merged text run.
#[derive(Debug)]
pub struct IntermediateText {
    pub span: Span,
    pub value: String,
}

/// A completed mustache outside any attribute value.
#[derive(Debug)]
pub struct IntermediateMustache {
    pub span: Span,
    pub start_token: Token,
    pub end_token: Token,
    /// The concatenated payload between the delimiters.
    pub value: String,
}

/// A tag under construction.
struct TagBuild {
    is_end: bool,
    start: TextSize,
    name: SmolStr,
    raw_name: SmolStr,
    attributes: Vec<AttributeNode>,
    attr_names: FxHashSet<SmolStr>,
    current_attr: Option<AttrBuild>,
    end_tag_attr_reported: bool,
}

/// An attribute under construction.
struct AttrBuild {
    key: XIdentifier,
    value: Vec<XAttributeValuePiece>,
    end: TextSize,
}

impl AttrBuild {
    fn finish(self) -> AttributeNode {
        AttributeNode::Plain(XAttribute {
            span: Span {
                start: self.key.span.start,
                end: self.end,
            },
            key: self.key,
            value: self.value,
        })
    }
}

/// A mustache waiting for its closing delimiter.
struct PendingExpression {
    start_token: Token,
    value: String,
    end: TextSize,
}

/// The intermediate tokenizer.
pub struct IntermediateTokenizer<'src> {
    source: &'src str,
    tokenizer: Tokenizer<'src>,
    text: Option<IntermediateText>,
    tag: Option<TagBuild>,
    expression: Option<PendingExpression>,
    tokens: Vec<Token>,
    comments: Vec<Token>,
    errors: Vec<ParseError>,
    eof: bool,
}

impl<'src> IntermediateTokenizer<'src> {
    /// Creates an intermediate tokenizer over the given source.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            tokenizer: Tokenizer::new(source),
            text: None,
            tag: None,
            expression: None,
            tokens: Vec::new(),
            comments: Vec::new(),
            errors: Vec::new(),
            eof: false,
        }
    }

    /// Returns the next record, or `None` once the input is exhausted.
    pub fn next(&mut self) -> Option<IntermediateToken> {
        loop {
            if self.eof {
                return self.flush_eof();
            }
            match self.tokenizer.next_token() {
                Some(token) => {
                    if let Some(record) = self.process(token) {
                        return Some(record);
                    }
                }
                None => {
                    self.eof = true;
                }
            }
        }
    }

    /// Switches the underlying tokenizer's content model.
    pub fn set_tokenizer_state(&mut self, state: State) {
        self.tokenizer.set_state(state);
    }

    /// The committed document token stream so far.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Mutable access for expression token splicing.
    pub fn tokens_mut(&mut self) -> &mut Vec<Token> {
        &mut self.tokens
    }

    /// The comment stream so far.
    pub fn comments_mut(&mut self) -> &mut Vec<Token> {
        &mut self.comments
    }

    /// Absolute offsets of LFs elided by CRLF collapsing.
    pub fn gaps(&self) -> &[TextSize] {
        self.tokenizer.gaps()
    }

    /// Absolute offsets of line terminators.
    pub fn line_terminators(&self) -> &[TextSize] {
        self.tokenizer.line_terminators()
    }

    /// Byte length of the source.
    pub fn source_len(&self) -> usize {
        self.tokenizer.source_len()
    }

    /// Drains every error collected across the cursor, tokenizer and this
    /// layer.
    pub fn take_errors(&mut self) -> Vec<ParseError> {
        let mut errors = self.tokenizer.take_errors();
        errors.append(&mut self.errors);
        errors
    }

    /// Takes the final token and comment streams.
    pub fn take_streams(&mut self) -> (Vec<Token>, Vec<Token>) {
        (
            std::mem::take(&mut self.tokens),
            std::mem::take(&mut self.comments),
        )
    }

    fn process(&mut self, token: Token) -> Option<IntermediateToken> {
        if token.kind.is_comment() {
            self.comments.push(token);
            return None;
        }
        self.tokens.push(token.clone());

        match token.kind {
            k if k.is_text() => self.process_text(token),
            TokenKind::TagOpen => self.process_tag_open(token, false),
            TokenKind::EndTagOpen => self.process_tag_open(token, true),
            TokenKind::HtmlIdentifier => self.process_identifier(token),
            TokenKind::Association | TokenKind::Quote => {
                let flushed = self.interrupt_expression(token.span);
                if let Some(tag) = &mut self.tag {
                    if let Some(attr) = &mut tag.current_attr {
                        attr.end = token.span.end;
                    }
                }
                flushed
            }
            TokenKind::HtmlLiteral => {
                if let Some(tag) = &mut self.tag {
                    if let Some(attr) = &mut tag.current_attr {
                        attr.value.push(XAttributeValuePiece::Literal(XLiteral {
                            span: token.span,
                            value: token.value,
                        }));
                        attr.end = token.span.end;
                    }
                }
                None
            }
            TokenKind::MustacheStart => {
                let flushed = self.commit_text();
                self.expression = Some(PendingExpression {
                    end: token.span.end,
                    start_token: token,
                    value: String::new(),
                });
                flushed
            }
            TokenKind::MustacheEnd => self.process_mustache_end(token),
            TokenKind::TagClose => self.finish_tag(token.span.end, false),
            TokenKind::SelfClosingTagClose => self.finish_tag(token.span.end, true),
            _ => None,
        }
    }

    fn process_text(&mut self, token: Token) -> Option<IntermediateToken> {
        if let Some(expr) = &mut self.expression {
            if expr.end == token.span.start {
                expr.value.push_str(&token.value);
                expr.end = token.span.end;
                return None;
            }
            // A gap inside a pending expression: the run so far degrades to
            // plain content and the new token starts fresh. Any preceding
            // text was already flushed when the mustache opened, so the
            // degrade cannot itself displace a run.
            let flushed = self.degrade_expression(false);
            debug_assert!(flushed.is_none());
            return self.append_text(token);
        }
        self.append_text(token)
    }

    fn append_text(&mut self, token: Token) -> Option<IntermediateToken> {
        match &mut self.text {
            Some(text) if text.span.end == token.span.start => {
                text.value.push_str(&token.value);
                text.span.end = token.span.end;
                None
            }
            Some(_) => {
                let flushed = self.commit_text();
                self.start_text(token);
                flushed
            }
            None => {
                self.start_text(token);
                None
            }
        }
    }

    fn start_text(&mut self, token: Token) {
        self.text = Some(IntermediateText {
            span: token.span,
            value: token.value,
        });
    }

    fn commit_text(&mut self) -> Option<IntermediateToken> {
        self.text.take().map(IntermediateToken::Text)
    }

    fn process_tag_open(&mut self, token: Token, is_end: bool) -> Option<IntermediateToken> {
        let flushed = self
            .interrupt_expression(token.span)
            .or_else(|| self.commit_text());
        let raw_start = usize::from(token.span.start) + if is_end { 2 } else { 1 };
        let raw_name = &self.source[raw_start..usize::from(token.span.end)];
        self.tag = Some(TagBuild {
            is_end,
            start: token.span.start,
            name: SmolStr::new(&token.value),
            raw_name: SmolStr::new(raw_name),
            attributes: Vec::new(),
            attr_names: FxHashSet::default(),
            current_attr: None,
            end_tag_attr_reported: false,
        });
        flushed
    }

    fn process_identifier(&mut self, token: Token) -> Option<IntermediateToken> {
        let flushed = self.interrupt_expression(token.span);
        let raw_name = &self.source[usize::from(token.span.start)..usize::from(token.span.end)];
        let mut report_end_tag_attr = false;
        let mut report_duplicate = false;

        match &mut self.tag {
            Some(tag) => {
                if tag.is_end && !tag.end_tag_attr_reported {
                    tag.end_tag_attr_reported = true;
                    report_end_tag_attr = true;
                }

                if let Some(attr) = tag.current_attr.take() {
                    tag.attributes.push(attr.finish());
                }

                let name = SmolStr::new(&token.value);
                report_duplicate = !tag.attr_names.insert(name.clone());
                tag.current_attr = Some(AttrBuild {
                    key: XIdentifier {
                        span: token.span,
                        name,
                        raw_name: SmolStr::new(raw_name),
                    },
                    value: Vec::new(),
                    end: token.span.end,
                });
            }
            None => {
                // An identifier outside a tag is a tokenizer bug.
                self.errors
                    .push(ParseError::new(ErrorCode::Unreachable, token.span));
                return flushed;
            }
        }

        if report_end_tag_attr {
            self.errors
                .push(ParseError::new(ErrorCode::EndTagWithAttributes, token.span));
        }
        if report_duplicate {
            self.errors
                .push(ParseError::new(ErrorCode::DuplicateAttribute, token.span));
        }
        flushed
    }

    fn process_mustache_end(&mut self, token: Token) -> Option<IntermediateToken> {
        let Some(expr) = self.expression.take() else {
            // A stray closer: surface it as text content.
            let mut text_token = token;
            text_token.kind = TokenKind::Text;
            return self.append_text(text_token);
        };

        let span = Span {
            start: expr.start_token.span.start,
            end: token.span.end,
        };
        let mustache = XMustache {
            span,
            start_token: expr.start_token.clone(),
            end_token: token.clone(),
            value: None,
        };

        if let Some(tag) = &mut self.tag {
            if let Some(attr) = &mut tag.current_attr {
                attr.value.push(XAttributeValuePiece::Mustache(mustache));
                attr.end = span.end;
                return None;
            }
        }

        Some(IntermediateToken::Mustache(IntermediateMustache {
            span,
            start_token: expr.start_token,
            end_token: token,
            value: expr.value,
        }))
    }

    fn finish_tag(&mut self, end: TextSize, self_closing: bool) -> Option<IntermediateToken> {
        if self.expression.is_some() {
            self.degrade_expression(true);
        }
        let Some(mut tag) = self.tag.take() else {
            return None;
        };
        if let Some(attr) = tag.current_attr.take() {
            tag.attributes.push(attr.finish());
        }
        let span = Span {
            start: tag.start,
            end,
        };
        if tag.is_end {
            if self_closing {
                self.errors.push(ParseError::new(
                    ErrorCode::EndTagWithTrailingSolidus,
                    span,
                ));
            }
            Some(IntermediateToken::EndTag(EndTag {
                span,
                name: tag.name,
                raw_name: tag.raw_name,
            }))
        } else {
            Some(IntermediateToken::StartTag(StartTag {
                span,
                name: tag.name,
                raw_name: tag.raw_name,
                self_closing,
                attributes: tag.attributes,
            }))
        }
    }

    /// A non-text token arrived while a mustache was pending: the mustache
    /// is unterminated. Degrades the buffered content and reports it.
    fn interrupt_expression(&mut self, _at: Span) -> Option<IntermediateToken> {
        if self.expression.is_some() {
            self.degrade_expression(true)
        } else {
            None
        }
    }

    /// Converts a pending, never-closed mustache into literal content: a
    /// text run in data context, an `XLiteral` piece inside an attribute.
    fn degrade_expression(&mut self, report: bool) -> Option<IntermediateToken> {
        let expr = self.expression.take()?;
        if report {
            self.errors.push(ParseError::new(
                ErrorCode::MissingExpressionEndTag,
                expr.start_token.span,
            ));
        }
        let span = Span {
            start: expr.start_token.span.start,
            end: expr.end,
        };
        let mut value = expr.start_token.value;
        value.push_str(&expr.value);

        if let Some(tag) = &mut self.tag {
            if let Some(attr) = &mut tag.current_attr {
                attr.value
                    .push(XAttributeValuePiece::Literal(XLiteral { span, value }));
                attr.end = span.end;
                return None;
            }
        }

        let flushed = self.commit_text();
        match &mut self.text {
            Some(text) if text.span.end == span.start => {
                text.value.push_str(&value);
                text.span.end = span.end;
            }
            _ => self.text = Some(IntermediateText { span, value }),
        }
        flushed
    }

    fn flush_eof(&mut self) -> Option<IntermediateToken> {
        if self.expression.is_some() {
            if let Some(record) = self.degrade_expression(true) {
                return Some(record);
            }
        }
        if self.tag.is_some() {
            // A tag cut off by end of input is still surfaced so its
            // attributes reach the tree.
            let end = TextSize::from(self.tokenizer.source_len() as u32);
            if let Some(record) = self.finish_tag(end, false) {
                return Some(record);
            }
        }
        self.commit_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(source: &str) -> Vec<IntermediateToken> {
        let mut it = IntermediateTokenizer::new(source);
        let mut out = Vec::new();
        while let Some(r) = it.next() {
            out.push(r);
        }
        out
    }

    #[test]
    fn test_start_tag_record() {
        let recs = records("<view class=\"a\">");
        assert_eq!(recs.len(), 1);
        let IntermediateToken::StartTag(tag) = &recs[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.name, "view");
        assert!(!tag.self_closing);
        assert_eq!(tag.attributes.len(), 1);
        let AttributeNode::Plain(attr) = &tag.attributes[0] else {
            panic!("expected plain attribute");
        };
        assert_eq!(attr.key.name, "class");
        assert_eq!(attr.value.len(), 1);
    }

    #[test]
    fn test_raw_name_preserves_case() {
        let recs = records("<View Class=\"a\"/>");
        let IntermediateToken::StartTag(tag) = &recs[0] else {
            panic!("expected start tag");
        };
        assert_eq!(tag.name, "view");
        assert_eq!(tag.raw_name, "View");
        assert!(tag.self_closing);
        let AttributeNode::Plain(attr) = &tag.attributes[0] else {
            panic!("expected plain attribute");
        };
        assert_eq!(attr.key.name, "class");
        assert_eq!(attr.key.raw_name, "Class");
    }

    #[test]
    fn test_text_merging() {
        // "hello world" tokenizes as text/whitespace/text but merges into
        // one record.
        let recs = records("hello world");
        assert_eq!(recs.len(), 1);
        let IntermediateToken::Text(text) = &recs[0] else {
            panic!("expected text");
        };
        assert_eq!(text.value, "hello world");
    }

    #[test]
    fn test_mustache_record() {
        let recs = records("{{ name }}");
        assert_eq!(recs.len(), 1);
        let IntermediateToken::Mustache(m) = &recs[0] else {
            panic!("expected mustache");
        };
        assert_eq!(m.value, " name ");
        assert_eq!(m.start_token.value, "{{");
        assert_eq!(m.end_token.value, "}}");
    }

    #[test]
    fn test_text_then_mustache() {
        let recs = records("hi{{x}}");
        assert_eq!(recs.len(), 2);
        assert!(matches!(recs[0], IntermediateToken::Text(_)));
        assert!(matches!(recs[1], IntermediateToken::Mustache(_)));
    }

    #[test]
    fn test_attribute_mustache_piece() {
        let recs = records("<view s-if=\"{{cond}}\">");
        let IntermediateToken::StartTag(tag) = &recs[0] else {
            panic!("expected start tag");
        };
        let AttributeNode::Plain(attr) = &tag.attributes[0] else {
            panic!("expected plain attribute");
        };
        assert_eq!(attr.value.len(), 1);
        assert!(matches!(attr.value[0], XAttributeValuePiece::Mustache(_)));
    }

    #[test]
    fn test_mixed_attribute_value() {
        let recs = records("<view class=\"a {{b}} c\">");
        let IntermediateToken::StartTag(tag) = &recs[0] else {
            panic!("expected start tag");
        };
        let AttributeNode::Plain(attr) = &tag.attributes[0] else {
            panic!("expected plain attribute");
        };
        assert_eq!(attr.value.len(), 3);
        assert!(matches!(attr.value[0], XAttributeValuePiece::Literal(_)));
        assert!(matches!(attr.value[1], XAttributeValuePiece::Mustache(_)));
        assert!(matches!(attr.value[2], XAttributeValuePiece::Literal(_)));
    }

    #[test]
    fn test_duplicate_attribute_reported() {
        let mut it = IntermediateTokenizer::new("<view class=\"a\" class=\"b\">");
        while it.next().is_some() {}
        let errors = it.take_errors();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.code == ErrorCode::DuplicateAttribute)
                .count(),
            1
        );
    }

    #[test]
    fn test_unterminated_mustache_at_eof() {
        let mut it = IntermediateTokenizer::new("{{cond");
        let mut recs = Vec::new();
        while let Some(r) = it.next() {
            recs.push(r);
        }
        assert_eq!(recs.len(), 1);
        let IntermediateToken::Text(text) = &recs[0] else {
            panic!("expected degraded text");
        };
        assert_eq!(text.value, "{{cond");
        let errors = it.take_errors();
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::MissingExpressionEndTag));
    }

    #[test]
    fn test_unterminated_mustache_in_attribute() {
        let mut it = IntermediateTokenizer::new("<view s-if=\"{{cond\"></view>");
        let mut tags = Vec::new();
        while let Some(r) = it.next() {
            tags.push(r);
        }
        let IntermediateToken::StartTag(tag) = &tags[0] else {
            panic!("expected start tag");
        };
        let AttributeNode::Plain(attr) = &tag.attributes[0] else {
            panic!("expected plain attribute");
        };
        assert_eq!(attr.value.len(), 1);
        let XAttributeValuePiece::Literal(lit) = &attr.value[0] else {
            panic!("expected degraded literal");
        };
        assert_eq!(lit.value, "{{cond");
        let errors = it.take_errors();
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::MissingExpressionEndTag));
        // The end tag must still be recognised.
        assert!(tags
            .iter()
            .any(|r| matches!(r, IntermediateToken::EndTag(_))));
    }

    #[test]
    fn test_comment_routed_to_comments() {
        let mut it = IntermediateTokenizer::new("a<!-- c -->b");
        let mut recs = Vec::new();
        while let Some(r) = it.next() {
            recs.push(r);
        }
        // The comment splits the text run.
        assert_eq!(recs.len(), 2);
        let (tokens, comments) = it.take_streams();
        assert_eq!(comments.len(), 1);
        assert_eq!(comments[0].value, " c ");
        assert!(tokens.iter().all(|t| !t.kind.is_comment()));
    }

    #[test]
    fn test_end_tag_with_attributes_reported() {
        let mut it = IntermediateTokenizer::new("</view a=\"1\">");
        while it.next().is_some() {}
        let errors = it.take_errors();
        assert!(errors
            .iter()
            .any(|e| e.code == ErrorCode::EndTagWithAttributes));
    }

    #[test]
    fn test_tokens_sorted_and_non_overlapping() {
        let mut it = IntermediateTokenizer::new("<view a=\"{{x}} y\">txt</view>");
        while it.next().is_some() {}
        let (tokens, _) = it.take_streams();
        for pair in tokens.windows(2) {
            assert!(pair[0].span.end <= pair[1].span.start);
        }
    }
}
