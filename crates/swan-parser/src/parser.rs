//! Tree builder: consumes intermediate records and assembles the document.
//!
//! Maintains the open-element stack, applies the dialect's content-model
//! rules, converts directive attributes, and hands expression payloads to
//! the script backend, splicing the returned sub-ASTs and tokens back into
//! the template's coordinate space.

use smol_str::SmolStr;
use swan_source::{LineIndex, LocationCalculator, Span, TextSize};
use swc_common::BytePos;
use swc_ecma_ast::{Expr, Ident};

use crate::ast::*;
use crate::directive::{parse_directive_key, split_for_expression, DirectiveKeyMatch};
use crate::error::{ErrorCode, ParseError};
use crate::intermediate::{
    EndTag, IntermediateMustache, IntermediateText, IntermediateToken, IntermediateTokenizer,
    StartTag,
};
use crate::script::{self, ScriptError};
use crate::token::{Token, TokenKind};
use crate::tokenizer::State;
use crate::{
    ParserOptions, SWAN_CAN_BE_LEFT_OPEN_TAGS, SWAN_RAWTEXT_TAGS, SWAN_RCDATA_TAGS,
    SWAN_VOID_ELEMENT_TAGS,
};

/// The template tree builder.
pub struct Parser<'src> {
    intermediate: IntermediateTokenizer<'src>,
    options: ParserOptions,
    stack: Vec<XElement>,
    document: XDocument,
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    /// Creates a parser over the given source.
    pub fn new(source: &'src str, options: ParserOptions) -> Self {
        Self {
            intermediate: IntermediateTokenizer::new(source),
            options,
            stack: Vec::new(),
            document: XDocument::default(),
            errors: Vec::new(),
        }
    }

    /// Parses the source into a document. Never fails: malformed input is
    /// recovered and recorded on the document's error list.
    pub fn parse(mut self) -> XDocument {
        while let Some(record) = self.intermediate.next() {
            match record {
                IntermediateToken::StartTag(tag) => self.process_start_tag(tag),
                IntermediateToken::EndTag(tag) => self.process_end_tag(tag),
                IntermediateToken::Text(text) => self.process_text(text),
                IntermediateToken::Mustache(mustache) => self.process_mustache_record(mustache),
            }
        }
        self.finish()
    }

    // === Record processing ===

    fn process_start_tag(&mut self, tag: StartTag) {
        if let Some(top) = self.stack.last() {
            if SWAN_CAN_BE_LEFT_OPEN_TAGS.contains(&top.name.as_str()) && top.name == tag.name {
                self.pop_element(None);
            }
        }

        let element = XElement {
            span: tag.span,
            name: tag.name,
            raw_name: tag.raw_name,
            start_tag: XStartTag {
                span: tag.span,
                self_closing: tag.self_closing,
                attributes: tag.attributes,
            },
            children: Vec::new(),
            end_tag: None,
            variables: Vec::new(),
        };
        self.stack.push(element);

        let attr_count = self.stack.last().unwrap().start_tag.attributes.len();
        for index in 0..attr_count {
            self.process_attribute(index);
        }

        let top = self.stack.last().unwrap();
        let name = top.name.as_str();
        let self_closing = top.start_tag.self_closing;

        if SWAN_VOID_ELEMENT_TAGS.contains(&name) || self_closing {
            self.pop_element(None);
        } else if SWAN_RCDATA_TAGS.contains(&name) {
            self.intermediate.set_tokenizer_state(State::Rcdata);
        } else if SWAN_RAWTEXT_TAGS.contains(&name) {
            self.intermediate.set_tokenizer_state(State::Rawtext);
        }
    }

    fn process_end_tag(&mut self, tag: EndTag) {
        let Some(found) = self.stack.iter().rposition(|el| el.name == tag.name) else {
            self.errors
                .push(ParseError::new(ErrorCode::XInvalidEndTag, tag.span));
            return;
        };
        while self.stack.len() > found + 1 {
            self.pop_element(None);
        }
        self.pop_element(Some(XEndTag { span: tag.span }));
    }

    fn process_text(&mut self, text: IntermediateText) {
        let is_module_body = self.options.parse_expression
            && self.stack.last().is_some_and(|el| {
                SWAN_RAWTEXT_TAGS.contains(&el.name.as_str())
                    && el.children.is_empty()
                    && !has_src_attribute(el)
            });

        if is_module_body {
            let gaps = self.intermediate.gaps().to_vec();
            let calc = LocationCalculator::new(&gaps, text.span.start);
            match script::parse_script_module(&text.value, &calc, &self.options.script) {
                Ok(parsed) => {
                    self.splice_tokens(text.span, parsed.tokens);
                    let mut comments = parsed.comments;
                    self.intermediate.comments_mut().append(&mut comments);
                    self.resolve_references(&parsed.references);
                    self.attach(XNode::Module(XModule {
                        span: text.span,
                        body: parsed.body,
                        references: parsed.references,
                    }));
                    return;
                }
                Err(error) => self.push_script_error(error),
            }
        }

        self.attach(XNode::Text(XText {
            span: text.span,
            value: text.value,
        }));
    }

    fn process_mustache_record(&mut self, record: IntermediateMustache) {
        let mut mustache = XMustache {
            span: record.span,
            start_token: record.start_token,
            end_token: record.end_token,
            value: None,
        };
        if self.options.parse_expression {
            self.process_mustache(&mut mustache, false);
        }
        self.attach(XNode::Mustache(mustache));
    }

    // === Attributes and directives ===

    fn process_attribute(&mut self, index: usize) {
        let top = self.stack.len() - 1;
        let placeholder = AttributeNode::Plain(XAttribute {
            span: Span::default(),
            key: XIdentifier {
                span: Span::default(),
                name: SmolStr::default(),
                raw_name: SmolStr::default(),
            },
            value: Vec::new(),
        });
        let attr = std::mem::replace(
            &mut self.stack[top].start_tag.attributes[index],
            placeholder,
        );

        let processed = match attr {
            AttributeNode::Plain(plain) => self.convert_attribute(plain),
            directive => directive,
        };
        self.stack[top].start_tag.attributes[index] = processed;
    }

    fn convert_attribute(&mut self, mut attr: XAttribute) -> AttributeNode {
        match parse_directive_key(&attr.key) {
            DirectiveKeyMatch::Directive(key) => {
                let is_for = key.prefix == DirectivePrefix::S && key.name == "for";
                let mut value = attr.value;
                self.process_value_pieces(&mut value, true, is_for);
                AttributeNode::Directive(XDirective {
                    span: attr.span,
                    key,
                    value,
                })
            }
            DirectiveKeyMatch::Invalid => {
                self.errors
                    .push(ParseError::new(ErrorCode::XInvalidDirective, attr.key.span));
                self.process_value_pieces(&mut attr.value, false, false);
                AttributeNode::Plain(attr)
            }
            DirectiveKeyMatch::NotADirective => {
                self.process_value_pieces(&mut attr.value, false, false);
                AttributeNode::Plain(attr)
            }
        }
    }

    /// Converts a directive's single-literal value into an expression, and
    /// post-processes every mustache piece in place.
    fn process_value_pieces(
        &mut self,
        pieces: &mut [XAttributeValuePiece],
        is_directive: bool,
        is_for: bool,
    ) {
        if !self.options.parse_expression {
            return;
        }

        if is_directive && pieces.len() == 1 {
            if let XAttributeValuePiece::Literal(lit) = &pieces[0] {
                if !lit.value.trim().is_empty() {
                    let lit = lit.clone();
                    if let Some(expr) = self.parse_directive_literal(&lit, is_for) {
                        pieces[0] = XAttributeValuePiece::Expression(expr);
                    }
                    return;
                }
            }
        }

        for piece in pieces.iter_mut() {
            if let XAttributeValuePiece::Mustache(mustache) = piece {
                self.process_mustache(mustache, is_for);
            }
        }
    }

    fn parse_directive_literal(&mut self, lit: &XLiteral, is_for: bool) -> Option<XExpression> {
        if is_for {
            return Some(self.process_for(&lit.value, lit.span));
        }
        let gaps = self.intermediate.gaps().to_vec();
        let calc = LocationCalculator::new(&gaps, lit.span.start);
        match script::parse_expression(&lit.value, &calc, &self.options.script) {
            Ok(parsed) => {
                self.splice_tokens(lit.span, parsed.tokens);
                let mut comments = parsed.comments;
                self.intermediate.comments_mut().append(&mut comments);
                self.resolve_references(&parsed.references);
                Some(XExpression {
                    span: lit.span,
                    expression: Some(ExpressionContent::Script(parsed.expr)),
                    references: parsed.references,
                })
            }
            Err(error) => {
                self.push_script_error(error);
                None
            }
        }
    }

    // === Mustache / expression processing ===

    fn process_mustache(&mut self, mustache: &mut XMustache, is_for: bool) {
        let payload_span = Span {
            start: mustache.start_token.span.end,
            end: mustache.end_token.span.start,
        };
        let payload = self.payload_between(payload_span.start, payload_span.end);

        if payload.trim().is_empty() {
            self.errors.push(ParseError::with_message(
                ErrorCode::XExpressionError,
                "Unexpected end of expression.",
                payload_span,
            ));
            mustache.value = Some(XExpression {
                span: payload_span,
                expression: None,
                references: Vec::new(),
            });
            return;
        }

        if is_for {
            mustache.value = Some(self.process_for(&payload, payload_span));
            return;
        }

        // Fast path: a bare word is lifted to an identifier without
        // invoking the script parser.
        if let Some((word_offset, word)) = as_single_word(&payload) {
            let gaps = self.intermediate.gaps().to_vec();
            let calc = LocationCalculator::new(&gaps, payload_span.start);
            let span = calc.fix_span(word_offset, word_offset + word.len());
            let ident = Ident::new_no_ctxt(
                word.into(),
                swc_common::Span {
                    lo: BytePos(u32::from(span.start)),
                    hi: BytePos(u32::from(span.end)),
                },
            );
            self.splice_tokens(
                payload_span,
                vec![Token::new(TokenKind::Identifier, word, span)],
            );
            let references = vec![Reference {
                id: SmolStr::new(word),
                span,
            }];
            self.resolve_references(&references);
            mustache.value = Some(XExpression {
                span: payload_span,
                expression: Some(ExpressionContent::Script(Box::new(Expr::Ident(ident)))),
                references,
            });
            return;
        }

        // Inline-object shortcut: `{{ a: 1, b: 2 }}` parses as an object
        // literal, with the facing braces of the delimiters reassigned to
        // the object expression.
        if mustache.start_token.value == "{{" && looks_like_object(&payload) {
            let wrapped = format!("{{{payload}}}");
            let gaps = self.intermediate.gaps().to_vec();
            let calc = LocationCalculator::new(&gaps, payload_span.start).sub_shift(-1);
            match script::parse_expression(&wrapped, &calc, &self.options.script) {
                Ok(parsed) => {
                    self.trim_mustache_tokens(mustache);
                    let splice_span = Span {
                        start: payload_span.start - TextSize::from(1),
                        end: payload_span.end + TextSize::from(1),
                    };
                    self.splice_tokens(splice_span, parsed.tokens);
                    let mut comments = parsed.comments;
                    self.intermediate.comments_mut().append(&mut comments);
                    self.resolve_references(&parsed.references);
                    mustache.value = Some(XExpression {
                        span: payload_span,
                        expression: Some(ExpressionContent::Script(parsed.expr)),
                        references: parsed.references,
                    });
                }
                Err(error) => {
                    self.push_script_error(error);
                    mustache.value = Some(XExpression {
                        span: payload_span,
                        expression: None,
                        references: Vec::new(),
                    });
                }
            }
            return;
        }

        let gaps = self.intermediate.gaps().to_vec();
        let calc = LocationCalculator::new(&gaps, payload_span.start);
        match script::parse_expression(&payload, &calc, &self.options.script) {
            Ok(parsed) => {
                self.splice_tokens(payload_span, parsed.tokens);
                let mut comments = parsed.comments;
                self.intermediate.comments_mut().append(&mut comments);
                self.resolve_references(&parsed.references);
                mustache.value = Some(XExpression {
                    span: payload_span,
                    expression: Some(ExpressionContent::Script(parsed.expr)),
                    references: parsed.references,
                });
            }
            Err(error) => {
                self.push_script_error(error);
                mustache.value = Some(XExpression {
                    span: payload_span,
                    expression: None,
                    references: Vec::new(),
                });
            }
        }
    }

    /// Parses an `s-for` header: `item, index in list trackBy expr`.
    ///
    /// The loop targets parse wrapped as `[<left>]` so `item, index` comes
    /// back as an array literal; `left`/`index` become scope variables on
    /// the enclosing element. Synthetic `in` / `trackBy` keyword tokens are
    /// placed between the parsed runs so the spliced stream reads like a
    /// coherent sentence.
    fn process_for(&mut self, code: &str, span: Span) -> XExpression {
        let opts = self.options.script;
        let gaps = self.intermediate.gaps().to_vec();
        let calc = LocationCalculator::new(&gaps, span.start);
        let segments = split_for_expression(code);

        let mut spliced: Vec<Token> = Vec::new();
        let mut comments: Vec<Token> = Vec::new();
        let mut references: Vec<Reference> = Vec::new();
        let mut left: Option<Ident> = None;
        let mut index: Option<Ident> = None;

        if let Some((offset, segment)) = segments.left {
            if segment.trim().is_empty() {
                self.errors.push(ParseError::with_message(
                    ErrorCode::XExpressionError,
                    "Unexpected end of expression.",
                    calc.fix_span(offset, offset + segment.len()),
                ));
            } else {
                let wrapped = format!("[{segment}]");
                let sub = calc.sub_after(offset).sub_shift(-1);
                match script::parse_expression(&wrapped, &sub, &opts) {
                    Ok(parsed) => {
                        let segment_span = calc.fix_span(offset, offset + segment.len());
                        match extract_loop_targets(*parsed.expr) {
                            Ok((first, second)) => {
                                left = first;
                                index = second;
                            }
                            Err(message) => {
                                self.errors.push(ParseError::with_message(
                                    ErrorCode::XExpressionError,
                                    message,
                                    segment_span,
                                ));
                            }
                        }
                        spliced.extend(parsed.tokens.into_iter().filter(|t| {
                            t.span.start >= segment_span.start && t.span.start < segment_span.end
                        }));
                        comments.extend(parsed.comments);
                    }
                    Err(error) => self.push_script_error(error),
                }
            }
        }

        if let Some(keyword) = segments.in_keyword {
            spliced.push(Token::new(
                TokenKind::Keyword,
                "in",
                calc.fix_span(keyword.offset, keyword.offset + keyword.len),
            ));
        }

        let mut right: Option<Box<Expr>> = None;
        {
            let (offset, segment) = segments.right;
            if segment.trim().is_empty() {
                self.errors.push(ParseError::with_message(
                    ErrorCode::XExpressionError,
                    "Unexpected end of expression.",
                    calc.fix_span(offset, offset + segment.len()),
                ));
            } else {
                match script::parse_expression(segment, &calc.sub_after(offset), &opts) {
                    Ok(parsed) => {
                        // The iterated expression resolves against enclosing
                        // scopes, not the variables this header introduces.
                        self.resolve_references(&parsed.references);
                        references.extend(parsed.references);
                        right = Some(parsed.expr);
                        spliced.extend(parsed.tokens);
                        comments.extend(parsed.comments);
                    }
                    Err(error) => self.push_script_error(error),
                }
            }
        }

        let mut variables = Vec::new();
        if let Some(ident) = &left {
            variables.push(Variable {
                id: SmolStr::new(&*ident.sym),
                span: span_of_swc(ident.span),
                kind: VariableKind::For,
                references: Vec::new(),
            });
        }
        if let Some(ident) = &index {
            variables.push(Variable {
                id: SmolStr::new(&*ident.sym),
                span: span_of_swc(ident.span),
                kind: VariableKind::Index,
                references: Vec::new(),
            });
        }
        if let Some(element) = self.stack.last_mut() {
            element.variables.extend(variables);
        }

        if let Some(keyword) = segments.track_keyword {
            spliced.push(Token::new(
                TokenKind::Keyword,
                "trackBy",
                calc.fix_span(keyword.offset, keyword.offset + keyword.len),
            ));
        }

        let mut track_by: Option<Box<Expr>> = None;
        if let Some((offset, segment)) = segments.track_by {
            if segment.trim().is_empty() {
                self.errors.push(ParseError::with_message(
                    ErrorCode::XExpressionError,
                    "Unexpected end of expression.",
                    calc.fix_span(offset, offset + segment.len()),
                ));
            } else {
                match script::parse_expression(segment, &calc.sub_after(offset), &opts) {
                    Ok(parsed) => {
                        // Track-by sees the freshly introduced loop
                        // variables.
                        self.resolve_references(&parsed.references);
                        references.extend(parsed.references);
                        track_by = Some(parsed.expr);
                        spliced.extend(parsed.tokens);
                        comments.extend(parsed.comments);
                    }
                    Err(error) => self.push_script_error(error),
                }
            }
        }

        spliced.sort_by_key(|t| t.span.start);
        self.splice_tokens(span, spliced);
        self.intermediate.comments_mut().append(&mut comments);

        XExpression {
            span,
            expression: Some(ExpressionContent::For(Box::new(SwanForExpression {
                span,
                left,
                index,
                right,
                track_by,
            }))),
            references,
        }
    }

    // === Shared machinery ===

    /// Reconstructs the decoded payload between two stream offsets from the
    /// committed tokens.
    fn payload_between(&self, start: TextSize, end: TextSize) -> String {
        let tokens = self.intermediate.tokens();
        let from = tokens.partition_point(|t| t.span.start < start);
        let mut payload = String::new();
        for token in &tokens[from..] {
            if token.span.start >= end {
                break;
            }
            payload.push_str(&token.value);
        }
        payload
    }

    /// Replaces the committed tokens inside `range` with the given run.
    fn splice_tokens(&mut self, range: Span, replacement: Vec<Token>) {
        let tokens = self.intermediate.tokens_mut();
        let start = tokens.partition_point(|t| t.span.start < range.start);
        let end = tokens.partition_point(|t| t.span.start < range.end);
        tokens.splice(start..end, replacement);
    }

    /// Shrinks the mustache delimiters by one brace on their facing sides,
    /// used when the payload reparses as an object literal.
    fn trim_mustache_tokens(&mut self, mustache: &mut XMustache) {
        let start_span = mustache.start_token.span;
        let end_span = mustache.end_token.span;

        mustache.start_token.value = "{".to_string();
        mustache.start_token.span.end = start_span.start + TextSize::from(1);
        mustache.end_token.value = "}".to_string();
        mustache.end_token.span.start = end_span.end - TextSize::from(1);

        let tokens = self.intermediate.tokens_mut();
        let at = tokens.partition_point(|t| t.span.start < start_span.start);
        if let Some(token) = tokens.get_mut(at) {
            if token.span == start_span && token.kind == TokenKind::MustacheStart {
                token.value = "{".to_string();
                token.span.end = start_span.start + TextSize::from(1);
            }
        }
        let at = tokens.partition_point(|t| t.span.start < end_span.start);
        if let Some(token) = tokens.get_mut(at) {
            if token.span == end_span && token.kind == TokenKind::MustacheEnd {
                token.value = "}".to_string();
                token.span.start = end_span.end - TextSize::from(1);
            }
        }
    }

    /// Resolves references against the nearest enclosing element whose
    /// `s-for` variables declare the same name.
    fn resolve_references(&mut self, references: &[Reference]) {
        for reference in references {
            for element in self.stack.iter_mut().rev() {
                if let Some(variable) = element
                    .variables
                    .iter_mut()
                    .find(|v| v.id == reference.id)
                {
                    variable.references.push(reference.clone());
                    break;
                }
            }
        }
    }

    fn push_script_error(&mut self, error: ScriptError) {
        self.errors.push(ParseError::with_message(
            ErrorCode::XExpressionError,
            error.message,
            error.span,
        ));
    }

    fn attach(&mut self, node: XNode) {
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => self.document.children.push(node),
        }
    }

    /// Pops the top element, fabricating its end location when no end tag
    /// was found.
    fn pop_element(&mut self, end_tag: Option<XEndTag>) {
        let Some(mut element) = self.stack.pop() else {
            return;
        };
        match end_tag {
            Some(tag) => {
                element.span.end = tag.span.end;
                element.end_tag = Some(tag);
            }
            None => {
                element.span.end = element
                    .children
                    .last()
                    .map(|child| child.span().end)
                    .unwrap_or(element.start_tag.span.end);
                let closes_itself =
                    element.start_tag.self_closing
                        || SWAN_VOID_ELEMENT_TAGS.contains(&element.name.as_str());
                if self.options.no_open_tag && !closes_itself {
                    self.errors.push(ParseError::new(
                        ErrorCode::MissingEndTag,
                        element.start_tag.span,
                    ));
                }
            }
        }
        self.attach(XNode::Element(element));
    }

    fn finish(mut self) -> XDocument {
        while !self.stack.is_empty() {
            self.pop_element(None);
        }

        let mut document = std::mem::take(&mut self.document);
        document.span = Span::at(0, self.intermediate.source_len());
        document.xml_type = XmlType::Swan;

        let index = LineIndex::from_line_terminators(self.intermediate.line_terminators());
        let (mut tokens, mut comments) = self.intermediate.take_streams();
        let mut errors = self.intermediate.take_errors();
        errors.append(&mut self.errors);

        tokens.sort_by_key(|t| (t.span.start, t.span.end));
        comments.sort_by_key(|t| (t.span.start, t.span.end));
        errors.sort_by_key(|e| (e.span.start, e.span.end));

        for token in tokens.iter_mut().chain(comments.iter_mut()) {
            token.start_loc = index.line_col(token.span.start);
            token.end_loc = index.line_col(token.span.end);
        }
        for error in &mut errors {
            error.loc = index.line_col(error.span.start);
        }

        document.tokens = tokens;
        document.comments = comments;
        document.errors = errors;
        document.set_line_index(index);
        document
    }
}

fn has_src_attribute(element: &XElement) -> bool {
    element.start_tag.attributes.iter().any(|attr| match attr {
        AttributeNode::Plain(a) => a.key.name == "src",
        AttributeNode::Directive(_) => false,
    })
}

fn span_of_swc(span: swc_common::Span) -> Span {
    Span::at(span.lo.0 as usize, span.hi.0 as usize)
}

/// `^\s*(\w+)\s*$`: returns the word and its offset within the payload.
fn as_single_word(code: &str) -> Option<(usize, &str)> {
    let word = code.trim();
    if word.is_empty() {
        return None;
    }
    if !word
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    let offset = code.len() - code.trim_start().len();
    Some((offset, word))
}

/// `^\s*(?:\w+\s*:|(["'])[\w.-]+\1\s*:)`: an inline-object payload starts
/// with a (possibly quoted) property key followed by a colon.
fn looks_like_object(code: &str) -> bool {
    let rest = code.trim_start();
    let mut chars = rest.char_indices().peekable();
    match chars.peek() {
        Some(&(_, quote @ ('"' | '\''))) => {
            chars.next();
            let mut key_len = 0usize;
            let mut closed = false;
            let mut after = 0usize;
            for (i, c) in chars.by_ref() {
                if c == quote {
                    closed = true;
                    after = i + c.len_utf8();
                    break;
                }
                if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                    key_len += 1;
                } else {
                    return false;
                }
            }
            closed && key_len > 0 && rest[after..].trim_start().starts_with(':')
        }
        Some(&(_, c)) if c.is_ascii_alphanumeric() || c == '_' => {
            let key_end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            rest[key_end..].trim_start().starts_with(':')
        }
        _ => false,
    }
}

/// Extracts `item` / `index` identifiers from the bracket-wrapped loop
/// target list.
fn extract_loop_targets(expr: Expr) -> Result<(Option<Ident>, Option<Ident>), &'static str> {
    let Expr::Array(array) = expr else {
        return Err("Invalid for-loop variables.");
    };
    let mut targets = Vec::new();
    for element in array.elems.into_iter().flatten() {
        if element.spread.is_some() {
            return Err("Invalid for-loop variables.");
        }
        match *element.expr {
            Expr::Ident(ident) => targets.push(ident),
            _ => return Err("Invalid for-loop variables."),
        }
    }
    if targets.len() > 2 {
        return Err("Invalid for-loop variables.");
    }
    let mut iter = targets.into_iter();
    Ok((iter.next(), iter.next()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_single_word() {
        assert_eq!(as_single_word("  cond "), Some((2, "cond")));
        assert_eq!(as_single_word("cond"), Some((0, "cond")));
        assert_eq!(as_single_word("a.b"), None);
        assert_eq!(as_single_word("  "), None);
    }

    #[test]
    fn test_looks_like_object() {
        assert!(looks_like_object("a:1,b:2"));
        assert!(looks_like_object("  key : value"));
        assert!(looks_like_object("'a-b': 1"));
        assert!(looks_like_object("\"a.b\": 1"));
        assert!(!looks_like_object("a.b ? c : d"));
        assert!(!looks_like_object("fn(x)"));
        assert!(!looks_like_object("'a b': 1"));
    }
}
