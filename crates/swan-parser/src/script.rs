//! Bridge to the external script parser (swc).
//!
//! Expression payloads are parsed wrapped as `0(<payload>)` so that a
//! top-level comma surfaces as a second call argument instead of silently
//! producing a sequence expression; the location calculator's `-2` shift
//! undoes the prefix. All spans on returned nodes, tokens and comments are
//! rebased to the original template coordinate system before anything else
//! touches them.

use swan_source::{LocationCalculator, Span};
use swc_common::comments::{Comment as SwcComment, CommentKind, SingleThreadedComments};
use swc_common::{sync::Lrc, BytePos, FileName, SourceMap, Spanned};
use swc_ecma_ast::{EsVersion, Expr, ExprOrSpread, ModuleItem};
use swc_ecma_parser::token::{Token as SwcToken, TokenAndSpan, Word};
use swc_ecma_parser::{lexer::Lexer, Capturing, Parser, StringInput, Syntax};
use swc_ecma_visit::{VisitMut, VisitMutWith};

use crate::ast::Reference;
use crate::refs;
use crate::token::{Token, TokenKind};

/// Configuration forwarded to the script backend.
#[derive(Debug, Clone, Copy)]
pub struct ScriptOptions {
    /// Target language version.
    pub ecma_version: EsVersion,
    /// How embedded script modules are parsed.
    pub source_type: SourceType,
    /// Parse with the legacy profile that accepts reserved words as
    /// identifiers.
    pub allow_reserved: bool,
}

/// The source type for embedded script modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceType {
    /// A classic script (`exports.a = 1` style sjs modules).
    #[default]
    Script,
    /// An ES module.
    Module,
}

impl Default for ScriptOptions {
    fn default() -> Self {
        Self {
            ecma_version: EsVersion::latest(),
            source_type: SourceType::Script,
            allow_reserved: false,
        }
    }
}

impl ScriptOptions {
    fn syntax(&self) -> Syntax {
        Syntax::Es(Default::default())
    }

    fn version(&self) -> EsVersion {
        if self.allow_reserved {
            // The legacy profile tolerates reserved words as identifiers.
            EsVersion::Es3
        } else {
            self.ecma_version
        }
    }

    fn legacy(&self) -> Self {
        Self {
            ecma_version: EsVersion::Es3,
            source_type: SourceType::Script,
            allow_reserved: true,
        }
    }
}

/// A parse failure, already rebased to template coordinates.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub span: Span,
}

/// A successfully parsed expression payload.
pub struct ParsedExpression {
    /// The expression, spans rebased.
    pub expr: Box<Expr>,
    /// The payload's tokens, in our token type with absolute spans. Tokens
    /// belonging to the `0(…)` wrapper are dropped; tokens belonging to a
    /// caller-added wrapper (brackets, braces) are kept and map onto real
    /// source positions.
    pub tokens: Vec<Token>,
    /// Comments found inside the payload.
    pub comments: Vec<Token>,
    /// Undeclared identifier reads.
    pub references: Vec<Reference>,
}

/// A successfully parsed script-module body.
pub struct ParsedModule {
    pub body: Vec<ModuleItem>,
    pub tokens: Vec<Token>,
    pub comments: Vec<Token>,
    pub references: Vec<Reference>,
}

/// Rewrites every span of a script sub-AST into template coordinates.
struct SpanRebaser<'a> {
    calc: &'a LocationCalculator<'a>,
    base: BytePos,
}

impl VisitMut for SpanRebaser<'_> {
    fn visit_mut_span(&mut self, span: &mut swc_common::Span) {
        if span.is_dummy() {
            return;
        }
        let lo = (span.lo.0 - self.base.0) as usize;
        let hi = (span.hi.0 - self.base.0) as usize;
        span.lo = BytePos(u32::from(self.calc.offset_with_gap(lo)));
        span.hi = BytePos(u32::from(self.calc.offset_with_gap(hi)));
    }
}

/// Parses an expression payload.
///
/// The calculator must translate offsets within `code` to absolute source
/// offsets; callers that wrap the payload (inline objects, for-loop
/// targets) pass a calculator shifted by the wrapper length. On a failure
/// that looks reserved-word-shaped, the payload is reparsed once with the
/// legacy profile; the original error wins if the retry also fails.
pub fn parse_expression(
    code: &str,
    calc: &LocationCalculator,
    options: &ScriptOptions,
) -> Result<ParsedExpression, ScriptError> {
    if code.trim().is_empty() {
        return Err(ScriptError {
            message: "Unexpected end of expression.".to_string(),
            span: Span {
                start: calc.offset_with_gap(0),
                end: calc.offset_with_gap(code.len()),
            },
        });
    }

    match parse_expression_once(code, calc, options) {
        Ok(parsed) => Ok(parsed),
        Err(error) => {
            if !options.allow_reserved && is_reserved_word_failure(&error.message) {
                if let Ok(parsed) = parse_expression_once(code, calc, &options.legacy()) {
                    return Ok(parsed);
                }
            }
            Err(error)
        }
    }
}

fn parse_expression_once(
    code: &str,
    calc: &LocationCalculator,
    options: &ScriptOptions,
) -> Result<ParsedExpression, ScriptError> {
    let wrapped = format!("0({code})");
    let shifted = calc.sub_shift(-2);

    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(Lrc::new(FileName::Anon), wrapped.clone());
    let base = fm.start_pos;
    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        options.syntax(),
        options.version(),
        StringInput::from(&*fm),
        Some(&comments),
    );
    let mut parser = Parser::new_from(Capturing::new(lexer));

    let result = parser.parse_expr();
    let recovered = parser.take_errors();
    let mut expr = match result {
        Ok(expr) if recovered.is_empty() => expr,
        Ok(_) => return Err(normalize_error(&recovered[0], base, &shifted, code.len() + 2)),
        Err(error) => return Err(normalize_error(&error, base, &shifted, code.len() + 2)),
    };

    let raw_tokens: Vec<TokenAndSpan> = parser.input().take();
    drop(parser);
    let comment_tokens = convert_comments(comments, base, &shifted);

    expr.visit_mut_with(&mut SpanRebaser {
        calc: &shifted,
        base,
    });

    // The wrapper parses as a call with the payload as its argument list.
    let Expr::Call(call) = *expr else {
        return Err(ScriptError {
            message: "Unexpected token.".to_string(),
            span: Span {
                start: calc.offset_with_gap(0),
                end: calc.offset_with_gap(code.len()),
            },
        });
    };

    let mut args = call.args;
    if args.is_empty() {
        return Err(ScriptError {
            message: "Unexpected end of expression.".to_string(),
            span: Span {
                start: calc.offset_with_gap(0),
                end: calc.offset_with_gap(code.len()),
            },
        });
    }
    if let Some(second) = args.get(1) {
        // A top-level comma not wrapped in parentheses.
        return Err(ScriptError {
            message: "Unexpected token ','.".to_string(),
            span: swc_span_to_span(second.expr.as_ref()),
        });
    }
    let ExprOrSpread { spread, expr } = args.remove(0);
    if spread.is_some() {
        return Err(ScriptError {
            message: "Unexpected token '...'.".to_string(),
            span: swc_span_to_span(expr.as_ref()),
        });
    }

    let tokens = convert_tokens(&raw_tokens, &wrapped, base, &shifted, 2, 2 + code.len());
    let references = refs::collect_expression_references(&expr);

    Ok(ParsedExpression {
        expr,
        tokens,
        comments: comment_tokens,
        references,
    })
}

/// Parses the body of an `<import-sjs>` / `<filter>` element as a complete
/// script program.
pub fn parse_script_module(
    code: &str,
    calc: &LocationCalculator,
    options: &ScriptOptions,
) -> Result<ParsedModule, ScriptError> {
    let cm: Lrc<SourceMap> = Default::default();
    let fm = cm.new_source_file(Lrc::new(FileName::Anon), code.to_string());
    let base = fm.start_pos;
    let comments = SingleThreadedComments::default();
    let lexer = Lexer::new(
        options.syntax(),
        options.version(),
        StringInput::from(&*fm),
        Some(&comments),
    );
    let mut parser = Parser::new_from(Capturing::new(lexer));

    let body = match options.source_type {
        SourceType::Module => {
            let result = parser.parse_module();
            let recovered = parser.take_errors();
            match result {
                Ok(module) if recovered.is_empty() => module.body,
                Ok(_) => return Err(normalize_error(&recovered[0], base, calc, code.len())),
                Err(error) => return Err(normalize_error(&error, base, calc, code.len())),
            }
        }
        SourceType::Script => {
            let result = parser.parse_script();
            let recovered = parser.take_errors();
            match result {
                Ok(script) if recovered.is_empty() => {
                    script.body.into_iter().map(ModuleItem::Stmt).collect()
                }
                Ok(_) => return Err(normalize_error(&recovered[0], base, calc, code.len())),
                Err(error) => return Err(normalize_error(&error, base, calc, code.len())),
            }
        }
    };

    let raw_tokens: Vec<TokenAndSpan> = parser.input().take();
    drop(parser);
    let comment_tokens = convert_comments(comments, base, calc);

    let mut body: Vec<ModuleItem> = body;
    let mut rebaser = SpanRebaser { calc, base };
    for item in &mut body {
        item.visit_mut_with(&mut rebaser);
    }

    let tokens = convert_tokens(&raw_tokens, code, base, calc, 0, code.len());
    let references = refs::collect_module_references(&body);

    Ok(ParsedModule {
        body,
        tokens,
        comments: comment_tokens,
        references,
    })
}

fn swc_span_to_span(expr: &Expr) -> Span {
    use swc_common::Spanned;
    let span = expr.span();
    Span::at(span.lo.0 as usize, span.hi.0 as usize)
}

fn is_reserved_word_failure(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("reserved") || lower.contains("keyword")
}

fn normalize_error(
    error: &swc_ecma_parser::error::Error,
    base: BytePos,
    calc: &LocationCalculator,
    fragment_len: usize,
) -> ScriptError {
    let span = error.span();
    let lo = span.lo.0.saturating_sub(base.0) as usize;
    let hi = (span.hi.0.saturating_sub(base.0) as usize).max(lo);
    let message = if lo >= fragment_len {
        // The script parser ran off the end of the fragment.
        "Unexpected end of expression.".to_string()
    } else {
        error.kind().msg().to_string()
    };
    ScriptError {
        message,
        span: Span {
            start: calc.offset_with_gap(lo),
            end: calc.offset_with_gap(hi),
        },
    }
}

/// Converts captured script tokens into template tokens, keeping only those
/// whose span lies within `[keep_from, keep_to)` of the parsed text (this
/// drops the `0(…)` wrapper tokens).
fn convert_tokens(
    raw: &[TokenAndSpan],
    text: &str,
    base: BytePos,
    calc: &LocationCalculator,
    keep_from: usize,
    keep_to: usize,
) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(raw.len());
    for tas in raw {
        let lo = (tas.span.lo.0 - base.0) as usize;
        let hi = (tas.span.hi.0 - base.0) as usize;
        if lo < keep_from || lo >= keep_to {
            continue;
        }
        let kind = classify_token(&tas.token);
        let value = &text[lo..hi.min(text.len())];
        tokens.push(Token::new(kind, value, calc.fix_span(lo, hi)));
    }
    tokens
}

fn classify_token(token: &SwcToken) -> TokenKind {
    match token {
        SwcToken::Word(word) => match word {
            Word::Keyword(_) => TokenKind::Keyword,
            Word::Null => TokenKind::Null,
            Word::True | Word::False => TokenKind::Boolean,
            Word::Ident(_) => TokenKind::Identifier,
        },
        SwcToken::Str { .. } => TokenKind::Str,
        SwcToken::Num { .. } | SwcToken::BigInt { .. } => TokenKind::Numeric,
        SwcToken::Regex(..) => TokenKind::RegularExpression,
        SwcToken::Template { .. } => TokenKind::Template,
        _ => TokenKind::Punctuator,
    }
}

fn convert_comments(
    comments: SingleThreadedComments,
    base: BytePos,
    calc: &LocationCalculator,
) -> Vec<Token> {
    let mut all: Vec<SwcComment> = Vec::new();
    let (leading, trailing) = comments.take_all();
    for list in leading.borrow().values() {
        all.extend(list.iter().cloned());
    }
    for list in trailing.borrow().values() {
        all.extend(list.iter().cloned());
    }

    all.sort_by_key(|c| c.span.lo.0);
    all.dedup_by_key(|c| c.span.lo.0);

    all.into_iter()
        .map(|c| {
            let kind = match c.kind {
                CommentKind::Line => TokenKind::LineComment,
                CommentKind::Block => TokenKind::BlockComment,
            };
            let lo = (c.span.lo.0 - base.0) as usize;
            let hi = (c.span.hi.0 - base.0) as usize;
            Token::new(kind, c.text.to_string(), calc.fix_span(lo, hi))
        })
        .collect()
}
