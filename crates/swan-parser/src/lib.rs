//! Parser for the SWAN mini-program template dialect.
//!
//! SWAN is an HTML-like markup language extended with mustache
//! interpolations (`{{ … }}`), control and event directives (`s-if`,
//! `s-for`, `bind:tap`, …) and embedded script modules (`<import-sjs>`,
//! `<filter>`). A parse runs a four-stage pipeline (code points, tokens,
//! intermediate records, tree) and produces a single [`XDocument`]
//! carrying the node tree, the committed token stream, the comment stream
//! and every recovered error. Expression payloads and script bodies are
//! parsed by swc and spliced back in with locations rebased to the template.
//!
//! # Example
//!
//! ```
//! use swan_parser::{parse, XNode};
//!
//! let document = parse(r#"<view s-if="{{cond}}">{{ message }}</view>"#);
//! assert!(document.errors.is_empty());
//! assert!(matches!(document.children[0], XNode::Element(_)));
//! ```

mod ast;
mod cursor;
mod directive;
mod error;
mod intermediate;
mod parser;
mod refs;
mod script;
mod token;
mod tokenizer;

pub use ast::*;
pub use error::{ErrorCode, ParseError};
pub use swc_ecma_ast;
pub use script::{ScriptOptions, SourceType};
pub use swan_source::{LineCol, LineIndex, LocationCalculator, Span};
pub use token::{Token, TokenKind};
pub use tokenizer::{State, Tokenizer};

use camino::Utf8PathBuf;
use swan_source::TextSize;

/// Tags that never take children.
pub const SWAN_VOID_ELEMENT_TAGS: &[&str] = &["include"];

/// Tags whose body is raw text handed to the script parser.
pub const SWAN_RAWTEXT_TAGS: &[&str] = &["filter", "import-sjs"];

/// Tags whose body is RCDATA.
pub const SWAN_RCDATA_TAGS: &[&str] = &["textarea"];

/// Tags an identically-named sibling may implicitly close.
pub const SWAN_CAN_BE_LEFT_OPEN_TAGS: &[&str] = &["_"];

/// Options for parsing.
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Path of the file being parsed. A `.swan` extension (or no path at
    /// all) selects the template pipeline; any other extension parses the
    /// whole input as a bare script.
    pub file_path: Option<Utf8PathBuf>,
    /// Report a `missing-end-tag` error for every element left open.
    pub no_open_tag: bool,
    /// Parse mustache payloads and directive values as expressions. When
    /// false they are preserved as raw mustache/literal pieces and the
    /// script parser is never invoked.
    pub parse_expression: bool,
    /// Configuration forwarded to the script backend.
    pub script: ScriptOptions,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            file_path: None,
            no_open_tag: false,
            parse_expression: true,
            script: ScriptOptions::default(),
        }
    }
}

/// Parses SWAN source into a document with default options.
///
/// Never fails: the returned tree is always structurally well-formed and
/// malformed input is recorded on [`XDocument::errors`].
pub fn parse(source: &str) -> XDocument {
    parse_with_options(source, ParserOptions::default())
}

/// Parses SWAN source with custom options.
pub fn parse_with_options(source: &str, options: ParserOptions) -> XDocument {
    let is_template = options
        .file_path
        .as_ref()
        .map(|path| path.extension() == Some("swan"))
        .unwrap_or(true);

    if is_template {
        parser::Parser::new(source, options).parse()
    } else {
        parse_script_input(source, options)
    }
}

/// Parses a non-template input as a bare script, surfacing it as a
/// document whose single child is the whole-input module.
fn parse_script_input(source: &str, options: ParserOptions) -> XDocument {
    let index = LineIndex::new(source);
    let gaps: Vec<TextSize> = Vec::new();
    let calc = LocationCalculator::new(&gaps, TextSize::from(0));

    let mut document = XDocument::default();
    document.span = Span::at(0, source.len());
    document.xml_type = XmlType::Unknown;

    match script::parse_script_module(source, &calc, &options.script) {
        Ok(parsed) => {
            document.children.push(XNode::Module(XModule {
                span: Span::at(0, source.len()),
                body: parsed.body,
                references: parsed.references,
            }));
            document.tokens = parsed.tokens;
            document.comments = parsed.comments;
        }
        Err(error) => {
            document.errors.push(ParseError::with_message(
                ErrorCode::XExpressionError,
                error.message,
                error.span,
            ));
        }
    }

    for token in document
        .tokens
        .iter_mut()
        .chain(document.comments.iter_mut())
    {
        token.start_loc = index.line_col(token.span.start);
        token.end_loc = index.line_col(token.span.end);
    }
    for error in &mut document.errors {
        error.loc = index.line_col(error.span.start);
    }
    document.set_line_index(index);
    document
}
