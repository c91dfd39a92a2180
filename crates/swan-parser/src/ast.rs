//! AST types for SWAN templates.
//!
//! The tree's down-edges own every node. Ancestry is a lookup relation
//! supplied contextually (the builder's element stack during parsing,
//! traversal context afterwards), never a stored pointer, so the tree stays
//! free of reference cycles.

use smol_str::SmolStr;
use swan_source::{LineCol, LineIndex, Span};
use swc_ecma_ast::{Expr, Ident, ModuleItem};

use crate::error::ParseError;
use crate::token::Token;

/// How the input was interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlType {
    /// A `.swan` template, parsed through the full template pipeline.
    #[default]
    Swan,
    /// Any other input, parsed as a bare script.
    Unknown,
}

/// The root of a parsed document.
#[derive(Debug, Clone, Default)]
pub struct XDocument {
    /// The span of the entire document.
    pub span: Span,
    /// How the input was interpreted.
    pub xml_type: XmlType,
    /// The top-level nodes.
    pub children: Vec<XNode>,
    /// The full committed token stream, sorted by span start.
    pub tokens: Vec<Token>,
    /// All comments, sorted by span start.
    pub comments: Vec<Token>,
    /// All recovered errors, sorted by offset.
    pub errors: Vec<ParseError>,
    line_index: LineIndex,
}

impl XDocument {
    pub(crate) fn set_line_index(&mut self, index: LineIndex) {
        self.line_index = index;
    }

    /// Returns the line index of the source this document was parsed from.
    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Returns the line/column range of a span within this document.
    pub fn loc_of(&self, span: Span) -> (LineCol, LineCol) {
        (
            self.line_index.line_col(span.start),
            self.line_index.line_col(span.end),
        )
    }
}

/// A node in the template tree.
#[derive(Debug, Clone)]
pub enum XNode {
    /// An element.
    Element(XElement),
    /// A text run.
    Text(XText),
    /// A mustache interpolation `{{ … }}`.
    Mustache(XMustache),
    /// An embedded script module (`<import-sjs>` / `<filter>` body).
    Module(XModule),
}

impl XNode {
    /// Returns the span of this node.
    pub fn span(&self) -> Span {
        match self {
            XNode::Element(n) => n.span,
            XNode::Text(n) => n.span,
            XNode::Mustache(n) => n.span,
            XNode::Module(n) => n.span,
        }
    }
}

/// An element.
#[derive(Debug, Clone)]
pub struct XElement {
    /// The span of the element, from the start tag through the end tag.
    pub span: Span,
    /// The lowercased tag name.
    pub name: SmolStr,
    /// The tag name as written.
    pub raw_name: SmolStr,
    /// The start tag.
    pub start_tag: XStartTag,
    /// The child nodes, in source order.
    pub children: Vec<XNode>,
    /// The end tag, if one was found.
    pub end_tag: Option<XEndTag>,
    /// Scope variables introduced by an `s-for` directive on this element.
    pub variables: Vec<Variable>,
}

/// A start tag.
#[derive(Debug, Clone)]
pub struct XStartTag {
    /// The span of the start tag including `<` and `>` / `/>`.
    pub span: Span,
    /// Whether the tag closed itself with `/>`.
    pub self_closing: bool,
    /// The attributes, in source order.
    pub attributes: Vec<AttributeNode>,
}

/// An end tag. Positional only.
#[derive(Debug, Clone, Copy)]
pub struct XEndTag {
    /// The span of the end tag.
    pub span: Span,
}

/// An attribute slot on a start tag: either a plain attribute or a directive.
#[derive(Debug, Clone)]
pub enum AttributeNode {
    /// A plain attribute.
    Plain(XAttribute),
    /// A directive (`s-if`, `bind:tap`, …).
    Directive(XDirective),
}

impl AttributeNode {
    /// Returns the span of this attribute.
    pub fn span(&self) -> Span {
        match self {
            AttributeNode::Plain(a) => a.span,
            AttributeNode::Directive(d) => d.span,
        }
    }

    /// Returns the lowercased key name as written (including any directive
    /// prefix).
    pub fn key_name(&self) -> &str {
        match self {
            AttributeNode::Plain(a) => &a.key.name,
            AttributeNode::Directive(d) => &d.key.full_name,
        }
    }
}

/// A plain attribute.
#[derive(Debug, Clone)]
pub struct XAttribute {
    /// The span of the attribute from key through value.
    pub span: Span,
    /// The attribute key.
    pub key: XIdentifier,
    /// The value pieces; empty for a bare attribute.
    pub value: Vec<XAttributeValuePiece>,
}

/// A directive attribute.
#[derive(Debug, Clone)]
pub struct XDirective {
    /// The span of the directive from key through value.
    pub span: Span,
    /// The directive key.
    pub key: XDirectiveKey,
    /// The value pieces; empty for a bare directive.
    pub value: Vec<XAttributeValuePiece>,
}

/// An attribute key.
#[derive(Debug, Clone)]
pub struct XIdentifier {
    /// The span of the key.
    pub span: Span,
    /// The lowercased name.
    pub name: SmolStr,
    /// The name as written.
    pub raw_name: SmolStr,
}

/// A parsed directive key such as `s-if` or `capture-bind:tap`.
#[derive(Debug, Clone)]
pub struct XDirectiveKey {
    /// The span of the key.
    pub span: Span,
    /// The directive prefix.
    pub prefix: DirectivePrefix,
    /// The prefix as written.
    pub raw_prefix: SmolStr,
    /// The directive name after the prefix.
    pub name: SmolStr,
    /// The name after the prefix, as written.
    pub raw_name: SmolStr,
    /// The whole lowercased key, prefix included.
    pub full_name: SmolStr,
}

/// The recognised directive prefixes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DirectivePrefix {
    /// `s-`
    S,
    /// `bind` / `bind:`
    Bind,
    /// `catch` / `catch:`
    Catch,
    /// `capture-bind:`
    CaptureBind,
    /// `capture-catch:`
    CaptureCatch,
}

impl DirectivePrefix {
    /// Returns the canonical spelling of this prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            DirectivePrefix::S => "s-",
            DirectivePrefix::Bind => "bind",
            DirectivePrefix::Catch => "catch",
            DirectivePrefix::CaptureBind => "capture-bind",
            DirectivePrefix::CaptureCatch => "capture-catch",
        }
    }
}

/// One piece of an attribute value. A value may interleave literal runs and
/// mustache interpolations; a directive value that parsed as a bare
/// expression is a single `Expression` piece.
#[derive(Debug, Clone)]
pub enum XAttributeValuePiece {
    /// A literal text run.
    Literal(XLiteral),
    /// A mustache interpolation.
    Mustache(XMustache),
    /// A parsed expression (directive value without mustache delimiters).
    Expression(XExpression),
}

impl XAttributeValuePiece {
    /// Returns the span of this piece.
    pub fn span(&self) -> Span {
        match self {
            XAttributeValuePiece::Literal(p) => p.span,
            XAttributeValuePiece::Mustache(p) => p.span,
            XAttributeValuePiece::Expression(p) => p.span,
        }
    }
}

/// A literal attribute-value run.
#[derive(Debug, Clone)]
pub struct XLiteral {
    /// The span of the literal.
    pub span: Span,
    /// The decoded text.
    pub value: String,
}

/// A mustache interpolation.
#[derive(Debug, Clone)]
pub struct XMustache {
    /// The span from the opening delimiter through the closing one.
    pub span: Span,
    /// The opening `{{` / `{=` token.
    pub start_token: Token,
    /// The closing `}}` / `=}` token.
    pub end_token: Token,
    /// The parsed payload; `None` when expression parsing is disabled or
    /// the mustache was never closed.
    pub value: Option<XExpression>,
}

/// A text run.
#[derive(Debug, Clone)]
pub struct XText {
    /// The span of the text.
    pub span: Span,
    /// The decoded text.
    pub value: String,
}

/// A parsed expression embedded in the template.
#[derive(Debug, Clone)]
pub struct XExpression {
    /// The span of the expression payload in the original source.
    pub span: Span,
    /// The parsed content; `None` when the script parser rejected the
    /// payload (the error is on the document).
    pub expression: Option<ExpressionContent>,
    /// The identifiers this expression reads from enclosing scope.
    pub references: Vec<Reference>,
}

/// The content of a parsed expression.
#[derive(Debug, Clone)]
pub enum ExpressionContent {
    /// A script expression.
    Script(Box<Expr>),
    /// An `s-for` loop header.
    For(Box<SwanForExpression>),
}

/// A parsed `s-for` header: `item, index in list trackBy expr`.
#[derive(Debug, Clone)]
pub struct SwanForExpression {
    /// The span of the whole header.
    pub span: Span,
    /// The loop item identifier; absent in the bare `s-for="list"` form.
    pub left: Option<Ident>,
    /// The loop index identifier.
    pub index: Option<Ident>,
    /// The iterated expression.
    pub right: Option<Box<Expr>>,
    /// The `trackBy` key expression.
    pub track_by: Option<Box<Expr>>,
}

/// An embedded script module.
#[derive(Debug, Clone)]
pub struct XModule {
    /// The span of the script body.
    pub span: Span,
    /// The parsed statements.
    pub body: Vec<ModuleItem>,
    /// Identifiers the module reads without declaring.
    pub references: Vec<Reference>,
}

/// A scope variable introduced by `s-for`.
#[derive(Debug, Clone)]
pub struct Variable {
    /// The variable name.
    pub id: SmolStr,
    /// The span of the declaring identifier.
    pub span: Span,
    /// What the variable binds.
    pub kind: VariableKind,
    /// Every reference that resolved to this variable.
    pub references: Vec<Reference>,
}

/// What an `s-for` variable binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// The loop item.
    For,
    /// The loop index.
    Index,
}

/// A read of an identifier from enclosing scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// The identifier name.
    pub id: SmolStr,
    /// The span of the reference.
    pub span: Span,
}
