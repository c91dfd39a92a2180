//! Reference extraction over script sub-ASTs.
//!
//! Collects the identifiers an expression or embedded module reads without
//! declaring, so the tree builder can resolve them against `s-for` scope
//! variables on enclosing elements. Spans are expected to be rebased to the
//! template coordinate system before collection.

use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use swan_source::Span;
use swc_ecma_ast::*;
use swc_ecma_visit::{Visit, VisitWith};

use crate::ast::Reference;

/// Collects undeclared identifier reads.
struct ReferenceCollector {
    scopes: Vec<FxHashSet<SmolStr>>,
    references: Vec<Reference>,
}

impl ReferenceCollector {
    fn new() -> Self {
        Self {
            scopes: vec![FxHashSet::default()],
            references: Vec::new(),
        }
    }

    fn declared(&self, name: &str) -> bool {
        self.scopes.iter().any(|scope| scope.contains(name))
    }

    fn declare(&mut self, name: SmolStr) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name);
        }
    }

    fn declare_pat(&mut self, pat: &Pat) {
        match pat {
            Pat::Ident(ident) => self.declare(SmolStr::new(&*ident.id.sym)),
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.declare_pat(elem);
                }
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => self.declare_pat(&kv.value),
                        ObjectPatProp::Assign(assign) => {
                            self.declare(SmolStr::new(&*assign.key.sym));
                        }
                        ObjectPatProp::Rest(rest) => self.declare_pat(&rest.arg),
                    }
                }
            }
            Pat::Assign(assign) => self.declare_pat(&assign.left),
            Pat::Rest(rest) => self.declare_pat(&rest.arg),
            Pat::Expr(_) | Pat::Invalid(_) => {}
        }
    }

    fn to_span(span: swc_common::Span) -> Span {
        Span::at(span.lo.0 as usize, span.hi.0 as usize)
    }
}

impl Visit for ReferenceCollector {
    fn visit_ident(&mut self, ident: &Ident) {
        if !self.declared(&ident.sym) {
            self.references.push(Reference {
                id: SmolStr::new(&*ident.sym),
                span: Self::to_span(ident.span),
            });
        }
    }

    fn visit_function(&mut self, func: &Function) {
        self.scopes.push(FxHashSet::default());
        for param in &func.params {
            self.declare_pat(&param.pat);
        }
        func.body.visit_with(self);
        self.scopes.pop();
    }

    fn visit_arrow_expr(&mut self, arrow: &ArrowExpr) {
        self.scopes.push(FxHashSet::default());
        for param in &arrow.params {
            self.declare_pat(param);
        }
        arrow.body.visit_with(self);
        self.scopes.pop();
    }

    fn visit_var_declarator(&mut self, decl: &VarDeclarator) {
        // The name pattern declares; only the initialiser reads.
        self.declare_pat(&decl.name);
        if let Some(init) = &decl.init {
            init.visit_with(self);
        }
    }

    fn visit_fn_decl(&mut self, decl: &FnDecl) {
        self.declare(SmolStr::new(&*decl.ident.sym));
        decl.function.visit_with(self);
    }

    fn visit_class_decl(&mut self, decl: &ClassDecl) {
        self.declare(SmolStr::new(&*decl.ident.sym));
        decl.class.visit_with(self);
    }

    fn visit_catch_clause(&mut self, clause: &CatchClause) {
        self.scopes.push(FxHashSet::default());
        if let Some(param) = &clause.param {
            self.declare_pat(param);
        }
        clause.body.visit_with(self);
        self.scopes.pop();
    }

    // Labels are not variable references.
    fn visit_labeled_stmt(&mut self, stmt: &LabeledStmt) {
        stmt.body.visit_with(self);
    }

    fn visit_break_stmt(&mut self, _stmt: &BreakStmt) {}

    fn visit_continue_stmt(&mut self, _stmt: &ContinueStmt) {}
}

/// Collects the external references of an expression.
pub fn collect_expression_references(expr: &Expr) -> Vec<Reference> {
    let mut collector = ReferenceCollector::new();
    expr.visit_with(&mut collector);
    collector.references
}

/// Collects the external references of an embedded script module: reads of
/// names the module body never declares at the top level.
pub fn collect_module_references(items: &[ModuleItem]) -> Vec<Reference> {
    let mut collector = ReferenceCollector::new();

    // Hoisting pass: top-level declarations are visible throughout.
    for item in items {
        match item {
            ModuleItem::Stmt(Stmt::Decl(decl)) => match decl {
                Decl::Var(var) => {
                    for d in &var.decls {
                        collector.declare_pat(&d.name);
                    }
                }
                Decl::Fn(f) => collector.declare(SmolStr::new(&*f.ident.sym)),
                Decl::Class(c) => collector.declare(SmolStr::new(&*c.ident.sym)),
                _ => {}
            },
            ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => {
                for spec in &import.specifiers {
                    match spec {
                        ImportSpecifier::Named(s) => {
                            collector.declare(SmolStr::new(&*s.local.sym));
                        }
                        ImportSpecifier::Default(s) => {
                            collector.declare(SmolStr::new(&*s.local.sym));
                        }
                        ImportSpecifier::Namespace(s) => {
                            collector.declare(SmolStr::new(&*s.local.sym));
                        }
                    }
                }
            }
            _ => {}
        }
    }

    for item in items {
        item.visit_with(&mut collector);
    }
    collector.references
}
