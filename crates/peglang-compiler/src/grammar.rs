//! The owned grammar AST (spec §3 "AST nodes"): what the parser builds
//! directly from the token stream, what the resolver merges across
//! files, what transforms rewrite, and what the compiler emits from.
//!
//! Every node owns its data and carries a `FileId` so spans survive
//! import merging.

use indexmap::IndexMap;
use peglang_core::{Charset, FileId, Span};

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub file: FileId,
    pub kind: ExprKind,
}

impl Expr {
    pub fn new(span: Span, file: FileId, kind: ExprKind) -> Self {
        Self { span, file, kind }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Identifier(String),
    /// A literal string, already unescaped.
    Literal(String),
    Class(Vec<ClassItem>),
    /// Introduced by the charset-synthesis transform (spec §4.4 step 2).
    Charset(Charset),
    Any,
    Sequence(Vec<Expr>),
    /// Binary, right-leaning (spec §3): `a / b / c` is `Choice(a, Choice(b, c))`.
    Choice(Box<Expr>, Box<Expr>),
    ZeroOrMore(Box<Expr>),
    OneOrMore(Box<Expr>),
    Optional(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>),
    /// `#expr`: suppresses automatic space insertion in its subtree.
    Lex(Box<Expr>),
    /// `;expr`: quiet prefix, removes the surrounding capture (spec §4.4 step 5).
    Quiet(Box<Expr>),
    /// `%Ident{expr}` or `%Ident` with an implicit atomic body.
    NodeCapture(String, Box<Expr>),
    /// `%{expr}`.
    BlockCapture(Box<Expr>),
    /// `expr^Label`.
    Labeled(Box<Expr>, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassItem {
    Range(char, char),
    Single(char),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub name: String,
    pub name_span: Span,
    pub expr: Expr,
    pub file: FileId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub names: Vec<String>,
    pub path: String,
    pub span: Span,
    pub file: FileId,
}

/// A Grammar is an ordered sequence of Definitions plus an ordered
/// sequence of Imports (spec §3), exposing a name→Definition map for
/// O(1) resolution. The first definition is the entry rule.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub definitions: Vec<Definition>,
    pub imports: Vec<Import>,
    index: IndexMap<String, usize>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_definition(&mut self, def: Definition) {
        let idx = self.definitions.len();
        self.index.insert(def.name.clone(), idx);
        self.definitions.push(def);
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.index.get(name).map(|&i| &self.definitions[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// The entry rule: the first definition in source order (spec §4.3,
    /// "starting from the first (entry) definition").
    pub fn entry(&self) -> Option<&Definition> {
        self.definitions.first()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name.as_str())
    }
}

/// Walks every `Identifier` reference transitively reachable from `expr`,
/// calling `visit` for each one. Used by reachability (§4.3) and the
/// compiler's reference resolution.
pub fn walk_references(expr: &Expr, visit: &mut impl FnMut(&str)) {
    match &expr.kind {
        ExprKind::Identifier(name) => visit(name),
        ExprKind::Literal(_) | ExprKind::Class(_) | ExprKind::Charset(_) | ExprKind::Any => {}
        ExprKind::Sequence(items) => {
            for item in items {
                walk_references(item, visit);
            }
        }
        ExprKind::Choice(a, b) => {
            walk_references(a, visit);
            walk_references(b, visit);
        }
        ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::Optional(e)
        | ExprKind::Not(e)
        | ExprKind::And(e)
        | ExprKind::Lex(e)
        | ExprKind::Quiet(e)
        | ExprKind::BlockCapture(e)
        | ExprKind::Labeled(e, _)
        | ExprKind::NodeCapture(_, e) => walk_references(e, visit),
    }
}

/// True if `expr`'s subtree contains only literals, charsets, classes,
/// predicates, `Any`, and combinators over syntactic subexpressions --
/// i.e. it never calls another rule (spec §4.4 step 3's "syntactic"
/// classification).
pub fn is_syntactic_shape(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Identifier(_) => false,
        ExprKind::Literal(_) | ExprKind::Class(_) | ExprKind::Charset(_) | ExprKind::Any => true,
        ExprKind::Sequence(items) => items.iter().all(is_syntactic_shape),
        ExprKind::Choice(a, b) => is_syntactic_shape(a) && is_syntactic_shape(b),
        ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::Optional(e)
        | ExprKind::Not(e)
        | ExprKind::And(e)
        | ExprKind::Lex(e)
        | ExprKind::Quiet(e)
        | ExprKind::BlockCapture(e)
        | ExprKind::Labeled(e, _)
        | ExprKind::NodeCapture(_, e) => is_syntactic_shape(e),
    }
}
