//! Plain-data LSP-style surface queries (spec §6.5). These are not a
//! server -- no `lsp-types`, no JSON-RPC -- just functions over the
//! database an embedder's protocol layer can shape into whatever wire
//! format it needs.

use peglang_compiler::analyze::{self, TokenKind};
use peglang_compiler::grammar::{Expr, ExprKind};
use peglang_core::{SourceLocation, Span};

use crate::queries::{resolved_imports, Db, SourceFile};

/// What's under the cursor: the rule its enclosing definition belongs
/// to, and -- if the cursor sits on an identifier -- the definition that
/// identifier resolves to.
#[derive(Debug, Clone)]
pub struct HoverInfo {
    pub enclosing_rule: String,
    pub definition: Option<SourceLocation>,
}

pub fn hover_info(db: &dyn Db, file: SourceFile, cursor: u32) -> Option<HoverInfo> {
    let resolved = resolved_imports(db, file);
    let grammar = resolved.grammar(db);
    let found = analyze::symbol_at_cursor(grammar, cursor)?;
    let definition = match &found.expr.kind {
        ExprKind::Identifier(name) => grammar.get(name).map(|d| SourceLocation::new(d.file, d.name_span)),
        _ => None,
    };
    Some(HoverInfo {
        enclosing_rule: found.definition.to_string(),
        definition,
    })
}

/// Where the identifier under `cursor` is defined, if it's on one.
pub fn definition(db: &dyn Db, file: SourceFile, cursor: u32) -> Option<SourceLocation> {
    hover_info(db, file, cursor)?.definition
}

/// Every reference to `name` across the resolved grammar.
pub fn references(db: &dyn Db, file: SourceFile, name: &str) -> Vec<SourceLocation> {
    let resolved = resolved_imports(db, file);
    let grammar = resolved.grammar(db);
    let mut out = Vec::new();
    for def in &grammar.definitions {
        collect_references(&def.expr, name, &mut out);
    }
    out
}

fn collect_references(expr: &Expr, name: &str, out: &mut Vec<SourceLocation>) {
    if let ExprKind::Identifier(n) = &expr.kind {
        if n == name {
            out.push(SourceLocation::new(expr.file, expr.span));
        }
    }
    match &expr.kind {
        ExprKind::Sequence(items) => items.iter().for_each(|e| collect_references(e, name, out)),
        ExprKind::Choice(a, b) => {
            collect_references(a, name, out);
            collect_references(b, name, out);
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
        | ExprKind::NodeCapture(_, e) => collect_references(e, name, out),
        _ => {}
    }
}

/// Every top-level rule name, with the span of its name (spec §6.5
/// `DocumentSymbols`).
pub fn document_symbols(db: &dyn Db, file: SourceFile) -> Vec<(String, SourceLocation)> {
    let resolved = resolved_imports(db, file);
    resolved
        .grammar(db)
        .definitions
        .iter()
        .map(|d| (d.name.clone(), SourceLocation::new(d.file, d.name_span)))
        .collect()
}

/// Completion candidates: every rule name plus the injected builtins
/// (spec §6.5 `CompletionItems`), since a reference to either is valid
/// wherever an atom is.
pub fn completion_items(db: &dyn Db, file: SourceFile) -> Vec<String> {
    let resolved = resolved_imports(db, file);
    resolved
        .grammar(db)
        .names()
        .map(str::to_string)
        .chain(peglang_compiler::transform::BUILTIN_NAMES.iter().map(|s| s.to_string()))
        .collect()
}

/// Span/kind pairs for syntax highlighting (spec §6.5 `SemanticTokens`).
/// A highlighter only ever needs spans for whatever buffer it is
/// painting, so this includes tokens from the whole resolved grammar
/// (including anything merged in by `@import`) rather than trying to
/// filter by origin file.
pub fn semantic_tokens(db: &dyn Db, file: SourceFile) -> Vec<(Span, TokenKind)> {
    let resolved = resolved_imports(db, file);
    analyze::semantic_tokens(resolved.grammar(db))
}
