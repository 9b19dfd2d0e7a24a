//! Pure AST→value analyses over a resolved [`Grammar`] (spec §4.3).

use std::collections::{HashMap, HashSet};

use peglang_core::{DiagnosticCode, Span};

use crate::diagnostics::Diagnostics;
use crate::grammar::{walk_references, Expr, ExprKind, Grammar};

/// Reachable rule names starting from the entry definition (spec §4.3
/// "UsedRules").
pub fn used_rules(grammar: &Grammar) -> HashSet<String> {
    let mut used = HashSet::new();
    let Some(entry) = grammar.entry() else {
        return used;
    };
    let mut worklist = vec![entry.name.clone()];
    used.insert(entry.name.clone());
    while let Some(name) = worklist.pop() {
        let Some(def) = grammar.get(&name) else { continue };
        let mut refs = Vec::new();
        walk_references(&def.expr, &mut |r| refs.push(r.to_string()));
        for r in refs {
            if used.insert(r.clone()) {
                worklist.push(r);
            }
        }
    }
    used
}

/// Emits `unused-rule` warnings for every definition not reachable from
/// the entry rule. `builtins` are excluded even if unreferenced, since
/// the inject-builtins transform may add them speculatively.
pub fn unused_rules(grammar: &Grammar, builtins: &HashSet<String>, diagnostics: &mut Diagnostics) {
    let used = used_rules(grammar);
    for def in &grammar.definitions {
        if !used.contains(&def.name) && !builtins.contains(&def.name) {
            diagnostics
                .report(DiagnosticCode::UnusedRule, def.file, path_for(grammar, def.file), def.name_span)
                .message(format!("rule `{}` is never used", def.name))
                .emit();
        }
    }
}

/// Emits `undefined-rule` for every reference with no matching Definition
/// (spec §4.3 "UndefinedReferences").
pub fn undefined_references(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    for def in &grammar.definitions {
        visit_identifiers(&def.expr, &mut |expr, name| {
            if !grammar.contains(name) {
                diagnostics
                    .report(DiagnosticCode::UndefinedRule, expr.file, path_for(grammar, expr.file), expr.span)
                    .message(format!("`{name}` is not defined"))
                    .emit();
            }
        });
    }
}

fn visit_identifiers<'a>(expr: &'a Expr, visit: &mut impl FnMut(&'a Expr, &'a str)) {
    if let ExprKind::Identifier(name) = &expr.kind {
        visit(expr, name);
    }
    match &expr.kind {
        ExprKind::Sequence(items) => items.iter().for_each(|e| visit_identifiers(e, visit)),
        ExprKind::Choice(a, b) => {
            visit_identifiers(a, visit);
            visit_identifiers(b, visit);
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
        | ExprKind::NodeCapture(_, e) => visit_identifiers(e, visit),
        _ => {}
    }
}

/// The set of rule names reachable from `expr` without first consuming
/// any input -- the "head position" call set used for left-recursion
/// detection. Approximates sequence nullability by only descending into
/// a sequence's first item (sound for the common case of non-nullable
/// leading items; a fully precise analysis would need a nullability
/// pass over the whole grammar).
fn head_calls<'a>(expr: &'a Expr, out: &mut HashSet<&'a str>) {
    match &expr.kind {
        ExprKind::Identifier(name) => {
            out.insert(name);
        }
        ExprKind::Literal(_) | ExprKind::Class(_) | ExprKind::Charset(_) | ExprKind::Any => {}
        ExprKind::Sequence(items) => {
            if let Some(first) = items.first() {
                head_calls(first, out);
            }
        }
        ExprKind::Choice(a, b) => {
            head_calls(a, out);
            head_calls(b, out);
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
        | ExprKind::NodeCapture(_, e) => head_calls(e, out),
    }
}

/// A strongly connected component of the (head-position) call graph.
#[derive(Debug, Clone)]
pub struct RecursiveSet {
    pub members: Vec<String>,
}

/// Tarjan SCC over the head-position call graph, used both to report
/// general recursion and, restricted to this graph, left-recursion (spec
/// §4.3 "RecursiveSet").
pub fn recursive_sets(grammar: &Grammar) -> Vec<RecursiveSet> {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for def in &grammar.definitions {
        let mut heads = HashSet::new();
        head_calls(&def.expr, &mut heads);
        graph.insert(def.name.as_str(), heads.into_iter().filter(|n| grammar.contains(n)).collect());
    }

    let mut tarjan = Tarjan::new(&graph);
    for &name in graph.keys() {
        if !tarjan.indices.contains_key(name) {
            tarjan.visit(name);
        }
    }
    tarjan
        .sccs
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.get(scc[0].as_str()).is_some_and(|out| out.contains(&scc[0].as_str())))
        .map(|members| RecursiveSet { members })
        .collect()
}

/// Emits `left-recursion` for every left-recursive SCC found.
pub fn left_recursion(grammar: &Grammar, diagnostics: &mut Diagnostics) {
    for set in recursive_sets(grammar) {
        for name in &set.members {
            if let Some(def) = grammar.get(name) {
                diagnostics
                    .report(DiagnosticCode::LeftRecursion, def.file, path_for(grammar, def.file), def.name_span)
                    .message(format!("rule `{name}` is left-recursive"))
                    .emit();
            }
        }
    }
}

struct Tarjan<'a> {
    graph: &'a HashMap<&'a str, Vec<&'a str>>,
    indices: HashMap<&'a str, usize>,
    low_links: HashMap<&'a str, usize>,
    on_stack: HashSet<&'a str>,
    stack: Vec<&'a str>,
    counter: usize,
    sccs: Vec<Vec<String>>,
}

impl<'a> Tarjan<'a> {
    fn new(graph: &'a HashMap<&'a str, Vec<&'a str>>) -> Self {
        Self {
            graph,
            indices: HashMap::new(),
            low_links: HashMap::new(),
            on_stack: HashSet::new(),
            stack: Vec::new(),
            counter: 0,
            sccs: Vec::new(),
        }
    }

    fn visit(&mut self, node: &'a str) {
        self.indices.insert(node, self.counter);
        self.low_links.insert(node, self.counter);
        self.counter += 1;
        self.stack.push(node);
        self.on_stack.insert(node);

        if let Some(edges) = self.graph.get(node) {
            for &succ in edges {
                if !self.indices.contains_key(succ) {
                    self.visit(succ);
                    let low = self.low_links[succ].min(self.low_links[node]);
                    self.low_links.insert(node, low);
                } else if self.on_stack.contains(succ) {
                    let low = self.indices[succ].min(self.low_links[node]);
                    self.low_links.insert(node, low);
                }
            }
        }

        if self.low_links[node] == self.indices[node] {
            let mut members = Vec::new();
            loop {
                let member = self.stack.pop().expect("SCC root must be on stack");
                self.on_stack.remove(member);
                members.push(member.to_string());
                if member == node {
                    break;
                }
            }
            self.sccs.push(members);
        }
    }
}

fn path_for(grammar: &Grammar, file: peglang_core::FileId) -> std::path::PathBuf {
    // The file table lives in the database; analyses only see a
    // FileId-tagged AST, so callers that need a real path re-stamp it.
    let _ = grammar;
    std::path::PathBuf::from(format!("<file {}>", file.as_u32()))
}

/// A point query result for LSP-style surfaces (spec §4.3, §6.5): the
/// innermost expression containing `cursor`, plus the definition it sits
/// in.
#[derive(Debug, Clone)]
pub struct SymbolAtCursor<'a> {
    pub definition: &'a str,
    pub expr: &'a Expr,
}

pub fn symbol_at_cursor(grammar: &Grammar, cursor: u32) -> Option<SymbolAtCursor<'_>> {
    for def in &grammar.definitions {
        if def.expr.span.contains(&Span::point(peglang_core::Location::new(0, 0, cursor))) {
            if let Some(found) = innermost(&def.expr, cursor) {
                return Some(SymbolAtCursor { definition: &def.name, expr: found });
            }
        }
    }
    None
}

fn innermost(expr: &Expr, cursor: u32) -> Option<&Expr> {
    if !expr.span.contains(&Span::point(peglang_core::Location::new(0, 0, cursor))) {
        return None;
    }
    let children: Vec<&Expr> = match &expr.kind {
        ExprKind::Sequence(items) => items.iter().collect(),
        ExprKind::Choice(a, b) => vec![a.as_ref(), b.as_ref()],
        ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::Optional(e)
        | ExprKind::Not(e)
        | ExprKind::And(e)
        | ExprKind::Lex(e)
        | ExprKind::Quiet(e)
        | ExprKind::BlockCapture(e)
        | ExprKind::Labeled(e, _)
        | ExprKind::NodeCapture(_, e) => vec![e.as_ref()],
        _ => Vec::new(),
    };
    for child in children {
        if let Some(found) = innermost(child, cursor) {
            return Some(found);
        }
    }
    Some(expr)
}

/// Classification for `SemanticTokens` (spec §4.3, §6.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Rule,
    Literal,
    Class,
    Label,
    Import,
}

pub fn semantic_tokens(grammar: &Grammar) -> Vec<(Span, TokenKind)> {
    let mut tokens = Vec::new();
    for def in &grammar.definitions {
        collect_tokens(&def.expr, &mut tokens);
    }
    for import in &grammar.imports {
        tokens.push((import.span, TokenKind::Import));
    }
    tokens
}

fn collect_tokens(expr: &Expr, out: &mut Vec<(Span, TokenKind)>) {
    match &expr.kind {
        ExprKind::Identifier(_) => out.push((expr.span, TokenKind::Rule)),
        ExprKind::Literal(_) => out.push((expr.span, TokenKind::Literal)),
        ExprKind::Class(_) | ExprKind::Charset(_) => out.push((expr.span, TokenKind::Class)),
        ExprKind::Labeled(e, _) => {
            collect_tokens(e, out);
            out.push((expr.span, TokenKind::Label));
        }
        ExprKind::Sequence(items) => items.iter().for_each(|e| collect_tokens(e, out)),
        ExprKind::Choice(a, b) => {
            collect_tokens(a, out);
            collect_tokens(b, out);
        }
        ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::Optional(e)
        | ExprKind::Not(e)
        | ExprKind::And(e)
        | ExprKind::Lex(e)
        | ExprKind::Quiet(e)
        | ExprKind::BlockCapture(e)
        | ExprKind::NodeCapture(_, e) => collect_tokens(e, out),
        ExprKind::Any => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use peglang_core::FileId;
    use std::path::PathBuf;

    fn grammar(src: &str) -> Grammar {
        parser::parse(src, FileId::from_raw(0), PathBuf::from("t.peg")).grammar
    }

    #[test]
    fn finds_unused_rules() {
        let g = grammar("A <- \"x\"\nB <- \"y\"");
        let used = used_rules(&g);
        assert!(used.contains("A"));
        assert!(!used.contains("B"));
    }

    #[test]
    fn detects_undefined_reference() {
        let g = grammar("A <- B");
        let mut diags = Diagnostics::new();
        undefined_references(&g, &mut diags);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn detects_direct_left_recursion() {
        let g = grammar(r#"E <- E "+" E / "1""#);
        let sets = recursive_sets(&g);
        assert!(sets.iter().any(|s| s.members.contains(&"E".to_string())));
    }

    #[test]
    fn non_recursive_grammar_has_no_sets() {
        let g = grammar(r#"A <- "x" B
B <- "y""#);
        assert!(recursive_sets(&g).is_empty());
    }
}
