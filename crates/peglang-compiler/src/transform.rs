//! AST→AST rewrites applied between resolution and compilation (spec
//! §4.4). `pipeline` runs all five passes, in order, as a single pure
//! function; each pass lives in its own `fn` so it can be golden-tested
//! in isolation.

use peglang_core::{Charset, FileId, Location, Span};

use crate::grammar::{ClassItem, Definition, Expr, ExprKind, Grammar};

/// Toggles for the transform pipeline (spec §4.4, §6.2 CLI flags).
/// Defaults match a grammar compiled with no `-disable-*` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CompileOptions {
    pub builtins: bool,
    pub charsets: bool,
    pub spaces: bool,
    pub captures: bool,
    pub capture_spaces: bool,
    pub inline: bool,
    pub inline_threshold: usize,
    pub show_fails: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            builtins: true,
            charsets: true,
            spaces: true,
            captures: true,
            capture_spaces: true,
            inline: true,
            inline_threshold: 3,
            show_fails: false,
        }
    }
}

const BUILTIN_FILE: FileId = FileId::from_raw(u32::MAX);

fn synthetic_span() -> Span {
    Span::point(Location::START)
}

fn atom(kind: ExprKind) -> Expr {
    Expr::new(synthetic_span(), BUILTIN_FILE, kind)
}

/// Runs the five transform passes in spec order, producing the Grammar
/// the compiler emits bytecode from.
pub fn pipeline(grammar: Grammar, options: &CompileOptions) -> Grammar {
    let mut grammar = grammar;
    if options.builtins {
        grammar = inject_builtins(grammar);
    }
    if options.charsets {
        grammar = synthesize_charsets(grammar);
    }
    if options.spaces {
        grammar = insert_spacing(grammar, options.capture_spaces);
    }
    if !options.captures {
        grammar = strip_captures(grammar);
    }
    if options.inline {
        grammar = inline_small_rules(grammar, options.inline_threshold);
    }
    grammar = desugar(grammar);
    grammar
}

/// Names `inject_builtins` may prepend. Shared with callers (the
/// unused-rule analysis) that need to recognize a builtin by name
/// without constructing its body.
pub const BUILTIN_NAMES: &[&str] = &["Spacing", "Digit", "Alpha"];

/// Pass 1: prepend `Spacing` and a handful of common character classes,
/// unless the grammar already defines them itself.
pub fn inject_builtins(mut grammar: Grammar) -> Grammar {
    let builtins: &[(&str, ExprKind)] = &[
        (
            "Spacing",
            ExprKind::ZeroOrMore(Box::new(atom(ExprKind::Class(vec![
                ClassItem::Single(' '),
                ClassItem::Single('\t'),
                ClassItem::Single('\r'),
                ClassItem::Single('\n'),
            ])))),
        ),
        (
            "Digit",
            ExprKind::Class(vec![ClassItem::Range('0', '9')]),
        ),
        (
            "Alpha",
            ExprKind::Class(vec![ClassItem::Range('a', 'z'), ClassItem::Range('A', 'Z')]),
        ),
    ];

    let mut prelude = Vec::new();
    for &(name, ref kind) in builtins {
        if !grammar.contains(name) {
            prelude.push(Definition {
                name: name.to_string(),
                name_span: synthetic_span(),
                expr: atom(kind.clone()),
                file: BUILTIN_FILE,
            });
        }
    }
    if prelude.is_empty() {
        return grammar;
    }

    let mut merged = Grammar::new();
    for def in prelude {
        merged.push_definition(def);
    }
    for def in std::mem::take(&mut grammar.definitions) {
        merged.push_definition(def);
    }
    merged.imports = grammar.imports;
    merged
}

/// Pass 2: fold single-character alternatives into [`Charset`] bitsets so
/// the compiler can emit one `Set` instruction instead of a `Choice`
/// chain (spec §4.4 step 2).
pub fn synthesize_charsets(grammar: Grammar) -> Grammar {
    map_definitions(grammar, |def| Definition { expr: synthesize_expr(def.expr), ..def })
}

fn synthesize_expr(expr: Expr) -> Expr {
    let span = expr.span;
    let file = expr.file;
    let kind = match expr.kind {
        ExprKind::Class(items) => match charset_from_items(&items) {
            Some(cs) => ExprKind::Charset(cs),
            None => ExprKind::Class(items),
        },
        ExprKind::Literal(text) => {
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => match Charset::singleton(c as u32) {
                    Some(cs) => ExprKind::Charset(cs),
                    None => ExprKind::Literal(text),
                },
                _ => ExprKind::Literal(text),
            }
        }
        ExprKind::Choice(a, b) => {
            let a = synthesize_expr(*a);
            let b = synthesize_expr(*b);
            match (&a.kind, &b.kind) {
                (ExprKind::Charset(ca), ExprKind::Charset(cb)) => ExprKind::Charset(ca.union(cb)),
                _ => ExprKind::Choice(Box::new(a), Box::new(b)),
            }
        }
        ExprKind::Sequence(items) => {
            let items: Vec<Expr> = items.into_iter().map(synthesize_expr).collect();
            match complement_shape(&items) {
                Some(cs) => ExprKind::Charset(cs),
                None => ExprKind::Sequence(items),
            }
        }
        ExprKind::ZeroOrMore(e) => ExprKind::ZeroOrMore(Box::new(synthesize_expr(*e))),
        ExprKind::OneOrMore(e) => ExprKind::OneOrMore(Box::new(synthesize_expr(*e))),
        ExprKind::Optional(e) => ExprKind::Optional(Box::new(synthesize_expr(*e))),
        ExprKind::Not(e) => ExprKind::Not(Box::new(synthesize_expr(*e))),
        ExprKind::And(e) => ExprKind::And(Box::new(synthesize_expr(*e))),
        ExprKind::Lex(e) => ExprKind::Lex(Box::new(synthesize_expr(*e))),
        ExprKind::Quiet(e) => ExprKind::Quiet(Box::new(synthesize_expr(*e))),
        ExprKind::BlockCapture(e) => ExprKind::BlockCapture(Box::new(synthesize_expr(*e))),
        ExprKind::NodeCapture(name, e) => ExprKind::NodeCapture(name, Box::new(synthesize_expr(*e))),
        ExprKind::Labeled(e, label) => ExprKind::Labeled(Box::new(synthesize_expr(*e)), label),
        other @ (ExprKind::Identifier(_) | ExprKind::Any | ExprKind::Charset(_)) => other,
    };
    Expr::new(span, file, kind)
}

fn charset_from_items(items: &[ClassItem]) -> Option<Charset> {
    let mut cs = Charset::EMPTY;
    for item in items {
        let piece = match *item {
            ClassItem::Single(c) => Charset::singleton(c as u32)?,
            ClassItem::Range(lo, hi) => Charset::range(lo as u32, hi as u32)?,
        };
        cs = cs.union(&piece);
    }
    Some(cs)
}

/// `Seq(Not(singleton-char), Any)` recognizes "any character except c";
/// spec §4.4 step 2 asks for this to fold into the complement charset.
fn complement_shape(items: &[Expr]) -> Option<Charset> {
    let [first, second] = items else { return None };
    let ExprKind::Not(inner) = &first.kind else { return None };
    let ExprKind::Any = &second.kind else { return None };
    let singleton = match &inner.kind {
        ExprKind::Literal(s) if s.chars().count() == 1 => Charset::singleton(s.chars().next().unwrap() as u32)?,
        ExprKind::Charset(cs) => *cs,
        _ => return None,
    };
    Some(singleton.complement())
}

/// Pass 3: classify every definition as syntactic or non-syntactic and
/// insert `Spacing` calls into non-syntactic sequences (spec §4.4 step
/// 3). Insertion is suppressed inside a `Lex` scope, and -- when
/// `capture_spaces` is false (`-disable-capture-spaces`) -- inside a
/// `Node`/`Block` capture's own body too, the same way `Lex` suppresses
/// it, so a disabled capture-spaces grammar must account for whitespace
/// itself inside `%{...}`/`%Foo{...}` and the captured text round-trips
/// exactly instead of silently swallowing injected whitespace.
pub fn insert_spacing(grammar: Grammar, capture_spaces: bool) -> Grammar {
    if !grammar.contains("Spacing") {
        return grammar;
    }
    let syntactic: std::collections::HashSet<String> = grammar
        .definitions
        .iter()
        .filter(|d| is_syntactic_definition(&grammar, d))
        .map(|d| d.name.clone())
        .collect();

    map_definitions(grammar, |def| {
        if syntactic.contains(&def.name) {
            def
        } else {
            Definition { expr: space_expr(def.expr, false, capture_spaces), ..def }
        }
    })
}

fn is_syntactic_definition(grammar: &Grammar, def: &Definition) -> bool {
    fn walk(grammar: &Grammar, expr: &Expr, seen: &mut std::collections::HashSet<String>) -> bool {
        match &expr.kind {
            ExprKind::Identifier(name) => {
                if !seen.insert(name.clone()) {
                    return true;
                }
                match grammar.get(name) {
                    Some(d) => walk(grammar, &d.expr, seen),
                    None => true,
                }
            }
            ExprKind::Literal(_) | ExprKind::Class(_) | ExprKind::Charset(_) | ExprKind::Any => true,
            ExprKind::Sequence(items) => items.iter().all(|e| walk(grammar, e, seen)),
            ExprKind::Choice(a, b) => walk(grammar, a, seen) && walk(grammar, b, seen),
            ExprKind::ZeroOrMore(e)
            | ExprKind::OneOrMore(e)
            | ExprKind::Optional(e)
            | ExprKind::Not(e)
            | ExprKind::And(e)
            | ExprKind::Lex(e)
            | ExprKind::Quiet(e)
            | ExprKind::BlockCapture(e)
            | ExprKind::Labeled(e, _)
            | ExprKind::NodeCapture(_, e) => walk(grammar, e, seen),
        }
    }
    let mut seen = std::collections::HashSet::new();
    walk(grammar, &def.expr, &mut seen)
}

fn space_expr(expr: Expr, in_lex: bool, capture_spaces: bool) -> Expr {
    let span = expr.span;
    let file = expr.file;
    let kind = match expr.kind {
        ExprKind::Sequence(items) => {
            let mut out = Vec::with_capacity(items.len() * 2);
            for item in items {
                if !in_lex {
                    out.push(spacing_call(span, file));
                }
                out.push(space_expr(item, in_lex, capture_spaces));
            }
            ExprKind::Sequence(out)
        }
        ExprKind::Choice(a, b) => ExprKind::Choice(
            Box::new(space_expr(*a, in_lex, capture_spaces)),
            Box::new(space_expr(*b, in_lex, capture_spaces)),
        ),
        ExprKind::ZeroOrMore(e) => ExprKind::ZeroOrMore(Box::new(space_expr(*e, in_lex, capture_spaces))),
        ExprKind::OneOrMore(e) => ExprKind::OneOrMore(Box::new(space_expr(*e, in_lex, capture_spaces))),
        ExprKind::Optional(e) => ExprKind::Optional(Box::new(space_expr(*e, in_lex, capture_spaces))),
        ExprKind::Not(e) => ExprKind::Not(Box::new(space_expr(*e, in_lex, capture_spaces))),
        ExprKind::And(e) => ExprKind::And(Box::new(space_expr(*e, in_lex, capture_spaces))),
        ExprKind::Lex(e) => ExprKind::Lex(Box::new(space_expr(*e, true, capture_spaces))),
        ExprKind::Quiet(e) => ExprKind::Quiet(Box::new(space_expr(*e, in_lex, capture_spaces))),
        ExprKind::BlockCapture(e) => {
            ExprKind::BlockCapture(Box::new(space_expr(*e, in_lex || !capture_spaces, capture_spaces)))
        }
        ExprKind::NodeCapture(name, e) => {
            ExprKind::NodeCapture(name, Box::new(space_expr(*e, in_lex || !capture_spaces, capture_spaces)))
        }
        ExprKind::Labeled(e, label) => {
            ExprKind::Labeled(Box::new(space_expr(*e, in_lex, capture_spaces)), label)
        }
        other => other,
    };
    Expr::new(span, file, kind)
}

fn spacing_call(span: Span, file: FileId) -> Expr {
    Expr::new(span, file, ExprKind::Identifier("Spacing".to_string()))
}

/// `-disable-captures`: drops every `Node`/`Block` capture from the
/// grammar, the same way `desugar`'s `Quiet` handling drops the one
/// capture it wraps, so `compile::emit_capture` never runs and no
/// `CapOpen`/`CapClose` pair is ever emitted.
pub fn strip_captures(grammar: Grammar) -> Grammar {
    map_definitions(grammar, |def| Definition { expr: strip_captures_expr(def.expr), ..def })
}

fn strip_captures_expr(expr: Expr) -> Expr {
    let span = expr.span;
    let file = expr.file;
    let kind = match expr.kind {
        ExprKind::NodeCapture(_, e) | ExprKind::BlockCapture(e) => return strip_captures_expr(*e),
        ExprKind::Sequence(items) => ExprKind::Sequence(items.into_iter().map(strip_captures_expr).collect()),
        ExprKind::Choice(a, b) => ExprKind::Choice(
            Box::new(strip_captures_expr(*a)),
            Box::new(strip_captures_expr(*b)),
        ),
        ExprKind::ZeroOrMore(e) => ExprKind::ZeroOrMore(Box::new(strip_captures_expr(*e))),
        ExprKind::OneOrMore(e) => ExprKind::OneOrMore(Box::new(strip_captures_expr(*e))),
        ExprKind::Optional(e) => ExprKind::Optional(Box::new(strip_captures_expr(*e))),
        ExprKind::Not(e) => ExprKind::Not(Box::new(strip_captures_expr(*e))),
        ExprKind::And(e) => ExprKind::And(Box::new(strip_captures_expr(*e))),
        ExprKind::Lex(e) => ExprKind::Lex(Box::new(strip_captures_expr(*e))),
        ExprKind::Quiet(e) => ExprKind::Quiet(Box::new(strip_captures_expr(*e))),
        ExprKind::Labeled(e, label) => ExprKind::Labeled(Box::new(strip_captures_expr(*e)), label),
        other => other,
    };
    Expr::new(span, file, kind)
}

/// Pass 4: expand references to small, non-recursive rules at their call
/// sites (spec §4.4 step 4). A rule is inlinable if it has no node
/// capture of its own (inlining would duplicate the capture name), isn't
/// (transitively) recursive, and its emitted size is below `threshold`
/// nodes.
pub fn inline_small_rules(grammar: Grammar, threshold: usize) -> Grammar {
    let recursive: std::collections::HashSet<String> = crate::analyze::recursive_sets(&grammar)
        .into_iter()
        .flat_map(|set| set.members)
        .collect();

    let inlinable: std::collections::HashMap<String, Expr> = grammar
        .definitions
        .iter()
        .filter(|d| !recursive.contains(&d.name) && node_count(&d.expr) <= threshold && !has_node_capture(&d.expr))
        .map(|d| (d.name.clone(), d.expr.clone()))
        .collect();

    map_definitions(grammar, |def| {
        if inlinable.contains_key(&def.name) {
            // Keep the standalone definition; only call sites are inlined.
            def
        } else {
            Definition { expr: inline_expr(def.expr, &inlinable, 0), ..def }
        }
    })
}

fn node_count(expr: &Expr) -> usize {
    1 + match &expr.kind {
        ExprKind::Sequence(items) => items.iter().map(node_count).sum(),
        ExprKind::Choice(a, b) => node_count(a) + node_count(b),
        ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::Optional(e)
        | ExprKind::Not(e)
        | ExprKind::And(e)
        | ExprKind::Lex(e)
        | ExprKind::Quiet(e)
        | ExprKind::BlockCapture(e)
        | ExprKind::Labeled(e, _)
        | ExprKind::NodeCapture(_, e) => node_count(e),
        _ => 0,
    }
}

fn has_node_capture(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::NodeCapture(..) => true,
        ExprKind::Sequence(items) => items.iter().any(has_node_capture),
        ExprKind::Choice(a, b) => has_node_capture(a) || has_node_capture(b),
        ExprKind::ZeroOrMore(e)
        | ExprKind::OneOrMore(e)
        | ExprKind::Optional(e)
        | ExprKind::Not(e)
        | ExprKind::And(e)
        | ExprKind::Lex(e)
        | ExprKind::Quiet(e)
        | ExprKind::BlockCapture(e)
        | ExprKind::Labeled(e, _) => has_node_capture(e),
        _ => false,
    }
}

/// Recursion depth caps against pathologically deep inline chains; 32
/// levels is far beyond any grammar a human would write by hand.
const MAX_INLINE_DEPTH: usize = 32;

fn inline_expr(expr: Expr, table: &std::collections::HashMap<String, Expr>, depth: usize) -> Expr {
    let span = expr.span;
    let file = expr.file;
    if let ExprKind::Identifier(name) = &expr.kind {
        if depth < MAX_INLINE_DEPTH {
            if let Some(body) = table.get(name) {
                return inline_expr(body.clone(), table, depth + 1);
            }
        }
        return expr;
    }
    let kind = match expr.kind {
        ExprKind::Sequence(items) => ExprKind::Sequence(items.into_iter().map(|e| inline_expr(e, table, depth)).collect()),
        ExprKind::Choice(a, b) => ExprKind::Choice(
            Box::new(inline_expr(*a, table, depth)),
            Box::new(inline_expr(*b, table, depth)),
        ),
        ExprKind::ZeroOrMore(e) => ExprKind::ZeroOrMore(Box::new(inline_expr(*e, table, depth))),
        ExprKind::OneOrMore(e) => ExprKind::OneOrMore(Box::new(inline_expr(*e, table, depth))),
        ExprKind::Optional(e) => ExprKind::Optional(Box::new(inline_expr(*e, table, depth))),
        ExprKind::Not(e) => ExprKind::Not(Box::new(inline_expr(*e, table, depth))),
        ExprKind::And(e) => ExprKind::And(Box::new(inline_expr(*e, table, depth))),
        ExprKind::Lex(e) => ExprKind::Lex(Box::new(inline_expr(*e, table, depth))),
        ExprKind::Quiet(e) => ExprKind::Quiet(Box::new(inline_expr(*e, table, depth))),
        ExprKind::BlockCapture(e) => ExprKind::BlockCapture(Box::new(inline_expr(*e, table, depth))),
        ExprKind::NodeCapture(name, e) => ExprKind::NodeCapture(name, Box::new(inline_expr(*e, table, depth))),
        ExprKind::Labeled(e, label) => ExprKind::Labeled(Box::new(inline_expr(*e, table, depth)), label),
        other => other,
    };
    Expr::new(span, file, kind)
}

/// Pass 5: rewrite syntactic sugar into the primitive operators the
/// compiler's emission table (spec §4.5) knows about: `&e -> !!e`,
/// `e+ -> e e*`, `e? -> &ee / !e`; a `Quiet` prefix drops the node
/// capture it wraps, since `;%Foo{e}` exists only to silence a capture
/// that would otherwise be emitted.
pub fn desugar(grammar: Grammar) -> Grammar {
    map_definitions(grammar, |def| Definition { expr: desugar_expr(def.expr), ..def })
}

fn desugar_expr(expr: Expr) -> Expr {
    let span = expr.span;
    let file = expr.file;
    match expr.kind {
        ExprKind::And(e) => {
            let inner = desugar_expr(*e);
            let not_once = Expr::new(span, file, ExprKind::Not(Box::new(inner)));
            Expr::new(span, file, ExprKind::Not(Box::new(not_once)))
        }
        ExprKind::OneOrMore(e) => {
            let inner = desugar_expr(*e);
            let star = Expr::new(span, file, ExprKind::ZeroOrMore(Box::new(inner.clone())));
            Expr::new(span, file, ExprKind::Sequence(vec![inner, star]))
        }
        ExprKind::Optional(e) => {
            let inner = desugar_expr(*e);
            let lookahead = Expr::new(span, file, ExprKind::And(Box::new(inner.clone())));
            let lookahead = desugar_expr(lookahead);
            let consume = Expr::new(span, file, ExprKind::Sequence(vec![lookahead, inner.clone()]));
            let skip = Expr::new(span, file, ExprKind::Not(Box::new(inner)));
            Expr::new(span, file, ExprKind::Choice(Box::new(consume), Box::new(skip)))
        }
        ExprKind::Quiet(e) => {
            let inner = *e;
            match inner.kind {
                ExprKind::NodeCapture(_, body) | ExprKind::BlockCapture(body) => desugar_expr(*body),
                other => desugar_expr(Expr::new(inner.span, inner.file, other)),
            }
        }
        ExprKind::Sequence(items) => Expr::new(span, file, ExprKind::Sequence(items.into_iter().map(desugar_expr).collect())),
        ExprKind::Choice(a, b) => Expr::new(
            span,
            file,
            ExprKind::Choice(Box::new(desugar_expr(*a)), Box::new(desugar_expr(*b))),
        ),
        ExprKind::ZeroOrMore(e) => Expr::new(span, file, ExprKind::ZeroOrMore(Box::new(desugar_expr(*e)))),
        ExprKind::Not(e) => Expr::new(span, file, ExprKind::Not(Box::new(desugar_expr(*e)))),
        ExprKind::Lex(e) => Expr::new(span, file, ExprKind::Lex(Box::new(desugar_expr(*e)))),
        ExprKind::BlockCapture(e) => Expr::new(span, file, ExprKind::BlockCapture(Box::new(desugar_expr(*e)))),
        ExprKind::NodeCapture(name, e) => Expr::new(span, file, ExprKind::NodeCapture(name, Box::new(desugar_expr(*e)))),
        ExprKind::Labeled(e, label) => Expr::new(span, file, ExprKind::Labeled(Box::new(desugar_expr(*e)), label)),
        other => Expr::new(span, file, other),
    }
}

fn map_definitions(mut grammar: Grammar, f: impl Fn(Definition) -> Definition) -> Grammar {
    let defs = std::mem::take(&mut grammar.definitions);
    let mut rebuilt = Grammar::new();
    for def in defs {
        rebuilt.push_definition(f(def));
    }
    rebuilt.imports = grammar.imports;
    rebuilt
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
    fn injects_spacing_when_absent() {
        let g = inject_builtins(grammar("A <- \"x\""));
        assert!(g.contains("Spacing"));
    }

    #[test]
    fn does_not_duplicate_existing_spacing() {
        let g = inject_builtins(grammar("Spacing <- \" \"*\nA <- \"x\""));
        assert_eq!(g.definitions.iter().filter(|d| d.name == "Spacing").count(), 1);
    }

    #[test]
    fn folds_single_char_literal_into_charset() {
        let g = synthesize_charsets(grammar("A <- \"x\""));
        assert!(matches!(g.get("A").unwrap().expr.kind, ExprKind::Charset(_)));
    }

    #[test]
    fn desugars_one_or_more_into_seq_of_base_and_star() {
        let g = desugar(grammar("A <- \"x\"+"));
        match &g.get("A").unwrap().expr.kind {
            ExprKind::Sequence(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[1].kind, ExprKind::ZeroOrMore(_)));
            }
            other => panic!("expected Sequence, got {other:?}"),
        }
    }

    #[test]
    fn desugars_and_predicate_into_double_not() {
        let g = desugar(grammar("A <- &\"x\""));
        match &g.get("A").unwrap().expr.kind {
            ExprKind::Not(inner) => assert!(matches!(inner.kind, ExprKind::Not(_))),
            other => panic!("expected Not(Not(_)), got {other:?}"),
        }
    }

    #[test]
    fn quiet_prefix_drops_the_capture_it_wraps() {
        let g = desugar(grammar("A <- ;%Foo{\"x\"}"));
        assert!(matches!(g.get("A").unwrap().expr.kind, ExprKind::Literal(_)));
    }

    #[test]
    fn disabling_captures_strips_node_and_block_captures() {
        let g = strip_captures(grammar("A <- %Foo{\"x\"} %{\"y\"}"));
        match &g.get("A").unwrap().expr.kind {
            ExprKind::Sequence(items) => {
                assert!(items.iter().all(|e| matches!(e.kind, ExprKind::Literal(_))));
            }
            other => panic!("expected Sequence, got {other:?}"),
        }
    }

    #[test]
    fn disabling_capture_spaces_suppresses_spacing_inside_a_capture() {
        let g = grammar("A <- %Foo{\"x\" \"y\"}");
        let spaced = space_expr(g.get("A").unwrap().expr.clone(), false, false);
        let ExprKind::NodeCapture(_, body) = &spaced.kind else {
            panic!("expected NodeCapture");
        };
        match &body.kind {
            ExprKind::Sequence(items) => assert_eq!(items.len(), 2, "no Spacing call injected"),
            other => panic!("expected Sequence, got {other:?}"),
        }
    }

    #[test]
    fn capture_spaces_enabled_by_default_inserts_spacing_inside_a_capture() {
        let g = grammar("A <- %Foo{\"x\" \"y\"}");
        let spaced = space_expr(g.get("A").unwrap().expr.clone(), false, true);
        let ExprKind::NodeCapture(_, body) = &spaced.kind else {
            panic!("expected NodeCapture");
        };
        match &body.kind {
            ExprKind::Sequence(items) => assert_eq!(items.len(), 4, "Spacing calls should be injected"),
            other => panic!("expected Sequence, got {other:?}"),
        }
    }
}
