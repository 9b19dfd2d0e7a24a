//! Recursive-descent parser for the grammar language (spec §4.1).
//!
//! Parses directly into the owned [`crate::grammar::Grammar`] AST rather
//! than through an intermediate lossless CST: every node already carries
//! a precise `Span`, which is all the downstream analyses and LSP-style
//! queries (spec §4.3, §6.5) need. Recovery follows the same
//! throw-to-a-synchronizing-set shape the compiled grammars themselves
//! use (spec §4.1 "the parser itself uses labeled-failure recovery"),
//! implemented here directly in Rust since this parser bootstraps the
//! language it parses.

use std::path::PathBuf;

use peglang_core::{DiagnosticCode, FileId, Location, Span};

use crate::cst::{token_sets, SyntaxKind, TokenSet};
use crate::diagnostics::Diagnostics;
use crate::grammar::{ClassItem, Definition, Expr, ExprKind, Grammar, Import};
use crate::lexer::{self, Token};
use crate::line_index::LineIndex;

pub struct ParseResult {
    pub grammar: Grammar,
    pub diagnostics: Diagnostics,
}

pub fn parse(source: &str, file: FileId, path: PathBuf) -> ParseResult {
    let tokens = lexer::lex(source);
    let mut parser = Parser {
        source,
        file,
        path,
        lines: LineIndex::new(source),
        tokens,
        pos: 0,
        diagnostics: Diagnostics::new(),
    };
    let grammar = parser.parse_root();
    ParseResult {
        grammar,
        diagnostics: parser.diagnostics,
    }
}

struct Parser<'s> {
    source: &'s str,
    file: FileId,
    path: PathBuf,
    lines: LineIndex,
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Diagnostics,
}

impl<'s> Parser<'s> {
    fn skip_trivia(&mut self) {
        while self.pos < self.tokens.len() && self.tokens[self.pos].kind.is_trivia() {
            self.pos += 1;
        }
    }

    /// Lookahead past trivia; `n == 0` is the current token.
    fn nth(&self, n: usize) -> Option<SyntaxKind> {
        let mut seen = 0;
        let mut i = self.pos;
        while i < self.tokens.len() {
            if !self.tokens[i].kind.is_trivia() {
                if seen == n {
                    return Some(self.tokens[i].kind);
                }
                seen += 1;
            }
            i += 1;
        }
        None
    }

    fn current(&mut self) -> Option<SyntaxKind> {
        self.skip_trivia();
        self.tokens.get(self.pos).map(|t| t.kind)
    }

    fn at(&mut self, kind: SyntaxKind) -> bool {
        self.current() == Some(kind)
    }

    fn at_set(&mut self, set: TokenSet) -> bool {
        self.current().is_some_and(|k| set.contains(k))
    }

    fn at_eof(&mut self) -> bool {
        self.skip_trivia();
        self.pos >= self.tokens.len()
    }

    fn at_text(&mut self, kind: SyntaxKind, text: &str) -> bool {
        self.skip_trivia();
        self.tokens.get(self.pos).is_some_and(|t| {
            t.kind == kind && lexer::token_text(self.source, t) == text
        })
    }

    /// Consume and return the current token, skipping leading trivia first.
    fn bump(&mut self) -> Token {
        self.skip_trivia();
        let token = self.tokens[self.pos];
        self.pos += 1;
        token
    }

    fn eat(&mut self, kind: SyntaxKind) -> Option<Token> {
        if self.at(kind) { Some(self.bump()) } else { None }
    }

    fn text(&self, token: &Token) -> &'s str {
        lexer::token_text(self.source, token)
    }

    fn loc(&self, offset: u32) -> Location {
        self.lines.location(offset)
    }

    fn span(&self, token: &Token) -> Span {
        Span::new(self.loc(token.span.start().into()), self.loc(token.span.end().into()))
    }

    fn span_to_here(&mut self, start: Location) -> Span {
        self.skip_trivia();
        let end = self
            .tokens
            .get(self.pos.saturating_sub(1))
            .map(|t| self.loc(t.span.end().into()))
            .unwrap_or(start);
        Span::new(start, end.max_by_cursor(start))
    }

    fn error(&mut self, code: DiagnosticCode, span: Span) {
        self.diagnostics.report(code, self.file, self.path.clone(), span).emit();
    }

    /// Skip tokens until one in `recovery` (or EOF), reporting `code` at
    /// the current position first.
    fn recover(&mut self, code: DiagnosticCode, recovery: TokenSet) {
        let start = self.current_loc();
        self.error(code, Span::point(start));
        while !self.at_eof() && !self.at_set(recovery) {
            self.bump();
        }
    }

    fn current_loc(&mut self) -> Location {
        self.skip_trivia();
        self.tokens
            .get(self.pos)
            .map(|t| self.loc(t.span.start().into()))
            .unwrap_or_else(|| self.loc(self.source.len() as u32))
    }

    // ---- grammar ----

    fn parse_root(&mut self) -> Grammar {
        let mut grammar = Grammar::new();
        while !self.at_eof() {
            if self.at_text(SyntaxKind::At, "@") {
                if let Some(import) = self.parse_import() {
                    grammar.imports.push(import);
                }
            } else if self.at(SyntaxKind::Id) && self.nth(1) == Some(SyntaxKind::LArrow) {
                if let Some(def) = self.parse_definition() {
                    grammar.push_definition(def);
                }
            } else {
                self.recover(DiagnosticCode::SyntaxError, token_sets::DEF_RECOVERY);
            }
        }
        grammar
    }

    fn parse_import(&mut self) -> Option<Import> {
        let at = self.bump();
        let start = self.loc(at.span.start().into());
        if !self.at_text(SyntaxKind::Id, "import") {
            self.recover(DiagnosticCode::SyntaxError, token_sets::IMPORT_RECOVERY);
            return None;
        }
        self.bump();

        let mut names = Vec::new();
        loop {
            match self.eat(SyntaxKind::Id) {
                Some(t) => names.push(self.text(&t).to_string()),
                None => {
                    let loc = self.current_loc();
                    self.error(DiagnosticCode::MissingImportName, Span::point(loc));
                    break;
                }
            }
            if self.eat(SyntaxKind::Comma).is_none() {
                break;
            }
        }

        if !self.at_text(SyntaxKind::Id, "from") {
            self.recover(DiagnosticCode::SyntaxError, token_sets::IMPORT_RECOVERY);
            let span = self.span_to_here(start);
            return Some(Import { names, path: String::new(), span, file: self.file });
        }
        self.bump();

        let path = match self.eat(SyntaxKind::StringLiteral) {
            Some(t) => lexer::unescape(lexer::literal_content(self.text(&t))),
            None => {
                let loc = self.current_loc();
                self.error(DiagnosticCode::MissingImportSource, Span::point(loc));
                String::new()
            }
        };

        let span = self.span_to_here(start);
        Some(Import { names, path, span, file: self.file })
    }

    fn parse_definition(&mut self) -> Option<Definition> {
        let name_tok = self.bump();
        let name = self.text(&name_tok).to_string();
        let name_span = self.span(&name_tok);
        if self.eat(SyntaxKind::LArrow).is_none() {
            self.error(DiagnosticCode::SyntaxError, name_span);
        }
        let expr = self.parse_choice();
        Some(Definition { name, name_span, expr, file: self.file })
    }

    fn parse_choice(&mut self) -> Expr {
        let start = self.current_loc();
        let lhs = self.parse_sequence();
        if self.eat(SyntaxKind::Slash).is_some() {
            let rhs = self.parse_choice();
            let span = Span::new(start, rhs.span.end.max_by_cursor(lhs.span.end));
            Expr::new(span, self.file, ExprKind::Choice(Box::new(lhs), Box::new(rhs)))
        } else {
            lhs
        }
    }

    fn parse_sequence(&mut self) -> Expr {
        let start = self.current_loc();
        let mut items = Vec::new();
        while self.at_set(token_sets::EXPR_FIRST) {
            items.push(self.parse_labeled());
        }
        match items.len() {
            0 => Expr::new(Span::point(start), self.file, ExprKind::Sequence(Vec::new())),
            1 => items.into_iter().next().unwrap(),
            _ => {
                let end = items.last().unwrap().span.end;
                Expr::new(Span::new(start, end), self.file, ExprKind::Sequence(items))
            }
        }
    }

    fn parse_labeled(&mut self) -> Expr {
        let start = self.current_loc();
        let expr = self.parse_suffix();
        if self.eat(SyntaxKind::Caret).is_some() {
            match self.eat(SyntaxKind::Id) {
                Some(t) => {
                    let label = self.text(&t).to_string();
                    let span = self.span_to_here(start);
                    Expr::new(span, self.file, ExprKind::Labeled(Box::new(expr), label))
                }
                None => {
                    let loc = self.current_loc();
                    self.error(DiagnosticCode::MissingLabelName, Span::point(loc));
                    expr
                }
            }
        } else if let Some(super_kind) = self.eat_superscript() {
            let span = self.span_to_here(start);
            Expr::new(span, self.file, ExprKind::Labeled(Box::new(expr), super_kind))
        } else {
            expr
        }
    }

    /// Superscript digits ¹²³ are sugar for `^1`/`^2`/`^3` (spec §4.1's
    /// "superscript variants" of labeled throws).
    fn eat_superscript(&mut self) -> Option<String> {
        let label = match self.current()? {
            SyntaxKind::SuperOne => "1",
            SyntaxKind::SuperTwo => "2",
            SyntaxKind::SuperThree => "3",
            _ => return None,
        };
        self.bump();
        Some(label.to_string())
    }

    fn parse_suffix(&mut self) -> Expr {
        let start = self.current_loc();
        let mut expr = self.parse_prefix();
        loop {
            let kind = match self.current() {
                Some(SyntaxKind::Star) => ExprKind::ZeroOrMore(Box::new(expr.clone())),
                Some(SyntaxKind::Plus) => ExprKind::OneOrMore(Box::new(expr.clone())),
                Some(SyntaxKind::Question) => ExprKind::Optional(Box::new(expr.clone())),
                _ => break,
            };
            self.bump();
            let span = self.span_to_here(start);
            expr = Expr::new(span, self.file, kind);
        }
        expr
    }

    fn parse_prefix(&mut self) -> Expr {
        let start = self.current_loc();
        let wrap = match self.current() {
            Some(SyntaxKind::Amp) => Some(ExprKind::And as fn(Box<Expr>) -> ExprKind),
            Some(SyntaxKind::Bang) => Some(ExprKind::Not as fn(Box<Expr>) -> ExprKind),
            Some(SyntaxKind::Hash) => Some(ExprKind::Lex as fn(Box<Expr>) -> ExprKind),
            Some(SyntaxKind::Semi) => Some(ExprKind::Quiet as fn(Box<Expr>) -> ExprKind),
            _ => None,
        };
        if let Some(make) = wrap {
            self.bump();
            let inner = self.parse_prefix();
            let span = self.span_to_here(start);
            Expr::new(span, self.file, make(Box::new(inner)))
        } else {
            self.parse_atom()
        }
    }

    fn parse_atom(&mut self) -> Expr {
        let start = self.current_loc();
        let Some(kind) = self.current() else {
            self.error(DiagnosticCode::SyntaxError, Span::point(start));
            return Expr::new(Span::point(start), self.file, ExprKind::Sequence(Vec::new()));
        };
        match kind {
            SyntaxKind::Id => {
                let t = self.bump();
                Expr::new(self.span(&t), self.file, ExprKind::Identifier(self.text(&t).to_string()))
            }
            SyntaxKind::StringLiteral => {
                let t = self.bump();
                let content = lexer::unescape(lexer::literal_content(self.text(&t)));
                Expr::new(self.span(&t), self.file, ExprKind::Literal(content))
            }
            SyntaxKind::ClassLiteral => {
                let t = self.bump();
                let items = parse_class_body(lexer::class_content(self.text(&t)));
                Expr::new(self.span(&t), self.file, ExprKind::Class(items))
            }
            SyntaxKind::Dot => {
                let t = self.bump();
                Expr::new(self.span(&t), self.file, ExprKind::Any)
            }
            SyntaxKind::ParenOpen => {
                self.bump();
                let inner = self.parse_choice();
                if self.eat(SyntaxKind::ParenClose).is_none() {
                    self.recover(DiagnosticCode::UnclosedDelimiter, token_sets::GROUP_RECOVERY);
                    self.eat(SyntaxKind::ParenClose);
                }
                let span = self.span_to_here(start);
                Expr::new(span, self.file, inner.kind)
            }
            SyntaxKind::Percent => {
                self.bump();
                if self.eat(SyntaxKind::BraceOpen).is_some() {
                    let inner = self.parse_choice();
                    if self.eat(SyntaxKind::BraceClose).is_none() {
                        self.recover(DiagnosticCode::UnclosedDelimiter, token_sets::BLOCK_CAPTURE_RECOVERY);
                        self.eat(SyntaxKind::BraceClose);
                    }
                    let span = self.span_to_here(start);
                    Expr::new(span, self.file, ExprKind::BlockCapture(Box::new(inner)))
                } else if let Some(name_tok) = self.eat(SyntaxKind::Id) {
                    let name = self.text(&name_tok).to_string();
                    let body = if self.eat(SyntaxKind::BraceOpen).is_some() {
                        let inner = self.parse_choice();
                        if self.eat(SyntaxKind::BraceClose).is_none() {
                            self.recover(DiagnosticCode::UnclosedDelimiter, token_sets::BLOCK_CAPTURE_RECOVERY);
                            self.eat(SyntaxKind::BraceClose);
                        }
                        inner
                    } else {
                        let ref_span = self.span(&name_tok);
                        Expr::new(ref_span, self.file, ExprKind::Identifier(name.clone()))
                    };
                    let span = self.span_to_here(start);
                    Expr::new(span, self.file, ExprKind::NodeCapture(name, Box::new(body)))
                } else {
                    self.error(DiagnosticCode::SyntaxError, Span::point(start));
                    Expr::new(Span::point(start), self.file, ExprKind::Sequence(Vec::new()))
                }
            }
            _ => {
                self.bump();
                self.error(DiagnosticCode::SyntaxError, Span::point(start));
                Expr::new(Span::point(start), self.file, ExprKind::Sequence(Vec::new()))
            }
        }
    }
}

trait MaxByCursor {
    fn max_by_cursor(self, other: Self) -> Self;
}

impl MaxByCursor for Location {
    fn max_by_cursor(self, other: Self) -> Self {
        if self.cursor >= other.cursor { self } else { other }
    }
}

/// Parses the body of a `[...]` class literal (without the brackets) into
/// ranges and single characters, honoring `\`-escapes (spec §4.1).
fn parse_class_body(content: &str) -> Vec<ClassItem> {
    let chars: Vec<char> = {
        // Unescape first so `\-`/`\]` inside a class don't get treated as
        // range/close syntax, then re-scan for `a-b` range notation.
        let unescaped = unescape_class_chars(content);
        unescaped
    };

    let mut items = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if i + 2 < chars.len() && chars[i + 1] == '-' {
            items.push(ClassItem::Range(chars[i], chars[i + 2]));
            i += 3;
        } else {
            items.push(ClassItem::Single(chars[i]));
            i += 1;
        }
    }
    items
}

/// Like [`lexer::unescape`] but keeps `-` literal only when escaped,
/// leaving bare `-` as the range separator for [`parse_class_body`].
fn unescape_class_chars(content: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(content.len());
    let mut chars = content.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('\\') => out.push('\\'),
            Some(']') => out.push(']'),
            Some('-') => out.push('\u{1}'), // sentinel: literal '-', never a range separator
            Some('u') => {
                let hex: String = (0..4).filter_map(|_| chars.next()).collect();
                if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    out.push(ch);
                }
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out.into_iter().map(|c| if c == '\u{1}' { '-' } else { c }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn parse_str(src: &str) -> ParseResult {
        parse(src, FileId::from_raw(0), PathBuf::from("test.peg"))
    }

    #[test]
    fn parses_a_literal_rule() {
        let result = parse_str(r#"G <- "hello""#);
        assert!(result.diagnostics.is_empty());
        let def = result.grammar.get("G").unwrap();
        assert!(matches!(def.expr.kind, ExprKind::Literal(ref s) if s == "hello"));
    }

    #[test]
    fn parses_ordered_choice_right_leaning() {
        let result = parse_str(r#"G <- "a" / "b" / "c""#);
        let def = result.grammar.get("G").unwrap();
        match &def.expr.kind {
            ExprKind::Choice(a, b) => {
                assert!(matches!(a.kind, ExprKind::Literal(ref s) if s == "a"));
                assert!(matches!(b.kind, ExprKind::Choice(_, _)));
            }
            other => panic!("expected Choice, got {other:?}"),
        }
    }

    #[test]
    fn parses_quantifiers_and_predicates() {
        let result = parse_str("G <- !\"a\" \"b\"* \"c\"+ \"d\"?");
        let def = result.grammar.get("G").unwrap();
        match &def.expr.kind {
            ExprKind::Sequence(items) => {
                assert!(matches!(items[0].kind, ExprKind::Not(_)));
                assert!(matches!(items[1].kind, ExprKind::ZeroOrMore(_)));
                assert!(matches!(items[2].kind, ExprKind::OneOrMore(_)));
                assert!(matches!(items[3].kind, ExprKind::Optional(_)));
            }
            other => panic!("expected Sequence, got {other:?}"),
        }
    }

    #[test]
    fn parses_node_capture_with_explicit_body() {
        let result = parse_str("Num <- %Num{[0-9]+}");
        let def = result.grammar.get("Num").unwrap();
        assert!(matches!(def.expr.kind, ExprKind::NodeCapture(ref name, _) if name == "Num"));
    }

    #[test]
    fn parses_labeled_throw() {
        let result = parse_str(r#"S <- "(" A^rp"#);
        let def = result.grammar.get("S").unwrap();
        match &def.expr.kind {
            ExprKind::Sequence(items) => {
                assert!(matches!(items[1].kind, ExprKind::Labeled(_, ref l) if l == "rp"));
            }
            other => panic!("expected Sequence, got {other:?}"),
        }
    }

    #[test]
    fn parses_import() {
        let result = parse_str(r#"@import Number from "number.peg""#);
        assert_eq!(result.grammar.imports.len(), 1);
        assert_eq!(result.grammar.imports[0].names, vec!["Number".to_string()]);
        assert_eq!(result.grammar.imports[0].path, "number.peg");
    }

    #[test]
    fn reports_unclosed_delimiter() {
        let result = parse_str(r#"G <- ("a""#);
        assert!(!result.diagnostics.is_empty());
        assert_eq!(result.diagnostics.iter().next().unwrap().code, DiagnosticCode::UnclosedDelimiter);
    }

    #[test]
    fn class_body_parses_ranges_and_escapes() {
        let items = parse_class_body(r"a-z0-9_\-");
        assert_eq!(
            items,
            vec![
                ClassItem::Range('a', 'z'),
                ClassItem::Range('0', '9'),
                ClassItem::Single('_'),
                ClassItem::Single('-'),
            ]
        );
    }
}
