//! Grammar compiler: lexer, parser, import resolver, analyses,
//! transforms, and the bytecode emitter.
//!
//! - `lexer`/`cst` - token kinds and a zero-copy token stream
//! - `parser` - builds the owned [`grammar::Grammar`] AST directly (spec
//!   §4.1's CST/AST split collapses into one pass here: every AST node
//!   already carries the precise span a lossless CST would add, and
//!   nothing downstream needs trivia, so a second rowan tree would be
//!   pure overhead -- see DESIGN.md)
//! - `resolve` - `@import` resolution across files
//! - `analyze` - reachability, left-recursion, semantic tokens
//! - `transform` - the five-pass AST-to-AST pipeline (spec §4.4)
//! - `compile` - two-pass bytecode emission (spec §4.5)
//!
//! `peglang-db` is the orchestrator: it drives these stages as salsa
//! tracked queries, one query per stage, so each is cached independently.
//! This crate has no caching of its own and never touches `std::fs` --
//! `resolve::Fetch` is supplied by the caller.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod analyze;
pub mod compile;
pub mod cst;
pub mod diagnostics;
pub mod grammar;
pub mod lexer;
pub mod line_index;
pub mod parser;
pub mod resolve;
pub mod transform;

pub use diagnostics::{Diagnostics, DiagnosticsPrinter};
pub use grammar::Grammar;
pub use transform::CompileOptions;

use std::collections::HashSet;
use std::path::PathBuf;

use peglang_bytecode::Program;
use peglang_core::{DiagnosticCode, FileId, Location, Span};

/// Parses, analyzes, and compiles a single self-contained grammar (no
/// `@import`s) in one shot. A convenience wrapper over the staged
/// pipeline for tests and the CLI's single-file subcommands;
/// `peglang-db` drives the same stages individually through salsa so it
/// can cache each one and handle `@import`.
pub fn compile_source(source: &str, path: PathBuf, options: &CompileOptions) -> CompiledSource {
    let file = FileId::from_raw(0);
    let parsed = parser::parse(source, file, path.clone());
    let mut diagnostics = parsed.diagnostics;

    analyze::undefined_references(&parsed.grammar, &mut diagnostics);
    analyze::left_recursion(&parsed.grammar, &mut diagnostics);

    let builtins: HashSet<String> = transform::BUILTIN_NAMES.iter().map(|s| s.to_string()).collect();
    analyze::unused_rules(&parsed.grammar, &builtins, &mut diagnostics);

    if diagnostics.has_errors() {
        return CompiledSource { program: None, diagnostics };
    }

    let grammar = transform::pipeline(parsed.grammar, options);
    match compile::compile(&grammar) {
        Ok(program) => CompiledSource { program: Some(program), diagnostics },
        Err(err) => {
            diagnostics
                .report(DiagnosticCode::UndefinedRule, file, path, Span::point(Location::START))
                .message(err.to_string())
                .emit();
            CompiledSource { program: None, diagnostics }
        }
    }
}

/// Result of [`compile_source`]: a `Program` if compilation succeeded,
/// plus every diagnostic collected along the way (warnings survive even
/// on success).
pub struct CompiledSource {
    pub program: Option<Program>,
    pub diagnostics: Diagnostics,
}
