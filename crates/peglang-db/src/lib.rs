//! The incremental query database for peglang (spec §4.8): a salsa-2022
//! jar that drives parse, import resolution, analysis, and compilation
//! as tracked queries over a single `SourceFile` input, plus a
//! `run_match` entry point into the parsing machine and a handful of
//! plain-data LSP-style surface queries.
//!
//! This is the layer that knows about the filesystem (via
//! [`ImportLoader`]) and about caching; `peglang-compiler` and
//! `peglang-vm` stay pure functions over values.

mod loader;
mod lsp;
mod queries;

pub use loader::{FsLoader, ImportLoader, LoaderError, OverlayLoader};
pub use lsp::{completion_items, definition, document_symbols, hover_info, references, semantic_tokens, HoverInfo};
pub use queries::{
    diagnostics, parsed_grammar, program, recursive_set, resolved_imports, undefined_references, unused_rules,
    Database, Db, Jar, ParsedGrammar, ResolvedGrammar, SourceFile,
};

use std::sync::Arc;

use peglang_bytecode::Program;
use peglang_vm::{FuelLimits, MatchOutcome, RuntimeError, Vm};

/// Runs `input` against `program`'s `entry` rule with default resource
/// limits and `show_fails` disabled. `Program`/`&str` aren't salsa
/// values, so this sits outside the jar as a plain function -- matching
/// isn't cached, only compiling is.
pub fn run_match(program: &Program, entry: &str, input: &str) -> Result<MatchOutcome, RuntimeError> {
    Vm::new(program, FuelLimits::default()).run(entry, input)
}

/// Same as [`run_match`] but with caller-supplied resource limits and
/// `-show-fails` toggle, for embedders that need tighter bounds or
/// expected-hint diagnostics than the defaults (spec §4.6).
pub fn run_match_with_limits(
    program: &Program,
    entry: &str,
    input: &str,
    limits: FuelLimits,
    show_fails: bool,
) -> Result<MatchOutcome, RuntimeError> {
    Vm::new(program, limits).with_show_fails(show_fails).run(entry, input)
}

/// Convenience for embedders that just want "give me a database rooted
/// at the filesystem" without building their own `Arc<dyn ImportLoader>`.
pub fn filesystem_database() -> Database {
    Database::new(Arc::new(FsLoader))
}
