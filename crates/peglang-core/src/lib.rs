#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Core data structures shared by every other `peglang` crate.
//!
//! This crate has no opinion on grammars, bytecode, or execution -- it
//! only provides the vocabulary the rest of the toolkit shares:
//!
//! - [`span`]: source [`Location`]/[`Span`]/[`SourceLocation`] and the
//!   [`FileId`] <-> path table.
//! - [`charset`]: fixed-width bitset character classes.
//! - [`diagnostic`]: the [`Diagnostic`] value type and its taxonomy.
//! - [`interner`]: string interning (`Symbol`).
//! - [`colors`]: ANSI color palette for pretty-printing.

pub mod charset;
pub mod colors;
pub mod diagnostic;
pub mod interner;
pub mod span;

pub use charset::Charset;
pub use colors::Colors;
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use interner::{Interner, Symbol};
pub use span::{FileId, FileTable, Location, SourceLocation, Span};
