//! Bytecode format and runtime types for the peglang parsing machine
//! (spec §3 "Bytecode Program", §6.4 "Bytecode format").
//!
//! This crate contains:
//! - The [`Opcode`] tag set and [`Instruction`] encoding/decoding.
//! - [`Program`]: the compiled module (instructions + string table +
//!   entrypoints + optional source map) and its binary (de)serialization.
//! - [`dump`]: a human-readable disassembly used by `-grammar-asm`.

mod dump;
mod error;
mod header;
mod instruction;
mod opcode;
mod program;
mod source_map;
mod string_table;

pub use dump::dump;
pub use error::ModuleError;
pub use header::{checksum, Header, PEGC_MAGIC, VERSION};
pub use instruction::{CaptureKind, Instruction};
pub use opcode::Opcode;
pub use program::Program;
pub use source_map::SourceMap;
pub use string_table::{StringId, StringTable};
