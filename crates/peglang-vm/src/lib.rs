//! The peglang parsing machine: a backtracking bytecode interpreter for
//! PEGs with labeled failures, plus the Tree Store a match builds into.

mod capture;
mod checkpoint;
mod error;
mod frame;
mod tracer;
mod tree;
mod vm;

pub use error::RuntimeError;
pub use tracer::{NoopTracer, PrintTracer, Tracer, Verbosity};
pub use tree::{NodeData, NodeId, Tree};
pub use vm::{ExpectedHint, FuelLimits, MatchOutcome, Vm};
