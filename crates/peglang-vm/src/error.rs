//! [`RuntimeError`]: the hard-failure channel for the parsing machine.
//!
//! A failed *match* (backtracking exhausted with no labeled-failure
//! recovery) is not a `RuntimeError` -- it is the `Failed` arm of
//! [`crate::MatchOutcome`], a plain value. `RuntimeError` is reserved for
//! conditions that abort execution outright (spec §4.6, §7).

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("execution exceeded the step limit ({0} steps)")]
    StepLimitExceeded(u32),
    #[error("call depth exceeded the recursion limit ({0})")]
    RecursionLimitExceeded(u32),
    #[error("match was cancelled")]
    Cancelled,
    #[error(transparent)]
    Module(#[from] peglang_bytecode::ModuleError),
}
