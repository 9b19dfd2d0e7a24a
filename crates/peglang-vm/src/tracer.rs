//! Tracing infrastructure for debugging VM execution (`-v`/`-vv`, the
//! REPL's `:trace` command).
//!
//! Like the bytecode dispatch loop itself, the tracer is a zero-cost
//! abstraction: [`NoopTracer`]'s methods are empty and `#[inline(always)]`
//! so a release build calling [`crate::Vm::run`] with it carries no
//! tracing overhead. Tracing-only state (e.g. the checkpoint-creation-IP
//! stack needed to label a backtrack line) lives in the tracer, not in
//! [`crate::checkpoint::Checkpoint`], so the execution structures stay
//! minimal.

use peglang_bytecode::Instruction;
use peglang_core::Colors;

/// Verbosity level for trace output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verbosity {
    /// Instruction, match result, call/return. No matched text.
    #[default]
    Default,
    /// Adds matched text on Char/Span/Set and capture boundaries.
    Verbose,
}

/// Instrumentation hooks for [`crate::Vm::run`]. Call sites pass raw data
/// the VM already has; formatting happens in the tracer.
pub trait Tracer {
    fn trace_instruction(&mut self, ip: u32, instr: &Instruction);
    fn trace_match_success(&mut self, text: &str);
    fn trace_match_failure(&mut self);
    fn trace_call(&mut self, target_ip: u32);
    fn trace_return(&mut self);
    fn trace_checkpoint_created(&mut self, ip: u32);
    fn trace_backtrack(&mut self, resume_ip: u32);
    fn trace_throw(&mut self, label: &str);
}

pub struct NoopTracer;

impl Tracer for NoopTracer {
    #[inline(always)]
    fn trace_instruction(&mut self, _ip: u32, _instr: &Instruction) {}
    #[inline(always)]
    fn trace_match_success(&mut self, _text: &str) {}
    #[inline(always)]
    fn trace_match_failure(&mut self) {}
    #[inline(always)]
    fn trace_call(&mut self, _target_ip: u32) {}
    #[inline(always)]
    fn trace_return(&mut self) {}
    #[inline(always)]
    fn trace_checkpoint_created(&mut self, _ip: u32) {}
    #[inline(always)]
    fn trace_backtrack(&mut self, _resume_ip: u32) {}
    #[inline(always)]
    fn trace_throw(&mut self, _label: &str) {}
}

/// Collects a human-readable execution trace, one line per event.
pub struct PrintTracer {
    verbosity: Verbosity,
    colors: Colors,
    lines: Vec<String>,
    checkpoint_ips: Vec<u32>,
}

impl PrintTracer {
    pub fn new(verbosity: Verbosity, colors: Colors) -> Self {
        Self {
            verbosity,
            colors,
            lines: Vec::new(),
            checkpoint_ips: Vec::new(),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn into_output(self) -> String {
        self.lines.join("\n")
    }
}

impl Tracer for PrintTracer {
    fn trace_instruction(&mut self, ip: u32, instr: &Instruction) {
        let c = self.colors;
        self.lines
            .push(format!("{}{ip:04}{} {instr:?}", c.dim, c.reset));
    }

    fn trace_match_success(&mut self, text: &str) {
        if self.verbosity == Verbosity::Default {
            return;
        }
        let c = self.colors;
        self.lines
            .push(format!("     {}matched {text:?}{}", c.green, c.reset));
    }

    fn trace_match_failure(&mut self) {
        if self.verbosity == Verbosity::Default {
            return;
        }
        self.lines.push("     failed".to_string());
    }

    fn trace_call(&mut self, target_ip: u32) {
        let c = self.colors;
        self.lines
            .push(format!("     {}call -> {target_ip:04}{}", c.blue, c.reset));
    }

    fn trace_return(&mut self) {
        self.lines.push("     return".to_string());
    }

    fn trace_checkpoint_created(&mut self, ip: u32) {
        self.checkpoint_ips.push(ip);
    }

    fn trace_backtrack(&mut self, resume_ip: u32) {
        self.checkpoint_ips.pop();
        self.lines.push(format!("     backtrack -> {resume_ip:04}"));
    }

    fn trace_throw(&mut self, label: &str) {
        self.lines.push(format!("     throw {label}"));
    }
}
