//! The compiler (spec §4.5): two-pass emission of bytecode from the
//! transformed [`Grammar`]. Pass one (`Emitter::emit`) walks every
//! definition building an unpatched instruction stream plus a table of
//! rule start offsets; pass two (`patch_calls`) resolves each
//! `Identifier` reference's `Call` delta now that every rule's address is
//! known. Mirrors the teacher's `compile -> emit` module split.

use indexmap::IndexMap;

use peglang_bytecode::{CaptureKind, Instruction, Program, SourceMap, StringTable};
use peglang_core::{Charset, SourceLocation};

use crate::grammar::{ClassItem, Expr, ExprKind, Grammar};

#[derive(Debug, Clone, thiserror::Error)]
pub enum CompileError {
    #[error("reference to undefined rule `{0}` survived analysis")]
    UndefinedRule(String),
}

pub type Result<T> = std::result::Result<T, CompileError>;

/// Compiles an already-transformed grammar (post `transform::pipeline`)
/// into a [`Program`]. Every definition is registered as an entrypoint,
/// since the REPL and `-grammar-asm` can target any rule by name, not
/// just the first.
pub fn compile(grammar: &Grammar) -> Result<Program> {
    let mut emitter = Emitter::new();
    for def in &grammar.definitions {
        let offset = emitter.instructions.len() as u32;
        emitter.entry_offsets.insert(def.name.clone(), offset);
        emitter.emit_expr(&def.expr);
        emitter.push(Instruction::Return, SourceLocation::new(def.file, def.expr.span));
    }
    emitter.patch_calls()?;

    let words: Vec<u32> = emitter.instructions.iter().map(|i| i.encode()).collect();
    let mut program = Program::new(words, emitter.strings).with_source_map(emitter.source_map);
    for (name, offset) in &emitter.entry_offsets {
        program.add_entrypoint(name.clone(), *offset);
    }
    Ok(program)
}

struct Emitter {
    instructions: Vec<Instruction>,
    strings: StringTable,
    source_map: SourceMap,
    entry_offsets: IndexMap<String, u32>,
    call_fixups: Vec<(usize, String)>,
}

impl Emitter {
    fn new() -> Self {
        Self {
            instructions: Vec::new(),
            strings: StringTable::new(),
            source_map: SourceMap::new(),
            entry_offsets: IndexMap::new(),
            call_fixups: Vec::new(),
        }
    }

    fn push(&mut self, instr: Instruction, loc: SourceLocation) -> usize {
        let ip = self.instructions.len();
        self.source_map.push(ip as u32, loc);
        self.instructions.push(instr);
        ip
    }

    fn here(&self) -> usize {
        self.instructions.len()
    }

    fn delta(from: usize, to: usize) -> i32 {
        to as i64 as i32 - from as i64 as i32
    }

    fn patch(&mut self, ip: usize, instr: Instruction) {
        self.instructions[ip] = instr;
    }

    fn emit_expr(&mut self, expr: &Expr) {
        let loc = SourceLocation::new(expr.file, expr.span);
        match &expr.kind {
            ExprKind::Identifier(name) => {
                let ip = self.push(Instruction::Call(0), loc);
                self.call_fixups.push((ip, name.clone()));
            }
            ExprKind::Literal(text) => {
                for byte in text.as_bytes() {
                    self.push(Instruction::Char(*byte), loc);
                }
            }
            ExprKind::Any => {
                self.push(Instruction::Any, loc);
            }
            ExprKind::Charset(cs) => self.emit_charset(cs, loc),
            ExprKind::Class(items) => self.emit_class(items, loc),
            ExprKind::Sequence(items) => {
                for item in items {
                    self.emit_expr(item);
                }
            }
            ExprKind::Choice(a, b) => self.emit_choice(a, b, loc),
            ExprKind::ZeroOrMore(e) => self.emit_zero_or_more(e, loc),
            ExprKind::Not(e) => self.emit_not(e, loc),
            ExprKind::And(e) => self.emit_and(e, loc),
            ExprKind::Labeled(e, label) => self.emit_labeled(e, label, loc),
            ExprKind::NodeCapture(name, e) => self.emit_capture(CaptureKind::Node, name, e, loc),
            ExprKind::BlockCapture(e) => self.emit_capture(CaptureKind::Block, "", e, loc),
            // Lex only matters to automatic space insertion; by compile
            // time it's a transparent wrapper. Quiet is removed by
            // desugar, but fall through the same way if one slips in.
            ExprKind::Lex(e) | ExprKind::Quiet(e) => self.emit_expr(e),
            ExprKind::OneOrMore(_) | ExprKind::Optional(_) => {
                unreachable!("desugar rewrites OneOrMore/Optional before compile")
            }
        }
    }

    fn emit_choice(&mut self, a: &Expr, b: &Expr, loc: SourceLocation) {
        let choice_ip = self.here();
        self.push(Instruction::Choice(0), loc);
        self.emit_expr(a);
        let commit_ip = self.here();
        self.push(Instruction::Commit(0), loc);
        let l1 = self.here();
        self.emit_expr(b);
        let l2 = self.here();
        self.patch(choice_ip, Instruction::Choice(Self::delta(choice_ip, l1)));
        self.patch(commit_ip, Instruction::Commit(Self::delta(commit_ip, l2)));
    }

    fn emit_zero_or_more(&mut self, e: &Expr, loc: SourceLocation) {
        let l1 = self.here();
        let choice_ip = self.push(Instruction::Choice(0), loc);
        self.emit_expr(e);
        let pc_ip = self.here();
        self.push(Instruction::PartialCommit(0), loc);
        let l2 = self.here();
        self.patch(choice_ip, Instruction::Choice(Self::delta(l1, l2)));
        self.patch(pc_ip, Instruction::PartialCommit(Self::delta(pc_ip, l1)));
    }

    /// `Not`/`And` are the only expressions that open a predicate scope
    /// (spec §4.6), so only their `Choice` is tagged `PredicateChoice` --
    /// every other `Choice`-emitting site (`/`, loops, labeled throw,
    /// ordered alternatives) uses the untagged form so a nested `Throw`
    /// still sees itself outside a predicate.
    fn emit_not(&mut self, e: &Expr, loc: SourceLocation) {
        let choice_ip = self.here();
        self.push(Instruction::PredicateChoice(0), loc);
        self.emit_expr(e);
        self.push(Instruction::FailTwice, loc);
        let l1 = self.here();
        self.patch(choice_ip, Instruction::PredicateChoice(Self::delta(choice_ip, l1)));
    }

    fn emit_and(&mut self, e: &Expr, loc: SourceLocation) {
        let choice_ip = self.here();
        self.push(Instruction::PredicateChoice(0), loc);
        self.emit_expr(e);
        let bc_ip = self.here();
        self.push(Instruction::BackCommit(0), loc);
        let l1 = self.here();
        self.push(Instruction::Fail, loc);
        let l2 = self.here();
        self.patch(choice_ip, Instruction::PredicateChoice(Self::delta(choice_ip, l1)));
        self.patch(bc_ip, Instruction::BackCommit(Self::delta(bc_ip, l2)));
    }

    fn emit_labeled(&mut self, e: &Expr, label: &str, loc: SourceLocation) {
        let choice_ip = self.here();
        self.push(Instruction::Choice(0), loc);
        self.emit_expr(e);
        let commit_ip = self.here();
        self.push(Instruction::Commit(0), loc);
        let lr = self.here();
        let label_id = self.strings.intern_str(label);
        self.push(Instruction::Throw(label_id), loc);
        let le = self.here();
        self.patch(choice_ip, Instruction::Choice(Self::delta(choice_ip, lr)));
        self.patch(commit_ip, Instruction::Commit(Self::delta(commit_ip, le)));
    }

    fn emit_capture(&mut self, kind: CaptureKind, name: &str, e: &Expr, loc: SourceLocation) {
        let id = self.strings.intern_str(name);
        self.push(Instruction::CapOpen(kind, id), loc);
        self.emit_expr(e);
        self.push(Instruction::CapClose(kind, id), loc);
    }

    fn emit_charset(&mut self, cs: &Charset, loc: SourceLocation) {
        match contiguous_range(cs) {
            Some((lo, hi)) => {
                self.push(Instruction::Span(lo, hi), loc);
            }
            None => {
                let id = self.strings.intern_bytes(&cs.to_bytes());
                self.push(Instruction::Set(id), loc);
            }
        }
    }

    /// Classes that didn't fold into a [`Charset`] during transform
    /// (members outside `0..=255`) compile to an ordered choice over
    /// their alternatives. Multi-byte code points beyond Latin-1 are not
    /// supported here; grammars needing them should stick to `Choice`
    /// over string literals.
    fn emit_class(&mut self, items: &[ClassItem], loc: SourceLocation) {
        let alternatives: Vec<Instruction> = items
            .iter()
            .filter_map(|item| match *item {
                ClassItem::Single(c) if (c as u32) <= 0xFF => Some(Instruction::Char(c as u8)),
                ClassItem::Range(lo, hi) if (hi as u32) <= 0xFF => Some(Instruction::Span(lo as u8, hi as u8)),
                _ => None,
            })
            .collect();
        self.emit_ordered_alternatives(&alternatives, loc);
    }

    fn emit_ordered_alternatives(&mut self, alternatives: &[Instruction], loc: SourceLocation) {
        if alternatives.is_empty() {
            self.push(Instruction::Fail, loc);
            return;
        }
        let mut commit_ips = Vec::new();
        for (i, instr) in alternatives.iter().enumerate() {
            let is_last = i == alternatives.len() - 1;
            if is_last {
                self.push(*instr, loc);
                break;
            }
            let choice_ip = self.here();
            self.push(Instruction::Choice(0), loc);
            self.push(*instr, loc);
            let commit_ip = self.here();
            self.push(Instruction::Commit(0), loc);
            let l1 = self.here();
            self.patch(choice_ip, Instruction::Choice(Self::delta(choice_ip, l1)));
            commit_ips.push(commit_ip);
        }
        let end = self.here();
        for ip in commit_ips {
            self.patch(ip, Instruction::Commit(Self::delta(ip, end)));
        }
    }

    fn patch_calls(&mut self) -> Result<()> {
        for (call_ip, name) in std::mem::take(&mut self.call_fixups) {
            let target = *self
                .entry_offsets
                .get(&name)
                .ok_or_else(|| CompileError::UndefinedRule(name.clone()))?;
            let delta = Self::delta(call_ip, target as usize);
            self.patch(call_ip, Instruction::Call(delta));
        }
        Ok(())
    }
}

fn contiguous_range(cs: &Charset) -> Option<(u8, u8)> {
    let mut iter = cs.iter();
    let lo = iter.next()?;
    let mut hi = lo;
    for c in iter {
        if c != hi + 1 {
            return None;
        }
        hi = c;
    }
    Some((lo as u8, hi as u8))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{parser, transform};
    use peglang_core::FileId;
    use std::path::PathBuf;

    fn compiled(src: &str) -> Program {
        let parsed = parser::parse(src, FileId::from_raw(0), PathBuf::from("t.peg"));
        assert!(parsed.diagnostics.is_empty(), "{:?}", parsed.diagnostics.iter().collect::<Vec<_>>());
        let grammar = transform::pipeline(parsed.grammar, &transform::CompileOptions { builtins: false, ..Default::default() });
        compile(&grammar).unwrap()
    }

    #[test]
    fn literal_compiles_to_one_char_instruction_per_byte() {
        let program = compiled("A <- \"ab\"");
        let entry = program.entrypoint("A").unwrap();
        assert_eq!(program.decode_at(entry).unwrap(), Instruction::Char(b'a'));
        assert_eq!(program.decode_at(entry + 1).unwrap(), Instruction::Char(b'b'));
    }

    #[test]
    fn every_rule_body_ends_in_return() {
        let program = compiled("A <- \"x\" B\nB <- \"y\"");
        for (_, offset) in program.entrypoints().collect::<Vec<_>>() {
            let mut ip = offset;
            loop {
                match program.decode_at(ip).unwrap() {
                    Instruction::Return => break,
                    _ => ip += 1,
                }
            }
        }
    }

    #[test]
    fn call_is_patched_to_the_callee_offset() {
        let program = compiled("A <- B\nB <- \"x\"");
        let a = program.entrypoint("A").unwrap();
        let b = program.entrypoint("B").unwrap();
        match program.decode_at(a).unwrap() {
            Instruction::Call(delta) => assert_eq!((a as i64 + delta as i64) as u32, b),
            other => panic!("expected Call, got {other:?}"),
        }
    }

    #[test]
    fn only_predicates_open_a_predicate_choice() {
        let program = compiled("A <- !\"x\" / \"y\"");
        let entry = program.entrypoint("A").unwrap();
        // The alternation's own Choice stays untagged...
        assert!(matches!(program.decode_at(entry).unwrap(), Instruction::Choice(_)));
        // ...while the Not inside its first branch opens a predicate scope.
        assert!(matches!(program.decode_at(entry + 1).unwrap(), Instruction::PredicateChoice(_)));
    }

    #[test]
    fn undefined_reference_is_rejected() {
        let parsed = parser::parse("A <- B", FileId::from_raw(0), PathBuf::from("t.peg"));
        let grammar = transform::pipeline(parsed.grammar, &transform::CompileOptions { builtins: false, ..Default::default() });
        assert!(matches!(compile(&grammar), Err(CompileError::UndefinedRule(name)) if name == "B"));
    }
}
