//! The parsing machine: a backtracking bytecode interpreter for the 18
//! PEG opcodes (spec §3, §4.6).
//!
//! Execution state: an instruction pointer, a byte cursor (tracked as a
//! [`Location`] so spans carry line/column), a [`BacktrackStack`] of
//! choice points, a [`FrameStack`] of call return addresses, and a
//! [`CaptureStack`] building the [`Tree`]. A farthest-failure-position is
//! tracked throughout so a total failure can report where the input
//! diverged furthest from anything the grammar could match.

use peglang_bytecode::{Instruction, Program, StringId};
use peglang_core::{Charset, Location, Span};

use crate::capture::{CaptureMark, CaptureStack};
use crate::checkpoint::{BacktrackStack, Checkpoint};
use crate::frame::FrameStack;
use crate::tracer::{NoopTracer, Tracer};
use crate::tree::Tree;
use crate::RuntimeError;

/// Resource limits on a single match, preventing a pathological or
/// adversarial grammar from running forever (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub struct FuelLimits {
    pub step_limit: u32,
    pub recursion_limit: u32,
}

impl Default for FuelLimits {
    fn default() -> Self {
        Self {
            step_limit: 1_000_000,
            recursion_limit: 1024,
        }
    }
}

/// What the grammar expected to match at the farthest-failure-position,
/// tracked only when `Vm::with_show_fails` is enabled (spec §4.6 "the
/// set of expected hints at ffp (char, range, charset)").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedHint {
    Char(u8),
    Range(u8, u8),
    Charset(Charset),
}

impl std::fmt::Display for ExpectedHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedHint::Char(c) => write!(f, "{:?}", *c as char),
            ExpectedHint::Range(lo, hi) => write!(f, "{:?}..={:?}", *lo as char, *hi as char),
            ExpectedHint::Charset(set) => {
                write!(f, "[")?;
                for (i, c) in set.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{:?}", char::from_u32(c).unwrap_or('\u{fffd}'))?;
                }
                write!(f, "]")
            }
        }
    }
}

/// Result of a completed match (spec §4.6 "three outcomes": success,
/// possibly carrying in-tree `Error` nodes from recovered labeled
/// throws, vs. outright failure at the farthest position reached).
/// `expected` is always empty unless `show_fails` was enabled.
#[derive(Debug, Clone)]
pub enum MatchOutcome {
    Matched { tree: Tree, end: Location },
    Failed { furthest: Location, expected: Vec<ExpectedHint> },
}

/// A pending labeled-throw recovery: `Throw L` installed a call into the
/// rule named `L`; when that call's frame returns, wrap whatever it
/// captured into an `Error<L>` node instead of leaving it bare.
struct PendingRecovery {
    frame_height: Option<u32>,
    label: StringId,
    cap_mark: CaptureMark,
    throw_at: Location,
}

pub struct Vm<'p> {
    program: &'p Program,
    limits: FuelLimits,
    show_fails: bool,
}

impl<'p> Vm<'p> {
    pub fn new(program: &'p Program, limits: FuelLimits) -> Self {
        Self { program, limits, show_fails: false }
    }

    /// Enables expected-hint tracking at the farthest-failure-position
    /// (spec §4.6, `-show-fails`). Off by default since it costs a push
    /// per failed terminal match even when nothing reads the hints.
    pub fn with_show_fails(mut self, show_fails: bool) -> Self {
        self.show_fails = show_fails;
        self
    }

    pub fn run(&self, entry: &str, input: &str) -> Result<MatchOutcome, RuntimeError> {
        self.run_with(entry, input, &mut NoopTracer, None)
    }

    /// Run with a tracer and an optional cooperative cancellation poll,
    /// checked every 4096 steps (spec §4.6 "caller-polled cancellation").
    pub fn run_with<T: Tracer>(
        &self,
        entry: &str,
        input: &str,
        tracer: &mut T,
        cancel: Option<&'p dyn Fn() -> bool>,
    ) -> Result<MatchOutcome, RuntimeError> {
        let target = self.program.entrypoint(entry).ok_or_else(|| {
            RuntimeError::Module(peglang_bytecode::ModuleError::UnknownEntrypoint(
                entry.to_string(),
            ))
        })?;

        let mut exec = Exec {
            program: self.program,
            input,
            limits: self.limits,
            show_fails: self.show_fails,
            ip: target,
            cursor: Location::START,
            ffp: Location::START,
            expected: Vec::new(),
            backtrack: BacktrackStack::new(),
            frames: FrameStack::new(),
            captures: CaptureStack::new(),
            tree: Tree::new(),
            recoveries: Vec::new(),
            predicate_depth: 0,
            steps: 0,
            tracer,
            cancel,
        };
        exec.run()
    }
}

struct Exec<'p, 't, T: Tracer> {
    program: &'p Program,
    input: &'p str,
    limits: FuelLimits,
    show_fails: bool,
    ip: u32,
    cursor: Location,
    ffp: Location,
    expected: Vec<ExpectedHint>,
    backtrack: BacktrackStack,
    frames: FrameStack,
    captures: CaptureStack,
    tree: Tree,
    recoveries: Vec<PendingRecovery>,
    predicate_depth: u32,
    steps: u32,
    tracer: &'t mut T,
    cancel: Option<&'p dyn Fn() -> bool>,
}

enum Step {
    Continue,
    Accept,
    /// Backtracking exhausted the checkpoint stack: total failure.
    Fail,
}

impl<T: Tracer> Exec<'_, '_, T> {
    fn run(mut self) -> Result<MatchOutcome, RuntimeError> {
        loop {
            self.steps += 1;
            if self.steps > self.limits.step_limit {
                return Err(RuntimeError::StepLimitExceeded(self.limits.step_limit));
            }
            if self.steps % 4096 == 0 {
                if let Some(cancel) = self.cancel {
                    if cancel() {
                        return Err(RuntimeError::Cancelled);
                    }
                }
            }

            let instr = self.program.decode_at(self.ip)?;
            self.tracer.trace_instruction(self.ip, &instr);

            match self.step(instr)? {
                Step::Continue => {}
                Step::Fail => {
                    return Ok(MatchOutcome::Failed {
                        furthest: self.ffp,
                        expected: std::mem::take(&mut self.expected),
                    });
                }
                Step::Accept => {
                    let root = std::mem::take(&mut self.captures).finish(&mut self.tree, self.cursor);
                    let root = root.unwrap_or_else(|| {
                        self.tree.push_sequence(Span::point(self.cursor), &[])
                    });
                    self.tree.set_root(root);
                    return Ok(MatchOutcome::Matched {
                        tree: self.tree,
                        end: self.cursor,
                    });
                }
            }
        }
    }

    fn step(&mut self, instr: Instruction) -> Result<Step, RuntimeError> {
        match instr {
            Instruction::Char(byte) => {
                if self.input.as_bytes().get(self.cursor.cursor as usize) == Some(&byte) {
                    self.advance_one();
                    self.ip += 1;
                } else {
                    self.record_ffp_with(Some(ExpectedHint::Char(byte)));
                    return Ok(self.fail());
                }
            }
            Instruction::Any => {
                if (self.cursor.cursor as usize) < self.input.len() {
                    self.advance_one();
                    self.ip += 1;
                } else {
                    self.record_ffp();
                    return Ok(self.fail());
                }
            }
            Instruction::Span(lo, hi) => match self.input.as_bytes().get(self.cursor.cursor as usize) {
                Some(&b) if b >= lo && b <= hi => {
                    self.advance_one();
                    self.ip += 1;
                }
                _ => {
                    self.record_ffp_with(Some(ExpectedHint::Range(lo, hi)));
                    return Ok(self.fail());
                }
            },
            Instruction::Set(id) => {
                let blob = self.program.strings().get_bytes(id);
                let charset = Charset::from_bytes(
                    blob.try_into()
                        .expect("Set string is a 32-byte charset blob"),
                );
                match self.input.as_bytes().get(self.cursor.cursor as usize) {
                    Some(&b) if charset.contains(b as u32) => {
                        self.advance_one();
                        self.ip += 1;
                    }
                    _ => {
                        self.record_ffp_with(Some(ExpectedHint::Charset(charset)));
                        return Ok(self.fail());
                    }
                }
            }
            Instruction::Choice(delta) => {
                let target = (self.ip as i64 + delta as i64) as u32;
                self.backtrack.push(Checkpoint {
                    ip: target,
                    cursor: self.cursor,
                    cap_mark: self.captures.mark(),
                    call_height: self.frames.height(),
                    predicate_depth: self.predicate_depth,
                });
                self.tracer.trace_checkpoint_created(target);
                self.ip += 1;
            }
            Instruction::PredicateChoice(delta) => {
                let target = (self.ip as i64 + delta as i64) as u32;
                self.backtrack.push(Checkpoint {
                    ip: target,
                    cursor: self.cursor,
                    cap_mark: self.captures.mark(),
                    call_height: self.frames.height(),
                    predicate_depth: self.predicate_depth,
                });
                self.tracer.trace_checkpoint_created(target);
                self.predicate_depth += 1;
                self.ip += 1;
            }
            Instruction::Commit(delta) => {
                let cp = self
                    .backtrack
                    .pop()
                    .expect("Commit with an empty backtrack stack");
                self.predicate_depth = cp.predicate_depth;
                self.ip = (self.ip as i64 + delta as i64) as u32;
            }
            Instruction::PartialCommit(delta) => {
                let cursor = self.cursor;
                let cap_mark = self.captures.mark();
                let cp = self
                    .backtrack
                    .top_mut()
                    .expect("PartialCommit with an empty backtrack stack");
                cp.cursor = cursor;
                cp.cap_mark = cap_mark;
                self.ip = (self.ip as i64 + delta as i64) as u32;
            }
            Instruction::BackCommit(delta) => {
                let cp = self
                    .backtrack
                    .pop()
                    .expect("BackCommit with an empty backtrack stack");
                self.restore_from(&cp);
                self.ip = (self.ip as i64 + delta as i64) as u32;
            }
            Instruction::Fail => {
                self.record_ffp();
                return Ok(self.fail());
            }
            Instruction::FailTwice => {
                let cp = self
                    .backtrack
                    .pop()
                    .expect("FailTwice with an empty backtrack stack");
                self.restore_from(&cp);
                self.record_ffp();
                return Ok(self.fail());
            }
            Instruction::Jump(delta) => {
                self.ip = (self.ip as i64 + delta as i64) as u32;
            }
            Instruction::Call(delta) => {
                if self.frames.depth() + 1 >= self.limits.recursion_limit {
                    return Err(RuntimeError::RecursionLimitExceeded(
                        self.limits.recursion_limit,
                    ));
                }
                let target = (self.ip as i64 + delta as i64) as u32;
                self.frames.push(self.ip + 1);
                self.tracer.trace_call(target);
                self.ip = target;
            }
            Instruction::Return => {
                if self.frames.is_empty() {
                    return Ok(Step::Accept);
                }
                if self
                    .recoveries
                    .last()
                    .is_some_and(|r| r.frame_height == self.frames.height())
                {
                    let recovery = self.recoveries.pop().unwrap();
                    let addr = self.frames.pop();
                    let child = self
                        .captures
                        .drain_since(recovery.cap_mark, &mut self.tree, self.cursor);
                    let message = recovery.label;
                    let span = Span::new(recovery.throw_at, self.cursor);
                    let error = self.tree.push_error(recovery.label, message, child, span);
                    self.captures.push_item(error);
                    self.ip = addr;
                } else {
                    let addr = self.frames.pop();
                    self.tracer.trace_return();
                    self.ip = addr;
                }
            }
            Instruction::CapOpen(kind, label) => {
                self.captures.open(kind, label, self.cursor, &mut self.tree);
                self.ip += 1;
            }
            Instruction::CapClose(kind, _label) => {
                let node = self.captures.close(kind, self.cursor, &mut self.tree);
                let text = self.tree.text(node, self.input);
                self.tracer.trace_match_success(text);
                self.ip += 1;
            }
            Instruction::Throw(label) => {
                return Ok(self.throw(label));
            }
            Instruction::Halt => return Ok(Step::Accept),
        }
        Ok(Step::Continue)
    }

    fn advance_one(&mut self) {
        let byte = self.input.as_bytes()[self.cursor.cursor as usize];
        self.captures.record_consumed(self.cursor);
        self.cursor = self.cursor.advance(byte);
    }

    fn record_ffp(&mut self) {
        self.record_ffp_with(None);
    }

    /// Updates ffp, resetting the expected-hint set whenever ffp moves
    /// further than before; when `show_fails` is enabled and this
    /// failure is at (or becomes) ffp, folds `hint` into that set so
    /// sibling alternatives that fail at the same position accumulate
    /// their hints instead of overwriting each other.
    fn record_ffp_with(&mut self, hint: Option<ExpectedHint>) {
        if self.cursor.cursor > self.ffp.cursor {
            self.ffp = self.cursor;
            self.expected.clear();
        }
        if self.show_fails && self.cursor.cursor == self.ffp.cursor {
            if let Some(hint) = hint {
                if !self.expected.contains(&hint) {
                    self.expected.push(hint);
                }
            }
        }
    }

    fn restore_from(&mut self, cp: &Checkpoint) {
        self.cursor = cp.cursor;
        self.captures.restore(cp.cap_mark);
        self.frames.restore(cp.call_height);
        self.predicate_depth = cp.predicate_depth;
    }

    fn fail(&mut self) -> Step {
        match self.backtrack.pop() {
            Some(cp) => {
                self.tracer.trace_backtrack(cp.ip);
                self.restore_from(&cp);
                self.ip = cp.ip;
                Step::Continue
            }
            None => Step::Fail,
        }
    }

    fn throw(&mut self, label: StringId) -> Step {
        let label_name = self.program.strings().get_str(label);
        self.tracer.trace_throw(label_name);
        if self.predicate_depth == 0 {
            if let Some(target) = self.program.entrypoint(label_name) {
                let return_to = self.ip + 1;
                let frame_height = Some(self.frames.push(return_to));
                self.recoveries.push(PendingRecovery {
                    frame_height,
                    label,
                    cap_mark: self.captures.mark(),
                    throw_at: self.cursor,
                });
                self.tracer.trace_call(target);
                self.ip = target;
                return Step::Continue;
            }
        }
        self.record_ffp();
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeData;
    use peglang_bytecode::{CaptureKind, StringTable};
    use peglang_core::Location;

    fn loc(cursor: u32) -> Location {
        Location::new(1, cursor + 1, cursor)
    }

    fn program(instructions: Vec<Instruction>, entrypoints: &[(&str, u32)]) -> Program {
        let words = instructions.into_iter().map(Instruction::encode).collect();
        let mut program = Program::new(words, StringTable::new());
        for &(name, offset) in entrypoints {
            program.add_entrypoint(name, offset);
        }
        program
    }

    #[test]
    fn matches_a_literal() {
        use Instruction::*;
        let prog = program(
            vec![Char(b'h'), Char(b'e'), Char(b'l'), Char(b'l'), Char(b'o'), Halt],
            &[("G", 0)],
        );
        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("G", "hello").unwrap() {
            MatchOutcome::Matched { tree, end } => {
                assert_eq!(end, loc(5));
                let root = tree.root().unwrap();
                assert_eq!(tree.data(root), NodeData::String);
                assert_eq!(tree.text(root, "hello"), "hello");
            }
            MatchOutcome::Failed { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn rejects_a_mismatched_literal() {
        use Instruction::*;
        let prog = program(vec![Char(b'h'), Char(b'i'), Halt], &[("G", 0)]);
        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("G", "ho").unwrap() {
            MatchOutcome::Failed { furthest, .. } => assert_eq!(furthest, loc(1)),
            MatchOutcome::Matched { .. } => panic!("expected a failure"),
        }
    }

    /// `"ab" / "ac"`, compiled as `Choice L2; "ab"; Commit L3; L2: "ac"; L3:`.
    fn ordered_choice_ab_or_ac() -> Program {
        use Instruction::*;
        program(
            vec![
                /* 0 */ Choice(4),
                /* 1 */ Char(b'a'),
                /* 2 */ Char(b'b'),
                /* 3 */ Commit(3),
                /* 4 */ Char(b'a'),
                /* 5 */ Char(b'c'),
                /* 6 */ Halt,
            ],
            &[("G", 0)],
        )
    }

    #[test]
    fn ordered_choice_takes_the_first_matching_alternative() {
        let prog = ordered_choice_ab_or_ac();
        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("G", "ab").unwrap() {
            MatchOutcome::Matched { tree, end } => {
                assert_eq!(end, loc(2));
                assert_eq!(tree.text(tree.root().unwrap(), "ab"), "ab");
            }
            MatchOutcome::Failed { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn ordered_choice_backtracks_to_the_second_alternative() {
        let prog = ordered_choice_ab_or_ac();
        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("G", "ac").unwrap() {
            MatchOutcome::Matched { tree, end } => {
                assert_eq!(end, loc(2));
                assert_eq!(tree.text(tree.root().unwrap(), "ac"), "ac");
            }
            MatchOutcome::Failed { .. } => panic!("expected a match"),
        }
    }

    #[test]
    fn total_failure_reports_the_farthest_position_reached() {
        let prog = ordered_choice_ab_or_ac();
        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("G", "ax").unwrap() {
            MatchOutcome::Failed { furthest, .. } => assert_eq!(furthest, loc(1)),
            MatchOutcome::Matched { .. } => panic!("expected a failure"),
        }
    }

    /// `%Num{[0-9]+}`, compiled as the mandatory digit followed by a
    /// `PartialCommit` loop, all wrapped in a `Node` capture -- exercises
    /// coalescing of consecutive `Span` matches into one `String` leaf.
    #[test]
    fn repetition_coalesces_into_a_single_string_leaf() {
        use Instruction::*;
        let mut strings = StringTable::new();
        let num = strings.intern_str("Num");
        let instructions = vec![
            /* 0 */ CapOpen(CaptureKind::Node, num),
            /* 1 */ Span(b'0', b'9'),
            /* 2 */ Choice(3),
            /* 3 */ Span(b'0', b'9'),
            /* 4 */ PartialCommit(-1),
            /* 5 */ CapClose(CaptureKind::Node, num),
            /* 6 */ Halt,
        ];
        let words = instructions.into_iter().map(Instruction::encode).collect();
        let mut prog = Program::new(words, strings);
        prog.add_entrypoint("G", 0);

        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("G", "123").unwrap() {
            MatchOutcome::Matched { tree, end } => {
                assert_eq!(end, loc(3));
                let root = tree.root().unwrap();
                assert!(matches!(tree.data(root), NodeData::Node { .. }));
                let child = tree.child_of(root).unwrap();
                assert_eq!(tree.data(child), NodeData::String);
                assert_eq!(tree.text(child, "123"), "123");
            }
            MatchOutcome::Failed { .. } => panic!("expected a match"),
        }
    }

    /// `S <- %{"(" } A^rp; rp <- ` (an always-succeeding, nothing-consuming
    /// recovery rule), mirroring the worked example in the labeled-failure
    /// section: `A` always fails here, so the throw installs `rp` as the
    /// current call and its (empty) result becomes an `Error<rp>` node.
    #[test]
    fn labeled_throw_recovers_via_the_named_rule() {
        use Instruction::*;
        let mut strings = StringTable::new();
        let rp = strings.intern_str("rp");
        let instructions = vec![
            /* 0 */ CapOpen(CaptureKind::Block, rp),
            /* 1 */ Char(b'('),
            /* 2 */ CapClose(CaptureKind::Block, rp),
            /* 3 */ Choice(3),  // Labeled(A, rp): LR = 6
            /* 4 */ Char(b'A'), // stands in for rule A, which fails here
            /* 5 */ Commit(2),  // LE = 7
            /* 6 */ Throw(rp),  // LR
            /* 7 */ Halt,       // LE
            /* 8 */ Return,     // rp's body: matches empty, consumes nothing
        ];
        let words = instructions.into_iter().map(Instruction::encode).collect();
        let mut prog = Program::new(words, strings);
        prog.add_entrypoint("S", 0);
        prog.add_entrypoint("rp", 8);

        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("S", "(").unwrap() {
            MatchOutcome::Matched { tree, end } => {
                assert_eq!(end, loc(1));
                let root = tree.root().unwrap();
                assert_eq!(tree.children(root).len(), 2);
                let paren = tree.children(root)[0];
                assert_eq!(tree.text(paren, "("), "(");
                let error = tree.children(root)[1];
                match tree.data(error) {
                    NodeData::Error { label, child, .. } => {
                        assert_eq!(prog.strings().get_str(label), "rp");
                        assert!(child.is_none());
                    }
                    other => panic!("expected an Error node, got {other:?}"),
                }
            }
            MatchOutcome::Failed { .. } => panic!("expected a recovered match"),
        }
    }

    #[test]
    fn labeled_throw_recovers_even_when_nested_in_an_ordinary_choice() {
        // S <- "(" A^rp / "x" -- the throw sits inside the first branch of
        // an unrelated alternation. Before `PredicateChoice` existed, the
        // outer `/`'s Choice bumped predicate_depth just like a Not/And
        // would, so Throw saw depth > 0 and failed outright instead of
        // recovering.
        use Instruction::*;
        let mut strings = StringTable::new();
        let rp = strings.intern_str("rp");
        let instructions = vec![
            /* 0 */ Choice(9), // outer `/`: second branch starts at 9
            /* 1 */ CapOpen(CaptureKind::Block, rp),
            /* 2 */ Char(b'('),
            /* 3 */ CapClose(CaptureKind::Block, rp),
            /* 4 */ Choice(3),  // Labeled(A, rp): LR = 7
            /* 5 */ Char(b'A'), // stands in for rule A, which fails here
            /* 6 */ Commit(2),  // LE = 8
            /* 7 */ Throw(rp),  // LR
            /* 8 */ Commit(2),  // outer commit, jumps to 10
            /* 9 */ Char(b'x'), // second branch
            /* 10 */ Halt,
            /* 11 */ Return, // rp's body: matches empty, consumes nothing
        ];
        let words = instructions.into_iter().map(Instruction::encode).collect();
        let mut prog = Program::new(words, strings);
        prog.add_entrypoint("S", 0);
        prog.add_entrypoint("rp", 11);

        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("S", "(").unwrap() {
            MatchOutcome::Matched { tree, end } => {
                assert_eq!(end, loc(1));
                let root = tree.root().unwrap();
                assert_eq!(tree.children(root).len(), 2);
                let paren = tree.children(root)[0];
                assert_eq!(tree.text(paren, "("), "(");
                let error = tree.children(root)[1];
                match tree.data(error) {
                    NodeData::Error { label, child, .. } => {
                        assert_eq!(prog.strings().get_str(label), "rp");
                        assert!(child.is_none());
                    }
                    other => panic!("expected an Error node, got {other:?}"),
                }
            }
            MatchOutcome::Failed { .. } => {
                panic!("expected a recovered match, not an outright failure")
            }
        }
    }

    #[test]
    fn unknown_entrypoint_is_rejected() {
        use Instruction::*;
        let prog = program(vec![Halt], &[("G", 0)]);
        let vm = Vm::new(&prog, FuelLimits::default());
        assert!(matches!(
            vm.run("Missing", ""),
            Err(RuntimeError::Module(peglang_bytecode::ModuleError::UnknownEntrypoint(_)))
        ));
    }

    #[test]
    fn step_limit_stops_an_infinite_loop() {
        use Instruction::*;
        let prog = program(vec![Jump(0)], &[("G", 0)]);
        let vm = Vm::new(
            &prog,
            FuelLimits {
                step_limit: 10,
                recursion_limit: 1024,
            },
        );
        assert!(matches!(
            vm.run("G", ""),
            Err(RuntimeError::StepLimitExceeded(10))
        ));
    }

    #[test]
    fn show_fails_off_by_default_leaves_expected_empty() {
        use Instruction::*;
        let prog = program(vec![Char(b'a'), Halt], &[("G", 0)]);
        let vm = Vm::new(&prog, FuelLimits::default());
        match vm.run("G", "b").unwrap() {
            MatchOutcome::Failed { expected, .. } => assert!(expected.is_empty()),
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[test]
    fn show_fails_collects_hints_from_every_branch_tied_at_the_furthest_position() {
        // G <- "a" / "b" / [c-d] -- all three branches fail at byte 0.
        use Instruction::*;
        let charset = Charset::range(b'c' as u32, b'd' as u32).unwrap();
        let mut strings = StringTable::new();
        let set_id = strings.intern_bytes(&charset.to_bytes());
        let instructions = vec![
            /* 0 */ Choice(3),
            /* 1 */ Char(b'a'),
            /* 2 */ Commit(6),
            /* 3 */ Choice(3),
            /* 4 */ Char(b'b'),
            /* 5 */ Commit(3),
            /* 6 */ Set(set_id),
            /* 7 */ Halt,
        ];
        let words = instructions.into_iter().map(Instruction::encode).collect();
        let mut prog = Program::new(words, strings);
        prog.add_entrypoint("G", 0);

        let vm = Vm::new(&prog, FuelLimits::default()).with_show_fails(true);
        match vm.run("G", "x").unwrap() {
            MatchOutcome::Failed { furthest, expected } => {
                assert_eq!(furthest, loc(0));
                assert_eq!(
                    expected,
                    vec![
                        ExpectedHint::Char(b'a'),
                        ExpectedHint::Char(b'b'),
                        ExpectedHint::Charset(charset),
                    ]
                );
            }
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[test]
    fn expected_hints_reset_when_a_later_branch_fails_further_along() {
        // G <- "a" "a" / "b" -- the first branch reaches byte 1 before
        // failing, further than the second branch's byte 0, so only the
        // first branch's hint should survive.
        use Instruction::*;
        let instructions = vec![
            /* 0 */ Choice(5),
            /* 1 */ Char(b'a'),
            /* 2 */ Char(b'a'),
            /* 3 */ Char(b'a'),
            /* 4 */ Commit(2),
            /* 5 */ Char(b'b'),
            /* 6 */ Halt,
        ];
        let words = instructions.into_iter().map(Instruction::encode).collect();
        let mut prog = Program::new(words, StringTable::new());
        prog.add_entrypoint("G", 0);

        let vm = Vm::new(&prog, FuelLimits::default()).with_show_fails(true);
        match vm.run("G", "ax").unwrap() {
            MatchOutcome::Failed { furthest, expected } => {
                assert_eq!(furthest, loc(1));
                assert_eq!(expected, vec![ExpectedHint::Char(b'a')]);
            }
            other => panic!("expected a failure, got {other:?}"),
        }
    }

    #[test]
    fn expected_hint_display_matches_dump_style_char_escaping() {
        assert_eq!(ExpectedHint::Char(b'a').to_string(), "'a'");
        assert_eq!(ExpectedHint::Range(b'0', b'9').to_string(), "'0'..='9'");
    }

    #[test]
    fn recursion_limit_stops_unbounded_self_calls() {
        use Instruction::*;
        let prog = program(vec![Call(0)], &[("G", 0)]);
        let vm = Vm::new(
            &prog,
            FuelLimits {
                step_limit: 1_000_000,
                recursion_limit: 5,
            },
        );
        assert!(matches!(
            vm.run("G", ""),
            Err(RuntimeError::RecursionLimitExceeded(5))
        ));
    }
}
