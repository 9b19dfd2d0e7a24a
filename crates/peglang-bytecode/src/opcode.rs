//! The parsing-machine opcode tags (spec §3 "Bytecode Program").
//!
//! Eighteen opcodes don't fit a 4-bit tag, so the on-disk tag is 5 bits;
//! the remaining 27 bits of a 32-bit word hold the operand(s). See
//! [`crate::instruction`] for the encoding and [`crate::ModuleError`] for
//! the decode failure modes.

use crate::ModuleError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    Char = 0,
    Any = 1,
    Choice = 2,
    Commit = 3,
    PartialCommit = 4,
    BackCommit = 5,
    Fail = 6,
    FailTwice = 7,
    Jump = 8,
    Call = 9,
    Return = 10,
    Span = 11,
    Set = 12,
    CapOpen = 13,
    CapClose = 14,
    Throw = 15,
    Halt = 16,
    /// Like `Choice`, but marks the checkpoint as opening a `Not`/`And`
    /// predicate, so `Throw` inside it knows to fail outright rather
    /// than attempt labeled-failure recovery (spec §4.6).
    PredicateChoice = 17,
}

impl Opcode {
    pub const MAX_TAG: u8 = 17;

    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::Char => "Char",
            Opcode::Any => "Any",
            Opcode::Choice => "Choice",
            Opcode::Commit => "Commit",
            Opcode::PartialCommit => "PartialCommit",
            Opcode::BackCommit => "BackCommit",
            Opcode::Fail => "Fail",
            Opcode::FailTwice => "FailTwice",
            Opcode::Jump => "Jump",
            Opcode::Call => "Call",
            Opcode::Return => "Return",
            Opcode::Span => "Span",
            Opcode::Set => "Set",
            Opcode::CapOpen => "CapOpen",
            Opcode::CapClose => "CapClose",
            Opcode::Throw => "Throw",
            Opcode::Halt => "Halt",
            Opcode::PredicateChoice => "PredicateChoice",
        }
    }
}

impl TryFrom<u8> for Opcode {
    type Error = ModuleError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        Ok(match tag {
            0 => Opcode::Char,
            1 => Opcode::Any,
            2 => Opcode::Choice,
            3 => Opcode::Commit,
            4 => Opcode::PartialCommit,
            5 => Opcode::BackCommit,
            6 => Opcode::Fail,
            7 => Opcode::FailTwice,
            8 => Opcode::Jump,
            9 => Opcode::Call,
            10 => Opcode::Return,
            11 => Opcode::Span,
            12 => Opcode::Set,
            13 => Opcode::CapOpen,
            14 => Opcode::CapClose,
            15 => Opcode::Throw,
            16 => Opcode::Halt,
            17 => Opcode::PredicateChoice,
            other => return Err(ModuleError::UnknownOpcode(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_tag_round_trips() {
        for tag in 0..=Opcode::MAX_TAG {
            let op = Opcode::try_from(tag).unwrap();
            assert_eq!(op as u8, tag);
        }
    }

    #[test]
    fn tag_above_max_is_rejected() {
        assert!(Opcode::try_from(18).is_err());
        assert!(Opcode::try_from(31).is_err());
    }
}
