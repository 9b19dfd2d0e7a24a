//! Human-readable bytecode disassembly, used by `-grammar-asm` (spec
//! §6.2). Grounded on the same step-prefixed, color-annotated layout the
//! rest of the toolkit uses for tree pretty-printing.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use peglang_core::Colors;

use crate::instruction::Instruction;
use crate::program::Program;

/// Render every instruction in `program`, with entrypoint labels and a
/// `[strings]` section for reference.
pub fn dump(program: &Program, colors: Colors) -> String {
    let mut out = String::new();
    let labels: BTreeMap<u32, Vec<&str>> =
        program.entrypoints().fold(BTreeMap::new(), |mut map, (name, offset)| {
            map.entry(offset).or_default().push(name);
            map
        });

    let width = width_for(program.instruction_count());

    writeln!(out, "{}[strings]{}", colors.blue, colors.reset).unwrap();
    for (id, bytes) in program.strings().iter() {
        let rendered = std::str::from_utf8(bytes)
            .map(|s| format!("{s:?}"))
            .unwrap_or_else(|_| format!("<{} byte blob>", bytes.len()));
        writeln!(
            out,
            "S{:0w$} {}{rendered}{}",
            id.as_u32(),
            colors.green,
            colors.reset,
            w = width
        )
        .unwrap();
    }
    out.push('\n');

    writeln!(out, "{}[code]{}", colors.blue, colors.reset).unwrap();
    for offset in 0..program.instruction_count() as u32 {
        if let Some(names) = labels.get(&offset) {
            for name in names {
                writeln!(out, "{}{name}{}:", colors.blue, colors.reset).unwrap();
            }
        }
        let instr = program.decode_at(offset).expect("program bytes are well-formed");
        writeln!(out, "{}", format_instruction(offset, &instr, program, width)).unwrap();
    }

    out
}

fn width_for(count: usize) -> usize {
    count.to_string().len().max(2)
}

fn format_instruction(offset: u32, instr: &Instruction, program: &Program, width: usize) -> String {
    let strings = program.strings();
    let body = match instr {
        Instruction::Char(c) => format!("Char {:?}", *c as char),
        Instruction::Any => "Any".to_string(),
        Instruction::Choice(delta) => format!("Choice {:+}", delta),
        Instruction::PredicateChoice(delta) => format!("PredicateChoice {:+}", delta),
        Instruction::Commit(delta) => format!("Commit {:+}", delta),
        Instruction::PartialCommit(delta) => format!("PartialCommit {:+}", delta),
        Instruction::BackCommit(delta) => format!("BackCommit {:+}", delta),
        Instruction::Fail => "Fail".to_string(),
        Instruction::FailTwice => "FailTwice".to_string(),
        Instruction::Jump(delta) => format!("Jump {:+}", delta),
        Instruction::Call(delta) => format!("Call {:+}", delta),
        Instruction::Return => "Return".to_string(),
        Instruction::Span(lo, hi) => format!("Span {:?} {:?}", *lo as char, *hi as char),
        Instruction::Set(id) => format!("Set S{}", id.as_u32()),
        Instruction::CapOpen(kind, id) => {
            format!("CapOpen {kind:?} S{} ; {}", id.as_u32(), strings.get_str(*id))
        }
        Instruction::CapClose(kind, id) => format!("CapClose {kind:?} S{}", id.as_u32()),
        Instruction::Throw(id) => format!("Throw S{} ; {}", id.as_u32(), strings.get_str(*id)),
        Instruction::Halt => "Halt".to_string(),
    };
    format!("  {:0w$}  {body}", offset, w = width)
}
