//! Interactive matcher loop, entered when neither `-input` nor
//! `-output-path` is given (spec §6.2, §7). Each line typed is matched
//! against the grammar's entry rule; the resulting tree is printed, or
//! the failure position, pointed at with a caret into the line.

use std::io::{self, BufRead, Write};

use peglang_bytecode::Program;
use peglang_core::Colors;
use peglang_vm::{FuelLimits, MatchOutcome, Vm};

pub fn run(program: &Program, entry: &str, colors: Colors, show_fails: bool) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        write!(stdout, "{}>{} ", colors.blue, colors.reset)?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            writeln!(stdout)?;
            return Ok(());
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.is_empty() {
            continue;
        }

        let vm = Vm::new(program, FuelLimits::default()).with_show_fails(show_fails);
        match vm.run(entry, line) {
            Ok(MatchOutcome::Matched { tree, end }) => {
                let rendered = if colors.blue.is_empty() {
                    tree.pretty(program.strings(), line)
                } else {
                    tree.highlight(program.strings(), line)
                };
                print!("{rendered}");
                println!("{}matched {} of {} bytes{}", colors.dim, end.cursor, line.len(), colors.reset);
            }
            Ok(MatchOutcome::Failed { furthest, expected }) => {
                println!("{line}");
                println!("{}{}^ no match at byte {}{}", " ".repeat(furthest.cursor as usize), colors.green, furthest.cursor, colors.reset);
                if !expected.is_empty() {
                    let hints: Vec<String> = expected.iter().map(|h| h.to_string()).collect();
                    println!("{}expected: {}{}", colors.dim, hints.join(" or "), colors.reset);
                }
            }
            Err(err) => {
                println!("{}error: {err}{}", colors.dim, colors.reset);
            }
        }
    }
}
