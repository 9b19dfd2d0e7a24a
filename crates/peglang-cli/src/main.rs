mod cli;
mod repl;

use std::io::IsTerminal;
use std::process::ExitCode;

use clap::Parser;

use cli::Cli;
use peglang_core::Colors;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let colors = if std::io::stdout().is_terminal() { Colors::ON } else { Colors::OFF };

    if cli.output_path.is_some() || cli.output_language.is_some() {
        eprintln!("error: generating a parser for a foreign language is not supported by this build");
        return ExitCode::FAILURE;
    }

    let mut db = peglang_db::filesystem_database();
    let file = match db.open(cli.grammar.clone()) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let options = cli.compile_options();

    if cli.grammar_ast {
        let resolved = peglang_db::resolved_imports(&db, file);
        println!("{:#?}", resolved.grammar(&db));
        return exit_for(&db, file, options, &cli);
    }

    let program = peglang_db::program(&db, file, options);

    if cli.grammar_asm || cli.grammar_source_map {
        match &program {
            Some(program) => {
                if cli.grammar_asm {
                    print!("{}", peglang_bytecode::dump(program, colors));
                }
                if cli.grammar_source_map {
                    match program.source_map() {
                        Some(map) => {
                            for (offset, location) in map.iter() {
                                println!("{offset:>6} -> file {} @ {:?}", location.file.as_u32(), location.span);
                            }
                        }
                        None => println!("(no source map recorded)"),
                    }
                }
            }
            None => {
                eprintln!("error: grammar failed to compile, see diagnostics");
            }
        }
        return exit_for(&db, file, options, &cli);
    }

    let Some(program) = program else {
        return exit_for(&db, file, options, &cli);
    };

    let entry_name = cli
        .entry
        .clone()
        .or_else(|| {
            let resolved = peglang_db::resolved_imports(&db, file);
            resolved.grammar(&db).entry().map(|d| d.name.clone())
        })
        .unwrap_or_default();

    match &cli.input {
        Some(input_path) => {
            let input = match std::fs::read_to_string(input_path) {
                Ok(text) => text,
                Err(err) => {
                    eprintln!("error: could not read `{}`: {err}", input_path.display());
                    return ExitCode::FAILURE;
                }
            };
            let outcome = peglang_db::run_match_with_limits(
                &program,
                &entry_name,
                &input,
                peglang_vm::FuelLimits::default(),
                options.show_fails,
            );
            match outcome {
                Ok(peglang_vm::MatchOutcome::Matched { tree, end }) => {
                    let rendered = if colors.blue.is_empty() {
                        tree.pretty(program.strings(), &input)
                    } else {
                        tree.highlight(program.strings(), &input)
                    };
                    print!("{rendered}");
                    tracing::debug!(end = end.cursor, "match consumed bytes");
                }
                Ok(peglang_vm::MatchOutcome::Failed { furthest, expected }) => {
                    eprintln!(
                        "no match: furthest position reached was line {} column {} (byte {})",
                        furthest.line, furthest.column, furthest.cursor
                    );
                    if !expected.is_empty() {
                        let hints: Vec<String> = expected.iter().map(|h| h.to_string()).collect();
                        eprintln!("expected: {}", hints.join(" or "));
                    }
                }
                Err(err) => {
                    eprintln!("error: {err}");
                }
            }
        }
        None => {
            if let Err(err) = repl::run(&program, &entry_name, colors, options.show_fails) {
                eprintln!("error: {err}");
                return ExitCode::FAILURE;
            }
        }
    }

    exit_for(&db, file, options, &cli)
}

/// Prints every diagnostic that passes `-diagnostics`'s severity filter
/// and returns the exit code spec §6.2 describes: failure on any
/// error-severity diagnostic (an I/O failure already returned directly).
fn exit_for(
    db: &peglang_db::Database,
    file: peglang_db::SourceFile,
    options: peglang_compiler::CompileOptions,
    cli: &Cli,
) -> ExitCode {
    let diags = peglang_db::diagnostics(db, file, options);
    let mut has_errors = false;
    for diag in &diags {
        if !cli.diagnostics.admits(diag.severity) {
            continue;
        }
        has_errors |= diag.severity == peglang_core::Severity::Error;
        eprintln!("{}", peglang_compiler::diagnostics::format_line(diag));
    }
    if has_errors { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}
