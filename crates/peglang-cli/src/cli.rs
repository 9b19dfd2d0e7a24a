//! Command-line argument surface (spec §6.2): a single flat set of
//! flags, no subcommands. What runs depends on which flags are present,
//! not on a verb.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(name = "peglang", bin_name = "peglang")]
#[command(about = "Compiler and parsing machine for peglang grammars")]
pub struct Cli {
    /// Grammar file to compile.
    #[arg(long = "grammar", value_name = "PATH")]
    pub grammar: PathBuf,

    /// Input to match against the grammar. Without `-output-path`,
    /// pretty-prints the resulting tree; without either, starts a REPL.
    #[arg(long = "input", value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Rule to match from (defaults to the grammar's entry rule).
    #[arg(long = "entry", value_name = "NAME")]
    pub entry: Option<String>,

    /// Write a generated parser here instead of matching.
    #[arg(long = "output-path", value_name = "PATH")]
    pub output_path: Option<PathBuf>,

    /// Target language for `-output-path`.
    #[arg(long = "output-language", value_enum)]
    pub output_language: Option<OutputLanguage>,

    /// Print the parsed grammar AST and exit.
    #[arg(long = "grammar-ast")]
    pub grammar_ast: bool,

    /// Print a disassembly of the compiled bytecode and exit.
    #[arg(long = "grammar-asm")]
    pub grammar_asm: bool,

    /// Print the instruction-offset -> source-span table and exit.
    #[arg(long = "grammar-source-map")]
    pub grammar_source_map: bool,

    /// Don't inject the `Spacing`/`Digit`/`Alpha` builtin rules.
    #[arg(long = "disable-builtins")]
    pub disable_builtins: bool,

    /// Don't insert automatic whitespace skipping between sequence items.
    #[arg(long = "disable-spaces")]
    pub disable_spaces: bool,

    /// Don't synthesize `Charset` nodes from literals and classes.
    #[arg(long = "disable-charsets")]
    pub disable_charsets: bool,

    /// Don't emit node/block captures.
    #[arg(long = "disable-captures")]
    pub disable_captures: bool,

    /// Don't insert spacing inside captured subtrees.
    #[arg(long = "disable-capture-spaces")]
    pub disable_capture_spaces: bool,

    /// Don't inline small rule bodies at their call sites.
    #[arg(long = "disable-inline")]
    pub disable_inline: bool,

    /// Record expected-token hints on runtime parsing failures.
    #[arg(long = "show-fails")]
    pub show_fails: bool,

    /// Minimum severity to print (default: all).
    #[arg(long = "diagnostics", value_enum, default_value_t = DiagnosticsFilter::All)]
    pub diagnostics: DiagnosticsFilter,

    /// Raise log verbosity (`-v` debug, `-vv` trace). `RUST_LOG` overrides.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputLanguage {
    Go,
    Rust,
    Ts,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum DiagnosticsFilter {
    Error,
    Warning,
    Info,
    Hint,
    All,
}

impl DiagnosticsFilter {
    pub fn admits(self, severity: peglang_core::Severity) -> bool {
        use peglang_core::Severity::*;
        match self {
            DiagnosticsFilter::All => true,
            DiagnosticsFilter::Error => severity == Error,
            DiagnosticsFilter::Warning => matches!(severity, Error | Warning),
            DiagnosticsFilter::Info => matches!(severity, Error | Warning | Info),
            DiagnosticsFilter::Hint => matches!(severity, Error | Warning | Info | Hint),
        }
    }
}

impl Cli {
    pub fn compile_options(&self) -> peglang_compiler::CompileOptions {
        peglang_compiler::CompileOptions {
            builtins: !self.disable_builtins,
            charsets: !self.disable_charsets,
            spaces: !self.disable_spaces,
            captures: !self.disable_captures,
            capture_spaces: !self.disable_capture_spaces,
            inline: !self.disable_inline,
            show_fails: self.show_fails,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peglang_core::Severity;

    #[test]
    fn diagnostics_filter_is_a_minimum_severity() {
        assert!(DiagnosticsFilter::Warning.admits(Severity::Error));
        assert!(DiagnosticsFilter::Warning.admits(Severity::Warning));
        assert!(!DiagnosticsFilter::Warning.admits(Severity::Info));
        assert!(!DiagnosticsFilter::Warning.admits(Severity::Hint));
        assert!(DiagnosticsFilter::All.admits(Severity::Hint));
        assert!(!DiagnosticsFilter::Error.admits(Severity::Warning));
    }

    #[test]
    fn disable_flags_invert_into_compile_options() {
        let cli = Cli::parse_from([
            "peglang",
            "--grammar",
            "g.peg",
            "--disable-builtins",
            "--disable-inline",
        ]);
        let options = cli.compile_options();
        assert!(!options.builtins);
        assert!(!options.inline);
        assert!(options.charsets);
        assert!(options.spaces);
    }
}
