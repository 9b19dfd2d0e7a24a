//! Parser- and analysis-facing diagnostics collection, plus rendering.
//!
//! Diagnostics are plain [`peglang_core::Diagnostic`] values (spec §3,
//! §7); this module only adds the accumulate-while-parsing ergonomics
//! (`report(...).message(...).emit()`) and the two ways of turning them
//! into text: the one-line CLI format (spec §7 "User-visible behavior")
//! and a richer `annotate-snippets` rendering for terminals.

use std::path::PathBuf;

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};

use peglang_core::{Diagnostic, DiagnosticCode, FileId, Severity, SourceLocation, Span};

/// Collection of diagnostics accumulated while processing one file (spec
/// §7 "accumulate diagnostics rather than aborting at the first one").
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

#[must_use = "diagnostic not recorded until .emit() is called"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    diagnostic: Diagnostic,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, code: DiagnosticCode, file: FileId, path: PathBuf, span: Span) -> DiagnosticBuilder<'_> {
        let location = SourceLocation::new(file, span);
        DiagnosticBuilder {
            diagnostic: Diagnostic::new(path, location, code, default_message(code)),
            diagnostics: self,
        }
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.items.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn printer<'a>(&'a self, source: &'a str) -> DiagnosticsPrinter<'a> {
        DiagnosticsPrinter {
            diagnostics: &self.items,
            source,
            colored: false,
        }
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.diagnostic.message = message.into();
        self
    }

    pub fn emit(self) {
        self.diagnostics.items.push(self.diagnostic);
    }
}

fn default_message(code: DiagnosticCode) -> &'static str {
    match code {
        DiagnosticCode::SyntaxError => "syntax error",
        DiagnosticCode::UnclosedDelimiter => "unclosed delimiter",
        DiagnosticCode::MissingLabelName => "expected a label name after `^`",
        DiagnosticCode::MissingImportName => "expected an imported name",
        DiagnosticCode::MissingImportSource => "expected a source path after `from`",
        DiagnosticCode::ImportNotFound => "import target not found",
        DiagnosticCode::ImportCycle => "import cycle",
        DiagnosticCode::ImportNameClash => "imported name clashes with an existing definition",
        DiagnosticCode::UndefinedRule => "reference to an undefined rule",
        DiagnosticCode::LeftRecursion => "left-recursive rule",
        DiagnosticCode::UnusedRule => "rule is never used",
    }
}

/// One line per diagnostic in the exact CLI format from spec §7:
/// `<path>:<line>:<col>: <severity>: <message> [<code>]`.
pub fn format_line(diagnostic: &Diagnostic) -> String {
    format!(
        "{}:{}:{}: {}: {} [{}]",
        diagnostic.file.display(),
        diagnostic.location.span.start.line,
        diagnostic.location.span.start.column,
        diagnostic.severity.label(),
        diagnostic.message,
        diagnostic.code.as_str(),
    )
}

/// Rich, source-annotated rendering via `annotate-snippets`.
pub struct DiagnosticsPrinter<'a> {
    diagnostics: &'a [Diagnostic],
    source: &'a str,
    colored: bool,
}

impl<'a> DiagnosticsPrinter<'a> {
    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let renderer = if self.colored { Renderer::styled() } else { Renderer::plain() };
        let mut out = String::new();
        for (i, diag) in self.diagnostics.iter().enumerate() {
            let range = adjust_range(diag.location.span, self.source.len());
            let level = severity_to_level(diag.severity);
            let path = diag.file.display().to_string();
            let snippet = Snippet::source(self.source)
                .path(&path)
                .line_start(1)
                .annotation(AnnotationKind::Primary.span(range).label(&diag.message));
            let group = level.primary_title(&diag.message).element(snippet);
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&renderer.render(&[group]).to_string());
        }
        out
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
        Severity::Info => Level::NOTE,
        Severity::Hint => Level::HELP,
    }
}

fn adjust_range(span: Span, limit: usize) -> std::ops::Range<usize> {
    let start = span.start.cursor as usize;
    let end = span.end.cursor as usize;
    if start == end {
        start..(start + 1).min(limit)
    } else {
        start..end
    }
}
