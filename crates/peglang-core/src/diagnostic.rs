//! Diagnostic values (spec §3, §7). A [`Diagnostic`] is a plain value, not
//! a log line: the database accumulates, dedups and groups these, and the
//! printer (in `peglang-compiler::diagnostics`) turns them into text.

use std::path::PathBuf;

use crate::span::SourceLocation;

/// Severity of a diagnostic, ordered from least to most severe for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Hint,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Hint => "hint",
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }
}

/// Every diagnostic code the toolkit emits (spec §7 taxonomy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    // Parse errors (spec §4.1)
    SyntaxError,
    UnclosedDelimiter,
    MissingLabelName,
    MissingImportName,
    MissingImportSource,
    // Import resolution (spec §4.2)
    ImportNotFound,
    ImportCycle,
    ImportNameClash,
    // Semantic analyses (spec §4.3)
    UndefinedRule,
    LeftRecursion,
    UnusedRule,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::SyntaxError => "syntax-error",
            DiagnosticCode::UnclosedDelimiter => "unclosed-delimiter",
            DiagnosticCode::MissingLabelName => "missing-label-name",
            DiagnosticCode::MissingImportName => "missing-import-name",
            DiagnosticCode::MissingImportSource => "missing-import-source",
            DiagnosticCode::ImportNotFound => "import-not-found",
            DiagnosticCode::ImportCycle => "import-cycle",
            DiagnosticCode::ImportNameClash => "import-name-clash",
            DiagnosticCode::UndefinedRule => "undefined-rule",
            DiagnosticCode::LeftRecursion => "left-recursion",
            DiagnosticCode::UnusedRule => "unused-rule",
        }
    }

    /// The default severity for this code; some (e.g. unused-rule) are
    /// always warnings, the rest are always errors.
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticCode::UnusedRule => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

/// A single diagnostic: where it came from (`file`), where in that file
/// (`location`), how bad it is, and a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub location: SourceLocation,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        file: PathBuf,
        location: SourceLocation,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file,
            location,
            severity: code.default_severity(),
            code,
            message: message.into(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }
}
