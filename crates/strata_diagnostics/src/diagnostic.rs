//! Diagnostic messages and their severity.

use serde::{Deserialize, Serialize};
use std::fmt;
use strata_common::SourcePath;
use strata_source::Span;

use crate::code::DiagnosticCode;

/// The severity level of a diagnostic, ordered from least to most severe.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// Additional context.
    Note,
    /// A potential problem that does not block compilation.
    Warning,
    /// A problem that blocks compilation of the file.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A structured message attached to one source file.
///
/// `span` is `None` for problems that concern the file as a whole, such as
/// an unreadable file or a failed compiler session.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The file the diagnostic belongs to.
    pub path: SourcePath,
    /// The severity level.
    pub severity: Severity,
    /// The code identifying the kind of problem.
    pub code: DiagnosticCode,
    /// The main message.
    pub message: String,
    /// Where in the file the problem was found.
    pub span: Option<Span>,
    /// Explanatory footnotes.
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Creates an error diagnostic.
    pub fn error(path: SourcePath, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Error, path, code, message)
    }

    /// Creates a warning diagnostic.
    pub fn warning(path: SourcePath, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::with_severity(Severity::Warning, path, code, message)
    }

    fn with_severity(
        severity: Severity,
        path: SourcePath,
        code: DiagnosticCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path,
            severity,
            code,
            message: message.into(),
            span: None,
            notes: Vec::new(),
        }
    }

    /// Attaches a source span.
    pub fn at(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Adds a note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Returns `true` for error-severity diagnostics.
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
