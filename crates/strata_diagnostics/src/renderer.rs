//! Human-readable terminal rendering of diagnostics.

use std::fmt::Write;

use strata_source::SourceFile;

use crate::diagnostic::Diagnostic;

/// Renders diagnostics in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[T001]: cannot find `x` in scope
///   --> src/b.src:3:5
///    |
///  3 | use x
///    |     ^
///    = note: ...
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Renders one diagnostic. `file` supplies the source text for the
    /// snippet; without it only the header and notes are printed.
    pub fn render(&self, diag: &Diagnostic, file: Option<&SourceFile>) -> String {
        let mut out = String::new();
        let severity = if self.color {
            let color = if diag.is_error() { "31" } else { "33" };
            format!("\x1b[1;{color}m{}\x1b[0m", diag.severity)
        } else {
            diag.severity.to_string()
        };
        let _ = writeln!(out, "{severity}[{}]: {}", diag.code, diag.message);

        match (diag.span, file) {
            (Some(span), Some(file)) => {
                let pos = file.line_col(span.start);
                let line_num = pos.line.to_string();
                let padding = " ".repeat(line_num.len());
                let _ = writeln!(out, "{padding}--> {}:{pos}", diag.path);
                let _ = writeln!(out, "{padding} |");
                let _ = writeln!(out, "{line_num} | {}", file.line_text(span.start));
                let carets = "^".repeat(span.len().max(1) as usize);
                let col_padding = " ".repeat(pos.col as usize - 1);
                let _ = writeln!(out, "{padding} | {col_padding}{carets}");
            }
            _ => {
                let _ = writeln!(out, "  --> {}", diag.path);
            }
        }

        for note in &diag.notes {
            let _ = writeln!(out, "   = note: {note}");
        }
        out
    }
}
