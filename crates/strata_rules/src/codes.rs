//! Diagnostic codes reported by the rules.

use strata_diagnostics::{Category, DiagnosticCode};

/// The file does not exist or cannot be read.
pub const FILE_NOT_FOUND: DiagnosticCode = DiagnosticCode::new(Category::File, 1);
/// The file exists but is not UTF-8 text.
pub const FILE_NOT_UTF8: DiagnosticCode = DiagnosticCode::new(Category::File, 2);

/// An import names no existing file.
pub const UNRESOLVED_IMPORT: DiagnosticCode = DiagnosticCode::new(Category::Import, 1);
/// The file is part of an import cycle.
pub const IMPORT_CYCLE: DiagnosticCode = DiagnosticCode::new(Category::Import, 3);
/// An imported module has errors, so this file cannot be checked.
pub const DEPENDENCY_ERRORS: DiagnosticCode = DiagnosticCode::new(Category::Import, 4);
/// Nothing from an imported module is used.
pub const UNUSED_IMPORT: DiagnosticCode = DiagnosticCode::new(Category::Import, 5);

/// The compiler session for the file's unit could not be built.
pub const SESSION_FAILED: DiagnosticCode = DiagnosticCode::new(Category::Session, 1);

/// A rule failed with an internal error.
pub const INTERNAL: DiagnosticCode = DiagnosticCode::new(Category::Internal, 1);
/// A rule (transitively) requested itself.
pub const RULE_CYCLE: DiagnosticCode = DiagnosticCode::new(Category::Internal, 2);
