//! Structured diagnostics attached to source files.
//!
//! Every file-level failure in the rule graph surfaces as a [`Diagnostic`]
//! on that file. The [`DiagnosticSink`] keeps the latest diagnostics per file
//! and [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Severity};
pub use renderer::TerminalRenderer;
pub use sink::DiagnosticSink;
