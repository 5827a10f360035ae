//! The rule catalog of a language front-end, on top of the incremental
//! engine.
//!
//! A [`Frontend`] supplies the compute functions: parsing, session loading,
//! type checking, interface extraction, lowering and code generation. The
//! rules in [`rules`] wire them into the engine, adding import resolution,
//! the module graph, cycle reporting, session sharing and interface
//! persistence. A [`Host`] owns the engine for one workspace and turns
//! editor notifications into input changes.
//!
//! [`lite`] is a small front-end used by the CLI and the tests.

#![warn(missing_docs)]

pub mod codes;
pub mod context;
pub mod frontend;
pub mod host;
pub mod lite;
pub mod rules;

pub use context::{registry, RuleContext, STRATA_VERSION};
pub use frontend::{
    Checked, FileContents, FileSummary, Frontend, ImportDecl, ImportGraph, InterfaceKey,
    InterfaceLookup, ParsedFile, ResolvedImport, ResolvedImports, SessionEnv, SessionHandle,
};
pub use host::{GcReport, Host};
pub use lite::Lite;
