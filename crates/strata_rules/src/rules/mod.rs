//! One rule per kind of the catalog.
//!
//! Rules over the front-end's artifacts are generic over [`Frontend`]; the
//! rest are plain structs. Readers name a dependency by its rule type, e.g.
//! `deps.get::<ParseFile<F>>(path)`.
//!
//! [`Frontend`]: crate::Frontend

mod check;
mod files;
mod imports;
mod input;
mod interface;
mod lowering;
mod report;
mod session;

pub use check::TypeCheck;
pub use files::{FileExists, ModSummary, ParseFile};
pub use imports::{BuildModuleGraph, ReportImportCycles, ResolveImports};
pub use input::{ClientSettings, Configuration, FilesOfInterest, SourceText};
pub use interface::{GenerateInterface, LoadPersistedInterface};
pub use lowering::{GenerateBytecode, GenerateCore};
pub use report::{FileDiagnostics, IsFileOfInterest, ReadClientSettings};
pub use session::{AcquireSession, SessionWithDeps};
