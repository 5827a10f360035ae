//! Source text management: the editor overlay file system, line indexing and
//! byte spans.
//!
//! The [`Vfs`] answers "what is the current text of this file", preferring
//! unsaved editor buffers over disk contents. [`SourceFile`] adds a line index
//! for turning [`Span`]s into line/column coordinates in diagnostics.

#![warn(missing_docs)]

pub mod source_file;
pub mod span;
pub mod vfs;

pub use source_file::{LineCol, SourceFile};
pub use span::Span;
pub use vfs::{FileSnapshot, Origin, ReadError, Vfs};
