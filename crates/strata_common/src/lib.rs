//! Shared foundational types used across the Strata incremental build engine.
//!
//! This crate provides content fingerprints, normalized source paths, the
//! internal error type, and logging setup.

#![warn(missing_docs)]

pub mod fingerprint;
pub mod logging;
pub mod path;
pub mod result;

pub use fingerprint::{Fingerprint, Fingerprinter};
pub use logging::Verbosity;
pub use path::SourcePath;
pub use result::{InternalError, StrataResult};
