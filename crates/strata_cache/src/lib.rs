//! On-disk persistence of module interfaces across process restarts.
//!
//! Interfaces are stored as content-addressed binary artifacts with a
//! validated header. A JSON manifest records, for every file, the
//! fingerprints the interface was computed from; a persisted interface is
//! only reused when all of them still match.

#![warn(missing_docs)]

pub mod artifact;
pub mod error;
pub mod manifest;
pub mod store;

pub use error::CacheError;
pub use manifest::{InterfaceManifest, InterfaceRecord};
pub use store::{InterfaceStore, PersistedInterface};
