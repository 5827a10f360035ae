//! Parsing, validation and resolution of `strata.toml` workspace configuration.
//!
//! The [`WorkspaceConfig`] describes source roots, engine tuning, the package
//! set visible to compiler sessions, and default client settings.
//! [`resolve_unit`] maps a file to the build unit that encloses it; the
//! unit's fingerprint keys the compiler session used for that file.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod resolve;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str, CONFIG_FILE};
pub use resolve::{resolve_unit, ResolvedUnit};
pub use types::*;
