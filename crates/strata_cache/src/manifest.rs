//! The interface manifest: which fingerprints each persisted interface was
//! computed from.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use strata_common::{Fingerprint, SourcePath};

use crate::error::CacheError;

/// Name of the manifest file within the cache directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Everything a persisted interface depends on.
///
/// The interface may be reused only if the file's source fingerprint, the
/// compiler session fingerprint and the interface fingerprint of every
/// imported module are unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    /// Fingerprint of the source text the interface was generated from.
    pub source: Fingerprint,
    /// Fingerprint of the compiler session configuration.
    pub session: Fingerprint,
    /// Interface fingerprints of the modules the file imports.
    pub dependencies: BTreeMap<SourcePath, Fingerprint>,
    /// Fingerprint of the interface itself.
    pub interface: Fingerprint,
    /// Key of the artifact holding the serialized interface.
    pub artifact_key: String,
}

/// Serialized as `manifest.json` in the cache directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceManifest {
    /// Strata version that produced this cache. A different version
    /// invalidates everything.
    pub strata_version: String,
    /// Per-file interface records.
    pub entries: BTreeMap<SourcePath, InterfaceRecord>,
}

impl InterfaceManifest {
    /// Creates an empty manifest.
    pub fn new(strata_version: &str) -> Self {
        Self {
            strata_version: strata_version.to_string(),
            entries: BTreeMap::new(),
        }
    }

    /// Loads the manifest from `cache_dir`, or `None` if it is missing or
    /// unreadable.
    pub fn load(cache_dir: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(cache_dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Writes the manifest to `cache_dir`, creating the directory if needed.
    pub fn save(&self, cache_dir: &Path) -> Result<(), CacheError> {
        std::fs::create_dir_all(cache_dir).map_err(CacheError::io(cache_dir))?;
        let json = serde_json::to_string_pretty(self).map_err(|e| CacheError::Serialization {
            reason: e.to_string(),
        })?;
        let path = cache_dir.join(MANIFEST_FILE);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(CacheError::io(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(CacheError::io(&path))
    }

    /// Returns `true` if this manifest was produced by `current_version`.
    pub fn is_compatible(&self, current_version: &str) -> bool {
        self.strata_version == current_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> InterfaceRecord {
        InterfaceRecord {
            source: Fingerprint::from_bytes(b"def x: int"),
            session: Fingerprint::from_bytes(b"session"),
            dependencies: BTreeMap::from([(
                SourcePath::new("a.src"),
                Fingerprint::from_bytes(b"a iface"),
            )]),
            interface: Fingerprint::from_bytes(b"b iface"),
            artifact_key: "abc".to_string(),
        }
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = InterfaceManifest::new("0.1.0");
        manifest.entries.insert(SourcePath::new("b.src"), record());
        manifest.save(dir.path()).unwrap();

        let loaded = InterfaceManifest::load(dir.path()).unwrap();
        assert!(loaded.is_compatible("0.1.0"));
        assert_eq!(loaded.entries[&SourcePath::new("b.src")], record());
    }

    #[test]
    fn load_missing_or_corrupt_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(InterfaceManifest::load(dir.path()).is_none());
        std::fs::write(dir.path().join(MANIFEST_FILE), "{ not json").unwrap();
        assert!(InterfaceManifest::load(dir.path()).is_none());
    }

    #[test]
    fn version_check() {
        let manifest = InterfaceManifest::new("0.1.0");
        assert!(!manifest.is_compatible("0.2.0"));
    }
}
