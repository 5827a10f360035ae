//! The interface store used by the persistence rules.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use strata_common::SourcePath;

use crate::artifact::ArtifactDir;
use crate::error::CacheError;
use crate::manifest::{InterfaceManifest, InterfaceRecord};

/// Subdirectory holding interface artifacts.
const INTERFACE_SUBDIR: &str = "interfaces";

/// A persisted interface and the record describing what it was built from.
#[derive(Debug, Clone)]
pub struct PersistedInterface<T> {
    /// The fingerprints the interface was computed from.
    pub record: InterfaceRecord,
    /// The decoded interface.
    pub value: T,
}

/// Persists module interfaces under a cache directory.
///
/// Safe to share between concurrently running rules. Changes to the
/// manifest are kept in memory until [`flush`](Self::flush).
pub struct InterfaceStore {
    cache_dir: PathBuf,
    manifest: Mutex<InterfaceManifest>,
    artifacts: ArtifactDir,
    strata_version: String,
}

impl InterfaceStore {
    /// Opens the store in `cache_dir`, starting empty when the existing
    /// manifest is missing, corrupt, or from another version.
    pub fn open(cache_dir: &Path, strata_version: &str) -> Self {
        let manifest = InterfaceManifest::load(cache_dir)
            .filter(|m| m.is_compatible(strata_version))
            .unwrap_or_else(|| InterfaceManifest::new(strata_version));
        tracing::debug!(
            dir = %cache_dir.display(),
            entries = manifest.entries.len(),
            "opened interface store"
        );
        Self {
            cache_dir: cache_dir.to_path_buf(),
            manifest: Mutex::new(manifest),
            artifacts: ArtifactDir::new(cache_dir.join(INTERFACE_SUBDIR)),
            strata_version: strata_version.to_string(),
        }
    }

    /// Returns the record for `path`, if any.
    pub fn record(&self, path: &SourcePath) -> Option<InterfaceRecord> {
        self.manifest.lock().entries.get(path).cloned()
    }

    /// Loads and decodes the interface persisted for `path`.
    ///
    /// Returns `None` on any miss: no record, unreadable artifact, or an
    /// artifact that no longer decodes as `T`.
    pub fn load<T: DeserializeOwned>(&self, path: &SourcePath) -> Option<PersistedInterface<T>> {
        let record = self.record(path)?;
        let bytes = self.artifacts.read(&record.artifact_key, &self.strata_version)?;
        let (value, _) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).ok()?;
        Some(PersistedInterface { record, value })
    }

    /// Persists `value` for `path`, replacing the previous record.
    ///
    /// `record.artifact_key` is overwritten with the key of the written
    /// artifact.
    pub fn store<T: Serialize>(
        &self,
        path: SourcePath,
        mut record: InterfaceRecord,
        value: &T,
    ) -> Result<(), CacheError> {
        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(
            |e| CacheError::Serialization {
                reason: e.to_string(),
            },
        )?;
        record.artifact_key = self.artifacts.write(&bytes, &self.strata_version)?;
        self.manifest.lock().entries.insert(path, record);
        Ok(())
    }

    /// Forgets the record for `path`.
    pub fn remove(&self, path: &SourcePath) {
        self.manifest.lock().entries.remove(path);
    }

    /// Keeps only the records whose path satisfies `keep`. Returns the
    /// number of records dropped.
    pub fn retain(&self, mut keep: impl FnMut(&SourcePath) -> bool) -> usize {
        let mut manifest = self.manifest.lock();
        let before = manifest.entries.len();
        manifest.entries.retain(|path, _| keep(path));
        before - manifest.entries.len()
    }

    /// Returns the number of persisted interfaces.
    pub fn len(&self) -> usize {
        self.manifest.lock().entries.len()
    }

    /// Returns `true` if nothing is persisted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the manifest to disk.
    pub fn flush(&self) -> Result<(), CacheError> {
        let manifest = self.manifest.lock().clone();
        manifest.save(&self.cache_dir)
    }

    /// Deletes artifacts no record refers to. Returns the number removed.
    pub fn gc(&self) -> Result<usize, CacheError> {
        let keys: Vec<String> = self
            .manifest
            .lock()
            .entries
            .values()
            .map(|r| r.artifact_key.clone())
            .collect();
        let live: Vec<&str> = keys.iter().map(String::as_str).collect();
        self.artifacts.gc(&live)
    }
}
