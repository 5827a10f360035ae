//! Content-addressed binary artifact files.
//!
//! Each artifact is `<dir>/<fingerprint>.iface`: a 4-byte little-endian
//! header length, a bincode header (magic, format version, producer
//! version, payload checksum), then the payload.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use strata_common::Fingerprint;

use crate::error::CacheError;

/// Magic bytes identifying a Strata artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"STRA";

/// Current artifact format version.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// File extension of interface artifacts.
pub const ARTIFACT_EXT: &str = "iface";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArtifactHeader {
    magic: [u8; 4],
    format_version: u32,
    producer_version: String,
    checksum: Fingerprint,
}

/// Reads and writes artifacts in one directory.
pub struct ArtifactDir {
    dir: PathBuf,
}

impl ArtifactDir {
    /// Creates a handle for `dir`. Nothing is created on disk until the first
    /// write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the file path for the artifact with `key`.
    pub fn path_of(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ARTIFACT_EXT}"))
    }

    /// Writes `payload` and returns its key, the payload fingerprint.
    ///
    /// Writing identical content twice is a no-op on the second call.
    pub fn write(&self, payload: &[u8], producer_version: &str) -> Result<String, CacheError> {
        std::fs::create_dir_all(&self.dir).map_err(CacheError::io(&self.dir))?;

        let checksum = Fingerprint::from_bytes(payload);
        let key = checksum.to_string();
        let path = self.path_of(&key);
        if path.exists() {
            return Ok(key);
        }

        let header = ArtifactHeader {
            magic: ARTIFACT_MAGIC,
            format_version: ARTIFACT_FORMAT_VERSION,
            producer_version: producer_version.to_string(),
            checksum,
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
        output.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(payload);

        // readers must never observe a partially written artifact
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, &output).map_err(CacheError::io(&tmp))?;
        std::fs::rename(&tmp, &path).map_err(CacheError::io(&path))?;
        Ok(key)
    }

    /// Reads and validates the artifact with `key`.
    ///
    /// Returns `None` on a missing file, bad magic, format or producer
    /// version mismatch, or checksum failure.
    pub fn read(&self, key: &str, producer_version: &str) -> Option<Vec<u8>> {
        let raw = std::fs::read(self.path_of(key)).ok()?;
        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        let header_end = 4usize.checked_add(header_len)?;
        if raw.len() < header_end {
            return None;
        }

        let (header, _): (ArtifactHeader, usize) =
            bincode::serde::decode_from_slice(&raw[4..header_end], bincode::config::standard())
                .ok()?;
        if header.magic != ARTIFACT_MAGIC
            || header.format_version != ARTIFACT_FORMAT_VERSION
            || header.producer_version != producer_version
        {
            return None;
        }

        let payload = &raw[header_end..];
        (Fingerprint::from_bytes(payload) == header.checksum).then(|| payload.to_vec())
    }

    /// Deletes artifacts whose key is not in `live_keys`. Returns the number
    /// of files removed.
    pub fn gc(&self, live_keys: &[&str]) -> Result<usize, CacheError> {
        if !self.dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir).map_err(CacheError::io(&self.dir))? {
            let path = entry.map_err(CacheError::io(&self.dir))?.path();
            if !has_artifact_ext(&path) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !live_keys.contains(&stem) {
                std::fs::remove_file(&path).map_err(CacheError::io(&path))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn has_artifact_ext(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ARTIFACT_EXT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_dir() -> (tempfile::TempDir, ArtifactDir) {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = ArtifactDir::new(dir.path().join("interfaces"));
        (dir, artifacts)
    }

    #[test]
    fn write_and_read_back() {
        let (_dir, artifacts) = make_dir();
        let key = artifacts.write(b"exports x: int", "0.1.0").unwrap();
        assert_eq!(key, Fingerprint::from_bytes(b"exports x: int").to_string());
        assert_eq!(artifacts.read(&key, "0.1.0").unwrap(), b"exports x: int");
    }

    #[test]
    fn producer_version_mismatch_is_a_miss() {
        let (_dir, artifacts) = make_dir();
        let key = artifacts.write(b"payload", "0.1.0").unwrap();
        assert!(artifacts.read(&key, "0.2.0").is_none());
    }

    #[test]
    fn corrupt_payload_is_a_miss() {
        let (_dir, artifacts) = make_dir();
        let key = artifacts.write(b"payload", "0.1.0").unwrap();
        let path = artifacts.path_of(&key);
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        std::fs::write(&path, raw).unwrap();
        assert!(artifacts.read(&key, "0.1.0").is_none());
    }

    #[test]
    fn garbage_file_is_a_miss() {
        let (_dir, artifacts) = make_dir();
        let key = artifacts.write(b"payload", "0.1.0").unwrap();
        std::fs::write(artifacts.path_of(&key), b"\xff\xff\xff\xffgarbage").unwrap();
        assert!(artifacts.read(&key, "0.1.0").is_none());
        assert!(artifacts.read("missing", "0.1.0").is_none());
    }

    #[test]
    fn gc_keeps_live_keys() {
        let (_dir, artifacts) = make_dir();
        let live = artifacts.write(b"live", "0.1.0").unwrap();
        let dead = artifacts.write(b"dead", "0.1.0").unwrap();
        assert_eq!(artifacts.gc(&[live.as_str()]).unwrap(), 1);
        assert!(artifacts.read(&live, "0.1.0").is_some());
        assert!(artifacts.read(&dead, "0.1.0").is_none());
    }
}
