//! Editor overlay file system.
//!
//! Unsaved editor buffers shadow the on-disk contents of a file. Reads go to
//! the overlay first and fall back to disk, so closing a buffer without saving
//! reverts the file to what is on disk.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;
use rayon::prelude::*;
use serde::Serialize;
use strata_common::SourcePath;
use thiserror::Error;

/// Where a [`FileSnapshot`] was read from.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Origin {
    /// An unsaved editor buffer.
    Overlay,
    /// The file system.
    Disk,
}

/// The contents of a file at one point in time.
#[derive(Clone, Debug)]
pub struct FileSnapshot {
    /// The file text.
    pub text: Arc<str>,
    /// Modification time, for disk reads only.
    pub modified: Option<SystemTime>,
    /// Where the text came from.
    pub origin: Origin,
}

/// Why a file has no text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Error)]
pub enum ReadError {
    /// No buffer and no file on disk.
    #[error("file not found")]
    NotFound,
    /// The file exists but its bytes are not UTF-8.
    #[error("not valid UTF-8 text")]
    NotUtf8,
    /// Any other I/O failure, such as missing permissions.
    #[error("{0}")]
    Io(String),
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => ReadError::NotFound,
            io::ErrorKind::InvalidData => ReadError::NotUtf8,
            _ => ReadError::Io(err.to_string()),
        }
    }
}

/// The overlay file system rooted at the workspace directory.
///
/// Relative [`SourcePath`]s are resolved against the root when touching disk.
pub struct Vfs {
    root: PathBuf,
    overlays: RwLock<BTreeMap<SourcePath, Arc<str>>>,
}

impl Vfs {
    /// Creates an overlay file system over `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            overlays: RwLock::new(BTreeMap::new()),
        }
    }

    /// Returns the workspace root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Records an unsaved buffer for `path`, returning the previous one.
    pub fn set_overlay(&self, path: SourcePath, text: Arc<str>) -> Option<Arc<str>> {
        self.overlays.write().insert(path, text)
    }

    /// Drops the buffer for `path`. Returns `true` if one existed.
    pub fn remove_overlay(&self, path: &SourcePath) -> bool {
        self.overlays.write().remove(path).is_some()
    }

    /// Returns `true` if `path` has an unsaved buffer.
    pub fn has_overlay(&self, path: &SourcePath) -> bool {
        self.overlays.read().contains_key(path)
    }

    /// Returns the paths of all open buffers.
    pub fn overlay_paths(&self) -> Vec<SourcePath> {
        self.overlays.read().keys().cloned().collect()
    }

    /// Resolves a source path to a file system path.
    pub fn disk_path(&self, path: &SourcePath) -> PathBuf {
        let p = path.as_path();
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    /// Reads the current contents of `path`, from its buffer if it has one.
    pub fn read(&self, path: &SourcePath) -> Result<FileSnapshot, ReadError> {
        if let Some(text) = self.overlays.read().get(path) {
            return Ok(FileSnapshot {
                text: text.clone(),
                modified: None,
                origin: Origin::Overlay,
            });
        }
        let disk = self.disk_path(path);
        let text = std::fs::read_to_string(&disk)?;
        let modified = std::fs::metadata(&disk).and_then(|m| m.modified()).ok();
        Ok(FileSnapshot {
            text: text.into(),
            modified,
            origin: Origin::Disk,
        })
    }

    /// Reads many files in parallel, preserving the input order.
    pub fn read_many(
        &self,
        paths: &[SourcePath],
    ) -> Vec<(SourcePath, Result<FileSnapshot, ReadError>)> {
        paths
            .par_iter()
            .map(|path| (path.clone(), self.read(path)))
            .collect()
    }

    /// Recursively lists files under `dir` with the given extension, as paths
    /// relative to the root, sorted.
    pub fn discover(&self, dir: &SourcePath, extension: &str) -> io::Result<Vec<SourcePath>> {
        let mut found = Vec::new();
        walk_dir(&self.disk_path(dir), &mut |path| {
            if path.extension().and_then(|e| e.to_str()) == Some(extension) {
                let relative = path.strip_prefix(&self.root).unwrap_or(path);
                found.push(SourcePath::new(relative));
            }
        })?;
        found.sort();
        Ok(found)
    }
}

fn walk_dir(dir: &Path, visit: &mut dyn FnMut(&Path)) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            walk_dir(&path, visit)?;
        } else {
            visit(&path);
        }
    }
    Ok(())
}
