//! Shared fixtures: a temporary workspace of lite files and a host over it.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use strata_common::SourcePath;
use strata_config::{load_config_from_str, WorkspaceConfig};
use strata_rules::{Host, Lite};
use tempfile::TempDir;

/// A workspace directory that is deleted when dropped.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    /// Creates a workspace containing `files`.
    pub fn new(files: &[(&str, &str)]) -> Self {
        let ws = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        for (path, text) in files {
            ws.write(path, text);
        }
        ws
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Writes a file on disk, creating parent directories.
    pub fn write(&self, path: &str, text: &str) {
        let full = self.dir.path().join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, text).unwrap();
    }

    /// A host with the default configuration.
    pub fn host(&self) -> Host<Lite> {
        self.host_with(WorkspaceConfig::named("test"))
    }

    pub fn host_with(&self, config: WorkspaceConfig) -> Host<Lite> {
        Host::new(Lite, self.dir.path(), config).unwrap()
    }
}

pub fn path(p: &str) -> SourcePath {
    SourcePath::new(p)
}

pub fn text(s: &str) -> Option<Arc<str>> {
    Some(Arc::from(s))
}

pub fn config(toml: &str) -> WorkspaceConfig {
    load_config_from_str(toml).unwrap()
}
