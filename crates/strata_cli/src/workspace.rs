//! Shared helpers for CLI commands: locating the workspace, loading its
//! configuration and building the runtime the engine evaluates on.

use std::path::{Path, PathBuf};

use strata_common::SourcePath;
use strata_config::{load_config, load_config_from_str, WorkspaceConfig, CONFIG_FILE};
use strata_rules::{Host, Lite};
use tokio::runtime::Runtime;

use crate::GlobalArgs;

/// A workspace root and its configuration.
pub struct Workspace {
    /// The directory holding `strata.toml`.
    pub root: PathBuf,
    /// The loaded configuration.
    pub config: WorkspaceConfig,
}

impl Workspace {
    /// Locates and loads the workspace selected by the global flags.
    pub fn open(global: &GlobalArgs) -> Result<Self, Box<dyn std::error::Error>> {
        let (root, config) = match global.config.as_deref().map(PathBuf::from) {
            Some(path) if path.is_file() => {
                let content = std::fs::read_to_string(&path)?;
                let root = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| PathBuf::from("."));
                (root, load_config_from_str(&content)?)
            }
            Some(dir) => {
                let config = load_config(&dir)?;
                (dir, config)
            }
            None => {
                let root = find_workspace_root(&std::env::current_dir()?)?;
                let config = load_config(&root)?;
                (root, config)
            }
        };
        tracing::debug!(root = %root.display(), name = %config.workspace.name, "workspace loaded");
        Ok(Self { root, config })
    }

    /// A multi-threaded runtime sized by `engine.workers`.
    pub fn runtime(&self) -> std::io::Result<Runtime> {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.worker_count())
            .enable_all()
            .build()
    }

    /// A host for this workspace using the lite front-end.
    pub fn host(&self) -> Result<Host<Lite>, Box<dyn std::error::Error>> {
        Ok(Host::new(Lite, &self.root, self.config.clone())?)
    }

    /// Converts a command-line path into a workspace-relative source path.
    pub fn source_path(&self, arg: &str) -> SourcePath {
        let path = Path::new(arg);
        match path.strip_prefix(&self.root) {
            Ok(relative) if path.is_absolute() => SourcePath::new(relative),
            _ => SourcePath::new(path),
        }
    }
}

/// Walks up from `start` looking for the nearest directory containing
/// `strata.toml`.
pub fn find_workspace_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}
