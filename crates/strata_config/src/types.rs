//! Configuration types deserialized from `strata.toml`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The top-level workspace configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Workspace metadata and source layout.
    pub workspace: WorkspaceMeta,
    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Packages available to compiler sessions, by name.
    #[serde(default)]
    pub packages: BTreeMap<String, PackageSpec>,
    /// Build units with their own package sets. Files outside every unit
    /// belong to the implicit workspace unit, which sees all packages.
    #[serde(default)]
    pub units: Vec<UnitConfig>,
    /// Default client settings until the editor sends its own.
    #[serde(default)]
    pub client: ClientSettings,
}

/// Workspace name and where sources live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceMeta {
    /// The workspace name.
    pub name: String,
    /// Source directories relative to the workspace root.
    #[serde(default = "default_roots")]
    pub roots: Vec<String>,
    /// File extension of source files, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_roots() -> Vec<String> {
    vec![".".to_string()]
}

fn default_extension() -> String {
    "src".to_string()
}

/// Engine tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Worker threads for rule evaluation. `None` uses the available
    /// parallelism of the machine.
    #[serde(default)]
    pub workers: Option<usize>,
    /// Directory for persisted interface files, relative to the root.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: String,
    /// Whether module interfaces are persisted across restarts.
    #[serde(default)]
    pub persist_interfaces: bool,
}

fn default_cache_dir() -> String {
    ".strata-cache".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: None,
            cache_dir: default_cache_dir(),
            persist_interfaces: false,
        }
    }
}

/// Where a package's interfaces come from.
///
/// Uses serde's untagged enum to distinguish path and registry packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PackageSpec {
    /// A directory of interface declarations on disk.
    Path {
        /// The directory, relative to the workspace root.
        path: String,
    },
    /// A prebuilt package identified by version.
    Registry {
        /// The version requirement string.
        version: String,
    },
}

/// A build unit: a source subtree compiled against a subset of packages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// The unit name.
    pub name: String,
    /// The unit's root directory, relative to the workspace root.
    pub root: String,
    /// Names of the packages this unit may use.
    #[serde(default)]
    pub packages: Vec<String>,
}

/// Settings the editor client controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Upper bound on diagnostics reported per file.
    #[serde(default = "default_max_diagnostics")]
    pub max_diagnostics_per_file: usize,
    /// Whether warnings are reported at all.
    #[serde(default = "default_true")]
    pub report_warnings: bool,
}

fn default_max_diagnostics() -> usize {
    100
}

fn default_true() -> bool {
    true
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            max_diagnostics_per_file: default_max_diagnostics(),
            report_warnings: true,
        }
    }
}

impl WorkspaceConfig {
    /// A configuration with the given name and every other field defaulted.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            workspace: WorkspaceMeta {
                name: name.into(),
                roots: default_roots(),
                extension: default_extension(),
            },
            engine: EngineConfig::default(),
            packages: BTreeMap::new(),
            units: Vec::new(),
            client: ClientSettings::default(),
        }
    }

    /// The number of rule-evaluation workers to run.
    pub fn worker_count(&self) -> usize {
        self.engine.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_uses_defaults() {
        let config = WorkspaceConfig::named("demo");
        assert_eq!(config.workspace.roots, vec!["."]);
        assert_eq!(config.workspace.extension, "src");
        assert_eq!(config.engine.cache_dir, ".strata-cache");
        assert!(!config.engine.persist_interfaces);
        assert_eq!(config.client.max_diagnostics_per_file, 100);
    }

    #[test]
    fn explicit_workers_win() {
        let mut config = WorkspaceConfig::named("demo");
        config.engine.workers = Some(3);
        assert_eq!(config.worker_count(), 3);
        config.engine.workers = None;
        assert!(config.worker_count() >= 1);
    }
}
