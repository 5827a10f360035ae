//! Configuration file loading and validation.

use std::collections::BTreeSet;
use std::path::Path;

use crate::error::ConfigError;
use crate::types::WorkspaceConfig;

/// Name of the configuration file at the workspace root.
pub const CONFIG_FILE: &str = "strata.toml";

/// Loads and validates `<workspace_dir>/strata.toml`.
pub fn load_config(workspace_dir: &Path) -> Result<WorkspaceConfig, ConfigError> {
    let content = std::fs::read_to_string(workspace_dir.join(CONFIG_FILE))?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
pub fn load_config_from_str(content: &str) -> Result<WorkspaceConfig, ConfigError> {
    let config: WorkspaceConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks required fields and cross-references between units and packages.
fn validate_config(config: &WorkspaceConfig) -> Result<(), ConfigError> {
    if config.workspace.name.is_empty() {
        return Err(ConfigError::MissingField("workspace.name".to_string()));
    }
    if config.workspace.roots.is_empty() {
        return Err(ConfigError::MissingField("workspace.roots".to_string()));
    }
    if config.workspace.extension.is_empty() || config.workspace.extension.starts_with('.') {
        return Err(ConfigError::ValidationError(
            "workspace.extension must be a bare extension such as \"src\"".to_string(),
        ));
    }
    if config.engine.workers == Some(0) {
        return Err(ConfigError::ValidationError(
            "engine.workers must be at least 1".to_string(),
        ));
    }

    let mut unit_names = BTreeSet::new();
    for unit in &config.units {
        if !unit_names.insert(unit.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate unit '{}'",
                unit.name
            )));
        }
        for package in &unit.packages {
            if !config.packages.contains_key(package) {
                return Err(ConfigError::UnknownPackage {
                    unit: unit.name.clone(),
                    package: package.clone(),
                });
            }
        }
    }
    Ok(())
}
