//! Unit resolution: which packages a file is compiled against.

use serde::Serialize;
use std::collections::BTreeMap;
use strata_common::{Fingerprint, SourcePath, StrataResult};

use crate::types::{PackageSpec, WorkspaceConfig};

/// Name of the implicit unit covering files outside every declared unit.
pub const WORKSPACE_UNIT: &str = "<workspace>";

/// The build configuration that applies to one file.
///
/// Files in the same unit share a compiler session; the session is keyed by
/// [`fingerprint`](Self::fingerprint), so only a change to the unit's own
/// package set forces a rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedUnit {
    /// The unit name.
    pub name: String,
    /// The unit's root directory.
    pub root: SourcePath,
    /// The packages visible to the unit.
    pub packages: BTreeMap<String, PackageSpec>,
    /// Fingerprint over name, root and packages.
    #[serde(skip)]
    pub fingerprint: Fingerprint,
}

/// Resolves the unit enclosing `path`.
///
/// The declared unit with the longest matching root wins; files outside all
/// units belong to the workspace unit, which sees every package.
pub fn resolve_unit(config: &WorkspaceConfig, path: &SourcePath) -> StrataResult<ResolvedUnit> {
    let best = config
        .units
        .iter()
        .map(|unit| (unit, SourcePath::new(&unit.root)))
        .filter(|(_, root)| path.starts_with(root))
        .max_by_key(|(_, root)| root.as_str().len());

    let (name, root, packages) = match best {
        Some((unit, root)) => {
            let packages = unit
                .packages
                .iter()
                .filter_map(|name| {
                    config
                        .packages
                        .get(name)
                        .map(|spec| (name.clone(), spec.clone()))
                })
                .collect();
            (unit.name.clone(), root, packages)
        }
        None => (
            WORKSPACE_UNIT.to_string(),
            SourcePath::new(""),
            config.packages.clone(),
        ),
    };

    let mut unit = ResolvedUnit {
        name,
        root,
        packages,
        fingerprint: Fingerprint::EMPTY,
    };
    unit.fingerprint = Fingerprint::of(&unit)?;
    Ok(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::load_config_from_str;

    fn config() -> WorkspaceConfig {
        load_config_from_str(
            r#"
[workspace]
name = "demo"

[packages.core]
path = "vendor/core"

[packages.json]
version = "1.2"

[[units]]
name = "tests"
root = "tests"
packages = ["core"]

[[units]]
name = "integration"
root = "tests/integration"
packages = ["core", "json"]
"#,
        )
        .unwrap()
    }

    #[test]
    fn file_outside_units_sees_all_packages() {
        let unit = resolve_unit(&config(), &SourcePath::new("src/a.src")).unwrap();
        assert_eq!(unit.name, WORKSPACE_UNIT);
        assert_eq!(unit.packages.len(), 2);
    }

    #[test]
    fn longest_root_wins() {
        let cfg = config();
        let unit = resolve_unit(&cfg, &SourcePath::new("tests/integration/x.src")).unwrap();
        assert_eq!(unit.name, "integration");
        let unit = resolve_unit(&cfg, &SourcePath::new("tests/unit.src")).unwrap();
        assert_eq!(unit.name, "tests");
        assert_eq!(unit.packages.keys().collect::<Vec<_>>(), vec!["core"]);
    }

    #[test]
    fn same_unit_same_fingerprint() {
        let cfg = config();
        let a = resolve_unit(&cfg, &SourcePath::new("src/a.src")).unwrap();
        let b = resolve_unit(&cfg, &SourcePath::new("src/deep/b.src")).unwrap();
        assert_eq!(a.fingerprint, b.fingerprint);
    }

    #[test]
    fn unrelated_change_keeps_unit_fingerprint() {
        let cfg = config();
        let before = resolve_unit(&cfg, &SourcePath::new("tests/unit.src")).unwrap();
        let mut changed = cfg.clone();
        changed.packages.insert(
            "extra".to_string(),
            PackageSpec::Registry {
                version: "0.1".to_string(),
            },
        );
        let after = resolve_unit(&changed, &SourcePath::new("tests/unit.src")).unwrap();
        assert_eq!(before.fingerprint, after.fingerprint);

        let workspace_before = resolve_unit(&cfg, &SourcePath::new("src/a.src")).unwrap();
        let workspace_after = resolve_unit(&changed, &SourcePath::new("src/a.src")).unwrap();
        assert_ne!(workspace_before.fingerprint, workspace_after.fingerprint);
    }
}
