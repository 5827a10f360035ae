//! Name resolution for lite modules and the sessions it runs against.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use strata_common::SourcePath;
use strata_config::{PackageSpec, ResolvedUnit};
use strata_diagnostics::Diagnostic;
use strata_source::{SourceFile, Span};

use super::codes;
use super::syntax::{self, Item, LiteAst, LiteType};
use crate::codes::UNUSED_IMPORT;
use crate::frontend::{Checked, ResolvedImports, SessionEnv};

/// Definitions visible to every file of a unit, loaded from its path
/// packages.
#[derive(Debug, Default)]
pub struct LiteSession {
    /// The unit this session was built for.
    pub unit: String,
    /// Package definitions by name. The first package defining a name wins.
    pub prelude: BTreeMap<String, LiteType>,
    /// Registry packages and their versions. They contribute no names.
    pub registry: BTreeMap<String, String>,
}

/// What importers see of a module: its definitions, without positions.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct LiteInterface {
    /// Definitions by name.
    pub defs: BTreeMap<String, LiteType>,
}

/// Where a used name was found.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub enum Binding {
    /// Defined in the same file.
    Local,
    /// Defined by an imported module.
    Imported(SourcePath),
    /// Provided by a package.
    Prelude,
}

/// A definition of a checked module.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct CheckedDef {
    /// The name.
    pub name: String,
    /// Its type.
    pub ty: LiteType,
    /// Where it is defined.
    pub span: Span,
}

/// A resolved use.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct CheckedUse {
    /// The name.
    pub name: String,
    /// The type of the definition it refers to.
    pub ty: LiteType,
    /// Where the definition lives.
    pub binding: Binding,
    /// Where the use is written.
    pub span: Span,
}

/// A type-checked lite module.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct LiteModule {
    /// Definitions in source order.
    pub defs: Vec<CheckedDef>,
    /// Uses in source order.
    pub uses: Vec<CheckedUse>,
}

/// Builds the session of `unit`, reading the definitions of every path
/// package under `root`.
pub fn load_session(root: &Path, unit: &ResolvedUnit) -> Result<LiteSession, String> {
    let mut session = LiteSession {
        unit: unit.name.clone(),
        ..LiteSession::default()
    };
    for (name, spec) in &unit.packages {
        match spec {
            PackageSpec::Path { path } => {
                let dir = root.join(path);
                if !dir.is_dir() {
                    return Err(format!("package `{name}` not found at `{path}`"));
                }
                for (file, ty) in package_defs(name, &dir)? {
                    session.prelude.entry(file).or_insert(ty);
                }
            }
            PackageSpec::Registry { version } => {
                session.registry.insert(name.clone(), version.clone());
            }
        }
    }
    tracing::debug!(
        unit = %unit.name,
        names = session.prelude.len(),
        "loaded lite session"
    );
    Ok(session)
}

/// Reads the definitions of every `.src` file in a package directory, in
/// file name order.
fn package_defs(package: &str, dir: &Path) -> Result<Vec<(String, LiteType)>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("cannot read package `{package}`: {e}"))?;
    let mut files: Vec<_> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "src"))
        .collect();
    files.sort();

    let mut defs = Vec::new();
    for path in files {
        let text = std::fs::read_to_string(&path)
            .map_err(|e| format!("cannot read `{}`: {e}", path.display()))?;
        let file = SourceFile::new(SourcePath::new(&path), text.into());
        let ast = syntax::parse(&file)
            .map_err(|_| format!("package `{package}` has syntax errors in `{}`", path.display()))?;
        for item in ast.items {
            if let Item::Def { name, ty, .. } = item {
                defs.push((name, ty));
            }
        }
    }
    Ok(defs)
}

/// Checks a file: no name defined twice, every use resolvable.
///
/// Names resolve to the file's own definitions, then to the modules it
/// imports directly in import order, then to the prelude. An import nothing
/// is used from is a warning.
pub fn typecheck(
    env: &SessionEnv<LiteSession, LiteInterface>,
    path: &SourcePath,
    ast: &LiteAst,
    imports: &ResolvedImports,
) -> Result<Checked<LiteModule>, Vec<Diagnostic>> {
    let mut module = LiteModule::default();
    let mut errors = Vec::new();
    let mut local: BTreeMap<&str, (LiteType, Span)> = BTreeMap::new();

    for item in &ast.items {
        if let Item::Def { name, ty, span } = item {
            if let Some((_, first)) = local.get(name.as_str()) {
                errors.push(
                    Diagnostic::error(
                        path.clone(),
                        codes::DUPLICATE_DEF,
                        format!("`{name}` is defined more than once"),
                    )
                    .at(*span)
                    .with_note(format!("first defined at byte {}", first.start)),
                );
                continue;
            }
            local.insert(name.as_str(), (*ty, *span));
            module.defs.push(CheckedDef {
                name: name.clone(),
                ty: *ty,
                span: *span,
            });
        }
    }

    let imported = imports.paths();
    let mut used_imports = BTreeSet::new();
    for item in &ast.items {
        let Item::Use { name, span } = item else {
            continue;
        };
        let found = if let Some((ty, _)) = local.get(name.as_str()) {
            Some((*ty, Binding::Local))
        } else if let Some((dep, ty)) = imported.iter().find_map(|dep| {
            env.interface(dep)
                .and_then(|i| i.defs.get(name))
                .map(|ty| (dep, *ty))
        }) {
            used_imports.insert(dep.clone());
            Some((ty, Binding::Imported(dep.clone())))
        } else {
            env.session()
                .prelude
                .get(name)
                .map(|ty| (*ty, Binding::Prelude))
        };
        match found {
            Some((ty, binding)) => module.uses.push(CheckedUse {
                name: name.clone(),
                ty,
                binding,
                span: *span,
            }),
            None => errors.push(
                Diagnostic::error(
                    path.clone(),
                    codes::UNKNOWN_NAME,
                    format!("cannot find `{name}`"),
                )
                .at(*span),
            ),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    let mut warnings = Vec::new();
    let mut reported = BTreeSet::new();
    for import in &imports.resolved {
        if !used_imports.contains(&import.path) && reported.insert(&import.path) {
            warnings.push(
                Diagnostic::warning(
                    path.clone(),
                    UNUSED_IMPORT,
                    format!("nothing from `{}` is used", import.target),
                )
                .at(import.span),
            );
        }
    }
    Ok(Checked { module, warnings })
}

/// The interface of a checked module.
pub fn interface(module: &LiteModule) -> LiteInterface {
    LiteInterface {
        defs: module
            .defs
            .iter()
            .map(|def| (def.name.clone(), def.ty))
            .collect(),
    }
}

/// Wraps a session for tests that check a file without the engine.
#[cfg(test)]
pub(crate) fn test_env(
    session: LiteSession,
    interfaces: Vec<(SourcePath, LiteInterface)>,
) -> SessionEnv<LiteSession, LiteInterface> {
    use crate::frontend::SessionHandle;
    use std::sync::Arc;
    use strata_common::Fingerprint;

    SessionEnv {
        handle: SessionHandle {
            unit: Arc::new(ResolvedUnit {
                name: session.unit.clone(),
                root: SourcePath::new(""),
                packages: BTreeMap::new(),
                fingerprint: Fingerprint::EMPTY,
            }),
            session: Arc::new(session),
        },
        interfaces: Arc::new(
            interfaces
                .into_iter()
                .map(|(path, i)| (path, Arc::new(i)))
                .collect(),
        ),
    }
}
