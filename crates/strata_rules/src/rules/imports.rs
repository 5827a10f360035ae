//! Import resolution, the module graph and import cycle reporting.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::sync::Arc;

use strata_common::{Fingerprint, Fingerprinter, SourcePath, StrataResult};
use strata_diagnostics::Diagnostic;
use strata_engine::{Deps, ModuleGraph, Query, Rule, RuleError, RuleKind};

use super::files::{FileExists, ParseFile};
use super::input::Configuration;
use crate::codes;
use crate::context::RuleContext;
use crate::frontend::{Frontend, ImportGraph, ResolvedImport, ResolvedImports};

/// Where an import of `target` written in `file` may point, in order of
/// preference: next to the importing file, then under each source root.
fn candidates(file: &SourcePath, target: &str, roots: &[String]) -> Vec<SourcePath> {
    let mut candidates = vec![file.sibling(target)];
    for root in roots {
        let candidate = SourcePath::new(format!("{root}/{target}"));
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// A file's imports, each resolved to an existing file or reported as
/// unresolved. Fails if the file cannot be parsed.
pub struct ResolveImports<F: Frontend> {
    ctx: Arc<RuleContext<F>>,
}

impl<F: Frontend> ResolveImports<F> {
    pub(crate) fn new(ctx: Arc<RuleContext<F>>) -> Self {
        Self { ctx }
    }
}

impl<F: Frontend> Query for ResolveImports<F> {
    const KIND: RuleKind = RuleKind::ResolveImports;
    type Key = SourcePath;
    type Value = ResolvedImports;

    fn fingerprint(value: &ResolvedImports) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl<F: Frontend> Rule for ResolveImports<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<ResolvedImports, RuleError> {
        let parsed = deps.get::<ParseFile<F>>(key.clone()).await?;
        let config = deps.get::<Configuration>(()).await?;

        let mut imports = ResolvedImports::default();
        for decl in self.ctx.frontend.imports(&parsed.ast) {
            let mut found = None;
            for candidate in candidates(key, &decl.target, &config.workspace.roots) {
                if deps.get::<FileExists>(candidate.clone()).await? {
                    found = Some(candidate);
                    break;
                }
            }
            match found {
                Some(path) => imports.resolved.push(ResolvedImport {
                    target: decl.target,
                    path,
                    span: decl.span,
                }),
                None => imports.unresolved.push(decl),
            }
        }
        Ok(imports)
    }
}

/// The import graph reachable from a file, built breadth-first with each
/// layer resolved in parallel.
///
/// Files that cannot be read or parsed are kept as nodes without edges and
/// listed as broken, so one bad file does not hide the rest of the graph.
pub struct BuildModuleGraph<F>(PhantomData<fn() -> F>);

impl<F: Frontend> BuildModuleGraph<F> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<F: Frontend> Query for BuildModuleGraph<F> {
    const KIND: RuleKind = RuleKind::BuildModuleGraph;
    type Key = SourcePath;
    type Value = ImportGraph;

    fn fingerprint(value: &ImportGraph) -> StrataResult<Fingerprint> {
        let mut fp = Fingerprinter::new();
        fp.write_fingerprint(value.graph.fingerprint()?);
        for file in &value.broken {
            fp.write_str(file.as_str());
        }
        Ok(fp.finish())
    }
}

#[async_trait]
impl<F: Frontend> Rule for BuildModuleGraph<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<ImportGraph, RuleError> {
        let mut seen = BTreeSet::from([key.clone()]);
        let mut frontier = vec![key.clone()];
        let mut edges = Vec::new();
        let mut broken = BTreeSet::new();

        while !frontier.is_empty() {
            let results = deps.fetch_all::<ResolveImports<F>>(frontier.clone()).await?;
            let mut next = Vec::new();
            for (file, result) in frontier.into_iter().zip(results) {
                match result {
                    Ok(imports) => {
                        let paths = imports.paths();
                        for path in &paths {
                            if seen.insert(path.clone()) {
                                next.push(path.clone());
                            }
                        }
                        edges.push((file, paths));
                    }
                    Err(err) => {
                        tracing::debug!(%file, %err, "imports unavailable");
                        broken.insert(file.clone());
                        edges.push((file, Vec::new()));
                    }
                }
            }
            frontier = next;
        }

        Ok(ImportGraph {
            graph: Arc::new(ModuleGraph::from_edges(edges)),
            broken,
        })
    }
}

/// The import cycle diagnostic of a file, empty when the file is not part
/// of a cycle. Files merely importing a cycle get nothing here.
pub struct ReportImportCycles<F>(PhantomData<fn() -> F>);

impl<F: Frontend> ReportImportCycles<F> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<F: Frontend> Query for ReportImportCycles<F> {
    const KIND: RuleKind = RuleKind::ReportImportCycles;
    type Key = SourcePath;
    type Value = Arc<Vec<Diagnostic>>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(&**value)
    }
}

#[async_trait]
impl<F: Frontend> Rule for ReportImportCycles<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let graph = deps.get::<BuildModuleGraph<F>>(key.clone()).await?;
        let Some(cycle) = graph.graph.cycle_containing(key) else {
            return Ok(Arc::default());
        };
        let imports = deps.get::<ResolveImports<F>>(key.clone()).await?;

        let members: Vec<&str> = cycle.iter().map(SourcePath::as_str).collect();
        let mut diag = Diagnostic::error(
            key.clone(),
            codes::IMPORT_CYCLE,
            format!("`{key}` is part of an import cycle"),
        )
        .with_note(format!("the cycle contains {}", members.join(", ")));
        if let Some(import) = imports.resolved.iter().find(|i| cycle.contains(&i.path)) {
            diag = diag.at(import.span);
        }
        tracing::debug!(file = %key, size = cycle.len(), "import cycle");
        Ok(Arc::new(vec![diag]))
    }
}
