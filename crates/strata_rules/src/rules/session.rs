//! Compiler sessions for files.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use strata_common::{Fingerprint, Fingerprinter, SourcePath, StrataResult};
use strata_config::resolve_unit;
use strata_diagnostics::Diagnostic;
use strata_engine::{Deps, Query, Rule, RuleError, RuleKind};

use super::imports::{BuildModuleGraph, ReportImportCycles};
use super::input::Configuration;
use super::interface::GenerateInterface;
use crate::codes;
use crate::context::RuleContext;
use crate::frontend::{Frontend, SessionEnv, SessionHandle};

/// The session of the unit a file belongs to.
///
/// The fingerprint is the unit's configuration fingerprint: configuration
/// changes that do not touch the unit leave every dependent alone.
pub struct AcquireSession<F: Frontend> {
    ctx: Arc<RuleContext<F>>,
}

impl<F: Frontend> AcquireSession<F> {
    pub(crate) fn new(ctx: Arc<RuleContext<F>>) -> Self {
        Self { ctx }
    }
}

impl<F: Frontend> Query for AcquireSession<F> {
    const KIND: RuleKind = RuleKind::AcquireSession;
    type Key = SourcePath;
    type Value = SessionHandle<F::Session>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Ok(value.unit.fingerprint)
    }
}

#[async_trait]
impl<F: Frontend> Rule for AcquireSession<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let config = deps.get::<Configuration>(()).await?;
        let unit = Arc::new(resolve_unit(&config, key)?);

        let frontend = self.ctx.frontend.clone();
        let root = self.ctx.vfs.root().to_path_buf();
        let for_build = unit.clone();
        let session = self
            .ctx
            .sessions
            .session_for(unit.fingerprint, move || frontend.load_session(&root, &for_build))
            .await?;
        Ok(SessionHandle { unit, session })
    }
}

/// A file's session together with the interfaces of everything it
/// transitively imports.
///
/// Fails for a file inside an import cycle, and with one diagnostic per
/// imported module whose interface cannot be produced.
pub struct SessionWithDeps<F>(PhantomData<fn() -> F>);

impl<F: Frontend> SessionWithDeps<F> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<F: Frontend> Query for SessionWithDeps<F> {
    const KIND: RuleKind = RuleKind::SessionWithDeps;
    type Key = SourcePath;
    type Value = SessionEnv<F::Session, F::Interface>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        let mut fp = Fingerprinter::new();
        fp.write_fingerprint(value.handle.unit.fingerprint);
        for (path, interface) in value.interfaces.iter() {
            fp.write_str(path.as_str())
                .write_fingerprint(Fingerprint::of(&**interface)?);
        }
        Ok(fp.finish())
    }
}

#[async_trait]
impl<F: Frontend> Rule for SessionWithDeps<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let graph = deps.get::<BuildModuleGraph<F>>(key.clone()).await?;
        let cycles = deps.get::<ReportImportCycles<F>>(key.clone()).await?;
        if !cycles.is_empty() {
            return Err(RuleError::Input(cycles.to_vec()));
        }
        let handle = deps.get::<AcquireSession<F>>(key.clone()).await?;

        let closure = graph.graph.transitive_closure(key);
        let results = deps.fetch_all::<GenerateInterface<F>>(closure.clone()).await?;
        let mut interfaces = BTreeMap::new();
        let mut errors = Vec::new();
        for (path, result) in closure.into_iter().zip(results) {
            match result {
                Ok(interface) => {
                    interfaces.insert(path, interface);
                }
                Err(err) => {
                    tracing::debug!(file = %key, dependency = %path, %err, "dependency has errors");
                    errors.push(
                        Diagnostic::error(
                            key.clone(),
                            codes::DEPENDENCY_ERRORS,
                            format!("imported module `{path}` has errors"),
                        )
                        .with_note(format!("`{key}` cannot be checked until `{path}` is fixed")),
                    );
                }
            }
        }
        if !errors.is_empty() {
            return Err(RuleError::Input(errors));
        }

        Ok(SessionEnv {
            handle,
            interfaces: Arc::new(interfaces),
        })
    }
}
