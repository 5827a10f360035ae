//! Module interfaces, reused across restarts when persistence is enabled.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;

use strata_cache::InterfaceRecord;
use strata_common::{Fingerprint, Fingerprinter, SourcePath, StrataResult};
use strata_engine::{Deps, Query, Rule, RuleError, RuleKind};

use super::check::TypeCheck;
use super::files::ModSummary;
use super::imports::{BuildModuleGraph, ReportImportCycles};
use super::session::AcquireSession;
use crate::context::RuleContext;
use crate::frontend::{Frontend, InterfaceKey, InterfaceLookup};

/// Looks up the persisted interface of a file.
///
/// A persisted interface is a hit only if it was built from the same bytes,
/// the same unit configuration and the same interfaces of every transitive
/// import. Files in an import cycle are never persisted.
pub struct LoadPersistedInterface<F: Frontend> {
    ctx: Arc<RuleContext<F>>,
}

impl<F: Frontend> LoadPersistedInterface<F> {
    pub(crate) fn new(ctx: Arc<RuleContext<F>>) -> Self {
        Self { ctx }
    }
}

impl<F: Frontend> Query for LoadPersistedInterface<F> {
    const KIND: RuleKind = RuleKind::LoadPersistedInterface;
    type Key = SourcePath;
    type Value = InterfaceLookup<F::Interface>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        let mut fp = Fingerprinter::new();
        fp.write_fingerprint(Fingerprint::of(&value.key)?);
        if let Some(hit) = &value.hit {
            fp.write_fingerprint(Fingerprint::of(&**hit)?);
        }
        Ok(fp.finish())
    }
}

#[async_trait]
impl<F: Frontend> Rule for LoadPersistedInterface<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let Some(store) = &self.ctx.store else {
            return Ok(InterfaceLookup::disabled());
        };
        let graph = deps.get::<BuildModuleGraph<F>>(key.clone()).await?;
        if !deps.get::<ReportImportCycles<F>>(key.clone()).await?.is_empty() {
            return Ok(InterfaceLookup::disabled());
        }
        let summary = deps.get::<ModSummary>(key.clone()).await?;
        if summary.text.is_err() {
            return Ok(InterfaceLookup::disabled());
        }
        let handle = deps.get::<AcquireSession<F>>(key.clone()).await?;

        let closure = graph.graph.transitive_closure(key);
        let results = deps.fetch_all::<GenerateInterface<F>>(closure.clone()).await?;
        let mut dependencies = BTreeMap::new();
        for (path, result) in closure.into_iter().zip(results) {
            match result {
                Ok(interface) => {
                    dependencies.insert(path, Fingerprint::of(&*interface)?);
                }
                Err(_) => return Ok(InterfaceLookup::disabled()),
            }
        }
        let current = InterfaceKey {
            source: summary.content,
            session: handle.unit.fingerprint,
            dependencies,
        };

        let hit = store
            .load::<F::Interface>(key)
            .filter(|persisted| {
                let record = &persisted.record;
                record.source == current.source
                    && record.session == current.session
                    && record.dependencies == current.dependencies
                    && Fingerprint::of(&persisted.value).ok() == Some(record.interface)
            })
            .map(|persisted| Arc::new(persisted.value));
        tracing::debug!(file = %key, hit = hit.is_some(), "persisted interface lookup");
        Ok(InterfaceLookup {
            key: Some(current),
            hit,
        })
    }
}

/// The interface of a module: the persisted one when it is still valid,
/// otherwise extracted from the type-checked module and persisted.
pub struct GenerateInterface<F: Frontend> {
    ctx: Arc<RuleContext<F>>,
}

impl<F: Frontend> GenerateInterface<F> {
    pub(crate) fn new(ctx: Arc<RuleContext<F>>) -> Self {
        Self { ctx }
    }
}

impl<F: Frontend> Query for GenerateInterface<F> {
    const KIND: RuleKind = RuleKind::GenerateInterface;
    type Key = SourcePath;
    type Value = Arc<F::Interface>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(&**value)
    }
}

#[async_trait]
impl<F: Frontend> Rule for GenerateInterface<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let lookup = deps.get::<LoadPersistedInterface<F>>(key.clone()).await?;
        if let Some(hit) = lookup.hit {
            tracing::debug!(file = %key, "reusing persisted interface");
            return Ok(hit);
        }

        let checked = deps.get::<TypeCheck<F>>(key.clone()).await?;
        let interface = Arc::new(self.ctx.frontend.interface(&checked.module));

        if let (Some(store), Some(current)) = (&self.ctx.store, lookup.key) {
            let record = InterfaceRecord {
                source: current.source,
                session: current.session,
                dependencies: current.dependencies,
                interface: Fingerprint::of(&*interface)?,
                artifact_key: String::new(),
            };
            if let Err(err) = store.store(key.clone(), record, &*interface) {
                tracing::warn!(file = %key, %err, "cannot persist interface");
            }
        }
        Ok(interface)
    }
}
