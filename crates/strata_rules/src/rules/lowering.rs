use async_trait::async_trait;
use std::sync::Arc;

use strata_common::{Fingerprint, SourcePath, StrataResult};
use strata_engine::{Deps, Query, Rule, RuleError, RuleKind};

use super::check::TypeCheck;
use crate::context::RuleContext;
use crate::frontend::Frontend;

/// The lowered representation of a checked module.
pub struct GenerateCore<F: Frontend> {
    ctx: Arc<RuleContext<F>>,
}

impl<F: Frontend> GenerateCore<F> {
    pub(crate) fn new(ctx: Arc<RuleContext<F>>) -> Self {
        Self { ctx }
    }
}

impl<F: Frontend> Query for GenerateCore<F> {
    const KIND: RuleKind = RuleKind::GenerateCore;
    type Key = SourcePath;
    type Value = Arc<F::Core>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(&**value)
    }
}

#[async_trait]
impl<F: Frontend> Rule for GenerateCore<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let checked = deps.get::<TypeCheck<F>>(key.clone()).await?;
        let core = self
            .ctx
            .frontend
            .lower(&checked.module)
            .map_err(RuleError::Input)?;
        Ok(Arc::new(core))
    }
}

/// Bytecode for a file.
pub struct GenerateBytecode<F: Frontend> {
    ctx: Arc<RuleContext<F>>,
}

impl<F: Frontend> GenerateBytecode<F> {
    pub(crate) fn new(ctx: Arc<RuleContext<F>>) -> Self {
        Self { ctx }
    }
}

impl<F: Frontend> Query for GenerateBytecode<F> {
    const KIND: RuleKind = RuleKind::GenerateBytecode;
    type Key = SourcePath;
    type Value = Arc<F::Bytecode>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(&**value)
    }
}

#[async_trait]
impl<F: Frontend> Rule for GenerateBytecode<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let core = deps.get::<GenerateCore<F>>(key.clone()).await?;
        let bytecode = self.ctx.frontend.codegen(&core);
        tracing::debug!(file = %key, "generated bytecode");
        Ok(Arc::new(bytecode))
    }
}
