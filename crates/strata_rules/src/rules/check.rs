use async_trait::async_trait;
use std::sync::Arc;

use strata_common::{Fingerprint, Fingerprinter, SourcePath, StrataResult};
use strata_engine::{Deps, Query, Rule, RuleError, RuleKind};

use super::files::ParseFile;
use super::imports::ResolveImports;
use super::session::SessionWithDeps;
use crate::context::RuleContext;
use crate::frontend::{Checked, Frontend};

/// The type-checked module of a file, with its warnings.
pub struct TypeCheck<F: Frontend> {
    ctx: Arc<RuleContext<F>>,
}

impl<F: Frontend> TypeCheck<F> {
    pub(crate) fn new(ctx: Arc<RuleContext<F>>) -> Self {
        Self { ctx }
    }
}

impl<F: Frontend> Query for TypeCheck<F> {
    const KIND: RuleKind = RuleKind::TypeCheck;
    type Key = SourcePath;
    type Value = Arc<Checked<F::Module>>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Ok(Fingerprinter::new()
            .write_fingerprint(Fingerprint::of(&value.module)?)
            .write_fingerprint(Fingerprint::of(&value.warnings)?)
            .finish())
    }
}

#[async_trait]
impl<F: Frontend> Rule for TypeCheck<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let env = deps.get::<SessionWithDeps<F>>(key.clone()).await?;
        let parsed = deps.get::<ParseFile<F>>(key.clone()).await?;
        let imports = deps.get::<ResolveImports<F>>(key.clone()).await?;
        let checked = self
            .ctx
            .frontend
            .typecheck(&env, &parsed, &imports)
            .map_err(RuleError::Input)?;
        tracing::debug!(file = %key, warnings = checked.warnings.len(), "type checked");
        Ok(Arc::new(checked))
    }
}
