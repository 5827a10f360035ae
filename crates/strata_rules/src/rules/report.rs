//! Rules feeding the editor: interest, client settings and the diagnostics
//! published for each file.

use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use strata_common::{Fingerprint, SourcePath, StrataResult};
use strata_config::ClientSettings as Settings;
use strata_diagnostics::{Diagnostic, Severity};
use strata_engine::{Deps, Query, Rule, RuleError, RuleId, RuleKind};

use super::check::TypeCheck;
use super::files::ParseFile;
use super::imports::{ReportImportCycles, ResolveImports};
use super::input::{ClientSettings, Configuration, FilesOfInterest};
use crate::codes;
use crate::frontend::Frontend;

/// Whether a file is among the files of interest.
pub struct IsFileOfInterest;

impl Query for IsFileOfInterest {
    const KIND: RuleKind = RuleKind::IsFileOfInterest;
    type Key = SourcePath;
    type Value = bool;

    fn fingerprint(value: &bool) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl Rule for IsFileOfInterest {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<bool, RuleError> {
        Ok(deps.get::<FilesOfInterest>(()).await?.contains(key))
    }
}

/// The client settings in effect: what the client sent, or the workspace
/// defaults until it sends anything.
pub struct ReadClientSettings;

impl Query for ReadClientSettings {
    const KIND: RuleKind = RuleKind::ReadClientSettings;
    type Key = ();
    type Value = Settings;

    fn fingerprint(value: &Settings) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl Rule for ReadClientSettings {
    async fn compute(&self, _: &(), deps: &Deps) -> Result<Settings, RuleError> {
        match deps.get::<ClientSettings>(()).await? {
            Some(settings) => Ok(settings),
            None => Ok(deps.get::<Configuration>(()).await?.client.clone()),
        }
    }
}

/// Everything to report for one file, sorted by position.
///
/// A file whose pipeline failed always carries at least one error: when the
/// failure left no diagnostic of its own on this file, one naming the failed
/// dependency is added. The per-file cap drops warnings before errors and
/// never drops the last error.
pub struct FileDiagnostics<F>(PhantomData<fn() -> F>);

impl<F: Frontend> FileDiagnostics<F> {
    pub(crate) fn new() -> Self {
        Self(PhantomData)
    }
}

impl<F: Frontend> Query for FileDiagnostics<F> {
    const KIND: RuleKind = RuleKind::FileDiagnostics;
    type Key = SourcePath;
    type Value = Arc<Vec<Diagnostic>>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(&**value)
    }
}

#[async_trait]
impl<F: Frontend> Rule for FileDiagnostics<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let mut diags = Vec::new();
        let mut failure = None;

        match deps.get::<ParseFile<F>>(key.clone()).await {
            Ok(_) => {
                let imports = deps.get::<ResolveImports<F>>(key.clone()).await?;
                for import in &imports.unresolved {
                    diags.push(
                        Diagnostic::error(
                            key.clone(),
                            codes::UNRESOLVED_IMPORT,
                            format!("cannot find `{}`", import.target),
                        )
                        .at(import.span),
                    );
                }
                diags.extend(
                    deps.get::<ReportImportCycles<F>>(key.clone())
                        .await?
                        .iter()
                        .cloned(),
                );
                match deps.get::<TypeCheck<F>>(key.clone()).await {
                    Ok(checked) => diags.extend(checked.warnings.iter().cloned()),
                    Err(err) => {
                        explain(key, &err, &mut diags)?;
                        failure = Some(err);
                    }
                }
            }
            Err(err) => {
                explain(key, &err, &mut diags)?;
                failure = Some(err);
            }
        }

        if let Some(err) = &failure {
            if !diags.iter().any(Diagnostic::is_error) {
                let culprit = deepest_failure(err)
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| key.to_string());
                diags.push(
                    Diagnostic::error(
                        key.clone(),
                        codes::DEPENDENCY_ERRORS,
                        format!("`{key}` could not be checked"),
                    )
                    .with_note(format!("{culprit} failed: {}", err.root_cause())),
                );
            }
        }

        let interesting = deps.get::<IsFileOfInterest>(key.clone()).await?;
        let settings = deps.get::<ReadClientSettings>(()).await?;
        if !(interesting && settings.report_warnings) {
            diags.retain(|d| d.severity != Severity::Warning);
        }

        diags.sort();
        diags.dedup();
        diags.sort_by_key(|d| d.span.map(|s| s.start));
        let mut cap = settings.max_diagnostics_per_file;
        if diags.iter().any(Diagnostic::is_error) {
            cap = cap.max(1);
        }
        if diags.len() > cap {
            // stable, so each group stays in position order
            diags.sort_by_key(|d| !d.is_error());
            diags.truncate(cap);
            diags.sort_by_key(|d| d.span.map(|s| s.start));
        }
        tracing::debug!(file = %key, count = diags.len(), "collected diagnostics");
        Ok(Arc::new(diags))
    }
}

/// Turns the root cause of a failure into diagnostics on `file`.
/// Cancellation is passed on rather than reported.
fn explain(file: &SourcePath, err: &RuleError, out: &mut Vec<Diagnostic>) -> Result<(), RuleError> {
    match err.root_cause() {
        RuleError::Input(diags) => {
            out.extend(diags.iter().filter(|d| &d.path == file).cloned());
        }
        RuleError::Session(reason) => out.push(
            Diagnostic::error(
                file.clone(),
                codes::SESSION_FAILED,
                format!("cannot load the compiler session: {reason}"),
            )
            .with_note("fix the workspace configuration to check this file"),
        ),
        RuleError::Cycle(id) => out.push(Diagnostic::error(
            file.clone(),
            codes::RULE_CYCLE,
            format!("internal error: rule cycle at {id}"),
        )),
        RuleError::Internal(inner) => {
            tracing::error!(file = %file, %inner, "internal error while checking file");
            out.push(Diagnostic::error(
                file.clone(),
                codes::INTERNAL,
                format!("internal error: {inner}"),
            ));
        }
        RuleError::Cancelled => return Err(RuleError::Cancelled),
        RuleError::DependencyFailed { .. } => {}
    }
    Ok(())
}

/// The innermost dependency named in a chain of failures.
fn deepest_failure(err: &RuleError) -> Option<&RuleId> {
    match err {
        RuleError::DependencyFailed { dependency, cause } => {
            deepest_failure(cause).or(Some(dependency))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::InternalError;

    fn a() -> SourcePath {
        SourcePath::new("a.src")
    }

    fn failed(kind: RuleKind, cause: RuleError) -> RuleError {
        RuleError::DependencyFailed {
            dependency: RuleId::new(kind, a()),
            cause: Box::new(cause),
        }
    }

    #[test]
    fn input_diagnostics_for_other_files_are_dropped() {
        let mine = Diagnostic::error(a(), codes::FILE_NOT_FOUND, "mine");
        let theirs = Diagnostic::error(SourcePath::new("b.src"), codes::FILE_NOT_FOUND, "theirs");
        let err = failed(RuleKind::ParseFile, RuleError::Input(vec![mine.clone(), theirs]));
        let mut out = Vec::new();
        explain(&a(), &err, &mut out).unwrap();
        assert_eq!(out, vec![mine]);
    }

    #[test]
    fn session_failure_becomes_diagnostic() {
        let err = failed(
            RuleKind::SessionWithDeps,
            failed(RuleKind::AcquireSession, RuleError::Session("package `core` not found".into())),
        );
        let mut out = Vec::new();
        explain(&a(), &err, &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].code, codes::SESSION_FAILED);
        assert!(out[0].message.contains("package `core` not found"));
    }

    #[test]
    fn internal_error_is_reported() {
        let err = RuleError::Internal(InternalError::new("broken invariant"));
        let mut out = Vec::new();
        explain(&a(), &err, &mut out).unwrap();
        assert_eq!(out[0].code, codes::INTERNAL);
    }

    #[test]
    fn cancellation_propagates() {
        let err = failed(RuleKind::TypeCheck, RuleError::Cancelled);
        let mut out = Vec::new();
        assert_eq!(explain(&a(), &err, &mut out), Err(RuleError::Cancelled));
        assert!(out.is_empty());
    }

    #[test]
    fn deepest_failure_follows_chain() {
        let err = failed(
            RuleKind::TypeCheck,
            failed(RuleKind::AcquireSession, RuleError::Session("x".into())),
        );
        assert_eq!(
            deepest_failure(&err),
            Some(&RuleId::new(RuleKind::AcquireSession, a()))
        );
        assert_eq!(deepest_failure(&RuleError::Session("x".into())), None);
    }
}
