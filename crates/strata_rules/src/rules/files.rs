//! Per-file rules over the raw text.

use async_trait::async_trait;
use std::sync::Arc;

use strata_common::{Fingerprint, Fingerprinter, SourcePath, StrataResult};
use strata_diagnostics::Diagnostic;
use strata_engine::{Deps, Query, Rule, RuleError, RuleKind};
use strata_source::{ReadError, SourceFile};

use super::input::SourceText;
use crate::codes;
use crate::context::RuleContext;
use crate::frontend::{FileSummary, Frontend, ParsedFile};

/// The text of a file with a fingerprint over its bytes.
///
/// Everything downstream reads files through this rule, so a change that
/// only touches the modification time stops here.
pub struct ModSummary;

impl Query for ModSummary {
    const KIND: RuleKind = RuleKind::ModSummary;
    type Key = SourcePath;
    type Value = FileSummary;

    fn fingerprint(value: &FileSummary) -> StrataResult<Fingerprint> {
        Ok(value.content)
    }
}

#[async_trait]
impl Rule for ModSummary {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<FileSummary, RuleError> {
        let contents = deps.get::<SourceText>(key.clone()).await?;
        let summary = match contents {
            Ok(contents) => FileSummary {
                content: Fingerprinter::new()
                    .write(&[1])
                    .write(contents.text.as_bytes())
                    .finish(),
                text: Ok(contents.text),
            },
            Err(ReadError::NotFound) => FileSummary {
                text: Err(ReadError::NotFound),
                content: Fingerprint::EMPTY,
            },
            Err(err) => FileSummary {
                content: Fingerprinter::new()
                    .write(&[2])
                    .write_str(&err.to_string())
                    .finish(),
                text: Err(err),
            },
        };
        Ok(summary)
    }
}

/// Whether a file exists, readable or not.
pub struct FileExists;

impl Query for FileExists {
    const KIND: RuleKind = RuleKind::FileExists;
    type Key = SourcePath;
    type Value = bool;

    fn fingerprint(value: &bool) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl Rule for FileExists {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<bool, RuleError> {
        let summary = deps.get::<ModSummary>(key.clone()).await?;
        Ok(!matches!(summary.text, Err(ReadError::NotFound)))
    }
}

/// The parsed syntax of a file. An unreadable file or a syntax error fails
/// with its diagnostics.
pub struct ParseFile<F: Frontend> {
    ctx: Arc<RuleContext<F>>,
}

impl<F: Frontend> ParseFile<F> {
    pub(crate) fn new(ctx: Arc<RuleContext<F>>) -> Self {
        Self { ctx }
    }
}

impl<F: Frontend> Query for ParseFile<F> {
    const KIND: RuleKind = RuleKind::ParseFile;
    type Key = SourcePath;
    type Value = ParsedFile<F::Ast>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(&*value.ast)
    }
}

#[async_trait]
impl<F: Frontend> Rule for ParseFile<F> {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Self::Value, RuleError> {
        let summary = deps.get::<ModSummary>(key.clone()).await?;
        let text = summary
            .text
            .map_err(|err| RuleError::Input(vec![unreadable(key, &err)]))?;
        let source = SourceFile::new(key.clone(), text);
        let ast = self.ctx.frontend.parse(&source).map_err(RuleError::Input)?;
        Ok(ParsedFile {
            source: Arc::new(source),
            ast: Arc::new(ast),
        })
    }
}

fn unreadable(key: &SourcePath, err: &ReadError) -> Diagnostic {
    match err {
        ReadError::NotFound => Diagnostic::error(
            key.clone(),
            codes::FILE_NOT_FOUND,
            format!("cannot read `{key}`"),
        ),
        ReadError::NotUtf8 => Diagnostic::error(
            key.clone(),
            codes::FILE_NOT_UTF8,
            format!("`{key}` is not valid UTF-8 text"),
        ),
        ReadError::Io(reason) => Diagnostic::error(
            key.clone(),
            codes::FILE_NOT_FOUND,
            format!("cannot read `{key}`: {reason}"),
        ),
    }
}
