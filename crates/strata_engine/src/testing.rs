//! Small rules over text inputs for exercising the engine.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use strata_common::{Fingerprint, SourcePath, StrataResult};
use tokio::sync::Notify;

use crate::deps::Deps;
use crate::engine::Engine;
use crate::error::RuleError;
use crate::kind::RuleKind;
use crate::registry::{Registry, RegistryBuilder};
use crate::rule::{InputRule, Query, Rule};

pub(crate) type Files = Arc<Mutex<BTreeMap<SourcePath, String>>>;

/// File text; files never set fall back to `files`, and fail if absent.
#[derive(Default)]
pub(crate) struct Text {
    files: Files,
}

impl Query for Text {
    const KIND: RuleKind = RuleKind::SourceText;
    type Key = SourcePath;
    type Value = Arc<str>;

    fn fingerprint(value: &Arc<str>) -> StrataResult<Fingerprint> {
        Ok(Fingerprint::from_bytes(value.as_bytes()))
    }
}

impl InputRule for Text {
    fn initial(&self, key: &SourcePath) -> Result<Arc<str>, RuleError> {
        self.files
            .lock()
            .get(key)
            .map(|text| Arc::from(text.as_str()))
            .ok_or_else(|| RuleError::Input(Vec::new()))
    }
}

/// Length of a file's text.
pub(crate) struct Length;

impl Query for Length {
    const KIND: RuleKind = RuleKind::ModSummary;
    type Key = SourcePath;
    type Value = usize;

    fn fingerprint(value: &usize) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl Rule for Length {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<usize, RuleError> {
        Ok(deps.get::<Text>(key.clone()).await?.len())
    }
}

/// Twice the length; only observes the text through [`Length`].
pub(crate) struct Doubled;

impl Query for Doubled {
    const KIND: RuleKind = RuleKind::ParseFile;
    type Key = SourcePath;
    type Value = usize;

    fn fingerprint(value: &usize) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl Rule for Doubled {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<usize, RuleError> {
        Ok(deps.get::<Length>(key.clone()).await? * 2)
    }
}

/// Follows `->target` links and counts the hops.
pub(crate) struct Chain;

impl Query for Chain {
    const KIND: RuleKind = RuleKind::ResolveImports;
    type Key = SourcePath;
    type Value = usize;

    fn fingerprint(value: &usize) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl Rule for Chain {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<usize, RuleError> {
        let text = deps.get::<Text>(key.clone()).await?;
        match text.strip_prefix("->") {
            Some(target) => Ok(deps.get::<Chain>(SourcePath::new(target)).await? + 1),
            None => Ok(0),
        }
    }
}

/// Sum of the lengths of the comma-separated files named in a file.
pub(crate) struct Sum;

impl Query for Sum {
    const KIND: RuleKind = RuleKind::BuildModuleGraph;
    type Key = SourcePath;
    type Value = usize;

    fn fingerprint(value: &usize) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl Rule for Sum {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<usize, RuleError> {
        let text = deps.get::<Text>(key.clone()).await?;
        let keys = text.split(',').map(SourcePath::new).collect();
        let mut total = 0;
        for length in deps.fetch_all::<Length>(keys).await? {
            total += length?;
        }
        Ok(total)
    }
}

/// Length, computed slowly enough for concurrent requests to overlap.
pub(crate) struct Slow;

impl Query for Slow {
    const KIND: RuleKind = RuleKind::TypeCheck;
    type Key = SourcePath;
    type Value = usize;

    fn fingerprint(value: &usize) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

#[async_trait]
impl Rule for Slow {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<usize, RuleError> {
        let text = deps.get::<Text>(key.clone()).await?;
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(text.len())
    }
}

#[derive(Default)]
pub(crate) struct GateSignals {
    pub(crate) started: Notify,
    pub(crate) release: Notify,
    armed: AtomicBool,
}

/// Returns the text; the first evaluation after arming pauses between
/// reading its input and returning.
pub(crate) struct Gate {
    signals: Arc<GateSignals>,
}

impl Query for Gate {
    const KIND: RuleKind = RuleKind::GenerateCore;
    type Key = SourcePath;
    type Value = Arc<str>;

    fn fingerprint(value: &Arc<str>) -> StrataResult<Fingerprint> {
        Ok(Fingerprint::from_bytes(value.as_bytes()))
    }
}

#[async_trait]
impl Rule for Gate {
    async fn compute(&self, key: &SourcePath, deps: &Deps) -> Result<Arc<str>, RuleError> {
        let text = deps.get::<Text>(key.clone()).await?;
        if self.signals.armed.swap(false, Ordering::SeqCst) {
            self.signals.started.notify_one();
            self.signals.release.notified().await;
        }
        Ok(text)
    }
}

/// Placeholder rules for every kind, so partial registries can be completed.
pub(crate) mod stubs {
    use super::*;

    macro_rules! stub {
        (input $name:ident: $key:ty) => {
            pub(crate) struct $name;

            impl Query for $name {
                const KIND: RuleKind = RuleKind::$name;
                type Key = $key;
                type Value = ();

                fn fingerprint(_: &()) -> StrataResult<Fingerprint> {
                    Ok(Fingerprint::EMPTY)
                }
            }

            impl InputRule for $name {
                fn initial(&self, _: &$key) -> Result<(), RuleError> {
                    Ok(())
                }
            }
        };
        (derived $name:ident: $key:ty) => {
            pub(crate) struct $name;

            impl Query for $name {
                const KIND: RuleKind = RuleKind::$name;
                type Key = $key;
                type Value = ();

                fn fingerprint(_: &()) -> StrataResult<Fingerprint> {
                    Ok(Fingerprint::EMPTY)
                }
            }

            #[async_trait]
            impl Rule for $name {
                async fn compute(&self, _: &$key, _: &Deps) -> Result<(), RuleError> {
                    Ok(())
                }
            }
        };
    }

    stub!(input SourceText: SourcePath);
    stub!(input ClientSettings: ());
    stub!(input Configuration: ());
    stub!(input FilesOfInterest: ());
    stub!(derived FileExists: SourcePath);
    stub!(derived ModSummary: SourcePath);
    stub!(derived ParseFile: SourcePath);
    stub!(derived ResolveImports: SourcePath);
    stub!(derived BuildModuleGraph: SourcePath);
    stub!(derived ReportImportCycles: SourcePath);
    stub!(derived AcquireSession: SourcePath);
    stub!(derived SessionWithDeps: SourcePath);
    stub!(derived TypeCheck: SourcePath);
    stub!(derived LoadPersistedInterface: SourcePath);
    stub!(derived GenerateInterface: SourcePath);
    stub!(derived GenerateCore: SourcePath);
    stub!(derived GenerateBytecode: SourcePath);
    stub!(derived IsFileOfInterest: SourcePath);
    stub!(derived ReadClientSettings: ());
    stub!(derived FileDiagnostics: SourcePath);
}

/// Registers a stub for every kind `builder` does not cover yet.
pub(crate) fn fill(mut builder: RegistryBuilder) -> RegistryBuilder {
    macro_rules! fill {
        ($($method:ident $name:ident),* $(,)?) => {
            $(
                if builder.is_missing(RuleKind::$name) {
                    builder = builder.$method(stubs::$name);
                }
            )*
        };
    }
    fill!(
        register_input SourceText,
        register_input ClientSettings,
        register_input Configuration,
        register_input FilesOfInterest,
        register FileExists,
        register ModSummary,
        register ParseFile,
        register ResolveImports,
        register BuildModuleGraph,
        register ReportImportCycles,
        register AcquireSession,
        register SessionWithDeps,
        register TypeCheck,
        register LoadPersistedInterface,
        register GenerateInterface,
        register GenerateCore,
        register GenerateBytecode,
        register IsFileOfInterest,
        register ReadClientSettings,
        register FileDiagnostics,
    );
    builder
}

fn build(files: Files, signals: Arc<GateSignals>) -> Engine {
    let builder = Registry::builder()
        .register_input(Text { files })
        .register(Length)
        .register(Doubled)
        .register(Chain)
        .register(Sum)
        .register(Slow)
        .register(Gate { signals });
    match fill(builder).build() {
        Ok(registry) => Engine::new(registry),
        Err(err) => panic!("test registry is incomplete: {err}"),
    }
}

/// An engine over the test rules, with the fallback file table.
pub(crate) fn engine() -> (Engine, Files) {
    let files = Files::default();
    (build(files.clone(), Arc::default()), files)
}

/// An engine whose [`Gate`] pauses its next evaluation.
pub(crate) fn engine_with_gate() -> (Engine, Arc<GateSignals>) {
    let signals = Arc::new(GateSignals::default());
    signals.armed.store(true, Ordering::SeqCst);
    (build(Files::default(), signals.clone()), signals)
}
