//! The entry point for editors and the CLI: edit notifications in,
//! diagnostics out.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use strata_cache::CacheError;
use strata_common::{Fingerprint, InternalError, SourcePath};
use strata_config::{resolve_unit, ClientSettings as Settings, WorkspaceConfig};
use strata_diagnostics::{Diagnostic, DiagnosticSink};
use strata_engine::{Engine, EngineError, EngineStats, Query, RuleError, RuleId, RuleKind};
use strata_source::Vfs;

use crate::context::{registry, RuleContext};
use crate::frontend::{FileContents, Frontend};
use crate::rules::{ClientSettings, Configuration, FileDiagnostics, FilesOfInterest, SourceText};

/// What a garbage collection pass released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Cached rule results dropped.
    pub entries: usize,
    /// Compiler sessions released.
    pub sessions: usize,
    /// Persisted interface artifacts deleted.
    pub artifacts: usize,
}

/// A workspace driven by one front-end.
///
/// Every notification updates an input of the engine; nothing is recomputed
/// until something is requested.
pub struct Host<F: Frontend> {
    engine: Engine,
    ctx: Arc<RuleContext<F>>,
    sink: DiagnosticSink,
    config: RwLock<Arc<WorkspaceConfig>>,
    interest: RwLock<Arc<BTreeSet<SourcePath>>>,
}

impl<F: Frontend> Host<F> {
    /// Creates a host for the workspace at `root`.
    pub fn new(
        frontend: F,
        root: impl Into<PathBuf>,
        config: WorkspaceConfig,
    ) -> Result<Self, EngineError> {
        let vfs = Arc::new(Vfs::new(root));
        let ctx = Arc::new(RuleContext::new(frontend, vfs, config));
        let engine = Engine::new(registry(&ctx)?);
        tracing::debug!(
            root = %ctx.vfs.root().display(),
            persist = ctx.store.is_some(),
            "workspace opened"
        );
        Ok(Self {
            engine,
            config: RwLock::new(ctx.initial_config.clone()),
            ctx,
            sink: DiagnosticSink::new(),
            interest: RwLock::new(Arc::default()),
        })
    }

    /// A file changed. `Some(text)` is the new editor buffer; `None` means
    /// the file changed on disk. Returns `false` if the file's contents are
    /// unchanged.
    pub fn on_file_changed(
        &self,
        path: SourcePath,
        text: Option<Arc<str>>,
    ) -> Result<bool, EngineError> {
        if let Some(text) = text {
            self.ctx.vfs.set_overlay(path.clone(), text);
        }
        self.reload(path)
    }

    /// The editor closed a buffer; the file falls back to its disk contents.
    pub fn on_file_closed(&self, path: SourcePath) -> Result<bool, EngineError> {
        self.ctx.vfs.remove_overlay(&path);
        self.reload(path)
    }

    fn reload(&self, path: SourcePath) -> Result<bool, EngineError> {
        let contents = SourceText::read(&self.ctx.vfs, &path);
        self.engine.set_input::<SourceText>(path, contents)
    }

    /// Reads `files` in parallel and sets their text inputs, so the checks
    /// that follow do not read them one at a time. Returns how many changed.
    pub fn load_sources(&self, files: &[SourcePath]) -> Result<usize, EngineError> {
        let mut changed = 0;
        for (path, read) in self.ctx.vfs.read_many(files) {
            let contents = read.map(FileContents::from);
            if self.engine.set_input::<SourceText>(path, contents)? {
                changed += 1;
            }
        }
        tracing::debug!(files = files.len(), changed, "loaded sources");
        Ok(changed)
    }

    /// The workspace configuration changed.
    ///
    /// Sessions whose construction failed are forgotten and retried on the
    /// next request, even when the configuration is unchanged: the failure
    /// may have been fixed on disk, such as a package directory created.
    pub fn on_configuration_changed(&self, config: WorkspaceConfig) -> Result<bool, EngineError> {
        let config = Arc::new(config);
        *self.config.write() = config.clone();
        let forgotten = self.ctx.sessions.forget_failures();
        let retried = self
            .engine
            .invalidate_failed(|id| id.kind == RuleKind::AcquireSession);
        tracing::debug!(forgotten, retried, "configuration changed");
        self.engine.set_input::<Configuration>((), config)
    }

    /// The client sent new settings; `None` reverts to the workspace
    /// defaults.
    pub fn on_client_settings_changed(
        &self,
        settings: Option<Settings>,
    ) -> Result<bool, EngineError> {
        self.engine.set_input::<ClientSettings>((), settings)
    }

    /// Replaces the set of files the client cares about.
    pub fn set_files_of_interest(
        &self,
        files: impl IntoIterator<Item = SourcePath>,
    ) -> Result<bool, EngineError> {
        let files: Arc<BTreeSet<SourcePath>> = Arc::new(files.into_iter().collect());
        *self.interest.write() = files.clone();
        self.engine.set_input::<FilesOfInterest>((), files)
    }

    /// The files of interest.
    pub fn files_of_interest(&self) -> Arc<BTreeSet<SourcePath>> {
        self.interest.read().clone()
    }

    /// The configuration currently in effect.
    pub fn config(&self) -> Arc<WorkspaceConfig> {
        self.config.read().clone()
    }

    /// Requests any rule.
    pub async fn request<Q: Query>(&self, key: Q::Key) -> Result<Q::Value, RuleError> {
        self.engine.request::<Q>(key).await
    }

    /// The diagnostics of one file.
    pub async fn diagnostics(&self, path: SourcePath) -> Result<Arc<Vec<Diagnostic>>, RuleError> {
        self.engine.request::<FileDiagnostics<F>>(path).await
    }

    /// Checks every file of interest in parallel and publishes the results
    /// to the sink. Returns the number of errors found.
    pub async fn check_files_of_interest(&self) -> Result<usize, RuleError> {
        let files = self.files_of_interest();
        let mut handles = Vec::with_capacity(files.len());
        for path in files.iter().cloned() {
            let engine = self.engine.clone();
            handles.push(tokio::spawn(async move {
                let result = engine.request::<FileDiagnostics<F>>(path.clone()).await;
                (path, result)
            }));
        }

        let mut errors = 0;
        for handle in handles {
            let (path, result) = handle.await.map_err(|e| {
                RuleError::Internal(InternalError::new(format!("check task panicked: {e}")))
            })?;
            let diags = result?;
            errors += diags.iter().filter(|d| d.is_error()).count();
            self.sink.publish(path, diags.to_vec());
        }
        tracing::info!(files = files.len(), errors, "checked files of interest");
        Ok(errors)
    }

    /// Source files under the configured roots.
    pub fn discover(&self) -> std::io::Result<Vec<SourcePath>> {
        let config = self.config();
        let mut files = BTreeSet::new();
        for root in &config.workspace.roots {
            files.extend(
                self.ctx
                    .vfs
                    .discover(&SourcePath::new(root), &config.workspace.extension)?,
            );
        }
        Ok(files.into_iter().collect())
    }

    /// Writes the interface manifest, if persistence is enabled.
    pub fn flush_interfaces(&self) -> Result<(), CacheError> {
        match &self.ctx.store {
            Some(store) => store.flush(),
            None => Ok(()),
        }
    }

    /// Releases everything the files of interest no longer need: cached
    /// results they cannot reach and sessions of units none of them belongs
    /// to. Interface records of deleted files are dropped, then every
    /// artifact no record refers to is deleted.
    pub fn collect_garbage(&self) -> Result<GcReport, CacheError> {
        let files = self.files_of_interest();
        let roots: Vec<RuleId> = files
            .iter()
            .flat_map(|path| {
                [
                    RuleId::new(RuleKind::FileDiagnostics, path.clone()),
                    RuleId::new(RuleKind::GenerateBytecode, path.clone()),
                ]
            })
            .collect();
        let entries = self.engine.collect_garbage(&roots);

        let config = self.config();
        let live: BTreeSet<Fingerprint> = files
            .iter()
            .filter_map(|path| resolve_unit(&config, path).ok())
            .map(|unit| unit.fingerprint)
            .collect();
        let sessions = self.ctx.sessions.retain(|key| live.contains(key));

        let artifacts = match &self.ctx.store {
            Some(store) => {
                let vfs = &self.ctx.vfs;
                let dropped =
                    store.retain(|path| vfs.has_overlay(path) || vfs.disk_path(path).is_file());
                tracing::debug!(dropped, "forgot interfaces of deleted files");
                store.flush()?;
                store.gc()?
            }
            None => 0,
        };
        let report = GcReport {
            entries,
            sessions,
            artifacts,
        };
        tracing::info!(?report, "garbage collected");
        Ok(report)
    }

    /// Stops the engine and releases every session. Pending requests fail
    /// with a cancellation error.
    pub fn shutdown(&self) {
        if let Err(err) = self.flush_interfaces() {
            tracing::warn!(%err, "cannot write interface manifest");
        }
        self.engine.shutdown();
        self.ctx.sessions.clear();
    }

    /// Evaluation counters.
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    /// Compiler sessions built so far.
    pub fn session_builds(&self) -> u64 {
        self.ctx.sessions.builds()
    }

    /// Diagnostics published by [`check_files_of_interest`](Self::check_files_of_interest).
    pub fn sink(&self) -> &DiagnosticSink {
        &self.sink
    }

    /// The overlay file system.
    pub fn vfs(&self) -> &Vfs {
        &self.ctx.vfs
    }

    /// The underlying engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
