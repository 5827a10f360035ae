//! State shared by every rule of one workspace.

use std::sync::Arc;

use strata_cache::InterfaceStore;
use strata_config::WorkspaceConfig;
use strata_engine::{EngineError, Registry, SessionManager};
use strata_source::Vfs;

use crate::frontend::Frontend;
use crate::rules;

/// Version tag written into persisted interfaces. Interfaces written by
/// another version are ignored.
pub const STRATA_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Everything the rules consult besides their dependencies.
///
/// None of this is observed through the engine: the file system is read
/// only to initialize inputs, sessions are keyed by the configuration
/// fingerprint, and persisted interfaces are validated against fingerprints
/// before use.
pub struct RuleContext<F: Frontend> {
    /// The language front-end.
    pub frontend: Arc<F>,
    /// Editor buffers over the workspace directory.
    pub vfs: Arc<Vfs>,
    /// Configuration used until the host sets another.
    pub initial_config: Arc<WorkspaceConfig>,
    /// Persisted interfaces, if enabled.
    pub store: Option<InterfaceStore>,
    /// Compiler sessions by unit fingerprint.
    pub sessions: SessionManager<F::Session>,
}

impl<F: Frontend> RuleContext<F> {
    /// Creates the context. The interface store is opened when the
    /// configuration enables persistence.
    pub fn new(frontend: F, vfs: Arc<Vfs>, config: WorkspaceConfig) -> Self {
        let store = config.engine.persist_interfaces.then(|| {
            let dir = vfs.root().join(&config.engine.cache_dir);
            InterfaceStore::open(&dir, STRATA_VERSION)
        });
        Self {
            frontend: Arc::new(frontend),
            vfs,
            initial_config: Arc::new(config),
            store,
            sessions: SessionManager::new(),
        }
    }
}

/// Registers every rule of the catalog over `ctx`.
pub fn registry<F: Frontend>(ctx: &Arc<RuleContext<F>>) -> Result<Registry, EngineError> {
    Registry::builder()
        .register_input(rules::SourceText::new(ctx.vfs.clone()))
        .register_input(rules::ClientSettings)
        .register_input(rules::Configuration::new(ctx.initial_config.clone()))
        .register_input(rules::FilesOfInterest)
        .register(rules::FileExists)
        .register(rules::ModSummary)
        .register(rules::ParseFile::new(ctx.clone()))
        .register(rules::ResolveImports::new(ctx.clone()))
        .register(rules::BuildModuleGraph::<F>::new())
        .register(rules::ReportImportCycles::<F>::new())
        .register(rules::AcquireSession::new(ctx.clone()))
        .register(rules::SessionWithDeps::<F>::new())
        .register(rules::TypeCheck::new(ctx.clone()))
        .register(rules::LoadPersistedInterface::new(ctx.clone()))
        .register(rules::GenerateInterface::new(ctx.clone()))
        .register(rules::GenerateCore::new(ctx.clone()))
        .register(rules::GenerateBytecode::new(ctx.clone()))
        .register(rules::IsFileOfInterest)
        .register(rules::ReadClientSettings)
        .register(rules::FileDiagnostics::<F>::new())
        .build()
}
