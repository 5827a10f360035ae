//! The language front-end interface and the values the rules pass between
//! themselves.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use strata_common::{Fingerprint, SourcePath};
use strata_config::ResolvedUnit;
use strata_diagnostics::Diagnostic;
use strata_engine::{ModuleGraph, Value};
use strata_source::{FileSnapshot, ReadError, SourceFile, Span};

/// The compute functions of a language.
///
/// The rules own scheduling, caching and dependency tracking; a front-end
/// only turns one artifact into the next. Every method must be a pure
/// function of its arguments.
pub trait Frontend: Send + Sync + 'static {
    /// Parsed syntax of one file. Fingerprinted in full, spans included.
    type Ast: Value + Serialize;
    /// A compiler environment for one unit.
    type Session: fmt::Debug + Send + Sync + 'static;
    /// A type-checked module.
    type Module: Value + Serialize;
    /// What importers of a module can see of it. Must not retain the syntax
    /// tree, so whitespace and comment edits leave it unchanged.
    type Interface: Value + Serialize + DeserializeOwned;
    /// Lowered intermediate representation.
    type Core: Value + Serialize;
    /// Generated bytecode.
    type Bytecode: Value + Serialize;

    /// Parses a file, or reports why it cannot be parsed.
    fn parse(&self, file: &SourceFile) -> Result<Self::Ast, Vec<Diagnostic>>;

    /// The imports a file declares, in source order.
    fn imports(&self, ast: &Self::Ast) -> Vec<ImportDecl>;

    /// Builds the session for a unit. `root` is the workspace directory.
    fn load_session(&self, root: &Path, unit: &ResolvedUnit) -> Result<Self::Session, String>;

    /// Type-checks a parsed file against its session and the interfaces of
    /// its transitive imports.
    fn typecheck(
        &self,
        env: &SessionEnv<Self::Session, Self::Interface>,
        file: &ParsedFile<Self::Ast>,
        imports: &ResolvedImports,
    ) -> Result<Checked<Self::Module>, Vec<Diagnostic>>;

    /// Extracts the interface of a checked module.
    fn interface(&self, module: &Self::Module) -> Self::Interface;

    /// Lowers a checked module.
    fn lower(&self, module: &Self::Module) -> Result<Self::Core, Vec<Diagnostic>>;

    /// Generates bytecode.
    fn codegen(&self, core: &Self::Core) -> Self::Bytecode;
}

/// An import as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportDecl {
    /// The imported path as written.
    pub target: String,
    /// Where the import is written.
    pub span: Span,
}

/// A successful type check, with any warnings it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Checked<M> {
    /// The checked module.
    pub module: M,
    /// Non-fatal diagnostics.
    pub warnings: Vec<Diagnostic>,
}

/// The current contents of a file, as read by [`SourceText`].
///
/// [`SourceText`]: crate::rules::SourceText
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileContents {
    /// The text.
    pub text: Arc<str>,
    /// Modification time on disk; `None` for editor buffers.
    pub modified: Option<SystemTime>,
}

impl From<FileSnapshot> for FileContents {
    fn from(snapshot: FileSnapshot) -> Self {
        Self {
            text: snapshot.text,
            modified: snapshot.modified,
        }
    }
}

/// A file's text with a fingerprint over its bytes only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSummary {
    /// The text, or why the file has none.
    pub text: Result<Arc<str>, ReadError>,
    /// Fingerprint of the bytes. Timestamps do not contribute.
    pub content: Fingerprint,
}

/// A parsed file.
#[derive(Debug, Clone)]
pub struct ParsedFile<A> {
    /// The source with its line index.
    pub source: Arc<SourceFile>,
    /// The syntax tree.
    pub ast: Arc<A>,
}

/// One resolved import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedImport {
    /// The imported path as written.
    pub target: String,
    /// The file it resolved to.
    pub path: SourcePath,
    /// Where the import is written.
    pub span: Span,
}

/// A file's imports, split by whether they name an existing file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolvedImports {
    /// Imports naming an existing file, in source order.
    pub resolved: Vec<ResolvedImport>,
    /// Imports naming no existing file, in source order.
    pub unresolved: Vec<ImportDecl>,
}

impl ResolvedImports {
    /// The distinct files imported, in source order.
    pub fn paths(&self) -> Vec<SourcePath> {
        let mut paths: Vec<SourcePath> = Vec::with_capacity(self.resolved.len());
        for import in &self.resolved {
            if !paths.contains(&import.path) {
                paths.push(import.path.clone());
            }
        }
        paths
    }
}

/// The import graph reachable from one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportGraph {
    /// Import edges between every reachable file.
    pub graph: Arc<ModuleGraph>,
    /// Reachable files whose imports could not be read, because they are
    /// missing or do not parse. They appear as nodes without edges.
    pub broken: BTreeSet<SourcePath>,
}

/// A shared compiler session and the unit it was built for.
#[derive(Debug)]
pub struct SessionHandle<S> {
    /// The resolved unit.
    pub unit: Arc<ResolvedUnit>,
    /// The session.
    pub session: Arc<S>,
}

impl<S> Clone for SessionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            unit: self.unit.clone(),
            session: self.session.clone(),
        }
    }
}

/// A session together with the interfaces of a file's transitive imports.
#[derive(Debug)]
pub struct SessionEnv<S, I> {
    /// The unit's session.
    pub handle: SessionHandle<S>,
    /// Interfaces of every module the file transitively imports.
    pub interfaces: Arc<BTreeMap<SourcePath, Arc<I>>>,
}

impl<S, I> Clone for SessionEnv<S, I> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            interfaces: self.interfaces.clone(),
        }
    }
}

impl<S, I> SessionEnv<S, I> {
    /// The session.
    pub fn session(&self) -> &S {
        &self.handle.session
    }

    /// The interface of an imported module.
    pub fn interface(&self, path: &SourcePath) -> Option<&I> {
        self.interfaces.get(path).map(|i| &**i)
    }
}

/// What a persisted interface must have been built from to be reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceKey {
    /// Fingerprint of the file's bytes.
    pub source: Fingerprint,
    /// Fingerprint of the unit configuration.
    pub session: Fingerprint,
    /// Interface fingerprints of every transitive import.
    pub dependencies: BTreeMap<SourcePath, Fingerprint>,
}

/// The outcome of looking up a persisted interface.
#[derive(Debug)]
pub struct InterfaceLookup<I> {
    /// The current key, if persistence applies to the file.
    pub key: Option<InterfaceKey>,
    /// The persisted interface, if one matches the key.
    pub hit: Option<Arc<I>>,
}

impl<I> Clone for InterfaceLookup<I> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            hit: self.hit.clone(),
        }
    }
}

impl<I> InterfaceLookup<I> {
    /// A lookup for a file that is never persisted.
    pub fn disabled() -> Self {
        Self {
            key: None,
            hit: None,
        }
    }
}
