//! The closed catalog of rule kinds and the keys rules are evaluated for.

use serde::{Deserialize, Serialize};
use std::fmt;
use strata_common::SourcePath;

/// A class of computation in the rule graph.
///
/// Each kind statically determines its key shape (per file or global) and
/// its result type. The first four kinds are inputs: their values are set by
/// the host, never computed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum RuleKind {
    /// Current text of a file, from the editor overlay or disk.
    SourceText,
    /// Settings sent by the editor client.
    ClientSettings,
    /// The workspace configuration.
    Configuration,
    /// The files the editor currently cares about.
    FilesOfInterest,
    /// Whether a file exists.
    FileExists,
    /// File contents without timestamps.
    ModSummary,
    /// Syntax tree of a file.
    ParseFile,
    /// A file's imports resolved to paths.
    ResolveImports,
    /// Transitive import graph reachable from a file.
    BuildModuleGraph,
    /// Import cycle diagnostics for a file.
    ReportImportCycles,
    /// The compiler session for a file's build unit.
    AcquireSession,
    /// A session loaded with the interfaces of a file's dependencies.
    SessionWithDeps,
    /// Type-checked module.
    TypeCheck,
    /// A module interface loaded from the persistent cache.
    LoadPersistedInterface,
    /// Module interface summary.
    GenerateInterface,
    /// Lowered intermediate representation.
    GenerateCore,
    /// Generated bytecode.
    GenerateBytecode,
    /// Whether a file is among the files of interest.
    IsFileOfInterest,
    /// Effective client settings.
    ReadClientSettings,
    /// All diagnostics for a file.
    FileDiagnostics,
}

impl RuleKind {
    /// Number of rule kinds.
    pub const COUNT: usize = 20;

    /// Every rule kind, in declaration order.
    pub const ALL: [RuleKind; Self::COUNT] = [
        RuleKind::SourceText,
        RuleKind::ClientSettings,
        RuleKind::Configuration,
        RuleKind::FilesOfInterest,
        RuleKind::FileExists,
        RuleKind::ModSummary,
        RuleKind::ParseFile,
        RuleKind::ResolveImports,
        RuleKind::BuildModuleGraph,
        RuleKind::ReportImportCycles,
        RuleKind::AcquireSession,
        RuleKind::SessionWithDeps,
        RuleKind::TypeCheck,
        RuleKind::LoadPersistedInterface,
        RuleKind::GenerateInterface,
        RuleKind::GenerateCore,
        RuleKind::GenerateBytecode,
        RuleKind::IsFileOfInterest,
        RuleKind::ReadClientSettings,
        RuleKind::FileDiagnostics,
    ];

    /// Position of this kind in [`ALL`](Self::ALL).
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns `true` for kinds whose values are set rather than computed.
    pub const fn is_input(self) -> bool {
        matches!(
            self,
            RuleKind::SourceText
                | RuleKind::ClientSettings
                | RuleKind::Configuration
                | RuleKind::FilesOfInterest
        )
    }

    /// Returns `true` for singleton kinds keyed by `()`.
    pub const fn is_global(self) -> bool {
        matches!(
            self,
            RuleKind::ClientSettings
                | RuleKind::Configuration
                | RuleKind::FilesOfInterest
                | RuleKind::ReadClientSettings
        )
    }

    /// Returns the kind's name.
    pub const fn name(self) -> &'static str {
        match self {
            RuleKind::SourceText => "SourceText",
            RuleKind::ClientSettings => "ClientSettings",
            RuleKind::Configuration => "Configuration",
            RuleKind::FilesOfInterest => "FilesOfInterest",
            RuleKind::FileExists => "FileExists",
            RuleKind::ModSummary => "ModSummary",
            RuleKind::ParseFile => "ParseFile",
            RuleKind::ResolveImports => "ResolveImports",
            RuleKind::BuildModuleGraph => "BuildModuleGraph",
            RuleKind::ReportImportCycles => "ReportImportCycles",
            RuleKind::AcquireSession => "AcquireSession",
            RuleKind::SessionWithDeps => "SessionWithDeps",
            RuleKind::TypeCheck => "TypeCheck",
            RuleKind::LoadPersistedInterface => "LoadPersistedInterface",
            RuleKind::GenerateInterface => "GenerateInterface",
            RuleKind::GenerateCore => "GenerateCore",
            RuleKind::GenerateBytecode => "GenerateBytecode",
            RuleKind::IsFileOfInterest => "IsFileOfInterest",
            RuleKind::ReadClientSettings => "ReadClientSettings",
            RuleKind::FileDiagnostics => "FileDiagnostics",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The target a rule is evaluated for.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum RuleKey {
    /// A source file.
    File(SourcePath),
    /// The singleton key of global rules.
    Global,
}

/// Identity of one cache entry: a rule kind applied to a key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct RuleId {
    /// The rule kind.
    pub kind: RuleKind,
    /// The key.
    pub key: RuleKey,
}

impl RuleId {
    /// Creates an id from a kind and a typed key.
    pub fn new<K: Key>(kind: RuleKind, key: K) -> Self {
        Self {
            kind,
            key: key.into_rule_key(),
        }
    }

    /// The file this entry is keyed by, if any.
    pub fn path(&self) -> Option<&SourcePath> {
        match &self.key {
            RuleKey::File(path) => Some(path),
            RuleKey::Global => None,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            RuleKey::File(path) => write!(f, "{}({path})", self.kind),
            RuleKey::Global => write!(f, "{}", self.kind),
        }
    }
}

/// A typed rule key convertible to and from [`RuleKey`].
pub trait Key: Clone + Send + Sync + fmt::Debug + 'static {
    /// `true` if this key type identifies global rules.
    const GLOBAL: bool;

    /// Converts into the untyped key.
    fn into_rule_key(self) -> RuleKey;

    /// Converts back from the untyped key, or `None` on a shape mismatch.
    fn from_rule_key(key: &RuleKey) -> Option<Self>;
}

impl Key for SourcePath {
    const GLOBAL: bool = false;

    fn into_rule_key(self) -> RuleKey {
        RuleKey::File(self)
    }

    fn from_rule_key(key: &RuleKey) -> Option<Self> {
        match key {
            RuleKey::File(path) => Some(path.clone()),
            RuleKey::Global => None,
        }
    }
}

impl Key for () {
    const GLOBAL: bool = true;

    fn into_rule_key(self) -> RuleKey {
        RuleKey::Global
    }

    fn from_rule_key(key: &RuleKey) -> Option<Self> {
        matches!(key, RuleKey::Global).then_some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_matches_catalog_order() {
        for (i, kind) in RuleKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
        }
    }

    #[test]
    fn inputs_and_globals() {
        let inputs: Vec<_> = RuleKind::ALL.iter().filter(|k| k.is_input()).collect();
        assert_eq!(inputs.len(), 4);
        assert!(RuleKind::Configuration.is_global());
        assert!(!RuleKind::SourceText.is_global());
        assert!(!RuleKind::TypeCheck.is_input());
    }

    #[test]
    fn rule_id_display() {
        let id = RuleId::new(RuleKind::TypeCheck, SourcePath::new("src/b.src"));
        assert_eq!(id.to_string(), "TypeCheck(src/b.src)");
        assert_eq!(RuleId::new(RuleKind::Configuration, ()).to_string(), "Configuration");
    }

    #[test]
    fn key_shapes() {
        let key = SourcePath::new("a.src").into_rule_key();
        assert!(<() as Key>::from_rule_key(&key).is_none());
        assert_eq!(SourcePath::from_rule_key(&key), Some(SourcePath::new("a.src")));
        assert_eq!(<() as Key>::from_rule_key(&RuleKey::Global), Some(()));
    }
}
