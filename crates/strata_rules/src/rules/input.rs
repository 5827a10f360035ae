//! Input rules. Their values are set by the host; `initial` covers inputs
//! never set.

use std::collections::BTreeSet;
use std::sync::Arc;

use strata_common::{Fingerprint, SourcePath, StrataResult};
use strata_config::WorkspaceConfig;
use strata_engine::{InputRule, Query, RuleError, RuleKind};
use strata_source::{ReadError, Vfs};

use crate::frontend::FileContents;

/// The text of a file, or why it has none.
///
/// The fingerprint covers the modification time as well as the bytes, so
/// saving a file unchanged still reaches [`ModSummary`](super::ModSummary),
/// which filters it out.
pub struct SourceText {
    vfs: Arc<Vfs>,
}

impl SourceText {
    pub(crate) fn new(vfs: Arc<Vfs>) -> Self {
        Self { vfs }
    }

    /// Reads the current contents of `path` from the overlay file system.
    pub fn read(vfs: &Vfs, path: &SourcePath) -> Result<FileContents, ReadError> {
        vfs.read(path).map(FileContents::from)
    }
}

impl Query for SourceText {
    const KIND: RuleKind = RuleKind::SourceText;
    type Key = SourcePath;
    type Value = Result<FileContents, ReadError>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

impl InputRule for SourceText {
    fn initial(&self, key: &SourcePath) -> Result<Self::Value, RuleError> {
        Ok(Self::read(&self.vfs, key))
    }
}

/// Settings sent by the editor client, `None` until it sends any.
pub struct ClientSettings;

impl Query for ClientSettings {
    const KIND: RuleKind = RuleKind::ClientSettings;
    type Key = ();
    type Value = Option<strata_config::ClientSettings>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(value)
    }
}

impl InputRule for ClientSettings {
    fn initial(&self, _: &()) -> Result<Self::Value, RuleError> {
        Ok(None)
    }
}

/// The workspace configuration.
pub struct Configuration {
    initial: Arc<WorkspaceConfig>,
}

impl Configuration {
    pub(crate) fn new(initial: Arc<WorkspaceConfig>) -> Self {
        Self { initial }
    }
}

impl Query for Configuration {
    const KIND: RuleKind = RuleKind::Configuration;
    type Key = ();
    type Value = Arc<WorkspaceConfig>;

    fn fingerprint(value: &Arc<WorkspaceConfig>) -> StrataResult<Fingerprint> {
        Fingerprint::of(&**value)
    }
}

impl InputRule for Configuration {
    fn initial(&self, _: &()) -> Result<Arc<WorkspaceConfig>, RuleError> {
        Ok(self.initial.clone())
    }
}

/// The files the editor has open or the user asked to check.
pub struct FilesOfInterest;

impl Query for FilesOfInterest {
    const KIND: RuleKind = RuleKind::FilesOfInterest;
    type Key = ();
    type Value = Arc<BTreeSet<SourcePath>>;

    fn fingerprint(value: &Self::Value) -> StrataResult<Fingerprint> {
        Fingerprint::of(&**value)
    }
}

impl InputRule for FilesOfInterest {
    fn initial(&self, _: &()) -> Result<Self::Value, RuleError> {
        Ok(Arc::default())
    }
}
