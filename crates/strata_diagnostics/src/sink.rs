//! Thread-safe per-file diagnostic store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use strata_common::SourcePath;

use crate::diagnostic::Diagnostic;

/// Keeps the most recently published diagnostics of every file.
///
/// Publishing for a file replaces whatever was published for it before, the
/// way an editor replaces a file's squiggles. Many workers may publish
/// concurrently.
pub struct DiagnosticSink {
    by_file: Mutex<BTreeMap<SourcePath, Vec<Diagnostic>>>,
    publish_count: AtomicUsize,
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            by_file: Mutex::new(BTreeMap::new()),
            publish_count: AtomicUsize::new(0),
        }
    }

    /// Replaces the diagnostics of `path`.
    pub fn publish(&self, path: SourcePath, diagnostics: Vec<Diagnostic>) {
        self.publish_count.fetch_add(1, Ordering::Relaxed);
        let mut by_file = self.by_file.lock();
        if diagnostics.is_empty() {
            by_file.remove(&path);
        } else {
            by_file.insert(path, diagnostics);
        }
    }

    /// Forgets the diagnostics of `path`.
    pub fn clear(&self, path: &SourcePath) {
        self.by_file.lock().remove(path);
    }

    /// Returns the diagnostics currently published for `path`.
    pub fn for_file(&self, path: &SourcePath) -> Vec<Diagnostic> {
        self.by_file.lock().get(path).cloned().unwrap_or_default()
    }

    /// Returns every published diagnostic, ordered by file.
    pub fn all(&self) -> Vec<Diagnostic> {
        self.by_file.lock().values().flatten().cloned().collect()
    }

    /// Returns the number of error-severity diagnostics across all files.
    pub fn error_count(&self) -> usize {
        self.by_file
            .lock()
            .values()
            .flatten()
            .filter(|d| d.is_error())
            .count()
    }

    /// Returns `true` if any file has an error.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Returns how many times [`publish`](Self::publish) has been called.
    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::Relaxed)
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}
