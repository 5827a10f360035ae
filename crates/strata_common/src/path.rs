//! Normalized source paths used as rule keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A normalized, cheaply clonable path identifying a source file.
///
/// Normalization is purely lexical: separators become `/`, `.` components are
/// dropped and `..` pops the previous component. Two spellings of the same
/// file therefore compare equal and hash identically, which is what the rule
/// cache keys on.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePath(Arc<str>);

impl SourcePath {
    /// Creates a normalized path.
    pub fn new(path: impl AsRef<Path>) -> Self {
        let raw = path.as_ref().to_string_lossy().replace('\\', "/");
        let absolute = raw.starts_with('/');
        let mut parts: Vec<&str> = Vec::new();
        for part in raw.split('/') {
            match part {
                "" | "." => {}
                ".." => {
                    if matches!(parts.last(), Some(last) if *last != "..") {
                        parts.pop();
                    } else if !absolute {
                        parts.push("..");
                    }
                }
                other => parts.push(other),
            }
        }
        let joined = parts.join("/");
        let normalized = if absolute { format!("/{joined}") } else { joined };
        Self(normalized.into())
    }

    /// Returns the normalized path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the path as a [`Path`].
    pub fn as_path(&self) -> &Path {
        Path::new(&*self.0)
    }

    /// Returns an owned [`PathBuf`].
    pub fn to_path_buf(&self) -> PathBuf {
        PathBuf::from(&*self.0)
    }

    /// Returns the directory containing this file, or an empty path at the root.
    pub fn parent(&self) -> SourcePath {
        match self.0.rfind('/') {
            Some(0) => SourcePath("/".into()),
            Some(idx) => SourcePath(self.0[..idx].into()),
            None => SourcePath("".into()),
        }
    }

    /// Resolves `relative` against the directory containing this file.
    pub fn sibling(&self, relative: &str) -> SourcePath {
        if relative.starts_with('/') {
            return SourcePath::new(relative);
        }
        let parent = self.parent();
        if parent.0.is_empty() {
            SourcePath::new(relative)
        } else {
            SourcePath::new(format!("{}/{relative}", parent.0))
        }
    }

    /// Returns the final component of the path.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Returns the file extension, if any.
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name();
        name.rfind('.').filter(|&idx| idx > 0).map(|idx| &name[idx + 1..])
    }

    /// Returns `true` if this path lies under `root`.
    pub fn starts_with(&self, root: &SourcePath) -> bool {
        if root.0.is_empty() {
            return !self.0.starts_with('/');
        }
        self.0 == root.0
            || (self.0.starts_with(&*root.0) && self.0[root.0.len()..].starts_with('/'))
    }
}

impl fmt::Display for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SourcePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &*self.0)
    }
}

impl From<&str> for SourcePath {
    fn from(value: &str) -> Self {
        SourcePath::new(value)
    }
}

impl From<&Path> for SourcePath {
    fn from(value: &Path) -> Self {
        SourcePath::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_dots_and_separators() {
        assert_eq!(SourcePath::new("src/./a.src").as_str(), "src/a.src");
        assert_eq!(SourcePath::new("src/lib/../a.src").as_str(), "src/a.src");
        assert_eq!(SourcePath::new("src\\a.src").as_str(), "src/a.src");
        assert_eq!(SourcePath::new("/ws//src/a.src").as_str(), "/ws/src/a.src");
    }

    #[test]
    fn leading_parent_kept_for_relative_paths() {
        assert_eq!(SourcePath::new("../lib/a.src").as_str(), "../lib/a.src");
        assert_eq!(SourcePath::new("/../a.src").as_str(), "/a.src");
    }

    #[test]
    fn equal_spellings_are_equal_keys() {
        assert_eq!(SourcePath::new("a/b/../c.src"), SourcePath::new("a/c.src"));
    }

    #[test]
    fn sibling_resolution() {
        let p = SourcePath::new("src/b.src");
        assert_eq!(p.sibling("a.src").as_str(), "src/a.src");
        assert_eq!(p.sibling("../lib/c.src").as_str(), "lib/c.src");
        assert_eq!(SourcePath::new("b.src").sibling("a.src").as_str(), "a.src");
        assert_eq!(p.sibling("/abs/x.src").as_str(), "/abs/x.src");
    }

    #[test]
    fn name_and_extension() {
        let p = SourcePath::new("src/mod.test.src");
        assert_eq!(p.file_name(), "mod.test.src");
        assert_eq!(p.extension(), Some("src"));
        assert_eq!(SourcePath::new(".hidden").extension(), None);
    }

    #[test]
    fn starts_with_respects_component_boundaries() {
        let root = SourcePath::new("src");
        assert!(SourcePath::new("src/a.src").starts_with(&root));
        assert!(!SourcePath::new("srcs/a.src").starts_with(&root));
    }
}
