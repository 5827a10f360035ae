//! Source text with line-start indexing for fast line/column lookup.

use std::fmt;
use std::sync::Arc;

use strata_common::{Fingerprint, SourcePath};

use crate::span::Span;

/// A 1-indexed line/column position.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LineCol {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number in bytes (1-indexed).
    pub col: u32,
}

impl fmt::Display for LineCol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A source file's text plus a precomputed line index.
#[derive(Clone, Debug)]
pub struct SourceFile {
    /// The normalized path of this file.
    pub path: SourcePath,
    /// The full text content of the file.
    pub text: Arc<str>,
    /// Byte offsets of each line start (the first entry is always 0).
    line_starts: Vec<u32>,
    /// Fingerprint of the raw text.
    pub fingerprint: Fingerprint,
}

impl SourceFile {
    /// Creates a new `SourceFile` with precomputed line starts and fingerprint.
    pub fn new(path: SourcePath, text: Arc<str>) -> Self {
        let line_starts = compute_line_starts(&text);
        let fingerprint = Fingerprint::from_bytes(text.as_bytes());
        Self {
            path,
            text,
            line_starts,
            fingerprint,
        }
    }

    /// Converts a byte offset into 1-indexed line/column coordinates.
    pub fn line_col(&self, byte_offset: u32) -> LineCol {
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        LineCol {
            line: (line_idx as u32) + 1,
            col: byte_offset - self.line_starts[line_idx] + 1,
        }
    }

    /// Returns the full text of the line containing `byte_offset`, without
    /// its terminator.
    pub fn line_text(&self, byte_offset: u32) -> &str {
        let LineCol { line, .. } = self.line_col(byte_offset);
        let start = self.line_starts[line as usize - 1] as usize;
        let end = self
            .line_starts
            .get(line as usize)
            .map(|&next| next as usize)
            .unwrap_or(self.text.len());
        self.text[start..end].trim_end_matches(['\n', '\r'])
    }

    /// Returns the text covered by `span`.
    pub fn snippet(&self, span: Span) -> &str {
        &self.text[span.start as usize..span.end as usize]
    }

    /// Returns the number of lines in the file.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}

/// Computes the byte offsets of each line start in the given content.
fn compute_line_starts(content: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push((i + 1) as u32);
        }
    }
    starts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_file(content: &str) -> SourceFile {
        SourceFile::new(SourcePath::new("test.src"), content.into())
    }

    #[test]
    fn line_starts_computation() {
        let f = make_file("abc\ndef\nghi");
        assert_eq!(f.line_starts, vec![0, 4, 8]);
        assert_eq!(f.line_count(), 3);
    }

    #[test]
    fn line_col_resolution() {
        let f = make_file("abc\ndef\nghi");
        assert_eq!(f.line_col(0), LineCol { line: 1, col: 1 });
        assert_eq!(f.line_col(4), LineCol { line: 2, col: 1 });
        assert_eq!(f.line_col(5), LineCol { line: 2, col: 2 });
        assert_eq!(f.line_col(8), LineCol { line: 3, col: 1 });
    }

    #[test]
    fn line_text_strips_terminator() {
        let f = make_file("import a.src\r\nuse x\n");
        assert_eq!(f.line_text(3), "import a.src");
        assert_eq!(f.line_text(15), "use x");
    }

    #[test]
    fn snippet_extraction() {
        let f = make_file("hello world");
        assert_eq!(f.snippet(Span::new(0, 5)), "hello");
        assert_eq!(f.snippet(Span::new(6, 11)), "world");
    }

    #[test]
    fn empty_file() {
        let f = make_file("");
        assert_eq!(f.line_col(0), LineCol { line: 1, col: 1 });
        assert_eq!(f.line_text(0), "");
    }

    #[test]
    fn fingerprint_tracks_text() {
        let f = make_file("def x: int");
        assert_eq!(f.fingerprint, Fingerprint::from_bytes(b"def x: int"));
    }
}
