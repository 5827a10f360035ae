//! Byte-offset ranges within source files.

use serde::{Deserialize, Serialize};

/// A byte offset range within a source file.
///
/// The `start` is inclusive and `end` is exclusive. Spans do not name their
/// file; the owning diagnostic or syntax node does.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of the start of the span (inclusive).
    pub start: u32,
    /// Byte offset of the end of the span (exclusive).
    pub end: u32,
}

impl Span {
    /// Creates a new span with the given byte range.
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Produces a span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Returns the length of this span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Returns `true` if this span has zero length.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_order_independent() {
        let a = Span::new(5, 15);
        let b = Span::new(10, 25);
        assert_eq!(a.merge(b), Span::new(5, 25));
        assert_eq!(a.merge(b), b.merge(a));
    }

    #[test]
    fn len_and_empty() {
        assert_eq!(Span::new(10, 20).len(), 10);
        assert!(Span::new(5, 5).is_empty());
    }

    #[test]
    fn serde_roundtrip() {
        let s = Span::new(10, 20);
        let json = serde_json::to_string(&s).unwrap();
        let back: Span = serde_json::from_str(&json).unwrap();
        assert_eq!(s, back);
    }
}
