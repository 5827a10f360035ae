//! Diagnostic codes with category prefixes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic code, determining its prefix letter.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Syntax errors, prefixed with `S`.
    Syntax,
    /// Import resolution and import cycles, prefixed with `I`.
    Import,
    /// Type checking, prefixed with `T`.
    Type,
    /// Compiler session construction, prefixed with `C`.
    Session,
    /// Unreadable or missing files, prefixed with `F`.
    File,
    /// Internal errors in the engine or a rule, prefixed with `X`.
    Internal,
}

impl Category {
    /// Returns the single-character prefix for this category.
    pub fn prefix(self) -> char {
        match self {
            Category::Syntax => 'S',
            Category::Import => 'I',
            Category::Type => 'T',
            Category::Session => 'C',
            Category::File => 'F',
            Category::Internal => 'X',
        }
    }
}

/// A category prefix plus a numeric identifier, displayed as e.g. `I002`.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The category of this diagnostic.
    pub category: Category,
    /// The numeric identifier within the category.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        assert_eq!(DiagnosticCode::new(Category::Import, 2).to_string(), "I002");
        assert_eq!(DiagnosticCode::new(Category::Type, 101).to_string(), "T101");
        assert_eq!(DiagnosticCode::new(Category::Internal, 1).to_string(), "X001");
    }

    #[test]
    fn serde_roundtrip() {
        let code = DiagnosticCode::new(Category::Syntax, 1);
        let json = serde_json::to_string(&code).unwrap();
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
