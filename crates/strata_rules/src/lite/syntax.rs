//! Line-oriented parser for lite sources.
//!
//! Every non-blank line holds one directive:
//!
//! ```text
//! import "util.src"   # a file, relative to this one or a source root
//! def count: int      # a definition of type int, bool or str
//! use count           # a reference to a definition
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

use strata_diagnostics::Diagnostic;
use strata_source::{SourceFile, Span};

use super::codes;

/// The types of lite definitions.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum LiteType {
    /// Integers.
    Int,
    /// Booleans.
    Bool,
    /// Strings.
    Str,
}

impl LiteType {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "int" => Some(LiteType::Int),
            "bool" => Some(LiteType::Bool),
            "str" => Some(LiteType::Str),
            _ => None,
        }
    }

    /// A one-byte tag for the type.
    pub fn tag(self) -> u8 {
        match self {
            LiteType::Int => 1,
            LiteType::Bool => 2,
            LiteType::Str => 3,
        }
    }
}

impl fmt::Display for LiteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LiteType::Int => "int",
            LiteType::Bool => "bool",
            LiteType::Str => "str",
        })
    }
}

/// One directive.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub enum Item {
    /// `import "target"`.
    Import {
        /// The quoted path.
        target: String,
        /// The whole directive.
        span: Span,
    },
    /// `def name: type`.
    Def {
        /// The defined name.
        name: String,
        /// Its type.
        ty: LiteType,
        /// The name.
        span: Span,
    },
    /// `use name`.
    Use {
        /// The referenced name.
        name: String,
        /// The name.
        span: Span,
    },
}

/// A parsed lite file.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct LiteAst {
    /// Directives in source order.
    pub items: Vec<Item>,
}

/// Parses `file`, collecting every malformed line.
pub fn parse(file: &SourceFile) -> Result<LiteAst, Vec<Diagnostic>> {
    let mut ast = LiteAst::default();
    let mut errors = Vec::new();
    let mut offset = 0usize;

    for raw in file.text.split_inclusive('\n') {
        let line_start = offset;
        offset += raw.len();

        let code = strip_comment(raw);
        let trimmed = code.trim_start();
        let start = line_start + (code.len() - trimmed.len());
        let trimmed = trimmed.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        let line_span = span(start, start + trimmed.len());

        let (keyword, rest) = match trimmed.find(char::is_whitespace) {
            Some(at) => (&trimmed[..at], &trimmed[at..]),
            None => (trimmed, ""),
        };
        // Offset of `rest` once its leading whitespace is dropped.
        let rest_start = start + keyword.len() + (rest.len() - rest.trim_start().len());
        let rest = rest.trim();

        match keyword {
            "import" => match parse_quoted(rest) {
                Some(target) if !target.is_empty() => ast.items.push(Item::Import {
                    target: target.to_string(),
                    span: line_span,
                }),
                _ => errors.push(
                    Diagnostic::error(
                        file.path.clone(),
                        codes::MALFORMED_IMPORT,
                        "expected a quoted path after `import`",
                    )
                    .at(line_span),
                ),
            },
            "def" => match parse_def(rest) {
                Some((name, ty)) => ast.items.push(Item::Def {
                    name: name.to_string(),
                    ty,
                    span: span(rest_start, rest_start + name.len()),
                }),
                None => errors.push(
                    Diagnostic::error(
                        file.path.clone(),
                        codes::MALFORMED_DEF,
                        "expected `def <name>: int|bool|str`",
                    )
                    .at(line_span),
                ),
            },
            "use" => {
                if is_ident(rest) {
                    ast.items.push(Item::Use {
                        name: rest.to_string(),
                        span: span(rest_start, rest_start + rest.len()),
                    });
                } else {
                    errors.push(
                        Diagnostic::error(
                            file.path.clone(),
                            codes::MALFORMED_USE,
                            "expected `use <name>`",
                        )
                        .at(line_span),
                    );
                }
            }
            other => errors.push(
                Diagnostic::error(
                    file.path.clone(),
                    codes::UNKNOWN_DIRECTIVE,
                    format!("unknown directive `{other}`"),
                )
                .at(line_span)
                .with_note("expected `import`, `def` or `use`"),
            ),
        }
    }

    if errors.is_empty() {
        Ok(ast)
    } else {
        Err(errors)
    }
}

fn span(start: usize, end: usize) -> Span {
    Span::new(start as u32, end as u32)
}

/// Drops a `#` comment, ignoring `#` inside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quoted = false;
    for (i, c) in line.char_indices() {
        match c {
            '"' => quoted = !quoted,
            '#' if !quoted => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_quoted(s: &str) -> Option<&str> {
    s.strip_prefix('"')?.strip_suffix('"').filter(|t| !t.contains('"'))
}

fn parse_def(s: &str) -> Option<(&str, LiteType)> {
    let (name, ty) = s.split_once(':')?;
    let name = name.trim_end();
    if !is_ident(name) {
        return None;
    }
    Some((name, LiteType::from_name(ty.trim())?))
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
