//! A small line-oriented language used by the CLI and the tests.
//!
//! Files import each other, define typed names and use them. It is enough
//! to drive every rule of the catalog: imports make a module graph, path
//! packages make sessions, and definitions make interfaces that survive
//! whitespace edits.

pub mod check;
pub mod codegen;
pub mod syntax;

use std::path::Path;

use strata_config::ResolvedUnit;
use strata_diagnostics::Diagnostic;
use strata_source::SourceFile;

use crate::frontend::{Checked, Frontend, ImportDecl, ParsedFile, ResolvedImports, SessionEnv};
pub use check::{LiteInterface, LiteModule, LiteSession};
pub use codegen::{LiteBytecode, LiteCore};
pub use syntax::{Item, LiteAst, LiteType};

/// Diagnostic codes of the lite front-end.
pub mod codes {
    use strata_diagnostics::{Category, DiagnosticCode};

    /// A line starts with an unknown word.
    pub const UNKNOWN_DIRECTIVE: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 1);
    /// `import` without a quoted path.
    pub const MALFORMED_IMPORT: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 2);
    /// `def` without a name or a known type.
    pub const MALFORMED_DEF: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 3);
    /// `use` without a name.
    pub const MALFORMED_USE: DiagnosticCode = DiagnosticCode::new(Category::Syntax, 4);

    /// A name defined twice in one file.
    pub const DUPLICATE_DEF: DiagnosticCode = DiagnosticCode::new(Category::Type, 1);
    /// A use of a name defined nowhere visible.
    pub const UNKNOWN_NAME: DiagnosticCode = DiagnosticCode::new(Category::Type, 2);
}

/// The lite front-end.
#[derive(Debug, Clone, Copy, Default)]
pub struct Lite;

impl Frontend for Lite {
    type Ast = LiteAst;
    type Session = LiteSession;
    type Module = LiteModule;
    type Interface = LiteInterface;
    type Core = LiteCore;
    type Bytecode = LiteBytecode;

    fn parse(&self, file: &SourceFile) -> Result<LiteAst, Vec<Diagnostic>> {
        syntax::parse(file)
    }

    fn imports(&self, ast: &LiteAst) -> Vec<ImportDecl> {
        ast.items
            .iter()
            .filter_map(|item| match item {
                Item::Import { target, span } => Some(ImportDecl {
                    target: target.clone(),
                    span: *span,
                }),
                _ => None,
            })
            .collect()
    }

    fn load_session(&self, root: &Path, unit: &ResolvedUnit) -> Result<LiteSession, String> {
        check::load_session(root, unit)
    }

    fn typecheck(
        &self,
        env: &SessionEnv<LiteSession, LiteInterface>,
        file: &ParsedFile<LiteAst>,
        imports: &ResolvedImports,
    ) -> Result<Checked<LiteModule>, Vec<Diagnostic>> {
        check::typecheck(env, &file.source.path, &file.ast, imports)
    }

    fn interface(&self, module: &LiteModule) -> LiteInterface {
        check::interface(module)
    }

    fn lower(&self, module: &LiteModule) -> Result<LiteCore, Vec<Diagnostic>> {
        Ok(codegen::lower(module))
    }

    fn codegen(&self, core: &LiteCore) -> LiteBytecode {
        codegen::codegen(core)
    }
}
