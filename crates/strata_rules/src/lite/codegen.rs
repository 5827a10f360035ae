//! Lowering of checked lite modules and bytecode generation.

use serde::Serialize;

use super::check::{Binding, LiteModule};
use super::syntax::LiteType;

/// One statement of the lowered form.
#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub enum CoreStmt {
    /// Allocates a slot for a local definition.
    Bind {
        /// Slot index, in definition order.
        slot: u32,
        /// The definition's type.
        ty: LiteType,
    },
    /// Reads a local slot.
    Load {
        /// The slot.
        slot: u32,
    },
    /// Reads a name from another module or the prelude.
    LoadExternal {
        /// The module path, empty for prelude names.
        module: String,
        /// The name.
        name: String,
    },
}

/// A lowered lite module. Positions are gone.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct LiteCore {
    /// Statements: bindings first, then loads in use order.
    pub stmts: Vec<CoreStmt>,
}

/// Generated bytecode.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize)]
pub struct LiteBytecode(pub Vec<u8>);

const OP_BIND: u8 = 0x01;
const OP_LOAD: u8 = 0x02;
const OP_LOAD_EXTERNAL: u8 = 0x03;
const OP_END: u8 = 0xff;

/// Lowers a checked module.
pub fn lower(module: &LiteModule) -> LiteCore {
    let mut stmts = Vec::with_capacity(module.defs.len() + module.uses.len());
    for (slot, def) in module.defs.iter().enumerate() {
        stmts.push(CoreStmt::Bind {
            slot: slot as u32,
            ty: def.ty,
        });
    }
    for used in &module.uses {
        let stmt = match &used.binding {
            Binding::Local => match module.defs.iter().position(|d| d.name == used.name) {
                Some(slot) => CoreStmt::Load { slot: slot as u32 },
                None => continue,
            },
            Binding::Imported(path) => CoreStmt::LoadExternal {
                module: path.to_string(),
                name: used.name.clone(),
            },
            Binding::Prelude => CoreStmt::LoadExternal {
                module: String::new(),
                name: used.name.clone(),
            },
        };
        stmts.push(stmt);
    }
    LiteCore { stmts }
}

/// Encodes lowered statements as a byte stream ending in `OP_END`.
pub fn codegen(core: &LiteCore) -> LiteBytecode {
    let mut out = Vec::new();
    for stmt in &core.stmts {
        match stmt {
            CoreStmt::Bind { slot, ty } => {
                out.push(OP_BIND);
                out.extend_from_slice(&slot.to_le_bytes());
                out.push(ty.tag());
            }
            CoreStmt::Load { slot } => {
                out.push(OP_LOAD);
                out.extend_from_slice(&slot.to_le_bytes());
            }
            CoreStmt::LoadExternal { module, name } => {
                out.push(OP_LOAD_EXTERNAL);
                write_str(&mut out, module);
                write_str(&mut out, name);
            }
        }
    }
    out.push(OP_END);
    LiteBytecode(out)
}

fn write_str(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}
