//! Codegen engine: walks the AST and emits a control-flow graph through the
//! [`Backend`] trait.
//!
//! The engine threads all lowering state through one [`Lowerer`] value: the
//! module-level symbol table, the chain of lexical scopes (innermost last),
//! and the function currently being emitted. Loop head/exit targets live on
//! the scope that was current when the loop was entered, so `break` and
//! `continue` inside nested blocks resolve by walking the chain outward.

mod expr;

use crate::ast::Ast;
use crate::backend::{Backend, BlockId, FuncId, SlotId, Ty, ValueId};
use crate::{CompileError, TypeErrorKind};
use std::collections::HashMap;

/// Module-table entry for a declared function or extern.
#[derive(Debug, Clone)]
pub struct FuncInfo {
    pub id: FuncId,
    pub params: Vec<Ty>,
    pub ret: Ty,
}

/// A bound stack slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Slot {
    pub id: SlotId,
    pub ty: Ty,
}

/// A computed value.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RValue {
    pub id: ValueId,
    pub ty: Ty,
}

/// Result of lowering one expression.
pub(crate) enum Lowered {
    Value(RValue),
    Place(Slot),
    Func(FuncId),
    None,
}

#[derive(Default)]
struct Scope {
    locals: HashMap<String, Slot>,
    loop_head: Option<BlockId>,
    loop_exit: Option<BlockId>,
}

pub struct Lowerer<'b, B: Backend> {
    backend: &'b mut B,
    module: HashMap<String, FuncInfo>,
    scopes: Vec<Scope>,
    func: FuncId,
}

/// Lower a compilation unit: its top-level expressions become the body of a
/// synthetic `_<name>_init` function whose result is the unit's last value,
/// cast to i32 (zero when the unit yields no value).
pub fn lower_unit<B: Backend>(
    name: &str,
    ast: &Ast,
    backend: &mut B,
) -> Result<FuncId, CompileError> {
    let init = backend.declare_function(&format!("_{}_init", name), &[], Ty::I32, false);
    let entry = backend.begin_block(init, "entry");
    backend.set_insertion_point(entry);

    let mut lowerer = Lowerer {
        backend,
        module: HashMap::new(),
        scopes: vec![Scope::default()],
        func: init,
    };
    let result = lowerer.lower_ast(ast)?;
    lowerer.finish_function(result, Ty::I32)?;
    Ok(init)
}

impl<'b, B: Backend> Lowerer<'b, B> {
    pub(crate) fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub(crate) fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Resolve a name through the whole scope chain, innermost first.
    fn lookup(&self, name: &str) -> Option<Slot> {
        self.scopes
            .iter()
            .rev()
            .find_map(|s| s.locals.get(name).copied())
    }

    /// Resolve a name in the current (innermost) scope only. Plain `=` uses
    /// this, which is what makes inner-block assignments shadow instead of
    /// mutate.
    fn lookup_current(&self, name: &str) -> Option<Slot> {
        self.scopes.last().and_then(|s| s.locals.get(name).copied())
    }

    fn bind(&mut self, name: &str, slot: Slot) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.locals.insert(name.to_string(), slot);
        }
    }

    fn loop_head(&self) -> Option<BlockId> {
        self.scopes.iter().rev().find_map(|s| s.loop_head)
    }

    fn loop_exit(&self) -> Option<BlockId> {
        self.scopes.iter().rev().find_map(|s| s.loop_exit)
    }

    /// Resolve a lowered expression to a value, loading places.
    fn rvalue(&mut self, lowered: Lowered) -> Result<RValue, CompileError> {
        match lowered {
            Lowered::Value(v) => Ok(v),
            Lowered::Place(slot) => Ok(self.load(slot)),
            Lowered::Func(_) => Err(CompileError::Unsupported(
                "function values cannot be used here".to_string(),
            )),
            Lowered::None => Err(CompileError::typing(
                TypeErrorKind::ValuelessExpression,
                "expression produces no value",
            )),
        }
    }

    fn load(&mut self, slot: Slot) -> RValue {
        RValue {
            id: self.backend.emit_load(slot.id),
            ty: slot.ty,
        }
    }

    fn const_int(&mut self, width: u32, value: i64) -> RValue {
        RValue {
            id: self.backend.emit_constant(width, value),
            ty: Ty::Int(width),
        }
    }

    /// Convert a value to `ty`; only integer-to-integer conversions exist.
    fn cast(&mut self, value: RValue, ty: Ty) -> Result<RValue, CompileError> {
        self.cast_with(value, ty, TypeErrorKind::IncompatibleCast)
    }

    fn cast_with(
        &mut self,
        value: RValue,
        ty: Ty,
        on_mismatch: TypeErrorKind,
    ) -> Result<RValue, CompileError> {
        if value.ty == ty {
            return Ok(value);
        }
        match (value.ty, ty) {
            (Ty::Int(_), Ty::Int(w)) => Ok(RValue {
                id: self.backend.emit_cast(value.id, w),
                ty,
            }),
            (from, to) => Err(CompileError::typing(
                on_mismatch,
                format!("cannot convert {} to {}", from, to),
            )),
        }
    }

    /// End the current function: return its result cast to the declared
    /// return type, or zero when the body yields no value.
    fn finish_function(&mut self, result: Lowered, ret: Ty) -> Result<(), CompileError> {
        let Ty::Int(width) = ret else {
            return Err(CompileError::typing(
                TypeErrorKind::IncompatibleCast,
                "functions must return an integer",
            ));
        };
        let value = match result {
            Lowered::Value(v) => Some(v),
            Lowered::Place(slot) => Some(self.load(slot)),
            Lowered::Func(_) | Lowered::None => None,
        };
        let value = match value {
            Some(v) => self.cast(v, ret)?,
            None => self.const_int(width, 0),
        };
        self.backend.emit_return(Some(value.id));
        Ok(())
    }
}

/// Decorated name used by the operator-overload fallback, e.g. `__+_i32_p`.
pub(crate) fn mangle_operator(op: &str, args: &[Ty]) -> String {
    let mut name = format!("__{}", op);
    for ty in args {
        name.push('_');
        name.push_str(&ty.suffix());
    }
    name
}

/// Bit width of a sized-integer type name (`i8` -> 8). `None` when the name
/// is not of that shape at all. Widths too large for u32 saturate so the
/// supported-range check still reports an unknown type, not an unknown
/// function.
pub(crate) fn int_type_width(name: &str) -> Option<u32> {
    let digits = name.strip_prefix('i')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(digits.parse().unwrap_or(u32::MAX))
}
