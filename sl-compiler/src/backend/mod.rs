//! Code-generation backend interface.
//!
//! Module layout:
//! - `cfg`    — reference backend recording a control-flow graph in memory
//! - `interp` — reference interpreter executing a recorded graph
//!
//! The codegen engine talks to any [`Backend`] through opaque handles; the
//! reference implementation in `cfg` is what the tests and the CLI use.

pub mod cfg;
pub mod interp;

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FuncId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

/// Value types: sign-extended integers of a fixed bit width, and opaque
/// slot addresses produced by `&`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ty {
    Int(u32),
    Ptr,
}

impl Ty {
    pub const BOOL: Ty = Ty::Int(1);
    pub const CHAR: Ty = Ty::Int(8);
    pub const I32: Ty = Ty::Int(32);

    /// Mangling suffix used by the operator-overload fallback.
    pub fn suffix(&self) -> String {
        match self {
            Ty::Int(w) => format!("i{}", w),
            Ty::Ptr => "p".to_string(),
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int(w) => write!(f, "i{}", w),
            Ty::Ptr => write!(f, "ptr"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithOp::Add => write!(f, "add"),
            ArithOp::Sub => write!(f, "sub"),
            ArithOp::Mul => write!(f, "mul"),
            ArithOp::Div => write!(f, "div"),
            ArithOp::Rem => write!(f, "rem"),
            ArithOp::And => write!(f, "and"),
            ArithOp::Or => write!(f, "or"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CmpOp::Eq => write!(f, "eq"),
            CmpOp::Ne => write!(f, "ne"),
            CmpOp::Lt => write!(f, "lt"),
            CmpOp::Gt => write!(f, "gt"),
            CmpOp::Le => write!(f, "le"),
            CmpOp::Ge => write!(f, "ge"),
        }
    }
}

/// Contract between the codegen engine and a native backend.
///
/// Instruction-emitting methods append to the current insertion block;
/// `emit_alloca` always places the slot in the function's entry block so
/// that storage stays live for the whole function regardless of branching.
pub trait Backend {
    fn declare_function(&mut self, name: &str, params: &[Ty], ret: Ty, external: bool) -> FuncId;

    fn begin_block(&mut self, func: FuncId, label: &str) -> BlockId;
    fn set_insertion_point(&mut self, block: BlockId);
    fn insertion_point(&self) -> BlockId;

    /// The incoming value of a declared parameter.
    fn arg_value(&self, func: FuncId, index: usize) -> ValueId;

    fn emit_constant(&mut self, width: u32, value: i64) -> ValueId;
    fn emit_alloca(&mut self, func: FuncId, ty: Ty, name: &str) -> SlotId;
    fn emit_load(&mut self, slot: SlotId) -> ValueId;
    fn emit_store(&mut self, slot: SlotId, value: ValueId);
    fn emit_arith(&mut self, op: ArithOp, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn emit_compare(&mut self, op: CmpOp, lhs: ValueId, rhs: ValueId) -> ValueId;
    fn emit_cast(&mut self, value: ValueId, width: u32) -> ValueId;
    fn emit_addr(&mut self, slot: SlotId) -> ValueId;
    fn emit_call(&mut self, func: FuncId, args: &[ValueId]) -> ValueId;

    fn emit_cond_branch(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId);
    fn emit_branch(&mut self, target: BlockId);
    /// Branch-selected merge: yields the value paired with whichever
    /// predecessor block control arrived from.
    fn emit_merge(&mut self, incoming: &[(ValueId, BlockId)]) -> ValueId;
    fn emit_return(&mut self, value: Option<ValueId>);
}
