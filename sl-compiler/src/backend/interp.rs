//! Reference interpreter for recorded control-flow graphs.
//!
//! Stands in for the native backend's in-memory execution: values are
//! signed integers sign-extended to their declared bit width after every
//! operation, slots are zero-initialized, and a `merge` selects its value
//! by the predecessor block control arrived from.

use super::cfg::{Instr, Module, Terminator};
use super::{ArithOp, BlockId, CmpOp, FuncId, SlotId, Ty, ValueId};
use std::collections::HashMap;
use thiserror::Error;

const MAX_CALL_DEPTH: usize = 512;

#[derive(Error, Debug)]
pub enum RunError {
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("call to unresolved external function '{0}'")]
    UnresolvedExtern(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("use of a value from a branch that was never taken")]
    UndefinedValue,

    #[error("call depth limit exceeded")]
    StackOverflow,

    #[error("malformed graph: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Cell {
    Int(i64),
    Addr(SlotId),
}

pub struct Interp<'m> {
    module: &'m Module,
}

impl<'m> Interp<'m> {
    pub fn new(module: &'m Module) -> Self {
        Self { module }
    }

    /// Run a named function with integer arguments and return its integer
    /// result.
    pub fn run(&self, name: &str, args: &[i64]) -> Result<i64, RunError> {
        let func = self
            .module
            .find_func(name)
            .ok_or_else(|| RunError::UnknownFunction(name.to_string()))?;
        let cells: Vec<Cell> = args.iter().map(|&a| Cell::Int(a)).collect();
        match self.call(func, &cells, 0)? {
            Cell::Int(v) => Ok(v),
            Cell::Addr(_) => Err(RunError::Malformed(
                "function returned an address".to_string(),
            )),
        }
    }

    fn call(&self, func: FuncId, args: &[Cell], depth: usize) -> Result<Cell, RunError> {
        if depth > MAX_CALL_DEPTH {
            return Err(RunError::StackOverflow);
        }
        let f = &self.module.funcs[func.0];
        if f.external {
            return Err(RunError::UnresolvedExtern(f.name.clone()));
        }
        if args.len() != f.params.len() {
            return Err(RunError::Malformed(format!(
                "call to '{}' with {} arguments, expected {}",
                f.name,
                args.len(),
                f.params.len()
            )));
        }

        let mut regs: HashMap<ValueId, Cell> = HashMap::new();
        let mut slots: HashMap<SlotId, Cell> = HashMap::new();
        for (i, (&arg, &ty)) in args.iter().zip(&f.params).enumerate() {
            regs.insert(f.args[i], narrow(arg, ty)?);
        }

        let mut block = *f
            .blocks
            .first()
            .ok_or_else(|| RunError::Malformed(format!("function '{}' has no body", f.name)))?;
        let mut prev: Option<BlockId> = None;

        loop {
            let b = &self.module.blocks[block.0];
            for instr in &b.instrs {
                self.exec(instr, &mut regs, &mut slots, prev, depth)?;
            }
            match &b.term {
                None => {
                    return Err(RunError::Malformed(format!(
                        "block '{}' has no terminator",
                        b.label
                    )))
                }
                Some(Terminator::Branch(t)) => {
                    prev = Some(block);
                    block = *t;
                }
                Some(Terminator::CondBranch {
                    cond,
                    then_block,
                    else_block,
                }) => {
                    let taken = match get(&regs, *cond)? {
                        Cell::Int(v) => v != 0,
                        Cell::Addr(_) => {
                            return Err(RunError::Malformed(
                                "branch on an address value".to_string(),
                            ))
                        }
                    };
                    prev = Some(block);
                    block = if taken { *then_block } else { *else_block };
                }
                Some(Terminator::Return(v)) => {
                    return match v {
                        Some(v) => get(&regs, *v),
                        None => Ok(Cell::Int(0)),
                    };
                }
            }
        }
    }

    fn exec(
        &self,
        instr: &Instr,
        regs: &mut HashMap<ValueId, Cell>,
        slots: &mut HashMap<SlotId, Cell>,
        prev: Option<BlockId>,
        depth: usize,
    ) -> Result<(), RunError> {
        match instr {
            Instr::Const { dst, width, value } => {
                regs.insert(*dst, Cell::Int(sign_extend(*value, *width)));
            }
            Instr::Load { dst, slot } => {
                let cell = slots.get(slot).copied().unwrap_or(Cell::Int(0));
                regs.insert(*dst, cell);
            }
            Instr::Store { slot, value } => {
                let cell = get(regs, *value)?;
                slots.insert(*slot, cell);
            }
            Instr::Arith { dst, op, lhs, rhs } => {
                let a = int(get(regs, *lhs)?)?;
                let b = int(get(regs, *rhs)?)?;
                let raw = match op {
                    ArithOp::Add => a.wrapping_add(b),
                    ArithOp::Sub => a.wrapping_sub(b),
                    ArithOp::Mul => a.wrapping_mul(b),
                    ArithOp::Div => {
                        if b == 0 {
                            return Err(RunError::DivisionByZero);
                        }
                        a.wrapping_div(b)
                    }
                    ArithOp::Rem => {
                        if b == 0 {
                            return Err(RunError::DivisionByZero);
                        }
                        a.wrapping_rem(b)
                    }
                    ArithOp::And => a & b,
                    ArithOp::Or => a | b,
                };
                let width = int_width(self.module.value_ty(*dst))?;
                regs.insert(*dst, Cell::Int(sign_extend(raw, width)));
            }
            Instr::Compare { dst, op, lhs, rhs } => {
                let a = int(get(regs, *lhs)?)?;
                let b = int(get(regs, *rhs)?)?;
                let result = match op {
                    CmpOp::Eq => a == b,
                    CmpOp::Ne => a != b,
                    CmpOp::Lt => a < b,
                    CmpOp::Gt => a > b,
                    CmpOp::Le => a <= b,
                    CmpOp::Ge => a >= b,
                };
                regs.insert(*dst, Cell::Int(result as i64));
            }
            Instr::Cast { dst, value, width } => {
                let v = int(get(regs, *value)?)?;
                regs.insert(*dst, Cell::Int(sign_extend(v, *width)));
            }
            Instr::Addr { dst, slot } => {
                regs.insert(*dst, Cell::Addr(*slot));
            }
            Instr::Call { dst, func, args } => {
                let mut cells = Vec::with_capacity(args.len());
                for &a in args {
                    cells.push(get(regs, a)?);
                }
                let result = self.call(*func, &cells, depth + 1)?;
                regs.insert(*dst, result);
            }
            Instr::Merge { dst, incoming } => {
                let prev = prev.ok_or_else(|| {
                    RunError::Malformed("merge in a block with no predecessor".to_string())
                })?;
                let (value, _) = incoming.iter().find(|(_, b)| *b == prev).ok_or_else(|| {
                    RunError::Malformed("merge has no incoming value for predecessor".to_string())
                })?;
                let cell = get(regs, *value)?;
                regs.insert(*dst, cell);
            }
        }
        Ok(())
    }
}

fn get(regs: &HashMap<ValueId, Cell>, value: ValueId) -> Result<Cell, RunError> {
    regs.get(&value).copied().ok_or(RunError::UndefinedValue)
}

fn int(cell: Cell) -> Result<i64, RunError> {
    match cell {
        Cell::Int(v) => Ok(v),
        Cell::Addr(_) => Err(RunError::Malformed(
            "arithmetic on an address value".to_string(),
        )),
    }
}

fn int_width(ty: Ty) -> Result<u32, RunError> {
    match ty {
        Ty::Int(w) => Ok(w),
        Ty::Ptr => Err(RunError::Malformed(
            "arithmetic result typed as an address".to_string(),
        )),
    }
}

fn narrow(cell: Cell, ty: Ty) -> Result<Cell, RunError> {
    match (cell, ty) {
        (Cell::Int(v), Ty::Int(w)) => Ok(Cell::Int(sign_extend(v, w))),
        (cell, Ty::Ptr) => Ok(cell),
        (Cell::Addr(_), Ty::Int(_)) => Err(RunError::Malformed(
            "address passed for an integer parameter".to_string(),
        )),
    }
}

/// Truncate to `width` bits, then sign-extend back to i64. Width-1 values
/// are booleans and stay 0/1.
fn sign_extend(value: i64, width: u32) -> i64 {
    if width >= 64 {
        return value;
    }
    if width == 1 {
        return value & 1;
    }
    let mask = (u64::MAX >> (64 - width)) as i64;
    let sign = 1i64 << (width - 1);
    let x = value & mask;
    if x & sign != 0 {
        x | !mask
    } else {
        x
    }
}
