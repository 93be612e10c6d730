//! Reference backend: records the emitted control-flow graph in memory.

use super::{ArithOp, Backend, BlockId, CmpOp, FuncId, SlotId, Ty, ValueId};

#[derive(Debug)]
pub struct Module {
    pub name: String,
    pub funcs: Vec<Function>,
    pub blocks: Vec<Block>,
    pub slots: Vec<SlotInfo>,
    values: Vec<Ty>,
    point: Option<BlockId>,
}

#[derive(Debug)]
pub struct Function {
    pub name: String,
    pub params: Vec<Ty>,
    pub ret: Ty,
    pub external: bool,
    pub blocks: Vec<BlockId>,
    pub args: Vec<ValueId>,
}

#[derive(Debug)]
pub struct SlotInfo {
    pub func: FuncId,
    pub ty: Ty,
    pub name: String,
}

#[derive(Debug)]
pub struct Block {
    pub label: String,
    pub func: FuncId,
    pub instrs: Vec<Instr>,
    pub term: Option<Terminator>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    Const {
        dst: ValueId,
        width: u32,
        value: i64,
    },
    Load {
        dst: ValueId,
        slot: SlotId,
    },
    Store {
        slot: SlotId,
        value: ValueId,
    },
    Arith {
        dst: ValueId,
        op: ArithOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    Compare {
        dst: ValueId,
        op: CmpOp,
        lhs: ValueId,
        rhs: ValueId,
    },
    Cast {
        dst: ValueId,
        value: ValueId,
        width: u32,
    },
    Addr {
        dst: ValueId,
        slot: SlotId,
    },
    Call {
        dst: ValueId,
        func: FuncId,
        args: Vec<ValueId>,
    },
    Merge {
        dst: ValueId,
        incoming: Vec<(ValueId, BlockId)>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Terminator {
    Branch(BlockId),
    CondBranch {
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },
    Return(Option<ValueId>),
}

impl Module {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            funcs: Vec::new(),
            blocks: Vec::new(),
            slots: Vec::new(),
            values: Vec::new(),
            point: None,
        }
    }

    pub fn find_func(&self, name: &str) -> Option<FuncId> {
        self.funcs.iter().position(|f| f.name == name).map(FuncId)
    }

    pub fn value_ty(&self, value: ValueId) -> Ty {
        self.values[value.0]
    }

    fn new_value(&mut self, ty: Ty) -> ValueId {
        let id = ValueId(self.values.len());
        self.values.push(ty);
        id
    }

    fn push(&mut self, instr: Instr) {
        let point = self.insertion_point();
        let block = &mut self.blocks[point.0];
        // Instructions after a terminator are unreachable; drop them.
        if block.term.is_none() {
            block.instrs.push(instr);
        }
    }

    fn terminate(&mut self, term: Terminator) {
        let point = self.insertion_point();
        let block = &mut self.blocks[point.0];
        if block.term.is_none() {
            block.term = Some(term);
        }
    }

    /// Check that every block of every defined function ends in exactly one
    /// terminator.
    pub fn validate(&self) -> Result<(), String> {
        for (i, func) in self.funcs.iter().enumerate() {
            if func.external {
                continue;
            }
            if func.blocks.is_empty() {
                return Err(format!("function '{}' has no blocks", func.name));
            }
            for &block_id in &func.blocks {
                let block = &self.blocks[block_id.0];
                if block.term.is_none() {
                    return Err(format!(
                        "block '{}' in function '{}' ({}) has no terminator",
                        block.label, func.name, i
                    ));
                }
            }
        }
        Ok(())
    }

    fn label(&self, block: BlockId) -> &str {
        &self.blocks[block.0].label
    }

    /// Textual dump of the whole module, one line per entry.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for (fi, func) in self.funcs.iter().enumerate() {
            let params = func
                .params
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            if func.external {
                lines.push(format!("EXTERN {}({})", func.name, params));
                continue;
            }
            lines.push(format!("FUNC {}({}) -> {}", func.name, params, func.ret));
            for (si, slot) in self.slots.iter().enumerate() {
                if slot.func.0 == fi {
                    lines.push(format!("  s{} = slot {} {}", si, slot.ty, slot.name));
                }
            }
            for &block_id in &func.blocks {
                let block = &self.blocks[block_id.0];
                lines.push(format!("{}:", block.label));
                for instr in &block.instrs {
                    lines.push(format!("  {}", self.format_instr(instr)));
                }
                match &block.term {
                    Some(Terminator::Branch(t)) => {
                        lines.push(format!("  br {}", self.label(*t)));
                    }
                    Some(Terminator::CondBranch {
                        cond,
                        then_block,
                        else_block,
                    }) => {
                        lines.push(format!(
                            "  cbr v{}, {}, {}",
                            cond.0,
                            self.label(*then_block),
                            self.label(*else_block)
                        ));
                    }
                    Some(Terminator::Return(Some(v))) => lines.push(format!("  ret v{}", v.0)),
                    Some(Terminator::Return(None)) => lines.push("  ret".to_string()),
                    None => lines.push("  <no terminator>".to_string()),
                }
            }
        }
        lines
    }

    fn format_instr(&self, instr: &Instr) -> String {
        match instr {
            Instr::Const { dst, width, value } => {
                format!("v{} = const i{} {}", dst.0, width, value)
            }
            Instr::Load { dst, slot } => format!("v{} = load s{}", dst.0, slot.0),
            Instr::Store { slot, value } => format!("store s{}, v{}", slot.0, value.0),
            Instr::Arith { dst, op, lhs, rhs } => {
                format!("v{} = {} v{}, v{}", dst.0, op, lhs.0, rhs.0)
            }
            Instr::Compare { dst, op, lhs, rhs } => {
                format!("v{} = cmp.{} v{}, v{}", dst.0, op, lhs.0, rhs.0)
            }
            Instr::Cast { dst, value, width } => {
                format!("v{} = cast i{} v{}", dst.0, width, value.0)
            }
            Instr::Addr { dst, slot } => format!("v{} = addr s{}", dst.0, slot.0),
            Instr::Call { dst, func, args } => {
                let args = args
                    .iter()
                    .map(|a| format!("v{}", a.0))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("v{} = call {}({})", dst.0, self.funcs[func.0].name, args)
            }
            Instr::Merge { dst, incoming } => {
                let incoming = incoming
                    .iter()
                    .map(|(v, b)| format!("v{}: {}", v.0, self.label(*b)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("v{} = merge [{}]", dst.0, incoming)
            }
        }
    }
}

impl Backend for Module {
    fn declare_function(&mut self, name: &str, params: &[Ty], ret: Ty, external: bool) -> FuncId {
        let id = FuncId(self.funcs.len());
        let args = params.iter().map(|t| self.new_value(*t)).collect();
        self.funcs.push(Function {
            name: name.to_string(),
            params: params.to_vec(),
            ret,
            external,
            blocks: Vec::new(),
            args,
        });
        id
    }

    fn begin_block(&mut self, func: FuncId, label: &str) -> BlockId {
        let id = BlockId(self.blocks.len());
        self.blocks.push(Block {
            label: format!("{}{}", label, id.0),
            func,
            instrs: Vec::new(),
            term: None,
        });
        self.funcs[func.0].blocks.push(id);
        id
    }

    fn set_insertion_point(&mut self, block: BlockId) {
        self.point = Some(block);
    }

    fn insertion_point(&self) -> BlockId {
        self.point.expect("insertion point not set")
    }

    fn arg_value(&self, func: FuncId, index: usize) -> ValueId {
        self.funcs[func.0].args[index]
    }

    fn emit_constant(&mut self, width: u32, value: i64) -> ValueId {
        let dst = self.new_value(Ty::Int(width));
        self.push(Instr::Const { dst, width, value });
        dst
    }

    fn emit_alloca(&mut self, func: FuncId, ty: Ty, name: &str) -> SlotId {
        let id = SlotId(self.slots.len());
        self.slots.push(SlotInfo {
            func,
            ty,
            name: name.to_string(),
        });
        id
    }

    fn emit_load(&mut self, slot: SlotId) -> ValueId {
        let dst = self.new_value(self.slots[slot.0].ty);
        self.push(Instr::Load { dst, slot });
        dst
    }

    fn emit_store(&mut self, slot: SlotId, value: ValueId) {
        self.push(Instr::Store { slot, value });
    }

    fn emit_arith(&mut self, op: ArithOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dst = self.new_value(self.value_ty(lhs));
        self.push(Instr::Arith { dst, op, lhs, rhs });
        dst
    }

    fn emit_compare(&mut self, op: CmpOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let dst = self.new_value(Ty::BOOL);
        self.push(Instr::Compare { dst, op, lhs, rhs });
        dst
    }

    fn emit_cast(&mut self, value: ValueId, width: u32) -> ValueId {
        let dst = self.new_value(Ty::Int(width));
        self.push(Instr::Cast { dst, value, width });
        dst
    }

    fn emit_addr(&mut self, slot: SlotId) -> ValueId {
        let dst = self.new_value(Ty::Ptr);
        self.push(Instr::Addr { dst, slot });
        dst
    }

    fn emit_call(&mut self, func: FuncId, args: &[ValueId]) -> ValueId {
        let dst = self.new_value(self.funcs[func.0].ret);
        self.push(Instr::Call {
            dst,
            func,
            args: args.to_vec(),
        });
        dst
    }

    fn emit_cond_branch(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) {
        self.terminate(Terminator::CondBranch {
            cond,
            then_block,
            else_block,
        });
    }

    fn emit_branch(&mut self, target: BlockId) {
        self.terminate(Terminator::Branch(target));
    }

    fn emit_merge(&mut self, incoming: &[(ValueId, BlockId)]) -> ValueId {
        let ty = incoming
            .first()
            .map(|(v, _)| self.value_ty(*v))
            .unwrap_or(Ty::I32);
        let dst = self.new_value(ty);
        self.push(Instr::Merge {
            dst,
            incoming: incoming.to_vec(),
        });
        dst
    }

    fn emit_return(&mut self, value: Option<ValueId>) {
        self.terminate(Terminator::Return(value));
    }
}
