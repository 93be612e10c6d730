//! Per-construct lowering rules.

use super::{int_type_width, mangle_operator, FuncInfo, Lowered, Lowerer, RValue, Slot};
use crate::ast::{AssignOp, Ast, BinOp, Expr, Param, UnOp};
use crate::backend::{ArithOp, Backend, BlockId, CmpOp, Ty};
use crate::{CompileError, ResolveErrorKind, TypeErrorKind};

fn arith_op(op: BinOp) -> Option<ArithOp> {
    Some(match op {
        BinOp::Add => ArithOp::Add,
        BinOp::Sub => ArithOp::Sub,
        BinOp::Mul => ArithOp::Mul,
        BinOp::Div => ArithOp::Div,
        BinOp::Rem => ArithOp::Rem,
        BinOp::And => ArithOp::And,
        BinOp::Or => ArithOp::Or,
        _ => return None,
    })
}

fn cmp_op(op: BinOp) -> Option<CmpOp> {
    Some(match op {
        BinOp::Eq => CmpOp::Eq,
        BinOp::Ne => CmpOp::Ne,
        BinOp::Lt => CmpOp::Lt,
        BinOp::Gt => CmpOp::Gt,
        BinOp::Le => CmpOp::Le,
        BinOp::Ge => CmpOp::Ge,
        _ => return None,
    })
}

impl<'b, B: Backend> Lowerer<'b, B> {
    /// Lower the members of a block in order; the last member's result is
    /// the block's result.
    pub(crate) fn lower_ast(&mut self, ast: &Ast) -> Result<Lowered, CompileError> {
        let mut last = Lowered::None;
        for expr in &ast.exprs {
            last = self.lower_expr(expr)?;
        }
        Ok(last)
    }

    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<Lowered, CompileError> {
        match expr {
            Expr::Number(n) => Ok(Lowered::Value(self.const_int(32, *n as i64))),
            Expr::Char(c) => Ok(Lowered::Value(self.const_int(8, *c as i64))),
            Expr::Bool(b) => Ok(Lowered::Value(self.const_int(1, *b as i64))),
            Expr::Null => Ok(Lowered::None),
            Expr::Str(_) => Err(CompileError::Unsupported(
                "string literals are not lowered yet".to_string(),
            )),
            Expr::Closure { .. } => Err(CompileError::Unsupported(
                "closure values are not lowered yet".to_string(),
            )),
            Expr::Ident(name) => self.lower_ident(name),
            Expr::Program(ast) => {
                self.push_scope();
                let result = self.lower_ast(ast);
                self.pop_scope();
                result
            }
            Expr::If { cond, then, els } => self.lower_if(cond, then, els.as_deref()),
            Expr::Loop { cond, body } => self.lower_loop(cond, body),
            Expr::Assign { op, left, right } => self.lower_assign(*op, left, right),
            Expr::Binary { op, left, right } => self.lower_binary(*op, left, right),
            Expr::Unary {
                op,
                prefix,
                operand,
            } => self.lower_unary(*op, *prefix, operand),
            Expr::Break => self.lower_jump(self.loop_exit(), "break", "afterbreak"),
            Expr::Continue => self.lower_jump(self.loop_head(), "continue", "aftercontinue"),
            Expr::Call { callee, args } => self.lower_call(callee, args),
            Expr::Function { name, params, body } => {
                self.lower_function(name, params, body.as_deref())
            }
            Expr::Extern { name, params } => self.lower_extern(name, params),
        }
    }

    fn lower_ident(&mut self, name: &str) -> Result<Lowered, CompileError> {
        if let Some(slot) = self.lookup(name) {
            return Ok(Lowered::Place(slot));
        }
        if let Some(info) = self.module.get(name) {
            return Ok(Lowered::Func(info.id));
        }
        Err(CompileError::resolve(
            ResolveErrorKind::UnknownIdentifier,
            format!("unknown identifier '{}'", name),
        ))
    }

    /// Lower an if-arm and resolve it to an optional value.
    fn arm_value(&mut self, expr: &Expr) -> Result<Option<RValue>, CompileError> {
        self.push_scope();
        let lowered = self.lower_expr(expr);
        self.pop_scope();
        match lowered? {
            Lowered::Value(v) => Ok(Some(v)),
            Lowered::Place(slot) => Ok(Some(self.load(slot))),
            Lowered::Func(_) | Lowered::None => Ok(None),
        }
    }

    fn lower_if(
        &mut self,
        cond: &Expr,
        then: &Expr,
        els: Option<&Expr>,
    ) -> Result<Lowered, CompileError> {
        let cond = self.lower_expr(cond)?;
        let cond = self.rvalue(cond)?;
        let cond = self.cast(cond, Ty::BOOL)?;

        let then_block = self.backend.begin_block(self.func, "then");
        let else_block = self.backend.begin_block(self.func, "else");
        let merge_block = self.backend.begin_block(self.func, "merge");
        self.backend.emit_cond_branch(cond.id, then_block, else_block);

        self.backend.set_insertion_point(then_block);
        let then_val = self.arm_value(then)?;
        let then_end = self.backend.insertion_point();
        self.backend.emit_branch(merge_block);

        self.backend.set_insertion_point(else_block);
        let else_val = match els {
            Some(els) => self.arm_value(els)?,
            None => None,
        };
        // Unify arm types before leaving the else block; the merge block
        // must not contain the conversion.
        let else_val = match (then_val, else_val) {
            (Some(t), Some(e)) if e.ty != t.ty => {
                Some(self.cast_with(e, t.ty, TypeErrorKind::MergeMismatch)?)
            }
            (_, e) => e,
        };
        let else_end = self.backend.insertion_point();
        self.backend.emit_branch(merge_block);

        self.backend.set_insertion_point(merge_block);
        match (then_val, else_val) {
            (Some(t), Some(e)) => {
                let id = self.backend.emit_merge(&[(t.id, then_end), (e.id, else_end)]);
                Ok(Lowered::Value(RValue { id, ty: t.ty }))
            }
            (Some(t), None) => Ok(Lowered::Value(t)),
            _ => Ok(Lowered::None),
        }
    }

    fn lower_loop(&mut self, cond: &Expr, body: &Expr) -> Result<Lowered, CompileError> {
        let head = self.backend.begin_block(self.func, "head");
        let body_block = self.backend.begin_block(self.func, "loop");
        let merge_block = self.backend.begin_block(self.func, "merge");

        let saved = self.set_loop_targets(Some(head), Some(merge_block));

        self.backend.emit_branch(head);
        self.backend.set_insertion_point(head);
        let cond = self.lower_expr(cond)?;
        let cond = self.rvalue(cond)?;
        let cond = self.cast(cond, Ty::BOOL)?;
        self.backend.emit_cond_branch(cond.id, body_block, merge_block);

        self.backend.set_insertion_point(body_block);
        self.lower_expr(body)?;
        self.backend.emit_branch(head);

        self.backend.set_insertion_point(merge_block);
        self.set_loop_targets(saved.0, saved.1);

        Ok(Lowered::Value(self.const_int(32, 0)))
    }

    fn set_loop_targets(
        &mut self,
        head: Option<BlockId>,
        exit: Option<BlockId>,
    ) -> (Option<BlockId>, Option<BlockId>) {
        match self.scopes.last_mut() {
            Some(scope) => {
                let saved = (scope.loop_head, scope.loop_exit);
                scope.loop_head = head;
                scope.loop_exit = exit;
                saved
            }
            None => (None, None),
        }
    }

    /// `break`/`continue`: branch to the nearest enclosing loop's target and
    /// open a fresh block so following siblings stay well-formed.
    fn lower_jump(
        &mut self,
        target: Option<BlockId>,
        what: &str,
        after_label: &str,
    ) -> Result<Lowered, CompileError> {
        let target = target.ok_or_else(|| {
            CompileError::resolve(
                ResolveErrorKind::NoEnclosingLoop,
                format!("'{}' outside of a loop", what),
            )
        })?;
        self.backend.emit_branch(target);
        let after = self.backend.begin_block(self.func, after_label);
        self.backend.set_insertion_point(after);
        Ok(Lowered::None)
    }

    fn lower_assign(
        &mut self,
        op: AssignOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Lowered, CompileError> {
        // is_place() holds only for identifiers.
        let Expr::Ident(name) = left else {
            return Err(CompileError::resolve(
                ResolveErrorKind::NotAssignable,
                "assignment target must be a variable",
            ));
        };

        let rhs = self.lower_expr(right)?;
        let rhs = self.rvalue(rhs)?;

        let slot = match op.operator() {
            None => match self.lookup_current(name) {
                Some(slot) => slot,
                None => {
                    let slot = Slot {
                        id: self.backend.emit_alloca(self.func, rhs.ty, name),
                        ty: rhs.ty,
                    };
                    self.bind(name, slot);
                    slot
                }
            },
            Some(bin) => {
                let slot = self.lookup(name).ok_or_else(|| {
                    CompileError::resolve(
                        ResolveErrorKind::UnknownIdentifier,
                        format!("unknown identifier '{}'", name),
                    )
                })?;
                let current = self.load(slot);
                let result = self.binary_values(bin, current, rhs)?;
                let stored = self.cast(result, slot.ty)?;
                self.backend.emit_store(slot.id, stored.id);
                return Ok(Lowered::Value(stored));
            }
        };
        let stored = self.cast(rhs, slot.ty)?;
        self.backend.emit_store(slot.id, stored.id);
        Ok(Lowered::Value(stored))
    }

    fn lower_binary(
        &mut self,
        op: BinOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Lowered, CompileError> {
        let lhs = self.lower_expr(left)?;
        let lhs = self.rvalue(lhs)?;
        let rhs = self.lower_expr(right)?;
        let rhs = self.rvalue(rhs)?;
        Ok(Lowered::Value(self.binary_values(op, lhs, rhs)?))
    }

    /// Integer operands are widened to the wider width; anything else falls
    /// back to a name-mangled operator-function call.
    pub(crate) fn binary_values(
        &mut self,
        op: BinOp,
        lhs: RValue,
        rhs: RValue,
    ) -> Result<RValue, CompileError> {
        if let (Ty::Int(lw), Ty::Int(rw)) = (lhs.ty, rhs.ty) {
            let width = lw.max(rw);
            let lhs = self.cast(lhs, Ty::Int(width))?;
            let rhs = self.cast(rhs, Ty::Int(width))?;
            if let Some(cmp) = cmp_op(op) {
                return Ok(RValue {
                    id: self.backend.emit_compare(cmp, lhs.id, rhs.id),
                    ty: Ty::BOOL,
                });
            }
            let arith = arith_op(op).ok_or_else(|| {
                CompileError::typing(
                    TypeErrorKind::UnresolvedOperator,
                    format!("no integer lowering for operator '{}'", op.symbol()),
                )
            })?;
            return Ok(RValue {
                id: self.backend.emit_arith(arith, lhs.id, rhs.id),
                ty: Ty::Int(width),
            });
        }
        self.operator_call(op.symbol(), &[lhs, rhs])
    }

    /// Name-mangled operator-overload fallback.
    fn operator_call(&mut self, op: &str, args: &[RValue]) -> Result<RValue, CompileError> {
        let tys: Vec<Ty> = args.iter().map(|a| a.ty).collect();
        let name = mangle_operator(op, &tys);
        let info = self.module.get(&name).cloned().ok_or_else(|| {
            CompileError::typing(
                TypeErrorKind::UnresolvedOperator,
                format!("no overload '{}' for operator '{}'", name, op),
            )
        })?;
        self.emit_checked_call(&info, args)
    }

    fn lower_unary(
        &mut self,
        op: UnOp,
        prefix: bool,
        operand: &Expr,
    ) -> Result<Lowered, CompileError> {
        match op {
            UnOp::Not => {
                let value = self.lower_expr(operand)?;
                let value = self.rvalue(value)?;
                let value = self.cast(value, Ty::BOOL)?;
                let zero = self.const_int(1, 0);
                let id = self.backend.emit_compare(CmpOp::Eq, value.id, zero.id);
                Ok(Lowered::Value(RValue { id, ty: Ty::BOOL }))
            }
            UnOp::Addr => {
                let lowered = self.lower_expr(operand)?;
                let Lowered::Place(slot) = lowered else {
                    return Err(CompileError::resolve(
                        ResolveErrorKind::NotAssignable,
                        "address-of requires a variable",
                    ));
                };
                let id = self.backend.emit_addr(slot.id);
                Ok(Lowered::Value(RValue { id, ty: Ty::Ptr }))
            }
            UnOp::Incr | UnOp::Decr => {
                let lowered = self.lower_expr(operand)?;
                let Lowered::Place(slot) = lowered else {
                    return Err(CompileError::resolve(
                        ResolveErrorKind::NotAssignable,
                        format!("'{}' requires a variable", op.symbol()),
                    ));
                };
                let old = self.load(slot);
                let one = self.const_int(32, 1);
                let bin = if op == UnOp::Incr {
                    BinOp::Add
                } else {
                    BinOp::Sub
                };
                let new = self.binary_values(bin, old, one)?;
                let stored = self.cast(new, slot.ty)?;
                self.backend.emit_store(slot.id, stored.id);
                Ok(Lowered::Value(if prefix { stored } else { old }))
            }
        }
    }

    fn lower_call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Lowered, CompileError> {
        // A sized-integer type name with one argument is an explicit cast,
        // never a function call.
        if let Expr::Ident(name) = callee {
            if args.len() == 1 {
                if let Some(width) = int_type_width(name) {
                    if !(1..=64).contains(&width) {
                        return Err(CompileError::typing(
                            TypeErrorKind::UnknownTypeName,
                            format!("unknown type name '{}'", name),
                        ));
                    }
                    let value = self.lower_expr(&args[0])?;
                    let value = self.rvalue(value)?;
                    let cast = self.cast(value, Ty::Int(width))?;
                    return Ok(Lowered::Value(cast));
                }
            }
        }

        let info = match callee {
            Expr::Ident(name) => {
                if self.lookup(name).is_some() {
                    return Err(CompileError::Unsupported(
                        "calling closure values is not supported yet".to_string(),
                    ));
                }
                self.module.get(name).cloned().ok_or_else(|| {
                    CompileError::resolve(
                        ResolveErrorKind::UnknownFunction,
                        format!("unknown function '{}'", name),
                    )
                })?
            }
            _ => {
                return Err(CompileError::Unsupported(
                    "indirect calls are not supported yet".to_string(),
                ))
            }
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let value = self.lower_expr(arg)?;
            values.push(self.rvalue(value)?);
        }
        Ok(Lowered::Value(self.emit_checked_call(&info, &values)?))
    }

    /// Arity-check a call and cast each argument to its declared parameter
    /// type.
    fn emit_checked_call(
        &mut self,
        info: &FuncInfo,
        args: &[RValue],
    ) -> Result<RValue, CompileError> {
        if args.len() != info.params.len() {
            return Err(CompileError::typing(
                TypeErrorKind::ArgumentCountMismatch,
                format!("expected {} arguments, found {}", info.params.len(), args.len()),
            ));
        }
        let mut ids = Vec::with_capacity(args.len());
        for (&arg, &ty) in args.iter().zip(&info.params) {
            ids.push(self.cast(arg, ty)?.id);
        }
        Ok(RValue {
            id: self.backend.emit_call(info.id, &ids),
            ty: info.ret,
        })
    }

    fn param_types(&self, params: &[Param]) -> Result<Vec<Ty>, CompileError> {
        params
            .iter()
            .map(|p| match int_type_width(&p.ty) {
                Some(w) if (1..=64).contains(&w) => Ok(Ty::Int(w)),
                _ => Err(CompileError::typing(
                    TypeErrorKind::UnknownTypeName,
                    format!("unknown type name '{}'", p.ty),
                )),
            })
            .collect()
    }

    fn lower_function(
        &mut self,
        name: &str,
        params: &[Param],
        body: Option<&Expr>,
    ) -> Result<Lowered, CompileError> {
        let tys = self.param_types(params)?;
        if self.module.contains_key(name) {
            return Err(CompileError::resolve(
                ResolveErrorKind::FunctionRedefinition,
                format!("function '{}' is already defined", name),
            ));
        }
        let ret = Ty::I32;
        let id = self
            .backend
            .declare_function(name, &tys, ret, body.is_none());
        self.module.insert(
            name.to_string(),
            FuncInfo {
                id,
                params: tys.clone(),
                ret,
            },
        );

        let Some(body) = body else {
            return Ok(Lowered::Func(id));
        };

        // Emit the body with a fresh scope chain, then restore the caller's
        // emission state.
        let saved_point = self.backend.insertion_point();
        let saved_func = std::mem::replace(&mut self.func, id);
        let saved_scopes = std::mem::take(&mut self.scopes);
        self.push_scope();

        let entry = self.backend.begin_block(id, "entry");
        self.backend.set_insertion_point(entry);
        for (i, (param, &ty)) in params.iter().zip(&tys).enumerate() {
            let slot = Slot {
                id: self.backend.emit_alloca(id, ty, &param.name),
                ty,
            };
            let arg = self.backend.arg_value(id, i);
            self.backend.emit_store(slot.id, arg);
            self.bind(&param.name, slot);
        }

        let result = self.lower_expr(body)?;
        self.finish_function(result, ret)?;

        self.scopes = saved_scopes;
        self.func = saved_func;
        self.backend.set_insertion_point(saved_point);
        Ok(Lowered::Func(id))
    }

    fn lower_extern(&mut self, name: &str, params: &[Param]) -> Result<Lowered, CompileError> {
        self.lower_function(name, params, None)
    }
}
