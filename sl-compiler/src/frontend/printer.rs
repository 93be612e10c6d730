//! Render an AST back to source text.
//!
//! Output re-parses to a structurally equivalent AST: operands are
//! parenthesized exactly where the operator precedences require it, and
//! if/loop arms are always brace-wrapped (single-member blocks unwrap again
//! on the way back in).

use crate::ast::{Ast, Expr};

const ATOM: u8 = 100;
const UNARY: u8 = 30;

pub fn print_unit(ast: &Ast) -> String {
    let mut printer = Printer::default();
    printer.print_ast(ast);
    printer.out
}

pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::default();
    printer.expr(expr);
    printer.out
}

fn prec_of(expr: &Expr) -> u8 {
    match expr {
        Expr::Assign { .. } => 1,
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Unary { .. } => UNARY,
        Expr::If { .. }
        | Expr::Loop { .. }
        | Expr::Closure { .. }
        | Expr::Function { .. }
        | Expr::Extern { .. } => 0,
        _ => ATOM,
    }
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn pad(&mut self) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
    }

    fn print_ast(&mut self, ast: &Ast) {
        for expr in &ast.exprs {
            self.pad();
            self.expr(expr);
            self.out.push_str(";\n");
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Number(n) => self.out.push_str(&n.to_string()),
            Expr::Char(c) => {
                self.out.push('\'');
                self.push_escaped(*c as char, '\'');
                self.out.push('\'');
            }
            Expr::Str(s) => {
                self.out.push('"');
                for c in s.chars() {
                    self.push_escaped(c, '"');
                }
                self.out.push('"');
            }
            Expr::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Expr::Null => self.out.push_str("null"),
            Expr::Ident(name) => self.out.push_str(name),
            Expr::Break => self.out.push_str("break"),
            Expr::Continue => self.out.push_str("continue"),
            Expr::Program(ast) => self.block(ast),
            Expr::Assign { op, left, right } => {
                // Right-associative: the right operand may be another
                // assignment without parentheses.
                self.operand(left, 2);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.operand(right, 1);
            }
            Expr::Binary { op, left, right } => {
                let prec = op.precedence();
                self.operand(left, prec);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.operand(right, prec + 1);
            }
            Expr::Unary {
                op,
                prefix,
                operand,
            } => {
                // UNARY + 1 keeps nested unary operands parenthesized so
                // adjacent operator characters never re-lex as one token.
                if *prefix {
                    self.out.push_str(op.symbol());
                    self.operand(operand, UNARY + 1);
                } else {
                    self.operand(operand, UNARY + 1);
                    self.out.push_str(op.symbol());
                }
            }
            Expr::Call { callee, args } => {
                self.operand(callee, ATOM);
                self.out.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.expr(arg);
                }
                self.out.push(')');
            }
            Expr::If { cond, then, els } => {
                self.out.push_str("if ");
                self.expr(cond);
                self.out.push(' ');
                self.arm(then);
                if let Some(els) = els {
                    self.out.push_str(" else ");
                    self.arm(els);
                }
            }
            Expr::Loop { cond, body } => {
                self.out.push_str("loop ");
                self.expr(cond);
                self.out.push(' ');
                self.arm(body);
            }
            Expr::Closure { params, body } => {
                self.out.push_str("cls (");
                self.out.push_str(&params.join(", "));
                self.out.push_str(") ");
                self.block(body);
            }
            Expr::Function { name, params, body } => {
                self.out.push_str("def ");
                self.out.push_str(name);
                self.params(params);
                if let Some(body) = body {
                    self.out.push(' ');
                    self.arm(body);
                }
            }
            Expr::Extern { name, params } => {
                self.out.push_str("ext ");
                self.out.push_str(name);
                self.params(params);
            }
        }
    }

    fn params(&mut self, params: &[crate::ast::Param]) {
        self.out.push('(');
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(&param.ty);
            self.out.push(' ');
            self.out.push_str(&param.name);
        }
        self.out.push(')');
    }

    /// Print a sub-expression, parenthesizing when it binds looser than the
    /// context requires.
    fn operand(&mut self, expr: &Expr, min_prec: u8) {
        if prec_of(expr) < min_prec {
            self.out.push('(');
            self.expr(expr);
            self.out.push(')');
        } else {
            self.expr(expr);
        }
    }

    /// An if/loop arm or function body, always brace-wrapped.
    fn arm(&mut self, expr: &Expr) {
        match expr {
            Expr::Program(ast) => self.block(ast),
            Expr::Null => self.out.push_str("{}"),
            other => {
                self.out.push_str("{ ");
                self.expr(other);
                self.out.push_str(" }");
            }
        }
    }

    fn block(&mut self, ast: &Ast) {
        self.out.push_str("{\n");
        self.indent += 1;
        self.print_ast(ast);
        self.indent -= 1;
        self.pad();
        self.out.push('}');
    }

    fn push_escaped(&mut self, c: char, quote: char) {
        match c {
            '\\' => self.out.push_str("\\\\"),
            '\n' => self.out.push_str("\\n"),
            '\t' => self.out.push_str("\\t"),
            '\r' => self.out.push_str("\\r"),
            '\0' => self.out.push_str("\\0"),
            c if c == quote => {
                self.out.push('\\');
                self.out.push(c);
            }
            c => self.out.push(c),
        }
    }
}
