use crate::ast::{AssignOp, Ast, BinOp, Expr, Param, UnOp};
use crate::frontend::lexer::{position_to_line_col, Token, TokenStream};
use crate::CompileError;

type PResult<T> = Result<T, CompileError>;

/// Parse one compilation unit: a `;`-terminated sequence of top-level
/// expressions. A `;` must follow every expression that is not the last.
pub fn parse_unit(source: &str) -> PResult<Ast> {
    Parser::new(source).parse_toplevel()
}

/// Binding strength of an operator token, or `None` if the run of operator
/// characters is not a recognized operator.
fn precedence(op: &str) -> Option<u8> {
    if AssignOp::from_symbol(op).is_some() {
        return Some(1);
    }
    BinOp::from_symbol(op).map(BinOp::precedence)
}

pub struct Parser<'src> {
    input: TokenStream<'src>,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            input: TokenStream::new(source),
        }
    }

    fn error_at(&self, pos: usize, message: String) -> CompileError {
        let (line, col) = position_to_line_col(self.input.source(), pos);
        CompileError::Parse { line, col, message }
    }

    fn peek_is(&mut self, tok: &Token) -> PResult<bool> {
        Ok(matches!(self.input.peek()?, Some(t) if t.token == *tok))
    }

    fn expect(&mut self, tok: &Token) -> PResult<()> {
        if self.peek_is(tok)? {
            self.input.next()?;
            return Ok(());
        }
        let (pos, found) = match self.input.peek()? {
            Some(t) => (t.start, format!("found '{}'", t.token)),
            None => (self.input.source().len(), "found end of input".to_string()),
        };
        Err(self.error_at(pos, format!("'{}' expected, {}", tok, found)))
    }

    fn parse_toplevel(&mut self) -> PResult<Ast> {
        let mut ast = Ast::default();
        while !self.input.at_end()? {
            ast.exprs.push(self.parse_expr()?);
            if !self.input.at_end()? {
                self.expect(&Token::Semicolon)?;
            }
        }
        Ok(ast)
    }

    fn parse_expr(&mut self) -> PResult<Expr> {
        let atom = self.parse_atom()?;
        let expr = self.maybe_binary(atom, 0)?;
        self.maybe_call(expr)
    }

    /// Precedence climbing: consume operators binding strictly tighter than
    /// `min_prec`. Assignment is right-associative (recurse with its own
    /// precedence minus one); everything else is left-associative.
    fn maybe_binary(&mut self, left: Expr, min_prec: u8) -> PResult<Expr> {
        let (sym, start) = match self.input.peek()? {
            Some(t) => match &t.token {
                Token::Op(s) => (s.clone(), t.start),
                _ => return Ok(left),
            },
            None => return Ok(left),
        };
        let prec = precedence(&sym)
            .ok_or_else(|| self.error_at(start, format!("Unknown operator '{}'", sym)))?;
        if prec <= min_prec {
            return Ok(left);
        }
        self.input.next()?;

        if let Some(op) = AssignOp::from_symbol(&sym) {
            let atom = self.parse_atom()?;
            let right = self.maybe_binary(atom, prec - 1)?;
            let node = Expr::Assign {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
            return self.maybe_binary(node, min_prec);
        }

        let op = match BinOp::from_symbol(&sym) {
            Some(op) => op,
            None => return Err(self.error_at(start, format!("Unknown operator '{}'", sym))),
        };
        let atom = self.parse_atom()?;
        let right = self.maybe_binary(atom, prec)?;
        let node = Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        };
        self.maybe_binary(node, min_prec)
    }

    fn parse_atom(&mut self) -> PResult<Expr> {
        let expr = self.parse_atom_inner()?;
        let expr = self.maybe_call(expr)?;
        self.maybe_postfix(expr)
    }

    fn parse_atom_inner(&mut self) -> PResult<Expr> {
        let (token, start) = match self.input.peek()? {
            Some(t) => (t.token.clone(), t.start),
            None => {
                let pos = self.input.source().len();
                return Err(self.error_at(pos, "Unexpected end of input".to_string()));
            }
        };

        match token {
            Token::LParen => {
                self.input.next()?;
                let expr = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(expr)
            }
            Token::LBrace => self.parse_prog(),
            Token::If => self.parse_if(),
            Token::Loop => {
                self.input.next()?;
                let cond = self.parse_expr()?;
                let body = self.parse_expr()?;
                Ok(Expr::Loop {
                    cond: Box::new(cond),
                    body: Box::new(body),
                })
            }
            Token::Break => {
                self.input.next()?;
                Ok(Expr::Break)
            }
            Token::Continue => {
                self.input.next()?;
                Ok(Expr::Continue)
            }
            Token::True => {
                self.input.next()?;
                Ok(Expr::Bool(true))
            }
            Token::False => {
                self.input.next()?;
                Ok(Expr::Bool(false))
            }
            Token::Null => {
                self.input.next()?;
                Ok(Expr::Null)
            }
            Token::Cls => self.parse_closure(),
            Token::Def => self.parse_function(true),
            Token::Ext => self.parse_function(false),
            Token::Number(n) => {
                self.input.next()?;
                Ok(Expr::Number(n))
            }
            Token::Char(c) => {
                self.input.next()?;
                Ok(Expr::Char(c))
            }
            Token::Str(s) => {
                self.input.next()?;
                Ok(Expr::Str(s))
            }
            Token::Ident(name) => {
                self.input.next()?;
                Ok(Expr::Ident(name))
            }
            Token::Op(ref s) if matches!(s.as_str(), "!" | "&" | "++" | "--") => {
                self.input.next()?;
                let op = match s.as_str() {
                    "!" => UnOp::Not,
                    "&" => UnOp::Addr,
                    "++" => UnOp::Incr,
                    _ => UnOp::Decr,
                };
                let operand = self.parse_atom()?;
                Ok(Expr::Unary {
                    op,
                    prefix: true,
                    operand: Box::new(operand),
                })
            }
            other => Err(self.error_at(start, format!("Unexpected token '{}'", other))),
        }
    }

    /// Any atom immediately followed by `(` becomes a call.
    fn maybe_call(&mut self, expr: Expr) -> PResult<Expr> {
        if !self.peek_is(&Token::LParen)? {
            return Ok(expr);
        }
        let args = self.delimited(&Token::LParen, &Token::RParen, &Token::Comma, |p| {
            p.parse_expr()
        })?;
        let call = Expr::Call {
            callee: Box::new(expr),
            args,
        };
        self.maybe_call(call)
    }

    fn maybe_postfix(&mut self, expr: Expr) -> PResult<Expr> {
        let op = match self.input.peek()? {
            Some(t) => match &t.token {
                Token::Op(s) if s == "++" => UnOp::Incr,
                Token::Op(s) if s == "--" => UnOp::Decr,
                _ => return Ok(expr),
            },
            None => return Ok(expr),
        };
        self.input.next()?;
        Ok(Expr::Unary {
            op,
            prefix: false,
            operand: Box::new(expr),
        })
    }

    /// `{ e1; e2; ... }` — empty becomes `null`, a single member is
    /// unwrapped, anything larger is a `Program`.
    fn parse_prog(&mut self) -> PResult<Expr> {
        let mut ast = self.parse_block_ast()?;
        match ast.exprs.len() {
            0 => Ok(Expr::Null),
            1 => Ok(ast.exprs.remove(0)),
            _ => Ok(Expr::Program(ast)),
        }
    }

    fn parse_block_ast(&mut self) -> PResult<Ast> {
        let exprs = self.delimited(&Token::LBrace, &Token::RBrace, &Token::Semicolon, |p| {
            p.parse_expr()
        })?;
        Ok(Ast { exprs })
    }

    fn parse_if(&mut self) -> PResult<Expr> {
        self.expect(&Token::If)?;
        let cond = self.parse_expr()?;
        let then = self.parse_expr()?;
        let els = if self.peek_is(&Token::Else)? {
            self.input.next()?;
            Some(Box::new(self.parse_expr()?))
        } else {
            None
        };
        Ok(Expr::If {
            cond: Box::new(cond),
            then: Box::new(then),
            els,
        })
    }

    fn parse_closure(&mut self) -> PResult<Expr> {
        self.expect(&Token::Cls)?;
        let params = self.delimited(&Token::LParen, &Token::RParen, &Token::Comma, |p| {
            p.parse_varname()
        })?;
        let body = self.parse_block_ast()?;
        Ok(Expr::Closure { params, body })
    }

    fn parse_function(&mut self, has_body: bool) -> PResult<Expr> {
        self.input.next()?; // def / ext
        let name = self.parse_varname()?;
        let params = self.delimited(&Token::LParen, &Token::RParen, &Token::Comma, |p| {
            p.parse_param()
        })?;
        if !has_body {
            return Ok(Expr::Extern { name, params });
        }
        let body = self.parse_expr()?;
        Ok(Expr::Function {
            name,
            params,
            body: Some(Box::new(body)),
        })
    }

    fn parse_param(&mut self) -> PResult<Param> {
        let ty = self.parse_name("Type name expected")?;
        let name = self.parse_varname()?;
        Ok(Param { ty, name })
    }

    fn parse_varname(&mut self) -> PResult<String> {
        self.parse_name("Variable name expected")
    }

    fn parse_name(&mut self, what: &str) -> PResult<String> {
        let (token, pos) = match self.input.peek()? {
            Some(t) => (t.token.clone(), t.start),
            None => {
                let pos = self.input.source().len();
                return Err(self.error_at(pos, format!("{}, found end of input", what)));
            }
        };
        if let Token::Ident(name) = token {
            self.input.next()?;
            return Ok(name);
        }
        Err(self.error_at(pos, format!("{}, found '{}'", what, token)))
    }

    /// Parse `start item (sep item)* stop`, allowing a trailing separator.
    fn delimited<T>(
        &mut self,
        start: &Token,
        stop: &Token,
        sep: &Token,
        mut parse: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<T>> {
        let mut items = Vec::new();
        self.expect(start)?;
        let mut first = true;
        loop {
            if self.peek_is(stop)? {
                break;
            }
            if first {
                first = false;
            } else {
                self.expect(sep)?;
            }
            if self.peek_is(stop)? {
                break;
            }
            items.push(parse(self)?);
        }
        self.expect(stop)?;
        Ok(items)
    }
}
