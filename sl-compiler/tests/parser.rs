use sl_compiler::ast::{AssignOp, BinOp, Expr};
use sl_compiler::frontend::lexer::{Token, TokenStream};
use sl_compiler::frontend::printer;
use sl_compiler::parse_unit;

fn num(n: i32) -> Expr {
    Expr::Number(n)
}

fn ident(name: &str) -> Expr {
    Expr::Ident(name.to_string())
}

fn bin(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn assign(left: Expr, right: Expr) -> Expr {
    Expr::Assign {
        op: AssignOp::Set,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn first(source: &str) -> Expr {
    let mut ast = parse_unit(source).expect("parse");
    assert_eq!(ast.exprs.len(), 1, "expected one top-level expression");
    ast.exprs.remove(0)
}

// ── Precedence ───────────────────────────────────────────────────────────

#[test]
fn mul_binds_tighter_than_add() {
    assert_eq!(
        first("1 + 2 * 3;"),
        bin(BinOp::Add, num(1), bin(BinOp::Mul, num(2), num(3)))
    );
}

#[test]
fn sub_is_left_associative() {
    assert_eq!(
        first("10 - 4 - 3;"),
        bin(BinOp::Sub, bin(BinOp::Sub, num(10), num(4)), num(3))
    );
}

#[test]
fn assignment_is_right_associative() {
    assert_eq!(
        first("a = b = 3;"),
        assign(ident("a"), assign(ident("b"), num(3)))
    );
}

#[test]
fn comparison_binds_looser_than_arithmetic() {
    assert_eq!(
        first("a + 1 < b * 2;"),
        bin(
            BinOp::Lt,
            bin(BinOp::Add, ident("a"), num(1)),
            bin(BinOp::Mul, ident("b"), num(2))
        )
    );
}

#[test]
fn logical_or_binds_loosest() {
    assert_eq!(
        first("a || b && c;"),
        bin(BinOp::Or, ident("a"), bin(BinOp::And, ident("b"), ident("c")))
    );
}

#[test]
fn parentheses_override_precedence() {
    assert_eq!(
        first("(1 + 2) * 3;"),
        bin(BinOp::Mul, bin(BinOp::Add, num(1), num(2)), num(3))
    );
}

// ── Atoms and calls ──────────────────────────────────────────────────────

#[test]
fn chained_calls() {
    assert_eq!(
        first("f(1)(2);"),
        Expr::Call {
            callee: Box::new(Expr::Call {
                callee: Box::new(ident("f")),
                args: vec![num(1)],
            }),
            args: vec![num(2)],
        }
    );
}

#[test]
fn empty_block_is_null() {
    assert_eq!(first("{};"), Expr::Null);
}

#[test]
fn single_member_block_unwraps() {
    assert_eq!(first("{ 42 };"), num(42));
}

#[test]
fn multi_member_block_is_program() {
    match first("{ 1; 2 };") {
        Expr::Program(ast) => assert_eq!(ast.exprs, vec![num(1), num(2)]),
        other => panic!("expected Program, got {:?}", other),
    }
}

#[test]
fn if_without_else() {
    match first("if x { 1 };") {
        Expr::If { cond, then, els } => {
            assert_eq!(*cond, ident("x"));
            assert_eq!(*then, num(1));
            assert!(els.is_none());
        }
        other => panic!("expected If, got {:?}", other),
    }
}

#[test]
fn closure_parses() {
    match first("cls (a, b) { a + b };") {
        Expr::Closure { params, body } => {
            assert_eq!(params, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(body.exprs.len(), 1);
        }
        other => panic!("expected Closure, got {:?}", other),
    }
}

#[test]
fn def_and_ext_parse() {
    let ast = parse_unit("ext put(i32 n); def f(i32 a, i8 b) { a };").expect("parse");
    match &ast.exprs[0] {
        Expr::Extern { name, params } => {
            assert_eq!(name, "put");
            assert_eq!(params[0].ty, "i32");
            assert_eq!(params[0].name, "n");
        }
        other => panic!("expected Extern, got {:?}", other),
    }
    match &ast.exprs[1] {
        Expr::Function { name, params, body } => {
            assert_eq!(name, "f");
            assert_eq!(params.len(), 2);
            assert_eq!(params[1].ty, "i8");
            assert!(body.is_some());
        }
        other => panic!("expected Function, got {:?}", other),
    }
}

#[test]
fn prefix_and_postfix_unary() {
    match first("++x;") {
        Expr::Unary { prefix, .. } => assert!(prefix),
        other => panic!("expected Unary, got {:?}", other),
    }
    match first("x--;") {
        Expr::Unary { prefix, .. } => assert!(!prefix),
        other => panic!("expected Unary, got {:?}", other),
    }
}

#[test]
fn last_expression_needs_no_semicolon() {
    let ast = parse_unit("1; 2").expect("parse");
    assert_eq!(ast.exprs, vec![num(1), num(2)]);
}

// ── Lexer ────────────────────────────────────────────────────────────────

fn lex_all(stream: &mut TokenStream) -> Vec<Token> {
    let mut tokens = Vec::new();
    while let Some(spanned) = stream.next().expect("lex") {
        tokens.push(spanned.token);
    }
    tokens
}

#[test]
fn reset_reproduces_token_sequence() {
    let mut stream = TokenStream::new("a += f(1); // comment\n\"s\"");
    let one = lex_all(&mut stream);
    stream.reset();
    let two = lex_all(&mut stream);
    assert_eq!(one, two);
    assert!(!one.is_empty());
}

#[test]
fn operator_runs_lex_greedily() {
    let mut stream = TokenStream::new("a += b == c");
    let tokens = lex_all(&mut stream);
    assert_eq!(
        tokens,
        vec![
            Token::Ident("a".to_string()),
            Token::Op("+=".to_string()),
            Token::Ident("b".to_string()),
            Token::Op("==".to_string()),
            Token::Ident("c".to_string()),
        ]
    );
}

#[test]
fn comments_and_escapes() {
    let mut stream = TokenStream::new("/* block\n comment */ \"a\\nb\" 'x' '\\n'");
    let tokens = lex_all(&mut stream);
    assert_eq!(
        tokens,
        vec![
            Token::Str("a\nb".to_string()),
            Token::Char(b'x'),
            Token::Char(b'\n'),
        ]
    );
}

#[test]
fn block_comments_with_embedded_stars() {
    let mut stream = TokenStream::new("1 /* a * b **/ + /**/ 2");
    let tokens = lex_all(&mut stream);
    assert_eq!(
        tokens,
        vec![
            Token::Number(1),
            Token::Op("+".to_string()),
            Token::Number(2),
        ]
    );
}

// ── Round trip ───────────────────────────────────────────────────────────

fn roundtrip(source: &str) {
    let ast = parse_unit(source).expect("parse");
    let printed = printer::print_unit(&ast);
    let reparsed = parse_unit(&printed)
        .unwrap_or_else(|e| panic!("reparse of {:?} failed: {}", printed, e));
    assert_eq!(ast, reparsed, "printed form: {:?}", printed);
}

#[test]
fn roundtrip_expressions() {
    roundtrip("x = 1 + 2 * (3 - y); f(x, 'c', \"s\\n\");");
    roundtrip("a = b = c + 1; !done && a < 10;");
    roundtrip("if a < b { a } else { b };");
}

#[test]
fn roundtrip_blocks_and_loops() {
    roundtrip("i = 0; loop i < 10 { i += 1; if i == 5 { break } };");
    roundtrip("{ x = 1; y = 2; x + y };");
    roundtrip("def max(i32 a, i32 b) { if a < b { b } else { a } }; max(1, 2);");
}
