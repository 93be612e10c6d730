use sl_compiler::{compile_to_cfg, CompileError, ResolveErrorKind, TypeErrorKind};

fn compile_err(source: &str) -> CompileError {
    compile_to_cfg("main", source).expect_err("expected a compile error")
}

fn assert_resolve_error(source: &str, expected: ResolveErrorKind) {
    match compile_err(source) {
        CompileError::Resolve { kind, .. } => assert_eq!(kind, expected),
        other => panic!("expected ResolutionError:{}, got {}", expected, other),
    }
}

fn assert_type_error(source: &str, expected: TypeErrorKind) {
    match compile_err(source) {
        CompileError::Type { kind, .. } => assert_eq!(kind, expected),
        other => panic!("expected TypeError:{}, got {}", expected, other),
    }
}

// ── Lexical errors ───────────────────────────────────────────────────────

#[test]
fn unrecognized_character_reports_position() {
    match compile_err("a = 1;\n  `") {
        CompileError::Lex { line, col, ch } => {
            assert_eq!((line, col, ch), (2, 3, '`'));
        }
        other => panic!("expected Lex error, got {}", other),
    }
}

// ── Parse errors ─────────────────────────────────────────────────────────

#[test]
fn unexpected_token() {
    match compile_err("1 + ;") {
        CompileError::Parse { line, message, .. } => {
            assert_eq!(line, 1);
            assert!(message.contains("Unexpected token"), "{}", message);
        }
        other => panic!("expected Parse error, got {}", other),
    }
}

#[test]
fn missing_semicolon_between_expressions() {
    match compile_err("1 2") {
        CompileError::Parse { message, .. } => {
            assert!(message.contains("';' expected"), "{}", message);
        }
        other => panic!("expected Parse error, got {}", other),
    }
}

#[test]
fn closure_parameter_must_be_a_name() {
    match compile_err("cls (3) { 0 };") {
        CompileError::Parse { message, .. } => {
            assert!(message.contains("Variable name expected"), "{}", message);
        }
        other => panic!("expected Parse error, got {}", other),
    }
}

#[test]
fn unclosed_parenthesis() {
    match compile_err("(1;") {
        CompileError::Parse { message, .. } => {
            assert!(message.contains("')' expected"), "{}", message);
        }
        other => panic!("expected Parse error, got {}", other),
    }
}

#[test]
fn unknown_operator_run() {
    match compile_err("x &&& y;") {
        CompileError::Parse { message, .. } => {
            assert!(message.contains("Unknown operator"), "{}", message);
        }
        other => panic!("expected Parse error, got {}", other),
    }
}

// ── Resolution errors ────────────────────────────────────────────────────

#[test]
fn unknown_identifier() {
    assert_resolve_error("y + 1;", ResolveErrorKind::UnknownIdentifier);
}

#[test]
fn compound_assignment_requires_existing_binding() {
    assert_resolve_error("x += 1;", ResolveErrorKind::UnknownIdentifier);
}

#[test]
fn unknown_function() {
    assert_resolve_error("foo(1);", ResolveErrorKind::UnknownFunction);
}

#[test]
fn break_outside_loop() {
    assert_resolve_error("break;", ResolveErrorKind::NoEnclosingLoop);
}

#[test]
fn continue_outside_loop() {
    assert_resolve_error("continue;", ResolveErrorKind::NoEnclosingLoop);
}

#[test]
fn assignment_target_must_be_a_variable() {
    assert_resolve_error("1 = 2;", ResolveErrorKind::NotAssignable);
}

#[test]
fn increment_target_must_be_a_variable() {
    assert_resolve_error("5++;", ResolveErrorKind::NotAssignable);
}

#[test]
fn function_redefinition() {
    assert_resolve_error(
        "def f(i32 a) { a }; def f(i32 b) { b };",
        ResolveErrorKind::FunctionRedefinition,
    );
}

// ── Type errors ──────────────────────────────────────────────────────────

#[test]
fn zero_width_cast_is_unknown_type() {
    assert_type_error("i0(5);", TypeErrorKind::UnknownTypeName);
}

#[test]
fn oversized_cast_is_unknown_type() {
    assert_type_error("i128(5);", TypeErrorKind::UnknownTypeName);
}

#[test]
fn absurd_width_is_unknown_type_not_unknown_function() {
    assert_type_error("i99999999999(1);", TypeErrorKind::UnknownTypeName);
}

#[test]
fn parameter_type_must_be_sized_integer() {
    assert_type_error("def g(word a) { a };", TypeErrorKind::UnknownTypeName);
}

#[test]
fn argument_count_mismatch() {
    assert_type_error(
        "def f(i32 a) { a }; f(1, 2);",
        TypeErrorKind::ArgumentCountMismatch,
    );
}

#[test]
fn pointer_arithmetic_needs_an_overload() {
    assert_type_error("x = 5; &x + 1;", TypeErrorKind::UnresolvedOperator);
}

#[test]
fn pointers_do_not_cast_to_integers() {
    assert_type_error("x = 5; i32(&x);", TypeErrorKind::IncompatibleCast);
}

#[test]
fn if_arms_must_unify() {
    assert_type_error(
        "x = 1; if true { &x } else { 2 };",
        TypeErrorKind::MergeMismatch,
    );
}

#[test]
fn null_has_no_value() {
    assert_type_error("null + 1;", TypeErrorKind::ValuelessExpression);
}

// ── Unsupported lowerings ────────────────────────────────────────────────

#[test]
fn string_lowering_is_unsupported() {
    assert!(matches!(
        compile_err("\"abc\";"),
        CompileError::Unsupported(_)
    ));
}

#[test]
fn closure_lowering_is_unsupported() {
    assert!(matches!(
        compile_err("cls (a) { a };"),
        CompileError::Unsupported(_)
    ));
}

#[test]
fn indirect_calls_are_unsupported() {
    assert!(matches!(
        compile_err("(1 + 2)(3);"),
        CompileError::Unsupported(_)
    ));
}
