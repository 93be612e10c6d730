use sl_compiler::backend::interp::{Interp, RunError};
use sl_compiler::compile_to_cfg;

/// Compile a unit, check the graph is well-formed, and run its init
/// function.
fn run(source: &str) -> i64 {
    let module = compile_to_cfg("main", source).expect("compile");
    module.validate().expect("well-formed graph");
    Interp::new(&module)
        .run("_main_init", &[])
        .expect("execution")
}

fn run_err(source: &str) -> RunError {
    let module = compile_to_cfg("main", source).expect("compile");
    module.validate().expect("well-formed graph");
    Interp::new(&module)
        .run("_main_init", &[])
        .expect_err("expected a runtime error")
}

// ── Unit structure ───────────────────────────────────────────────────────

#[test]
fn empty_unit_returns_zero() {
    assert_eq!(run(""), 0);
}

#[test]
fn unit_yields_last_member() {
    assert_eq!(run("1; 2; 3;"), 3);
}

#[test]
fn init_function_is_named_after_unit() {
    let module = compile_to_cfg("demo", "42;").expect("compile");
    let lines = module.to_lines().join("\n");
    assert!(lines.contains("FUNC _demo_init() -> i32"), "got:\n{}", lines);
}

// ── Literals and casts ───────────────────────────────────────────────────

#[test]
fn char_literal_is_eight_bit() {
    assert_eq!(run("'A';"), 65);
}

#[test]
fn cast_truncates_to_width() {
    // i8 is a cast even though no function named i8 exists.
    assert_eq!(run("i8(300);"), 44);
}

#[test]
fn cast_sign_extends_on_widening() {
    assert_eq!(run("i32(i8(200));"), -56);
}

#[test]
fn mixed_width_operands_widen() {
    assert_eq!(run("i8(1) + 300;"), 301);
}

#[test]
fn widest_casts_preserve_value() {
    assert_eq!(run("i63(5);"), 5);
    assert_eq!(run("i63(0 - 1);"), -1);
    assert_eq!(run("i64(5);"), 5);
}

// ── Conditionals ─────────────────────────────────────────────────────────

#[test]
fn if_merge_selects_then_branch() {
    assert_eq!(run("if true { 1 } else { 2 };"), 1);
}

#[test]
fn if_merge_selects_else_branch() {
    assert_eq!(run("if false { 1 } else { 2 };"), 2);
}

#[test]
fn else_arm_is_cast_to_then_type() {
    // then is i8, so 300 is truncated before the merge.
    assert_eq!(run("if false { i8(7) } else { 300 };"), 44);
    assert_eq!(run("if true { i8(7) } else { 300 };"), 7);
}

#[test]
fn if_without_else_yields_then_value() {
    assert_eq!(run("if true { 9 };"), 9);
}

// ── Loops, break, continue ───────────────────────────────────────────────

#[test]
fn loop_accumulates() {
    assert_eq!(run("i = 0; loop i < 5 { i += 1 }; i;"), 5);
}

#[test]
fn break_leaves_loop() {
    assert_eq!(run("i = 0; loop true { i += 1; if i == 3 { break } }; i;"), 3);
}

#[test]
fn immediate_break_runs_merge_once() {
    // A body that breaks on the first iteration must still produce a fully
    // terminated graph and fall through to the continuation exactly once.
    assert_eq!(run("n = 0; loop true { break }; n += 1; n;"), 1);
}

#[test]
fn continue_skips_rest_of_body() {
    assert_eq!(
        run("i = 0; n = 0; loop i < 5 { i += 1; if i == 2 { continue }; n += 1 }; n;"),
        4
    );
}

#[test]
fn loop_value_is_zero() {
    assert_eq!(run("loop false { 1 };"), 0);
}

// ── Scoping ──────────────────────────────────────────────────────────────

#[test]
fn nested_block_assignment_shadows() {
    // Plain `=` in a nested block creates a fresh binding; the outer one is
    // untouched afterwards.
    assert_eq!(run("x = 1; { x = 2; 0 }; x;"), 1);
}

#[test]
fn same_scope_reassignment_mutates() {
    assert_eq!(run("x = 1; x = 2; x;"), 2);
}

#[test]
fn compound_assignment_reaches_outer_scope() {
    assert_eq!(run("x = 1; { x += 5; 0 }; x;"), 6);
}

// ── Unary operators ──────────────────────────────────────────────────────

#[test]
fn postfix_increment_yields_old_value() {
    assert_eq!(run("x = 5; y = x++; y * 100 + x;"), 506);
}

#[test]
fn prefix_increment_yields_new_value() {
    assert_eq!(run("x = 5; y = ++x; y * 100 + x;"), 606);
}

#[test]
fn logical_not() {
    assert_eq!(run("!true;"), 0);
    assert_eq!(run("!0;"), 1);
}

#[test]
fn boolean_connectives() {
    assert_eq!(run("true && false;"), 0);
    assert_eq!(run("true || false;"), 1);
}

// ── Functions ────────────────────────────────────────────────────────────

#[test]
fn function_call_returns_body_value() {
    assert_eq!(run("def add(i32 a, i32 b) { a + b }; add(1, 2);"), 3);
}

#[test]
fn arguments_are_cast_to_parameter_types() {
    assert_eq!(run("def f(i8 a) { i32(a) }; f(300);"), 44);
}

#[test]
fn parameters_are_assignable() {
    assert_eq!(run("def f(i32 a) { a += 1; a }; f(41);"), 42);
}

#[test]
fn recursion() {
    assert_eq!(
        run("def fact(i32 n) { if n < 2 { 1 } else { n * fact(n - 1) } }; fact(5);"),
        120
    );
}

#[test]
fn extern_declares_without_body() {
    let module = compile_to_cfg("main", "ext put(i32 n);").expect("compile");
    module.validate().expect("well-formed graph");
    let lines = module.to_lines().join("\n");
    assert!(lines.contains("EXTERN put(i32)"), "got:\n{}", lines);
}

// ── Runtime errors ───────────────────────────────────────────────────────

#[test]
fn calling_an_extern_fails_at_runtime() {
    let err = run_err("ext put(i32 n); put(1);");
    assert!(matches!(err, RunError::UnresolvedExtern(_)), "{:?}", err);
}

#[test]
fn division_by_zero_is_reported() {
    let err = run_err("1 / 0;");
    assert!(matches!(err, RunError::DivisionByZero), "{:?}", err);
}
