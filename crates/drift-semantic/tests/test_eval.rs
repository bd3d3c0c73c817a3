//! Constant evaluation through the pipeline: width checks against
//! annotations, division by zero, casts, and comptime function calls.

mod common;
use common::*;

use drift_ast::BinaryOp;
use drift_core::{DiagnosticCode, Diagnostics};
use drift_semantic::{
    Collector, ComptimeEvaluator, ContextTracker, EvalContext, EvalValue, Phase, Resolver,
    ScopeStore,
};

#[test]
fn overflow_against_the_annotated_width() {
    let result = analyze_statements(vec![let_stmt(
        "x",
        Some(named_ty("i8")),
        Some(binary(BinaryOp::Add, int(127), int(1))),
    )]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::ArithmeticOverflow), 1);
    // Literal arithmetic adapts to the annotation; the width check is
    // the evaluator's alone.
    assert_eq!(count(&result, DiagnosticCode::TypeMismatch), 0);
    assert!(message(&result, DiagnosticCode::ArithmeticOverflow).contains("'i8'"));
}

#[test]
fn untargeted_constants_use_signed_64_bit_bounds() {
    let result = analyze_statements(vec![let_stmt(
        "x",
        None,
        Some(binary(BinaryOp::Add, int(127), int(1))),
    )]);

    assert!(result.success);
    assert_eq!(count(&result, DiagnosticCode::ArithmeticOverflow), 0);
}

#[test]
fn division_by_zero_is_reported_for_ints_and_floats() {
    let result = analyze_statements(vec![
        let_stmt(
            "a",
            Some(named_ty("i64")),
            Some(binary(BinaryOp::Div, int(1), int(0))),
        ),
        let_stmt(
            "b",
            Some(named_ty("f64")),
            Some(binary(BinaryOp::Div, float(1.0), float(0.0))),
        ),
    ]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::DivisionByZero), 2);
}

#[test]
fn negation_folds_before_the_width_check() {
    let fits = analyze_statements(vec![let_stmt(
        "x",
        Some(named_ty("i8")),
        Some(neg(int(128))),
    )]);
    assert!(fits.success);

    let overflows = analyze_statements(vec![let_stmt(
        "x",
        Some(named_ty("i8")),
        Some(neg(int(129))),
    )]);
    assert!(!overflows.success);
    assert_eq!(count(&overflows, DiagnosticCode::ArithmeticOverflow), 1);
}

#[test]
fn casts_truncate_floats_and_bound_check_ints() {
    let truncated = analyze_statements(vec![let_stmt(
        "x",
        Some(named_ty("i64")),
        Some(cast(float(2.9), named_ty("i32"))),
    )]);
    assert!(truncated.success);

    let out_of_range = analyze_statements(vec![let_stmt(
        "x",
        Some(named_ty("i64")),
        Some(cast(int(300), named_ty("u8"))),
    )]);
    assert!(!out_of_range.success);
    assert_eq!(count(&out_of_range, DiagnosticCode::ArithmeticOverflow), 1);
}

#[test]
fn shifts_are_bounded_by_the_word_size() {
    let fits = analyze_statements(vec![let_stmt(
        "x",
        None,
        Some(binary(BinaryOp::Shl, int(1), int(62))),
    )]);
    assert!(fits.success);

    let too_far = analyze_statements(vec![let_stmt(
        "x",
        None,
        Some(binary(BinaryOp::Shl, int(1), int(64))),
    )]);
    assert!(!too_far.success);
    assert_eq!(count(&too_far, DiagnosticCode::ShiftOutOfRange), 1);
}

#[test]
fn comptime_results_must_fit_the_caller_width() {
    // double(200) is 400, out of range for the u8 return type; the
    // failure surfaces once, from inside the body evaluation.
    let result = analyze_statements(vec![
        comptime_func(
            "double",
            vec![param("x", "u8")],
            Some(named_ty("u8")),
            vec![ret(Some(binary(BinaryOp::Mul, ident("x"), int(2))))],
        ),
        let_stmt(
            "a",
            Some(named_ty("u8")),
            Some(call(ident("double"), vec![int(100)])),
        ),
        let_stmt(
            "b",
            Some(named_ty("u8")),
            Some(call(ident("double"), vec![int(200)])),
        ),
    ]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::ArithmeticOverflow), 1);
    assert_eq!(count(&result, DiagnosticCode::TypeMismatch), 0);
}

#[test]
fn comptime_calls_memoize_per_argument_values() {
    let program = program(vec![module(
        "test",
        vec![comptime_func(
            "bump",
            vec![param("x", "i64")],
            Some(named_ty("i64")),
            vec![ret(Some(binary(BinaryOp::Add, ident("x"), int(3))))],
        )],
    )]);

    let mut store = ScopeStore::new();
    let mut ctx = ContextTracker::new();
    let mut diags = Diagnostics::new(100);
    Collector::new(&mut store, &mut ctx, &mut diags).handle(&program);
    Resolver::new(&mut store, &mut ctx, &mut diags).handle(&program);
    assert_eq!(diags.error_count(), 0);

    let first = call(ident("bump"), vec![int(2)]);
    let repeat = call(ident("bump"), vec![int(2)]);
    let other = call(ident("bump"), vec![int(3)]);

    let mut eval = ComptimeEvaluator::new();
    let eval_ctx = EvalContext::new();
    let module_scope = store.module_scope("test").unwrap();
    let results = store.with_scope(module_scope, |store| {
        (
            eval.evaluate(&first, &eval_ctx, store, &mut diags),
            eval.evaluate(&repeat, &eval_ctx, store, &mut diags),
            eval.evaluate(&other, &eval_ctx, store, &mut diags),
        )
    });

    assert_eq!(results.0, Some(EvalValue::Int(5)));
    assert_eq!(results.1, Some(EvalValue::Int(5)));
    assert_eq!(results.2, Some(EvalValue::Int(6)));
    let stats = eval.stats();
    assert_eq!(stats.calls, 3);
    assert_eq!(stats.cache_hits, 1);
}

#[test]
fn comptime_bodies_reject_recursion() {
    let result = analyze_statements(vec![
        comptime_func(
            "loops",
            vec![param("x", "i64")],
            Some(named_ty("i64")),
            vec![ret(Some(call(ident("loops"), vec![ident("x")])))],
        ),
        let_stmt("a", None, Some(call(ident("loops"), vec![int(1)]))),
    ]);

    assert!(!result.success);
    assert!(has(&result, DiagnosticCode::NotComptimeEvaluable));
    assert!(message(&result, DiagnosticCode::NotComptimeEvaluable).contains("Recursive"));
}

#[test]
fn sizeof_folds_to_the_byte_width() {
    let mut store = ScopeStore::new();
    let mut diags = Diagnostics::new(100);
    let mut eval = ComptimeEvaluator::new();

    let expr = sizeof(named_ty("i32"));
    assert_eq!(
        eval.evaluate(&expr, &EvalContext::new(), &mut store, &mut diags),
        Some(EvalValue::Int(4))
    );
    assert!(diags.is_empty());
}
