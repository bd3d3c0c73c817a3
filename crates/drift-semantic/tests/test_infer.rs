//! Inference behavior observable through the pipeline: annotations,
//! operators, calls, optionals, and the per-node memo.

mod common;
use common::*;

use drift_ast::BinaryOp;
use drift_core::{DiagnosticCode, Diagnostics};
use drift_semantic::{ScopeStore, TypeInference};

#[test]
fn unannotated_lets_freeze_at_the_default_width() {
    // `x` concretizes to i64, so a narrower annotation downstream fails.
    let result = analyze_statements(vec![
        let_stmt("x", None, Some(int(42))),
        let_stmt("y", Some(named_ty("i8")), Some(ident("x"))),
    ]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::TypeMismatch), 1);
    assert!(message(&result, DiagnosticCode::TypeMismatch).contains("'i64'"));
}

#[test]
fn strings_do_not_coerce_to_ints() {
    let result = analyze_statements(vec![let_stmt(
        "x",
        Some(named_ty("i32")),
        Some(string("hello")),
    )]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::TypeMismatch), 1);
}

#[test]
fn comparisons_yield_bool() {
    let result = analyze_statements(vec![let_stmt(
        "b",
        Some(named_ty("bool")),
        Some(binary(BinaryOp::Less, int(1), int(2))),
    )]);

    assert!(result.success);
}

#[test]
fn loop_conditions_must_be_bool() {
    let result = analyze_statements(vec![while_loop(int(1), vec![])]);

    assert!(!result.success);
    assert!(has(&result, DiagnosticCode::ConditionNotBool));
}

#[test]
fn call_arguments_check_against_parameter_types() {
    let result = analyze_statements(vec![
        func("greet", vec![param("times", "i64")], None, vec![]),
        expr_stmt(call(ident("greet"), vec![string("now")])),
    ]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::TypeMismatch), 1);
}

#[test]
fn argument_counts_are_enforced() {
    let result = analyze_statements(vec![
        func(
            "pair",
            vec![param("a", "i64"), param("b", "i64")],
            None,
            vec![],
        ),
        expr_stmt(call(ident("pair"), vec![int(1)])),
    ]);

    assert!(!result.success);
    assert!(has(&result, DiagnosticCode::WrongArgumentCount));
    assert!(message(&result, DiagnosticCode::WrongArgumentCount).contains("2 arguments"));
}

#[test]
fn only_functions_are_callable() {
    let result = analyze_statements(vec![
        let_stmt("v", Some(named_ty("i64")), Some(int(1))),
        expr_stmt(call(ident("v"), vec![])),
    ]);

    assert!(!result.success);
    assert!(has(&result, DiagnosticCode::NotCallable));
}

#[test]
fn undefined_names_report_once() {
    let result = analyze_statements(vec![let_stmt("x", None, Some(ident("missing")))]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::UndefinedIdentifier), 1);
    assert!(message(&result, DiagnosticCode::UndefinedIdentifier).contains("missing"));
    // The let stays silent; the hole was already reported.
    assert_eq!(count(&result, DiagnosticCode::CannotInferType), 0);
}

#[test]
fn conditional_branches_must_agree() {
    let result = analyze_statements(vec![let_stmt(
        "x",
        None,
        Some(if_expr(
            boolean(true),
            vec![expr_stmt(int(1))],
            Some(vec![expr_stmt(string("s"))]),
        )),
    )]);

    assert!(!result.success);
    assert!(has(&result, DiagnosticCode::TypeMismatch));
}

#[test]
fn orelse_unwraps_optionals() {
    let unwrapped = analyze_statements(vec![
        let_stmt("a", Some(optional_ty(named_ty("i64"))), Some(int(5))),
        let_stmt("b", Some(named_ty("i64")), Some(orelse(ident("a"), int(0)))),
    ]);
    assert!(unwrapped.success);

    let mismatched = analyze_statements(vec![
        let_stmt("a", Some(optional_ty(named_ty("i64"))), Some(int(5))),
        let_stmt(
            "b",
            Some(named_ty("i64")),
            Some(orelse(ident("a"), string("fallback"))),
        ),
    ]);
    assert!(!mismatched.success);
    assert_eq!(count(&mismatched, DiagnosticCode::TypeMismatch), 1);
}

#[test]
fn range_bounds_must_be_integers() {
    let result = analyze_statements(vec![let_stmt(
        "r",
        None,
        Some(range(string("a"), int(3), false)),
    )]);

    assert!(!result.success);
    assert!(has(&result, DiagnosticCode::TypeMismatch));
}

#[test]
fn inference_memoizes_by_expression_identity() {
    let mut store = ScopeStore::new();
    let mut diags = Diagnostics::new(100);
    let mut infer = TypeInference::new();

    let expr = binary(BinaryOp::Add, int(1), int(2));
    let first = infer.infer(&expr, &mut store, &mut diags);
    assert!(first.is_some());
    assert_eq!(infer.stats().inferred, 3);
    assert_eq!(infer.stats().cache_hits, 0);

    let again = infer.infer(&expr, &mut store, &mut diags);
    assert_eq!(again, first);
    assert_eq!(infer.stats().inferred, 3);
    assert_eq!(infer.stats().cache_hits, 1);
}
