//! Declaration collection through the pipeline: duplicates, shadowing,
//! type members, and the strict declaration order.

mod common;
use common::*;

use drift_core::DiagnosticCode;

#[test]
fn duplicate_declarations_in_one_scope_error() {
    let result = analyze_statements(vec![
        let_stmt("x", None, Some(int(1))),
        let_stmt("x", None, Some(int(2))),
    ]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::DuplicateSymbol), 1);
    assert!(message(&result, DiagnosticCode::DuplicateSymbol).contains("already declared"));
}

#[test]
fn function_locals_shadow_module_bindings_with_a_warning() {
    let result = analyze_statements(vec![
        let_stmt("x", None, Some(int(0))),
        func("f", vec![], None, vec![let_stmt("x", None, Some(int(1)))]),
        expr_stmt(call(ident("f"), vec![])),
        let_stmt("keep", None, Some(ident("x"))),
    ]);

    assert!(result.success);
    assert_eq!(count(&result, DiagnosticCode::ShadowedSymbol), 1);
}

#[test]
fn type_members_do_not_shadow_lexical_names() {
    let result = analyze_statements(vec![
        let_stmt("title", None, Some(string("untitled"))),
        def("Document", struct_ty(vec![("title", named_ty("str"))])),
        let_stmt("keep", None, Some(ident("title"))),
    ]);

    assert!(result.success);
    assert_eq!(count(&result, DiagnosticCode::ShadowedSymbol), 0);
}

#[test]
fn duplicate_enum_variants_error() {
    let result = analyze_statements(vec![def(
        "Color",
        enum_ty(None, vec![variant("Red", None), variant("Red", None)]),
    )]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::DuplicateSymbol), 1);
    assert!(message(&result, DiagnosticCode::DuplicateSymbol).contains("declared twice"));
}

#[test]
fn enum_variants_resolve_as_type_members() {
    let result = analyze_statements(vec![
        def(
            "Color",
            enum_ty(None, vec![variant("Red", None), variant("Green", None)]),
        ),
        let_stmt("c", Some(named_ty("Color")), Some(member(ident("Color"), "Red"))),
    ]);

    assert!(result.success);
}

#[test]
fn type_aliases_denote_their_target() {
    let result = analyze_statements(vec![
        def("Meters", named_ty("i64")),
        let_stmt("d", Some(named_ty("Meters")), Some(int(5))),
    ]);

    assert!(result.success);
}

#[test]
fn names_are_unusable_before_their_statement() {
    let result = analyze_statements(vec![
        let_stmt("a", None, Some(ident("b"))),
        let_stmt("b", None, Some(int(2))),
    ]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::UsedBeforeDeclared), 1);
    assert_eq!(count(&result, DiagnosticCode::UndefinedIdentifier), 0);
    assert!(message(&result, DiagnosticCode::UsedBeforeDeclared).contains("'b'"));
}

#[test]
fn functions_are_not_hoisted_above_their_statement() {
    let result = analyze_statements(vec![
        expr_stmt(call(ident("late"), vec![])),
        func("late", vec![], None, vec![]),
    ]);

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::UsedBeforeDeclared), 1);
}
