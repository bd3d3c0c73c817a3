//! Whole-program checks through the pipeline: entry-point shape, unused
//! symbols, and module integrity.

mod common;

use common::*;
use drift_core::DiagnosticCode;
use drift_semantic::{Analyzer, AnalyzerOptions, analyze};

#[test]
fn entry_modules_must_exist() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default().with_entry_module("main"));
    let result = analyzer.analyze(&program(vec![module(
        "lib",
        vec![pub_let("x", Some(named_ty("i64")), Some(int(1)))],
    )]));

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::EntryModuleNotFound), 1);
}

#[test]
fn entry_modules_must_declare_main() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default().with_entry_module("main"));
    let result = analyzer.analyze(&program(vec![module(
        "main",
        vec![pub_let("x", Some(named_ty("i64")), Some(int(1)))],
    )]));

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::EntryModuleNoMain), 1);
    assert!(message(&result, DiagnosticCode::EntryModuleNoMain).contains("has no 'main'"));
}

#[test]
fn main_must_be_a_function() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default().with_entry_module("main"));
    let result = analyzer.analyze(&program(vec![module(
        "main",
        vec![pub_let("main", Some(named_ty("i64")), Some(int(1)))],
    )]));

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::EntryModuleNoMain), 1);
    assert!(message(&result, DiagnosticCode::EntryModuleNoMain).contains("not a function"));
}

#[test]
fn main_must_be_public() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default().with_entry_module("main"));
    let result = analyzer.analyze(&program(vec![module(
        "main",
        vec![func("main", vec![], None, vec![])],
    )]));

    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::MainNotPublic), 1);
    assert!(message(&result, DiagnosticCode::MainNotPublic).contains("must be public"));
}

#[test]
fn main_signatures_are_constrained() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default().with_entry_module("main"));

    let crowded = analyzer.analyze(&program(vec![module(
        "main",
        vec![pub_func(
            "main",
            vec![param("a", "i64"), param("b", "i64"), param("c", "i64")],
            None,
            vec![],
        )],
    )]));
    assert!(!crowded.success);
    assert_eq!(count(&crowded, DiagnosticCode::InvalidMainSignature), 1);
    assert!(
        message(&crowded, DiagnosticCode::InvalidMainSignature).contains("at most 2 parameters")
    );

    let mistyped = analyzer.analyze(&program(vec![module(
        "main",
        vec![pub_func(
            "main",
            vec![],
            Some(named_ty("str")),
            vec![ret(Some(string("x")))],
        )],
    )]));
    assert!(!mistyped.success);
    assert_eq!(count(&mistyped, DiagnosticCode::InvalidMainSignature), 1);
    assert!(
        message(&mistyped, DiagnosticCode::InvalidMainSignature)
            .contains("must return 'void', 'i32' or 'u8'")
    );
}

#[test]
fn a_well_formed_entry_point_passes() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default().with_entry_module("main"));
    let result = analyzer.analyze(&program(vec![module(
        "main",
        vec![pub_func("main", vec![], None, vec![])],
    )]));

    assert!(result.success);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn unused_bindings_warn_without_failing() {
    let result = analyze_statements(vec![let_stmt("idle", Some(named_ty("i64")), Some(int(1)))]);

    assert!(result.success);
    assert_eq!(count(&result, DiagnosticCode::UnusedVariable), 1);
    assert!(message(&result, DiagnosticCode::UnusedVariable).contains("'idle'"));
    assert_eq!(result.errors().count(), 0);
    assert_eq!(result.warnings().count(), 1);
}

#[test]
fn underscore_names_skip_the_unused_scan() {
    let result = analyze_statements(vec![let_stmt(
        "_scratch",
        Some(named_ty("i64")),
        Some(int(1)),
    )]);

    assert!(result.success);
    assert!(result.diagnostics.is_empty());
}

#[test]
fn unused_parameters_and_functions_warn() {
    let result = analyze_statements(vec![
        func("f", vec![param("x", "i64")], None, vec![]),
        func("g", vec![], None, vec![]),
        expr_stmt(call(ident("f"), vec![int(1)])),
    ]);

    assert!(result.success);
    assert_eq!(count(&result, DiagnosticCode::UnusedParameter), 1);
    assert_eq!(count(&result, DiagnosticCode::UnusedFunction), 1);
    assert!(message(&result, DiagnosticCode::UnusedFunction).contains("'g'"));
}

#[test]
fn empty_modules_warn() {
    let result = analyze(&program(vec![module("empty", vec![])]));

    assert!(result.success);
    assert_eq!(count(&result, DiagnosticCode::EmptyModule), 1);
    assert!(message(&result, DiagnosticCode::EmptyModule).contains("'empty'"));
}

#[test]
fn import_cycles_warn_once() {
    let result = analyze(&program(vec![
        module(
            "a",
            vec![
                pub_let("x", Some(named_ty("i64")), Some(int(1))),
                use_path(&["b", "y"]),
            ],
        ),
        module(
            "b",
            vec![
                pub_let("y", Some(named_ty("i64")), Some(int(2))),
                use_path(&["a", "x"]),
            ],
        ),
    ]));

    assert!(result.success);
    assert_eq!(count(&result, DiagnosticCode::ImportCycle), 1);
    assert!(message(&result, DiagnosticCode::ImportCycle).contains("a -> b -> a"));
}
