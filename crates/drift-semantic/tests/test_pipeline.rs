//! Pipeline orchestration: phase ordering, best-effort continuation,
//! strict mode, the error budget, and run options.

mod common;

use common::*;
use drift_ast::BinaryOp;
use drift_core::DiagnosticCode;
use drift_semantic::{AnalysisPhase, Analyzer, AnalyzerOptions};

fn undefined_name() -> drift_ast::Program {
    program(vec![module("test", vec![expr_stmt(ident("ghost"))])])
}

#[test]
fn a_clean_program_runs_every_phase() {
    let result = analyze_statements(vec![
        def(
            "Color",
            enum_ty(None, vec![variant("Red", None), variant("Green", None)]),
        ),
        comptime_func(
            "double",
            vec![param("x", "i64")],
            Some(named_ty("i64")),
            vec![ret(Some(binary(BinaryOp::Mul, ident("x"), int(2))))],
        ),
        let_stmt(
            "eight",
            Some(named_ty("i64")),
            Some(call(ident("double"), vec![int(4)])),
        ),
        let_stmt(
            "c",
            Some(named_ty("Color")),
            Some(member(ident("Color"), "Red")),
        ),
        expr_stmt(match_expr(
            ident("c"),
            vec![
                arm(variant_pattern("Red", None), vec![]),
                arm(wildcard_pattern(), vec![]),
            ],
        )),
        while_loop(binary(BinaryOp::Less, ident("eight"), int(10)), vec![brk()]),
    ]);

    assert!(result.success);
    assert!(result.diagnostics.is_empty());
    assert_eq!(
        result.completed_phase,
        Some(AnalysisPhase::SemanticValidation)
    );
}

#[test]
fn variant_payloads_bound_their_arguments() {
    let result = analyze_statements(vec![
        def(
            "Color",
            enum_ty(
                None,
                vec![
                    variant("Red", None),
                    variant("Green", Some(named_ty("u8"))),
                ],
            ),
        ),
        expr_stmt(call(member(ident("Color"), "Green"), vec![int(300)])),
    ]);

    // The literal adapts to the payload type; only the width check fires.
    assert!(!result.success);
    assert_eq!(count(&result, DiagnosticCode::ArithmeticOverflow), 1);
    assert_eq!(count(&result, DiagnosticCode::TypeMismatch), 0);
}

#[test]
fn strict_mode_halts_after_a_failed_phase() {
    let strict = Analyzer::new(AnalyzerOptions::default().with_strict_mode(true))
        .analyze(&undefined_name());
    assert!(!strict.success);
    assert_eq!(strict.completed_phase, Some(AnalysisPhase::Resolution));

    let relaxed = Analyzer::new(AnalyzerOptions::default()).analyze(&undefined_name());
    assert!(!relaxed.success);
    assert_eq!(
        relaxed.completed_phase,
        Some(AnalysisPhase::SemanticValidation)
    );
}

#[test]
fn the_error_budget_stops_the_pipeline() {
    let result = Analyzer::new(AnalyzerOptions::default().with_max_errors(1)).analyze(&program(
        vec![module(
            "test",
            vec![
                expr_stmt(ident("ghost")),
                let_stmt("x", Some(named_ty("u8")), Some(int(300))),
            ],
        )],
    ));

    assert!(!result.success);
    assert_eq!(result.completed_phase, Some(AnalysisPhase::Resolution));
    // Type validation never ran, so the literal was never width-checked.
    assert_eq!(count(&result, DiagnosticCode::ArithmeticOverflow), 0);
}

#[test]
fn stopping_at_resolution_skips_constant_checks() {
    let result = Analyzer::new(AnalyzerOptions::default().with_stop_at(AnalysisPhase::Resolution))
        .analyze(&program(vec![module(
            "test",
            vec![let_stmt("x", Some(named_ty("u8")), Some(int(300)))],
        )]));

    assert!(result.success);
    assert!(result.diagnostics.is_empty());
    assert_eq!(result.completed_phase, Some(AnalysisPhase::Resolution));
}

#[test]
fn formatting_needs_a_clean_run() {
    let mut options = AnalyzerOptions::default();
    options.enable_formatting = true;

    let clean = Analyzer::new(options.clone()).analyze(&program(vec![module(
        "test",
        vec![pub_let("x", Some(named_ty("i64")), Some(int(1)))],
    )]));
    assert!(clean.formatting_eligible);

    let failing = Analyzer::new(options).analyze(&undefined_name());
    assert!(!failing.formatting_eligible);
}

#[test]
fn early_errors_do_not_suppress_whole_program_checks() {
    let mut analyzer = Analyzer::new(AnalyzerOptions::default().with_entry_module("main"));
    let result = analyzer.analyze(&program(vec![module(
        "main",
        vec![expr_stmt(ident("ghost"))],
    )]));

    assert!(!result.success);
    assert!(has(&result, DiagnosticCode::UndefinedIdentifier));
    assert_eq!(count(&result, DiagnosticCode::EntryModuleNoMain), 1);
}
