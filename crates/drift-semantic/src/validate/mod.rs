//! Type-validation phase: statement obligations, expression typing, and
//! constant evaluation.
//!
//! This phase owns the inference and evaluation engines. Statements are
//! dispatched per kind; expression typing is delegated to the inference
//! engine and constant boundaries (initializers, variant payloads,
//! struct fields, array sizes, discriminants) are folded by the
//! evaluator against their target types. Function bodies additionally
//! carry return/throw obligations tracked by a flag stack.

mod constants;
mod expressions;
mod statements;

use drift_ast::{MatchArm, Module, Pattern, Program};
use drift_core::{DiagnosticCode, Diagnostics, Fault, Result};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::context::ContextTracker;
use crate::eval::ComptimeEvaluator;
use crate::infer::TypeInference;
use crate::phase::{AnalysisPhase, Phase};
use crate::scope::ScopeId;
use crate::store::ScopeStore;
use crate::symbols::SymbolKind;
use crate::types::{Type, TypeKind};

/// Decides whether a set of match arms covers every value of a subject
/// type. Kept behind a trait so embedders can swap in a smarter check
/// (integer range coverage, guard-aware analysis) without touching the
/// validator.
pub trait ExhaustivenessOracle {
    fn covers(&self, subject: &Type, arms: &[MatchArm], store: &ScopeStore) -> bool;
}

/// Default coverage rule: a wildcard arm covers anything, `bool` needs
/// both literal values, enums and error sets need every variant named.
/// Open domains (integers, strings, chars) always need a wildcard.
#[derive(Debug, Clone, Copy, Default)]
pub struct VariantCoverage;

impl ExhaustivenessOracle for VariantCoverage {
    fn covers(&self, subject: &Type, arms: &[MatchArm], store: &ScopeStore) -> bool {
        if arms.iter().any(|arm| arm.pattern.is_wildcard()) {
            return true;
        }
        match subject {
            Type::Bool => {
                let mut seen = [false, false];
                for arm in arms {
                    if let Pattern::Bool { value, .. } = &arm.pattern {
                        seen[usize::from(*value)] = true;
                    }
                }
                seen[0] && seen[1]
            }
            Type::Named(named) if matches!(named.kind, TypeKind::Enum | TypeKind::Error) => {
                let covered: FxHashSet<&str> = arms
                    .iter()
                    .filter_map(|arm| match &arm.pattern {
                        Pattern::Variant { name, .. } => Some(name.as_str()),
                        _ => None,
                    })
                    .collect();
                store
                    .symbols_in(named.scope)
                    .filter(|(_, symbol)| {
                        matches!(symbol.kind, SymbolKind::EnumVariant | SymbolKind::Error)
                    })
                    .all(|(_, symbol)| covered.contains(symbol.name.as_str()))
            }
            _ => false,
        }
    }
}

/// Return/throw obligations of the function whose body is being walked.
#[derive(Debug, Clone, Copy, Default)]
struct FnFlags {
    saw_return: bool,
    saw_throw: bool,
}

#[derive(Debug, Default)]
pub(crate) struct ValidateStats {
    functions: usize,
    statements: usize,
}

/// Phase 3: statement and type validation.
pub struct TypeValidator<'a> {
    store: &'a mut ScopeStore,
    ctx: &'a mut ContextTracker,
    diags: &'a mut Diagnostics,
    oracle: &'a dyn ExhaustivenessOracle,
    infer: TypeInference,
    eval: ComptimeEvaluator,
    /// One frame per nested function body.
    fn_flags: Vec<FnFlags>,
    stats: ValidateStats,
}

impl<'a> TypeValidator<'a> {
    pub fn new(
        store: &'a mut ScopeStore,
        ctx: &'a mut ContextTracker,
        diags: &'a mut Diagnostics,
        oracle: &'a dyn ExhaustivenessOracle,
    ) -> Self {
        Self {
            store,
            ctx,
            diags,
            oracle,
            infer: TypeInference::new(),
            eval: ComptimeEvaluator::new(),
            fn_flags: Vec::new(),
            stats: ValidateStats::default(),
        }
    }

    pub(crate) fn in_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.store.current();
        self.store.set_current(scope);
        let result = f(self);
        self.store.set_current(previous);
        result
    }

    /// Runs `f` with the context tracker snapshotted, restoring its stacks
    /// afterwards. Used around non-linear regions like branch bodies.
    pub(crate) fn saved<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let snapshot = self.ctx.save();
        let result = f(self);
        self.ctx.restore(snapshot);
        result
    }

    fn validate_module(&mut self, module: &Module) -> Result<()> {
        let scope = self
            .store
            .module_scope(&module.name)
            .ok_or(Fault::NoCurrentModule("type validation"))?;
        self.ctx.enter_module(&module.name);
        trace!(module = %module.name, "validating module");

        let result = self.in_scope(scope, |v| {
            for statement in &module.statements {
                if v.diags.at_error_limit() {
                    break;
                }
                v.validate_statement(statement)?;
            }
            Ok(())
        });

        self.ctx.leave_module();
        result
    }
}

impl Phase for TypeValidator<'_> {
    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::TypeValidation
    }

    fn handle(&mut self, program: &Program) -> bool {
        let errors_before = self.diags.error_count();
        self.ctx.set_phase(AnalysisPhase::TypeValidation);

        for module in program.modules.values() {
            if self.diags.at_error_limit() {
                break;
            }
            let snapshot = self.ctx.save();
            if let Err(fault) = self.validate_module(module) {
                self.diags.error(
                    DiagnosticCode::InternalError,
                    format!("Type validation failed in module '{}': {fault}", module.name),
                    self.ctx.current_span(),
                );
                self.ctx.restore(snapshot);
            }
        }

        self.diags.error_count() == errors_before
    }

    fn reset(&mut self) {
        self.infer.reset();
        self.eval.reset();
        self.fn_flags.clear();
        self.stats = ValidateStats::default();
    }

    fn log_statistics(&self) {
        let infer = self.infer.stats();
        let eval = self.eval.stats();
        debug!(
            functions = self.stats.functions,
            statements = self.stats.statements,
            inferred = infer.inferred,
            inference_cache_hits = infer.cache_hits,
            evaluated = eval.evaluated,
            comptime_calls = eval.calls,
            comptime_cache_hits = eval.cache_hits,
            "type validation finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKind;
    use crate::symbols::{Symbol, SymbolMeta};
    use crate::types::NamedType;
    use drift_ast::Block;
    use drift_core::Span;

    fn arm(pattern: Pattern, span: Span) -> MatchArm {
        MatchArm {
            pattern,
            body: Block::new(Vec::new(), span),
            span,
        }
    }

    #[test]
    fn wildcards_cover_open_domains() {
        let store = ScopeStore::new();
        let oracle = VariantCoverage;
        let span = Span::new(0, 1);

        let arms = [arm(Pattern::Wildcard { span }, span)];
        assert!(oracle.covers(&Type::Str, &arms, &store));

        let arms = [arm(
            Pattern::Int {
                value: 1,
                negative: false,
                span,
            },
            span,
        )];
        assert!(!oracle.covers(&Type::Str, &arms, &store));
    }

    #[test]
    fn bool_subjects_need_both_values() {
        let store = ScopeStore::new();
        let oracle = VariantCoverage;
        let span = Span::new(0, 1);

        let both = [
            arm(Pattern::Bool { value: true, span }, span),
            arm(Pattern::Bool { value: false, span }, span),
        ];
        assert!(oracle.covers(&Type::Bool, &both, &store));

        let one = [arm(Pattern::Bool { value: true, span }, span)];
        assert!(!oracle.covers(&Type::Bool, &one, &store));
    }

    #[test]
    fn enum_subjects_need_every_variant() {
        let mut store = ScopeStore::new();
        let span = Span::new(0, 10);
        let scope = store.create_scope(ScopeKind::Type, "Color", store.global(), span);
        for name in ["Red", "Green"] {
            store.add_symbol(
                Symbol::new(name, SymbolKind::EnumVariant, scope, "main")
                    .with_meta(SymbolMeta::EnumVariant(crate::symbols::EnumVariantMeta {
                        payload: None,
                        discriminant: None,
                    })),
            );
        }
        let subject = Type::Named(NamedType {
            name: "Color".to_string(),
            kind: TypeKind::Enum,
            scope,
        });
        let oracle = VariantCoverage;

        let variant = |name: &str| {
            arm(
                Pattern::Variant {
                    name: name.to_string(),
                    binding: None,
                    span,
                },
                span,
            )
        };
        assert!(oracle.covers(&subject, &[variant("Red"), variant("Green")], &store));
        assert!(!oracle.covers(&subject, &[variant("Red")], &store));
    }
}
