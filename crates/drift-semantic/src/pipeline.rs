//! The pipeline driving the phases in their fixed order.

use drift_ast::Program;
use drift_core::{Diagnostic, Diagnostics};
use tracing::debug;

use crate::builtins::BuiltinConfig;
use crate::collect::Collector;
use crate::context::ContextTracker;
use crate::options::AnalyzerOptions;
use crate::phase::{AnalysisPhase, Phase};
use crate::program::SemanticValidator;
use crate::resolve::Resolver;
use crate::store::ScopeStore;
use crate::validate::{ExhaustivenessOracle, TypeValidator, VariantCoverage};

/// Outcome of one analysis run.
#[derive(Debug)]
pub struct AnalysisResult {
    /// True when no errors were reported. Warnings do not count.
    pub success: bool,
    /// Every reported finding, in emission order.
    pub diagnostics: Vec<Diagnostic>,
    /// The last phase that ran to its end, if any did.
    pub completed_phase: Option<AnalysisPhase>,
    /// True when the cosmetic formatting pass may run over this tree.
    pub formatting_eligible: bool,
}

impl AnalysisResult {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }
}

/// Owns the long-lived analysis state and drives the phases in order.
///
/// One analyzer serves one analysis at a time; `analyze` resets the
/// store and the context tracker on entry, so an instance can be reused
/// across runs.
pub struct Analyzer {
    options: AnalyzerOptions,
    builtins: BuiltinConfig,
    oracle: Box<dyn ExhaustivenessOracle>,
    store: ScopeStore,
    ctx: ContextTracker,
}

impl Analyzer {
    #[must_use]
    pub fn new(options: AnalyzerOptions) -> Self {
        Self {
            options,
            builtins: BuiltinConfig::default(),
            oracle: Box::new(VariantCoverage),
            store: ScopeStore::new(),
            ctx: ContextTracker::new(),
        }
    }

    #[must_use]
    pub fn with_builtins(mut self, builtins: BuiltinConfig) -> Self {
        self.builtins = builtins;
        self
    }

    #[must_use]
    pub fn with_oracle(mut self, oracle: impl ExhaustivenessOracle + 'static) -> Self {
        self.oracle = Box::new(oracle);
        self
    }

    /// The store of the most recent run, for embedders that want to
    /// inspect the resolved symbols afterwards.
    #[must_use]
    pub fn store(&self) -> &ScopeStore {
        &self.store
    }

    /// Runs the full pipeline over `program`.
    pub fn analyze(&mut self, program: &Program) -> AnalysisResult {
        self.store.reset();
        self.ctx.reset();
        self.builtins.install(&mut self.store);

        let mut diags = Diagnostics::new(self.options.max_errors)
            .with_duplicate_filter(self.options.diagnostic_filter);
        let debug_level = self.options.debug;

        // Each phase borrows the store, the tracker and the sink for its
        // whole run, so every phase lives in its own scope.
        let mut completed = None;
        for phase in AnalysisPhase::ALL {
            let ok = match phase {
                AnalysisPhase::Collection => {
                    let mut collector = Collector::new(&mut self.store, &mut self.ctx, &mut diags);
                    run_phase(&mut collector, program, debug_level)
                }
                AnalysisPhase::Resolution => {
                    let mut resolver = Resolver::new(&mut self.store, &mut self.ctx, &mut diags);
                    run_phase(&mut resolver, program, debug_level)
                }
                AnalysisPhase::TypeValidation => {
                    let mut validator = TypeValidator::new(
                        &mut self.store,
                        &mut self.ctx,
                        &mut diags,
                        self.oracle.as_ref(),
                    );
                    run_phase(&mut validator, program, debug_level)
                }
                AnalysisPhase::SemanticValidation => {
                    let mut validator = SemanticValidator::new(
                        &mut self.store,
                        &mut self.ctx,
                        &mut diags,
                        &self.options,
                    );
                    run_phase(&mut validator, program, debug_level)
                }
            };
            completed = Some(phase);

            if self.options.stop_at_phase == Some(phase) {
                debug!(%phase, "stopping at configured phase");
                break;
            }
            if diags.at_error_limit() {
                debug!(errors = diags.error_count(), "error budget spent");
                break;
            }
            if !ok && self.options.strict_mode {
                debug!(%phase, "strict mode halt after failed phase");
                break;
            }
        }

        let success = !diags.has_errors();
        AnalysisResult {
            success,
            formatting_eligible: self.options.enable_formatting && success,
            completed_phase: completed,
            diagnostics: diags.into_vec(),
        }
    }
}

fn run_phase<P: Phase>(phase: &mut P, program: &Program, debug_level: u8) -> bool {
    let ok = phase.handle(program);
    if debug_level > 0 {
        phase.log_statistics();
    }
    ok
}

/// Runs one analysis with default options and builtins.
pub fn analyze(program: &Program) -> AnalysisResult {
    Analyzer::new(AnalyzerOptions::default()).analyze(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_program_succeeds() {
        let result = analyze(&Program::new());
        assert!(result.success);
        assert!(result.diagnostics.is_empty());
        assert_eq!(
            result.completed_phase,
            Some(AnalysisPhase::SemanticValidation)
        );
        assert!(!result.formatting_eligible);
    }

    #[test]
    fn stop_at_phase_truncates_the_run() {
        let options = AnalyzerOptions::default().with_stop_at(AnalysisPhase::Collection);
        let result = Analyzer::new(options).analyze(&Program::new());
        assert_eq!(result.completed_phase, Some(AnalysisPhase::Collection));
    }

    #[test]
    fn an_analyzer_can_be_reused() {
        let mut analyzer = Analyzer::new(AnalyzerOptions::default());
        let first = analyzer.analyze(&Program::new());
        let second = analyzer.analyze(&Program::new());
        assert!(first.success);
        assert!(second.success);
        assert!(second.diagnostics.is_empty());
    }
}
