//! Collection phase: builds the scope tree and declares every symbol.
//!
//! The collector walks each module in three passes so that declaration order
//! inside a module does not matter: type definitions, module variables, and
//! functions first, then imports, then everything else. Function bodies are
//! walked in source order. Scopes created here are recreated by name in later
//! phases, so anonymous scope names must be stable across the pipeline.

mod statements;
mod types;

use drift_ast::{Module, Program, Statement};
use drift_core::{DiagnosticCode, Diagnostics, Fault, Result, Span};
use tracing::{debug, trace};

use crate::context::ContextTracker;
use crate::phase::{AnalysisPhase, Phase};
use crate::scope::{ScopeId, ScopeKind};
use crate::store::ScopeStore;
use crate::symbols::SymbolKind;

/// Counters reported by [`Phase::log_statistics`].
#[derive(Debug, Default)]
pub(crate) struct CollectStats {
    modules: usize,
    symbols: usize,
    scopes: usize,
}

/// Phase 1: scope construction and symbol declaration.
pub struct Collector<'a> {
    store: &'a mut ScopeStore,
    ctx: &'a mut ContextTracker,
    diags: &'a mut Diagnostics,
    stats: CollectStats,
}

impl<'a> Collector<'a> {
    pub fn new(
        store: &'a mut ScopeStore,
        ctx: &'a mut ContextTracker,
        diags: &'a mut Diagnostics,
    ) -> Self {
        Self {
            store,
            ctx,
            diags,
            stats: CollectStats::default(),
        }
    }

    /// Runs `f` with `scope` as the current scope, restoring the previous
    /// current scope afterwards even if `f` exits early with `?`.
    pub(crate) fn in_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.store.current();
        self.store.set_current(scope);
        let result = f(self);
        self.store.set_current(previous);
        result
    }

    pub(crate) fn create_scope(
        &mut self,
        kind: ScopeKind,
        name: &str,
        span: Span,
    ) -> ScopeId {
        self.stats.scopes += 1;
        let parent = self.store.current();
        self.store.create_scope(kind, name, parent, span)
    }

    pub(crate) fn declare(&mut self, symbol: crate::symbols::Symbol) -> crate::symbols::SymbolId {
        self.stats.symbols += 1;
        self.store.add_symbol(symbol)
    }

    fn collect_module(&mut self, module: &Module) -> Result<()> {
        let scope = self.create_scope(ScopeKind::Module, &module.name, module.span);
        self.ctx.enter_module(&module.name);
        trace!(module = %module.name, "collecting module");

        let result = self.in_scope(scope, |c| {
            // Local declarations first so imports and bodies can see them all.
            for statement in &module.statements {
                if statement.is_local_declaration() {
                    c.collect_statement(statement, module)?;
                }
            }
            for statement in &module.statements {
                if matches!(statement, Statement::Use(_)) {
                    c.collect_statement(statement, module)?;
                }
            }
            for statement in &module.statements {
                if !statement.is_local_declaration() && !matches!(statement, Statement::Use(_)) {
                    c.collect_statement(statement, module)?;
                }
            }
            Ok(())
        });

        self.ctx.leave_module();
        result
    }

    /// Checks whether `name` can be declared in the current scope.
    ///
    /// Same-scope duplicates are errors, as is any collision with an existing
    /// `self`. Re-declaring a name from an enclosing scope is a warning for
    /// variables, functions, and parameters and an error for everything else.
    /// Names living in a type namespace never collide with lexical names.
    pub(crate) fn check_shadowing(&mut self, name: &str, kind: SymbolKind, span: Span) -> bool {
        let current = self.store.current();

        if name == "self" {
            if self.store.lookup_in(current, "self").is_some() {
                self.diags.error(
                    DiagnosticCode::DuplicateSelf,
                    "Duplicate 'self' parameter".to_string(),
                    span,
                );
                return false;
            }
            return true;
        }

        if self.store.lookup_in(current, name).is_some() {
            self.diags.error(
                DiagnosticCode::DuplicateSymbol,
                format!(
                    "{} '{name}' is already declared in this scope",
                    capitalize(kind.describe())
                ),
                span,
            );
            return false;
        }

        let declaring_in_type = self.store.scope(current).is_type_scope();
        let mut ancestor = self.store.scope(current).parent;
        while let Some(scope_id) = ancestor {
            let scope = self.store.scope(scope_id);
            if let Some(existing) = scope.symbols.get(name).copied() {
                // Type members and lexical names are independent namespaces.
                if scope.is_type_scope() != declaring_in_type {
                    ancestor = scope.parent;
                    continue;
                }
                let existing_kind = self.store.symbol(existing).kind;
                return match kind {
                    SymbolKind::Variable | SymbolKind::Function | SymbolKind::Parameter => {
                        self.diags.warning(
                            DiagnosticCode::ShadowedSymbol,
                            format!(
                                "'{name}' shadows a {} declared in an enclosing scope",
                                existing_kind.describe()
                            ),
                            span,
                        );
                        true
                    }
                    _ => {
                        self.diags.error(
                            DiagnosticCode::DuplicateSymbol,
                            format!(
                                "'{name}' is already declared as a {} in an enclosing scope",
                                existing_kind.describe()
                            ),
                            span,
                        );
                        false
                    }
                };
            }
            ancestor = scope.parent;
        }
        true
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

impl Phase for Collector<'_> {
    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::Collection
    }

    fn handle(&mut self, program: &Program) -> bool {
        let errors_before = self.diags.error_count();
        self.ctx.set_phase(AnalysisPhase::Collection);

        for module in program.modules.values() {
            if self.diags.at_error_limit() {
                break;
            }
            // Faults unwind past pushed frames; the snapshot puts the
            // stacks back after the error is reported at depth.
            let snapshot = self.ctx.save();
            if let Err(fault) = self.collect_module(module) {
                self.diags.error(
                    DiagnosticCode::InternalError,
                    format!("Collection failed in module '{}': {fault}", module.name),
                    self.ctx.current_span(),
                );
                self.ctx.restore(snapshot);
            }
            self.stats.modules += 1;
        }

        self.diags.error_count() == errors_before
    }

    fn reset(&mut self) {
        self.stats = CollectStats::default();
    }

    fn log_statistics(&self) {
        debug!(
            modules = self.stats.modules,
            symbols = self.stats.symbols,
            scopes = self.stats.scopes,
            "collection finished"
        );
    }
}
