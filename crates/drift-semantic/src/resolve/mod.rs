//! Resolution phase: binds every identifier to a symbol.
//!
//! Before a module is walked, the `declared` flag of all its non-import,
//! non-parameter symbols is reset and then re-affirmed as each declaration
//! statement is reached. Collection already made every name visible, so
//! lookups always find forward declarations; the reset is what turns a
//! lookup ahead of the declaration into a use-before-declared diagnostic
//! instead of a silent success.

mod expressions;
mod imports;
mod statements;
mod types;

pub(crate) use statements::finalize_signature;
pub(crate) use types::resolve_type_expr;

use drift_ast::{Module, Program};
use drift_core::{DiagnosticCode, Diagnostics, Fault, Result, Span};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::context::ContextTracker;
use crate::phase::{AnalysisPhase, Phase};
use crate::scope::ScopeId;
use crate::store::ScopeStore;
use crate::symbols::{SymbolId, SymbolKind};

/// Where an identifier is being resolved from, for the handful of rules
/// that depend on the enclosing method kind.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ResolveEnv {
    /// Inside the body of a `static` method.
    pub in_static_method: bool,
    /// The type scope of the enclosing method's struct, if any.
    pub struct_scope: Option<ScopeId>,
}

#[derive(Debug, Default)]
pub(crate) struct ResolveStats {
    identifiers: usize,
    cache_hits: usize,
    imports: usize,
    functions: usize,
}

/// Phase 2: name binding and signature finalization.
pub struct Resolver<'a> {
    store: &'a mut ScopeStore,
    ctx: &'a mut ContextTracker,
    diags: &'a mut Diagnostics,
    /// Memoized identifier resolution keyed by (module, name, span).
    /// A hit still marks the symbol used but repeats no diagnostics.
    ident_cache: FxHashMap<(String, String, Span), Option<SymbolId>>,
    stats: ResolveStats,
}

impl<'a> Resolver<'a> {
    pub fn new(
        store: &'a mut ScopeStore,
        ctx: &'a mut ContextTracker,
        diags: &'a mut Diagnostics,
    ) -> Self {
        Self {
            store,
            ctx,
            diags,
            ident_cache: FxHashMap::default(),
            stats: ResolveStats::default(),
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

    fn resolve_module(&mut self, module: &Module) -> Result<()> {
        self.reset_declared(&module.name);
        let scope = self
            .store
            .module_scope(&module.name)
            .ok_or(Fault::NoCurrentModule("resolution"))?;
        self.ctx.enter_module(&module.name);
        trace!(module = %module.name, "resolving module");

        let result = self.in_scope(scope, |r| {
            for statement in &module.statements {
                if r.diags.at_error_limit() {
                    break;
                }
                r.resolve_statement(statement, ResolveEnv::default())?;
            }
            Ok(())
        });

        self.ctx.leave_module();
        result
    }

    /// Clears `declared` for the module's own symbols. Imports and
    /// parameters stay declared: imports are hoisted by collection
    /// ordering, parameters by the function header.
    fn reset_declared(&mut self, module: &str) {
        for (_, symbol) in self.store.symbols_mut() {
            if symbol.module == module
                && !symbol.is_builtin
                && !matches!(symbol.kind, SymbolKind::Use | SymbolKind::Parameter)
            {
                symbol.declared = false;
            }
        }
    }

    /// Marks the symbol a declaration statement binds as reached.
    pub(crate) fn affirm(&mut self, name: &str) -> Option<SymbolId> {
        let id = self.store.lookup_in(self.store.current(), name)?;
        self.store.symbol_mut(id).declared = true;
        Some(id)
    }
}

impl Phase for Resolver<'_> {
    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::Resolution
    }

    fn handle(&mut self, program: &Program) -> bool {
        let errors_before = self.diags.error_count();
        self.ctx.set_phase(AnalysisPhase::Resolution);

        for module in program.modules.values() {
            if self.diags.at_error_limit() {
                break;
            }
            let snapshot = self.ctx.save();
            if let Err(fault) = self.resolve_module(module) {
                self.diags.error(
                    DiagnosticCode::InternalError,
                    format!("Resolution failed in module '{}': {fault}", module.name),
                    self.ctx.current_span(),
                );
                self.ctx.restore(snapshot);
            }
        }

        self.diags.error_count() == errors_before
    }

    fn reset(&mut self) {
        self.ident_cache.clear();
        self.stats = ResolveStats::default();
    }

    fn log_statistics(&self) {
        debug!(
            identifiers = self.stats.identifiers,
            cache_hits = self.stats.cache_hits,
            imports = self.stats.imports,
            functions = self.stats.functions,
            "resolution finished"
        );
    }
}
