//! Whole-program validation: entry-point shape, unused symbols, module
//! integrity.
//!
//! Everything here needs the fully-resolved store, so it runs after the
//! per-module phases. All module-integrity findings are warnings; only
//! a malformed entry point is an error.

use drift_ast::Program;
use drift_core::{DiagnosticCode, Diagnostics, Fault, Result, Span};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::context::ContextTracker;
use crate::options::AnalyzerOptions;
use crate::phase::{AnalysisPhase, Phase};
use crate::store::ScopeStore;
use crate::symbols::{SymbolKind, SymbolMeta};
use crate::types::{IntType, Type};

#[derive(Debug, Default)]
struct ProgramStats {
    unused: usize,
    cycles: usize,
}

/// Phase 4: whole-program checks.
pub struct SemanticValidator<'a> {
    store: &'a mut ScopeStore,
    ctx: &'a mut ContextTracker,
    diags: &'a mut Diagnostics,
    entry_module: Option<String>,
    stats: ProgramStats,
}

impl<'a> SemanticValidator<'a> {
    pub fn new(
        store: &'a mut ScopeStore,
        ctx: &'a mut ContextTracker,
        diags: &'a mut Diagnostics,
        options: &AnalyzerOptions,
    ) -> Self {
        Self {
            store,
            ctx,
            diags,
            entry_module: options.entry_module.clone(),
            stats: ProgramStats::default(),
        }
    }

    fn validate_program(&mut self, program: &Program) -> Result<()> {
        trace!(modules = program.modules.len(), "running whole-program checks");
        self.check_entry_point(program)?;
        self.check_unused();
        self.check_modules(program);
        Ok(())
    }

    /// The entry module must exist and declare a public `main` with at
    /// most two parameters and a `void`/`i32`/`u8` return type.
    fn check_entry_point(&mut self, program: &Program) -> Result<()> {
        let Some(entry) = self.entry_module.clone() else {
            return Ok(());
        };
        let Some(module) = program.modules.get(&entry) else {
            self.diags.error(
                DiagnosticCode::EntryModuleNotFound,
                format!("Entry module '{entry}' was not found"),
                Span::SYNTHETIC,
            );
            return Ok(());
        };
        let scope = self
            .store
            .module_scope(&entry)
            .ok_or(Fault::NoCurrentModule("semantic validation"))?;
        let Some(main_id) = self.store.lookup_in(scope, "main") else {
            self.diags.error(
                DiagnosticCode::EntryModuleNoMain,
                format!("Entry module '{entry}' has no 'main' function"),
                module.span,
            );
            return Ok(());
        };

        let main = self.store.symbol(main_id);
        if main.kind != SymbolKind::Function {
            self.diags.error(
                DiagnosticCode::EntryModuleNoMain,
                format!(
                    "Entry module '{entry}' declares 'main' as a {}, not a function",
                    main.kind.describe()
                ),
                main.target_span,
            );
            return Ok(());
        }
        if !main.is_exported {
            self.diags.error(
                DiagnosticCode::MainNotPublic,
                "Function 'main' must be public",
                main.target_span,
            );
        }

        let meta = main.function_meta()?;
        if meta.params.len() > 2 {
            self.diags.error(
                DiagnosticCode::InvalidMainSignature,
                format!(
                    "Function 'main' takes at most 2 parameters, found {}",
                    meta.params.len()
                ),
                main.target_span,
            );
        }
        let ret = meta.return_type.clone().unwrap_or(Type::Void);
        if !matches!(ret, Type::Void | Type::Int(IntType::I32) | Type::Int(IntType::U8)) {
            self.diags.error(
                DiagnosticCode::InvalidMainSignature,
                format!("Function 'main' must return 'void', 'i32' or 'u8', found '{ret}'"),
                main.target_span,
            );
        }
        Ok(())
    }

    /// Reports declared-but-never-referenced symbols, one warning each,
    /// in declaration order.
    fn check_unused(&mut self) {
        for (id, symbol) in self.store.symbols() {
            // Overwritten duplicates already carry a duplicate-symbol
            // error; only the live binding is scanned.
            if self.store.lookup_in(symbol.scope, &symbol.name) != Some(id) {
                continue;
            }
            if symbol.used
                || !symbol.declared
                || symbol.is_exported
                || symbol.is_builtin
                || symbol.kind == SymbolKind::Use
                || symbol.name.starts_with('_')
                || matches!(symbol.name.as_str(), "main" | "self" | "selferr")
            {
                continue;
            }
            let (code, what) = match symbol.kind {
                SymbolKind::Variable => (DiagnosticCode::UnusedVariable, "Variable"),
                SymbolKind::Parameter => (DiagnosticCode::UnusedParameter, "Parameter"),
                SymbolKind::Function => (DiagnosticCode::UnusedFunction, "Function"),
                _ => (DiagnosticCode::UnusedSymbol, "Symbol"),
            };
            self.diags.warning(
                code,
                format!("{what} '{}' is never used", symbol.name),
                symbol.target_span,
            );
            self.stats.unused += 1;
        }
    }

    fn check_modules(&mut self, program: &Program) {
        for module in program.modules.values() {
            if module.statements.is_empty() {
                self.diags.warning(
                    DiagnosticCode::EmptyModule,
                    format!("Module '{}' is empty", module.name),
                    module.span,
                );
            }
        }
        self.check_import_cycles(program);
    }

    /// Depth-first search over `use` edges, one traversal per module.
    /// Each distinct cycle is reported once, at the import that closes
    /// it, no matter how many modules it is visible from.
    fn check_import_cycles(&mut self, program: &Program) {
        let mut edges: FxHashMap<&str, Vec<(String, Span)>> = FxHashMap::default();
        for name in program.modules.keys() {
            let Some(scope) = self.store.module_scope(name) else {
                continue;
            };
            let mut targets = Vec::new();
            for (_, symbol) in self.store.symbols_in(scope) {
                if symbol.kind != SymbolKind::Use {
                    continue;
                }
                if let SymbolMeta::Use(meta) = &symbol.meta
                    && let Some(target) = &meta.target_module
                    && target != name
                {
                    targets.push((target.clone(), symbol.target_span));
                }
            }
            edges.insert(name.as_str(), targets);
        }

        let mut reported = FxHashSet::default();
        for start in program.modules.keys() {
            let mut visited = FxHashSet::default();
            self.walk_imports(start, &mut Vec::new(), &mut visited, &edges, &mut reported);
        }
    }

    fn walk_imports(
        &mut self,
        current: &str,
        path: &mut Vec<String>,
        visited: &mut FxHashSet<String>,
        edges: &FxHashMap<&str, Vec<(String, Span)>>,
        reported: &mut FxHashSet<Vec<String>>,
    ) {
        if !visited.insert(current.to_string()) {
            return;
        }
        path.push(current.to_string());
        if let Some(targets) = edges.get(current) {
            for (target, span) in targets {
                if let Some(position) = path.iter().position(|name| name == target) {
                    if reported.insert(canonical_cycle(&path[position..])) {
                        let mut cycle = path[position..].to_vec();
                        cycle.push(target.clone());
                        self.diags.warning(
                            DiagnosticCode::ImportCycle,
                            format!("Import cycle: {}", cycle.join(" -> ")),
                            *span,
                        );
                        self.stats.cycles += 1;
                    }
                    continue;
                }
                self.walk_imports(target, path, visited, edges, reported);
            }
        }
        path.pop();
    }
}

/// Rotates a cycle so its lexicographically smallest module comes first,
/// making `a -> b -> a` and `b -> a -> b` the same cycle.
fn canonical_cycle(cycle: &[String]) -> Vec<String> {
    let Some(smallest) = cycle
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| *name)
        .map(|(index, _)| index)
    else {
        return Vec::new();
    };
    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[smallest..]);
    rotated.extend_from_slice(&cycle[..smallest]);
    rotated
}

impl Phase for SemanticValidator<'_> {
    fn phase(&self) -> AnalysisPhase {
        AnalysisPhase::SemanticValidation
    }

    fn handle(&mut self, program: &Program) -> bool {
        let errors_before = self.diags.error_count();
        self.ctx.set_phase(AnalysisPhase::SemanticValidation);
        if let Err(fault) = self.validate_program(program) {
            self.diags.error(
                DiagnosticCode::InternalError,
                format!("Semantic validation failed: {fault}"),
                self.ctx.current_span(),
            );
        }
        self.diags.error_count() == errors_before
    }

    fn reset(&mut self) {
        self.stats = ProgramStats::default();
    }

    fn log_statistics(&self) {
        debug!(
            unused = self.stats.unused,
            import_cycles = self.stats.cycles,
            "semantic validation finished"
        );
    }
}
