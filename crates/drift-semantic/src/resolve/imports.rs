//! Import resolution.
//!
//! Module names may be dotted, so a specific import `use a.b.c` first
//! tries `a.b` as the module and `c` as the symbol; failing that it
//! treats `a` as the module and walks the rest through member scopes,
//! which covers nested types like `use geometry.Shapes.Circle`.

use drift_ast::UseStatement;
use drift_core::{DiagnosticCode, Result};

use crate::resolve::Resolver;
use crate::symbols::SymbolId;
use crate::types::Type;

impl Resolver<'_> {
    pub(crate) fn resolve_use(&mut self, import: &UseStatement) -> Result<()> {
        self.stats.imports += 1;

        if import.is_local_reexport() {
            match self.store.lookup_in(self.store.current(), &import.alias) {
                Some(id) => {
                    let symbol = self.store.symbol_mut(id);
                    symbol.is_exported = true;
                    symbol.used = true;
                }
                None => {
                    self.diags.error(
                        DiagnosticCode::UndefinedIdentifier,
                        format!("Cannot re-export undefined '{}'", import.alias),
                        import.span,
                    );
                }
            }
            return Ok(());
        }

        let Some(use_id) = self.store.lookup_in(self.store.current(), &import.alias) else {
            // Collection skipped the binding after a name collision.
            return Ok(());
        };

        if import.wildcard || import.path.len() == 1 {
            let module_name = import.path.join(".");
            if self.store.module_scope(&module_name).is_none() {
                self.diags.error(
                    DiagnosticCode::ModuleNotFound,
                    format!("Module '{module_name}' not found"),
                    import.span,
                );
                return Ok(());
            }
            let symbol = self.store.symbol_mut(use_id);
            symbol.ty = Some(Type::Module(module_name.clone()));
            symbol.use_meta_mut()?.target_module = Some(module_name);
            return Ok(());
        }

        self.resolve_specific_import(import, use_id)
    }

    fn resolve_specific_import(
        &mut self,
        import: &UseStatement,
        use_id: SymbolId,
    ) -> Result<()> {
        let path = &import.path;
        let module_prefix = path[..path.len() - 1].join(".");

        let (module_name, mut scope, remainder) =
            if let Some(scope) = self.store.module_scope(&module_prefix) {
                (module_prefix, scope, &path[path.len() - 1..])
            } else if let Some(scope) = self.store.module_scope(&path[0]) {
                (path[0].clone(), scope, &path[1..])
            } else {
                self.diags.error(
                    DiagnosticCode::ModuleNotFound,
                    format!("Module '{module_prefix}' not found"),
                    import.span,
                );
                return Ok(());
            };

        let mut target: Option<SymbolId> = None;
        for (position, segment) in remainder.iter().enumerate() {
            let Some(found) = self.store.lookup_in(scope, segment) else {
                let prefix = path[..path.len() - remainder.len() + position].join(".");
                self.diags.error(
                    DiagnosticCode::SymbolNotFoundInModule,
                    format!("'{segment}' not found in '{prefix}'"),
                    import.span,
                );
                return Ok(());
            };
            let symbol = self.store.symbol(found);
            if !symbol.is_exported && !symbol.is_builtin {
                self.diags.error(
                    DiagnosticCode::SymbolNotExported,
                    format!("'{segment}' is not public"),
                    import.span,
                );
            }
            if position + 1 < remainder.len() {
                let Some(next_scope) = symbol.definition_scope() else {
                    self.diags.error(
                        DiagnosticCode::InvalidImportPath,
                        format!("'{segment}' has no members to import from"),
                        import.span,
                    );
                    return Ok(());
                };
                scope = next_scope;
            }
            target = Some(found);
        }

        if let Some(target_id) = target {
            let target_ty = self.store.symbol(target_id).ty.clone();
            self.store.symbol_mut(target_id).used = true;
            let symbol = self.store.symbol_mut(use_id);
            symbol.ty = target_ty;
            let meta = symbol.use_meta_mut()?;
            meta.target = Some(target_id);
            meta.target_module = Some(module_name);
        }
        Ok(())
    }
}
