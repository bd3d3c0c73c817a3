//! Statement resolution.

use drift_ast::{
    DefStatement, FuncStatement, LetStatement, Statement, StructMember, TypeExpr,
};
use drift_core::{DiagnosticCode, Result};

use crate::context::ExprContext;
use crate::resolve::{ResolveEnv, Resolver, resolve_type_expr};
use crate::scope::{ScopeKind, anon_scope_name};
use crate::store::ScopeStore;
use crate::symbols::{ErrorMode, SymbolId, SymbolKind, SymbolMeta};
use crate::types::{FunctionType, NamedType, Type, TypeKind};

impl Resolver<'_> {
    pub(crate) fn resolve_statement(
        &mut self,
        statement: &Statement,
        env: ResolveEnv,
    ) -> Result<()> {
        self.ctx.push_span(statement.span());
        let result = self.resolve_statement_inner(statement, env);
        self.ctx.pop_span();
        result
    }

    fn resolve_statement_inner(&mut self, statement: &Statement, env: ResolveEnv) -> Result<()> {
        match statement {
            Statement::Def(def) => self.resolve_def(def, env),
            Statement::Let(decl) => self.resolve_let(decl, env),
            Statement::Func(func) => self.resolve_func(func, env),
            Statement::Use(import) => self.resolve_use(import),
            Statement::Return { value, .. } => match value {
                Some(expression) => self.resolve_expression(expression, env),
                None => Ok(()),
            },
            Statement::Throw { value, .. } => self.resolve_expression(value, env),
            Statement::While(stmt) => {
                self.resolve_expression(&stmt.condition, env)?;
                let name = anon_scope_name("while", stmt.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Loop) else {
                    return Ok(());
                };
                self.in_scope(scope, |r| {
                    r.ctx.push_expr(ExprContext::Loop, None, stmt.span);
                    let result = r.resolve_statements(&stmt.body.statements, env);
                    r.ctx.pop_expr();
                    result
                })
            }
            Statement::For(stmt) => {
                self.resolve_expression(&stmt.iterable, env)?;
                let name = anon_scope_name("for", stmt.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Loop) else {
                    return Ok(());
                };
                self.in_scope(scope, |r| {
                    r.affirm(&stmt.binding);
                    r.ctx.push_expr(ExprContext::Loop, None, stmt.span);
                    let result = r.resolve_statements(&stmt.body.statements, env);
                    r.ctx.pop_expr();
                    result
                })
            }
            Statement::Break { .. } | Statement::Continue { .. } => Ok(()),
            Statement::Block(block) => {
                let name = anon_scope_name("block", block.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Block) else {
                    return Ok(());
                };
                self.in_scope(scope, |r| r.resolve_statements(&block.statements, env))
            }
            Statement::Expr { expression, .. } => self.resolve_expression(expression, env),
        }
    }

    pub(crate) fn resolve_statements(
        &mut self,
        statements: &[Statement],
        env: ResolveEnv,
    ) -> Result<()> {
        for statement in statements {
            self.resolve_statement(statement, env)?;
        }
        Ok(())
    }

    fn resolve_def(&mut self, def: &DefStatement, env: ResolveEnv) -> Result<()> {
        let Some(id) = self.affirm(&def.name) else {
            return Ok(());
        };
        match &def.value {
            TypeExpr::Struct { members, .. } => {
                let Some(scope) = self.store.symbol(id).definition_scope() else {
                    return Ok(());
                };
                self.in_scope(scope, |r| -> Result<()> {
                    for member in members {
                        match member {
                            StructMember::Field(field) => {
                                let resolved =
                                    resolve_type_expr(&field.ty, r.store, r.diags);
                                if let Some(field_id) =
                                    r.store.lookup_in(r.store.current(), &field.name)
                                    && let Some(ty) = resolved
                                {
                                    r.store.symbol_mut(field_id).ty = Some(ty);
                                }
                                if let Some(default) = &field.default {
                                    r.resolve_expression(default, env)?;
                                }
                            }
                            StructMember::Func(func) => r.resolve_func(func, env)?,
                        }
                    }
                    Ok(())
                })
            }
            TypeExpr::Enum {
                backing, variants, ..
            } => {
                if let Some(backing) = backing {
                    resolve_type_expr(backing, self.store, self.diags);
                }
                let Some(scope) = self.store.symbol(id).definition_scope() else {
                    return Ok(());
                };
                self.in_scope(scope, |r| -> Result<()> {
                    for variant in variants {
                        let payload_ty = variant
                            .payload
                            .as_ref()
                            .and_then(|payload| resolve_type_expr(payload, r.store, r.diags));
                        if let Some(variant_id) =
                            r.store.lookup_in(r.store.current(), &variant.name)
                            && let SymbolMeta::EnumVariant(meta) =
                                &mut r.store.symbol_mut(variant_id).meta
                        {
                            meta.payload = payload_ty;
                        }
                        if let Some(discriminant) = &variant.discriminant {
                            r.resolve_expression(discriminant, env)?;
                        }
                    }
                    Ok(())
                })
            }
            TypeExpr::ErrorSet { .. } => Ok(()),
            other => {
                if self.store.symbol(id).ty.is_none()
                    && let Some(ty) = resolve_type_expr(other, self.store, self.diags)
                {
                    self.store.symbol_mut(id).ty = Some(ty);
                }
                Ok(())
            }
        }
    }

    fn resolve_let(&mut self, decl: &LetStatement, env: ResolveEnv) -> Result<()> {
        let symbol_id = self.affirm(&decl.name);
        let scope = self.store.current();
        self.ctx.push_decl(&decl.name, symbol_id, decl.span, scope);

        if let Some(ty_expr) = &decl.ty {
            let resolved = resolve_type_expr(ty_expr, self.store, self.diags);
            if let (Some(id), Some(ty)) = (symbol_id, resolved) {
                self.store.symbol_mut(id).ty = Some(ty);
            }
        }
        let result = match &decl.init {
            Some(init) => {
                self.ctx.begin_initializer();
                self.ctx.push_expr(ExprContext::Initializer, symbol_id, init.span());
                let result = self.resolve_expression(init, env);
                self.ctx.pop_expr();
                result
            }
            None => Ok(()),
        };

        self.ctx.pop_decl();
        result
    }

    pub(crate) fn resolve_func(&mut self, func: &FuncStatement, env: ResolveEnv) -> Result<()> {
        let Some(fn_id) = self.affirm(&func.name) else {
            return Ok(());
        };
        self.stats.functions += 1;

        let declaring = self.store.current();
        let is_struct_member = self.store.scope(declaring).type_kind() == Some(TypeKind::Struct);
        let fn_scope = {
            let meta = self.store.symbol(fn_id).function_meta()?;
            meta.scope
        };
        let inner_env = if is_struct_member {
            ResolveEnv {
                in_static_method: func.is_static,
                struct_scope: Some(declaring),
            }
        } else {
            env
        };

        self.in_scope(fn_scope, |r| -> Result<()> {
            r.ctx.push_expr(ExprContext::Function, Some(fn_id), func.span);

            // Parameter index table drives forward-reference checks while
            // defaults are resolved.
            let param_ids = r.store.symbol(fn_id).function_meta()?.params.clone();
            let mut table = Vec::with_capacity(param_ids.len());
            for id in &param_ids {
                let symbol = r.store.symbol(*id);
                if let SymbolMeta::Parameter(meta) = &symbol.meta
                    && !meta.is_self
                {
                    table.push((symbol.name.clone(), meta.index));
                }
            }
            r.ctx.begin_params(table);

            for param in &func.params {
                let Some(param_id) = r.store.lookup_in(r.store.current(), &param.name) else {
                    continue;
                };
                if r.store.symbol(param_id).kind != SymbolKind::Parameter {
                    continue;
                }
                if let Some(ty_expr) = &param.ty
                    && let Some(ty) = resolve_type_expr(ty_expr, r.store, r.diags)
                {
                    r.store.symbol_mut(param_id).ty = Some(ty);
                }
                if let Some(default) = &param.default {
                    let index = match &r.store.symbol(param_id).meta {
                        SymbolMeta::Parameter(meta) => meta.index,
                        _ => 0,
                    };
                    r.ctx.set_current_param(Some(index));
                    r.ctx.push_decl(&param.name, Some(param_id), param.span, fn_scope);
                    r.ctx.begin_initializer();
                    let result = r.resolve_expression(default, inner_env);
                    r.ctx.pop_decl();
                    r.ctx.set_current_param(None);
                    result?;
                }
            }
            r.ctx.end_params();

            r.resolve_error_spec(func, fn_id)?;

            let return_type = match &func.return_type {
                Some(ty_expr) => resolve_type_expr(ty_expr, r.store, r.diags),
                None => Some(Type::Void),
            };
            if let Some(ret) = return_type {
                r.store.symbol_mut(fn_id).function_meta_mut()?.return_type = Some(ret);
            }
            finalize_signature(r.store, fn_id)?;

            let result = r.resolve_statements(&func.body.statements, inner_env);
            r.ctx.pop_expr();
            result
        })
    }

    fn resolve_error_spec(&mut self, func: &FuncStatement, fn_id: SymbolId) -> Result<()> {
        let error = self.store.symbol(fn_id).function_meta()?.error.clone();
        if let Some(ErrorMode::Named { name }) = error {
            let span = func
                .error_set
                .as_ref()
                .map_or(func.span, drift_ast::ErrorSpec::span);
            match self.store.lookup_symbol(&name) {
                Some(id) => {
                    let symbol = self.store.symbol(id);
                    let is_error_set = symbol.kind == SymbolKind::Definition
                        && matches!(
                            &symbol.meta,
                            SymbolMeta::Definition(meta)
                                if meta.type_kind == Some(TypeKind::Error)
                        );
                    if is_error_set {
                        self.store.symbol_mut(id).used = true;
                    } else {
                        self.diags.error(
                            DiagnosticCode::UndefinedType,
                            format!("'{name}' is not an error set"),
                            span,
                        );
                    }
                }
                None => {
                    self.diags.error(
                        DiagnosticCode::UndefinedType,
                        format!("Unknown error set '{name}'"),
                        span,
                    );
                }
            }
        }
        Ok(())
    }

}

/// Rebuilds a function symbol's `fn(..) -> ..` type from its parameter
/// symbols. Skipped while any non-self parameter still lacks a type; the
/// validator re-runs it after inferring defaulted parameters.
pub(crate) fn finalize_signature(store: &mut ScopeStore, fn_id: SymbolId) -> Result<()> {
    let (param_ids, return_type, error_mode) = {
        let meta = store.symbol(fn_id).function_meta()?;
        (meta.params.clone(), meta.return_type.clone(), meta.error.clone())
    };

    let mut params = Vec::with_capacity(param_ids.len());
    for id in param_ids {
        let symbol = store.symbol(id);
        if matches!(&symbol.meta, SymbolMeta::Parameter(meta) if meta.is_self) {
            continue;
        }
        match &symbol.ty {
            Some(ty) => params.push(ty.clone()),
            None => return Ok(()),
        }
    }

    let fn_scope = store.symbol(fn_id).function_meta()?.scope;
    let error = match error_mode {
        Some(ErrorMode::Named { name }) => store
            .lookup_from(fn_scope, &name)
            .and_then(|id| store.symbol(id).ty.clone()),
        Some(ErrorMode::SelfGroup { scope }) => Some(Type::Named(NamedType {
            name: "selferr".to_string(),
            kind: TypeKind::Error,
            scope,
        })),
        None => None,
    };

    store.symbol_mut(fn_id).ty = Some(Type::Function(Box::new(FunctionType {
        params,
        return_type: return_type.unwrap_or(Type::Void),
        error,
    })));
    Ok(())
}
