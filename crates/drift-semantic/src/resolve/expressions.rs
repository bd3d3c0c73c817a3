//! Expression resolution.
//!
//! Identifier resolution is memoized per (module, name, span); a cache
//! hit still marks the symbol used but never repeats diagnostics, so a
//! re-walked expression cannot double-report.

use drift_ast::{Block, Expression, Pattern};
use drift_core::{DiagnosticCode, Result, Span};

use crate::context::ExprContext;
use crate::resolve::{ResolveEnv, Resolver, resolve_type_expr};
use crate::scope::{ScopeKind, anon_scope_name};
use crate::symbols::{SymbolId, SymbolKind};

impl Resolver<'_> {
    pub(crate) fn resolve_expression(
        &mut self,
        expr: &Expression,
        env: ResolveEnv,
    ) -> Result<()> {
        match expr {
            Expression::Int { .. }
            | Expression::Float { .. }
            | Expression::Bool { .. }
            | Expression::Char { .. }
            | Expression::Str { .. }
            | Expression::Null { .. } => Ok(()),
            Expression::Identifier { name, span } => {
                self.resolve_identifier(name, *span, env)?;
                Ok(())
            }
            Expression::Binary { lhs, rhs, .. } => {
                self.resolve_expression(lhs, env)?;
                self.resolve_expression(rhs, env)
            }
            Expression::Assign { target, value, .. } => {
                self.resolve_assign_target(target, env)?;
                self.resolve_expression(value, env)
            }
            Expression::Prefix { operand, .. } | Expression::Try { operand, .. } => {
                self.resolve_expression(operand, env)
            }
            Expression::As { operand, ty, .. } => {
                self.resolve_expression(operand, env)?;
                resolve_type_expr(ty, self.store, self.diags);
                Ok(())
            }
            Expression::Sizeof { ty, .. } => {
                resolve_type_expr(ty, self.store, self.diags);
                Ok(())
            }
            Expression::Call { callee, args, .. } => {
                self.resolve_expression(callee, env)?;
                for arg in args {
                    self.resolve_expression(arg, env)?;
                }
                Ok(())
            }
            Expression::Member {
                object,
                member,
                member_span,
                ..
            } => self.resolve_member(object, member, *member_span, env),
            Expression::Index { object, index, .. } => {
                self.resolve_expression(object, env)?;
                self.resolve_expression(index, env)
            }
            Expression::Orelse {
                value, fallback, ..
            } => {
                self.resolve_expression(value, env)?;
                self.resolve_expression(fallback, env)
            }
            Expression::Range { start, end, .. } => {
                if let Some(start) = start {
                    self.resolve_expression(start, env)?;
                }
                if let Some(end) = end {
                    self.resolve_expression(end, env)?;
                }
                Ok(())
            }
            Expression::Catch {
                operand,
                binding,
                handler,
                ..
            } => {
                self.resolve_expression(operand, env)?;
                let name = anon_scope_name("catch", handler.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Expression)
                else {
                    return Ok(());
                };
                self.saved(|r| {
                    r.in_scope(scope, |r| {
                        r.ctx.push_expr(ExprContext::Catch, None, handler.span);
                        if let Some(binding) = binding {
                            r.affirm(binding);
                        }
                        r.resolve_statements(&handler.statements, env)
                    })
                })
            }
            Expression::If(if_expr) => {
                self.resolve_expression(&if_expr.condition, env)?;
                self.resolve_branch("then", &if_expr.then_block, env)?;
                for else_if in &if_expr.else_ifs {
                    self.resolve_expression(&else_if.condition, env)?;
                    self.resolve_branch("then", &else_if.block, env)?;
                }
                match &if_expr.else_block {
                    Some(block) => self.resolve_branch("else", block, env),
                    None => Ok(()),
                }
            }
            Expression::Match(match_expr) => {
                self.resolve_expression(&match_expr.subject, env)?;
                for arm in &match_expr.arms {
                    let name = anon_scope_name("arm", arm.span);
                    let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Expression)
                    else {
                        continue;
                    };
                    self.saved(|r| {
                        r.in_scope(scope, |r| {
                            r.ctx.push_expr(ExprContext::Match, None, arm.span);
                            if let Pattern::Variant {
                                binding: Some(binding),
                                ..
                            } = &arm.pattern
                            {
                                r.affirm(binding);
                            }
                            r.resolve_statements(&arm.body.statements, env)
                        })
                    })?;
                }
                Ok(())
            }
            Expression::Block(block) => {
                let name = anon_scope_name("block", block.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Block) else {
                    return Ok(());
                };
                self.in_scope(scope, |r| r.resolve_statements(&block.statements, env))
            }
            Expression::StructLit {
                type_name, fields, ..
            } => {
                if let Some(name) = type_name {
                    self.resolve_struct_type_name(name, expr.span());
                }
                for field in fields {
                    self.resolve_expression(&field.value, env)?;
                }
                Ok(())
            }
            Expression::ArrayLit { elements, .. } => {
                for element in elements {
                    self.resolve_expression(element, env)?;
                }
                Ok(())
            }
        }
    }

    fn resolve_branch(&mut self, prefix: &str, block: &Block, env: ResolveEnv) -> Result<()> {
        let name = anon_scope_name(prefix, block.span);
        let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Expression) else {
            return Ok(());
        };
        self.saved(|r| {
            r.in_scope(scope, |r| {
                r.ctx.push_expr(ExprContext::Conditional, None, block.span);
                r.resolve_statements(&block.statements, env)
            })
        })
    }

    /// Resolves one identifier to a symbol, reporting at most once per
    /// occurrence across the whole phase.
    pub(crate) fn resolve_identifier(
        &mut self,
        name: &str,
        span: Span,
        env: ResolveEnv,
    ) -> Result<Option<SymbolId>> {
        let module = self.ctx.module().unwrap_or_default().to_string();
        let key = (module, name.to_string(), span);
        if let Some(cached) = self.ident_cache.get(&key) {
            self.stats.cache_hits += 1;
            let cached = *cached;
            if let Some(id) = cached {
                self.store.symbol_mut(id).used = true;
            }
            return Ok(cached);
        }

        self.stats.identifiers += 1;
        let resolved = self.resolve_identifier_uncached(name, span, env)?;
        self.ident_cache.insert(key, resolved);
        Ok(resolved)
    }

    fn resolve_identifier_uncached(
        &mut self,
        name: &str,
        span: Span,
        env: ResolveEnv,
    ) -> Result<Option<SymbolId>> {
        if let Some(frame) = self.ctx.check_self_reference(name) {
            let is_parameter = frame
                .symbol
                .is_some_and(|id| self.store.symbol(id).kind == SymbolKind::Parameter);
            if is_parameter {
                self.diags.error(
                    DiagnosticCode::ParameterSelfReference,
                    format!("Parameter '{name}' cannot be used in its own default value"),
                    span,
                );
            } else {
                self.diags.error(
                    DiagnosticCode::SelfInitialization,
                    format!("Variable '{name}' cannot be used in its own initializer"),
                    span,
                );
            }
            return Ok(None);
        }

        if self.ctx.forward_reference(name).is_some() {
            self.diags.error(
                DiagnosticCode::ForwardParameterReference,
                format!("Default value references parameter '{name}' before it is declared"),
                span,
            );
            return Ok(None);
        }

        // In a static method, `self` names the type itself.
        if name == "self"
            && env.in_static_method
            && let Some(type_scope) = env.struct_scope
        {
            let type_name = self.store.scope(type_scope).name.clone();
            let parent = self.store.scope(type_scope).parent;
            if let Some(parent) = parent
                && let Some(def_id) = self.store.lookup_in(parent, &type_name)
            {
                self.store.symbol_mut(def_id).used = true;
                return Ok(Some(def_id));
            }
        }

        let Some(id) = self.store.lookup_symbol(name) else {
            self.diags.error(
                DiagnosticCode::UndefinedIdentifier,
                format!("Undefined identifier '{name}'"),
                span,
            );
            return Ok(None);
        };

        let symbol = self.store.symbol(id);
        if env.in_static_method
            && symbol.kind == SymbolKind::StructField
            && Some(symbol.scope) == env.struct_scope
        {
            self.diags.error(
                DiagnosticCode::UndefinedIdentifier,
                format!("Cannot reference instance field '{name}' from a static function"),
                span,
            );
            return Ok(None);
        }
        if !symbol.declared
            && !symbol.is_builtin
            && self.ctx.module() == Some(symbol.module.as_str())
        {
            self.diags.error(
                DiagnosticCode::UsedBeforeDeclared,
                format!("'{name}' is used before it is declared"),
                span,
            );
        }
        if !symbol.initialized {
            self.diags.error(
                DiagnosticCode::UsedBeforeInitialized,
                format!("Variable '{name}' is used before being initialized"),
                span,
            );
        }

        self.store.symbol_mut(id).used = true;
        Ok(Some(id))
    }

    /// Assignment targets are writes: no initialized check, no used mark,
    /// and a successful identifier write makes the binding initialized.
    fn resolve_assign_target(&mut self, target: &Expression, env: ResolveEnv) -> Result<()> {
        match target {
            Expression::Identifier { name, span } => {
                let Some(id) = self.store.lookup_symbol(name) else {
                    self.diags.error(
                        DiagnosticCode::UndefinedIdentifier,
                        format!("Undefined identifier '{name}'"),
                        *span,
                    );
                    return Ok(());
                };
                let symbol = self.store.symbol(id);
                if !symbol.declared
                    && !symbol.is_builtin
                    && self.ctx.module() == Some(symbol.module.as_str())
                {
                    self.diags.error(
                        DiagnosticCode::UsedBeforeDeclared,
                        format!("'{name}' is assigned before it is declared"),
                        *span,
                    );
                }
                // Writes are checked here because statement order still
                // distinguishes the first write to a deferred `let` from
                // a re-assignment.
                match symbol.kind {
                    SymbolKind::Variable => {
                        if !symbol.is_mutable() && symbol.initialized {
                            self.diags.error(
                                DiagnosticCode::ImmutableAssignment,
                                format!("Cannot assign to immutable variable '{name}'"),
                                *span,
                            );
                        }
                    }
                    SymbolKind::Parameter => {
                        if !symbol.is_mutable() {
                            self.diags.error(
                                DiagnosticCode::ImmutableAssignment,
                                format!("Cannot assign to parameter '{name}'"),
                                *span,
                            );
                        }
                    }
                    SymbolKind::StructField => {}
                    kind => {
                        self.diags.error(
                            DiagnosticCode::ImmutableAssignment,
                            format!("Cannot assign to {} '{name}'", kind.describe()),
                            *span,
                        );
                    }
                }
                self.store.symbol_mut(id).initialized = true;
                Ok(())
            }
            _ => self.resolve_expression(target, env),
        }
    }

    fn resolve_member(
        &mut self,
        object: &Expression,
        member: &str,
        member_span: Span,
        env: ResolveEnv,
    ) -> Result<()> {
        // `self.field` inside a static method is validated in phase 3,
        // where the access can be reported as an instance access.
        if env.in_static_method
            && matches!(object, Expression::Identifier { name, .. } if name == "self")
        {
            return Ok(());
        }
        match object {
            Expression::Identifier { name, span } => {
                let Some(obj_id) = self.resolve_identifier(name, *span, env)? else {
                    return Ok(());
                };
                self.classify_member(obj_id, member, member_span)
            }
            _ => self.resolve_expression(object, env),
        }
    }

    /// Validates a member access against the object's namespace when the
    /// object resolves to something with a knowable member set. Objects
    /// whose type is not yet known are left for the inference engine.
    fn classify_member(
        &mut self,
        obj_id: SymbolId,
        member: &str,
        member_span: Span,
    ) -> Result<()> {
        let kind = self.store.symbol(obj_id).kind;
        match kind {
            SymbolKind::Use => {
                let (wildcard, target_module, target) = {
                    let meta = self.store.symbol(obj_id).use_meta()?;
                    (meta.wildcard, meta.target_module.clone(), meta.target)
                };
                if wildcard {
                    let Some(module_name) = target_module else {
                        return Ok(());
                    };
                    let Some(scope) = self.store.module_scope(&module_name) else {
                        return Ok(());
                    };
                    match self.store.lookup_in(scope, member) {
                        Some(target_id) => {
                            let target_symbol = self.store.symbol(target_id);
                            if target_symbol.is_exported || target_symbol.is_builtin {
                                self.store.symbol_mut(target_id).used = true;
                            } else {
                                self.diags.error(
                                    DiagnosticCode::SymbolNotExported,
                                    format!(
                                        "'{member}' exists in module '{module_name}' but is not public"
                                    ),
                                    member_span,
                                );
                            }
                        }
                        None => {
                            self.diags.error(
                                DiagnosticCode::SymbolNotFoundInModule,
                                format!("Module '{module_name}' has no member '{member}'"),
                                member_span,
                            );
                        }
                    }
                    Ok(())
                } else {
                    match target {
                        Some(target_id) => self.classify_member(target_id, member, member_span),
                        None => Ok(()),
                    }
                }
            }
            SymbolKind::Definition => {
                let scope = {
                    let symbol = self.store.symbol(obj_id);
                    symbol.definition_scope().or_else(|| {
                        symbol
                            .ty
                            .as_ref()
                            .and_then(|ty| ty.as_named())
                            .map(|named| named.scope)
                    })
                };
                match scope {
                    Some(scope) => self.check_type_member(scope, member, member_span),
                    None => Ok(()),
                }
            }
            SymbolKind::Variable | SymbolKind::Parameter => {
                let scope = {
                    let symbol = self.store.symbol(obj_id);
                    symbol
                        .ty
                        .as_ref()
                        .map(|ty| ty.unwrap_optional())
                        .and_then(|ty| ty.as_named())
                        .map(|named| named.scope)
                };
                match scope {
                    Some(scope) => self.check_type_member(scope, member, member_span),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    fn check_type_member(
        &mut self,
        scope: crate::scope::ScopeId,
        member: &str,
        member_span: Span,
    ) -> Result<()> {
        match self.store.lookup_in(scope, member) {
            Some(member_id) => {
                self.store.symbol_mut(member_id).used = true;
                Ok(())
            }
            None => {
                let scope_ref = self.store.scope(scope);
                let type_name = scope_ref.name.clone();
                if scope_ref.type_kind() == Some(crate::types::TypeKind::Error) {
                    self.diags.error(
                        DiagnosticCode::ErrorMemberNotFound,
                        format!("Error set '{type_name}' has no member '{member}'"),
                        member_span,
                    );
                } else {
                    self.diags.error(
                        DiagnosticCode::UnknownMember,
                        format!("Type '{type_name}' has no member '{member}'"),
                        member_span,
                    );
                }
                Ok(())
            }
        }
    }

    fn resolve_struct_type_name(&mut self, name: &str, span: Span) {
        match self.store.lookup_symbol(name) {
            Some(id) => {
                let symbol = self.store.symbol(id);
                if symbol.kind == SymbolKind::Definition || symbol.kind == SymbolKind::Use {
                    self.store.symbol_mut(id).used = true;
                } else {
                    self.diags.error(
                        DiagnosticCode::UndefinedType,
                        format!("'{name}' is not a struct type"),
                        span,
                    );
                }
            }
            None => {
                self.diags.error(
                    DiagnosticCode::UndefinedType,
                    format!("Unknown type '{name}'"),
                    span,
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextTracker;
    use crate::store::ScopeStore;
    use crate::symbols::Symbol;
    use drift_core::Diagnostics;

    fn setup() -> (ScopeStore, ContextTracker, Diagnostics) {
        (
            ScopeStore::new(),
            ContextTracker::new(),
            Diagnostics::new(100),
        )
    }

    #[test]
    fn unknown_identifier_reports_once_via_cache() {
        let (mut store, mut ctx, mut diags) = setup();
        ctx.enter_module("main");
        let mut resolver = Resolver::new(&mut store, &mut ctx, &mut diags);
        let span = Span::new(5, 6);

        let first = resolver
            .resolve_identifier("x", span, ResolveEnv::default())
            .unwrap();
        let second = resolver
            .resolve_identifier("x", span, ResolveEnv::default())
            .unwrap();

        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn cache_hit_still_marks_used() {
        let (mut store, mut ctx, mut diags) = setup();
        ctx.enter_module("main");
        let global = store.global();
        let id = store.add_symbol(Symbol::new("x", SymbolKind::Variable, global, "main"));
        let span = Span::new(5, 6);

        let mut resolver = Resolver::new(&mut store, &mut ctx, &mut diags);
        assert_eq!(
            resolver
                .resolve_identifier("x", span, ResolveEnv::default())
                .unwrap(),
            Some(id)
        );
        store.symbol_mut(id).used = false;

        let mut resolver = Resolver::new(&mut store, &mut ctx, &mut diags);
        resolver.ident_cache.insert(
            ("main".to_string(), "x".to_string(), span),
            Some(id),
        );
        resolver
            .resolve_identifier("x", span, ResolveEnv::default())
            .unwrap();
        assert!(store.symbol(id).used);
    }

    #[test]
    fn self_initialization_is_reported() {
        let (mut store, mut ctx, mut diags) = setup();
        ctx.enter_module("main");
        let global = store.global();
        let id = store.add_symbol(Symbol::new("x", SymbolKind::Variable, global, "main"));
        ctx.push_decl("x", Some(id), Span::new(0, 10), global);
        ctx.begin_initializer();

        let mut resolver = Resolver::new(&mut store, &mut ctx, &mut diags);
        let resolved = resolver
            .resolve_identifier("x", Span::new(8, 9), ResolveEnv::default())
            .unwrap();

        assert_eq!(resolved, None);
        assert_eq!(
            diags.iter().next().unwrap().code,
            DiagnosticCode::SelfInitialization
        );
    }
}
