//! Statement and expression collection.

use drift_ast::{
    Block, ErrorSpec, Expression, FuncStatement, LetStatement, Module, Statement, UseStatement,
    Visibility,
};
use drift_core::Result;

use crate::collect::Collector;
use crate::scope::{ScopeKind, anon_scope_name};
use crate::symbols::{
    ErrorMode, FunctionMeta, ParameterMeta, Symbol, SymbolKind, SymbolMeta, UseMeta, VariableMeta,
};
use crate::types::{NamedType, Type, TypeKind};

impl Collector<'_> {
    pub(crate) fn collect_statement(
        &mut self,
        statement: &Statement,
        module: &Module,
    ) -> Result<()> {
        self.ctx.push_span(statement.span());
        let result = self.collect_statement_inner(statement, module);
        self.ctx.pop_span();
        result
    }

    fn collect_statement_inner(&mut self, statement: &Statement, module: &Module) -> Result<()> {
        match statement {
            Statement::Def(def) => self.collect_def(def, module),
            Statement::Let(decl) => self.collect_let(decl, module),
            Statement::Func(func) => self.collect_func(func, module),
            Statement::Use(import) => self.collect_use(import, module),
            Statement::Return { value, .. } => match value {
                Some(expression) => self.collect_expression(expression, module),
                None => Ok(()),
            },
            Statement::Throw { value, .. } => self.collect_expression(value, module),
            Statement::While(stmt) => {
                self.collect_expression(&stmt.condition, module)?;
                let scope = self.create_scope(
                    ScopeKind::Loop,
                    &anon_scope_name("while", stmt.span),
                    stmt.span,
                );
                self.in_scope(scope, |c| c.collect_block_body(&stmt.body, module))
            }
            Statement::For(stmt) => {
                // The iterable is evaluated outside the loop binding's scope.
                self.collect_expression(&stmt.iterable, module)?;
                let scope = self.create_scope(
                    ScopeKind::Loop,
                    &anon_scope_name("for", stmt.span),
                    stmt.span,
                );
                self.in_scope(scope, |c| {
                    let current = c.store.current();
                    let symbol = Symbol::new(
                        &stmt.binding,
                        SymbolKind::Variable,
                        current,
                        &module.name,
                    )
                    .with_spans(stmt.span, stmt.binding_span);
                    c.declare(symbol);
                    c.collect_block_body(&stmt.body, module)
                })
            }
            Statement::Break { .. } | Statement::Continue { .. } => Ok(()),
            Statement::Block(block) => self.collect_block(block, module),
            Statement::Expr { expression, .. } => self.collect_expression(expression, module),
        }
    }

    fn collect_let(&mut self, decl: &LetStatement, module: &Module) -> Result<()> {
        if self.check_shadowing(&decl.name, SymbolKind::Variable, decl.span) {
            // Immutable initializers are kept so constant references fold.
            let stashed_init = match decl.mutability {
                drift_ast::Mutability::Immutable => decl.init.clone(),
                drift_ast::Mutability::Mutable => None,
            };
            let current = self.store.current();
            let mut symbol = Symbol::new(&decl.name, SymbolKind::Variable, current, &module.name)
                .with_spans(decl.span, decl.span)
                .with_visibility(decl.visibility)
                .with_mutability(decl.mutability)
                .with_meta(SymbolMeta::Variable(VariableMeta { init: stashed_init }));
            if decl.init.is_none() {
                symbol = symbol.uninitialized();
            }
            self.declare(symbol);
        }
        // Walk the initializer either way so nested scopes always exist.
        match &decl.init {
            Some(init) => self.collect_expression(init, module),
            None => Ok(()),
        }
    }

    pub(crate) fn collect_func(&mut self, func: &FuncStatement, module: &Module) -> Result<()> {
        if !self.check_shadowing(&func.name, SymbolKind::Function, func.span) {
            return Ok(());
        }

        let declaring_scope = self.store.current();
        let struct_member = self.store.scope(declaring_scope).type_kind() == Some(TypeKind::Struct);
        let fn_scope = self.create_scope(ScopeKind::Function, &func.name, func.span);

        // Inline error sets become a synthetic `selferr` error definition
        // scoped to the function itself.
        let error_mode = match &func.error_set {
            Some(ErrorSpec::Named { name, .. }) => Some(ErrorMode::Named { name: name.clone() }),
            Some(ErrorSpec::Inline { members, span }) => {
                let err_scope = self.in_scope(fn_scope, |c| {
                    let scope = c.store.create_type_scope(
                        TypeKind::Error,
                        "selferr",
                        c.store.current(),
                        *span,
                    );
                    c.in_scope(scope, |c| {
                        for member in members {
                            let current = c.store.current();
                            let symbol =
                                Symbol::new(member, SymbolKind::Error, current, &module.name)
                                    .with_spans(*span, *span)
                                    .with_visibility(Visibility::Public);
                            c.declare(symbol);
                        }
                    });
                    scope
                });
                Some(ErrorMode::SelfGroup { scope: err_scope })
            }
            None => None,
        };

        let meta = FunctionMeta {
            scope: fn_scope,
            params: Vec::new(),
            return_type: None,
            error: error_mode.clone(),
            is_comptime: func.is_comptime,
            is_static: func.is_static,
            comptime_body: func.is_comptime.then(|| func.body.clone()),
        };
        let symbol = Symbol::new(&func.name, SymbolKind::Function, declaring_scope, &module.name)
            .with_spans(func.span, func.span)
            .with_visibility(func.visibility)
            .with_meta(SymbolMeta::Function(meta));
        let fn_id = self.declare(symbol);

        let mut param_ids = Vec::with_capacity(func.params.len() + 1);
        self.in_scope(fn_scope, |c| -> Result<()> {
            if let Some(ErrorMode::SelfGroup { scope }) = &error_mode {
                let current = c.store.current();
                let selferr = Symbol::new("selferr", SymbolKind::Definition, current, &module.name)
                    .with_spans(func.span, func.span)
                    .with_type(Type::Named(NamedType {
                        name: "selferr".to_string(),
                        kind: TypeKind::Error,
                        scope: *scope,
                    }))
                    .with_meta(SymbolMeta::Definition(crate::symbols::DefinitionMeta {
                        scope: Some(*scope),
                        type_kind: Some(TypeKind::Error),
                        alias: None,
                    }));
                c.declare(selferr);
            }

            let mut index = 0;
            if struct_member && !func.is_static {
                let type_scope = c.store.scope(declaring_scope);
                let self_ty = Type::Named(NamedType {
                    name: type_scope.name.clone(),
                    kind: TypeKind::Struct,
                    scope: declaring_scope,
                });
                let current = c.store.current();
                let symbol = Symbol::new("self", SymbolKind::Parameter, current, &module.name)
                    .with_spans(func.span, func.span)
                    .with_type(self_ty)
                    .with_mutability(drift_ast::Mutability::Mutable)
                    .with_meta(SymbolMeta::Parameter(ParameterMeta {
                        index,
                        default: None,
                        is_self: true,
                    }));
                param_ids.push(c.declare(symbol));
                index += 1;
            }

            for param in &func.params {
                if !c.check_shadowing(&param.name, SymbolKind::Parameter, param.span) {
                    continue;
                }
                let current = c.store.current();
                let symbol = Symbol::new(&param.name, SymbolKind::Parameter, current, &module.name)
                    .with_spans(param.span, param.span)
                    .with_visibility(param.visibility)
                    .with_mutability(param.mutability)
                    .with_meta(SymbolMeta::Parameter(ParameterMeta {
                        index,
                        default: param.default.clone(),
                        is_self: param.name == "self",
                    }));
                param_ids.push(c.declare(symbol));
                index += 1;
                if let Some(default) = &param.default {
                    c.collect_expression(default, module)?;
                }
            }

            c.collect_block_body(&func.body, module)
        })?;

        self.store.symbol_mut(fn_id).function_meta_mut()?.params = param_ids;
        Ok(())
    }

    fn collect_use(&mut self, import: &UseStatement, module: &Module) -> Result<()> {
        // `use x` with no path re-exports a local; it binds no new name.
        if import.is_local_reexport() {
            return Ok(());
        }
        if !self.check_shadowing(&import.alias, SymbolKind::Use, import.span) {
            return Ok(());
        }
        let current = self.store.current();
        let symbol = Symbol::new(&import.alias, SymbolKind::Use, current, &module.name)
            .with_spans(import.span, import.span)
            .with_visibility(import.visibility)
            .with_meta(SymbolMeta::Use(UseMeta {
                path: import.path.clone(),
                wildcard: import.wildcard,
                target_module: import.path.first().cloned(),
                target: None,
            }));
        self.declare(symbol);
        Ok(())
    }

    pub(crate) fn collect_block(&mut self, block: &Block, module: &Module) -> Result<()> {
        let scope = self.create_scope(
            ScopeKind::Block,
            &anon_scope_name("block", block.span),
            block.span,
        );
        self.in_scope(scope, |c| c.collect_block_body(block, module))
    }

    /// Walks a block's statements in the current scope without opening a
    /// new one; function bodies share the function's own scope.
    pub(crate) fn collect_block_body(&mut self, block: &Block, module: &Module) -> Result<()> {
        for statement in &block.statements {
            self.collect_statement(statement, module)?;
        }
        Ok(())
    }

    pub(crate) fn collect_expression(
        &mut self,
        expr: &Expression,
        module: &Module,
    ) -> Result<()> {
        match expr {
            Expression::Int { .. }
            | Expression::Float { .. }
            | Expression::Bool { .. }
            | Expression::Char { .. }
            | Expression::Str { .. }
            | Expression::Null { .. }
            | Expression::Identifier { .. }
            | Expression::Sizeof { .. } => Ok(()),
            Expression::Binary { lhs, rhs, .. } => {
                self.collect_expression(lhs, module)?;
                self.collect_expression(rhs, module)
            }
            Expression::Assign { target, value, .. } => {
                self.collect_expression(target, module)?;
                self.collect_expression(value, module)
            }
            Expression::Prefix { operand, .. }
            | Expression::As { operand, .. }
            | Expression::Try { operand, .. } => self.collect_expression(operand, module),
            Expression::Call { callee, args, .. } => {
                self.collect_expression(callee, module)?;
                for arg in args {
                    self.collect_expression(arg, module)?;
                }
                Ok(())
            }
            Expression::Member { object, .. } => self.collect_expression(object, module),
            Expression::Index { object, index, .. } => {
                self.collect_expression(object, module)?;
                self.collect_expression(index, module)
            }
            Expression::Orelse {
                value, fallback, ..
            } => {
                self.collect_expression(value, module)?;
                self.collect_expression(fallback, module)
            }
            Expression::Range { start, end, .. } => {
                if let Some(start) = start {
                    self.collect_expression(start, module)?;
                }
                if let Some(end) = end {
                    self.collect_expression(end, module)?;
                }
                Ok(())
            }
            Expression::Catch {
                operand,
                binding,
                handler,
                ..
            } => {
                self.collect_expression(operand, module)?;
                let scope = self.create_scope(
                    ScopeKind::Expression,
                    &anon_scope_name("catch", handler.span),
                    handler.span,
                );
                self.in_scope(scope, |c| {
                    if let Some(binding) = binding {
                        let current = c.store.current();
                        let symbol =
                            Symbol::new(binding, SymbolKind::Variable, current, &module.name)
                                .with_spans(handler.span, handler.span);
                        c.declare(symbol);
                    }
                    c.collect_block_body(handler, module)
                })
            }
            Expression::If(if_expr) => {
                self.collect_expression(&if_expr.condition, module)?;
                self.collect_branch("then", &if_expr.then_block, module)?;
                for else_if in &if_expr.else_ifs {
                    self.collect_expression(&else_if.condition, module)?;
                    self.collect_branch("then", &else_if.block, module)?;
                }
                match &if_expr.else_block {
                    Some(block) => self.collect_branch("else", block, module),
                    None => Ok(()),
                }
            }
            Expression::Match(match_expr) => {
                self.collect_expression(&match_expr.subject, module)?;
                for arm in &match_expr.arms {
                    let scope = self.create_scope(
                        ScopeKind::Expression,
                        &anon_scope_name("arm", arm.span),
                        arm.span,
                    );
                    self.in_scope(scope, |c| {
                        if let drift_ast::Pattern::Variant {
                            binding: Some(binding),
                            span,
                            ..
                        } = &arm.pattern
                        {
                            let current = c.store.current();
                            let symbol =
                                Symbol::new(binding, SymbolKind::Variable, current, &module.name)
                                    .with_spans(*span, *span);
                            c.declare(symbol);
                        }
                        c.collect_block_body(&arm.body, module)
                    })?;
                }
                Ok(())
            }
            Expression::Block(block) => self.collect_block(block, module),
            Expression::StructLit { fields, .. } => {
                for field in fields {
                    self.collect_expression(&field.value, module)?;
                }
                Ok(())
            }
            Expression::ArrayLit { elements, .. } => {
                for element in elements {
                    self.collect_expression(element, module)?;
                }
                Ok(())
            }
        }
    }

    fn collect_branch(&mut self, prefix: &str, block: &Block, module: &Module) -> Result<()> {
        let scope = self.create_scope(
            ScopeKind::Expression,
            &anon_scope_name(prefix, block.span),
            block.span,
        );
        self.in_scope(scope, |c| c.collect_block_body(block, module))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextTracker;
    use crate::store::ScopeStore;
    use drift_core::{DiagnosticCode, Diagnostics, Span};

    fn span(start: usize, end: usize) -> Span {
        Span::new(start, end)
    }

    #[test]
    fn collects_module_variables() {
        let mut store = ScopeStore::new();
        let mut ctx = ContextTracker::new();
        let mut diags = Diagnostics::new(100);
        let module = Module::new(
            "main",
            vec![Statement::Let(LetStatement {
                name: "answer".to_string(),
                visibility: Visibility::Private,
                mutability: drift_ast::Mutability::Immutable,
                ty: None,
                init: Some(Expression::Int {
                    value: 42,
                    span: span(10, 12),
                }),
                span: span(0, 12),
            })],
        );

        let mut collector = Collector::new(&mut store, &mut ctx, &mut diags);
        collector.collect_module(&module).unwrap();

        let scope = store.module_scope("main").unwrap();
        let id = store.lookup_in(scope, "answer").unwrap();
        let symbol = store.symbol(id);
        assert_eq!(symbol.kind, SymbolKind::Variable);
        assert!(symbol.initialized);
        assert!(diags.is_empty());
    }

    #[test]
    fn duplicate_in_same_scope_is_an_error() {
        let mut store = ScopeStore::new();
        let mut ctx = ContextTracker::new();
        let mut diags = Diagnostics::new(100);
        let decl = |start: usize| {
            Statement::Let(LetStatement {
                name: "x".to_string(),
                visibility: Visibility::Private,
                mutability: drift_ast::Mutability::Immutable,
                ty: None,
                init: Some(Expression::Int {
                    value: 1,
                    span: span(start + 8, start + 9),
                }),
                span: span(start, start + 9),
            })
        };
        let module = Module::new("main", vec![decl(0), decl(20)]);

        let mut collector = Collector::new(&mut store, &mut ctx, &mut diags);
        collector.collect_module(&module).unwrap();

        assert_eq!(diags.error_count(), 1);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.code, DiagnosticCode::DuplicateSymbol);
    }
}
