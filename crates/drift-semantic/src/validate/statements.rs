//! Statement validation.

use drift_ast::{
    DefStatement, EnumVariantDecl, Expression, ForLoop, FuncStatement, LetStatement, Statement,
    StructFieldDecl, StructMember, TypeExpr, Visibility,
};
use drift_core::{DiagnosticCode, Result, Span};

use crate::context::ExprContext;
use crate::eval::{EvalContext, EvalValue};
use crate::infer::compatible;
use crate::resolve::{finalize_signature, resolve_type_expr};
use crate::scope::{ScopeKind, anon_scope_name};
use crate::symbols::{SymbolId, SymbolKind, SymbolMeta};
use crate::types::{FloatType, IntType, Type};
use crate::validate::{FnFlags, TypeValidator};

impl TypeValidator<'_> {
    pub(crate) fn validate_statement(&mut self, statement: &Statement) -> Result<()> {
        self.stats.statements += 1;
        self.ctx.push_span(statement.span());
        let result = self.validate_statement_inner(statement);
        self.ctx.pop_span();
        result
    }

    fn validate_statement_inner(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Def(def) => self.validate_def(def),
            Statement::Let(decl) => self.validate_let(decl),
            Statement::Func(func) => self.validate_func(func),
            Statement::Use(_) => Ok(()),
            Statement::Return { value, span } => self.validate_return(value.as_ref(), *span),
            Statement::Throw { value, span } => self.validate_throw(value, *span),
            Statement::While(stmt) => {
                self.check_expression(&stmt.condition, None)?;
                self.infer
                    .check_condition(&stmt.condition, self.store, self.diags);
                let name = anon_scope_name("while", stmt.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Loop) else {
                    return Ok(());
                };
                self.in_scope(scope, |v| {
                    v.ctx.push_expr(ExprContext::Loop, None, stmt.span);
                    let result = v.validate_statements(&stmt.body.statements);
                    v.ctx.pop_expr();
                    result
                })
            }
            Statement::For(stmt) => self.validate_for(stmt),
            Statement::Break { span } => {
                self.require_loop("break", *span);
                Ok(())
            }
            Statement::Continue { span } => {
                self.require_loop("continue", *span);
                Ok(())
            }
            Statement::Block(block) => {
                let name = anon_scope_name("block", block.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Block) else {
                    return Ok(());
                };
                self.in_scope(scope, |v| v.validate_statements(&block.statements))
            }
            Statement::Expr { expression, .. } => {
                self.check_expression(expression, None)?;
                Ok(())
            }
        }
    }

    pub(crate) fn validate_statements(&mut self, statements: &[Statement]) -> Result<()> {
        for statement in statements {
            self.validate_statement(statement)?;
        }
        Ok(())
    }

    fn require_loop(&mut self, keyword: &str, span: Span) {
        if !self.ctx.in_context(ExprContext::Loop) {
            self.diags.error(
                DiagnosticCode::MisplacedControlStatement,
                format!("'{keyword}' outside a loop"),
                span,
            );
        }
    }

    fn validate_for(&mut self, stmt: &ForLoop) -> Result<()> {
        let iterable_ty = self.check_expression(&stmt.iterable, None)?;
        // Element type flows into the loop binding.
        let element = match &iterable_ty {
            Some(Type::Array { element, .. }) => Some((**element).clone()),
            Some(Type::Str) => Some(Type::Char),
            Some(Type::Range(element)) => Some((**element).clone()),
            Some(other) => {
                self.diags.error(
                    DiagnosticCode::TypeMismatch,
                    format!("Cannot iterate over a value of type '{other}'"),
                    stmt.iterable.span(),
                );
                None
            }
            None => None,
        };

        let name = anon_scope_name("for", stmt.span);
        let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Loop) else {
            return Ok(());
        };
        self.in_scope(scope, |v| {
            if let Some(element) = element
                && let Some(binding_id) = v.store.lookup_in(v.store.current(), &stmt.binding)
            {
                v.store.symbol_mut(binding_id).ty = Some(element);
            }
            v.ctx.push_expr(ExprContext::Loop, None, stmt.span);
            let result = v.validate_statements(&stmt.body.statements);
            v.ctx.pop_expr();
            result
        })
    }

    fn validate_return(&mut self, value: Option<&Expression>, span: Span) -> Result<()> {
        let Some(fn_id) = self.ctx.enclosing_function() else {
            self.diags.error(
                DiagnosticCode::ReturnOutsideFunction,
                "'return' outside a function",
                span,
            );
            if let Some(value) = value {
                self.check_expression(value, None)?;
            }
            return Ok(());
        };
        if let Some(flags) = self.fn_flags.last_mut() {
            flags.saw_return = true;
        }

        let (fn_name, expected) = {
            let symbol = self.store.symbol(fn_id);
            let expected = symbol.function_meta()?.return_type.clone();
            (symbol.name.clone(), expected.unwrap_or(Type::Void))
        };
        match value {
            Some(value) => {
                let found = self.check_expression(value, Some(&expected))?;
                if let Some(found) = &found
                    && !compatible(&expected, found)
                {
                    let message = if expected.is_void() {
                        format!(
                            "Function '{fn_name}' returns 'void' but a value of type '{found}' is returned"
                        )
                    } else {
                        format!("Cannot return '{found}' from a function returning '{expected}'")
                    };
                    self.diags
                        .error(DiagnosticCode::TypeMismatch, message, value.span());
                }
            }
            None => {
                if !expected.is_void() {
                    self.diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Function '{fn_name}' must return a value of type '{expected}'"),
                        span,
                    );
                }
            }
        }
        Ok(())
    }

    fn validate_throw(&mut self, value: &Expression, span: Span) -> Result<()> {
        let thrown = self.check_expression(value, None)?;
        let Some(fn_id) = self.ctx.enclosing_function() else {
            self.diags.error(
                DiagnosticCode::ThrowWithoutErrorType,
                "'throw' needs an enclosing function with an error type",
                span,
            );
            return Ok(());
        };
        if let Some(flags) = self.fn_flags.last_mut() {
            flags.saw_throw = true;
        }

        let (fn_name, error) = {
            let symbol = self.store.symbol(fn_id);
            let error = match &symbol.ty {
                Some(Type::Function(sig)) => sig.error.clone(),
                _ => None,
            };
            (symbol.name.clone(), error)
        };
        let Some(error) = error else {
            self.diags.error(
                DiagnosticCode::ThrowWithoutErrorType,
                format!("Function '{fn_name}' does not declare an error type"),
                span,
            );
            return Ok(());
        };
        if let Some(thrown) = &thrown
            && !compatible(&error, thrown)
        {
            self.diags.error(
                DiagnosticCode::TypeMismatch,
                format!(
                    "Thrown value of type '{thrown}' does not match the declared error type '{error}'"
                ),
                value.span(),
            );
        }
        Ok(())
    }

    fn validate_let(&mut self, decl: &LetStatement) -> Result<()> {
        let symbol_id = self.store.lookup_in(self.store.current(), &decl.name);
        let annotated = symbol_id
            .and_then(|id| self.store.symbol(id).ty.clone())
            .map(|ty| self.size_arrays(ty, decl.ty.as_ref()));

        match (&annotated, &decl.init) {
            (Some(expected), Some(init)) => {
                let found = self.check_expression(init, Some(expected))?;
                if let Some(found) = &found
                    && !compatible(expected, found)
                {
                    self.diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!(
                            "Cannot initialize '{}' of type '{expected}' with a value of type '{found}'",
                            decl.name
                        ),
                        init.span(),
                    );
                }
                if let Some(id) = symbol_id {
                    self.store.symbol_mut(id).ty = Some(expected.clone());
                }
            }
            (Some(expected), None) => {
                // Deferred initialization; the annotation stands alone.
                if let Some(id) = symbol_id {
                    self.store.symbol_mut(id).ty = Some(expected.clone());
                }
            }
            (None, Some(init)) => {
                let found = self.check_expression(init, None)?;
                match found {
                    Some(ty) if ty.is_void() => {
                        self.diags.error(
                            DiagnosticCode::CannotInferType,
                            format!(
                                "Variable '{}' cannot be initialized with a 'void' value",
                                decl.name
                            ),
                            init.span(),
                        );
                    }
                    Some(Type::Null) => {
                        self.diags.error(
                            DiagnosticCode::CannotInferType,
                            format!(
                                "Cannot infer the type of '{}' from 'null'; annotate the optional type",
                                decl.name
                            ),
                            init.span(),
                        );
                    }
                    Some(ty) => {
                        if let Some(id) = symbol_id {
                            self.store.symbol_mut(id).ty = Some(concretize(ty));
                        }
                    }
                    None => {}
                }
            }
            (None, None) => {
                self.diags.error(
                    DiagnosticCode::CannotInferType,
                    format!(
                        "Variable '{}' needs a type annotation or an initializer",
                        decl.name
                    ),
                    decl.span,
                );
            }
        }
        Ok(())
    }

    /// Folds array-size expressions from the annotation into the resolved
    /// type, recursing through optionals and nested arrays.
    fn size_arrays(&mut self, ty: Type, expr: Option<&TypeExpr>) -> Type {
        match (ty, expr) {
            (
                Type::Array { element, size },
                Some(TypeExpr::Array {
                    size: size_expr,
                    element: element_expr,
                    ..
                }),
            ) => {
                let size = match size {
                    Some(size) => Some(size),
                    None => self.eval_array_size(size_expr),
                };
                let element = self.size_arrays(*element, Some(element_expr));
                Type::Array {
                    element: Box::new(element),
                    size,
                }
            }
            (Type::Optional(inner), Some(TypeExpr::Optional { inner: inner_expr, .. })) => {
                Type::Optional(Box::new(self.size_arrays(*inner, Some(inner_expr))))
            }
            (ty, _) => ty,
        }
    }

    pub(crate) fn eval_array_size(&mut self, size: &Expression) -> Option<u64> {
        let errors_before = self.diags.error_count();
        let ctx = EvalContext::int_only();
        match self.eval.evaluate(size, &ctx, self.store, self.diags) {
            Some(EvalValue::Int(value)) => {
                if value < 0 {
                    self.diags.error(
                        DiagnosticCode::ArraySizeNotConstant,
                        format!("Array size must be non-negative, found {value}"),
                        size.span(),
                    );
                    return None;
                }
                Some(value as u64)
            }
            _ => {
                // Evaluation faults carry their own codes; only a silent
                // non-constant still needs a report.
                if self.diags.error_count() == errors_before {
                    self.diags.error(
                        DiagnosticCode::ArraySizeNotConstant,
                        "Array size must be a compile-time constant",
                        size.span(),
                    );
                }
                None
            }
        }
    }

    pub(crate) fn validate_func(&mut self, func: &FuncStatement) -> Result<()> {
        let Some(fn_id) = self.store.lookup_in(self.store.current(), &func.name) else {
            return Ok(());
        };
        if self.store.symbol(fn_id).kind != SymbolKind::Function {
            return Ok(());
        }
        self.stats.functions += 1;

        let (fn_scope, is_comptime) = {
            let meta = self.store.symbol(fn_id).function_meta()?;
            (meta.scope, meta.is_comptime)
        };

        self.in_scope(fn_scope, |v| {
            v.validate_params(func, fn_id)?;

            // Comptime bodies are templates; their shape is checked when
            // a call site evaluates them.
            if is_comptime {
                return Ok(());
            }

            v.ctx.push_expr(ExprContext::Function, Some(fn_id), func.span);
            v.fn_flags.push(FnFlags::default());
            let result = v.validate_statements(&func.body.statements);
            let flags = v.fn_flags.pop().unwrap_or_default();
            v.ctx.pop_expr();
            result?;

            v.check_return_obligation(func, fn_id, flags)
        })
    }

    fn validate_params(&mut self, func: &FuncStatement, fn_id: SymbolId) -> Result<()> {
        let mut inferred_any = false;
        for param in &func.params {
            match param.visibility {
                Visibility::Public => {
                    self.diags.error(
                        DiagnosticCode::InvalidParameterModifier,
                        format!("Parameter '{}' cannot be public", param.name),
                        param.span,
                    );
                }
                Visibility::Static => {
                    self.diags.error(
                        DiagnosticCode::InvalidParameterModifier,
                        format!("Parameter '{}' cannot be static", param.name),
                        param.span,
                    );
                }
                Visibility::Private => {}
            }

            let Some(param_id) = self.store.lookup_in(self.store.current(), &param.name) else {
                continue;
            };
            if self.store.symbol(param_id).kind != SymbolKind::Parameter {
                continue;
            }

            if let Some(default) = &param.default {
                let declared = self.store.symbol(param_id).ty.clone();
                let found = self.check_expression(default, declared.as_ref())?;
                match declared {
                    Some(declared) => {
                        if let Some(found) = &found
                            && !compatible(&declared, found)
                        {
                            self.diags.error(
                                DiagnosticCode::TypeMismatch,
                                format!(
                                    "Default value of type '{found}' does not match parameter type '{declared}'"
                                ),
                                default.span(),
                            );
                        }
                    }
                    None => match found {
                        Some(found) => {
                            self.store.symbol_mut(param_id).ty = Some(concretize(found));
                            inferred_any = true;
                        }
                        None => {
                            self.diags.error(
                                DiagnosticCode::ParameterTypeRequired,
                                format!(
                                    "Parameter '{}' needs a type annotation or an inferable default",
                                    param.name
                                ),
                                param.span,
                            );
                        }
                    },
                }
            } else if self.store.symbol(param_id).ty.is_none() {
                let is_self = matches!(
                    &self.store.symbol(param_id).meta,
                    SymbolMeta::Parameter(meta) if meta.is_self
                );
                if !is_self {
                    self.diags.error(
                        DiagnosticCode::ParameterTypeRequired,
                        format!("Parameter '{}' needs a type or a default value", param.name),
                        param.span,
                    );
                }
            }
        }
        if inferred_any {
            // Defaulted parameters got their types here, so the signature
            // skipped by resolution can be completed now.
            finalize_signature(self.store, fn_id)?;
        }
        Ok(())
    }

    fn check_return_obligation(
        &mut self,
        func: &FuncStatement,
        fn_id: SymbolId,
        flags: FnFlags,
    ) -> Result<()> {
        let (returns_value, has_error, ret) = {
            let meta = self.store.symbol(fn_id).function_meta()?;
            let ret = meta.return_type.clone().unwrap_or(Type::Void);
            (!ret.is_void(), meta.error.is_some(), ret)
        };
        if !returns_value {
            return Ok(());
        }
        let satisfied = if has_error {
            flags.saw_return || flags.saw_throw
        } else {
            flags.saw_return
        };
        if !satisfied {
            let message = if has_error {
                format!("Function '{}' must return a value of type '{ret}' or throw", func.name)
            } else {
                format!("Function '{}' must return a value of type '{ret}'", func.name)
            };
            self.diags
                .error(DiagnosticCode::MissingReturn, message, func.span);
        }
        Ok(())
    }

    fn validate_def(&mut self, def: &DefStatement) -> Result<()> {
        let Some(def_id) = self.store.lookup_in(self.store.current(), &def.name) else {
            return Ok(());
        };
        match &def.value {
            TypeExpr::Struct { members, .. } => {
                let Some(scope) = self.store.symbol(def_id).definition_scope() else {
                    return Ok(());
                };
                self.in_scope(scope, |v| -> Result<()> {
                    for member in members {
                        match member {
                            StructMember::Field(field) => v.validate_field(field)?,
                            StructMember::Func(func) => v.validate_func(func)?,
                        }
                    }
                    Ok(())
                })
            }
            TypeExpr::Enum {
                backing, variants, ..
            } => {
                let backing_ty = backing.as_deref().and_then(|expr| {
                    let resolved = resolve_type_expr(expr, self.store, self.diags)?;
                    match resolved {
                        Type::Int(int) => Some(int),
                        other => {
                            self.diags.error(
                                DiagnosticCode::TypeMismatch,
                                format!("Enum backing type must be an integer, found '{other}'"),
                                expr.span(),
                            );
                            None
                        }
                    }
                });
                let Some(scope) = self.store.symbol(def_id).definition_scope() else {
                    return Ok(());
                };
                self.in_scope(scope, |v| {
                    for variant in variants {
                        v.validate_discriminant(variant, backing_ty);
                    }
                    Ok(())
                })
            }
            _ => Ok(()),
        }
    }

    fn validate_field(&mut self, field: &StructFieldDecl) -> Result<()> {
        let Some(default) = &field.default else {
            return Ok(());
        };
        let declared = self
            .store
            .lookup_in(self.store.current(), &field.name)
            .and_then(|id| self.store.symbol(id).ty.clone());
        let found = self.check_expression(default, declared.as_ref())?;
        if let (Some(declared), Some(found)) = (&declared, &found)
            && !compatible(declared, found)
        {
            self.diags.error(
                DiagnosticCode::TypeMismatch,
                format!("Default value of type '{found}' does not match field type '{declared}'"),
                default.span(),
            );
        }
        Ok(())
    }

    /// Discriminants are integer constants bounded by the backing type,
    /// defaulting to signed 64-bit bounds.
    fn validate_discriminant(&mut self, variant: &EnumVariantDecl, backing: Option<IntType>) {
        let Some(discriminant) = &variant.discriminant else {
            return;
        };
        let mut ctx = match backing {
            Some(int) => EvalContext::with_target(&Type::Int(int)),
            None => EvalContext::new(),
        };
        ctx.allow_floats = false;
        let errors_before = self.diags.error_count();
        match self.eval.evaluate(discriminant, &ctx, self.store, self.diags) {
            Some(EvalValue::Int(_)) => {}
            _ => {
                if self.diags.error_count() == errors_before {
                    self.diags.error(
                        DiagnosticCode::NotComptimeEvaluable,
                        format!(
                            "Discriminant of variant '{}' must be an integer constant",
                            variant.name
                        ),
                        discriminant.span(),
                    );
                }
            }
        }
    }
}

/// Comptime literal types become their default concrete types when a
/// binding's type is inferred from them.
fn concretize(ty: Type) -> Type {
    match ty {
        Type::ComptimeInt => Type::Int(IntType::I64),
        Type::ComptimeFloat => Type::Float(FloatType::F64),
        Type::Optional(inner) => Type::Optional(Box::new(concretize(*inner))),
        Type::Array { element, size } => Type::Array {
            element: Box::new(concretize(*element)),
            size,
        },
        other => other,
    }
}
