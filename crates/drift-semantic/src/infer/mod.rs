//! Expression type inference.
//!
//! Inference runs during type validation and memoizes per expression
//! identity, the node kind plus its span, so a re-checked expression
//! costs one map lookup. Only successful inferences are cached; a `None`
//! may become typeable once more signatures are finalized, and failures
//! carry their diagnostics at the point of discovery. An in-flight set
//! breaks self-referential expressions instead of recursing forever.

mod operators;

pub(crate) use operators::{cast_allowed, compatible, numeric_promote, unify};

use drift_ast::{Block, ExprKind, Expression, FieldInit, IfExpr, MatchExpr, Pattern, Statement};
use drift_core::{DiagnosticCode, Diagnostics, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::resolve::resolve_type_expr;
use crate::scope::{ScopeKind, anon_scope_name};
use crate::store::ScopeStore;
use crate::symbols::{SymbolId, SymbolKind, SymbolMeta};
use crate::types::{Type, TypeKind};

/// Cache key: expression discriminant plus source location.
type ExprId = (ExprKind, usize, usize);

/// Counters reported after the type-validation phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct InferStats {
    pub lookups: usize,
    pub inferred: usize,
    pub cache_hits: usize,
}

/// Memoizing expression type inference.
#[derive(Default)]
pub struct TypeInference {
    cache: FxHashMap<ExprId, Type>,
    in_flight: FxHashSet<ExprId>,
    stats: InferStats,
}

impl TypeInference {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> InferStats {
        self.stats
    }

    pub fn reset(&mut self) {
        self.cache.clear();
        self.in_flight.clear();
        self.stats = InferStats::default();
    }

    /// Infers the type of `expr` in the store's current scope.
    ///
    /// `None` means the type could not be determined. Definite errors
    /// are reported here; holes left by earlier phases stay silent
    /// because resolution already reported them.
    pub fn infer(
        &mut self,
        expr: &Expression,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let key = Self::key(expr);
        if let Some(cached) = self.cache.get(&key) {
            self.stats.cache_hits += 1;
            return Some(cached.clone());
        }
        if !self.in_flight.insert(key) {
            // Re-entered the same node; a self-referential expression
            // has no type.
            return None;
        }
        let result = self.infer_uncached(expr, store, diags);
        self.in_flight.remove(&key);
        if let Some(ty) = &result {
            self.stats.inferred += 1;
            self.cache.insert(key, ty.clone());
        }
        result
    }

    fn key(expr: &Expression) -> ExprId {
        let span = expr.span();
        (expr.kind(), span.start, span.end)
    }

    fn infer_uncached(
        &mut self,
        expr: &Expression,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        match expr {
            Expression::Int { .. } => Some(Type::ComptimeInt),
            Expression::Float { .. } => Some(Type::ComptimeFloat),
            Expression::Bool { .. } => Some(Type::Bool),
            Expression::Char { .. } => Some(Type::Char),
            Expression::Str { .. } => Some(Type::Str),
            Expression::Null { .. } => Some(Type::Null),
            Expression::Sizeof { .. } => Some(Type::ComptimeInt),
            Expression::Identifier { name, .. } => self.infer_identifier(name, store),
            Expression::Binary { op, lhs, rhs, span } => {
                self.infer_binary(*op, lhs, rhs, *span, store, diags)
            }
            Expression::Assign {
                op,
                target,
                value,
                span,
            } => self.infer_assign(*op, target, value, *span, store, diags),
            Expression::Prefix { op, operand, span } => {
                self.infer_prefix(*op, operand, *span, store, diags)
            }
            Expression::Call { callee, args, span } => {
                self.infer_call(callee, args, *span, store, diags)
            }
            Expression::Member {
                object,
                member,
                member_span,
                ..
            } => self.infer_member(object, member, *member_span, store, diags),
            Expression::Index {
                object,
                index,
                span,
            } => self.infer_index(object, index, *span, store, diags),
            Expression::As { operand, ty, span } => {
                self.infer_cast(operand, ty, *span, store, diags)
            }
            Expression::Orelse {
                value, fallback, ..
            } => self.infer_orelse(value, fallback, store, diags),
            Expression::Range { start, end, .. } => {
                self.infer_range(start.as_deref(), end.as_deref(), store, diags)
            }
            Expression::Try { operand, .. } => self.infer(operand, store, diags),
            Expression::Catch {
                operand,
                binding,
                handler,
                ..
            } => self.infer_catch(operand, binding.as_deref(), handler, store, diags),
            Expression::If(if_expr) => self.infer_if(if_expr, store, diags),
            Expression::Match(match_expr) => self.infer_match(match_expr, store, diags),
            Expression::Block(block) => self.infer_block(block, store, diags),
            Expression::StructLit {
                type_name,
                fields,
                span,
            } => self.infer_struct_lit(type_name.as_deref(), fields, *span, store, diags),
            Expression::ArrayLit { elements, span } => {
                self.infer_array_lit(elements, *span, store, diags)
            }
        }
    }

    fn infer_identifier(&mut self, name: &str, store: &mut ScopeStore) -> Option<Type> {
        self.stats.lookups += 1;
        let id = store.lookup_symbol(name)?;
        let symbol = store.symbol_mut(id);
        symbol.used = true;
        symbol.ty.clone()
    }

    /// Finds the symbol a member access names. Resolution only checks
    /// accesses rooted at plain identifiers; everything deeper is
    /// discovered and reported here, once the object's type is known.
    fn member_symbol(
        &mut self,
        object: &Expression,
        member: &str,
        member_span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<SymbolId> {
        // `self` has no binding inside a static function, so the access
        // names an instance member without an instance.
        if let Expression::Identifier { name, .. } = object
            && name == "self"
            && store.lookup_symbol("self").is_none()
            && store
                .ancestors(store.current())
                .any(|scope| scope.type_kind() == Some(TypeKind::Struct))
        {
            diags.error(
                DiagnosticCode::UndefinedIdentifier,
                format!("Cannot access instance member '{member}' from a static function"),
                member_span,
            );
            return None;
        }

        let type_access = match object {
            Expression::Identifier { name, .. } => store
                .lookup_symbol(name)
                .is_some_and(|id| store.symbol(id).kind == SymbolKind::Definition),
            _ => false,
        };

        let object_ty = self.infer(object, store, diags)?;
        match object_ty.unwrap_optional() {
            Type::Named(named) => {
                let found = store.lookup_in(named.scope, member);
                let Some(found_id) = found else {
                    let (code, message) = if named.kind == TypeKind::Error {
                        (
                            DiagnosticCode::ErrorMemberNotFound,
                            format!("Error set '{}' has no member '{member}'", named.name),
                        )
                    } else {
                        (
                            DiagnosticCode::UnknownMember,
                            format!("Type '{}' has no member '{member}'", named.name),
                        )
                    };
                    diags.error(code, message, member_span);
                    return None;
                };
                if type_access && is_instance_member(store, found_id) {
                    diags.error(
                        DiagnosticCode::UndefinedIdentifier,
                        format!(
                            "Cannot access instance member '{member}' of type '{}' without an instance",
                            named.name
                        ),
                        member_span,
                    );
                    return None;
                }
                found
            }
            // Module members rooted at an import alias were validated
            // during resolution.
            Type::Module(module) => {
                let scope = store.module_scope(module)?;
                store.lookup_in(scope, member)
            }
            other => {
                diags.error(
                    DiagnosticCode::UnknownMember,
                    format!("Type '{other}' has no members"),
                    member_span,
                );
                None
            }
        }
    }

    fn infer_member(
        &mut self,
        object: &Expression,
        member: &str,
        member_span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let id = self.member_symbol(object, member, member_span, store, diags)?;
        let symbol = store.symbol_mut(id);
        symbol.used = true;
        symbol.ty.clone()
    }

    fn infer_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let (callee_id, callee_ty) = match callee {
            Expression::Identifier { name, .. } => {
                self.stats.lookups += 1;
                let id = store.lookup_symbol(name);
                (id, id.and_then(|id| store.symbol(id).ty.clone()))
            }
            Expression::Member {
                object,
                member,
                member_span,
                ..
            } => {
                let id = self.member_symbol(object, member, *member_span, store, diags);
                (id, id.and_then(|id| store.symbol(id).ty.clone()))
            }
            other => (None, self.infer(other, store, diags)),
        };

        if let Some(id) = callee_id {
            store.symbol_mut(id).used = true;
            if store.symbol(id).kind == SymbolKind::EnumVariant {
                return self.infer_variant_call(id, args, span, store, diags);
            }
        }

        let Some(callee_ty) = callee_ty else {
            // Keep walking the arguments so their uses register.
            for arg in args {
                self.infer(arg, store, diags);
            }
            return None;
        };
        let sig = match callee_ty {
            Type::Function(sig) => sig,
            other => {
                let message = match callee_id {
                    Some(id) => format!("'{}' is not callable", store.symbol(id).name),
                    None => format!("Value of type '{other}' is not callable"),
                };
                diags.error(DiagnosticCode::NotCallable, message, callee.span());
                for arg in args {
                    self.infer(arg, store, diags);
                }
                return None;
            }
        };

        let required = match callee_id {
            Some(id) => required_params(store, id, sig.params.len()),
            None => sig.params.len(),
        };
        if args.len() < required || args.len() > sig.params.len() {
            let expected = if required == sig.params.len() {
                let noun = if required == 1 { "argument" } else { "arguments" };
                format!("{required} {noun}")
            } else {
                format!("{required} to {} arguments", sig.params.len())
            };
            diags.error(
                DiagnosticCode::WrongArgumentCount,
                format!("Function expects {expected}, found {}", args.len()),
                span,
            );
        }
        for (arg, param_ty) in args.iter().zip(sig.params.iter()) {
            if let Some(arg_ty) = self.infer(arg, store, diags)
                && !compatible(param_ty, &arg_ty)
            {
                diags.error(
                    DiagnosticCode::TypeMismatch,
                    format!(
                        "Argument of type '{arg_ty}' is not compatible with parameter type '{param_ty}'"
                    ),
                    arg.span(),
                );
            }
        }
        for arg in args.iter().skip(sig.params.len()) {
            self.infer(arg, store, diags);
        }
        Some(sig.return_type.clone())
    }

    /// `Color.Green(x)` constructs a variant; the payload is checked for
    /// type compatibility here and for value range during constant
    /// checking.
    fn infer_variant_call(
        &mut self,
        variant_id: SymbolId,
        args: &[Expression],
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let (name, payload, result) = {
            let symbol = store.symbol(variant_id);
            let payload = match &symbol.meta {
                SymbolMeta::EnumVariant(meta) => meta.payload.clone(),
                _ => None,
            };
            (symbol.name.clone(), payload, symbol.ty.clone())
        };
        match payload {
            Some(payload) => {
                if args.len() != 1 {
                    diags.error(
                        DiagnosticCode::WrongArgumentCount,
                        format!(
                            "Variant '{name}' takes exactly one argument, found {}",
                            args.len()
                        ),
                        span,
                    );
                }
                for arg in args {
                    if let Some(arg_ty) = self.infer(arg, store, diags)
                        && !compatible(&payload, &arg_ty)
                    {
                        diags.error(
                            DiagnosticCode::TypeMismatch,
                            format!("Variant '{name}' carries '{payload}', found '{arg_ty}'"),
                            arg.span(),
                        );
                    }
                }
            }
            None => {
                if !args.is_empty() {
                    diags.error(
                        DiagnosticCode::WrongArgumentCount,
                        format!("Variant '{name}' has no payload"),
                        span,
                    );
                }
                for arg in args {
                    self.infer(arg, store, diags);
                }
            }
        }
        result
    }

    fn infer_index(
        &mut self,
        object: &Expression,
        index: &Expression,
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let object_ty = self.infer(object, store, diags);
        if let Some(index_ty) = self.infer(index, store, diags)
            && !index_ty.is_integer()
        {
            diags.error(
                DiagnosticCode::TypeMismatch,
                format!("Index must be an integer, found '{index_ty}'"),
                index.span(),
            );
        }
        match object_ty? {
            Type::Array { element, .. } => Some(*element),
            Type::Str => Some(Type::Char),
            other => {
                diags.error(
                    DiagnosticCode::TypeMismatch,
                    format!("Type '{other}' cannot be indexed"),
                    span,
                );
                None
            }
        }
    }

    fn infer_cast(
        &mut self,
        operand: &Expression,
        ty: &drift_ast::TypeExpr,
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let target = resolve_type_expr(ty, store, diags)?;
        let Some(operand_ty) = self.infer(operand, store, diags) else {
            // The cast vouches for its type even when the operand failed.
            return Some(target);
        };
        if !cast_allowed(&operand_ty, &target) {
            diags.error(
                DiagnosticCode::InvalidCast,
                format!("Cannot cast '{operand_ty}' to '{target}'"),
                span,
            );
            return None;
        }
        Some(target)
    }

    fn infer_orelse(
        &mut self,
        value: &Expression,
        fallback: &Expression,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let value_ty = self.infer(value, store, diags);
        let fallback_ty = self.infer(fallback, store, diags);
        match value_ty? {
            Type::Optional(inner) => {
                if let Some(fb) = &fallback_ty
                    && unify(&inner, fb).is_none()
                {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Fallback of type '{fb}' does not match '{inner}'"),
                        fallback.span(),
                    );
                }
                Some(*inner)
            }
            Type::Null => fallback_ty,
            other => Some(other),
        }
    }

    fn infer_range(
        &mut self,
        start: Option<&Expression>,
        end: Option<&Expression>,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let mut element = Type::ComptimeInt;
        for bound in [start, end].into_iter().flatten() {
            let Some(ty) = self.infer(bound, store, diags) else {
                continue;
            };
            if ty.is_integer() {
                if let Some(promoted) = numeric_promote(&element, &ty) {
                    element = promoted;
                }
            } else {
                diags.error(
                    DiagnosticCode::TypeMismatch,
                    format!("Range bounds must be integers, found '{ty}'"),
                    bound.span(),
                );
            }
        }
        Some(Type::Range(Box::new(element)))
    }

    fn infer_catch(
        &mut self,
        operand: &Expression,
        binding: Option<&str>,
        handler: &Block,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let operand_ty = self.infer(operand, store, diags);
        let name = anon_scope_name("catch", handler.span);
        let Some(scope) = store.find_child_scope(&name, ScopeKind::Expression) else {
            return operand_ty;
        };

        // The handler binding carries the operand's declared error set.
        if let Some(binding) = binding
            && let Some(error_ty) = self.operand_error_type(operand, store, diags)
            && let Some(binding_id) = store.lookup_in(scope, binding)
        {
            store.symbol_mut(binding_id).ty = Some(error_ty);
        }

        let handler_ty = store.with_scope(scope, |store| self.block_value(handler, store, diags));
        if let (Some(op), Some(handler_ty)) = (&operand_ty, &handler_ty)
            && !handler_ty.is_void()
            && unify(op, handler_ty).is_none()
        {
            diags.error(
                DiagnosticCode::TypeMismatch,
                format!("Catch handler produces '{handler_ty}' but the operand produces '{op}'"),
                handler.span,
            );
        }
        operand_ty
    }

    /// The declared error type of a fallible operand, when the operand
    /// is a direct call.
    fn operand_error_type(
        &mut self,
        operand: &Expression,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let call = match operand {
            Expression::Try { operand, .. } => operand.as_ref(),
            other => other,
        };
        if let Expression::Call { callee, .. } = call
            && let Some(Type::Function(sig)) = self.infer(callee, store, diags)
        {
            return sig.error.clone();
        }
        None
    }

    fn infer_if(
        &mut self,
        if_expr: &IfExpr,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        self.check_condition(&if_expr.condition, store, diags);
        let mut result = self.branch_value("then", &if_expr.then_block, store, diags);
        for else_if in &if_expr.else_ifs {
            self.check_condition(&else_if.condition, store, diags);
            let branch = self.branch_value("then", &else_if.block, store, diags);
            result = merge_branches(result, branch, if_expr.span, diags);
        }
        match &if_expr.else_block {
            Some(block) => {
                let branch = self.branch_value("else", block, store, diags);
                merge_branches(result, branch, if_expr.span, diags)
            }
            // Without an else the conditional cannot carry a value.
            None => Some(Type::Void),
        }
    }

    pub(crate) fn check_condition(
        &mut self,
        condition: &Expression,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) {
        if let Some(ty) = self.infer(condition, store, diags)
            && !ty.is_bool()
        {
            diags.error(
                DiagnosticCode::ConditionNotBool,
                format!("Condition must be 'bool', found '{ty}'"),
                condition.span(),
            );
        }
    }

    fn infer_match(
        &mut self,
        match_expr: &MatchExpr,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let subject_ty = self.infer(&match_expr.subject, store, diags);
        if let Some(ty) = &subject_ty {
            let subject = ty.unwrap_optional().clone();
            self.check_patterns(match_expr, &subject, store, diags);
        }
        if match_expr.arms.is_empty() {
            return Some(Type::Void);
        }
        let mut result = None;
        for arm in &match_expr.arms {
            let name = anon_scope_name("arm", arm.span);
            let Some(scope) = store.find_child_scope(&name, ScopeKind::Expression) else {
                continue;
            };
            let arm_ty =
                store.with_scope(scope, |store| self.block_value(&arm.body, store, diags));
            result = merge_branches(result, arm_ty, match_expr.span, diags);
        }
        result
    }

    /// Validates patterns against the subject and types each variant
    /// binding from its payload.
    fn check_patterns(
        &mut self,
        match_expr: &MatchExpr,
        subject: &Type,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) {
        for arm in &match_expr.arms {
            match &arm.pattern {
                Pattern::Variant {
                    name,
                    binding,
                    span,
                } => {
                    let Some(named) = subject.as_named() else {
                        diags.error(
                            DiagnosticCode::TypeMismatch,
                            format!(
                                "Variant patterns require an enum or error subject, found '{subject}'"
                            ),
                            *span,
                        );
                        continue;
                    };
                    let named = named.clone();
                    let Some(variant_id) = store.lookup_in(named.scope, name) else {
                        let (code, message) = if named.kind == TypeKind::Error {
                            (
                                DiagnosticCode::ErrorMemberNotFound,
                                format!("Error set '{}' has no member '{name}'", named.name),
                            )
                        } else {
                            (
                                DiagnosticCode::UnknownMember,
                                format!("Enum '{}' has no variant '{name}'", named.name),
                            )
                        };
                        diags.error(code, message, *span);
                        continue;
                    };
                    store.symbol_mut(variant_id).used = true;
                    if let Some(binding) = binding {
                        let payload = match &store.symbol(variant_id).meta {
                            SymbolMeta::EnumVariant(meta) => meta.payload.clone(),
                            _ => None,
                        };
                        match payload {
                            Some(payload) => {
                                let scope_name = anon_scope_name("arm", arm.span);
                                if let Some(arm_scope) = store
                                    .find_child_scope(&scope_name, ScopeKind::Expression)
                                    && let Some(binding_id) = store.lookup_in(arm_scope, binding)
                                {
                                    store.symbol_mut(binding_id).ty = Some(payload);
                                }
                            }
                            None => {
                                diags.error(
                                    DiagnosticCode::WrongArgumentCount,
                                    format!("Variant '{name}' has no payload to bind"),
                                    *span,
                                );
                            }
                        }
                    }
                }
                Pattern::Int { span, .. } => {
                    if !subject.is_integer() {
                        pattern_mismatch("an integer", subject, *span, diags);
                    }
                }
                Pattern::Bool { span, .. } => {
                    if !subject.is_bool() {
                        pattern_mismatch("a 'bool'", subject, *span, diags);
                    }
                }
                Pattern::Char { span, .. } => {
                    if !matches!(subject, Type::Char) {
                        pattern_mismatch("a 'char'", subject, *span, diags);
                    }
                }
                Pattern::Str { span, .. } => {
                    if !matches!(subject, Type::Str) {
                        pattern_mismatch("a 'str'", subject, *span, diags);
                    }
                }
                Pattern::Wildcard { .. } => {}
            }
        }
    }

    fn infer_block(
        &mut self,
        block: &Block,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let name = anon_scope_name("block", block.span);
        let scope = store.find_child_scope(&name, ScopeKind::Block)?;
        store.with_scope(scope, |store| self.block_value(block, store, diags))
    }

    /// The value of a block is its trailing expression statement; any
    /// other tail makes it `void`.
    pub(crate) fn block_value(
        &mut self,
        block: &Block,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        match block.statements.last() {
            Some(Statement::Expr { expression, .. }) => self.infer(expression, store, diags),
            _ => Some(Type::Void),
        }
    }

    /// Types the value of one `if`/`match` branch inside its scope.
    pub(crate) fn branch_value(
        &mut self,
        prefix: &str,
        block: &Block,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let name = anon_scope_name(prefix, block.span);
        let scope = store.find_child_scope(&name, ScopeKind::Expression)?;
        store.with_scope(scope, |store| self.block_value(block, store, diags))
    }

    fn infer_struct_lit(
        &mut self,
        type_name: Option<&str>,
        fields: &[FieldInit],
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let Some(name) = type_name else {
            for field in fields {
                self.infer(&field.value, store, diags);
            }
            diags.error(
                DiagnosticCode::CannotInferType,
                "Cannot infer the type of an anonymous struct literal".to_string(),
                span,
            );
            return None;
        };

        let named = store
            .lookup_symbol(name)
            .and_then(|id| store.symbol(id).ty.clone())
            .and_then(|ty| ty.as_named().cloned());
        let Some(named) = named else {
            // Unknown type names were reported during resolution.
            for field in fields {
                self.infer(&field.value, store, diags);
            }
            return None;
        };
        if named.kind != TypeKind::Struct {
            diags.error(
                DiagnosticCode::UndefinedType,
                format!("'{name}' is not a struct type"),
                span,
            );
            for field in fields {
                self.infer(&field.value, store, diags);
            }
            return None;
        }

        for field in fields {
            let member = store.lookup_in(named.scope, &field.name);
            let field_ty = match member {
                Some(id) if store.symbol(id).kind == SymbolKind::StructField => {
                    store.symbol_mut(id).used = true;
                    store.symbol(id).ty.clone()
                }
                _ => {
                    diags.error(
                        DiagnosticCode::UnknownField,
                        format!("Struct '{}' has no field '{}'", named.name, field.name),
                        field.span,
                    );
                    None
                }
            };
            if let Some(value_ty) = self.infer(&field.value, store, diags)
                && let Some(field_ty) = field_ty
                && !compatible(&field_ty, &value_ty)
            {
                diags.error(
                    DiagnosticCode::TypeMismatch,
                    format!(
                        "Field '{}' expects '{field_ty}', found '{value_ty}'",
                        field.name
                    ),
                    field.value.span(),
                );
            }
        }

        let missing: Vec<String> = store
            .symbols_in(named.scope)
            .filter(|(_, symbol)| symbol.kind == SymbolKind::StructField)
            .filter(|(_, symbol)| match &symbol.meta {
                SymbolMeta::StructField(meta) => meta.default.is_none(),
                _ => true,
            })
            .filter(|(_, symbol)| !fields.iter().any(|field| field.name == symbol.name))
            .map(|(_, symbol)| symbol.name.clone())
            .collect();
        for field_name in missing {
            diags.error(
                DiagnosticCode::MissingField,
                format!("Missing field '{field_name}' in struct literal"),
                span,
            );
        }

        Some(Type::Named(named))
    }

    fn infer_array_lit(
        &mut self,
        elements: &[Expression],
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        if elements.is_empty() {
            diags.error(
                DiagnosticCode::CannotInferType,
                "Cannot infer the element type of an empty array literal".to_string(),
                span,
            );
            return None;
        }
        let mut element: Option<Type> = None;
        for expr in elements {
            let Some(ty) = self.infer(expr, store, diags) else {
                continue;
            };
            element = match element {
                None => Some(ty),
                Some(current) => match unify(&current, &ty) {
                    Some(unified) => Some(unified),
                    None => {
                        diags.error(
                            DiagnosticCode::TypeMismatch,
                            format!("Array elements have mixed types '{current}' and '{ty}'"),
                            expr.span(),
                        );
                        Some(current)
                    }
                },
            };
        }
        Some(Type::Array {
            element: Box::new(element?),
            size: Some(elements.len() as u64),
        })
    }
}

/// True for members that need a receiver: fields and non-static
/// functions.
fn is_instance_member(store: &ScopeStore, id: SymbolId) -> bool {
    let symbol = store.symbol(id);
    match (&symbol.kind, &symbol.meta) {
        (SymbolKind::StructField, _) => true,
        (SymbolKind::Function, SymbolMeta::Function(meta)) => !meta.is_static,
        _ => false,
    }
}

/// Number of arguments a call must supply: all parameters minus the
/// trailing run of defaults.
fn required_params(store: &ScopeStore, fn_id: SymbolId, total: usize) -> usize {
    let SymbolMeta::Function(meta) = &store.symbol(fn_id).meta else {
        return total;
    };
    let mut optional = 0;
    for param_id in meta.params.iter().rev() {
        let SymbolMeta::Parameter(param) = &store.symbol(*param_id).meta else {
            break;
        };
        if param.is_self || param.default.is_none() {
            break;
        }
        optional += 1;
    }
    total.saturating_sub(optional)
}

fn merge_branches(
    a: Option<Type>,
    b: Option<Type>,
    span: Span,
    diags: &mut Diagnostics,
) -> Option<Type> {
    match (a, b) {
        (Some(a), Some(b)) => match unify(&a, &b) {
            Some(ty) => Some(ty),
            None => {
                diags.error(
                    DiagnosticCode::TypeMismatch,
                    format!("Branches have incompatible types '{a}' and '{b}'"),
                    span,
                );
                None
            }
        },
        (Some(a), None) => Some(a),
        (None, b) => b,
    }
}

fn pattern_mismatch(expected: &str, subject: &Type, span: Span, diags: &mut Diagnostics) {
    diags.error(
        DiagnosticCode::TypeMismatch,
        format!("Pattern expects {expected} subject, found '{subject}'"),
        span,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ScopeStore;
    use crate::symbols::Symbol;
    use crate::types::IntType;

    fn int_lit(value: u128, start: usize) -> Expression {
        Expression::Int {
            value,
            span: Span::new(start, start + 1),
        }
    }

    #[test]
    fn literals_infer_comptime_types() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut infer = TypeInference::new();

        assert_eq!(
            infer.infer(&int_lit(1, 0), &mut store, &mut diags),
            Some(Type::ComptimeInt)
        );
        let float = Expression::Float {
            value: 2.5,
            span: Span::new(2, 5),
        };
        assert_eq!(
            infer.infer(&float, &mut store, &mut diags),
            Some(Type::ComptimeFloat)
        );
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn identifier_types_come_from_symbols_and_cache() {
        let mut store = ScopeStore::new();
        let global = store.global();
        store.add_symbol(
            Symbol::new("x", SymbolKind::Variable, global, "main")
                .with_type(Type::Int(IntType::I64)),
        );
        let mut diags = Diagnostics::new(50);
        let mut infer = TypeInference::new();
        let expr = Expression::Identifier {
            name: "x".to_string(),
            span: Span::new(0, 1),
        };

        assert_eq!(
            infer.infer(&expr, &mut store, &mut diags),
            Some(Type::Int(IntType::I64))
        );
        assert_eq!(
            infer.infer(&expr, &mut store, &mut diags),
            Some(Type::Int(IntType::I64))
        );
        assert_eq!(infer.stats().inferred, 1);
        assert_eq!(infer.stats().cache_hits, 1);
    }

    #[test]
    fn mixed_literal_arithmetic_promotes_to_comptime_float() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut infer = TypeInference::new();
        let expr = Expression::Binary {
            op: drift_ast::BinaryOp::Add,
            lhs: Box::new(int_lit(1, 0)),
            rhs: Box::new(Expression::Float {
                value: 0.5,
                span: Span::new(4, 7),
            }),
            span: Span::new(0, 7),
        };

        assert_eq!(
            infer.infer(&expr, &mut store, &mut diags),
            Some(Type::ComptimeFloat)
        );
    }

    #[test]
    fn indexing_a_non_array_reports() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut infer = TypeInference::new();
        let expr = Expression::Index {
            object: Box::new(Expression::Bool {
                value: true,
                span: Span::new(0, 4),
            }),
            index: Box::new(int_lit(0, 5)),
            span: Span::new(0, 7),
        };

        assert_eq!(infer.infer(&expr, &mut store, &mut diags), None);
        assert_eq!(
            diags.iter().next().unwrap().code,
            DiagnosticCode::TypeMismatch
        );
    }

    #[test]
    fn array_literals_unify_their_elements() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut infer = TypeInference::new();
        let expr = Expression::ArrayLit {
            elements: vec![int_lit(1, 1), int_lit(2, 4), int_lit(3, 7)],
            span: Span::new(0, 9),
        };

        assert_eq!(
            infer.infer(&expr, &mut store, &mut diags),
            Some(Type::Array {
                element: Box::new(Type::ComptimeInt),
                size: Some(3),
            })
        );
    }
}
