//! Compile-time constant evaluation.
//!
//! The evaluator folds the restricted constant grammar: literals,
//! immutable identifiers with constant initializers, binary and prefix
//! operators, casts, `sizeof`, and calls to `comptime` functions.
//! Integer arithmetic runs on checked `i128` and every intermediate
//! result is bounds-checked against the target width when one is known,
//! else against signed 64-bit bounds, so overflow is reported instead
//! of wrapping.
//!
//! Two kinds of `None` leave this module: a silent one for expressions
//! that are simply not constant (callers decide whether that matters),
//! and a reported one for expressions that are constant but invalid,
//! such as overflow or division by zero.

mod arithmetic;

pub(crate) use arithmetic::{MAX_CHAR_CODE, MAX_EXPONENT, MAX_SHIFT};

use drift_ast::{BinaryOp, Block, Expression, Statement};
use drift_core::{DiagnosticCode, Diagnostics, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::eval::arithmetic::{apply_cast, bounds_check, eval_binary, eval_prefix};
use crate::resolve::resolve_type_expr;
use crate::store::ScopeStore;
use crate::symbols::{SymbolId, SymbolKind, SymbolMeta};
use crate::types::Type;

/// A concrete value produced by constant evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Int(i128),
    Float(f64),
    Bool(bool),
    Null,
}

impl EvalValue {
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Bool(_) => "boolean",
            Self::Null => "null",
        }
    }

    /// The integer inside, when this is one.
    #[must_use]
    pub const fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }
}

impl std::fmt::Display for EvalValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// Hashable form of a value, for the call memo key. Floats key by their
/// bit pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EvalKey {
    Int(i128),
    Float(u64),
    Bool(bool),
    Null,
}

impl From<&EvalValue> for EvalKey {
    fn from(value: &EvalValue) -> Self {
        match value {
            EvalValue::Int(int) => Self::Int(*int),
            EvalValue::Float(float) => Self::Float(float.to_bits()),
            EvalValue::Bool(b) => Self::Bool(*b),
            EvalValue::Null => Self::Null,
        }
    }
}

/// Bounds and expectations for one evaluation walk; never mutated
/// mid-walk, derived contexts are fresh values.
#[derive(Debug, Clone)]
pub struct EvalContext {
    pub allow_floats: bool,
    pub min_int: i128,
    pub max_int: i128,
    pub target: Option<Type>,
}

impl EvalContext {
    /// No target: signed 64-bit bounds, floats allowed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allow_floats: true,
            min_int: i64::MIN as i128,
            max_int: i64::MAX as i128,
            target: None,
        }
    }

    /// Bounds taken from `target` when it is a concrete integer type.
    #[must_use]
    pub fn with_target(target: &Type) -> Self {
        let mut ctx = Self::new();
        if let Type::Int(int) = target.unwrap_optional() {
            ctx.min_int = int.min();
            ctx.max_int = int.max();
        }
        ctx.target = Some(target.clone());
        ctx
    }

    /// Integer-only context for array sizes and discriminants.
    #[must_use]
    pub fn int_only() -> Self {
        Self {
            allow_floats: false,
            ..Self::new()
        }
    }

    /// A fresh context aimed at `target`, keeping the float policy.
    #[must_use]
    pub fn retarget(&self, target: &Type) -> Self {
        Self {
            allow_floats: self.allow_floats,
            ..Self::with_target(target)
        }
    }

    /// A fresh context with default bounds, keeping the float policy.
    #[must_use]
    pub fn untargeted(&self) -> Self {
        Self {
            allow_floats: self.allow_floats,
            ..Self::new()
        }
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters reported after the type-validation phase.
#[derive(Debug, Default, Clone, Copy)]
pub struct EvalStats {
    pub evaluated: usize,
    pub calls: usize,
    pub cache_hits: usize,
}

/// Constant-expression evaluator with per-call memoization.
#[derive(Default)]
pub struct ComptimeEvaluator {
    call_cache: FxHashMap<(SymbolId, Vec<EvalKey>), EvalValue>,
    active_calls: FxHashSet<SymbolId>,
    active_consts: FxHashSet<SymbolId>,
    /// Comptime call frames; identifier lookups see the top frame only.
    locals: Vec<FxHashMap<String, EvalValue>>,
    stats: EvalStats,
}

impl ComptimeEvaluator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn stats(&self) -> EvalStats {
        self.stats
    }

    pub fn reset(&mut self) {
        self.call_cache.clear();
        self.active_calls.clear();
        self.active_consts.clear();
        self.locals.clear();
        self.stats = EvalStats::default();
    }

    /// Evaluates `expr` to a constant, or `None` when it is not a
    /// constant (silent) or constant but invalid (reported).
    pub fn evaluate(
        &mut self,
        expr: &Expression,
        ctx: &EvalContext,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<EvalValue> {
        let result = self.evaluate_inner(expr, ctx, store, diags)?;
        if !ctx.allow_floats && matches!(result, EvalValue::Float(_)) {
            return None;
        }
        self.stats.evaluated += 1;
        Some(result)
    }

    fn evaluate_inner(
        &mut self,
        expr: &Expression,
        ctx: &EvalContext,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<EvalValue> {
        match expr {
            Expression::Int { value, span } => {
                let value = int_literal(*value, *span, ctx, diags)?;
                Some(EvalValue::Int(value))
            }
            Expression::Float { value, .. } => Some(EvalValue::Float(*value)),
            Expression::Bool { value, .. } => Some(EvalValue::Bool(*value)),
            Expression::Null { .. } => Some(EvalValue::Null),
            Expression::Char { value, span } => {
                if *value > MAX_CHAR_CODE {
                    diags.error(
                        DiagnosticCode::CharOutOfRange,
                        format!("Character code {value:#x} is above the Unicode ceiling {MAX_CHAR_CODE:#x}"),
                        *span,
                    );
                    return None;
                }
                Some(EvalValue::Int(i128::from(*value)))
            }
            Expression::Identifier { name, span } => {
                self.eval_identifier(name, *span, ctx, store, diags)
            }
            Expression::Binary {
                op,
                lhs,
                rhs,
                span,
            } => self.eval_binary_expr(*op, lhs, rhs, *span, ctx, store, diags),
            Expression::Prefix { op, operand, span } => {
                // `-128` arrives as a prefix around the magnitude; fold
                // the pair so the literal check sees the signed value.
                if *op == drift_ast::PrefixOp::Minus
                    && let Expression::Int { value, .. } = operand.as_ref()
                {
                    let negated = negated_literal(*value, *span, ctx, diags)?;
                    return Some(EvalValue::Int(negated));
                }
                let value = self.evaluate_inner(operand, ctx, store, diags)?;
                eval_prefix(*op, value, ctx, *span, diags)
            }
            Expression::As { operand, ty, span } => {
                let target = resolve_type_expr(ty, store, diags)?;
                let inner = ctx.retarget(&target);
                let value = self.evaluate_inner(operand, &inner, store, diags)?;
                apply_cast(value, &target, *span, diags)
            }
            Expression::Sizeof { ty, .. } => {
                let target = resolve_type_expr(ty, store, diags)?;
                type_size(&target).map(EvalValue::Int)
            }
            Expression::Call { callee, args, span } => {
                self.eval_call(callee, args, *span, ctx, store, diags)
            }
            // Everything else is outside the constant grammar.
            _ => None,
        }
    }

    /// Constants fold through immutable bindings: the initializer kept
    /// in the symbol's metadata is evaluated under the binding's own
    /// declared type.
    fn eval_identifier(
        &mut self,
        name: &str,
        span: Span,
        ctx: &EvalContext,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<EvalValue> {
        if let Some(frame) = self.locals.last()
            && let Some(value) = frame.get(name)
        {
            return Some(value.clone());
        }

        let id = store.lookup_symbol(name)?;
        let (init, ty) = {
            let symbol = store.symbol(id);
            if symbol.kind != SymbolKind::Variable || symbol.is_mutable() {
                return None;
            }
            let init = match &symbol.meta {
                SymbolMeta::Variable(meta) => meta.init.clone(),
                _ => None,
            };
            (init?, symbol.ty.clone())
        };

        if !self.active_consts.insert(id) {
            // Initializer cycles were already flagged by resolution.
            return None;
        }
        let inner = match &ty {
            Some(ty) => ctx.retarget(ty),
            None => ctx.untargeted(),
        };
        let result = self.evaluate_inner(&init, &inner, store, diags);
        self.active_consts.remove(&id);

        // The constant's value still has to fit where it is used.
        match result? {
            EvalValue::Int(value) => {
                Some(EvalValue::Int(bounds_check(value, ctx, span, diags)?))
            }
            other => Some(other),
        }
    }

    fn eval_binary_expr(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        span: Span,
        ctx: &EvalContext,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<EvalValue> {
        // Logical operators short-circuit like their runtime form.
        if op.is_logical() {
            let EvalValue::Bool(left) = self.evaluate_inner(lhs, ctx, store, diags)? else {
                return None;
            };
            match (op, left) {
                (BinaryOp::And, false) => return Some(EvalValue::Bool(false)),
                (BinaryOp::Or, true) => return Some(EvalValue::Bool(true)),
                _ => {}
            }
            return match self.evaluate_inner(rhs, ctx, store, diags)? {
                EvalValue::Bool(right) => Some(EvalValue::Bool(right)),
                _ => None,
            };
        }

        let left = self.evaluate_inner(lhs, ctx, store, diags)?;
        let right = self.evaluate_inner(rhs, ctx, store, diags)?;
        eval_binary(op, left, right, ctx, span, diags)
    }

    /// Calls to `comptime` functions, memoized per argument values.
    fn eval_call(
        &mut self,
        callee: &Expression,
        args: &[Expression],
        span: Span,
        ctx: &EvalContext,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<EvalValue> {
        let fn_id = callee_symbol(callee, store)?;
        let (name, fn_scope, param_ids, return_type, body) = {
            let symbol = store.symbol(fn_id);
            let SymbolMeta::Function(meta) = &symbol.meta else {
                return None;
            };
            if !meta.is_comptime {
                return None;
            }
            (
                symbol.name.clone(),
                meta.scope,
                meta.params.clone(),
                meta.return_type.clone(),
                meta.comptime_body.clone(),
            )
        };
        self.stats.calls += 1;

        // Arguments are evaluated in the caller's context, each aimed at
        // its parameter's declared type; omitted trailing arguments fall
        // back to their defaults, also evaluated here at the call site.
        let mut names = Vec::with_capacity(param_ids.len());
        let mut values = Vec::with_capacity(param_ids.len());
        let mut position = 0;
        for param_id in &param_ids {
            let (param_name, param_ty, default, is_self) = {
                let symbol = store.symbol(*param_id);
                let (default, is_self) = match &symbol.meta {
                    SymbolMeta::Parameter(meta) => (meta.default.clone(), meta.is_self),
                    _ => (None, false),
                };
                (symbol.name.clone(), symbol.ty.clone(), default, is_self)
            };
            if is_self {
                return None;
            }
            let arg_ctx = match &param_ty {
                Some(ty) => ctx.retarget(ty),
                None => ctx.untargeted(),
            };
            let value = match args.get(position) {
                Some(arg) => self.evaluate_inner(arg, &arg_ctx, store, diags)?,
                None => match default {
                    Some(default) => self.evaluate_inner(&default, &arg_ctx, store, diags)?,
                    None => {
                        diags.error(
                            DiagnosticCode::WrongArgumentCount,
                            format!(
                                "Comptime call to '{name}' expects {} arguments, found {}",
                                param_ids.len(),
                                args.len()
                            ),
                            span,
                        );
                        return None;
                    }
                },
            };
            names.push(param_name);
            values.push(value);
            position += 1;
        }
        if args.len() > position {
            diags.error(
                DiagnosticCode::WrongArgumentCount,
                format!(
                    "Comptime call to '{name}' expects {position} arguments, found {}",
                    args.len()
                ),
                span,
            );
            return None;
        }

        let memo_key: Vec<EvalKey> = values.iter().map(EvalKey::from).collect();
        if let Some(cached) = self.call_cache.get(&(fn_id, memo_key.clone())) {
            self.stats.cache_hits += 1;
            let cached = cached.clone();
            return self.fit_result(cached, ctx, span, diags);
        }

        if !self.active_calls.insert(fn_id) {
            diags.error(
                DiagnosticCode::NotComptimeEvaluable,
                format!("Recursive comptime call to '{name}'"),
                span,
            );
            return None;
        }

        let Some(body) = body else {
            self.active_calls.remove(&fn_id);
            diags.error(
                DiagnosticCode::InternalError,
                format!("Comptime function '{name}' has no stored body"),
                span,
            );
            return None;
        };

        let body_ctx = match &return_type {
            Some(ty) => EvalContext::with_target(ty),
            None => EvalContext::new(),
        };
        let mut frame = FxHashMap::default();
        for (param_name, value) in names.into_iter().zip(values) {
            frame.insert(param_name, value);
        }
        self.locals.push(frame);
        let result = store.with_scope(fn_scope, |store| {
            self.eval_body(&body, &name, &body_ctx, span, store, diags)
        });
        self.locals.pop();
        self.active_calls.remove(&fn_id);

        if let Some(value) = &result {
            self.call_cache.insert((fn_id, memo_key), value.clone());
        }
        self.fit_result(result?, ctx, span, diags)
    }

    /// Reduces a comptime body: `let` bindings followed by one
    /// `return expr`, nothing else.
    fn eval_body(
        &mut self,
        body: &Block,
        name: &str,
        ctx: &EvalContext,
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<EvalValue> {
        for statement in &body.statements {
            match statement {
                Statement::Let(decl) => {
                    let Some(init) = &decl.init else {
                        return self.reject_body(name, span, diags);
                    };
                    let binding_ty = store
                        .lookup_symbol(&decl.name)
                        .and_then(|id| store.symbol(id).ty.clone());
                    let inner = match &binding_ty {
                        Some(ty) => ctx.retarget(ty),
                        None => ctx.untargeted(),
                    };
                    let value = self.evaluate_inner(init, &inner, store, diags)?;
                    if let Some(frame) = self.locals.last_mut() {
                        frame.insert(decl.name.clone(), value);
                    }
                }
                Statement::Return {
                    value: Some(value), ..
                } => {
                    return self.evaluate_inner(value, ctx, store, diags);
                }
                _ => return self.reject_body(name, span, diags),
            }
        }
        self.reject_body(name, span, diags)
    }

    fn reject_body(
        &mut self,
        name: &str,
        span: Span,
        diags: &mut Diagnostics,
    ) -> Option<EvalValue> {
        diags.error(
            DiagnosticCode::NotComptimeEvaluable,
            format!("Comptime function '{name}' must reduce to let bindings and a single return"),
            span,
        );
        None
    }

    /// Re-checks a call result against the caller's bounds.
    fn fit_result(
        &mut self,
        value: EvalValue,
        ctx: &EvalContext,
        span: Span,
        diags: &mut Diagnostics,
    ) -> Option<EvalValue> {
        match value {
            EvalValue::Int(int) => Some(EvalValue::Int(bounds_check(int, ctx, span, diags)?)),
            other => Some(other),
        }
    }
}

/// Resolves a call target through import aliases to a function symbol.
pub(crate) fn callee_symbol(callee: &Expression, store: &ScopeStore) -> Option<SymbolId> {
    let Expression::Identifier { name, .. } = callee else {
        return None;
    };
    let mut id = store.lookup_symbol(name)?;
    let mut hops = 0;
    while store.symbol(id).kind == SymbolKind::Use {
        let SymbolMeta::Use(meta) = &store.symbol(id).meta else {
            return None;
        };
        id = meta.target?;
        hops += 1;
        if hops > 8 {
            return None;
        }
    }
    (store.symbol(id).kind == SymbolKind::Function).then_some(id)
}

/// A positive literal checked against the context's upper bound.
fn int_literal(
    value: u128,
    span: Span,
    ctx: &EvalContext,
    diags: &mut Diagnostics,
) -> Option<i128> {
    if value > ctx.max_int as u128 {
        arithmetic::report_overflow(value.to_string(), ctx, span, diags);
        return None;
    }
    Some(value as i128)
}

/// A negated literal checked against the lower bound, so `-128` fits an
/// `i8` even though `128` alone would not.
fn negated_literal(
    value: u128,
    span: Span,
    ctx: &EvalContext,
    diags: &mut Diagnostics,
) -> Option<i128> {
    if value > i128::MAX as u128 {
        arithmetic::report_overflow(format!("-{value}"), ctx, span, diags);
        return None;
    }
    let negated = -(value as i128);
    if negated < ctx.min_int {
        arithmetic::report_overflow(negated.to_string(), ctx, span, diags);
        return None;
    }
    Some(negated)
}

/// Byte sizes for `sizeof` on the types with a defined layout.
fn type_size(ty: &Type) -> Option<i128> {
    match ty {
        Type::Int(int) => Some(i128::from(int.bits() / 8)),
        Type::Float(float) => Some(i128::from(float.bits() / 8)),
        Type::Bool => Some(1),
        Type::Char => Some(4),
        Type::Pointer(_) => Some(8),
        Type::Array {
            element,
            size: Some(size),
        } => Some(type_size(element)? * i128::from(*size)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::IntType;

    fn int_expr(value: u128) -> Expression {
        Expression::Int {
            value,
            span: Span::new(0, 3),
        }
    }

    #[test]
    fn literal_against_target_bounds() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut eval = ComptimeEvaluator::new();

        let ctx = EvalContext::with_target(&Type::Int(IntType::I8));
        assert_eq!(
            eval.evaluate(&int_expr(127), &ctx, &mut store, &mut diags),
            Some(EvalValue::Int(127))
        );
        assert_eq!(
            eval.evaluate(&int_expr(128), &ctx, &mut store, &mut diags),
            None
        );
        assert_eq!(
            diags.iter().next().unwrap().code,
            DiagnosticCode::ArithmeticOverflow
        );

        // Without a target, 64-bit signed bounds apply.
        let mut diags = Diagnostics::new(50);
        assert_eq!(
            eval.evaluate(&int_expr(128), &EvalContext::new(), &mut store, &mut diags),
            Some(EvalValue::Int(128))
        );
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn negated_literal_reaches_the_signed_minimum() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut eval = ComptimeEvaluator::new();
        let ctx = EvalContext::with_target(&Type::Int(IntType::I8));

        let minus_128 = Expression::Prefix {
            op: drift_ast::PrefixOp::Minus,
            operand: Box::new(int_expr(128)),
            span: Span::new(0, 4),
        };
        assert_eq!(
            eval.evaluate(&minus_128, &ctx, &mut store, &mut diags),
            Some(EvalValue::Int(-128))
        );

        let minus_129 = Expression::Prefix {
            op: drift_ast::PrefixOp::Minus,
            operand: Box::new(int_expr(129)),
            span: Span::new(0, 4),
        };
        assert_eq!(eval.evaluate(&minus_129, &ctx, &mut store, &mut diags), None);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn int_only_context_rejects_float_results() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut eval = ComptimeEvaluator::new();

        let float = Expression::Float {
            value: 2.5,
            span: Span::new(0, 3),
        };
        assert_eq!(
            eval.evaluate(&float, &EvalContext::int_only(), &mut store, &mut diags),
            None
        );
        assert_eq!(diags.error_count(), 0);
        assert_eq!(
            eval.evaluate(&float, &EvalContext::new(), &mut store, &mut diags),
            Some(EvalValue::Float(2.5))
        );
    }

    #[test]
    fn char_literals_enforce_the_unicode_ceiling() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut eval = ComptimeEvaluator::new();

        let ok = Expression::Char {
            value: 0x1F600,
            span: Span::new(0, 4),
        };
        assert_eq!(
            eval.evaluate(&ok, &EvalContext::new(), &mut store, &mut diags),
            Some(EvalValue::Int(0x1F600))
        );

        let too_big = Expression::Char {
            value: 0x20_0000,
            span: Span::new(0, 4),
        };
        assert_eq!(
            eval.evaluate(&too_big, &EvalContext::new(), &mut store, &mut diags),
            None
        );
        assert_eq!(
            diags.iter().next().unwrap().code,
            DiagnosticCode::CharOutOfRange
        );
    }

    #[test]
    fn immutable_constants_fold_through_identifiers() {
        use crate::symbols::{Symbol, VariableMeta};

        let mut store = ScopeStore::new();
        let global = store.global();
        store.add_symbol(
            Symbol::new("limit", SymbolKind::Variable, global, "main")
                .with_type(Type::Int(IntType::I64))
                .with_meta(SymbolMeta::Variable(VariableMeta {
                    init: Some(int_expr(40)),
                })),
        );
        let mut diags = Diagnostics::new(50);
        let mut eval = ComptimeEvaluator::new();

        let expr = Expression::Binary {
            op: BinaryOp::Add,
            lhs: Box::new(Expression::Identifier {
                name: "limit".to_string(),
                span: Span::new(0, 5),
            }),
            rhs: Box::new(int_expr(2)),
            span: Span::new(0, 9),
        };
        assert_eq!(
            eval.evaluate(&expr, &EvalContext::new(), &mut store, &mut diags),
            Some(EvalValue::Int(42))
        );
    }

    #[test]
    fn logical_operators_short_circuit() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(50);
        let mut eval = ComptimeEvaluator::new();

        // The right side would divide by zero if evaluated.
        let poisoned = Expression::Binary {
            op: BinaryOp::And,
            lhs: Box::new(Expression::Bool {
                value: false,
                span: Span::new(0, 5),
            }),
            rhs: Box::new(Expression::Binary {
                op: BinaryOp::Div,
                lhs: Box::new(int_expr(1)),
                rhs: Box::new(Expression::Int {
                    value: 0,
                    span: Span::new(10, 11),
                }),
                span: Span::new(8, 11),
            }),
            span: Span::new(0, 11),
        };
        assert_eq!(
            eval.evaluate(&poisoned, &EvalContext::new(), &mut store, &mut diags),
            Some(EvalValue::Bool(false))
        );
        assert_eq!(diags.error_count(), 0);
    }
}
