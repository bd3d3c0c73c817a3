//! Constant folding at typed boundaries.
//!
//! Inference decides whether an expression's *type* fits a position;
//! this pass decides whether its *value* does. A comptime-int literal
//! is compatible with every integer type, so `let x: u8 = 300` passes
//! typing and is caught here, where the initializer folds against the
//! binding's bounds.

use drift_ast::Expression;

use crate::eval::{EvalContext, callee_symbol};
use crate::symbols::{SymbolKind, SymbolMeta};
use crate::types::Type;
use crate::validate::TypeValidator;

impl TypeValidator<'_> {
    /// Folds constant sub-expressions against the type expected at this
    /// position. Control-flow expressions bound the fold: their bodies
    /// validate their own statements, against default bounds.
    pub(crate) fn check_constants(&mut self, expr: &Expression, target: Option<&Type>) {
        match expr {
            // The evaluator recurses through the constant grammar
            // itself; one run per root.
            Expression::Int { .. }
            | Expression::Float { .. }
            | Expression::Bool { .. }
            | Expression::Char { .. }
            | Expression::Null { .. }
            | Expression::Identifier { .. }
            | Expression::Binary { .. }
            | Expression::Prefix { .. }
            | Expression::As { .. }
            | Expression::Sizeof { .. } => self.fold(expr, target),

            Expression::Str { .. } => {}

            Expression::Call { callee, args, .. } => {
                // Variant constructors carry their payload type as the
                // bound on the argument.
                if let Some(payload) = self.variant_payload(callee) {
                    if let [arg] = args.as_slice() {
                        self.check_constants(arg, Some(&payload));
                    }
                    return;
                }
                if let Some(fn_id) = callee_symbol(callee, self.store)
                    && matches!(
                        self.store.symbol(fn_id).function_meta(),
                        Ok(meta) if meta.is_comptime
                    )
                {
                    self.fold(expr, target);
                    return;
                }
                for arg in args {
                    self.check_constants(arg, None);
                }
            }

            Expression::Assign {
                target: lvalue,
                value,
                ..
            } => {
                if let Expression::Index { index, .. } = lvalue.as_ref() {
                    self.check_constants(index, None);
                }
                let expected = self.assign_target_type(lvalue);
                self.check_constants(value, expected.as_ref());
            }

            Expression::Try { operand, .. } => self.check_constants(operand, target),
            Expression::Orelse {
                value, fallback, ..
            } => {
                self.check_constants(value, target);
                self.check_constants(fallback, target);
            }
            Expression::Range { start, end, .. } => {
                if let Some(start) = start {
                    self.check_constants(start, None);
                }
                if let Some(end) = end {
                    self.check_constants(end, None);
                }
            }
            Expression::Index { object, index, .. } => {
                self.check_constants(object, None);
                self.check_constants(index, None);
            }
            Expression::Member { object, .. } => self.check_constants(object, None),

            Expression::StructLit { fields, .. } => {
                let scope = self
                    .infer
                    .infer(expr, self.store, self.diags)
                    .or_else(|| target.map(|ty| ty.unwrap_optional().clone()))
                    .and_then(|ty| match ty {
                        Type::Named(named) => Some(named.scope),
                        _ => None,
                    });
                for field in fields {
                    let field_ty = scope
                        .and_then(|scope| self.store.lookup_in(scope, &field.name))
                        .and_then(|id| self.store.symbol(id).ty.clone());
                    self.check_constants(&field.value, field_ty.as_ref());
                }
            }
            Expression::ArrayLit { elements, .. } => {
                let element = target
                    .map(Type::unwrap_optional)
                    .and_then(|ty| match ty {
                        Type::Array { element, .. } => Some((**element).clone()),
                        _ => None,
                    });
                for value in elements {
                    self.check_constants(value, element.as_ref());
                }
            }

            Expression::If(_)
            | Expression::Match(_)
            | Expression::Block(_)
            | Expression::Catch { .. } => {}
        }
    }

    fn fold(&mut self, expr: &Expression, target: Option<&Type>) {
        let ctx = match target {
            Some(ty) => EvalContext::with_target(ty),
            None => EvalContext::new(),
        };
        self.eval.evaluate(expr, &ctx, self.store, self.diags);
    }

    /// The declared type of an assignment target. Identifier targets go
    /// through a direct lookup; inference would mark them as used.
    fn assign_target_type(&mut self, lvalue: &Expression) -> Option<Type> {
        match lvalue {
            Expression::Identifier { name, .. } => {
                let id = self.store.lookup_symbol(name)?;
                self.store.symbol(id).ty.clone()
            }
            _ => self.infer.infer(lvalue, self.store, self.diags),
        }
    }

    /// The payload type of `Type.Variant` callees, followed through
    /// import aliases.
    fn variant_payload(&self, callee: &Expression) -> Option<Type> {
        let Expression::Member { object, member, .. } = callee else {
            return None;
        };
        let Expression::Identifier { name, .. } = object.as_ref() else {
            return None;
        };
        let mut id = self.store.lookup_symbol(name)?;
        let mut hops = 0;
        while self.store.symbol(id).kind == SymbolKind::Use {
            let SymbolMeta::Use(meta) = &self.store.symbol(id).meta else {
                return None;
            };
            id = meta.target?;
            hops += 1;
            if hops > 8 {
                return None;
            }
        }
        if self.store.symbol(id).kind != SymbolKind::Definition {
            return None;
        }
        let scope = self.store.symbol(id).definition_scope()?;
        let variant_id = self.store.lookup_in(scope, member)?;
        match &self.store.symbol(variant_id).meta {
            SymbolMeta::EnumVariant(meta) => meta.payload.clone(),
            _ => None,
        }
    }
}
