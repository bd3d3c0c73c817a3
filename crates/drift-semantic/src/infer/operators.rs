//! Operator typing and the numeric promotion lattice.

use drift_ast::{AssignOp, BinaryOp, Expression, PrefixOp};
use drift_core::{DiagnosticCode, Diagnostics, Span};

use crate::infer::TypeInference;
use crate::store::ScopeStore;
use crate::symbols::SymbolKind;
use crate::types::{FloatType, IntType, Type, TypeKind};

impl TypeInference {
    pub(crate) fn infer_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expression,
        rhs: &Expression,
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let lhs_ty = self.infer(lhs, store, diags);
        let rhs_ty = self.infer(rhs, store, diags);
        let (l, r) = (lhs_ty?, rhs_ty?);

        if op.is_logical() {
            if !l.is_bool() || !r.is_bool() {
                diags.error(
                    DiagnosticCode::TypeMismatch,
                    format!(
                        "Logical '{}' requires 'bool' operands, found '{l}' and '{r}'",
                        op.symbol()
                    ),
                    span,
                );
            }
            return Some(Type::Bool);
        }

        if op.is_comparison() {
            if matches!(op, BinaryOp::Eq | BinaryOp::NotEq) {
                if !compatible(&l, &r) && !compatible(&r, &l) {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Cannot compare '{l}' with '{r}'"),
                        span,
                    );
                }
            } else {
                let ordered = (l.is_numeric() && numeric_promote(&l, &r).is_some())
                    || (matches!(l, Type::Char) && matches!(r, Type::Char))
                    || (matches!(l, Type::Str) && matches!(r, Type::Str));
                if !ordered {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Operator '{}' cannot order '{l}' and '{r}'", op.symbol()),
                        span,
                    );
                }
            }
            return Some(Type::Bool);
        }

        match op {
            // Shifting keeps the left operand's type.
            BinaryOp::Shl | BinaryOp::Shr => {
                if !l.is_integer() || !r.is_integer() {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!(
                            "Operator '{}' requires integer operands, found '{l}' and '{r}'",
                            op.symbol()
                        ),
                        span,
                    );
                    return None;
                }
                Some(l)
            }
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                if !l.is_integer() || !r.is_integer() {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!(
                            "Operator '{}' requires integer operands, found '{l}' and '{r}'",
                            op.symbol()
                        ),
                        span,
                    );
                    return None;
                }
                numeric_promote(&l, &r)
            }
            _ => match numeric_promote(&l, &r) {
                Some(ty) => Some(ty),
                None => {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Operator '{}' cannot combine '{l}' and '{r}'", op.symbol()),
                        span,
                    );
                    None
                }
            },
        }
    }

    pub(crate) fn infer_prefix(
        &mut self,
        op: PrefixOp,
        operand: &Expression,
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        let ty = self.infer(operand, store, diags)?;
        match op {
            PrefixOp::Minus => match ty {
                // Negating an unsigned value re-types it signed.
                Type::Int(int) if !int.is_signed() => Some(Type::Int(int.to_signed())),
                ty if ty.is_numeric() => Some(ty),
                other => {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Unary '-' requires a numeric operand, found '{other}'"),
                        span,
                    );
                    None
                }
            },
            PrefixOp::Not => {
                if ty.is_bool() {
                    Some(Type::Bool)
                } else {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Operator 'not' requires a 'bool' operand, found '{ty}'"),
                        span,
                    );
                    None
                }
            }
            PrefixOp::BitNot => {
                if ty.is_integer() {
                    Some(ty)
                } else {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Operator '~' requires an integer operand, found '{ty}'"),
                        span,
                    );
                    None
                }
            }
            PrefixOp::Deref => match ty {
                Type::Pointer(inner) => Some(*inner),
                other => {
                    diags.error(
                        DiagnosticCode::TypeMismatch,
                        format!("Cannot dereference a value of type '{other}'"),
                        span,
                    );
                    None
                }
            },
            PrefixOp::AddrOf => Some(Type::Pointer(Box::new(ty))),
        }
    }

    pub(crate) fn infer_assign(
        &mut self,
        op: AssignOp,
        target: &Expression,
        value: &Expression,
        span: Span,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        check_assign_target(target, store, diags);
        let target_ty = self.infer_assign_target(target, store, diags);
        let value_ty = self.infer(value, store, diags);

        if let (Some(target_ty), Some(value_ty)) = (&target_ty, &value_ty) {
            match op.binary_op() {
                Some(binary) => {
                    if numeric_promote(target_ty, value_ty).is_none() {
                        diags.error(
                            DiagnosticCode::TypeMismatch,
                            format!(
                                "Operator '{}=' cannot combine '{target_ty}' and '{value_ty}'",
                                binary.symbol()
                            ),
                            span,
                        );
                    }
                }
                None => {
                    if !compatible(target_ty, value_ty) {
                        diags.error(
                            DiagnosticCode::TypeMismatch,
                            format!(
                                "Cannot assign a value of type '{value_ty}' to a target of type '{target_ty}'"
                            ),
                            value.span(),
                        );
                    }
                }
            }
        }
        Some(Type::Void)
    }

    /// Types an assignment target. A write is not a use, so identifier
    /// targets skip the used mark that `infer` would set.
    fn infer_assign_target(
        &mut self,
        target: &Expression,
        store: &mut ScopeStore,
        diags: &mut Diagnostics,
    ) -> Option<Type> {
        match target {
            Expression::Identifier { name, .. } => store
                .lookup_symbol(name)
                .and_then(|id| store.symbol(id).ty.clone()),
            _ => self.infer(target, store, diags),
        }
    }
}

/// Mutability checks for compound targets. Identifier targets are
/// checked during resolution, where statement order still separates a
/// deferred first write from a re-assignment.
fn check_assign_target(target: &Expression, store: &ScopeStore, diags: &mut Diagnostics) {
    match target {
        Expression::Prefix {
            op: PrefixOp::Deref,
            operand,
            ..
        } => {
            if let Expression::Identifier { name, span } = operand.as_ref()
                && let Some(id) = store.lookup_symbol(name)
                && !store.symbol(id).is_mutable()
            {
                diags.error(
                    DiagnosticCode::ImmutableAssignment,
                    format!("Cannot assign through immutable pointer '{name}'"),
                    *span,
                );
            }
        }
        Expression::Member { object, .. } | Expression::Index { object, .. } => {
            if let Expression::Identifier { name, span } = object.as_ref()
                && let Some(id) = store.lookup_symbol(name)
            {
                let symbol = store.symbol(id);
                if matches!(symbol.kind, SymbolKind::Variable | SymbolKind::Parameter)
                    && !symbol.is_mutable()
                {
                    diags.error(
                        DiagnosticCode::ImmutableAssignment,
                        format!("Cannot assign into immutable '{name}'"),
                        *span,
                    );
                }
            }
        }
        _ => {}
    }
}

/// Joins two numeric types for an arithmetic result.
///
/// Comptime literals adopt the other side. Two concrete integers widen
/// to the larger width, signed when either side is signed; a same-width
/// unsigned operand pushes the signed result one width up. A float side
/// wins over an integer side, widening to `f64` when the integer is
/// wider than the float.
pub(crate) fn numeric_promote(a: &Type, b: &Type) -> Option<Type> {
    use Type::{ComptimeFloat, ComptimeInt, Float, Int};
    match (a, b) {
        (ComptimeInt, ComptimeInt) => Some(ComptimeInt),
        (ComptimeInt | ComptimeFloat, ComptimeFloat) | (ComptimeFloat, ComptimeInt) => {
            Some(ComptimeFloat)
        }
        (Int(int), ComptimeInt) | (ComptimeInt, Int(int)) => Some(Int(*int)),
        (Float(float), ComptimeInt | ComptimeFloat) | (ComptimeInt | ComptimeFloat, Float(float)) => {
            Some(Float(*float))
        }
        (Int(x), Int(y)) => {
            let signed = x.is_signed() || y.is_signed();
            let mut bits = x.bits().max(y.bits());
            if signed
                && ((x.bits() == bits && !x.is_signed()) || (y.bits() == bits && !y.is_signed()))
            {
                bits = (bits * 2).min(64);
            }
            Some(Int(int_with(bits, signed)))
        }
        (Float(x), Float(y)) => {
            if x.bits().max(y.bits()) == 64 {
                Some(Float(FloatType::F64))
            } else {
                Some(Float(FloatType::F32))
            }
        }
        (Float(float), Int(int)) | (Int(int), Float(float)) => {
            if int.bits() > float.bits() {
                Some(Float(FloatType::F64))
            } else {
                Some(Float(*float))
            }
        }
        _ => None,
    }
}

const fn int_with(bits: u32, signed: bool) -> IntType {
    match (bits, signed) {
        (8, true) => IntType::I8,
        (16, true) => IntType::I16,
        (32, true) => IntType::I32,
        (8, false) => IntType::U8,
        (16, false) => IntType::U16,
        (32, false) => IntType::U32,
        (64, false) => IntType::U64,
        _ => IntType::I64,
    }
}

/// Whether a value of type `found` can bind where `expected` is wanted.
///
/// Comptime literals fit any matching concrete family; concrete
/// integers widen only when the expected range contains the found
/// range, so `u32` fits `i64` but `u64` does not.
pub(crate) fn compatible(expected: &Type, found: &Type) -> bool {
    if expected == found {
        return true;
    }
    match (expected, found) {
        (Type::Int(_), Type::ComptimeInt) => true,
        (Type::Float(_), Type::ComptimeInt | Type::ComptimeFloat) => true,
        (Type::Int(a), Type::Int(b)) => b.min() >= a.min() && b.max() <= a.max(),
        (Type::Float(FloatType::F64), Type::Float(FloatType::F32)) => true,
        (Type::Optional(_), Type::Null) => true,
        (Type::Optional(a), Type::Optional(b)) => compatible(a, b),
        (Type::Optional(inner), found) => compatible(inner, found),
        (Type::Pointer(a), Type::Pointer(b)) => a == b,
        (
            Type::Array {
                element: a,
                size: expected_size,
            },
            Type::Array {
                element: b,
                size: found_size,
            },
        ) => {
            compatible(a, b)
                && match (expected_size, found_size) {
                    (None, _) => true,
                    (Some(x), Some(y)) => x == y,
                    (Some(_), None) => false,
                }
        }
        (Type::Named(a), Type::Named(b)) => a.scope == b.scope,
        (Type::Function(a), Type::Function(b)) => a == b,
        (Type::Range(a), Type::Range(b)) => compatible(a, b),
        _ => false,
    }
}

/// Joins two branch or element types into one, when a join exists.
/// `null` against a non-optional type joins into an optional.
pub(crate) fn unify(a: &Type, b: &Type) -> Option<Type> {
    if a == b {
        return Some(a.clone());
    }
    if a.is_numeric() && b.is_numeric() {
        return numeric_promote(a, b);
    }
    match (a, b) {
        (Type::Optional(_), Type::Null) => Some(a.clone()),
        (Type::Null, Type::Optional(_)) => Some(b.clone()),
        (Type::Null, other) | (other, Type::Null) => {
            Some(Type::Optional(Box::new(other.clone())))
        }
        (Type::Optional(inner), other) | (other, Type::Optional(inner)) => {
            unify(inner, other).map(|ty| Type::Optional(Box::new(ty)))
        }
        _ => {
            if compatible(a, b) {
                Some(a.clone())
            } else if compatible(b, a) {
                Some(b.clone())
            } else {
                None
            }
        }
    }
}

/// Casts the `as` operator accepts.
pub(crate) fn cast_allowed(from: &Type, to: &Type) -> bool {
    if from == to {
        return true;
    }
    if from.is_numeric() && to.is_numeric() {
        return true;
    }
    match (from, to) {
        (Type::Char, to) if to.is_integer() => true,
        (from, Type::Char) if from.is_integer() => true,
        (Type::Bool, to) if to.is_integer() => true,
        (Type::Pointer(_), Type::Pointer(_)) => true,
        (Type::Named(named), to) if named.kind == TypeKind::Enum && to.is_integer() => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comptime_literals_adopt_concrete_types() {
        assert_eq!(
            numeric_promote(&Type::ComptimeInt, &Type::Int(IntType::U8)),
            Some(Type::Int(IntType::U8))
        );
        assert_eq!(
            numeric_promote(&Type::Float(FloatType::F32), &Type::ComptimeInt),
            Some(Type::Float(FloatType::F32))
        );
        assert_eq!(
            numeric_promote(&Type::ComptimeInt, &Type::ComptimeFloat),
            Some(Type::ComptimeFloat)
        );
    }

    #[test]
    fn integer_promotion_widens_and_signs() {
        assert_eq!(
            numeric_promote(&Type::Int(IntType::I32), &Type::Int(IntType::I64)),
            Some(Type::Int(IntType::I64))
        );
        assert_eq!(
            numeric_promote(&Type::Int(IntType::U8), &Type::Int(IntType::I32)),
            Some(Type::Int(IntType::I32))
        );
        // A same-width unsigned operand pushes the result wider.
        assert_eq!(
            numeric_promote(&Type::Int(IntType::I32), &Type::Int(IntType::U32)),
            Some(Type::Int(IntType::I64))
        );
    }

    #[test]
    fn float_width_tracks_the_integer_operand() {
        assert_eq!(
            numeric_promote(&Type::Float(FloatType::F32), &Type::Int(IntType::I64)),
            Some(Type::Float(FloatType::F64))
        );
        assert_eq!(
            numeric_promote(&Type::Float(FloatType::F32), &Type::Int(IntType::I32)),
            Some(Type::Float(FloatType::F32))
        );
    }

    #[test]
    fn widening_compatibility_is_range_based() {
        assert!(compatible(
            &Type::Int(IntType::I64),
            &Type::Int(IntType::U32)
        ));
        assert!(!compatible(
            &Type::Int(IntType::I64),
            &Type::Int(IntType::U64)
        ));
        assert!(!compatible(
            &Type::Int(IntType::U32),
            &Type::Int(IntType::I8)
        ));
        assert!(compatible(&Type::Int(IntType::I32), &Type::ComptimeInt));
    }

    #[test]
    fn optionals_accept_inner_and_null() {
        let opt = Type::Optional(Box::new(Type::Int(IntType::I64)));
        assert!(compatible(&opt, &Type::Null));
        assert!(compatible(&opt, &Type::Int(IntType::I64)));
        assert!(compatible(&opt, &Type::ComptimeInt));
        assert!(!compatible(&Type::Int(IntType::I64), &Type::Null));
    }

    #[test]
    fn unify_wraps_null_alternatives_optional() {
        assert_eq!(
            unify(&Type::Str, &Type::Null),
            Some(Type::Optional(Box::new(Type::Str)))
        );
        assert_eq!(
            unify(&Type::ComptimeInt, &Type::Int(IntType::I32)),
            Some(Type::Int(IntType::I32))
        );
        assert_eq!(unify(&Type::Bool, &Type::Str), None);
    }

    #[test]
    fn cast_matrix_covers_numeric_char_and_enum() {
        assert!(cast_allowed(
            &Type::Int(IntType::I64),
            &Type::Float(FloatType::F32)
        ));
        assert!(cast_allowed(&Type::Char, &Type::Int(IntType::U32)));
        assert!(cast_allowed(&Type::Bool, &Type::Int(IntType::I8)));
        assert!(!cast_allowed(&Type::Str, &Type::Int(IntType::I64)));
        assert!(!cast_allowed(&Type::Int(IntType::I64), &Type::Bool));
    }
}
