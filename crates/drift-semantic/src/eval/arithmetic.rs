//! Checked arithmetic for constant evaluation.
//!
//! Integers are carried as `i128`, wide enough that no operation on
//! values inside 64-bit bounds can wrap; overflow is detected by
//! bounds-checking each result against the evaluation context.

use drift_ast::{BinaryOp, PrefixOp};
use drift_core::{DiagnosticCode, Diagnostics, Span};

use crate::eval::{EvalContext, EvalValue};
use crate::types::Type;

/// Largest permitted `**` exponent.
pub(crate) const MAX_EXPONENT: i128 = 10_000;

/// Largest permitted shift amount.
pub(crate) const MAX_SHIFT: i128 = 63;

/// Highest valid Unicode code point.
pub(crate) const MAX_CHAR_CODE: u32 = 0x1F_FFFF;

/// Checks `value` against the context's integer bounds and reports
/// `ArithmeticOverflow` when it does not fit.
pub(super) fn bounds_check(
    value: i128,
    ctx: &EvalContext,
    span: Span,
    diags: &mut Diagnostics,
) -> Option<i128> {
    if value < ctx.min_int || value > ctx.max_int {
        report_overflow(value.to_string(), ctx, span, diags);
        return None;
    }
    Some(value)
}

pub(super) fn report_overflow(
    display: String,
    ctx: &EvalContext,
    span: Span,
    diags: &mut Diagnostics,
) {
    let message = match ctx.target.as_ref().map(Type::unwrap_optional) {
        Some(Type::Int(int)) => format!(
            "Value {display} does not fit in '{}' ({} to {})",
            Type::Int(*int),
            int.min(),
            int.max()
        ),
        _ => format!("Value {display} exceeds the signed 64-bit integer range"),
    };
    diags.error(DiagnosticCode::ArithmeticOverflow, message, span);
}

fn division_by_zero(span: Span, diags: &mut Diagnostics) {
    diags.error(
        DiagnosticCode::DivisionByZero,
        "Division by zero in constant expression",
        span,
    );
}

pub(super) fn eval_binary(
    op: BinaryOp,
    lhs: EvalValue,
    rhs: EvalValue,
    ctx: &EvalContext,
    span: Span,
    diags: &mut Diagnostics,
) -> Option<EvalValue> {
    match (lhs, rhs) {
        (EvalValue::Int(left), EvalValue::Int(right)) => {
            eval_int_op(op, left, right, ctx, span, diags)
        }
        // One float operand promotes the whole operation to floats.
        (EvalValue::Float(left), EvalValue::Float(right)) => {
            eval_float_op(op, left, right, span, diags)
        }
        (EvalValue::Int(left), EvalValue::Float(right)) => {
            eval_float_op(op, left as f64, right, span, diags)
        }
        (EvalValue::Float(left), EvalValue::Int(right)) => {
            eval_float_op(op, left, right as f64, span, diags)
        }
        (EvalValue::Bool(left), EvalValue::Bool(right)) => match op {
            BinaryOp::Eq => Some(EvalValue::Bool(left == right)),
            BinaryOp::NotEq => Some(EvalValue::Bool(left != right)),
            _ => None,
        },
        (EvalValue::Null, EvalValue::Null) => match op {
            BinaryOp::Eq => Some(EvalValue::Bool(true)),
            BinaryOp::NotEq => Some(EvalValue::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn eval_int_op(
    op: BinaryOp,
    left: i128,
    right: i128,
    ctx: &EvalContext,
    span: Span,
    diags: &mut Diagnostics,
) -> Option<EvalValue> {
    let value = match op {
        BinaryOp::Add => left.checked_add(right),
        BinaryOp::Sub => left.checked_sub(right),
        BinaryOp::Mul => left.checked_mul(right),
        BinaryOp::Div => {
            if right == 0 {
                division_by_zero(span, diags);
                return None;
            }
            left.checked_div(right)
        }
        BinaryOp::Mod => {
            if right == 0 {
                division_by_zero(span, diags);
                return None;
            }
            left.checked_rem(right)
        }
        BinaryOp::Pow => {
            if !(0..=MAX_EXPONENT).contains(&right) {
                diags.error(
                    DiagnosticCode::ExponentOutOfRange,
                    format!("Exponent must be between 0 and {MAX_EXPONENT}, found {right}"),
                    span,
                );
                return None;
            }
            left.checked_pow(right as u32)
        }
        BinaryOp::Shl | BinaryOp::Shr => {
            if !(0..=MAX_SHIFT).contains(&right) {
                diags.error(
                    DiagnosticCode::ShiftOutOfRange,
                    format!("Shift amount must be between 0 and {MAX_SHIFT}, found {right}"),
                    span,
                );
                return None;
            }
            // Operands fit in 64 bits and the shift tops out at 63, so
            // the 128-bit value cannot lose high bits here.
            Some(if op == BinaryOp::Shl {
                left << right
            } else {
                left >> right
            })
        }
        BinaryOp::BitAnd => Some(left & right),
        BinaryOp::BitOr => Some(left | right),
        BinaryOp::BitXor => Some(left ^ right),
        BinaryOp::Eq => return Some(EvalValue::Bool(left == right)),
        BinaryOp::NotEq => return Some(EvalValue::Bool(left != right)),
        BinaryOp::Less => return Some(EvalValue::Bool(left < right)),
        BinaryOp::LessEq => return Some(EvalValue::Bool(left <= right)),
        BinaryOp::Greater => return Some(EvalValue::Bool(left > right)),
        BinaryOp::GreaterEq => return Some(EvalValue::Bool(left >= right)),
        BinaryOp::And | BinaryOp::Or => return None,
    };
    let Some(value) = value else {
        report_overflow(format!("{left} {} {right}", op.symbol()), ctx, span, diags);
        return None;
    };
    Some(EvalValue::Int(bounds_check(value, ctx, span, diags)?))
}

fn eval_float_op(
    op: BinaryOp,
    left: f64,
    right: f64,
    span: Span,
    diags: &mut Diagnostics,
) -> Option<EvalValue> {
    let value = match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        // Zero divisors are errors, never infinities.
        BinaryOp::Div => {
            if right == 0.0 {
                division_by_zero(span, diags);
                return None;
            }
            left / right
        }
        BinaryOp::Mod => {
            if right == 0.0 {
                division_by_zero(span, diags);
                return None;
            }
            left % right
        }
        BinaryOp::Pow => left.powf(right),
        BinaryOp::Eq => return Some(EvalValue::Bool(left == right)),
        BinaryOp::NotEq => return Some(EvalValue::Bool(left != right)),
        BinaryOp::Less => return Some(EvalValue::Bool(left < right)),
        BinaryOp::LessEq => return Some(EvalValue::Bool(left <= right)),
        BinaryOp::Greater => return Some(EvalValue::Bool(left > right)),
        BinaryOp::GreaterEq => return Some(EvalValue::Bool(left >= right)),
        _ => return None,
    };
    Some(EvalValue::Float(value))
}

pub(super) fn eval_prefix(
    op: PrefixOp,
    value: EvalValue,
    ctx: &EvalContext,
    span: Span,
    diags: &mut Diagnostics,
) -> Option<EvalValue> {
    match (op, value) {
        (PrefixOp::Minus, EvalValue::Int(operand)) => {
            let Some(negated) = operand.checked_neg() else {
                report_overflow(format!("-{operand}"), ctx, span, diags);
                return None;
            };
            // Negating under an unsigned target re-types the value as
            // the signed type of the same width.
            if let Some(Type::Int(int)) = ctx.target.as_ref().map(Type::unwrap_optional)
                && !int.is_signed()
            {
                let signed = int.to_signed();
                if negated < signed.min() || negated > signed.max() {
                    diags.error(
                        DiagnosticCode::ArithmeticOverflow,
                        format!(
                            "Value {negated} does not fit in '{}' ({} to {})",
                            Type::Int(signed),
                            signed.min(),
                            signed.max()
                        ),
                        span,
                    );
                    return None;
                }
                return Some(EvalValue::Int(negated));
            }
            Some(EvalValue::Int(bounds_check(negated, ctx, span, diags)?))
        }
        (PrefixOp::Minus, EvalValue::Float(operand)) => Some(EvalValue::Float(-operand)),
        (PrefixOp::Not, EvalValue::Bool(operand)) => Some(EvalValue::Bool(!operand)),
        (PrefixOp::BitNot, EvalValue::Int(operand)) => {
            Some(EvalValue::Int(bounds_check(!operand, ctx, span, diags)?))
        }
        _ => None,
    }
}

/// Applies an `as` cast to an already-evaluated value.
pub(super) fn apply_cast(
    value: EvalValue,
    target: &Type,
    span: Span,
    diags: &mut Diagnostics,
) -> Option<EvalValue> {
    match target {
        Type::Int(int) => {
            let converted = match value {
                EvalValue::Int(v) => v,
                // Float casts truncate toward zero.
                EvalValue::Float(f) => {
                    let truncated = f.trunc();
                    if !truncated.is_finite()
                        || truncated < int.min() as f64
                        || truncated > int.max() as f64
                    {
                        diags.error(
                            DiagnosticCode::ArithmeticOverflow,
                            format!("Value {f} does not fit in '{target}'"),
                            span,
                        );
                        return None;
                    }
                    truncated as i128
                }
                EvalValue::Bool(b) => i128::from(b),
                EvalValue::Null => return None,
            };
            if converted < int.min() || converted > int.max() {
                diags.error(
                    DiagnosticCode::ArithmeticOverflow,
                    format!(
                        "Value {converted} does not fit in '{target}' ({} to {})",
                        int.min(),
                        int.max()
                    ),
                    span,
                );
                return None;
            }
            Some(EvalValue::Int(converted))
        }
        Type::Float(_) => match value {
            EvalValue::Int(v) => Some(EvalValue::Float(v as f64)),
            EvalValue::Float(f) => Some(EvalValue::Float(f)),
            _ => None,
        },
        Type::Char => match value {
            EvalValue::Int(v) => {
                if !(0..=i128::from(MAX_CHAR_CODE)).contains(&v) {
                    diags.error(
                        DiagnosticCode::CharOutOfRange,
                        format!(
                            "Character code {v} is outside the range 0 to {MAX_CHAR_CODE:#x}"
                        ),
                        span,
                    );
                    return None;
                }
                Some(EvalValue::Int(v))
            }
            _ => None,
        },
        _ => None,
    }
}
