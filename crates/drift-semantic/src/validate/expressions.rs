//! Expression validation.
//!
//! Inference types every node of an expression tree; this walk adds the
//! two things typing does not cover: statements nested inside branch,
//! arm and handler bodies, and match coverage.

use drift_ast::{Block, Expression, MatchExpr};
use drift_core::{DiagnosticCode, Result};

use crate::context::ExprContext;
use crate::scope::{ScopeKind, anon_scope_name};
use crate::types::Type;
use crate::validate::TypeValidator;

impl TypeValidator<'_> {
    /// Validates one expression tree: infers the root type (filling the
    /// memo cache and reporting type errors), validates nested statement
    /// regions in their scopes, and folds constants against `target`.
    pub(crate) fn check_expression(
        &mut self,
        expr: &Expression,
        target: Option<&Type>,
    ) -> Result<Option<Type>> {
        let ty = self.infer.infer(expr, self.store, self.diags);
        self.walk_expression(expr)?;
        self.check_constants(expr, target);
        Ok(ty)
    }

    fn walk_expression(&mut self, expr: &Expression) -> Result<()> {
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
                self.walk_expression(lhs)?;
                self.walk_expression(rhs)
            }
            Expression::Assign { target, value, .. } => {
                self.walk_expression(target)?;
                self.walk_expression(value)
            }
            Expression::Prefix { operand, .. }
            | Expression::Try { operand, .. }
            | Expression::As { operand, .. } => self.walk_expression(operand),
            Expression::Call { callee, args, .. } => {
                self.walk_expression(callee)?;
                for arg in args {
                    self.walk_expression(arg)?;
                }
                Ok(())
            }
            Expression::Member { object, .. } => self.walk_expression(object),
            Expression::Index { object, index, .. } => {
                self.walk_expression(object)?;
                self.walk_expression(index)
            }
            Expression::Orelse {
                value, fallback, ..
            } => {
                self.walk_expression(value)?;
                self.walk_expression(fallback)
            }
            Expression::Range { start, end, .. } => {
                if let Some(start) = start {
                    self.walk_expression(start)?;
                }
                if let Some(end) = end {
                    self.walk_expression(end)?;
                }
                Ok(())
            }
            Expression::Catch {
                operand, handler, ..
            } => {
                self.walk_expression(operand)?;
                let name = anon_scope_name("catch", handler.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Expression)
                else {
                    return Ok(());
                };
                self.saved(|v| {
                    v.in_scope(scope, |v| {
                        v.ctx.push_expr(ExprContext::Catch, None, handler.span);
                        v.validate_statements(&handler.statements)
                    })
                })
            }
            Expression::If(if_expr) => {
                self.walk_expression(&if_expr.condition)?;
                self.walk_branch("then", &if_expr.then_block)?;
                for else_if in &if_expr.else_ifs {
                    self.walk_expression(&else_if.condition)?;
                    self.walk_branch("then", &else_if.block)?;
                }
                match &if_expr.else_block {
                    Some(block) => self.walk_branch("else", block),
                    None => Ok(()),
                }
            }
            Expression::Match(match_expr) => {
                self.walk_expression(&match_expr.subject)?;
                for arm in &match_expr.arms {
                    let name = anon_scope_name("arm", arm.span);
                    let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Expression)
                    else {
                        continue;
                    };
                    self.saved(|v| {
                        v.in_scope(scope, |v| {
                            v.ctx.push_expr(ExprContext::Match, None, arm.span);
                            v.validate_statements(&arm.body.statements)
                        })
                    })?;
                }
                self.check_exhaustiveness(match_expr);
                Ok(())
            }
            Expression::Block(block) => {
                let name = anon_scope_name("block", block.span);
                let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Block) else {
                    return Ok(());
                };
                self.in_scope(scope, |v| v.validate_statements(&block.statements))
            }
            Expression::StructLit { fields, .. } => {
                for field in fields {
                    self.walk_expression(&field.value)?;
                }
                Ok(())
            }
            Expression::ArrayLit { elements, .. } => {
                for element in elements {
                    self.walk_expression(element)?;
                }
                Ok(())
            }
        }
    }

    fn walk_branch(&mut self, prefix: &str, block: &Block) -> Result<()> {
        let name = anon_scope_name(prefix, block.span);
        let Some(scope) = self.store.find_child_scope(&name, ScopeKind::Expression) else {
            return Ok(());
        };
        self.saved(|v| {
            v.in_scope(scope, |v| {
                v.ctx.push_expr(ExprContext::Conditional, None, block.span);
                v.validate_statements(&block.statements)
            })
        })
    }

    fn check_exhaustiveness(&mut self, match_expr: &MatchExpr) {
        let Some(subject_ty) = self.infer.infer(&match_expr.subject, self.store, self.diags)
        else {
            return;
        };
        let subject = subject_ty.unwrap_optional();
        if !self.oracle.covers(subject, &match_expr.arms, self.store) {
            self.diags.error(
                DiagnosticCode::NonExhaustiveMatch,
                format!("Match on '{subject}' does not cover every case"),
                match_expr.span,
            );
        }
    }
}
