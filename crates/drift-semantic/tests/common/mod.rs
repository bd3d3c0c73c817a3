//! Shared AST builders for the integration tests.
//!
//! The analyzer consumes a parsed tree, so tests assemble programs node
//! by node. Every builder allocates a fresh span: the duplicate filter
//! keys on code and span, and inference memoizes per span, so nodes
//! that share a location would alias each other.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use drift_ast::{
    AssignOp, BinaryOp, Block, DefStatement, EnumVariantDecl, ErrorSpec, Expression, FieldInit,
    ForLoop, FuncStatement, IfExpr, LetStatement, MatchArm, MatchExpr, Module, Mutability,
    Parameter, Pattern, PrefixOp, Program, Statement, StructFieldDecl, StructMember, TypeExpr,
    UseStatement, Visibility, WhileLoop,
};
use drift_core::{DiagnosticCode, Span};
use drift_semantic::{AnalysisResult, analyze};

static NEXT_OFFSET: AtomicUsize = AtomicUsize::new(1);

/// A fresh one-byte span. Tests never check offsets; nodes just need
/// distinct locations.
pub fn sp() -> Span {
    let start = NEXT_OFFSET.fetch_add(2, Ordering::Relaxed);
    Span::new(start, start + 1)
}

pub fn int(value: u128) -> Expression {
    Expression::Int { value, span: sp() }
}

pub fn float(value: f64) -> Expression {
    Expression::Float { value, span: sp() }
}

pub fn boolean(value: bool) -> Expression {
    Expression::Bool { value, span: sp() }
}

pub fn string(value: &str) -> Expression {
    Expression::Str {
        value: value.into(),
        span: sp(),
    }
}

pub fn null() -> Expression {
    Expression::Null { span: sp() }
}

pub fn ident(name: &str) -> Expression {
    Expression::Identifier {
        name: name.into(),
        span: sp(),
    }
}

pub fn binary(op: BinaryOp, lhs: Expression, rhs: Expression) -> Expression {
    Expression::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
        span: sp(),
    }
}

pub fn prefix(op: PrefixOp, operand: Expression) -> Expression {
    Expression::Prefix {
        op,
        operand: Box::new(operand),
        span: sp(),
    }
}

pub fn neg(operand: Expression) -> Expression {
    prefix(PrefixOp::Minus, operand)
}

pub fn call(callee: Expression, args: Vec<Expression>) -> Expression {
    Expression::Call {
        callee: Box::new(callee),
        args,
        span: sp(),
    }
}

pub fn member(object: Expression, name: &str) -> Expression {
    Expression::Member {
        object: Box::new(object),
        member: name.into(),
        member_span: sp(),
        span: sp(),
    }
}

pub fn cast(operand: Expression, ty: TypeExpr) -> Expression {
    Expression::As {
        operand: Box::new(operand),
        ty,
        span: sp(),
    }
}

pub fn assign(target: Expression, value: Expression) -> Expression {
    Expression::Assign {
        op: AssignOp::Assign,
        target: Box::new(target),
        value: Box::new(value),
        span: sp(),
    }
}

pub fn orelse(value: Expression, fallback: Expression) -> Expression {
    Expression::Orelse {
        value: Box::new(value),
        fallback: Box::new(fallback),
        span: sp(),
    }
}

pub fn range(start: Expression, end: Expression, inclusive: bool) -> Expression {
    Expression::Range {
        start: Some(Box::new(start)),
        end: Some(Box::new(end)),
        inclusive,
        span: sp(),
    }
}

pub fn sizeof(ty: TypeExpr) -> Expression {
    Expression::Sizeof { ty, span: sp() }
}

pub fn array_lit(elements: Vec<Expression>) -> Expression {
    Expression::ArrayLit {
        elements,
        span: sp(),
    }
}

pub fn struct_lit(type_name: Option<&str>, fields: Vec<(&str, Expression)>) -> Expression {
    Expression::StructLit {
        type_name: type_name.map(Into::into),
        fields: fields
            .into_iter()
            .map(|(name, value)| FieldInit {
                name: name.into(),
                value,
                span: sp(),
            })
            .collect(),
        span: sp(),
    }
}

pub fn if_expr(
    condition: Expression,
    then: Vec<Statement>,
    els: Option<Vec<Statement>>,
) -> Expression {
    Expression::If(Box::new(IfExpr {
        condition,
        then_block: block(then),
        else_ifs: vec![],
        else_block: els.map(block),
        span: sp(),
    }))
}

pub fn match_expr(subject: Expression, arms: Vec<MatchArm>) -> Expression {
    Expression::Match(Box::new(MatchExpr {
        subject,
        arms,
        span: sp(),
    }))
}

pub fn arm(pattern: Pattern, body: Vec<Statement>) -> MatchArm {
    MatchArm {
        pattern,
        body: block(body),
        span: sp(),
    }
}

pub fn variant_pattern(name: &str, binding: Option<&str>) -> Pattern {
    Pattern::Variant {
        name: name.into(),
        binding: binding.map(Into::into),
        span: sp(),
    }
}

pub fn wildcard_pattern() -> Pattern {
    Pattern::Wildcard { span: sp() }
}

pub fn named_ty(name: &str) -> TypeExpr {
    TypeExpr::Named {
        path: vec![name.into()],
        span: sp(),
    }
}

pub fn optional_ty(inner: TypeExpr) -> TypeExpr {
    TypeExpr::Optional {
        inner: Box::new(inner),
        span: sp(),
    }
}

pub fn array_ty(size: Expression, element: TypeExpr) -> TypeExpr {
    TypeExpr::Array {
        size: Box::new(size),
        element: Box::new(element),
        span: sp(),
    }
}

pub fn block(statements: Vec<Statement>) -> Block {
    Block {
        statements,
        span: sp(),
    }
}

pub fn let_stmt(name: &str, ty: Option<TypeExpr>, init: Option<Expression>) -> Statement {
    Statement::Let(LetStatement {
        name: name.into(),
        visibility: Visibility::Private,
        mutability: Mutability::Immutable,
        ty,
        init,
        span: sp(),
    })
}

pub fn pub_let(name: &str, ty: Option<TypeExpr>, init: Option<Expression>) -> Statement {
    match let_stmt(name, ty, init) {
        Statement::Let(mut decl) => {
            decl.visibility = Visibility::Public;
            Statement::Let(decl)
        }
        other => other,
    }
}

pub fn let_mut(name: &str, ty: Option<TypeExpr>, init: Option<Expression>) -> Statement {
    match let_stmt(name, ty, init) {
        Statement::Let(mut decl) => {
            decl.mutability = Mutability::Mutable;
            Statement::Let(decl)
        }
        other => other,
    }
}

pub fn param(name: &str, ty: &str) -> Parameter {
    Parameter {
        name: name.into(),
        visibility: Visibility::Private,
        mutability: Mutability::Immutable,
        ty: Some(named_ty(ty)),
        default: None,
        span: sp(),
    }
}

pub fn defaulted_param(name: &str, ty: Option<&str>, default: Expression) -> Parameter {
    Parameter {
        name: name.into(),
        visibility: Visibility::Private,
        mutability: Mutability::Immutable,
        ty: ty.map(named_ty),
        default: Some(default),
        span: sp(),
    }
}

pub fn func(
    name: &str,
    params: Vec<Parameter>,
    return_type: Option<TypeExpr>,
    body: Vec<Statement>,
) -> Statement {
    Statement::Func(FuncStatement {
        name: name.into(),
        visibility: Visibility::Private,
        is_static: false,
        is_comptime: false,
        params,
        return_type,
        error_set: None,
        body: block(body),
        span: sp(),
    })
}

pub fn pub_func(
    name: &str,
    params: Vec<Parameter>,
    return_type: Option<TypeExpr>,
    body: Vec<Statement>,
) -> Statement {
    match func(name, params, return_type, body) {
        Statement::Func(mut decl) => {
            decl.visibility = Visibility::Public;
            Statement::Func(decl)
        }
        other => other,
    }
}

pub fn comptime_func(
    name: &str,
    params: Vec<Parameter>,
    return_type: Option<TypeExpr>,
    body: Vec<Statement>,
) -> Statement {
    match func(name, params, return_type, body) {
        Statement::Func(mut decl) => {
            decl.is_comptime = true;
            Statement::Func(decl)
        }
        other => other,
    }
}

/// A function with an inline error set, e.g. `func f() i64 !{NotFound}`.
pub fn error_func(
    name: &str,
    params: Vec<Parameter>,
    return_type: Option<TypeExpr>,
    members: &[&str],
    body: Vec<Statement>,
) -> Statement {
    match func(name, params, return_type, body) {
        Statement::Func(mut decl) => {
            decl.error_set = Some(ErrorSpec::Inline {
                members: members.iter().map(|&m| m.into()).collect(),
                span: sp(),
            });
            Statement::Func(decl)
        }
        other => other,
    }
}

pub fn def(name: &str, value: TypeExpr) -> Statement {
    Statement::Def(DefStatement {
        name: name.into(),
        visibility: Visibility::Private,
        value,
        span: sp(),
    })
}

pub fn enum_ty(backing: Option<&str>, variants: Vec<EnumVariantDecl>) -> TypeExpr {
    TypeExpr::Enum {
        backing: backing.map(|name| Box::new(named_ty(name))),
        variants,
        span: sp(),
    }
}

pub fn variant(name: &str, payload: Option<TypeExpr>) -> EnumVariantDecl {
    EnumVariantDecl {
        name: name.into(),
        payload,
        discriminant: None,
        span: sp(),
    }
}

pub fn struct_ty(fields: Vec<(&str, TypeExpr)>) -> TypeExpr {
    TypeExpr::Struct {
        members: fields
            .into_iter()
            .map(|(name, ty)| {
                StructMember::Field(StructFieldDecl {
                    name: name.into(),
                    visibility: Visibility::Private,
                    ty,
                    default: None,
                    span: sp(),
                })
            })
            .collect(),
        span: sp(),
    }
}

pub fn use_path(path: &[&str]) -> Statement {
    let alias = path.last().map(|s| (*s).to_string()).unwrap_or_default();
    Statement::Use(UseStatement {
        alias,
        path: path.iter().map(|s| (*s).to_string()).collect(),
        wildcard: false,
        visibility: Visibility::Private,
        span: sp(),
    })
}

pub fn expr_stmt(expression: Expression) -> Statement {
    let span = expression.span();
    Statement::Expr { expression, span }
}

pub fn ret(value: Option<Expression>) -> Statement {
    Statement::Return { value, span: sp() }
}

pub fn throw(value: Expression) -> Statement {
    Statement::Throw { value, span: sp() }
}

pub fn while_loop(condition: Expression, body: Vec<Statement>) -> Statement {
    Statement::While(Box::new(WhileLoop {
        condition,
        body: block(body),
        span: sp(),
    }))
}

pub fn for_loop(binding: &str, iterable: Expression, body: Vec<Statement>) -> Statement {
    Statement::For(Box::new(ForLoop {
        binding: binding.into(),
        binding_span: sp(),
        iterable,
        body: block(body),
        span: sp(),
    }))
}

pub fn brk() -> Statement {
    Statement::Break { span: sp() }
}

pub fn module(name: &str, statements: Vec<Statement>) -> Module {
    Module::new(name, statements)
}

pub fn program(modules: Vec<Module>) -> Program {
    let mut program = Program::new();
    for module in modules {
        program.add_module(module);
    }
    program
}

/// Runs the default pipeline over a single module named `test`.
pub fn analyze_statements(statements: Vec<Statement>) -> AnalysisResult {
    analyze(&program(vec![module("test", statements)]))
}

pub fn count(result: &AnalysisResult, code: DiagnosticCode) -> usize {
    result
        .diagnostics
        .iter()
        .filter(|d| d.code == code)
        .count()
}

pub fn has(result: &AnalysisResult, code: DiagnosticCode) -> bool {
    count(result, code) > 0
}

/// The message of the first diagnostic with `code`, for message-shape
/// assertions.
pub fn message(result: &AnalysisResult, code: DiagnosticCode) -> String {
    result
        .diagnostics
        .iter()
        .find(|d| d.code == code)
        .map(|d| d.message.clone())
        .unwrap_or_default()
}
