//! Abstract syntax tree for Drift programs.
//!
//! The external parser produces these nodes; the semantic analyzer consumes
//! them. Every node category (statement, expression, type) is a sum type
//! with a `kind()` discriminant and a `span()` accessor, so analysis code
//! can dispatch exhaustively and point diagnostics at source locations.

pub mod ast;
pub mod control_flow;
pub mod expression;
pub mod types;

pub use ast::{
    Block, DefStatement, ErrorSpec, FuncStatement, LetStatement, Module, Mutability, Parameter,
    Program, Statement, StatementKind, UseStatement, Visibility,
};
pub use control_flow::{ElseIf, ForLoop, IfExpr, MatchArm, MatchExpr, Pattern, WhileLoop};
pub use expression::{AssignOp, BinaryOp, ExprKind, Expression, FieldInit, PrefixOp};
pub use types::{EnumVariantDecl, StructFieldDecl, StructMember, TypeExpr, TypeExprKind};
