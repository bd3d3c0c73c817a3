//! Top-level AST nodes: programs, modules, statements, declarations.

use crate::control_flow::{ForLoop, WhileLoop};
use crate::expression::Expression;
use crate::types::TypeExpr;
use drift_core::Span;
use std::collections::BTreeMap;

/// A complete Drift program: every module the driver handed to the
/// analyzer, keyed by module name.
///
/// `BTreeMap` keeps module iteration deterministic, which in turn keeps
/// diagnostic emission order stable across runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub modules: BTreeMap<String, Module>,
}

impl Program {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, module: Module) {
        self.modules.insert(module.name.clone(), module);
    }

    #[must_use]
    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }
}

/// One named module with its ordered statement list.
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    pub name: String,
    /// Source path as reported by the parser, if it came from a file.
    pub path: Option<String>,
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Module {
    #[must_use]
    pub fn new(name: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            name: name.into(),
            path: None,
            statements,
            span: Span::SYNTHETIC,
        }
    }
}

/// Declared visibility of a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Private,
    Public,
    Static,
}

/// Declared mutability of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mutability {
    #[default]
    Immutable,
    Mutable,
}

/// Statements in Drift.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// Type definition: `def Name = struct { ... }` / `enum { ... }` /
    /// `error { ... }` / type alias.
    Def(DefStatement),

    /// Variable declaration: `[pub] let [mut] name [: type] [= expr]`
    Let(LetStatement),

    /// Function declaration: `[pub] [comptime] func name(params) [ret] [!errs] { ... }`
    Func(FuncStatement),

    /// Import: `use a.b.c` / `use * as m from a.b` / `use x`
    Use(UseStatement),

    /// Return statement: `return [expr]`
    Return {
        value: Option<Expression>,
        span: Span,
    },

    /// Throw statement: `throw expr`
    Throw { value: Expression, span: Span },

    /// While loop: `while cond { ... }`
    While(Box<WhileLoop>),

    /// For loop: `for x in iterable { ... }`
    For(Box<ForLoop>),

    /// Loop exit: `break`
    Break { span: Span },

    /// Loop restart: `continue`
    Continue { span: Span },

    /// Bare block: `{ ... }`
    Block(Block),

    /// Expression statement (covers `if`/`match` in statement position).
    Expr { expression: Expression, span: Span },
}

/// Statement discriminant used for dispatch tables and phase ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    Def,
    Let,
    Func,
    Use,
    Return,
    Throw,
    While,
    For,
    Break,
    Continue,
    Block,
    Expr,
}

impl Statement {
    /// Returns the span of this statement.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Def(def) => def.span,
            Self::Let(decl) => decl.span,
            Self::Func(func) => func.span,
            Self::Use(import) => import.span,
            Self::Return { span, .. } => *span,
            Self::Throw { span, .. } => *span,
            Self::While(stmt) => stmt.span,
            Self::For(stmt) => stmt.span,
            Self::Break { span } | Self::Continue { span } => *span,
            Self::Block(block) => block.span,
            Self::Expr { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn kind(&self) -> StatementKind {
        match self {
            Self::Def(_) => StatementKind::Def,
            Self::Let(_) => StatementKind::Let,
            Self::Func(_) => StatementKind::Func,
            Self::Use(_) => StatementKind::Use,
            Self::Return { .. } => StatementKind::Return,
            Self::Throw { .. } => StatementKind::Throw,
            Self::While(_) => StatementKind::While,
            Self::For(_) => StatementKind::For,
            Self::Break { .. } => StatementKind::Break,
            Self::Continue { .. } => StatementKind::Continue,
            Self::Block(_) => StatementKind::Block,
            Self::Expr { .. } => StatementKind::Expr,
        }
    }

    /// True for local declarations that phase 1 hoists ahead of imports.
    #[must_use]
    pub fn is_local_declaration(&self) -> bool {
        matches!(self, Self::Def(_) | Self::Let(_) | Self::Func(_))
    }
}

/// Type definition statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DefStatement {
    pub name: String,
    pub visibility: Visibility,
    pub value: TypeExpr,
    pub span: Span,
}

/// Variable declaration statement.
#[derive(Debug, Clone, PartialEq)]
pub struct LetStatement {
    pub name: String,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub ty: Option<TypeExpr>,
    pub init: Option<Expression>,
    pub span: Span,
}

/// Function declaration statement.
///
/// Inside a `struct` type body the same node doubles as a method
/// declaration; `is_static` then selects whether a synthetic `self`
/// parameter is injected.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncStatement {
    pub name: String,
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_comptime: bool,
    pub params: Vec<Parameter>,
    pub return_type: Option<TypeExpr>,
    pub error_set: Option<ErrorSpec>,
    pub body: Block,
    pub span: Span,
}

/// A function's declared error set: named (`!ParseError`) or inline
/// (`!{NotFound, Denied}`). Inline sets bind the synthetic `selferr`
/// definition inside the function.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorSpec {
    Named { name: String, span: Span },
    Inline { members: Vec<String>, span: Span },
}

impl ErrorSpec {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Named { span, .. } | Self::Inline { span, .. } => *span,
        }
    }
}

/// Function parameter. Default values may reference earlier parameters
/// only; the analyzer rejects forward references.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub ty: Option<TypeExpr>,
    pub default: Option<Expression>,
    pub span: Span,
}

/// Import statement.
///
/// - `use a.b.c` — path import: binds `c`, `path = ["a", "b", "c"]`
/// - `use * as m from a.b` — wildcard: binds `m`, `wildcard = true`
/// - `use x` — local re-export: empty path, same-module alias
#[derive(Debug, Clone, PartialEq)]
pub struct UseStatement {
    pub alias: String,
    pub path: Vec<String>,
    pub wildcard: bool,
    pub visibility: Visibility,
    pub span: Span,
}

impl UseStatement {
    #[must_use]
    pub fn is_local_reexport(&self) -> bool {
        self.path.is_empty()
    }
}

/// A block of statements.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

impl Block {
    #[must_use]
    pub fn new(statements: Vec<Statement>, span: Span) -> Self {
        Self { statements, span }
    }
}
