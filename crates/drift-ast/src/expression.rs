//! Expression nodes and operators.

use crate::ast::Block;
use crate::control_flow::{IfExpr, MatchExpr};
use crate::types::TypeExpr;
use drift_core::Span;

/// Expressions in Drift.
///
/// Integer literals carry their unsigned magnitude; a leading minus is a
/// `Prefix` node, so `-128` arrives as `Prefix(Minus, Int(128))`. Character
/// literals carry the raw code point the parser decoded, which may exceed
/// the valid Unicode range for escape forms — the analyzer enforces the
/// 21-bit ceiling.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Int {
        value: u128,
        span: Span,
    },

    Float {
        value: f64,
        span: Span,
    },

    Bool {
        value: bool,
        span: Span,
    },

    Char {
        value: u32,
        span: Span,
    },

    Str {
        value: String,
        span: Span,
    },

    Null {
        span: Span,
    },

    Identifier {
        name: String,
        span: Span,
    },

    /// Binary operation: `lhs op rhs`
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
        span: Span,
    },

    /// Assignment: `target = value` (also compound forms `+=`, `-=`, ...)
    Assign {
        op: AssignOp,
        target: Box<Expression>,
        value: Box<Expression>,
        span: Span,
    },

    /// Prefix operation: `op operand`
    Prefix {
        op: PrefixOp,
        operand: Box<Expression>,
        span: Span,
    },

    /// Call: `callee(args...)`
    Call {
        callee: Box<Expression>,
        args: Vec<Expression>,
        span: Span,
    },

    /// Member access: `object.member`
    Member {
        object: Box<Expression>,
        member: String,
        member_span: Span,
        span: Span,
    },

    /// Index access: `object[index]`
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
        span: Span,
    },

    /// Cast: `operand as Type`
    As {
        operand: Box<Expression>,
        ty: TypeExpr,
        span: Span,
    },

    /// Null-coalescing: `value orelse fallback`
    Orelse {
        value: Box<Expression>,
        fallback: Box<Expression>,
        span: Span,
    },

    /// Range: `start..end` / `start..=end`
    Range {
        start: Option<Box<Expression>>,
        end: Option<Box<Expression>>,
        inclusive: bool,
        span: Span,
    },

    /// Error propagation: `try operand`
    Try {
        operand: Box<Expression>,
        span: Span,
    },

    /// Error handling: `operand catch [|err|] { ... }`
    Catch {
        operand: Box<Expression>,
        binding: Option<String>,
        handler: Block,
        span: Span,
    },

    /// If expression (both branches required when used for a value).
    If(Box<IfExpr>),

    /// Match expression.
    Match(Box<MatchExpr>),

    /// Block expression: `{ statements... }`, valued by its trailing
    /// expression statement.
    Block(Box<Block>),

    /// Struct literal: `Point{ .x = 1 }` or anonymous `.{ .x = 1 }`
    StructLit {
        type_name: Option<String>,
        fields: Vec<FieldInit>,
        span: Span,
    },

    /// Array literal: `[a, b, c]`
    ArrayLit {
        elements: Vec<Expression>,
        span: Span,
    },

    /// Size query: `sizeof(Type)`
    Sizeof {
        ty: TypeExpr,
        span: Span,
    },
}

/// One field initializer in a struct literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInit {
    pub name: String,
    pub value: Expression,
    pub span: Span,
}

/// Expression discriminant; used for dispatch and as part of the
/// inference cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExprKind {
    Int,
    Float,
    Bool,
    Char,
    Str,
    Null,
    Identifier,
    Binary,
    Assign,
    Prefix,
    Call,
    Member,
    Index,
    As,
    Orelse,
    Range,
    Try,
    Catch,
    If,
    Match,
    Block,
    StructLit,
    ArrayLit,
    Sizeof,
}

impl Expression {
    /// Returns the span of this expression.
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Int { span, .. }
            | Self::Float { span, .. }
            | Self::Bool { span, .. }
            | Self::Char { span, .. }
            | Self::Str { span, .. }
            | Self::Null { span }
            | Self::Identifier { span, .. }
            | Self::Binary { span, .. }
            | Self::Assign { span, .. }
            | Self::Prefix { span, .. }
            | Self::Call { span, .. }
            | Self::Member { span, .. }
            | Self::Index { span, .. }
            | Self::As { span, .. }
            | Self::Orelse { span, .. }
            | Self::Range { span, .. }
            | Self::Try { span, .. }
            | Self::Catch { span, .. }
            | Self::StructLit { span, .. }
            | Self::ArrayLit { span, .. }
            | Self::Sizeof { span, .. } => *span,
            Self::If(expr) => expr.span,
            Self::Match(expr) => expr.span,
            Self::Block(block) => block.span,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ExprKind {
        match self {
            Self::Int { .. } => ExprKind::Int,
            Self::Float { .. } => ExprKind::Float,
            Self::Bool { .. } => ExprKind::Bool,
            Self::Char { .. } => ExprKind::Char,
            Self::Str { .. } => ExprKind::Str,
            Self::Null { .. } => ExprKind::Null,
            Self::Identifier { .. } => ExprKind::Identifier,
            Self::Binary { .. } => ExprKind::Binary,
            Self::Assign { .. } => ExprKind::Assign,
            Self::Prefix { .. } => ExprKind::Prefix,
            Self::Call { .. } => ExprKind::Call,
            Self::Member { .. } => ExprKind::Member,
            Self::Index { .. } => ExprKind::Index,
            Self::As { .. } => ExprKind::As,
            Self::Orelse { .. } => ExprKind::Orelse,
            Self::Range { .. } => ExprKind::Range,
            Self::Try { .. } => ExprKind::Try,
            Self::Catch { .. } => ExprKind::Catch,
            Self::If(_) => ExprKind::If,
            Self::Match(_) => ExprKind::Match,
            Self::Block(_) => ExprKind::Block,
            Self::StructLit { .. } => ExprKind::StructLit,
            Self::ArrayLit { .. } => ExprKind::ArrayLit,
            Self::Sizeof { .. } => ExprKind::Sizeof,
        }
    }

    /// True for literal nodes that need no symbol lookups to evaluate.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Int { .. }
                | Self::Float { .. }
                | Self::Bool { .. }
                | Self::Char { .. }
                | Self::Str { .. }
                | Self::Null { .. }
        )
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,

    // Bitwise
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,

    // Comparison
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,

    // Logical
    And,
    Or,
}

impl BinaryOp {
    /// True for operators whose result is always boolean.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Less | Self::LessEq | Self::Greater | Self::GreaterEq
        )
    }

    #[must_use]
    pub const fn is_logical(self) -> bool {
        matches!(self, Self::And | Self::Or)
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Assignment operators (`=` plus compound forms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl AssignOp {
    /// The arithmetic operator a compound assignment applies, if any.
    #[must_use]
    pub const fn binary_op(self) -> Option<BinaryOp> {
        match self {
            Self::Assign => None,
            Self::AddAssign => Some(BinaryOp::Add),
            Self::SubAssign => Some(BinaryOp::Sub),
            Self::MulAssign => Some(BinaryOp::Mul),
            Self::DivAssign => Some(BinaryOp::Div),
        }
    }
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrefixOp {
    /// Arithmetic negation: `-x`
    Minus,
    /// Logical negation: `not x`
    Not,
    /// Bitwise complement: `~x`
    BitNot,
    /// Pointer dereference: `*x`
    Deref,
    /// Address-of: `&x`
    AddrOf,
}

impl PrefixOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Minus => "-",
            Self::Not => "not",
            Self::BitNot => "~",
            Self::Deref => "*",
            Self::AddrOf => "&",
        }
    }
}
