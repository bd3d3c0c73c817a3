//! Type expressions as written in source.
//!
//! These are syntactic; resolution to semantic types happens in the
//! analyzer. Struct, enum and error-set bodies appear here because type
//! declarations (`def`) carry their members inline.

use crate::ast::{FuncStatement, Visibility};
use crate::expression::Expression;
use drift_core::Span;

/// A type as written in source.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Named type reference, possibly qualified: `i32`, `geometry.Point`
    Named {
        path: Vec<String>,
        span: Span,
    },

    /// Optional type: `?T`
    Optional {
        inner: Box<TypeExpr>,
        span: Span,
    },

    /// Raw pointer: `*T`
    Pointer {
        inner: Box<TypeExpr>,
        span: Span,
    },

    /// Fixed-size array: `[N]T`; the size must be comptime-evaluable.
    Array {
        size: Box<Expression>,
        element: Box<TypeExpr>,
        span: Span,
    },

    /// Function type: `fn(A, B) -> R`
    Function {
        params: Vec<TypeExpr>,
        return_type: Option<Box<TypeExpr>>,
        span: Span,
    },

    /// Struct body: `struct { x: i32, fn area(self) f64 { ... } }`
    Struct {
        members: Vec<StructMember>,
        span: Span,
    },

    /// Enum body: `enum { Red, Green(u8), Blue = 4 }`
    Enum {
        backing: Option<Box<TypeExpr>>,
        variants: Vec<EnumVariantDecl>,
        span: Span,
    },

    /// Error set body: `error { NotFound, Timeout }`
    ErrorSet {
        members: Vec<String>,
        span: Span,
    },
}

/// Type expression discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeExprKind {
    Named,
    Optional,
    Pointer,
    Array,
    Function,
    Struct,
    Enum,
    ErrorSet,
}

impl TypeExpr {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Named { span, .. }
            | Self::Optional { span, .. }
            | Self::Pointer { span, .. }
            | Self::Array { span, .. }
            | Self::Function { span, .. }
            | Self::Struct { span, .. }
            | Self::Enum { span, .. }
            | Self::ErrorSet { span, .. } => *span,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TypeExprKind {
        match self {
            Self::Named { .. } => TypeExprKind::Named,
            Self::Optional { .. } => TypeExprKind::Optional,
            Self::Pointer { .. } => TypeExprKind::Pointer,
            Self::Array { .. } => TypeExprKind::Array,
            Self::Function { .. } => TypeExprKind::Function,
            Self::Struct { .. } => TypeExprKind::Struct,
            Self::Enum { .. } => TypeExprKind::Enum,
            Self::ErrorSet { .. } => TypeExprKind::ErrorSet,
        }
    }

    /// True for bodies that introduce a type scope of their own.
    #[must_use]
    pub fn declares_members(&self) -> bool {
        matches!(
            self,
            Self::Struct { .. } | Self::Enum { .. } | Self::ErrorSet { .. }
        )
    }

    /// Unqualified name for single-segment named types.
    #[must_use]
    pub fn simple_name(&self) -> Option<&str> {
        match self {
            Self::Named { path, .. } if path.len() == 1 => Some(&path[0]),
            _ => None,
        }
    }
}

/// A member of a struct body.
#[derive(Debug, Clone, PartialEq)]
pub enum StructMember {
    Field(StructFieldDecl),
    Func(FuncStatement),
}

/// One field in a struct body.
#[derive(Debug, Clone, PartialEq)]
pub struct StructFieldDecl {
    pub name: String,
    pub visibility: Visibility,
    pub ty: TypeExpr,
    pub default: Option<Expression>,
    pub span: Span,
}

/// One variant in an enum body. Payload and explicit discriminant are
/// mutually exclusive in practice but both are carried; the analyzer
/// rejects bad combinations.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariantDecl {
    pub name: String,
    pub payload: Option<TypeExpr>,
    pub discriminant: Option<Expression>,
    pub span: Span,
}
