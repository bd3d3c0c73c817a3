//! Control-flow nodes: conditionals, matches, loops.

use crate::ast::Block;
use crate::expression::Expression;
use drift_core::Span;

/// If expression: `if cond { ... } else if cond { ... } else { ... }`
///
/// When used for a value, every path must produce one; the analyzer
/// enforces branch-type agreement and the presence of an `else`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Expression,
    pub then_block: Block,
    pub else_ifs: Vec<ElseIf>,
    pub else_block: Option<Block>,
    pub span: Span,
}

/// One `else if` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct ElseIf {
    pub condition: Expression,
    pub block: Block,
    pub span: Span,
}

/// Match expression: `match subject { pattern => body, ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    pub subject: Expression,
    pub arms: Vec<MatchArm>,
    pub span: Span,
}

/// One arm of a match expression.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Block,
    pub span: Span,
}

/// Patterns accepted in match arms.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    Int {
        value: u128,
        negative: bool,
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

    /// Enum variant, optionally binding the payload: `.Ok(v)`
    Variant {
        name: String,
        binding: Option<String>,
        span: Span,
    },

    /// Catch-all: `_`
    Wildcard {
        span: Span,
    },
}

impl Pattern {
    #[must_use]
    pub fn span(&self) -> Span {
        match self {
            Self::Int { span, .. }
            | Self::Bool { span, .. }
            | Self::Char { span, .. }
            | Self::Str { span, .. }
            | Self::Variant { span, .. }
            | Self::Wildcard { span } => *span,
        }
    }

    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard { .. })
    }
}

/// While loop: `while cond { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub condition: Expression,
    pub body: Block,
    pub span: Span,
}

/// For loop: `for binding in iterable { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub binding: String,
    pub binding_span: Span,
    pub iterable: Expression,
    pub body: Block,
    pub span: Span,
}
