//! Scope tree nodes.
//!
//! Scopes are arena-allocated and referenced by [`ScopeId`]; parent and
//! child links are ids, never pointers, so the tree is pure lookup
//! structure with no ownership cycles. Scopes are created once during
//! collection and never deleted; later phases only mutate symbol flags.

use crate::symbols::SymbolId;
use crate::types::TypeKind;
use drift_core::Span;
use id_arena::Id;
use rustc_hash::FxHashMap;

pub type ScopeId = Id<Scope>;

/// Structural role of a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Module,
    /// Body of a struct, enum or error set; members here live in a
    /// namespace independent from the enclosing lexical chain.
    Type,
    Function,
    Block,
    Loop,
    /// Branch or arm block belonging to an expression form (`if`,
    /// `match`, `catch`).
    Expression,
}

impl ScopeKind {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Global => "global",
            Self::Module => "module",
            Self::Type => "type",
            Self::Function => "function",
            Self::Block => "block",
            Self::Loop => "loop",
            Self::Expression => "expression",
        }
    }
}

/// Extra shape information; only `Type`-kind scopes carry any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeMeta {
    #[default]
    None,
    Type { type_kind: TypeKind },
}

/// One node of the scope tree with its symbol namespace.
#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub name: String,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    /// Name to symbol map; insertion overwrites, shadowing checks happen
    /// before insertion.
    pub symbols: FxHashMap<String, SymbolId>,
    pub meta: ScopeMeta,
    pub span: Span,
}

impl Scope {
    #[must_use]
    pub fn is_type_scope(&self) -> bool {
        self.kind == ScopeKind::Type
    }

    /// The struct/enum/error classification of a `Type`-kind scope.
    #[must_use]
    pub fn type_kind(&self) -> Option<TypeKind> {
        match self.meta {
            ScopeMeta::Type { type_kind } => Some(type_kind),
            ScopeMeta::None => None,
        }
    }
}

/// Deterministic name for an anonymous scope, derived from the span of
/// the construct that owns it. Collection creates scopes under these
/// names; resolution and validation re-enter them the same way.
#[must_use]
pub fn anon_scope_name(prefix: &str, span: Span) -> String {
    format!("{}@{}", prefix, span.start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anon_names_are_position_stable() {
        let span = Span::new(42, 58);
        assert_eq!(anon_scope_name("block", span), "block@42");
        assert_eq!(anon_scope_name("then", span), "then@42");
    }
}
