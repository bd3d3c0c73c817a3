//! The scope and symbol store shared by every phase.
//!
//! Scopes and symbols live in flat arenas and reference each other by id.
//! The store tracks one "current" scope; traversals move it with
//! [`ScopeStore::with_scope`], which restores the previous scope on every
//! exit path.

use crate::scope::{Scope, ScopeId, ScopeKind, ScopeMeta};
use crate::symbols::{Symbol, SymbolId};
use crate::types::TypeKind;
use drift_core::Span;
use id_arena::Arena;
use rustc_hash::FxHashMap;

#[derive(Debug)]
pub struct ScopeStore {
    scopes: Arena<Scope>,
    symbols: Arena<Symbol>,
    global: ScopeId,
    current: ScopeId,
}

impl ScopeStore {
    #[must_use]
    pub fn new() -> Self {
        let mut scopes = Arena::new();
        let global = Self::alloc_global(&mut scopes);
        Self {
            scopes,
            symbols: Arena::new(),
            global,
            current: global,
        }
    }

    fn alloc_global(scopes: &mut Arena<Scope>) -> ScopeId {
        scopes.alloc_with_id(|id| Scope {
            id,
            kind: ScopeKind::Global,
            name: "global".to_string(),
            parent: None,
            children: Vec::new(),
            symbols: FxHashMap::default(),
            meta: ScopeMeta::None,
            span: Span::SYNTHETIC,
        })
    }

    #[must_use]
    pub fn global(&self) -> ScopeId {
        self.global
    }

    #[must_use]
    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn set_current(&mut self, id: ScopeId) {
        self.current = id;
    }

    /// Creates a scope under `parent` and registers it as a child.
    pub fn create_scope(
        &mut self,
        kind: ScopeKind,
        name: impl Into<String>,
        parent: ScopeId,
        span: Span,
    ) -> ScopeId {
        let name = name.into();
        let id = self.scopes.alloc_with_id(|id| Scope {
            id,
            kind,
            name,
            parent: Some(parent),
            children: Vec::new(),
            symbols: FxHashMap::default(),
            meta: ScopeMeta::None,
            span,
        });
        self.scopes[parent].children.push(id);
        id
    }

    /// Creates a `Type`-kind scope carrying its struct/enum/error shape.
    pub fn create_type_scope(
        &mut self,
        type_kind: TypeKind,
        name: impl Into<String>,
        parent: ScopeId,
        span: Span,
    ) -> ScopeId {
        let id = self.create_scope(ScopeKind::Type, name, parent, span);
        self.scopes[id].meta = ScopeMeta::Type { type_kind };
        id
    }

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id]
    }

    /// Adds a symbol to its owning scope's namespace, overwriting any
    /// existing binding of the same name. Shadowing checks are the
    /// caller's responsibility and happen before this.
    pub fn add_symbol(&mut self, symbol: Symbol) -> SymbolId {
        let scope = symbol.scope;
        let name = symbol.name.clone();
        let id = self.symbols.alloc(symbol);
        self.scopes[scope].symbols.insert(name, id);
        id
    }

    #[must_use]
    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    /// Looks a name up in one specific scope only.
    #[must_use]
    pub fn lookup_in(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope].symbols.get(name).copied()
    }

    /// Lexical lookup: walks from the current scope through its parents
    /// up to and including the global scope.
    #[must_use]
    pub fn lookup_symbol(&self, name: &str) -> Option<SymbolId> {
        self.lookup_from(self.current, name)
    }

    /// Lexical lookup starting at an explicit scope.
    #[must_use]
    pub fn lookup_from(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut cursor = Some(scope);
        while let Some(id) = cursor {
            if let Some(symbol) = self.scopes[id].symbols.get(name) {
                return Some(*symbol);
            }
            cursor = self.scopes[id].parent;
        }
        None
    }

    /// Lexical lookup that skips the current scope.
    #[must_use]
    pub fn lookup_in_parents(&self, name: &str) -> Option<SymbolId> {
        let parent = self.scopes[self.current].parent?;
        self.lookup_from(parent, name)
    }

    /// Finds a direct child of the current scope by name and kind.
    #[must_use]
    pub fn find_child_scope(&self, name: &str, kind: ScopeKind) -> Option<ScopeId> {
        self.find_child_scope_from(self.current, name, kind)
    }

    /// Finds a direct child of `ancestor` by name and kind.
    #[must_use]
    pub fn find_child_scope_from(
        &self,
        ancestor: ScopeId,
        name: &str,
        kind: ScopeKind,
    ) -> Option<ScopeId> {
        self.scopes[ancestor]
            .children
            .iter()
            .copied()
            .find(|&child| {
                let scope = &self.scopes[child];
                scope.kind == kind && scope.name == name
            })
    }

    /// The module scope with the given name, if collection created one.
    #[must_use]
    pub fn module_scope(&self, name: &str) -> Option<ScopeId> {
        self.find_child_scope_from(self.global, name, ScopeKind::Module)
    }

    /// Runs `f` with `id` as the current scope, restoring the previous
    /// current scope afterwards regardless of how `f` exits.
    pub fn with_scope<T>(&mut self, id: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.current;
        self.current = id;
        let result = f(self);
        self.current = previous;
        result
    }

    /// Iterates a scope and its ancestors, innermost first.
    pub fn ancestors(&self, id: ScopeId) -> impl Iterator<Item = &Scope> {
        let mut cursor = Some(id);
        std::iter::from_fn(move || {
            let id = cursor?;
            let scope = &self.scopes[id];
            cursor = scope.parent;
            Some(scope)
        })
    }

    /// All symbols in declaration order.
    pub fn symbols(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter()
    }

    /// Mutable iteration over all symbols, for phase-wide flag resets.
    pub fn symbols_mut(&mut self) -> impl Iterator<Item = (SymbolId, &mut Symbol)> {
        self.symbols.iter_mut()
    }

    /// Symbols declared in one scope, in declaration order.
    pub fn symbols_in(&self, scope: ScopeId) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols
            .iter()
            .filter(move |(id, symbol)| symbol.scope == scope && self.is_live(*id, symbol))
    }

    /// A symbol is live while its scope's namespace still maps its name
    /// to it; an overwritten duplicate is not.
    fn is_live(&self, id: SymbolId, symbol: &Symbol) -> bool {
        self.scopes[symbol.scope].symbols.get(&symbol.name) == Some(&id)
    }

    #[must_use]
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    #[must_use]
    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    /// Drops every scope and symbol and recreates the global scope. For
    /// reusing one store across analysis runs.
    pub fn reset(&mut self) {
        self.scopes = Arena::new();
        self.symbols = Arena::new();
        self.global = Self::alloc_global(&mut self.scopes);
        self.current = self.global;
    }
}

impl Default for ScopeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolKind;

    fn span_at(lo: usize, hi: usize) -> Span {
        Span::new(lo, hi)
    }

    #[test]
    fn new_store_has_global_current() {
        let store = ScopeStore::new();
        assert_eq!(store.current(), store.global());
        assert_eq!(store.scope(store.global()).kind, ScopeKind::Global);
        assert_eq!(store.scope_count(), 1);
    }

    #[test]
    fn create_scope_links_parent_and_child() {
        let mut store = ScopeStore::new();
        let module = store.create_scope(ScopeKind::Module, "main", store.global(), span_at(0, 100));

        let scope = store.scope(module);
        assert_eq!(scope.parent, Some(store.global()));
        assert_eq!(store.scope(store.global()).children, vec![module]);
    }

    #[test]
    fn type_scope_carries_its_kind() {
        let mut store = ScopeStore::new();
        let ty = store.create_type_scope(TypeKind::Enum, "Color", store.global(), span_at(0, 10));
        assert_eq!(store.scope(ty).type_kind(), Some(TypeKind::Enum));
        assert!(store.scope(ty).is_type_scope());
    }

    #[test]
    fn lexical_lookup_walks_to_global() {
        let mut store = ScopeStore::new();
        let module = store.create_scope(ScopeKind::Module, "main", store.global(), span_at(0, 100));
        let block = store.create_scope(ScopeKind::Block, "block@10", module, span_at(10, 50));

        let outer = Symbol::new("x", SymbolKind::Variable, module, "main");
        let outer_id = store.add_symbol(outer);

        store.set_current(block);
        assert_eq!(store.lookup_symbol("x"), Some(outer_id));
        assert_eq!(store.lookup_in(block, "x"), None);
        assert_eq!(store.lookup_symbol("y"), None);
    }

    #[test]
    fn inner_binding_shadows_outer_in_lookup() {
        let mut store = ScopeStore::new();
        let module = store.create_scope(ScopeKind::Module, "main", store.global(), span_at(0, 100));
        let block = store.create_scope(ScopeKind::Block, "block@10", module, span_at(10, 50));

        let outer_id = store.add_symbol(Symbol::new("x", SymbolKind::Variable, module, "main"));
        let inner_id = store.add_symbol(Symbol::new("x", SymbolKind::Variable, block, "main"));

        store.set_current(block);
        assert_eq!(store.lookup_symbol("x"), Some(inner_id));
        assert_eq!(store.lookup_in_parents("x"), Some(outer_id));
    }

    #[test]
    fn with_scope_restores_current() {
        let mut store = ScopeStore::new();
        let module = store.create_scope(ScopeKind::Module, "main", store.global(), span_at(0, 100));

        let inside = store.with_scope(module, |store| store.current());
        assert_eq!(inside, module);
        assert_eq!(store.current(), store.global());
    }

    #[test]
    fn find_child_scope_matches_name_and_kind() {
        let mut store = ScopeStore::new();
        let module = store.create_scope(ScopeKind::Module, "main", store.global(), span_at(0, 100));
        let func = store.create_scope(ScopeKind::Function, "run", module, span_at(5, 50));

        store.set_current(module);
        assert_eq!(store.find_child_scope("run", ScopeKind::Function), Some(func));
        assert_eq!(store.find_child_scope("run", ScopeKind::Block), None);
        assert_eq!(store.module_scope("main"), Some(module));
        assert_eq!(store.module_scope("other"), None);
    }

    #[test]
    fn overwritten_symbol_is_not_live() {
        let mut store = ScopeStore::new();
        let module = store.create_scope(ScopeKind::Module, "main", store.global(), span_at(0, 100));

        store.add_symbol(Symbol::new("x", SymbolKind::Variable, module, "main"));
        let second = store.add_symbol(Symbol::new("x", SymbolKind::Variable, module, "main"));

        let live: Vec<SymbolId> = store.symbols_in(module).map(|(id, _)| id).collect();
        assert_eq!(live, vec![second]);
        assert_eq!(store.symbol_count(), 2);
    }

    #[test]
    fn reset_recreates_the_global_scope() {
        let mut store = ScopeStore::new();
        let module = store.create_scope(ScopeKind::Module, "main", store.global(), span_at(0, 100));
        store.add_symbol(Symbol::new("x", SymbolKind::Variable, module, "main"));

        store.reset();
        assert_eq!(store.scope_count(), 1);
        assert_eq!(store.symbol_count(), 0);
        assert_eq!(store.current(), store.global());
    }
}
