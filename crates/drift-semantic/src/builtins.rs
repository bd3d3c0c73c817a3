//! Pre-declared types and functions injected into the global scope.

use crate::store::ScopeStore;
use crate::symbols::{Symbol, SymbolKind};
use crate::types::{FunctionType, IntType, Type};

/// A builtin type known before any module is processed.
#[derive(Debug, Clone)]
pub struct BuiltinType {
    pub name: String,
    pub ty: Type,
}

/// A builtin function signature.
#[derive(Debug, Clone)]
pub struct BuiltinFunction {
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
}

/// The set of declarations seeded into the global scope before phase 1.
///
/// Builtin symbols are exempt from the resolution `declared` reset and
/// from unused-symbol reporting.
#[derive(Debug, Clone)]
pub struct BuiltinConfig {
    pub types: Vec<BuiltinType>,
    pub functions: Vec<BuiltinFunction>,
}

impl BuiltinConfig {
    /// No builtins at all; mainly for tests that want a bare store.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            types: Vec::new(),
            functions: Vec::new(),
        }
    }

    /// Declares every builtin in the store's global scope.
    pub fn install(&self, store: &mut ScopeStore) {
        let global = store.global();
        for builtin in &self.types {
            let symbol = Symbol::new(&builtin.name, SymbolKind::Definition, global, "")
                .with_type(builtin.ty.clone())
                .builtin();
            store.add_symbol(symbol);
        }
        for builtin in &self.functions {
            let signature = Type::Function(Box::new(FunctionType {
                params: builtin.params.clone(),
                return_type: builtin.return_type.clone(),
                error: None,
            }));
            let symbol = Symbol::new(&builtin.name, SymbolKind::Function, global, "")
                .with_type(signature)
                .builtin();
            store.add_symbol(symbol);
        }
    }
}

impl Default for BuiltinConfig {
    fn default() -> Self {
        let primitives = [
            "i8", "i16", "i32", "i64", "u8", "u16", "u32", "u64", "f32", "f64", "bool", "char",
            "str", "void",
        ];
        let types = primitives
            .iter()
            .map(|name| BuiltinType {
                name: (*name).to_string(),
                ty: Type::from_primitive_name(name).unwrap_or(Type::Void),
            })
            .collect();

        let functions = vec![
            BuiltinFunction {
                name: "print".to_string(),
                params: vec![Type::Str],
                return_type: Type::Void,
            },
            BuiltinFunction {
                name: "println".to_string(),
                params: vec![Type::Str],
                return_type: Type::Void,
            },
            BuiltinFunction {
                name: "len".to_string(),
                params: vec![Type::Str],
                return_type: Type::Int(IntType::I64),
            },
            BuiltinFunction {
                name: "panic".to_string(),
                params: vec![Type::Str],
                return_type: Type::Void,
            },
            BuiltinFunction {
                name: "assert".to_string(),
                params: vec![Type::Bool],
                return_type: Type::Void,
            },
        ];

        Self { types, functions }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_installs_into_global() {
        let mut store = ScopeStore::new();
        BuiltinConfig::default().install(&mut store);

        let i32_id = store.lookup_in(store.global(), "i32").unwrap();
        let i32_symbol = store.symbol(i32_id);
        assert!(i32_symbol.is_builtin);
        assert_eq!(i32_symbol.ty, Some(Type::Int(IntType::I32)));

        let print_id = store.lookup_in(store.global(), "print").unwrap();
        assert_eq!(store.symbol(print_id).kind, SymbolKind::Function);
    }

    #[test]
    fn empty_set_installs_nothing() {
        let mut store = ScopeStore::new();
        BuiltinConfig::empty().install(&mut store);
        assert_eq!(store.symbol_count(), 0);
    }
}
