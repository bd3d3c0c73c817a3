//! Type expression resolution.
//!
//! Turns syntactic [`TypeExpr`]s into semantic [`Type`]s. Primitive names
//! win over user definitions; everything else resolves through the scope
//! tree. Array sizes are left unevaluated here, constant evaluation in
//! phase 3 fills them in. These are free functions so the inference
//! engine can resolve cast targets without owning a resolver.

use drift_ast::{TypeExpr, TypeExprKind};
use drift_core::{DiagnosticCode, Diagnostics, Span};

use crate::scope::{ScopeKind, anon_scope_name};
use crate::store::ScopeStore;
use crate::symbols::{SymbolId, SymbolKind, SymbolMeta};
use crate::types::{FunctionType, NamedType, Type};

/// Alias chains longer than this are assumed circular.
const MAX_ALIAS_DEPTH: usize = 100;

pub(crate) fn resolve_type_expr(
    ty: &TypeExpr,
    store: &mut ScopeStore,
    diags: &mut Diagnostics,
) -> Option<Type> {
    resolve_with_depth(ty, store, diags, 0)
}

fn resolve_with_depth(
    ty: &TypeExpr,
    store: &mut ScopeStore,
    diags: &mut Diagnostics,
    depth: usize,
) -> Option<Type> {
    if depth > MAX_ALIAS_DEPTH {
        diags.error(
            DiagnosticCode::TypeNestingTooDeep,
            format!("Type resolution exceeds the limit of {MAX_ALIAS_DEPTH} levels"),
            ty.span(),
        );
        return None;
    }
    match ty {
        TypeExpr::Named { path, span } => resolve_named(path, *span, store, diags, depth),
        TypeExpr::Optional { inner, .. } => {
            let inner = resolve_with_depth(inner, store, diags, depth + 1)?;
            Some(Type::Optional(Box::new(inner)))
        }
        TypeExpr::Pointer { inner, .. } => {
            let inner = resolve_with_depth(inner, store, diags, depth + 1)?;
            Some(Type::Pointer(Box::new(inner)))
        }
        TypeExpr::Array { element, .. } => {
            let element = resolve_with_depth(element, store, diags, depth + 1)?;
            Some(Type::Array {
                element: Box::new(element),
                size: None,
            })
        }
        TypeExpr::Function {
            params,
            return_type,
            ..
        } => {
            let mut param_types = Vec::with_capacity(params.len());
            for param in params {
                param_types.push(resolve_with_depth(param, store, diags, depth + 1)?);
            }
            let return_type = match return_type {
                Some(ret) => resolve_with_depth(ret, store, diags, depth + 1)?,
                None => Type::Void,
            };
            Some(Type::Function(Box::new(FunctionType {
                params: param_types,
                return_type,
                error: None,
            })))
        }
        // Inline bodies got an anonymous type scope during collection;
        // reconstructing the same name finds it again.
        TypeExpr::Struct { span, .. } | TypeExpr::Enum { span, .. } | TypeExpr::ErrorSet { span, .. } => {
            let prefix = match ty.kind() {
                TypeExprKind::Struct => "struct",
                TypeExprKind::Enum => "enum",
                _ => "error",
            };
            let name = anon_scope_name(prefix, *span);
            let scope = store.find_child_scope(&name, ScopeKind::Type)?;
            let kind = store.scope(scope).type_kind()?;
            Some(Type::Named(NamedType { name, kind, scope }))
        }
    }
}

fn resolve_named(
    path: &[String],
    span: Span,
    store: &mut ScopeStore,
    diags: &mut Diagnostics,
    depth: usize,
) -> Option<Type> {
    let (first, rest) = path.split_first()?;
    if rest.is_empty()
        && let Some(primitive) = Type::from_primitive_name(first)
    {
        return Some(primitive);
    }

    let display = path.join(".");
    let Some(mut id) = store.lookup_symbol(first) else {
        diags.error(
            DiagnosticCode::UndefinedType,
            format!("Unknown type '{display}'"),
            span,
        );
        return None;
    };

    for segment in rest {
        let Some(scope) = member_scope(id, store) else {
            diags.error(
                DiagnosticCode::UndefinedType,
                format!("'{}' has no member types", store.symbol(id).name),
                span,
            );
            return None;
        };
        let Some(next) = store.lookup_in(scope, segment) else {
            diags.error(
                DiagnosticCode::UndefinedType,
                format!("Unknown type '{display}'"),
                span,
            );
            return None;
        };
        id = next;
    }

    resolve_symbol_as_type(id, &display, span, store, diags, depth)
}

/// The scope a qualified path can step into through this symbol.
fn member_scope(id: SymbolId, store: &ScopeStore) -> Option<crate::scope::ScopeId> {
    let symbol = store.symbol(id);
    match &symbol.meta {
        SymbolMeta::Definition(meta) => meta.scope,
        SymbolMeta::Use(meta) => {
            if meta.wildcard {
                store.module_scope(meta.target_module.as_deref()?)
            } else {
                let target = meta.target?;
                store.symbol(target).definition_scope()
            }
        }
        _ => None,
    }
}

fn resolve_symbol_as_type(
    id: SymbolId,
    display: &str,
    span: Span,
    store: &mut ScopeStore,
    diags: &mut Diagnostics,
    depth: usize,
) -> Option<Type> {
    store.symbol_mut(id).used = true;
    let symbol = store.symbol(id);
    match symbol.kind {
        SymbolKind::Definition => {
            if let Some(ty) = &symbol.ty {
                return Some(ty.clone());
            }
            // Alias referenced ahead of its statement: resolve it now and
            // memoize the result on the symbol.
            let alias = match &symbol.meta {
                SymbolMeta::Definition(meta) => meta.alias.clone(),
                _ => None,
            }?;
            let resolved = resolve_with_depth(&alias, store, diags, depth + 1);
            if let Some(ty) = &resolved {
                store.symbol_mut(id).ty = Some(ty.clone());
            }
            resolved
        }
        SymbolKind::Use => {
            let target = match &symbol.meta {
                SymbolMeta::Use(meta) => meta.target,
                _ => None,
            };
            match target {
                Some(target) => resolve_symbol_as_type(target, display, span, store, diags, depth),
                None => {
                    diags.error(
                        DiagnosticCode::UndefinedType,
                        format!("'{display}' is not a type"),
                        span,
                    );
                    None
                }
            }
        }
        _ => {
            diags.error(
                DiagnosticCode::UndefinedType,
                format!("'{display}' is not a type"),
                span,
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{DefinitionMeta, Symbol};
    use crate::types::{IntType, TypeKind};

    fn named(name: &str) -> TypeExpr {
        TypeExpr::Named {
            path: vec![name.to_string()],
            span: Span::new(0, name.len()),
        }
    }

    #[test]
    fn primitives_resolve_without_symbols() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(100);
        assert_eq!(
            resolve_type_expr(&named("i32"), &mut store, &mut diags),
            Some(Type::Int(IntType::I32))
        );
        assert_eq!(
            resolve_type_expr(&named("bool"), &mut store, &mut diags),
            Some(Type::Bool)
        );
        assert!(diags.is_empty());
    }

    #[test]
    fn unknown_names_report_undefined_type() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(100);
        assert_eq!(
            resolve_type_expr(&named("Missing"), &mut store, &mut diags),
            None
        );
        assert_eq!(diags.error_count(), 1);
        assert_eq!(
            diags.iter().next().unwrap().code,
            DiagnosticCode::UndefinedType
        );
    }

    #[test]
    fn optional_wraps_resolved_inner() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(100);
        let ty = TypeExpr::Optional {
            inner: Box::new(named("f64")),
            span: Span::new(0, 4),
        };
        assert_eq!(
            resolve_type_expr(&ty, &mut store, &mut diags),
            Some(Type::Optional(Box::new(Type::Float(
                crate::types::FloatType::F64
            ))))
        );
    }

    #[test]
    fn alias_resolves_ahead_of_its_statement() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(100);
        let global = store.global();
        let symbol = Symbol::new("Byte", SymbolKind::Definition, global, "main").with_meta(
            SymbolMeta::Definition(DefinitionMeta {
                scope: None,
                type_kind: None,
                alias: Some(named("u8")),
            }),
        );
        let id = store.add_symbol(symbol);

        assert_eq!(
            resolve_type_expr(&named("Byte"), &mut store, &mut diags),
            Some(Type::Int(IntType::U8))
        );
        // Memoized onto the definition symbol.
        assert_eq!(store.symbol(id).ty, Some(Type::Int(IntType::U8)));
    }

    #[test]
    fn named_struct_resolves_to_its_scope() {
        let mut store = ScopeStore::new();
        let mut diags = Diagnostics::new(100);
        let global = store.global();
        let scope = store.create_type_scope(TypeKind::Struct, "Point", global, Span::new(0, 10));
        let symbol = Symbol::new("Point", SymbolKind::Definition, global, "main")
            .with_type(Type::Named(NamedType {
                name: "Point".to_string(),
                kind: TypeKind::Struct,
                scope,
            }))
            .with_meta(SymbolMeta::Definition(DefinitionMeta {
                scope: Some(scope),
                type_kind: Some(TypeKind::Struct),
                alias: None,
            }));
        store.add_symbol(symbol);

        let resolved = resolve_type_expr(&named("Point"), &mut store, &mut diags).unwrap();
        assert_eq!(resolved.as_named().map(|n| n.name.as_str()), Some("Point"));
    }
}
