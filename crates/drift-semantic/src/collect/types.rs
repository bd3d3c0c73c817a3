//! Type definition collection and the type cycle guard.
//!
//! Walking a `def` follows named references into sibling definitions so
//! that value-recursive types are caught while they are still being
//! defined. Re-entering a (type, scope) key already on the context stack
//! is a warning, since pointer-based self-reference is legitimate; the
//! traversal stops there either way. A depth ceiling turns runaway
//! nesting into a hard error.

use drift_ast::{DefStatement, Module, Statement, StructMember, TypeExpr, Visibility};
use drift_core::{DiagnosticCode, Result, Span};

use crate::collect::Collector;
use crate::scope::anon_scope_name;
use crate::symbols::{
    DefinitionMeta, EnumVariantMeta, StructFieldMeta, Symbol, SymbolKind, SymbolMeta,
};
use crate::types::{NamedType, Type, TypeKind};

/// Hard ceiling on type expression nesting.
pub(crate) const MAX_TYPE_DEPTH: usize = 100;

impl Collector<'_> {
    pub(crate) fn collect_def(&mut self, def: &DefStatement, module: &Module) -> Result<()> {
        if !self.check_shadowing(&def.name, SymbolKind::Definition, def.span) {
            return Ok(());
        }
        let scope_name = self.store.scope(self.store.current()).name.clone();
        self.ctx.push_type_key(&def.name, &scope_name);
        let result = self.collect_def_value(def, module);
        self.ctx.pop_type_key();
        result
    }

    fn collect_def_value(&mut self, def: &DefStatement, module: &Module) -> Result<()> {
        match &def.value {
            TypeExpr::Struct { members, span } => {
                let scope = self.named_def(def, module, TypeKind::Struct, *span);
                self.in_scope(scope, |c| c.collect_struct_members(members, module, 1))
            }
            TypeExpr::Enum {
                backing, variants, ..
            } => {
                let span = def.value.span();
                let scope = self.named_def(def, module, TypeKind::Enum, span);
                if let Some(backing) = backing {
                    self.collect_type_component(backing, module, 1)?;
                }
                self.in_scope(scope, |c| -> Result<()> {
                    for variant in variants {
                        if c.store.lookup_in(c.store.current(), &variant.name).is_some() {
                            c.diags.error(
                                DiagnosticCode::DuplicateSymbol,
                                format!("Variant '{}' is declared twice", variant.name),
                                variant.span,
                            );
                            continue;
                        }
                        let current = c.store.current();
                        let enum_ty = Type::Named(NamedType {
                            name: def.name.clone(),
                            kind: TypeKind::Enum,
                            scope: current,
                        });
                        let symbol =
                            Symbol::new(&variant.name, SymbolKind::EnumVariant, current, &module.name)
                                .with_spans(variant.span, variant.span)
                                .with_visibility(Visibility::Public)
                                .with_type(enum_ty)
                                .with_meta(SymbolMeta::EnumVariant(EnumVariantMeta {
                                    payload: None,
                                    discriminant: variant.discriminant.clone(),
                                }));
                        c.declare(symbol);
                        if let Some(payload) = &variant.payload {
                            c.collect_type_component(payload, module, 1)?;
                        }
                    }
                    Ok(())
                })
            }
            TypeExpr::ErrorSet { members, span } => {
                let span = *span;
                let scope = self.named_def(def, module, TypeKind::Error, span);
                self.in_scope(scope, |c| {
                    for member in members {
                        if c.store.lookup_in(c.store.current(), member).is_some() {
                            c.diags.error(
                                DiagnosticCode::DuplicateSymbol,
                                format!("Error member '{member}' is declared twice"),
                                span,
                            );
                            continue;
                        }
                        let current = c.store.current();
                        let symbol = Symbol::new(member, SymbolKind::Error, current, &module.name)
                            .with_spans(span, span)
                            .with_visibility(Visibility::Public);
                        c.declare(symbol);
                    }
                });
                Ok(())
            }
            other => {
                // Plain alias: the denoted type is resolved in phase 2.
                let current = self.store.current();
                let symbol = Symbol::new(&def.name, SymbolKind::Definition, current, &module.name)
                    .with_spans(def.span, def.span)
                    .with_visibility(def.visibility)
                    .with_meta(SymbolMeta::Definition(DefinitionMeta {
                        scope: None,
                        type_kind: None,
                        alias: Some(other.clone()),
                    }));
                self.declare(symbol);
                self.collect_type_component(other, module, 1)
            }
        }
    }

    /// Creates the member scope for a struct/enum/error `def` and declares
    /// the definition symbol, already typed as its own named type.
    fn named_def(
        &mut self,
        def: &DefStatement,
        module: &Module,
        kind: TypeKind,
        span: Span,
    ) -> crate::scope::ScopeId {
        let parent = self.store.current();
        let scope = self.store.create_type_scope(kind, &def.name, parent, span);
        let symbol = Symbol::new(&def.name, SymbolKind::Definition, parent, &module.name)
            .with_spans(def.span, def.span)
            .with_visibility(def.visibility)
            .with_type(Type::Named(NamedType {
                name: def.name.clone(),
                kind,
                scope,
            }))
            .with_meta(SymbolMeta::Definition(DefinitionMeta {
                scope: Some(scope),
                type_kind: Some(kind),
                alias: None,
            }));
        self.declare(symbol);
        scope
    }

    fn collect_struct_members(
        &mut self,
        members: &[StructMember],
        module: &Module,
        depth: usize,
    ) -> Result<()> {
        for member in members {
            match member {
                StructMember::Field(field) => {
                    if !self.check_shadowing(&field.name, SymbolKind::StructField, field.span) {
                        continue;
                    }
                    let current = self.store.current();
                    let symbol =
                        Symbol::new(&field.name, SymbolKind::StructField, current, &module.name)
                            .with_spans(field.span, field.span)
                            .with_visibility(field.visibility)
                            .with_mutability(drift_ast::Mutability::Mutable)
                            .with_meta(SymbolMeta::StructField(StructFieldMeta {
                                default: field.default.clone(),
                            }));
                    self.declare(symbol);
                    self.collect_type_component(&field.ty, module, depth)?;
                    if let Some(default) = &field.default {
                        self.collect_expression(default, module)?;
                    }
                }
                StructMember::Func(func) => self.collect_func(func, module)?,
            }
        }
        Ok(())
    }

    /// Declaring walk over a type expression: creates scopes for inline
    /// struct/enum/error bodies and follows named references for cycles.
    pub(crate) fn collect_type_component(
        &mut self,
        ty: &TypeExpr,
        module: &Module,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_TYPE_DEPTH {
            self.diags.error(
                DiagnosticCode::TypeNestingTooDeep,
                format!("Type nesting exceeds the limit of {MAX_TYPE_DEPTH} levels"),
                ty.span(),
            );
            return Ok(());
        }
        match ty {
            TypeExpr::Named { path, span } => {
                if let [name] = path.as_slice() {
                    self.visit_type_reference(name, *span, module, depth)?;
                }
                Ok(())
            }
            TypeExpr::Optional { inner, .. } | TypeExpr::Pointer { inner, .. } => {
                self.collect_type_component(inner, module, depth + 1)
            }
            TypeExpr::Array { size, element, .. } => {
                self.collect_expression(size, module)?;
                self.collect_type_component(element, module, depth + 1)
            }
            TypeExpr::Function {
                params,
                return_type,
                ..
            } => {
                for param in params {
                    self.collect_type_component(param, module, depth + 1)?;
                }
                if let Some(ret) = return_type {
                    self.collect_type_component(ret, module, depth + 1)?;
                }
                Ok(())
            }
            TypeExpr::Struct { members, span } => {
                let parent = self.store.current();
                let scope = self.store.create_type_scope(
                    TypeKind::Struct,
                    anon_scope_name("struct", *span),
                    parent,
                    *span,
                );
                self.in_scope(scope, |c| c.collect_struct_members(members, module, depth + 1))
            }
            TypeExpr::Enum {
                backing,
                variants,
                span,
            } => {
                if let Some(backing) = backing {
                    self.collect_type_component(backing, module, depth + 1)?;
                }
                let parent = self.store.current();
                let name = anon_scope_name("enum", *span);
                let scope = self
                    .store
                    .create_type_scope(TypeKind::Enum, &name, parent, *span);
                self.in_scope(scope, |c| -> Result<()> {
                    for variant in variants {
                        let current = c.store.current();
                        let enum_ty = Type::Named(NamedType {
                            name: name.clone(),
                            kind: TypeKind::Enum,
                            scope: current,
                        });
                        let symbol =
                            Symbol::new(&variant.name, SymbolKind::EnumVariant, current, &module.name)
                                .with_spans(variant.span, variant.span)
                                .with_visibility(Visibility::Public)
                                .with_type(enum_ty)
                                .with_meta(SymbolMeta::EnumVariant(EnumVariantMeta {
                                    payload: None,
                                    discriminant: variant.discriminant.clone(),
                                }));
                        c.declare(symbol);
                        if let Some(payload) = &variant.payload {
                            c.collect_type_component(payload, module, depth + 1)?;
                        }
                    }
                    Ok(())
                })
            }
            TypeExpr::ErrorSet { members, span } => {
                let parent = self.store.current();
                let scope = self.store.create_type_scope(
                    TypeKind::Error,
                    anon_scope_name("error", *span),
                    parent,
                    *span,
                );
                self.in_scope(scope, |c| {
                    for member in members {
                        let current = c.store.current();
                        let symbol = Symbol::new(member, SymbolKind::Error, current, &module.name)
                            .with_spans(*span, *span)
                            .with_visibility(Visibility::Public);
                        c.declare(symbol);
                    }
                });
                Ok(())
            }
        }
    }

    /// Follows a single-segment named reference into its definition, if it
    /// is one of the current module's `def` statements.
    fn visit_type_reference(
        &mut self,
        name: &str,
        span: Span,
        module: &Module,
        depth: usize,
    ) -> Result<()> {
        if Type::from_primitive_name(name).is_some() {
            return Ok(());
        }
        if self.ctx.is_processing_type(name, &module.name) {
            self.diags.warning(
                DiagnosticCode::TypeCycle,
                format!("Type '{name}' refers to itself while it is still being defined"),
                span,
            );
            return Ok(());
        }
        let Some(def) = find_def(module, name) else {
            // Unknown here; resolution reports it if it is truly missing.
            return Ok(());
        };
        self.ctx.push_type_key(name, &module.name);
        let result = self.walk_type_for_cycles(&def.value, module, depth + 1);
        self.ctx.pop_type_key();
        result
    }

    /// Non-declaring walk used when traversing a referenced definition:
    /// checks cycles and depth without creating scopes or symbols.
    fn walk_type_for_cycles(
        &mut self,
        ty: &TypeExpr,
        module: &Module,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_TYPE_DEPTH {
            self.diags.error(
                DiagnosticCode::TypeNestingTooDeep,
                format!("Type nesting exceeds the limit of {MAX_TYPE_DEPTH} levels"),
                ty.span(),
            );
            return Ok(());
        }
        match ty {
            TypeExpr::Named { path, span } => {
                if let [name] = path.as_slice() {
                    self.visit_type_reference(name, *span, module, depth)?;
                }
                Ok(())
            }
            TypeExpr::Optional { inner, .. } | TypeExpr::Pointer { inner, .. } => {
                self.walk_type_for_cycles(inner, module, depth + 1)
            }
            TypeExpr::Array { element, .. } => {
                self.walk_type_for_cycles(element, module, depth + 1)
            }
            TypeExpr::Function {
                params,
                return_type,
                ..
            } => {
                for param in params {
                    self.walk_type_for_cycles(param, module, depth + 1)?;
                }
                if let Some(ret) = return_type {
                    self.walk_type_for_cycles(ret, module, depth + 1)?;
                }
                Ok(())
            }
            TypeExpr::Struct { members, .. } => {
                for member in members {
                    if let StructMember::Field(field) = member {
                        self.walk_type_for_cycles(&field.ty, module, depth + 1)?;
                    }
                }
                Ok(())
            }
            TypeExpr::Enum { variants, .. } => {
                for variant in variants {
                    if let Some(payload) = &variant.payload {
                        self.walk_type_for_cycles(payload, module, depth + 1)?;
                    }
                }
                Ok(())
            }
            TypeExpr::ErrorSet { .. } => Ok(()),
        }
    }
}

fn find_def<'m>(module: &'m Module, name: &str) -> Option<&'m DefStatement> {
    module.statements.iter().find_map(|statement| match statement {
        Statement::Def(def) if def.name == name => Some(def),
        _ => None,
    })
}
