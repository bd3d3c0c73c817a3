//! Symbols and their per-kind metadata payloads.

use crate::scope::ScopeId;
use crate::types::{Type, TypeKind};
use drift_ast::{Block, Expression, Mutability, Visibility};
use drift_core::{Fault, Span};
use id_arena::Id;

pub type SymbolId = Id<Symbol>;

/// What kind of binding a symbol is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// A named type definition (`def`), including the synthetic `selferr`.
    Definition,
    Variable,
    Function,
    Parameter,
    StructField,
    EnumVariant,
    /// A member of an error set.
    Error,
    /// An import binding (`use`).
    Use,
}

impl SymbolKind {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Definition => "definition",
            Self::Variable => "variable",
            Self::Function => "function",
            Self::Parameter => "parameter",
            Self::StructField => "field",
            Self::EnumVariant => "variant",
            Self::Error => "error member",
            Self::Use => "import",
        }
    }
}

/// A named, typed binding living in exactly one scope.
///
/// Created during collection with `declared = true`; resolution resets
/// `declared` for non-import, non-parameter symbols and re-affirms it in
/// statement order, which is how declare-before-use is enforced without a
/// separate data-flow pass.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Option<Type>,
    pub scope: ScopeId,
    /// Span of the whole declaration this symbol came from.
    pub context_span: Span,
    /// Span of the name itself; diagnostics point here.
    pub target_span: Span,
    pub declared: bool,
    pub initialized: bool,
    pub used: bool,
    pub visibility: Visibility,
    pub mutability: Mutability,
    /// Name of the module this symbol was declared in.
    pub module: String,
    pub is_exported: bool,
    pub is_builtin: bool,
    pub meta: SymbolMeta,
}

impl Symbol {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        kind: SymbolKind,
        scope: ScopeId,
        module: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            ty: None,
            scope,
            context_span: Span::SYNTHETIC,
            target_span: Span::SYNTHETIC,
            declared: true,
            initialized: true,
            used: false,
            visibility: Visibility::Private,
            mutability: Mutability::Immutable,
            module: module.into(),
            is_exported: false,
            is_builtin: false,
            meta: SymbolMeta::None,
        }
    }

    #[must_use]
    pub fn with_spans(mut self, context: Span, target: Span) -> Self {
        self.context_span = context;
        self.target_span = target;
        self
    }

    #[must_use]
    pub fn with_type(mut self, ty: Type) -> Self {
        self.ty = Some(ty);
        self
    }

    #[must_use]
    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self.is_exported = visibility == Visibility::Public;
        self
    }

    #[must_use]
    pub fn with_mutability(mut self, mutability: Mutability) -> Self {
        self.mutability = mutability;
        self
    }

    #[must_use]
    pub fn with_meta(mut self, meta: SymbolMeta) -> Self {
        self.meta = meta;
        self
    }

    #[must_use]
    pub fn uninitialized(mut self) -> Self {
        self.initialized = false;
        self
    }

    #[must_use]
    pub fn builtin(mut self) -> Self {
        self.is_builtin = true;
        self
    }

    #[must_use]
    pub const fn is_mutable(&self) -> bool {
        matches!(self.mutability, Mutability::Mutable)
    }

    /// Function metadata, faulting when the payload is missing.
    pub fn function_meta(&self) -> Result<&FunctionMeta, Fault> {
        match &self.meta {
            SymbolMeta::Function(meta) => Ok(meta),
            _ => Err(self.missing_meta("function")),
        }
    }

    pub fn function_meta_mut(&mut self) -> Result<&mut FunctionMeta, Fault> {
        match &mut self.meta {
            SymbolMeta::Function(meta) => Ok(meta),
            _ => Err(Fault::MissingMetadata {
                symbol: self.name.clone(),
                what: "function",
            }),
        }
    }

    pub fn use_meta(&self) -> Result<&UseMeta, Fault> {
        match &self.meta {
            SymbolMeta::Use(meta) => Ok(meta),
            _ => Err(self.missing_meta("import")),
        }
    }

    pub fn use_meta_mut(&mut self) -> Result<&mut UseMeta, Fault> {
        match &mut self.meta {
            SymbolMeta::Use(meta) => Ok(meta),
            _ => Err(Fault::MissingMetadata {
                symbol: self.name.clone(),
                what: "import",
            }),
        }
    }

    /// The scope holding this definition's members, when it has one.
    #[must_use]
    pub fn definition_scope(&self) -> Option<ScopeId> {
        match &self.meta {
            SymbolMeta::Definition(meta) => meta.scope,
            _ => None,
        }
    }

    fn missing_meta(&self, what: &'static str) -> Fault {
        Fault::MissingMetadata {
            symbol: self.name.clone(),
            what,
        }
    }
}

/// Closed per-kind metadata payload. Accessing the wrong payload is a
/// compile error rather than a runtime surprise.
#[derive(Debug, Default)]
pub enum SymbolMeta {
    #[default]
    None,
    Definition(DefinitionMeta),
    Variable(VariableMeta),
    Function(FunctionMeta),
    Parameter(ParameterMeta),
    StructField(StructFieldMeta),
    EnumVariant(EnumVariantMeta),
    Use(UseMeta),
}

/// Payload for `def` symbols and the synthetic `selferr`.
#[derive(Debug, Default)]
pub struct DefinitionMeta {
    /// Scope of the members for struct/enum/error definitions; `None`
    /// for plain aliases.
    pub scope: Option<ScopeId>,
    pub type_kind: Option<TypeKind>,
    /// For plain aliases, the aliased type expression; resolved lazily
    /// because aliases may be referenced ahead of their statement.
    pub alias: Option<drift_ast::TypeExpr>,
}

/// Payload for variables: the initializer is kept so the evaluator can
/// fold references to immutable constants.
#[derive(Debug, Default)]
pub struct VariableMeta {
    pub init: Option<Expression>,
}

/// Payload for functions.
#[derive(Debug)]
pub struct FunctionMeta {
    /// The function's own scope, holding parameters and body locals.
    pub scope: ScopeId,
    /// Parameter symbols in declaration order, including injected `self`.
    pub params: Vec<SymbolId>,
    /// Resolved return type; `None` until resolution, then `Void` when
    /// the declaration had none.
    pub return_type: Option<Type>,
    pub error: Option<ErrorMode>,
    pub is_comptime: bool,
    pub is_static: bool,
    /// Body stashed verbatim at collection time, only for comptime
    /// functions; the evaluator reduces it without re-walking the AST.
    pub comptime_body: Option<Block>,
}

/// How a function declares its error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorMode {
    /// `!SomeErrorSet` naming a `def`-declared set.
    Named { name: String },
    /// `!{A, B}` inline set, bound through the synthetic `selferr`.
    SelfGroup { scope: ScopeId },
}

/// Payload for parameters. The index drives forward-reference checks in
/// default values; the default is kept for comptime calls that omit
/// trailing arguments.
#[derive(Debug, Default)]
pub struct ParameterMeta {
    pub index: usize,
    pub default: Option<Expression>,
    pub is_self: bool,
}

#[derive(Debug, Default)]
pub struct StructFieldMeta {
    pub default: Option<Expression>,
}

/// Payload for enum variants. The payload type is resolved in phase 2;
/// the discriminant expression waits for constant evaluation in phase 3.
#[derive(Debug, Default)]
pub struct EnumVariantMeta {
    pub payload: Option<Type>,
    pub discriminant: Option<Expression>,
}

#[derive(Debug, Default)]
pub struct UseMeta {
    pub path: Vec<String>,
    pub wildcard: bool,
    /// Module the import points into, once resolved.
    pub target_module: Option<String>,
    /// The symbol this import binds, for specific and re-export forms.
    pub target: Option<SymbolId>,
}
