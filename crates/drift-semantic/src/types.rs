//! Resolved semantic types.
//!
//! Type expressions from the AST are bound to these during resolution.
//! Primitive names resolve directly; named struct/enum/error types carry
//! the id of the scope holding their members, so member access and
//! construction checks can recurse into the right namespace.

use crate::scope::ScopeId;
use std::fmt;

/// Concrete integer types with their width and signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntType {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

impl IntType {
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::I8 | Self::U8 => 8,
            Self::I16 | Self::U16 => 16,
            Self::I32 | Self::U32 => 32,
            Self::I64 | Self::U64 => 64,
        }
    }

    #[must_use]
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    /// Smallest representable value, widened for bounds checks.
    #[must_use]
    pub const fn min(self) -> i128 {
        match self {
            Self::I8 => i8::MIN as i128,
            Self::I16 => i16::MIN as i128,
            Self::I32 => i32::MIN as i128,
            Self::I64 => i64::MIN as i128,
            Self::U8 | Self::U16 | Self::U32 | Self::U64 => 0,
        }
    }

    /// Largest representable value, widened for bounds checks.
    #[must_use]
    pub const fn max(self) -> i128 {
        match self {
            Self::I8 => i8::MAX as i128,
            Self::I16 => i16::MAX as i128,
            Self::I32 => i32::MAX as i128,
            Self::I64 => i64::MAX as i128,
            Self::U8 => u8::MAX as i128,
            Self::U16 => u16::MAX as i128,
            Self::U32 => u32::MAX as i128,
            Self::U64 => u64::MAX as i128,
        }
    }

    /// The signed type of the same width. Negating an unsigned value
    /// re-types the result this way.
    #[must_use]
    pub const fn to_signed(self) -> Self {
        match self {
            Self::U8 => Self::I8,
            Self::U16 => Self::I16,
            Self::U32 => Self::I32,
            Self::U64 => Self::I64,
            signed => signed,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "i8" => Some(Self::I8),
            "i16" => Some(Self::I16),
            "i32" => Some(Self::I32),
            "i64" => Some(Self::I64),
            "u8" => Some(Self::U8),
            "u16" => Some(Self::U16),
            "u32" => Some(Self::U32),
            "u64" => Some(Self::U64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
        }
    }
}

/// Concrete floating-point types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatType {
    F32,
    F64,
}

impl FloatType {
    #[must_use]
    pub const fn bits(self) -> u32 {
        match self {
            Self::F32 => 32,
            Self::F64 => 64,
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "f32" => Some(Self::F32),
            "f64" => Some(Self::F64),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }
}

/// What a `Type`-kind scope models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Struct,
    Enum,
    Error,
}

impl TypeKind {
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Error => "error set",
        }
    }
}

/// A resolved type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Int(IntType),
    Float(FloatType),
    Bool,
    Char,
    Str,
    Void,
    Null,

    /// Integer literal not yet committed to a width; adopts the concrete
    /// type of whatever it meets.
    ComptimeInt,
    ComptimeFloat,

    Optional(Box<Type>),
    Pointer(Box<Type>),

    /// Fixed-size array. The size stays `None` until the size expression
    /// has been constant-evaluated in phase 3.
    Array {
        element: Box<Type>,
        size: Option<u64>,
    },

    Function(Box<FunctionType>),

    /// User-defined struct, enum or error set.
    Named(NamedType),

    /// The identity of a whole module; the type of a wildcard-import
    /// alias.
    Module(String),

    /// A range value, element type inside.
    Range(Box<Type>),
}

/// Finalized function signature: parameter types (without any injected
/// `self`), return type, declared error type if any.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<Type>,
    pub return_type: Type,
    pub error: Option<Type>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub name: String,
    pub kind: TypeKind,
    pub scope: ScopeId,
}

impl Type {
    /// Resolves a primitive type name.
    #[must_use]
    pub fn from_primitive_name(name: &str) -> Option<Self> {
        if let Some(int) = IntType::from_name(name) {
            return Some(Self::Int(int));
        }
        if let Some(float) = FloatType::from_name(name) {
            return Some(Self::Float(float));
        }
        match name {
            "bool" => Some(Self::Bool),
            "char" => Some(Self::Char),
            "str" => Some(Self::Str),
            "void" => Some(Self::Void),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_) | Self::ComptimeInt)
    }

    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::Float(_) | Self::ComptimeFloat)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// True for literal types that have not adopted a concrete width yet.
    #[must_use]
    pub const fn is_comptime(&self) -> bool {
        matches!(self, Self::ComptimeInt | Self::ComptimeFloat)
    }

    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    /// The concrete integer type, if this is one.
    #[must_use]
    pub const fn int_type(&self) -> Option<IntType> {
        match self {
            Self::Int(int) => Some(*int),
            _ => None,
        }
    }

    /// Peels every `Optional` layer off this type.
    #[must_use]
    pub fn unwrap_optional(&self) -> &Type {
        let mut ty = self;
        while let Self::Optional(inner) = ty {
            ty = inner;
        }
        ty
    }

    /// The named user type behind this type, unwrapping optionals.
    #[must_use]
    pub fn as_named(&self) -> Option<&NamedType> {
        match self.unwrap_optional() {
            Self::Named(named) => Some(named),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(int) => write!(f, "{}", int.name()),
            Self::Float(float) => write!(f, "{}", float.name()),
            Self::Bool => write!(f, "bool"),
            Self::Char => write!(f, "char"),
            Self::Str => write!(f, "str"),
            Self::Void => write!(f, "void"),
            Self::Null => write!(f, "null"),
            Self::ComptimeInt => write!(f, "comptime int"),
            Self::ComptimeFloat => write!(f, "comptime float"),
            Self::Optional(inner) => write!(f, "?{inner}"),
            Self::Pointer(inner) => write!(f, "*{inner}"),
            Self::Array { element, size } => match size {
                Some(size) => write!(f, "[{size}]{element}"),
                None => write!(f, "[_]{element}"),
            },
            Self::Function(func) => {
                write!(f, "fn(")?;
                for (i, param) in func.params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ")")?;
                if let Some(error) = &func.error {
                    write!(f, " !{error}")?;
                }
                if !func.return_type.is_void() {
                    write!(f, " -> {}", func.return_type)?;
                }
                Ok(())
            }
            Self::Named(named) => write!(f, "{}", named.name),
            Self::Module(name) => write!(f, "module '{name}'"),
            Self::Range(element) => write!(f, "range of {element}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_bounds_match_widths() {
        assert_eq!(IntType::I8.min(), -128);
        assert_eq!(IntType::I8.max(), 127);
        assert_eq!(IntType::U8.min(), 0);
        assert_eq!(IntType::U8.max(), 255);
        assert_eq!(IntType::I64.max(), i64::MAX as i128);
        assert_eq!(IntType::U64.max(), u64::MAX as i128);
    }

    #[test]
    fn unsigned_re_types_to_signed_of_same_width() {
        assert_eq!(IntType::U8.to_signed(), IntType::I8);
        assert_eq!(IntType::U64.to_signed(), IntType::I64);
        assert_eq!(IntType::I32.to_signed(), IntType::I32);
    }

    #[test]
    fn primitive_names_resolve() {
        assert_eq!(Type::from_primitive_name("i32"), Some(Type::Int(IntType::I32)));
        assert_eq!(
            Type::from_primitive_name("f64"),
            Some(Type::Float(FloatType::F64))
        );
        assert_eq!(Type::from_primitive_name("bool"), Some(Type::Bool));
        assert_eq!(Type::from_primitive_name("void"), Some(Type::Void));
        assert_eq!(Type::from_primitive_name("Point"), None);
    }

    #[test]
    fn optional_unwraps_to_innermost() {
        let ty = Type::Optional(Box::new(Type::Optional(Box::new(Type::Str))));
        assert_eq!(ty.unwrap_optional(), &Type::Str);
        assert_eq!(Type::Bool.unwrap_optional(), &Type::Bool);
    }

    #[test]
    fn display_forms() {
        let opt = Type::Optional(Box::new(Type::Int(IntType::I32)));
        assert_eq!(opt.to_string(), "?i32");
        let arr = Type::Array {
            element: Box::new(Type::Int(IntType::U8)),
            size: Some(4),
        };
        assert_eq!(arr.to_string(), "[4]u8");
        let func = Type::Function(Box::new(FunctionType {
            params: vec![Type::Int(IntType::I64), Type::Str],
            return_type: Type::Bool,
            error: None,
        }));
        assert_eq!(func.to_string(), "fn(i64, str) -> bool");
    }
}
