//! Diagnostic codes, severities, and the append-only diagnostic sink.
//!
//! Every analysis phase reports user-facing findings through [`Diagnostics`].
//! Codes follow a fixed numbering scheme:
//!
//! - `2000`–`2099`: symbol errors (undefined, duplicate, shadowing, ...)
//! - `2100`–`2199`: type errors (mismatch, overflow, division by zero, ...)
//! - `2200`–`2299`: structural errors (modules, imports, type nesting)
//! - `2300`–`2399`: control-flow errors (return/throw obligations)
//! - `2400`–`2499`: whole-program findings (entry point, unused symbols)
//! - `2500`–`2599`: declaration-shape errors (parameters, fields)
//! - `2900`: internal invariant violation
//!
//! Codes render as `E####` for errors and `W####` for warnings.

use crate::span::Span;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Severity of a reported diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Stable identifier for every finding the analyzer can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Symbol errors (20xx)
    UndefinedIdentifier,
    UndefinedType,
    DuplicateSymbol,
    ShadowedSymbol,
    DuplicateSelf,
    SymbolNotExported,
    SymbolNotFoundInModule,
    UsedBeforeDeclared,
    UsedBeforeInitialized,
    SelfInitialization,
    ParameterSelfReference,
    ForwardParameterReference,

    // Type errors (21xx)
    TypeMismatch,
    CannotInferType,
    ArithmeticOverflow,
    DivisionByZero,
    InvalidCast,
    ShiftOutOfRange,
    ExponentOutOfRange,
    CharOutOfRange,
    NotComptimeEvaluable,
    ConditionNotBool,
    ImmutableAssignment,
    NotCallable,
    WrongArgumentCount,
    UnknownField,
    MissingField,
    UnknownMember,
    ArraySizeNotConstant,

    // Structural errors (22xx)
    ModuleNotFound,
    ImportCycle,
    TypeNestingTooDeep,
    TypeCycle,
    EmptyModule,
    InvalidImportPath,

    // Control-flow errors (23xx)
    MissingReturn,
    ThrowWithoutErrorType,
    ErrorMemberNotFound,
    MisplacedControlStatement,
    NonExhaustiveMatch,
    ReturnOutsideFunction,

    // Whole-program findings (24xx)
    EntryModuleNotFound,
    EntryModuleNoMain,
    MainNotPublic,
    InvalidMainSignature,
    UnusedVariable,
    UnusedParameter,
    UnusedFunction,
    UnusedSymbol,

    // Declaration-shape errors (25xx)
    InvalidParameterModifier,
    ParameterTypeRequired,

    // Internal (29xx)
    InternalError,
}

impl DiagnosticCode {
    /// The numeric portion of the rendered code.
    #[must_use]
    pub const fn number(self) -> u16 {
        match self {
            Self::UndefinedIdentifier => 2001,
            Self::UndefinedType => 2002,
            Self::DuplicateSymbol => 2003,
            Self::ShadowedSymbol => 2004,
            Self::DuplicateSelf => 2005,
            Self::SymbolNotExported => 2006,
            Self::SymbolNotFoundInModule => 2007,
            Self::UsedBeforeDeclared => 2008,
            Self::UsedBeforeInitialized => 2009,
            Self::SelfInitialization => 2010,
            Self::ParameterSelfReference => 2011,
            Self::ForwardParameterReference => 2012,

            Self::TypeMismatch => 2101,
            Self::CannotInferType => 2102,
            Self::ArithmeticOverflow => 2103,
            Self::DivisionByZero => 2104,
            Self::InvalidCast => 2105,
            Self::ShiftOutOfRange => 2106,
            Self::ExponentOutOfRange => 2107,
            Self::CharOutOfRange => 2108,
            Self::NotComptimeEvaluable => 2109,
            Self::ConditionNotBool => 2110,
            Self::ImmutableAssignment => 2111,
            Self::NotCallable => 2112,
            Self::WrongArgumentCount => 2113,
            Self::UnknownField => 2114,
            Self::MissingField => 2115,
            Self::UnknownMember => 2116,
            Self::ArraySizeNotConstant => 2117,

            Self::ModuleNotFound => 2201,
            Self::ImportCycle => 2202,
            Self::TypeNestingTooDeep => 2203,
            Self::TypeCycle => 2204,
            Self::EmptyModule => 2205,
            Self::InvalidImportPath => 2206,

            Self::MissingReturn => 2301,
            Self::ThrowWithoutErrorType => 2302,
            Self::ErrorMemberNotFound => 2303,
            Self::MisplacedControlStatement => 2304,
            Self::NonExhaustiveMatch => 2305,
            Self::ReturnOutsideFunction => 2306,

            Self::EntryModuleNotFound => 2401,
            Self::EntryModuleNoMain => 2402,
            Self::MainNotPublic => 2403,
            Self::InvalidMainSignature => 2404,
            Self::UnusedVariable => 2405,
            Self::UnusedParameter => 2406,
            Self::UnusedFunction => 2407,
            Self::UnusedSymbol => 2408,

            Self::InvalidParameterModifier => 2501,
            Self::ParameterTypeRequired => 2502,

            Self::InternalError => 2900,
        }
    }

    /// Default severity for this code.
    ///
    /// Shadowing, import cycles, pointer type-cycles, empty modules and
    /// unused symbols never block later phases; everything else does.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::ShadowedSymbol
            | Self::ImportCycle
            | Self::TypeCycle
            | Self::EmptyModule
            | Self::UnusedVariable
            | Self::UnusedParameter
            | Self::UnusedFunction
            | Self::UnusedSymbol => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Renders the code as `E####` or `W####`.
    #[must_use]
    pub fn code_string(self) -> String {
        let prefix = match self.severity() {
            Severity::Error => "E",
            Severity::Warning | Severity::Info => "W",
        };
        format!("{}{:04}", prefix, self.number())
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

/// A single reported finding, ordered by emission time in the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
}

impl Diagnostic {
    /// Creates a diagnostic with the code's default severity.
    #[must_use]
    pub fn new(code: DiagnosticCode, message: impl Into<String>, span: Span) -> Self {
        Self {
            code,
            severity: code.severity(),
            message: message.into(),
            span,
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.code, self.message, self.span)
    }
}

impl std::error::Error for Diagnostic {}

impl miette::Diagnostic for Diagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(self.code.code_string()))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Info => miette::Severity::Advice,
        })
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = miette::LabeledSpan> + '_>> {
        let label = miette::LabeledSpan::new(None, self.span.start, self.span.len());
        Some(Box::new(std::iter::once(label)))
    }
}

/// Append-only diagnostic sink shared by every phase of one analysis run.
///
/// The sink never reorders entries; consumers see diagnostics in emission
/// order. An error budget (`max_errors`) lets the pipeline abort phase
/// execution once too many errors accumulated, and the optional duplicate
/// filter drops repeat reports of the same code at the same span.
#[derive(Debug)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
    max_errors: usize,
    filter_duplicates: bool,
    seen: HashSet<(DiagnosticCode, Span)>,
    error_count: usize,
    warning_count: usize,
}

impl Diagnostics {
    #[must_use]
    pub fn new(max_errors: usize) -> Self {
        Self {
            items: Vec::new(),
            max_errors,
            filter_duplicates: false,
            seen: HashSet::new(),
            error_count: 0,
            warning_count: 0,
        }
    }

    /// Enables dropping exact repeats (same code, same span).
    #[must_use]
    pub fn with_duplicate_filter(mut self, enabled: bool) -> Self {
        self.filter_duplicates = enabled;
        self
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        if self.filter_duplicates && !self.seen.insert((diagnostic.code, diagnostic.span)) {
            return;
        }
        match diagnostic.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Info => {}
        }
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        let mut diagnostic = Diagnostic::new(code, message, span);
        diagnostic.severity = Severity::Error;
        self.push(diagnostic);
    }

    pub fn warning(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        let mut diagnostic = Diagnostic::new(code, message, span);
        diagnostic.severity = Severity::Warning;
        self.push(diagnostic);
    }

    pub fn info(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        let mut diagnostic = Diagnostic::new(code, message, span);
        diagnostic.severity = Severity::Info;
        self.push(diagnostic);
    }

    /// Reports with the code's default severity.
    pub fn report(&mut self, code: DiagnosticCode, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::new(code, message, span));
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.error_count > 0
    }

    /// True once the error budget is spent; phases stop traversing then.
    #[must_use]
    pub fn at_error_limit(&self) -> bool {
        self.error_count >= self.max_errors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    /// Consumes the sink, yielding diagnostics in emission order.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    /// Clears all collected diagnostics and counters.
    pub fn reset(&mut self) {
        self.items.clear();
        self.seen.clear();
        self.error_count = 0;
        self.warning_count = 0;
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(100)
    }
}
