//! Semantic analysis for Drift programs.
//!
//! The analyzer takes a parsed [`Program`](drift_ast::Program) through four
//! phases: collection populates the scope tree with every declared symbol,
//! resolution binds identifiers and imports to those symbols, type
//! validation infers expression types and checks compile-time constant
//! bounds, and semantic validation inspects the whole program for
//! entry-point shape, unused symbols, and import cycles. [`Analyzer`]
//! drives the phases in order; [`analyze`] runs one pass with default
//! options.

pub mod builtins;
pub mod collect;
pub mod context;
pub mod eval;
pub mod infer;
pub mod options;
pub mod phase;
pub mod pipeline;
pub mod program;
pub mod resolve;
pub mod scope;
pub mod store;
pub mod symbols;
pub mod types;
pub mod validate;

pub use builtins::{BuiltinConfig, BuiltinFunction, BuiltinType};
pub use collect::Collector;
pub use context::{ContextTracker, ExprContext};
pub use eval::{ComptimeEvaluator, EvalContext, EvalValue};
pub use infer::TypeInference;
pub use options::AnalyzerOptions;
pub use phase::{AnalysisPhase, Phase};
pub use pipeline::{AnalysisResult, Analyzer, analyze};
pub use program::SemanticValidator;
pub use resolve::Resolver;
pub use scope::{Scope, ScopeId, ScopeKind};
pub use store::ScopeStore;
pub use symbols::{Symbol, SymbolId, SymbolKind, SymbolMeta};
pub use types::{FloatType, FunctionType, IntType, NamedType, Type, TypeKind};
pub use validate::{ExhaustivenessOracle, TypeValidator, VariantCoverage};
