//! Core types for the Drift semantic analyzer.
//!
//! This crate provides source spans, the diagnostic model (codes,
//! severities, and the append-only sink every analysis phase writes into),
//! and the internal fault type used for invariant violations that are not
//! user errors.

pub mod diagnostics;
pub mod error;
pub mod span;

pub use diagnostics::{Diagnostic, DiagnosticCode, Diagnostics, Severity};
pub use error::{Fault, Result};
pub use span::Span;
