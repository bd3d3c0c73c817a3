//! Internal fault type for invariant violations.
//!
//! A [`Fault`] is not a user diagnostic: it signals that the analyzer
//! itself broke an invariant (a dangling scope id, metadata missing on a
//! symbol the collector should have filled in). Each phase catches faults
//! at its boundary and converts them into a single `InternalError`
//! diagnostic instead of letting them escape.

use thiserror::Error;

/// Invariant violations raised by the analysis machinery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    #[error("scope id {0} does not exist in the scope store")]
    UnknownScope(usize),

    #[error("symbol id {0} does not exist in the symbol store")]
    UnknownSymbol(usize),

    #[error("symbol '{symbol}' is missing expected {what} metadata")]
    MissingMetadata { symbol: String, what: &'static str },

    #[error("function '{0}' has no stored body")]
    MissingBody(String),

    #[error("no current module while {0}")]
    NoCurrentModule(&'static str),

    #[error("context stack underflow: {0}")]
    StackUnderflow(&'static str),

    #[error("{0}")]
    Internal(String),
}

/// Result alias for fallible internal operations.
pub type Result<T, E = Fault> = std::result::Result<T, E>;
