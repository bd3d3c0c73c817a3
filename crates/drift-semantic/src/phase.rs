//! The phase protocol the pipeline drives.

use drift_ast::Program;
use serde::{Deserialize, Serialize};

/// Analysis phases in their fixed execution order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisPhase {
    Collection,
    Resolution,
    TypeValidation,
    SemanticValidation,
}

impl AnalysisPhase {
    pub const ALL: [Self; 4] = [
        Self::Collection,
        Self::Resolution,
        Self::TypeValidation,
        Self::SemanticValidation,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Collection => "collection",
            Self::Resolution => "resolution",
            Self::TypeValidation => "type validation",
            Self::SemanticValidation => "semantic validation",
        }
    }
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One step of the pipeline.
///
/// `handle` runs the phase over the whole program and returns `true` when
/// it added no new errors. Phases never roll back each other's mutations;
/// internal faults are caught inside `handle` and surface as a single
/// internal-error diagnostic.
pub trait Phase {
    fn phase(&self) -> AnalysisPhase;

    fn handle(&mut self, program: &Program) -> bool;

    /// Clears phase-local statistics and context. Does not touch the
    /// scope store.
    fn reset(&mut self);

    /// Emits phase statistics through `tracing`.
    fn log_statistics(&self);
}
