//! Analyzer configuration.

use crate::phase::AnalysisPhase;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunable knobs for one analysis run. Every field has a default; a
/// zeroed `[analysis]` table in `drift.toml` is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct AnalyzerOptions {
    /// Halt the pipeline at the first failing phase instead of running
    /// the remaining phases best-effort.
    pub strict_mode: bool,
    /// Error budget; phases stop traversing once this many errors exist.
    pub max_errors: usize,
    /// Stop after this phase. `None` runs the whole pipeline.
    pub stop_at_phase: Option<AnalysisPhase>,
    /// Allow the external cosmetic reordering pass to run afterwards.
    /// Only honored when analysis produced no errors.
    pub enable_formatting: bool,
    /// Drop repeat diagnostics with the same code at the same span.
    pub diagnostic_filter: bool,
    /// Verbosity for the embedding driver's tracing subscriber.
    pub debug: u8,
    /// Module that must provide the program entry point. Entry-point
    /// validation is skipped when unset.
    pub entry_module: Option<String>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_errors: 100,
            stop_at_phase: None,
            enable_formatting: false,
            diagnostic_filter: true,
            debug: 0,
            entry_module: None,
        }
    }
}

/// The `drift.toml` project file, as far as the analyzer cares about it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProjectFile {
    #[serde(default)]
    analysis: AnalyzerOptions,
}

impl AnalyzerOptions {
    /// Loads the `[analysis]` table from a `drift.toml` file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read {}", path.as_ref().display()))?;
        let project: ProjectFile =
            toml::from_str(&contents).with_context(|| "Failed to parse drift.toml")?;
        Ok(project.analysis)
    }

    #[must_use]
    pub fn with_entry_module(mut self, module: impl Into<String>) -> Self {
        self.entry_module = Some(module.into());
        self
    }

    #[must_use]
    pub fn with_strict_mode(mut self, strict: bool) -> Self {
        self.strict_mode = strict;
        self
    }

    #[must_use]
    pub fn with_max_errors(mut self, max_errors: usize) -> Self {
        self.max_errors = max_errors;
        self
    }

    #[must_use]
    pub fn with_stop_at(mut self, phase: AnalysisPhase) -> Self {
        self.stop_at_phase = Some(phase);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_best_effort() {
        let options = AnalyzerOptions::default();
        assert!(!options.strict_mode);
        assert_eq!(options.max_errors, 100);
        assert!(options.stop_at_phase.is_none());
        assert!(!options.enable_formatting);
        assert!(options.diagnostic_filter);
        assert!(options.entry_module.is_none());
    }

    #[test]
    fn parses_analysis_table() {
        let toml = r#"
            [analysis]
            strict-mode = true
            max-errors = 25
            stop-at-phase = "resolution"
            entry-module = "main"
        "#;
        let project: ProjectFile = toml::from_str(toml).unwrap();
        let options = project.analysis;
        assert!(options.strict_mode);
        assert_eq!(options.max_errors, 25);
        assert_eq!(options.stop_at_phase, Some(AnalysisPhase::Resolution));
        assert_eq!(options.entry_module.as_deref(), Some("main"));
    }

    #[test]
    fn missing_table_falls_back_to_defaults() {
        let project: ProjectFile = toml::from_str("").unwrap();
        assert_eq!(project.analysis.max_errors, 100);
    }
}
