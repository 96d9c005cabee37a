//! Analysis engine for code analysis and diagnostic generation
//!
//! Provides the core analysis functionality for CLI and other consumers.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::diagnostic::Diagnostic;
use crate::parser::ParsedFile;
use crate::rules::{RuleRegistry, Severity};

/// Rule id for source that could not be parsed.
pub const PARSE_ERROR_RULE_ID: &str = "E000";

pub struct AnalysisEngine {
    registry: RuleRegistry,
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self {
            registry: RuleRegistry::with_builtin_rules(),
        }
    }

    pub fn with_config(config: &Config) -> Self {
        let mut registry = RuleRegistry::with_builtin_rules();
        registry.configure(config);
        Self { registry }
    }

    pub fn with_registry(registry: RuleRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &RuleRegistry {
        &self.registry
    }

    /// Diagnostics for one file, ordered by line, column and rule id.
    pub fn analyze(&self, file: &ParsedFile) -> Vec<Diagnostic> {
        let filename = &file.metadata().filename;
        debug!(file = %filename, "analyzing file");

        let mut diagnostics: Vec<Diagnostic> = file
            .errors()
            .iter()
            .map(|error| {
                Diagnostic::new(
                    PARSE_ERROR_RULE_ID,
                    Severity::Error,
                    &error.message,
                    filename,
                    error.line,
                    error.column,
                )
                .with_message_id("parseError")
            })
            .collect();

        match catch_unwind(AssertUnwindSafe(|| self.registry.run_all(file))) {
            Ok(found) => diagnostics.extend(found),
            Err(_) => error!(file = %filename, "analysis panicked, rule findings skipped"),
        }
        diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        diagnostics
    }

    pub fn analyze_source(&self, filename: &str, source: &str) -> Vec<Diagnostic> {
        self.analyze(&ParsedFile::from_source(filename, source))
    }

    /// Analyzes in-memory sources in parallel. Results are grouped by file
    /// name and ordered within each file.
    pub fn analyze_sources(&self, sources: &[(String, String)]) -> Vec<Diagnostic> {
        let mut diagnostics: Vec<Diagnostic> = sources
            .par_iter()
            .flat_map_iter(|(filename, source)| self.analyze_isolated(filename, source))
            .collect();

        diagnostics.sort_by(|a, b| {
            a.file
                .cmp(&b.file)
                .then_with(|| a.sort_key().cmp(&b.sort_key()))
        });
        diagnostics
    }

    /// A file whose parsing or analysis panics yields no diagnostics and
    /// leaves the other files untouched.
    fn analyze_isolated(&self, filename: &str, source: &str) -> Vec<Diagnostic> {
        catch_unwind(AssertUnwindSafe(|| self.analyze_source(filename, source))).unwrap_or_else(
            |_| {
                error!(file = filename, "analysis panicked, file skipped");
                Vec::new()
            },
        )
    }

    /// Reads and analyzes files from disk. Unreadable files are skipped.
    pub fn analyze_files<P: AsRef<Path>>(&self, paths: &[P]) -> Vec<Diagnostic> {
        let sources: Vec<(String, String)> = paths
            .iter()
            .filter_map(|path| {
                let path = path.as_ref();
                match std::fs::read_to_string(path) {
                    Ok(source) => Some((display_name(path), source)),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "skipping unreadable file");
                        None
                    }
                }
            })
            .collect();
        self.analyze_sources(&sources)
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn display_name(path: &Path) -> String {
    PathBuf::from(path).to_string_lossy().into_owned()
}
