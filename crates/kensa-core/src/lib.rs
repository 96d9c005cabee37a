//! kensa: scope-aware liveness and condition-type checks for JavaScript and
//! TypeScript.
//!
//! A file is parsed with swc, lowered into a [`program::ProgramModel`], and
//! analysed by the binding index, def/use resolver and narrowing engine in
//! [`semantic`]. The rules in [`rules`] turn those results into
//! [`diagnostic::Diagnostic`]s; [`analysis::AnalysisEngine`] ties it together.

pub mod analysis;
pub mod config;
pub mod diagnostic;
pub mod parser;
pub mod program;
pub mod rules;
pub mod semantic;

pub use analysis::AnalysisEngine;
pub use diagnostic::{Diagnostic, Fix};
pub use parser::ParsedFile;
