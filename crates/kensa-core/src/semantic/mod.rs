//! Semantic analysis module
//!
//! Scopes, bindings, def/use chains, type narrowing for condition sites and
//! the mapping from analysis results back to source positions.

pub mod bindings;
pub mod defuse;
pub mod narrowing;
pub mod position;
pub mod scope;
pub mod site;

pub use bindings::{Binding, BindingId, BindingIndex, LocalBinding, extract_pattern_names};
pub use defuse::{DefSite, DefUseResolver, UseContext, UseSite};
pub use narrowing::{Classification, NarrowingEngine, VariantKind, VariantSet, Verdict, variant_kinds};
pub use position::{PositionReconciler, SearchScope, SourcePosition};
pub use scope::{AncestorIter, Scope, ScopeId, ScopeKind, ScopeTree};
pub use site::ResolvedSite;
