//! Per-file analysis state handed to every rule.

use swc_common::Span;

use crate::config::CompilerConfig;
use crate::parser::ParsedFile;
use crate::program::ProgramModel;
use crate::semantic::{
    Binding, BindingIndex, DefUseResolver, PositionReconciler, ResolvedSite, ScopeId,
    SearchScope, SourcePosition,
};

/// Everything a rule may consult while checking one file.
///
/// Built once per file by the registry; rules never rebuild the binding
/// index or def/use chains themselves.
pub struct RuleContext<'r, 'm, 'a> {
    file: &'a ParsedFile,
    model: &'m ProgramModel<'a>,
    index: &'r BindingIndex<'m, 'a>,
    defuse: &'r DefUseResolver<'r, 'm, 'a>,
    sites: &'r [ResolvedSite<'a>],
    compiler: &'r CompilerConfig,
    reconciler: PositionReconciler<'a>,
}

impl<'r, 'm, 'a> RuleContext<'r, 'm, 'a> {
    pub fn new(
        model: &'m ProgramModel<'a>,
        index: &'r BindingIndex<'m, 'a>,
        defuse: &'r DefUseResolver<'r, 'm, 'a>,
        sites: &'r [ResolvedSite<'a>],
        compiler: &'r CompilerConfig,
    ) -> Self {
        let file = model.file();
        Self {
            file,
            model,
            index,
            defuse,
            sites,
            compiler,
            reconciler: PositionReconciler::new(file),
        }
    }

    pub fn file(&self) -> &'a ParsedFile {
        self.file
    }

    pub fn filename(&self) -> &str {
        &self.file.metadata().filename
    }

    pub fn model(&self) -> &'m ProgramModel<'a> {
        self.model
    }

    pub fn index(&self) -> &'r BindingIndex<'m, 'a> {
        self.index
    }

    pub fn defuse(&self) -> &'r DefUseResolver<'r, 'm, 'a> {
        self.defuse
    }

    pub fn sites(&self) -> &'r [ResolvedSite<'a>] {
        self.sites
    }

    pub fn compiler(&self) -> &'r CompilerConfig {
        self.compiler
    }

    pub fn resolve_binding(&self, name: &str, scope: ScopeId) -> Option<Binding> {
        self.index
            .resolve_binding(name, scope)
            .map(Binding::Real)
    }

    pub fn is_used(&self, binding: Binding) -> bool {
        self.defuse.is_used(binding)
    }

    pub fn position(&self, span: Span) -> Option<SourcePosition> {
        self.reconciler.span_position(span)
    }

    /// Position of `target` near `scope`; `None` suppresses the finding.
    pub fn locate(&self, target: &str, scope: SearchScope) -> Option<SourcePosition> {
        self.reconciler.locate(target, scope)
    }

    pub fn source_text(&self, span: Span) -> Option<&'a str> {
        self.file.span_text(span)
    }
}
