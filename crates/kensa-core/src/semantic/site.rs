//! Condition sites paired with both of their representations.

use swc_common::Span;
use swc_ecma_ast::Expr;

use crate::program::{Operand, ProgramModel, SiteId, SiteOrigin, StmtId, StmtKind, UnitId};
use crate::semantic::scope::ScopeId;

/// A syntax node evaluated as a boolean together with the lowered statement
/// that tests it. Built once per file and passed to every lookup.
#[derive(Debug, Clone)]
pub struct ResolvedSite<'a> {
    pub id: SiteId,
    pub expr: &'a Expr,
    pub span: Span,
    pub stmt: StmtId,
    pub unit: UnitId,
    pub scope: ScopeId,
    pub origin: SiteOrigin,
    /// Operand of the `Branch` statement.
    pub operand: Operand,
}

impl<'a> ResolvedSite<'a> {
    pub fn resolve_all(model: &ProgramModel<'a>) -> Vec<Self> {
        model
            .sites()
            .filter_map(|site| {
                let expr = model.site_node(site.id)?;
                let StmtKind::Branch(operand) = &model.stmt(site.stmt).kind else {
                    return None;
                };
                Some(Self {
                    id: site.id,
                    expr,
                    span: site.span,
                    stmt: site.stmt,
                    unit: site.unit,
                    scope: site.scope,
                    origin: site.origin,
                    operand: operand.clone(),
                })
            })
            .collect()
    }
}
