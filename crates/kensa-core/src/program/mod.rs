//! Program model: the syntax tree paired with its lowered representation.
//!
//! A [`ProgramModel`] is built once per file and borrows the parsed module,
//! so condition sites can hand out the exact syntax node they were
//! registered for. Everything in here is immutable after construction.

pub mod ir;
mod lower;
pub mod types;

use std::collections::HashMap;

use id_arena::Arena;
use swc_common::{BytePos, Span};
use swc_ecma_ast::Expr;

use crate::parser::ParsedFile;
use crate::semantic::scope::{ScopeId, ScopeTree};

pub use ir::{
    CallTarget, ClassId, ClassInfo, ConditionSite, DeclId, DeclKind, Declaration, EnumInfo,
    ExportRef, FieldInfo, ImportKind, ImportRef, Literal, LoweredStmt, MemberKey, NameRef,
    ObjectShape, Operand, PatternShape, Place, Provenance, Rvalue, SiteId, SiteOrigin,
    StmtId, StmtKind, TempId, Unit, UnitId, UnitKind,
};
pub use types::{LiteralType, TypeRef};

pub struct ProgramModel<'a> {
    file: &'a ParsedFile,
    scopes: ScopeTree,
    units: Arena<Unit>,
    stmts: Arena<LoweredStmt>,
    decls: Arena<Declaration>,
    scope_decls: HashMap<ScopeId, HashMap<String, ir::DeclId>>,
    classes: Arena<ClassInfo>,
    interfaces: HashMap<DeclId, ObjectShape>,
    enums: HashMap<DeclId, EnumInfo>,
    sites: Arena<ConditionSite>,
    site_nodes: Vec<&'a Expr>,
    exports: Vec<ExportRef>,
    imports: Vec<ImportRef>,
    root_unit: UnitId,
    has_jsx: bool,
}

impl std::fmt::Debug for ProgramModel<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgramModel")
            .field("file", &self.file.metadata().filename)
            .field("units", &self.units.len())
            .field("stmts", &self.stmts.len())
            .field("decls", &self.decls.len())
            .field("sites", &self.sites.len())
            .finish()
    }
}

impl<'a> ProgramModel<'a> {
    /// Lowers a parsed file. Returns `None` when parsing produced no module.
    pub fn build(file: &'a ParsedFile) -> Option<Self> {
        let module = file.module()?;
        Some(lower::Lowerer::new(file, module).lower_module(module))
    }

    pub fn file(&self) -> &'a ParsedFile {
        self.file
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn root_unit(&self) -> UnitId {
        self.root_unit
    }

    pub fn unit(&self, id: UnitId) -> &Unit {
        &self.units[id]
    }

    pub fn units(&self) -> impl Iterator<Item = &Unit> {
        self.units.iter().map(|(_, unit)| unit)
    }

    pub fn stmt(&self, id: StmtId) -> &LoweredStmt {
        &self.stmts[id]
    }

    pub fn stmts(&self) -> impl Iterator<Item = &LoweredStmt> {
        self.stmts.iter().map(|(_, stmt)| stmt)
    }

    pub fn unit_stmts(&self, id: UnitId) -> impl Iterator<Item = &LoweredStmt> {
        self.units[id].stmts.iter().map(|&stmt| &self.stmts[stmt])
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id]
    }

    pub fn decls(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter().map(|(_, decl)| decl)
    }

    /// Declarations registered by name directly in `scope`.
    pub fn decls_in_scope(&self, scope: ScopeId) -> Option<&HashMap<String, DeclId>> {
        self.scope_decls.get(&scope)
    }

    pub fn class(&self, id: ClassId) -> &ClassInfo {
        &self.classes[id]
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter().map(|(_, class)| class)
    }

    pub fn interface(&self, decl: DeclId) -> Option<&ObjectShape> {
        self.interfaces.get(&decl)
    }

    pub fn enum_info(&self, decl: DeclId) -> Option<&EnumInfo> {
        self.enums.get(&decl)
    }

    pub fn site(&self, id: SiteId) -> &ConditionSite {
        &self.sites[id]
    }

    pub fn sites(&self) -> impl Iterator<Item = &ConditionSite> {
        self.sites.iter().map(|(_, site)| site)
    }

    /// Syntax node a condition site was registered for.
    pub fn site_node(&self, id: SiteId) -> Option<&'a Expr> {
        self.site_nodes.get(id.index()).copied()
    }

    pub fn exports(&self) -> &[ExportRef] {
        &self.exports
    }

    pub fn imports(&self) -> &[ImportRef] {
        &self.imports
    }

    pub fn has_jsx(&self) -> bool {
        self.has_jsx
    }

    /// Innermost lexical scope containing a source position.
    pub fn scope_at(&self, pos: BytePos) -> Option<ScopeId> {
        self.scopes.innermost_at(pos)
    }

    /// Unit whose root scope encloses `scope`.
    pub fn unit_of_scope(&self, scope: ScopeId) -> Option<UnitId> {
        let root = self.scopes.enclosing_unit_scope(scope);
        self.units().find(|unit| unit.scope == root).map(|unit| unit.id)
    }

    /// Whether `unit` is `ancestor` or nested inside it.
    pub fn unit_within(&self, unit: UnitId, ancestor: UnitId) -> bool {
        let mut current = Some(unit);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.units[id].parent;
        }
        false
    }

    pub fn span_text(&self, span: Span) -> Option<&'a str> {
        self.file.span_text(span)
    }
}
