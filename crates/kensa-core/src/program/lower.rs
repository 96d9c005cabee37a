//! Lowering from the swc syntax tree to the unit/statement representation.
//!
//! One top-down pass: scopes, declarations, statements and condition sites
//! are all allocated in visitation order, so their arena ids are stable for
//! a given source text.

use std::collections::HashMap;

use id_arena::Arena;
use swc_common::{Span, Spanned};
use swc_ecma_ast::{
    ArrayPat, ArrowExpr, AssignExpr, AssignOp, AssignTarget, AssignTargetPat, BinExpr, BinaryOp,
    BindingIdent, BlockStmtOrExpr, CallExpr, Callee, Class, ClassMember, Decl, DefaultDecl,
    Decorator, ExportSpecifier, Expr, ForHead, Function, Ident, ImportSpecifier, JSXAttrOrSpread,
    JSXAttrValue, JSXElement, JSXElementChild, JSXElementName, JSXExpr, JSXObject, Lit,
    MemberExpr, MemberProp, Module, ModuleDecl, ModuleExportName, ModuleItem, ObjectLit,
    ObjectPat, ObjectPatProp, OptChainBase, ParamOrTsParamProp, Pat, Prop, PropName,
    PropOrSpread, SimpleAssignTarget, Stmt, SuperProp, TsEntityName, TsEnumDecl,
    TsExprWithTypeArgs, TsInterfaceDecl, TsModuleDecl, TsModuleName, TsModuleRef,
    TsNamespaceBody, TsParamPropParam, TsTypeAliasDecl, TsTypeElement, TsTypeParamDecl,
    TsTypeQuery, TsTypeQueryExpr, TsTypeRef, UnaryOp, UpdateExpr, UpdateOp, VarDecl,
    VarDeclKind, VarDeclarator,
};
use swc_ecma_visit::{Visit, VisitWith};

use super::ProgramModel;
use super::ir::{
    CallTarget, ClassId, ClassInfo, ConditionSite, DeclId, DeclKind, Declaration, EnumInfo,
    ExportRef, FieldInfo, ImportKind, ImportRef, Literal, LoweredStmt, MemberKey, NameRef,
    ObjectShape, Operand, PatternShape, Place, Provenance, Rvalue, SiteOrigin, StmtId,
    StmtKind, TempId, Unit, UnitId, UnitKind,
};
use super::types::{LiteralType, TypeRef, entity_root};
use crate::parser::ParsedFile;
use crate::semantic::scope::{ScopeId, ScopeKind, ScopeTree};

/// Array methods whose first argument is a predicate evaluated as a boolean.
const ARRAY_PREDICATES: &[&str] = &[
    "filter",
    "find",
    "findIndex",
    "findLast",
    "findLastIndex",
    "some",
    "every",
];

#[derive(Debug, Clone, Copy)]
enum BindMode {
    Declare(DeclKind),
    Assign,
}

struct UnitHeader {
    kind: UnitKind,
    name: Option<(String, Span)>,
    span: Span,
    class: Option<ClassId>,
    has_body: bool,
    return_type: Option<TypeRef>,
}

/// Collects binding names referenced from type positions.
#[derive(Default)]
struct TypeRefCollector {
    refs: Vec<(String, Span)>,
}

impl TypeRefCollector {
    fn push_entity(&mut self, name: &TsEntityName) {
        let (root, span) = entity_root(name);
        self.refs.push((root.to_string(), span));
    }
}

impl Visit for TypeRefCollector {
    fn visit_ts_type_ref(&mut self, node: &TsTypeRef) {
        self.push_entity(&node.type_name);
        node.visit_children_with(self);
    }

    fn visit_ts_type_query(&mut self, node: &TsTypeQuery) {
        if let TsTypeQueryExpr::TsEntityName(name) = &node.expr_name {
            self.push_entity(name);
        }
        node.visit_children_with(self);
    }

    fn visit_ts_expr_with_type_args(&mut self, node: &TsExprWithTypeArgs) {
        if let Some(ident) = expr_root(&node.expr) {
            self.refs.push((ident.sym.to_string(), ident.span));
        }
        node.visit_children_with(self);
    }
}

pub(super) struct Lowerer<'a> {
    file: &'a ParsedFile,
    scopes: ScopeTree,
    units: Arena<Unit>,
    stmts: Arena<LoweredStmt>,
    decls: Arena<Declaration>,
    scope_decls: HashMap<ScopeId, HashMap<String, DeclId>>,
    classes: Arena<ClassInfo>,
    interfaces: HashMap<DeclId, ObjectShape>,
    enums: HashMap<DeclId, EnumInfo>,
    sites: Arena<ConditionSite>,
    site_nodes: Vec<&'a Expr>,
    exports: Vec<ExportRef>,
    imports: Vec<ImportRef>,
    has_jsx: bool,
    root_unit: UnitId,
    unit: UnitId,
    scope: ScopeId,
    origin: Span,
    lossy: bool,
    ambient: bool,
    exporting: bool,
    next_temp: u32,
}

impl<'a> Lowerer<'a> {
    pub(super) fn new(file: &'a ParsedFile, module: &'a Module) -> Self {
        let mut scopes = ScopeTree::new();
        let scope = scopes.create_scope(ScopeKind::Module, None, module.span);
        let mut units = Arena::new();
        let root_unit = units.alloc_with_id(|id| Unit {
            id,
            kind: UnitKind::File,
            name: None,
            name_span: None,
            parent: None,
            scope,
            span: module.span,
            class: None,
            params: Vec::new(),
            has_body: true,
            ambient: file.metadata().is_declaration_file,
            return_type: None,
            stmts: Vec::new(),
        });

        Self {
            file,
            scopes,
            units,
            stmts: Arena::new(),
            decls: Arena::new(),
            scope_decls: HashMap::new(),
            classes: Arena::new(),
            interfaces: HashMap::new(),
            enums: HashMap::new(),
            sites: Arena::new(),
            site_nodes: Vec::new(),
            exports: Vec::new(),
            imports: Vec::new(),
            has_jsx: false,
            root_unit,
            unit: root_unit,
            scope,
            origin: module.span,
            lossy: false,
            ambient: file.metadata().is_declaration_file,
            exporting: false,
            next_temp: 0,
        }
    }

    pub(super) fn lower_module(mut self, module: &'a Module) -> ProgramModel<'a> {
        for item in &module.body {
            self.lower_module_item(item);
        }
        self.mark_exported_refs();

        tracing::debug!(
            file = %self.file.metadata().filename,
            units = self.units.len(),
            stmts = self.stmts.len(),
            sites = self.sites.len(),
            "lowered module"
        );

        ProgramModel {
            file: self.file,
            scopes: self.scopes,
            units: self.units,
            stmts: self.stmts,
            decls: self.decls,
            scope_decls: self.scope_decls,
            classes: self.classes,
            interfaces: self.interfaces,
            enums: self.enums,
            sites: self.sites,
            site_nodes: self.site_nodes,
            exports: self.exports,
            imports: self.imports,
            root_unit: self.root_unit,
            has_jsx: self.has_jsx,
        }
    }

    // ==================== Bookkeeping ====================

    fn set_origin(&mut self, span: Span) {
        self.origin = span;
        self.lossy = false;
    }

    fn emit(&mut self, kind: StmtKind, span: Span) -> StmtId {
        let (unit, scope, origin, lossy) = (self.unit, self.scope, self.origin, self.lossy);
        let id = self.stmts.alloc_with_id(|id| LoweredStmt {
            id,
            unit,
            scope,
            kind,
            span,
            origin,
            lossy,
        });
        self.units[unit].stmts.push(id);
        id
    }

    fn into_operand(&mut self, value: Rvalue, span: Span) -> Operand {
        match value {
            Rvalue::Use(op) => op,
            other => {
                let temp = TempId(self.next_temp);
                self.next_temp += 1;
                self.emit(
                    StmtKind::Assign {
                        target: Place::Temp(temp),
                        value: other,
                    },
                    span,
                );
                Operand::Temp(temp)
            }
        }
    }

    /// Like [`Self::into_operand`], but always binds a fresh temporary, so a
    /// destructured source is read once through `%tN = source`.
    fn alias(&mut self, value: Rvalue, span: Span) -> Operand {
        let temp = TempId(self.next_temp);
        self.next_temp += 1;
        self.emit(
            StmtKind::Assign {
                target: Place::Temp(temp),
                value,
            },
            span,
        );
        Operand::Temp(temp)
    }

    fn hoist_scope(&self) -> ScopeId {
        self.scopes.enclosing_unit_scope(self.scope)
    }

    fn declare(&mut self, name: &str, kind: DeclKind, span: Span, scope: ScopeId) -> DeclId {
        if let Some(&existing) = self.scope_decls.get(&scope).and_then(|names| names.get(name)) {
            self.decls[existing].exported |= self.exporting;
            return existing;
        }

        let (unit, origin, exported, ambient) =
            (self.unit, self.origin, self.exporting, self.ambient);
        let id = self.decls.alloc_with_id(|id| Declaration {
            id,
            name: name.to_string(),
            kind,
            scope,
            unit,
            span,
            origin,
            declared_type: None,
            exported,
            ambient,
            decorated: false,
            provenance: Provenance::Plain,
            param_index: None,
            param_property: false,
            body_unit: None,
            class: None,
        });
        self.scope_decls
            .entry(scope)
            .or_default()
            .insert(name.to_string(), id);
        id
    }

    fn declare_binding(&mut self, binding: &'a BindingIdent, kind: DeclKind) -> DeclId {
        let scope = match kind {
            DeclKind::Var | DeclKind::Function => self.hoist_scope(),
            _ => self.scope,
        };
        let id = self.declare(binding.id.sym.as_str(), kind, binding.id.span, scope);
        if let Some(ann) = &binding.type_ann {
            let mut declared = TypeRef::from_ann(ann, self.file);
            if binding.id.optional {
                declared = declared.or_undefined();
            }
            self.decls[id].declared_type = Some(declared);
            self.collect_type_uses(&**ann);
        }
        id
    }

    fn with_scope<R>(&mut self, kind: ScopeKind, span: Span, f: impl FnOnce(&mut Self) -> R) -> R {
        let scope = self.scopes.create_scope(kind, Some(self.scope), span);
        let saved = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = saved;
        result
    }

    /// `export { a }`, `export default a` and `export = a` export a binding
    /// declared elsewhere; flag the declaration they resolve to.
    fn mark_exported_refs(&mut self) {
        for export in &self.exports {
            let target = self.scopes.ancestors(export.scope).find_map(|scope| {
                self.scope_decls
                    .get(&scope.id)
                    .and_then(|names| names.get(&export.name))
                    .copied()
            });
            if let Some(decl) = target {
                self.decls[decl].exported = true;
            }
        }
    }

    fn with_ambient<R>(&mut self, ambient: bool, f: impl FnOnce(&mut Self) -> R) -> R {
        let next = self.ambient || ambient;
        let saved = std::mem::replace(&mut self.ambient, next);
        let result = f(self);
        self.ambient = saved;
        result
    }

    fn in_unit(&mut self, header: UnitHeader, f: impl FnOnce(&mut Self)) -> UnitId {
        let scope_kind = match header.kind {
            UnitKind::File => ScopeKind::Module,
            UnitKind::Namespace => ScopeKind::Namespace,
            UnitKind::ClassInit => ScopeKind::ClassInit,
            UnitKind::Function => ScopeKind::Function,
            UnitKind::Method => ScopeKind::Method,
            UnitKind::Arrow => ScopeKind::ArrowFunction,
            UnitKind::StaticBlock => ScopeKind::StaticBlock,
        };
        let scope = self
            .scopes
            .create_scope(scope_kind, Some(self.scope), header.span);
        let parent = self.unit;
        let class = match header.kind {
            UnitKind::Arrow => self.units[parent].class,
            _ => header.class,
        };
        let ambient = self.ambient;
        let (name, name_span) = match header.name {
            Some((name, span)) => (Some(name), Some(span)),
            None => (None, None),
        };
        let unit = self.units.alloc_with_id(|id| Unit {
            id,
            kind: header.kind,
            name,
            name_span,
            parent: Some(parent),
            scope,
            span: header.span,
            class,
            params: Vec::new(),
            has_body: header.has_body,
            ambient,
            return_type: header.return_type,
            stmts: Vec::new(),
        });

        let saved = (self.unit, self.scope, self.origin, self.lossy, self.exporting);
        self.unit = unit;
        self.scope = scope;
        self.exporting = false;
        f(self);
        (self.unit, self.scope, self.origin, self.lossy, self.exporting) = saved;
        unit
    }

    fn register_site(&mut self, expr: &'a Expr, stmt: StmtId, origin: SiteOrigin) {
        let (unit, scope) = (self.unit, self.scope);
        self.sites.alloc_with_id(|id| ConditionSite {
            id,
            span: expr.span(),
            stmt,
            unit,
            scope,
            origin,
        });
        self.site_nodes.push(expr);
    }

    fn collect_type_uses<N>(&mut self, node: &N)
    where
        N: VisitWith<TypeRefCollector>,
    {
        let mut collector = TypeRefCollector::default();
        node.visit_with(&mut collector);
        for (name, span) in collector.refs {
            self.emit(StmtKind::TypeUse(NameRef { name, span }), span);
        }
    }

    fn declare_type_params(&mut self, params: &'a TsTypeParamDecl) {
        for param in &params.params {
            let scope = self.scope;
            let id = self.declare(param.name.sym.as_str(), DeclKind::TypeParam, param.name.span, scope);
            let bound = param
                .constraint
                .as_deref()
                .or(param.default.as_deref())
                .map(|ty| TypeRef::from_ts(ty, self.file));
            self.decls[id].declared_type = bound;
        }
        self.collect_type_uses(params);
    }

    fn string_value(&self, span: Span) -> String {
        self.file
            .span_text(span)
            .map(|raw| raw.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string())
            .unwrap_or_default()
    }

    fn prop_name(&self, key: &PropName) -> Option<String> {
        match key {
            PropName::Ident(ident) => Some(ident.sym.to_string()),
            PropName::Str(s) => Some(self.string_value(s.span)),
            PropName::Num(n) => Some(n.value.to_string()),
            PropName::Computed(_) | PropName::BigInt(_) => None,
        }
    }

    fn lower_prop_key(&mut self, key: &'a PropName) -> Option<Operand> {
        match key {
            PropName::Computed(computed) => Some(self.lower_expr(&computed.expr)),
            _ => None,
        }
    }

    fn decorator_name(&self, decorator: &Decorator) -> String {
        let callee = match unparen(&decorator.expr) {
            Expr::Call(call) => match &call.callee {
                Callee::Expr(callee) => callee.as_ref(),
                _ => decorator.expr.as_ref(),
            },
            other => other,
        };
        match callee {
            Expr::Ident(ident) => ident.sym.to_string(),
            other => self
                .file
                .span_text(other.span())
                .unwrap_or_default()
                .to_string(),
        }
    }

    fn lower_decorators(&mut self, decorators: &'a [Decorator]) {
        for decorator in decorators {
            let op = self.lower_expr(&decorator.expr);
            self.emit(StmtKind::Eval(Rvalue::Use(op)), decorator.span);
        }
    }

    fn literal(&self, lit: &Lit) -> Literal {
        match lit {
            Lit::Str(s) => Literal::Str {
                non_empty: self.file.span_text(s.span).map(str::len).unwrap_or(3) > 2,
            },
            Lit::Bool(b) => Literal::Bool(b.value),
            Lit::Null(_) => Literal::Null,
            Lit::Num(n) => Literal::Num {
                non_zero: n.value != 0.0 && !n.value.is_nan(),
            },
            Lit::BigInt(b) => Literal::Num {
                non_zero: self
                    .file
                    .span_text(b.span)
                    .map(|raw| raw.trim_end_matches('n').chars().any(|c| c.is_ascii_digit() && c != '0'))
                    .unwrap_or(true),
            },
            Lit::Regex(_) => Literal::Regex,
            Lit::JSXText(_) => Literal::Str { non_empty: true },
        }
    }

    // ==================== Module items and declarations ====================

    fn lower_module_item(&mut self, item: &'a ModuleItem) {
        match item {
            ModuleItem::Stmt(stmt) => self.lower_stmt(stmt),
            ModuleItem::ModuleDecl(decl) => self.lower_module_decl(decl),
        }
    }

    fn lower_module_decl(&mut self, decl: &'a ModuleDecl) {
        match decl {
            ModuleDecl::Import(import) => {
                self.set_origin(import.span);
                let source = self.string_value(import.src.span);
                for specifier in &import.specifiers {
                    let (local, kind, type_only) = match specifier {
                        ImportSpecifier::Named(named) => {
                            let imported = match &named.imported {
                                Some(ModuleExportName::Ident(ident)) => ident.sym.to_string(),
                                Some(ModuleExportName::Str(s)) => self.string_value(s.span),
                                None => named.local.sym.to_string(),
                            };
                            (&named.local, ImportKind::Named(imported), named.is_type_only)
                        }
                        ImportSpecifier::Default(default) => {
                            (&default.local, ImportKind::Default, false)
                        }
                        ImportSpecifier::Namespace(namespace) => {
                            (&namespace.local, ImportKind::Namespace, false)
                        }
                    };
                    let scope = self.scope;
                    self.declare(local.sym.as_str(), DeclKind::Import, local.span, scope);
                    self.emit(StmtKind::Bind(name_ref(local)), local.span);
                    self.imports.push(ImportRef {
                        local: local.sym.to_string(),
                        source: source.clone(),
                        kind,
                        span: local.span,
                        type_only: type_only || import.type_only,
                    });
                }
            }
            ModuleDecl::ExportDecl(export) => {
                let saved = std::mem::replace(&mut self.exporting, true);
                self.lower_decl(&export.decl);
                self.exporting = saved;
            }
            ModuleDecl::ExportNamed(named) => {
                if named.src.is_some() {
                    return;
                }
                for specifier in &named.specifiers {
                    if let ExportSpecifier::Named(specifier) = specifier
                        && let ModuleExportName::Ident(orig) = &specifier.orig
                    {
                        self.exports.push(ExportRef {
                            name: orig.sym.to_string(),
                            span: orig.span,
                            scope: self.scope,
                        });
                    }
                }
            }
            ModuleDecl::ExportDefaultDecl(export) => {
                let saved = std::mem::replace(&mut self.exporting, true);
                match &export.decl {
                    DefaultDecl::Class(class) => {
                        self.set_origin(export.span);
                        self.lower_class_decl(class.ident.as_ref(), &class.class, false);
                    }
                    DefaultDecl::Fn(function) => {
                        self.lower_fn_decl(function.ident.as_ref(), &function.function, false);
                    }
                    DefaultDecl::TsInterfaceDecl(interface) => self.lower_interface(interface),
                }
                self.exporting = saved;
            }
            ModuleDecl::ExportDefaultExpr(export) => {
                self.lower_exported_expr(&export.expr, export.span);
            }
            ModuleDecl::TsExportAssignment(export) => {
                self.lower_exported_expr(&export.expr, export.span);
            }
            ModuleDecl::TsImportEquals(import) => {
                self.set_origin(import.span);
                let saved = std::mem::replace(&mut self.exporting, import.is_export);
                let scope = self.scope;
                self.declare(import.id.sym.as_str(), DeclKind::Import, import.id.span, scope);
                self.exporting = saved;
                self.emit(StmtKind::Bind(name_ref(&import.id)), import.id.span);
                if let TsModuleRef::TsEntityName(name) = &import.module_ref {
                    let (root, span) = entity_root(name);
                    let name = NameRef {
                        name: root.to_string(),
                        span,
                    };
                    self.emit(StmtKind::Eval(Rvalue::Use(Operand::Local(name))), span);
                }
            }
            ModuleDecl::ExportAll(_) | ModuleDecl::TsNamespaceExport(_) => {}
        }
    }

    fn lower_exported_expr(&mut self, expr: &'a Expr, span: Span) {
        self.set_origin(span);
        if let Expr::Ident(ident) = unparen(expr) {
            self.exports.push(ExportRef {
                name: ident.sym.to_string(),
                span: ident.span,
                scope: self.scope,
            });
        }
        let value = self.lower_rvalue(expr);
        self.emit(StmtKind::Eval(value), expr.span());
    }

    fn lower_decl(&mut self, decl: &'a Decl) {
        match decl {
            Decl::Class(class) => {
                self.set_origin(class.class.span);
                self.lower_class_decl(Some(&class.ident), &class.class, class.declare);
            }
            Decl::Fn(function) => {
                self.lower_fn_decl(Some(&function.ident), &function.function, function.declare)
            }
            Decl::Var(var) => self.lower_var_decl(var),
            Decl::Using(using) => {
                for declarator in &using.decls {
                    self.lower_declarator(declarator, DeclKind::Using);
                }
            }
            Decl::TsInterface(interface) => self.lower_interface(interface),
            Decl::TsTypeAlias(alias) => self.lower_type_alias(alias),
            Decl::TsEnum(decl) => self.lower_enum(decl),
            Decl::TsModule(module) => self.lower_ts_module(module),
        }
    }

    fn lower_fn_decl(&mut self, ident: Option<&'a Ident>, function: &'a Function, declare: bool) {
        self.set_origin(function.span);
        self.with_ambient(declare, |this| {
            let decl = ident.map(|ident| {
                let scope = this.hoist_scope();
                let id = this.declare(ident.sym.as_str(), DeclKind::Function, ident.span, scope);
                this.emit(StmtKind::Bind(name_ref(ident)), ident.span);
                id
            });
            let name = ident.map(|ident| (ident.sym.to_string(), ident.span));
            let unit = this.lower_function(function, UnitKind::Function, name, None);
            if let Some(decl) = decl
                && function.body.is_some()
            {
                this.decls[decl].body_unit = Some(unit);
            }
        });
    }

    fn lower_var_decl(&mut self, var: &'a VarDecl) {
        let kind = match var.kind {
            VarDeclKind::Var => DeclKind::Var,
            VarDeclKind::Let => DeclKind::Let,
            VarDeclKind::Const => DeclKind::Const,
        };
        self.with_ambient(var.declare, |this| {
            for declarator in &var.decls {
                this.lower_declarator(declarator, kind);
            }
        });
    }

    fn lower_declarator(&mut self, declarator: &'a VarDeclarator, kind: DeclKind) {
        self.set_origin(declarator.span);
        let value = declarator.init.as_ref().map(|init| self.lower_rvalue(init));

        match (&declarator.name, value) {
            (Pat::Ident(binding), Some(value)) => {
                let decl = self.declare_binding(binding, kind);
                if let Rvalue::Closure(unit) = &value {
                    self.decls[decl].body_unit = Some(*unit);
                    if self.units[*unit].name.is_none() {
                        self.units[*unit].name = Some(binding.id.sym.to_string());
                        self.units[*unit].name_span = Some(binding.id.span);
                    }
                }
                self.emit(
                    StmtKind::Assign {
                        target: Place::Local(name_ref(&binding.id)),
                        value,
                    },
                    declarator.span,
                );
            }
            (Pat::Ident(binding), None) => {
                self.declare_binding(binding, kind);
                self.emit(StmtKind::Bind(name_ref(&binding.id)), binding.id.span);
            }
            (pattern, Some(value)) => {
                let op = self.alias(value, declarator.span);
                self.bind_pattern(pattern, Some(op), BindMode::Declare(kind), Provenance::Plain);
            }
            (pattern, None) => {
                self.bind_pattern(pattern, None, BindMode::Declare(kind), Provenance::Plain);
            }
        }
    }

    fn lower_interface(&mut self, interface: &'a TsInterfaceDecl) {
        self.set_origin(interface.span);
        self.with_ambient(interface.declare, |this| {
            let scope = this.scope;
            let decl = this.declare(interface.id.sym.as_str(), DeclKind::Interface, interface.id.span, scope);
            this.emit(StmtKind::Bind(name_ref(&interface.id)), interface.id.span);

            let mut shape = ObjectShape::default();
            this.with_scope(ScopeKind::Block, interface.span, |this| {
                if let Some(params) = &interface.type_params {
                    this.declare_type_params(params);
                }
                for member in &interface.body.body {
                    this.record_interface_member(member, &mut shape);
                }
                this.collect_type_uses(&interface.extends);
                this.collect_type_uses(&interface.body);
            });
            this.interfaces.entry(decl).or_default().merge(shape);
        });
    }

    fn record_interface_member(&self, member: &TsTypeElement, shape: &mut ObjectShape) {
        match member {
            TsTypeElement::TsPropertySignature(prop) => {
                if let Some(name) = expr_key_name(&prop.key) {
                    let declared = prop
                        .type_ann
                        .as_ref()
                        .map(|ann| TypeRef::from_ann(ann, self.file))
                        .unwrap_or(TypeRef::Any);
                    let declared = if prop.optional {
                        declared.or_undefined()
                    } else {
                        declared
                    };
                    shape.fields.insert(name, declared);
                }
            }
            TsTypeElement::TsGetterSignature(getter) => {
                if let Some(name) = expr_key_name(&getter.key) {
                    let declared = getter
                        .type_ann
                        .as_ref()
                        .map(|ann| TypeRef::from_ann(ann, self.file))
                        .unwrap_or(TypeRef::Any);
                    shape.fields.insert(name, declared);
                }
            }
            TsTypeElement::TsMethodSignature(method) => {
                if let Some(name) = expr_key_name(&method.key) {
                    let returns = method
                        .type_ann
                        .as_ref()
                        .map(|ann| TypeRef::from_ann(ann, self.file))
                        .unwrap_or(TypeRef::Any);
                    shape.methods.insert(name, returns);
                }
            }
            _ => {}
        }
    }

    fn lower_type_alias(&mut self, alias: &'a TsTypeAliasDecl) {
        self.set_origin(alias.span);
        self.with_ambient(alias.declare, |this| {
            let scope = this.scope;
            let decl = this.declare(alias.id.sym.as_str(), DeclKind::TypeAlias, alias.id.span, scope);
            this.decls[decl].declared_type = Some(TypeRef::from_ts(&alias.type_ann, this.file));
            this.emit(StmtKind::Bind(name_ref(&alias.id)), alias.id.span);
            this.with_scope(ScopeKind::Block, alias.span, |this| {
                if let Some(params) = &alias.type_params {
                    this.declare_type_params(params);
                }
                this.collect_type_uses(&*alias.type_ann);
            });
        });
    }

    fn lower_enum(&mut self, decl: &'a TsEnumDecl) {
        self.set_origin(decl.span);
        self.with_ambient(decl.declare, |this| {
            let scope = this.scope;
            let id = this.declare(decl.id.sym.as_str(), DeclKind::Enum, decl.id.span, scope);
            this.emit(StmtKind::Bind(name_ref(&decl.id)), decl.id.span);

            let mut members = Vec::with_capacity(decl.members.len());
            let mut next_value = Some(0.0_f64);
            for member in &decl.members {
                let kind = match member.init.as_deref() {
                    Some(Expr::Lit(Lit::Num(n))) => {
                        next_value = Some(n.value + 1.0);
                        LiteralType::Num(n.value != 0.0)
                    }
                    Some(Expr::Lit(Lit::Str(s))) => {
                        next_value = None;
                        LiteralType::Str(this.file.span_text(s.span).map(str::len).unwrap_or(3) > 2)
                    }
                    Some(init) => {
                        let op = this.lower_expr(init);
                        this.emit(StmtKind::Eval(Rvalue::Use(op)), init.span());
                        next_value = None;
                        LiteralType::Num(true)
                    }
                    None => {
                        let value = next_value.unwrap_or(1.0);
                        next_value = Some(value + 1.0);
                        LiteralType::Num(value != 0.0)
                    }
                };
                members.push(kind);
            }
            this.enums.insert(
                id,
                EnumInfo {
                    name: decl.id.sym.to_string(),
                    members,
                },
            );
        });
    }

    fn lower_ts_module(&mut self, module: &'a TsModuleDecl) {
        self.set_origin(module.span);
        self.with_ambient(module.declare || module.global, |this| {
            let decl = match &module.id {
                TsModuleName::Ident(ident) => {
                    let scope = this.scope;
                    let id = this.declare(ident.sym.as_str(), DeclKind::Namespace, ident.span, scope);
                    this.emit(StmtKind::Bind(name_ref(ident)), ident.span);
                    Some((id, ident.sym.to_string(), ident.span))
                }
                TsModuleName::Str(_) => None,
            };
            if let Some(body) = &module.body {
                let name = decl.as_ref().map(|(_, name, span)| (name.clone(), *span));
                let unit = this.lower_namespace_body(body, name, module.span);
                if let Some((id, _, _)) = decl {
                    this.decls[id].body_unit = Some(unit);
                }
            }
        });
    }

    fn lower_namespace_body(
        &mut self,
        body: &'a TsNamespaceBody,
        name: Option<(String, Span)>,
        span: Span,
    ) -> UnitId {
        let header = UnitHeader {
            kind: UnitKind::Namespace,
            name,
            span,
            class: None,
            has_body: true,
            return_type: None,
        };
        self.in_unit(header, |this| match body {
            TsNamespaceBody::TsModuleBlock(block) => {
                for item in &block.body {
                    this.lower_module_item(item);
                }
            }
            TsNamespaceBody::TsNamespaceDecl(inner) => {
                this.set_origin(inner.span);
                this.exporting = true;
                let scope = this.scope;
                let id = this.declare(inner.id.sym.as_str(), DeclKind::Namespace, inner.id.span, scope);
                this.exporting = false;
                this.emit(StmtKind::Bind(name_ref(&inner.id)), inner.id.span);
                let name = Some((inner.id.sym.to_string(), inner.id.span));
                let unit = this.lower_namespace_body(&inner.body, name, inner.span);
                this.decls[id].body_unit = Some(unit);
            }
        })
    }

    // ==================== Functions and classes ====================

    fn lower_function(
        &mut self,
        function: &'a Function,
        kind: UnitKind,
        name: Option<(String, Span)>,
        class: Option<ClassId>,
    ) -> UnitId {
        let header = UnitHeader {
            kind,
            name,
            span: function.span,
            class,
            has_body: function.body.is_some(),
            return_type: function
                .return_type
                .as_ref()
                .map(|ann| TypeRef::from_ann(ann, self.file)),
        };
        self.in_unit(header, |this| {
            this.set_origin(function.span);
            if let Some(params) = &function.type_params {
                this.declare_type_params(params);
            }
            for (index, param) in function.params.iter().enumerate() {
                this.lower_decorators(&param.decorators);
                this.lower_param(&param.pat, index, param.span);
            }
            if let Some(ann) = &function.return_type {
                this.collect_type_uses(&**ann);
            }
            if let Some(body) = &function.body {
                this.lower_stmts(&body.stmts);
            }
        })
    }

    fn lower_arrow(&mut self, arrow: &'a ArrowExpr, predicate: bool) -> UnitId {
        let header = UnitHeader {
            kind: UnitKind::Arrow,
            name: None,
            span: arrow.span,
            class: None,
            has_body: true,
            return_type: arrow
                .return_type
                .as_ref()
                .map(|ann| TypeRef::from_ann(ann, self.file)),
        };
        self.in_unit(header, |this| {
            this.set_origin(arrow.span);
            if let Some(params) = &arrow.type_params {
                this.declare_type_params(params);
            }
            for (index, pat) in arrow.params.iter().enumerate() {
                this.lower_param(pat, index, pat.span());
            }
            if let Some(ann) = &arrow.return_type {
                this.collect_type_uses(&**ann);
            }
            match &*arrow.body {
                BlockStmtOrExpr::BlockStmt(block) => this.lower_stmts(&block.stmts),
                BlockStmtOrExpr::Expr(expr) => {
                    this.set_origin(expr.span());
                    let op = if predicate {
                        this.lower_test(expr, SiteOrigin::Predicate)
                    } else {
                        this.lower_expr(expr)
                    };
                    this.emit(StmtKind::Return(Some(op)), expr.span());
                }
            }
        })
    }

    fn push_param(&mut self, decl: DeclId, index: usize) {
        self.decls[decl].param_index = Some(index);
        self.units[self.unit].params.push(decl);
    }

    fn lower_param(&mut self, pat: &'a Pat, index: usize, span: Span) {
        match pat {
            Pat::Ident(binding) => {
                if binding.id.sym.as_str() == "this" {
                    if let Some(ann) = &binding.type_ann {
                        self.collect_type_uses(&**ann);
                    }
                    return;
                }
                let decl = self.declare_binding(binding, DeclKind::Param);
                self.push_param(decl, index);
                self.emit(StmtKind::Bind(name_ref(&binding.id)), binding.id.span);
            }
            Pat::Assign(assign) => {
                let default = self.lower_expr(&assign.right);
                match &*assign.left {
                    Pat::Ident(binding) => {
                        let decl = self.declare_binding(binding, DeclKind::Param);
                        self.push_param(decl, index);
                        self.emit(
                            StmtKind::Assign {
                                target: Place::Local(name_ref(&binding.id)),
                                value: Rvalue::Use(default),
                            },
                            assign.span,
                        );
                    }
                    other => self.lower_param_pattern(other, index, span),
                }
            }
            Pat::Rest(rest) => match &*rest.arg {
                Pat::Ident(binding) => {
                    let decl = self.declare_binding(binding, DeclKind::Param);
                    if let Some(ann) = &rest.type_ann {
                        self.decls[decl].declared_type = Some(TypeRef::from_ann(ann, self.file));
                        self.collect_type_uses(&**ann);
                    }
                    self.push_param(decl, index);
                    self.emit(StmtKind::Bind(name_ref(&binding.id)), binding.id.span);
                }
                other => self.lower_param_pattern(other, index, span),
            },
            Pat::Object(_) | Pat::Array(_) => self.lower_param_pattern(pat, index, span),
            Pat::Expr(expr) => {
                self.lossy = true;
                let op = self.lower_expr(expr);
                self.emit(StmtKind::Eval(Rvalue::Use(op)), expr.span());
            }
            Pat::Invalid(_) => {}
        }
    }

    /// Records a destructured parameter as a single pseudo-binding.
    ///
    /// Element names are not declared here; the binding index recovers them
    /// from the pattern's source text.
    fn lower_param_pattern(&mut self, pat: &'a Pat, index: usize, param_span: Span) {
        let shape = match pat {
            Pat::Array(_) => PatternShape::Array,
            _ => PatternShape::Object,
        };
        let (unit, scope, ambient) = (self.unit, self.scope, self.ambient);
        let declared_type = pattern_type_ann(pat).map(|ann| TypeRef::from_ann(ann, self.file));
        let decl = self.decls.alloc_with_id(|id| Declaration {
            id,
            name: shape.marker().to_string(),
            kind: DeclKind::Param,
            scope,
            unit,
            span: pat.span(),
            origin: param_span,
            declared_type,
            exported: false,
            ambient,
            decorated: false,
            provenance: Provenance::Pattern(shape),
            param_index: None,
            param_property: false,
            body_unit: None,
            class: None,
        });
        self.push_param(decl, index);
        self.emit(
            StmtKind::Bind(NameRef {
                name: shape.marker().to_string(),
                span: pat.span(),
            }),
            pat.span(),
        );
        if let Some(ann) = pattern_type_ann(pat) {
            self.collect_type_uses(ann);
        }
        self.lower_pattern_defaults(pat);
    }

    /// Lowers default values and computed keys nested in a pattern.
    fn lower_pattern_defaults(&mut self, pat: &'a Pat) {
        match pat {
            Pat::Assign(assign) => {
                let op = self.lower_expr(&assign.right);
                self.emit(StmtKind::Eval(Rvalue::Use(op)), assign.right.span());
                self.lower_pattern_defaults(&assign.left);
            }
            Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.lower_pattern_defaults(elem);
                }
            }
            Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ObjectPatProp::KeyValue(kv) => {
                            if let Some(op) = self.lower_prop_key(&kv.key) {
                                self.emit(StmtKind::Eval(Rvalue::Use(op)), kv.key.span());
                            }
                            self.lower_pattern_defaults(&kv.value);
                        }
                        ObjectPatProp::Assign(assign) => {
                            if let Some(value) = &assign.value {
                                let op = self.lower_expr(value);
                                self.emit(StmtKind::Eval(Rvalue::Use(op)), value.span());
                            }
                        }
                        ObjectPatProp::Rest(rest) => self.lower_pattern_defaults(&rest.arg),
                    }
                }
            }
            Pat::Rest(rest) => self.lower_pattern_defaults(&rest.arg),
            Pat::Ident(_) | Pat::Expr(_) | Pat::Invalid(_) => {}
        }
    }

    fn lower_class_decl(&mut self, ident: Option<&'a Ident>, class: &'a Class, declare: bool) {
        self.with_ambient(declare, |this| {
            let decl = ident.map(|ident| {
                let scope = this.scope;
                let id = this.declare(ident.sym.as_str(), DeclKind::Class, ident.span, scope);
                this.emit(StmtKind::Bind(name_ref(ident)), ident.span);
                id
            });
            let name = ident.map(|ident| (ident.sym.to_string(), ident.span));
            let class_id = this.lower_class(class, name, decl);
            if let Some(decl) = decl {
                let init_unit = this.classes[class_id].init_unit;
                let declaration = &mut this.decls[decl];
                declaration.class = Some(class_id);
                declaration.body_unit = Some(init_unit);
                declaration.decorated |= !class.decorators.is_empty();
            }
        });
    }

    fn lower_class(
        &mut self,
        class: &'a Class,
        name: Option<(String, Span)>,
        decl: Option<DeclId>,
    ) -> ClassId {
        self.lower_decorators(&class.decorators);
        if let Some(super_class) = &class.super_class {
            let op = self.lower_expr(super_class);
            self.emit(StmtKind::Eval(Rvalue::Use(op)), super_class.span());
        }
        self.collect_type_uses(&class.implements);
        if let Some(args) = &class.super_type_params {
            self.collect_type_uses(&**args);
        }

        let decorators: Vec<String> = class
            .decorators
            .iter()
            .map(|decorator| self.decorator_name(decorator))
            .collect();
        let (placeholder, class_name) = (self.unit, name.as_ref().map(|(name, _)| name.clone()));
        let class_id = self.classes.alloc_with_id(|id| ClassInfo {
            id,
            name: class_name,
            decl,
            init_unit: placeholder,
            span: class.span,
            fields: HashMap::new(),
            methods: HashMap::new(),
            decorators,
            has_static_block: false,
        });

        let header = UnitHeader {
            kind: UnitKind::ClassInit,
            name,
            span: class.span,
            class: Some(class_id),
            has_body: true,
            return_type: None,
        };
        let init_unit = self.in_unit(header, |this| {
            if let Some(params) = &class.type_params {
                this.declare_type_params(params);
            }
            for member in &class.body {
                this.lower_class_member(member, class_id);
            }
        });
        self.classes[class_id].init_unit = init_unit;
        class_id
    }

    fn lower_class_member(&mut self, member: &'a ClassMember, class_id: ClassId) {
        match member {
            ClassMember::Constructor(ctor) => {
                self.set_origin(ctor.span);
                let header = UnitHeader {
                    kind: UnitKind::Method,
                    name: Some(("constructor".to_string(), ctor.key.span())),
                    span: ctor.span,
                    class: Some(class_id),
                    has_body: ctor.body.is_some(),
                    return_type: None,
                };
                self.in_unit(header, |this| {
                    for (index, param) in ctor.params.iter().enumerate() {
                        match param {
                            ParamOrTsParamProp::Param(param) => {
                                this.lower_decorators(&param.decorators);
                                this.lower_param(&param.pat, index, param.span);
                            }
                            ParamOrTsParamProp::TsParamProp(prop) => {
                                this.lower_decorators(&prop.decorators);
                                let (binding, default) = match &prop.param {
                                    TsParamPropParam::Ident(binding) => (binding, None),
                                    TsParamPropParam::Assign(assign) => match &*assign.left {
                                        Pat::Ident(binding) => (binding, Some(&assign.right)),
                                        _ => continue,
                                    },
                                };
                                let decl = this.declare_binding(binding, DeclKind::Param);
                                this.decls[decl].param_property = true;
                                this.push_param(decl, index);
                                let name = binding.id.sym.to_string();
                                let declared_type = this.decls[decl].declared_type.clone();
                                this.classes[class_id].fields.insert(
                                    name.clone(),
                                    FieldInfo {
                                        name,
                                        declared_type,
                                        initializer: None,
                                        decorators: Vec::new(),
                                        is_static: false,
                                    },
                                );
                                match default {
                                    Some(default) => {
                                        let value = this.lower_rvalue(default);
                                        this.emit(
                                            StmtKind::Assign {
                                                target: Place::Local(name_ref(&binding.id)),
                                                value,
                                            },
                                            prop.span,
                                        );
                                    }
                                    None => {
                                        this.emit(
                                            StmtKind::Bind(name_ref(&binding.id)),
                                            binding.id.span,
                                        );
                                    }
                                }
                            }
                        }
                    }
                    if let Some(body) = &ctor.body {
                        this.lower_stmts(&body.stmts);
                    }
                });
            }
            ClassMember::Method(method) => {
                self.set_origin(method.span);
                self.lower_decorators(&method.function.decorators);
                self.lower_prop_key(&method.key);
                let name = self.prop_name(&method.key);
                self.lower_method(
                    &method.function,
                    name,
                    method.key.span(),
                    method.kind == swc_ecma_ast::MethodKind::Getter,
                    class_id,
                );
            }
            ClassMember::PrivateMethod(method) => {
                self.set_origin(method.span);
                self.lower_decorators(&method.function.decorators);
                let name = Some(format!("#{}", method.key.name));
                self.lower_method(
                    &method.function,
                    name,
                    method.key.span,
                    method.kind == swc_ecma_ast::MethodKind::Getter,
                    class_id,
                );
            }
            ClassMember::ClassProp(prop) => {
                self.set_origin(prop.span);
                self.lower_decorators(&prop.decorators);
                self.lower_prop_key(&prop.key);
                let name = self.prop_name(&prop.key);
                let decorators = prop
                    .decorators
                    .iter()
                    .map(|decorator| self.decorator_name(decorator))
                    .collect();
                self.lower_field(
                    name,
                    prop.type_ann.as_deref().map(|ann| (ann, prop.is_optional)),
                    prop.value.as_deref(),
                    decorators,
                    prop.is_static,
                    class_id,
                );
            }
            ClassMember::PrivateProp(prop) => {
                self.set_origin(prop.span);
                self.lower_decorators(&prop.decorators);
                let decorators = prop
                    .decorators
                    .iter()
                    .map(|decorator| self.decorator_name(decorator))
                    .collect();
                self.lower_field(
                    Some(format!("#{}", prop.key.name)),
                    prop.type_ann.as_deref().map(|ann| (ann, prop.is_optional)),
                    prop.value.as_deref(),
                    decorators,
                    prop.is_static,
                    class_id,
                );
            }
            ClassMember::StaticBlock(block) => {
                self.set_origin(block.span);
                self.classes[class_id].has_static_block = true;
                let header = UnitHeader {
                    kind: UnitKind::StaticBlock,
                    name: None,
                    span: block.span,
                    class: Some(class_id),
                    has_body: true,
                    return_type: None,
                };
                self.in_unit(header, |this| this.lower_stmts(&block.body.stmts));
            }
            ClassMember::TsIndexSignature(signature) => {
                self.collect_type_uses(signature);
            }
            ClassMember::AutoAccessor(accessor) => {
                self.set_origin(accessor.span);
                self.lower_decorators(&accessor.decorators);
                if let Some(value) = &accessor.value {
                    let op = self.lower_expr(value);
                    self.emit(StmtKind::Eval(Rvalue::Use(op)), value.span());
                }
            }
            ClassMember::Empty(_) => {}
        }
    }

    fn lower_method(
        &mut self,
        function: &'a Function,
        name: Option<String>,
        name_span: Span,
        is_getter: bool,
        class_id: ClassId,
    ) {
        let return_type = function
            .return_type
            .as_ref()
            .map(|ann| TypeRef::from_ann(ann, self.file));
        if let Some(name) = &name {
            let class = &mut self.classes[class_id];
            if is_getter {
                class.fields.insert(
                    name.clone(),
                    FieldInfo {
                        name: name.clone(),
                        declared_type: return_type.clone(),
                        initializer: None,
                        decorators: Vec::new(),
                        is_static: false,
                    },
                );
            } else {
                class.methods.insert(name.clone(), return_type);
            }
        }
        self.lower_function(
            function,
            UnitKind::Method,
            name.map(|name| (name, name_span)),
            Some(class_id),
        );
    }

    fn lower_field(
        &mut self,
        name: Option<String>,
        type_ann: Option<(&'a swc_ecma_ast::TsTypeAnn, bool)>,
        value: Option<&'a Expr>,
        decorators: Vec<String>,
        is_static: bool,
        class_id: ClassId,
    ) {
        let declared_type = type_ann.map(|(ann, optional)| {
            let declared = TypeRef::from_ann(ann, self.file);
            if optional { declared.or_undefined() } else { declared }
        });
        if let Some((ann, _)) = type_ann {
            self.collect_type_uses(ann);
        }
        let initializer = value.map(|value| {
            let rvalue = self.lower_rvalue(value);
            let key = MemberKey::Named(name.clone().unwrap_or_default());
            self.emit(
                StmtKind::Assign {
                    target: Place::Field {
                        object: Operand::This,
                        key,
                    },
                    value: rvalue,
                },
                value.span(),
            )
        });
        if let Some(name) = name {
            self.classes[class_id].fields.insert(
                name.clone(),
                FieldInfo {
                    name,
                    declared_type,
                    initializer,
                    decorators,
                    is_static,
                },
            );
        }
    }

    // ==================== Patterns ====================

    fn bind_pattern(
        &mut self,
        pat: &'a Pat,
        value: Option<Operand>,
        mode: BindMode,
        provenance: Provenance,
    ) {
        match pat {
            Pat::Ident(binding) => self.bind_ident(binding, value, mode, provenance),
            Pat::Array(array) => self.bind_array(array, value, mode),
            Pat::Object(object) => self.bind_object(object, value, mode),
            Pat::Assign(assign) => {
                let default = self.lower_expr(&assign.right);
                let combined = match value {
                    Some(value) => self.into_operand(
                        Rvalue::Binary {
                            op: BinaryOp::NullishCoalescing,
                            left: value,
                            right: default,
                        },
                        assign.span,
                    ),
                    None => default,
                };
                self.bind_pattern(&assign.left, Some(combined), mode, provenance);
            }
            Pat::Rest(rest) => self.bind_pattern(&rest.arg, value, mode, provenance),
            Pat::Expr(expr) => {
                if let Some(value) = value {
                    self.assign_to_expr(expr, Rvalue::Use(value), expr.span());
                }
            }
            Pat::Invalid(_) => self.lossy = true,
        }
    }

    fn bind_ident(
        &mut self,
        binding: &'a BindingIdent,
        value: Option<Operand>,
        mode: BindMode,
        provenance: Provenance,
    ) {
        if let BindMode::Declare(kind) = mode {
            let decl = self.declare_binding(binding, kind);
            self.decls[decl].provenance = provenance;
        }
        let name = name_ref(&binding.id);
        match value {
            Some(value) => {
                self.emit(
                    StmtKind::Assign {
                        target: Place::Local(name),
                        value: Rvalue::Use(value),
                    },
                    binding.id.span,
                );
            }
            None => {
                self.emit(StmtKind::Bind(name), binding.id.span);
            }
        }
    }

    fn bind_array(&mut self, array: &'a ArrayPat, value: Option<Operand>, mode: BindMode) {
        if let Some(ann) = &array.type_ann {
            self.collect_type_uses(&**ann);
        }
        for (index, elem) in array.elems.iter().enumerate() {
            let Some(elem) = elem else { continue };
            let provenance = match elem {
                Pat::Ident(_) => Provenance::ArrayElement,
                _ => Provenance::Plain,
            };
            let elem_value = value.clone().map(|value| {
                let rvalue = match elem {
                    Pat::Rest(_) => Rvalue::Aggregate(vec![value]),
                    _ => Rvalue::Member {
                        object: value,
                        key: MemberKey::Computed(Operand::Const(Literal::Num {
                            non_zero: index != 0,
                        })),
                        optional: false,
                    },
                };
                self.into_operand(rvalue, elem.span())
            });
            self.bind_pattern(elem, elem_value, mode, provenance);
        }
    }

    fn bind_object(&mut self, object: &'a ObjectPat, value: Option<Operand>, mode: BindMode) {
        if let Some(ann) = &object.type_ann {
            self.collect_type_uses(&**ann);
        }
        let has_rest = object
            .props
            .iter()
            .any(|prop| matches!(prop, ObjectPatProp::Rest(_)));
        let sibling = if has_rest {
            Provenance::RestSibling
        } else {
            Provenance::Plain
        };

        for prop in &object.props {
            match prop {
                ObjectPatProp::KeyValue(kv) => {
                    let key = match self.lower_prop_key(&kv.key) {
                        Some(op) => MemberKey::Computed(op),
                        None => MemberKey::Named(self.prop_name(&kv.key).unwrap_or_default()),
                    };
                    let elem_value = value.clone().map(|value| {
                        self.into_operand(
                            Rvalue::Member {
                                object: value,
                                key,
                                optional: false,
                            },
                            kv.span(),
                        )
                    });
                    self.bind_pattern(&kv.value, elem_value, mode, sibling);
                }
                ObjectPatProp::Assign(assign) => {
                    let mut elem_value = value.clone().map(|value| {
                        self.into_operand(
                            Rvalue::Member {
                                object: value,
                                key: MemberKey::Named(assign.key.id.sym.to_string()),
                                optional: false,
                            },
                            assign.span,
                        )
                    });
                    if let Some(default) = &assign.value {
                        let default = self.lower_expr(default);
                        elem_value = Some(match elem_value {
                            Some(current) => self.into_operand(
                                Rvalue::Binary {
                                    op: BinaryOp::NullishCoalescing,
                                    left: current,
                                    right: default,
                                },
                                assign.span,
                            ),
                            None => default,
                        });
                    }
                    self.bind_ident(&assign.key, elem_value, mode, sibling);
                }
                ObjectPatProp::Rest(rest) => {
                    let elem_value = value
                        .clone()
                        .map(|value| self.into_operand(Rvalue::Aggregate(vec![value]), rest.span));
                    self.bind_pattern(&rest.arg, elem_value, mode, Provenance::Plain);
                }
            }
        }
    }

    fn assign_to_expr(&mut self, target: &'a Expr, value: Rvalue, span: Span) {
        match unparen(target) {
            Expr::Ident(ident) => {
                self.emit(
                    StmtKind::Assign {
                        target: Place::Local(name_ref(ident)),
                        value,
                    },
                    span,
                );
            }
            Expr::Member(member) => {
                let object = self.lower_expr(&member.obj);
                let key = self.member_key(&member.prop);
                self.emit(
                    StmtKind::Assign {
                        target: Place::Field { object, key },
                        value,
                    },
                    span,
                );
            }
            Expr::TsAs(inner) => self.assign_to_expr(&inner.expr, value, span),
            Expr::TsNonNull(inner) => self.assign_to_expr(&inner.expr, value, span),
            Expr::TsSatisfies(inner) => self.assign_to_expr(&inner.expr, value, span),
            Expr::TsTypeAssertion(inner) => self.assign_to_expr(&inner.expr, value, span),
            other => {
                self.lossy = true;
                let op = self.lower_expr(other);
                let mut ops = value.operands().into_iter().cloned().collect::<Vec<_>>();
                ops.push(op);
                self.emit(StmtKind::Eval(Rvalue::Opaque(ops)), span);
            }
        }
    }

    // ==================== Statements ====================

    fn lower_stmts(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Block(block) => {
                self.with_scope(ScopeKind::Block, block.span, |this| {
                    this.lower_stmts(&block.stmts)
                });
            }
            Stmt::Empty(_) | Stmt::Debugger(_) | Stmt::Break(_) | Stmt::Continue(_) => {}
            Stmt::With(with) => {
                self.set_origin(with.obj.span());
                self.lossy = true;
                let op = self.lower_expr(&with.obj);
                self.emit(StmtKind::Eval(Rvalue::Use(op)), with.obj.span());
                self.lower_stmt(&with.body);
            }
            Stmt::Return(ret) => {
                self.set_origin(ret.span);
                let op = ret.arg.as_ref().map(|arg| self.lower_expr(arg));
                self.emit(StmtKind::Return(op), ret.span);
            }
            Stmt::Labeled(labeled) => self.lower_stmt(&labeled.body),
            Stmt::If(if_stmt) => {
                self.set_origin(if_stmt.test.span());
                self.lower_test(&if_stmt.test, SiteOrigin::Test);
                self.lower_stmt(&if_stmt.cons);
                if let Some(alt) = &if_stmt.alt {
                    self.lower_stmt(alt);
                }
            }
            Stmt::Switch(switch) => {
                self.set_origin(switch.discriminant.span());
                let discriminant = self.lower_expr(&switch.discriminant);
                self.emit(
                    StmtKind::Eval(Rvalue::Use(discriminant.clone())),
                    switch.discriminant.span(),
                );
                self.with_scope(ScopeKind::Switch, switch.span, |this| {
                    for case in &switch.cases {
                        if let Some(test) = &case.test {
                            this.set_origin(test.span());
                            let test_op = this.lower_expr(test);
                            this.emit(
                                StmtKind::Eval(Rvalue::Binary {
                                    op: BinaryOp::EqEqEq,
                                    left: discriminant.clone(),
                                    right: test_op,
                                }),
                                test.span(),
                            );
                        }
                        this.lower_stmts(&case.cons);
                    }
                });
            }
            Stmt::Throw(throw) => {
                self.set_origin(throw.span);
                let op = self.lower_expr(&throw.arg);
                self.emit(StmtKind::Throw(op), throw.span);
            }
            Stmt::Try(try_stmt) => {
                self.with_scope(ScopeKind::Block, try_stmt.block.span, |this| {
                    this.lower_stmts(&try_stmt.block.stmts)
                });
                if let Some(handler) = &try_stmt.handler {
                    self.with_scope(ScopeKind::Catch, handler.span, |this| {
                        if let Some(param) = &handler.param {
                            this.set_origin(param.span());
                            this.bind_pattern(
                                param,
                                None,
                                BindMode::Declare(DeclKind::CatchParam),
                                Provenance::Plain,
                            );
                        }
                        this.lower_stmts(&handler.body.stmts);
                    });
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    self.with_scope(ScopeKind::Block, finalizer.span, |this| {
                        this.lower_stmts(&finalizer.stmts)
                    });
                }
            }
            Stmt::While(while_stmt) => {
                self.set_origin(while_stmt.test.span());
                self.lower_test(&while_stmt.test, SiteOrigin::Test);
                self.lower_stmt(&while_stmt.body);
            }
            Stmt::DoWhile(do_while) => {
                self.lower_stmt(&do_while.body);
                self.set_origin(do_while.test.span());
                self.lower_test(&do_while.test, SiteOrigin::Test);
            }
            Stmt::For(for_stmt) => {
                self.with_scope(ScopeKind::For, for_stmt.span, |this| {
                    match &for_stmt.init {
                        Some(swc_ecma_ast::VarDeclOrExpr::VarDecl(var)) => this.lower_var_decl(var),
                        Some(swc_ecma_ast::VarDeclOrExpr::Expr(expr)) => {
                            this.set_origin(expr.span());
                            this.lower_expr_stmt(expr);
                        }
                        None => {}
                    }
                    if let Some(test) = &for_stmt.test {
                        this.set_origin(test.span());
                        this.lower_test(test, SiteOrigin::Test);
                    }
                    if let Some(update) = &for_stmt.update {
                        this.set_origin(update.span());
                        this.lower_expr_stmt(update);
                    }
                    this.lower_stmt(&for_stmt.body);
                });
            }
            Stmt::ForIn(for_in) => {
                self.with_scope(ScopeKind::For, for_in.span, |this| {
                    this.lower_for_each(&for_in.left, &for_in.right, &for_in.body)
                });
            }
            Stmt::ForOf(for_of) => {
                self.with_scope(ScopeKind::For, for_of.span, |this| {
                    this.lower_for_each(&for_of.left, &for_of.right, &for_of.body)
                });
            }
            Stmt::Decl(decl) => self.lower_decl(decl),
            Stmt::Expr(expr) => {
                self.set_origin(expr.span);
                self.lower_expr_stmt(&expr.expr);
            }
        }
    }

    fn lower_for_each(&mut self, left: &'a ForHead, right: &'a Expr, body: &'a Stmt) {
        self.set_origin(right.span());
        let iterable = self.lower_expr(right);
        let element = self.into_operand(Rvalue::Opaque(vec![iterable]), right.span());

        match left {
            ForHead::VarDecl(var) => {
                self.set_origin(var.span);
                let kind = match var.kind {
                    VarDeclKind::Var => DeclKind::Var,
                    VarDeclKind::Let => DeclKind::Let,
                    VarDeclKind::Const => DeclKind::Const,
                };
                for declarator in &var.decls {
                    self.bind_pattern(
                        &declarator.name,
                        Some(element.clone()),
                        BindMode::Declare(kind),
                        Provenance::Plain,
                    );
                }
            }
            ForHead::UsingDecl(using) => {
                self.set_origin(using.span);
                for declarator in &using.decls {
                    self.bind_pattern(
                        &declarator.name,
                        Some(element.clone()),
                        BindMode::Declare(DeclKind::Using),
                        Provenance::Plain,
                    );
                }
            }
            ForHead::Pat(pat) => {
                self.set_origin(pat.span());
                self.bind_pattern(pat, Some(element), BindMode::Assign, Provenance::Plain);
            }
        }
        self.lower_stmt(body);
    }

    /// Lowers an expression whose value is discarded.
    fn lower_expr_stmt(&mut self, expr: &'a Expr) {
        match unparen(expr) {
            Expr::Assign(assign) => {
                self.lower_assign(assign);
            }
            Expr::Update(update) => {
                self.lower_update(update, true);
            }
            Expr::Seq(seq) => {
                for expr in &seq.exprs {
                    self.lower_expr_stmt(expr);
                }
            }
            _ => {
                let value = self.lower_rvalue(expr);
                self.emit(StmtKind::Eval(value), expr.span());
            }
        }
    }

    // ==================== Conditions ====================

    /// Lowers a boolean-context expression, registering its condition sites.
    fn lower_test(&mut self, expr: &'a Expr, origin: SiteOrigin) -> Operand {
        let inner = unparen(expr);
        if let Expr::Bin(bin) = inner
            && is_logical(bin.op)
        {
            let op = self.lower_logical(bin, Some(origin));
            self.emit(StmtKind::Branch(op.clone()), expr.span());
            return op;
        }

        let op = self.lower_expr(inner);
        let stmt = self.emit(StmtKind::Branch(op.clone()), inner.span());
        self.register_site(inner, stmt, origin);
        op
    }

    /// `&&`/`||`: the left operand is always a condition, the right one only
    /// when the whole expression is. Both are tagged as logical operands.
    fn lower_logical(&mut self, bin: &'a BinExpr, condition: Option<SiteOrigin>) -> Operand {
        let left = self.lower_logical_operand(&bin.left, Some(SiteOrigin::LogicalOperand));
        let right_origin = condition.map(|_| SiteOrigin::LogicalOperand);
        let right = self.lower_logical_operand(&bin.right, right_origin);
        self.into_operand(
            Rvalue::Binary {
                op: bin.op,
                left,
                right,
            },
            bin.span,
        )
    }

    fn lower_logical_operand(
        &mut self,
        operand: &'a Expr,
        condition: Option<SiteOrigin>,
    ) -> Operand {
        if let Expr::Bin(bin) = unparen(operand)
            && is_logical(bin.op)
        {
            return self.lower_logical(bin, condition);
        }
        match condition {
            Some(origin) => self.lower_test(operand, origin),
            None => self.lower_expr(operand),
        }
    }

    // ==================== Expressions ====================

    fn lower_expr(&mut self, expr: &'a Expr) -> Operand {
        let value = self.lower_rvalue(expr);
        self.into_operand(value, expr.span())
    }

    fn lower_rvalue(&mut self, expr: &'a Expr) -> Rvalue {
        match expr {
            Expr::Ident(ident) => Rvalue::Use(Operand::Local(name_ref(ident))),
            Expr::Lit(lit) => Rvalue::Use(Operand::Const(self.literal(lit))),
            Expr::This(_) => Rvalue::Use(Operand::This),
            Expr::Paren(paren) => self.lower_rvalue(&paren.expr),
            Expr::Array(array) => {
                let mut ops = Vec::with_capacity(array.elems.len());
                for elem in array.elems.iter().flatten() {
                    ops.push(self.lower_expr(&elem.expr));
                }
                Rvalue::Aggregate(ops)
            }
            Expr::Object(object) => Rvalue::Aggregate(self.lower_object(object)),
            Expr::Fn(function) => {
                let name = function
                    .ident
                    .as_ref()
                    .map(|ident| (ident.sym.to_string(), ident.span));
                Rvalue::Closure(self.lower_function(&function.function, UnitKind::Function, name, None))
            }
            Expr::Arrow(arrow) => Rvalue::Closure(self.lower_arrow(arrow, false)),
            Expr::Class(class) => {
                let name = class
                    .ident
                    .as_ref()
                    .map(|ident| (ident.sym.to_string(), ident.span));
                let class_id = self.lower_class(&class.class, name, None);
                Rvalue::Closure(self.classes[class_id].init_unit)
            }
            Expr::Unary(unary) => {
                let operand = if unary.op == UnaryOp::Bang {
                    self.lower_test(&unary.arg, SiteOrigin::Negation)
                } else {
                    self.lower_expr(&unary.arg)
                };
                Rvalue::Unary {
                    op: unary.op,
                    operand,
                }
            }
            Expr::Update(update) => Rvalue::Use(self.lower_update(update, false)),
            Expr::Bin(bin) if is_logical(bin.op) => Rvalue::Use(self.lower_logical(bin, None)),
            Expr::Bin(bin) => {
                let left = self.lower_expr(&bin.left);
                let right = self.lower_expr(&bin.right);
                Rvalue::Binary {
                    op: bin.op,
                    left,
                    right,
                }
            }
            Expr::Assign(assign) => Rvalue::Use(self.lower_assign(assign)),
            Expr::Member(member) => self.lower_member(member, false),
            Expr::SuperProp(super_prop) => {
                let key = match &super_prop.prop {
                    SuperProp::Ident(ident) => MemberKey::Named(ident.sym.to_string()),
                    SuperProp::Computed(computed) => {
                        MemberKey::Computed(self.lower_expr(&computed.expr))
                    }
                };
                Rvalue::Member {
                    object: Operand::This,
                    key,
                    optional: false,
                }
            }
            Expr::Cond(cond) => {
                self.lower_test(&cond.test, SiteOrigin::Ternary);
                let cons = self.lower_expr(&cond.cons);
                let alt = self.lower_expr(&cond.alt);
                Rvalue::Choice(vec![cons, alt])
            }
            Expr::Call(call) => self.lower_call(call),
            Expr::New(new) => {
                let callee = self.lower_expr(&new.callee);
                if let Some(args) = &new.type_args {
                    self.collect_type_uses(&**args);
                }
                let mut args = Vec::new();
                for arg in new.args.iter().flatten() {
                    args.push(self.lower_expr(&arg.expr));
                }
                Rvalue::New { callee, args }
            }
            Expr::Seq(seq) => match seq.exprs.split_last() {
                Some((last, init)) => {
                    for expr in init {
                        self.lower_expr_stmt(expr);
                    }
                    self.lower_rvalue(last)
                }
                None => Rvalue::Use(Operand::Const(Literal::Undefined)),
            },
            Expr::Tpl(tpl) => {
                if tpl.exprs.is_empty() {
                    let non_empty = self.file.span_text(tpl.span).map(str::len).unwrap_or(3) > 2;
                    Rvalue::Use(Operand::Const(Literal::Str { non_empty }))
                } else {
                    let mut ops = Vec::with_capacity(tpl.exprs.len());
                    for expr in &tpl.exprs {
                        ops.push(self.lower_expr(expr));
                    }
                    Rvalue::Template(ops)
                }
            }
            Expr::TaggedTpl(tagged) => {
                let tag = self.lower_expr(&tagged.tag);
                let mut args = Vec::with_capacity(tagged.tpl.exprs.len());
                for expr in &tagged.tpl.exprs {
                    args.push(self.lower_expr(expr));
                }
                Rvalue::Call {
                    target: CallTarget::Value(tag),
                    args,
                    optional: false,
                }
            }
            Expr::Yield(yield_expr) => {
                let ops = match &yield_expr.arg {
                    Some(arg) => vec![self.lower_expr(arg)],
                    None => Vec::new(),
                };
                Rvalue::Opaque(ops)
            }
            Expr::Await(await_expr) => Rvalue::Await(self.lower_expr(&await_expr.arg)),
            Expr::MetaProp(_) | Expr::PrivateName(_) => Rvalue::Opaque(Vec::new()),
            Expr::JSXElement(element) => {
                self.has_jsx = true;
                Rvalue::Aggregate(self.lower_jsx_element(element))
            }
            Expr::JSXFragment(fragment) => {
                self.has_jsx = true;
                Rvalue::Aggregate(self.lower_jsx_children(&fragment.children))
            }
            Expr::JSXMember(_) | Expr::JSXNamespacedName(_) | Expr::JSXEmpty(_) => {
                Rvalue::Opaque(Vec::new())
            }
            Expr::TsTypeAssertion(assertion) => {
                self.collect_type_uses(&*assertion.type_ann);
                let operand = self.lower_expr(&assertion.expr);
                Rvalue::Cast {
                    operand,
                    ty: Some(TypeRef::from_ts(&assertion.type_ann, self.file)),
                }
            }
            Expr::TsAs(as_expr) => {
                self.collect_type_uses(&*as_expr.type_ann);
                let operand = self.lower_expr(&as_expr.expr);
                Rvalue::Cast {
                    operand,
                    ty: Some(TypeRef::from_ts(&as_expr.type_ann, self.file)),
                }
            }
            Expr::TsSatisfies(satisfies) => {
                self.collect_type_uses(&*satisfies.type_ann);
                self.lower_rvalue(&satisfies.expr)
            }
            Expr::TsConstAssertion(assertion) => self.lower_rvalue(&assertion.expr),
            Expr::TsNonNull(non_null) => {
                let operand = self.lower_expr(&non_null.expr);
                Rvalue::Cast { operand, ty: None }
            }
            Expr::TsInstantiation(instantiation) => {
                self.collect_type_uses(&*instantiation.type_args);
                self.lower_rvalue(&instantiation.expr)
            }
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(member) => self.lower_member(member, chain.optional),
                OptChainBase::Call(call) => {
                    let target = self.call_target(&call.callee);
                    let mut args = Vec::with_capacity(call.args.len());
                    for arg in &call.args {
                        args.push(self.lower_expr(&arg.expr));
                    }
                    Rvalue::Call {
                        target,
                        args,
                        optional: chain.optional,
                    }
                }
            },
            Expr::Invalid(_) => {
                self.lossy = true;
                Rvalue::Opaque(Vec::new())
            }
        }
    }

    fn member_key(&mut self, prop: &'a MemberProp) -> MemberKey {
        match prop {
            MemberProp::Ident(ident) => MemberKey::Named(ident.sym.to_string()),
            MemberProp::PrivateName(private) => MemberKey::Named(format!("#{}", private.name)),
            MemberProp::Computed(computed) => MemberKey::Computed(self.lower_expr(&computed.expr)),
        }
    }

    fn lower_member(&mut self, member: &'a MemberExpr, optional: bool) -> Rvalue {
        let object = self.lower_expr(&member.obj);
        let key = self.member_key(&member.prop);
        Rvalue::Member {
            object,
            key,
            optional,
        }
    }

    fn call_target(&mut self, callee: &'a Expr) -> CallTarget {
        match unparen(callee) {
            Expr::Member(member) => {
                let receiver = self.lower_expr(&member.obj);
                match &member.prop {
                    MemberProp::Ident(ident) => CallTarget::Method {
                        receiver,
                        name: ident.sym.to_string(),
                    },
                    MemberProp::PrivateName(private) => CallTarget::Method {
                        receiver,
                        name: format!("#{}", private.name),
                    },
                    MemberProp::Computed(computed) => {
                        let key = self.lower_expr(&computed.expr);
                        let function = self.into_operand(
                            Rvalue::Member {
                                object: receiver,
                                key: MemberKey::Computed(key),
                                optional: false,
                            },
                            member.span,
                        );
                        CallTarget::Value(function)
                    }
                }
            }
            _ => CallTarget::Value(self.lower_expr(callee)),
        }
    }

    fn lower_call(&mut self, call: &'a CallExpr) -> Rvalue {
        let target = match &call.callee {
            Callee::Expr(callee) => self.call_target(callee),
            Callee::Super(_) => CallTarget::Super,
            Callee::Import(_) => CallTarget::Import,
        };
        if let Some(args) = &call.type_args {
            self.collect_type_uses(&**args);
        }
        let predicate = matches!(
            &target,
            CallTarget::Method { name, .. } if ARRAY_PREDICATES.contains(&name.as_str())
        );

        let mut args = Vec::with_capacity(call.args.len());
        for (index, arg) in call.args.iter().enumerate() {
            if predicate
                && index == 0
                && arg.spread.is_none()
                && let Expr::Arrow(arrow) = unparen(&arg.expr)
            {
                let unit = self.lower_arrow(arrow, true);
                args.push(self.into_operand(Rvalue::Closure(unit), arrow.span));
                continue;
            }
            args.push(self.lower_expr(&arg.expr));
        }
        Rvalue::Call {
            target,
            args,
            optional: false,
        }
    }

    fn lower_update(&mut self, update: &'a UpdateExpr, discard: bool) -> Operand {
        let op = match update.op {
            UpdateOp::PlusPlus => BinaryOp::Add,
            UpdateOp::MinusMinus => BinaryOp::Sub,
        };
        let one = Operand::Const(Literal::Num { non_zero: true });

        match unparen(&update.arg) {
            Expr::Ident(ident) => {
                let name = name_ref(ident);
                let value = Rvalue::Binary {
                    op,
                    left: Operand::Local(name.clone()),
                    right: one,
                };
                if discard {
                    self.emit(
                        StmtKind::Assign {
                            target: Place::Local(name.clone()),
                            value,
                        },
                        update.span,
                    );
                    Operand::Local(name)
                } else {
                    let next = self.into_operand(value, update.span);
                    self.emit(
                        StmtKind::Assign {
                            target: Place::Local(name),
                            value: Rvalue::Use(next.clone()),
                        },
                        update.span,
                    );
                    next
                }
            }
            Expr::Member(member) => {
                let object = self.lower_expr(&member.obj);
                let key = self.member_key(&member.prop);
                let current = self.into_operand(
                    Rvalue::Member {
                        object: object.clone(),
                        key: key.clone(),
                        optional: false,
                    },
                    member.span,
                );
                let next = self.into_operand(
                    Rvalue::Binary {
                        op,
                        left: current,
                        right: one,
                    },
                    update.span,
                );
                self.emit(
                    StmtKind::Assign {
                        target: Place::Field { object, key },
                        value: Rvalue::Use(next.clone()),
                    },
                    update.span,
                );
                next
            }
            other => {
                self.lossy = true;
                self.lower_expr(other)
            }
        }
    }

    fn lower_assign(&mut self, assign: &'a AssignExpr) -> Operand {
        let compound = compound_operator(assign.op);

        match &assign.left {
            AssignTarget::Simple(SimpleAssignTarget::Ident(binding)) => {
                let name = name_ref(&binding.id);
                let value = match compound {
                    None => self.lower_rvalue(&assign.right),
                    Some(op) => {
                        if is_logical_assign(assign.op) {
                            self.emit(
                                StmtKind::Eval(Rvalue::Use(Operand::Local(name.clone()))),
                                binding.id.span,
                            );
                        }
                        let right = self.lower_expr(&assign.right);
                        Rvalue::Binary {
                            op,
                            left: Operand::Local(name.clone()),
                            right,
                        }
                    }
                };
                self.emit(
                    StmtKind::Assign {
                        target: Place::Local(name.clone()),
                        value,
                    },
                    assign.span,
                );
                Operand::Local(name)
            }
            AssignTarget::Simple(SimpleAssignTarget::Member(member)) => {
                let object = self.lower_expr(&member.obj);
                let key = self.member_key(&member.prop);
                self.assign_field(object, key, compound, &assign.right, assign.span)
            }
            AssignTarget::Simple(SimpleAssignTarget::SuperProp(super_prop)) => {
                let key = match &super_prop.prop {
                    SuperProp::Ident(ident) => MemberKey::Named(ident.sym.to_string()),
                    SuperProp::Computed(computed) => {
                        MemberKey::Computed(self.lower_expr(&computed.expr))
                    }
                };
                self.assign_field(Operand::This, key, compound, &assign.right, assign.span)
            }
            AssignTarget::Simple(simple) => {
                let inner = match simple {
                    SimpleAssignTarget::Paren(paren) => Some(&*paren.expr),
                    SimpleAssignTarget::TsAs(as_expr) => Some(&*as_expr.expr),
                    SimpleAssignTarget::TsNonNull(non_null) => Some(&*non_null.expr),
                    SimpleAssignTarget::TsSatisfies(satisfies) => Some(&*satisfies.expr),
                    SimpleAssignTarget::TsTypeAssertion(assertion) => Some(&*assertion.expr),
                    _ => None,
                };
                let value = self.lower_expr(&assign.right);
                match inner {
                    Some(target) => {
                        let value = match compound {
                            Some(op) => {
                                let current = self.lower_expr(target);
                                Rvalue::Binary {
                                    op,
                                    left: current,
                                    right: value.clone(),
                                }
                            }
                            None => Rvalue::Use(value.clone()),
                        };
                        self.assign_to_expr(target, value, assign.span);
                    }
                    None => {
                        self.lossy = true;
                        self.emit(StmtKind::Eval(Rvalue::Use(value.clone())), assign.span);
                    }
                }
                value
            }
            AssignTarget::Pat(pattern) => {
                let value = self.lower_rvalue(&assign.right);
                let value = self.alias(value, assign.span);
                match pattern {
                    AssignTargetPat::Array(array) => {
                        self.bind_array(array, Some(value.clone()), BindMode::Assign)
                    }
                    AssignTargetPat::Object(object) => {
                        self.bind_object(object, Some(value.clone()), BindMode::Assign)
                    }
                    AssignTargetPat::Invalid(_) => self.lossy = true,
                }
                value
            }
        }
    }

    fn assign_field(
        &mut self,
        object: Operand,
        key: MemberKey,
        compound: Option<BinaryOp>,
        right: &'a Expr,
        span: Span,
    ) -> Operand {
        let value = match compound {
            None => self.lower_rvalue(right),
            Some(op) => {
                let current = self.into_operand(
                    Rvalue::Member {
                        object: object.clone(),
                        key: key.clone(),
                        optional: false,
                    },
                    span,
                );
                let right = self.lower_expr(right);
                Rvalue::Binary {
                    op,
                    left: current,
                    right,
                }
            }
        };
        let value = self.into_operand(value, span);
        self.emit(
            StmtKind::Assign {
                target: Place::Field { object, key },
                value: Rvalue::Use(value.clone()),
            },
            span,
        );
        value
    }

    fn lower_object(&mut self, object: &'a ObjectLit) -> Vec<Operand> {
        let mut ops = Vec::with_capacity(object.props.len());
        for prop in &object.props {
            match prop {
                PropOrSpread::Spread(spread) => ops.push(self.lower_expr(&spread.expr)),
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::Shorthand(ident) => ops.push(Operand::Local(name_ref(ident))),
                    Prop::KeyValue(kv) => {
                        ops.extend(self.lower_prop_key(&kv.key));
                        ops.push(self.lower_expr(&kv.value));
                    }
                    Prop::Assign(assign) => ops.push(self.lower_expr(&assign.value)),
                    Prop::Getter(getter) => {
                        ops.extend(self.lower_prop_key(&getter.key));
                        let header = UnitHeader {
                            kind: UnitKind::Method,
                            name: self.prop_name(&getter.key).map(|name| (name, getter.key.span())),
                            span: getter.span,
                            class: None,
                            has_body: getter.body.is_some(),
                            return_type: getter
                                .type_ann
                                .as_ref()
                                .map(|ann| TypeRef::from_ann(ann, self.file)),
                        };
                        let unit = self.in_unit(header, |this| {
                            if let Some(body) = &getter.body {
                                this.lower_stmts(&body.stmts);
                            }
                        });
                        ops.push(self.into_operand(Rvalue::Closure(unit), getter.span));
                    }
                    Prop::Setter(setter) => {
                        ops.extend(self.lower_prop_key(&setter.key));
                        let header = UnitHeader {
                            kind: UnitKind::Method,
                            name: self.prop_name(&setter.key).map(|name| (name, setter.key.span())),
                            span: setter.span,
                            class: None,
                            has_body: setter.body.is_some(),
                            return_type: None,
                        };
                        let unit = self.in_unit(header, |this| {
                            this.lower_param(&setter.param, 0, setter.param.span());
                            if let Some(body) = &setter.body {
                                this.lower_stmts(&body.stmts);
                            }
                        });
                        ops.push(self.into_operand(Rvalue::Closure(unit), setter.span));
                    }
                    Prop::Method(method) => {
                        ops.extend(self.lower_prop_key(&method.key));
                        let name = self
                            .prop_name(&method.key)
                            .map(|name| (name, method.key.span()));
                        let unit =
                            self.lower_function(&method.function, UnitKind::Method, name, None);
                        ops.push(self.into_operand(Rvalue::Closure(unit), method.function.span));
                    }
                },
            }
        }
        ops
    }

    fn lower_jsx_element(&mut self, element: &'a JSXElement) -> Vec<Operand> {
        let mut ops = Vec::new();
        match &element.opening.name {
            JSXElementName::Ident(ident) => {
                if ident.sym.starts_with(|c: char| c.is_ascii_uppercase()) {
                    ops.push(Operand::Local(name_ref(ident)));
                }
            }
            JSXElementName::JSXMemberExpr(member) => {
                ops.push(Operand::Local(jsx_object_root(&member.obj)));
            }
            JSXElementName::JSXNamespacedName(_) => {}
        }
        for attr in &element.opening.attrs {
            match attr {
                JSXAttrOrSpread::SpreadElement(spread) => ops.push(self.lower_expr(&spread.expr)),
                JSXAttrOrSpread::JSXAttr(attr) => match &attr.value {
                    Some(JSXAttrValue::JSXExprContainer(container)) => {
                        if let JSXExpr::Expr(expr) = &container.expr {
                            ops.push(self.lower_expr(expr));
                        }
                    }
                    Some(JSXAttrValue::JSXElement(nested)) => {
                        ops.extend(self.lower_jsx_element(nested))
                    }
                    Some(JSXAttrValue::JSXFragment(fragment)) => {
                        ops.extend(self.lower_jsx_children(&fragment.children))
                    }
                    _ => {}
                },
            }
        }
        ops.extend(self.lower_jsx_children(&element.children));
        ops
    }

    fn lower_jsx_children(&mut self, children: &'a [JSXElementChild]) -> Vec<Operand> {
        let mut ops = Vec::new();
        for child in children {
            match child {
                JSXElementChild::JSXExprContainer(container) => {
                    if let JSXExpr::Expr(expr) = &container.expr {
                        ops.push(self.lower_expr(expr));
                    }
                }
                JSXElementChild::JSXSpreadChild(spread) => ops.push(self.lower_expr(&spread.expr)),
                JSXElementChild::JSXElement(element) => ops.extend(self.lower_jsx_element(element)),
                JSXElementChild::JSXFragment(fragment) => {
                    ops.extend(self.lower_jsx_children(&fragment.children))
                }
                JSXElementChild::JSXText(_) => {}
            }
        }
        ops
    }
}

impl ObjectShape {
    fn merge(&mut self, other: ObjectShape) {
        self.fields.extend(other.fields);
        self.methods.extend(other.methods);
    }
}

fn name_ref(ident: &Ident) -> NameRef {
    NameRef {
        name: ident.sym.to_string(),
        span: ident.span,
    }
}

fn jsx_object_root(object: &JSXObject) -> NameRef {
    match object {
        JSXObject::Ident(ident) => name_ref(ident),
        JSXObject::JSXMemberExpr(member) => jsx_object_root(&member.obj),
    }
}

pub(crate) fn unparen(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(paren) => unparen(&paren.expr),
        other => other,
    }
}

fn expr_root(expr: &Expr) -> Option<&Ident> {
    match expr {
        Expr::Ident(ident) => Some(ident),
        Expr::Member(member) => expr_root(&member.obj),
        _ => None,
    }
}

fn expr_key_name(key: &Expr) -> Option<String> {
    match key {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        _ => None,
    }
}

fn pattern_type_ann(pat: &Pat) -> Option<&swc_ecma_ast::TsTypeAnn> {
    match pat {
        Pat::Object(object) => object.type_ann.as_deref(),
        Pat::Array(array) => array.type_ann.as_deref(),
        _ => None,
    }
}

fn is_logical(op: BinaryOp) -> bool {
    matches!(op, BinaryOp::LogicalAnd | BinaryOp::LogicalOr)
}

fn is_logical_assign(op: AssignOp) -> bool {
    matches!(
        op,
        AssignOp::AndAssign | AssignOp::OrAssign | AssignOp::NullishAssign
    )
}

fn compound_operator(op: AssignOp) -> Option<BinaryOp> {
    let binary = match op {
        AssignOp::Assign => return None,
        AssignOp::AddAssign => BinaryOp::Add,
        AssignOp::SubAssign => BinaryOp::Sub,
        AssignOp::MulAssign => BinaryOp::Mul,
        AssignOp::DivAssign => BinaryOp::Div,
        AssignOp::ModAssign => BinaryOp::Mod,
        AssignOp::LShiftAssign => BinaryOp::LShift,
        AssignOp::RShiftAssign => BinaryOp::RShift,
        AssignOp::ZeroFillRShiftAssign => BinaryOp::ZeroFillRShift,
        AssignOp::BitOrAssign => BinaryOp::BitOr,
        AssignOp::BitXorAssign => BinaryOp::BitXor,
        AssignOp::BitAndAssign => BinaryOp::BitAnd,
        AssignOp::ExpAssign => BinaryOp::Exp,
        AssignOp::AndAssign => BinaryOp::LogicalAnd,
        AssignOp::OrAssign => BinaryOp::LogicalOr,
        AssignOp::NullishAssign => BinaryOp::NullishCoalescing,
    };
    Some(binary)
}
