//! Lowered statement representation.
//!
//! Every function-like construct becomes a [`Unit`] holding a flat list of
//! three-address-like statements. Compound sub-expressions are linearized
//! through synthetic temporaries (`%t0`, `%t1`, ...); source-named bindings
//! are referenced by [`NameRef`] and resolved lazily against the scope tree.

use std::collections::HashMap;

use id_arena::Id;
use swc_common::Span;
use swc_ecma_ast::{BinaryOp, UnaryOp};

use super::types::{LiteralType, TypeRef};
use crate::semantic::scope::ScopeId;

pub type UnitId = Id<Unit>;
pub type StmtId = Id<LoweredStmt>;
pub type DeclId = Id<Declaration>;
pub type ClassId = Id<ClassInfo>;
pub type SiteId = Id<ConditionSite>;

/// Reserved first character of every synthetic temporary name.
pub const TEMP_PREFIX: &str = "%t";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TempId(pub u32);

impl TempId {
    pub fn name(self) -> String {
        format!("{}{}", TEMP_PREFIX, self.0)
    }

    pub fn parse(name: &str) -> Option<Self> {
        name.strip_prefix(TEMP_PREFIX)?.parse().ok().map(TempId)
    }
}

pub fn is_synthetic_name(name: &str) -> bool {
    name.starts_with(TEMP_PREFIX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    File,
    Namespace,
    ClassInit,
    Function,
    Method,
    Arrow,
    StaticBlock,
}

#[derive(Debug)]
pub struct Unit {
    pub id: UnitId,
    pub kind: UnitKind,
    pub name: Option<String>,
    pub name_span: Option<Span>,
    pub parent: Option<UnitId>,
    pub scope: ScopeId,
    pub span: Span,
    pub class: Option<ClassId>,
    pub params: Vec<DeclId>,
    pub has_body: bool,
    pub ambient: bool,
    pub return_type: Option<TypeRef>,
    pub stmts: Vec<StmtId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NameRef {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Undefined,
    Null,
    Bool(bool),
    Str { non_empty: bool },
    Num { non_zero: bool },
    Regex,
}

impl Literal {
    pub fn literal_type(&self) -> TypeRef {
        match self {
            Literal::Undefined => TypeRef::Undefined,
            Literal::Null => TypeRef::Null,
            Literal::Bool(value) => TypeRef::Literal(LiteralType::Bool(*value)),
            Literal::Str { non_empty } => TypeRef::Literal(LiteralType::Str(*non_empty)),
            Literal::Num { non_zero } => TypeRef::Literal(LiteralType::Num(*non_zero)),
            Literal::Regex => TypeRef::Object,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Local(NameRef),
    Temp(TempId),
    This,
    Const(Literal),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKey {
    Named(String),
    Computed(Operand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    Value(Operand),
    Method { receiver: Operand, name: String },
    Super,
    Import,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rvalue {
    Use(Operand),
    Binary {
        op: BinaryOp,
        left: Operand,
        right: Operand,
    },
    Unary {
        op: UnaryOp,
        operand: Operand,
    },
    Member {
        object: Operand,
        key: MemberKey,
        optional: bool,
    },
    Call {
        target: CallTarget,
        args: Vec<Operand>,
        optional: bool,
    },
    New {
        callee: Operand,
        args: Vec<Operand>,
    },
    Closure(UnitId),
    Aggregate(Vec<Operand>),
    Template(Vec<Operand>),
    /// One of several values, as produced by `c ? a : b`.
    Choice(Vec<Operand>),
    Await(Operand),
    /// Type assertion; `None` is a non-null assertion (`x!`).
    Cast {
        operand: Operand,
        ty: Option<TypeRef>,
    },
    /// A value the lowering does not model; its operands are still reads.
    Opaque(Vec<Operand>),
}

impl Rvalue {
    pub fn operands(&self) -> Vec<&Operand> {
        match self {
            Rvalue::Use(op) | Rvalue::Await(op) => vec![op],
            Rvalue::Cast { operand, .. } => vec![operand],
            Rvalue::Unary { operand, .. } => vec![operand],
            Rvalue::Binary { left, right, .. } => vec![left, right],
            Rvalue::Member { object, key, .. } => {
                let mut ops = vec![object];
                if let MemberKey::Computed(key) = key {
                    ops.push(key);
                }
                ops
            }
            Rvalue::Call { target, args, .. } => {
                let mut ops: Vec<&Operand> = match target {
                    CallTarget::Value(callee) => vec![callee],
                    CallTarget::Method { receiver, .. } => vec![receiver],
                    CallTarget::Super | CallTarget::Import => Vec::new(),
                };
                ops.extend(args.iter());
                ops
            }
            Rvalue::New { callee, args } => {
                let mut ops = vec![callee];
                ops.extend(args.iter());
                ops
            }
            Rvalue::Closure(_) => Vec::new(),
            Rvalue::Aggregate(ops)
            | Rvalue::Template(ops)
            | Rvalue::Choice(ops)
            | Rvalue::Opaque(ops) => ops.iter().collect(),
        }
    }

    /// Operands passed as invocation arguments.
    pub fn arguments(&self) -> &[Operand] {
        match self {
            Rvalue::Call { args, .. } | Rvalue::New { args, .. } => args,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Local(NameRef),
    Temp(TempId),
    Field { object: Operand, key: MemberKey },
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// Declaration without a value: parameters, functions, classes, imports, `let x;`.
    Bind(NameRef),
    Assign { target: Place, value: Rvalue },
    Eval(Rvalue),
    Branch(Operand),
    Return(Option<Operand>),
    Throw(Operand),
    /// A binding referenced from a type position.
    TypeUse(NameRef),
}

#[derive(Debug)]
pub struct LoweredStmt {
    pub id: StmtId,
    pub unit: UnitId,
    pub scope: ScopeId,
    pub kind: StmtKind,
    pub span: Span,
    /// Span of the originating syntax statement (or statement header).
    pub origin: Span,
    /// Set when the lowering dropped parts of the originating syntax.
    pub lossy: bool,
}

impl LoweredStmt {
    /// Operands read by this statement.
    pub fn reads(&self) -> Vec<&Operand> {
        match &self.kind {
            StmtKind::Bind(_) | StmtKind::TypeUse(_) => Vec::new(),
            StmtKind::Assign { target, value } => {
                let mut ops = value.operands();
                if let Place::Field { object, key } = target {
                    ops.push(object);
                    if let MemberKey::Computed(key) = key {
                        ops.push(key);
                    }
                }
                ops
            }
            StmtKind::Eval(value) => value.operands(),
            StmtKind::Branch(op) | StmtKind::Throw(op) => vec![op],
            StmtKind::Return(op) => op.iter().collect(),
        }
    }

    /// Source-named binding written by this statement, if any.
    pub fn defined_name(&self) -> Option<&NameRef> {
        match &self.kind {
            StmtKind::Bind(name) => Some(name),
            StmtKind::Assign {
                target: Place::Local(name),
                ..
            } => Some(name),
            _ => None,
        }
    }

    pub fn defined_temp(&self) -> Option<TempId> {
        match &self.kind {
            StmtKind::Assign {
                target: Place::Temp(temp),
                ..
            } => Some(*temp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Var,
    Let,
    Const,
    Using,
    Param,
    Function,
    Class,
    Import,
    CatchParam,
    Enum,
    TypeAlias,
    Interface,
    Namespace,
    TypeParam,
}

impl DeclKind {
    pub fn is_mutable(self) -> bool {
        matches!(self, DeclKind::Var | DeclKind::Let | DeclKind::Param)
    }

    pub fn is_type_only(self) -> bool {
        matches!(
            self,
            DeclKind::TypeAlias | DeclKind::Interface | DeclKind::TypeParam
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternShape {
    Object,
    Array,
}

impl PatternShape {
    /// Name under which the lowering records a destructured parameter.
    pub fn marker(self) -> &'static str {
        match self {
            PatternShape::Object => "ObjectBindingPattern",
            PatternShape::Array => "ArrayBindingPattern",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Plain,
    /// Direct element of an array destructuring pattern.
    ArrayElement,
    /// Property of an object pattern that also has a `...rest` element.
    RestSibling,
    /// Destructured parameter whose element names live only in source text.
    Pattern(PatternShape),
}

#[derive(Debug)]
pub struct Declaration {
    pub id: DeclId,
    pub name: String,
    pub kind: DeclKind,
    pub scope: ScopeId,
    pub unit: UnitId,
    pub span: Span,
    pub origin: Span,
    pub declared_type: Option<TypeRef>,
    pub exported: bool,
    pub ambient: bool,
    pub decorated: bool,
    pub provenance: Provenance,
    pub param_index: Option<usize>,
    pub param_property: bool,
    /// Unit whose body belongs to this binding (functions, classes, closures).
    pub body_unit: Option<UnitId>,
    pub class: Option<ClassId>,
}

#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub name: String,
    pub declared_type: Option<TypeRef>,
    pub initializer: Option<StmtId>,
    pub decorators: Vec<String>,
    pub is_static: bool,
}

#[derive(Debug)]
pub struct ClassInfo {
    pub id: ClassId,
    pub name: Option<String>,
    pub decl: Option<DeclId>,
    pub init_unit: UnitId,
    pub span: Span,
    pub fields: HashMap<String, FieldInfo>,
    pub methods: HashMap<String, Option<TypeRef>>,
    pub decorators: Vec<String>,
    pub has_static_block: bool,
}

/// Property and method types of an interface declaration.
#[derive(Debug, Default, Clone)]
pub struct ObjectShape {
    pub fields: HashMap<String, TypeRef>,
    pub methods: HashMap<String, TypeRef>,
}

#[derive(Debug, Clone)]
pub struct EnumInfo {
    pub name: String,
    pub members: Vec<LiteralType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteOrigin {
    /// Test of `if`, `while`, `do ... while` or `for`.
    Test,
    Ternary,
    Negation,
    LogicalOperand,
    /// Returned expression of an inline array predicate.
    Predicate,
}

/// A syntax position evaluated as a boolean.
#[derive(Debug)]
pub struct ConditionSite {
    pub id: SiteId,
    pub span: Span,
    pub stmt: StmtId,
    pub unit: UnitId,
    pub scope: ScopeId,
    pub origin: SiteOrigin,
}

#[derive(Debug, Clone)]
pub struct ExportRef {
    pub name: String,
    pub span: Span,
    pub scope: ScopeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportKind {
    Default,
    Named(String),
    Namespace,
}

#[derive(Debug, Clone)]
pub struct ImportRef {
    pub local: String,
    pub source: String,
    pub kind: ImportKind,
    pub span: Span,
    pub type_only: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_names_round_trip_through_prefix() {
        let temp = TempId(12);

        assert_eq!(temp.name(), "%t12");
        assert_eq!(TempId::parse("%t12"), Some(temp));
        assert!(is_synthetic_name(&temp.name()));
        assert_eq!(TempId::parse("t12"), None);
        assert!(!is_synthetic_name("value"));
    }

    #[test]
    fn call_operands_include_receiver_and_arguments() {
        let value = Rvalue::Call {
            target: CallTarget::Method {
                receiver: Operand::This,
                name: "run".into(),
            },
            args: vec![Operand::Temp(TempId(0)), Operand::Const(Literal::Null)],
            optional: false,
        };

        assert_eq!(value.operands().len(), 3);
        assert_eq!(value.arguments().len(), 2);
    }

    #[test]
    fn literal_types_keep_truthiness() {
        assert_eq!(
            Literal::Str { non_empty: false }.literal_type(),
            TypeRef::Literal(LiteralType::Str(false))
        );
        assert_eq!(Literal::Regex.literal_type(), TypeRef::Object);
    }
}
