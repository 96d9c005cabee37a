//! Type narrowing for values tested in boolean context.
//!
//! The engine derives a best-effort [`TypeRef`] for the operand of a
//! condition site by walking the lowered statements: literals, bindings and
//! their assignments, call return types, class and interface members. The
//! resulting type is split into [`VariantKind`]s, which is what the
//! strict-boolean-expressions check reasons about.
//!
//! Derivation is driven by an ordered table of rules (see [`DERIVATIONS`]);
//! the first rule whose predicate accepts the rvalue decides its type.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use swc_ecma_ast::{BinaryOp, UnaryOp};
use tracing::{Level, span, trace, warn};

use crate::program::{
    CallTarget, ClassId, DeclId, DeclKind, LiteralType, LoweredStmt, MemberKey, Operand,
    ProgramModel, Rvalue, StmtKind, TypeRef, UnitId,
};
use crate::semantic::bindings::{BindingId, BindingIndex};
use crate::semantic::defuse::DefUseResolver;
use crate::semantic::scope::ScopeId;
use crate::semantic::site::ResolvedSite;

/// Bound on nested derivation steps before a value degrades to `any`.
pub const MAX_DERIVATION_DEPTH: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VariantKind {
    Nullish,
    Boolean,
    TruthyBoolean,
    String,
    TruthyString,
    Number,
    TruthyNumber,
    Object,
    Enum,
    Any,
    Never,
}

impl VariantKind {
    pub const ALL: [VariantKind; 11] = [
        VariantKind::Nullish,
        VariantKind::Boolean,
        VariantKind::TruthyBoolean,
        VariantKind::String,
        VariantKind::TruthyString,
        VariantKind::Number,
        VariantKind::TruthyNumber,
        VariantKind::Object,
        VariantKind::Enum,
        VariantKind::Any,
        VariantKind::Never,
    ];

    fn bit(self) -> u16 {
        1 << self as u16
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VariantKind::Nullish => "nullish",
            VariantKind::Boolean => "boolean",
            VariantKind::TruthyBoolean => "truthy boolean",
            VariantKind::String => "string",
            VariantKind::TruthyString => "truthy string",
            VariantKind::Number => "number",
            VariantKind::TruthyNumber => "truthy number",
            VariantKind::Object => "object",
            VariantKind::Enum => "enum",
            VariantKind::Any => "any",
            VariantKind::Never => "never",
        }
    }
}

/// A small set of [`VariantKind`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VariantSet(u16);

impl VariantSet {
    pub fn of(kinds: &[VariantKind]) -> Self {
        let mut set = Self::default();
        for &kind in kinds {
            set.insert(kind);
        }
        set
    }

    pub fn insert(&mut self, kind: VariantKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: VariantKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = VariantKind> + '_ {
        VariantKind::ALL
            .into_iter()
            .filter(|kind| self.contains(*kind))
    }

    /// Exactly these kinds, no more and no fewer.
    pub fn is(&self, kinds: &[VariantKind]) -> bool {
        *self == Self::of(kinds)
    }

    /// Every kind in the set is one of `kinds`.
    pub fn is_subset_of(&self, kinds: &[VariantKind]) -> bool {
        let other = Self::of(kinds);
        self.0 & !other.0 == 0
    }
}

impl std::fmt::Display for VariantSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(VariantKind::as_str).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A boolean, `never`, or `true` mixed with nullish.
    Safe,
    /// Only nullish values.
    AlwaysFalse,
    /// Only objects.
    AlwaysTrue,
    /// Depends on what the configuration allows.
    RequiresPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub kinds: VariantSet,
    pub verdict: Verdict,
}

impl Classification {
    pub fn new(kinds: VariantSet) -> Self {
        use VariantKind::*;
        let verdict = if kinds.is_subset_of(&[Boolean, TruthyBoolean])
            || kinds.is(&[Never])
            || kinds.is(&[Nullish, TruthyBoolean])
        {
            Verdict::Safe
        } else if kinds.is(&[Nullish]) {
            Verdict::AlwaysFalse
        } else if kinds.is(&[Object]) {
            Verdict::AlwaysTrue
        } else {
            Verdict::RequiresPolicy
        };
        Self { kinds, verdict }
    }

    pub fn requires_policy_decision(&self) -> bool {
        self.verdict == Verdict::RequiresPolicy
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Derivation {
    Binary,
    Literal,
    Binding,
    Invocation,
    Field,
    Wrapper,
    Structural,
}

/// Type derivation rules in priority order.
const DERIVATIONS: [(Derivation, fn(&Rvalue) -> bool); 7] = [
    (Derivation::Binary, is_binary),
    (Derivation::Literal, is_literal),
    (Derivation::Binding, is_binding),
    (Derivation::Invocation, is_invocation),
    (Derivation::Field, is_field),
    (Derivation::Wrapper, is_wrapper),
    (Derivation::Structural, is_structural),
];

fn is_binary(value: &Rvalue) -> bool {
    matches!(value, Rvalue::Binary { .. })
}

fn is_literal(value: &Rvalue) -> bool {
    matches!(value, Rvalue::Use(Operand::Const(_)))
}

fn is_binding(value: &Rvalue) -> bool {
    matches!(value, Rvalue::Use(_))
}

fn is_invocation(value: &Rvalue) -> bool {
    matches!(value, Rvalue::Call { .. })
}

fn is_field(value: &Rvalue) -> bool {
    matches!(value, Rvalue::Member { .. })
}

fn is_wrapper(value: &Rvalue) -> bool {
    matches!(
        value,
        Rvalue::Unary { .. } | Rvalue::Await(_) | Rvalue::Cast { .. }
    )
}

fn is_structural(value: &Rvalue) -> bool {
    matches!(
        value,
        Rvalue::New { .. }
            | Rvalue::Closure(_)
            | Rvalue::Aggregate(_)
            | Rvalue::Template(_)
            | Rvalue::Choice(_)
            | Rvalue::Opaque(_)
    )
}

const BOOLEAN_METHODS: &[&str] = &[
    "test",
    "includes",
    "startsWith",
    "endsWith",
    "has",
    "every",
    "some",
    "isArray",
    "hasOwnProperty",
    "hasOwn",
    "isPrototypeOf",
    "propertyIsEnumerable",
    "isNaN",
    "isFinite",
    "isInteger",
    "isSafeInteger",
    "isFrozen",
    "isSealed",
    "isExtensible",
    "isView",
    "delete",
];

const NULLABLE_OBJECT_METHODS: &[&str] = &["exec", "match"];

const NUMBER_METHODS: &[&str] = &[
    "indexOf",
    "lastIndexOf",
    "search",
    "findIndex",
    "findLastIndex",
    "charCodeAt",
    "localeCompare",
    "push",
    "unshift",
    "getTime",
    "valueOf",
    "now",
    "abs",
    "ceil",
    "floor",
    "round",
    "trunc",
    "sign",
    "sqrt",
    "pow",
    "max",
    "min",
    "random",
    "parseInt",
    "parseFloat",
];

const STRING_METHODS: &[&str] = &[
    "toString",
    "toUpperCase",
    "toLowerCase",
    "toLocaleUpperCase",
    "toLocaleLowerCase",
    "trim",
    "trimStart",
    "trimEnd",
    "substring",
    "substr",
    "padStart",
    "padEnd",
    "repeat",
    "replace",
    "replaceAll",
    "charAt",
    "join",
    "toFixed",
    "toPrecision",
    "toISOString",
    "toLocaleString",
    "toDateString",
    "toTimeString",
    "normalize",
    "stringify",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nominal {
    Class(ClassId),
    Interface(DeclId),
}

pub struct NarrowingEngine<'r, 'i, 'm, 'a> {
    index: &'i BindingIndex<'m, 'a>,
    defuse: &'r DefUseResolver<'i, 'm, 'a>,
    visiting: RefCell<HashSet<BindingId>>,
    binding_types: RefCell<HashMap<BindingId, TypeRef>>,
}

impl<'r, 'i, 'm, 'a> NarrowingEngine<'r, 'i, 'm, 'a> {
    pub fn new(index: &'i BindingIndex<'m, 'a>, defuse: &'r DefUseResolver<'i, 'm, 'a>) -> Self {
        Self {
            index,
            defuse,
            visiting: RefCell::new(HashSet::new()),
            binding_types: RefCell::new(HashMap::new()),
        }
    }

    fn model(&self) -> &'m ProgramModel<'a> {
        self.index.model()
    }

    /// Variant kinds of the value tested at a condition site.
    pub fn classify_condition(&self, site: &ResolvedSite<'_>) -> Classification {
        let _span = span!(Level::TRACE, "classify_condition", site = site.id.index()).entered();
        let ty = self.site_type(site);
        let kinds = variant_kinds(&ty);
        trace!(?ty, %kinds, "classified condition");
        Classification::new(kinds)
    }

    /// Derived type of the value tested at a condition site.
    pub fn site_type(&self, site: &ResolvedSite<'_>) -> TypeRef {
        let stmt = self.model().stmt(site.stmt);
        self.operand_type(&site.operand, stmt, 0)
    }

    /// Derived type of an operand read by `stmt`.
    pub fn operand_type(&self, operand: &Operand, stmt: &LoweredStmt, depth: usize) -> TypeRef {
        match operand {
            Operand::Const(literal) => literal.literal_type(),
            Operand::This => TypeRef::Object,
            Operand::Local(name) => match self.index.resolve_binding(&name.name, stmt.scope) {
                Some(binding) => self.binding_type(binding, depth + 1),
                None => global_type(&name.name),
            },
            Operand::Temp(temp) => {
                let Some(def) = self.index.temp_def(*temp) else {
                    return TypeRef::Any;
                };
                let def = self.model().stmt(def);
                match &def.kind {
                    StmtKind::Assign { value, .. } => self.rvalue_type(value, def, depth + 1),
                    _ => TypeRef::Any,
                }
            }
        }
    }

    fn rvalue_type(&self, value: &Rvalue, stmt: &LoweredStmt, depth: usize) -> TypeRef {
        if depth > MAX_DERIVATION_DEPTH {
            warn!(depth, "type derivation exceeds depth bound, using any");
            return TypeRef::Any;
        }
        let Some(&(derivation, _)) = DERIVATIONS.iter().find(|(_, applies)| applies(value)) else {
            return TypeRef::Any;
        };
        trace!(?derivation, "deriving type");

        match (derivation, value) {
            (Derivation::Binary, Rvalue::Binary { op, left, right }) => {
                self.binary_type(*op, left, right, stmt, depth)
            }
            (Derivation::Literal | Derivation::Binding, Rvalue::Use(operand)) => {
                self.operand_type(operand, stmt, depth)
            }
            (
                Derivation::Invocation,
                Rvalue::Call {
                    target, optional, ..
                },
            ) => {
                let ty = self.call_type(target, stmt, depth);
                if *optional { ty.or_undefined() } else { ty }
            }
            (
                Derivation::Field,
                Rvalue::Member {
                    object,
                    key,
                    optional,
                },
            ) => self.member_type(object, key, *optional, stmt, depth),
            (Derivation::Wrapper, _) => self.wrapper_type(value, stmt, depth),
            (Derivation::Structural, _) => self.structural_type(value, stmt, depth),
            _ => TypeRef::Any,
        }
    }

    fn binary_type(
        &self,
        op: BinaryOp,
        left: &Operand,
        right: &Operand,
        stmt: &LoweredStmt,
        depth: usize,
    ) -> TypeRef {
        match op {
            BinaryOp::LogicalOr | BinaryOp::LogicalAnd => TypeRef::union(vec![
                self.operand_type(left, stmt, depth),
                self.operand_type(right, stmt, depth),
            ]),
            BinaryOp::NullishCoalescing => TypeRef::union(vec![
                self.operand_type(left, stmt, depth).non_nullable(),
                self.operand_type(right, stmt, depth),
            ]),
            BinaryOp::EqEq
            | BinaryOp::NotEq
            | BinaryOp::EqEqEq
            | BinaryOp::NotEqEq
            | BinaryOp::Lt
            | BinaryOp::LtEq
            | BinaryOp::Gt
            | BinaryOp::GtEq
            | BinaryOp::In
            | BinaryOp::InstanceOf => TypeRef::Boolean,
            BinaryOp::Add => {
                let left = self.operand_type(left, stmt, depth);
                let right = self.operand_type(right, stmt, depth);
                if is_string_like(&left) || is_string_like(&right) {
                    TypeRef::String
                } else if is_number_like(&left) && is_number_like(&right) {
                    TypeRef::Number
                } else {
                    TypeRef::Any
                }
            }
            _ => TypeRef::Number,
        }
    }

    fn wrapper_type(&self, value: &Rvalue, stmt: &LoweredStmt, depth: usize) -> TypeRef {
        match value {
            Rvalue::Unary { op, .. } => match op {
                UnaryOp::Bang | UnaryOp::Delete => TypeRef::Boolean,
                UnaryOp::TypeOf => TypeRef::String,
                UnaryOp::Void => TypeRef::Undefined,
                UnaryOp::Minus | UnaryOp::Plus | UnaryOp::Tilde => TypeRef::Number,
            },
            Rvalue::Await(operand) => awaited(self.operand_type(operand, stmt, depth)),
            Rvalue::Cast {
                ty: Some(ty),
                ..
            } => self.resolve_type(ty, stmt.scope, depth + 1),
            Rvalue::Cast { operand, ty: None } => {
                self.operand_type(operand, stmt, depth).non_nullable()
            }
            _ => TypeRef::Any,
        }
    }

    fn structural_type(&self, value: &Rvalue, stmt: &LoweredStmt, depth: usize) -> TypeRef {
        match value {
            Rvalue::New {
                callee: Operand::Local(name),
                ..
            } => match self.index.resolve_binding(&name.name, stmt.scope) {
                Some(binding)
                    if self.model().decl(self.index.get(binding).decl).kind == DeclKind::Class =>
                {
                    TypeRef::Named(name.name.clone())
                }
                _ => TypeRef::Object,
            },
            Rvalue::New { .. } | Rvalue::Closure(_) | Rvalue::Aggregate(_) => TypeRef::Object,
            Rvalue::Template(_) => TypeRef::String,
            Rvalue::Choice(options) => TypeRef::union(
                options
                    .iter()
                    .map(|option| self.operand_type(option, stmt, depth))
                    .collect(),
            ),
            _ => TypeRef::Any,
        }
    }

    /// Type of a binding: its single assigned value, else its annotation,
    /// else the union of everything assigned to it.
    fn binding_type(&self, id: BindingId, depth: usize) -> TypeRef {
        if depth > MAX_DERIVATION_DEPTH {
            warn!(depth, "binding type derivation exceeds depth bound, using any");
            return TypeRef::Any;
        }
        if let Some(ty) = self.binding_types.borrow().get(&id) {
            return ty.clone();
        }
        if !self.visiting.borrow_mut().insert(id) {
            // Reached again while deriving itself, as in `x ||= y`.
            let decl = self.model().decl(self.index.get(id).decl);
            return decl
                .declared_type
                .as_ref()
                .map(|ty| self.resolve_type(ty, decl.scope, depth + 1))
                .unwrap_or(TypeRef::Never);
        }

        let ty = self.derive_binding_type(id, depth);
        self.visiting.borrow_mut().remove(&id);
        self.binding_types.borrow_mut().insert(id, ty.clone());
        ty
    }

    fn derive_binding_type(&self, id: BindingId, depth: usize) -> TypeRef {
        let binding = self.index.get(id);
        let decl = self.model().decl(binding.decl);
        let declared = decl
            .declared_type
            .as_ref()
            .map(|ty| self.resolve_type(ty, decl.scope, depth + 1));

        if binding.is_pattern_element() {
            return declared
                .and_then(|ty| {
                    let nominal = self.nominal_of_type(&ty, decl.scope)?;
                    self.nominal_member(nominal, &binding.name, depth + 1)
                })
                .unwrap_or(TypeRef::Any);
        }

        match decl.kind {
            DeclKind::Function | DeclKind::Class | DeclKind::Namespace | DeclKind::Enum => {
                TypeRef::Object
            }
            DeclKind::Interface | DeclKind::TypeAlias | DeclKind::TypeParam | DeclKind::Import => {
                TypeRef::Any
            }
            DeclKind::CatchParam => declared.unwrap_or(TypeRef::Unknown),
            DeclKind::Param => match declared {
                // A default value removes `undefined` from the parameter type.
                Some(ty) if self.has_default(id) => strip_undefined(ty),
                Some(ty) => ty,
                None => {
                    let assigned = self.assigned_types(id, depth);
                    if assigned.is_empty() {
                        TypeRef::Any
                    } else {
                        TypeRef::union(assigned).widened()
                    }
                }
            },
            DeclKind::Var | DeclKind::Let | DeclKind::Const | DeclKind::Using => {
                let mut assigned = self.assigned_types(id, depth);
                if assigned.len() == 1 {
                    // A single write is the value the binding holds; the
                    // annotation only stands in when that value is unresolved.
                    let value = assigned.remove(0);
                    match declared {
                        Some(declared) if matches!(value, TypeRef::Any | TypeRef::Unknown) => {
                            declared
                        }
                        _ => value,
                    }
                } else if let Some(declared) = declared {
                    declared
                } else if assigned.is_empty() {
                    TypeRef::Any
                } else if decl.kind == DeclKind::Const {
                    TypeRef::union(assigned)
                } else {
                    TypeRef::union(assigned).widened()
                }
            }
        }
    }

    /// Parameter default values are the writes spanning the parameter name.
    fn has_default(&self, id: BindingId) -> bool {
        let name_span = self.model().decl(self.index.get(id).decl).span;
        self.defuse.defs(id).iter().any(|def| {
            let stmt = self.model().stmt(def.stmt);
            matches!(stmt.kind, StmtKind::Assign { .. }) && stmt.span.contains(name_span)
        })
    }

    /// Types of every value written to a binding.
    fn assigned_types(&self, id: BindingId, depth: usize) -> Vec<TypeRef> {
        self.defuse
            .defs(id)
            .iter()
            .filter_map(|def| {
                let stmt = self.model().stmt(def.stmt);
                match &stmt.kind {
                    StmtKind::Assign { value, .. } => Some(self.rvalue_type(value, stmt, depth + 1)),
                    _ => None,
                }
            })
            .collect()
    }

    fn call_type(&self, target: &CallTarget, stmt: &LoweredStmt, depth: usize) -> TypeRef {
        match target {
            CallTarget::Value(Operand::Local(name)) => {
                match self.index.resolve_binding(&name.name, stmt.scope) {
                    Some(binding) => self.callable_return(binding, depth),
                    None => global_call_type(&name.name),
                }
            }
            CallTarget::Value(Operand::Temp(temp)) => {
                let unit = self.index.temp_def(*temp).and_then(|def| {
                    match &self.model().stmt(def).kind {
                        StmtKind::Assign {
                            value: Rvalue::Closure(unit),
                            ..
                        } => Some(*unit),
                        _ => None,
                    }
                });
                unit.map(|unit| self.unit_return(unit, depth))
                    .unwrap_or(TypeRef::Any)
            }
            CallTarget::Value(_) | CallTarget::Super => TypeRef::Any,
            CallTarget::Import => TypeRef::Promise(Box::new(TypeRef::Any)),
            CallTarget::Method { receiver, name } => {
                let receiver_type = self.operand_type(receiver, stmt, depth);
                let declared = self
                    .receiver_nominals(receiver, &receiver_type, stmt)
                    .into_iter()
                    .find_map(|nominal| self.nominal_method(nominal, name, depth));
                declared.unwrap_or_else(|| builtin_method_type(name))
            }
        }
    }

    fn callable_return(&self, id: BindingId, depth: usize) -> TypeRef {
        let binding = self.index.get(id);
        if binding.is_pattern_element() {
            return TypeRef::Any;
        }
        match self.model().decl(binding.decl).body_unit {
            Some(unit) => self.unit_return(unit, depth),
            None => TypeRef::Any,
        }
    }

    fn unit_return(&self, unit: UnitId, depth: usize) -> TypeRef {
        let unit = self.model().unit(unit);
        unit.return_type
            .as_ref()
            .map(|ty| self.resolve_type(ty, unit.scope, depth + 1))
            .unwrap_or(TypeRef::Any)
    }

    fn member_type(
        &self,
        object: &Operand,
        key: &MemberKey,
        optional: bool,
        stmt: &LoweredStmt,
        depth: usize,
    ) -> TypeRef {
        let object_type = self.operand_type(object, stmt, depth);
        let through_nullish = optional || contains_nullish(&object_type);

        let ty = match key {
            MemberKey::Computed(_) => TypeRef::Any,
            MemberKey::Named(name) => {
                if let Some(members) = self.enum_object(object, stmt) {
                    TypeRef::Enum(members)
                } else {
                    let mut found: Option<TypeRef> = None;
                    for nominal in self.receiver_nominals(object, &object_type, stmt) {
                        if let Some(ty) = self.nominal_member(nominal, name, depth) {
                            // An unresolved member type is retried on the next receiver.
                            if !ty.is_unresolved() {
                                found = Some(ty);
                                break;
                            }
                            found.get_or_insert(ty);
                        }
                    }
                    match found {
                        Some(ty) => ty,
                        None if name == "length" => TypeRef::Number,
                        None => TypeRef::Any,
                    }
                }
            }
        };

        if through_nullish { ty.or_undefined() } else { ty }
    }

    /// Members of an enum when `object` is the enum itself (`Color.Red`).
    fn enum_object(&self, object: &Operand, stmt: &LoweredStmt) -> Option<Vec<LiteralType>> {
        let Operand::Local(name) = object else {
            return None;
        };
        let binding = self.index.resolve_binding(&name.name, stmt.scope)?;
        let decl = self.model().decl(self.index.get(binding).decl);
        if decl.kind != DeclKind::Enum {
            return None;
        }
        Some(self.model().enum_info(decl.id)?.members.clone())
    }

    /// Classes and interfaces a member access may be looked up on, declared
    /// type first, then the class the value was constructed from.
    fn receiver_nominals(
        &self,
        receiver: &Operand,
        receiver_type: &TypeRef,
        stmt: &LoweredStmt,
    ) -> Vec<Nominal> {
        let mut nominals = Vec::new();
        let mut push = |nominal: Nominal| {
            if !nominals.contains(&nominal) {
                nominals.push(nominal);
            }
        };

        match receiver {
            Operand::This => {
                if let Some(class) = self.model().unit(stmt.unit).class {
                    push(Nominal::Class(class));
                }
            }
            Operand::Local(name) => {
                if let Some(binding) = self.index.resolve_binding(&name.name, stmt.scope) {
                    let decl = self.model().decl(self.index.get(binding).decl);
                    if let (DeclKind::Class, Some(class)) = (decl.kind, decl.class) {
                        push(Nominal::Class(class));
                    }
                    if let Some(nominal) = self.nominal_of_type(receiver_type, stmt.scope) {
                        push(nominal);
                    }
                    for def in self.defuse.defs(binding) {
                        let def = self.model().stmt(def.stmt);
                        if let StmtKind::Assign { value, .. } = &def.kind
                            && let Some(class) = self.constructed_class(value, def.scope)
                        {
                            push(Nominal::Class(class));
                        }
                    }
                }
            }
            Operand::Temp(_) | Operand::Const(_) => {
                if let Some(nominal) = self.nominal_of_type(receiver_type, stmt.scope) {
                    push(nominal);
                }
            }
        }
        nominals
    }

    fn constructed_class(&self, value: &Rvalue, scope: ScopeId) -> Option<ClassId> {
        let Rvalue::New {
            callee: Operand::Local(name),
            ..
        } = value
        else {
            return None;
        };
        let binding = self.index.resolve_binding(&name.name, scope)?;
        self.model().decl(self.index.get(binding).decl).class
    }

    /// Class or interface a (resolved) type names, looking through `| null`.
    fn nominal_of_type(&self, ty: &TypeRef, scope: ScopeId) -> Option<Nominal> {
        match ty {
            TypeRef::Named(name) => {
                let root = name.split('.').next().unwrap_or(name);
                let binding = self.index.resolve_binding(root, scope)?;
                let decl = self.model().decl(self.index.get(binding).decl);
                match decl.kind {
                    DeclKind::Class => decl.class.map(Nominal::Class),
                    DeclKind::Interface => Some(Nominal::Interface(decl.id)),
                    _ => None,
                }
            }
            TypeRef::Union(members) => {
                let mut candidates = members.iter().filter(|member| !member.is_nullish());
                let only = candidates.next()?;
                match candidates.next() {
                    Some(_) => None,
                    None => self.nominal_of_type(only, scope),
                }
            }
            _ => None,
        }
    }

    fn nominal_member(&self, nominal: Nominal, name: &str, depth: usize) -> Option<TypeRef> {
        match nominal {
            Nominal::Class(id) => {
                let class = self.model().class(id);
                let scope = self.model().unit(class.init_unit).scope;
                if let Some(field) = class.fields.get(name) {
                    if let Some(declared) = &field.declared_type {
                        return Some(self.resolve_type(declared, scope, depth + 1));
                    }
                    let derived = field
                        .initializer
                        .map(|id| self.model().stmt(id))
                        .and_then(|stmt| match &stmt.kind {
                            StmtKind::Assign { value, .. } => {
                                Some(self.rvalue_type(value, stmt, depth + 1).widened())
                            }
                            _ => None,
                        });
                    return Some(derived.unwrap_or(TypeRef::Any));
                }
                class.methods.contains_key(name).then_some(TypeRef::Object)
            }
            Nominal::Interface(decl) => {
                let shape = self.model().interface(decl)?;
                let scope = self.model().decl(decl).scope;
                if let Some(ty) = shape.fields.get(name) {
                    return Some(self.resolve_type(ty, scope, depth + 1));
                }
                shape.methods.contains_key(name).then_some(TypeRef::Object)
            }
        }
    }

    fn nominal_method(&self, nominal: Nominal, name: &str, depth: usize) -> Option<TypeRef> {
        match nominal {
            Nominal::Class(id) => {
                let class = self.model().class(id);
                let scope = self.model().unit(class.init_unit).scope;
                let returns = class.methods.get(name)?;
                Some(
                    returns
                        .as_ref()
                        .map(|ty| self.resolve_type(ty, scope, depth + 1))
                        .unwrap_or(TypeRef::Any),
                )
            }
            Nominal::Interface(decl) => {
                let returns = self.model().interface(decl)?.methods.get(name)?;
                let scope = self.model().decl(decl).scope;
                Some(self.resolve_type(returns, scope, depth + 1))
            }
        }
    }

    /// Expands aliases, enums, generic parameters and `typeof` queries.
    /// Class and interface names stay named so members can be looked up.
    pub fn resolve_type(&self, ty: &TypeRef, scope: ScopeId, depth: usize) -> TypeRef {
        if depth > MAX_DERIVATION_DEPTH {
            warn!(depth, "type resolution exceeds depth bound, using any");
            return TypeRef::Any;
        }
        match ty {
            TypeRef::Named(name) => self.resolve_named(name, scope, depth),
            TypeRef::Query(name) => {
                let root = name.split('.').next().unwrap_or(name);
                match self.index.resolve_binding(root, scope) {
                    Some(binding) if root == name => self.binding_type(binding, depth + 1),
                    _ => TypeRef::Any,
                }
            }
            TypeRef::Union(members) => TypeRef::union(
                members
                    .iter()
                    .map(|member| self.resolve_type(member, scope, depth + 1))
                    .collect(),
            ),
            TypeRef::Intersection(members) => TypeRef::Intersection(
                members
                    .iter()
                    .map(|member| self.resolve_type(member, scope, depth + 1))
                    .collect(),
            ),
            TypeRef::Promise(inner) => {
                TypeRef::Promise(Box::new(self.resolve_type(inner, scope, depth + 1)))
            }
            other => other.clone(),
        }
    }

    fn resolve_named(&self, name: &str, scope: ScopeId, depth: usize) -> TypeRef {
        let root = name.split('.').next().unwrap_or(name);
        let Some(binding) = self.index.resolve_binding(root, scope) else {
            return TypeRef::Named(name.to_string());
        };
        let binding = self.index.get(binding);
        if binding.is_pattern_element() {
            return TypeRef::Any;
        }
        let decl = self.model().decl(binding.decl);
        match decl.kind {
            DeclKind::TypeAlias | DeclKind::TypeParam => decl
                .declared_type
                .as_ref()
                .map(|ty| self.resolve_type(ty, decl.scope, depth + 1))
                .unwrap_or(TypeRef::Any),
            DeclKind::Enum => match self.model().enum_info(decl.id) {
                Some(info) => TypeRef::Enum(info.members.clone()),
                None => TypeRef::Object,
            },
            _ => TypeRef::Named(name.to_string()),
        }
    }
}

fn global_type(name: &str) -> TypeRef {
    match name {
        "undefined" => TypeRef::Undefined,
        "NaN" | "Infinity" => TypeRef::Number,
        _ => TypeRef::Any,
    }
}

fn global_call_type(name: &str) -> TypeRef {
    match name {
        "Boolean" | "isNaN" | "isFinite" => TypeRef::Boolean,
        "String" | "Date" | "encodeURIComponent" | "decodeURIComponent" | "encodeURI"
        | "decodeURI" => TypeRef::String,
        "Number" | "BigInt" | "parseInt" | "parseFloat" => TypeRef::Number,
        "Symbol" | "Object" | "Array" => TypeRef::Object,
        _ => TypeRef::Any,
    }
}

fn builtin_method_type(name: &str) -> TypeRef {
    if BOOLEAN_METHODS.contains(&name) {
        TypeRef::Boolean
    } else if NULLABLE_OBJECT_METHODS.contains(&name) {
        TypeRef::union(vec![TypeRef::Object, TypeRef::Null])
    } else if NUMBER_METHODS.contains(&name) {
        TypeRef::Number
    } else if STRING_METHODS.contains(&name) {
        TypeRef::String
    } else {
        TypeRef::Any
    }
}

fn awaited(ty: TypeRef) -> TypeRef {
    match ty {
        TypeRef::Promise(inner) => *inner,
        TypeRef::Union(members) => TypeRef::union(members.into_iter().map(awaited).collect()),
        other => other,
    }
}

fn strip_undefined(ty: TypeRef) -> TypeRef {
    match ty {
        TypeRef::Union(members) => TypeRef::union(
            members
                .into_iter()
                .filter(|member| *member != TypeRef::Undefined)
                .collect(),
        ),
        other => other,
    }
}

fn contains_nullish(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Union(members) => members.iter().any(TypeRef::is_nullish),
        other => other.is_nullish(),
    }
}

fn is_string_like(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::String | TypeRef::Literal(LiteralType::Str(_)) => true,
        TypeRef::Union(members) => !members.is_empty() && members.iter().all(is_string_like),
        _ => false,
    }
}

fn is_number_like(ty: &TypeRef) -> bool {
    match ty {
        TypeRef::Number | TypeRef::Literal(LiteralType::Num(_)) => true,
        TypeRef::Enum(members) => members
            .iter()
            .all(|member| matches!(member, LiteralType::Num(_))),
        TypeRef::Union(members) => !members.is_empty() && members.iter().all(is_number_like),
        _ => false,
    }
}

#[derive(Default)]
struct Parts {
    nullish: bool,
    has_true: bool,
    has_false: bool,
    strings: Vec<bool>,
    numbers: Vec<bool>,
    object: bool,
    any: bool,
    never: bool,
    enum_like: bool,
}

impl Parts {
    fn add(&mut self, ty: &TypeRef) {
        match ty {
            TypeRef::Any | TypeRef::Unknown => self.any = true,
            TypeRef::Never => self.never = true,
            TypeRef::Void | TypeRef::Undefined | TypeRef::Null => self.nullish = true,
            TypeRef::Boolean => {
                self.has_true = true;
                self.has_false = true;
            }
            TypeRef::String => self.strings.push(false),
            TypeRef::Number => self.numbers.push(false),
            TypeRef::Literal(literal) => self.add_literal(literal),
            TypeRef::Enum(members) => {
                self.enum_like = true;
                for member in members {
                    self.add_literal(member);
                }
            }
            TypeRef::Union(members) => {
                for member in members {
                    self.add(member);
                }
            }
            TypeRef::Intersection(members) => {
                match members.iter().find(|member| is_primitive(member)) {
                    Some(primitive) => self.add(primitive),
                    None => self.object = true,
                }
            }
            TypeRef::Object | TypeRef::Named(_) | TypeRef::Query(_) | TypeRef::Promise(_) => {
                self.object = true
            }
        }
    }

    fn add_literal(&mut self, literal: &LiteralType) {
        match literal {
            LiteralType::Bool(true) => self.has_true = true,
            LiteralType::Bool(false) => self.has_false = true,
            LiteralType::Str(non_empty) => self.strings.push(*non_empty),
            LiteralType::Num(non_zero) => self.numbers.push(*non_zero),
        }
    }
}

fn is_primitive(ty: &TypeRef) -> bool {
    matches!(
        ty,
        TypeRef::Boolean | TypeRef::String | TypeRef::Number | TypeRef::Literal(_)
    )
}

/// Splits a resolved type into the kinds a condition reasons about.
///
/// Never empty: a type with no recognizable member is `any`.
pub fn variant_kinds(ty: &TypeRef) -> VariantSet {
    let mut parts = Parts::default();
    parts.add(ty);

    let mut kinds = VariantSet::default();
    if parts.nullish {
        kinds.insert(VariantKind::Nullish);
    }
    match (parts.has_true, parts.has_false) {
        (true, false) => kinds.insert(VariantKind::TruthyBoolean),
        (false, false) => {}
        _ => kinds.insert(VariantKind::Boolean),
    }
    if !parts.strings.is_empty() {
        kinds.insert(if parts.strings.iter().all(|&non_empty| non_empty) {
            VariantKind::TruthyString
        } else {
            VariantKind::String
        });
    }
    if !parts.numbers.is_empty() {
        kinds.insert(if parts.numbers.iter().all(|&non_zero| non_zero) {
            VariantKind::TruthyNumber
        } else {
            VariantKind::Number
        });
    }
    if parts.object {
        kinds.insert(VariantKind::Object);
    }
    if parts.enum_like && parts.nullish {
        kinds.insert(VariantKind::Enum);
    }
    if parts.any {
        kinds.insert(VariantKind::Any);
    }
    if parts.never && kinds.is_empty() {
        kinds.insert(VariantKind::Never);
    }
    if kinds.is_empty() {
        kinds.insert(VariantKind::Any);
    }
    kinds
}
