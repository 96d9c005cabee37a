//! Def/use resolution over the lowered representation.
//!
//! Every statement is visited once to record, per binding, where it is
//! written (defs) and where it is read (uses) along with the context of the
//! read. Liveness is then a query: a binding is used when at least one of
//! its uses is a real consumption, following synthetic temporaries until
//! they are either consumed or dropped.

use std::collections::HashMap;

use swc_common::Span;
use tracing::{trace, warn};

use crate::program::{
    DeclKind, Literal, LoweredStmt, MemberKey, Operand, Place, ProgramModel, Rvalue, StmtId,
    StmtKind, TempId, UnitId,
};
use crate::semantic::bindings::{Binding, BindingId, BindingIndex, MAX_ALIAS_HOPS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefSite {
    pub stmt: StmtId,
    /// Span of the written name.
    pub span: Span,
    /// False for bare declarations and assignments of `undefined`.
    pub real_value: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseContext {
    Read,
    /// Passed as an argument to a call or constructor.
    Argument,
    /// Read while computing a new value for the same binding (`x = x + 1`).
    SelfWrite,
    /// Copied into a synthetic temporary.
    AliasDef(TempId),
    /// Read while writing a property (`o.k = x` or the `o` of it).
    FieldWrite,
    /// Read while computing the value of another binding.
    OtherDef(BindingId),
    /// Referenced from a type position.
    TypeRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UseSite {
    pub stmt: StmtId,
    pub context: UseContext,
}

/// What an assignment writes to.
enum Target {
    Binding(BindingId),
    Field,
    Other,
}

pub struct DefUseResolver<'i, 'm, 'a> {
    index: &'i BindingIndex<'m, 'a>,
    defs: HashMap<BindingId, Vec<DefSite>>,
    uses: HashMap<BindingId, Vec<UseSite>>,
    temp_uses: HashMap<TempId, Vec<UseSite>>,
}

impl<'i, 'm, 'a> DefUseResolver<'i, 'm, 'a> {
    pub fn build(index: &'i BindingIndex<'m, 'a>) -> Self {
        let mut resolver = Self {
            index,
            defs: HashMap::new(),
            uses: HashMap::new(),
            temp_uses: HashMap::new(),
        };
        for stmt in index.model().stmts() {
            resolver.record(stmt);
        }
        resolver
    }

    fn model(&self) -> &'m ProgramModel<'a> {
        self.index.model()
    }

    fn record(&mut self, stmt: &LoweredStmt) {
        if let Some(name) = stmt.defined_name()
            && let Some(binding) = self.index.resolve_binding(&name.name, stmt.scope)
        {
            self.defs.entry(binding).or_default().push(DefSite {
                stmt: stmt.id,
                span: name.span,
                real_value: assigns_real_value(&stmt.kind),
            });
        }

        let target = match &stmt.kind {
            StmtKind::Assign {
                target: Place::Local(name),
                ..
            } => match self.index.resolve_binding(&name.name, stmt.scope) {
                Some(binding) => Target::Binding(binding),
                None => Target::Other,
            },
            StmtKind::Assign {
                target: Place::Field { .. },
                ..
            } => Target::Field,
            _ => Target::Other,
        };

        match &stmt.kind {
            StmtKind::TypeUse(name) => {
                if let Some(binding) = self.index.resolve_binding(&name.name, stmt.scope) {
                    self.push_use(Binding::Real(binding), stmt.id, UseContext::TypeRef);
                }
            }
            StmtKind::Bind(_) => {}
            StmtKind::Assign { target: place, value } => {
                let defined_temp = stmt.defined_temp();
                for operand in value.operands() {
                    let context = if is_argument(value, operand) {
                        UseContext::Argument
                    } else {
                        match (&target, defined_temp) {
                            (_, Some(temp)) => UseContext::AliasDef(temp),
                            (Target::Binding(binding), _) => UseContext::OtherDef(*binding),
                            (Target::Field, _) => UseContext::FieldWrite,
                            _ => UseContext::Read,
                        }
                    };
                    self.record_operand(operand, stmt, context);
                }
                if let Place::Field { object, key } = place {
                    self.record_operand(object, stmt, UseContext::FieldWrite);
                    if let MemberKey::Computed(key) = key {
                        self.record_operand(key, stmt, UseContext::FieldWrite);
                    }
                }
            }
            StmtKind::Eval(value) => {
                for operand in value.operands() {
                    let context = if is_argument(value, operand) {
                        UseContext::Argument
                    } else {
                        UseContext::Read
                    };
                    self.record_operand(operand, stmt, context);
                }
            }
            StmtKind::Branch(_) | StmtKind::Return(_) | StmtKind::Throw(_) => {
                for operand in stmt.reads() {
                    self.record_operand(operand, stmt, UseContext::Read);
                }
            }
        }
    }

    fn record_operand(&mut self, operand: &Operand, stmt: &LoweredStmt, context: UseContext) {
        let Some(binding) = self.index.resolve_operand(operand, stmt.scope) else {
            return;
        };
        // A binding read while computing its own new value.
        let context = match (binding, context) {
            (Binding::Real(read), UseContext::OtherDef(written)) if read == written => {
                UseContext::SelfWrite
            }
            _ => context,
        };
        self.push_use(binding, stmt.id, context);
    }

    fn push_use(&mut self, binding: Binding, stmt: StmtId, context: UseContext) {
        let site = UseSite { stmt, context };
        match binding {
            Binding::Real(id) => self.uses.entry(id).or_default().push(site),
            Binding::Alias(temp) => self.temp_uses.entry(temp).or_default().push(site),
        }
    }

    pub fn defs(&self, binding: BindingId) -> &[DefSite] {
        self.defs.get(&binding).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn uses(&self, binding: BindingId) -> &[UseSite] {
        self.uses.get(&binding).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn temp_uses(&self, temp: TempId) -> &[UseSite] {
        self.temp_uses.get(&temp).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the binding's value is ever consumed.
    ///
    /// An alias whose chain ends in a named binding is as used as that
    /// binding; any other temporary is judged by its own reads.
    pub fn is_used(&self, binding: Binding) -> bool {
        match binding {
            Binding::Real(id) => self.is_binding_used(id),
            Binding::Alias(temp) => match self.index.resolve_alias(temp) {
                Some(id) => self.is_binding_used(id),
                None => self.temp_consumed(temp, None, 0),
            },
        }
    }

    /// Whether any write to the binding stores something other than `undefined`.
    pub fn was_assigned_real_value(&self, binding: BindingId) -> bool {
        self.defs(binding).iter().any(|def| def.real_value)
    }

    /// Span a finding about the binding should point at: the last write, or
    /// the declaration when it is never written.
    pub fn report_site(&self, binding: BindingId) -> Span {
        self.defs(binding)
            .iter()
            .max_by_key(|def| def.span.lo)
            .map(|def| def.span)
            .unwrap_or_else(|| self.index.get(binding).span)
    }

    fn is_binding_used(&self, id: BindingId) -> bool {
        let _span = tracing::span!(tracing::Level::TRACE, "is_used", binding = %self.index.get(id).name).entered();
        let body = self.own_body(id);

        let used = self.uses(id).iter().any(|site| {
            let stmt = self.model().stmt(site.stmt);
            if body.is_some_and(|body| self.model().unit_within(stmt.unit, body)) {
                return false;
            }
            self.counts(id, site, stmt)
        });
        if used {
            return true;
        }

        if self.mentioned_in_fallback_text(id, body) {
            trace!("used by text fallback");
            return true;
        }
        false
    }

    /// Unit holding the body of a function, closure or class binding.
    fn own_body(&self, id: BindingId) -> Option<UnitId> {
        let binding = self.index.get(id);
        if binding.is_pattern_element() {
            return None;
        }
        self.model().decl(binding.decl).body_unit
    }

    fn counts(&self, id: BindingId, site: &UseSite, stmt: &LoweredStmt) -> bool {
        match site.context {
            UseContext::Read | UseContext::Argument | UseContext::FieldWrite => true,
            UseContext::SelfWrite => false,
            UseContext::OtherDef(other) => other != id,
            UseContext::TypeRef => !self.is_own_type_reference(id, stmt),
            UseContext::AliasDef(temp) => self.temp_consumed(temp, Some(id), 1),
        }
    }

    /// `interface Node { next: Node }` and the like.
    fn is_own_type_reference(&self, id: BindingId, stmt: &LoweredStmt) -> bool {
        let binding = self.index.get(id);
        if binding.is_pattern_element() {
            return false;
        }
        let decl = self.model().decl(binding.decl);
        let self_describing = decl.kind.is_type_only()
            || matches!(decl.kind, DeclKind::Enum | DeclKind::Class);
        self_describing && decl.origin.lo <= stmt.span.lo && stmt.span.hi <= decl.origin.hi
    }

    /// Whether a temporary's value reaches a real consumption. Writes back
    /// into `owner` do not count.
    fn temp_consumed(&self, temp: TempId, owner: Option<BindingId>, depth: usize) -> bool {
        if depth > MAX_ALIAS_HOPS {
            warn!(temp = %temp.name(), "temporary chain exceeds hop bound, assuming used");
            return true;
        }
        self.temp_uses(temp).iter().any(|site| match site.context {
            UseContext::Read
            | UseContext::Argument
            | UseContext::FieldWrite
            | UseContext::TypeRef => true,
            UseContext::SelfWrite => false,
            UseContext::OtherDef(other) => Some(other) != owner,
            UseContext::AliasDef(next) => self.temp_consumed(next, owner, depth + 1),
        })
    }

    /// Text containment over statements whose lowering may have dropped a
    /// reference: returned expressions and statements flagged lossy.
    fn mentioned_in_fallback_text(&self, id: BindingId, body: Option<UnitId>) -> bool {
        let model = self.model();
        let binding = self.index.get(id);
        let own_defs: Vec<StmtId> = self.defs(id).iter().map(|def| def.stmt).collect();

        model.stmts().any(|stmt| {
            let candidate = matches!(stmt.kind, StmtKind::Return(Some(_))) || stmt.lossy;
            if !candidate
                || own_defs.contains(&stmt.id)
                || !model.unit_within(stmt.unit, binding.unit)
                || body.is_some_and(|body| model.unit_within(stmt.unit, body))
            {
                return false;
            }
            let Some(text) = model.span_text(stmt.origin) else {
                return false;
            };
            mentions(text, &binding.name)
                && self.index.resolve_binding(&binding.name, stmt.scope) == Some(id)
        })
    }
}

fn is_argument(value: &Rvalue, operand: &Operand) -> bool {
    value
        .arguments()
        .iter()
        .any(|argument| std::ptr::eq(argument, operand))
}

fn assigns_real_value(kind: &StmtKind) -> bool {
    match kind {
        StmtKind::Assign { value, .. } => !matches!(
            value,
            Rvalue::Use(Operand::Const(Literal::Undefined))
        ) && !matches!(value, Rvalue::Use(Operand::Local(name)) if name.name == "undefined"),
        _ => false,
    }
}

/// Word-bounded occurrence of `name` that is not a property name.
pub(crate) fn mentions(text: &str, name: &str) -> bool {
    let is_word = |c: char| c == '_' || c == '$' || c.is_alphanumeric();
    text.match_indices(name).any(|(start, _)| {
        let end = start + name.len();
        let before = text[..start].chars().next_back();
        let after = text[end..].chars().next();
        if before.is_some_and(is_word) || after.is_some_and(is_word) {
            return false;
        }
        let prev = text[..start].trim_end().chars().next_back();
        let next = text[end..].trim_start().chars().next();
        let member_name = prev == Some('.');
        let object_key = next == Some(':') && matches!(prev, Some('{') | Some(','));
        !member_name && !object_key
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedFile;

    fn with_resolver(code: &str, check: impl FnOnce(&BindingIndex<'_, '_>, &DefUseResolver<'_, '_, '_>)) {
        let file = ParsedFile::from_source("test.ts", code);
        let model = ProgramModel::build(&file).expect("model");
        let index = BindingIndex::build(&model);
        let resolver = DefUseResolver::build(&index);
        check(&index, &resolver);
    }

    fn named(index: &BindingIndex<'_, '_>, name: &str) -> BindingId {
        index
            .bindings()
            .find(|binding| binding.name == name)
            .map(|binding| binding.id)
            .expect("binding")
    }

    #[test]
    fn declared_but_never_read() {
        with_resolver("let x; console.log('hi');", |index, resolver| {
            let x = named(index, "x");
            assert!(!resolver.is_used(Binding::Real(x)));
            assert!(!resolver.was_assigned_real_value(x));
        });
    }

    #[test]
    fn self_updates_are_not_uses() {
        with_resolver("let n = 0; n++; n += 1; n = n * 2;", |index, resolver| {
            let n = named(index, "n");
            assert!(!resolver.is_used(Binding::Real(n)));
            assert!(resolver.was_assigned_real_value(n));
            assert_eq!(resolver.defs(n).len(), 4);
        });
    }

    #[test]
    fn arguments_and_other_definitions_are_uses() {
        with_resolver(
            "let a = 1; a = f(a);\nconst b = 2; const c = b + 1; g(c);",
            |index, resolver| {
                assert!(resolver.is_used(Binding::Real(named(index, "a"))));
                assert!(resolver.is_used(Binding::Real(named(index, "b"))));
                assert!(resolver.is_used(Binding::Real(named(index, "c"))));
            },
        );
    }

    #[test]
    fn undefined_assignment_is_not_a_real_value() {
        with_resolver("let u = undefined; let v = void 0;", |index, resolver| {
            assert!(!resolver.was_assigned_real_value(named(index, "u")));
            assert!(resolver.was_assigned_real_value(named(index, "v")));
        });
    }

    #[test]
    fn aliases_collapse_to_their_source_binding() {
        with_resolver(
            "const source = load();\nconst { value } = source;\nconsole.log(value);",
            |index, resolver| {
                let source = named(index, "source");
                let temps: Vec<TempId> = index
                    .model()
                    .stmts()
                    .filter_map(|stmt| match &stmt.kind {
                        StmtKind::Assign {
                            value: Rvalue::Use(Operand::Local(name)),
                            ..
                        } if name.name == "source" => stmt.defined_temp(),
                        _ => None,
                    })
                    .collect();

                assert_eq!(temps.len(), 1);
                assert!(resolver.is_used(Binding::Real(source)));
                assert_eq!(
                    resolver.is_used(Binding::Alias(temps[0])),
                    resolver.is_used(Binding::Real(source))
                );
            },
        );
    }

    #[test]
    fn recursion_inside_own_body_is_not_a_use() {
        with_resolver(
            "function fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }\nconst loop = () => loop();",
            |index, resolver| {
                assert!(!resolver.is_used(Binding::Real(named(index, "fact"))));
                assert!(!resolver.is_used(Binding::Real(named(index, "loop"))));
                assert!(resolver.is_used(Binding::Real(named(index, "n"))));
            },
        );
    }

    #[test]
    fn type_references_count_except_self_references() {
        with_resolver(
            "interface Node { next: Node }\ninterface Used {}\nlet value: Used = {};\nf(value);",
            |index, resolver| {
                assert!(!resolver.is_used(Binding::Real(named(index, "Node"))));
                assert!(resolver.is_used(Binding::Real(named(index, "Used"))));
            },
        );
    }

    #[test]
    fn field_writes_use_both_sides() {
        with_resolver("const target = {}; const v = 1; target.key = v;", |index, resolver| {
            assert!(resolver.is_used(Binding::Real(named(index, "target"))));
            assert!(resolver.is_used(Binding::Real(named(index, "v"))));
        });
    }

    #[test]
    fn report_site_is_the_last_write() {
        let code = "let x = 1;\nx = 2;";
        with_resolver(code, |index, resolver| {
            let x = named(index, "x");
            let site = resolver.report_site(x);
            let range = index.model().file().byte_range(site).expect("range");
            assert_eq!(range.start, code.rfind('x').expect("x"));
        });
    }

    #[test]
    fn mentions_skips_property_names_and_longer_words() {
        assert!(mentions("return value + 1;", "value"));
        assert!(mentions("return a ? value : b;", "value"));
        assert!(!mentions("return values;", "value"));
        assert!(!mentions("return obj.value;", "value"));
        assert!(!mentions("return { value: 1 };", "value"));
    }

    #[test]
    fn repeated_queries_are_stable() {
        with_resolver("let a = 1; let b = a; if (b) { a = 2; }", |index, resolver| {
            let first: Vec<bool> = index
                .bindings()
                .map(|binding| resolver.is_used(Binding::Real(binding.id)))
                .collect();
            let second: Vec<bool> = index
                .bindings()
                .map(|binding| resolver.is_used(Binding::Real(binding.id)))
                .collect();
            assert_eq!(first, second);
        });
    }
}
