//! Scope/binding index.
//!
//! Maps every source-named declaration of a [`ProgramModel`] to a
//! [`LocalBinding`] and answers `resolve_binding(name, scope)` by walking the
//! scope chain outwards. Destructured parameters are only known to the
//! program model by their pattern shape; their element names are recovered
//! here from the pattern's source text.

use std::collections::HashMap;
use std::ops::Range;

use id_arena::{Arena, Id};
use swc_common::Span;
use tracing::{trace, warn};

use crate::program::{
    DeclId, DeclKind, Operand, ProgramModel, Provenance, Rvalue, StmtId, StmtKind, TempId,
    UnitId,
};
use crate::semantic::scope::ScopeId;

pub type BindingId = Id<LocalBinding>;

/// Upper bound on `%t = %t` hops followed when collapsing an alias chain.
pub const MAX_ALIAS_HOPS: usize = 8;

/// Nesting bound for destructuring patterns recovered from source text.
const MAX_PATTERN_DEPTH: usize = 16;

#[derive(Debug, Clone)]
pub struct LocalBinding {
    pub id: BindingId,
    pub name: String,
    pub scope: ScopeId,
    pub unit: UnitId,
    /// Declaration this binding comes from. For elements of a destructured
    /// parameter this is the pattern's pseudo-declaration.
    pub decl: DeclId,
    pub span: Span,
    pub kind: DeclKind,
    pub provenance: Provenance,
    pub param_index: Option<usize>,
}

impl LocalBinding {
    /// Element recovered from a destructured parameter's source text.
    pub fn is_pattern_element(&self) -> bool {
        matches!(self.provenance, Provenance::Pattern(_))
    }
}

/// A binding as seen from the lowered representation: either a source-named
/// binding or a synthetic temporary standing in for one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Real(BindingId),
    Alias(TempId),
}

pub struct BindingIndex<'m, 'a> {
    model: &'m ProgramModel<'a>,
    bindings: Arena<LocalBinding>,
    by_decl: HashMap<DeclId, BindingId>,
    by_scope: HashMap<ScopeId, HashMap<String, BindingId>>,
    pattern_elements: HashMap<DeclId, Vec<BindingId>>,
    temp_defs: HashMap<TempId, StmtId>,
}

impl<'m, 'a> BindingIndex<'m, 'a> {
    pub fn build(model: &'m ProgramModel<'a>) -> Self {
        let mut index = Self {
            model,
            bindings: Arena::new(),
            by_decl: HashMap::new(),
            by_scope: HashMap::new(),
            pattern_elements: HashMap::new(),
            temp_defs: HashMap::new(),
        };

        for decl in model.decls() {
            match decl.provenance {
                Provenance::Pattern(_) => index.add_pattern_elements(decl.id),
                _ => {
                    let id = index.bindings.alloc_with_id(|id| LocalBinding {
                        id,
                        name: decl.name.clone(),
                        scope: decl.scope,
                        unit: decl.unit,
                        decl: decl.id,
                        span: decl.span,
                        kind: decl.kind,
                        provenance: decl.provenance,
                        param_index: decl.param_index,
                    });
                    index.by_decl.insert(decl.id, id);
                    index
                        .by_scope
                        .entry(decl.scope)
                        .or_default()
                        .entry(decl.name.clone())
                        .or_insert(id);
                }
            }
        }

        for stmt in model.stmts() {
            if let Some(temp) = stmt.defined_temp() {
                index.temp_defs.insert(temp, stmt.id);
            }
        }

        index
    }

    fn add_pattern_elements(&mut self, decl_id: DeclId) {
        let model = self.model;
        let decl = model.decl(decl_id);
        let file = model.file();
        let Some(range) = file.byte_range(decl.span) else {
            return;
        };
        let Some(text) = file.source().get(range.clone()) else {
            return;
        };

        let mut elements = Vec::new();
        for (name, relative) in extract_pattern_names(text) {
            let absolute = range.start + relative.start..range.start + relative.end;
            let span = file.span_of_range(absolute);
            let id = self.bindings.alloc_with_id(|id| LocalBinding {
                id,
                name: name.clone(),
                scope: decl.scope,
                unit: decl.unit,
                decl: decl_id,
                span,
                kind: DeclKind::Param,
                provenance: decl.provenance,
                param_index: decl.param_index,
            });
            self.by_scope
                .entry(decl.scope)
                .or_default()
                .entry(name)
                .or_insert(id);
            elements.push(id);
        }
        trace!(pattern = %decl.name, elements = elements.len(), "recovered pattern elements");
        self.pattern_elements.insert(decl_id, elements);
    }

    pub fn model(&self) -> &'m ProgramModel<'a> {
        self.model
    }

    pub fn get(&self, id: BindingId) -> &LocalBinding {
        &self.bindings[id]
    }

    pub fn bindings(&self) -> impl Iterator<Item = &LocalBinding> {
        self.bindings.iter().map(|(_, binding)| binding)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.len() == 0
    }

    pub fn binding_for_decl(&self, decl: DeclId) -> Option<BindingId> {
        self.by_decl.get(&decl).copied()
    }

    pub fn pattern_elements(&self, decl: DeclId) -> &[BindingId] {
        self.pattern_elements
            .get(&decl)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nearest binding named `name` visible from `from_scope`.
    ///
    /// `None` means the name is free: a global or an undeclared reference.
    pub fn resolve_binding(&self, name: &str, from_scope: ScopeId) -> Option<BindingId> {
        self.model
            .scopes()
            .ancestors(from_scope)
            .find_map(|scope| self.by_scope.get(&scope.id)?.get(name).copied())
    }

    /// Binding read by an operand of a statement in `scope`.
    pub fn resolve_operand(&self, operand: &Operand, scope: ScopeId) -> Option<Binding> {
        match operand {
            Operand::Local(name) => self
                .resolve_binding(&name.name, scope)
                .map(Binding::Real),
            Operand::Temp(temp) => Some(Binding::Alias(*temp)),
            Operand::This | Operand::Const(_) => None,
        }
    }

    pub fn temp_def(&self, temp: TempId) -> Option<StmtId> {
        self.temp_defs.get(&temp).copied()
    }

    /// Follows `%tN = %tM` copies until a source-named binding is reached.
    ///
    /// Returns `None` when the chain ends in anything other than a plain
    /// copy of a named binding, or when it exceeds [`MAX_ALIAS_HOPS`].
    pub fn resolve_alias(&self, temp: TempId) -> Option<BindingId> {
        let mut current = temp;
        for _ in 0..MAX_ALIAS_HOPS {
            let stmt = self.model.stmt(self.temp_def(current)?);
            let StmtKind::Assign {
                value: Rvalue::Use(operand),
                ..
            } = &stmt.kind
            else {
                return None;
            };
            match operand {
                Operand::Temp(next) => current = *next,
                Operand::Local(name) => return self.resolve_binding(&name.name, stmt.scope),
                Operand::This | Operand::Const(_) => return None,
            }
        }
        warn!(temp = %temp.name(), hops = MAX_ALIAS_HOPS, "alias chain exceeds hop bound");
        None
    }
}

/// Names bound by a destructuring pattern, with byte ranges relative to `text`.
///
/// Handles nested patterns, defaults, `key: target` renames, computed keys,
/// rest elements and array holes. The scan starts at the first `{` or `[`,
/// so a trailing type annotation is ignored.
pub fn extract_pattern_names(text: &str) -> Vec<(String, Range<usize>)> {
    let Some(start) = text.find(['{', '[']) else {
        return Vec::new();
    };
    let mut scanner = PatternScanner {
        text,
        pos: start,
        names: Vec::new(),
    };
    scanner.pattern(0);
    scanner.names
}

struct PatternScanner<'t> {
    text: &'t str,
    pos: usize,
    names: Vec<(String, Range<usize>)>,
}

impl PatternScanner<'_> {
    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn skip_trivia(&mut self) {
        loop {
            let rest = &self.text[self.pos..];
            if rest.starts_with("//") {
                self.pos += rest.find('\n').unwrap_or(rest.len());
            } else if rest.starts_with("/*") {
                self.pos += rest.find("*/").map(|end| end + 2).unwrap_or(rest.len());
            } else if self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            } else {
                return;
            }
        }
    }

    fn ident(&mut self) -> Option<(String, Range<usize>)> {
        let start = self.pos;
        let mut chars = self.text[start..].char_indices();
        match chars.next() {
            Some((_, c)) if is_ident_start(c) => {}
            _ => return None,
        }
        let len = chars
            .find(|&(_, c)| !is_ident_part(c))
            .map(|(i, _)| i)
            .unwrap_or(self.text.len() - start);
        self.pos = start + len;
        Some((self.text[start..self.pos].to_string(), start..self.pos))
    }

    fn pattern(&mut self, depth: usize) {
        if depth > MAX_PATTERN_DEPTH {
            return;
        }
        self.skip_trivia();
        match self.peek() {
            Some('{') => self.object(depth),
            Some('[') => self.array(depth),
            _ => {
                if let Some(name) = self.ident() {
                    self.names.push(name);
                }
            }
        }
    }

    fn object(&mut self, depth: usize) {
        self.bump();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return,
                Some('}') => {
                    self.bump();
                    return;
                }
                Some(',') => {
                    self.bump();
                    continue;
                }
                _ => {}
            }

            let start = self.pos;
            if self.text[self.pos..].starts_with("...") {
                self.pos += 3;
                self.pattern(depth + 1);
                continue;
            }

            let shorthand = match self.peek() {
                Some('[') => {
                    self.skip_balanced();
                    None
                }
                Some(quote @ ('"' | '\'')) => {
                    self.skip_string(quote);
                    None
                }
                _ => match self.ident() {
                    Some(key) => Some(key),
                    None => {
                        // Numeric keys and anything unexpected.
                        self.skip_expression();
                        None
                    }
                },
            };

            self.skip_trivia();
            if self.eat(':') {
                self.pattern(depth + 1);
            } else if let Some(name) = shorthand {
                self.names.push(name);
            }
            self.skip_default();
            self.skip_stray(start);
        }
    }

    fn array(&mut self, depth: usize) {
        self.bump();
        loop {
            self.skip_trivia();
            match self.peek() {
                None => return,
                Some(']') => {
                    self.bump();
                    return;
                }
                Some(',') => {
                    self.bump();
                    continue;
                }
                _ => {}
            }
            if self.text[self.pos..].starts_with("...") {
                self.pos += 3;
            }
            let before = self.pos;
            self.pattern(depth + 1);
            self.skip_default();
            if self.pos == before {
                self.skip_expression();
            }
            self.skip_stray(before);
        }
    }

    /// Consumes one character when an element made no progress, so a
    /// mismatched closer cannot stall the scan.
    fn skip_stray(&mut self, start: usize) {
        if self.pos == start {
            self.bump();
        }
    }

    fn skip_default(&mut self) {
        self.skip_trivia();
        let rest = &self.text[self.pos..];
        if rest.starts_with('=') && !rest.starts_with("==") && !rest.starts_with("=>") {
            self.bump();
            self.skip_expression();
        }
    }

    /// Skips to the next `,`, `}` or `]` that is not nested.
    fn skip_expression(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ',' | '}' | ']' => return,
                '(' | '[' | '{' => self.skip_balanced(),
                '"' | '\'' | '`' => self.skip_string(c),
                _ => self.bump(),
            }
        }
    }

    fn skip_balanced(&mut self) {
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            match c {
                '(' | '[' | '{' => {
                    depth += 1;
                    self.bump();
                }
                ')' | ']' | '}' => {
                    self.bump();
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return;
                    }
                }
                '"' | '\'' | '`' => self.skip_string(c),
                _ => self.bump(),
            }
        }
    }

    fn skip_string(&mut self, quote: char) {
        self.bump();
        while let Some(c) = self.peek() {
            self.bump();
            if c == '\\' {
                self.bump();
            } else if c == quote {
                return;
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c == '$' || c.is_alphabetic()
}

fn is_ident_part(c: char) -> bool {
    is_ident_start(c) || c.is_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedFile;

    fn names(text: &str) -> Vec<String> {
        extract_pattern_names(text)
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }

    #[test]
    fn extracts_shorthand_and_renamed_properties() {
        assert_eq!(names("{ a, b: renamed, c = 1 }"), vec!["a", "renamed", "c"]);
    }

    #[test]
    fn extracts_nested_patterns_rest_and_holes() {
        assert_eq!(
            names("{ outer: { inner: [first, , third] }, ...rest }"),
            vec!["first", "third", "rest"]
        );
        assert_eq!(names("[a, [b, c = [1, 2]], ...tail]"), vec!["a", "b", "c", "tail"]);
    }

    #[test]
    fn skips_defaults_computed_keys_and_strings() {
        assert_eq!(
            names("{ [key]: value, 'quoted-key': q, d = { e: 1 }, f = (g, h) => g }"),
            vec!["value", "q", "d", "f"]
        );
    }

    #[test]
    fn ranges_slice_back_to_names() {
        let text = "{ alpha, beta: gamma }: Props";
        for (name, range) in extract_pattern_names(text) {
            assert_eq!(&text[range], name);
        }
    }

    #[test]
    fn resolve_binding_walks_outwards_and_prefers_shadowing() {
        let code = "const x = 1;\nfunction f() { const x = 2; { g(x); } }\nh(x);";
        let file = ParsedFile::from_source("test.js", code);
        let model = ProgramModel::build(&file).expect("model");
        let index = BindingIndex::build(&model);

        let reads: Vec<(String, ScopeId)> = model
            .stmts()
            .flat_map(|stmt| {
                stmt.reads()
                    .into_iter()
                    .filter_map(|op| match op {
                        Operand::Local(name) if name.name == "x" => {
                            Some((name.name.clone(), stmt.scope))
                        }
                        _ => None,
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(reads.len(), 2);

        let inner = index.resolve_binding("x", reads[0].1).expect("inner x");
        let outer = index.resolve_binding("x", reads[1].1).expect("outer x");
        assert_ne!(inner, outer);
        assert_eq!(index.get(outer).scope, model.scopes().root().expect("root"));
        assert_eq!(index.resolve_binding("g", reads[0].1), None);
    }

    #[test]
    fn pattern_parameters_expose_their_elements() {
        let code = "function f({ a, b: [c] }, d) { return a; }";
        let file = ParsedFile::from_source("test.js", code);
        let model = ProgramModel::build(&file).expect("model");
        let index = BindingIndex::build(&model);

        let pattern = model
            .decls()
            .find(|decl| decl.name == "ObjectBindingPattern")
            .expect("pattern");
        let elements: Vec<&str> = index
            .pattern_elements(pattern.id)
            .iter()
            .map(|&id| index.get(id).name.as_str())
            .collect();

        assert_eq!(elements, vec!["a", "c"]);
        let c = index.get(index.pattern_elements(pattern.id)[1]);
        assert_eq!(model.span_text(c.span), Some("c"));
        assert_eq!(c.param_index, Some(0));
        assert!(index.resolve_binding("c", c.scope).is_some());
    }

    #[test]
    fn alias_chains_collapse_to_the_source_binding() {
        let code = "const source = load();\nconst { value } = source;";
        let file = ParsedFile::from_source("test.js", code);
        let model = ProgramModel::build(&file).expect("model");
        let index = BindingIndex::build(&model);

        let temp = model
            .stmts()
            .find_map(|stmt| match &stmt.kind {
                StmtKind::Assign {
                    value: Rvalue::Use(Operand::Local(name)),
                    ..
                } if name.name == "source" => stmt.defined_temp(),
                _ => None,
            })
            .expect("alias temp");
        let resolved = index.resolve_alias(temp).expect("resolved");

        assert_eq!(index.get(resolved).name, "source");
    }
}
