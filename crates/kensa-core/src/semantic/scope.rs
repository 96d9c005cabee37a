//! Lexical scope tree
//!
//! Scopes are arena-allocated and linked to their parent, so walking
//! from a use site outwards is a cheap iterator over ids. Scope kinds that
//! start a new analysis unit (file, namespace, class initializer, function
//! bodies) also act as the hoisting target for `var` and function
//! declarations.

use id_arena::{Arena, Id};
use swc_common::{BytePos, Span};

pub type ScopeId = Id<Scope>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Module,
    Namespace,
    ClassInit,
    Function,
    ArrowFunction,
    Method,
    StaticBlock,
    Block,
    For,
    Switch,
    Catch,
}

impl ScopeKind {
    /// Whether this scope is the root scope of an analysis unit.
    pub fn is_unit_root(self) -> bool {
        matches!(
            self,
            ScopeKind::Global
                | ScopeKind::Module
                | ScopeKind::Namespace
                | ScopeKind::ClassInit
                | ScopeKind::Function
                | ScopeKind::ArrowFunction
                | ScopeKind::Method
                | ScopeKind::StaticBlock
        )
    }
}

#[derive(Debug)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub children: Vec<ScopeId>,
    pub span: Span,
}

#[derive(Debug)]
pub struct ScopeTree {
    arena: Arena<Scope>,
    root: Option<ScopeId>,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
        }
    }

    pub fn create_scope(
        &mut self,
        kind: ScopeKind,
        parent: Option<ScopeId>,
        span: Span,
    ) -> ScopeId {
        let id = self.arena.alloc_with_id(|id| Scope {
            id,
            kind,
            parent,
            children: Vec::new(),
            span,
        });

        if let Some(parent_id) = parent {
            self.arena[parent_id].children.push(id);
        }

        if self.root.is_none() {
            self.root = Some(id);
        }

        id
    }

    pub fn root(&self) -> Option<ScopeId> {
        self.root
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id]
    }

    pub fn parent(&self, id: ScopeId) -> Option<&Scope> {
        self.arena[id].parent.map(|p| &self.arena[p])
    }

    pub fn children(&self, id: ScopeId) -> impl Iterator<Item = &Scope> {
        self.arena[id].children.iter().map(|&c| &self.arena[c])
    }

    pub fn ancestors(&self, id: ScopeId) -> AncestorIter<'_> {
        AncestorIter {
            tree: self,
            current: Some(id),
        }
    }

    pub fn is_descendant_of(&self, scope: ScopeId, ancestor: ScopeId) -> bool {
        self.ancestors(scope).any(|s| s.id == ancestor)
    }

    /// Nearest enclosing scope that roots an analysis unit (the `var` target).
    pub fn enclosing_unit_scope(&self, id: ScopeId) -> ScopeId {
        self.ancestors(id)
            .find(|scope| scope.kind.is_unit_root())
            .map(|scope| scope.id)
            .unwrap_or(id)
    }

    /// Innermost scope whose span contains `pos`.
    pub fn innermost_at(&self, pos: BytePos) -> Option<ScopeId> {
        let mut current = self.root?;
        loop {
            let next = self.arena[current]
                .children
                .iter()
                .copied()
                .find(|&child| {
                    let span = self.arena[child].span;
                    span.lo <= pos && pos < span.hi
                });
            match next {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }
}

pub struct AncestorIter<'a> {
    tree: &'a ScopeTree,
    current: Option<ScopeId>,
}

impl<'a> Iterator for AncestorIter<'a> {
    type Item = &'a Scope;

    fn next(&mut self) -> Option<Self::Item> {
        let current_id = self.current?;
        let scope = &self.tree.arena[current_id];
        self.current = scope.parent;
        Some(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swc_common::DUMMY_SP;

    fn span_at(lo: u32, hi: u32) -> Span {
        Span::new(BytePos(lo), BytePos(hi))
    }

    #[test]
    fn first_scope_becomes_root() {
        let mut tree = ScopeTree::new();
        let module = tree.create_scope(ScopeKind::Module, None, DUMMY_SP);

        assert_eq!(tree.root(), Some(module));
        assert!(tree.get(module).parent.is_none());
        assert!(tree.get(module).children.is_empty());
    }

    #[test]
    fn nested_scopes_have_correct_parent() {
        let mut tree = ScopeTree::new();

        let module = tree.create_scope(ScopeKind::Module, None, span_at(0, 100));
        let class_init = tree.create_scope(ScopeKind::ClassInit, Some(module), span_at(10, 90));
        let method = tree.create_scope(ScopeKind::Method, Some(class_init), span_at(20, 80));
        let block = tree.create_scope(ScopeKind::Block, Some(method), span_at(30, 70));

        assert_eq!(tree.get(block).parent, Some(method));
        assert_eq!(tree.get(method).parent, Some(class_init));
        assert_eq!(tree.get(class_init).parent, Some(module));
        assert_eq!(tree.get(module).children, vec![class_init]);
        assert_eq!(tree.parent(method).map(|s| s.kind), Some(ScopeKind::ClassInit));
    }

    #[test]
    fn ancestors_walk_method_class_file_chain() {
        let mut tree = ScopeTree::new();
        let module = tree.create_scope(ScopeKind::Module, None, DUMMY_SP);
        let class_init = tree.create_scope(ScopeKind::ClassInit, Some(module), DUMMY_SP);
        let method = tree.create_scope(ScopeKind::Method, Some(class_init), DUMMY_SP);
        let block = tree.create_scope(ScopeKind::Block, Some(method), DUMMY_SP);

        let kinds: Vec<ScopeKind> = tree.ancestors(block).map(|s| s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                ScopeKind::Block,
                ScopeKind::Method,
                ScopeKind::ClassInit,
                ScopeKind::Module
            ]
        );
    }

    #[test]
    fn is_descendant_of_checks_ancestry() {
        let mut tree = ScopeTree::new();
        let module = tree.create_scope(ScopeKind::Module, None, DUMMY_SP);
        let func = tree.create_scope(ScopeKind::Function, Some(module), DUMMY_SP);
        let block = tree.create_scope(ScopeKind::Block, Some(func), DUMMY_SP);

        assert!(tree.is_descendant_of(block, block));
        assert!(tree.is_descendant_of(block, module));
        assert!(!tree.is_descendant_of(module, func));
        assert!(!tree.is_descendant_of(func, block));
    }

    #[test]
    fn enclosing_unit_scope_skips_blocks() {
        let mut tree = ScopeTree::new();
        let module = tree.create_scope(ScopeKind::Module, None, DUMMY_SP);
        let func = tree.create_scope(ScopeKind::Function, Some(module), DUMMY_SP);
        let for_scope = tree.create_scope(ScopeKind::For, Some(func), DUMMY_SP);
        let block = tree.create_scope(ScopeKind::Block, Some(for_scope), DUMMY_SP);

        assert_eq!(tree.enclosing_unit_scope(block), func);
        assert_eq!(tree.enclosing_unit_scope(module), module);
    }

    #[test]
    fn innermost_at_descends_into_containing_children() {
        let mut tree = ScopeTree::new();
        let module = tree.create_scope(ScopeKind::Module, None, span_at(1, 100));
        let func = tree.create_scope(ScopeKind::Function, Some(module), span_at(10, 60));
        let block = tree.create_scope(ScopeKind::Block, Some(func), span_at(20, 30));
        let sibling = tree.create_scope(ScopeKind::Block, Some(module), span_at(70, 80));

        assert_eq!(tree.innermost_at(BytePos(5)), Some(module));
        assert_eq!(tree.innermost_at(BytePos(15)), Some(func));
        assert_eq!(tree.innermost_at(BytePos(25)), Some(block));
        assert_eq!(tree.innermost_at(BytePos(75)), Some(sibling));
        assert_eq!(tree.len(), 4);
    }
}
