//! Lexical scopes.
//!
//! Scopes form a tree rooted at the global scope. `resolve` walks from a
//! scope toward the root and returns the nearest match or the null-symbol
//! sentinel; it never fails.

use crate::symbol::SymbolId;
use quill_ir::Name;
use rustc_hash::FxHashMap;
use std::fmt;

/// Index of a scope in a [`ScopeTree`].
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ScopeId(u32);

impl ScopeId {
    /// The root (global) scope, present in every tree.
    pub const GLOBAL: Self = Self(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

struct ScopeData {
    parent: Option<ScopeId>,
    bindings: FxHashMap<Name, SymbolId>,
    /// Declaration order, for deterministic iteration.
    order: Vec<SymbolId>,
}

/// The scope tree.
pub struct ScopeTree {
    scopes: Vec<ScopeData>,
}

impl ScopeTree {
    /// Create a tree containing only the global scope.
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![ScopeData {
                parent: None,
                bindings: FxHashMap::default(),
                order: Vec::new(),
            }],
        }
    }

    /// Create a child scope.
    pub fn push_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(u32::try_from(self.scopes.len()).unwrap_or(u32::MAX));
        self.scopes.push(ScopeData {
            parent: Some(parent),
            bindings: FxHashMap::default(),
            order: Vec::new(),
        });
        id
    }

    /// Bind a symbol under `name`; a prior binding of the same name in the
    /// same scope is shadowed.
    pub fn bind(&mut self, scope: ScopeId, name: Name, symbol: SymbolId) {
        let data = &mut self.scopes[scope.index()];
        data.bindings.insert(name, symbol);
        data.order.push(symbol);
    }

    /// Resolve walking the parent chain; `SymbolId::NULL` when not found.
    pub fn resolve(&self, scope: ScopeId, name: Name) -> SymbolId {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id.index()];
            if let Some(&symbol) = data.bindings.get(&name) {
                return symbol;
            }
            current = data.parent;
        }
        SymbolId::NULL
    }

    /// Resolve in the given scope only.
    pub fn resolve_local(&self, scope: ScopeId, name: Name) -> SymbolId {
        self.scopes[scope.index()]
            .bindings
            .get(&name)
            .copied()
            .unwrap_or(SymbolId::NULL)
    }

    /// Symbols bound in a scope, in declaration order.
    pub fn symbols(&self, scope: ScopeId) -> &[SymbolId] {
        &self.scopes[scope.index()].order
    }

    /// Parent of a scope; `None` for the global scope.
    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.index()].parent
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::{Symbol, SymbolArena, SymbolKind};
    use crate::types::TypeId;

    fn variable(arena: &mut SymbolArena, name: Name) -> SymbolId {
        arena.push(Symbol {
            name,
            ty: TypeId::INT,
            kind: SymbolKind::Variable,
            scope: ScopeId::GLOBAL,
        })
    }

    #[test]
    fn resolve_walks_to_root() {
        let mut arena = SymbolArena::new();
        let mut scopes = ScopeTree::new();
        let name = Name::from_raw(3);
        let sym = variable(&mut arena, name);
        scopes.bind(ScopeId::GLOBAL, name, sym);

        let child = scopes.push_scope(ScopeId::GLOBAL);
        let grandchild = scopes.push_scope(child);
        assert_eq!(scopes.resolve(grandchild, name), sym);
    }

    #[test]
    fn resolve_miss_is_null_not_error() {
        let scopes = ScopeTree::new();
        assert_eq!(
            scopes.resolve(ScopeId::GLOBAL, Name::from_raw(99)),
            SymbolId::NULL
        );
    }

    #[test]
    fn local_resolution_ignores_parent() {
        let mut arena = SymbolArena::new();
        let mut scopes = ScopeTree::new();
        let name = Name::from_raw(3);
        let sym = variable(&mut arena, name);
        scopes.bind(ScopeId::GLOBAL, name, sym);
        let child = scopes.push_scope(ScopeId::GLOBAL);
        assert_eq!(scopes.resolve_local(child, name), SymbolId::NULL);
        assert_eq!(scopes.resolve(child, name), sym);
    }

    #[test]
    fn shadowing_prefers_nearest_scope() {
        let mut arena = SymbolArena::new();
        let mut scopes = ScopeTree::new();
        let name = Name::from_raw(4);
        let outer = variable(&mut arena, name);
        let inner = variable(&mut arena, name);
        scopes.bind(ScopeId::GLOBAL, name, outer);
        let child = scopes.push_scope(ScopeId::GLOBAL);
        scopes.bind(child, name, inner);
        assert_eq!(scopes.resolve(child, name), inner);
        assert_eq!(scopes.resolve(ScopeId::GLOBAL, name), outer);
    }
}
