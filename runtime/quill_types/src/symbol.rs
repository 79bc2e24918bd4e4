//! Symbols: named entities produced by semantic analysis.

use crate::scope::ScopeId;
use crate::types::TypeId;
use quill_ir::Name;
use std::fmt;

/// Index of a symbol in a [`SymbolArena`].
///
/// `SymbolId::NULL` (index 0) is the null-symbol sentinel returned by
/// failed resolution; resolution is total and never errors.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    /// The null symbol.
    pub const NULL: Self = Self(0);

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "sym#null")
        } else {
            write!(f, "sym#{}", self.0)
        }
    }
}

/// Identifies a native callable in the embedder's registry.
///
/// The registry itself lives with the interpreter; analysis only needs a
/// stable index to distinguish natives (no body to walk) from user-defined
/// callables (body walked lazily per call).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct NativeFnId(pub u32);

/// What a symbol names.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    /// A global or local variable (object definitions included).
    Variable,
    /// A member of an aggregate type.
    Member,
    /// A type; `Symbol::ty` is `TypeId::NONE`, the named type is carried
    /// here.
    Type(TypeId),
    /// A variant of an enum type.
    EnumVariant { owner: TypeId },
    /// A host-exposed callable; calling it never walks a DSL body.
    NativeFn(NativeFnId),
    /// A user-defined callable; its body is walked on each call.
    UserFn {
        /// Scope holding the parameter symbols.
        scope: ScopeId,
    },
}

/// A named entity. Created during analysis, immutable thereafter.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: Name,
    /// Declared type (the function type for callables).
    pub ty: TypeId,
    pub kind: SymbolKind,
    /// The scope the symbol was declared in.
    pub scope: ScopeId,
}

/// Append-only symbol storage; index 0 holds the null symbol.
pub struct SymbolArena {
    symbols: Vec<Symbol>,
}

impl SymbolArena {
    pub fn new() -> Self {
        SymbolArena {
            symbols: vec![Symbol {
                name: Name::EMPTY,
                ty: TypeId::NONE,
                kind: SymbolKind::Variable,
                scope: ScopeId::GLOBAL,
            }],
        }
    }

    /// Append a symbol, returning its id.
    pub fn push(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(u32::try_from(self.symbols.len()).unwrap_or(u32::MAX));
        self.symbols.push(symbol);
        id
    }

    /// Symbol lookup; the null symbol for `SymbolId::NULL`.
    #[inline]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Number of symbols including the null symbol.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.len() <= 1
    }
}

impl Default for SymbolArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_symbol_is_index_zero() {
        let arena = SymbolArena::new();
        assert!(SymbolId::NULL.is_null());
        assert_eq!(arena.get(SymbolId::NULL).ty, TypeId::NONE);
    }

    #[test]
    fn push_and_get() {
        let mut arena = SymbolArena::new();
        let id = arena.push(Symbol {
            name: Name::from_raw(7),
            ty: TypeId::INT,
            kind: SymbolKind::Variable,
            scope: ScopeId::GLOBAL,
        });
        assert!(!id.is_null());
        assert_eq!(arena.get(id).ty, TypeId::INT);
    }
}
