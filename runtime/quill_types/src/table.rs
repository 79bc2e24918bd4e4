//! Symbol table: AST ↔ symbol associations.
//!
//! The association from a symbol back to its defining AST node is what
//! enables on-demand evaluation: resolving an identifier that names an
//! object definition visits that definition's node right then instead of
//! eagerly at load time.

use crate::symbol::SymbolId;
use quill_ir::NodeId;
use rustc_hash::FxHashMap;

/// Bidirectional node/symbol association built during analysis.
#[derive(Default)]
pub struct SymbolTable {
    node_symbols: FxHashMap<NodeId, SymbolId>,
    creation_nodes: FxHashMap<SymbolId, NodeId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    /// Associate a node with the symbol it defines or references.
    ///
    /// The first association per symbol is recorded as its creation node.
    pub fn associate(&mut self, node: NodeId, symbol: SymbolId) {
        if symbol.is_null() {
            return;
        }
        self.node_symbols.insert(node, symbol);
        self.creation_nodes.entry(symbol).or_insert(node);
    }

    /// Associate a reference node without claiming creation.
    pub fn associate_reference(&mut self, node: NodeId, symbol: SymbolId) {
        if symbol.is_null() {
            return;
        }
        self.node_symbols.insert(node, symbol);
    }

    /// The symbol associated with a node; the null symbol when none.
    pub fn symbol_for_node(&self, node: NodeId) -> SymbolId {
        self.node_symbols.get(&node).copied().unwrap_or(SymbolId::NULL)
    }

    /// The AST node that defines a symbol, enabling lazy evaluation.
    pub fn creation_node(&self, symbol: SymbolId) -> Option<NodeId> {
        self.creation_nodes.get(&symbol).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_symbol_is_never_recorded() {
        let mut table = SymbolTable::new();
        table.associate(NodeId::from_raw(1), SymbolId::NULL);
        assert_eq!(table.symbol_for_node(NodeId::from_raw(1)), SymbolId::NULL);
        assert_eq!(table.creation_node(SymbolId::NULL), None);
    }

    #[test]
    fn first_association_wins_creation() {
        let mut table = SymbolTable::new();
        let mut arena = crate::symbol::SymbolArena::new();
        let sym = arena.push(crate::symbol::Symbol {
            name: quill_ir::Name::EMPTY,
            ty: crate::types::TypeId::NONE,
            kind: crate::symbol::SymbolKind::Variable,
            scope: crate::scope::ScopeId::GLOBAL,
        });
        table.associate(NodeId::from_raw(5), sym);
        table.associate_reference(NodeId::from_raw(9), sym);
        assert_eq!(table.creation_node(sym), Some(NodeId::from_raw(5)));
        assert_eq!(table.symbol_for_node(NodeId::from_raw(9)), sym);
    }
}
