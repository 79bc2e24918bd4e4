//! Task dependency graphs.
//!
//! Graph definitions describe which tasks unlock which (`a -> b`). The
//! runtime only records the shape; ordering and traversal are the game's
//! concern, so storage is a flat node list plus directed edge pairs,
//! insertion-ordered for deterministic output.

use quill_ir::Name;

/// A directed edge between two named tasks.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TaskEdge {
    pub from: Name,
    pub to: Name,
}

/// A task dependency graph built from a graph definition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TaskGraph {
    /// The graph definition's identifier.
    pub name: Name,
    nodes: Vec<Name>,
    edges: Vec<TaskEdge>,
}

impl TaskGraph {
    pub fn new(name: Name) -> Self {
        TaskGraph {
            name,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Add a node unless already present.
    pub fn add_node(&mut self, node: Name) {
        if !self.nodes.contains(&node) {
            self.nodes.push(node);
        }
    }

    /// Add a directed edge, inserting missing endpoint nodes.
    pub fn add_edge(&mut self, from: Name, to: Name) {
        self.add_node(from);
        self.add_node(to);
        let edge = TaskEdge { from, to };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Name] {
        &self.nodes
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[TaskEdge] {
        &self.edges
    }

    /// Direct successors of a node.
    pub fn successors(&self, node: Name) -> impl Iterator<Item = Name> + '_ {
        self.edges
            .iter()
            .filter(move |e| e.from == node)
            .map(|e| e.to)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edges_insert_endpoints_once() {
        let mut graph = TaskGraph::new(Name::EMPTY);
        let a = Name::from_raw(1);
        let b = Name::from_raw(2);
        let c = Name::from_raw(3);
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        graph.add_edge(a, b);

        assert_eq!(graph.nodes(), &[a, b, c]);
        assert_eq!(graph.edges().len(), 2);
        let succ: Vec<Name> = graph.successors(a).collect();
        assert_eq!(succ, vec![b, c]);
    }
}
