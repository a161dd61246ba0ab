//! A `ControlFlowGraph` is a directed `Graph` of `Block` and `Edge`.

use crate::error::Result;
use crate::ir::{Block, Edge};
use crate::util::RenderGraph;
use falcon::graph::{self, Vertex};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type DominatorTree = graph::Graph<graph::NullVertex, graph::NullEdge>;

/// A directed graph of types `Block` and `Edge`.
///
/// The entry block is the root of the dominator tree and is required by all
/// dominance queries.
#[derive(Clone, Debug, Derivative)]
#[derivative(Hash, Eq, PartialEq)]
pub struct ControlFlowGraph {
    // The internal graph used to store our blocks.
    graph: graph::Graph<Block, Edge>,
    // An optional entry index for the graph.
    entry: Option<usize>,
    // The next index to use when creating a basic block.
    #[derivative(Hash = "ignore")]
    #[derivative(PartialEq = "ignore")]
    next_index: usize,
}

impl Default for ControlFlowGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self {
            graph: graph::Graph::new(),
            entry: None,
            next_index: 0,
        }
    }

    /// Returns the underlying graph
    pub fn graph(&self) -> &graph::Graph<Block, Edge> {
        &self.graph
    }

    /// Sets the entry point for this `ControlFlowGraph` to the given `Block` index.
    pub fn set_entry(&mut self, entry: usize) -> Result<()> {
        if self.graph.has_vertex(entry) {
            self.entry = Some(entry);
            return Ok(());
        }
        Err("Index does not exist for set_entry".into())
    }

    /// Get the entry `Block` index for this `ControlFlowGraph`.
    pub fn entry(&self) -> Result<usize> {
        self.entry.ok_or_else(|| "CFG entry must be set".into())
    }

    /// Get a `Block` by index.
    pub fn block(&self, index: usize) -> Result<&Block> {
        Ok(self.graph.vertex(index)?)
    }

    /// Get a mutable reference to a `Block` by index.
    pub fn block_mut(&mut self, index: usize) -> Result<&mut Block> {
        Ok(self.graph.vertex_mut(index)?)
    }

    /// Get the `Block` starting at `address`.
    pub fn block_by_address(&self, address: u64) -> Option<&Block> {
        self.graph
            .vertices()
            .into_iter()
            .find(|block| block.address() == address)
    }

    /// Get every `Block` in this `ControlFlowGraph`, ordered by index.
    pub fn blocks(&self) -> Vec<&Block> {
        self.graph.vertices()
    }

    /// Get every `Edge` in this `ControlFlowGraph`.
    pub fn edges(&self) -> Vec<&Edge> {
        self.graph.edges()
    }

    /// Get the indices of every predecessor of a `Block` in this `ControlFlowGraph`.
    ///
    /// The order is stable and determines the order of phi arguments.
    pub fn predecessor_indices(&self, index: usize) -> Result<Vec<usize>> {
        Ok(self.graph.predecessor_indices(index)?)
    }

    /// Get the indices of every successor of a `Block` in this `ControlFlowGraph`.
    pub fn successor_indices(&self, index: usize) -> Result<Vec<usize>> {
        Ok(self.graph.successor_indices(index)?)
    }

    /// Creates a new basic block, adds it to the graph, and returns it
    pub fn new_block(&mut self, address: u64) -> Result<&mut Block> {
        let next_index = self.next_index;
        self.next_index += 1;
        let block = Block::new(next_index, address);
        self.graph.insert_vertex(block)?;
        Ok(self.graph.vertex_mut(next_index)?)
    }

    /// Creates an unconditional edge from one block to another block
    pub fn unconditional_edge(&mut self, head: usize, tail: usize) -> Result<&mut Edge> {
        let edge = Edge::new(head, tail);
        self.graph.insert_edge(edge)?;
        Ok(self.graph.edge_mut(head, tail)?)
    }

    /// Computes the dominance frontier of every block reachable from the entry.
    pub fn dominance_frontiers(&self) -> Result<BTreeMap<usize, BTreeSet<usize>>> {
        let entry = self.entry()?;
        let frontiers = self.graph.compute_dominance_frontiers(entry)?;
        Ok(frontiers
            .into_iter()
            .map(|(index, frontier)| (index, frontier.into_iter().collect()))
            .collect())
    }

    /// Computes the dominator tree rooted at the entry.
    pub fn dominator_tree(&self) -> Result<DominatorTree> {
        let entry = self.entry()?;
        Ok(self.graph.compute_dominator_tree(entry)?)
    }

    /// The children of `index` in `dominator_tree`, ordered by index.
    pub fn dominated_by(dominator_tree: &DominatorTree, index: usize) -> Result<Vec<usize>> {
        let mut children: Vec<usize> = dominator_tree
            .successors(index)?
            .into_iter()
            .map(|vertex| vertex.index())
            .collect();
        children.sort();
        Ok(children)
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in self.blocks() {
            writeln!(f, "{}", block)?;
        }
        for edge in self.edges() {
            writeln!(f, "edge {}", edge)?;
        }
        Ok(())
    }
}

impl RenderGraph for ControlFlowGraph {
    fn render_to_str(&self) -> String {
        self.graph().dot_graph()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diamond() -> ControlFlowGraph {
        let mut cfg = ControlFlowGraph::new();
        let entry = cfg.new_block(0x100).unwrap().index();
        let left = cfg.new_block(0x110).unwrap().index();
        let right = cfg.new_block(0x120).unwrap().index();
        let join = cfg.new_block(0x130).unwrap().index();
        cfg.unconditional_edge(entry, left).unwrap();
        cfg.unconditional_edge(entry, right).unwrap();
        cfg.unconditional_edge(left, join).unwrap();
        cfg.unconditional_edge(right, join).unwrap();
        cfg.set_entry(entry).unwrap();
        cfg
    }

    #[test]
    fn test_dominance_frontiers_of_diamond() {
        // Given: entry -> {left, right} -> join
        let cfg = diamond();

        // When:
        let frontiers = cfg.dominance_frontiers().unwrap();

        // Then: both branches have the join block in their frontier
        let join: BTreeSet<usize> = vec![3].into_iter().collect();
        assert_eq!(frontiers.get(&1), Some(&join));
        assert_eq!(frontiers.get(&2), Some(&join));
        assert!(frontiers.get(&0).map_or(true, BTreeSet::is_empty));
    }

    #[test]
    fn test_dominator_tree_of_diamond() {
        let cfg = diamond();

        let dominator_tree = cfg.dominator_tree().unwrap();

        assert_eq!(
            ControlFlowGraph::dominated_by(&dominator_tree, 0).unwrap(),
            vec![1, 2, 3]
        );
        assert!(ControlFlowGraph::dominated_by(&dominator_tree, 1)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_entry_must_be_set_for_dominance_queries() {
        let mut cfg = ControlFlowGraph::new();
        cfg.new_block(0).unwrap();

        assert!(cfg.entry().is_err());
        assert!(cfg.dominator_tree().is_err());
    }

    #[test]
    fn test_block_by_address() {
        let cfg = diamond();

        assert_eq!(cfg.block_by_address(0x120).map(Block::index), Some(2));
        assert!(cfg.block_by_address(0x999).is_none());
    }
}
