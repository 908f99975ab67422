/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use crate::traits::{BidirectionalGraph, RandomAccessGraph};

/// A mutable [`RandomAccessGraph`] implementation based on a vector of
/// vectors.
///
/// The graph maintains the inverse adjacency lists alongside the direct
/// ones, so it also implements [`BidirectionalGraph`]. Successors and
/// predecessors are returned in arc-insertion order.
///
/// This implementation is convenient for tests and for small graphs; it is
/// not designed to compete with compressed or memory-mapped representations.
///
/// # Examples
///
/// ```
/// use superstep::graphs::vec_graph::VecGraph;
/// use superstep::traits::{BidirectionalGraph, RandomAccessGraph};
///
/// let graph = VecGraph::from_arcs([(0, 1), (0, 2), (2, 1)]);
/// assert_eq!(graph.num_nodes(), 3);
/// assert_eq!(graph.num_arcs(), 3);
/// assert_eq!(graph.successors(0).collect::<Vec<_>>(), vec![1, 2]);
/// assert_eq!(graph.predecessors(1).collect::<Vec<_>>(), vec![0, 2]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VecGraph {
    /// The number of arcs in the graph.
    num_arcs: u64,
    /// For each node, its list of successors.
    succ: Vec<Vec<usize>>,
    /// For each node, its list of predecessors.
    pred: Vec<Vec<usize>>,
}

impl VecGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new empty graph with `n` nodes.
    pub fn empty(n: usize) -> Self {
        Self {
            num_arcs: 0,
            succ: Vec::from_iter((0..n).map(|_| Vec::new())),
            pred: Vec::from_iter((0..n).map(|_| Vec::new())),
        }
    }

    /// Creates a new graph from an iterator of arcs, adding nodes as needed.
    pub fn from_arcs(arcs: impl IntoIterator<Item = (usize, usize)>) -> Self {
        let mut graph = Self::new();
        for (u, v) in arcs {
            graph.add_node(u.max(v));
            graph.add_arc(u, v);
        }
        graph
    }

    /// Adds an isolated node to the graph and returns true if it is a new node.
    pub fn add_node(&mut self, node: usize) -> bool {
        let len = self.succ.len();
        self.succ.extend((len..=node).map(|_| Vec::new()));
        self.pred.extend((len..=node).map(|_| Vec::new()));
        len <= node
    }

    /// Adds an arc to the graph.
    ///
    /// # Panics
    ///
    /// This method will panic if one of the given nodes is greater than or
    /// equal to the number of nodes in the graph.
    pub fn add_arc(&mut self, u: usize, v: usize) {
        let max = u.max(v);
        if max >= self.succ.len() {
            panic!(
                "Node {} does not exist (the graph has {} nodes)",
                max,
                self.succ.len(),
            );
        }
        self.succ[u].push(v);
        self.pred[v].push(u);
        self.num_arcs += 1;
    }

    /// Adds the arcs from an iterator to the graph.
    ///
    /// # Panics
    ///
    /// This method will panic if one of the arc endpoints is greater than or
    /// equal to the number of nodes in the graph.
    pub fn add_arcs(&mut self, arcs: impl IntoIterator<Item = (usize, usize)>) {
        for (u, v) in arcs {
            self.add_arc(u, v);
        }
    }
}

impl RandomAccessGraph for VecGraph {
    type Successors<'a> = std::iter::Copied<std::slice::Iter<'a, usize>>;

    #[inline(always)]
    fn num_nodes(&self) -> usize {
        self.succ.len()
    }

    #[inline(always)]
    fn num_arcs(&self) -> u64 {
        self.num_arcs
    }

    #[inline(always)]
    fn outdegree(&self, node: usize) -> usize {
        self.succ[node].len()
    }

    #[inline(always)]
    fn successors(&self, node: usize) -> Self::Successors<'_> {
        self.succ[node].iter().copied()
    }
}

impl BidirectionalGraph for VecGraph {
    type Predecessors<'a> = std::iter::Copied<std::slice::Iter<'a, usize>>;

    #[inline(always)]
    fn indegree(&self, node: usize) -> usize {
        self.pred[node].len()
    }

    #[inline(always)]
    fn predecessors(&self, node: usize) -> Self::Predecessors<'_> {
        self.pred[node].iter().copied()
    }
}
