/*
 * SPDX-FileCopyrightText: 2025 Tommaso Fontana
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Partitioning of dense node-id ranges for parallel execution.
//!
//! Both strategies return contiguous, non-overlapping partitions whose union
//! is exactly `[0..node_count)`, in ascending order.
//! [`range_partition`] balances the number of nodes per partition, which is
//! appropriate when the per-node cost is roughly uniform;
//! [`degree_partition`] balances the sum of outdegrees, which is appropriate
//! when the cost is dominated by edge traversal, as partitions with few
//! high-degree nodes would otherwise dominate the wall-clock time of a
//! parallel phase.

use crate::traits::RandomAccessGraph;

/// A contiguous range of node ids assigned to one concurrent task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Partition {
    start_node: usize,
    node_count: usize,
}

impl Partition {
    /// Creates a partition covering `[start_node..start_node + node_count)`.
    pub fn new(start_node: usize, node_count: usize) -> Self {
        Self {
            start_node,
            node_count,
        }
    }

    /// Returns the first node of the partition.
    #[inline(always)]
    pub fn start_node(&self) -> usize {
        self.start_node
    }

    /// Returns the number of nodes in the partition.
    #[inline(always)]
    pub fn node_count(&self) -> usize {
        self.node_count
    }

    /// Returns the node ids of the partition as a range.
    #[inline(always)]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start_node..self.start_node + self.node_count
    }

    /// Returns an iterator over the node ids of the partition.
    #[inline(always)]
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.range()
    }
}

/// A [`Partition`] that additionally records the sum of the outdegrees of
/// its nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DegreePartition {
    partition: Partition,
    degree_sum: u64,
}

impl DegreePartition {
    /// Creates a degree partition with the given degree sum.
    pub fn new(start_node: usize, node_count: usize, degree_sum: u64) -> Self {
        Self {
            partition: Partition::new(start_node, node_count),
            degree_sum,
        }
    }

    /// Returns the underlying node-range partition.
    #[inline(always)]
    pub fn partition(&self) -> Partition {
        self.partition
    }

    /// Returns the sum of the outdegrees of the nodes of the partition.
    #[inline(always)]
    pub fn degree_sum(&self) -> u64 {
        self.degree_sum
    }
}

impl From<DegreePartition> for Partition {
    fn from(degree_partition: DegreePartition) -> Self {
        degree_partition.partition
    }
}

/// The partitioning strategy of a parallel computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partitioning {
    /// Partitions with a balanced number of nodes. This is the default.
    #[default]
    Range,
    /// Partitions with a balanced sum of outdegrees.
    Degree,
}

impl std::fmt::Display for Partitioning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Partitioning::Range => f.write_str("range"),
            Partitioning::Degree => f.write_str("degree"),
        }
    }
}

/// Splits `[0..node_count)` into contiguous partitions of near-equal size.
///
/// Without a sizing hint the partition size is `⌈node_count / concurrency⌉`,
/// so at most `concurrency` partitions are returned, all but the last of
/// identical size. A `max_node_count` hint caps the partition size, which
/// may produce more, smaller partitions than `concurrency`.
///
/// A `node_count` of zero yields no partitions.
///
/// # Panics
///
/// Panics if `concurrency` is zero: a node-per-task reinterpretation would
/// silently produce enormous partition vectors, so the value is rejected
/// instead.
///
/// # Examples
///
/// ```
/// use superstep::partition::range_partition;
///
/// let partitions = range_partition(10, 4, None);
/// assert_eq!(partitions.len(), 4);
/// assert_eq!(partitions[0].range(), 0..3);
/// assert_eq!(partitions[3].range(), 9..10);
/// ```
pub fn range_partition(
    node_count: usize,
    concurrency: usize,
    max_node_count: Option<usize>,
) -> Vec<Partition> {
    assert!(concurrency > 0, "concurrency must be strictly positive");
    if node_count == 0 {
        return vec![];
    }
    let mut partition_size = node_count.div_ceil(concurrency);
    if let Some(max_node_count) = max_node_count {
        assert!(
            max_node_count > 0,
            "the maximum partition size must be strictly positive"
        );
        partition_size = partition_size.min(max_node_count);
    }

    let mut partitions = Vec::with_capacity(node_count.div_ceil(partition_size));
    let mut start_node = 0;
    while start_node < node_count {
        let node_count = partition_size.min(node_count - start_node);
        partitions.push(Partition::new(start_node, node_count));
        start_node += node_count;
    }
    partitions
}

/// Splits the nodes of a graph into contiguous partitions of near-equal
/// outdegree sum.
///
/// Nodes are accumulated into the current partition until adding the next
/// node would push the degree sum past the threshold
/// `max(⌈num_arcs / concurrency⌉, max_degree_sum)`; a partition exceeds the
/// threshold only when its single first node does so alone.
///
/// Note that, contrarily to [`range_partition`], the number of returned
/// partitions may be slightly larger than `concurrency` when the degree
/// distribution makes an exact split impossible.
///
/// A graph with no nodes yields no partitions.
///
/// # Panics
///
/// Panics if `concurrency` is zero (see [`range_partition`]).
pub fn degree_partition<G: RandomAccessGraph>(
    graph: &G,
    concurrency: usize,
    max_degree_sum: Option<u64>,
) -> Vec<DegreePartition> {
    assert!(concurrency > 0, "concurrency must be strictly positive");
    let node_count = graph.num_nodes();
    if node_count == 0 {
        return vec![];
    }
    let threshold = graph
        .num_arcs()
        .div_ceil(concurrency as u64)
        .max(max_degree_sum.unwrap_or(0))
        .max(1);

    let mut partitions = Vec::with_capacity(concurrency);
    let mut start_node = 0;
    while start_node < node_count {
        let mut degree_sum = 0;
        let mut node = start_node;
        while node < node_count {
            let degree = graph.outdegree(node) as u64;
            if degree_sum + degree > threshold && node != start_node {
                break;
            }
            degree_sum += degree;
            node += 1;
        }
        partitions.push(DegreePartition::new(start_node, node - start_node, degree_sum));
        start_node = node;
    }
    partitions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_partition_tiles_exactly() {
        for node_count in [1, 2, 7, 100, 1000] {
            for concurrency in [1, 2, 3, 8, 64] {
                let partitions = range_partition(node_count, concurrency, None);
                assert!(partitions.len() <= concurrency);
                let mut next = 0;
                for partition in &partitions {
                    assert_eq!(partition.start_node(), next);
                    assert!(partition.node_count() > 0);
                    next += partition.node_count();
                }
                assert_eq!(next, node_count);
            }
        }
    }

    #[test]
    fn test_range_partition_empty() {
        assert!(range_partition(0, 4, None).is_empty());
    }

    #[test]
    #[should_panic(expected = "concurrency must be strictly positive")]
    fn test_range_partition_zero_concurrency() {
        range_partition(10, 0, None);
    }

    #[test]
    fn test_range_partition_cap() {
        let partitions = range_partition(100, 2, Some(10));
        assert_eq!(partitions.len(), 10);
        for partition in &partitions {
            assert!(partition.node_count() <= 10);
        }
    }
}
