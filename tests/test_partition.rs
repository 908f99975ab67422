/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use superstep::graphs::vec_graph::VecGraph;
use superstep::partition::{degree_partition, range_partition, Partition};
use superstep::traits::RandomAccessGraph;

/// Checks that partitions tile `[0..node_count)` exactly, in ascending
/// order, with no gaps or overlaps.
fn assert_tiles_exactly(partitions: &[Partition], node_count: usize) {
    let mut next = 0;
    for partition in partitions {
        assert_eq!(partition.start_node(), next);
        assert!(partition.node_count() > 0);
        next += partition.node_count();
    }
    assert_eq!(next, node_count);
}

#[test]
fn test_range_partition_coverage() {
    for node_count in [1, 2, 3, 7, 10, 100, 1023, 1024, 1025] {
        for concurrency in [1, 2, 3, 4, 7, 8, 200] {
            let partitions = range_partition(node_count, concurrency, None);
            assert!(
                partitions.len() <= concurrency,
                "{} partitions for concurrency {}",
                partitions.len(),
                concurrency
            );
            assert_tiles_exactly(&partitions, node_count);
        }
    }
}

#[test]
fn test_range_partition_empty_and_single() {
    assert!(range_partition(0, 8, None).is_empty());

    let partitions = range_partition(5, 1, None);
    assert_eq!(partitions.len(), 1);
    assert_eq!(partitions[0].range(), 0..5);
}

#[test]
fn test_range_partition_sizing_hint() {
    // A cap of 8 nodes per partition produces more, smaller partitions
    // than the concurrency.
    let partitions = range_partition(100, 2, Some(8));
    assert!(partitions.len() > 2);
    for partition in &partitions {
        assert!(partition.node_count() <= 8);
    }
    assert_tiles_exactly(&partitions, 100);
}

#[test]
#[should_panic(expected = "concurrency must be strictly positive")]
fn test_range_partition_rejects_zero_concurrency() {
    range_partition(10, 0, None);
}

/// Builds a graph with a skewed degree distribution: node 0 points to
/// everybody, a handful of hubs point to a few nodes, the rest are
/// low-degree.
fn skewed_graph(n: usize) -> VecGraph {
    let mut graph = VecGraph::empty(n);
    for v in 1..n {
        graph.add_arc(0, v);
    }
    for u in 1..n / 10 {
        for k in 1..=10 {
            graph.add_arc(u, (u + k) % n);
        }
    }
    for u in n / 10..n {
        graph.add_arc(u, (u + 1) % n);
    }
    graph
}

#[test]
fn test_degree_partition_coverage_and_balance() {
    let graph = skewed_graph(500);
    for concurrency in [1, 2, 4, 8] {
        let partitions = degree_partition(&graph, concurrency, None);
        let threshold = graph.num_arcs().div_ceil(concurrency as u64);

        let plain: Vec<Partition> = partitions.iter().map(|p| p.partition()).collect();
        assert_tiles_exactly(&plain, graph.num_nodes());

        for partition in &partitions {
            let degree_sum: u64 = partition
                .partition()
                .iter()
                .map(|node| graph.outdegree(node) as u64)
                .sum();
            assert_eq!(degree_sum, partition.degree_sum());
            // A partition may exceed the threshold only if its single
            // first node does so alone.
            assert!(
                degree_sum <= threshold || partition.partition().node_count() == 1,
                "partition {:?} exceeds threshold {}",
                partition,
                threshold
            );
        }
    }
}

#[test]
fn test_degree_partition_sizing_hint() {
    let graph = skewed_graph(500);
    // A large threshold hint produces fewer partitions.
    let fine = degree_partition(&graph, 8, None);
    let coarse = degree_partition(&graph, 8, Some(graph.num_arcs()));
    assert!(coarse.len() <= fine.len());
    assert_eq!(coarse.len(), 1);
}

#[test]
fn test_degree_partition_empty() {
    let graph = VecGraph::new();
    assert!(degree_partition(&graph, 4, None).is_empty());
}

#[test]
fn test_degree_partition_zero_degree_tail() {
    // Trailing isolated nodes must still be covered.
    let mut graph = VecGraph::empty(10);
    graph.add_arc(0, 1);
    graph.add_arc(1, 2);
    let partitions = degree_partition(&graph, 4, None);
    let plain: Vec<Partition> = partitions.iter().map(|p| p.partition()).collect();
    assert_tiles_exactly(&plain, 10);
}
