/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use superstep::components::Wcc;
use superstep::graphs::vec_graph::VecGraph;
use superstep::partition::Partitioning;
use superstep::thread_pool;

/// Builds a symmetric graph from undirected edges.
fn symmetric_graph(n: usize, edges: impl IntoIterator<Item = (usize, usize)>) -> VecGraph {
    let mut graph = VecGraph::empty(n);
    for (u, v) in edges {
        graph.add_arc(u, v);
        graph.add_arc(v, u);
    }
    graph
}

#[test]
fn test_two_components() {
    let graph = symmetric_graph(7, [(0, 1), (1, 2), (2, 3), (4, 5), (5, 6)]);
    let pool = thread_pool![4];

    for partitioning in [Partitioning::Range, Partitioning::Degree] {
        for concurrency in [1, 4] {
            let mut wcc = Wcc::new(&graph);
            wcc.concurrency(concurrency).partitioning(partitioning);
            if concurrency > 1 {
                wcc.thread_pool(&pool);
            }
            let result = wcc.run().unwrap();
            assert!(result.did_converge);
            assert_eq!(&*result.components, &[0, 0, 0, 0, 4, 4, 4]);
        }
    }
}

#[test]
fn test_isolated_nodes() {
    let graph = symmetric_graph(5, [(1, 3)]);
    let result = Wcc::new(&graph).run().unwrap();
    assert!(result.did_converge);
    assert_eq!(&*result.components, &[0, 1, 2, 1, 4]);
}

#[test]
fn test_async_matches_sync() {
    // Minimum-label propagation is idempotent, so the asynchronous
    // discipline reaches the same fixpoint.
    let mut rng = SmallRng::seed_from_u64(7);
    let n = 300;
    let graph = symmetric_graph(
        n,
        (0..400).map(|_| (rng.random_range(0..n), rng.random_range(0..n))),
    );

    let sync = Wcc::new(&graph).run().unwrap();
    let mut wcc = Wcc::new(&graph);
    wcc.asynchronous(true);
    let async_result = wcc.run().unwrap();

    assert!(sync.did_converge);
    assert!(async_result.did_converge);
    assert_eq!(sync.components, async_result.components);
}

#[test]
fn test_async_converges_in_fewer_supersteps_on_a_path() {
    // On a long path, the synchronous discipline moves the smallest label
    // one hop per superstep, while the asynchronous one sweeps the whole
    // path within a single superstep at concurrency one.
    let n = 100;
    let graph = symmetric_graph(n, (0..n - 1).map(|i| (i, i + 1)));

    let mut sync = Wcc::new(&graph);
    sync.concurrency(1);
    let sync_result = sync.run().unwrap();

    let mut asynchronous = Wcc::new(&graph);
    asynchronous.concurrency(1).asynchronous(true);
    let async_result = asynchronous.run().unwrap();

    assert_eq!(sync_result.components, async_result.components);
    assert!(async_result.ran_iterations < sync_result.ran_iterations);
    assert!(sync_result.ran_iterations >= n - 1);
}

#[test]
fn test_empty_graph() {
    let graph = VecGraph::new();
    let result = Wcc::new(&graph).run().unwrap();
    assert!(result.did_converge);
    assert!(result.components.is_empty());
}
