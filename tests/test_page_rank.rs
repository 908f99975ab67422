/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use superstep::graphs::vec_graph::VecGraph;
use superstep::rank::PageRank;
use superstep::termination::TerminationFlag;
use superstep::thread_pool;
use superstep::Error;

/// A strongly connected graph: a directed 3-clique bridged to a 5-cycle.
fn clique_cycle() -> VecGraph {
    let mut graph = VecGraph::empty(8);
    for u in 0..3 {
        for v in 0..3 {
            if u != v {
                graph.add_arc(u, v);
            }
        }
    }
    for i in 0..5 {
        graph.add_arc(3 + i, 3 + (i + 1) % 5);
    }
    graph.add_arc(2, 3);
    graph.add_arc(7, 0);
    graph
}

#[test]
fn test_uniform_on_cycle() {
    let graph = VecGraph::from_arcs([(0, 1), (1, 2), (2, 3), (3, 0)]);
    let result = PageRank::new(&graph).run().unwrap();
    assert!(result.did_converge);
    for &rank in result.ranks.iter() {
        assert!((rank - 0.25).abs() < 1E-9);
    }
}

#[test]
fn test_star_center_ranks_highest() {
    // Nodes 1..=4 all point to node 0, which points back to node 1.
    let graph = VecGraph::from_arcs([(1, 0), (2, 0), (3, 0), (4, 0), (0, 1)]);
    let result = PageRank::new(&graph).max_iterations(50).run().unwrap();
    for node in 1..5 {
        assert!(result.ranks[0] > result.ranks[node]);
    }
}

#[test]
fn test_rank_mass_is_preserved_without_dangling_nodes() {
    let graph = clique_cycle();
    let result = PageRank::new(&graph)
        .max_iterations(100)
        .tolerance(1E-12)
        .run()
        .unwrap();
    assert!(result.did_converge);
    let total: f64 = result.ranks.iter().sum();
    assert!((total - 1.0).abs() < 1E-9);
}

#[test]
fn test_zero_tolerance_runs_exactly_max_iterations() {
    let graph = clique_cycle();
    for max_iterations in [1, 5, 15] {
        let result = PageRank::new(&graph)
            .max_iterations(max_iterations)
            .tolerance(0.0)
            .run()
            .unwrap();
        assert_eq!(result.ran_iterations, max_iterations);
        assert!(!result.did_converge);
    }
}

#[test]
fn test_tolerance_monotonicity() {
    // A larger tolerance must never increase the number of iterations.
    let graph = clique_cycle();
    let mut last_iterations = usize::MAX;
    for tolerance in [1E-14, 1E-10, 1E-6, 1E-2] {
        let result = PageRank::new(&graph)
            .max_iterations(200)
            .tolerance(tolerance)
            .run()
            .unwrap();
        assert!(
            result.ran_iterations <= last_iterations,
            "tolerance {tolerance} increased the iteration count"
        );
        last_iterations = result.ran_iterations;
    }
}

#[test]
fn test_parallel_matches_sequential() {
    let graph = clique_cycle();
    let pool = thread_pool![4];

    let sequential = PageRank::new(&graph)
        .max_iterations(50)
        .tolerance(0.0)
        .run()
        .unwrap();
    let parallel = PageRank::new(&graph)
        .max_iterations(50)
        .tolerance(0.0)
        .concurrency(4)
        .thread_pool(&pool)
        .run()
        .unwrap();

    for (a, b) in sequential.ranks.iter().zip(parallel.ranks.iter()) {
        assert!((a - b).abs() < 1E-12);
    }
}

#[test]
fn test_cancellation() {
    let graph = clique_cycle();
    let flag = TerminationFlag::running_true();
    flag.stop();
    let result = PageRank::new(&graph).termination_flag(flag).run();
    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
#[should_panic(expected = "damping factor")]
fn test_invalid_damping_factor() {
    let graph = clique_cycle();
    PageRank::new(&graph).damping(1.5);
}
