/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use superstep::graphs::vec_graph::VecGraph;
use superstep::partition::Partitioning;
use superstep::rank::Hits;
use superstep::thread_pool;
use superstep::traits::{BidirectionalGraph, RandomAccessGraph};

/// The classic eight-node HITS example graph.
fn example_graph() -> VecGraph {
    // a = 0, b = 1, c = 2, d = 3, e = 4, f = 5, g = 6, h = 7
    VecGraph::from_arcs([
        (0, 3),
        (1, 2),
        (1, 4),
        (2, 0),
        (3, 2),
        (4, 3),
        (4, 1),
        (4, 5),
        (4, 2),
        (5, 2),
        (5, 7),
        (6, 0),
        (6, 2),
        (7, 0),
    ])
}

/// A straightforward sequential implementation of the HITS power
/// iteration, with ℓ₂ normalization after each half-step.
fn reference_hits(graph: &VecGraph, iterations: usize) -> (Vec<f64>, Vec<f64>) {
    let n = graph.num_nodes();
    let mut hubs = vec![1.0; n];
    let mut auths = vec![1.0; n];

    for _ in 0..iterations {
        let mut norm: f64 = 0.0;
        for node in 0..n {
            auths[node] = graph.predecessors(node).map(|pred| hubs[pred]).sum();
            norm += auths[node] * auths[node];
        }
        norm = norm.sqrt();
        for auth in auths.iter_mut() {
            *auth /= norm;
        }

        norm = 0.0;
        for node in 0..n {
            hubs[node] = graph.successors(node).map(|succ| auths[succ]).sum();
            norm += hubs[node] * hubs[node];
        }
        norm = norm.sqrt();
        for hub in hubs.iter_mut() {
            *hub /= norm;
        }
    }

    (hubs, auths)
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

#[test]
fn test_hits_matches_reference() {
    let graph = example_graph();
    let (expected_hubs, expected_auths) = reference_hits(&graph, 30);

    let result = Hits::new(&graph)
        .hits_iterations(30)
        .concurrency(1)
        .run()
        .unwrap();

    assert_eq!(result.ran_iterations, 30);
    assert!(!result.did_converge);
    assert!(max_abs_diff(&result.hub_scores, &expected_hubs) < 1E-9);
    assert!(max_abs_diff(&result.authority_scores, &expected_auths) < 1E-9);
}

#[test]
fn test_hits_parallel_matches_reference() {
    let graph = example_graph();
    let (expected_hubs, expected_auths) = reference_hits(&graph, 30);
    let pool = thread_pool![4];

    for partitioning in [Partitioning::Range, Partitioning::Degree] {
        let result = Hits::new(&graph)
            .hits_iterations(30)
            .concurrency(4)
            .partitioning(partitioning)
            .thread_pool(&pool)
            .run()
            .unwrap();

        assert!(max_abs_diff(&result.hub_scores, &expected_hubs) < 1E-9);
        assert!(max_abs_diff(&result.authority_scores, &expected_auths) < 1E-9);
    }
}

#[test]
fn test_hits_scores_are_normalized() {
    let graph = example_graph();
    let result = Hits::new(&graph).hits_iterations(10).run().unwrap();

    let hub_norm: f64 = result.hub_scores.iter().map(|x| x * x).sum();
    let auth_norm: f64 = result.authority_scores.iter().map(|x| x * x).sum();
    assert!((hub_norm - 1.0).abs() < 1E-12);
    assert!((auth_norm - 1.0).abs() < 1E-12);
    assert!(result.auth_norm > 0.0);
    assert!(result.hub_norm > 0.0);
}

#[test]
fn test_hits_tolerance_stops_early() {
    let graph = example_graph();

    let exhaustive = Hits::new(&graph).hits_iterations(50).run().unwrap();
    assert_eq!(exhaustive.ran_iterations, 50);
    assert!(!exhaustive.did_converge);

    let tolerant = Hits::new(&graph)
        .hits_iterations(50)
        .tolerance(1E-3)
        .run()
        .unwrap();
    assert!(tolerant.did_converge);
    assert!(tolerant.ran_iterations < 50);

    // The scores at the stopping point are still close to the limit.
    let (expected_hubs, _) = reference_hits(&graph, 50);
    assert!(max_abs_diff(&tolerant.hub_scores, &expected_hubs) < 1E-2);
}

#[test]
fn test_hits_tolerance_monotonicity() {
    let graph = example_graph();
    let mut last_iterations = usize::MAX;
    for tolerance in [1E-12, 1E-9, 1E-6, 1E-3] {
        let result = Hits::new(&graph)
            .hits_iterations(100)
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
