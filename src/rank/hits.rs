/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Parallel HITS (Hyperlink-Induced Topic Search).
//!
//! HITS assigns every node a _hub_ score and an _authority_ score: good
//! hubs point to good authorities, and good authorities are pointed to by
//! good hubs. One iteration of the classic power method computes, for every
//! node, the authority score as the sum of the hub scores of its
//! predecessors, normalizes authorities in the ℓ₂ norm, then computes the
//! hub score as the sum of the authority scores of its successors, and
//! normalizes hubs.
//!
//! Since the computation propagates values against the direction of the
//! arcs, the graph must provide an inverse index
//! ([`BidirectionalGraph`]).
//!
//! # Implementation
//!
//! Each HITS iteration is four supersteps of the [Pregel
//! engine](crate::pregel) with sum-reduced messages:
//!
//! 1. every node sends its hub score along its outgoing arcs;
//! 2. every node stores the combined messages as its raw authority score,
//!    and the master step ℓ₂-normalizes the authority vector;
//! 3. every node sends its authority score along its incoming arcs;
//! 4. every node stores the combined messages as its raw hub score, and the
//!    master step ℓ₂-normalizes the hub vector and evaluates the stopping
//!    criterion.
//!
//! The synchronous message discipline makes an iteration equivalent to a
//! simultaneous update of the whole score vectors, so the result matches
//! the straightforward sequential power iteration up to floating-point
//! summation order.

use crate::partition::Partitioning;
use crate::pregel::{
    ComputeContext, InitContext, MasterComputeContext, Messages, Pregel, PregelComputation,
    Reducer, Schema, ValueType,
};
use crate::termination::TerminationFlag;
use crate::traits::BidirectionalGraph;
use crate::{Error, RAYON_MIN_LEN};
use dsi_progress_logger::{no_logging, ConcurrentProgressLog, ProgressLog};
use kahan::KahanSum;
use rayon::prelude::*;
use std::ops::ControlFlow;

/// The property holding the authority scores.
pub const AUTH: &str = "auth";
/// The property holding the hub scores.
pub const HUB: &str = "hub";
/// The property holding the hub scores of the previous iteration, used by
/// the stopping criterion.
const LAST_HUB: &str = "last_hub";

/// The aggregate holding the ℓ₂ norm of the raw authority vector.
pub const AUTH_NORM: &str = "auth_norm";
/// The aggregate holding the ℓ₂ norm of the raw hub vector.
pub const HUB_NORM: &str = "hub_norm";

/// Computes the ℓ₂ norm of a vector and divides the vector by it.
///
/// A zero norm (an edgeless vector) leaves the vector untouched.
fn normalize(values: &mut [f64]) -> f64 {
    let norm = values
        .par_iter()
        .with_min_len(RAYON_MIN_LEN)
        .fold(KahanSum::<f64>::new, |mut sum, &x| {
            sum += x * x;
            sum
        })
        .reduce(KahanSum::<f64>::new, |a, b| a + b)
        .sum()
        .sqrt();
    if norm > 0.0 {
        values
            .par_iter_mut()
            .with_min_len(RAYON_MIN_LEN)
            .for_each(|x| *x /= norm);
    }
    norm
}

struct HitsComputation {
    tolerance: f64,
}

impl<G: BidirectionalGraph> PregelComputation<G> for HitsComputation {
    fn schema(&self) -> Schema {
        Schema::new()
            .add(AUTH, ValueType::Double)
            .add(HUB, ValueType::Double)
            .add(LAST_HUB, ValueType::Double)
    }

    fn reducer(&self) -> Reducer {
        Reducer::Sum
    }

    fn init(&self, ctx: &mut InitContext<'_, G>) {
        ctx.set_double_value(AUTH, 1.0);
        ctx.set_double_value(HUB, 1.0);
        ctx.set_double_value(LAST_HUB, 1.0);
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, G>, messages: &Messages) -> anyhow::Result<()> {
        match ctx.superstep() % 4 {
            // Hub scores flow along the arcs and combine into authorities.
            0 => {
                let hub = ctx.double_value(HUB);
                ctx.send_to_neighbors(hub);
            }
            1 => ctx.set_double_value(AUTH, messages.value().unwrap_or(0.0)),
            // Authority scores flow against the arcs and combine into hubs.
            2 => {
                let auth = ctx.double_value(AUTH);
                ctx.send_to_inverse_neighbors(auth);
            }
            3 => ctx.set_double_value(HUB, messages.value().unwrap_or(0.0)),
            _ => unreachable!(),
        }
        Ok(())
    }

    fn master_compute(
        &self,
        ctx: &mut MasterComputeContext<'_>,
    ) -> anyhow::Result<ControlFlow<()>> {
        match ctx.superstep() % 4 {
            1 => {
                let norm = ctx.update_double_values(AUTH, normalize);
                ctx.set_aggregate(AUTH_NORM, norm);
            }
            3 => {
                let (norm, delta) = ctx.update_double_values_pair(HUB, LAST_HUB, |hubs, last| {
                    let norm = normalize(hubs);
                    let delta = hubs
                        .par_iter()
                        .zip(last.par_iter())
                        .with_min_len(RAYON_MIN_LEN)
                        .fold(KahanSum::<f64>::new, |mut sum, (&hub, &last)| {
                            sum += (hub - last).abs();
                            sum
                        })
                        .reduce(KahanSum::<f64>::new, |a, b| a + b)
                        .sum();
                    last.copy_from_slice(hubs);
                    (norm, delta)
                });
                ctx.set_aggregate(HUB_NORM, norm);
                if self.tolerance > 0.0 && delta < self.tolerance {
                    return Ok(ControlFlow::Break(()));
                }
            }
            _ => {}
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// Computes hub and authority scores with the HITS power method.
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run).
///
/// # Examples
///
/// ```
/// use superstep::graphs::vec_graph::VecGraph;
/// use superstep::rank::Hits;
///
/// let graph = VecGraph::from_arcs([(0, 1), (1, 2), (2, 0), (0, 2)]);
///
/// let result = Hits::new(&graph).hits_iterations(30).run()?;
///
/// assert_eq!(result.hub_scores.len(), 3);
/// assert_eq!(result.authority_scores.len(), 3);
/// // Node 0 points to both other nodes, so it is the best hub.
/// assert!(result.hub_scores[0] > result.hub_scores[1]);
/// assert!(result.hub_scores[0] > result.hub_scores[2]);
/// # Ok::<(), superstep::Error>(())
/// ```
pub struct Hits<'a, G: BidirectionalGraph> {
    graph: &'a G,
    hits_iterations: usize,
    tolerance: f64,
    concurrency: usize,
    partitioning: Partitioning,
    pool: Option<&'a rayon::ThreadPool>,
    termination: TerminationFlag,
}

/// The result of a [`Hits`] computation.
#[derive(Debug)]
pub struct HitsResult {
    /// The hub score of each node.
    pub hub_scores: Box<[f64]>,
    /// The authority score of each node.
    pub authority_scores: Box<[f64]>,
    /// The number of HITS iterations that ran.
    pub ran_iterations: usize,
    /// Whether the computation stopped before exhausting the configured
    /// iterations.
    pub did_converge: bool,
    /// The ℓ₂ norm of the raw authority vector of the last iteration.
    pub auth_norm: f64,
    /// The ℓ₂ norm of the raw hub vector of the last iteration.
    pub hub_norm: f64,
}

impl<'a, G: BidirectionalGraph> Hits<'a, G> {
    /// The default number of HITS iterations.
    pub const DEFAULT_HITS_ITERATIONS: usize = 20;

    /// Creates a new HITS computation.
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            hits_iterations: Self::DEFAULT_HITS_ITERATIONS,
            tolerance: 0.0,
            concurrency: rayon::current_num_threads().max(1),
            partitioning: Partitioning::default(),
            pool: None,
            termination: TerminationFlag::running_true(),
        }
    }

    /// Sets the number of HITS iterations (each iteration is four
    /// supersteps).
    pub fn hits_iterations(&mut self, hits_iterations: usize) -> &mut Self {
        self.hits_iterations = hits_iterations;
        self
    }

    /// Sets the stopping tolerance: the computation stops once the ℓ₁ norm
    /// of the difference between consecutive hub vectors falls below this
    /// value. Zero (the default) disables the check, so exactly
    /// [`hits_iterations`](Self::hits_iterations) iterations run.
    pub fn tolerance(&mut self, tolerance: f64) -> &mut Self {
        self.tolerance = tolerance;
        self
    }

    /// Sets the concurrency of the computation.
    pub fn concurrency(&mut self, concurrency: usize) -> &mut Self {
        self.concurrency = concurrency;
        self
    }

    /// Sets the partitioning strategy.
    pub fn partitioning(&mut self, partitioning: Partitioning) -> &mut Self {
        self.partitioning = partitioning;
        self
    }

    /// Sets the thread pool of the computation.
    pub fn thread_pool(&mut self, pool: &'a rayon::ThreadPool) -> &mut Self {
        self.pool = Some(pool);
        self
    }

    /// Sets the termination flag of the computation.
    pub fn termination_flag(&mut self, termination: TerminationFlag) -> &mut Self {
        self.termination = termination;
        self
    }

    /// Runs the computation without logging.
    pub fn run(&self) -> Result<HitsResult, Error> {
        self.run_with_logging(no_logging![], no_logging![])
    }

    /// Runs the computation, logging progress as in
    /// [`Pregel::run_with_logging`].
    pub fn run_with_logging(
        &self,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<HitsResult, Error> {
        let computation = HitsComputation {
            tolerance: self.tolerance,
        };
        let mut pregel = Pregel::new(self.graph, computation);
        pregel
            .concurrency(self.concurrency)
            .max_iterations(self.hits_iterations.saturating_mul(4))
            .partitioning(self.partitioning)
            .termination_flag(self.termination.clone());
        if let Some(pool) = self.pool {
            pregel.thread_pool(pool);
        }

        let mut result = pregel.run_with_logging(pl, cpl)?;
        Ok(HitsResult {
            hub_scores: result.node_values.take_double_properties(HUB),
            authority_scores: result.node_values.take_double_properties(AUTH),
            ran_iterations: result.ran_iterations.div_ceil(4),
            did_converge: result.did_converge,
            auth_norm: result.aggregates.get(AUTH_NORM).copied().unwrap_or(0.0),
            hub_norm: result.aggregates.get(HUB_NORM).copied().unwrap_or(0.0),
        })
    }
}
