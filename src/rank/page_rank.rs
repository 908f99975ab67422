/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Parallel PageRank in its message-passing formulation.
//!
//! Every node starts with rank 1/*n* and, in each superstep, sends its rank
//! divided by its outdegree along its outgoing arcs; the new rank is
//!
//! > (1 − α)/*n* + α ∑ incoming messages
//!
//! where α is the damping factor. The first superstep only seeds the
//! message flow; each following superstep is one power iteration.
//!
//! This is the classic vertex-centric formulation: the rank mass of
//! dangling nodes is not redistributed, so on graphs with dangling nodes
//! the rank vector sums to less than one.
//!
//! # Stopping
//!
//! After each iteration the master step computes the ℓ₁ norm of the
//! difference between consecutive rank vectors and stops once it falls
//! below the configured [`tolerance`](PageRank::tolerance); a tolerance of
//! zero disables the check, so exactly
//! [`max_iterations`](PageRank::max_iterations) supersteps run.

use crate::partition::Partitioning;
use crate::pregel::{
    ComputeContext, InitContext, MasterComputeContext, Messages, Pregel, PregelComputation,
    Reducer, Schema, ValueType,
};
use crate::termination::TerminationFlag;
use crate::traits::RandomAccessGraph;
use crate::{Error, RAYON_MIN_LEN};
use dsi_progress_logger::{no_logging, ConcurrentProgressLog, ProgressLog};
use kahan::KahanSum;
use rayon::prelude::*;
use std::ops::ControlFlow;

/// The property holding the rank scores.
pub const RANK: &str = "rank";
/// The property holding the per-node absolute rank change of the last
/// iteration.
const DELTA: &str = "delta";

/// The aggregate holding the ℓ₁ norm of the difference between the last
/// two rank vectors.
pub const NORM_DELTA: &str = "norm_delta";

struct PageRankComputation {
    damping: f64,
    tolerance: f64,
}

impl<G: RandomAccessGraph> PregelComputation<G> for PageRankComputation {
    fn schema(&self) -> Schema {
        Schema::new()
            .add(RANK, ValueType::Double)
            .add(DELTA, ValueType::Double)
    }

    fn reducer(&self) -> Reducer {
        Reducer::Sum
    }

    fn init(&self, ctx: &mut InitContext<'_, G>) {
        ctx.set_double_value(RANK, 1.0 / ctx.num_nodes() as f64);
        ctx.set_double_value(DELTA, f64::INFINITY);
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, G>, messages: &Messages) -> anyhow::Result<()> {
        let rank = if ctx.is_initial_superstep() {
            ctx.double_value(RANK)
        } else {
            let sum = messages.value().unwrap_or(0.0);
            let old_rank = ctx.double_value(RANK);
            let new_rank = (1.0 - self.damping) / ctx.num_nodes() as f64 + self.damping * sum;
            ctx.set_double_value(DELTA, (new_rank - old_rank).abs());
            ctx.set_double_value(RANK, new_rank);
            new_rank
        };

        let outdegree = ctx.outdegree();
        if outdegree > 0 {
            ctx.send_to_neighbors(rank / outdegree as f64);
        }
        Ok(())
    }

    fn master_compute(
        &self,
        ctx: &mut MasterComputeContext<'_>,
    ) -> anyhow::Result<ControlFlow<()>> {
        // The first superstep only seeds the message flow.
        if ctx.is_initial_superstep() {
            return Ok(ControlFlow::Continue(()));
        }
        let norm_delta = ctx.update_double_values(DELTA, |deltas| {
            deltas
                .par_iter()
                .with_min_len(RAYON_MIN_LEN)
                .fold(KahanSum::<f64>::new, |mut sum, &delta| {
                    sum += delta;
                    sum
                })
                .reduce(KahanSum::<f64>::new, |a, b| a + b)
                .sum()
        });
        ctx.set_aggregate(NORM_DELTA, norm_delta);
        log::info!("Iteration {}: norm delta = {}", ctx.superstep(), norm_delta);
        if self.tolerance > 0.0 && norm_delta < self.tolerance {
            return Ok(ControlFlow::Break(()));
        }
        Ok(ControlFlow::Continue(()))
    }
}

/// Computes PageRank by vertex-centric power iteration.
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run).
///
/// # Examples
///
/// ```
/// use superstep::graphs::vec_graph::VecGraph;
/// use superstep::rank::PageRank;
///
/// // A 4-cycle: all nodes have the same rank.
/// let graph = VecGraph::from_arcs([(0, 1), (1, 2), (2, 3), (3, 0)]);
///
/// let result = PageRank::new(&graph).run()?;
///
/// for &rank in result.ranks.iter() {
///     assert!((rank - 0.25).abs() < 1E-9);
/// }
/// # Ok::<(), superstep::Error>(())
/// ```
pub struct PageRank<'a, G: RandomAccessGraph> {
    graph: &'a G,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
    concurrency: usize,
    partitioning: Partitioning,
    pool: Option<&'a rayon::ThreadPool>,
    termination: TerminationFlag,
}

/// The result of a [`PageRank`] computation.
#[derive(Debug)]
pub struct PageRankResult {
    /// The rank of each node.
    pub ranks: Box<[f64]>,
    /// The number of supersteps that ran, including the seeding superstep.
    pub ran_iterations: usize,
    /// Whether the computation stopped before exhausting
    /// [`max_iterations`](PageRank::max_iterations).
    pub did_converge: bool,
    /// The ℓ₁ norm of the difference between the last two rank vectors.
    pub norm_delta: f64,
}

impl<'a, G: RandomAccessGraph> PageRank<'a, G> {
    /// The default damping factor.
    pub const DEFAULT_DAMPING: f64 = 0.85;
    /// The default maximum number of supersteps.
    pub const DEFAULT_MAX_ITERATIONS: usize = 20;
    /// The default stopping tolerance.
    pub const DEFAULT_TOLERANCE: f64 = 1E-7;

    /// Creates a new PageRank computation.
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            damping: Self::DEFAULT_DAMPING,
            max_iterations: Self::DEFAULT_MAX_ITERATIONS,
            tolerance: Self::DEFAULT_TOLERANCE,
            concurrency: rayon::current_num_threads().max(1),
            partitioning: Partitioning::default(),
            pool: None,
            termination: TerminationFlag::running_true(),
        }
    }

    /// Sets the damping factor α.
    ///
    /// # Panics
    ///
    /// Panics if `damping` is not in the interval [0 . . 1).
    pub fn damping(&mut self, damping: f64) -> &mut Self {
        assert!(
            (0.0..1.0).contains(&damping),
            "The damping factor must be in [0 . . 1), got {damping}"
        );
        self.damping = damping;
        self
    }

    /// Sets the maximum number of supersteps.
    pub fn max_iterations(&mut self, max_iterations: usize) -> &mut Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the stopping tolerance on the ℓ₁ norm of the difference between
    /// consecutive rank vectors. Zero disables the check.
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
    pub fn run(&self) -> Result<PageRankResult, Error> {
        self.run_with_logging(no_logging![], no_logging![])
    }

    /// Runs the computation, logging progress as in
    /// [`Pregel::run_with_logging`].
    pub fn run_with_logging(
        &self,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<PageRankResult, Error> {
        let computation = PageRankComputation {
            damping: self.damping,
            tolerance: self.tolerance,
        };
        let mut pregel = Pregel::new(self.graph, computation);
        pregel
            .concurrency(self.concurrency)
            .max_iterations(self.max_iterations)
            .partitioning(self.partitioning)
            .termination_flag(self.termination.clone());
        if let Some(pool) = self.pool {
            pregel.thread_pool(pool);
        }

        let mut result = pregel.run_with_logging(pl, cpl)?;
        Ok(PageRankResult {
            ranks: result.node_values.take_double_properties(RANK),
            ran_iterations: result.ran_iterations,
            did_converge: result.did_converge,
            norm_delta: result
                .aggregates
                .get(NORM_DELTA)
                .copied()
                .unwrap_or(f64::INFINITY),
        })
    }
}
