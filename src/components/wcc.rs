/*
 * SPDX-FileCopyrightText: 2025 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

//! Connected components by minimum-label propagation.
//!
//! Every node starts with its own id as component label and repeatedly
//! adopts the smallest label among the incoming messages, propagating
//! changes to its neighbors; nodes vote to halt after every superstep and
//! are woken up only by incoming messages, so the computation stops as soon
//! as the labels are stable. At the end, two nodes have the same label if
//! and only if they are connected, and the label is the smallest node id of
//! the component.
//!
//! # Requirements
//!
//! The graph provided should be _symmetric_: labels propagate along arcs,
//! so on a non-symmetric graph the result describes reachability along
//! arcs, not connectivity.
//!
//! # Message disciplines
//!
//! Minimum-label propagation is idempotent, so it tolerates the
//! [asynchronous](crate::pregel::Pregel::asynchronous) message discipline:
//! labels observed earlier in the same superstep only speed up convergence,
//! and the fixpoint is the same. This algorithm is therefore a natural
//! candidate for [`asynchronous`](Wcc::asynchronous) runs, which usually
//! need fewer supersteps.

use crate::partition::Partitioning;
use crate::pregel::{
    ComputeContext, InitContext, Messages, Pregel, PregelComputation, Reducer, Schema, ValueType,
};
use crate::termination::TerminationFlag;
use crate::traits::RandomAccessGraph;
use crate::Error;
use dsi_progress_logger::{no_logging, ConcurrentProgressLog, ProgressLog};

/// The property holding the component labels.
pub const COMPONENT: &str = "component";

struct WccComputation;

impl<G: RandomAccessGraph> PregelComputation<G> for WccComputation {
    fn schema(&self) -> Schema {
        Schema::new().add(COMPONENT, ValueType::Long)
    }

    fn reducer(&self) -> Reducer {
        Reducer::Min
    }

    fn init(&self, ctx: &mut InitContext<'_, G>) {
        ctx.set_long_value(COMPONENT, ctx.node_id() as i64);
    }

    fn compute(&self, ctx: &mut ComputeContext<'_, G>, messages: &Messages) -> anyhow::Result<()> {
        let current = ctx.long_value(COMPONENT);
        let mut best = current;
        if let Some(min) = messages.value() {
            best = best.min(min as i64);
        }
        if ctx.is_initial_superstep() || best < current {
            if best < current {
                ctx.set_long_value(COMPONENT, best);
            }
            ctx.send_to_neighbors(best as f64);
        }
        ctx.vote_to_halt();
        Ok(())
    }
}

/// Computes connected components by minimum-label propagation.
///
/// The struct is configured via setters and then executed via
/// [`run`](Self::run).
///
/// # Examples
///
/// ```
/// use superstep::components::Wcc;
/// use superstep::graphs::vec_graph::VecGraph;
///
/// // Two components: a path 0 — 1 — 2 and an arc 3 — 4.
/// let graph = VecGraph::from_arcs([
///     (0, 1),
///     (1, 0),
///     (1, 2),
///     (2, 1),
///     (3, 4),
///     (4, 3),
/// ]);
///
/// let result = Wcc::new(&graph).run()?;
///
/// assert_eq!(&*result.components, &[0, 0, 0, 3, 3]);
/// assert!(result.did_converge);
/// # Ok::<(), superstep::Error>(())
/// ```
pub struct Wcc<'a, G: RandomAccessGraph> {
    graph: &'a G,
    asynchronous: bool,
    concurrency: usize,
    partitioning: Partitioning,
    pool: Option<&'a rayon::ThreadPool>,
    termination: TerminationFlag,
}

/// The result of a [`Wcc`] computation.
#[derive(Debug)]
pub struct WccResult {
    /// The component label of each node: the smallest node id of its
    /// component.
    pub components: Box<[i64]>,
    /// The number of supersteps that ran.
    pub ran_iterations: usize,
    /// Whether the labels reached a fixpoint within the internal superstep
    /// bound.
    pub did_converge: bool,
}

impl<'a, G: RandomAccessGraph> Wcc<'a, G> {
    /// Creates a new connected-components computation.
    pub fn new(graph: &'a G) -> Self {
        Self {
            graph,
            asynchronous: false,
            concurrency: rayon::current_num_threads().max(1),
            partitioning: Partitioning::default(),
            pool: None,
            termination: TerminationFlag::running_true(),
        }
    }

    /// Selects the asynchronous message discipline (see the [module
    /// documentation](self)).
    pub fn asynchronous(&mut self, asynchronous: bool) -> &mut Self {
        self.asynchronous = asynchronous;
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
    pub fn run(&self) -> Result<WccResult, Error> {
        self.run_with_logging(no_logging![], no_logging![])
    }

    /// Runs the computation, logging progress as in
    /// [`Pregel::run_with_logging`].
    pub fn run_with_logging(
        &self,
        pl: &mut impl ProgressLog,
        cpl: &mut impl ConcurrentProgressLog,
    ) -> Result<WccResult, Error> {
        let mut pregel = Pregel::new(self.graph, WccComputation);
        pregel
            .concurrency(self.concurrency)
            // Labels shrink strictly, so the diameter bounds the number of
            // supersteps; the node count is a safe upper bound.
            .max_iterations(self.graph.num_nodes() + 2)
            .asynchronous(self.asynchronous)
            .partitioning(self.partitioning)
            .termination_flag(self.termination.clone());
        if let Some(pool) = self.pool {
            pregel.thread_pool(pool);
        }

        let mut result = pregel.run_with_logging(pl, cpl)?;
        Ok(WccResult {
            components: result.node_values.take_long_properties(COMPONENT),
            ran_iterations: result.ran_iterations,
            did_converge: result.did_converge,
        })
    }
}
